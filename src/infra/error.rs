use thiserror::Error;

/// Failures while wiring the process to its environment: sockets, Postgres, logging.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to bind or serve: {0}")]
    Io(#[from] std::io::Error),
    #[error("postgres unavailable: {0}")]
    Database(#[from] sqlx::Error),
    #[error("schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("{0}")]
    Configuration(&'static str),
}

impl InfraError {
    pub fn configuration(message: &'static str) -> Self {
        Self::Configuration(message)
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
