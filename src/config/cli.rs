use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, builder::BoolishValueParser};
use uuid::Uuid;

use crate::domain::api_keys::Role;

/// Command-line arguments for the Crema binary.
#[derive(Debug, Parser)]
#[command(name = "crema", version, about = "Crema product catalog service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "CREMA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API.
    Serve(Box<ServeArgs>),
    /// Load demo products and issue demo API keys.
    Seed(SeedArgs),
    /// Issue a new API key and print its token once.
    #[command(name = "issue-key")]
    IssueKey(IssueKeyArgs),
    /// Revoke an API key so its token stops authenticating.
    #[command(name = "revoke-key")]
    RevokeKey(RevokeKeyArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,

    /// Load fixtures before accepting requests.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub seed: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the externally visible base URL used in `Location` headers.
    #[arg(long = "server-public-url", value_name = "URL")]
    pub public_url: Option<String>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Toggle the listing cache.
    #[arg(
        long = "cache-enable-listing",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enable_listing: Option<bool>,

    /// Override the listing cache lifetime; 0 keeps pages until invalidated.
    #[arg(long = "cache-listing-ttl-seconds", value_name = "SECONDS")]
    pub cache_listing_ttl_seconds: Option<u64>,

    /// Override the number of listing pages kept in memory.
    #[arg(long = "cache-listing-capacity", value_name = "COUNT")]
    pub cache_listing_capacity: Option<usize>,

    /// Override the page size used when `limit` is omitted.
    #[arg(long = "catalog-default-limit", value_name = "COUNT")]
    pub catalog_default_limit: Option<u32>,

    /// Override the largest accepted page size.
    #[arg(long = "catalog-max-limit", value_name = "COUNT")]
    pub catalog_max_limit: Option<u32>,

    /// Override the API version served when a request does not ask for one.
    #[arg(long = "api-default-version", value_name = "VERSION")]
    pub api_default_version: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SeedArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Clone)]
pub struct IssueKeyArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Label stored with the key.
    #[arg(long, value_name = "NAME")]
    pub name: String,

    /// Role granted to the key holder.
    #[arg(long, value_enum, default_value_t = KeyRole::User)]
    pub role: KeyRole,

    /// Expire the key after this many days.
    #[arg(long = "expires-in-days", value_name = "DAYS")]
    pub expires_in_days: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct RevokeKeyArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Id of the key, as logged when it was issued.
    #[arg(long, value_name = "UUID")]
    pub id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeyRole {
    User,
    Admin,
}

impl From<KeyRole> for Role {
    fn from(role: KeyRole) -> Self {
        match role {
            KeyRole::User => Role::User,
            KeyRole::Admin => Role::Admin,
        }
    }
}
