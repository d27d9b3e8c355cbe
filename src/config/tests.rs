use super::*;

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.server.public_url.as_str(), "http://127.0.0.1:8000/");
    assert!(settings.database.url.is_none());
    assert!(settings.cache.enable_listing_cache);
    assert_eq!(settings.cache.listing_ttl_seconds, 60);
    assert_eq!(settings.cache.listing_capacity, 256);
    assert_eq!(settings.catalog.default_limit.get(), 3);
    assert_eq!(settings.catalog.max_limit.get(), 100);
    assert_eq!(settings.api.default_version, ApiVersion::V2_0);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.cache.listing_ttl_seconds = Some(30);

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        cache_listing_ttl_seconds: Some(0),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.cache.listing_ttl_seconds, 0);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn blank_database_url_selects_memory_store() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn zero_capacity_and_limits_are_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.listing_capacity = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "cache.listing_capacity",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.catalog.max_limit = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "catalog.max_limit",
            ..
        })
    ));
}

#[test]
fn default_limit_must_fit_under_max_limit() {
    let mut raw = RawSettings::default();
    raw.catalog.default_limit = Some(50);
    raw.catalog.max_limit = Some(10);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "catalog.default_limit",
            ..
        })
    ));
}

#[test]
fn invalid_default_version_is_rejected() {
    let mut raw = RawSettings::default();
    raw.api.default_version = Some("two".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "api.default_version",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.api.default_version = Some("1.0".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.api.default_version, ApiVersion::V1_0);
}

#[test]
fn public_url_must_be_a_base() {
    let mut raw = RawSettings::default();
    raw.server.public_url = Some("mailto:ops@example.com".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "server.public_url",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.server.public_url = Some("https://api.example.com".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.server.public_url.as_str(), "https://api.example.com/");
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["crema"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_with_seed_flag() {
    let args = CliArgs::parse_from(["crema", "serve", "--seed", "--cache-enable-listing", "no"]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert!(serve.seed);
            assert_eq!(serve.overrides.cache_enable_listing, Some(false));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_issue_key_arguments() {
    let args = CliArgs::parse_from([
        "crema",
        "issue-key",
        "--database-url",
        "postgres://example",
        "--name",
        "ops",
        "--role",
        "admin",
    ]);

    match args.command.expect("issue-key command") {
        Command::IssueKey(issue) => {
            assert_eq!(
                issue.database.database_url.as_deref(),
                Some("postgres://example")
            );
            assert_eq!(issue.name, "ops");
            assert_eq!(issue.role, KeyRole::Admin);
            assert!(issue.expires_in_days.is_none());
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_seed_arguments() {
    let args = CliArgs::parse_from(["crema", "seed", "--database-url", "postgres://example"]);
    match args.command.expect("seed command") {
        Command::Seed(seed) => {
            assert_eq!(seed.database.database_url.as_deref(), Some("postgres://example"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_revoke_key_arguments() {
    let args = CliArgs::parse_from([
        "crema",
        "revoke-key",
        "--id",
        "67e55044-10b1-426f-9247-bb680e5fe0c8",
    ]);
    match args.command.expect("revoke-key command") {
        Command::RevokeKey(revoke) => {
            assert_eq!(revoke.id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
            assert!(revoke.database.database_url.is_none());
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn revoke_key_requires_a_valid_id() {
    assert!(CliArgs::try_parse_from(["crema", "revoke-key", "--id", "not-a-uuid"]).is_err());
}
