use crate::{
    AppError,
    config::{Config, DEFAULT_PORT, ServerConfig},
};

use std::fs;

use tempfile::TempDir;

/// WHAT: A saved config loads back unchanged
/// WHY: Settings must survive a restart
#[test]
#[allow(clippy::unwrap_used)]
fn given_saved_config_when_loading_then_same_values() {
    // Given: A non-default config saved to a temp dir
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    let config = Config {
        server: ServerConfig {
            port: 9000,
            start_on_launch: false,
        },
    };
    config.save_to(&path).unwrap();

    // When: Loading it
    let loaded = Config::load_from(&path).unwrap();

    // Then: Values match and no temp file is left behind
    assert_eq!(loaded, config);
    assert!(!path.with_extension("toml.tmp").exists());
}

/// WHAT: Missing keys take their defaults
/// WHY: Older or hand-written files stay loadable
#[test]
#[allow(clippy::unwrap_used)]
fn given_partial_file_when_loading_then_defaults_fill_in() {
    // Given: A file that only sets start_on_launch, and an empty file
    let dir = TempDir::new().unwrap();
    let partial = dir.path().join("partial.toml");
    let empty = dir.path().join("empty.toml");
    fs::write(&partial, "[server]\nstart_on_launch = false\n").unwrap();
    fs::write(&empty, "").unwrap();

    // When: Loading both
    let partial = Config::load_from(&partial).unwrap();
    let empty = Config::load_from(&empty).unwrap();

    // Then: The port defaults to 8800; the empty file is all defaults
    assert_eq!(partial.server.port, DEFAULT_PORT);
    assert!(!partial.server.start_on_launch);
    assert_eq!(empty, Config::default());
    assert!(empty.server.start_on_launch);
}

/// WHAT: Port 0 is rejected
/// WHY: The command service needs a fixed, known port
#[test]
#[allow(clippy::unwrap_used)]
fn given_port_zero_when_loading_then_config_error() {
    // Given: A file with port 0
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[server]\nport = 0\n").unwrap();

    // When: Loading it
    let result = Config::load_from(&path);

    // Then: ConfigError
    assert!(matches!(result, Err(AppError::ConfigError { .. })));
}

/// WHAT: Unparseable files are reported, not replaced
/// WHY: A typo must not silently reset the user's settings
#[test]
#[allow(clippy::unwrap_used)]
fn given_invalid_toml_when_loading_then_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[server\nport = ").unwrap();

    let result = Config::load_from(&path);

    assert!(matches!(result, Err(AppError::ConfigError { .. })));
    assert_eq!(fs::read_to_string(&path).unwrap(), "[server\nport = ");
}

/// WHAT: Loading a file that does not exist fails
/// WHY: Only the platform default location is created on demand
#[test]
#[allow(clippy::unwrap_used)]
fn given_missing_file_when_loading_from_path_then_config_error() {
    let dir = TempDir::new().unwrap();

    let result = Config::load_from(&dir.path().join("absent.toml"));

    assert!(matches!(result, Err(AppError::ConfigError { .. })));
}
