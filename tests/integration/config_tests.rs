use clap::Parser;
use dupelink::cli::Cli;
use dupelink::config::{Config, ConfigError};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config = Config::extract(&figment).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("DUPELINK_CHECKSUM_ROUNDS", "2");
    std::env::set_var("DUPELINK_EXACT", "false");

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed("DUPELINK_"));
    let config = Config::extract(&figment).unwrap();

    std::env::remove_var("DUPELINK_CHECKSUM_ROUNDS");
    std::env::remove_var("DUPELINK_EXACT");

    assert_eq!(config.checksum_rounds, 2);
    assert!(!config.exact);
}

#[test]
fn test_config_load_from_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
min_size = 1
checksum_rounds = 0
chmod_clear = 0o022
ignore_dirs = [".git", "node_modules"]
io_threads = 8
progress = false
"#,
    )
    .unwrap();

    let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&path));
    let config = Config::extract(&figment).unwrap();
    assert_eq!(config.min_size, 1);
    assert_eq!(config.checksum_rounds, 0);
    assert_eq!(config.chmod_clear, 0o022);
    assert_eq!(config.ignore_dirs, vec![".git", "node_modules"]);
    assert_eq!(config.io_threads, 8);
    assert!(!config.progress);
    assert!(config.exact);
}

#[test]
fn test_cli_flags_override_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "min_size = 1\nexact = true\nignore_dirs = [\"x\"]\n").unwrap();

    let cli = Cli::try_parse_from([
        "dupelink",
        "-a",
        "-m",
        "2KiB",
        "-i",
        "y",
        "/data",
    ])
    .unwrap();
    let config = Config::load(Some(&path), cli.config_overrides()).unwrap();

    assert_eq!(config.min_size, 2048);
    assert!(!config.exact);
    assert_eq!(config.ignore_dirs, vec!["y"]);
}

#[test]
fn test_config_file_values_survive_absent_flags() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "chmod_clear = 0o002\nio_threads = 3\n").unwrap();

    let cli = Cli::try_parse_from(["dupelink", "/data"]).unwrap();
    let config = Config::load(Some(&path), cli.config_overrides()).unwrap();

    assert_eq!(config.chmod_clear, 0o002);
    assert_eq!(config.io_threads, 3);
}

#[test]
fn test_saved_config_loads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let config = Config {
        min_size: 42,
        ignore_dirs: vec!["tmp".to_string()],
        ..Config::default()
    };
    let content = config.to_toml().unwrap();
    assert!(content.contains("min_size = 42"));
    fs::write(&path, content).unwrap();

    let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&path));
    assert_eq!(Config::extract(&figment).unwrap(), config);
}

#[test]
fn test_invalid_chmod_in_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "chmod_clear = 0o17777\n").unwrap();

    let cli = Cli::try_parse_from(["dupelink", "/data"]).unwrap();
    let err = Config::load(Some(&path), cli.config_overrides()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidChmodBits(0o17777)));
}
