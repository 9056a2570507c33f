use clap::Parser;
use dupelink::cli::Cli;
use dupelink::error::{ExitCode, StructuredError};
use dupelink::run_app;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::process::Command;
use tempfile::{tempdir, TempDir};

/// Parse arguments with an empty config file so user settings never leak in.
fn cli(config_dir: &TempDir, args: &[&str]) -> Cli {
    let config = config_dir.path().join("config.toml");
    fs::write(&config, "").unwrap();
    let mut argv = vec![
        "dupelink".to_string(),
        "-P".to_string(),
        "--config".to_string(),
        config.to_string_lossy().into_owned(),
    ];
    argv.extend(args.iter().map(|s| s.to_string()));
    Cli::try_parse_from(argv).unwrap()
}

fn populate(root: &Path) {
    fs::write(root.join("a"), vec![1u8; 200]).unwrap();
    fs::write(root.join("b"), vec![1u8; 200]).unwrap();
    fs::write(root.join("c"), vec![2u8; 200]).unwrap();
}

#[test]
fn test_exit_code_duplicates_found() {
    let data = tempdir().unwrap();
    let config = tempdir().unwrap();
    populate(data.path());

    let root = data.path().to_string_lossy().into_owned();
    let code = run_app(cli(&config, &["-m", "100", &root])).unwrap();
    assert_eq!(code, ExitCode::Success);
    assert_ne!(
        fs::metadata(data.path().join("a")).unwrap().ino(),
        fs::metadata(data.path().join("b")).unwrap().ino()
    );
}

#[test]
fn test_exit_code_no_duplicates() {
    let data = tempdir().unwrap();
    let config = tempdir().unwrap();
    populate(data.path());

    // Everything is below the minimum size
    let root = data.path().to_string_lossy().into_owned();
    let code = run_app(cli(&config, &["-m", "1KB", &root])).unwrap();
    assert_eq!(code, ExitCode::NoDuplicates);
}

#[test]
fn test_hard_link_flag_links_duplicates() {
    let data = tempdir().unwrap();
    let config = tempdir().unwrap();
    populate(data.path());

    let root = data.path().to_string_lossy().into_owned();
    let code = run_app(cli(&config, &["-H", "-d", "-m", "1", &root])).unwrap();
    assert_eq!(code, ExitCode::Success);
    assert_eq!(
        fs::metadata(data.path().join("a")).unwrap().ino(),
        fs::metadata(data.path().join("b")).unwrap().ino()
    );
    assert_ne!(
        fs::metadata(data.path().join("a")).unwrap().ino(),
        fs::metadata(data.path().join("c")).unwrap().ino()
    );
}

#[test]
fn test_missing_root_is_an_error() {
    let data = tempdir().unwrap();
    let config = tempdir().unwrap();

    let root = data.path().join("missing").to_string_lossy().into_owned();
    let err = run_app(cli(&config, &[&root])).unwrap_err();
    let structured = StructuredError::new(&err, ExitCode::GeneralError);
    assert_eq!(structured.code, "DL001");
    assert!(structured.message.contains("Failed to scan"));
    assert!(!structured.causes.is_empty());
}

#[test]
fn test_invalid_config_is_an_error() {
    let data = tempdir().unwrap();
    let config = tempdir().unwrap();

    let root = data.path().to_string_lossy().into_owned();
    let err = run_app(cli(&config, &["--io-threads", "0", &root])).unwrap_err();
    assert!(format!("{err:#}").contains("io_threads"));
}

#[test]
fn test_unreadable_file_gives_partial_success() {
    use std::os::unix::fs::PermissionsExt;

    let data = tempdir().unwrap();
    let config = tempdir().unwrap();
    populate(data.path());
    fs::write(data.path().join("d"), vec![1u8; 200]).unwrap();
    let locked = data.path().join("d");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::File::open(&locked).is_ok() {
        return;
    }

    let root = data.path().to_string_lossy().into_owned();
    let code = run_app(cli(&config, &["-m", "1", &root])).unwrap();
    assert_eq!(code, ExitCode::PartialSuccess);
}

#[test]
fn test_collision_is_reported_without_dump() {
    let data = tempdir().unwrap();
    let config = tempdir().unwrap();
    populate(data.path());
    let config_file = config.path().join("config.toml");
    fs::write(&config_file, "").unwrap();

    // Three files of one size and no checksum rounds leave one collision
    let output = Command::new(env!("CARGO_BIN_EXE_dupelink"))
        .arg("-P")
        .arg("--config")
        .arg(&config_file)
        .args(["--checksum-rounds", "0", "-m", "1"])
        .arg(data.path())
        .env_remove("RUST_LOG")
        .env_remove("DUPELINK_CHECKSUM_ROUNDS")
        .env_remove("DUPELINK_EXACT")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(ExitCode::NoDuplicates.as_i32()));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unresolved collision: 3 files of 200 bytes"));
    for name in ["a", "b", "c"] {
        assert!(stderr.contains(&format!("/{name}'")));
    }
}
