use std::ffi::OsString;
use std::fs;

use deploy_config::Config;
use ortho_config::OrthoConfig;
use tempfile::TempDir;

#[test]
fn malformed_config_file_is_reported() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("deploy.toml");
    fs::write(&path, "port = not_a_number\n").expect("write malformed config");

    let args = vec![
        OsString::from("deploy"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];

    let error = Config::load_from_iter(args).expect_err("loading must fail");
    assert!(
        !error.to_string().is_empty(),
        "error should describe the failure"
    );
}

#[test]
fn cli_flags_populate_optional_fields() {
    let args = [
        "deploy",
        "--server-root",
        "/opt/deploy",
        "--inactivity-timeout-ms",
        "45000",
        "--log-format",
        "compact",
    ]
    .map(OsString::from);

    let config = Config::load_from_iter(args).expect("config should load");
    assert_eq!(
        config.server_root().map(camino::Utf8Path::as_str),
        Some("/opt/deploy")
    );
    assert_eq!(config.inactivity_timeout_ms, 45_000);
    assert_eq!(config.log_format(), deploy_config::LogFormat::Compact);
}
