// Touches the process environment; kept in its own test binary.

use vserve_common::config::ServeConfig;
use vserve_common::ServeError;

#[test]
fn env_file_feeds_the_environment_lookup() {
    let path = std::env::temp_dir().join(format!("vserve-{}.env", std::process::id()));
    std::fs::write(
        &path,
        "MODEL_NAME=org/from-dotenv\nVSERVE_BIND=127.0.0.1:9911\nVSERVE_DTYPE=float16\n",
    )
    .unwrap();

    let cfg = ServeConfig::load_with_env_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(cfg.model, "org/from-dotenv");
    assert_eq!(cfg.model_name(), "from-dotenv");
    assert_eq!(cfg.bind, "127.0.0.1:9911");
    assert_eq!(cfg.engine.dtype, "float16");
}

#[test]
fn missing_env_file_is_a_startup_failure() {
    let path = std::env::temp_dir().join("vserve-does-not-exist.env");
    let err = ServeConfig::load_with_env_file(&path).unwrap_err();
    assert!(matches!(err, ServeError::Startup(_)));
}
