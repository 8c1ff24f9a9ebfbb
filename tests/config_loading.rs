use std::io::Write;

use tandem_core::config::AppConfig;
use tandem_core::error::TandemError;

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[platform]
url = "math-demo.us.langgraph.app/"
api_key = "lg-test-key"
math_assistant_id = "calculator"
stream_chunk_size = 256
request_timeout_secs = 12

[polling]
max_wait_secs = 10
check_interval_secs = 1

[question_model]
provider = "openai"
model_id = "gpt-4o"
api_key = "sk-test-key"
base_url = "http://localhost:11434/v1/chat/completions"
max_tokens = 512
temperature = 0.2
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.platform.base_url(), "https://math-demo.us.langgraph.app");
    assert_eq!(config.platform.api_key.as_deref(), Some("lg-test-key"));
    assert_eq!(config.platform.math_assistant_id, "calculator");
    assert_eq!(config.platform.stream_chunk_size, 256);
    assert_eq!(config.platform.request_timeout().as_secs(), 12);
    assert_eq!(config.polling.max_wait().as_secs(), 10);
    assert_eq!(config.polling.check_interval().as_secs(), 1);
    assert_eq!(config.question_model.model_id, "gpt-4o");
    assert_eq!(config.question_model.max_tokens, 512);
    assert!((config.question_model.temperature - 0.2).abs() < f32::EPSILON);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_empty_file_uses_defaults() {
    let tmp = tempfile::NamedTempFile::new().expect("create temp file");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.platform.math_assistant_id, "math_agent");
    assert_eq!(config.platform.stream_chunk_size, 1024);
    assert_eq!(config.platform.request_timeout_secs, 30);
    assert_eq!(config.polling.max_wait_secs, 30);
    assert_eq!(config.polling.check_interval_secs, 2);
    assert_eq!(config.question_model.model_id, "gpt-4o-mini");
    assert_eq!(
        config.missing_credentials(),
        vec!["platform.url", "platform.api_key", "question_model.api_key"]
    );
}

#[test]
fn test_load_expands_env_vars() {
    std::env::set_var("TANDEM_TEST_PLATFORM_KEY", "lg-from-env");
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[platform]\napi_key = \"${TANDEM_TEST_PLATFORM_KEY}\"\n")
        .expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.platform.api_key.as_deref(), Some("lg-from-env"));
}

#[test]
fn test_validate_rejects_placeholders() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(
        br#"
[platform]
url = "example.us.langgraph.app"
api_key = "your_langgraph_api_key"

[question_model]
api_key = "sk-real"
"#,
    )
    .expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    let err = config.validate().unwrap_err();
    assert!(matches!(err, TandemError::Config(_)));
    assert!(err.to_string().contains("platform.api_key"));
    assert!(!err.to_string().contains("question_model.api_key"));
}

#[test]
fn test_missing_file() {
    let err = AppConfig::load(std::path::Path::new("/nonexistent/tandem.toml")).unwrap_err();
    assert!(matches!(err, TandemError::ConfigNotFound(_)));
}

#[test]
fn test_invalid_toml() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[polling]\nmax_wait_secs = \"soon\"\n")
        .expect("write toml");

    let err = AppConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(err, TandemError::Config(_)));
}
