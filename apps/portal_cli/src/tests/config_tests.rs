use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

use super::*;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
graphql_endpoint = "https://example.appsync-api.us-west-2.amazonaws.com/graphql"
api_key = "da2-file"
default_organization = "Acme"
"#,
    )
    .expect("parse");

    assert_eq!(settings.api_key.as_deref(), Some("da2-file"));
    assert_eq!(settings.default_organization, "Acme");
    assert_eq!(
        settings.endpoint().expect("endpoint").host_str(),
        Some("example.appsync-api.us-west-2.amazonaws.com")
    );
}

#[test]
fn app_prefixed_env_wins_over_portal_prefix() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_from(&[
            ("PORTAL_GRAPHQL_ENDPOINT", "http://one.local/graphql"),
            ("APP__GRAPHQL_ENDPOINT", "http://two.local/graphql"),
            ("PORTAL_API_KEY", "key"),
        ]),
    );

    assert_eq!(
        settings.graphql_endpoint.as_deref(),
        Some("http://two.local/graphql")
    );
    assert!(matches!(settings.credentials(), Credentials::ApiKey(key) if key == "key"));
}

#[test]
fn token_takes_precedence_over_api_key() {
    let settings = Settings {
        api_key: Some("key".into()),
        auth_token: Some("token".into()),
        ..Settings::default()
    };
    assert!(matches!(settings.credentials(), Credentials::Token(token) if token == "token"));
    assert!(matches!(Settings::default().credentials(), Credentials::None));
}

#[test]
fn missing_or_invalid_endpoint_is_rejected() {
    let err = Settings::default().endpoint().expect_err("missing");
    assert!(err.to_string().contains("no GraphQL endpoint"));

    let settings = Settings {
        graphql_endpoint: Some("ftp://example.com/graphql".into()),
        ..Settings::default()
    };
    settings.endpoint().expect_err("wrong scheme");

    let settings = Settings {
        graphql_endpoint: Some("not a url".into()),
        ..Settings::default()
    };
    settings.endpoint().expect_err("unparseable");
}

#[test]
fn explicit_config_path_must_exist() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let missing = env::temp_dir().join(format!("portal_missing_{suffix}.toml"));
    load_settings(Some(missing.as_path())).expect_err("missing file");
}

#[test]
fn loads_explicit_config_file() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("portal_cli_config_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("portal.toml");
    fs::write(&path, "default_organization = \"Example Org\"\n").expect("write config");

    let settings = load_settings(Some(path.as_path())).expect("load");
    if env::var("APP__DEFAULT_ORGANIZATION").is_err() {
        assert_eq!(settings.default_organization, "Example Org");
    }

    fs::remove_dir_all(temp_root).expect("cleanup");
}
