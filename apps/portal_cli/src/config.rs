use std::{collections::HashMap, fs, path::Path};

use anyhow::{anyhow, Context};
use client_core::{profile::DEFAULT_ORGANIZATION, Credentials};
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "portal.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub graphql_endpoint: Option<String>,
    pub api_key: Option<String>,
    pub auth_token: Option<String>,
    pub default_organization: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            graphql_endpoint: None,
            api_key: None,
            auth_token: None,
            default_organization: DEFAULT_ORGANIZATION.into(),
        }
    }
}

impl Settings {
    pub fn endpoint(&self) -> anyhow::Result<Url> {
        let raw = self
            .graphql_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .ok_or_else(|| {
                anyhow!("no GraphQL endpoint configured (set graphql_endpoint or PORTAL_GRAPHQL_ENDPOINT)")
            })?;
        let url = Url::parse(raw).with_context(|| format!("invalid GraphQL endpoint '{raw}'"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("GraphQL endpoint must be http(s), got '{raw}'"));
        }
        Ok(url)
    }

    /// A user token takes precedence over the API key.
    pub fn credentials(&self) -> Credentials {
        match (&self.auth_token, &self.api_key) {
            (Some(token), _) => Credentials::Token(token.clone()),
            (None, Some(key)) => Credentials::ApiKey(key.clone()),
            (None, None) => Credentials::None,
        }
    }
}

pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            apply_file(&mut settings, &raw)
                .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        }
        None => {
            if let Ok(raw) = fs::read_to_string(DEFAULT_CONFIG_PATH) {
                apply_file(&mut settings, &raw)
                    .with_context(|| format!("failed to parse {DEFAULT_CONFIG_PATH}"))?;
            }
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg = toml::from_str::<HashMap<String, String>>(raw)?;
    if let Some(v) = file_cfg.get("graphql_endpoint") {
        settings.graphql_endpoint = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("api_key") {
        settings.api_key = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("auth_token") {
        settings.auth_token = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("default_organization") {
        settings.default_organization = v.clone();
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("PORTAL_GRAPHQL_ENDPOINT") {
        settings.graphql_endpoint = Some(v);
    }
    if let Some(v) = lookup("APP__GRAPHQL_ENDPOINT") {
        settings.graphql_endpoint = Some(v);
    }

    if let Some(v) = lookup("PORTAL_API_KEY") {
        settings.api_key = Some(v);
    }
    if let Some(v) = lookup("APP__API_KEY") {
        settings.api_key = Some(v);
    }

    if let Some(v) = lookup("PORTAL_AUTH_TOKEN") {
        settings.auth_token = Some(v);
    }
    if let Some(v) = lookup("APP__AUTH_TOKEN") {
        settings.auth_token = Some(v);
    }

    if let Some(v) = lookup("APP__DEFAULT_ORGANIZATION") {
        settings.default_organization = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
