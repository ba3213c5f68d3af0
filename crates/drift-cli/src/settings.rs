//! Connection settings
//!
//! The instance URL comes from the environment, then the configuration
//! document, then gitlab.com. The token is only ever read from the
//! environment.

use drift_core::ConfigDocument;

use crate::error::{CliError, Result};

pub const URL_VAR: &str = "GITLAB_URL";
pub const TOKEN_VAR: &str = "GITLAB_TOKEN";
pub const DEFAULT_URL: &str = "https://gitlab.com";

/// Where and how to connect
pub struct Settings {
    pub url: String,
    pub token: String,
}

impl Settings {
    /// Resolve settings from the process environment
    pub fn from_env(config: &ConfigDocument) -> Result<Self> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve settings using `lookup` for environment variables
    pub fn resolve(
        config: &ConfigDocument,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let url = non_empty(URL_VAR)
            .or_else(|| config.gitlab_url().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_URL.to_string());

        let token = non_empty(TOKEN_VAR).ok_or_else(|| {
            CliError::user(format!(
                "{} is not set; export a personal access token with api scope",
                TOKEN_VAR
            ))
        })?;

        Ok(Self { url, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::FieldSet;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn document(url: &str) -> ConfigDocument {
        ConfigDocument::parse(&format!("GITLAB_URL: {}\ndefault: {{}}\n", url)).unwrap()
    }

    #[test]
    fn environment_url_overrides_document() {
        let settings = Settings::resolve(
            &document("https://gitlab.acme.test"),
            env(&[(URL_VAR, "https://gitlab.override.test"), (TOKEN_VAR, "secret")]),
        )
        .unwrap();
        assert_eq!(settings.url, "https://gitlab.override.test");
        assert_eq!(settings.token, "secret");
    }

    #[test]
    fn document_url_is_used_when_env_is_unset() {
        let settings =
            Settings::resolve(&document("https://gitlab.acme.test"), env(&[(TOKEN_VAR, "secret")]))
                .unwrap();
        assert_eq!(settings.url, "https://gitlab.acme.test");
    }

    #[test]
    fn falls_back_to_gitlab_com() {
        let settings =
            Settings::resolve(&ConfigDocument::new(FieldSet::new()), env(&[(TOKEN_VAR, "secret")]))
                .unwrap();
        assert_eq!(settings.url, DEFAULT_URL);
    }

    #[test]
    fn missing_token_is_a_user_error() {
        let result = Settings::resolve(
            &document("https://gitlab.acme.test"),
            env(&[(TOKEN_VAR, " ")]),
        );
        match result {
            Err(CliError::User { message }) => assert!(message.contains(TOKEN_VAR)),
            _ => panic!("expected a user error"),
        }
    }
}
