//! Credential loading and secret scrubbing
//!
//! The two API keys the service needs are read from the environment once at
//! startup and carried as [`SecretString`]s. [`scrub_secrets`] removes key-shaped
//! substrings from text that is about to be logged or returned to a caller.

pub mod string;

pub use string::SecretString;

use regex::Regex;
use sdk::errors::EngineError;
use std::sync::OnceLock;

/// Environment variable holding the Anthropic API key
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Environment variable holding the sandbox API key
pub const E2B_API_KEY_ENV: &str = "E2B_API_KEY";

/// API keys for the model endpoint and the remote sandbox
#[derive(Debug, Clone)]
pub struct Credentials {
    pub anthropic_api_key: SecretString,
    pub e2b_api_key: SecretString,
}

impl Credentials {
    pub fn new(anthropic_api_key: impl Into<String>, e2b_api_key: impl Into<String>) -> Self {
        Self {
            anthropic_api_key: SecretString::new(anthropic_api_key),
            e2b_api_key: SecretString::new(e2b_api_key),
        }
    }

    /// Read both keys from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `MissingCredential` naming the first variable that is unset or blank.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read both keys through an arbitrary lookup function
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| -> Result<SecretString, EngineError> {
            let secret = SecretString::new(lookup(key).unwrap_or_default());
            if secret.is_empty() {
                return Err(EngineError::MissingCredential(key.to_string()));
            }
            Ok(secret)
        };

        Ok(Self {
            anthropic_api_key: read(ANTHROPIC_API_KEY_ENV)?,
            e2b_api_key: read(E2B_API_KEY_ENV)?,
        })
    }
}

static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Patterns matching:
/// - Anthropic keys: sk-ant-...
/// - E2B keys: e2b_...
/// - Bearer tokens
fn secret_patterns() -> &'static [Regex] {
    SECRET_PATTERNS.get_or_init(|| {
        [
            r"sk-ant-[a-zA-Z0-9\-_]{8,}",
            r"e2b_[a-zA-Z0-9]{8,}",
            r"Bearer\s+[^\s]{20,}",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Replace anything that looks like an API key with `[REDACTED]`
pub fn scrub_secrets(text: &str) -> String {
    secret_patterns()
        .iter()
        .fold(text.to_string(), |acc, re| {
            re.replace_all(&acc, "[REDACTED]").into_owned()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_credentials_from_lookup() {
        let env: HashMap<&str, &str> = [
            (ANTHROPIC_API_KEY_ENV, "sk-ant-test-key"),
            (E2B_API_KEY_ENV, "e2b_testkey123"),
        ]
        .into_iter()
        .collect();

        let creds = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.anthropic_api_key.expose(), "sk-ant-test-key");
        assert_eq!(creds.e2b_api_key.expose(), "e2b_testkey123");
    }

    #[test]
    fn test_missing_credential_is_named() {
        let err = Credentials::from_lookup(|k| {
            (k == ANTHROPIC_API_KEY_ENV).then(|| "sk-ant-test-key".to_string())
        })
        .unwrap_err();

        match err {
            EngineError::MissingCredential(name) => assert_eq!(name, E2B_API_KEY_ENV),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_scrub_secrets() {
        let text = "auth failed for sk-ant-api03-abcdefghij and e2b_0123456789abcdef";
        let scrubbed = scrub_secrets(text);
        assert!(!scrubbed.contains("abcdefghij"));
        assert!(!scrubbed.contains("0123456789abcdef"));
        assert_eq!(scrubbed.matches("[REDACTED]").count(), 2);
    }

    #[test]
    fn test_scrub_leaves_plain_text() {
        assert_eq!(scrub_secrets("no keys here"), "no keys here");
    }
}
