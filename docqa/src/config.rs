use crate::error::{DocQaError, Result};
use std::env;
use std::str::FromStr;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Runtime settings, read from the environment (and `.env` via dotenv).
#[derive(Debug, Clone)]
pub struct Settings {
    /// Fallback key used when the user does not type one in.
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub bind_addr: String,
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            temperature: None,
            max_output_tokens: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values behave as if the variable were unset.
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();

        Ok(Self {
            api_key: get("GEMINI_API_KEY"),
            model: get("GEMINI_MODEL").unwrap_or(defaults.model),
            api_base: get("GEMINI_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            temperature: parse_optional("GEMINI_TEMPERATURE", get("GEMINI_TEMPERATURE"))?,
            max_output_tokens: parse_optional(
                "GEMINI_MAX_OUTPUT_TOKENS",
                get("GEMINI_MAX_OUTPUT_TOKENS"),
            )?,
            bind_addr: get("DOCQA_BIND").unwrap_or(defaults.bind_addr),
            max_upload_bytes: parse_optional("DOCQA_MAX_UPLOAD_BYTES", get("DOCQA_MAX_UPLOAD_BYTES"))?
                .unwrap_or(defaults.max_upload_bytes),
        })
    }
}

fn parse_optional<T>(name: &str, value: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| {
            raw.parse::<T>().map_err(|e| DocQaError::InvalidSetting {
                name: name.to_string(),
                reason: format!("{raw:?}: {e}"),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = settings_from(&[]).unwrap();
        assert_eq!(settings.api_key, None);
        assert_eq!(settings.model, "gemini-1.5-flash");
        assert_eq!(settings.api_base, DEFAULT_API_BASE);
        assert_eq!(settings.temperature, None);
        assert_eq!(settings.max_output_tokens, None);
        assert_eq!(settings.bind_addr, "0.0.0.0:3000");
        assert_eq!(settings.max_upload_bytes, 200 * 1024 * 1024);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let settings = settings_from(&[("GEMINI_API_KEY", "   "), ("GEMINI_MODEL", "")]).unwrap();
        assert_eq!(settings.api_key, None);
        assert_eq!(settings.model, DEFAULT_MODEL);
    }

    #[test]
    fn overrides_are_parsed() {
        let settings = settings_from(&[
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-2.5-flash"),
            ("GEMINI_API_BASE", "http://127.0.0.1:9999/"),
            ("GEMINI_TEMPERATURE", "0.3"),
            ("GEMINI_MAX_OUTPUT_TOKENS", "1000"),
            ("DOCQA_BIND", "127.0.0.1:8080"),
            ("DOCQA_MAX_UPLOAD_BYTES", "1024"),
        ])
        .unwrap();

        assert_eq!(settings.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.model, "gemini-2.5-flash");
        assert_eq!(settings.api_base, "http://127.0.0.1:9999");
        assert_eq!(settings.temperature, Some(0.3));
        assert_eq!(settings.max_output_tokens, Some(1000));
        assert_eq!(settings.bind_addr, "127.0.0.1:8080");
        assert_eq!(settings.max_upload_bytes, 1024);
    }

    #[test]
    fn unparseable_numbers_are_rejected() {
        let err = settings_from(&[("GEMINI_MAX_OUTPUT_TOKENS", "lots")]).unwrap_err();
        match err {
            DocQaError::InvalidSetting { name, .. } => assert_eq!(name, "GEMINI_MAX_OUTPUT_TOKENS"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
