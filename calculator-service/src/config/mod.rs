use secrecy::Secret;
use service_core::config::{self as core_config, get_env, parse_env};
use service_core::error::AppError;
use std::env;
use std::time::Duration;

/// Gemini REST endpoint root.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_TOP_K: u32 = 64;
pub const DEFAULT_TOP_P: f32 = 0.95;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

/// Upper bound for a `/calculate` request body (10 MiB).
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 << 20;

#[derive(Debug, Clone)]
pub struct CalculatorConfig {
    pub common: core_config::Config,
    pub gemini: GeminiSettings,
    pub upload: UploadSettings,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// `None` when `GEMINI_API_KEY` is unset or blank; rejected when the
    /// client is constructed.
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub api_base_url: String,
    pub timeout: Duration,
    pub generation: GenerationSettings,
}

/// Sampling parameters sent with every request. Not exposed to HTTP callers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_k: DEFAULT_TOP_K,
            top_p: DEFAULT_TOP_P,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UploadSettings {
    pub max_bytes: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
        }
    }
}

impl GeminiSettings {
    pub fn new(api_key: Option<Secret<String>>) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            generation: GenerationSettings::default(),
        }
    }
}

impl CalculatorConfig {
    pub fn load() -> Result<Self, AppError> {
        // Handles the optional configuration file, APP__* and PORT
        let common_config = core_config::Config::load()?;

        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(Secret::new);

        let gemini = GeminiSettings {
            api_key,
            model: get_env("GEMINI_MODEL", Some(DEFAULT_MODEL))?,
            api_base_url: get_env("GEMINI_API_BASE_URL", Some(DEFAULT_API_BASE_URL))?
                .trim_end_matches('/')
                .to_string(),
            timeout: Duration::from_secs(parse_env("GEMINI_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?),
            generation: GenerationSettings {
                temperature: parse_env("GEMINI_TEMPERATURE", DEFAULT_TEMPERATURE)?,
                top_k: parse_env("GEMINI_TOP_K", DEFAULT_TOP_K)?,
                top_p: parse_env("GEMINI_TOP_P", DEFAULT_TOP_P)?,
                max_output_tokens: parse_env("GEMINI_MAX_OUTPUT_TOKENS", DEFAULT_MAX_OUTPUT_TOKENS)?,
            },
        };

        Ok(CalculatorConfig {
            common: common_config,
            gemini,
            upload: UploadSettings {
                max_bytes: parse_env("UPLOAD_MAX_BYTES", DEFAULT_UPLOAD_MAX_BYTES)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_defaults_match_the_model_contract() {
        let generation = GenerationSettings::default();
        assert_eq!(generation.temperature, 1.0);
        assert_eq!(generation.top_k, 64);
        assert_eq!(generation.top_p, 0.95);
        assert_eq!(generation.max_output_tokens, 8192);
    }

    #[test]
    fn gemini_settings_default_to_sixty_second_timeout() {
        let settings = GeminiSettings::new(None);
        assert_eq!(settings.timeout, Duration::from_secs(60));
        assert_eq!(settings.model, "gemini-1.5-flash");
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn upload_limit_is_ten_mebibytes() {
        assert_eq!(UploadSettings::default().max_bytes, 10 * 1024 * 1024);
    }
}
