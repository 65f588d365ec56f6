use crate::error::{AppError, Result};

pub const GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-flash-preview:generateContent";

pub const EBAY_SEARCH_URL: &str = "https://www.ebay.com/sch/i.html";
pub const AMAZON_SEARCH_URL: &str = "https://www.amazon.com/s";

/// Sent on listing probes. Marketplaces answer bot user agents with 403/503.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Timeout for auth, image and AI calls (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Timeout for a single marketplace listing probe (seconds).
pub const PROBE_TIMEOUT_SECS: u64 = 10;

/// Largest accepted request body. Phone photos sent as base64 run 3-7 MB.
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Largest image downloaded for `image_url`.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Coercion defaults applied when the model omits a field.
pub mod defaults {
    pub const SALES_TAX_RATE: f64 = 8.0;
    pub const FEE_PERCENTAGE: f64 = 15.0;
    pub const FEE_RATIO: f64 = 0.15;
    pub const PRODUCT_NAME: &str = "Unknown Product";
    pub const REASONING: &str = "No reasoning provided";
    pub const MARKET_PRICE_SOURCE: &str = "Market analysis";
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub api_port: u16,
    /// GEMINI_API_KEY. Checked per request so the server can boot without it.
    pub gemini_api_key: Option<String>,
    pub gemini_api_url: String,
    /// SUPABASE_URL, falling back to SUPABASE_PROJECT_URL.
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    /// Preferred over the anon key when verifying tokens.
    pub supabase_service_key: Option<String>,
    /// Run the permissive schema check on model replies (VALIDATE_SCHEMA)
    pub validate_schema: bool,
    /// Probe ebay/amazon listing URLs before returning them (PROBE_MARKETPLACE_URLS)
    pub probe_urls: bool,
    pub http_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub probe_user_agent: String,
    pub max_body_bytes: usize,
    pub max_image_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            gemini_api_key: env_opt("GEMINI_API_KEY"),
            gemini_api_url: env_opt("GEMINI_API_URL").unwrap_or_else(|| GEMINI_API_URL.to_string()),
            supabase_url: env_opt("SUPABASE_URL").or_else(|| env_opt("SUPABASE_PROJECT_URL")),
            supabase_anon_key: env_opt("SUPABASE_ANON_KEY"),
            supabase_service_key: env_opt("SUPABASE_SERVICE_ROLE_KEY"),
            validate_schema: env_flag("VALIDATE_SCHEMA", true)?,
            probe_urls: env_flag("PROBE_MARKETPLACE_URLS", true)?,
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(HTTP_TIMEOUT_SECS),
            probe_timeout_secs: std::env::var("PROBE_TIMEOUT_SECS")
                .unwrap_or_else(|_| PROBE_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(PROBE_TIMEOUT_SECS),
            probe_user_agent: env_opt("PROBE_USER_AGENT")
                .unwrap_or_else(|| BROWSER_USER_AGENT.to_string()),
            max_body_bytes: env_opt("MAX_BODY_BYTES")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(MAX_BODY_BYTES),
            max_image_bytes: env_opt("MAX_IMAGE_BYTES")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(MAX_IMAGE_BYTES),
        })
    }
}

/// Read an env var, treating unset and blank the same.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(key: &str, default: bool) -> Result<bool> {
    match env_opt(key) {
        None => Ok(default),
        Some(v) => parse_flag(&v)
            .ok_or_else(|| AppError::Config(format!("{key} must be true/false, got {v:?}"))),
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("on"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("No"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
