use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration as StdDuration;
use time::Duration;
use tracing::{info, warn};
use shared::election::{ElectionConfig, ElectionConfigError};

const DEFAULT_ELECTION: &str = include_str!("../election.json");
const DEFAULT_MAIL_FROM: &str = "Voting System <onboarding@resend.dev>";
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub resend_api_key: Option<String>,
    pub mail_from: String,
    pub vote_url: Option<String>,
    pub admin_token: Option<String>,
    pub allowed_origin: String,
    pub otp_ttl: Duration,
    pub batch_max_consecutive_failures: usize,
    pub batch_send_delay: StdDuration,
    pub election: ElectionConfig,
}

impl AppConfig {
    /// Builds the configuration from any key/value source, e.g. the Shuttle
    /// secret store. Missing or unparsable tunables fall back to defaults;
    /// a broken election definition is fatal.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ElectionConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let election = match get("ELECTION_CONFIG") {
            Some(raw) => ElectionConfig::from_json(&raw)?,
            None => ElectionConfig::from_json(DEFAULT_ELECTION)?,
        };

        let otp_ttl_minutes: i64 = parse_or(get("OTP_TTL_MINUTES"), "OTP_TTL_MINUTES", 10);
        let send_delay_ms: u64 = parse_or(get("BATCH_SEND_DELAY_MS"), "BATCH_SEND_DELAY_MS", 2000);

        Ok(Self {
            resend_api_key: get("RESEND_API_KEY"),
            mail_from: get("MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
            vote_url: get("VOTE_URL"),
            admin_token: get("ADMIN_TOKEN"),
            allowed_origin: get("ALLOWED_ORIGIN").unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_string()),
            otp_ttl: Duration::minutes(otp_ttl_minutes.max(1)),
            batch_max_consecutive_failures: parse_or(
                get("BATCH_MAX_CONSECUTIVE_FAILURES"),
                "BATCH_MAX_CONSECUTIVE_FAILURES",
                5,
            ),
            batch_send_delay: StdDuration::from_millis(send_delay_ms),
            election,
        })
    }

    /// Defaults only; what tests and local runs start from.
    pub fn local() -> Result<Self, ElectionConfigError> {
        Self::from_lookup(|_| None)
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match value {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
        None => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}
