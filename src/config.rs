use once_cell::sync::Lazy;

/// Secret used for JWT signing. Must be set via the `JWT_SECRET` env variable.
pub static JWT_SECRET: Lazy<String> =
    Lazy::new(|| std::env::var("JWT_SECRET").expect("JWT_SECRET must be set"));

/// Address the HTTP server should bind to. Defaults to `0.0.0.0`.
pub static BIND_ADDRESS: Lazy<String> =
    Lazy::new(|| std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string()));

/// Port the HTTP server should listen on. Defaults to `3000`.
pub static BIND_PORT: Lazy<u16> = Lazy::new(|| {
    std::env::var("BIND_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3000)
});

/// When set to a truthy value, allows the application to continue running even if database
/// migrations fail. Defaults to `false`.
pub static ALLOW_MIGRATION_FAILURE: Lazy<bool> = Lazy::new(|| {
    std::env::var("ALLOW_MIGRATION_FAILURE")
        .ok()
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes")
        })
        .unwrap_or(false)
});

/// Length of the trial window opened at registration, in days.
pub static TRIAL_PERIOD_DAYS: Lazy<i64> = Lazy::new(|| {
    std::env::var("TRIAL_PERIOD_DAYS")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(14)
});

/// Cadence of the lapsed-trial reconciliation sweep.
pub static TRIAL_SWEEP_INTERVAL_SECS: Lazy<u64> = Lazy::new(|| {
    std::env::var("TRIAL_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(300)
});

/// Base URL of the external completion provider.
pub static COMPLETION_API_BASE: Lazy<String> = Lazy::new(|| {
    std::env::var("COMPLETION_API_BASE")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "https://api.openai.com".to_string())
});

/// API key presented to the completion provider.
pub static COMPLETION_API_KEY: Lazy<Option<String>> =
    Lazy::new(|| read_optional_env("COMPLETION_API_KEY"));

/// Model requested for chat, prompt and decode completions.
pub static COMPLETION_MODEL: Lazy<String> = Lazy::new(|| {
    std::env::var("COMPLETION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string())
});

/// Model requested for voice synthesis.
pub static COMPLETION_SPEECH_MODEL: Lazy<String> = Lazy::new(|| {
    std::env::var("COMPLETION_SPEECH_MODEL").unwrap_or_else(|_| "tts-1".to_string())
});

/// Voice preset used for synthesized responses.
pub static COMPLETION_VOICE: Lazy<String> =
    Lazy::new(|| std::env::var("COMPLETION_VOICE").unwrap_or_else(|_| "alloy".to_string()));

/// Timeout for calls to the completion provider, in seconds.
pub static COMPLETION_TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| {
    std::env::var("COMPLETION_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(60)
});

/// Shared secret used to verify billing webhook signatures.
pub static BILLING_WEBHOOK_SECRET: Lazy<Option<String>> =
    Lazy::new(|| read_optional_env("BILLING_WEBHOOK_SECRET"));

fn read_optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
