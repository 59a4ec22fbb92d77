use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use intake_flow::{
    controller::DEFAULT_ACKNOWLEDGEMENT_DELAY, recommendation::DEFAULT_RECOMMENDATION_URL,
};
use tracing::warn;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Output shape of the tracing subscriber, picked with `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    /// `pretty` selects human-readable output; anything else, or nothing, is JSON.
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Service settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub recommendation_url: String,
    pub bind_addr: SocketAddr,
    pub acknowledgement_delay: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let recommendation_url = lookup("INTAKE_RECOMMENDATION_URL")
            .unwrap_or_else(|| DEFAULT_RECOMMENDATION_URL.to_string());

        let bind_addr = lookup("INTAKE_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .with_context(|| format!("INTAKE_BIND_ADDR is not a socket address: {bind_addr}"))?;

        let acknowledgement_delay = match lookup("INTAKE_ACK_DELAY_MS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(e) => {
                    warn!(value = %raw, error = %e, "Invalid INTAKE_ACK_DELAY_MS, using default");
                    DEFAULT_ACKNOWLEDGEMENT_DELAY
                }
            },
            None => DEFAULT_ACKNOWLEDGEMENT_DELAY,
        };

        Ok(Self {
            recommendation_url,
            bind_addr,
            acknowledgement_delay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.recommendation_url, DEFAULT_RECOMMENDATION_URL);
        assert_eq!(config.bind_addr, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.acknowledgement_delay, Duration::from_millis(1200));
    }

    #[test]
    fn test_overrides_and_bad_delay() {
        let config = Config::from_lookup(lookup(&[
            ("INTAKE_RECOMMENDATION_URL", "http://quotes.internal/api/insurance"),
            ("INTAKE_BIND_ADDR", "127.0.0.1:8080"),
            ("INTAKE_ACK_DELAY_MS", "soon"),
        ]))
        .unwrap();
        assert_eq!(
            config.recommendation_url,
            "http://quotes.internal/api/insurance"
        );
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.acknowledgement_delay, DEFAULT_ACKNOWLEDGEMENT_DELAY);
    }

    #[test]
    fn test_log_format_defaults_to_json() {
        assert_eq!(LogFormat::parse(None), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("verbose")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("pretty")), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(Some(" Pretty ")), LogFormat::Pretty);
    }

    #[test]
    fn test_bad_bind_addr_is_an_error() {
        assert!(Config::from_lookup(lookup(&[("INTAKE_BIND_ADDR", "localhost")])).is_err());
    }
}
