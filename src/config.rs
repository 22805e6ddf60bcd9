// Runtime configuration, read from the environment (and `.env` if present)

use std::str::FromStr;
use std::time::Duration;

use crate::api_client::NEOWS_BASE_URL;
use crate::error::{NeoError, NeoResult};

pub const DEFAULT_API_KEY: &str = "DEMO_KEY";
pub const DEFAULT_REFRESH_SECS: u64 = 300;
pub const DEFAULT_FRAME_MILLIS: u64 = 16;
pub const DEFAULT_CANVAS_SIZE: f64 = 600.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_key: String,
    pub feed_base_url: String,
    /// Period of the NEO feed re-poll
    pub refresh_interval: Duration,
    /// Target time between animation frames
    pub frame_interval: Duration,
    pub canvas_width: f64,
    pub canvas_height: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: DEFAULT_API_KEY.to_string(),
            feed_base_url: NEOWS_BASE_URL.to_string(),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            frame_interval: Duration::from_millis(DEFAULT_FRAME_MILLIS),
            canvas_width: DEFAULT_CANVAS_SIZE,
            canvas_height: DEFAULT_CANVAS_SIZE,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, raw: Option<String>, default: T) -> NeoResult<T> {
    match raw {
        None => Ok(default),
        Some(s) => s
            .trim()
            .parse()
            .map_err(|_| NeoError::Validation(format!("{} has an invalid value: {:?}", name, s))),
    }
}

impl Config {
    pub fn from_env() -> NeoResult<Self> {
        if dotenv::dotenv().is_ok() {
            tracing::debug!("Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> NeoResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let api_key = lookup("NASA_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .unwrap_or(defaults.api_key);
        let feed_base_url = lookup("NEO_FEED_BASE_URL").unwrap_or(defaults.feed_base_url);

        let refresh_secs: u64 =
            parse_var("NEO_REFRESH_SECS", lookup("NEO_REFRESH_SECS"), DEFAULT_REFRESH_SECS)?;
        let frame_millis: u64 =
            parse_var("NEO_FRAME_MILLIS", lookup("NEO_FRAME_MILLIS"), DEFAULT_FRAME_MILLIS)?;
        let canvas_width: f64 =
            parse_var("NEO_CANVAS_WIDTH", lookup("NEO_CANVAS_WIDTH"), DEFAULT_CANVAS_SIZE)?;
        let canvas_height: f64 =
            parse_var("NEO_CANVAS_HEIGHT", lookup("NEO_CANVAS_HEIGHT"), DEFAULT_CANVAS_SIZE)?;

        if refresh_secs == 0 {
            return Err(NeoError::Validation(
                "NEO_REFRESH_SECS must be at least 1".to_string(),
            ));
        }
        if frame_millis == 0 {
            return Err(NeoError::Validation(
                "NEO_FRAME_MILLIS must be at least 1".to_string(),
            ));
        }
        if !(canvas_width > 0.0 && canvas_height > 0.0)
            || !canvas_width.is_finite()
            || !canvas_height.is_finite()
        {
            return Err(NeoError::Validation(format!(
                "canvas size must be positive, got {}x{}",
                canvas_width, canvas_height
            )));
        }

        let config = Config {
            api_key,
            feed_base_url,
            refresh_interval: Duration::from_secs(refresh_secs),
            frame_interval: Duration::from_millis(frame_millis),
            canvas_width,
            canvas_height,
        };
        if config.api_key == DEFAULT_API_KEY {
            tracing::warn!("NASA_API_KEY not set, using the rate-limited DEMO_KEY");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.refresh_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("NASA_API_KEY", "abc123"),
            ("NEO_FEED_BASE_URL", "http://localhost:8080"),
            ("NEO_REFRESH_SECS", "60"),
            ("NEO_FRAME_MILLIS", "33"),
            ("NEO_CANVAS_WIDTH", "800"),
            ("NEO_CANVAS_HEIGHT", "400"),
        ]))
        .unwrap();

        assert_eq!(config.api_key, "abc123");
        assert_eq!(config.feed_base_url, "http://localhost:8080");
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.frame_interval, Duration::from_millis(33));
        assert_eq!(config.canvas_width, 800.0);
        assert_eq!(config.canvas_height, 400.0);
    }

    #[test]
    fn test_blank_api_key_falls_back() {
        let config = Config::from_lookup(lookup_from(&[("NASA_API_KEY", "  ")])).unwrap();
        assert_eq!(config.api_key, DEFAULT_API_KEY);
    }

    #[test]
    fn test_rejects_bad_values() {
        for (key, value) in [
            ("NEO_REFRESH_SECS", "soon"),
            ("NEO_REFRESH_SECS", "0"),
            ("NEO_FRAME_MILLIS", "0"),
            ("NEO_CANVAS_WIDTH", "-5"),
            ("NEO_CANVAS_HEIGHT", "NaN"),
        ] {
            let result = Config::from_lookup(lookup_from(&[(key, value)]));
            assert!(
                matches!(result, Err(NeoError::Validation(_))),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }
}
