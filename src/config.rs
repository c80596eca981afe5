use std::str::FromStr;

use crate::limits::{
    DEFAULT_BOOKING_MINUTES, MAX_BOOKING_MINUTES, MAX_LOOKBACK_MINUTES, MIN_LOOKBACK_MINUTES,
};
use crate::time::DEFAULT_BUSINESS_TZ;

pub const ENV_PREFIX: &str = "DRIVESCHED_";

/// Knobs the validation engine reads on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub business_tz: String,
    /// Length of one teaching block; also the duration assumed for a
    /// candidate that does not state one.
    pub slot_minutes: u32,
    /// How far before the candidate end existing bookings are fetched.
    /// Never below `MIN_LOOKBACK_MINUTES`.
    pub lookback_minutes: u32,
    /// Duration assumed for a stored booking without one.
    pub default_booking_minutes: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            business_tz: DEFAULT_BUSINESS_TZ.to_string(),
            slot_minutes: 90,
            lookback_minutes: MIN_LOOKBACK_MINUTES,
            default_booking_minutes: DEFAULT_BOOKING_MINUTES,
        }
    }
}

/// Process configuration for the service binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub bind: String,
    pub metrics_port: Option<u16>,
    pub max_connections: usize,
    /// How long shutdown waits for open connections.
    pub drain_timeout_secs: u64,
    pub engine: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5480,
            bind: "0.0.0.0".to_string(),
            metrics_port: None,
            max_connections: 256,
            drain_timeout_secs: 10,
            engine: EngineConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    /// Build from a key → value lookup (keys without the prefix).
    /// Missing or unparseable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let engine_defaults = defaults.engine.clone();

        let engine = EngineConfig {
            business_tz: lookup("BUSINESS_TZ")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(engine_defaults.business_tz),
            slot_minutes: parsed(&lookup, "SLOT_MINUTES")
                .filter(|m| (1..=MAX_BOOKING_MINUTES).contains(m))
                .unwrap_or(engine_defaults.slot_minutes),
            lookback_minutes: parsed::<u32>(&lookup, "LOOKBACK_MINUTES")
                .map(|m| m.clamp(MIN_LOOKBACK_MINUTES, MAX_LOOKBACK_MINUTES))
                .unwrap_or(engine_defaults.lookback_minutes),
            default_booking_minutes: parsed(&lookup, "DEFAULT_BOOKING_MINUTES")
                .filter(|m| (1..=MAX_BOOKING_MINUTES).contains(m))
                .unwrap_or(engine_defaults.default_booking_minutes),
        };

        Self {
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            bind: lookup("BIND").unwrap_or(defaults.bind),
            metrics_port: parsed(&lookup, "METRICS_PORT"),
            max_connections: parsed(&lookup, "MAX_CONNECTIONS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_connections),
            drain_timeout_secs: parsed(&lookup, "DRAIN_TIMEOUT_SECS").unwrap_or(defaults.drain_timeout_secs),
            engine,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_nothing_set() {
        let c = from_pairs(&[]);
        assert_eq!(c, Config::default());
        assert_eq!(c.addr(), "0.0.0.0:5480");
        assert_eq!(c.engine.business_tz, "Europe/Chisinau");
        assert_eq!(c.engine.slot_minutes, 90);
        assert_eq!(c.engine.lookback_minutes, MIN_LOOKBACK_MINUTES);
        assert_eq!(c.drain_timeout_secs, 10);
        assert_eq!(c.metrics_port, None);
    }

    #[test]
    fn values_are_read() {
        let c = from_pairs(&[
            ("PORT", "6000"),
            ("BIND", "127.0.0.1"),
            ("METRICS_PORT", "9100"),
            ("MAX_CONNECTIONS", "8"),
            ("BUSINESS_TZ", "Europe/Bucharest"),
            ("SLOT_MINUTES", "60"),
            ("LOOKBACK_MINUTES", "2880"),
            ("DRAIN_TIMEOUT_SECS", "30"),
            ("DEFAULT_BOOKING_MINUTES", "45"),
        ]);
        assert_eq!(c.addr(), "127.0.0.1:6000");
        assert_eq!(c.metrics_port, Some(9100));
        assert_eq!(c.max_connections, 8);
        assert_eq!(c.engine.business_tz, "Europe/Bucharest");
        assert_eq!(c.engine.slot_minutes, 60);
        assert_eq!(c.engine.lookback_minutes, 2880);
        assert_eq!(c.drain_timeout_secs, 30);
        assert_eq!(c.engine.default_booking_minutes, 45);
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let c = from_pairs(&[
            ("PORT", "not-a-port"),
            ("MAX_CONNECTIONS", "0"),
            ("SLOT_MINUTES", "0"),
            ("BUSINESS_TZ", "   "),
        ]);
        assert_eq!(c.port, 5480);
        assert_eq!(c.max_connections, 256);
        assert_eq!(c.engine.slot_minutes, 90);
        assert_eq!(c.engine.business_tz, "Europe/Chisinau");
    }

    #[test]
    fn lookback_is_capped() {
        let c = from_pairs(&[("LOOKBACK_MINUTES", "999999")]);
        assert_eq!(c.engine.lookback_minutes, MAX_LOOKBACK_MINUTES);
    }

    #[test]
    fn lookback_never_shorter_than_longest_booking() {
        for raw in ["0", "720", "1440"] {
            let c = from_pairs(&[("LOOKBACK_MINUTES", raw)]);
            assert_eq!(c.engine.lookback_minutes, MIN_LOOKBACK_MINUTES, "{raw}");
        }
        assert!(EngineConfig::default().lookback_minutes > MAX_BOOKING_MINUTES);
    }
}
