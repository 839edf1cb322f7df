use std::path::PathBuf;

pub const DEFAULT_TICK_MS: u64 = 10;
pub const DEFAULT_POLL_MS: u64 = 250;
pub const DEFAULT_STORE: &str = "lapwatch.json";

const ENV_TICK_MS: &str = "LAPWATCH_TICK_MS";
const ENV_POLL_MS: &str = "LAPWATCH_POLL_MS";
const ENV_STORE: &str = "LAPWATCH_STORE";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Period of the display tick while running.
    pub tick_interval_ms: u64,
    /// How often the native binary checks the store for other writers.
    pub poll_interval_ms: u64,
    pub store_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_MS,
            poll_interval_ms: DEFAULT_POLL_MS,
            store_path: PathBuf::from(DEFAULT_STORE),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Unset or invalid values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(ms) = millis(&lookup, ENV_TICK_MS) {
            config.tick_interval_ms = ms;
        }
        if let Some(ms) = millis(&lookup, ENV_POLL_MS) {
            config.poll_interval_ms = ms;
        }
        if let Some(path) = lookup(ENV_STORE).filter(|p| !p.trim().is_empty()) {
            config.store_path = PathBuf::from(path);
        }
        config
    }
}

fn millis(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<u64> {
    let raw = lookup(name)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(ms),
        _ => {
            log::warn!("ignoring {}={:?}, expected milliseconds > 0", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config, Config::default());
        assert_eq!(config.tick_interval_ms, 10);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("LAPWATCH_TICK_MS", "50"),
            ("LAPWATCH_POLL_MS", " 1000 "),
            ("LAPWATCH_STORE", "/tmp/sw.json"),
        ]));
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.store_path, PathBuf::from("/tmp/sw.json"));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("LAPWATCH_TICK_MS", "0"),
            ("LAPWATCH_POLL_MS", "fast"),
            ("LAPWATCH_STORE", "  "),
        ]));
        assert_eq!(config, Config::default());
    }
}
