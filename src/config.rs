use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use url::Url;

pub const BACKEND_URL_VAR: &str = "MUSICGEN_BACKEND_URL";
pub const LISTEN_ADDR_VAR: &str = "MUSICGEN_LISTEN_ADDR";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the generation backend; the `/api/...` paths are joined onto it.
    pub backend_url: Url,
    /// Where the local studio page is served.
    pub listen_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: Url::parse("http://127.0.0.1:8000/").expect("static URL is valid"),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 21296)),
        }
    }
}

impl Config {
    /// Defaults, overridden by `MUSICGEN_BACKEND_URL` / `MUSICGEN_LISTEN_ADDR` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(BACKEND_URL_VAR).filter(|v| !v.trim().is_empty()) {
            config.backend_url = Url::parse(raw.trim())
                .with_context(|| format!("{} is not a valid URL: {}", BACKEND_URL_VAR, raw))?;
        }
        if let Some(raw) = lookup(LISTEN_ADDR_VAR).filter(|v| !v.trim().is_empty()) {
            config.listen_addr = raw
                .trim()
                .parse()
                .with_context(|| format!("{} is not a socket address: {}", LISTEN_ADDR_VAR, raw))?;
        }

        Ok(config)
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
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_overrides() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.backend_url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(config.listen_addr.port(), 21296);
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_lookup(lookup(&[
            (BACKEND_URL_VAR, "http://music.local:9000/"),
            (LISTEN_ADDR_VAR, "0.0.0.0:8080"),
        ]))
        .unwrap();
        assert_eq!(config.backend_url.as_str(), "http://music.local:9000/");
        assert_eq!(config.listen_addr.to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(Config::from_lookup(lookup(&[(BACKEND_URL_VAR, "not a url")])).is_err());
        assert!(Config::from_lookup(lookup(&[(LISTEN_ADDR_VAR, "localhost")])).is_err());
    }
}
