//! Source list configuration.
//!
//! The list is a JSON array, one entry per cache:
//!
//! ```json
//! [
//!   { "name": "steam", "url": "https://api.example.com/steam", "interval_secs": 900, "token_env": "STEAM_TOKEN" }
//! ]
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use lcp_core::constants::DEFAULT_REFRESH_INTERVAL;
use lcp_core::error::{LcpError, Result};

use crate::json::JsonSource;

/// Name reserved for the liveness route.
const RESERVED_NAMES: &[&str] = &["health", "metrics"];

/// Payload shape a source produces.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Any JSON document, cached and streamed as-is.
    #[default]
    Json,
    /// `AppleMusicCache`, streamed as its playlist summary.
    AppleMusic,
    /// Recently played `SteamGame`s.
    Steam,
    /// Pinned `GitHubRepository`s.
    Github,
}

/// One configured cache and where its data comes from.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    /// Cache name, used as the route segment and the snapshot file stem.
    pub name: String,
    /// Upstream URL returning a JSON document.
    pub url: String,
    /// Seconds between refreshes.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Environment variable holding an upstream bearer token.
    #[serde(default)]
    pub token_env: Option<String>,
    /// Payload shape.
    #[serde(default)]
    pub kind: SourceKind,
}

fn default_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL.as_secs()
}

impl SourceConfig {
    /// Wait between two refreshes.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Builds the source, resolving `token_env` from the environment.
    pub fn source(&self) -> Result<JsonSource> {
        let source = JsonSource::new(&self.url);
        match &self.token_env {
            None => Ok(source),
            Some(var) => std::env::var(var).map(|token| source.bearer(token)).map_err(|_| {
                LcpError::Config(format!("cache '{}': environment variable {var} is not set", self.name))
            }),
        }
    }

    /// Checks the name and the refresh interval.
    pub fn validate(&self) -> Result<()> {
        validate_cache_name(&self.name)?;
        if self.interval_secs == 0 {
            return Err(LcpError::Config(format!("cache '{}': interval_secs must be positive", self.name)));
        }
        Ok(())
    }
}

/// Checks `name` is usable as a route segment and a file stem.
pub fn validate_cache_name(name: &str) -> Result<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if name.is_empty() || !valid_chars {
        return Err(LcpError::Config(format!(
            "invalid cache name '{name}': use lowercase letters, digits, '-' or '_'"
        )));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(LcpError::Config(format!("cache name '{name}' is reserved")));
    }
    Ok(())
}

/// Parses and validates a source list.
pub fn parse_sources(json: &str) -> Result<Vec<SourceConfig>> {
    let sources: Vec<SourceConfig> =
        serde_json::from_str(json).map_err(|e| LcpError::Config(format!("invalid source list: {e}")))?;

    let mut seen = HashSet::new();
    for source in &sources {
        source.validate()?;
        if !seen.insert(source.name.as_str()) {
            return Err(LcpError::Config(format!("duplicate cache name '{}'", source.name)));
        }
    }
    Ok(sources)
}

/// Reads a source list from disk.
pub fn load_sources(path: impl AsRef<Path>) -> Result<Vec<SourceConfig>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .map_err(|e| LcpError::Config(format!("cannot read source list {}: {e}", path.display())))?;
    parse_sources(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_defaults() {
        let sources = parse_sources(r#"[{"name":"steam","url":"http://localhost/steam"}]"#).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].interval(), DEFAULT_REFRESH_INTERVAL);
        assert_eq!(sources[0].token_env, None);
        assert_eq!(sources[0].kind, SourceKind::Json);
    }

    #[test]
    fn test_parse_kind() {
        let sources =
            parse_sources(r#"[{"name":"apple_music","url":"http://localhost/am","kind":"apple_music"}]"#).unwrap();
        assert_eq!(sources[0].kind, SourceKind::AppleMusic);

        let typed = parse_sources(
            r#"[{"name":"steam","url":"http://x","kind":"steam"},{"name":"github","url":"http://y","kind":"github"}]"#,
        )
        .unwrap();
        assert_eq!(typed[0].kind, SourceKind::Steam);
        assert_eq!(typed[1].kind, SourceKind::Github);

        assert!(parse_sources(r#"[{"name":"x","url":"http://x","kind":"strava"}]"#).is_err());
    }

    #[test]
    fn test_rejects_bad_names() {
        for name in ["", "Steam", "a/b", "health", "metrics", "../x"] {
            let json = format!(r#"[{{"name":"{name}","url":"http://localhost"}}]"#);
            assert!(parse_sources(&json).is_err(), "accepted {name:?}");
        }
    }

    #[test]
    fn test_rejects_duplicates_and_zero_interval() {
        let dup = r#"[{"name":"a","url":"http://x"},{"name":"a","url":"http://y"}]"#;
        assert!(matches!(parse_sources(dup), Err(LcpError::Config(_))));

        let zero = r#"[{"name":"a","url":"http://x","interval_secs":0}]"#;
        assert!(parse_sources(zero).is_err());
    }

    #[test]
    fn test_missing_token_env() {
        let config = SourceConfig {
            name: "github".into(),
            url: "http://localhost".into(),
            interval_secs: 60,
            token_env: Some("LCP_TEST_TOKEN_THAT_IS_NEVER_SET".into()),
            kind: SourceKind::Json,
        };
        assert!(matches!(config.source(), Err(LcpError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"name":"apple_music","url":"http://localhost/am","interval_secs":30}}]"#).unwrap();

        let sources = load_sources(file.path()).unwrap();
        assert_eq!(sources[0].name, "apple_music");
        assert_eq!(sources[0].interval(), Duration::from_secs(30));

        assert!(load_sources("/nonexistent/sources.json").is_err());
    }
}
