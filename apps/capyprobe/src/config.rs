//! Probe configuration.
//!
//! Read from the TOML file named by `CAPYPROBE_CONFIG` when set, then
//! overridden field by field from `CAPYPROBE_*` environment variables.
//! Built once at startup and never mutated afterwards.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use capyprobe_load::{HarnessConfig, SessionConfig};
use capyprobe_transfer::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};

/// Environment variable naming the optional TOML config file.
pub const CONFIG_ENV: &str = "CAPYPROBE_CONFIG";

/// Smallest accepted non-zero chunk size. Keeps the chunk plan of a large
/// payload from growing to millions of spans.
pub const MIN_CHUNK_SIZE: u64 = 64 * 1024;

/// Probe configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Scheme and host of the upload API, e.g. `http://10.0.0.5:8080`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path prefix of the multipart upload endpoints.
    #[serde(default = "default_upload_path")]
    pub upload_path: String,

    /// Bearer token sent with every request.
    #[serde(default = "default_token")]
    pub token: String,

    /// Bytes per chunk (0 = default 5 MiB).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Number of simulated users.
    #[serde(default = "default_num_users")]
    pub num_users: usize,

    /// Chance that a chunk attempt is interrupted before sending.
    #[serde(default = "default_interruption_probability")]
    pub interruption_probability: f64,

    /// Payload file every user uploads. Generated if missing.
    #[serde(default = "default_payload_path")]
    pub payload_path: PathBuf,

    /// Size of a generated payload in bytes.
    #[serde(default = "default_payload_size")]
    pub payload_size: u64,

    /// Retries after consecutive transport errors on one chunk.
    #[serde(default = "default_max_transport_retries")]
    pub max_transport_retries: u32,

    /// Resumes after consecutive simulated interruptions on one chunk.
    #[serde(default = "default_max_interruptions")]
    pub max_interruptions: u32,

    /// Delay between session starts in milliseconds.
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Deadline for one whole session in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".into()
}

fn default_upload_path() -> String {
    "/api/upload/multipartUpload".into()
}

fn default_token() -> String {
    "test_token".into()
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_num_users() -> usize {
    10
}

fn default_interruption_probability() -> f64 {
    0.3
}

fn default_payload_path() -> PathBuf {
    PathBuf::from("large_file_100mb.bin")
}

fn default_payload_size() -> u64 {
    100 * 1024 * 1024
}

fn default_max_transport_retries() -> u32 {
    5
}

fn default_max_interruptions() -> u32 {
    50
}

fn default_stagger_ms() -> u64 {
    500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            upload_path: default_upload_path(),
            token: default_token(),
            chunk_size: default_chunk_size(),
            num_users: default_num_users(),
            interruption_probability: default_interruption_probability(),
            payload_path: default_payload_path(),
            payload_size: default_payload_size(),
            max_transport_retries: default_max_transport_retries(),
            max_interruptions: default_max_interruptions(),
            stagger_ms: default_stagger_ms(),
            request_timeout_secs: None,
            session_timeout_secs: None,
        }
    }
}

impl Config {
    /// Loads the file named by `CAPYPROBE_CONFIG` (if any), applies
    /// environment overrides and validates the result.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "config file loaded");
        Ok(config)
    }

    /// Overrides fields from `CAPYPROBE_*` variables returned by `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(v) = lookup("CAPYPROBE_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("CAPYPROBE_UPLOAD_PATH") {
            self.upload_path = v;
        }
        if let Some(v) = lookup("CAPYPROBE_TOKEN") {
            self.token = v;
        }
        if let Some(v) = lookup("CAPYPROBE_PAYLOAD_PATH") {
            self.payload_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CAPYPROBE_CHUNK_SIZE") {
            self.chunk_size = parse_var("CAPYPROBE_CHUNK_SIZE", &v)?;
        }
        if let Some(v) = lookup("CAPYPROBE_NUM_USERS") {
            self.num_users = parse_var("CAPYPROBE_NUM_USERS", &v)?;
        }
        if let Some(v) = lookup("CAPYPROBE_INTERRUPTION_PROBABILITY") {
            self.interruption_probability = parse_var("CAPYPROBE_INTERRUPTION_PROBABILITY", &v)?;
        }
        if let Some(v) = lookup("CAPYPROBE_PAYLOAD_SIZE") {
            self.payload_size = parse_var("CAPYPROBE_PAYLOAD_SIZE", &v)?;
        }
        if let Some(v) = lookup("CAPYPROBE_MAX_TRANSPORT_RETRIES") {
            self.max_transport_retries = parse_var("CAPYPROBE_MAX_TRANSPORT_RETRIES", &v)?;
        }
        if let Some(v) = lookup("CAPYPROBE_MAX_INTERRUPTIONS") {
            self.max_interruptions = parse_var("CAPYPROBE_MAX_INTERRUPTIONS", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.trim().is_empty() {
            bail!("base_url must not be empty");
        }
        if self.num_users == 0 {
            bail!("num_users must be at least 1");
        }
        if self.chunk_size != 0 && self.chunk_size < MIN_CHUNK_SIZE {
            bail!(
                "chunk_size must be 0 (default) or at least {MIN_CHUNK_SIZE} bytes, got {}",
                self.chunk_size
            );
        }
        if !(0.0..=1.0).contains(&self.interruption_probability) {
            bail!(
                "interruption_probability must be within [0, 1], got {}",
                self.interruption_probability
            );
        }
        Ok(())
    }

    /// Full upload API prefix: `<base_url><upload_path>`.
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim().trim_end_matches('/');
        let path = self.upload_path.trim();
        if path.is_empty() || path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Harness settings derived from this config.
    pub fn harness_config(&self) -> HarnessConfig {
        HarnessConfig {
            num_users: self.num_users,
            stagger: Duration::from_millis(self.stagger_ms),
            session: SessionConfig {
                chunk_size: self.chunk_size,
                max_transport_retries: self.max_transport_retries,
                max_interruptions: self.max_interruptions,
                session_timeout: self.session_timeout_secs.map(Duration::from_secs),
                ..SessionConfig::default()
            },
            ..HarnessConfig::default()
        }
    }
}

fn parse_var<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("invalid value for {key}: {raw:?}"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.chunk_size, 5 * 1024 * 1024);
        assert_eq!(config.num_users, 10);
        assert!((config.interruption_probability - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.payload_path, PathBuf::from("large_file_100mb.bin"));
        assert_eq!(config.payload_size, 100 * 1024 * 1024);
        assert_eq!(config.upload_path, "/api/upload/multipartUpload");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            base_url = "http://uploads.test"
            num_users = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://uploads.test");
        assert_eq!(config.num_users, 3);
        assert_eq!(config.token, "test_token");
        assert_eq!(config.max_transport_retries, 5);
        assert!(config.session_timeout_secs.is_none());
    }

    #[test]
    fn toml_roundtrip() {
        let config = Config {
            token: "secret".into(),
            session_timeout_secs: Some(600),
            ..Config::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn from_file_reads_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("probe.toml");
        std::fs::write(&path, "chunk_size = 1024\ninterruption_probability = 0.0\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.interruption_probability, 0.0);
    }

    #[test]
    fn from_file_missing_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Config::from_file(&tmp.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("CAPYPROBE_BASE_URL", "http://10.0.0.5"),
                ("CAPYPROBE_TOKEN", "abc"),
                ("CAPYPROBE_NUM_USERS", "25"),
                ("CAPYPROBE_INTERRUPTION_PROBABILITY", "0.75"),
                ("CAPYPROBE_CHUNK_SIZE", " 4096 "),
                ("CAPYPROBE_PAYLOAD_PATH", "/tmp/payload.bin"),
                ("CAPYPROBE_PAYLOAD_SIZE", "1000"),
                ("CAPYPROBE_MAX_TRANSPORT_RETRIES", "2"),
                ("CAPYPROBE_MAX_INTERRUPTIONS", "7"),
            ]))
            .unwrap();

        assert_eq!(config.base_url, "http://10.0.0.5");
        assert_eq!(config.token, "abc");
        assert_eq!(config.num_users, 25);
        assert!((config.interruption_probability - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.payload_path, PathBuf::from("/tmp/payload.bin"));
        assert_eq!(config.payload_size, 1000);
        assert_eq!(config.max_transport_retries, 2);
        assert_eq!(config.max_interruptions, 7);
        assert_eq!(config.upload_path, "/api/upload/multipartUpload");
    }

    #[test]
    fn bad_env_value_is_error() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(env(&[("CAPYPROBE_NUM_USERS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("CAPYPROBE_NUM_USERS"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let zero_users = Config {
            num_users: 0,
            ..Config::default()
        };
        assert!(zero_users.validate().is_err());

        let bad_probability = Config {
            interruption_probability: 1.5,
            ..Config::default()
        };
        assert!(bad_probability.validate().is_err());

        let nan_probability = Config {
            interruption_probability: f64::NAN,
            ..Config::default()
        };
        assert!(nan_probability.validate().is_err());

        let no_url = Config {
            base_url: "  ".into(),
            ..Config::default()
        };
        assert!(no_url.validate().is_err());
    }

    #[test]
    fn validation_bounds_chunk_size() {
        let tiny = Config {
            chunk_size: 1,
            ..Config::default()
        };
        let err = tiny.validate().unwrap_err();
        assert!(err.to_string().contains("chunk_size"));

        let just_below = Config {
            chunk_size: MIN_CHUNK_SIZE - 1,
            ..Config::default()
        };
        assert!(just_below.validate().is_err());

        for chunk_size in [0, MIN_CHUNK_SIZE, DEFAULT_CHUNK_SIZE] {
            let config = Config {
                chunk_size,
                ..Config::default()
            };
            assert!(config.validate().is_ok(), "chunk_size {chunk_size}");
        }
    }

    #[test]
    fn endpoint_joins_base_and_path() {
        let config = Config {
            base_url: "http://uploads.test/".into(),
            ..Config::default()
        };
        assert_eq!(
            config.endpoint(),
            "http://uploads.test/api/upload/multipartUpload"
        );

        let config = Config {
            upload_path: "upload".into(),
            ..config
        };
        assert_eq!(config.endpoint(), "http://uploads.test/upload");
    }

    #[test]
    fn harness_config_carries_settings() {
        let config = Config {
            num_users: 4,
            chunk_size: 2048,
            stagger_ms: 100,
            max_transport_retries: 1,
            max_interruptions: 4,
            session_timeout_secs: Some(30),
            ..Config::default()
        };
        let harness = config.harness_config();
        assert_eq!(harness.num_users, 4);
        assert_eq!(harness.stagger, Duration::from_millis(100));
        assert_eq!(harness.session.chunk_size, 2048);
        assert_eq!(harness.session.max_transport_retries, 1);
        assert_eq!(harness.session.max_interruptions, 4);
        assert_eq!(harness.session.session_timeout, Some(Duration::from_secs(30)));
        assert_eq!(harness.object_name(1), "large_file_user_1.bin");
    }
}
