//! Labnet Config Format

use color_eyre::eyre;
use labnet_device::{FailurePolicy, DEFAULT_RESOLV_CONF};
use serde::Deserialize;
use std::{fs, net::Ipv4Addr, path::Path, path::PathBuf, time::Duration};

/// Interface configured when no config file overrides it
pub const DEFAULT_INTERFACE: &str = "enp0s3";

/// Lab DNS server
pub const DEFAULT_DNS: Ipv4Addr = Ipv4Addr::new(192, 168, 10, 2);

/// Endpoint fetched by the diagnostic probe (the lab proxy)
pub const DEFAULT_TEST_URL: &str = "http://www.deeznudd.local:8080";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Name of the network interface to configure
    pub interface: String,

    /// DNS server written into the resolver configuration
    pub dns: Ipv4Addr,

    /// Path of the resolver configuration file
    pub resolver: PathBuf,

    /// Keep going after a failed step instead of skipping the rest of the sequence
    pub continue_on_failure: bool,

    /// Settings for the diagnostic HTTP probe
    pub probe: ProbeConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// URL fetched after configuration completes
    pub url: String,

    /// Timeout (in seconds) covering connect, response and body read
    pub timeout: u64,

    /// Maximum number of body bytes shown
    pub preview_bytes: usize,

    /// How invalid UTF-8 in the body preview is handled
    pub decode: Decode,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Decode {
    /// Each invalid byte sequence becomes U+FFFD
    Replace,

    /// Invalid byte sequences are dropped
    Ignore,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            interface: DEFAULT_INTERFACE.into(),
            dns: DEFAULT_DNS,
            resolver: PathBuf::from(DEFAULT_RESOLV_CONF),
            continue_on_failure: true,
            probe: ProbeConfig::default(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_TEST_URL.into(),
            timeout: 5,
            preview_bytes: 2000,
            decode: Decode::Replace,
        }
    }
}

impl ClientConfig {
    /// Attempts to load and parse a configuration file
    ///
    /// Any field missing from the file keeps its built-in value.
    ///
    /// # Arguments
    /// * `path` - Path to the labnet configuration file
    pub fn load(path: impl AsRef<Path>) -> eyre::Result<ClientConfig> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> eyre::Result<ClientConfig> {
        let cfg: ClientConfig = toml::from_str(contents)?;
        if cfg.interface.trim().is_empty() {
            eyre::bail!("interface name must not be empty");
        }
        if cfg.probe.timeout == 0 {
            eyre::bail!("probe timeout must be at least one second");
        }
        Ok(cfg)
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        match self.continue_on_failure {
            true => FailurePolicy::Continue,
            false => FailurePolicy::Abort,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_keeps_builtin_values() {
        let cfg = ClientConfig::parse("").unwrap();
        assert_eq!(cfg, ClientConfig::default());
        assert_eq!(cfg.interface, "enp0s3");
        assert_eq!(cfg.dns, Ipv4Addr::new(192, 168, 10, 2));
        assert_eq!(cfg.probe.url, "http://www.deeznudd.local:8080");
        assert_eq!(cfg.probe.timeout(), Duration::from_secs(5));
        assert_eq!(cfg.probe.preview_bytes, 2000);
        assert_eq!(cfg.failure_policy(), FailurePolicy::Continue);
    }

    #[test]
    fn partial_override() {
        let cfg = ClientConfig::parse(
            r#"
            interface = "eth1"
            continue_on_failure = false

            [probe]
            url = "http://10.0.0.1/"
            decode = "ignore"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.interface, "eth1");
        assert_eq!(cfg.dns, DEFAULT_DNS);
        assert_eq!(cfg.failure_policy(), FailurePolicy::Abort);
        assert_eq!(cfg.probe.url, "http://10.0.0.1/");
        assert_eq!(cfg.probe.decode, Decode::Ignore);
        assert_eq!(cfg.probe.timeout, 5);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ClientConfig::parse(r#"interface = """#).is_err());
        assert!(ClientConfig::parse("dns = \"not-an-ip\"").is_err());
        assert!(ClientConfig::parse("[probe]\ntimeout = 0").is_err());
        assert!(ClientConfig::parse("iface = \"eth0\"").is_err());
    }
}
