//! System resolver configuration

use std::{
    fs, io,
    net::Ipv4Addr,
    path::{Path, PathBuf},
};

/// Default location of the resolver configuration read by the system's name-resolution library
pub const DEFAULT_RESOLV_CONF: &str = "/etc/resolv.conf";

/// Writes the resolver configuration file
#[derive(Clone, Debug)]
pub struct Resolver {
    path: PathBuf,
}

impl Resolver {
    /// Returns a resolver that manages the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the entire resolver configuration with a single nameserver entry
    ///
    /// The file is truncated before writing, so any previously configured resolvers are lost.
    ///
    /// # Arguments
    /// * `server` - Address of the DNS server to use
    pub fn set_nameserver(&self, server: Ipv4Addr) -> io::Result<()> {
        tracing::debug!(path = ?self.path, %server, "overwriting resolver configuration");
        fs::write(&self.path, Self::render(server))
    }

    fn render(server: Ipv4Addr) -> String {
        format!("nameserver {}\n", server)
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLV_CONF)
    }
}
