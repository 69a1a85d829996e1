//! Privilege checks

use nix::unistd::geteuid;

/// True when running with an effective uid of 0
pub fn is_root() -> bool {
    geteuid().is_root()
}
