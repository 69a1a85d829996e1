//! Linux Specific OS interface
//!
//! Relies on `iproute2` (`ip`) and the ISC DHCP client (`dhclient`) being on the `PATH`

use crate::{cmd, cmd::CommandInvocation};

/// Relinquishes the current DHCP lease held on `device_name`
pub fn release_lease(device_name: &str) -> CommandInvocation {
    cmd!("dhclient", "-r", device_name)
}

/// Requests a fresh DHCP lease for `device_name`
pub fn acquire_lease(device_name: &str) -> CommandInvocation {
    cmd!("dhclient", device_name)
}

/// Removes every address bound to `device_name`
pub fn flush_addresses(device_name: &str) -> CommandInvocation {
    cmd!("ip", "addr", "flush", "dev", device_name)
}

/// Assigns an IP address to a network interface
///
/// # Arguments
/// * `device_name` - Name of network device (e.g. `eth0`, `enp0s3`, etc.)
/// * `ip` - address and prefix length (e.g. `192.168.10.50/24`), passed through untouched
pub fn assign_address(device_name: &str, ip: &str) -> CommandInvocation {
    cmd!("ip", "addr", "add", ip, "dev", device_name)
}

/// Brings `device_name` administratively up
pub fn link_up(device_name: &str) -> CommandInvocation {
    cmd!("ip", "link", "set", device_name, "up")
}

/// Lists the IPv4 addresses currently bound to `device_name`
pub fn show_addresses(device_name: &str) -> CommandInvocation {
    cmd!("ip", "-4", "addr", "show", device_name)
}
