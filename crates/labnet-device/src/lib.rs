//! Labnet Device Library
//!
//! Switches a network interface between DHCP and manual addressing and pins the system resolver
//! to a known DNS server. Every operation is an external command or a file write; each step's
//! result is collected into a [`Report`] instead of being raised, so a caller sees exactly how
//! far a configuration attempt got.

pub mod cmd;
mod configurator;
#[cfg_attr(target_os = "linux", path = "os/linux.rs")]
#[cfg_attr(not(target_os = "linux"), path = "os/unsupported.rs")]
pub mod os;
mod resolver;


pub use cmd::{CommandInvocation, Runner, ShellCommand, ShellCommandError, SystemRunner};
pub use configurator::{
    Configurator, ConfiguratorBuilder, FailurePolicy, ManualAddress, Report, Step, StepOutcome,
    StepStatus,
};
pub use resolver::{Resolver, DEFAULT_RESOLV_CONF};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("interface name not set")]
    MissingInterface,

    #[error("interface name must not be empty")]
    EmptyInterfaceName,

    #[error("dns server not set")]
    MissingDnsServer,
}
