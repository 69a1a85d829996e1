//! Interface configuration sequencer

use crate::{
    cmd::{CommandInvocation, Runner},
    os,
    resolver::Resolver,
    Error,
};
use ipnetwork::{IpNetwork, IpNetworkError};
use std::{fmt, net::Ipv4Addr};

/// A single operation performed while configuring an interface
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    WriteResolver,
    ReleaseLease,
    AcquireLease,
    FlushAddresses,
    AssignAddress,
    LinkUp,
    ShowAddresses,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::WriteResolver => "set dns resolver",
            Step::ReleaseLease => "release dhcp lease",
            Step::AcquireLease => "acquire dhcp lease",
            Step::FlushAddresses => "flush addresses",
            Step::AssignAddress => "assign address",
            Step::LinkUp => "bring link up",
            Step::ShowAddresses => "show addresses",
        };
        f.write_str(name)
    }
}

/// What happened when a step was attempted
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepStatus {
    /// Step completed; `output` holds anything the command printed to stdout
    Succeeded { output: String },

    /// Step ran (or tried to) and failed
    Failed { code: Option<i32>, message: String },

    /// Step was never attempted because an earlier step failed under [`FailurePolicy::Abort`]
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: Step,

    /// Command that was (or would have been) run; `None` for the resolver write
    pub invocation: Option<CommandInvocation>,

    pub status: StepStatus,
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, StepStatus::Succeeded { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, StepStatus::Failed { .. })
    }
}

/// How the sequencer reacts to a failed step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Attempt every step regardless of earlier failures
    Continue,

    /// Stop at the first failure, recording the remaining steps as skipped
    Abort,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Continue
    }
}

/// Ordered outcomes of one configuration sequence
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    outcomes: Vec<StepOutcome>,
}

impl Report {
    pub fn outcomes(&self) -> &[StepOutcome] {
        &self.outcomes
    }

    /// Returns the steps in the order they were recorded
    pub fn steps(&self) -> Vec<Step> {
        self.outcomes.iter().map(|o| o.step).collect()
    }

    /// True if every step succeeded
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(StepOutcome::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// Output of the final address listing, if that step ran successfully
    pub fn address_listing(&self) -> Option<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.step == Step::ShowAddresses)
            .find_map(|o| match &o.status {
                StepStatus::Succeeded { output } => Some(output.as_str()),
                _ => None,
            })
    }
}

/// User supplied interface address in `IP/prefix` form
///
/// The value is not validated; a malformed address is handed to the OS as-is and fails there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManualAddress(String);

impl ManualAddress {
    pub fn new(address: impl AsRef<str>) -> Self {
        Self(address.as_ref().trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Attempts to interpret the address as CIDR notation
    pub fn as_network(&self) -> Result<IpNetwork, IpNetworkError> {
        self.0.parse()
    }
}

impl fmt::Display for ManualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Applies DHCP or manual addressing to a single interface
pub struct Configurator<R> {
    /// Name of the interface to configure (e.g. `enp0s3`)
    interface: String,

    /// DNS server written into the resolver configuration
    dns: Ipv4Addr,

    resolver: Resolver,

    policy: FailurePolicy,

    runner: R,
}

pub struct ConfiguratorBuilder {
    interface: Option<String>,
    dns: Option<Ipv4Addr>,
    resolver: Resolver,
    policy: FailurePolicy,
}

/// Running state of one sequence
struct Sequence<'a, R> {
    runner: &'a mut R,
    policy: FailurePolicy,
    report: Report,
    aborted: bool,
}

impl<'a, R: Runner> Sequence<'a, R> {
    fn new(runner: &'a mut R, policy: FailurePolicy) -> Self {
        Self {
            runner,
            policy,
            report: Report::default(),
            aborted: false,
        }
    }

    fn record(&mut self, step: Step, invocation: Option<CommandInvocation>, status: StepStatus) {
        if let StepStatus::Failed { code, message } = &status {
            tracing::warn!(%step, ?code, "step failed: {}", message);
            if self.policy == FailurePolicy::Abort {
                self.aborted = true;
            }
        }

        self.report.outcomes.push(StepOutcome {
            step,
            invocation,
            status,
        });
    }

    fn command(&mut self, step: Step, invocation: CommandInvocation) {
        if self.aborted {
            return self.record(step, Some(invocation), StepStatus::Skipped);
        }

        tracing::info!("$ {}", invocation);
        let status = match self.runner.run(&invocation) {
            Ok(output) => StepStatus::Succeeded { output },
            Err(error) => StepStatus::Failed {
                code: error.code(),
                message: error.to_string(),
            },
        };

        self.record(step, Some(invocation), status);
    }

    fn resolver(&mut self, resolver: &Resolver, dns: Ipv4Addr) {
        if self.aborted {
            return self.record(Step::WriteResolver, None, StepStatus::Skipped);
        }

        tracing::info!("-> set dns to {}", dns);
        let status = match resolver.set_nameserver(dns) {
            Ok(()) => StepStatus::Succeeded {
                output: String::new(),
            },
            Err(error) => StepStatus::Failed {
                code: None,
                message: format!("failed to write {}: {}", resolver.path().display(), error),
            },
        };

        self.record(Step::WriteResolver, None, status);
    }

    fn finish(self) -> Report {
        self.report
    }
}

impl Configurator<()> {
    /// Builds a new configurator
    pub fn builder() -> ConfiguratorBuilder {
        ConfiguratorBuilder::default()
    }
}

impl<R: Runner> Configurator<R> {
    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn dns(&self) -> Ipv4Addr {
        self.dns
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Obtains an address for the interface from a DHCP server
    ///
    /// Writes the resolver configuration, releases any existing lease, acquires a new one and
    /// then lists the resulting IPv4 addresses.
    pub fn configure_dhcp(&mut self) -> Report {
        tracing::info!(interface = %self.interface, "configuring interface via dhcp");

        let mut seq = Sequence::new(&mut self.runner, self.policy);
        seq.resolver(&self.resolver, self.dns);
        seq.command(Step::ReleaseLease, os::release_lease(&self.interface));
        seq.command(Step::AcquireLease, os::acquire_lease(&self.interface));
        seq.command(Step::ShowAddresses, os::show_addresses(&self.interface));
        seq.finish()
    }

    /// Assigns a static address to the interface
    ///
    /// Flushes existing addresses, adds `address`, brings the link up, writes the resolver
    /// configuration and then lists the resulting IPv4 addresses.
    ///
    /// # Arguments
    /// * `address` - Address and prefix length to assign (e.g. `192.168.10.50/24`)
    pub fn configure_manual(&mut self, address: &ManualAddress) -> Report {
        tracing::info!(interface = %self.interface, %address, "configuring interface manually");

        let mut seq = Sequence::new(&mut self.runner, self.policy);
        seq.command(Step::FlushAddresses, os::flush_addresses(&self.interface));
        seq.command(
            Step::AssignAddress,
            os::assign_address(&self.interface, address.as_str()),
        );
        seq.command(Step::LinkUp, os::link_up(&self.interface));
        seq.resolver(&self.resolver, self.dns);
        seq.command(Step::ShowAddresses, os::show_addresses(&self.interface));
        seq.finish()
    }
}

impl Default for ConfiguratorBuilder {
    fn default() -> Self {
        Self {
            interface: None,
            dns: None,
            resolver: Resolver::default(),
            policy: FailurePolicy::default(),
        }
    }
}

impl ConfiguratorBuilder {
    /// Sets the interface to configure
    ///
    /// # Arguments
    /// * `name` - Name of the interface (e.g., `eth0`, `enp0s3`)
    pub fn interface(mut self, name: impl Into<String>) -> Self {
        self.interface = Some(name.into());
        self
    }

    /// Sets the DNS server written into the resolver configuration
    pub fn dns(mut self, server: Ipv4Addr) -> Self {
        self.dns = Some(server);
        self
    }

    /// Overrides where the resolver configuration is written
    pub fn resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds the configurator on top of `runner`
    pub fn build<R: Runner>(self, runner: R) -> Result<Configurator<R>, Error> {
        let interface = self.interface.ok_or(Error::MissingInterface)?;
        if interface.trim().is_empty() {
            return Err(Error::EmptyInterfaceName);
        }
        let dns = self.dns.ok_or(Error::MissingDnsServer)?;

        Ok(Configurator {
            interface,
            dns,
            resolver: self.resolver,
            policy: self.policy,
            runner,
        })
    }
}
