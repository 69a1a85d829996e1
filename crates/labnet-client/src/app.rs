//! Linear application flow: privilege gate, menu, configuration, probe

use crate::{
    config::ClientConfig,
    input::{LineSource, Mode},
    probe::{Probe, ProbeOutcome},
};
use console::style;
use labnet_device::{Configurator, ManualAddress, Report, Resolver, Runner, StepStatus};
use color_eyre::eyre;
use std::{io, path::Path};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("labnet must run as root (it changes interface addresses, dhcp leases and dns)")]
    NotPrivileged,

    #[error("failed to load config: {0}")]
    Config(eyre::Report),

    #[error("failed to read input: {0}")]
    Input(#[from] io::Error),

    #[error(transparent)]
    Device(#[from] labnet_device::Error),
}

/// Everything that happened during one run
#[derive(Debug)]
pub struct Summary {
    pub mode: Mode,
    pub report: Report,
    pub probe: ProbeOutcome,
}

/// Checks privilege, then loads the configuration (or the built-in defaults when `path` is
/// `None`)
///
/// # Errors
/// * `Error::NotPrivileged` - Returned before the config file is opened
/// * `Error::Config` - If the file cannot be read or parsed
pub fn prepare(path: Option<&Path>, privileged: bool) -> Result<ClientConfig, Error> {
    if !privileged {
        return Err(Error::NotPrivileged);
    }

    match path {
        Some(path) => ClientConfig::load(path).map_err(Error::Config),
        None => Ok(ClientConfig::default()),
    }
}

/// Runs one configure-then-probe cycle
///
/// Step failures and probe failures are reported on the console and in the returned
/// [`Summary`]; only a missing privilege or a broken input stream is an error.
///
/// # Arguments
/// * `cfg` - Interface, DNS and probe settings
/// * `input` - Where the menu choice and manual address are read from
/// * `runner` - Executes the OS commands
/// * `privileged` - Whether the process holds root privileges
///
/// # Errors
/// * `Error::NotPrivileged` - Returned before any prompt, command or file write
/// * `Error::Input` - If reading a line fails
pub async fn run<L, R>(
    cfg: &ClientConfig,
    mut input: L,
    runner: R,
    privileged: bool,
) -> Result<Summary, Error>
where
    L: LineSource,
    R: Runner,
{
    if !privileged {
        return Err(Error::NotPrivileged);
    }

    let mut configurator = Configurator::builder()
        .interface(&cfg.interface)
        .dns(cfg.dns)
        .resolver(Resolver::new(&cfg.resolver))
        .policy(cfg.failure_policy())
        .build(runner)?;

    println!("=== Lab Network Client ===");
    println!("1) DHCP");
    println!("2) Manual IP");
    let mode = Mode::from_choice(&input.read_line("Select (1/2)")?);

    let report = match mode {
        Mode::Dhcp => configurator.configure_dhcp(),
        Mode::Manual => {
            let line = input.read_line("Manual IP (e.g. 192.168.10.50/24)")?;
            let address = ManualAddress::new(line);
            if let Err(error) = address.as_network() {
                tracing::warn!(%address, %error, "address is not in CIDR form, passing it through");
            }
            configurator.configure_manual(&address)
        }
    };
    print_report(&report);

    let probe = Probe::from_config(&cfg.probe).run().await;
    println!("{}", probe);

    Ok(Summary {
        mode,
        report,
        probe,
    })
}

fn print_report(report: &Report) {
    for outcome in report.outcomes() {
        let label = match &outcome.status {
            StepStatus::Succeeded { .. } => style("ok").green(),
            StepStatus::Failed { .. } => style("failed").red(),
            StepStatus::Skipped => style("skipped").dim(),
        };

        match &outcome.invocation {
            Some(cmd) => println!("[{}] {}: {}", label, outcome.step, style(cmd).bold()),
            None => println!("[{}] {}", label, outcome.step),
        }

        if let StepStatus::Failed { message, .. } = &outcome.status {
            println!("    {}", style(message).red());
        }
    }

    match report.address_listing() {
        Some(listing) => println!("{}", listing.trim_end()),
        None => println!("{}", style("no address listing available").yellow()),
    }
}
