//! Labnet Client
//!
//! Switches the lab interface between DHCP and a manual address, pins DNS to the lab resolver
//! and fetches the lab test page once.

use clap::Parser;
use color_eyre::eyre;
use labnet_device::SystemRunner;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub mod app;
pub mod cli;
pub mod config;
pub mod input;
pub mod privilege;
pub mod probe;


#[tokio::main]
async fn main() -> eyre::Result<()> {
    let opts = cli::Opts::parse();

    // init logging
    let level = match opts.verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    FmtSubscriber::builder().with_max_level(level).init();

    // init error/panic handling
    color_eyre::install()?;

    let privileged = privilege::is_root();
    let cfg = match app::prepare(opts.config.as_deref(), privileged) {
        Ok(cfg) => cfg,
        Err(error) => return fail(error),
    };

    let input = input::Terminal::new();
    match app::run(&cfg, input, SystemRunner, privileged).await {
        Ok(summary) => {
            tracing::debug!(
                mode = ?summary.mode,
                configured = summary.report.succeeded(),
                probed = summary.probe.is_completed(),
                "run finished"
            );
            Ok(())
        }
        Err(error) => fail(error),
    }
}

/// Exits with status 1 on a missing privilege, otherwise hands the error to color-eyre
fn fail(error: app::Error) -> eyre::Result<()> {
    if let app::Error::NotPrivileged = error {
        eprintln!("{}", error);
        std::process::exit(1);
    }
    Err(error.into())
}
