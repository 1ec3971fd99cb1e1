//! Circup - CircuitPython library updater
//!
//! A command line tool that keeps the library modules on a CircuitPython
//! device in step with the published library bundles, over USB storage or the
//! web workflow.

use clap::Parser;
use miette::Diagnostic;

mod backend;
mod bundle;
mod catalog;
mod cli;
mod commands;
mod device;
mod error;
mod imports;
mod installer;
mod logging;
mod metadata;
mod module;
mod paths;
mod resolver;
mod session;
#[cfg(test)]
mod test_fixtures;

use backend::ModuleBackend;
use cli::{Cli, Commands};
use error::{CircupError, Result};
use session::Session;

/// Firmware version and board id, from the flags when both are given
fn device_identity(cli: &Cli, backend: &dyn ModuleBackend) -> Result<(String, String)> {
    if let (Some(version), Some(board_id)) = (&cli.cpy_version, &cli.board_id) {
        return Ok((version.clone(), board_id.clone()));
    }
    let identity = backend.identity()?;
    Ok((identity.firmware_version, identity.board_id))
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions(args) = cli.command {
        return commands::completions::run(args);
    }

    let data_dir = paths::data_dir()?;
    let log_dir = paths::log_dir(&data_dir);
    let _guard = logging::init_logging(Some(&log_dir), cli.verbose);
    tracing::info!("### Started circup {} ###", env!("CARGO_PKG_VERSION"));

    let mut session = Session::new(data_dir);
    session.offline = cli.offline;
    session.timeout = cli.timeout();

    if cli.command.is_boardless() {
        return match cli.command {
            Commands::Show(args) => commands::show::run(&session, args),
            Commands::BundleShow(args) => commands::bundle::show(&session, args),
            Commands::BundleAdd(args) => commands::bundle::add(&session, args),
            Commands::BundleRemove(args) => commands::bundle::remove(&session, args),
            _ => Ok(()),
        };
    }

    let backend = device::connect(&cli.device_options())?;
    if !backend.is_present() {
        return Err(CircupError::DeviceNotFound);
    }
    if let Commands::Wwshell(args) = cli.command {
        println!("Found device at {}.", backend.location());
        return commands::wwshell::run(backend.as_ref(), args);
    }
    let (cpy_version, board_id) = device_identity(&cli, backend.as_ref())?;
    let session = session.with_device(cpy_version, board_id);
    println!(
        "Found device {} at {}, running CircuitPython {}.",
        session.board_id,
        backend.location(),
        session.cpy_version
    );
    tracing::info!("Device at {} runs {}", backend.location(), session.cpy_version);
    commands::check_firmware(&session);

    let backend = backend.as_ref();
    match cli.command {
        Commands::Freeze(args) => commands::freeze::run(backend, &session, args),
        Commands::List(_) => commands::list::run(backend, &session),
        Commands::Install(args) => commands::install::run(backend, &session, args),
        Commands::Uninstall(args) => commands::uninstall::run(backend, args),
        Commands::Update(args) => commands::update::run(backend, &session, args),
        Commands::Example(args) => commands::example::run(backend, &session, args),
        Commands::Show(_)
        | Commands::BundleShow(_)
        | Commands::BundleAdd(_)
        | Commands::BundleRemove(_)
        | Commands::Wwshell(_)
        | Commands::Completions(_) => Ok(()),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        tracing::error!("{:?}", e);
        eprintln!("Error: {}", e);
        if let Some(help) = e.help() {
            eprintln!("{}", help);
        }
        std::process::exit(1);
    }
}
