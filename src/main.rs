use std::process;

use clap::error::ErrorKind;
use clap::{crate_description, crate_name, crate_version};
use tracing_subscriber::EnvFilter;

#[macro_use]
mod macros;
mod commands;
mod config;
mod device;
mod error;
mod proto;

use commands::{App, AppExt};
use config::Config;
use error::CliResult;

fn main() -> CliResult {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app = App::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg_usb_log_level()
        .subcommands(commands::cli());

    let matches = match app.try_get_matches() {
        Ok(matches) => matches,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                process::exit(1);
            }
        },
    };

    if let Some((cmd, args)) = matches.subcommand() {
        let config = Config::from_matches(cmd, args)?;
        tracing::debug!(device_index = config.device_index, operations = ?config.operations);

        if let Some(exec) = commands::get(cmd) {
            exec(&config)?;
        }
    }

    Ok(())
}
