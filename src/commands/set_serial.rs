use clap::Arg;

use super::{with_session, App, AppExt, CliResult};
use crate::config::{ArgError, Config, Operation};
use crate::proto;

pub fn cli() -> App {
    App::new("set-serial")
        .about("write a new serial number to a connected device")
        .arg(
            Arg::new("serial")
                .value_name("SERIAL")
                .required(true)
                .help("new serial number, 0 to 4294967295 (decimal or 0x hex)"),
        )
        .arg_select_device()
}

pub fn exec(config: &Config) -> CliResult {
    let op = match config.operations.as_slice() {
        [op @ Operation::SetSerialNumber(_)] => *op,
        _ => return Err(ArgError::NoOperation.into()),
    };

    with_session(config, |session| {
        tracing::info!(?op, "writing to device");
        proto::execute(session, op)?;
        println!("serial number written");
        Ok(())
    })
}
