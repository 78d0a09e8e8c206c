use clap::Arg;

use super::{with_session, App, AppExt, CliResult};
use crate::config::{ArgError, Config, Operation};
use crate::proto;

pub fn cli() -> App {
    App::new("set-id")
        .about("write a new device id to a connected device")
        .arg(
            Arg::new("id")
                .value_name("ID")
                .required(true)
                .help("new device id, 0 to 254 (decimal or 0x hex)"),
        )
        .arg_select_device()
}

pub fn exec(config: &Config) -> CliResult {
    let op = match config.operations.as_slice() {
        [op @ Operation::SetDeviceId(_)] => *op,
        _ => return Err(ArgError::NoOperation.into()),
    };

    with_session(config, |session| {
        tracing::info!(?op, "writing to device");
        proto::execute(session, op)?;
        println!("device id written");
        Ok(())
    })
}
