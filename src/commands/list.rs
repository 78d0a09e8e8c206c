use super::{App, CliResult};
use crate::config::{ArgError, Config, Operation};
use crate::device::{self, SUPPORTED_DEVICES};

pub fn cli() -> App {
    App::new("list")
        .about("list connected PCAN-USB devices")
}

pub fn exec(config: &Config) -> CliResult {
    if config.operations != [Operation::ListDevices] {
        return Err(ArgError::NoOperation.into());
    }

    let context = device::context(config.usb_log_level)?;
    let devices = device::enumerate(&context, SUPPORTED_DEVICES)?;

    for device in devices.iter() {
        println!("{}", device.listing());
    }
    tracing::debug!(count = devices.iter().count(), "listed devices");

    Ok(())
}
