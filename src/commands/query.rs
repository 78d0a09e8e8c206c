use clap::Arg;

use super::{with_session, App, AppExt, CliResult};
use crate::config::Config;
use crate::proto::{self, Response};

pub fn cli() -> App {
    App::new("query")
        .about("print the device id and serial number of a connected device")
        .arg(
            Arg::new("id")
                .long("id")
                .help("only query the device id"),
        )
        .arg(
            Arg::new("serial")
                .long("serial")
                .help("only query the serial number"),
        )
        .arg_select_device()
}

pub fn exec(config: &Config) -> CliResult {
    with_session(config, |session| {
        let mut first_error = None;

        // a failed query does not stop the next one
        for op in &config.operations {
            match proto::execute(session, *op) {
                Ok(response) => print_response(&response),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    })
}

fn print_response(response: &Response) {
    match response {
        Response::DeviceId(id) => println!("{:>20}: {:#x}", "device_id", id),
        Response::SerialNumber(serial) => println!("{:>20}: {:#x}", "serial_number", serial),
        Response::Written => {}
    }
}
