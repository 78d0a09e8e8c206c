use clap::Arg;

mod list;
mod query;
mod set_id;
mod set_serial;

use crate::config::Config;
use crate::device::{self, Session, SUPPORTED_DEVICES};
use crate::error::CliResult;

pub type App = clap::Command<'static>;

pub fn cli() -> Vec<App> {
    vec![list::cli(), query::cli(), set_id::cli(), set_serial::cli()]
}

pub fn get(cmd: &str) -> Option<fn(&Config) -> CliResult> {
    let func = match cmd {
        "list" => list::exec,
        "query" => query::exec,
        "set-id" => set_id::exec,
        "set-serial" => set_serial::exec,
        _ => return None,
    };
    Some(func)
}

pub trait AppExt {
    fn arg_usb_log_level(self) -> App;

    fn arg_select_device(self) -> App;
}

impl AppExt for App {
    fn arg_usb_log_level(self) -> App {
        self.arg(
            Arg::new("usb-log-level")
                .long("usb-log-level")
                .help("set the libusb log level")
                .global(true)
                .takes_value(true)
                .value_name("LEVEL")
                .possible_values(["error", "warn", "info", "debug"]),
        )
    }

    fn arg_select_device(self) -> App {
        self.arg(
            Arg::new("device")
                .long("device")
                .short('d')
                .takes_value(true)
                .value_name("INDEX")
                .default_value("0")
                .help("index of the device as shown by `list`"),
        )
    }
}

/// Selects the configured device, opens a session and runs `f` on it.
///
/// The session is closed when this returns, whatever `f` did.
fn with_session<F>(config: &Config, f: F) -> CliResult
where
    F: FnOnce(&Session) -> CliResult,
{
    let context = device::context(config.usb_log_level)?;
    let device = device::select(&context, SUPPORTED_DEVICES, config.device_index)?;
    usb_debug!(device, "selected {} (index {})", device.name(), device.index());

    let session = device.open()?;
    for (label, value) in session.strings() {
        println!("{:>20}: {}", label, value);
    }
    println!();

    f(&session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArgError, Operation};

    fn app() -> App {
        App::new("pcan-id")
            .subcommand_required(true)
            .arg_usb_log_level()
            .subcommands(cli())
    }

    fn parse(args: &[&str]) -> Result<Config, ArgError> {
        let matches = app().try_get_matches_from(args).unwrap();
        let (cmd, args) = matches.subcommand().unwrap();
        Config::from_matches(cmd, args)
    }

    #[test]
    fn verify_cli() {
        app().debug_assert();
    }

    #[test]
    fn every_subcommand_has_an_exec() {
        for cmd in cli() {
            assert!(get(cmd.get_name()).is_some(), "{}", cmd.get_name());
        }
        assert!(get("flash").is_none());
    }

    #[test]
    fn query_defaults_to_both() {
        let config = parse(&["pcan-id", "query"]).unwrap();
        assert_eq!(config.device_index, 0);
        assert_eq!(
            config.operations,
            vec![Operation::QueryDeviceId, Operation::QuerySerialNumber]
        );

        let config = parse(&["pcan-id", "query", "--serial", "-d", "2"]).unwrap();
        assert_eq!(config.device_index, 2);
        assert_eq!(config.operations, vec![Operation::QuerySerialNumber]);
    }

    #[test]
    fn set_commands() {
        let config = parse(&["pcan-id", "set-id", "254"]).unwrap();
        assert_eq!(config.operations, vec![Operation::SetDeviceId(254)]);

        let config = parse(&["pcan-id", "set-serial", "0x12345678", "--device", "0x1"]).unwrap();
        assert_eq!(config.device_index, 1);
        assert_eq!(config.operations, vec![Operation::SetSerialNumber(0x12345678)]);
    }

    #[test]
    fn out_of_range_device_id_is_rejected() {
        assert!(matches!(
            parse(&["pcan-id", "set-id", "255"]),
            Err(ArgError::DeviceIdOutOfRange(255))
        ));
        assert!(matches!(
            parse(&["pcan-id", "set-serial", "4294967296"]),
            Err(ArgError::InvalidNumber(..))
        ));
        assert!(matches!(
            parse(&["pcan-id", "query", "-d", "first"]),
            Err(ArgError::InvalidNumber(..))
        ));
    }

    #[test]
    fn list_and_log_level() {
        let config = parse(&["pcan-id", "--usb-log-level", "info", "list"]).unwrap();
        assert_eq!(config.operations, vec![Operation::ListDevices]);
        assert!(matches!(config.usb_log_level, Some(rusb::LogLevel::Info)));
    }

    #[test]
    fn exec_refuses_foreign_operations() {
        let config = |operations| Config {
            device_index: 0,
            operations,
            usb_log_level: None,
        };

        assert!(list::exec(&config(vec![Operation::QueryDeviceId])).is_err());
        assert!(set_id::exec(&config(vec![Operation::SetSerialNumber(1)])).is_err());
        assert!(set_id::exec(&config(vec![])).is_err());
        assert!(set_serial::exec(&config(vec![Operation::SetDeviceId(1)])).is_err());
    }

    #[test]
    fn missing_subcommand_is_an_error() {
        assert!(app().try_get_matches_from(&["pcan-id"]).is_err());
    }
}
