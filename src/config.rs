use std::fmt;
use std::num::ParseIntError;

use clap::ArgMatches;

/// A single configuration action against a selected device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    SetDeviceId(u8),
    SetSerialNumber(u32),
    QueryDeviceId,
    QuerySerialNumber,
    ListDevices,
}

/// Largest device id accepted by `set-id`. 255 is reserved.
pub const MAX_DEVICE_ID: u32 = 254;

/// Everything the locator and the command channel need, built once from the
/// command line.
pub struct Config {
    pub device_index: usize,
    pub operations: Vec<Operation>,
    pub usb_log_level: Option<rusb::LogLevel>,
}

impl Config {
    /// Builds the configuration for subcommand `cmd` from its matches.
    ///
    /// `--usb-log-level` is global and is propagated into `args` by clap.
    pub fn from_matches(cmd: &str, args: &ArgMatches) -> Result<Self, ArgError> {
        let operations = match cmd {
            "list" => vec![Operation::ListDevices],
            "query" => {
                let id = args.is_present("id");
                let serial = args.is_present("serial");
                let mut ops = vec![];
                if id || !serial {
                    ops.push(Operation::QueryDeviceId);
                }
                if serial || !id {
                    ops.push(Operation::QuerySerialNumber);
                }
                ops
            }
            "set-id" => {
                let value = required(args, "id")?;
                vec![Operation::SetDeviceId(parse_device_id(value)?)]
            }
            "set-serial" => {
                let value = required(args, "serial")?;
                vec![Operation::SetSerialNumber(parse_number(value)?)]
            }
            _ => return Err(ArgError::NoOperation),
        };

        // `list` has no device selector
        let device_index = match cmd {
            "list" => 0,
            _ => parse_number(args.value_of("device").unwrap_or("0"))? as usize,
        };

        Ok(Config {
            device_index,
            operations,
            usb_log_level: usb_log_level(args.value_of("usb-log-level")),
        })
    }
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str, ArgError> {
    args.value_of(name).ok_or(ArgError::NoOperation)
}

fn usb_log_level(value: Option<&str>) -> Option<rusb::LogLevel> {
    let level = match value {
        Some("error") => rusb::LogLevel::Error,
        Some("warn") => rusb::LogLevel::Warning,
        Some("info") => rusb::LogLevel::Info,
        Some("debug") => rusb::LogLevel::Debug,
        _ => return None,
    };
    Some(level)
}

/// Parses a decimal or `0x`-prefixed hexadecimal literal.
///
/// The literal must start with a digit and a hex part may only hold hex
/// digits, so signs and whitespace are rejected.
pub fn parse_number(arg: &str) -> Result<u32, ArgError> {
    let invalid = |e: ParseIntError| ArgError::InvalidNumber(arg.to_owned(), Some(e));

    if !arg.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(ArgError::InvalidNumber(arg.to_owned(), None));
    }
    match arg.strip_prefix("0x") {
        Some(hex) if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            Err(ArgError::InvalidNumber(arg.to_owned(), None))
        }
        Some(hex) => u32::from_str_radix(hex, 16).map_err(invalid),
        None => arg.parse::<u32>().map_err(invalid),
    }
}

pub fn parse_device_id(arg: &str) -> Result<u8, ArgError> {
    let value = parse_number(arg)?;
    if value > MAX_DEVICE_ID {
        return Err(ArgError::DeviceIdOutOfRange(value));
    }
    Ok(value as u8)
}

#[derive(Debug)]
pub enum ArgError {
    InvalidNumber(String, Option<ParseIntError>),
    DeviceIdOutOfRange(u32),
    NoOperation,
}

impl fmt::Display for ArgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgError::InvalidNumber(arg, _) => write!(f, r#"invalid number: "{}""#, arg),
            ArgError::DeviceIdOutOfRange(value) => write!(
                f,
                "invalid device id: {} (must be at most {})",
                value, MAX_DEVICE_ID
            ),
            ArgError::NoOperation => {
                f.write_str("please specify one of list, query, set-id or set-serial")
            }
        }
    }
}

impl std::error::Error for ArgError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArgError::InvalidNumber(_, Some(e)) => Some(e),
            _ => None,
        }
    }
}
