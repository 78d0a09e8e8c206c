use std::fmt;

use rusb::Error as UsbError;

#[derive(Debug)]
pub enum Error {
    Transfer { endpoint: u8, source: UsbError },
    ShortTransfer { endpoint: u8, transferred: usize },
    NoCommand,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transfer { endpoint, .. } => {
                write!(f, "transfer on endpoint {:#04x} failed", endpoint)
            }
            Error::ShortTransfer {
                endpoint,
                transferred,
            } => write!(
                f,
                "short transfer on endpoint {:#04x}: {} of {} bytes",
                endpoint,
                transferred,
                super::PACKET_SIZE
            ),
            Error::NoCommand => f.write_str("operation has no device command"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transfer { source, .. } => Some(source),
            Error::ShortTransfer { .. } | Error::NoCommand => None,
        }
    }
}
