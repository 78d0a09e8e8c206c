use std::fmt;

use byteorder::{ByteOrder, LE};
use tracing::instrument;

mod channel;
mod error;

pub use channel::Channel;
pub use error::Error;

use crate::config::Operation;

/// Every request and reply is exactly this long.
pub const PACKET_SIZE: usize = 16;

const CATEGORY_DEVICE_ID: u8 = 0x04;
const CATEGORY_SERIAL_NUMBER: u8 = 0x06;

const SUBCOMMAND_QUERY: u8 = 0x01;
const SUBCOMMAND_SET: u8 = 0x02;

const PAYLOAD_OFFSET: usize = 2;

/// A zero-padded command packet: `[category, subcommand, payload.., 0..]`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Packet([u8; PACKET_SIZE]);

impl Packet {
    fn new(category: u8, subcommand: u8) -> Self {
        let mut buf = [0; PACKET_SIZE];
        buf[0] = category;
        buf[1] = subcommand;
        Packet(buf)
    }

    pub fn set_device_id(id: u8) -> Self {
        let mut packet = Self::new(CATEGORY_DEVICE_ID, SUBCOMMAND_SET);
        packet.0[PAYLOAD_OFFSET] = id;
        packet
    }

    pub fn set_serial_number(value: u32) -> Self {
        let mut packet = Self::new(CATEGORY_SERIAL_NUMBER, SUBCOMMAND_SET);
        LE::write_u32(&mut packet.0[PAYLOAD_OFFSET..PAYLOAD_OFFSET + 4], value);
        packet
    }

    pub fn query_device_id() -> Self {
        Self::new(CATEGORY_DEVICE_ID, SUBCOMMAND_QUERY)
    }

    pub fn query_serial_number() -> Self {
        Self::new(CATEGORY_SERIAL_NUMBER, SUBCOMMAND_QUERY)
    }

    /// The request packet for `op`, or `None` when it needs no transfer.
    pub fn for_operation(op: &Operation) -> Option<Self> {
        let packet = match *op {
            Operation::SetDeviceId(id) => Self::set_device_id(id),
            Operation::SetSerialNumber(value) => Self::set_serial_number(value),
            Operation::QueryDeviceId => Self::query_device_id(),
            Operation::QuerySerialNumber => Self::query_serial_number(),
            Operation::ListDevices => return None,
        };
        Some(packet)
    }

    pub fn category(&self) -> u8 {
        self.0[0]
    }

    pub fn subcommand(&self) -> u8 {
        self.0[1]
    }

    pub fn device_id(&self) -> u8 {
        self.0[PAYLOAD_OFFSET]
    }

    pub fn serial_number(&self) -> u32 {
        LE::read_u32(&self.0[PAYLOAD_OFFSET..PAYLOAD_OFFSET + 4])
    }

    pub fn as_bytes(&self) -> &[u8; PACKET_SIZE] {
        &self.0
    }
}

impl From<[u8; PACKET_SIZE]> for Packet {
    fn from(buf: [u8; PACKET_SIZE]) -> Self {
        Packet(buf)
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X?}", self.0)
    }
}

/// Decoded outcome of one operation.
#[derive(Debug, PartialEq, Eq)]
pub enum Response {
    Written,
    DeviceId(u8),
    SerialNumber(u32),
}

/// Runs one operation over `channel`.
///
/// Set operations write a single packet and read nothing back. Queries write
/// the request and then read the reply. The read is attempted even if the
/// write failed, each failure is logged, and the first one is returned.
///
/// Listing devices is done by the locator alone and has no command, so
/// `ListDevices` is refused with `Error::NoCommand` before any transfer.
#[instrument(skip(channel))]
pub fn execute<C: Channel>(channel: &C, op: Operation) -> Result<Response, Error> {
    let request = Packet::for_operation(&op).ok_or(Error::NoCommand)?;

    match op {
        Operation::SetDeviceId(_) | Operation::SetSerialNumber(_) => {
            send(channel, &request)?;
            Ok(Response::Written)
        }
        Operation::QueryDeviceId => {
            let reply = exchange(channel, &request)?;
            Ok(Response::DeviceId(reply.device_id()))
        }
        Operation::QuerySerialNumber => {
            let reply = exchange(channel, &request)?;
            Ok(Response::SerialNumber(reply.serial_number()))
        }
        Operation::ListDevices => Err(Error::NoCommand),
    }
}

fn send<C: Channel>(channel: &C, packet: &Packet) -> Result<(), Error> {
    tracing::debug!("out: {:?}", packet);
    match channel.write(packet.as_bytes()) {
        Ok(n) if n == PACKET_SIZE => Ok(()),
        Ok(n) => {
            tracing::error!(n, "short write");
            Err(Error::ShortTransfer {
                endpoint: C::OUT_ENDPOINT,
                transferred: n,
            })
        }
        Err(e) => {
            tracing::error!("write to endpoint {:#04x} failed: {}", C::OUT_ENDPOINT, e);
            Err(Error::Transfer {
                endpoint: C::OUT_ENDPOINT,
                source: e,
            })
        }
    }
}

fn receive<C: Channel>(channel: &C) -> Result<Packet, Error> {
    let mut buf = [0; PACKET_SIZE];
    match channel.read(&mut buf) {
        Ok(n) if n == PACKET_SIZE => {
            tracing::debug!(n, "in:  {:02X?}", buf);
            Ok(Packet::from(buf))
        }
        Ok(n) => {
            tracing::error!(n, "short read");
            Err(Error::ShortTransfer {
                endpoint: C::IN_ENDPOINT,
                transferred: n,
            })
        }
        Err(e) => {
            tracing::error!("read from endpoint {:#04x} failed: {}", C::IN_ENDPOINT, e);
            Err(Error::Transfer {
                endpoint: C::IN_ENDPOINT,
                source: e,
            })
        }
    }
}

fn exchange<C: Channel>(channel: &C, request: &Packet) -> Result<Packet, Error> {
    let sent = send(channel, request);
    let reply = receive(channel);
    sent?;

    let reply = reply?;
    if reply.category() != request.category() {
        tracing::warn!(
            category = reply.category(),
            subcommand = reply.subcommand(),
            "reply does not match request category {}",
            request.category()
        );
    }
    Ok(reply)
}
