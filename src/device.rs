use std::sync::atomic::{AtomicBool, Ordering};
use std::{fmt, slice::Iter};

use rusb::{Context, UsbContext};

/// Interface claimed for the command exchange.
const INTERFACE: u8 = 0;

/// Set while a `Session` is alive. Only one session may exist per process.
static SESSION_OPEN: AtomicBool = AtomicBool::new(false);

/// A vendor/product id pair this tool knows how to talk to.
#[derive(Debug, PartialEq, Eq)]
pub struct SupportedDevice {
    pub name: &'static str,
    pub vendor_id: u16,
    pub product_id: u16,
}

pub const SUPPORTED_DEVICES: &[SupportedDevice] = &[SupportedDevice {
    name: "PCAN-USB",
    vendor_id: 0x0C72,
    product_id: 0x000C,
}];

impl SupportedDevice {
    /// Returns the first registry entry matching the ids exactly.
    pub fn lookup(
        registry: &[SupportedDevice],
        vendor_id: u16,
        product_id: u16,
    ) -> Option<&SupportedDevice> {
        registry
            .iter()
            .find(|d| d.vendor_id == vendor_id && d.product_id == product_id)
    }
}

/// Pairs each supported device with its index among supported devices only.
///
/// Devices not found in `registry` are dropped and do not consume an index.
/// The input order is kept.
pub fn assign_indices<'r, T, I>(
    registry: &'r [SupportedDevice],
    devices: I,
) -> Vec<(usize, &'r SupportedDevice, T)>
where
    I: IntoIterator<Item = (T, u16, u16)>,
{
    devices
        .into_iter()
        .filter_map(|(device, vendor_id, product_id)| {
            SupportedDevice::lookup(registry, vendor_id, product_id).map(|kind| (kind, device))
        })
        .enumerate()
        .map(|(index, (kind, device))| (index, kind, device))
        .collect()
}

fn listing_line(index: usize, kind: &SupportedDevice, bus: u8, address: u8) -> String {
    format!(
        "{}: {:04x}:{:04x} Bus {:03} Device {:03} \"{}\"",
        index, kind.vendor_id, kind.product_id, bus, address, kind.name
    )
}

#[derive(Debug)]
pub struct Devices(Vec<DiscoveredDevice>);

impl Devices {
    pub fn iter(&self) -> Iter<'_, DiscoveredDevice> {
        self.0.iter()
    }
}

#[derive(Debug)]
pub struct DiscoveredDevice {
    device: rusb::Device<Context>,
    kind: &'static SupportedDevice,
    index: usize,
}

impl DiscoveredDevice {
    pub fn open(&self) -> Result<Session, Error> {
        Session::open(self)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &'static str {
        self.kind.name
    }

    pub fn bus_number(&self) -> u8 {
        self.device.bus_number()
    }

    pub fn address(&self) -> u8 {
        self.device.address()
    }

    /// One line for `list`: index, ids, location and name.
    pub fn listing(&self) -> String {
        listing_line(self.index, self.kind, self.bus_number(), self.address())
    }
}

/// Creates the libusb context used for one run.
pub fn context(log_level: Option<rusb::LogLevel>) -> Result<Context, Error> {
    let mut context = Context::new().map_err(Error::Init)?;
    if let Some(level) = log_level {
        context.set_log_level(level);
    }
    Ok(context)
}

/// Picks the supported device carrying `index`, numbering as `assign_indices` does.
pub fn find_index<'r, T, I>(
    registry: &'r [SupportedDevice],
    devices: I,
    index: usize,
) -> Result<(&'r SupportedDevice, T), Error>
where
    I: IntoIterator<Item = (T, u16, u16)>,
{
    assign_indices(registry, devices)
        .into_iter()
        .find(|(i, _, _)| *i == index)
        .map(|(_, kind, device)| (kind, device))
        .ok_or(Error::NotFound(index))
}

/// Every attached device with its vendor and product id.
fn attached(context: &Context) -> Result<Vec<(rusb::Device<Context>, u16, u16)>, Error> {
    let list = context.devices().map_err(Error::Enumeration)?;

    let mut candidates = vec![];
    for device in list.iter() {
        match device.device_descriptor() {
            Ok(desc) => {
                let (vendor_id, product_id) = (desc.vendor_id(), desc.product_id());
                candidates.push((device, vendor_id, product_id));
            }
            Err(e) => usb_warn!(device, "failed to get device descriptor: {}", e),
        }
    }
    Ok(candidates)
}

/// Lists all attached devices that appear in `registry`.
pub fn enumerate(
    context: &Context,
    registry: &'static [SupportedDevice],
) -> Result<Devices, Error> {
    let devices = assign_indices(registry, attached(context)?)
        .into_iter()
        .map(|(index, kind, device)| {
            usb_debug!(device, "found {} device, index {}", kind.name, index);
            DiscoveredDevice {
                device,
                kind,
                index,
            }
        })
        .collect();

    Ok(Devices(devices))
}

/// Re-enumerates and picks the supported device carrying `index`.
pub fn select(
    context: &Context,
    registry: &'static [SupportedDevice],
    index: usize,
) -> Result<DiscoveredDevice, Error> {
    let (kind, device) = find_index(registry, attached(context)?, index)?;
    Ok(DiscoveredDevice {
        device,
        kind,
        index,
    })
}

/// An opened handle with interface 0 claimed.
///
/// Dropping the session releases the interface, hands the device back to
/// the kernel driver and closes the handle. Failures along the way are only
/// logged.
pub struct Session {
    handle: rusb::DeviceHandle<Context>,
    bus_number: u8,
    address: u8,
    claimed: bool,
}

impl Session {
    fn open(device: &DiscoveredDevice) -> Result<Session, Error> {
        if SESSION_OPEN.swap(true, Ordering::SeqCst) {
            return Err(Error::Busy);
        }

        let handle = match device.device.open() {
            Ok(handle) => handle,
            Err(e) => {
                SESSION_OPEN.store(false, Ordering::SeqCst);
                return Err(Error::Open(e));
            }
        };

        let mut session = Session {
            handle,
            bus_number: device.bus_number(),
            address: device.address(),
            claimed: false,
        };

        if let Err(e) = session.handle.set_auto_detach_kernel_driver(true) {
            usb_debug!(session, "kernel driver auto-detach unavailable: {}", e);
        }

        session
            .handle
            .claim_interface(INTERFACE)
            .map_err(Error::Claim)?;
        session.claimed = true;

        if let Err(e) = session.handle.reset() {
            usb_warn!(session, "device reset failed: {}", e);
        }

        usb_debug!(session, "session open on interface {}", INTERFACE);
        Ok(session)
    }

    pub fn bus_number(&self) -> u8 {
        self.bus_number
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn handle(&self) -> &rusb::DeviceHandle<Context> {
        &self.handle
    }

    /// Reads the manufacturer and product strings, skipping missing ones.
    pub fn strings(&self) -> Vec<(&'static str, String)> {
        let desc = match self.handle.device().device_descriptor() {
            Ok(desc) => desc,
            Err(e) => {
                usb_warn!(self, "failed to get device descriptor: {}", e);
                return vec![];
            }
        };

        let mut strings = vec![];
        if desc.manufacturer_string_index().is_some() {
            match self.handle.read_manufacturer_string_ascii(&desc) {
                Ok(s) => strings.push(("iManufacturer", s)),
                Err(e) => usb_warn!(self, "failed to read manufacturer string: {}", e),
            }
        }
        if desc.product_string_index().is_some() {
            match self.handle.read_product_string_ascii(&desc) {
                Ok(s) => strings.push(("iProduct", s)),
                Err(e) => usb_warn!(self, "failed to read product string: {}", e),
            }
        }
        strings
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.claimed {
            if let Err(e) = self.handle.release_interface(INTERFACE) {
                usb_warn!(self, "failed to release interface {}: {}", INTERFACE, e);
            }
            if let Err(e) = self.handle.attach_kernel_driver(INTERFACE) {
                usb_debug!(self, "kernel driver not reattached: {}", e);
            }
        }
        usb_debug!(self, "closing handle");
        SESSION_OPEN.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub enum Error {
    Init(rusb::Error),
    Enumeration(rusb::Error),
    NotFound(usize),
    Open(rusb::Error),
    Claim(rusb::Error),
    Busy,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Init(_) => f.write_str("error initializing libusb"),
            Error::Enumeration(_) => f.write_str("error retrieving list of devices"),
            Error::NotFound(index) => write!(f, "requested device not found: index {}", index),
            Error::Open(_) => f.write_str("error opening device"),
            Error::Claim(_) => write!(f, "error claiming interface {}", INTERFACE),
            Error::Busy => f.write_str("a device session is already open"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Init(e) | Error::Enumeration(e) | Error::Open(e) | Error::Claim(e) => Some(e),
            Error::NotFound(_) | Error::Busy => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OTHER: SupportedDevice = SupportedDevice {
        name: "PCAN-USB Pro",
        vendor_id: 0x0C72,
        product_id: 0x000D,
    };

    #[test]
    fn lookup_exact_match_only() {
        let found = SupportedDevice::lookup(SUPPORTED_DEVICES, 0x0C72, 0x000C);
        assert_eq!(found.map(|d| d.name), Some("PCAN-USB"));

        assert!(SupportedDevice::lookup(SUPPORTED_DEVICES, 0x0C72, 0x000D).is_none());
        assert!(SupportedDevice::lookup(SUPPORTED_DEVICES, 0x000C, 0x0C72).is_none());
        assert!(SupportedDevice::lookup(&[], 0x0C72, 0x000C).is_none());
    }

    #[test]
    fn unsupported_devices_take_no_index() {
        let attached = vec![
            ("hub", 0x1D6B, 0x0002),
            ("pcan-a", 0x0C72, 0x000C),
            ("keyboard", 0x046D, 0xC31C),
            ("pcan-b", 0x0C72, 0x000C),
        ];

        let found = assign_indices(SUPPORTED_DEVICES, attached);
        let found: Vec<_> = found.iter().map(|(i, _, dev)| (*i, *dev)).collect();
        assert_eq!(found, vec![(0, "pcan-a"), (1, "pcan-b")]);
    }

    #[test]
    fn indices_follow_device_list_order_across_registry_entries() {
        let registry = [
            SupportedDevice {
                name: "PCAN-USB",
                vendor_id: 0x0C72,
                product_id: 0x000C,
            },
            OTHER,
        ];
        let attached = vec![
            ("pro", 0x0C72, 0x000D),
            ("mouse", 0x046D, 0xC077),
            ("usb", 0x0C72, 0x000C),
        ];

        let found = assign_indices(&registry, attached);
        assert_eq!(found.len(), 2);
        assert_eq!((found[0].0, found[0].1.name, found[0].2), (0, "PCAN-USB Pro", "pro"));
        assert_eq!((found[1].0, found[1].1.name, found[1].2), (1, "PCAN-USB", "usb"));
    }

    #[test]
    fn nothing_attached() {
        let found = assign_indices(SUPPORTED_DEVICES, Vec::<((), u16, u16)>::new());
        assert!(found.is_empty());
    }

    #[test]
    fn select_without_supported_devices() {
        let attached = vec![("hub", 0x1D6B, 0x0002)];
        assert!(matches!(
            find_index(SUPPORTED_DEVICES, attached, 0),
            Err(Error::NotFound(0))
        ));
        assert!(matches!(
            find_index(SUPPORTED_DEVICES, Vec::<((), u16, u16)>::new(), 0),
            Err(Error::NotFound(0))
        ));
    }

    #[test]
    fn select_skips_unsupported_devices() {
        let attached = vec![
            ("pcan-a", 0x0C72, 0x000C),
            ("keyboard", 0x046D, 0xC31C),
            ("pcan-b", 0x0C72, 0x000C),
        ];

        let (kind, device) = find_index(SUPPORTED_DEVICES, attached.clone(), 1).unwrap();
        assert_eq!((kind.name, device), ("PCAN-USB", "pcan-b"));

        assert!(matches!(
            find_index(SUPPORTED_DEVICES, attached, 2),
            Err(Error::NotFound(2))
        ));
    }

    #[test]
    fn listing_format() {
        let line = listing_line(0, &SUPPORTED_DEVICES[0], 1, 2);
        assert_eq!(line, r#"0: 0c72:000c Bus 001 Device 002 "PCAN-USB""#);
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            Error::NotFound(0).to_string(),
            "requested device not found: index 0"
        );
        let e = Error::Claim(rusb::Error::Busy);
        assert_eq!(e.to_string(), "error claiming interface 0");
        assert!(std::error::Error::source(&e).is_some());
    }
}
