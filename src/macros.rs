/// Emits a tracing event prefixed with the bus number and address of `$device`.
macro_rules! usb_event {
    ($level:ident, $device:expr, $msg:expr) => {
        tracing::event!(
            tracing::Level::$level,
            concat!("USB(bus={:03},addr={:03}): ", $msg),
            $device.bus_number(),
            $device.address(),
        )
    };
    ($level:ident, $device:expr, $fmt:expr, $($arg:tt)+) => {
        tracing::event!(
            tracing::Level::$level,
            concat!("USB(bus={:03},addr={:03}): ", $fmt),
            $device.bus_number(),
            $device.address(),
            $($arg)+
        )
    };
}

macro_rules! usb_debug {
    ($device:expr, $($arg:tt)+) => {
        usb_event!(DEBUG, $device, $($arg)+)
    };
}

macro_rules! usb_warn {
    ($device:expr, $($arg:tt)+) => {
        usb_event!(WARN, $device, $($arg)+)
    };
}
