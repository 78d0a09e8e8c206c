use std::time::Duration;

use crate::device::Session;

/// Blocking bulk transport to a device's command endpoints.
pub trait Channel {
    /// Bulk OUT endpoint receiving command packets.
    const OUT_ENDPOINT: u8 = 0x01;
    /// Bulk IN endpoint carrying replies.
    const IN_ENDPOINT: u8 = 0x81;
    /// Applied to every transfer. No retries.
    const TIMEOUT: Duration = Duration::from_millis(2000);

    fn write(&self, buf: &[u8]) -> Result<usize, rusb::Error>;

    fn read(&self, buf: &mut [u8]) -> Result<usize, rusb::Error>;
}

impl Channel for Session {
    fn write(&self, buf: &[u8]) -> Result<usize, rusb::Error> {
        self.handle()
            .write_bulk(Self::OUT_ENDPOINT, buf, Self::TIMEOUT)
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, rusb::Error> {
        self.handle()
            .read_bulk(Self::IN_ENDPOINT, buf, Self::TIMEOUT)
    }
}
