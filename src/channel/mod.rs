//! Duplex byte-stream transports carrying newline-delimited telemetry frames.
//!
//! A [`Channel`] is opened by name through [`Ports`]:
//!
//! - `tcp://host:port` connects a TCP stream;
//! - any other name must be a port on the [`VirtualBus`], an in-process
//!   null-modem cable created with [`VirtualBus::link`].
//!
//! Reads wait at most the configured read timeout and return `Ok(0)` when
//! nothing arrived, so polling loops stay responsive to cancellation.

mod tcp;
mod virtual_port;

use std::{io, time::Duration};

use log::info;
use thiserror::Error;

pub use tcp::TcpChannel;
pub use virtual_port::{VirtualBus, VirtualPort};

const TCP_SCHEME: &str = "tcp://";

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("cannot open channel {name}: {reason}")]
    Connection { name: String, reason: String },
    #[error("port {0} is already linked")]
    AlreadyLinked(String),
    #[error("channel {0} is closed")]
    Closed(String),
    #[error("channel I/O failed: {0}")]
    Io(#[from] io::Error),
}

impl ChannelError {
    fn connection(name: &str, reason: impl Into<String>) -> Self {
        Self::Connection {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// An open duplex byte stream.
pub trait Channel: Send {
    fn name(&self) -> &str;

    /// Reads whatever is available into `buf`, waiting at most the read
    /// timeout. `Ok(0)` means no data, not end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError>;

    fn write(&mut self, data: &[u8]) -> Result<usize, ChannelError>;

    /// Releases the underlying transport. Further reads and writes fail
    /// with [`ChannelError::Closed`]; closing twice is a no-op.
    fn close(&mut self);
}

impl Channel for Box<dyn Channel> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        (**self).read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ChannelError> {
        (**self).write(data)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Opens channels by name.
#[derive(Clone)]
pub struct Ports {
    bus: VirtualBus,
    read_timeout: Duration,
}

impl Ports {
    pub fn new(bus: VirtualBus, read_timeout: Duration) -> Self {
        Self { bus, read_timeout }
    }

    pub fn bus(&self) -> &VirtualBus {
        &self.bus
    }

    pub fn open(&self, name: &str, baud_rate: u32) -> Result<Box<dyn Channel>, ChannelError> {
        if baud_rate == 0 {
            return Err(ChannelError::connection(name, "baud rate must be positive"));
        }

        let channel: Box<dyn Channel> = match name.strip_prefix(TCP_SCHEME) {
            Some(addr) => Box::new(TcpChannel::connect(name, addr, self.read_timeout)?),
            None => Box::new(self.bus.open(name, self.read_timeout)?),
        };

        info!("Opened channel {name} at {baud_rate} baud");
        Ok(channel)
    }
}
