use std::{
    io::{ErrorKind, Read, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
    time::Duration,
};

use super::{Channel, ChannelError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Channel backed by a TCP stream, e.g. a serial-to-network bridge.
pub struct TcpChannel {
    name: String,
    stream: Option<TcpStream>,
}

impl TcpChannel {
    pub fn connect(name: &str, addr: &str, read_timeout: Duration) -> Result<Self, ChannelError> {
        let socket_addr = addr
            .to_socket_addrs()
            .map_err(|err| ChannelError::connection(name, err.to_string()))?
            .next()
            .ok_or_else(|| ChannelError::connection(name, "address did not resolve"))?;

        let stream = TcpStream::connect_timeout(&socket_addr, CONNECT_TIMEOUT)
            .map_err(|err| ChannelError::connection(name, err.to_string()))?;

        // A zero timeout means "block forever" to the socket API.
        let read_timeout = read_timeout.max(Duration::from_millis(1));
        stream
            .set_read_timeout(Some(read_timeout))
            .map_err(|err| ChannelError::connection(name, err.to_string()))?;
        stream
            .set_nodelay(true)
            .map_err(|err| ChannelError::connection(name, err.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            stream: Some(stream),
        })
    }

    fn stream(&mut self) -> Result<&mut TcpStream, ChannelError> {
        match self.stream.as_mut() {
            Some(stream) => Ok(stream),
            None => Err(ChannelError::Closed(self.name.clone())),
        }
    }
}

impl Channel for TcpChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        let name = self.name.clone();
        match self.stream()?.read(buf) {
            Ok(0) if !buf.is_empty() => Err(ChannelError::Closed(name)),
            Ok(n) => Ok(n),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ChannelError> {
        self.stream()?.write_all(data)?;
        Ok(data.len())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

impl Drop for TcpChannel {
    fn drop(&mut self) {
        self.close();
    }
}
