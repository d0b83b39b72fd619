use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use super::{Channel, ChannelError};

/// Bytes buffered per direction before the oldest are overwritten.
const LINE_CAPACITY: usize = 64 * 1024;

/// One direction of a cable.
#[derive(Default)]
struct Line {
    buf: Mutex<VecDeque<u8>>,
    ready: Condvar,
}

impl Line {
    fn lock(&self) -> MutexGuard<'_, VecDeque<u8>> {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct PortSlot {
    rx: Arc<Line>,
    tx: Arc<Line>,
    in_use: bool,
}

/// Registry of in-process null-modem cables.
///
/// `link("vtty0", "vtty1")` plays the role of a pseudo-terminal pair: bytes
/// written at one end are read at the other.
#[derive(Clone, Default)]
pub struct VirtualBus {
    ports: Arc<Mutex<HashMap<String, PortSlot>>>,
}

impl VirtualBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&self, a: &str, b: &str) -> Result<(), ChannelError> {
        if a == b {
            return Err(ChannelError::AlreadyLinked(a.to_string()));
        }

        let mut ports = self.lock();
        for name in [a, b] {
            if ports.contains_key(name) {
                return Err(ChannelError::AlreadyLinked(name.to_string()));
            }
        }

        let a_to_b = Arc::new(Line::default());
        let b_to_a = Arc::new(Line::default());
        ports.insert(
            a.to_string(),
            PortSlot {
                rx: Arc::clone(&b_to_a),
                tx: Arc::clone(&a_to_b),
                in_use: false,
            },
        );
        ports.insert(
            b.to_string(),
            PortSlot {
                rx: a_to_b,
                tx: b_to_a,
                in_use: false,
            },
        );
        Ok(())
    }

    pub(super) fn open(&self, name: &str, read_timeout: Duration) -> Result<VirtualPort, ChannelError> {
        let mut ports = self.lock();
        let slot = ports
            .get_mut(name)
            .ok_or_else(|| ChannelError::connection(name, "unsupported channel"))?;

        if slot.in_use {
            return Err(ChannelError::connection(name, "port is busy"));
        }
        slot.in_use = true;

        Ok(VirtualPort {
            name: name.to_string(),
            rx: Arc::clone(&slot.rx),
            tx: Arc::clone(&slot.tx),
            bus: self.clone(),
            read_timeout,
            closed: false,
        })
    }

    fn release(&self, name: &str) {
        if let Some(slot) = self.lock().get_mut(name) {
            slot.in_use = false;
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PortSlot>> {
        self.ports.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An open end of a virtual cable.
pub struct VirtualPort {
    name: String,
    rx: Arc<Line>,
    tx: Arc<Line>,
    bus: VirtualBus,
    read_timeout: Duration,
    closed: bool,
}

impl Channel for VirtualPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed(self.name.clone()));
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let deadline = Instant::now() + self.read_timeout;
        let mut pending = self.rx.lock();
        while pending.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                return Ok(0);
            }
            pending = self
                .rx
                .ready
                .wait_timeout(pending, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        let n = buf.len().min(pending.len());
        for (slot, byte) in buf.iter_mut().zip(pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed(self.name.clone()));
        }

        let mut pending = self.tx.lock();
        pending.extend(data);
        if pending.len() > LINE_CAPACITY {
            let overrun = pending.len() - LINE_CAPACITY;
            pending.drain(..overrun);
        }
        drop(pending);

        self.tx.ready.notify_all();
        Ok(data.len())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.bus.release(&self.name);
        }
    }
}

impl Drop for VirtualPort {
    fn drop(&mut self) {
        self.close();
    }
}
