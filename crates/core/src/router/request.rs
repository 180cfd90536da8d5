//! CPU-side request and response types.

use serde::Serialize;
use std::fmt;

use crate::common::{AccessKind, PortId, Tick};

/// Handle identifying an accepted request; echoed in its response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Time context supplied by the external scheduler on every call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimContext {
    /// Current simulated tick.
    pub now: Tick,
}

impl SimContext {
    /// Context at tick `now`.
    pub const fn at(now: Tick) -> Self {
        Self { now }
    }
}

/// A memory request arriving on a CPU-side port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Port the request arrived on.
    pub port: PortId,
    /// First logical byte accessed.
    pub addr: u64,
    /// Number of bytes accessed.
    pub size: u64,
    /// Read or write.
    pub kind: AccessKind,
    /// Bytes to store; required for writes, ignored for reads.
    pub payload: Option<Vec<u8>>,
}

impl Request {
    /// Read of `size` bytes at `addr`.
    pub const fn read(port: PortId, addr: u64, size: u64) -> Self {
        Self {
            port,
            addr,
            size,
            kind: AccessKind::Read,
            payload: None,
        }
    }

    /// Write of `data` at `addr`.
    pub fn write(port: PortId, addr: u64, data: Vec<u8>) -> Self {
        Self {
            port,
            addr,
            size: data.len() as u64,
            kind: AccessKind::Write,
            payload: Some(data),
        }
    }
}

/// Completion of a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Response {
    /// Request this completes.
    pub id: RequestId,
    /// Port the request arrived on.
    pub port: PortId,
    /// First logical byte accessed.
    pub addr: u64,
    /// Number of bytes accessed.
    pub size: u64,
    /// Read or write.
    pub kind: AccessKind,
    /// Bytes read, in address order; `None` for writes.
    pub data: Option<Vec<u8>>,
    /// Tick the request was submitted.
    pub issued_at: Tick,
    /// Tick the last byte completed.
    pub completed_at: Tick,
}

impl Response {
    /// Ticks from submission to completion.
    pub const fn latency(&self) -> Tick {
        self.completed_at.saturating_sub(self.issued_at)
    }
}
