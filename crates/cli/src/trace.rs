//! Memory trace parsing.
//!
//! A trace is a text file with one access per line:
//!
//! ```text
//! # tick  port  kind  addr      size
//! 0       1     R     0x200000  64
//! 1500    1     W     0x200040  8
//! ```
//!
//! Addresses accept `0x` hex or decimal. Blank lines and `#` comments are skipped.
//! Records must be sorted by tick.

use std::fmt;

use humsim_core::Request;
use humsim_core::common::{AccessKind, PortId, Tick};

/// One access read from a trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceRecord {
    /// Tick the access is issued.
    pub tick: Tick,
    /// CPU-side port.
    pub port: PortId,
    /// Read or write.
    pub kind: AccessKind,
    /// First byte accessed.
    pub addr: u64,
    /// Bytes accessed.
    pub size: u64,
}

impl TraceRecord {
    /// Turns the record into a controller request.
    ///
    /// Writes carry a payload derived from the address so that read-backs are recognisable.
    pub fn to_request(&self) -> Request {
        match self.kind {
            AccessKind::Read => Request::read(self.port, self.addr, self.size),
            AccessKind::Write => {
                let data = (0..self.size)
                    .map(|i| (self.addr.wrapping_add(i) & 0xff) as u8)
                    .collect();
                Request::write(self.port, self.addr, data)
            }
        }
    }
}

/// A malformed trace line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceError {
    /// 1-based line number.
    pub line: usize,
    /// What was wrong.
    pub reason: String,
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trace line {}: {}", self.line, self.reason)
    }
}

impl std::error::Error for TraceError {}

fn parse_u64(field: &str) -> Option<u64> {
    field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")).map_or_else(
        || field.parse().ok(),
        |hex| u64::from_str_radix(&hex.replace('_', ""), 16).ok(),
    )
}

fn parse_line(text: &str) -> Result<Option<TraceRecord>, String> {
    let text = text.split('#').next().unwrap_or_default().trim();
    if text.is_empty() {
        return Ok(None);
    }
    let fields: Vec<&str> = text.split_whitespace().collect();
    let [tick, port, kind, addr, size] = fields.as_slice() else {
        return Err(format!("expected 5 fields, found {}", fields.len()));
    };
    let kind = match *kind {
        "R" | "r" => AccessKind::Read,
        "W" | "w" => AccessKind::Write,
        other => return Err(format!("unknown access kind `{other}`")),
    };
    let number = |name: &str, field: &str| {
        parse_u64(field).ok_or_else(|| format!("invalid {name} `{field}`"))
    };
    Ok(Some(TraceRecord {
        tick: number("tick", tick)?,
        port: PortId(number("port", port)? as usize),
        kind,
        addr: number("address", addr)?,
        size: number("size", size)?,
    }))
}

/// Parses a whole trace.
///
/// # Errors
///
/// The first malformed line, or a tick lower than the one before it.
pub fn parse(text: &str) -> Result<Vec<TraceRecord>, TraceError> {
    let mut out = Vec::new();
    let mut last_tick = 0;
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let record = parse_line(raw).map_err(|reason| TraceError { line, reason })?;
        if let Some(record) = record {
            if record.tick < last_tick {
                return Err(TraceError {
                    line,
                    reason: format!("tick {} precedes {last_tick}", record.tick),
                });
            }
            last_tick = record.tick;
            out.push(record);
        }
    }
    Ok(out)
}
