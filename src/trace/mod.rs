//! Binary trace files.
//!
//! A trace starts with a 32 byte little-endian header:
//!
//! | offset | field           | value                                |
//! |--------|-----------------|--------------------------------------|
//! | 0      | magic           | bytes `83 82 81 80`                  |
//! | 4      | `netlist_size`  | netlist text plus its NUL padding    |
//! | 8      | `element_size`  | 8                                    |
//! | 12     | `element_count` | 64 bit words per snapshot            |
//! | 16     | reserved        | 4 zero u32s                          |
//!
//! The netlist text follows ([NetTable::to_csv](crate::circuit::NetTable::to_csv) format),
//! terminated by a NUL and padded with NULs to a multiple of 8 bytes, always adding at least one.
//! Then one snapshot of `element_count` words per traced cycle, back to back.
use crate::error::SimError;
use std::io;
use thiserror::Error;

mod reader;
mod writer;
pub use reader::*;
pub use writer::*;

/// Magic number at the start of every trace, read as a little-endian u32.
pub const TRACE_MAGIC: u32 = 0x8081_8283;
/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 32;
/// Size of a snapshot element in bytes.
pub const ELEMENT_SIZE: u32 = 8;

/// Receives a snapshot of the nets once per cycle.
pub trait TraceSink {
    /// Records one snapshot, `nets` holds every word of the nets.
    fn record(&mut self, nets: &[u64]) -> io::Result<()>;

    /// Called when the simulation halts.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Errors that can occur while writing or reading a trace.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),

    #[error("bad header: {0}")]
    BadHeader(String),

    #[error("truncated trace, {missing} bytes missing from {what}")]
    Truncated { what: &'static str, missing: usize },

    #[error("embedded netlist: {0}")]
    Netlist(#[from] SimError),
}

/// Returns the padded size of `netlist`, as stored in the header.
pub fn padded_netlist_size(netlist: &str) -> usize {
    let with_nul = netlist.len() + 1;
    with_nul + (8 - (with_nul & 7))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding() {
        assert_eq!(padded_netlist_size(""), 8);
        assert_eq!(padded_netlist_size("abcdef"), 8);
        assert_eq!(padded_netlist_size("abcdefg"), 16);
        assert_eq!(padded_netlist_size("abcdefgh"), 16);
    }

    #[test]
    fn test_magic_bytes() {
        assert_eq!(TRACE_MAGIC.to_le_bytes(), [0x83, 0x82, 0x81, 0x80]);
    }
}
