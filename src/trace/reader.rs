use super::{TraceError, ELEMENT_SIZE, HEADER_SIZE, TRACE_MAGIC};
use crate::circuit::NetTable;
use crate::data_structures::{SibVec, SIBS_PER_WORD};
use std::convert::TryInto;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Fixed fields of a trace header.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TraceHeader {
    pub netlist_size: usize,
    pub element_size: usize,
    pub element_count: usize,
}

/// Reads back a trace written by [TraceWriter](super::TraceWriter).
///
/// Iterating yields one [SibVec] per traced cycle.
#[derive(Debug)]
pub struct TraceReader<R: Read> {
    input: R,
    header: TraceHeader,
    nets: NetTable,
    failed: bool,
}

impl TraceReader<BufReader<File>> {
    /// Opens the trace at `path` and reads its header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TraceError> {
        TraceReader::new(BufReader::new(File::open(path)?))
    }
}

/// Fills `buf`, returning how many bytes could be read before the end of `input`.
fn read_full<R: Read>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut read = 0;
    while read < buf.len() {
        match input.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(read)
}

fn read_exact<R: Read>(
    input: &mut R,
    buf: &mut [u8],
    what: &'static str,
) -> Result<(), TraceError> {
    let read = read_full(input, buf)?;
    if read < buf.len() {
        return Err(TraceError::Truncated {
            what,
            missing: buf.len() - read,
        });
    }
    Ok(())
}

/// Reads at most `len` bytes, growing the buffer as the bytes arrive so that a corrupt
/// length can't allocate more than the input holds.
fn read_up_to<R: Read>(input: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    input.by_ref().take(len as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

impl<R: Read> TraceReader<R> {
    /// Reads the header and the embedded netlist from `input`.
    ///
    /// Every net of the netlist has to fit in the `element_count` words of a snapshot.
    pub fn new(mut input: R) -> Result<Self, TraceError> {
        let mut raw = [0u8; HEADER_SIZE];
        read_exact(&mut input, &mut raw, "header")?;
        let word = |i: usize| u32::from_le_bytes([raw[i], raw[i + 1], raw[i + 2], raw[i + 3]]);

        let magic = word(0);
        if magic != TRACE_MAGIC {
            return Err(TraceError::BadMagic(magic));
        }
        let header = TraceHeader {
            netlist_size: word(4) as usize,
            element_size: word(8) as usize,
            element_count: word(12) as usize,
        };
        if header.element_size != ELEMENT_SIZE as usize {
            return Err(TraceError::BadHeader(format!(
                "element size {}, expected {}",
                header.element_size, ELEMENT_SIZE
            )));
        }
        if header.netlist_size % 8 != 0 {
            return Err(TraceError::BadHeader(format!(
                "netlist size {} isn't a multiple of 8",
                header.netlist_size
            )));
        }

        let netlist = read_up_to(&mut input, header.netlist_size)?;
        if netlist.len() < header.netlist_size {
            return Err(TraceError::Truncated {
                what: "netlist",
                missing: header.netlist_size - netlist.len(),
            });
        }
        let end = netlist.iter().position(|b| *b == 0).unwrap_or(netlist.len());
        let text = std::str::from_utf8(&netlist[..end])
            .map_err(|e| TraceError::BadHeader(format!("netlist isn't UTF-8: {}", e)))?;
        let capacity = header.element_count.saturating_mul(SIBS_PER_WORD);
        let nets = NetTable::from_csv_with_capacity(text, capacity)?;

        Ok(TraceReader {
            input,
            header,
            nets,
            failed: false,
        })
    }

    pub fn header(&self) -> TraceHeader {
        self.header
    }

    /// Returns the nets described by the embedded netlist.
    pub fn nets(&self) -> &NetTable {
        &self.nets
    }

    /// Reads the next snapshot, [None] at the end of the trace.
    /// A trace of zero word snapshots holds no snapshots.
    pub fn next_snapshot(&mut self) -> Result<Option<SibVec>, TraceError> {
        let len = self.header.element_count * ELEMENT_SIZE as usize;
        if len == 0 {
            return Ok(None);
        }
        let raw = read_up_to(&mut self.input, len)?;
        if raw.is_empty() {
            return Ok(None);
        }
        if raw.len() < len {
            return Err(TraceError::Truncated {
                what: "snapshot",
                missing: len - raw.len(),
            });
        }
        let words = raw
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap_or([0; 8])))
            .collect();
        Ok(Some(SibVec::from_words(words)))
    }
}

impl<R: Read> Iterator for TraceReader<R> {
    type Item = Result<SibVec, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.next_snapshot();
        self.failed = next.is_err();
        next.transpose()
    }
}
