use super::{padded_netlist_size, TraceError, TraceSink, ELEMENT_SIZE, HEADER_SIZE, TRACE_MAGIC};
use std::convert::TryFrom;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Writes a trace, see the [module](super) documentation for the format.
#[derive(Debug)]
pub struct TraceWriter<W: Write> {
    out: W,
    element_count: usize,
    snapshots: u64,
}

impl TraceWriter<BufWriter<File>> {
    /// Creates the file at `path` and writes the header and `netlist` to it.
    pub fn create<P: AsRef<Path>>(
        path: P,
        netlist: &str,
        element_count: usize,
    ) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        debug!("tracing {} words per cycle to {}", element_count, path.display());
        TraceWriter::new(BufWriter::new(file), netlist, element_count)
    }
}

impl<W: Write> TraceWriter<W> {
    /// Writes the header and `netlist` to `out`.
    pub fn new(mut out: W, netlist: &str, element_count: usize) -> Result<Self, TraceError> {
        let netlist_size = padded_netlist_size(netlist);
        let header_u32 = |what: &str, v: usize| {
            u32::try_from(v)
                .map_err(|_| TraceError::BadHeader(format!("{} {} overflows u32", what, v)))
        };

        let mut header = Vec::with_capacity(HEADER_SIZE + netlist_size);
        header.extend_from_slice(&TRACE_MAGIC.to_le_bytes());
        header.extend_from_slice(&header_u32("netlist size", netlist_size)?.to_le_bytes());
        header.extend_from_slice(&ELEMENT_SIZE.to_le_bytes());
        header.extend_from_slice(&header_u32("element count", element_count)?.to_le_bytes());
        header.resize(HEADER_SIZE, 0);
        header.extend_from_slice(netlist.as_bytes());
        header.resize(HEADER_SIZE + netlist_size, 0);
        out.write_all(&header)?;

        Ok(TraceWriter {
            out,
            element_count,
            snapshots: 0,
        })
    }

    /// Returns the number of snapshots written.
    pub fn snapshots(&self) -> u64 {
        self.snapshots
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> TraceSink for TraceWriter<W> {
    fn record(&mut self, nets: &[u64]) -> io::Result<()> {
        if nets.len() != self.element_count {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "snapshot of {} words, the header says {}",
                    nets.len(),
                    self.element_count
                ),
            ));
        }
        let bytes: Vec<u8> = nets.iter().flat_map(|w| w.to_le_bytes()).collect();
        self.out.write_all(&bytes)?;
        self.snapshots += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
