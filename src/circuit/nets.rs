use crate::data_structures::{SibVec, SIBS_PER_WORD};
use crate::error::{SimError, SimResult};
use indexmap::IndexMap;
use num_integer::div_ceil;
use std::fmt::Write;

/// A named range of contiguous sibs in the nets, a wire when `width` is 1 and a bus otherwise.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Net {
    pub index: usize,
    pub width: usize,
}

/// Default number of sibs a [NetTable] can name.
pub const DEFAULT_NET_SIBS: usize = 1 << 16;

/// Largest net capacity, the trace header counts words in a u32.
pub const MAX_NET_SIBS: usize = (u32::MAX as usize).saturating_mul(SIBS_PER_WORD);

/// Ordered mapping from net names to sib ranges.
///
/// Nets don't own storage, they only name ranges of the [SibVec] the simulator allocates
/// from [NetTable::sib_count]. Two names may cover overlapping ranges, a bus and
/// the wires inside of it for example.
///
/// Every net has to fit in the table's capacity, [DEFAULT_NET_SIBS] unless the table was created
/// with [NetTable::with_capacity].
///
/// # Example
/// ```
/// # use sibsim::circuit::{NetTable, Net};
/// let mut nets = NetTable::new();
/// let bus = nets.declare("B1", 4).unwrap();
/// let wire = nets.declare("U2_3", 1).unwrap();
///
/// assert_eq!(bus, 0);
/// assert_eq!(wire, 4);
/// assert_eq!(nets.get("U2_3"), Some(Net { index: 4, width: 1 }));
/// assert_eq!(nets.to_csv(), "B1,0,4\nU2_3,4,1\n");
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NetTable {
    nets: IndexMap<String, Net>,
    sib_count: usize,
    capacity: usize,
}

impl Default for NetTable {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_NET_SIBS)
    }
}

impl NetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an empty table that can name up to `capacity` sibs, at most [MAX_NET_SIBS].
    pub fn with_capacity(capacity: usize) -> Self {
        NetTable {
            nets: IndexMap::new(),
            sib_count: 0,
            capacity: capacity.min(MAX_NET_SIBS),
        }
    }

    /// Declares a net of `width` sibs right after the highest declared sib and returns its index.
    pub fn declare<S: Into<String>>(&mut self, name: S, width: usize) -> SimResult<usize> {
        let index = self.sib_count;
        self.declare_at(name, index, width)?;
        Ok(index)
    }

    /// Declares a net of `width` sibs at `index`.
    ///
    /// Returns [SimError::FieldOutOfRange] if the net is empty or ends past the capacity.
    pub fn declare_at<S: Into<String>>(
        &mut self,
        name: S,
        index: usize,
        width: usize,
    ) -> SimResult<()> {
        let name = name.into();
        if self.nets.contains_key(&name) {
            return Err(SimError::DuplicateNet(name));
        }
        let end = index
            .checked_add(width)
            .filter(|end| width > 0 && *end <= self.capacity)
            .ok_or(SimError::FieldOutOfRange {
                index,
                width,
                capacity: self.capacity,
            })?;
        self.sib_count = self.sib_count.max(end);
        self.nets.insert(name, Net { index, width });
        Ok(())
    }

    /// Parses the transpiler's netlist, one `name,pos,size` line per net, into a table with
    /// the default capacity. Blank lines are ignored.
    pub fn from_csv(text: &str) -> SimResult<NetTable> {
        Self::from_csv_with_capacity(text, DEFAULT_NET_SIBS)
    }

    /// Same as [NetTable::from_csv] with room for `capacity` sibs.
    pub fn from_csv_with_capacity(text: &str, capacity: usize) -> SimResult<NetTable> {
        let mut table = NetTable::with_capacity(capacity);
        for (i, line) in text.lines().enumerate() {
            let line_number = i + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let netlist_err = |reason: String| SimError::Netlist {
                line: line_number,
                reason,
            };

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != 3 {
                return Err(netlist_err(format!(
                    "expected name,pos,size, found {} fields",
                    fields.len()
                )));
            }
            if fields[0].is_empty() {
                return Err(netlist_err("empty net name".into()));
            }
            let index = fields[1]
                .parse::<usize>()
                .map_err(|e| netlist_err(format!("bad position \"{}\": {}", fields[1], e)))?;
            let width = fields[2]
                .parse::<usize>()
                .map_err(|e| netlist_err(format!("bad size \"{}\": {}", fields[2], e)))?;
            if width == 0 {
                return Err(netlist_err("zero size".into()));
            }
            table
                .declare_at(fields[0], index, width)
                .map_err(|e| match e {
                    SimError::FieldOutOfRange { capacity, .. } => netlist_err(format!(
                        "net at {} of {} sibs doesn't fit in {} sibs",
                        index, width, capacity
                    )),
                    e => e,
                })?;
        }
        Ok(table)
    }

    /// Renders the table in the format [NetTable::from_csv] reads.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for (name, net) in &self.nets {
            // Writing to a String can't fail.
            let _ = writeln!(out, "{},{},{}", name, net.index, net.width);
        }
        out
    }

    /// Returns the net called `name`.
    pub fn get(&self, name: &str) -> Option<Net> {
        self.nets.get(name).copied()
    }

    /// Returns an iterator over `(name, Net)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Net)> {
        self.nets.iter().map(|(name, net)| (name.as_str(), *net))
    }

    /// Returns the number of nets.
    pub fn len(&self) -> usize {
        self.nets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }

    /// Returns the number of sibs the table can name.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns one more than the highest sib any net covers.
    pub fn sib_count(&self) -> usize {
        self.sib_count
    }

    /// Returns the number of 64 bit words needed to store every net, `NETS_ELEMENT_COUNT`
    /// in the trace header.
    pub fn element_count(&self) -> usize {
        div_ceil(self.sib_count, SIBS_PER_WORD)
    }

    /// Allocates storage for every net, all of it high-Z.
    pub fn allocate(&self) -> SibVec {
        SibVec::new(self.sib_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare() {
        let mut t = NetTable::new();
        assert_eq!(t.declare("a", 3), Ok(0));
        assert_eq!(t.declare("b", 1), Ok(3));
        t.declare_at("a0", 0, 1).unwrap();
        assert_eq!(t.declare("c", 30), Ok(4));
        assert_eq!(t.sib_count(), 34);
        assert_eq!(t.element_count(), 2);
        assert_eq!(t.len(), 4);
        assert_eq!(t.allocate().len(), 34);
    }

    #[test]
    fn test_duplicate() {
        let mut t = NetTable::new();
        t.declare("a", 1).unwrap();
        assert_eq!(t.declare("a", 2), Err(SimError::DuplicateNet("a".into())));
        assert!(t.declare("zero", 0).is_err());
    }

    #[test]
    fn test_capacity() {
        let mut t = NetTable::with_capacity(8);
        assert_eq!(t.capacity(), 8);
        t.declare("a", 6).unwrap();
        assert_eq!(
            t.declare("b", 3),
            Err(SimError::FieldOutOfRange {
                index: 6,
                width: 3,
                capacity: 8
            })
        );
        t.declare_at("b", 6, 2).unwrap();
        assert!(t.declare_at("c", usize::MAX, 2).is_err());
        assert_eq!(t.sib_count(), 8);

        assert_eq!(NetTable::new().capacity(), DEFAULT_NET_SIBS);
        assert_eq!(NetTable::with_capacity(usize::MAX).capacity(), MAX_NET_SIBS);
    }

    #[test]
    fn test_csv() {
        let text = "B1,0,4\n\nU2_3, 4, 1\nU2_6,5,1\n";
        let t = NetTable::from_csv(text).unwrap();
        assert_eq!(t.get("U2_3"), Some(Net { index: 4, width: 1 }));
        assert_eq!(t.get("missing"), None);
        assert_eq!(t.to_csv(), "B1,0,4\nU2_3,4,1\nU2_6,5,1\n");
        assert_eq!(NetTable::from_csv(&t.to_csv()), Ok(t));
    }

    #[test]
    fn test_csv_errors() {
        assert!(matches!(
            NetTable::from_csv("a,0,1\nb,1\n"),
            Err(SimError::Netlist { line: 2, .. })
        ));
        assert!(matches!(
            NetTable::from_csv("a,x,1"),
            Err(SimError::Netlist { line: 1, .. })
        ));
        assert!(matches!(
            NetTable::from_csv(",0,1"),
            Err(SimError::Netlist { line: 1, .. })
        ));
        assert!(matches!(
            NetTable::from_csv("a,0,0"),
            Err(SimError::Netlist { line: 1, .. })
        ));
        assert_eq!(
            NetTable::from_csv("a,0,1\na,1,1"),
            Err(SimError::DuplicateNet("a".into()))
        );
    }

    #[test]
    fn test_csv_out_of_capacity() {
        assert!(matches!(
            NetTable::from_csv("a,4611686018427387904,1\n"),
            Err(SimError::Netlist { line: 1, .. })
        ));
        assert!(matches!(
            NetTable::from_csv_with_capacity("a,0,4\nb,4,1\n", 4),
            Err(SimError::Netlist { line: 2, .. })
        ));
        let t = NetTable::from_csv_with_capacity("a,0,4\n", 4).unwrap();
        assert_eq!(t.element_count(), 1);
    }
}
