//! Dependency graph for one evaluation pass

use ahash::{AHashMap, AHashSet};
use quotecalc_core::CellAddress;
use std::fmt;

/// Unique key for a cell (sheet index + position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub sheet: usize,
    pub row: u32,
    pub col: u16,
}

impl CellKey {
    pub fn new(sheet: usize, row: u32, col: u16) -> Self {
        Self { sheet, row, col }
    }

    /// Key for an address; `$` markers are ignored
    pub fn from_address(sheet: usize, addr: &CellAddress) -> Self {
        Self::new(sheet, addr.row, addr.col)
    }

    pub fn address(&self) -> CellAddress {
        CellAddress::new(self.row, self.col)
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}!{}", self.sheet, self.address())
    }
}

/// The cells that form a cycle, in reference order
///
/// `cells[0]` references `cells[1]`, ... and the last cell references `cells[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircularReference {
    pub cells: Vec<CellKey>,
}

/// Directed graph from each cell to the cells it reads
///
/// Edges are kept in insertion order so the evaluation order and any
/// reported cycle are deterministic for a given workbook.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<CellKey>,
    known: AHashSet<CellKey>,
    precedents: AHashMap<CellKey, Vec<CellKey>>,
    dependents: AHashMap<CellKey, Vec<CellKey>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cell even if it has no edges
    pub fn add_node(&mut self, cell: CellKey) {
        if self.known.insert(cell) {
            self.nodes.push(cell);
        }
    }

    /// Record that `dependent` reads `precedent`
    pub fn add_dependency(&mut self, precedent: CellKey, dependent: CellKey) {
        self.add_node(dependent);
        self.add_node(precedent);

        let reads = self.precedents.entry(dependent).or_default();
        if reads.contains(&precedent) {
            return;
        }
        reads.push(precedent);
        self.dependents.entry(precedent).or_default().push(dependent);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, cell: CellKey) -> bool {
        self.known.contains(&cell)
    }

    /// Cells the given cell reads
    pub fn precedents_of(&self, cell: CellKey) -> &[CellKey] {
        self.precedents.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cells that read the given cell
    pub fn dependents_of(&self, cell: CellKey) -> &[CellKey] {
        self.dependents.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every cell that directly or indirectly reads the given cell
    pub fn transitive_dependents(&self, cell: CellKey) -> Vec<CellKey> {
        let mut seen = AHashSet::new();
        let mut out = Vec::new();
        let mut queue = vec![cell];
        while let Some(current) = queue.pop() {
            for &dep in self.dependents_of(current) {
                if seen.insert(dep) {
                    out.push(dep);
                    queue.push(dep);
                }
            }
        }
        out
    }

    /// All nodes ordered so that every cell comes after the cells it reads
    ///
    /// Fails with the first cycle found. The walk is iterative so long
    /// reference chains cannot overflow the stack.
    pub fn evaluation_order(&self) -> Result<Vec<CellKey>, CircularReference> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut marks: AHashMap<CellKey, Mark> = AHashMap::with_capacity(self.nodes.len());
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(CellKey, usize)> = Vec::new();

        for &root in &self.nodes {
            if marks.contains_key(&root) {
                continue;
            }
            marks.insert(root, Mark::Visiting);
            stack.push((root, 0));

            while let Some(top) = stack.last_mut() {
                let node = top.0;
                match self.precedents_of(node).get(top.1) {
                    Some(&child) => {
                        top.1 += 1;
                        match marks.get(&child) {
                            Some(Mark::Done) => {}
                            Some(Mark::Visiting) => {
                                let start = stack
                                    .iter()
                                    .position(|(cell, _)| *cell == child)
                                    .unwrap_or(0);
                                let cells = stack[start..].iter().map(|(cell, _)| *cell).collect();
                                return Err(CircularReference { cells });
                            }
                            None => {
                                marks.insert(child, Mark::Visiting);
                                stack.push((child, 0));
                            }
                        }
                    }
                    None => {
                        marks.insert(node, Mark::Done);
                        order.push(node);
                        stack.pop();
                    }
                }
            }
        }

        Ok(order)
    }
}
