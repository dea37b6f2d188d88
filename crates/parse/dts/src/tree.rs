//! Tree model for parsed devicetree source.
//!
//! [`SourceTree`] is the nested form the parser produces; most consumers
//! flatten it through [`crate::NodeIndex`]. Property values keep enough
//! source fidelity (cell radix, string order) for downstream tools to
//! re-emit them exactly as they were written.

use std::collections::BTreeMap;

/// A single 32-bit cell with its source radix.
///
/// Devicetree cells are written either decimal or `0x`-hex; generators that
/// echo values back into generated files preserve the base the author chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// The cell value.
    pub value: u32,
    /// `true` when the source literal used the `0x` form.
    pub hex: bool,
}

impl Cell {
    /// A decimal cell.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Self { value, hex: false }
    }

    /// A hex cell.
    #[must_use]
    pub fn hex(value: u32) -> Self {
        Self { value, hex: true }
    }
}

/// A property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A valueless property (`foo;`): presence is the value.
    Bool(bool),
    /// One or more `< ... >` cell groups, flattened.
    Cells(Vec<Cell>),
    /// One or more quoted strings. Bare `&label` assignments resolve to the
    /// target node's path and land here as a single string.
    Strings(Vec<String>),
    /// A `[ ... ]` byte string.
    Bytes(Vec<u8>),
}

impl Value {
    /// The value as a single u32 cell, if that is what it is.
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Cells(c) if c.len() == 1 => Some(c[0].value),
            _ => None,
        }
    }

    /// The value as a single string, if that is what it is.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Strings(s) if s.len() == 1 => Some(&s[0]),
            _ => None,
        }
    }

    /// The value as a cell slice, if it is a cell list.
    #[must_use]
    pub fn as_cells(&self) -> Option<&[Cell]> {
        match self {
            Self::Cells(c) => Some(c),
            _ => None,
        }
    }
}

/// Combine big-endian cells into a single integer, high cell first.
#[must_use]
pub fn cells_to_u64(cells: &[Cell]) -> u64 {
    cells
        .iter()
        .fold(0u64, |acc, c| acc.wrapping_shl(32) | u64::from(c.value))
}

/// A node in the nested source tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceNode {
    /// Node name including the unit address (`serial@40011000`); empty for
    /// the root node.
    pub name: String,
    /// Labels attached to the node.
    pub labels: Vec<String>,
    /// Properties in name order.
    pub props: BTreeMap<String, Value>,
    /// Child nodes in name order.
    pub children: BTreeMap<String, SourceNode>,
}

impl SourceNode {
    /// Create an empty node with the given name.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Merge another definition of the same node into this one.
    ///
    /// Later properties override earlier ones; children merge recursively.
    /// This is how repeated node blocks and `&label {}` reopenings combine.
    pub fn merge(&mut self, other: SourceNode) {
        for label in other.labels {
            if !self.labels.contains(&label) {
                self.labels.push(label);
            }
        }
        self.props.extend(other.props);
        for (name, child) in other.children {
            match self.children.get_mut(&name) {
                Some(existing) => existing.merge(child),
                None => {
                    self.children.insert(name, child);
                }
            }
        }
    }
}

/// A complete parsed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    /// The root node (name is empty).
    pub root: SourceNode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_combine_high_first() {
        let cells = [Cell::hex(0x1), Cell::hex(0x2000_0000)];
        assert_eq!(cells_to_u64(&cells), 0x1_2000_0000);
    }

    #[test]
    fn merge_overrides_props_and_unions_children() {
        let mut a = SourceNode::named("soc");
        a.props.insert("status".into(), Value::Strings(vec!["disabled".into()]));
        a.children.insert("uart".into(), SourceNode::named("uart"));

        let mut b = SourceNode::named("soc");
        b.props.insert("status".into(), Value::Strings(vec!["okay".into()]));
        let mut spi = SourceNode::named("spi");
        spi.props.insert("reg".into(), Value::Cells(vec![Cell::hex(0x100)]));
        b.children.insert("spi".into(), spi);

        a.merge(b);
        assert_eq!(a.props["status"].as_str(), Some("okay"));
        assert_eq!(a.children.len(), 2);
    }
}
