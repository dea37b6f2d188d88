//! The definition store: accumulated symbol/value pairs per node address.

use std::collections::BTreeMap;
use std::fmt;

use quark_dts::Cell;

use crate::diag::Diagnostics;

/// One generated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefValue {
    /// Integer rendered in decimal.
    Int(u64),
    /// Integer rendered as `0x` hex.
    Hex(u64),
    /// Verbatim text, already quoted where needed.
    Raw(String),
}

impl DefValue {
    /// An integer carrying the radix the source encoded it in.
    #[must_use]
    pub fn cell(cell: Cell) -> Self {
        if cell.hex {
            Self::Hex(u64::from(cell.value))
        } else {
            Self::Int(u64::from(cell.value))
        }
    }

    /// A double-quoted string value.
    #[must_use]
    pub fn quoted(s: &str) -> Self {
        Self::Raw(format!("\"{s}\""))
    }
}

impl fmt::Display for DefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Hex(v) => write!(f, "{v:#x}"),
            Self::Raw(s) => f.write_str(s),
        }
    }
}

/// Definitions accumulated for one address: canonical labels with values,
/// plus alias labels pointing at canonical labels of the same address.
///
/// The alias map is always present, so renderers never need an existence
/// check.
#[derive(Debug, Default)]
pub struct NodeDefs {
    defs: BTreeMap<String, DefValue>,
    aliases: BTreeMap<String, String>,
}

impl NodeDefs {
    /// Canonical label/value pairs, in label order.
    pub fn defs(&self) -> impl Iterator<Item = (&str, &DefValue)> {
        self.defs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Alias/target pairs, in alias order.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Value of a canonical label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&DefValue> {
        self.defs.get(label)
    }

    /// Target of an alias label.
    #[must_use]
    pub fn alias_target(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }
}

/// The single source of truth for emission, keyed by node address.
///
/// Addresses are arbitrary strings: next to real node paths, the generator
/// files entries under the pseudo-addresses `chosen`, `compatibles` and
/// `dummy-flash`.
#[derive(Debug, Default)]
pub struct DefStore {
    nodes: BTreeMap<String, NodeDefs>,
}

impl DefStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts one definition. Re-inserting an identical value is a no-op;
    /// a differing value wins over the old one and records a warning.
    pub fn insert(&mut self, addr: &str, label: &str, value: DefValue, diag: &mut Diagnostics) {
        let node = self.nodes.entry(addr.to_string()).or_default();
        if let Some(old) = node.defs.get(label) {
            if *old != value {
                diag.warn(format!(
                    "{addr}: '{label}' redefined: '{value}' overwrites '{old}'"
                ));
            } else {
                return;
            }
        }
        // A canonical definition shadows any alias of the same name.
        node.aliases.remove(label);
        node.defs.insert(label.to_string(), value);
    }

    /// Inserts one alias. Aliases never shadow a canonical definition and
    /// never point at themselves.
    pub fn alias(&mut self, addr: &str, alias: &str, target: &str) {
        if alias == target {
            return;
        }
        let node = self.nodes.entry(addr.to_string()).or_default();
        if node.defs.contains_key(alias) {
            return;
        }
        node.aliases.insert(alias.to_string(), target.to_string());
    }

    /// The accumulated definitions for one address.
    #[must_use]
    pub fn node(&self, addr: &str) -> Option<&NodeDefs> {
        self.nodes.get(addr)
    }

    /// Iterate every touched address in sorted order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &NodeDefs)> {
        self.nodes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// `true` when no definition has been inserted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
