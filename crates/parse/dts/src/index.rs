//! Flattened, path-keyed view of a parsed tree.
//!
//! [`NodeIndex`] is what generators consume: every node addressed by its
//! full path, plus the phandle, alias, and chosen lookup tables and the
//! address arithmetic (`#address-cells` / `#size-cells` / `ranges`) the
//! devicetree encodes structurally.

use std::collections::{BTreeMap, BTreeSet};

use crate::tree::{SourceNode, SourceTree, Value, cells_to_u64};

/// A flattened node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Properties in name order.
    pub props: BTreeMap<String, Value>,
    /// Labels attached to the node.
    pub labels: Vec<String>,
}

/// Path-keyed index over a [`SourceTree`].
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    nodes: BTreeMap<String, Node>,
    phandles: BTreeMap<u32, String>,
    aliases: BTreeMap<String, Vec<String>>,
    chosen: BTreeMap<String, String>,
    instances: BTreeMap<String, Vec<(String, usize)>>,
}

/// Structural parent of a path (`/soc/uart@0` -> `/soc`), `None` for the
/// root.
#[must_use]
pub fn parent_path(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Last path segment (`/soc/uart@0` -> `uart@0`). Pseudo-addresses without
/// a slash come back unchanged.
#[must_use]
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl NodeIndex {
    /// Flatten a tree and build the lookup tables.
    #[must_use]
    pub fn build(tree: &SourceTree) -> Self {
        let mut index = Self::default();
        flatten(&tree.root, "/", &mut index.nodes);

        for (path, node) in &index.nodes {
            let phandle = node
                .props
                .get("phandle")
                .or_else(|| node.props.get("linux,phandle"))
                .and_then(Value::as_u32);
            if let Some(v) = phandle {
                index.phandles.insert(v, path.clone());
            }
        }

        // /aliases: each property names one target; multiple aliases onto
        // the same node accumulate.
        if let Some(aliases_node) = index.nodes.get("/aliases") {
            for (name, value) in &aliases_node.props {
                if let Some(target) = index.resolve_target(value) {
                    index
                        .aliases
                        .entry(target)
                        .or_default()
                        .push(name.clone());
                }
            }
        }

        // /chosen: role -> node path, written as a path string or phandle.
        if let Some(chosen_node) = index.nodes.get("/chosen") {
            for (role, value) in &chosen_node.props {
                if let Some(target) = index.resolve_target(value) {
                    index.chosen.insert(role.clone(), target);
                }
            }
        }

        // Per-identifier instance ordinals in path order.
        let mut counters: BTreeMap<String, usize> = BTreeMap::new();
        let mut instances: BTreeMap<String, Vec<(String, usize)>> = BTreeMap::new();
        for (path, node) in &index.nodes {
            let Some(Value::Strings(compats)) = node.props.get("compatible") else {
                continue;
            };
            let mut entries = Vec::with_capacity(compats.len());
            for compat in compats {
                let counter = counters.entry(compat.clone()).or_insert(0);
                entries.push((compat.clone(), *counter));
                *counter += 1;
            }
            instances.insert(path.clone(), entries);
        }
        index.instances = instances;

        index
    }

    /// A property value that points at a node: a path string or a phandle.
    fn resolve_target(&self, value: &Value) -> Option<String> {
        match value {
            Value::Strings(s) if !s.is_empty() && self.nodes.contains_key(&s[0]) => {
                Some(s[0].clone())
            }
            Value::Cells(_) => {
                let ph = value.as_u32()?;
                self.phandles.get(&ph).cloned()
            }
            _ => None,
        }
    }

    /// Look up a node by full path.
    #[must_use]
    pub fn node(&self, path: &str) -> Option<&Node> {
        self.nodes.get(path)
    }

    /// Iterate every node in path order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.nodes.iter().map(|(p, n)| (p.as_str(), n))
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node's device identifier: the first `compatible` string of the
    /// node itself or, failing that, of its nearest ancestor.
    #[must_use]
    pub fn compat_of<'s>(&'s self, path: &'s str) -> Option<&'s str> {
        let (_, value) = self.ancestor_prop(path, "compatible")?;
        match value {
            Value::Strings(s) => s.first().map(String::as_str),
            _ => None,
        }
    }

    /// The node's own `compatible` list, if it has one.
    #[must_use]
    pub fn compat_list_of(&self, path: &str) -> Option<&[String]> {
        match self.node(path)?.props.get("compatible")? {
            Value::Strings(s) => Some(s),
            _ => None,
        }
    }

    /// Nearest node (self included, then ancestors) carrying the property.
    /// Returns the owning path and the value. The owning path may be a
    /// suffix-trimmed view of `path` itself, so the result borrows both the
    /// index and the queried path.
    #[must_use]
    pub fn ancestor_prop<'s>(&'s self, path: &'s str, name: &str) -> Option<(&'s str, &'s Value)> {
        let mut current = Some(path);
        while let Some(p) = current {
            if let Some(node) = self.nodes.get(p) {
                if let Some(value) = node.props.get(name) {
                    return Some((p, value));
                }
            }
            current = parent_path(p);
        }
        None
    }

    /// Every identifier string appearing anywhere in the tree.
    #[must_use]
    pub fn all_compats(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for node in self.nodes.values() {
            if let Some(Value::Strings(compats)) = node.props.get("compatible") {
                out.extend(compats.iter().cloned());
            }
        }
        out
    }

    /// `#address-cells` / `#size-cells` governing this node's `reg`,
    /// read from the parent. Defaults to 2 address cells and 1 size
    /// cell, the values dtc assumes when a parent does not say.
    #[must_use]
    pub fn addr_size_cells(&self, path: &str) -> (usize, usize) {
        let parent = parent_path(path).and_then(|p| self.node(p));
        let get = |name: &str, default: usize| {
            parent
                .and_then(|n| n.props.get(name))
                .and_then(Value::as_u32)
                .map_or(default, |v| v as usize)
        };
        (get("#address-cells", 2), get("#size-cells", 1))
    }

    /// Map a child-bus address to the root address space by applying each
    /// ancestor's `ranges` translation.
    ///
    /// An empty `ranges` is the identity. A missing `ranges`, or an address
    /// not covered by any entry, stops the translation at that level.
    #[must_use]
    pub fn translate_address(&self, path: &str, addr: u64) -> u64 {
        let Some(parent) = parent_path(path) else {
            return addr;
        };
        let Some(parent_node) = self.node(parent) else {
            return addr;
        };

        let cells = match parent_node.props.get("ranges") {
            None => return addr,
            Some(Value::Bool(_)) => return self.translate_address(parent, addr),
            Some(Value::Cells(cells)) if cells.is_empty() => {
                return self.translate_address(parent, addr);
            }
            Some(Value::Cells(cells)) => cells,
            Some(_) => return addr,
        };

        let child_na = parent_node
            .props
            .get("#address-cells")
            .and_then(Value::as_u32)
            .map_or(2, |v| v as usize);
        let child_ns = parent_node
            .props
            .get("#size-cells")
            .and_then(Value::as_u32)
            .map_or(1, |v| v as usize);
        let (parent_na, _) = self.addr_size_cells(parent);

        let chunk = child_na + parent_na + child_ns;
        if chunk == 0 {
            return addr;
        }
        for entry in cells.chunks_exact(chunk) {
            let child_base = cells_to_u64(&entry[..child_na]);
            let parent_base = cells_to_u64(&entry[child_na..child_na + parent_na]);
            let length = cells_to_u64(&entry[child_na + parent_na..]);
            if addr >= child_base && addr - child_base < length {
                let translated = addr - child_base + parent_base;
                return self.translate_address(parent, translated);
            }
        }
        addr
    }

    /// Node path for a phandle value.
    #[must_use]
    pub fn phandle_target(&self, phandle: u32) -> Option<&str> {
        self.phandles.get(&phandle).map(String::as_str)
    }

    /// Alias names pointing at a node (possibly empty).
    #[must_use]
    pub fn aliases_of(&self, path: &str) -> &[String] {
        self.aliases.get(path).map_or(&[], Vec::as_slice)
    }

    /// The full alias table: node path -> alias names.
    #[must_use]
    pub fn alias_table(&self) -> &BTreeMap<String, Vec<String>> {
        &self.aliases
    }

    /// The chosen table: role -> node path.
    #[must_use]
    pub fn chosen(&self) -> &BTreeMap<String, String> {
        &self.chosen
    }

    /// Per-identifier instance ordinals for a node: for every string in its
    /// `compatible` list, the node's ordinal among all nodes carrying that
    /// string, counted in path order.
    #[must_use]
    pub fn instances_of(&self, path: &str) -> &[(String, usize)] {
        self.instances.get(path).map_or(&[], Vec::as_slice)
    }
}

fn flatten(node: &SourceNode, path: &str, out: &mut BTreeMap<String, Node>) {
    out.insert(
        path.to_string(),
        Node {
            props: node.props.clone(),
            labels: node.labels.clone(),
        },
    );
    for (name, child) in &node.children {
        let child_path = if path == "/" {
            format!("/{name}")
        } else {
            format!("{path}/{name}")
        };
        flatten(child, &child_path, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn index(src: &str) -> NodeIndex {
        NodeIndex::build(&parse(src).unwrap())
    }

    #[test]
    fn parent_and_basename() {
        assert_eq!(parent_path("/"), None);
        assert_eq!(parent_path("/soc"), Some("/"));
        assert_eq!(parent_path("/soc/uart@0"), Some("/soc"));
        assert_eq!(basename("/soc/uart@0"), "uart@0");
        assert_eq!(basename("chosen"), "chosen");
    }

    #[test]
    fn compat_walks_ancestors() {
        let idx = index(
            r#"
/ {
    flash@0 {
        compatible = "vnd,flash";
        partitions {
            partition@0 { label = "boot"; };
        };
    };
};
"#,
        );
        assert_eq!(idx.compat_of("/flash@0/partitions/partition@0"), Some("vnd,flash"));
        assert_eq!(idx.compat_of("/flash@0"), Some("vnd,flash"));
        assert_eq!(idx.compat_list_of("/flash@0/partitions/partition@0"), None);
    }

    #[test]
    fn ancestor_prop_returns_the_owning_node() {
        let idx = index(
            r#"
/ {
    soc {
        interrupt-parent = <1>;
        uart@1000 { };
    };
};
"#,
        );
        // The owner is a prefix view of the queried path.
        let path = String::from("/soc/uart@1000");
        let (owner, value) = idx.ancestor_prop(&path, "interrupt-parent").unwrap();
        assert_eq!(owner, "/soc");
        assert_eq!(value.as_u32(), Some(1));
        assert!(idx.ancestor_prop(&path, "clock-frequency").is_none());
    }

    #[test]
    fn aliases_accumulate_per_node() {
        let idx = index(
            r#"
/ {
    leds { led_0: led0 { }; };
    aliases {
        led0 = &led_0;
        status-led = &led_0;
    };
};
"#,
        );
        assert_eq!(idx.aliases_of("/leds/led0"), ["led0", "status-led"]);
        assert!(idx.aliases_of("/leds").is_empty());
    }

    #[test]
    fn chosen_accepts_paths_refs_and_phandles() {
        let idx = index(
            r#"
/ {
    soc {
        con: uart@1000 { };
        mem: sram@20000000 { };
    };
    chosen {
        vnd,console = &con;
        vnd,sram = "/soc/sram@20000000";
        vnd,flash = <&mem>;
    };
};
"#,
        );
        assert_eq!(idx.chosen()["vnd,console"], "/soc/uart@1000");
        assert_eq!(idx.chosen()["vnd,sram"], "/soc/sram@20000000");
        assert_eq!(idx.chosen()["vnd,flash"], "/soc/sram@20000000");
    }

    #[test]
    fn addr_size_cells_from_parent_with_defaults() {
        let idx = index(
            r#"
/ {
    soc {
        #address-cells = <1>;
        #size-cells = <1>;
        uart@1000 { };
    };
    orphan { };
};
"#,
        );
        assert_eq!(idx.addr_size_cells("/soc/uart@1000"), (1, 1));
        assert_eq!(idx.addr_size_cells("/orphan"), (2, 1));
    }

    #[test]
    fn translate_through_ranges() {
        let idx = index(
            r#"
/ {
    #address-cells = <1>;
    #size-cells = <1>;
    bridge {
        #address-cells = <1>;
        #size-cells = <1>;
        ranges = <0x0 0x80000000 0x10000>;
        dev@4000 { };
    };
};
"#,
        );
        assert_eq!(idx.translate_address("/bridge/dev@4000", 0x4000), 0x8000_4000);
        // Outside every range entry: untranslated.
        assert_eq!(idx.translate_address("/bridge/dev@4000", 0x2000_0000), 0x2000_0000);
    }

    #[test]
    fn empty_ranges_is_identity() {
        let idx = index(
            r#"
/ {
    soc {
        ranges;
        uart@1000 { };
    };
};
"#,
        );
        assert_eq!(idx.translate_address("/soc/uart@1000", 0x1000), 0x1000);
    }

    #[test]
    fn instance_ordinals_follow_path_order() {
        let idx = index(
            r#"
/ {
    soc {
        uart@2000 { compatible = "vnd,uart"; };
        uart@1000 { compatible = "vnd,uart", "vnd,serial"; };
    };
};
"#,
        );
        assert_eq!(
            idx.instances_of("/soc/uart@1000"),
            [("vnd,uart".to_string(), 0), ("vnd,serial".to_string(), 0)]
        );
        assert_eq!(idx.instances_of("/soc/uart@2000"), [("vnd,uart".to_string(), 1)]);
    }

    #[test]
    fn all_compats_unions_every_list() {
        let idx = index(
            r#"
/ {
    a { compatible = "vnd,one"; };
    b { compatible = "vnd,two", "vnd,three"; };
};
"#,
        );
        let compats = idx.all_compats();
        assert!(compats.contains("vnd,one"));
        assert!(compats.contains("vnd,two"));
        assert!(compats.contains("vnd,three"));
        assert_eq!(compats.len(), 3);
    }
}
