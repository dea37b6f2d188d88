//! The generation pass: walk the node index, match schemas, emit symbols.
//!
//! [`generate`] owns the whole pipeline between a loaded tree and the
//! finished [`DefStore`]: the sorted node walk, per-property routing into
//! the typed extractors, bus validation, and the chosen-role passes that
//! run once the walk is complete.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result, bail, ensure};
use quark_dts::{Node, NodeIndex, Value, parent_path};
use regex::Regex;

use crate::bindings::{Binding, BindingIndex, PropSpec};
use crate::defs::{DefStore, DefValue};
use crate::diag::Diagnostics;
use crate::extract::{self, Route};
use crate::label::{bus_alias, node_label, str2ident};

/// Generation switches.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Additionally emit alias labels without the `DT_ALIAS_` namespace.
    pub old_alias_names: bool,
}

/// Administrative properties that never reach an extractor directly.
/// The `-names` entries are consumed as companions of their base property.
const FILTER_LIST: &[&str] = &["interrupt-names", "reg-names", "phandle", "linux,phandle"];

/// Runs the full generation pass over an indexed tree.
///
/// Walks every node in sorted path order, extracts definitions for the ones
/// with a loaded binding, then applies the chosen-role passes. Warnings land
/// in `diag`; unrecoverable conditions (bus mismatch, unresolvable
/// controller references, an empty result) come back as errors.
pub fn generate(
    index: &NodeIndex,
    bindings: &BindingIndex,
    opts: &Options,
    diag: &mut Diagnostics,
) -> Result<DefStore> {
    let generator = Generator {
        index,
        bindings,
        opts,
        diag,
        aliases: index.alias_table().clone(),
        store: DefStore::new(),
        partitions: BTreeSet::new(),
        flash_areas: 0,
    };
    generator.run()
}

/// Shared state of one generation run.
///
/// The extractors receive `&mut Generator` and emit through it; the alias
/// table is a working copy because bus-parent propagation appends derived
/// alias names mid-walk.
pub(crate) struct Generator<'a> {
    pub(crate) index: &'a NodeIndex,
    pub(crate) bindings: &'a BindingIndex,
    pub(crate) opts: &'a Options,
    pub(crate) diag: &'a mut Diagnostics,
    pub(crate) aliases: BTreeMap<String, Vec<String>>,
    pub(crate) store: DefStore,
    pub(crate) partitions: BTreeSet<String>,
    pub(crate) flash_areas: u64,
}

impl Generator<'_> {
    fn run(mut self) -> Result<DefStore> {
        for (path, _) in self.index.nodes() {
            self.visit_node(path)?;
        }
        ensure!(!self.store.is_empty(), "no definitions were generated");

        self.chosen_memory()?;
        self.chosen_device_names()?;
        extract::flash::chosen(&mut self)?;
        self.chosen_flags();
        Ok(self.store)
    }

    // ===== node dispatch =====

    fn visit_node(&mut self, path: &str) -> Result<()> {
        let Some(binding) = self.bindings.binding_for(self.index, path) else {
            return Ok(());
        };
        if path.contains("partition@") {
            return extract::flash::partition(self, path);
        }

        let label = self.base_label(path)?;
        if let Some(bus) = binding.parent_bus.as_deref() {
            self.check_bus(path, &label, bus)?;
        }
        self.apply_schema(path, path, &label, binding, &binding.properties)
    }

    /// Applies one schema map to one node: nested sub-schemas recurse over
    /// the walk root's descendants, terminal entries match and dispatch.
    fn apply_schema(
        &mut self,
        root: &str,
        node_path: &str,
        label: &str,
        binding: &Binding,
        schema: &BTreeMap<String, PropSpec>,
    ) -> Result<()> {
        let Some(node) = self.index.node(node_path) else {
            return Ok(());
        };

        for (pattern, spec) in schema {
            if let Some(nested) = &spec.properties {
                let prefix = format!("{root}/");
                for (desc, _) in self.index.nodes() {
                    if !desc.starts_with(&prefix) {
                        continue;
                    }
                    if desc.contains("partition@") {
                        extract::flash::partition(self, desc)?;
                        continue;
                    }
                    let desc_label = self.base_label(desc)?;
                    self.apply_schema(root, desc, &desc_label, binding, nested)?;
                }
            }
            if !spec.is_generated() {
                continue;
            }

            let re = Regex::new(&format!("^(?:{pattern})$")).with_context(|| {
                format!(
                    "invalid property pattern '{}' in {}",
                    pattern,
                    binding.path.display()
                )
            })?;

            let mut matched = false;
            for (name, value) in &node.props {
                if FILTER_LIST.contains(&name.as_str()) || !re.is_match(name) {
                    continue;
                }
                let names = companion_names(node, name);
                self.dispatch(node_path, label, name, value, &names)?;
                matched = true;
            }
            // Presence-style booleans surface even when absent.
            if !matched && spec.is_boolean() {
                extract::default::extract(self, node_path, label, pattern, None)?;
            }
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        node: &str,
        label: &str,
        prop: &str,
        value: &Value,
        names: &[String],
    ) -> Result<()> {
        match extract::route(prop) {
            Route::Reg => extract::reg::extract(self, node, label, value, names, 1, true),
            Route::Interrupts => {
                extract::interrupts::extract(self, node, label, prop, value, names)
            }
            Route::Compatible => extract::compatible::extract(self, node, label, value),
            Route::Pinctrl => extract::pinctrl::extract(self, node, label, prop, value, names),
            Route::Clocks => extract::clocks::extract(self, node, label, prop, value, names),
            Route::Controller => extract::controller::extract(self, node, label, prop, value, names),
            Route::Default => extract::default::extract(self, node, label, prop, Some(value)),
        }
    }

    // ===== labels and fan-out =====

    /// The node's base symbol label. A device on a declared bus carries its
    /// parent's label as a prefix.
    fn base_label(&self, path: &str) -> Result<String> {
        let core = node_label(self.index, path)
            .with_context(|| format!("no device identifier for node {path}"))?;
        let on_bus = self
            .bindings
            .binding_for(self.index, path)
            .is_some_and(|b| b.parent_bus.is_some());
        if on_bus {
            let parent = parent_path(path)
                .with_context(|| format!("bus device {path} has no parent node"))?;
            let parent_core = node_label(self.index, parent)
                .with_context(|| format!("no device identifier for node {parent}"))?;
            Ok(format!("DT_{parent_core}_{core}"))
        } else {
            Ok(format!("DT_{core}"))
        }
    }

    /// Inserts `<label>_<suffix>` and fans it out to the node's instance
    /// labels and alias labels.
    pub(crate) fn emit(&mut self, path: &str, label: &str, suffix: &str, value: DefValue) {
        let name = format!("{label}_{suffix}");
        self.store.insert(path, &name, value, self.diag);
        for (compat, ordinal) in self.index.instances_of(path) {
            let instance = format!("DT_{}_{}_{}", str2ident(compat), ordinal, suffix);
            self.store.alias(path, &instance, &name);
        }
        if let Some(aliases) = self.aliases.get(path) {
            for alias in aliases {
                let ident = str2ident(alias);
                self.store
                    .alias(path, &format!("DT_ALIAS_{ident}_{suffix}"), &name);
                if self.opts.old_alias_names {
                    self.store.alias(path, &format!("{ident}_{suffix}"), &name);
                }
            }
        }
    }

    /// Inserts one definition with no fan-out.
    pub(crate) fn emit_plain(&mut self, addr: &str, name: &str, value: DefValue) {
        self.store.insert(addr, name, value, self.diag);
    }

    // ===== bus handling =====

    /// Validates the parent of a bus device and wires the child into the
    /// parent's namespace: `<label>_BUS_NAME`, plus every parent alias
    /// propagated as `<alias>-<compat>-<unit>`.
    fn check_bus(&mut self, path: &str, label: &str, bus: &str) -> Result<()> {
        let parent = parent_path(path)
            .with_context(|| format!("bus device {path} has no parent node"))?;
        let parent_binding = self
            .bindings
            .binding_for(self.index, parent)
            .with_context(|| format!("parent {parent} of bus device {path} has no loaded binding"))?;
        match parent_binding.child_bus.as_deref() {
            Some(provided) if provided == bus => {}
            Some(provided) => bail!(
                "{path} expects bus '{bus}' but parent {parent} provides bus '{provided}'"
            ),
            None => bail!(
                "{path} expects bus '{bus}' but parent {parent} declares no child bus"
            ),
        }

        let compat = self
            .index
            .compat_of(path)
            .with_context(|| format!("no device identifier for node {path}"))?;
        let parent_aliases = self.aliases.get(parent).cloned().unwrap_or_default();
        for alias in parent_aliases {
            let derived = bus_alias(&alias, compat, path);
            let entry = self.aliases.entry(path.to_string()).or_default();
            if !entry.contains(&derived) {
                entry.push(derived);
            }
        }

        let parent_label = self
            .index
            .node(parent)
            .and_then(|n| n.props.get("label"))
            .and_then(Value::as_str)
            .with_context(|| format!("parent {parent} of {path} has no 'label' property"))?;
        self.emit(path, label, "BUS_NAME", DefValue::quoted(parent_label));
        Ok(())
    }

    // ===== chosen-role passes =====

    fn chosen_memory(&mut self) -> Result<()> {
        for (role, label) in [("quark,sram", "DT_SRAM"), ("quark,ccm", "DT_CCM")] {
            let Some(path) = self.index.chosen().get(role).map(String::as_str) else {
                continue;
            };
            let reg = self
                .index
                .node(path)
                .and_then(|n| n.props.get("reg"))
                .with_context(|| format!("chosen {role} node {path} has no 'reg' property"))?;
            extract::reg::extract(self, path, label, reg, &[], 1024, false)?;
        }
        Ok(())
    }

    fn chosen_device_names(&mut self) -> Result<()> {
        let roles = [
            ("quark,console", "DT_UART_CONSOLE_ON_DEV_NAME"),
            ("quark,shell-uart", "DT_UART_SHELL_ON_DEV_NAME"),
            ("quark,uart-pipe", "DT_UART_PIPE_ON_DEV_NAME"),
        ];
        for (role, name) in roles {
            let Some(path) = self.index.chosen().get(role).map(String::as_str) else {
                continue;
            };
            let device = self
                .index
                .node(path)
                .and_then(|n| n.props.get("label"))
                .and_then(Value::as_str)
                .with_context(|| format!("chosen {role} node {path} has no 'label' property"))?;
            self.emit_plain(path, name, DefValue::quoted(device));
        }
        Ok(())
    }

    fn chosen_flags(&mut self) {
        for role in self.index.chosen().keys() {
            let name = format!("DT_CHOSEN_{}", str2ident(role));
            self.emit_plain("chosen", &name, DefValue::Int(1));
        }
    }
}

/// The companion `-names` list for a property: `pinctrl-names` for the pin
/// control family, `<stem>-names` (declared name minus one character) with a
/// `<name>-names` fallback for everything else.
pub(crate) fn companion_names(node: &Node, prop: &str) -> Vec<String> {
    let key = if prop.contains("pinctrl-") {
        "pinctrl-names".to_string()
    } else if prop.ends_with("-names") || prop.is_empty() {
        return Vec::new();
    } else {
        let clipped = format!("{}-names", &prop[..prop.len() - 1]);
        if node.props.contains_key(&clipped) {
            clipped
        } else {
            format!("{prop}-names")
        }
    };
    match node.props.get(&key) {
        Some(Value::Strings(names)) => names.clone(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quark_dts::Cell;

    fn node_with(props: &[(&str, Value)]) -> Node {
        Node {
            props: props
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            labels: Vec::new(),
        }
    }

    #[test]
    fn companion_lookup_clips_one_character_first() {
        let node = node_with(&[
            ("cs-gpios", Value::Cells(vec![Cell::new(1)])),
            ("cs-gpio-names", Value::Strings(vec!["flash".into()])),
        ]);
        assert_eq!(companion_names(&node, "cs-gpios"), ["flash"]);
    }

    #[test]
    fn companion_lookup_falls_back_to_full_name() {
        let node = node_with(&[
            ("reg", Value::Cells(vec![Cell::new(0)])),
            ("reg-names", Value::Strings(vec!["ctrl".into(), "mem".into()])),
        ]);
        assert_eq!(companion_names(&node, "reg"), ["ctrl", "mem"]);
    }

    #[test]
    fn pinctrl_family_shares_one_companion() {
        let node = node_with(&[(
            "pinctrl-names",
            Value::Strings(vec!["default".into(), "sleep".into()]),
        )]);
        assert_eq!(companion_names(&node, "pinctrl-0"), ["default", "sleep"]);
        assert_eq!(companion_names(&node, "pinctrl-1"), ["default", "sleep"]);
    }

    #[test]
    fn names_properties_have_no_companion() {
        let node = node_with(&[(
            "interrupt-names",
            Value::Strings(vec!["rx".into()]),
        )]);
        assert!(companion_names(&node, "interrupt-names").is_empty());
    }
}
