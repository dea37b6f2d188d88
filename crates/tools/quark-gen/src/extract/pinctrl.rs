//! Pin control: `pinctrl-<n>` state references.

use anyhow::{Context, Result};

use crate::defs::DefValue;
use crate::generate::Generator;
use crate::label::str2ident;
use quark_dts::{Value, basename, parent_path};

/// Resolves one pin control state.
///
/// The state index comes from the property name; a non-numeric suffix
/// (`pinctrl-names`) is not a state and extracts nothing. Each phandle names
/// a pin configuration node under a pin controller; the configuration node
/// itself and each of its subnodes form the pin groups. Within a group, the
/// first property whose cell count matches the controller binding's `#cells`
/// list supplies the per-cell values.
pub(crate) fn extract(
    g: &mut Generator<'_>,
    node: &str,
    label: &str,
    prop: &str,
    value: &Value,
    names: &[String],
) -> Result<()> {
    let Some(state) = prop
        .strip_prefix("pinctrl-")
        .and_then(|s| s.parse::<usize>().ok())
    else {
        return Ok(());
    };

    if let Some(name) = names.get(state) {
        g.emit(
            node,
            label,
            &format!("PINCTRL_{state}_NAME"),
            DefValue::quoted(name),
        );
    }

    let Some(cells) = value.as_cells() else {
        return Ok(());
    };
    for cell in cells {
        let ph = cell.value;
        let cfg = g
            .index
            .phandle_target(ph)
            .with_context(|| format!("phandle {ph} in '{prop}' of {node} does not resolve"))?;
        let ctrl = parent_path(cfg)
            .with_context(|| format!("pin configuration {cfg} has no parent node"))?;
        let binding = g
            .bindings
            .binding_for(g.index, ctrl)
            .with_context(|| format!("pin controller {ctrl} has no loaded binding"))?;
        if binding.cell_names.is_empty() {
            continue;
        }

        let prefix = format!("{cfg}/");
        let mut groups = vec![cfg];
        for (path, _) in g.index.nodes() {
            if path.starts_with(&prefix) {
                groups.push(path);
            }
        }

        for group in groups {
            let Some(group_node) = g.index.node(group) else {
                continue;
            };
            let Some(pins) = group_node
                .props
                .values()
                .find_map(|v| v.as_cells().filter(|c| c.len() == binding.cell_names.len()))
            else {
                continue;
            };
            let group_ident = str2ident(basename(group));
            for (j, pin) in pins.iter().enumerate() {
                let cell_ident = str2ident(&binding.cell_names[j]);
                g.emit(
                    node,
                    label,
                    &format!("PINCTRL_{state}_{group_ident}_{cell_ident}"),
                    DefValue::cell(*pin),
                );
            }
        }
    }
    Ok(())
}
