//! Controller-cell arrays: `gpios`, `pwms`, `cs-gpios` and friends.
//!
//! These properties are sequences of `<phandle arg...>` groups. The
//! referenced controller dictates the group width through its
//! `#<tail>-cells` property and names the arguments through its binding's
//! `#cells` list.

use anyhow::{Context, Result};

use crate::defs::DefValue;
use crate::generate::Generator;
use crate::label::str2ident;
use quark_dts::{Cell, NodeIndex, Value};

pub(crate) fn extract(
    g: &mut Generator<'_>,
    node: &str,
    label: &str,
    prop: &str,
    value: &Value,
    names: &[String],
) -> Result<()> {
    extract_with_stem(g, node, label, prop, &str2ident(prop), value, names)
}

/// The shared machinery, parameterized over the label stem so the clocks
/// extractor can reuse it with its singular `CLOCK` spelling.
///
/// Per element: `<label>_<stem>_CONTROLLER[_<e>]` carries the controller's
/// quoted `label` property (skipped when it has none) and
/// `<label>_<stem>_<CELL>[_<e>]` carries each argument with its source
/// radix. A companion name for element `e` aliases
/// `<label>_<NAME>_<stem>_<CELL>` onto the indexed labels.
pub(crate) fn extract_with_stem(
    g: &mut Generator<'_>,
    node: &str,
    label: &str,
    prop: &str,
    stem: &str,
    value: &Value,
    names: &[String],
) -> Result<()> {
    let Some(cells) = value.as_cells() else {
        return Ok(());
    };
    let elements = split(g.index, node, prop, cells)?;
    let multi = elements.len() > 1;

    for (e, (ctrl, args)) in elements.iter().enumerate() {
        let binding = g
            .bindings
            .binding_for(g.index, ctrl)
            .with_context(|| format!("controller {ctrl} referenced by {node} has no loaded binding"))?;

        let ctrl_label = g
            .index
            .node(ctrl)
            .and_then(|n| n.props.get("label"))
            .and_then(Value::as_str);
        if let Some(ctrl_label) = ctrl_label {
            let suffix = indexed(&format!("{stem}_CONTROLLER"), e, multi);
            g.emit(node, label, &suffix, DefValue::quoted(ctrl_label));
        }

        for (j, cell) in args.iter().enumerate() {
            let cell_name = binding.cell_names.get(j).with_context(|| {
                format!(
                    "controller {ctrl} binding names {} cells, '{prop}' of {node} supplies {}",
                    binding.cell_names.len(),
                    args.len()
                )
            })?;
            let ident = str2ident(cell_name);
            let body = if ident == stem {
                stem.to_string()
            } else {
                format!("{stem}_{ident}")
            };
            let suffix = indexed(&body, e, multi);
            g.emit(node, label, &suffix, DefValue::cell(*cell));
            if let Some(name) = names.get(e) {
                g.store.alias(
                    node,
                    &format!("{}_{}_{body}", label, str2ident(name)),
                    &format!("{label}_{suffix}"),
                );
            }
        }
    }
    Ok(())
}

/// Splits a phandle-with-cells sequence into `(controller, args)` groups.
///
/// The group width comes from the controller's `#<tail>-cells` property,
/// where `tail` is the last dash-separated word of the property name minus
/// its trailing character (`cs-gpios` consults `#gpio-cells`).
pub(crate) fn split<'t, 'v>(
    index: &'t NodeIndex,
    node: &str,
    prop: &str,
    cells: &'v [Cell],
) -> Result<Vec<(&'t str, &'v [Cell])>> {
    let generic = &prop[..prop.len().saturating_sub(1)];
    let tail = generic.rsplit('-').next().unwrap_or(generic);
    let cells_prop = format!("#{tail}-cells");

    let mut elements = Vec::new();
    let mut pos = 0;
    while pos < cells.len() {
        let ph = cells[pos].value;
        let ctrl = index
            .phandle_target(ph)
            .with_context(|| format!("phandle {ph} in '{prop}' of {node} does not resolve"))?;
        let nargs = index
            .node(ctrl)
            .and_then(|n| n.props.get(&cells_prop))
            .and_then(Value::as_u32)
            .with_context(|| {
                format!("controller {ctrl} referenced by {node} has no '{cells_prop}' property")
            })? as usize;
        let end = (pos + 1 + nargs).min(cells.len());
        elements.push((ctrl, &cells[pos + 1..end]));
        pos += 1 + nargs;
    }
    Ok(elements)
}

fn indexed(base: &str, e: usize, multi: bool) -> String {
    if multi {
        format!("{base}_{e}")
    } else {
        base.to_string()
    }
}
