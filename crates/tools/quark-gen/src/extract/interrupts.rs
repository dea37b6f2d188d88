//! Interrupt extraction: `interrupts` and `interrupts-extended`.

use anyhow::{Context, Result};

use crate::defs::DefValue;
use crate::generate::Generator;
use crate::label::str2ident;
use quark_dts::{Cell, Value};

/// Splits the property into interrupt specifiers and emits one label per
/// cell. For `interrupts` the controller is the nearest `interrupt-parent`
/// (self included); `interrupts-extended` carries a controller phandle per
/// element. Element width is the controller's `#interrupt-cells`, cell names
/// come from the controller binding's `#cells` list, and a cell literally
/// named `irq` collapses into the `IRQ_<i>` prefix.
pub(crate) fn extract(
    g: &mut Generator<'_>,
    node: &str,
    label: &str,
    prop: &str,
    value: &Value,
    names: &[String],
) -> Result<()> {
    let Some(cells) = value.as_cells() else {
        return Ok(());
    };

    let mut elements: Vec<(&str, &[Cell])> = Vec::new();
    if prop == "interrupts-extended" {
        let mut pos = 0;
        while pos < cells.len() {
            let ph = cells[pos].value;
            let ctrl = g
                .index
                .phandle_target(ph)
                .with_context(|| format!("phandle {ph} in '{prop}' of {node} does not resolve"))?;
            let width = interrupt_cells(g, ctrl)?;
            let end = (pos + 1 + width).min(cells.len());
            elements.push((ctrl, &cells[pos + 1..end]));
            pos += 1 + width;
        }
    } else {
        let (_, parent_ref) = g
            .index
            .ancestor_prop(node, "interrupt-parent")
            .with_context(|| format!("{node} has no 'interrupt-parent' in scope"))?;
        let ph = parent_ref
            .as_u32()
            .with_context(|| format!("'interrupt-parent' above {node} is not a phandle"))?;
        let ctrl = g
            .index
            .phandle_target(ph)
            .with_context(|| format!("'interrupt-parent' above {node} does not resolve"))?;
        let width = interrupt_cells(g, ctrl)?;
        if width == 0 {
            return Ok(());
        }
        for chunk in cells.chunks_exact(width) {
            elements.push((ctrl, chunk));
        }
    }

    for (i, (ctrl, args)) in elements.iter().enumerate() {
        let binding = g
            .bindings
            .binding_for(g.index, ctrl)
            .with_context(|| format!("interrupt controller {ctrl} has no loaded binding"))?;
        for (j, cell) in args.iter().enumerate() {
            let cell_name = binding.cell_names.get(j).with_context(|| {
                format!(
                    "interrupt controller {ctrl} binding names {} cells, {node} supplies {}",
                    binding.cell_names.len(),
                    args.len()
                )
            })?;
            let ident = str2ident(cell_name);
            let suffix = if ident == "IRQ" {
                format!("IRQ_{i}")
            } else {
                format!("IRQ_{i}_{ident}")
            };
            g.emit(node, label, &suffix, DefValue::cell(*cell));
            if let Some(name) = names.get(i) {
                let named = if ident == "IRQ" {
                    format!("IRQ_{}", str2ident(name))
                } else {
                    format!("IRQ_{}_{}", str2ident(name), ident)
                };
                g.store
                    .alias(node, &format!("{label}_{named}"), &format!("{label}_{suffix}"));
            }
        }
    }
    Ok(())
}

fn interrupt_cells(g: &Generator<'_>, ctrl: &str) -> Result<usize> {
    let width = g
        .index
        .node(ctrl)
        .and_then(|n| n.props.get("#interrupt-cells"))
        .and_then(Value::as_u32)
        .with_context(|| format!("interrupt controller {ctrl} has no '#interrupt-cells'"))?;
    Ok(width as usize)
}
