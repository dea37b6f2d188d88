//! `reg` extraction: base addresses and sizes.

use anyhow::Result;

use crate::defs::DefValue;
use crate::generate::Generator;
use crate::label::str2ident;
use quark_dts::{Value, cells_to_u64};

/// Consumes `#address-cells` address cells then `#size-cells` size cells per
/// element. Addresses are translated into the root address space; a combined
/// or translated address renders hex, an untouched single cell keeps its
/// source radix. Sizes are divided by `div` (1024 for the chosen-memory
/// pass) and render decimal whenever scaled. With `fan_out` every label
/// spreads to the node's alias and instance labels.
pub(crate) fn extract(
    g: &mut Generator<'_>,
    node: &str,
    label: &str,
    value: &Value,
    names: &[String],
    div: u64,
    fan_out: bool,
) -> Result<()> {
    let Some(cells) = value.as_cells() else {
        return Ok(());
    };
    let (na, ns) = g.index.addr_size_cells(node);
    if na + ns == 0 {
        return Ok(());
    }
    let count = cells.len() / (na + ns);

    for (i, pair) in cells.chunks_exact(na + ns).enumerate() {
        let raw = cells_to_u64(&pair[..na]);
        let addr = g.index.translate_address(node, raw);
        let addr_value = if na == 1 && addr == raw {
            DefValue::cell(pair[0])
        } else {
            DefValue::Hex(addr)
        };
        let addr_suffix = indexed("BASE_ADDRESS", i, count);
        emit(g, node, label, &addr_suffix, addr_value, fan_out);
        if let Some(name) = names.get(i) {
            g.store.alias(
                node,
                &format!("{}_{}_BASE_ADDRESS", label, str2ident(name)),
                &format!("{label}_{addr_suffix}"),
            );
        }

        if ns == 0 {
            continue;
        }
        let size = cells_to_u64(&pair[na..]);
        let size_value = if div == 1 && ns == 1 {
            DefValue::cell(pair[na])
        } else {
            DefValue::Int(size / div)
        };
        let size_suffix = indexed("SIZE", i, count);
        emit(g, node, label, &size_suffix, size_value, fan_out);
        if let Some(name) = names.get(i) {
            g.store.alias(
                node,
                &format!("{}_{}_SIZE", label, str2ident(name)),
                &format!("{label}_{size_suffix}"),
            );
        }
    }
    Ok(())
}

fn indexed(base: &str, i: usize, count: usize) -> String {
    if count > 1 {
        format!("{base}_{i}")
    } else {
        base.to_string()
    }
}

fn emit(g: &mut Generator<'_>, node: &str, label: &str, suffix: &str, value: DefValue, fan_out: bool) {
    if fan_out {
        g.emit(node, label, suffix, value);
    } else {
        g.emit_plain(node, &format!("{label}_{suffix}"), value);
    }
}
