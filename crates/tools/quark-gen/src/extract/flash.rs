//! Flash partitions and the chosen-flash pass.

use anyhow::{Context, Result};

use crate::defs::DefValue;
use crate::extract::reg;
use crate::generate::{Generator, companion_names};
use crate::label::str2ident;
use quark_dts::{Value, cells_to_u64};

/// Emits the `DT_FLASH_AREA_<NAME>_*` block for one partition node.
///
/// A partition may be reached both from its own walk visit and from a
/// nested-schema recursion; the first visit wins and assigns the area ID,
/// so IDs count up in sorted path order.
pub(crate) fn partition(g: &mut Generator<'_>, path: &str) -> Result<()> {
    if !g.partitions.insert(path.to_string()) {
        return Ok(());
    }
    let node = g
        .index
        .node(path)
        .with_context(|| format!("partition {path} does not exist"))?;
    let name = node
        .props
        .get("label")
        .and_then(Value::as_str)
        .with_context(|| format!("partition {path} has no 'label' property"))?;
    let prefix = format!("DT_FLASH_AREA_{}", str2ident(name));

    g.emit_plain(path, &format!("{prefix}_LABEL"), DefValue::quoted(name));
    let read_only = matches!(node.props.get("read-only"), Some(Value::Bool(true)));
    g.emit_plain(
        path,
        &format!("{prefix}_READ_ONLY"),
        DefValue::Int(u64::from(read_only)),
    );

    let (na, ns) = g.index.addr_size_cells(path);
    let cells = node.props.get("reg").and_then(Value::as_cells).unwrap_or(&[]);
    let mut pairs = 0;
    if na + ns > 0 {
        for (i, pair) in cells.chunks_exact(na + ns).enumerate() {
            let offset = cells_to_u64(&pair[..na]);
            let size = cells_to_u64(&pair[na..]);
            g.emit_plain(path, &format!("{prefix}_OFFSET_{i}"), DefValue::Int(offset));
            g.emit_plain(path, &format!("{prefix}_SIZE_{i}"), DefValue::Int(size));
            pairs += 1;
        }
    }
    if pairs > 0 {
        g.store
            .alias(path, &format!("{prefix}_OFFSET"), &format!("{prefix}_OFFSET_0"));
        g.store
            .alias(path, &format!("{prefix}_SIZE"), &format!("{prefix}_SIZE_0"));
    }

    let id = g.flash_areas;
    g.flash_areas += 1;
    g.emit_plain(path, &format!("{prefix}_ID"), DefValue::Int(id));
    Ok(())
}

/// The chosen-flash pass: `DT_FLASH_*` for the chosen flash device and
/// `DT_CODE_PARTITION_*` for the chosen code partition. The code partition
/// defaults to the flash choice, which yields zero offset and size; the
/// flash choice defaults to the `dummy-flash` pseudo-address, where both
/// families come out zeroed.
pub(crate) fn chosen(g: &mut Generator<'_>) -> Result<()> {
    let flash = g.index.chosen().get("quark,flash").map(String::as_str);
    match flash {
        None => {
            g.emit_plain("dummy-flash", "DT_FLASH_BASE_ADDRESS", DefValue::Int(0));
            g.emit_plain("dummy-flash", "DT_FLASH_SIZE", DefValue::Int(0));
        }
        Some(path) => {
            let node = g
                .index
                .node(path)
                .with_context(|| format!("chosen quark,flash node {path} does not exist"))?;
            let reg_value = node
                .props
                .get("reg")
                .with_context(|| format!("chosen quark,flash node {path} has no 'reg' property"))?;
            let names = companion_names(node, "reg");
            reg::extract(g, path, "DT_FLASH", reg_value, &names, 1024, false)?;

            let block_sizes = [
                ("write-block-size", "DT_FLASH_WRITE_BLOCK_SIZE", "FLASH_WRITE_BLOCK_SIZE"),
                ("erase-block-size", "DT_FLASH_ERASE_BLOCK_SIZE", "FLASH_ERASE_BLOCK_SIZE"),
            ];
            for (prop, name, legacy) in block_sizes {
                let Some(first) = node
                    .props
                    .get(prop)
                    .and_then(Value::as_cells)
                    .and_then(<[_]>::first)
                else {
                    continue;
                };
                g.emit_plain(path, name, DefValue::cell(*first));
                g.store.alias(path, legacy, name);
            }
        }
    }

    let code = g
        .index
        .chosen()
        .get("quark,code-partition")
        .map(String::as_str)
        .or(flash);
    match (code, flash) {
        (None, _) => {
            g.emit_plain("dummy-flash", "DT_CODE_PARTITION_OFFSET", DefValue::Int(0));
            g.emit_plain("dummy-flash", "DT_CODE_PARTITION_SIZE", DefValue::Int(0));
        }
        (Some(code), Some(flash)) if code == flash => {
            g.emit_plain(code, "DT_CODE_PARTITION_OFFSET", DefValue::Int(0));
            g.emit_plain(code, "DT_CODE_PARTITION_SIZE", DefValue::Int(0));
        }
        (Some(code), _) => {
            let cells = g
                .index
                .node(code)
                .and_then(|n| n.props.get("reg"))
                .and_then(Value::as_cells)
                .with_context(|| {
                    format!("chosen quark,code-partition node {code} has no 'reg' property")
                })?;
            let (na, ns) = g.index.addr_size_cells(code);
            let pair = cells
                .get(..na + ns)
                .with_context(|| format!("'reg' of chosen quark,code-partition {code} is too short"))?;
            let offset = cells_to_u64(&pair[..na]);
            let size = cells_to_u64(&pair[na..]);
            g.emit_plain(code, "DT_CODE_PARTITION_OFFSET", DefValue::Int(offset));
            g.emit_plain(code, "DT_CODE_PARTITION_SIZE", DefValue::Int(size));
        }
    }
    Ok(())
}
