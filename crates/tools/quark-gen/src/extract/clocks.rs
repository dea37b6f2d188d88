//! Clock references: the controller machinery plus the fixed-clock rate.

use anyhow::Result;

use crate::defs::DefValue;
use crate::extract::controller;
use crate::generate::Generator;
use quark_dts::{Value, cells_to_u64};

/// Runs the controller-cell machinery with the singular `CLOCK` stem, then
/// surfaces `<label>_CLOCK_FREQUENCY` from the first referenced controller
/// that carries a `clock-frequency` property (the fixed-clock pattern).
pub(crate) fn extract(
    g: &mut Generator<'_>,
    node: &str,
    label: &str,
    prop: &str,
    value: &Value,
    names: &[String],
) -> Result<()> {
    controller::extract_with_stem(g, node, label, prop, "CLOCK", value, names)?;

    let Some(cells) = value.as_cells() else {
        return Ok(());
    };
    for (ctrl, _) in controller::split(g.index, node, prop, cells)? {
        let Some(freq) = g.index.node(ctrl).and_then(|n| n.props.get("clock-frequency")) else {
            continue;
        };
        if let Some(freq_cells) = freq.as_cells() {
            let value = match freq_cells {
                [single] => DefValue::cell(*single),
                _ => DefValue::Int(cells_to_u64(freq_cells)),
            };
            g.emit(node, label, "CLOCK_FREQUENCY", value);
        }
        break;
    }
    Ok(())
}
