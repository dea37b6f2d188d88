//! `compatible` extraction: identifier strings and presence markers.

use anyhow::Result;

use crate::defs::DefValue;
use crate::generate::Generator;
use crate::label::str2ident;
use quark_dts::Value;

/// Emits `<label>_COMPATIBLE[_<i>]` with the quoted identifier for every
/// entry, plus a global `DT_COMPAT_<IDENT> = 1` presence marker filed under
/// the `compatibles` pseudo-address.
pub(crate) fn extract(g: &mut Generator<'_>, node: &str, label: &str, value: &Value) -> Result<()> {
    let Value::Strings(compats) = value else {
        return Ok(());
    };
    for (i, compat) in compats.iter().enumerate() {
        let suffix = if compats.len() > 1 {
            format!("COMPATIBLE_{i}")
        } else {
            "COMPATIBLE".to_string()
        };
        g.emit(node, label, &suffix, DefValue::quoted(compat));
        g.emit_plain(
            "compatibles",
            &format!("DT_COMPAT_{}", str2ident(compat)),
            DefValue::Int(1),
        );
    }
    Ok(())
}
