//! The generic fallback extractor for plain typed values.

use anyhow::Result;

use crate::defs::DefValue;
use crate::generate::Generator;
use crate::label::str2ident;
use quark_dts::Value;

/// Emits `<label>_<IDENT(prop)>` from the value shape: booleans become 1/0
/// (absence included), strings are quoted, lists index their entries, byte
/// strings index hex byte values, and scalar cells keep their source radix.
pub(crate) fn extract(
    g: &mut Generator<'_>,
    node: &str,
    label: &str,
    prop: &str,
    value: Option<&Value>,
) -> Result<()> {
    let base = str2ident(prop);
    match value {
        None | Some(Value::Bool(false)) => g.emit(node, label, &base, DefValue::Int(0)),
        Some(Value::Bool(true)) => g.emit(node, label, &base, DefValue::Int(1)),
        Some(Value::Strings(strings)) => match strings.as_slice() {
            [single] => g.emit(node, label, &base, DefValue::quoted(single)),
            _ => {
                for (i, s) in strings.iter().enumerate() {
                    g.emit(node, label, &format!("{base}_{i}"), DefValue::quoted(s));
                }
            }
        },
        Some(Value::Cells(cells)) => match cells.as_slice() {
            [single] => g.emit(node, label, &base, DefValue::cell(*single)),
            _ => {
                for (i, c) in cells.iter().enumerate() {
                    g.emit(node, label, &format!("{base}_{i}"), DefValue::cell(*c));
                }
            }
        },
        Some(Value::Bytes(bytes)) => {
            for (i, b) in bytes.iter().enumerate() {
                g.emit(node, label, &format!("{base}_{i}"), DefValue::Hex(u64::from(*b)));
            }
        }
    }
    Ok(())
}
