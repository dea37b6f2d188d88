//! Artifact rendering: the C header and the key/value file.
//!
//! Rendering is pure; callers write the returned strings to disk only once
//! the whole store is finalized, so a late failure never leaves a partial
//! artifact behind.

use quark_dts::basename;

use crate::defs::{DefStore, NodeDefs};

const HEADER_GUARD: &str = "GENERATED_DTS_DEFINES_H";

/// Renders the `#define` header for a finished store.
///
/// Addresses render as sorted blocks: a `/* <last path segment> */` comment,
/// the sorted definitions, then the sorted aliases. Values are tab-aligned
/// per block. An alias outside the recognized namespaces is tagged
/// `__DEPRECATED_MACRO` so stale consumers get a compile-time nudge.
#[must_use]
pub fn render_header(store: &DefStore) -> String {
    let mut out = String::from(
        "/*\n * Generated by the quark devicetree processor. Do not edit.\n */\n\n",
    );
    out.push_str(&format!("#ifndef {HEADER_GUARD}\n#define {HEADER_GUARD}\n\n"));
    for (addr, defs) in store.nodes() {
        header_block(&mut out, addr, defs);
    }
    out.push_str("#endif\n");
    out
}

fn header_block(out: &mut String, addr: &str, defs: &NodeDefs) {
    out.push_str(&format!("/* {} */\n", basename(addr)));

    let longest = defs
        .defs()
        .map(|(name, _)| name.len())
        .chain(defs.aliases().map(|(name, _)| name.len()))
        .max()
        .unwrap_or(0);
    let width = longest + "#define ".len();
    let mut value_tabs = (width + 8) / 8;
    if 8 * value_tabs - width <= 2 {
        value_tabs += 1;
    }

    for (name, value) in defs.defs() {
        let lhs = format!("#define {name}");
        push_aligned(out, &lhs, &value.to_string(), value_tabs);
    }
    for (alias, target) in defs.aliases() {
        let lhs = if deprecated(alias) {
            format!("#define {alias} __DEPRECATED_MACRO ")
        } else {
            format!("#define {alias}")
        };
        push_aligned(out, &lhs, target, value_tabs);
    }
    out.push('\n');
}

fn push_aligned(out: &mut String, lhs: &str, rhs: &str, value_tabs: usize) {
    let tabs = value_tabs.saturating_sub(lhs.len() / 8);
    out.push_str(lhs);
    out.push_str(&"\t".repeat(tabs));
    out.push_str(rhs);
    out.push('\n');
}

/// Alias names outside the stable namespaces are emitted for backward
/// compatibility only.
fn deprecated(alias: &str) -> bool {
    !alias.starts_with("DT_")
        && !alias.starts_with("LED")
        && !alias.starts_with("SW")
        && !alias.contains("PWM_LED")
}

/// Renders the key/value artifact for a finished store.
///
/// Only `DT_`-prefixed labels appear. Aliases are flattened to the target's
/// value, following at most one alias-to-alias hop; an alias that still does
/// not reach a value is dropped.
#[must_use]
pub fn render_conf(store: &DefStore) -> String {
    let mut out = String::new();
    for (addr, defs) in store.nodes() {
        let mut lines = Vec::new();
        for (name, value) in defs.defs() {
            if name.starts_with("DT_") {
                lines.push(format!("{name}={value}"));
            }
        }
        for (alias, target) in defs.aliases() {
            if !alias.starts_with("DT_") {
                continue;
            }
            let value = defs
                .get(target)
                .or_else(|| defs.alias_target(target).and_then(|t| defs.get(t)));
            if let Some(value) = value {
                lines.push(format!("{alias}={value}"));
            }
        }
        if lines.is_empty() {
            continue;
        }
        out.push_str(&format!("# {}\n", basename(addr)));
        for line in &lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::DefValue;
    use crate::diag::Diagnostics;

    fn sample_store() -> DefStore {
        let mut diag = Diagnostics::new();
        let mut store = DefStore::new();
        store.insert(
            "/soc/uart@40011000",
            "DT_VND_UART_40011000_BASE_ADDRESS",
            DefValue::Hex(0x4001_1000),
            &mut diag,
        );
        store.insert(
            "/soc/uart@40011000",
            "DT_VND_UART_40011000_SIZE",
            DefValue::Int(1024),
            &mut diag,
        );
        store.alias(
            "/soc/uart@40011000",
            "DT_ALIAS_CON_BASE_ADDRESS",
            "DT_VND_UART_40011000_BASE_ADDRESS",
        );
        assert!(diag.is_empty());
        store
    }

    #[test]
    fn header_has_guard_comment_blocks_and_alignment() {
        let header = render_header(&sample_store());
        assert!(header.starts_with("/*\n * Generated"));
        assert!(header.contains("#ifndef GENERATED_DTS_DEFINES_H\n"));
        assert!(header.ends_with("#endif\n"));
        assert!(header.contains("/* uart@40011000 */\n"));

        // Longest name is 33 chars; "#define " brings the width to 41, so
        // values start at tab stop 6 and the longest line pads one tab.
        assert!(header.contains("#define DT_VND_UART_40011000_BASE_ADDRESS\t0x40011000\n"));
        assert!(header.contains("#define DT_VND_UART_40011000_SIZE\t\t1024\n"));
        assert!(
            header.contains("#define DT_ALIAS_CON_BASE_ADDRESS\t\tDT_VND_UART_40011000_BASE_ADDRESS\n")
        );
    }

    #[test]
    fn header_tags_legacy_aliases_deprecated() {
        let mut store = sample_store();
        store.alias(
            "/soc/uart@40011000",
            "CON_BASE_ADDRESS",
            "DT_VND_UART_40011000_BASE_ADDRESS",
        );
        store.alias(
            "/soc/uart@40011000",
            "LED0_GPIOS_PIN",
            "DT_VND_UART_40011000_SIZE",
        );
        let header = render_header(&store);
        assert!(header.contains("#define CON_BASE_ADDRESS __DEPRECATED_MACRO "));
        assert!(!header.contains("LED0_GPIOS_PIN __DEPRECATED_MACRO"));
    }

    #[test]
    fn conf_flattens_aliases_and_keeps_dt_prefix_only() {
        let mut store = sample_store();
        store.alias(
            "/soc/uart@40011000",
            "CON_BASE_ADDRESS",
            "DT_VND_UART_40011000_BASE_ADDRESS",
        );
        // One alias hop is permitted.
        store.alias(
            "/soc/uart@40011000",
            "DT_ALIAS_SERIAL_BASE_ADDRESS",
            "DT_ALIAS_CON_BASE_ADDRESS",
        );
        // Two hops is not.
        store.alias(
            "/soc/uart@40011000",
            "DT_ALIAS_DEEP_BASE_ADDRESS",
            "DT_ALIAS_SERIAL_BASE_ADDRESS",
        );
        let conf = render_conf(&store);
        assert!(conf.contains("# uart@40011000\n"));
        assert!(conf.contains("DT_VND_UART_40011000_BASE_ADDRESS=0x40011000\n"));
        assert!(conf.contains("DT_ALIAS_CON_BASE_ADDRESS=0x40011000\n"));
        assert!(conf.contains("DT_ALIAS_SERIAL_BASE_ADDRESS=0x40011000\n"));
        assert!(!conf.contains("DT_ALIAS_DEEP_BASE_ADDRESS"));
        assert!(!conf.contains("\nCON_BASE_ADDRESS"));
    }

    #[test]
    fn conf_blocks_end_with_a_blank_line() {
        let conf = render_conf(&sample_store());
        assert!(conf.ends_with("\n\n"));
    }
}
