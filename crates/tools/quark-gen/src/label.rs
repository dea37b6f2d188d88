//! Symbol-label construction rules.

use quark_dts::{NodeIndex, basename};

/// Folds a devicetree name into a C identifier fragment: uppercase, with
/// the separator characters `-,@/.+` replaced by `_`.
#[must_use]
pub fn str2ident(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '-' | ',' | '@' | '/' | '.' | '+' => '_',
            _ => c.to_ascii_uppercase(),
        })
        .collect()
}

/// A node's base symbol label, without the `DT_` namespace prefix.
///
/// The label is `<IDENT(compat)>_<IDENT(unit)>`: the device identifier in
/// scope for the node, then the unit address translated to the root address
/// space and rendered in hex. A unit that does not parse as hex is folded
/// verbatim; a path with no unit address at all falls back to the last path
/// segment. Returns `None` when no identifier is in scope.
#[must_use]
pub fn node_label(index: &NodeIndex, path: &str) -> Option<String> {
    let compat = index.compat_of(path)?;
    let mut label = str2ident(compat);
    label.push('_');
    match path.rsplit_once('@') {
        Some((_, unit)) => match u64::from_str_radix(unit, 16) {
            Ok(addr) => {
                let addr = index.translate_address(path, addr);
                label.push_str(&str2ident(&format!("{addr:x}")));
            }
            Err(_) => label.push_str(&str2ident(unit)),
        },
        None => label.push_str(&str2ident(basename(path))),
    }
    Some(label)
}

/// Alias name a bus child derives from one of its parent's aliases:
/// `<parent-alias>-<compat>-<unit>`, with `@` and `,` folded to `-`.
#[must_use]
pub fn bus_alias(parent_alias: &str, compat: &str, path: &str) -> String {
    let unit = path.rsplit_once('@').map_or(path, |(_, u)| u);
    let stripped = format!("{compat}-{unit}").replace(['@', ','], "-");
    format!("{parent_alias}-{stripped}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use quark_dts::parse;

    #[test]
    fn ident_folds_separators_and_uppercases() {
        assert_eq!(str2ident("st,stm32-usart"), "ST_STM32_USART");
        assert_eq!(str2ident("usart@40011000"), "USART_40011000");
        assert_eq!(str2ident("ns16550a+"), "NS16550A_");
        assert_eq!(str2ident("soc/uart.0"), "SOC_UART_0");
    }

    #[test]
    fn label_uses_translated_unit_address() {
        let source = r#"
            / {
                #address-cells = <1>;
                #size-cells = <1>;
                soc {
                    #address-cells = <1>;
                    #size-cells = <1>;
                    ranges = <0x0 0x40000000 0x10000000>;
                    uart@11000 {
                        compatible = "vnd,uart";
                    };
                };
            };
        "#;
        let tree = parse(source).unwrap();
        let index = NodeIndex::build(&tree);
        assert_eq!(
            node_label(&index, "/soc/uart@11000").as_deref(),
            Some("VND_UART_40011000")
        );
    }

    #[test]
    fn label_falls_back_to_path_segment_without_unit() {
        let source = r#"
            / {
                leds {
                    compatible = "gpio-leds";
                };
            };
        "#;
        let tree = parse(source).unwrap();
        let index = NodeIndex::build(&tree);
        assert_eq!(node_label(&index, "/leds").as_deref(), Some("GPIO_LEDS_LEDS"));
    }

    #[test]
    fn unitless_node_under_united_parent_keeps_trailing_path() {
        let source = r#"
            / {
                flash@8000000 {
                    compatible = "vnd,flash";
                    partitions {
                        compatible = "fixed-partitions";
                    };
                };
            };
        "#;
        let tree = parse(source).unwrap();
        let index = NodeIndex::build(&tree);
        assert_eq!(
            node_label(&index, "/flash@8000000/partitions").as_deref(),
            Some("FIXED_PARTITIONS_8000000_PARTITIONS")
        );
    }

    #[test]
    fn bus_alias_folds_compat_and_unit() {
        assert_eq!(
            bus_alias("eeprom0", "ti,ads1013", "/soc/i2c@40005400/eeprom@50"),
            "eeprom0-ti-ads1013-50"
        );
    }
}
