//! Property extractors and the routing table that selects between them.
//!
//! Each submodule turns one family of devicetree properties into symbol
//! definitions:
//! - [`reg`] consumes address/size registers
//! - [`interrupts`] resolves interrupt controllers and their cells
//! - [`compatible`] emits the identifier strings and presence markers
//! - [`pinctrl`] follows pin-configuration phandles into pin groups
//! - [`clocks`] handles clock references and the fixed-clock frequency
//! - [`controller`] covers generic phandle-with-cells arrays (`gpios`, ...)
//! - [`flash`] owns partition nodes and the chosen-flash pass
//! - [`default`] is the fallback for plain typed values

pub(crate) mod clocks;
pub(crate) mod compatible;
pub(crate) mod controller;
pub(crate) mod default;
pub(crate) mod flash;
pub(crate) mod interrupts;
pub(crate) mod pinctrl;
pub(crate) mod reg;

/// Extractor families a property can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
    Reg,
    Interrupts,
    Compatible,
    Pinctrl,
    Clocks,
    Controller,
    Default,
}

enum Matcher {
    Exact(&'static str),
    Prefix(&'static str),
    Contains(&'static str),
}

impl Matcher {
    fn matches(&self, prop: &str) -> bool {
        match self {
            Self::Exact(s) => prop == *s,
            Self::Prefix(s) => prop.starts_with(s),
            Self::Contains(s) => prop.contains(s),
        }
    }
}

/// First match wins; everything unrouted falls through to [`default`].
const ROUTES: &[(Matcher, Route)] = &[
    (Matcher::Exact("reg"), Route::Reg),
    (Matcher::Exact("interrupts"), Route::Interrupts),
    (Matcher::Exact("interrupts-extended"), Route::Interrupts),
    (Matcher::Exact("compatible"), Route::Compatible),
    (Matcher::Prefix("pinctrl-"), Route::Pinctrl),
    (Matcher::Contains("clocks"), Route::Clocks),
    (Matcher::Contains("pwms"), Route::Controller),
    (Matcher::Contains("gpios"), Route::Controller),
];

pub(crate) fn route(prop: &str) -> Route {
    for (matcher, route) in ROUTES {
        if matcher.matches(prop) {
            return *route;
        }
    }
    Route::Default
}
