//! Binding-driven definition generator for devicetree sources.
//!
//! This crate turns a parsed devicetree (from `quark-dts`) plus a set of
//! YAML device bindings into a flat store of named definitions, then renders
//! that store as a C header of `#define`s and as a key/value fragment for
//! build-system consumption.
//!
//! # Pipeline
//!
//! 1. [`bindings::BindingIndex::load`] discovers and resolves the YAML
//!    bindings that match the tree's `compatible` strings, flattening
//!    `inherits` chains.
//! 2. [`generate::generate`] walks the tree, routes each schema-matched
//!    property to an extractor, and fills a [`defs::DefStore`].
//! 3. [`artifact::render_header`] and [`artifact::render_conf`] turn the
//!    finished store into the output artifacts.
//!
//! Generation is deterministic: the same tree and bindings always produce
//! byte-identical artifacts.

pub mod artifact;
pub mod bindings;
pub mod defs;
pub mod diag;
pub mod generate;
pub mod label;

mod extract;

pub use artifact::{render_conf, render_header};
pub use bindings::{Binding, BindingIndex, PropSpec};
pub use defs::{DefStore, DefValue, NodeDefs};
pub use diag::Diagnostics;
pub use generate::{Options, generate};
