//! Devicetree definition generator.
//!
//! Processes a flattened devicetree source together with YAML device
//! bindings and writes the resulting symbolic definitions as a C header
//! and/or a key/value fragment for build-system consumption.
//!
//! Pipeline: parse source → index nodes → load bindings → generate
//!           definitions → render artifacts.

mod cli;
mod verbose;

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use quark_dts::NodeIndex;
use quark_gen::{BindingIndex, Diagnostics, Options, render_conf, render_header};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    verbose::init(cli.quiet, cli.verbose);

    let source = fs::read_to_string(&cli.dts)
        .with_context(|| format!("reading {}", cli.dts.display()))?;
    let tree = quark_dts::parse(&source)
        .with_context(|| format!("parsing {}", cli.dts.display()))?;
    let index = NodeIndex::build(&tree);
    crate::verbose::vprintln!("indexed {} nodes from {}", index.len(), cli.dts.display());

    let mut diag = Diagnostics::new();
    let bindings = BindingIndex::load(&cli.bindings, &index, &mut diag)?;
    crate::verbose::vprintln!("resolved {} bindings", bindings.len());

    let opts = Options {
        old_alias_names: cli.old_alias_names,
    };
    let store = quark_gen::generate(&index, &bindings, &opts, &mut diag)?;

    if !verbose::is_quiet() {
        for warning in diag.warnings() {
            eprintln!("warning: {warning}");
        }
    }

    // Outputs are written only once generation has fully succeeded, so a
    // failed run never leaves a truncated artifact behind.
    if let Some(ref path) = cli.keyvalue {
        fs::write(path, render_conf(&store))
            .with_context(|| format!("writing {}", path.display()))?;
        crate::verbose::dprintln!("wrote {}", path.display());
    }
    if let Some(ref path) = cli.header {
        fs::write(path, render_header(&store))
            .with_context(|| format!("writing {}", path.display()))?;
        crate::verbose::dprintln!("wrote {}", path.display());
    }

    let total: usize = store.nodes().map(|(_, defs)| defs.defs().count()).sum();
    crate::verbose::vprintln!(
        "{} definitions across {} nodes, {} warnings",
        total,
        store.nodes().count(),
        diag.len()
    );

    Ok(())
}
