//! `quark-dts` --- a standalone devicetree source (DTS) parser.
//!
//! This crate parses devicetree source text in the flattened form produced
//! by `dtc -O dts` (all includes expanded, one tree per file) and builds a
//! [`NodeIndex`]: a flat, path-keyed view of every node with its properties,
//! plus the phandle, alias, and chosen lookup tables that generators need.
//!
//! # Usage
//!
//! ```ignore
//! let tree = quark_dts::parse(&source)?;
//! let index = NodeIndex::build(&tree);
//! for (path, node) in index.nodes() {
//!     // ...
//! }
//! if let Some(compat) = index.compat_of("/soc/serial@40011000") {
//!     // ...
//! }
//! ```

#![warn(missing_docs)]

pub mod index;
pub mod lexer;
pub mod parser;
pub mod tree;

pub use index::{Node, NodeIndex, basename, parent_path};
pub use tree::{Cell, SourceNode, SourceTree, Value, cells_to_u64};

/// Errors that can occur while parsing devicetree source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DtsError {
    /// The tokenizer rejected the input text.
    Lex {
        /// 1-based source line.
        line: usize,
        /// 1-based source column.
        col: usize,
        /// What was wrong.
        msg: String,
    },
    /// The parser rejected the token stream.
    Parse {
        /// 1-based source line.
        line: usize,
        /// 1-based source column.
        col: usize,
        /// What was wrong.
        msg: String,
    },
    /// A `&label` reference names a label no node declares.
    UnknownLabel(String),
    /// The same label is attached to more than one node.
    DuplicateLabel(String),
}

impl std::fmt::Display for DtsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lex { line, col, msg } => write!(f, "{line}:{col}: {msg}"),
            Self::Parse { line, col, msg } => write!(f, "{line}:{col}: {msg}"),
            Self::UnknownLabel(l) => write!(f, "reference to undefined label '&{l}'"),
            Self::DuplicateLabel(l) => write!(f, "label '{l}' is declared on more than one node"),
        }
    }
}

impl std::error::Error for DtsError {}

/// Parse devicetree source text into a [`SourceTree`].
///
/// Resolves every `&label` reference: references inside cell lists become
/// phandle values (allocating phandles for targets that lack an explicit
/// `phandle` property), and bare `= &label` assignments become the target
/// node's full path string.
///
/// # Errors
///
/// Returns a [`DtsError`] for malformed input or unresolvable references.
pub fn parse(source: &str) -> Result<SourceTree, DtsError> {
    let tokens = lexer::tokenize(source)?;
    let mut parser = parser::Parser::new(tokens);
    let tree = parser.parse()?;
    parser::resolve_references(tree)
}
