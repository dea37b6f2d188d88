//! Recursive descent parser for devicetree source.
//!
//! Produces a raw tree ([`RawTree`]) from a token stream, then
//! [`resolve_references`] merges `&label {}` reopenings, assigns phandles,
//! and rewrites every `&label` reference into its final form.

use std::collections::BTreeMap;

use crate::DtsError;
use crate::lexer::{Token, TokenKind};
use crate::tree::{Cell, SourceNode, SourceTree, Value};

/// A cell as written: either a literal or an unresolved `&label`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawCell {
    /// A numeric cell with its source radix.
    Num(Cell),
    /// A `&label` reference, resolved to a phandle later.
    Ref(String),
}

/// A property value before reference resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// Valueless property.
    Bool,
    /// Flattened `< ... >` groups.
    Cells(Vec<RawCell>),
    /// Quoted strings.
    Strings(Vec<String>),
    /// `[ ... ]` bytes.
    Bytes(Vec<u8>),
    /// Bare `&label` assignments, resolved to node paths later.
    RefPaths(Vec<String>),
}

/// A node before reference resolution.
#[derive(Debug, Clone, Default)]
pub struct RawNode {
    /// Node name including unit address; empty for the root.
    pub name: String,
    /// Labels attached to this node.
    pub labels: Vec<String>,
    /// Properties in name order.
    pub props: BTreeMap<String, RawValue>,
    /// Children in name order.
    pub children: BTreeMap<String, RawNode>,
}

impl RawNode {
    fn merge(&mut self, other: RawNode) {
        for label in other.labels {
            if !self.labels.contains(&label) {
                self.labels.push(label);
            }
        }
        self.props.extend(other.props);
        for (name, child) in other.children {
            match self.children.get_mut(&name) {
                Some(existing) => existing.merge(child),
                None => {
                    self.children.insert(name, child);
                }
            }
        }
    }
}

/// Parser output: the root tree plus `&label {}` blocks awaiting merge.
#[derive(Debug, Default)]
pub struct RawTree {
    /// The merged root node blocks.
    pub root: RawNode,
    /// `&label { ... };` blocks in source order.
    pub reopens: Vec<(String, RawNode)>,
}

/// Parser state: a cursor over the token stream.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Create a new parser from a token stream.
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse the entire token stream into a [`RawTree`].
    ///
    /// # Errors
    ///
    /// Returns [`DtsError::Parse`] when the stream does not match the DTS
    /// grammar.
    pub fn parse(&mut self) -> Result<RawTree, DtsError> {
        let mut tree = RawTree::default();
        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Slash => {
                    self.advance();
                    match self.peek_kind() {
                        // `/ { ... };` root node block
                        TokenKind::LBrace => {
                            let node = self.parse_node_body(String::new(), Vec::new())?;
                            tree.root.merge(node);
                        }
                        // `/dts-v1/;` or `/memreserve/ a b;`
                        TokenKind::Ident(_) => self.parse_directive()?,
                        _ => return Err(self.unexpected("'{' or a directive name")),
                    }
                }
                TokenKind::Ref(_) => {
                    let label = self.expect_ref()?;
                    let node = self.parse_node_body(String::new(), Vec::new())?;
                    tree.reopens.push((label, node));
                }
                _ => return Err(self.unexpected("'/' or '&label' at top level")),
            }
        }
        Ok(tree)
    }

    /// Parse a directive after its leading '/': `dts-v1/;` or
    /// `memreserve/ <addr> <len>;`. Reserve entries are accepted and
    /// discarded.
    fn parse_directive(&mut self) -> Result<(), DtsError> {
        let name = self.expect_ident()?;
        self.expect(&TokenKind::Slash, "'/'")?;
        match name.as_str() {
            "dts-v1" => {}
            "memreserve" => {
                self.expect_u64()?;
                self.expect_u64()?;
            }
            _ => {
                return Err(self.error_here(&format!("unknown directive '/{name}/'")));
            }
        }
        self.expect(&TokenKind::Semi, "';'")?;
        Ok(())
    }

    /// Parse `{ body };` into a node with the given name and labels.
    fn parse_node_body(&mut self, name: String, labels: Vec<String>) -> Result<RawNode, DtsError> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut node = RawNode {
            name,
            labels,
            ..RawNode::default()
        };

        loop {
            match self.peek_kind() {
                TokenKind::RBrace => {
                    self.advance();
                    break;
                }
                TokenKind::Ident(_) => {
                    // Collect `label:` prefixes, then decide between a
                    // property and a child node.
                    let mut labels = Vec::new();
                    let mut word = self.expect_ident()?;
                    while self.peek_kind() == &TokenKind::Colon {
                        self.advance();
                        labels.push(word);
                        word = self.expect_ident()?;
                    }

                    match self.peek_kind() {
                        TokenKind::LBrace => {
                            let child = self.parse_node_body(word.clone(), labels)?;
                            match node.children.get_mut(&word) {
                                Some(existing) => existing.merge(child),
                                None => {
                                    node.children.insert(word, child);
                                }
                            }
                        }
                        TokenKind::Semi => {
                            self.advance();
                            if !labels.is_empty() {
                                return Err(
                                    self.error_here("labels are not allowed on properties")
                                );
                            }
                            node.props.insert(word, RawValue::Bool);
                        }
                        TokenKind::Eq => {
                            self.advance();
                            if !labels.is_empty() {
                                return Err(
                                    self.error_here("labels are not allowed on properties")
                                );
                            }
                            let value = self.parse_value()?;
                            self.expect(&TokenKind::Semi, "';'")?;
                            node.props.insert(word, value);
                        }
                        _ => return Err(self.unexpected("'{', '=', or ';' after name")),
                    }
                }
                _ => return Err(self.unexpected("a name or '}' inside node body")),
            }
        }

        self.expect(&TokenKind::Semi, "';' after '}'")?;
        Ok(node)
    }

    /// Parse the value groups of a property assignment.
    fn parse_value(&mut self) -> Result<RawValue, DtsError> {
        let mut cells: Vec<RawCell> = Vec::new();
        let mut strings: Vec<String> = Vec::new();
        let mut bytes: Vec<u8> = Vec::new();
        let mut ref_paths: Vec<String> = Vec::new();
        let mut saw_cells = false;

        loop {
            match self.peek_kind().clone() {
                TokenKind::Lt => {
                    self.advance();
                    saw_cells = true;
                    loop {
                        match self.peek_kind().clone() {
                            TokenKind::Gt => {
                                self.advance();
                                break;
                            }
                            TokenKind::Number(raw) => {
                                self.advance();
                                cells.push(RawCell::Num(self.parse_cell(&raw)?));
                            }
                            TokenKind::Ref(label) => {
                                self.advance();
                                cells.push(RawCell::Ref(label));
                            }
                            _ => return Err(self.unexpected("a cell value or '>'")),
                        }
                    }
                }
                TokenKind::Str(s) => {
                    self.advance();
                    strings.push(s);
                }
                TokenKind::LBracket => {
                    self.advance();
                    loop {
                        match self.peek_kind().clone() {
                            TokenKind::RBracket => {
                                self.advance();
                                break;
                            }
                            TokenKind::Number(raw) => {
                                self.advance();
                                self.parse_byte_run(&raw, &mut bytes)?;
                            }
                            TokenKind::Ident(raw) => {
                                self.advance();
                                self.parse_byte_run(&raw, &mut bytes)?;
                            }
                            _ => return Err(self.unexpected("hex bytes or ']'")),
                        }
                    }
                }
                TokenKind::Ref(label) => {
                    self.advance();
                    ref_paths.push(label);
                }
                _ => return Err(self.unexpected("a property value")),
            }

            if self.peek_kind() == &TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }

        let kinds_used = usize::from(saw_cells)
            + usize::from(!strings.is_empty())
            + usize::from(!bytes.is_empty())
            + usize::from(!ref_paths.is_empty());
        if kinds_used > 1 {
            return Err(self.error_here("mixed value kinds in one property"));
        }

        Ok(if saw_cells {
            RawValue::Cells(cells)
        } else if !strings.is_empty() {
            RawValue::Strings(strings)
        } else if !bytes.is_empty() {
            RawValue::Bytes(bytes)
        } else {
            RawValue::RefPaths(ref_paths)
        })
    }

    /// Parse one cell literal, preserving its radix.
    fn parse_cell(&mut self, raw: &str) -> Result<Cell, DtsError> {
        if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            u32::from_str_radix(hex, 16)
                .map(Cell::hex)
                .map_err(|_| self.error_here(&format!("invalid hex cell '{raw}'")))
        } else {
            raw.parse::<u32>()
                .map(Cell::new)
                .map_err(|_| self.error_here(&format!("invalid cell '{raw}'")))
        }
    }

    /// Decode a run of hex byte pairs inside `[ ... ]`.
    fn parse_byte_run(&mut self, raw: &str, out: &mut Vec<u8>) -> Result<(), DtsError> {
        if raw.len() % 2 != 0 {
            return Err(self.error_here(&format!("odd-length byte run '{raw}'")));
        }
        for i in (0..raw.len()).step_by(2) {
            let byte = u8::from_str_radix(&raw[i..i + 2], 16)
                .map_err(|_| self.error_here(&format!("invalid byte run '{raw}'")))?;
            out.push(byte);
        }
        Ok(())
    }

    // ---- Helpers ----

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn error_here(&self, msg: &str) -> DtsError {
        let span = self.peek().span;
        DtsError::Parse {
            line: span.line,
            col: span.col,
            msg: msg.to_string(),
        }
    }

    fn unexpected(&self, wanted: &str) -> DtsError {
        self.error_here(&format!("expected {wanted}, got {:?}", self.peek().kind))
    }

    fn expect(&mut self, kind: &TokenKind, wanted: &str) -> Result<(), DtsError> {
        if self.peek_kind() == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(wanted))
        }
    }

    fn expect_ident(&mut self) -> Result<String, DtsError> {
        match self.peek_kind().clone() {
            TokenKind::Ident(s) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected("a name")),
        }
    }

    fn expect_ref(&mut self) -> Result<String, DtsError> {
        match self.peek_kind().clone() {
            TokenKind::Ref(s) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected("'&label'")),
        }
    }

    fn expect_u64(&mut self) -> Result<u64, DtsError> {
        match self.peek_kind().clone() {
            TokenKind::Number(raw) => {
                self.advance();
                let parsed = if let Some(hex) =
                    raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))
                {
                    u64::from_str_radix(hex, 16)
                } else {
                    raw.parse::<u64>()
                };
                parsed.map_err(|_| self.error_here(&format!("invalid integer '{raw}'")))
            }
            _ => Err(self.unexpected("an integer")),
        }
    }
}

// ===========================================================================
// Reference resolution
// ===========================================================================

/// Merge reopened nodes and resolve every `&label` reference.
///
/// References inside cell lists become phandles. A target with an explicit
/// `phandle` (or `linux,phandle`) property keeps that number; other targets
/// are assigned the lowest free numbers in path order, and the assignment is
/// written back as a `phandle` property so flattened views agree with the
/// reference table. Bare `= &label` values become path strings.
///
/// # Errors
///
/// Returns [`DtsError::DuplicateLabel`] or [`DtsError::UnknownLabel`] when
/// the label graph is inconsistent.
pub fn resolve_references(mut raw: RawTree) -> Result<SourceTree, DtsError> {
    // Merge `&label {}` blocks in source order. Each merge can introduce new
    // labels, so the label map is rebuilt per block.
    let reopens = std::mem::take(&mut raw.reopens);
    for (label, block) in reopens {
        let labels = collect_labels(&raw.root)?;
        let path = labels
            .get(&label)
            .ok_or_else(|| DtsError::UnknownLabel(label.clone()))?
            .clone();
        node_at_mut(&mut raw.root, &path).merge(block);
    }

    let labels = collect_labels(&raw.root)?;

    // Collect every label referenced from a cell list; these need phandles.
    let mut cell_refs: Vec<String> = Vec::new();
    collect_cell_refs(&raw.root, &mut cell_refs);
    for label in &cell_refs {
        if !labels.contains_key(label) {
            return Err(DtsError::UnknownLabel(label.clone()));
        }
    }

    // Phandle assignment is per target node (a node may carry several
    // labels): explicit properties win, the rest get the lowest free
    // numbers in path order.
    let mut phandles: BTreeMap<String, u32> = BTreeMap::new();
    let mut used: Vec<u32> = Vec::new();
    let mut targets: Vec<String> = cell_refs.iter().map(|l| labels[l.as_str()].clone()).collect();
    targets.sort();
    targets.dedup();

    for path in &targets {
        if let Some(v) = explicit_phandle(&raw.root, path) {
            phandles.insert(path.clone(), v);
            used.push(v);
        }
    }
    let mut next = 1u32;
    for path in &targets {
        if phandles.contains_key(path) {
            continue;
        }
        while used.contains(&next) {
            next += 1;
        }
        phandles.insert(path.clone(), next);
        used.push(next);
        next += 1;
    }

    // Write allocated phandles back onto their targets.
    for (path, value) in &phandles {
        let node = node_at_mut(&mut raw.root, path);
        if !node.props.contains_key("phandle") && !node.props.contains_key("linux,phandle") {
            node.props.insert(
                "phandle".to_string(),
                RawValue::Cells(vec![RawCell::Num(Cell::new(*value))]),
            );
        }
    }

    let root = finalize(raw.root, &labels, &phandles)?;
    Ok(SourceTree { root })
}

/// Walk the tree collecting `label -> path`, rejecting duplicates.
fn collect_labels(root: &RawNode) -> Result<BTreeMap<String, String>, DtsError> {
    fn walk(
        node: &RawNode,
        path: &str,
        out: &mut BTreeMap<String, String>,
    ) -> Result<(), DtsError> {
        for label in &node.labels {
            if let Some(existing) = out.get(label) {
                if existing != path {
                    return Err(DtsError::DuplicateLabel(label.clone()));
                }
            } else {
                out.insert(label.clone(), path.to_string());
            }
        }
        for (name, child) in &node.children {
            let child_path = join_path(path, name);
            walk(child, &child_path, out)?;
        }
        Ok(())
    }

    let mut out = BTreeMap::new();
    walk(root, "/", &mut out)?;
    Ok(out)
}

fn join_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

fn collect_cell_refs(node: &RawNode, out: &mut Vec<String>) {
    for value in node.props.values() {
        if let RawValue::Cells(cells) = value {
            for cell in cells {
                if let RawCell::Ref(label) = cell {
                    out.push(label.clone());
                }
            }
        }
    }
    for child in node.children.values() {
        collect_cell_refs(child, out);
    }
}

fn node_at_mut<'a>(root: &'a mut RawNode, path: &str) -> &'a mut RawNode {
    let mut node = root;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        node = node
            .children
            .get_mut(segment)
            .unwrap_or_else(|| panic!("path '{path}' must exist once labels resolve"));
    }
    node
}

fn explicit_phandle(root: &RawNode, path: &str) -> Option<u32> {
    let mut node = root;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        node = node.children.get(segment)?;
    }
    let value = node
        .props
        .get("phandle")
        .or_else(|| node.props.get("linux,phandle"))?;
    match value {
        RawValue::Cells(cells) => match cells.as_slice() {
            [RawCell::Num(c)] => Some(c.value),
            _ => None,
        },
        _ => None,
    }
}

/// Rewrite raw values into their final form.
fn finalize(
    raw: RawNode,
    labels: &BTreeMap<String, String>,
    phandles: &BTreeMap<String, u32>,
) -> Result<SourceNode, DtsError> {
    let mut node = SourceNode {
        name: raw.name,
        labels: raw.labels,
        props: BTreeMap::new(),
        children: BTreeMap::new(),
    };

    for (name, value) in raw.props {
        let resolved = match value {
            RawValue::Bool => Value::Bool(true),
            RawValue::Strings(s) => Value::Strings(s),
            RawValue::Bytes(b) => Value::Bytes(b),
            RawValue::Cells(cells) => {
                let mut out = Vec::with_capacity(cells.len());
                for cell in cells {
                    out.push(match cell {
                        RawCell::Num(c) => c,
                        RawCell::Ref(label) => {
                            let value = labels
                                .get(&label)
                                .and_then(|path| phandles.get(path))
                                .ok_or_else(|| DtsError::UnknownLabel(label.clone()))?;
                            Cell::new(*value)
                        }
                    });
                }
                Value::Cells(out)
            }
            RawValue::RefPaths(refs) => {
                let mut paths = Vec::with_capacity(refs.len());
                for label in refs {
                    let path = labels
                        .get(&label)
                        .ok_or_else(|| DtsError::UnknownLabel(label.clone()))?;
                    paths.push(path.clone());
                }
                Value::Strings(paths)
            }
        };
        node.props.insert(name, resolved);
    }

    for (name, child) in raw.children {
        node.children.insert(name, finalize(child, labels, phandles)?);
    }

    Ok(node)
}
