//! Binding documents: discovery, inheritance resolution, and lookup tables.
//!
//! A binding ties a device identifier (a `compatible` string) to the schema
//! of its properties. Documents may name parent documents through an
//! `inherits` key; parents are resolved by basename across every discovered
//! file and merged child-over-parent before the document is filed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, bail, ensure};
use quark_dts::{NodeIndex, parent_path};
use regex::Regex;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use walkdir::WalkDir;

use crate::diag::Diagnostics;

// Marker line tying a binding file to a device identifier. Scanned before
// YAML parsing so unrelated files are skipped cheaply.
static CONSTRAINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s+constraint:\s*"([^"]*)""#).unwrap());

/// Declared schema for one property pattern.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PropSpec {
    /// Value shape tag (`int`, `string`, `boolean`, `array`, ...).
    #[serde(rename = "type")]
    pub ty: Option<String>,
    /// `optional` or `required`.
    pub category: Option<String>,
    /// Present when the entry generates definitions.
    pub generation: Option<String>,
    /// Identifier constraint, as written in the document.
    pub constraint: Option<String>,
    /// Nested schemas describing properties of child nodes.
    pub properties: Option<BTreeMap<String, PropSpec>>,
}

impl PropSpec {
    /// `true` when the entry is marked for definition generation.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.generation.is_some()
    }

    /// `true` for boolean-typed entries.
    #[must_use]
    pub fn is_boolean(&self) -> bool {
        self.ty.as_deref() == Some("boolean")
    }
}

/// One fully merged binding document.
#[derive(Debug, Clone)]
pub struct Binding {
    /// File the document was loaded from.
    pub path: PathBuf,
    /// Device identifier the document binds to.
    pub compat: String,
    /// Short name of the device class.
    pub title: String,
    /// Document version.
    pub version: String,
    /// Free-form description.
    pub description: String,
    /// Bus the device must sit on, when declared (`parent.bus`).
    pub parent_bus: Option<String>,
    /// Bus the device provides to its children, when declared (`child.bus`).
    pub child_bus: Option<String>,
    /// Names for the argument cells of controller references (`#cells`).
    pub cell_names: Vec<String>,
    /// Property pattern -> declared schema.
    pub properties: BTreeMap<String, PropSpec>,
}

impl Binding {
    fn from_doc(path: &Path, compat: String, doc: &Mapping) -> Result<Self> {
        let mut cell_names = Vec::new();
        match doc.get(Value::String("#cells".into())) {
            None => {}
            Some(Value::Sequence(seq)) => {
                for entry in seq {
                    let Some(name) = entry.as_str() else {
                        bail!("{}: '#cells' entries must be names", path.display());
                    };
                    cell_names.push(name.to_string());
                }
            }
            Some(_) => bail!("{}: '#cells' must be a list of names", path.display()),
        }

        let mut properties = BTreeMap::new();
        if let Some(Value::Mapping(props)) = doc.get(Value::String("properties".into())) {
            for (key, value) in props {
                let Some(pattern) = key.as_str() else {
                    bail!("{}: property pattern keys must be strings", path.display());
                };
                let spec: PropSpec = serde_yaml::from_value(value.clone())
                    .with_context(|| format!("{}: property '{pattern}'", path.display()))?;
                properties.insert(pattern.to_string(), spec);
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            compat,
            title: scalar_field(doc, "title"),
            version: scalar_field(doc, "version"),
            description: scalar_field(doc, "description"),
            parent_bus: bus_of(doc, "parent"),
            child_bus: bus_of(doc, "child"),
            cell_names,
            properties,
        })
    }
}

/// The loaded binding tables: identifier -> schema, both plain and scoped
/// by the bus the device sits on.
#[derive(Debug, Default)]
pub struct BindingIndex {
    plain: BTreeMap<String, Binding>,
    by_bus: BTreeMap<String, BTreeMap<String, Binding>>,
}

impl BindingIndex {
    /// Discovers `*.yaml` files under the search directories, loads every
    /// document whose identifier appears in the tree, resolves `inherits`
    /// chains, and files the results.
    ///
    /// Fails when the search turns up no usable binding at all, when an
    /// `inherits` reference is missing or ambiguous, or when the
    /// inheritance graph has a cycle.
    pub fn load(dirs: &[PathBuf], index: &NodeIndex, diag: &mut Diagnostics) -> Result<Self> {
        let files = discover(dirs);
        let mut by_basename: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for file in &files {
            if let Some(name) = file.file_name().and_then(|n| n.to_str()) {
                by_basename
                    .entry(name.to_string())
                    .or_default()
                    .push(file.clone());
            }
        }

        let tree_compats = index.all_compats();
        let mut loader = Loader {
            by_basename: &by_basename,
            cache: BTreeMap::new(),
            stack: Vec::new(),
        };

        let mut plain = BTreeMap::new();
        let mut by_bus: BTreeMap<String, BTreeMap<String, Binding>> = BTreeMap::new();

        for file in &files {
            let Some(compat) = scan_constraint(file)? else {
                continue;
            };
            if !tree_compats.contains(&compat) {
                continue;
            }
            let doc = loader.resolve(file, diag)?;
            let binding = Binding::from_doc(file, compat.clone(), &doc)?;
            match binding.parent_bus.clone() {
                Some(bus) => {
                    by_bus.entry(bus).or_default().insert(compat, binding);
                }
                None => {
                    plain.insert(compat, binding);
                }
            }
        }

        ensure!(
            !plain.is_empty() || !by_bus.is_empty(),
            "no bindings resolved under {}",
            join_paths(dirs)
        );
        Ok(Self { plain, by_bus })
    }

    /// Binding filed for an identifier outside any bus scope.
    #[must_use]
    pub fn get(&self, compat: &str) -> Option<&Binding> {
        self.plain.get(compat)
    }

    /// Binding filed for an identifier on a specific bus.
    #[must_use]
    pub fn get_on_bus(&self, bus: &str, compat: &str) -> Option<&Binding> {
        self.by_bus.get(bus).and_then(|m| m.get(compat))
    }

    /// The schema governing a node.
    ///
    /// Tries each identifier from the node's own `compatible` list in order
    /// (falling back to the identifier inherited from an ancestor when the
    /// node has none). When the structural parent's schema declares
    /// `child.bus`, the matching bus-scoped table is consulted first, then
    /// the plain table, then every bus table; a bus-scoped hit on the wrong
    /// bus is still returned so the caller can reject the placement instead
    /// of silently skipping the device.
    #[must_use]
    pub fn binding_for(&self, index: &NodeIndex, path: &str) -> Option<&Binding> {
        let inherited;
        let candidates: &[String] = match index.compat_list_of(path) {
            Some(list) => list,
            None => {
                inherited = [index.compat_of(path)?.to_string()];
                &inherited
            }
        };

        let parent_child_bus = parent_path(path)
            .and_then(|parent| index.compat_of(parent))
            .and_then(|compat| self.plain.get(compat))
            .and_then(|binding| binding.child_bus.as_deref());

        for compat in candidates {
            if let Some(bus) = parent_child_bus {
                if let Some(binding) = self.get_on_bus(bus, compat) {
                    return Some(binding);
                }
            }
            if let Some(binding) = self.plain.get(compat) {
                return Some(binding);
            }
            if let Some(binding) = self
                .by_bus
                .values()
                .find_map(|table| table.get(compat))
            {
                return Some(binding);
            }
        }
        None
    }

    /// Number of loaded bindings across both tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plain.len() + self.by_bus.values().map(BTreeMap::len).sum::<usize>()
    }

    /// `true` when nothing was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plain.is_empty() && self.by_bus.is_empty()
    }
}

// ===== document loading =====

struct Loader<'a> {
    by_basename: &'a BTreeMap<String, Vec<PathBuf>>,
    cache: BTreeMap<PathBuf, Mapping>,
    stack: Vec<PathBuf>,
}

impl Loader<'_> {
    /// Loads one document with its whole `inherits` chain merged in.
    fn resolve(&mut self, path: &Path, diag: &mut Diagnostics) -> Result<Mapping> {
        if let Some(done) = self.cache.get(path) {
            return Ok(done.clone());
        }
        if self.stack.iter().any(|p| p == path) {
            let mut chain: Vec<String> =
                self.stack.iter().map(|p| p.display().to_string()).collect();
            chain.push(path.display().to_string());
            bail!("binding inheritance cycle: {}", chain.join(" -> "));
        }

        self.stack.push(path.to_path_buf());
        let resolved = self.resolve_inner(path, diag);
        self.stack.pop();

        let doc = resolved?;
        self.cache.insert(path.to_path_buf(), doc.clone());
        Ok(doc)
    }

    fn resolve_inner(&mut self, path: &Path, diag: &mut Diagnostics) -> Result<Mapping> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading binding {}", path.display()))?;
        let doc: Value = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing binding {}", path.display()))?;
        let Value::Mapping(mut doc) = doc else {
            bail!("binding {} is not a mapping at top level", path.display());
        };

        check_descriptive_fields(path, &mut doc, diag);

        let inherits = take_inherits(path, &mut doc)?;
        if inherits.is_empty() {
            return Ok(doc);
        }

        // Later-listed parents merge first, so an earlier parent overrides
        // a later one and the child overrides them all.
        let mut merged = Mapping::new();
        for name in inherits.iter().rev() {
            let parent = self.lookup_basename(name, path)?;
            let parent_doc = self.resolve(&parent, diag)?;
            merge_mappings(&mut merged, parent_doc, path, "binding", diag);
        }
        merge_mappings(&mut merged, doc, path, "binding", diag);
        Ok(merged)
    }

    fn lookup_basename(&self, name: &str, referrer: &Path) -> Result<PathBuf> {
        let key = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name);
        match self.by_basename.get(key) {
            None => bail!(
                "unknown file name '{}' in 'inherits' of {}",
                name,
                referrer.display()
            ),
            Some(candidates) if candidates.len() > 1 => bail!(
                "multiple candidates for file name '{}' in 'inherits' of {}: {}",
                name,
                referrer.display(),
                join_paths(candidates)
            ),
            Some(candidates) => Ok(candidates[0].clone()),
        }
    }
}

/// `title`, `version` and `description` are required on every document;
/// missing ones are synthesized with a warning so the run can proceed.
fn check_descriptive_fields(path: &Path, doc: &mut Mapping, diag: &mut Diagnostics) {
    for field in ["title", "version", "description"] {
        if doc.get(Value::String(field.into())).is_none() {
            let placeholder = format!("<unknown {field}>");
            diag.warn(format!(
                "{}: '{}' missing in binding, using '{}'",
                path.display(),
                field,
                placeholder
            ));
            doc.insert(Value::String(field.into()), Value::String(placeholder));
        }
    }
    if doc.get(Value::String("id".into())).is_some() {
        diag.warn(format!(
            "{}: obsolete 'id' field set, should be removed",
            path.display()
        ));
    }
}

fn take_inherits(path: &Path, doc: &mut Mapping) -> Result<Vec<String>> {
    match doc.remove(Value::String("inherits".into())) {
        None => Ok(Vec::new()),
        Some(Value::String(name)) => Ok(vec![name]),
        Some(Value::Sequence(seq)) => {
            let mut names = Vec::with_capacity(seq.len());
            for entry in seq {
                let Value::String(name) = entry else {
                    bail!("{}: 'inherits' entries must be file names", path.display());
                };
                names.push(name);
            }
            Ok(names)
        }
        Some(_) => bail!(
            "{}: 'inherits' must be a file name or a list of file names",
            path.display()
        ),
    }
}

/// Merges `from` into `to`, recursing where both sides are mappings.
/// The `from` side wins; a change of an existing value is recorded unless
/// the key is exempt.
fn merge_mappings(
    to: &mut Mapping,
    from: Mapping,
    file: &Path,
    parent_key: &str,
    diag: &mut Diagnostics,
) {
    for (key, value) in from {
        let nested = matches!(to.get(key.clone()), Some(Value::Mapping(_))) && value.is_mapping();
        if nested {
            let inner_key = key_text(&key);
            if let (Some(Value::Mapping(dst)), Value::Mapping(src)) =
                (to.get_mut(key.clone()), value)
            {
                merge_mappings(dst, src, file, &inner_key, diag);
            }
            continue;
        }

        if let Some(old) = to.get(key.clone()) {
            if *old != value && !override_exempt(&key, old, &value) {
                diag.warn(format!(
                    "{}: ('{}') merge of property '{}': '{}' overwrites '{}'",
                    file.display(),
                    parent_key,
                    key_text(&key),
                    scalar_text(&value),
                    scalar_text(old)
                ));
            }
        }
        to.insert(key, value);
    }
}

/// Overrides of the descriptive header fields are always deliberate; so is
/// promoting a property from `optional` to `required`.
fn override_exempt(key: &Value, old: &Value, new: &Value) -> bool {
    match key.as_str() {
        Some("title" | "version" | "description") => true,
        Some("category") => {
            old.as_str() == Some("optional") && new.as_str() == Some("required")
        }
        _ => false,
    }
}

fn key_text(key: &Value) -> String {
    key.as_str().map_or_else(|| scalar_text(key), str::to_string)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map_or_else(|_| "?".to_string(), |s| s.trim_end().to_string()),
    }
}

fn scalar_field(doc: &Mapping, name: &str) -> String {
    doc.get(Value::String(name.into()))
        .map_or_else(|| format!("<unknown {name}>"), scalar_text)
}

fn bus_of(doc: &Mapping, role: &str) -> Option<String> {
    match doc.get(Value::String(role.into()))? {
        Value::Mapping(m) => m
            .get(Value::String("bus".into()))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn discover(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for dir in dirs {
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "yaml") {
                files.push(path.to_path_buf());
            }
        }
    }
    files.sort();
    files.dedup();
    files
}

fn scan_constraint(path: &Path) -> Result<Option<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading binding {}", path.display()))?;
    for line in text.lines() {
        if let Some(caps) = CONSTRAINT_RE.captures(line) {
            return Ok(Some(caps[1].to_string()));
        }
    }
    Ok(None)
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use quark_dts::parse;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn index_with_compats(compats: &[&str]) -> NodeIndex {
        let nodes: String = compats
            .iter()
            .enumerate()
            .map(|(i, c)| format!("dev{i} {{ compatible = \"{c}\"; }};"))
            .collect();
        let tree = parse(&format!("/ {{ {nodes} }};")).unwrap();
        NodeIndex::build(&tree)
    }

    fn write_yaml(dir: &Path, name: &str, text: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut f = File::create(path).unwrap();
        f.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn untouched_inherited_value_merges_without_warning() {
        let tmp = TempDir::new().unwrap();
        write_yaml(
            tmp.path(),
            "base.yaml",
            "title: Base\nversion: 0.1\ndescription: base\nproperties:\n  clock-frequency:\n    type: int\n    category: optional\n    generation: define\n",
        );
        write_yaml(
            tmp.path(),
            "uart.yaml",
            "title: UART\nversion: 0.1\ndescription: uart\ninherits:\n  - base.yaml\nproperties:\n  compatible:\n    constraint: \"vnd,uart\"\n",
        );

        let index = index_with_compats(&["vnd,uart"]);
        let mut diag = Diagnostics::new();
        let bindings =
            BindingIndex::load(&[tmp.path().to_path_buf()], &index, &mut diag).unwrap();

        let binding = bindings.get("vnd,uart").unwrap();
        assert_eq!(binding.title, "UART");
        let spec = &binding.properties["clock-frequency"];
        assert_eq!(spec.ty.as_deref(), Some("int"));
        assert!(spec.is_generated());
        assert!(diag.is_empty(), "unexpected warnings: {:?}", diag.warnings());
    }

    #[test]
    fn changed_inherited_value_warns_once_and_child_wins() {
        let tmp = TempDir::new().unwrap();
        write_yaml(
            tmp.path(),
            "base.yaml",
            "title: Base\nversion: 0.1\ndescription: base\nproperties:\n  current-speed:\n    type: int\n    category: optional\n",
        );
        write_yaml(
            tmp.path(),
            "uart.yaml",
            "title: UART\nversion: 0.1\ndescription: uart\ninherits:\n  - base.yaml\nproperties:\n  compatible:\n    constraint: \"vnd,uart\"\n  current-speed:\n    type: string\n    category: required\n",
        );

        let index = index_with_compats(&["vnd,uart"]);
        let mut diag = Diagnostics::new();
        let bindings =
            BindingIndex::load(&[tmp.path().to_path_buf()], &index, &mut diag).unwrap();

        let spec = &bindings.get("vnd,uart").unwrap().properties["current-speed"];
        assert_eq!(spec.ty.as_deref(), Some("string"));
        assert_eq!(spec.category.as_deref(), Some("required"));

        // type int -> string warns; category optional -> required is the
        // exempted promotion; title/version/description never warn.
        let overrides: Vec<_> = diag
            .warnings()
            .iter()
            .filter(|w| w.contains("overwrites"))
            .collect();
        assert_eq!(overrides.len(), 1, "{overrides:?}");
        assert!(overrides[0].contains("'string' overwrites 'int'"));
    }

    #[test]
    fn earlier_parent_wins_over_later_parent() {
        let tmp = TempDir::new().unwrap();
        write_yaml(
            tmp.path(),
            "a.yaml",
            "title: A\nversion: 0.1\ndescription: a\nproperties:\n  pick-me:\n    type: int\n",
        );
        write_yaml(
            tmp.path(),
            "b.yaml",
            "title: B\nversion: 0.1\ndescription: b\nproperties:\n  pick-me:\n    type: string\n",
        );
        write_yaml(
            tmp.path(),
            "dev.yaml",
            "title: Dev\nversion: 0.1\ndescription: dev\ninherits:\n  - a.yaml\n  - b.yaml\nproperties:\n  compatible:\n    constraint: \"vnd,dev\"\n",
        );

        let index = index_with_compats(&["vnd,dev"]);
        let mut diag = Diagnostics::new();
        let bindings =
            BindingIndex::load(&[tmp.path().to_path_buf()], &index, &mut diag).unwrap();

        let spec = &bindings.get("vnd,dev").unwrap().properties["pick-me"];
        assert_eq!(spec.ty.as_deref(), Some("int"));
    }

    #[test]
    fn inheritance_cycle_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write_yaml(
            tmp.path(),
            "a.yaml",
            "title: A\nversion: 0.1\ndescription: a\ninherits: [b.yaml]\nproperties:\n  compatible:\n    constraint: \"vnd,a\"\n",
        );
        write_yaml(
            tmp.path(),
            "b.yaml",
            "title: B\nversion: 0.1\ndescription: b\ninherits: [a.yaml]\n",
        );

        let index = index_with_compats(&["vnd,a"]);
        let mut diag = Diagnostics::new();
        let err = BindingIndex::load(&[tmp.path().to_path_buf()], &index, &mut diag)
            .unwrap_err()
            .to_string();
        assert!(err.contains("inheritance cycle"), "{err}");
    }

    #[test]
    fn ambiguous_basename_is_fatal_and_names_both_candidates() {
        let tmp = TempDir::new().unwrap();
        write_yaml(
            tmp.path(),
            "one/common.yaml",
            "title: C1\nversion: 0.1\ndescription: c\n",
        );
        write_yaml(
            tmp.path(),
            "two/common.yaml",
            "title: C2\nversion: 0.1\ndescription: c\n",
        );
        write_yaml(
            tmp.path(),
            "dev.yaml",
            "title: Dev\nversion: 0.1\ndescription: dev\ninherits: [common.yaml]\nproperties:\n  compatible:\n    constraint: \"vnd,dev\"\n",
        );

        let index = index_with_compats(&["vnd,dev"]);
        let mut diag = Diagnostics::new();
        let err = BindingIndex::load(&[tmp.path().to_path_buf()], &index, &mut diag)
            .unwrap_err()
            .to_string();
        assert!(err.contains("multiple candidates"), "{err}");
        assert!(err.contains("one") && err.contains("two"), "{err}");
    }

    #[test]
    fn unknown_inherits_reference_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write_yaml(
            tmp.path(),
            "dev.yaml",
            "title: Dev\nversion: 0.1\ndescription: dev\ninherits: [missing.yaml]\nproperties:\n  compatible:\n    constraint: \"vnd,dev\"\n",
        );

        let index = index_with_compats(&["vnd,dev"]);
        let mut diag = Diagnostics::new();
        let err = BindingIndex::load(&[tmp.path().to_path_buf()], &index, &mut diag)
            .unwrap_err()
            .to_string();
        assert!(err.contains("unknown file name 'missing.yaml'"), "{err}");
    }

    #[test]
    fn missing_descriptive_fields_are_synthesized_with_warnings() {
        let tmp = TempDir::new().unwrap();
        write_yaml(
            tmp.path(),
            "dev.yaml",
            "properties:\n  compatible:\n    constraint: \"vnd,dev\"\n",
        );

        let index = index_with_compats(&["vnd,dev"]);
        let mut diag = Diagnostics::new();
        let bindings =
            BindingIndex::load(&[tmp.path().to_path_buf()], &index, &mut diag).unwrap();

        let binding = bindings.get("vnd,dev").unwrap();
        assert_eq!(binding.title, "<unknown title>");
        assert_eq!(binding.version, "<unknown version>");
        assert_eq!(binding.description, "<unknown description>");
        assert_eq!(diag.len(), 3);
    }

    #[test]
    fn unmatched_identifiers_load_nothing_and_empty_result_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write_yaml(
            tmp.path(),
            "dev.yaml",
            "title: Dev\nversion: 0.1\ndescription: dev\nproperties:\n  compatible:\n    constraint: \"vnd,absent\"\n",
        );

        let index = index_with_compats(&["vnd,present"]);
        let mut diag = Diagnostics::new();
        let err = BindingIndex::load(&[tmp.path().to_path_buf()], &index, &mut diag)
            .unwrap_err()
            .to_string();
        assert!(err.contains("no bindings resolved"), "{err}");
    }

    #[test]
    fn bus_declaration_files_into_bus_table_and_lookup_prefers_it() {
        let source = r#"
            / {
                soc {
                    i2c@40005400 {
                        compatible = "vnd,i2c";
                        sensor@48 {
                            compatible = "vnd,sensor";
                        };
                    };
                };
            };
        "#;
        let tree = parse(source).unwrap();
        let index = NodeIndex::build(&tree);

        let tmp = TempDir::new().unwrap();
        write_yaml(
            tmp.path(),
            "i2c.yaml",
            "title: I2C\nversion: 0.1\ndescription: i2c\nchild:\n  bus: i2c\nproperties:\n  compatible:\n    constraint: \"vnd,i2c\"\n",
        );
        write_yaml(
            tmp.path(),
            "sensor.yaml",
            "title: Sensor\nversion: 0.1\ndescription: sensor\nparent:\n  bus: i2c\nproperties:\n  compatible:\n    constraint: \"vnd,sensor\"\n",
        );

        let mut diag = Diagnostics::new();
        let bindings =
            BindingIndex::load(&[tmp.path().to_path_buf()], &index, &mut diag).unwrap();

        assert!(bindings.get("vnd,sensor").is_none());
        assert!(bindings.get_on_bus("i2c", "vnd,sensor").is_some());

        let found = bindings
            .binding_for(&index, "/soc/i2c@40005400/sensor@48")
            .unwrap();
        assert_eq!(found.compat, "vnd,sensor");
        assert_eq!(found.parent_bus.as_deref(), Some("i2c"));
    }
}
