//! Tag source files and the shapes they resolve to
//!
//! A tag library is a directory of source files. Each file is parsed once into
//! a [`TagSource`], whose kind is decided at load time:
//!
//! - `*.txt` → [`TagSource::List`], one candidate per line
//! - `*.csv` → [`TagSource::Table`], rows keyed by the header
//! - `*.yaml` / `*.yml` → [`TagSource::Structured`] when the inner values look
//!   like entry records, [`TagSource::FlatNested`] otherwise
//!
//! Name lookups against the library produce a [`ResolvedTags`], which is the
//! value set the selector draws from.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Keys that mark a YAML mapping value as a structured entry record
const RECORD_KEYS: &[&str] = &["description", "prompts", "prefix", "suffix", "tags"];

/// Errors raised while reading or parsing a single source file
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("unsupported layout: {0}")]
    Shape(String),
}

impl SourceError {
    /// Byte offset into the file where the problem was detected, if known
    pub fn offset(&self) -> Option<usize> {
        match self {
            SourceError::Yaml(e) => e.location().map(|loc| loc.index()),
            SourceError::Csv(e) => e.position().map(|pos| pos.byte() as usize),
            SourceError::Io { .. } | SourceError::Shape(_) => None,
        }
    }
}

/// How a file is parsed, decided by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    Table,
    List,
    Yaml,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(SourceKind::List),
            "csv" => Some(SourceKind::Table),
            "yaml" | "yml" => Some(SourceKind::Yaml),
            _ => None,
        }
    }
}

/// A structured entry: a title plus metadata used for filtering and affixes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryRecord {
    pub title: String,
    pub description: Option<String>,
    /// Alternate output strings; one replaces the title when selected
    pub prompts: Vec<String>,
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
    /// Lowercased tags used by filter groups
    pub tags: BTreeSet<String>,
}

/// One CSV row, in header order
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub columns: Vec<(String, String)>,
}

impl TableRow {
    /// Encode the row as space-joined `$column=value` assignments
    pub fn encode(&self) -> String {
        self.columns
            .iter()
            .map(|(k, v)| format!("${}={}", k.trim(), v.trim()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A parsed source file
#[derive(Debug, Clone, PartialEq)]
pub enum TagSource {
    List(Vec<String>),
    Table(Vec<TableRow>),
    Structured(Vec<Arc<EntryRecord>>),
    /// Slash-joined composite keys (original case) with their leaf lists
    FlatNested(Vec<(String, Vec<String>)>),
}

/// The value set a logical name resolves to
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedTags {
    List(Vec<String>),
    Table(Vec<TableRow>),
    Structured(Vec<Arc<EntryRecord>>),
    FlatNested(Vec<(String, Vec<String>)>),
}

impl Default for ResolvedTags {
    fn default() -> Self {
        ResolvedTags::List(Vec::new())
    }
}

impl ResolvedTags {
    pub fn is_empty(&self) -> bool {
        match self {
            ResolvedTags::List(values) => values.is_empty(),
            ResolvedTags::Table(rows) => rows.is_empty(),
            ResolvedTags::Structured(entries) => entries.is_empty(),
            ResolvedTags::FlatNested(leaves) => leaves.iter().all(|(_, v)| v.is_empty()),
        }
    }

    /// Flatten into the candidate strings a selection draws from.
    ///
    /// Tables yield encoded rows, Structured sources yield titles and
    /// Flat-nested mappings yield the union of their leaf lists.
    pub fn candidates(&self) -> Vec<String> {
        match self {
            ResolvedTags::List(values) => values.clone(),
            ResolvedTags::Table(rows) => rows.iter().map(TableRow::encode).collect(),
            ResolvedTags::Structured(entries) => entries.iter().map(|e| e.title.clone()).collect(),
            ResolvedTags::FlatNested(leaves) => {
                leaves.iter().flat_map(|(_, v)| v.iter().cloned()).collect()
            }
        }
    }

    /// Structured records carried by this value set, if any
    pub fn entries(&self) -> &[Arc<EntryRecord>] {
        match self {
            ResolvedTags::Structured(entries) => entries,
            _ => &[],
        }
    }
}

impl TagSource {
    /// The value set for the whole file
    pub fn to_resolved(&self) -> ResolvedTags {
        match self {
            TagSource::List(values) => ResolvedTags::List(values.clone()),
            TagSource::Table(rows) => ResolvedTags::Table(rows.clone()),
            TagSource::Structured(entries) => ResolvedTags::Structured(entries.clone()),
            TagSource::FlatNested(leaves) => ResolvedTags::FlatNested(leaves.clone()),
        }
    }

    /// Resolve a key path inside this file, matched case-insensitively.
    ///
    /// A Flat-nested leaf yields its list; a branch yields the sub-mapping
    /// below it. A Structured title yields that single entry.
    pub fn descend(&self, key: &str) -> Option<ResolvedTags> {
        let key = key.trim_matches('/').to_lowercase();
        match self {
            TagSource::FlatNested(leaves) => {
                if let Some((_, values)) = leaves.iter().find(|(k, _)| k.to_lowercase() == key) {
                    return Some(ResolvedTags::List(values.clone()));
                }
                let query: Vec<&str> = key.split('/').collect();
                let branch: Vec<(String, Vec<String>)> = leaves
                    .iter()
                    .filter_map(|(k, v)| {
                        strip_path_prefix(k, &query).map(|rest| (rest, v.clone()))
                    })
                    .collect();
                if branch.is_empty() {
                    None
                } else {
                    Some(ResolvedTags::FlatNested(branch))
                }
            }
            TagSource::Structured(entries) => entries
                .iter()
                .find(|e| e.title.to_lowercase() == key)
                .map(|e| ResolvedTags::Structured(vec![e.clone()])),
            TagSource::List(_) | TagSource::Table(_) => None,
        }
    }

    /// Every logical sub-name this file exposes below its own name
    pub fn sub_names(&self) -> Vec<String> {
        match self {
            TagSource::Structured(entries) => {
                entries.iter().map(|e| e.title.to_lowercase()).collect()
            }
            TagSource::FlatNested(leaves) => leaves.iter().map(|(k, _)| k.to_lowercase()).collect(),
            TagSource::List(_) | TagSource::Table(_) => Vec::new(),
        }
    }
}

/// Remainder of `key` below `query` (lowercase components), compared one
/// path component at a time
fn strip_path_prefix(key: &str, query: &[&str]) -> Option<String> {
    let parts: Vec<&str> = key.split('/').collect();
    if parts.len() <= query.len() {
        return None;
    }
    let matched = parts
        .iter()
        .zip(query)
        .all(|(part, q)| part.to_lowercase() == *q);
    matched.then(|| parts[query.len()..].join("/"))
}

/// Read and parse a source file according to its extension
pub fn load_source(path: &Path) -> Result<TagSource, SourceError> {
    let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match SourceKind::from_path(path) {
        Some(SourceKind::List) => Ok(TagSource::List(parse_list(&content))),
        Some(SourceKind::Table) => parse_table(&content).map(TagSource::Table),
        Some(SourceKind::Yaml) => parse_yaml(&content),
        None => Err(SourceError::Shape(format!(
            "unrecognized extension on {}",
            path.display()
        ))),
    }
}

/// Parse a line list: blank and `#`-comment lines are dropped, trailing
/// `# comments` are cut off
pub fn parse_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.find('#') {
            Some(idx) => line[..idx].trim().to_string(),
            None => line.to_string(),
        })
        .collect()
}

/// Parse CSV content with a header row
pub fn parse_table(content: &str) -> Result<Vec<TableRow>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let columns = headers
            .iter()
            .zip(record.iter())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        rows.push(TableRow { columns });
    }
    Ok(rows)
}

/// Raw shape of a structured entry; both capitalizations are accepted
#[derive(Debug, Default, Deserialize)]
struct RawEntry {
    #[serde(default, rename = "Description", alias = "description")]
    description: Option<Value>,
    #[serde(default, rename = "Prompts", alias = "prompts")]
    prompts: Option<Value>,
    #[serde(default, rename = "Prefix", alias = "prefix")]
    prefix: Option<Value>,
    #[serde(default, rename = "Suffix", alias = "suffix")]
    suffix: Option<Value>,
    #[serde(default, rename = "Tags", alias = "tags")]
    tags: Option<Value>,
}

/// Parse a YAML document into a Structured or Flat-nested source
pub fn parse_yaml(content: &str) -> Result<TagSource, SourceError> {
    let document: Value = serde_yaml::from_str(content)?;
    let mapping = match document {
        Value::Mapping(mapping) => mapping,
        Value::Null => return Ok(TagSource::FlatNested(Vec::new())),
        _ => return Err(SourceError::Shape("top level must be a mapping".to_string())),
    };

    if is_structured(&mapping) {
        let mut entries = Vec::new();
        for (key, value) in mapping {
            let Some(title) = scalar_to_string(&key) else {
                continue;
            };
            if !value.is_mapping() {
                continue;
            }
            let raw: RawEntry = serde_yaml::from_value(value)?;
            entries.push(Arc::new(build_entry(title, raw)));
        }
        Ok(TagSource::Structured(entries))
    } else {
        let mut leaves = Vec::new();
        flatten_into(&mut leaves, "", &Value::Mapping(mapping));
        Ok(TagSource::FlatNested(leaves))
    }
}

/// Parse the globals file: a flat mapping of scalar values
pub fn parse_globals(content: &str) -> Result<Vec<(String, String)>, SourceError> {
    let document: Value = serde_yaml::from_str(content)?;
    let mapping = match document {
        Value::Mapping(mapping) => mapping,
        Value::Null => return Ok(Vec::new()),
        _ => return Err(SourceError::Shape("globals must be a mapping".to_string())),
    };
    Ok(mapping
        .iter()
        .filter_map(|(k, v)| Some((scalar_to_string(k)?, scalar_to_string(v)?)))
        .collect())
}

fn is_structured(mapping: &Mapping) -> bool {
    mapping.values().any(|value| match value {
        Value::Mapping(inner) => inner.keys().any(|k| {
            scalar_to_string(k)
                .map(|k| RECORD_KEYS.contains(&k.to_lowercase().as_str()))
                .unwrap_or(false)
        }),
        _ => false,
    })
}

fn build_entry(title: String, raw: RawEntry) -> EntryRecord {
    EntryRecord {
        title,
        description: raw
            .description
            .as_ref()
            .and_then(|d| string_list(d).into_iter().next()),
        prompts: raw.prompts.as_ref().map(string_list).unwrap_or_default(),
        prefixes: raw.prefix.as_ref().map(string_list).unwrap_or_default(),
        suffixes: raw.suffix.as_ref().map(string_list).unwrap_or_default(),
        tags: raw
            .tags
            .as_ref()
            .map(string_list)
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect(),
    }
}

fn flatten_into(out: &mut Vec<(String, Vec<String>)>, prefix: &str, value: &Value) {
    match value {
        Value::Mapping(mapping) => {
            for (key, child) in mapping {
                let Some(key) = scalar_to_string(key) else {
                    continue;
                };
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{}/{}", prefix, key)
                };
                flatten_into(out, &path, child);
            }
        }
        Value::Null => {}
        leaf => {
            if !prefix.is_empty() {
                out.push((prefix.to_string(), string_list(leaf)));
            }
        }
    }
}

/// A scalar or a sequence of scalars as strings
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_to_string).collect(),
        other => scalar_to_string(other).into_iter().collect(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_strips_comments() {
        let content = "# header\nred\n\n  blue # a comment\n#skip\ngreen\n";
        assert_eq!(parse_list(content), vec!["red", "blue", "green"]);
    }

    #[test]
    fn test_parse_table_rows() {
        let rows = parse_table("name, hair\nrin, black\nsaber , blonde\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].encode(), "$name=rin $hair=black");
        assert_eq!(rows[1].encode(), "$name=saber $hair=blonde");
    }

    #[test]
    fn test_parse_structured_entries() {
        let content = r#"
Rin Tohsaka:
  Description: [Magus]
  Prompts: ["rin tohsaka, twintails"]
  Prefix: ["masterpiece"]
  Suffix: ["**lowres**"]
  Tags: [Female, Fate]
Saber:
  tags: [female, knight]
"#;
        let TagSource::Structured(entries) = parse_yaml(content).unwrap() else {
            panic!("expected structured source");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Rin Tohsaka");
        assert_eq!(entries[0].description.as_deref(), Some("Magus"));
        assert_eq!(entries[0].prompts, vec!["rin tohsaka, twintails"]);
        assert!(entries[0].tags.contains("female"));
        assert!(entries[0].tags.contains("fate"));
        assert_eq!(entries[1].title, "Saber");
        assert!(entries[1].tags.contains("knight"));
    }

    #[test]
    fn test_parse_flat_nested() {
        let content = "animals:\n  cats: [tabby, siamese]\n  dogs:\n    small: [pug]\ncolors: red\n";
        let TagSource::FlatNested(leaves) = parse_yaml(content).unwrap() else {
            panic!("expected flat-nested source");
        };
        assert_eq!(
            leaves,
            vec![
                ("animals/cats".to_string(), vec!["tabby".to_string(), "siamese".to_string()]),
                ("animals/dogs/small".to_string(), vec!["pug".to_string()]),
                ("colors".to_string(), vec!["red".to_string()]),
            ]
        );
    }

    #[test]
    fn test_descend_flat_nested_leaf_and_branch() {
        let source = parse_yaml("Animals:\n  Cats: [tabby]\n  Dogs: [pug, corgi]\n").unwrap();
        assert_eq!(
            source.descend("animals/dogs"),
            Some(ResolvedTags::List(vec!["pug".to_string(), "corgi".to_string()]))
        );
        let Some(ResolvedTags::FlatNested(branch)) = source.descend("ANIMALS") else {
            panic!("expected branch");
        };
        assert_eq!(branch.len(), 2);
        assert!(source.descend("animals/birds").is_none());
    }

    #[test]
    fn test_descend_branch_with_non_ascii_key() {
        // Kelvin sign lowercases to a one-byte 'k'
        let source = parse_yaml("\u{212A}:\n  abc: [kelvin]\n").unwrap();
        let Some(ResolvedTags::FlatNested(branch)) = source.descend("k") else {
            panic!("expected branch");
        };
        assert_eq!(branch, vec![("abc".to_string(), vec!["kelvin".to_string()])]);
        assert!(source.descend("\u{212A}/x").is_none());
    }

    #[test]
    fn test_parse_yaml_rejects_scalar_document() {
        assert!(matches!(parse_yaml("just text"), Err(SourceError::Shape(_))));
    }

    #[test]
    fn test_yaml_error_has_offset() {
        let err = parse_yaml("a: [unclosed\n").unwrap_err();
        assert!(err.offset().is_some());
    }

    #[test]
    fn test_parse_globals() {
        let globals = parse_globals("style: anime\nsteps: 20\nnested: [a]\n").unwrap();
        assert_eq!(
            globals,
            vec![
                ("style".to_string(), "anime".to_string()),
                ("steps".to_string(), "20".to_string()),
            ]
        );
    }
}
