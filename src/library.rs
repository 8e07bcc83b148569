//! Tag library: scans a directory of tag sources and resolves logical names
//!
//! The library owns a parse cache shared by every expansion run that uses it.
//! The cache lives behind a mutex so a library can be shared across threads;
//! first-load population of any entry happens while the lock is held, which
//! serializes writes per key. [`TagLibrary::refresh`] drops everything.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::source::{
    load_source, parse_globals, EntryRecord, ResolvedTags, SourceError, SourceKind, TagSource,
};

/// Pseudo-name that resolves to every structured entry in the library
pub const ALL_ENTRIES: &str = ":all";

/// Default file name of the globals source at the library root
pub const DEFAULT_GLOBALS_FILE: &str = "globals.yaml";

/// Options controlling how a library is scanned
#[derive(Debug, Clone)]
pub struct LibraryOptions {
    /// Name of the globals file at the library root
    pub globals_file: String,
}

impl Default for LibraryOptions {
    fn default() -> Self {
        LibraryOptions {
            globals_file: DEFAULT_GLOBALS_FILE.to_string(),
        }
    }
}

/// One source file found under the library root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Lowercased relative path without extension, `/`-separated
    pub logical_name: String,
    pub kind: SourceKind,
}

/// Sorted file listing with a name lookup table
#[derive(Debug, Default)]
struct FileTable {
    files: Vec<SourceFile>,
    by_name: HashMap<String, Vec<usize>>,
}

impl FileTable {
    /// Find a file registered under `name` whose kind is in `kinds`,
    /// honoring the order of `kinds` as priority
    fn lookup(&self, name: &str, kinds: &[SourceKind]) -> Option<&SourceFile> {
        let indices = self.by_name.get(name)?;
        kinds.iter().find_map(|kind| {
            indices
                .iter()
                .map(|&i| &self.files[i])
                .find(|file| file.kind == *kind)
        })
    }
}

/// Every structured entry across the library, by title
#[derive(Debug, Default)]
struct EntryIndex {
    entries: Vec<Arc<EntryRecord>>,
}

#[derive(Default)]
struct LibraryCache {
    files: Option<Arc<FileTable>>,
    /// `None` marks a file that failed to parse
    sources: HashMap<PathBuf, Option<Arc<TagSource>>>,
    names: Option<Arc<Vec<String>>>,
    all_entries: Option<Arc<EntryIndex>>,
    /// Titles surfaced by any loaded structured source
    surfaced: HashMap<String, Arc<EntryRecord>>,
}

/// Names and tags exposed to autocomplete UIs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    pub files: Vec<String>,
    pub tags: Vec<String>,
}

/// A source file that failed to parse
#[derive(Debug)]
pub struct SourceIssue {
    pub path: PathBuf,
    pub content: String,
    pub error: SourceError,
}

/// A directory of tag sources with a shared parse cache
pub struct TagLibrary {
    root: PathBuf,
    options: LibraryOptions,
    cache: Mutex<LibraryCache>,
}

impl TagLibrary {
    /// Create a library rooted at `root`; nothing is read until first use
    ///
    /// # Example
    /// ```no_run
    /// use prompt_wildcards::TagLibrary;
    ///
    /// let library = TagLibrary::new("./wildcards");
    /// let colors = library.resolve("colors");
    /// ```
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_options(root, LibraryOptions::default())
    }

    pub fn with_options(root: impl Into<PathBuf>, options: LibraryOptions) -> Self {
        TagLibrary {
            root: root.into(),
            options,
            cache: Mutex::new(LibraryCache::default()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cache(&self) -> MutexGuard<'_, LibraryCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drop every cached parse result and the name index
    pub fn refresh(&self) {
        let mut cache = self.cache();
        *cache = LibraryCache::default();
        debug!("Refreshed tag library cache for {:?}", self.root);
    }

    /// Resolve a logical name to its value set.
    ///
    /// Lookup order: a List/Table file by name, a YAML file by name, then a
    /// slash path split into the longest existing YAML file prefix plus a key
    /// path inside it. Unknown names resolve to an empty List.
    pub fn resolve(&self, name: &str) -> ResolvedTags {
        let key = normalize_name(name);
        if key.is_empty() {
            return ResolvedTags::default();
        }
        if key == ALL_ENTRIES {
            return ResolvedTags::Structured(self.all_entries().entries.clone());
        }

        let files = self.files();
        if let Some(file) = files.lookup(&key, &[SourceKind::Table, SourceKind::List]) {
            return self
                .source(file)
                .map(|s| s.to_resolved())
                .unwrap_or_default();
        }
        if let Some(file) = files.lookup(&key, &[SourceKind::Yaml]) {
            if let Some(source) = self.source(file) {
                return source.to_resolved();
            }
        }

        let parts: Vec<&str> = key.split('/').collect();
        for split in (1..parts.len()).rev() {
            let file_key = parts[..split].join("/");
            let Some(file) = files.lookup(&file_key, &[SourceKind::Yaml]) else {
                continue;
            };
            let Some(source) = self.source(file) else {
                continue;
            };
            if let Some(resolved) = source.descend(&parts[split..].join("/")) {
                return resolved;
            }
        }

        debug!("No tag source for '{}'", name);
        ResolvedTags::default()
    }

    /// Match a `*`/`?` pattern against every resolvable name, sorted
    pub fn glob(&self, pattern: &str) -> Vec<String> {
        let pattern = match glob::Pattern::new(&normalize_name(pattern)) {
            Ok(p) => p,
            Err(e) => {
                debug!("Invalid glob pattern '{}': {}", pattern, e);
                return Vec::new();
            }
        };
        let options = glob::MatchOptions {
            case_sensitive: false,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        self.names()
            .iter()
            .filter(|name| pattern.matches_with(name, options))
            .cloned()
            .collect()
    }

    /// Build the aggregate name index now instead of on first glob
    pub fn build_index(&self) -> usize {
        self.names().len()
    }

    /// Read the globals file as variable defaults
    pub fn load_global_defaults(&self) -> HashMap<String, String> {
        let path = self.root.join(&self.options.globals_file);
        if !path.is_file() {
            return HashMap::new();
        }
        let parsed = std::fs::read_to_string(&path)
            .map_err(|source| SourceError::Io {
                path: path.clone(),
                source,
            })
            .and_then(|content| parse_globals(&content));
        match parsed {
            Ok(pairs) => pairs.into_iter().collect(),
            Err(e) => {
                warn!("Failed to load globals from {:?}: {}", path, e);
                HashMap::new()
            }
        }
    }

    /// Full record for a title surfaced by a loaded structured source
    pub fn entry_details(&self, title: &str) -> Option<Arc<EntryRecord>> {
        self.cache().surfaced.get(title).cloned()
    }

    /// Sorted file names and structured tags for autocomplete
    pub fn catalog(&self) -> Catalog {
        let files = self.files();
        let mut names = BTreeSet::new();
        let mut tags = BTreeSet::new();
        for file in &files.files {
            names.insert(file.logical_name.clone());
            if let Some(TagSource::Structured(entries)) = self.source(file).as_deref() {
                for entry in entries {
                    tags.extend(entry.tags.iter().cloned());
                }
            }
        }
        Catalog {
            files: names.into_iter().collect(),
            tags: tags.into_iter().collect(),
        }
    }

    /// Parse every source without touching the cache and report failures
    pub fn check(&self) -> Vec<SourceIssue> {
        let mut issues = Vec::new();
        for file in &self.files().files {
            if let Err(error) = load_source(&file.path) {
                let content = std::fs::read_to_string(&file.path).unwrap_or_default();
                issues.push(SourceIssue {
                    path: file.path.clone(),
                    content,
                    error,
                });
            }
        }
        issues
    }

    fn files(&self) -> Arc<FileTable> {
        let mut cache = self.cache();
        if let Some(files) = &cache.files {
            return files.clone();
        }
        let files = Arc::new(self.scan());
        cache.files = Some(files.clone());
        files
    }

    fn scan(&self) -> FileTable {
        let mut table = FileTable::default();
        if !self.root.is_dir() {
            warn!("Tag library root does not exist: {:?}", self.root);
            return table;
        }

        let mut paths = Vec::new();
        collect_files(&self.root, &mut paths);
        paths.sort();

        let globals = self.root.join(&self.options.globals_file);
        for path in paths {
            if path == globals {
                continue;
            }
            let Some(kind) = SourceKind::from_path(&path) else {
                continue;
            };
            let Some(logical_name) = logical_name(&self.root, &path) else {
                continue;
            };
            let index = table.files.len();
            let basename = logical_name.rsplit('/').next().unwrap_or_default().to_string();
            table.by_name.entry(logical_name.clone()).or_default().push(index);
            if basename != logical_name {
                table.by_name.entry(basename).or_default().push(index);
            }
            table.files.push(SourceFile {
                path,
                logical_name,
                kind,
            });
        }
        info!("Indexed {} tag sources under {:?}", table.files.len(), self.root);
        table
    }

    /// Parsed content of a file, loading it on first use
    fn source(&self, file: &SourceFile) -> Option<Arc<TagSource>> {
        let mut cache = self.cache();
        if let Some(cached) = cache.sources.get(&file.path) {
            return cached.clone();
        }
        let loaded = match load_source(&file.path) {
            Ok(source) => {
                debug!("Loaded tag source {:?}", file.path);
                Some(Arc::new(source))
            }
            Err(e) => {
                warn!("Skipping tag source {:?}: {}", file.path, e);
                None
            }
        };
        if let Some(TagSource::Structured(entries)) = loaded.as_deref() {
            for entry in entries {
                cache.surfaced.insert(entry.title.clone(), entry.clone());
            }
        }
        cache.sources.insert(file.path.clone(), loaded.clone());
        loaded
    }

    fn all_entries(&self) -> Arc<EntryIndex> {
        if let Some(index) = &self.cache().all_entries {
            return index.clone();
        }
        let mut index = EntryIndex::default();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for file in self.files().files.iter().filter(|f| f.kind == SourceKind::Yaml) {
            let Some(source) = self.source(file) else {
                continue;
            };
            let TagSource::Structured(entries) = source.as_ref() else {
                continue;
            };
            for entry in entries {
                match positions.get(&entry.title) {
                    Some(&at) => index.entries[at] = entry.clone(),
                    None => {
                        positions.insert(entry.title.clone(), index.entries.len());
                        index.entries.push(entry.clone());
                    }
                }
            }
        }
        let index = Arc::new(index);
        self.cache().all_entries = Some(index.clone());
        index
    }

    fn names(&self) -> Arc<Vec<String>> {
        if let Some(names) = &self.cache().names {
            return names.clone();
        }
        let files = self.files();
        let mut names = BTreeSet::new();
        // Full names and basename aliases, as registered for lookup
        for (name, indices) in &files.by_name {
            names.insert(name.clone());
            for &index in indices {
                if let Some(source) = self.source(&files.files[index]) {
                    for sub in source.sub_names() {
                        names.insert(format!("{}/{}", name, sub));
                    }
                }
            }
        }
        let names = Arc::new(names.into_iter().collect::<Vec<_>>());
        debug!("Built name index with {} entries", names.len());
        self.cache().names = Some(names.clone());
        names
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read tag directory {:?}: {}", dir, e);
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out);
        } else if SourceKind::from_path(&path).is_some() {
            out.push(path);
        }
    }
}

/// Lowercase, trim, drop a source extension, use `/` separators
fn normalize_name(name: &str) -> String {
    let mut key = name.trim().replace('\\', "/").to_lowercase();
    for ext in [".txt", ".csv", ".yaml", ".yml"] {
        if let Some(stripped) = key.strip_suffix(ext) {
            key = stripped.to_string();
            break;
        }
    }
    key
}

fn logical_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
