//! Access to the parsed files of a workspace.
//!
//! Analysis never reads from disk itself. Everything goes through a
//! [`FileResolver`], which hands out immutable snapshots.

use std::sync::Arc;

use dashmap::DashMap;
use macro_syntax::{Field, NodeKind, SyntaxTree};
use tracing::debug;
use url::Url;

/// A parsed file and the resolved URIs of its includes
#[derive(Debug)]
pub struct FileRecord {
    pub uri: String,
    pub tree: SyntaxTree,
    /// Resolved include targets in source order, without duplicates
    pub includes: Vec<String>,
}

impl FileRecord {
    /// Record with includes resolved by [`resolve_reference`]
    pub fn new(uri: impl Into<String>, tree: SyntaxTree) -> Self {
        Self::resolved_with(uri, tree, resolve_reference)
    }

    /// Record with includes resolved by `resolve(literal, uri)`
    pub fn resolved_with(
        uri: impl Into<String>,
        tree: SyntaxTree,
        resolve: impl Fn(&str, &str) -> String,
    ) -> Self {
        let uri = uri.into();
        let mut includes: Vec<String> = Vec::new();
        for literal in include_literals(&tree) {
            let target = resolve(literal, &uri);
            if !includes.contains(&target) {
                includes.push(target);
            }
        }
        Self {
            uri,
            tree,
            includes,
        }
    }

    pub fn is_program(&self) -> bool {
        self.tree.is_program()
    }

    pub fn includes(&self, uri: &str) -> bool {
        self.includes.iter().any(|i| i == uri)
    }
}

/// Raw URI text of every include statement
pub fn include_literals(tree: &SyntaxTree) -> Vec<&str> {
    let mut literals = Vec::new();
    tree.root().accept(|node| {
        if node.kind() == NodeKind::Include {
            if let Some(uri) = node.child_by_field(Field::Uri).or_else(|| node.child(0)) {
                literals.push(uri.text());
            }
            return false;
        }
        true
    });
    literals
}

/// Resolve an include literal against the URI of the file that contains it.
///
/// Quotes are stripped and backslashes normalised. Absolute URIs are kept;
/// anything else is joined onto `base`. If no URI can be formed the literal
/// is returned unchanged.
pub fn resolve_reference(reference: &str, base: &str) -> String {
    let literal = reference.trim().trim_matches(|c| c == '"' || c == '\'');
    let normalized = literal.replace('\\', "/");

    if let Ok(url) = Url::parse(&normalized) {
        // Single letter schemes are drive letters, not URIs.
        if url.scheme().len() > 1 {
            return url.to_string();
        }
    }

    match Url::parse(base).and_then(|base| base.join(&normalized)) {
        Ok(url) => url.to_string(),
        Err(err) => {
            debug!("cannot resolve {literal:?} against {base:?}: {err}");
            literal.to_string()
        }
    }
}

/// Which records `get_all` returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileFilter {
    AllFiles,
    /// Program files only
    SourceFiles,
    Uris(Vec<String>),
}

/// The file-resolution collaborator used by every analysis
pub trait FileResolver: Send + Sync {
    fn get(&self, uri: &str) -> Option<Arc<FileRecord>>;

    fn get_all(&self, filter: &FileFilter) -> Vec<Arc<FileRecord>>;

    /// Include target of `reference` written in `base`. Records built for
    /// this resolver must use it too, see [`FileRecord::resolved_with`].
    fn resolve_reference(&self, reference: &str, base: &str) -> String {
        resolve_reference(reference, base)
    }
}

/// In-memory, concurrently readable file set
#[derive(Debug, Default)]
pub struct FileStore {
    files: DashMap<String, Arc<FileRecord>>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the record for `uri`
    pub fn insert(&self, uri: impl Into<String>, tree: SyntaxTree) -> Arc<FileRecord> {
        let record = Arc::new(FileRecord::resolved_with(uri, tree, |reference, base| {
            self.resolve_reference(reference, base)
        }));
        debug!(
            "storing {} ({} includes)",
            record.uri,
            record.includes.len()
        );
        self.files.insert(record.uri.clone(), Arc::clone(&record));
        record
    }

    pub fn remove(&self, uri: &str) -> Option<Arc<FileRecord>> {
        self.files.remove(uri).map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileResolver for FileStore {
    fn get(&self, uri: &str) -> Option<Arc<FileRecord>> {
        self.files.get(uri).map(|entry| Arc::clone(entry.value()))
    }

    fn get_all(&self, filter: &FileFilter) -> Vec<Arc<FileRecord>> {
        if let FileFilter::Uris(uris) = filter {
            return uris.iter().filter_map(|uri| self.get(uri)).collect();
        }
        let mut records: Vec<_> = self
            .files
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .filter(|record| match filter {
                FileFilter::SourceFiles => record.is_program(),
                _ => true,
            })
            .collect();
        records.sort_by(|a, b| a.uri.cmp(&b.uri));
        records
    }
}
