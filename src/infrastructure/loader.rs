//! Hierarchy sources: node documents (TOML/JSON) and directory trees.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::domain::{FieldValue, Node, NodeId, VIRTUAL_ROOT_ID};
use crate::infrastructure::memory::InMemoryHierarchy;
use crate::infrastructure::traits::FileSystem;
use crate::infrastructure::{InfraError, InfraResult};
use crate::util::path::normalize_path_separator;

/// Kind given to directories by [`scan_directory`].
pub const DIRECTORY_KIND: &str = "Directory";
/// Kind given to regular files by [`scan_directory`]. Files cannot have children.
pub const FILE_KIND: &str = "File";

/// On-disk description of a hierarchy.
///
/// ```toml
/// flat_kinds = ["File"]
///
/// [[nodes]]
/// id = 1
/// title = "Home"
///
/// [[nodes]]
/// id = 2
/// parent = 1
/// title = "About"
/// fields = { Status = "Published" }
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HierarchyDocument {
    /// Kinds that do not take part in the hierarchy
    pub flat_kinds: Vec<String>,
    pub nodes: Vec<Node>,
}

impl HierarchyDocument {
    /// Parse a document, choosing JSON or TOML by file extension.
    pub fn parse(content: &str, path: &Path) -> InfraResult<Self> {
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let parsed = if is_json {
            serde_json::from_str(content).map_err(|e| e.to_string())
        } else {
            toml::from_str(content).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| InfraError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn into_store(self) -> InfraResult<InMemoryHierarchy> {
        let store = InMemoryHierarchy::from_nodes(self.nodes)?;
        Ok(store.with_flat_kinds(self.flat_kinds))
    }
}

/// Load a hierarchy from a document file or a directory.
#[instrument(level = "debug", skip(fs))]
pub fn load_hierarchy(fs: &dyn FileSystem, source: &Path) -> InfraResult<InMemoryHierarchy> {
    if !fs.exists(source) {
        return Err(InfraError::io(
            format!("hierarchy source not found: {}", source.display()),
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
        ));
    }
    if fs.is_dir(source) {
        return scan_directory(source);
    }
    let content = fs
        .read_to_string(source)
        .map_err(|e| InfraError::io(format!("read {}", source.display()), e))?;
    let document = HierarchyDocument::parse(&content, source)?;
    debug!("load_hierarchy: {} nodes in {}", document.nodes.len(), source.display());
    document.into_store()
}

/// Index a directory tree as a hierarchy.
///
/// Entries get ids in walk order (sorted by file name), starting at 1.
/// Entries directly inside `root` are top-level nodes.
#[instrument(level = "debug")]
pub fn scan_directory(root: &Path) -> InfraResult<InMemoryHierarchy> {
    let mut ids: HashMap<PathBuf, NodeId> = HashMap::new();
    let mut nodes = Vec::new();
    let mut next_id: NodeId = 1;

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let context = format!("walk {}", root.display());
            match e.into_io_error() {
                Some(io) => InfraError::io(context, io),
                None => InfraError::Parse {
                    path: root.to_path_buf(),
                    message: "filesystem loop detected".to_string(),
                },
            }
        })?;

        let path = entry.path().to_path_buf();
        let parent_id = path
            .parent()
            .and_then(|p| ids.get(p).copied())
            .unwrap_or(VIRTUAL_ROOT_ID);
        let relative = path.strip_prefix(root).unwrap_or(&path);
        let kind = if entry.file_type().is_dir() {
            DIRECTORY_KIND
        } else {
            FILE_KIND
        };

        let mut node = Node::new(
            next_id,
            parent_id,
            entry.file_name().to_string_lossy().into_owned(),
        )
        .with_kind(kind)
        .with_sort(nodes.len() as i64)
        .with_field("Path", normalize_path_separator(&relative.to_string_lossy()));
        if let Ok(meta) = entry.metadata() {
            if meta.is_file() {
                node = node.with_field("Size", FieldValue::Int(meta.len() as i64));
            }
        }

        ids.insert(path, next_id);
        nodes.push(node);
        next_id += 1;
    }

    debug!("scan_directory: indexed {} entries", nodes.len());
    let store = InMemoryHierarchy::from_nodes(nodes)?;
    Ok(store.with_flat_kinds([FILE_KIND]))
}
