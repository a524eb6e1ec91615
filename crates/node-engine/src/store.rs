//! Workflow storage with file persistence
//!
//! Each workflow document is stored as a pretty-printed JSON file in one
//! directory. File names derive from the workflow name with characters
//! that are unsafe on common filesystems replaced; saving under a name that
//! is already taken appends a numeric suffix instead of overwriting.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::document::WorkflowDocument;
use crate::error::Result;

/// Environment variable overriding the default storage directory
pub const WORKFLOWS_DIR_ENV: &str = "PIXELGRAPH_WORKFLOWS_DIR";

const UNSAFE_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Summary of a stored workflow (for listing)
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSummary {
    pub path: PathBuf,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub thumbnail: Option<String>,
    pub node_count: usize,
}

/// Directory of workflow documents
///
/// # Example
///
/// ```ignore
/// use node_engine::WorkflowStore;
///
/// let store = WorkflowStore::new(WorkflowStore::default_dir());
/// let path = store.save(&doc)?;
/// for summary in store.list()? {
///     println!("{} ({} nodes)", summary.name, summary.node_count);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct WorkflowStore {
    dir: PathBuf,
}

impl WorkflowStore {
    /// Create a store rooted at `dir`
    ///
    /// The directory will be created if it doesn't exist when saving.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// `$PIXELGRAPH_WORKFLOWS_DIR`, else `<data dir>/pixelgraph/workflows`
    pub fn default_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os(WORKFLOWS_DIR_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(dir);
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pixelgraph")
            .join("workflows")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `doc` and return the path it was written to
    pub fn save(&self, doc: &WorkflowDocument) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.free_path(&sanitize_file_name(&doc.metadata.name));
        std::fs::write(&path, doc.to_json()?)?;
        log::info!("Saved workflow '{}' to {:?}", doc.metadata.name, path);
        Ok(path)
    }

    /// Overwrite an existing stored document in place
    pub fn update(&self, path: &Path, doc: &WorkflowDocument) -> Result<()> {
        let mut doc = doc.clone();
        doc.metadata.updated_at = Utc::now();
        std::fs::write(path, doc.to_json()?)?;
        log::debug!("Updated workflow '{}' at {:?}", doc.metadata.name, path);
        Ok(())
    }

    /// Read a stored document; malformed JSON is `CorruptWorkflow`
    pub fn load(&self, path: &Path) -> Result<WorkflowDocument> {
        let content = std::fs::read_to_string(path)?;
        WorkflowDocument::from_json(&content)
    }

    /// Summaries of all stored workflows, most recently updated first
    ///
    /// Files that fail to parse are skipped with a warning.
    pub fn list(&self) -> Result<Vec<WorkflowSummary>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let file_path = entry?.path();
            if file_path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            match self.load(&file_path) {
                Ok(doc) => summaries.push(WorkflowSummary {
                    name: doc.metadata.name,
                    description: doc.metadata.description,
                    created_at: doc.metadata.created_at,
                    updated_at: doc.metadata.updated_at,
                    thumbnail: doc.metadata.thumbnail,
                    node_count: doc.nodes.len(),
                    path: file_path,
                }),
                Err(e) => {
                    log::warn!("Failed to load workflow from {:?}: {}", file_path, e);
                }
            }
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    /// Delete a stored workflow; returns whether a file was removed
    pub fn delete(&self, path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        log::info!("Deleted workflow at {:?}", path);
        Ok(true)
    }

    /// `<stem>.json`, or the first free `<stem>_<n>.json`
    fn free_path(&self, stem: &str) -> PathBuf {
        let mut path = self.dir.join(format!("{stem}.json"));
        let mut counter = 1;
        while path.exists() {
            path = self.dir.join(format!("{stem}_{counter}.json"));
            counter += 1;
        }
        path
    }
}

/// Replace characters that are not allowed in file names
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "workflow".to_string()
    } else {
        cleaned.to_string()
    }
}
