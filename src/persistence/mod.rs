//! Durable JSON artifact for the intelligence graph
//!
//! Writes go to a temporary file in the destination directory which is then
//! renamed into place, so readers only ever see a complete artifact.

use crate::error::{Result, ThreatGraphError};
use crate::graph::{GraphDocument, IntelligenceGraph};
use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Reads and writes graph artifacts under a data directory
pub struct GraphStore {
    data_dir: PathBuf,
}

impl GraphStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Default artifact path: `<data_dir>/intelligence_graph_<target>_<YYYYmmdd_HHMMSS>.json`
    pub fn default_path(&self, target: &str) -> PathBuf {
        let target: String = target
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        self.data_dir
            .join(format!("intelligence_graph_{}_{}.json", target, timestamp))
    }

    /// Serialize the graph and write it atomically, returning the final path
    pub fn save(&self, graph: &IntelligenceGraph, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => self.default_path(graph.target()),
        };
        write_document(&graph.to_document(), &path)?;
        tracing::info!(path = %path.display(), "Graph saved");
        Ok(path)
    }

    /// Read an artifact back
    pub fn load(path: &Path) -> Result<GraphDocument> {
        let content = fs::read_to_string(path).map_err(|e| ThreatGraphError::Io {
            source: e,
            context: format!("Failed to read graph artifact: {}", path.display()),
        })?;
        serde_json::from_str(&content).map_err(|e| ThreatGraphError::Json {
            source: e,
            context: format!("Failed to parse graph artifact: {}", path.display()),
        })
    }

    /// Read an artifact and rebuild the in-memory graph
    pub fn load_graph(path: &Path) -> Result<IntelligenceGraph> {
        IntelligenceGraph::from_document(Self::load(path)?)
    }
}

/// Write a document via temp file + rename in the destination directory
pub fn write_document(document: &GraphDocument, path: &Path) -> Result<()> {
    let content = serde_json::to_vec_pretty(document).map_err(|e| ThreatGraphError::Json {
        source: e,
        context: "Failed to serialize graph".to_string(),
    })?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| ThreatGraphError::Io {
        source: e,
        context: format!("Failed to create artifact directory: {}", parent.display()),
    })?;

    let file_name = path
        .file_name()
        .ok_or_else(|| ThreatGraphError::Validation(format!("Invalid artifact path: {}", path.display())))?
        .to_string_lossy();
    let temp_path = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    let result = write_and_rename(&content, &temp_path, path);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_and_rename(content: &[u8], temp_path: &Path, path: &Path) -> Result<()> {
    let mut file = fs::File::create(temp_path).map_err(|e| ThreatGraphError::Io {
        source: e,
        context: format!("Failed to create temp artifact: {}", temp_path.display()),
    })?;
    file.write_all(content).map_err(|e| ThreatGraphError::Io {
        source: e,
        context: format!("Failed to write temp artifact: {}", temp_path.display()),
    })?;
    file.sync_all().map_err(|e| ThreatGraphError::Io {
        source: e,
        context: format!("Failed to sync temp artifact: {}", temp_path.display()),
    })?;
    drop(file);

    fs::rename(temp_path, path).map_err(|e| ThreatGraphError::Io {
        source: e,
        context: format!(
            "Failed to rename temp artifact into place: {} -> {}",
            temp_path.display(),
            path.display()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EntityType;
    use tempfile::TempDir;

    fn sample_graph() -> IntelligenceGraph {
        let mut graph = IntelligenceGraph::new("example.com").unwrap();
        let root = graph.root_id().to_string();
        let id = graph
            .add_entity(EntityType::Subdomain, "www.example.com", "subfinder", None)
            .unwrap();
        graph
            .add_relationship(&id, &root, "subdomain_of", 1.0, None)
            .unwrap();
        graph
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_save_default_path() {
        let temp_dir = TempDir::new().unwrap();
        let store = GraphStore::new(temp_dir.path().join("data"));

        let path = store.save(&sample_graph(), None).unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("intelligence_graph_example.com_"));
        assert!(name.ends_with(".json"));

        // No temp files left behind
        assert_eq!(dir_entries(&temp_dir.path().join("data")), vec![name]);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = GraphStore::new(temp_dir.path().to_path_buf());
        let target = temp_dir.path().join("graph.json");
        let graph = sample_graph();

        store.save(&graph, Some(&target)).unwrap();
        let document = GraphStore::load(&target).unwrap();
        assert_eq!(document, graph.to_document());

        let restored = GraphStore::load_graph(&target).unwrap();
        assert_eq!(restored.entity_count(), 2);
        assert_eq!(restored.relationship_count(), 1);
    }

    #[test]
    fn test_overwrite_replaces_whole_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = GraphStore::new(temp_dir.path().to_path_buf());
        let target = temp_dir.path().join("graph.json");
        fs::write(&target, "x".repeat(100_000)).unwrap();

        store.save(&sample_graph(), Some(&target)).unwrap();
        assert!(GraphStore::load(&target).is_ok());
        assert_eq!(dir_entries(temp_dir.path()), vec!["graph.json".to_string()]);
    }

    #[test]
    fn test_failed_write_leaves_nothing() {
        let temp_dir = TempDir::new().unwrap();
        // Destination is a directory, so the rename fails
        let target = temp_dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep.txt"), "keep").unwrap();

        let result = write_document(&sample_graph().to_document(), &target);
        assert!(matches!(result, Err(ThreatGraphError::Io { .. })));
        assert_eq!(dir_entries(temp_dir.path()), vec!["occupied".to_string()]);
    }

    #[test]
    fn test_default_path_sanitizes_target() {
        let store = GraphStore::new(PathBuf::from("/data"));
        let path = store.default_path("evil/../target");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("intelligence_graph_evil_.._target_"));
        assert_eq!(path.parent(), Some(Path::new("/data")));
    }

    #[test]
    fn test_load_missing_file() {
        let result = GraphStore::load(Path::new("/nonexistent/graph.json"));
        assert!(matches!(result, Err(ThreatGraphError::Io { .. })));
    }
}
