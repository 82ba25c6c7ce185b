use std::path::{Path, PathBuf};
use std::sync::Mutex;

use hermes_core::Result;
use hermes_tree::{KnowledgeBase, KnowledgeEntry};
use serde::{Deserialize, Serialize};

use crate::frontmatter;

const SEPARATOR: &str = "\n\n<!-- HERMES_KNOWLEDGE_ENTRY_SEPARATOR -->\n\n";

#[derive(Debug, Default, Serialize, Deserialize)]
struct EntryFrontmatter {
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    author_node_title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    title: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    tags: Vec<String>,
}

/// Persists the knowledge base as a single file, entries separated by a
/// sentinel comment, each carrying its own YAML frontmatter.
pub struct KnowledgeBaseStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl KnowledgeBaseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<KnowledgeBase> {
        let mut kb = KnowledgeBase::new();
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return Ok(kb);
        };
        for chunk in content.split(SEPARATOR) {
            let chunk = chunk.trim();
            if chunk.is_empty() {
                continue;
            }
            let (fm, body): (EntryFrontmatter, &str) = frontmatter::split(chunk);
            kb.add_entry(KnowledgeEntry {
                content: body.trim().to_string(),
                author_node_title: fm.author_node_title,
                timestamp: fm.timestamp,
                title: fm.title,
                tags: fm.tags,
            });
        }
        Ok(kb)
    }

    /// Appends `entry` and immediately persists the whole knowledge base.
    pub fn add_entry(&self, kb: &mut KnowledgeBase, entry: KnowledgeEntry) -> Result<()> {
        kb.add_entry(entry);
        self.save(kb)
    }

    pub fn save(&self, kb: &KnowledgeBase) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut entries = kb.entries();
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        let mut rendered = Vec::new();
        for entry in &entries {
            let fm = EntryFrontmatter {
                timestamp: entry.timestamp.clone(),
                author_node_title: entry.author_node_title.clone(),
                title: entry.title.clone(),
                tags: entry.tags.clone(),
            };
            rendered.push(frontmatter::join(&fm, &entry.content)?);
        }
        std::fs::write(&self.path, rendered.join(SEPARATOR))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn test_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        std::env::temp_dir().join(format!("hermes_kb_test_{name}_{}_{nanos}.md", std::process::id()))
    }

    fn entry(ts: &str, content: &str) -> KnowledgeEntry {
        KnowledgeEntry {
            content: content.into(),
            author_node_title: "root".into(),
            timestamp: ts.into(),
            title: Some("Finding".into()),
            tags: vec!["a".into(), "b".into()],
        }
    }

    #[test]
    fn save_then_load_yields_same_ordered_list() {
        let path = test_path("roundtrip");
        let store = KnowledgeBaseStore::new(&path);
        let mut kb = KnowledgeBase::new();
        store.add_entry(&mut kb, entry("2024-01-02T00:00:00Z", "second")).unwrap();
        store.add_entry(&mut kb, entry("2024-01-01T00:00:00Z", "first")).unwrap();

        let loaded = store.load().unwrap();
        let entries = loaded.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].timestamp, "2024-01-01T00:00:00Z");
        assert_eq!(entries[0].content, "first");
        assert_eq!(entries[1].timestamp, "2024-01-02T00:00:00Z");
        assert_eq!(entries[0].tags, vec!["a".to_string(), "b".to_string()]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn file_contains_separator_sentinel() {
        let path = test_path("sentinel");
        let store = KnowledgeBaseStore::new(&path);
        let mut kb = KnowledgeBase::new();
        store.add_entry(&mut kb, entry("2024-01-01T00:00:00Z", "first")).unwrap();
        store.add_entry(&mut kb, entry("2024-01-02T00:00:00Z", "second")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("HERMES_KNOWLEDGE_ENTRY_SEPARATOR"));

        std::fs::remove_file(&path).ok();
    }
}
