use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use hermes_core::{Error, Result};
use hermes_tree::{Artifact, Node, NodeHandle};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::frontmatter;
use crate::sanitize::sanitize_filename;

#[derive(Debug, Default, Serialize, Deserialize)]
struct NodeFrontmatter {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ArtifactFrontmatter {
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_external: bool,
}

/// Durable projection of the problem tree onto the filesystem. Holds one
/// coarse write lock for the duration of any destructive operation — not a
/// per-file lock — matching the single-writer discipline the design calls
/// for.
pub struct FileSystemStore {
    root_dir: PathBuf,
    backup_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSystemStore {
    pub fn new(root_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            backup_dir: backup_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn external_files_dir(&self) -> PathBuf {
        self.root_dir
            .parent()
            .map(|p| p.join("_ExternalFiles"))
            .unwrap_or_else(|| PathBuf::from("_ExternalFiles"))
    }

    fn knowledge_base_path(&self) -> PathBuf {
        self.root_dir
            .parent()
            .map(|p| p.join("_knowledge_base.md"))
            .unwrap_or_else(|| PathBuf::from("_knowledge_base.md"))
    }

    /// Creates a new root node and its directory skeleton. Fails if a root
    /// already exists at `root_dir`.
    pub fn create_root(&self, title: &str, definition: &str) -> Result<NodeHandle> {
        let _guard = self.write_lock.lock().unwrap();
        if self.root_dir.join("Problem Definition.md").exists() {
            return Err(Error::semantic_precondition(
                "root already exists; define_problem may only run once",
            ));
        }
        std::fs::create_dir_all(self.root_dir.join("Artifacts"))?;
        std::fs::create_dir_all(self.root_dir.join("Subproblems"))?;
        std::fs::create_dir_all(self.root_dir.join("logs_and_debug"))?;

        let root = Node::new_root(title, definition);
        self.write_node_files(&self.root_dir, &root)?;
        Ok(root)
    }

    /// Reconstructs the tree from disk, or `None` if no root exists yet.
    pub fn load_existing(&self) -> Result<Option<NodeHandle>> {
        if !self.root_dir.join("Problem Definition.md").exists() {
            return Ok(None);
        }
        Ok(Some(self.load_node(&self.root_dir, None, 0)?))
    }

    fn load_node(&self, dir: &Path, parent: Option<&NodeHandle>, depth: u32) -> Result<NodeHandle> {
        let def_content = std::fs::read_to_string(dir.join("Problem Definition.md")).unwrap_or_default();
        let (fm, body): (NodeFrontmatter, &str) = frontmatter::split(&def_content);
        let title = if fm.title.is_empty() {
            dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
        } else {
            fm.title
        };

        let (criteria, criteria_done) = self.load_criteria(dir);
        let artifacts = self.load_artifacts(&dir.join("Artifacts"))?;

        let node = std::sync::Arc::new(std::sync::RwLock::new(Node {
            title: title.clone(),
            problem_definition: body.trim_end_matches('\n').to_string(),
            criteria,
            criteria_done,
            artifacts,
            subproblems: BTreeMap::new(),
            parent: parent.map(std::sync::Arc::downgrade),
            depth_from_root: depth,
            status: hermes_core::NodeStatus::NotStarted,
            visible_artifacts: BTreeMap::new(),
        }));

        let subdir = dir.join("Subproblems");
        if subdir.is_dir() {
            let mut entries: Vec<_> = std::fs::read_dir(&subdir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect();
            entries.sort();
            for child_dir in entries {
                let child = self.load_node(&child_dir, Some(&node), depth + 1)?;
                let child_title = child.read().unwrap().title.clone();
                node.write().unwrap().subproblems.insert(child_title, child);
            }
        }

        Ok(node)
    }

    fn load_criteria(&self, dir: &Path) -> (Vec<String>, Vec<bool>) {
        let path = dir.join("Criteria of Definition of Done.md");
        let Ok(content) = std::fs::read_to_string(path) else {
            return (Vec::new(), Vec::new());
        };
        let mut criteria = Vec::new();
        let mut done = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            let Some(rest) = line.splitn(2, ". ").nth(1) else { continue };
            if let Some(text) = rest.strip_prefix("[x] ") {
                criteria.push(text.to_string());
                done.push(true);
            } else if let Some(text) = rest.strip_prefix("[ ] ") {
                criteria.push(text.to_string());
                done.push(false);
            }
        }
        (criteria, done)
    }

    fn load_artifacts(&self, dir: &Path) -> Result<BTreeMap<String, Artifact>> {
        let mut out = BTreeMap::new();
        if !dir.is_dir() {
            return Ok(out);
        }
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            let (fm, body): (ArtifactFrontmatter, &str) = frontmatter::split(&content);
            let name = if fm.name.is_empty() {
                path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default()
            } else {
                fm.name
            };
            out.insert(
                name.clone(),
                Artifact { name, content: body.to_string(), is_external: fm.is_external },
            );
        }
        Ok(out)
    }

    /// Recursively (re)writes every file the tree projects: problem
    /// definition, criteria checklist, breakdown structure, and one file per
    /// artifact. Backs up existing files first.
    pub fn update_files(&self, node: &NodeHandle) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        self.write_subtree(&self.root_dir, node)
    }

    fn write_subtree(&self, dir: &Path, node: &NodeHandle) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let n = node.read().unwrap();
        self.write_node_files(dir, node)?;
        let subdir = dir.join("Subproblems");
        std::fs::create_dir_all(&subdir)?;
        for (title, child) in n.subproblems.iter() {
            let child_dir = subdir.join(sanitize_filename(title));
            self.write_subtree(&child_dir, child)?;
        }
        Ok(())
    }

    fn write_node_files(&self, dir: &Path, node: &NodeHandle) -> Result<()> {
        std::fs::create_dir_all(dir.join("Artifacts"))?;
        std::fs::create_dir_all(dir.join("logs_and_debug"))?;
        let n = node.read().unwrap();

        let def_path = dir.join("Problem Definition.md");
        self.backup_if_exists(&def_path)?;
        let def_content = frontmatter::join(&NodeFrontmatter { title: n.title.clone() }, &n.problem_definition)?;
        std::fs::write(&def_path, def_content)?;

        let criteria_path = dir.join("Criteria of Definition of Done.md");
        self.backup_if_exists(&criteria_path)?;
        let mut criteria_content = String::new();
        for (i, (text, done)) in n.criteria.iter().zip(n.criteria_done.iter()).enumerate() {
            let marker = if *done { "[x]" } else { "[ ]" };
            criteria_content.push_str(&format!("{}. {marker} {text}\n", i + 1));
        }
        std::fs::write(&criteria_path, criteria_content)?;

        let breakdown_path = dir.join("Breakdown Structure.md");
        self.backup_if_exists(&breakdown_path)?;
        let mut breakdown = String::new();
        for title in n.subproblems.keys() {
            breakdown.push_str(&format!("## {title}\n\n"));
        }
        std::fs::write(&breakdown_path, breakdown)?;

        for artifact in n.artifacts.values() {
            let artifact_path = dir.join("Artifacts").join(sanitize_filename(&artifact.name));
            self.backup_if_exists(&artifact_path)?;
            let content = frontmatter::join(
                &ArtifactFrontmatter { name: artifact.name.clone(), is_external: artifact.is_external },
                &artifact.content,
            )?;
            std::fs::write(&artifact_path, content)?;
        }

        Ok(())
    }

    /// Copies `path` to `<backup_dir>/<name>_<timestamp>.bak` before a
    /// destructive overwrite, if the file currently exists. Filesystem
    /// failures here are logged and swallowed — a missing backup must not
    /// abort the engine.
    fn backup_if_exists(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        if let Err(e) = std::fs::create_dir_all(&self.backup_dir) {
            warn!("failed to create backup dir: {e}");
            return Ok(());
        }
        let stem = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "file".to_string());
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let backup_path = self.backup_dir.join(format!("{stem}_{stamp}.bak"));
        if let Err(e) = std::fs::copy(path, &backup_path) {
            warn!("failed to back up {}: {e}", path.display());
        } else {
            debug!("backed up {} -> {}", path.display(), backup_path.display());
        }
        Ok(())
    }

    /// Adds an external file, stored outside the tree in `_ExternalFiles/`.
    pub fn add_external_file(&self, name: &str, content: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let dir = self.external_files_dir();
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(sanitize_filename(name));
        self.backup_if_exists(&path)?;
        let joined = frontmatter::join(&ArtifactFrontmatter { name: name.to_string(), is_external: true }, content)?;
        std::fs::write(path, joined)?;
        Ok(())
    }

    pub fn load_external_files(&self) -> Result<BTreeMap<String, Artifact>> {
        self.load_artifacts(&self.external_files_dir())
    }

    pub fn get_external_files(&self) -> Result<Vec<Artifact>> {
        Ok(self.load_external_files()?.into_values().collect())
    }

    pub fn knowledge_base_file_path(&self) -> PathBuf {
        self.knowledge_base_path()
    }
}
