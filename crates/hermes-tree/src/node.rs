use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, Weak};

use hermes_core::NodeStatus;

/// An artifact attached to a node. External artifacts live outside the tree
/// (in `_ExternalFiles/`) and are always fully visible regardless of any
/// node's `visible_artifacts` toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub content: String,
    pub is_external: bool,
}

pub type NodeHandle = Arc<RwLock<Node>>;
pub type WeakNodeHandle = Weak<RwLock<Node>>;

/// A single node in the problem tree.
///
/// Children are owned (`subproblems`); the parent is a weak back-reference
/// so the tree has exactly one ownership direction (root -> leaves) and the
/// scheduler can hold plain node titles without fighting the borrow
/// checker over shared ownership of live nodes.
pub struct Node {
    pub title: String,
    pub problem_definition: String,
    pub criteria: Vec<String>,
    pub criteria_done: Vec<bool>,
    pub artifacts: BTreeMap<String, Artifact>,
    pub subproblems: BTreeMap<String, NodeHandle>,
    pub parent: Option<WeakNodeHandle>,
    pub depth_from_root: u32,
    pub status: NodeStatus,
    pub visible_artifacts: BTreeMap<String, bool>,
}

impl Node {
    pub fn new_root(title: impl Into<String>, problem_definition: impl Into<String>) -> NodeHandle {
        Arc::new(RwLock::new(Node {
            title: title.into(),
            problem_definition: problem_definition.into(),
            criteria: Vec::new(),
            criteria_done: Vec::new(),
            artifacts: BTreeMap::new(),
            subproblems: BTreeMap::new(),
            parent: None,
            depth_from_root: 0,
            status: NodeStatus::NotStarted,
            visible_artifacts: BTreeMap::new(),
        }))
    }

    /// Adds a child under `parent_handle`. Silent no-op if a subproblem with
    /// the same title already exists — the existing child is kept.
    pub fn add_subproblem(
        parent_handle: &NodeHandle,
        title: impl Into<String>,
        problem_definition: impl Into<String>,
    ) {
        let title = title.into();
        let mut parent = parent_handle.write().unwrap();
        if parent.subproblems.contains_key(&title) {
            return;
        }
        let depth = parent.depth_from_root + 1;
        let child = Arc::new(RwLock::new(Node {
            title: title.clone(),
            problem_definition: problem_definition.into(),
            criteria: Vec::new(),
            criteria_done: Vec::new(),
            artifacts: BTreeMap::new(),
            subproblems: BTreeMap::new(),
            parent: Some(Arc::downgrade(parent_handle)),
            depth_from_root: depth,
            status: NodeStatus::NotStarted,
            visible_artifacts: BTreeMap::new(),
        }));
        parent.subproblems.insert(title, child);
    }

    /// Adds a criterion if it isn't already present (exact text match).
    pub fn add_criteria(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.criteria.iter().any(|c| c == &text) {
            return;
        }
        self.criteria.push(text);
        self.criteria_done.push(false);
    }

    /// Marks criteria[index] done. Returns `false` (no-op) if out of range.
    pub fn mark_criteria_done(&mut self, index: usize) -> bool {
        if index >= self.criteria_done.len() {
            return false;
        }
        self.criteria_done[index] = true;
        true
    }

    pub fn append_to_problem_definition(&mut self, content: &str) {
        if !self.problem_definition.is_empty() {
            self.problem_definition.push('\n');
        }
        self.problem_definition.push_str(content);
    }

    pub fn add_artifact(&mut self, name: impl Into<String>, content: impl Into<String>, is_external: bool) {
        let name = name.into();
        self.artifacts.insert(
            name.clone(),
            Artifact { name, content: content.into(), is_external },
        );
    }

    pub fn criteria_status(&self) -> String {
        let done = self.criteria_done.iter().filter(|d| **d).count();
        format!("{done}/{}", self.criteria.len())
    }

    pub fn parent_handle(&self) -> Option<NodeHandle> {
        self.parent.as_ref().and_then(|w| w.upgrade())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_no_parent_and_depth_zero() {
        let root = Node::new_root("root", "def");
        let r = root.read().unwrap();
        assert!(r.parent.is_none());
        assert_eq!(r.depth_from_root, 0);
    }

    #[test]
    fn child_depth_is_parent_plus_one() {
        let root = Node::new_root("root", "def");
        Node::add_subproblem(&root, "child", "child def");
        let r = root.read().unwrap();
        let child = r.subproblems.get("child").unwrap().read().unwrap();
        assert_eq!(child.depth_from_root, 1);
        assert!(child.parent_handle().is_some());
    }

    #[test]
    fn duplicate_subproblem_title_is_silent_noop() {
        let root = Node::new_root("root", "def");
        Node::add_subproblem(&root, "child", "first");
        Node::add_subproblem(&root, "child", "second");
        let r = root.read().unwrap();
        assert_eq!(r.subproblems.len(), 1);
        let child = r.subproblems.get("child").unwrap().read().unwrap();
        assert_eq!(child.problem_definition, "first");
    }

    #[test]
    fn criteria_len_matches_done_len() {
        let root = Node::new_root("root", "def");
        let mut r = root.write().unwrap();
        r.add_criteria("a");
        r.add_criteria("b");
        r.add_criteria("a"); // dup, ignored
        assert_eq!(r.criteria.len(), r.criteria_done.len());
        assert_eq!(r.criteria.len(), 2);
    }

    #[test]
    fn append_to_problem_definition_adds_newline_separator() {
        let root = Node::new_root("root", "first");
        let mut r = root.write().unwrap();
        r.append_to_problem_definition("second");
        assert_eq!(r.problem_definition, "first\nsecond");
    }

    #[test]
    fn mark_criteria_done_out_of_range_is_noop() {
        let root = Node::new_root("root", "def");
        let mut r = root.write().unwrap();
        r.add_criteria("a");
        assert!(!r.mark_criteria_done(5));
        assert!(!r.criteria_done[0]);
        assert!(r.mark_criteria_done(0));
        assert!(r.criteria_done[0]);
    }
}
