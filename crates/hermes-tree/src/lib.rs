pub mod knowledge;
pub mod node;

pub use knowledge::{KnowledgeBase, KnowledgeEntry};
pub use node::{Artifact, Node, NodeHandle, WeakNodeHandle};

/// Walks from `node` up to (and including) the root, returning the chain in
/// root-first order.
pub fn parent_chain(node: &NodeHandle) -> Vec<NodeHandle> {
    let mut chain = vec![node.clone()];
    let mut current = node.clone();
    loop {
        let parent = current.read().unwrap().parent_handle();
        match parent {
            Some(p) => {
                chain.push(p.clone());
                current = p;
            }
            None => break,
        }
    }
    chain.reverse();
    chain
}

/// Depth-first search for an artifact anywhere in the subtree rooted at
/// `node`, returning the owning node's title alongside the artifact.
pub fn find_artifact_in_subtree(node: &NodeHandle, name: &str) -> Option<(String, Artifact)> {
    let n = node.read().unwrap();
    if let Some(a) = n.artifacts.get(name) {
        return Some((n.title.clone(), a.clone()));
    }
    for child in n.subproblems.values() {
        if let Some(found) = find_artifact_in_subtree(child, name) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_chain_is_root_first() {
        let root = Node::new_root("root", "def");
        Node::add_subproblem(&root, "child", "def");
        let child = root.read().unwrap().subproblems.get("child").unwrap().clone();
        let chain = parent_chain(&child);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].read().unwrap().title, "root");
        assert_eq!(chain[1].read().unwrap().title, "child");
    }

    #[test]
    fn find_artifact_searches_whole_subtree() {
        let root = Node::new_root("root", "def");
        Node::add_subproblem(&root, "child", "def");
        {
            let r = root.read().unwrap();
            let child = r.subproblems.get("child").unwrap();
            child.write().unwrap().add_artifact("report", "content", false);
        }
        let found = find_artifact_in_subtree(&root, "report");
        assert!(found.is_some());
        let (owner, artifact) = found.unwrap();
        assert_eq!(owner, "child");
        assert_eq!(artifact.content, "content");
    }
}
