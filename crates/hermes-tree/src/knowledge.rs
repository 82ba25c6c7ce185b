/// An append-only knowledge-base entry, shared process-wide across nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeEntry {
    pub content: String,
    pub author_node_title: String,
    pub timestamp: String,
    pub title: Option<String>,
    pub tags: Vec<String>,
}

/// The in-memory, process-wide knowledge base. Persistence lives in
/// `hermes-fs`; this type is the pure ordered list plus the two orderings
/// renderers/persistence need.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    entries: Vec<KnowledgeEntry>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, entry: KnowledgeEntry) {
        self.entries.push(entry);
    }

    /// Defensive copy, in disk order (ascending timestamp — insertion order,
    /// since entries are appended in timestamp order by construction).
    pub fn entries(&self) -> Vec<KnowledgeEntry> {
        self.entries.clone()
    }

    /// Newest-first, for rendering.
    pub fn entries_newest_first(&self) -> Vec<KnowledgeEntry> {
        let mut v = self.entries.clone();
        v.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        v
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
