use hermes_core::Result;
use hermes_fs::{FileSystemStore, KnowledgeBaseStore};
use hermes_history::{AutoReply, AutoReplyAggregator};
use hermes_scheduler::Scheduler;
use hermes_tree::{KnowledgeBase, NodeHandle};

/// Everything a command needs to mutate engine state. Built fresh per turn
/// by the engine loop and handed to whichever commands the parser produced
/// for that turn, in order.
pub struct CommandContext<'a> {
    pub current_node: NodeHandle,
    pub fs: &'a FileSystemStore,
    pub kb_store: &'a KnowledgeBaseStore,
    pub knowledge_base: &'a mut KnowledgeBase,
    pub scheduler: &'a mut Scheduler,
    pub history: &'a mut AutoReplyAggregator,
    pub permanent_log: &'a mut Vec<String>,
    pub problem_defined: bool,
    /// The auto-reply this turn is building. Commands that need to hand a
    /// message to a different node (a focus change bubbling up to a parent)
    /// push onto it here instead of writing into `history` directly, so the
    /// message travels through the same bucket the engine reports back.
    pub reply: &'a mut AutoReply,
}

impl<'a> CommandContext<'a> {
    /// Persists the whole tree. Commands call this after any mutation that
    /// should be visible on disk; cheap enough to call liberally since the
    /// store backs up only the files that actually changed.
    pub fn persist(&self) -> Result<()> {
        self.fs.update_files(&self.current_node)
    }

    pub fn current_title(&self) -> String {
        self.current_node.read().unwrap().title.clone()
    }
}
