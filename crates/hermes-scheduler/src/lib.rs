use std::collections::{BTreeMap, VecDeque};

use hermes_core::{Error, NodeStatus, Result};
use hermes_tree::NodeHandle;
use tracing::info;

/// An internal message delivered to a node's auto-reply aggregator when
/// focus returns to it (e.g. a child's completion message).
pub struct InternalMessage {
    pub target_title: String,
    pub text: String,
}

/// The task scheduler: an ordered focus stack plus a per-node queue of
/// siblings waiting to be activated sequentially. No channels, no
/// cancellation token — every operation here runs to completion, matching
/// the single suspension point (the LLM call) living entirely outside this
/// type.
pub struct Scheduler {
    focus_stack: Vec<NodeHandle>,
    children_queue: BTreeMap<String, VecDeque<String>>,
    finished: bool,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self { focus_stack: Vec::new(), children_queue: BTreeMap::new(), finished: false }
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self, root: NodeHandle) {
        root.write().unwrap().status = NodeStatus::InProgress;
        self.focus_stack = vec![root];
        self.finished = false;
    }

    pub fn current_node(&self) -> Option<NodeHandle> {
        self.focus_stack.last().cloned()
    }

    pub fn has_current_task(&self) -> bool {
        self.focus_stack.last().is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Queues `titles` onto `parent_title`'s child queue, to be activated
    /// one at a time as earlier siblings finish or fail.
    pub fn enqueue_children(&mut self, parent_title: &str, titles: Vec<String>) {
        self.children_queue.entry(parent_title.to_string()).or_default().extend(titles);
    }

    /// Moves focus down into `title`, a subproblem of the current node.
    /// Transitions the current node to `Pending` and the child to
    /// `InProgress`.
    pub fn focus_down(&mut self, title: &str) -> Result<()> {
        let current = self.current_node().ok_or_else(|| Error::scheduler_violation("no current node"))?;
        let child = {
            let current_ref = current.read().unwrap();
            current_ref
                .subproblems
                .get(title)
                .cloned()
                .ok_or_else(|| Error::invalid_argument(format!("unknown subproblem title: '{title}'")))?
        };
        current.write().unwrap().status = NodeStatus::Pending;
        child.write().unwrap().status = NodeStatus::InProgress;
        info!("focus_down -> {title}");
        self.focus_stack.push(child);
        Ok(())
    }

    /// Moves focus up from the current node, marking it `Finished`. If a
    /// queued sibling remains under the new top, immediately focuses down
    /// into it instead of resuming the parent as current.
    pub fn focus_up(&mut self, message: Option<String>) -> Result<Option<InternalMessage>> {
        self.complete_current(NodeStatus::Finished, message)
    }

    /// Same as `focus_up` but marks the current node `Failed`.
    pub fn fail_and_focus_up(&mut self, message: Option<String>) -> Result<Option<InternalMessage>> {
        self.complete_current(NodeStatus::Failed, message)
    }

    fn complete_current(
        &mut self,
        terminal_status: NodeStatus,
        message: Option<String>,
    ) -> Result<Option<InternalMessage>> {
        let current = self.focus_stack.pop().ok_or_else(|| Error::scheduler_violation("no current node"))?;
        current.write().unwrap().status = terminal_status;
        let current_title = current.read().unwrap().title.clone();
        info!("{current_title} -> {:?}", terminal_status);

        let Some(new_top) = self.focus_stack.last().cloned() else {
            self.finished = true;
            return match message {
                Some(_) => Err(Error::scheduler_violation(
                    "cannot pass a message from the root node as there is no parent",
                )),
                None => Ok(None),
            };
        };

        new_top.write().unwrap().status = NodeStatus::InProgress;
        let new_top_title = new_top.read().unwrap().title.clone();

        if let Some(next_sibling) = self.children_queue.get_mut(&new_top_title).and_then(|q| q.pop_front()) {
            self.focus_down(&next_sibling)?;
            return Ok(message.map(|text| InternalMessage { target_title: next_sibling, text }));
        }

        Ok(message.map(|text| InternalMessage { target_title: new_top_title, text }))
    }
}
