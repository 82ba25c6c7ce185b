use std::collections::BTreeMap;

use hermes_sections::SectionData;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub author: Author,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage { author: Author::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage { author: Author::Assistant, content: content.into() }
    }
}

/// Plain arguments parsed out of a command tag: section name to the list of
/// values given for it, in the order they appeared.
pub type CommandArgs = BTreeMap<String, Vec<String>>;

/// Everything an engine turn accumulates while running one or more commands
/// against a node, before it is folded back into that node's transcript.
#[derive(Debug, Clone, Default)]
pub struct AutoReply {
    pub errors: Vec<String>,
    pub command_outputs: Vec<(String, CommandArgs, String)>,
    pub internal_messages: Vec<(String, String)>,
    pub confirmation_request: Option<String>,
    pub changed_sections: Vec<(usize, SectionData)>,
}

impl AutoReply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
            && self.command_outputs.is_empty()
            && self.internal_messages.is_empty()
            && self.confirmation_request.is_none()
            && self.changed_sections.is_empty()
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn push_command_output(&mut self, command: impl Into<String>, args: CommandArgs, output: impl Into<String>) {
        self.command_outputs.push((command.into(), args, output.into()));
    }

    pub fn push_internal_message(&mut self, target_title: impl Into<String>, text: impl Into<String>) {
        self.internal_messages.push((target_title.into(), text.into()));
    }
}

/// One committed turn's auto-reply, kept in its raw form rather than
/// pre-rendered: `changed_sections` is only resolved to text when the
/// transcript is reassembled, so a later turn touching the same section
/// index can still mark this one stale (see `render_blocks`).
#[derive(Debug, Clone, Default)]
struct RecordedReply {
    errors: Vec<String>,
    command_outputs: Vec<(String, CommandArgs, String)>,
    confirmation_request: Option<String>,
    changed_sections: Vec<(usize, SectionData)>,
}

impl RecordedReply {
    fn is_empty(&self) -> bool {
        self.errors.is_empty()
            && self.command_outputs.is_empty()
            && self.confirmation_request.is_none()
            && self.changed_sections.is_empty()
    }
}

#[derive(Debug, Clone)]
enum HistoryBlock {
    Chat(ChatMessage),
    Reply(RecordedReply),
}

/// Per-node transcript plus in-progress turn accumulator. Keyed by node
/// title in the owning engine; the transcript is never cleared when the
/// scheduler re-enters a node (focus returning to a parent after its
/// children finish picks the transcript back up where it left off).
#[derive(Debug, Clone, Default)]
pub struct NodeHistory {
    blocks: Vec<HistoryBlock>,
    pub last_dynamic_sections_state: Vec<SectionData>,
}

impl NodeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.blocks.push(HistoryBlock::Chat(message));
    }
}

/// Owns one `NodeHistory` per node title, created lazily on first access.
#[derive(Debug, Clone, Default)]
pub struct AutoReplyAggregator {
    histories: BTreeMap<String, NodeHistory>,
}

impl AutoReplyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history_for(&mut self, node_title: &str) -> &mut NodeHistory {
        self.histories.entry(node_title.to_string()).or_default()
    }

    /// Renders `node_title`'s full block list into the flat chat transcript
    /// handed to the collaborator backend.
    pub fn transcript_for(&self, node_title: &str) -> Vec<ChatMessage> {
        match self.histories.get(node_title) {
            Some(history) => render_blocks(&history.blocks),
            None => Vec::new(),
        }
    }

    /// Computes the section diff for `node_title` against its last recorded
    /// state, then stores `new_state` as the new baseline for next time.
    pub fn diff_and_record(&mut self, node_title: &str, new_state: Vec<SectionData>) -> Vec<(usize, SectionData)> {
        let history = self.history_for(node_title);
        let changes = hermes_sections::diff(&history.last_dynamic_sections_state, &new_state);
        history.last_dynamic_sections_state = new_state;
        changes
    }

    /// Commits one turn's auto-reply onto `node_title`'s own block list, and
    /// delivers every internal message straight into its target node's
    /// history as an ordinary chat turn (not `node_title`'s — a message from
    /// `finish_problem`/`fail_problem` is addressed to the parent it just
    /// handed focus back to).
    pub fn record_turn(&mut self, node_title: &str, reply: &AutoReply) {
        let recorded = RecordedReply {
            errors: reply.errors.clone(),
            command_outputs: reply.command_outputs.clone(),
            confirmation_request: reply.confirmation_request.clone(),
            changed_sections: reply.changed_sections.clone(),
        };
        if !recorded.is_empty() {
            self.history_for(node_title).blocks.push(HistoryBlock::Reply(recorded));
        }
        for (target_title, text) in &reply.internal_messages {
            self.history_for(target_title).push(ChatMessage::user(text.clone()));
        }
    }
}

fn render_blocks(blocks: &[HistoryBlock]) -> Vec<ChatMessage> {
    blocks
        .iter()
        .enumerate()
        .map(|(position, block)| match block {
            HistoryBlock::Chat(message) => message.clone(),
            HistoryBlock::Reply(reply) => ChatMessage::user(render_recorded_reply(reply, &blocks[position + 1..])),
        })
        .collect()
}

/// Renders one committed auto-reply, looking at every later reply recorded
/// for the same node to decide, per changed section, how many times it has
/// since been superseded. Only the knowledge base renderer acts on a nonzero
/// count; every other section renders the same regardless.
fn render_recorded_reply(reply: &RecordedReply, later_blocks: &[HistoryBlock]) -> String {
    let mut out = String::new();
    for (command, _args, output) in &reply.command_outputs {
        out.push_str(&format!("[{command}]\n{output}\n"));
    }
    for error in &reply.errors {
        out.push_str(&format!("[error] {error}\n"));
    }
    if let Some(confirmation) = &reply.confirmation_request {
        out.push_str(&format!("[confirmation requested] {confirmation}\n"));
    }
    for (index, data) in &reply.changed_sections {
        let future_changes = later_blocks
            .iter()
            .filter(|later| matches!(later, HistoryBlock::Reply(r) if r.changed_sections.iter().any(|(i, _)| i == index)))
            .count();
        out.push_str(&hermes_sections::render(data, future_changes));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_for_creates_entry_lazily() {
        let mut aggregator = AutoReplyAggregator::new();
        assert!(aggregator.transcript_for("root").is_empty());
        aggregator.history_for("root").push(ChatMessage::user("hello"));
        assert_eq!(aggregator.transcript_for("root").len(), 1);
    }

    #[test]
    fn transcript_persists_across_separate_accesses() {
        let mut aggregator = AutoReplyAggregator::new();
        aggregator.history_for("child").push(ChatMessage::assistant("first"));
        aggregator.history_for("child").push(ChatMessage::assistant("second"));
        let transcript = aggregator.transcript_for("child");
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].content, "first");
        assert_eq!(transcript[1].content, "second");
    }

    #[test]
    fn diff_and_record_reports_changes_and_updates_baseline() {
        let mut aggregator = AutoReplyAggregator::new();
        let first = vec![SectionData::PermanentLogs { lines: vec!["a".into()] }];
        let changes = aggregator.diff_and_record("root", first.clone());
        assert_eq!(changes.len(), 1);

        let unchanged = aggregator.diff_and_record("root", first);
        assert!(unchanged.is_empty());

        let second = vec![SectionData::PermanentLogs { lines: vec!["a".into(), "b".into()] }];
        let changed = aggregator.diff_and_record("root", second);
        assert_eq!(changed.len(), 1);
    }

    #[test]
    fn auto_reply_is_empty_tracks_all_buckets() {
        let mut reply = AutoReply::new();
        assert!(reply.is_empty());
        reply.push_error("bad command");
        assert!(!reply.is_empty());
    }

    #[test]
    fn record_turn_folds_outputs_and_errors_into_transcript() {
        let mut aggregator = AutoReplyAggregator::new();
        let mut reply = AutoReply::new();
        reply.push_command_output("add_criteria", CommandArgs::new(), "added criterion");
        reply.push_error("unknown_command: bogus");
        aggregator.record_turn("root", &reply);
        let transcript = aggregator.transcript_for("root");
        assert_eq!(transcript.len(), 1);
        assert!(transcript[0].content.contains("add_criteria"));
        assert!(transcript[0].content.contains("unknown_command: bogus"));
    }

    #[test]
    fn record_turn_delivers_internal_messages_to_the_target_node_not_the_origin() {
        let mut aggregator = AutoReplyAggregator::new();
        let mut reply = AutoReply::new();
        reply.push_internal_message("Root", "child finished");
        aggregator.record_turn("Child", &reply);

        assert!(aggregator.transcript_for("Child").is_empty());
        let root_transcript = aggregator.transcript_for("Root");
        assert_eq!(root_transcript.len(), 1);
        assert_eq!(root_transcript[0].content, "child finished");
    }

    #[test]
    fn earlier_changed_section_is_omitted_once_a_later_turn_changes_it_again() {
        let mut aggregator = AutoReplyAggregator::new();
        let kb_data = SectionData::KnowledgeBase { entries: vec![] };

        let mut first = AutoReply::new();
        first.changed_sections = vec![(8, kb_data.clone())];
        aggregator.record_turn("root", &first);

        let mut second = AutoReply::new();
        second.push_command_output("add_criteria", CommandArgs::new(), "added criterion");
        aggregator.record_turn("root", &second);

        let mut third = AutoReply::new();
        third.changed_sections = vec![(8, kb_data)];
        aggregator.record_turn("root", &third);

        let transcript = aggregator.transcript_for("root");
        assert_eq!(transcript.len(), 3);
        assert!(transcript[0].content.contains("[Knowledge Base content omitted"));
        assert!(transcript[2].content.contains("<knowledge_base>"));
    }
}
