use std::sync::Arc;

use futures::StreamExt;
use hermes_commands::{builtin_registry, parse_text, CommandContext, CommandRegistry};
use hermes_core::{HermesConfig, Result, SHUTDOWN_SENTINEL};
use hermes_fs::{FileSystemStore, KnowledgeBaseStore};
use hermes_history::{AutoReply, AutoReplyAggregator, ChatMessage};
use hermes_llm::LlmProvider;
use hermes_scheduler::Scheduler;
use hermes_tree::{KnowledgeBase, NodeHandle};

use crate::prompt::{build_sections, render_turn_prompt};

/// Ties the whole system together: the tree, its durable projection, the
/// scheduler driving focus, the command language, and one collaborator
/// backend. One call to `run_turn` is one full round trip: render the
/// current state, ask the collaborator for a reply, parse and execute
/// whatever commands it issued, fold the result back into history.
pub struct Engine {
    root: Option<NodeHandle>,
    fs: FileSystemStore,
    kb_store: KnowledgeBaseStore,
    knowledge_base: KnowledgeBase,
    scheduler: Scheduler,
    history: AutoReplyAggregator,
    registry: CommandRegistry,
    llm: Arc<dyn LlmProvider>,
    permanent_log: Vec<String>,
    problem_defined: bool,
    config: HermesConfig,
    /// The auto-reply produced by the previous turn's command execution,
    /// rendered into the next prompt so the collaborator sees the outcome
    /// of what it just asked for.
    last_auto_reply: Option<AutoReply>,
    /// Number of turns run so far, used to decrement `config.budget_total`.
    turns_taken: u32,
}

impl Engine {
    pub fn new(config: HermesConfig, llm: Arc<dyn LlmProvider>) -> Result<Self> {
        let fs = FileSystemStore::new(config.root_dir.clone(), config.backup_dir.clone());
        let kb_store = KnowledgeBaseStore::new(fs.knowledge_base_file_path());
        let knowledge_base = kb_store.load()?;
        let root = fs.load_existing()?;
        let mut scheduler = Scheduler::new();
        let problem_defined = root.is_some();
        if let Some(root) = &root {
            scheduler.initialize(root.clone());
        }
        Ok(Self {
            root,
            fs,
            kb_store,
            knowledge_base,
            scheduler,
            history: AutoReplyAggregator::new(),
            registry: builtin_registry(),
            llm,
            permanent_log: Vec::new(),
            problem_defined,
            config,
            last_auto_reply: None,
            turns_taken: 0,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.problem_defined && self.scheduler.is_finished()
    }

    /// `config.budget_total` minus the number of turns already run. `None`
    /// when no budget is configured, matching `render_budget`'s unlimited case.
    fn budget_remaining(&self) -> Option<u32> {
        self.config.budget_total.map(|total| total.saturating_sub(self.turns_taken))
    }

    pub fn current_node(&self) -> Option<NodeHandle> {
        self.scheduler.current_node()
    }

    pub fn root_node(&self) -> Option<NodeHandle> {
        self.root.clone()
    }

    /// The auto-reply produced by the most recently completed turn, if any.
    pub fn last_auto_reply(&self) -> Option<&AutoReply> {
        self.last_auto_reply.as_ref()
    }

    /// Runs one full turn: builds the prompt for whichever node is current,
    /// asks the collaborator for a reply, executes every command the reply
    /// contains, and folds the outcome into that node's transcript.
    ///
    /// Returns `true` once the whole run has finished (the root node
    /// completed or failed).
    pub async fn run_turn(&mut self) -> Result<bool> {
        let node = match self.current_node() {
            Some(node) => node,
            None => {
                if !self.problem_defined {
                    self.root.clone().unwrap_or_else(|| hermes_tree::Node::new_root("", ""))
                } else {
                    return Ok(true);
                }
            }
        };

        self.turns_taken += 1;
        let prompt = self.render_prompt(&node);
        let title = node.read().unwrap().title.clone();
        let transcript = self.history.transcript_for(&title);

        let mut stream = self.llm.send(&prompt, &transcript).await?;
        let mut reply_text = String::new();
        while let Some(delta) = stream.next().await {
            match delta? {
                hermes_llm::StreamDelta::Text(text) => reply_text.push_str(&text),
                hermes_llm::StreamDelta::Done => break,
            }
        }

        self.history.history_for(&title).push(ChatMessage::assistant(reply_text.clone()));

        if reply_text.to_lowercase().contains(&SHUTDOWN_SENTINEL.to_lowercase()) {
            self.scheduler_force_finish();
            return Ok(true);
        }

        let mut auto_reply = self.process_commands(&reply_text)?;
        if let Some(current) = self.current_node() {
            auto_reply.changed_sections = self.changed_sections_for(&current);
        }
        self.history.record_turn(&title, &auto_reply);
        self.last_auto_reply = Some(auto_reply);

        Ok(self.is_finished())
    }

    /// Snapshots the current node's ten sections and diffs them against the
    /// baseline recorded the last time this node's prompt was rendered.
    fn changed_sections_for(&mut self, node: &NodeHandle) -> Vec<(usize, hermes_sections::SectionData)> {
        let Some(root) = self.root.clone() else { return Vec::new() };
        let kb_entries = self.knowledge_base_snapshots();
        let budget_remaining = self.budget_remaining();
        let sections = build_sections(&root, node, &self.permanent_log, &self.config, budget_remaining, kb_entries);
        let title = node.read().unwrap().title.clone();
        self.history.diff_and_record(&title, sections)
    }

    fn knowledge_base_snapshots(&self) -> Vec<hermes_sections::KnowledgeEntrySnapshot> {
        self.knowledge_base
            .entries_newest_first()
            .into_iter()
            .map(|e| hermes_sections::KnowledgeEntrySnapshot {
                content: e.content,
                author_node_title: e.author_node_title,
                timestamp: e.timestamp,
                title: e.title,
                tags: e.tags,
            })
            .collect()
    }

    fn scheduler_force_finish(&mut self) {
        // No parent-completion bookkeeping needed: the sentinel is an
        // unconditional abort, not a normal finish_problem at the root.
        self.problem_defined = true;
        while self.scheduler.has_current_task() {
            let _ = self.scheduler.focus_up(None);
        }
    }

    fn render_prompt(&mut self, node: &NodeHandle) -> String {
        let Some(root) = self.root.clone() else {
            return "<header>\nNo problem has been defined yet. Use define_problem to start.\n</header>".to_string();
        };
        let kb_entries = self.knowledge_base_snapshots();
        let budget_remaining = self.budget_remaining();
        let sections = build_sections(&root, node, &self.permanent_log, &self.config, budget_remaining, kb_entries);
        // The live view is never "future-changed" relative to itself; that
        // concept only applies when re-rendering a past turn's auto-reply
        // against later ones (see `hermes_history::render_recorded_reply`).
        let future_changes_per_section = vec![0usize; hermes_sections::SECTION_COUNT];
        let empty_reply = AutoReply::new();
        let reply = self.last_auto_reply.as_ref().unwrap_or(&empty_reply);
        render_turn_prompt(&sections, &future_changes_per_section, reply, &self.config)
    }

    fn process_commands(&mut self, text: &str) -> Result<AutoReply> {
        let mut reply = AutoReply::new();
        let parse_results = parse_text(text, &self.registry);

        let has_syntax_error = parse_results.iter().any(|r| r.has_syntax_error);
        if has_syntax_error {
            for result in &parse_results {
                reply.errors.extend(result.errors.clone());
            }
            return Ok(reply);
        }

        if !self.problem_defined {
            for result in &parse_results {
                if result.command_name != "define_problem" {
                    continue;
                }
                if !result.errors.is_empty() {
                    reply.errors.extend(result.errors.clone());
                    continue;
                }
                let command = self.registry.get(&result.command_name).unwrap();
                let placeholder = self.root.clone().unwrap_or_else(|| hermes_tree::Node::new_root("", ""));
                let mut ctx = CommandContext {
                    current_node: placeholder,
                    fs: &self.fs,
                    kb_store: &self.kb_store,
                    knowledge_base: &mut self.knowledge_base,
                    scheduler: &mut self.scheduler,
                    history: &mut self.history,
                    permanent_log: &mut self.permanent_log,
                    problem_defined: self.problem_defined,
                    reply: &mut reply,
                };
                match command.execute(&mut ctx, &result.args) {
                    Ok(output) => {
                        self.root = Some(ctx.current_node.clone());
                        self.problem_defined = ctx.problem_defined;
                        reply.push_command_output(&result.command_name, result.args.clone(), output);
                    }
                    Err(e) => reply.push_error(e.to_string()),
                }
            }
            return Ok(reply);
        }

        let current = self.current_node().expect("problem defined implies a current node");
        for (index, result) in parse_results.iter().enumerate() {
            if !result.errors.is_empty() {
                reply.errors.extend(result.errors.clone());
                continue;
            }
            let Some(command) = self.registry.get(&result.command_name) else {
                reply.push_error(format!("unknown command: '{}'", result.command_name));
                continue;
            };
            let should_stop = command.schema().should_be_last_in_message;
            let mut ctx = CommandContext {
                current_node: current.clone(),
                fs: &self.fs,
                kb_store: &self.kb_store,
                knowledge_base: &mut self.knowledge_base,
                scheduler: &mut self.scheduler,
                history: &mut self.history,
                permanent_log: &mut self.permanent_log,
                problem_defined: self.problem_defined,
                reply: &mut reply,
            };
            match command.execute(&mut ctx, &result.args) {
                Ok(output) => reply.push_command_output(&result.command_name, result.args.clone(), output),
                Err(e) => reply.push_error(e.to_string()),
            }
            if should_stop {
                let trailing: Vec<&str> = parse_results[index + 1..]
                    .iter()
                    .filter(|later| later.errors.is_empty())
                    .map(|later| later.command_name.as_str())
                    .collect();
                if !trailing.is_empty() {
                    reply.push_error(format!(
                        "'{}' must be the last command in a message; trailing command(s) ignored: {}",
                        result.command_name,
                        trailing.join(", ")
                    ));
                }
                break;
            }
        }

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_llm::MockProvider;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn test_config(name: &str) -> HermesConfig {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        let base = std::env::temp_dir().join(format!("hermes_engine_unit_{name}_{}_{nanos}", std::process::id()));
        HermesConfig {
            root_dir: base.join("research"),
            backup_dir: base.join("research/.backups"),
            budget_total: Some(10),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn budget_remaining_decrements_each_turn() {
        let config = test_config("budget");
        let root_dir = config.root_dir.clone();
        let define = "<<<define_problem\n///title Root\n///content Solve it\n>>>".to_string();
        let think = "<<<think\n///content still working\n>>>".to_string();
        let provider = Arc::new(MockProvider::new(vec![define, think]));
        let mut engine = Engine::new(config, provider).unwrap();

        assert_eq!(engine.budget_remaining(), Some(10));
        engine.run_turn().await.unwrap();
        assert_eq!(engine.budget_remaining(), Some(9));
        engine.run_turn().await.unwrap();
        assert_eq!(engine.budget_remaining(), Some(8));

        std::fs::remove_dir_all(root_dir.parent().unwrap()).ok();
    }
}
