use hermes_core::{Error, Result};
use hermes_history::CommandArgs;
use hermes_tree::{KnowledgeEntry, Node};

use crate::context::CommandContext;
use crate::registry::{Command, CommandRegistry};
use crate::schema::{CommandSchema, SectionSchema};

fn arg<'a>(args: &'a CommandArgs, name: &str) -> Option<&'a str> {
    args.get(name).and_then(|v| v.first()).map(|s| s.as_str())
}

fn required_arg<'a>(args: &'a CommandArgs, name: &str, command: &str) -> Result<&'a str> {
    arg(args, name).ok_or_else(|| Error::missing_section(command, name))
}

/// Every value collected for an `allow_multiple` section, in source order.
fn arg_multi(args: &CommandArgs, name: &str) -> Vec<String> {
    args.get(name).cloned().unwrap_or_default()
}

pub fn register_all(registry: &mut CommandRegistry) {
    registry.register(DefineProblem);
    registry.register(AddCriteria);
    registry.register(MarkCriteriaAsDone);
    registry.register(AddSubproblem);
    registry.register(AddCriteriaToSubproblem);
    registry.register(AddArtifact);
    registry.register(AppendToProblemDefinition);
    registry.register(ActivateSubproblemsAndWait);
    registry.register(FinishProblem);
    registry.register(FailProblem);
    registry.register(CancelSubproblem);
    registry.register(AddLogEntry);
    registry.register(OpenArtifact);
    registry.register(HalfCloseArtifact);
    registry.register(Think);
    registry.register(AddKnowledge);
}

/// Creates the root problem. Only valid once per research run; the
/// filesystem store itself enforces that by refusing a second `create_root`.
struct DefineProblem;
impl Command for DefineProblem {
    fn schema(&self) -> &CommandSchema {
        static SCHEMA: std::sync::OnceLock<CommandSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| CommandSchema {
            name: "define_problem",
            help: "Define the initial problem to research",
            sections: vec![
                SectionSchema::new("title", true, "Title of the problem"),
                SectionSchema::new("content", true, "Content of the problem definition"),
            ],
            should_be_last_in_message: false,
        })
    }

    fn execute(&self, ctx: &mut CommandContext, args: &CommandArgs) -> Result<String> {
        let title = required_arg(args, "title", "define_problem")?;
        let content = required_arg(args, "content", "define_problem")?;
        let root = ctx.fs.create_root(title, content)?;
        ctx.scheduler.initialize(root.clone());
        ctx.current_node = root;
        ctx.problem_defined = true;
        ctx.persist()?;
        Ok(format!("Defined root problem '{title}'."))
    }
}

struct AddCriteria;
impl Command for AddCriteria {
    fn schema(&self) -> &CommandSchema {
        static SCHEMA: std::sync::OnceLock<CommandSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| CommandSchema {
            name: "add_criteria",
            help: "Add criteria for the current problem",
            sections: vec![SectionSchema::new("criteria", true, "Criteria text")],
            should_be_last_in_message: false,
        })
    }

    fn execute(&self, ctx: &mut CommandContext, args: &CommandArgs) -> Result<String> {
        let text = required_arg(args, "criteria", "add_criteria")?;
        ctx.current_node.write().unwrap().add_criteria(text);
        ctx.persist()?;
        Ok(format!("Added criterion: {text}"))
    }
}

struct MarkCriteriaAsDone;
impl Command for MarkCriteriaAsDone {
    fn schema(&self) -> &CommandSchema {
        static SCHEMA: std::sync::OnceLock<CommandSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| CommandSchema {
            name: "mark_criteria_as_done",
            help: "Mark a criterion as completed",
            sections: vec![SectionSchema::new("criteria_number", true, "1-based number of the criterion")],
            should_be_last_in_message: false,
        })
    }

    fn validate(&self, args: &CommandArgs) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(raw) = arg(args, "criteria_number") {
            match raw.parse::<i64>() {
                Ok(n) if n < 1 => errors.push(format!("Criteria index must be positive, got: {n}")),
                Err(_) => errors.push(format!("Invalid criteria index: '{raw}', must be a number")),
                _ => {}
            }
        }
        errors
    }

    fn execute(&self, ctx: &mut CommandContext, args: &CommandArgs) -> Result<String> {
        let raw = required_arg(args, "criteria_number", "mark_criteria_as_done")?;
        let number: usize = raw
            .parse()
            .map_err(|_| Error::invalid_argument(format!("'{raw}' is not a number")))?;
        let index = number.saturating_sub(1);
        let done = ctx.current_node.write().unwrap().mark_criteria_done(index);
        ctx.persist()?;
        if done {
            Ok(format!("Marked criterion {number} done."))
        } else {
            Ok(format!("Criterion {number} does not exist; nothing changed."))
        }
    }
}

struct AddSubproblem;
impl Command for AddSubproblem {
    fn schema(&self) -> &CommandSchema {
        static SCHEMA: std::sync::OnceLock<CommandSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| CommandSchema {
            name: "add_subproblem",
            help: "Add a subproblem to the current problem",
            sections: vec![
                SectionSchema::new("title", true, "Title of the subproblem"),
                SectionSchema::new("content", true, "Content of the subproblem definition"),
            ],
            should_be_last_in_message: false,
        })
    }

    fn execute(&self, ctx: &mut CommandContext, args: &CommandArgs) -> Result<String> {
        let title = required_arg(args, "title", "add_subproblem")?;
        let content = required_arg(args, "content", "add_subproblem")?;
        Node::add_subproblem(&ctx.current_node, title, content);
        ctx.persist()?;
        Ok(format!("Added subproblem '{title}'."))
    }
}

struct AddCriteriaToSubproblem;
impl Command for AddCriteriaToSubproblem {
    fn schema(&self) -> &CommandSchema {
        static SCHEMA: std::sync::OnceLock<CommandSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| CommandSchema {
            name: "add_criteria_to_subproblem",
            help: "Add criteria to a named subproblem of the current node",
            sections: vec![
                SectionSchema::new("title", true, "Title of the subproblem"),
                SectionSchema::new("criteria", true, "Criteria text"),
            ],
            should_be_last_in_message: false,
        })
    }

    fn execute(&self, ctx: &mut CommandContext, args: &CommandArgs) -> Result<String> {
        let title = required_arg(args, "title", "add_criteria_to_subproblem")?;
        let text = required_arg(args, "criteria", "add_criteria_to_subproblem")?;
        let child = {
            let current = ctx.current_node.read().unwrap();
            current
                .subproblems
                .get(title)
                .cloned()
                .ok_or_else(|| Error::invalid_argument(format!("unknown subproblem title: '{title}'")))?
        };
        child.write().unwrap().add_criteria(text);
        ctx.persist()?;
        Ok(format!("Added criterion to '{title}': {text}"))
    }
}

struct AddArtifact;
impl Command for AddArtifact {
    fn schema(&self) -> &CommandSchema {
        static SCHEMA: std::sync::OnceLock<CommandSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| CommandSchema {
            name: "add_artifact",
            help: "Add an artifact owned by the current node",
            sections: vec![
                SectionSchema::new("name", true, "Name of the artifact"),
                SectionSchema::new("content", true, "Content of the artifact"),
            ],
            should_be_last_in_message: false,
        })
    }

    fn execute(&self, ctx: &mut CommandContext, args: &CommandArgs) -> Result<String> {
        let name = required_arg(args, "name", "add_artifact")?;
        let content = required_arg(args, "content", "add_artifact")?;
        ctx.current_node.write().unwrap().add_artifact(name, content, false);
        ctx.persist()?;
        Ok(format!("Added artifact '{name}'."))
    }
}

struct AppendToProblemDefinition;
impl Command for AppendToProblemDefinition {
    fn schema(&self) -> &CommandSchema {
        static SCHEMA: std::sync::OnceLock<CommandSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| CommandSchema {
            name: "append_to_problem_definition",
            help: "Append content to the current problem definition",
            sections: vec![SectionSchema::new("content", true, "Content to append")],
            should_be_last_in_message: false,
        })
    }

    fn execute(&self, ctx: &mut CommandContext, args: &CommandArgs) -> Result<String> {
        let content = required_arg(args, "content", "append_to_problem_definition")?;
        ctx.current_node.write().unwrap().append_to_problem_definition(content);
        ctx.persist()?;
        Ok("Appended to problem definition.".to_string())
    }
}

/// Queues every named subproblem to run one at a time, then immediately
/// focuses down into the first. Remaining titles wait in the scheduler's
/// per-parent queue and are activated automatically as earlier ones finish
/// or fail — the current node only becomes current again once the queue is
/// drained.
struct ActivateSubproblemsAndWait;
impl Command for ActivateSubproblemsAndWait {
    fn schema(&self) -> &CommandSchema {
        static SCHEMA: std::sync::OnceLock<CommandSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| CommandSchema {
            name: "activate_subproblems_and_wait",
            help: "Activate one or more subproblems sequentially and wait for them to complete",
            sections: vec![SectionSchema::new_multi(
                "title",
                true,
                "Title of the subproblem to activate; repeat for multiple, they run sequentially",
            )],
            should_be_last_in_message: true,
        })
    }

    fn execute(&self, ctx: &mut CommandContext, args: &CommandArgs) -> Result<String> {
        let titles = arg_multi(args, "title");
        if titles.is_empty() {
            return Err(Error::invalid_argument("no subproblem titles given"));
        }
        {
            let current = ctx.current_node.read().unwrap();
            for title in &titles {
                if !current.subproblems.contains_key(title) {
                    return Err(Error::invalid_argument(format!("unknown subproblem title: '{title}'")));
                }
            }
        }
        let parent_title = ctx.current_title();
        let first = titles[0].clone();
        let rest = titles[1..].to_vec();
        ctx.scheduler.enqueue_children(&parent_title, rest);
        ctx.scheduler.focus_down(&first)?;
        ctx.persist()?;
        Ok(format!("Activated subproblems: {}", titles.join(", ")))
    }
}

struct FinishProblem;
impl Command for FinishProblem {
    fn schema(&self) -> &CommandSchema {
        static SCHEMA: std::sync::OnceLock<CommandSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| CommandSchema {
            name: "finish_problem",
            help: "Finish the current problem and focus up to its parent; on the root, finishes the whole run",
            sections: vec![SectionSchema::new("message", false, "Message to hand the parent, if any")],
            should_be_last_in_message: true,
        })
    }

    fn execute(&self, ctx: &mut CommandContext, args: &CommandArgs) -> Result<String> {
        let message = arg(args, "message").map(|s| s.to_string());
        let internal = ctx.scheduler.focus_up(message)?;
        ctx.persist()?;
        if let Some(msg) = internal {
            ctx.reply.push_internal_message(msg.target_title, msg.text);
        }
        Ok("Finished current problem.".to_string())
    }
}

struct FailProblem;
impl Command for FailProblem {
    fn schema(&self) -> &CommandSchema {
        static SCHEMA: std::sync::OnceLock<CommandSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| CommandSchema {
            name: "fail_problem",
            help: "Mark the current problem failed and focus up to its parent",
            sections: vec![SectionSchema::new("message", false, "Message to hand the parent, if any")],
            should_be_last_in_message: true,
        })
    }

    fn execute(&self, ctx: &mut CommandContext, args: &CommandArgs) -> Result<String> {
        let message = arg(args, "message").map(|s| s.to_string());
        let internal = ctx.scheduler.fail_and_focus_up(message)?;
        ctx.persist()?;
        if let Some(msg) = internal {
            ctx.reply.push_internal_message(msg.target_title, msg.text);
        }
        Ok("Marked current problem failed.".to_string())
    }
}

struct CancelSubproblem;
impl Command for CancelSubproblem {
    fn schema(&self) -> &CommandSchema {
        static SCHEMA: std::sync::OnceLock<CommandSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| CommandSchema {
            name: "cancel_subproblem",
            help: "Mark a subproblem cancelled without running it",
            sections: vec![SectionSchema::new("title", true, "Title of the subproblem to cancel")],
            should_be_last_in_message: false,
        })
    }

    fn execute(&self, ctx: &mut CommandContext, args: &CommandArgs) -> Result<String> {
        let title = required_arg(args, "title", "cancel_subproblem")?;
        let child = {
            let current = ctx.current_node.read().unwrap();
            current
                .subproblems
                .get(title)
                .cloned()
                .ok_or_else(|| Error::invalid_argument(format!("subproblem '{title}' not found")))?
        };
        child.write().unwrap().status = hermes_core::NodeStatus::Cancelled;
        ctx.persist()?;
        Ok(format!("Cancelled subproblem '{title}'."))
    }
}

struct AddLogEntry;
impl Command for AddLogEntry {
    fn schema(&self) -> &CommandSchema {
        static SCHEMA: std::sync::OnceLock<CommandSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| CommandSchema {
            name: "add_log_entry",
            help: "Add an entry to the permanent log, visible at every depth",
            sections: vec![SectionSchema::new("content", true, "Content of the log entry")],
            should_be_last_in_message: false,
        })
    }

    fn execute(&self, ctx: &mut CommandContext, args: &CommandArgs) -> Result<String> {
        let content = required_arg(args, "content", "add_log_entry")?;
        ctx.permanent_log.push(content.to_string());
        Ok("Added log entry.".to_string())
    }
}

fn set_artifact_visibility(ctx: &mut CommandContext, name: &str, visible: bool) -> Result<()> {
    let chain = hermes_tree::parent_chain(&ctx.current_node);
    for node in chain.iter().rev() {
        if node.read().unwrap().artifacts.contains_key(name) {
            node.write().unwrap().visible_artifacts.insert(name.to_string(), visible);
            return Ok(());
        }
    }
    if hermes_tree::find_artifact_in_subtree(&ctx.current_node, name).is_some() {
        // Owned by a descendant; record visibility on the current node as a
        // pointer, since the artifact itself may belong several levels down.
        ctx.current_node.write().unwrap().visible_artifacts.insert(name.to_string(), visible);
        return Ok(());
    }
    Err(Error::invalid_argument(format!("artifact '{name}' not found")))
}

struct OpenArtifact;
impl Command for OpenArtifact {
    fn schema(&self) -> &CommandSchema {
        static SCHEMA: std::sync::OnceLock<CommandSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| CommandSchema {
            name: "open_artifact",
            help: "Open an artifact to view its full content",
            sections: vec![
                SectionSchema::new("name", true, "Name of the artifact to open"),
                SectionSchema::new("reason", true, "Reason why the full content is needed"),
            ],
            should_be_last_in_message: false,
        })
    }

    fn execute(&self, ctx: &mut CommandContext, args: &CommandArgs) -> Result<String> {
        let name = required_arg(args, "name", "open_artifact")?;
        required_arg(args, "reason", "open_artifact")?;
        set_artifact_visibility(ctx, name, true)?;
        Ok(format!("Artifact '{name}' is now fully visible."))
    }
}

struct HalfCloseArtifact;
impl Command for HalfCloseArtifact {
    fn schema(&self) -> &CommandSchema {
        static SCHEMA: std::sync::OnceLock<CommandSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| CommandSchema {
            name: "half_close_artifact",
            help: "Half-close an artifact to show only a preview",
            sections: vec![
                SectionSchema::new("name", true, "Name of the artifact to half-close"),
                SectionSchema::new("reason", true, "Reason for half-closing"),
            ],
            should_be_last_in_message: false,
        })
    }

    fn execute(&self, ctx: &mut CommandContext, args: &CommandArgs) -> Result<String> {
        let name = required_arg(args, "name", "half_close_artifact")?;
        required_arg(args, "reason", "half_close_artifact")?;
        set_artifact_visibility(ctx, name, false)?;
        Ok(format!("Artifact '{name}' is now half-closed (showing a preview only)."))
    }
}

/// No state change; gives the model a place to reason out loud without
/// triggering any command output beyond an acknowledgement.
struct Think;
impl Command for Think {
    fn schema(&self) -> &CommandSchema {
        static SCHEMA: std::sync::OnceLock<CommandSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| CommandSchema {
            name: "think",
            help: "Reason out loud; has no effect on state",
            sections: vec![SectionSchema::new("content", true, "Reasoning content")],
            should_be_last_in_message: false,
        })
    }

    fn execute(&self, _ctx: &mut CommandContext, args: &CommandArgs) -> Result<String> {
        required_arg(args, "content", "think")?;
        Ok(String::new())
    }
}

struct AddKnowledge;
impl Command for AddKnowledge {
    fn schema(&self) -> &CommandSchema {
        static SCHEMA: std::sync::OnceLock<CommandSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| CommandSchema {
            name: "add_knowledge",
            help: "Add an entry to the shared knowledge base",
            sections: vec![
                SectionSchema::new("content", true, "Content of the entry"),
                SectionSchema::new("title", false, "Short title for the entry"),
                SectionSchema::new_multi("tag", false, "Tag for categorization; repeat for multiple"),
            ],
            should_be_last_in_message: false,
        })
    }

    fn execute(&self, ctx: &mut CommandContext, args: &CommandArgs) -> Result<String> {
        let content = required_arg(args, "content", "add_knowledge")?;
        let title = arg(args, "title").map(|s| s.to_string());
        let tags = arg_multi(args, "tag");
        let entry = KnowledgeEntry {
            content: content.to_string(),
            author_node_title: ctx.current_title(),
            timestamp: chrono_now(),
            title,
            tags,
        };
        ctx.kb_store.add_entry(ctx.knowledge_base, entry)?;
        Ok("Added knowledge base entry.".to_string())
    }
}

fn chrono_now() -> String {
    chrono::Local::now().to_rfc3339()
}
