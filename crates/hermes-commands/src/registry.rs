use std::collections::HashMap;
use std::sync::Arc;

use hermes_core::Result;
use hermes_history::CommandArgs;

use crate::context::CommandContext;
use crate::schema::CommandSchema;

/// Implement this to add a command to the language. Each command is a
/// self-contained unit; to add one, write a type in `builtins.rs` and
/// register it in `builtin_registry()`.
pub trait Command: Send + Sync {
    fn schema(&self) -> &CommandSchema;

    fn name(&self) -> &str {
        self.schema().name
    }

    /// Adjusts parsed args before validation/execution (e.g. converting a
    /// 1-based `criteria_number` section into a 0-based `index`). Default
    /// is a no-op.
    fn transform_args(&self, _args: &mut CommandArgs) {}

    /// Extra validation beyond "required section present and non-empty",
    /// which the parser already checks. Default has nothing to add.
    fn validate(&self, _args: &CommandArgs) -> Vec<String> {
        Vec::new()
    }

    /// Runs the command against `ctx`, returning the text to surface in the
    /// auto-reply's command output.
    fn execute(&self, ctx: &mut CommandContext, args: &CommandArgs) -> Result<String>;
}

pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self { commands: HashMap::new() }
    }

    pub fn register(&mut self, command: impl Command + 'static) {
        let name = command.name().to_string();
        self.commands.insert(name, Arc::new(command));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.keys().map(|s| s.as_str()).collect()
    }

    pub fn schemas(&self) -> Vec<CommandSchema> {
        self.commands.values().map(|c| c.schema().clone()).collect()
    }
}

/// The fifteen built-in commands, matching the command language's full
/// surface.
pub fn builtin_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    crate::builtins::register_all(&mut registry);
    registry
}
