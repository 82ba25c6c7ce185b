use std::collections::BTreeMap;

use hermes_history::CommandArgs;
use regex::Regex;

use crate::registry::CommandRegistry;
use crate::schema::CommandSchema;

/// One parsed (or failed) command block extracted from a message.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub command_name: String,
    pub args: CommandArgs,
    pub errors: Vec<String>,
    pub has_syntax_error: bool,
}

impl ParseResult {
    fn ok(command_name: impl Into<String>, args: CommandArgs) -> Self {
        Self { command_name: command_name.into(), args, errors: Vec::new(), has_syntax_error: false }
    }

    fn failed(command_name: impl Into<String>, errors: Vec<String>) -> Self {
        Self { command_name: command_name.into(), args: CommandArgs::new(), errors, has_syntax_error: false }
    }

    fn syntax_error(message: impl Into<String>) -> Self {
        Self {
            command_name: String::new(),
            args: CommandArgs::new(),
            errors: vec![message.into()],
            has_syntax_error: true,
        }
    }
}

/// Parses every `<<<command ... >>>` block out of `text` against `registry`.
///
/// The block-tag scan runs first and independently of command lookup: a
/// message with duplicate, unclosed, or dangling tags is rejected wholesale
/// (only the syntax errors are returned) before any individual command gets
/// a chance to run, since line numbers inside a malformed block can't be
/// trusted.
pub fn parse_text(text: &str, registry: &CommandRegistry) -> Vec<ParseResult> {
    let (blocks, syntax_errors) = check_block_syntax(text);
    if !syntax_errors.is_empty() {
        return syntax_errors.into_iter().map(ParseResult::syntax_error).collect();
    }

    let lines: Vec<&str> = text.lines().collect();
    let mut results = Vec::new();

    for (open_idx, close_idx) in blocks {
        let opening = lines[open_idx].trim();
        let Some(command_name) = opening.strip_prefix("<<<").map(|s| s.trim().to_string()) else {
            continue;
        };
        let command_name: String = command_name.split_whitespace().next().unwrap_or("").to_string();
        let block_content = lines[open_idx + 1..close_idx].join("\n");

        match registry.get(&command_name) {
            Some(command) => {
                let (mut args, mut errors) =
                    parse_command_sections(&block_content, command.schema(), &command_name);
                command.transform_args(&mut args);
                errors.extend(command.validate(&args));
                results.push(ParseResult { command_name, args, errors, has_syntax_error: false });
            }
            None => {
                results.push(ParseResult::failed(command_name.clone(), vec![format!("Unknown command: '{command_name}'")]));
            }
        }
    }

    results
}

/// Scans for `<<<`/`>>>` tag pairs and reports the four distinct syntax
/// error conditions the original command language distinguishes: a new
/// opening tag before the previous one closed, a closing tag after another
/// one already matched the current opening tag, a closing tag with no
/// opening tag preceding it, and an opening tag left unclosed at the end of
/// the message.
fn check_block_syntax(text: &str) -> (Vec<(usize, usize)>, Vec<String>) {
    let lines: Vec<&str> = text.lines().collect();
    let mut errors = Vec::new();
    let mut blocks = Vec::new();

    let mut latest_opening: i64 = -1;
    let mut latest_closing: i64 = -1;

    for (index, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line.starts_with("<<<") {
            if latest_opening > latest_closing {
                errors.push(format!(
                    "Duplicate opening tags. Other opening tags coming after it. This tag did not trigger a command. (line {})",
                    latest_opening + 1
                ));
            }
            latest_opening = index as i64;
        } else if line.starts_with(">>>") {
            if latest_closing > latest_opening {
                errors.push(format!(
                    "Duplicate closing tags. Other opening tags coming before it. This tag did not trigger a command. (line {})",
                    index + 1
                ));
            } else if latest_opening == -1 {
                errors.push(format!(
                    "This command tag does not have corresponding opening tag coming before it. This tag did not trigger a command. (line {})",
                    index + 1
                ));
            } else {
                latest_closing = index as i64;
                blocks.push((latest_opening as usize, latest_closing as usize));
            }
        }
    }

    if latest_opening > latest_closing {
        errors.push(format!(
            "This command tag was never closed in the message. This tag did not trigger a command. (line {})",
            latest_opening + 1
        ));
    }

    (blocks, errors)
}

fn section_regex() -> Regex {
    Regex::new(r"(?s)///(\w+)\s+(.*?)(?:///|\z)").unwrap()
}

fn parse_command_sections(
    content: &str,
    schema: &CommandSchema,
    command_name: &str,
) -> (CommandArgs, Vec<String>) {
    let mut found: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for capture in section_regex().captures_iter(content) {
        let name = capture[1].to_string();
        let value = capture[2].trim().to_string();
        let allow_multiple = schema.sections.iter().any(|s| s.name == name && s.allow_multiple);
        let values = found.entry(name).or_default();
        if allow_multiple {
            values.push(value);
        } else {
            // Non-repeating sections keep only the last occurrence's value.
            *values = vec![value];
        }
    }

    let mut errors = Vec::new();
    for section in schema.required_sections() {
        match found.get(section) {
            None => errors.push(format!("Missing '///{section}' section in {command_name} command")),
            Some(v) if v.iter().all(|value| value.is_empty()) => {
                errors.push(format!("{section} cannot be empty"))
            }
            _ => {}
        }
    }

    let mut args = CommandArgs::new();
    for (name, values) in found {
        let non_empty: Vec<String> = values.into_iter().filter(|v| !v.is_empty()).collect();
        if !non_empty.is_empty() {
            args.insert(name, non_empty);
        }
    }
    (args, errors)
}

pub fn schema_help(schema: &CommandSchema) -> String {
    let mut out = format!("<<<{}\n", schema.name);
    for section in &schema.sections {
        let marker = if section.required { "required" } else { "optional" };
        out.push_str(&format!("///{} ({marker}): {}\n", section.name, section.help));
    }
    out.push_str(">>>");
    out
}
