/// Describes one `///section` inside a command block. `allow_multiple`
/// sections may appear more than once in a block; every occurrence is
/// collected in source order instead of only the last one being kept.
#[derive(Debug, Clone)]
pub struct SectionSchema {
    pub name: &'static str,
    pub required: bool,
    pub help: &'static str,
    pub allow_multiple: bool,
}

impl SectionSchema {
    pub const fn new(name: &'static str, required: bool, help: &'static str) -> Self {
        Self { name, required, help, allow_multiple: false }
    }

    pub const fn new_multi(name: &'static str, required: bool, help: &'static str) -> Self {
        Self { name, required, help, allow_multiple: true }
    }
}

/// Static metadata for one command: its name, the sections it accepts, and
/// whether a message containing it must not be followed by any other
/// command (used by commands that change focus, since anything queued
/// after a focus change would run against the wrong node).
#[derive(Debug, Clone)]
pub struct CommandSchema {
    pub name: &'static str,
    pub help: &'static str,
    pub sections: Vec<SectionSchema>,
    pub should_be_last_in_message: bool,
}

impl CommandSchema {
    pub fn required_sections(&self) -> Vec<&'static str> {
        self.sections.iter().filter(|s| s.required).map(|s| s.name).collect()
    }
}
