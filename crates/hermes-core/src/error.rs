use std::io;

pub type Result<T> = std::result::Result<T, Error>;

/// Single crate-wide error type. Variants map 1:1 onto the taxonomy in the
/// error handling design: blocking syntax errors, non-blocking per-command
/// errors, and the handful of conditions that can abort a turn outright.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("unknown command: '{0}'")]
    UnknownCommand(String),

    #[error("missing '///{section}' section in {command} command")]
    MissingSection { command: String, section: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("semantic precondition failed: {0}")]
    SemanticPrecondition(String),

    #[error("scheduler violation: {0}")]
    SchedulerViolation(String),

    #[error("filesystem error: {0}")]
    Filesystem(#[from] io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("llm error: {0}")]
    Llm(String),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub fn unknown_command(name: impl Into<String>) -> Self {
        Error::UnknownCommand(name.into())
    }

    pub fn missing_section(command: impl Into<String>, section: impl Into<String>) -> Self {
        Error::MissingSection { command: command.into(), section: section.into() }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    pub fn semantic_precondition(message: impl Into<String>) -> Self {
        Error::SemanticPrecondition(message.into())
    }

    pub fn scheduler_violation(message: impl Into<String>) -> Self {
        Error::SchedulerViolation(message.into())
    }

    pub fn llm(message: impl Into<String>) -> Self {
        Error::Llm(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}
