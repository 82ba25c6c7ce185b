use std::path::PathBuf;

use serde::Deserialize;

/// Enumerated engine configuration knobs. Not a free-form dict: every field
/// named here is the complete set of knobs the core engine understands.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HermesConfig {
    pub root_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub max_depth_hint: u32,
    pub per_command_output_max_length: Option<usize>,
    pub budget_total: Option<u32>,
}

impl Default for HermesConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./research"),
            backup_dir: PathBuf::from("./research/.backups"),
            max_depth_hint: 3,
            per_command_output_max_length: None,
            budget_total: None,
        }
    }
}

impl HermesConfig {
    /// Load from a TOML file at `path`. Missing file or parse failure falls
    /// back to defaults rather than aborting — config loading is an outer
    /// concern, not a core-engine precondition.
    pub fn load(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }
}
