pub mod data;
pub mod hierarchy;
pub mod renderers;

pub use data::{
    ArtifactSnapshot, KnowledgeEntrySnapshot, PathNodeSnapshot, SectionData, SubproblemSnapshot,
    SECTION_COUNT,
};
pub use hierarchy::render_hierarchy;
pub use renderers::render;

/// Compares `new` against `old` index by index and returns every index whose
/// data differs by value, paired with the new data. `new` is expected to
/// always have the fixed `SECTION_COUNT` length; a shorter `old` (e.g. first
/// turn, nothing recorded yet) treats every corresponding index as changed.
pub fn diff(old: &[SectionData], new: &[SectionData]) -> Vec<(usize, SectionData)> {
    new.iter()
        .enumerate()
        .filter(|(i, data)| old.get(*i) != Some(*data))
        .map(|(i, data)| (i, data.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_snapshots_produce_no_diff() {
        let snapshot = vec![
            SectionData::Header,
            SectionData::PermanentLogs { lines: vec!["a".into()] },
            SectionData::Goal,
        ];
        let changes = diff(&snapshot, &snapshot);
        assert!(changes.is_empty());
    }

    #[test]
    fn changed_index_is_reported_with_new_data() {
        let old = vec![SectionData::PermanentLogs { lines: vec!["a".into()] }];
        let new = vec![SectionData::PermanentLogs { lines: vec!["a".into(), "b".into()] }];
        let changes = diff(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].0, 0);
        assert_eq!(changes[0].1, new[0].clone());
    }

    #[test]
    fn missing_old_entry_counts_as_changed() {
        let old: Vec<SectionData> = vec![];
        let new = vec![SectionData::Goal];
        let changes = diff(&old, &new);
        assert_eq!(changes.len(), 1);
    }
}
