use crate::data::SectionData;

/// Renders one section's text for inclusion in the prompt. Every renderer
/// other than the knowledge base's ignores `future_changes`; the knowledge
/// base renderer uses it to decide whether to emit full content or an
/// omission marker.
pub fn render(data: &SectionData, future_changes: usize) -> String {
    match data {
        SectionData::Header => render_header(),
        SectionData::PermanentLogs { lines } => render_permanent_logs(lines),
        SectionData::Budget { total, remaining } => render_budget(*total, *remaining),
        SectionData::Artifacts { external, node_owned } => render_artifacts(external, node_owned),
        SectionData::ProblemHierarchy { rendered_tree, target_title } => {
            render_problem_hierarchy(rendered_tree, target_title)
        }
        SectionData::Criteria { items, done } => render_criteria(items, done),
        SectionData::Subproblems { items } => render_subproblems(items),
        SectionData::ProblemPathHierarchy { path } => render_problem_path_hierarchy(path),
        SectionData::KnowledgeBase { entries } => render_knowledge_base(entries, future_changes),
        SectionData::Goal => render_goal(),
    }
}

fn render_header() -> String {
    "<header>\nYou are driving a hierarchically decomposed research task. \
Use the command language described below to make progress.\n</header>"
        .to_string()
}

fn render_goal() -> String {
    "<goal>\nMake verifiable progress on the current node's criteria, then \
finish or fail it.\n</goal>"
        .to_string()
}

fn render_permanent_logs(lines: &[String]) -> String {
    if lines.is_empty() {
        return "<permanent_logs>\n(none)\n</permanent_logs>".to_string();
    }
    let body = lines.join("\n");
    format!("<permanent_logs>\n{body}\n</permanent_logs>")
}

fn render_budget(total: Option<u32>, remaining: Option<u32>) -> String {
    match (total, remaining) {
        (Some(total), Some(remaining)) => format!("<budget total=\"{total}\" remaining=\"{remaining}\" />"),
        _ => "<budget unlimited=\"true\" />".to_string(),
    }
}

fn render_artifacts(external: &[crate::data::ArtifactSnapshot], node_owned: &[crate::data::ArtifactSnapshot]) -> String {
    let mut out = String::from("<artifacts>\n");
    for a in external {
        out.push_str(&format!(
            "  <artifact name=\"{}\" external=\"true\" visible=\"{}\">\n{}\n  </artifact>\n",
            a.name, a.is_fully_visible, a.content
        ));
    }
    for a in node_owned {
        let owner = a.owner_title.as_deref().unwrap_or("");
        let content = if a.is_fully_visible { a.content.clone() } else { truncated_preview(&a.content) };
        out.push_str(&format!(
            "  <artifact name=\"{}\" owner=\"{owner}\" visible=\"{}\">\n{content}\n  </artifact>\n",
            a.name, a.is_fully_visible
        ));
    }
    out.push_str("</artifacts>");
    out
}

fn truncated_preview(content: &str) -> String {
    hermes_core::truncate_with_marker(content, Some(200))
}

fn render_problem_hierarchy(rendered_tree: &str, target_title: &str) -> String {
    format!("<problem_hierarchy current=\"{target_title}\">\n{rendered_tree}</problem_hierarchy>")
}

fn render_criteria(items: &[String], done: &[bool]) -> String {
    let mut out = String::from("<criteria>\n");
    for (i, (text, is_done)) in items.iter().zip(done.iter()).enumerate() {
        let marker = if *is_done { "[x]" } else { "[ ]" };
        out.push_str(&format!("{}. {marker} {text}\n", i + 1));
    }
    out.push_str("</criteria>");
    out
}

fn render_subproblems(items: &[crate::data::SubproblemSnapshot]) -> String {
    let mut out = String::from("<subproblems>\n");
    for s in items {
        out.push_str(&format!(
            "  <subproblem title=\"{}\" status=\"{} {}\" criteria=\"{}\" artifacts=\"{}\" />\n",
            s.title, s.status_emoji, s.status_label, s.criteria_status, s.artifacts_count
        ));
    }
    out.push_str("</subproblems>");
    out
}

fn render_problem_path_hierarchy(path: &[crate::data::PathNodeSnapshot]) -> String {
    let mut out = String::from("<problem_path>\n");
    for node in path {
        let marker = if node.is_current { " current=\"true\"" } else { "" };
        out.push_str(&format!(
            "  <node title=\"{}\" depth=\"{}\"{marker}>\n",
            node.title, node.depth
        ));
        for sibling in &node.sibling_subproblems {
            out.push_str(&format!(
                "    <sibling title=\"{}\" status=\"{} {}\" />\n",
                sibling.title, sibling.status_emoji, sibling.status_label
            ));
        }
        out.push_str("  </node>\n");
    }
    out.push_str("</problem_path>");
    out
}

const KNOWLEDGE_BASE_OMISSION_MARKER: &str =
    "<knowledge_base>\n[Knowledge Base content omitted as it was updated later in the conversation.]\n</knowledge_base>";

fn render_knowledge_base(entries: &[crate::data::KnowledgeEntrySnapshot], future_changes: usize) -> String {
    if future_changes > 0 {
        return KNOWLEDGE_BASE_OMISSION_MARKER.to_string();
    }
    let mut out = String::from("<knowledge_base>\n");
    for e in entries {
        let title = e.title.clone().unwrap_or_else(|| "(untitled)".to_string());
        out.push_str(&format!(
            "  <entry title=\"{title}\" author=\"{}\" timestamp=\"{}\">\n{}\n  </entry>\n",
            e.author_node_title, e.timestamp, e.content
        ));
    }
    out.push_str("</knowledge_base>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::KnowledgeEntrySnapshot;

    fn entry() -> KnowledgeEntrySnapshot {
        KnowledgeEntrySnapshot {
            content: "finding".into(),
            author_node_title: "root".into(),
            timestamp: "2024-01-01T00:00:00Z".into(),
            title: Some("Finding One".into()),
            tags: vec![],
        }
    }

    #[test]
    fn knowledge_base_renders_full_content_when_no_future_changes() {
        let data = SectionData::KnowledgeBase { entries: vec![entry()] };
        let rendered = render(&data, 0);
        assert!(rendered.contains("finding"));
        assert!(!rendered.contains("[Knowledge Base content omitted"));
    }

    #[test]
    fn knowledge_base_omits_content_when_future_changes_exist() {
        let data = SectionData::KnowledgeBase { entries: vec![entry()] };
        let rendered = render(&data, 1);
        assert!(rendered.contains("[Knowledge Base content omitted"));
        assert!(!rendered.contains("finding"));
    }

    #[test]
    fn other_renderers_ignore_future_changes() {
        let data = SectionData::PermanentLogs { lines: vec!["a log line".into()] };
        let a = render(&data, 0);
        let b = render(&data, 5);
        assert_eq!(a, b);
    }

    #[test]
    fn criteria_renders_checklist_markers() {
        let data = SectionData::Criteria { items: vec!["one".into(), "two".into()], done: vec![true, false] };
        let rendered = render(&data, 0);
        assert!(rendered.contains("1. [x] one"));
        assert!(rendered.contains("2. [ ] two"));
    }
}
