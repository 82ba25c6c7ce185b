use hermes_core::{truncate_with_marker, HermesConfig, NodeStatus};
use hermes_history::AutoReply;
use hermes_sections::{
    render_hierarchy, ArtifactSnapshot, PathNodeSnapshot, SectionData, SubproblemSnapshot,
};
use hermes_tree::{parent_chain, NodeHandle};

/// Builds the fixed 10-section snapshot for `node` as it stands right now.
/// `root` is needed separately since the hierarchy renderer walks the whole
/// tree, not just the current node's subtree.
pub fn build_sections(
    root: &NodeHandle,
    node: &NodeHandle,
    permanent_log: &[String],
    config: &HermesConfig,
    budget_remaining: Option<u32>,
    knowledge_base_entries: Vec<hermes_sections::KnowledgeEntrySnapshot>,
) -> Vec<SectionData> {
    let n = node.read().unwrap();

    let external: Vec<ArtifactSnapshot> = n
        .artifacts
        .values()
        .filter(|a| a.is_external)
        .map(|a| ArtifactSnapshot {
            name: a.name.clone(),
            content: a.content.clone(),
            is_external: true,
            is_fully_visible: true,
            owner_title: Some(n.title.clone()),
        })
        .collect();

    let node_owned: Vec<ArtifactSnapshot> = n
        .artifacts
        .values()
        .filter(|a| !a.is_external)
        .map(|a| ArtifactSnapshot {
            name: a.name.clone(),
            content: a.content.clone(),
            is_external: false,
            is_fully_visible: *n.visible_artifacts.get(&a.name).unwrap_or(&false),
            owner_title: Some(n.title.clone()),
        })
        .collect();

    let subproblems: Vec<SubproblemSnapshot> =
        n.subproblems.values().map(SubproblemSnapshot::from_node).collect();

    let chain = parent_chain(node);
    let path: Vec<PathNodeSnapshot> = chain
        .iter()
        .map(|ancestor| {
            let a = ancestor.read().unwrap();
            PathNodeSnapshot {
                title: a.title.clone(),
                definition: a.problem_definition.clone(),
                criteria: a.criteria.clone(),
                criteria_done: a.criteria_done.clone(),
                artifacts_count: a.artifacts.len(),
                depth: a.depth_from_root,
                is_current: a.title == n.title,
                sibling_subproblems: a.subproblems.values().map(SubproblemSnapshot::from_node).collect(),
            }
        })
        .collect();

    let rendered_tree = render_hierarchy(root, &n.title);

    vec![
        SectionData::Header,
        SectionData::PermanentLogs { lines: permanent_log.to_vec() },
        SectionData::Budget { total: config.budget_total, remaining: budget_remaining },
        SectionData::Artifacts { external, node_owned },
        SectionData::ProblemHierarchy { rendered_tree, target_title: n.title.clone() },
        SectionData::Criteria { items: n.criteria.clone(), done: n.criteria_done.clone() },
        SectionData::Subproblems { items: subproblems },
        SectionData::ProblemPathHierarchy { path },
        SectionData::KnowledgeBase { entries: knowledge_base_entries },
        SectionData::Goal,
    ]
}

/// Renders the fixed sections (applying per-command output truncation where
/// configured) plus the current turn's auto-reply into the single prompt
/// string handed to the collaborator for the next turn.
pub fn render_turn_prompt(
    sections: &[SectionData],
    future_changes_per_section: &[usize],
    reply: &AutoReply,
    config: &HermesConfig,
) -> String {
    let mut out = String::new();
    for (data, future_changes) in sections.iter().zip(future_changes_per_section.iter()) {
        out.push_str(&hermes_sections::render(data, *future_changes));
        out.push('\n');
    }

    let has_content = !reply.command_outputs.is_empty()
        || !reply.errors.is_empty()
        || reply.confirmation_request.is_some()
        || !reply.changed_sections.is_empty();
    if has_content {
        out.push_str("<automatic_reply>\n");
        for (command, _args, output) in &reply.command_outputs {
            let rendered = truncate_with_marker(output, config.per_command_output_max_length);
            out.push_str(&format!("[{command}] {rendered}\n"));
        }
        for error in &reply.errors {
            out.push_str(&format!("[error] {error}\n"));
        }
        if let Some(confirmation) = &reply.confirmation_request {
            out.push_str(&format!("[confirmation requested] {confirmation}\n"));
        }
        for (_index, data) in &reply.changed_sections {
            out.push_str(&hermes_sections::render(data, 0));
            out.push('\n');
        }
        out.push_str("</automatic_reply>\n");
    } else {
        out.push_str(
            "<automatic_reply>\nThe status of the research is \"In Progress\". Please continue the research or mark it as done.\n</automatic_reply>\n",
        );
    }

    out
}

pub fn status_line(node: &NodeHandle) -> String {
    let n = node.read().unwrap();
    format!("[{}] {} — {} ({})", n.status.emoji(), n.title, n.criteria_status(), status_label(n.status))
}

fn status_label(status: NodeStatus) -> &'static str {
    status.label()
}
