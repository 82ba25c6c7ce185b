use hermes_tree::NodeHandle;

/// Pre-renders the whole tree rooted at `root` into a short XML-like string,
/// marking the node whose title matches `target_title` so the LLM can
/// reliably locate "the current node" inside a large tree.
pub fn render_hierarchy(root: &NodeHandle, target_title: &str) -> String {
    let mut out = String::new();
    render_node(root, target_title, 0, &mut out);
    out
}

fn render_node(node: &NodeHandle, target_title: &str, depth: u32, out: &mut String) {
    let n = node.read().unwrap();
    let indent = "  ".repeat(depth as usize);
    let current_attr = if n.title == target_title { " current=\"true\"" } else { "" };
    if n.subproblems.is_empty() {
        out.push_str(&format!(
            "{indent}<node title=\"{}\" status=\"{}\" depth=\"{depth}\"{current_attr} />\n",
            n.title,
            n.status.label()
        ));
    } else {
        out.push_str(&format!(
            "{indent}<node title=\"{}\" status=\"{}\" depth=\"{depth}\"{current_attr}>\n",
            n.title,
            n.status.label()
        ));
        for child in n.subproblems.values() {
            render_node(child, target_title, depth + 1, out);
        }
        out.push_str(&format!("{indent}</node>\n"));
    }
}
