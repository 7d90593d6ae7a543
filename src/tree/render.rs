use std::fmt::Write;

use crate::domain::TreeNode;

/// Indented text view of a hierarchy, one node per line.
pub fn render(nodes: &[TreeNode]) -> String {
    let mut out = String::new();
    render_level(nodes, "", &mut out);
    out
}

fn render_level(nodes: &[TreeNode], prefix: &str, out: &mut String) {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let branch = if last { "└── " } else { "├── " };

        let _ = match (node.is_dir(), node.size) {
            (true, _) => writeln!(out, "{}{}{}/", prefix, branch, node.name),
            (false, Some(size)) => writeln!(out, "{}{}{} ({} B)", prefix, branch, node.name, size),
            (false, None) => writeln!(out, "{}{}{}", prefix, branch, node.name),
        };

        if node.is_dir() {
            let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
            render_level(node.children(), &child_prefix, out);
        }
    }
}
