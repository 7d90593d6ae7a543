use crate::domain::TreeNode;

/// Depth-first listing of every path in a hierarchy.
///
/// Files are emitted at their own path and directories are expanded into
/// their children. An empty directory is emitted at its own path so it is
/// not lost.
pub fn flatten(nodes: &[TreeNode]) -> Vec<String> {
    let mut paths = Vec::new();
    collect(nodes, &mut paths);
    paths
}

fn collect(nodes: &[TreeNode], out: &mut Vec<String>) {
    for node in nodes {
        match &node.children {
            Some(children) if !children.is_empty() => collect(children, out),
            _ => out.push(node.path.clone()),
        }
    }
}
