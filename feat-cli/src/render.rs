//! ASCII tree rendering for feature hierarchies.

use feat_core::{FeatureState, TreeNode};

const PLANNED: char = '○';
const IN_PROGRESS: char = '◐';
const RELEASED: char = '●';
const CLOSED: char = '✗';

/// Get the status symbol for a feature state.
pub fn state_symbol(state: FeatureState) -> char {
    match state {
        FeatureState::Planned => PLANNED,
        FeatureState::InProgress => IN_PROGRESS,
        FeatureState::Released => RELEASED,
        FeatureState::Closed => CLOSED,
    }
}

/// Render hierarchy trees with status symbols.
///
/// Example output:
/// ```text
/// ◐ Search (search)
/// ├── ● Indexing (indexing)
/// │   └── ○ Stemming (stemming)
/// └── ○ Ranking (ranking) …
/// ```
pub fn render_forest(roots: &[TreeNode]) -> String {
    let mut output = String::new();
    for root in roots {
        render_node(&mut output, root, "", true, true);
    }
    output
}

fn label(node: &TreeNode) -> String {
    let mut text = format!("{} {} ({})", state_symbol(node.state), node.name, node.id);
    if node.cycle {
        text.push_str(" ↺ cycle");
    }
    if node.seen {
        text.push_str(" ↑ shown above");
    }
    if node.truncated {
        text.push_str(" …");
    }
    text
}

fn render_node(output: &mut String, node: &TreeNode, prefix: &str, is_last: bool, is_root: bool) {
    if !is_root {
        output.push_str(prefix);
        output.push_str(if is_last { "└── " } else { "├── " });
    }
    output.push_str(&label(node));
    output.push('\n');

    let child_prefix = if is_root {
        String::new()
    } else {
        format!("{}{}", prefix, if is_last { "    " } else { "│   " })
    };

    for (i, child) in node.children.iter().enumerate() {
        let child_is_last = i == node.children.len() - 1;
        render_node(output, child, &child_prefix, child_is_last, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_node(id: &str, state: FeatureState, children: Vec<TreeNode>) -> TreeNode {
        TreeNode {
            id: id.to_string(),
            name: id.to_uppercase(),
            state,
            category: None,
            rel_type: None,
            children,
            cycle: false,
            seen: false,
            truncated: false,
        }
    }

    #[test]
    fn test_single_root() {
        let tree = vec![make_node("auth", FeatureState::Planned, vec![])];
        assert_eq!(render_forest(&tree), "○ AUTH (auth)\n");
    }

    #[test]
    fn test_nested_children() {
        let tree = vec![make_node(
            "search",
            FeatureState::InProgress,
            vec![
                make_node(
                    "index",
                    FeatureState::Released,
                    vec![make_node("stem", FeatureState::Planned, vec![])],
                ),
                make_node("rank", FeatureState::Closed, vec![]),
            ],
        )];

        let expected = "\
◐ SEARCH (search)
├── ● INDEX (index)
│   └── ○ STEM (stem)
└── ✗ RANK (rank)
";
        assert_eq!(render_forest(&tree), expected);
    }

    #[test]
    fn test_markers() {
        let mut back = make_node("a", FeatureState::Planned, vec![]);
        back.cycle = true;
        let mut deep = make_node("b", FeatureState::Planned, vec![]);
        deep.truncated = true;
        let mut shared = make_node("c", FeatureState::Planned, vec![]);
        shared.seen = true;
        let tree = vec![make_node("top", FeatureState::Planned, vec![back, deep, shared])];

        let output = render_forest(&tree);
        assert!(output.contains("├── ○ A (a) ↺ cycle"));
        assert!(output.contains("├── ○ B (b) …"));
        assert!(output.contains("└── ○ C (c) ↑ shown above"));
    }

    #[test]
    fn test_multiple_roots() {
        let tree = vec![
            make_node("one", FeatureState::Planned, vec![]),
            make_node("two", FeatureState::Released, vec![]),
        ];
        assert_eq!(render_forest(&tree), "○ ONE (one)\n● TWO (two)\n");
    }
}
