use super::{CommentTree, FlatComment};

/// Pre-order walk over every tree in order: a comment, then each of its
/// child subtrees left to right. Roots have depth 0.
pub fn flatten(trees: &[CommentTree]) -> Vec<FlatComment> {
    let mut result = Vec::with_capacity(trees.iter().map(CommentTree::count).sum());

    for tree in trees {
        let mut stack = vec![(tree, 0)];
        while let Some((node, depth)) = stack.pop() {
            result.push(FlatComment {
                comment: node.comment.clone(),
                depth,
            });
            // reversed so the first child is popped first
            stack.extend(node.children.iter().rev().map(|c| (c, depth + 1)));
        }
    }

    result
}
