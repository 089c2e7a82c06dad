use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::error::{Error, Result};

use super::{Comment, CommentTree};

/// Assembles one root row and its descendant rows into a nested tree.
///
/// Descendants are indexed in path order, which guarantees that a parent is
/// seen before any of its descendants. Siblings end up ordered by creation
/// time; siblings created at the same instant keep their path order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeBuilder {
    skip_orphans: bool,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop rows whose parent is missing from the set (and everything below
    /// them) instead of failing. Dropped ids are logged.
    pub fn skip_orphans(mut self, skip: bool) -> Self {
        self.skip_orphans = skip;
        self
    }

    pub fn build(&self, root: Comment, mut descendants: Vec<Comment>) -> Result<CommentTree> {
        // Byte order, whatever collation the store sorted with
        descendants.sort_by(|a, b| a.path.cmp(&b.path));

        if root.parent_id.is_some() {
            return Err(Error::Inconsistency(format!(
                "root comment {} has a parent",
                root.id
            )));
        }
        check_path_matches_row(&root)?;

        let mut seen = HashSet::with_capacity(descendants.len() + 1);
        seen.insert(root.id);

        let mut skipped: HashSet<Uuid> = HashSet::new();
        let mut indexed: Vec<Comment> = Vec::with_capacity(descendants.len());

        for comment in descendants {
            if seen.contains(&comment.id) || skipped.contains(&comment.id) {
                return Err(Error::Inconsistency(format!(
                    "comment {} appears more than once under root {}",
                    comment.id, root.id
                )));
            }

            if !comment.path.is_descendant_of(&root.path) {
                return Err(Error::Inconsistency(format!(
                    "comment {} with path `{}` is not under root path `{}`",
                    comment.id, comment.path, root.path
                )));
            }

            check_path_matches_row(&comment)?;

            let Some(parent_id) = comment.parent_id else {
                return Err(Error::Inconsistency(format!(
                    "descendant comment {} has no parent",
                    comment.id
                )));
            };

            if !seen.contains(&parent_id) {
                if self.skip_orphans {
                    skipped.insert(comment.id);
                    continue;
                }
                return Err(Error::Inconsistency(format!(
                    "parent {parent_id} of comment {} is missing",
                    comment.id
                )));
            }

            seen.insert(comment.id);
            indexed.push(comment);
        }

        if !skipped.is_empty() {
            tracing::warn!(
                root = %root.id,
                skipped = ?skipped,
                "Dropped orphaned comments while building tree"
            );
        }

        // Walking backwards means every node's children are complete by the
        // time the node itself is reached.
        let mut children_of: HashMap<Uuid, Vec<CommentTree>> = HashMap::new();
        for comment in indexed.into_iter().rev() {
            let children = sorted_children(children_of.remove(&comment.id));
            let Some(parent_id) = comment.parent_id else {
                continue;
            };
            children_of
                .entry(parent_id)
                .or_default()
                .push(CommentTree { comment, children });
        }

        let children = sorted_children(children_of.remove(&root.id));
        Ok(CommentTree {
            comment: root,
            children,
        })
    }
}

/// Children arrive in reverse path order.
fn sorted_children(children: Option<Vec<CommentTree>>) -> Vec<CommentTree> {
    let mut children = children.unwrap_or_default();
    children.reverse();
    children.sort_by_key(|c| c.comment.created_at);
    children
}

fn check_path_matches_row(comment: &Comment) -> Result<()> {
    let id = comment.id.to_string();
    let parent = comment.parent_id.map(|p| p.to_string());

    if comment.path.last_segment() != id || comment.path.parent_segment() != parent.as_deref() {
        return Err(Error::Inconsistency(format!(
            "path `{}` of comment {} does not match its parent {:?}",
            comment.path, comment.id, comment.parent_id
        )));
    }

    Ok(())
}

/// Builds a tree, failing on any orphan.
pub fn build_tree(root: Comment, descendants: Vec<Comment>) -> Result<CommentTree> {
    TreeBuilder::new().build(root, descendants)
}

#[cfg(test)]
pub(crate) mod test {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::comment::{path::MaterializedPath, Category};

    pub fn timestamp(minutes: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::try_minutes(minutes).unwrap()
    }

    // Helper function to create a mock comment under an optional parent
    pub fn create_mock_comment(parent: Option<&Comment>, minutes: i64) -> Comment {
        let id = Uuid::new_v4();
        Comment {
            id,
            body: format!("Content for comment {id}"),
            category: Category::Manga,
            target_id: parent.map_or_else(Uuid::new_v4, |p| p.target_id),
            post_id: None,
            user_id: Uuid::new_v4(),
            path: MaterializedPath::encode(parent.map(|p| &p.path), id).unwrap(),
            parent_id: parent.map(|p| p.id),
            created_at: timestamp(minutes),
        }
    }

    fn ids(trees: &[CommentTree]) -> Vec<Uuid> {
        trees.iter().map(|t| t.comment.id).collect()
    }

    #[test]
    fn test_build_tree_with_no_descendants() {
        let root = create_mock_comment(None, 0);
        let tree = build_tree(root.clone(), vec![]).unwrap();
        assert_eq!(tree.comment, root);
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_build_tree_nests_chain() {
        let a = create_mock_comment(None, 0);
        let b = create_mock_comment(Some(&a), 1);
        let c = create_mock_comment(Some(&b), 2);
        let d = create_mock_comment(Some(&c), 3);

        let tree = build_tree(a.clone(), vec![d.clone(), b.clone(), c.clone()]).unwrap();

        assert_eq!(tree.count(), 4);
        let b_tree = &tree.children[0];
        assert_eq!(b_tree.comment.id, b.id);
        let c_tree = &b_tree.children[0];
        assert_eq!(c_tree.comment.id, c.id);
        assert_eq!(c_tree.children[0].comment.id, d.id);
        assert!(c_tree.children[0].children.is_empty());
    }

    #[test]
    fn test_siblings_are_ordered_by_creation_time_not_path() {
        let root = create_mock_comment(None, 0);
        let mut siblings: Vec<Comment> = (1..=6)
            .map(|m| create_mock_comment(Some(&root), m))
            .collect();
        let expected: Vec<Uuid> = siblings.iter().map(|c| c.id).collect();

        // random ids, so path order is unrelated to creation order
        siblings.sort_by(|a, b| a.path.cmp(&b.path));
        let tree = build_tree(root, siblings).unwrap();

        assert_eq!(ids(&tree.children), expected);
    }

    #[test]
    fn test_equal_timestamps_keep_path_order() {
        let root = create_mock_comment(None, 0);
        let mut siblings: Vec<Comment> = (0..4)
            .map(|_| create_mock_comment(Some(&root), 5))
            .collect();
        siblings.sort_by(|a, b| a.path.cmp(&b.path));
        let expected: Vec<Uuid> = siblings.iter().map(|c| c.id).collect();

        let mut shuffled = siblings.clone();
        shuffled.reverse();
        let tree = build_tree(root, shuffled).unwrap();

        assert_eq!(ids(&tree.children), expected);
    }

    #[test]
    fn test_missing_parent_is_inconsistent() {
        let root = create_mock_comment(None, 0);
        let gone = create_mock_comment(Some(&root), 1);
        let orphan = create_mock_comment(Some(&gone), 2);

        let result = build_tree(root, vec![orphan]);
        assert!(matches!(result, Err(Error::Inconsistency(_))));
    }

    #[test]
    fn test_skip_orphans_drops_whole_orphaned_subtree() {
        let root = create_mock_comment(None, 0);
        let kept = create_mock_comment(Some(&root), 1);
        let gone = create_mock_comment(Some(&root), 2);
        let orphan = create_mock_comment(Some(&gone), 3);
        let orphan_child = create_mock_comment(Some(&orphan), 4);

        let tree = TreeBuilder::new()
            .skip_orphans(true)
            .build(root, vec![kept.clone(), orphan, orphan_child])
            .unwrap();

        assert_eq!(tree.count(), 2);
        assert_eq!(ids(&tree.children), vec![kept.id]);
    }

    #[test]
    fn test_repeated_id_is_inconsistent() {
        let root = create_mock_comment(None, 0);
        let child = create_mock_comment(Some(&root), 1);

        let result = build_tree(root, vec![child.clone(), child]);
        assert!(matches!(result, Err(Error::Inconsistency(_))));

        let root = create_mock_comment(None, 0);
        let mut looped = create_mock_comment(Some(&root), 1);
        looped.id = root.id;
        looped.path = root.path.child(root.id).unwrap();
        let result = build_tree(root, vec![looped]);
        assert!(matches!(result, Err(Error::Inconsistency(_))));
    }

    #[test]
    fn test_repeated_orphan_is_inconsistent_when_skipping() {
        let root = create_mock_comment(None, 0);
        let gone = create_mock_comment(Some(&root), 1);
        let orphan = create_mock_comment(Some(&gone), 2);

        let result = TreeBuilder::new()
            .skip_orphans(true)
            .build(root, vec![orphan.clone(), orphan]);
        assert!(matches!(result, Err(Error::Inconsistency(_))));
    }

    #[test]
    fn test_root_must_be_a_root_row() {
        let root = create_mock_comment(None, 0);
        let child = create_mock_comment(Some(&root), 1);
        let result = build_tree(child, vec![]);
        assert!(matches!(result, Err(Error::Inconsistency(_))));

        let mut detached = create_mock_comment(None, 0);
        detached.path = MaterializedPath::root(Uuid::new_v4()).unwrap();
        let result = build_tree(detached, vec![]);
        assert!(matches!(result, Err(Error::Inconsistency(_))));

        let mut nested = create_mock_comment(None, 0);
        nested.path = root.path.child(nested.id).unwrap();
        let result = build_tree(nested, vec![]);
        assert!(matches!(result, Err(Error::Inconsistency(_))));
    }

    #[test]
    fn test_row_outside_root_is_inconsistent() {
        let root = create_mock_comment(None, 0);
        let other_root = create_mock_comment(None, 0);
        let stranger = create_mock_comment(Some(&other_root), 1);

        let result = build_tree(root, vec![stranger]);
        assert!(matches!(result, Err(Error::Inconsistency(_))));
    }

    #[test]
    fn test_parent_id_disagreeing_with_path_is_inconsistent() {
        let root = create_mock_comment(None, 0);
        let a = create_mock_comment(Some(&root), 1);
        let mut b = create_mock_comment(Some(&a), 2);
        b.parent_id = Some(root.id);

        let result = build_tree(root, vec![a, b]);
        assert!(matches!(result, Err(Error::Inconsistency(_))));
    }
}
