//! Nested category tree assembled from a flat arena of nodes.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use forgeshop_core::{DomainError, DomainResult};

use crate::category::{Category, CategoryId};

/// A category with its nested children, ordered by slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTree {
    pub category: Category,
    pub children: Vec<CategoryTree>,
}

impl CategoryTree {
    /// Assemble the tree rooted at `root` from its descendants.
    ///
    /// `descendants` may arrive in any order; nodes not reachable from `root`
    /// are ignored. Self-parented nodes, revisited nodes and trees deeper than
    /// `max_depth` are reported as invariant violations.
    pub fn assemble(
        root: Category,
        descendants: Vec<Category>,
        max_depth: u32,
    ) -> DomainResult<Self> {
        let mut arena: HashMap<CategoryId, Vec<Category>> = HashMap::new();
        for node in descendants {
            let Some(parent_id) = node.parent_id else {
                continue;
            };
            if parent_id == node.id {
                return Err(DomainError::invariant(format!(
                    "category {} references itself as parent",
                    node.id
                )));
            }
            arena.entry(parent_id).or_default().push(node);
        }

        let mut visited = HashSet::new();
        Self::build(root, &mut arena, 0, max_depth, &mut visited)
    }

    fn build(
        category: Category,
        arena: &mut HashMap<CategoryId, Vec<Category>>,
        depth: u32,
        max_depth: u32,
        visited: &mut HashSet<CategoryId>,
    ) -> DomainResult<Self> {
        if depth > max_depth {
            return Err(DomainError::invariant(format!(
                "category tree exceeds maximum depth {max_depth}"
            )));
        }
        if !visited.insert(category.id) {
            return Err(DomainError::invariant(format!(
                "category {} appears twice in the tree",
                category.id
            )));
        }

        let mut kids = arena.remove(&category.id).unwrap_or_default();
        kids.sort_by(|a, b| a.slug.cmp(&b.slug));

        let mut children = Vec::with_capacity(kids.len());
        for kid in kids {
            children.push(Self::build(kid, arena, depth + 1, max_depth, visited)?);
        }

        Ok(Self { category, children })
    }

    /// Every category id in the tree, root first (pre-order).
    pub fn collect_ids(&self) -> Vec<CategoryId> {
        let mut ids = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            ids.push(node.category.id);
            stack.extend(node.children.iter().rev());
        }
        ids
    }

    /// Number of categories in the tree, root included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(CategoryTree::node_count).sum::<usize>()
    }

    /// Number of levels below the root (a leaf root has depth 0).
    pub fn depth(&self) -> u32 {
        self.children
            .iter()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryDraft;
    use chrono::Utc;
    use forgeshop_core::{Translation, Translations};

    fn node(slug: &str, parent: Option<&Category>) -> Category {
        Category::create(
            CategoryId::generate(),
            CategoryDraft {
                slug: slug.to_string(),
                parent_id: parent.map(|p| p.id),
                translations: Translations::new().with("en", Translation::new(slug, "")),
            },
            parent,
            "en",
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn assembles_nested_children_sorted_by_slug() {
        let root = node("root", None);
        let b = node("b", Some(&root));
        let a = node("a", Some(&root));
        let a1 = node("a1", Some(&a));

        let tree = CategoryTree::assemble(root.clone(), vec![a1.clone(), b.clone(), a.clone()], 8).unwrap();
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].category.slug, "a");
        assert_eq!(tree.children[0].children[0].category.id, a1.id);
        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.collect_ids(), vec![root.id, a.id, a1.id, b.id]);
    }

    #[test]
    fn unrelated_nodes_are_ignored() {
        let root = node("root", None);
        let other = node("other", None);
        let stray = node("stray", Some(&other));
        let tree = CategoryTree::assemble(root, vec![stray], 8).unwrap();
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn self_parented_node_is_rejected() {
        let root = node("root", None);
        let mut broken = node("broken", Some(&root));
        broken.parent_id = Some(broken.id);
        let err = CategoryTree::assemble(root, vec![broken], 8).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let root = node("l0", None);
        let l1 = node("l1", Some(&root));
        let l2 = node("l2", Some(&l1));
        assert!(CategoryTree::assemble(root.clone(), vec![l1.clone(), l2.clone()], 2).is_ok());
        assert!(CategoryTree::assemble(root, vec![l1, l2], 1).is_err());
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 200,
                ..ProptestConfig::default()
            })]

            /// Property: every generated node is collected once and its stored
            /// level equals its depth in the assembled tree.
            #[test]
            fn assembled_tree_matches_materialized_levels(parents in prop::collection::vec(any::<prop::sample::Index>(), 0..40)) {
                let root = node("root", None);
                let mut all = vec![root.clone()];
                for (i, pick) in parents.iter().enumerate() {
                    let parent = all[pick.index(all.len())].clone();
                    all.push(node(&format!("n{i}"), Some(&parent)));
                }

                let tree = CategoryTree::assemble(root, all[1..].to_vec(), 64).unwrap();
                prop_assert_eq!(tree.node_count(), all.len());

                let mut stack = vec![(&tree, 0u32)];
                while let Some((t, depth)) = stack.pop() {
                    prop_assert_eq!(t.category.level, depth);
                    prop_assert_eq!(t.category.path.len() as u32, depth);
                    for c in &t.children {
                        stack.push((c, depth + 1));
                    }
                }
            }
        }
    }
}
