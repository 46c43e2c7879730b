//! Regression trees stored as flat node arenas.
//!
//! Leaves of the boosted ensemble hold additive margins.

use std::ops::Index;

use serde::{Deserialize, Serialize};

/// A tree node. Children are indices into [`Tree::nodes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        /// Samples with `x[feature] <= threshold` go left.
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted tree; the root is node 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Follows the splits for one row and returns the leaf value.
    #[must_use]
    pub fn predict_row<R>(&self, row: &R) -> f64
    where
        R: Index<usize, Output = f64> + ?Sized,
    {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                None => return 0.0,
            }
        }
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of edges on the longest root-to-leaf path.
    #[must_use]
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(Node::Split { left, right, .. }) => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> Tree {
        Tree::from_nodes(vec![
            Node::Split {
                feature: 1,
                threshold: 2.5,
                left: 1,
                right: 2,
            },
            Node::Leaf { value: -0.4 },
            Node::Leaf { value: 0.7 },
        ])
    }

    #[test]
    fn test_threshold_goes_left() {
        let tree = stump();
        assert_eq!(tree.predict_row(&[0.0, 2.5]), -0.4);
        assert_eq!(tree.predict_row(&[0.0, 2.6]), 0.7);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_empty_tree_predicts_zero() {
        let tree = Tree::default();
        assert_eq!(tree.predict_row(&[1.0]), 0.0);
        assert_eq!(tree.depth(), 0);
    }
}
