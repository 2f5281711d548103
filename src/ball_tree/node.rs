//! Holds the node ("ball") type of the tree and the routing rule shared by construction and lookup.

use crate::common_types::Key;

/// A ball: one indexed point (the pivot) plus the bounding sphere of everything below it.
#[derive(Debug, Clone)]
pub struct Ball<V> {
    pub(crate) pivot: Key,
    pub(crate) value: V,
    /// Largest squared distance from the pivot to any other point of this subtree. 0 for a leaf.
    pub(crate) squared_radius: f64,
    /// `None` exactly when the ball is a leaf.
    pub(crate) split_dimension: Option<usize>,
    /// The left child of this node.
    pub(crate) left: Option<Box<Ball<V>>>,
    /// The right child of this node.
    pub(crate) right: Option<Box<Ball<V>>>,
}

impl<V> Ball<V> {
    pub(crate) fn leaf(pivot: Key, value: V) -> Self {
        Ball {
            pivot,
            value,
            squared_radius: 0.0,
            split_dimension: None,
            left: None,
            right: None,
        }
    }

    pub fn pivot(&self) -> &Key {
        &self.pivot
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn squared_radius(&self) -> f64 {
        self.squared_radius
    }

    pub fn radius(&self) -> f64 {
        self.squared_radius.sqrt()
    }

    pub fn split_dimension(&self) -> Option<usize> {
        self.split_dimension
    }

    pub fn left(&self) -> Option<&Ball<V>> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&Ball<V>> {
        self.right.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// The child a key with these coordinates would live under, if that child exists.
    pub(crate) fn child_towards(&self, coordinates: &[f64]) -> Option<&Ball<V>> {
        let dimension = self.split_dimension?;
        if routes_left(coordinates, self.pivot.coordinates(), dimension) {
            self.left()
        } else {
            self.right()
        }
    }

    pub(crate) fn children(&self) -> impl Iterator<Item = &Ball<V>> {
        self.left().into_iter().chain(self.right())
    }
}

/// Points strictly below the pivot on the split dimension go left, everything else goes right.
pub(crate) fn routes_left(coordinates: &[f64], pivot: &[f64], dimension: usize) -> bool {
    coordinates[dimension] < pivot[dimension]
}

/// Pre-order walk over the balls of a tree.
pub struct Iter<'a, V> {
    stack: Vec<&'a Ball<V>>,
}

impl<'a, V> Iter<'a, V> {
    pub(crate) fn new(root: &'a Ball<V>) -> Self {
        Iter { stack: vec![root] }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a Ball<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let ball = self.stack.pop()?;
        if let Some(right) = ball.right() {
            self.stack.push(right);
        }
        if let Some(left) = ball.left() {
            self.stack.push(left);
        }
        Some(ball)
    }
}
