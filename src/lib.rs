//! Ordered key-value maps implemented with binary search trees.
//!
//! [`AvlMap`] keeps its tree balanced with the AVL discipline: every
//! mutation leaves each node's balance factor in [-1, 1], so lookups,
//! insertions and removals run in O(log n). [`BstMap`] is the unbalanced
//! baseline with the same surface, useful as a reference point and for
//! workloads where input order is known to be benign.
//!
//! Both maps render the same two textual forms: a pre-order serialization
//! via [`Display`](std::fmt::Display) and an indented tree dump via
//! `print_to`.
//!
//! ```
//! use ordmap::AvlMap;
//!
//! let mut map = AvlMap::new();
//! map.insert(10, 100);
//! map.insert(20, 200);
//! map.insert(30, 300);
//! assert_eq!(map.to_string(), "([20,200],([10,100],,),([30,300],,))");
//! ```

mod avl;
mod bst;

pub use avl::{AvlMap, Iter};
pub use bst::BstMap;
