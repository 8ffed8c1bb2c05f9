//! An ordered map implemented with a plain binary search tree.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt::{self, Write};
use std::mem;
use std::ptr::NonNull;

/// Number of spaces per nesting level in the indented tree dump.
const PRINT_INDENT: usize = 4;

/// An ordered map implemented with a plain binary search tree.
///
/// The baseline variant of [`AvlMap`](crate::AvlMap): identical surface,
/// no balance bookkeeping anywhere. Insertion attaches leaves where the
/// descent ends and removal splices without restructuring, so the tree
/// shape is entirely determined by the operation sequence and operations
/// degrade to O(n) on sorted input.
///
/// ```
/// use ordmap::BstMap;
/// let mut map = BstMap::new();
/// map.insert(2, "two");
/// map.insert(1, "one");
/// assert_eq!(map.get(&2), Some(&"two"));
/// ```
pub struct BstMap<K, V> {
    root: Link<K, V>,
    num_nodes: usize,
}

struct Node<K, V> {
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
    parent: Link<K, V>,
}

type NodePtr<K, V> = NonNull<Node<K, V>>;
type Link<K, V> = Option<NodePtr<K, V>>;
type LinkPtr<K, V> = NonNull<Link<K, V>>;

impl<K: Ord, V> BstMap<K, V> {
    /// Creates an empty map.
    /// No memory is allocated until the first item is inserted.
    pub fn new() -> Self {
        Self {
            root: None,
            num_nodes: 0,
        }
    }

    /// Returns a reference to the value corresponding to the key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key)
            .map(|node_ptr| unsafe { &(*node_ptr.as_ptr()).value })
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key)
            .map(|node_ptr| unsafe { &mut (*node_ptr.as_ptr()).value })
    }

    /// Returns true if the map contains a value for the given key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the key is already present only its value is replaced and the
    /// previous value is returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let mut parent: Link<K, V> = None;
        let mut link_ptr: LinkPtr<K, V> = unsafe { LinkPtr::new_unchecked(&mut self.root) };
        unsafe {
            while let Some(mut node_ptr) = *link_ptr.as_ref() {
                match key.cmp(&node_ptr.as_ref().key) {
                    Ordering::Equal => {
                        return Some(mem::replace(&mut node_ptr.as_mut().value, value));
                    }
                    Ordering::Less => {
                        parent = Some(node_ptr);
                        link_ptr = LinkPtr::new_unchecked(&mut node_ptr.as_mut().left);
                    }
                    Ordering::Greater => {
                        parent = Some(node_ptr);
                        link_ptr = LinkPtr::new_unchecked(&mut node_ptr.as_mut().right);
                    }
                }
            }
            *link_ptr.as_mut() = Some(Node::create(parent, key, value));
        }
        self.num_nodes += 1;
        None
    }

    /// Removes a key from the map.
    /// Returns the value at the key if the key was previously in the map.
    ///
    /// A node with two children is replaced by its in-order predecessor,
    /// the rightmost node of its left subtree.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node_ptr = self.find(key)?;
        debug_assert!(self.num_nodes >= 1);
        self.unlink_node(node_ptr);
        let node = unsafe { Box::from_raw(node_ptr.as_ptr()) };
        self.num_nodes -= 1;
        Some(node.value)
    }

    fn find<Q>(&self, key: &Q) -> Link<K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.root;
        while let Some(node_ptr) = current {
            current = unsafe {
                match key.cmp(node_ptr.as_ref().key.borrow()) {
                    Ordering::Equal => break,
                    Ordering::Less => node_ptr.as_ref().left,
                    Ordering::Greater => node_ptr.as_ref().right,
                }
            }
        }
        current
    }

    fn unlink_node(&mut self, node_ptr: NodePtr<K, V>) {
        unsafe {
            if let Some(mut max_child_ptr) = node_ptr.as_ref().left {
                // Find the in-order predecessor, the rightmost node of the
                // left subtree. It has no right child.
                let mut max_child_parent_ptr = node_ptr;
                while let Some(right_ptr) = max_child_ptr.as_ref().right {
                    max_child_parent_ptr = max_child_ptr;
                    max_child_ptr = right_ptr;
                }

                // Unlink the predecessor, relinking its left child upward.
                debug_assert!(max_child_ptr.as_ref().right.is_none());
                if max_child_parent_ptr.as_ref().right == Some(max_child_ptr) {
                    max_child_parent_ptr.as_mut().right = max_child_ptr.as_ref().left;
                } else {
                    max_child_parent_ptr.as_mut().left = max_child_ptr.as_ref().left;
                }
                if let Some(mut left_ptr) = max_child_ptr.as_ref().left {
                    left_ptr.as_mut().parent = max_child_ptr.as_ref().parent;
                }

                // Move the predecessor into the unlinked node's position,
                // transplanting both child links.
                max_child_ptr.as_mut().left = node_ptr.as_ref().left;
                if let Some(mut left_ptr) = node_ptr.as_ref().left {
                    left_ptr.as_mut().parent = Some(max_child_ptr);
                }

                max_child_ptr.as_mut().right = node_ptr.as_ref().right;
                if let Some(mut right_ptr) = node_ptr.as_ref().right {
                    right_ptr.as_mut().parent = Some(max_child_ptr);
                }

                max_child_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(max_child_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(max_child_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(max_child_ptr);
                        }
                    }
                }
            } else {
                // No left subtree. Splice the right child (if any) into the
                // unlinked node's position.
                if let Some(mut right_ptr) = node_ptr.as_ref().right {
                    right_ptr.as_mut().parent = node_ptr.as_ref().parent;
                }
                match node_ptr.as_ref().parent {
                    None => self.root = node_ptr.as_ref().right,
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = node_ptr.as_ref().right;
                        } else {
                            parent_ptr.as_mut().right = node_ptr.as_ref().right;
                        }
                    }
                }
            }
        }
    }

    /// Asserts that the internal tree structure is consistent.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        unsafe {
            if let Some(root_ptr) = self.root {
                assert!(root_ptr.as_ref().parent.is_none());
            }
            let num_nodes = Self::check_subtree(self.root);
            assert_eq!(num_nodes, self.num_nodes);
        }
    }

    #[cfg(any(test, feature = "consistency_check"))]
    unsafe fn check_subtree(link: Link<K, V>) -> usize {
        match link {
            None => 0,
            Some(node_ptr) => {
                let node = node_ptr.as_ref();
                if let Some(left_ptr) = node.left {
                    assert!(left_ptr.as_ref().parent == Some(node_ptr));
                    assert!(left_ptr.as_ref().key < node.key);
                }
                if let Some(right_ptr) = node.right {
                    assert!(right_ptr.as_ref().parent == Some(node_ptr));
                    assert!(right_ptr.as_ref().key > node.key);
                }
                1 + Self::check_subtree(node.left) + Self::check_subtree(node.right)
            }
        }
    }
}

impl<K, V> BstMap<K, V> {
    /// Returns true if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.num_nodes
    }

    /// Clears the map, deallocating all memory.
    pub fn clear(&mut self) {
        // Chop off leaves bottom up, without recursing.
        let mut current = self.root;
        while let Some(node_ptr) = current {
            let node = unsafe { node_ptr.as_ref() };
            if node.left.is_some() {
                current = node.left;
            } else if node.right.is_some() {
                current = node.right;
            } else {
                let parent = node.parent;
                if let Some(mut parent_ptr) = parent {
                    unsafe {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = None;
                        } else {
                            parent_ptr.as_mut().right = None;
                        }
                    }
                }
                unsafe { Node::destroy(node_ptr) };
                current = parent;
            }
        }
        self.root = None;
        self.num_nodes = 0;
    }

    /// Writes an indented dump of the tree, one line per node in pre-order,
    /// nested four spaces per level. Lines of non-root nodes are prefixed
    /// with `L: ` or `R: ` denoting the child slot they occupy.
    pub fn print_to(&self, out: &mut dyn fmt::Write) -> fmt::Result
    where
        K: fmt::Display,
        V: fmt::Display,
    {
        Self::print_subtree(out, self.root, 0, "")
    }

    fn print_subtree(
        out: &mut dyn fmt::Write,
        link: Link<K, V>,
        indent: usize,
        prefix: &str,
    ) -> fmt::Result
    where
        K: fmt::Display,
        V: fmt::Display,
    {
        if let Some(node_ptr) = link {
            let node = unsafe { &*node_ptr.as_ptr() };
            writeln!(out, "{:indent$}{}[{}, {}]", "", prefix, node.key, node.value)?;
            Self::print_subtree(out, node.left, indent + PRINT_INDENT, "L: ")?;
            Self::print_subtree(out, node.right, indent + PRINT_INDENT, "R: ")?;
        }
        Ok(())
    }

    fn fmt_subtree(f: &mut fmt::Formatter, link: Link<K, V>) -> fmt::Result
    where
        K: fmt::Display,
        V: fmt::Display,
    {
        if let Some(node_ptr) = link {
            let node = unsafe { &*node_ptr.as_ptr() };
            write!(f, "([{},{}],", node.key, node.value)?;
            Self::fmt_subtree(f, node.left)?;
            f.write_char(',')?;
            Self::fmt_subtree(f, node.right)?;
            f.write_char(')')?;
        }
        Ok(())
    }
}

impl<K, V> Drop for BstMap<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K: Ord, V> Default for BstMap<K, V> {
    /// Creates an empty map.
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-order serialization of the tree, in the same format as
/// [`AvlMap`](crate::AvlMap).
impl<K: fmt::Display, V: fmt::Display> fmt::Display for BstMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Self::fmt_subtree(f, self.root)
    }
}

impl<K, V> Node<K, V> {
    fn create(parent: Link<K, V>, key: K, value: V) -> NodePtr<K, V> {
        let boxed = Box::new(Node {
            key,
            value,
            parent,
            left: None,
            right: None,
        });
        unsafe { NodePtr::new_unchecked(Box::into_raw(boxed)) }
    }

    unsafe fn destroy(node_ptr: NodePtr<K, V>) {
        drop(Box::from_raw(node_ptr.as_ptr()));
    }
}
