//! An ordered map implemented with an AVL tree.

use std::borrow::Borrow;
use std::cmp::{self, Ordering};
use std::fmt::{self, Write};
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

/// Number of spaces per nesting level in the indented tree dump.
const PRINT_INDENT: usize = 4;

/// An ordered map implemented with an AVL tree.
///
/// Every node keeps a balance factor (left subtree height minus right
/// subtree height) in the range [-1, 1]. Insertion and removal restore the
/// balance with at most O(log n) rotations, so lookups stay O(log n).
///
/// ```
/// use ordmap::AvlMap;
/// let mut map = AvlMap::new();
/// map.insert(1, "one");
/// map.insert(2, "two");
/// assert_eq!(map.get(&1), Some(&"one"));
/// map.remove(&1);
/// assert!(map.get(&1).is_none());
/// ```
pub struct AvlMap<K, V> {
    root: Link<K, V>,
    num_nodes: usize,
}

struct Node<K, V> {
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
    parent: Link<K, V>,
    height: usize,
}

type NodePtr<K, V> = NonNull<Node<K, V>>;
type Link<K, V> = Option<NodePtr<K, V>>;
type LinkPtr<K, V> = NonNull<Link<K, V>>;

/// An iterator over the entries of an [`AvlMap`] in ascending key order.
pub struct Iter<'a, K, V> {
    next: Link<K, V>,
    marker: PhantomData<&'a Node<K, V>>,
}

impl<K: Ord, V> AvlMap<K, V> {
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
    /// Changes made through it are visible to all subsequent lookups.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key)
            .map(|node_ptr| unsafe { &mut (*node_ptr.as_ptr()).value })
    }

    /// Returns references to the key-value pair corresponding to the key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|node_ptr| unsafe {
            let node = &*node_ptr.as_ptr();
            (&node.key, &node.value)
        })
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
    /// previous value is returned; the tree structure is left untouched.
    /// Otherwise a new leaf is attached and balance is restored along the
    /// insertion path, which takes at most one single or double rotation.
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
            let node_ptr = Node::create(parent, key, value);
            *link_ptr.as_mut() = Some(node_ptr);
            self.num_nodes += 1;
            self.rebalance_inserted(node_ptr);
        }
        None
    }

    /// Removes a key from the map.
    /// Returns the value at the key if the key was previously in the map.
    ///
    /// A node with two children is replaced by its in-order predecessor,
    /// the rightmost node of its left subtree. Balance is then restored on
    /// the walk from the splice point back up to the root.
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

    /// Restores balance after a new leaf has been attached.
    ///
    /// Walks the ancestor chain of the new node, recomputing heights. The
    /// first ancestor out of balance is fixed with a single or double
    /// rotation, chosen by comparing the inserted key against the key of
    /// the ancestor's taller child. One rotation restores the subtree to
    /// its pre-insert height, so the walk can stop there.
    fn rebalance_inserted(&mut self, new_ptr: NodePtr<K, V>) {
        unsafe {
            let mut current = new_ptr.as_ref().parent;
            while let Some(node_ptr) = current {
                let parent = node_ptr.as_ref().parent;
                let left_height = Self::left_height(node_ptr);
                let right_height = Self::right_height(node_ptr);
                if left_height > right_height + 1 {
                    let left_ptr = node_ptr.as_ref().left.unwrap();
                    if new_ptr.as_ref().key < left_ptr.as_ref().key {
                        // left-left
                        self.rotate_right(node_ptr);
                    } else {
                        // left-right
                        self.rotate_left(left_ptr);
                        self.rotate_right(node_ptr);
                    }
                    break;
                } else if right_height > left_height + 1 {
                    let right_ptr = node_ptr.as_ref().right.unwrap();
                    if new_ptr.as_ref().key > right_ptr.as_ref().key {
                        // right-right
                        self.rotate_left(node_ptr);
                    } else {
                        // right-left
                        self.rotate_right(right_ptr);
                        self.rotate_left(node_ptr);
                    }
                    break;
                } else {
                    Self::update_height(node_ptr);
                }
                current = parent;
            }
        }
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
                // transplanting both child links (up to 6 links rewritten).
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

                // The predecessor's old parent may be out of balance now.
                let mut rebalance_from = max_child_parent_ptr;
                if rebalance_from == node_ptr {
                    // Old parent is the unlinked node itself and has been
                    // replaced by the predecessor.
                    rebalance_from = max_child_ptr;
                }
                self.rebalance(Some(rebalance_from));
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
                        self.rebalance(Some(parent_ptr));
                    }
                }
            }
        }
    }

    /// Rebalances nodes starting from the given position up to the root.
    fn rebalance(&mut self, start_from: Link<K, V>) {
        let mut current = start_from;
        while let Some(node_ptr) = current {
            let parent = unsafe { node_ptr.as_ref().parent };
            self.rebalance_node(node_ptr);
            current = parent;
        }
    }

    /// Restores balance at the given node if necessary and adjusts its
    /// height. The initial imbalance must not exceed 2, which always holds
    /// after a single update. Returns whether a rotation took place.
    fn rebalance_node(&mut self, node_ptr: NodePtr<K, V>) -> bool {
        unsafe {
            let left_height = Self::left_height(node_ptr);
            let right_height = Self::right_height(node_ptr);
            debug_assert!(left_height <= right_height + 2);
            debug_assert!(right_height <= left_height + 2);
            if left_height > right_height + 1 {
                let left_ptr = node_ptr.as_ref().left.unwrap();
                if Self::right_height(left_ptr) > Self::left_height(left_ptr) {
                    self.rotate_left(left_ptr);
                }
                self.rotate_right(node_ptr);
                true
            } else if right_height > left_height + 1 {
                let right_ptr = node_ptr.as_ref().right.unwrap();
                if Self::left_height(right_ptr) > Self::right_height(right_ptr) {
                    self.rotate_right(right_ptr);
                }
                self.rotate_left(node_ptr);
                true
            } else {
                Self::update_height(node_ptr);
                false
            }
        }
    }

    fn rotate_left(&mut self, mut node_ptr: NodePtr<K, V>) {
        unsafe {
            if let Some(mut pivot_ptr) = node_ptr.as_ref().right {
                node_ptr.as_mut().right = pivot_ptr.as_ref().left;
                if let Some(mut shifted_ptr) = pivot_ptr.as_ref().left {
                    shifted_ptr.as_mut().parent = Some(node_ptr);
                }

                pivot_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(pivot_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(pivot_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(pivot_ptr);
                        }
                    }
                }

                pivot_ptr.as_mut().left = Some(node_ptr);
                node_ptr.as_mut().parent = Some(pivot_ptr);

                // Only the two rotated nodes change height.
                Self::update_height(node_ptr);
                Self::update_height(pivot_ptr);
            }
        }
    }

    fn rotate_right(&mut self, mut node_ptr: NodePtr<K, V>) {
        unsafe {
            if let Some(mut pivot_ptr) = node_ptr.as_ref().left {
                node_ptr.as_mut().left = pivot_ptr.as_ref().right;
                if let Some(mut shifted_ptr) = pivot_ptr.as_ref().right {
                    shifted_ptr.as_mut().parent = Some(node_ptr);
                }

                pivot_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(pivot_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(pivot_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(pivot_ptr);
                        }
                    }
                }

                pivot_ptr.as_mut().right = Some(node_ptr);
                node_ptr.as_mut().parent = Some(pivot_ptr);

                Self::update_height(node_ptr);
                Self::update_height(pivot_ptr);
            }
        }
    }

    fn link_height(link: Link<K, V>) -> usize {
        link.map_or(0, |node_ptr| unsafe { node_ptr.as_ref().height })
    }

    fn left_height(node_ptr: NodePtr<K, V>) -> usize {
        Self::link_height(unsafe { node_ptr.as_ref().left })
    }

    fn right_height(node_ptr: NodePtr<K, V>) -> usize {
        Self::link_height(unsafe { node_ptr.as_ref().right })
    }

    fn update_height(mut node_ptr: NodePtr<K, V>) {
        unsafe {
            node_ptr.as_mut().height = 1 + cmp::max(
                Self::left_height(node_ptr),
                Self::right_height(node_ptr),
            );
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
                let mut left_height = 0;
                let mut right_height = 0;

                if let Some(left_ptr) = node.left {
                    assert!(left_ptr.as_ref().parent == Some(node_ptr));
                    assert!(left_ptr.as_ref().key < node.key);
                    left_height = left_ptr.as_ref().height;
                }
                if let Some(right_ptr) = node.right {
                    assert!(right_ptr.as_ref().parent == Some(node_ptr));
                    assert!(right_ptr.as_ref().key > node.key);
                    right_height = right_ptr.as_ref().height;
                }

                assert_eq!(node.height, 1 + cmp::max(left_height, right_height));

                // AVL condition
                assert!(left_height <= right_height + 1);
                assert!(right_height <= left_height + 1);

                1 + Self::check_subtree(node.left) + Self::check_subtree(node.right)
            }
        }
    }

    #[cfg(test)]
    pub fn height(&self) -> usize {
        Self::link_height(self.root)
    }
}

impl<K, V> AvlMap<K, V> {
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

    /// Gets an iterator over the entries of the map in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            next: leftmost(self.root),
            marker: PhantomData,
        }
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

impl<K, V> Drop for AvlMap<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K: Ord, V> Default for AvlMap<K, V> {
    /// Creates an empty map.
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone> Clone for AvlMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            root: unsafe { clone_subtree(self.root, None) },
            num_nodes: self.num_nodes,
        }
    }
}

/// Pre-order serialization of the tree: every node renders as
/// `([<key>,<value>],<left subtree>,<right subtree>)`, empty subtrees and
/// the empty map render as the empty string.
impl<K: fmt::Display, V: fmt::Display> fmt::Display for AvlMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Self::fmt_subtree(f, self.root)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for AvlMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<'a, K, V> IntoIterator for &'a AvlMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.next?;
        let node = unsafe { &*node_ptr.as_ptr() };
        self.next = successor(node_ptr);
        Some((&node.key, &node.value))
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
            height: 1,
        });
        unsafe { NodePtr::new_unchecked(Box::into_raw(boxed)) }
    }

    unsafe fn destroy(node_ptr: NodePtr<K, V>) {
        drop(Box::from_raw(node_ptr.as_ptr()));
    }
}

fn leftmost<K, V>(link: Link<K, V>) -> Link<K, V> {
    let mut current = link?;
    while let Some(left_ptr) = unsafe { current.as_ref().left } {
        current = left_ptr;
    }
    Some(current)
}

/// In-order successor: leftmost node of the right subtree, or the first
/// ancestor reached from a left child.
fn successor<K, V>(node_ptr: NodePtr<K, V>) -> Link<K, V> {
    unsafe {
        if node_ptr.as_ref().right.is_some() {
            return leftmost(node_ptr.as_ref().right);
        }
        let mut current = node_ptr;
        loop {
            match current.as_ref().parent {
                None => return None,
                Some(parent_ptr) => {
                    if parent_ptr.as_ref().left == Some(current) {
                        return Some(parent_ptr);
                    }
                    current = parent_ptr;
                }
            }
        }
    }
}

unsafe fn clone_subtree<K: Clone, V: Clone>(
    link: Link<K, V>,
    parent: Link<K, V>,
) -> Link<K, V> {
    match link {
        None => None,
        Some(node_ptr) => {
            let node = node_ptr.as_ref();
            let mut new_ptr = Node::create(parent, node.key.clone(), node.value.clone());
            new_ptr.as_mut().height = node.height;
            new_ptr.as_mut().left = clone_subtree(node.left, Some(new_ptr));
            new_ptr.as_mut().right = clone_subtree(node.right, Some(new_ptr));
            Some(new_ptr)
        }
    }
}
