//! # B+Tree Operations
//!
//! Search, insert, leaf splitting, and parent-link maintenance over
//! pager-backed pages. The tree owns its invariants:
//!
//! - keys are strictly increasing within any node and unique across the tree
//! - an internal cell's key equals the maximum key reachable through its child
//! - every non-root node's `parent` points at its true parent
//! - the root always lives at page 0
//! - leaves form a singly linked list in ascending key order
//!
//! ## Splitting
//!
//! A full leaf splits into two halves of `LEAF_LEFT_SPLIT_COUNT` and
//! `LEAF_RIGHT_SPLIT_COUNT` cells. When the split leaf was the root, the
//! root page is rebuilt in place as an internal node over the two halves
//! (the old root's bytes move to a fresh page first, keeping the root at
//! page 0). Otherwise the parent gets its separator for the left half
//! refreshed and a new cell for the right half.
//!
//! Internal nodes do not split. An insert whose leaf split would overflow
//! the parent is detected before any page is mutated and reported as
//! [`InsertOutcome::TableFull`].

use std::fmt::Write as _;

use eyre::{ensure, Result};

use super::cursor::Cursor;
use super::internal::{InternalNode, InternalNodeMut, INTERNAL_MAX_CELLS};
use super::leaf::{
    LeafNode, LeafNodeMut, LEAF_LEFT_SPLIT_COUNT, LEAF_MAX_CELLS, LEAF_RIGHT_SPLIT_COUNT,
    LEAF_VALUE_SIZE,
};
use super::node::{self, NodeHeader, NodeType};
use crate::storage::{PageBuf, Pager};

/// B+Tree over a pager, rooted at a fixed page.
pub struct BTree<'a> {
    pager: &'a mut Pager,
    root_page: u32,
}

/// Result of an insert attempt. Duplicate keys and a full table are
/// recoverable outcomes, not errors; the REPL reports them and carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    DuplicateKey,
    TableFull,
}

impl<'a> BTree<'a> {
    pub fn new(pager: &'a mut Pager, root_page: u32) -> Self {
        Self { pager, root_page }
    }

    /// Descends from the root to the leaf that holds `key`, or would hold it.
    /// The returned cursor points at the match or the insertion position.
    pub fn find(&mut self, key: u32) -> Result<Cursor> {
        let mut page_num = self.root_page;

        loop {
            let page = self.pager.get_page(page_num)?;
            match node::node_type(&page[..])? {
                NodeType::Internal => {
                    let internal = InternalNode::from_page(&page[..])?;
                    let index = internal.find_child_index(key)?;
                    page_num = internal.child_at(index)?;
                }
                NodeType::Leaf => {
                    let leaf = LeafNode::from_page(&page[..])?;
                    let cell_num = leaf.find(key)?.index() as u32;
                    return Ok(Cursor::new(page_num, cell_num));
                }
            }
        }
    }

    /// Cursor at the first row of the table, with `end_of_table` already set
    /// for an empty tree.
    pub fn start(&mut self) -> Result<Cursor> {
        let mut cursor = self.find(0)?;

        let page = self.pager.get_page(cursor.page_num)?;
        let leaf = LeafNode::from_page(&page[..])?;
        cursor.end_of_table = leaf.num_cells() == 0;

        Ok(cursor)
    }

    /// The value slice of the cell under the cursor.
    pub fn value(&mut self, cursor: &Cursor) -> Result<&[u8]> {
        let page = self.pager.get_page(cursor.page_num)?;
        let leaf = LeafNode::from_page(&page[..])?;
        leaf.value_at(cursor.cell_num as usize)
    }

    /// Moves the cursor one cell forward, following `next_leaf` across leaf
    /// boundaries. Sets `end_of_table` past the rightmost cell.
    pub fn advance(&mut self, cursor: &mut Cursor) -> Result<()> {
        let page = self.pager.get_page(cursor.page_num)?;
        let leaf = LeafNode::from_page(&page[..])?;

        cursor.cell_num += 1;
        if cursor.cell_num >= leaf.num_cells() {
            let next = leaf.next_leaf();
            if next == 0 {
                cursor.end_of_table = true;
            } else {
                cursor.page_num = next;
                cursor.cell_num = 0;
            }
        }

        Ok(())
    }

    pub fn insert(&mut self, key: u32, value: &[u8]) -> Result<InsertOutcome> {
        ensure!(
            value.len() == LEAF_VALUE_SIZE,
            "value must be exactly {} bytes, got {}",
            LEAF_VALUE_SIZE,
            value.len()
        );

        let cursor = self.find(key)?;

        let page = self.pager.get_page(cursor.page_num)?;
        let leaf = LeafNode::from_page(&page[..])?;
        let num_cells = leaf.num_cells();

        if cursor.cell_num < num_cells && leaf.key_at(cursor.cell_num as usize)? == key {
            return Ok(InsertOutcome::DuplicateKey);
        }

        if (num_cells as usize) < LEAF_MAX_CELLS {
            let mut leaf = LeafNodeMut::from_page(&mut page[..])?;
            leaf.insert_cell(cursor.cell_num as usize, key, value)?;
            return Ok(InsertOutcome::Inserted);
        }

        self.split_leaf(&cursor, key, value)
    }

    /// Splits the full leaf under `cursor`, inserting the new cell in the
    /// process. The left half keeps the original page so leaf order and the
    /// root-at-page-0 invariant survive.
    fn split_leaf(&mut self, cursor: &Cursor, key: u32, value: &[u8]) -> Result<InsertOutcome> {
        // Gather everything needed from the full leaf before mutating anything.
        let (old_max, old_next, old_parent, old_is_root, mut keys, mut values) = {
            let page = self.pager.get_page(cursor.page_num)?;
            let leaf = LeafNode::from_page(&page[..])?;

            let mut keys = Vec::with_capacity(LEAF_MAX_CELLS + 1);
            let mut values: Vec<Vec<u8>> = Vec::with_capacity(LEAF_MAX_CELLS + 1);
            for i in 0..leaf.num_cells() as usize {
                keys.push(leaf.key_at(i)?);
                values.push(leaf.value_at(i)?.to_vec());
            }

            (
                leaf.max_key()?,
                leaf.next_leaf(),
                leaf.parent(),
                leaf.is_root(),
                keys,
                values,
            )
        };

        // Splitting a non-root leaf inserts a cell into its parent. Refuse up
        // front when the parent has no room, so a rejected insert leaves the
        // tree untouched.
        if !old_is_root {
            let page = self.pager.get_page(old_parent)?;
            let parent = InternalNode::from_page(&page[..])?;
            if parent.num_keys() as usize >= INTERNAL_MAX_CELLS {
                return Ok(InsertOutcome::TableFull);
            }
        }

        keys.insert(cursor.cell_num as usize, key);
        values.insert(cursor.cell_num as usize, value.to_vec());

        let new_page_num = self.pager.allocate_page();
        {
            let page = self.pager.get_page(new_page_num)?;
            let mut new_leaf = LeafNodeMut::init(&mut page[..])?;
            new_leaf.set_parent(old_parent);
            new_leaf.set_next_leaf(old_next);
            for i in 0..LEAF_RIGHT_SPLIT_COUNT {
                new_leaf.write_cell(
                    i,
                    keys[LEAF_LEFT_SPLIT_COUNT + i],
                    &values[LEAF_LEFT_SPLIT_COUNT + i],
                )?;
            }
            new_leaf.set_num_cells(LEAF_RIGHT_SPLIT_COUNT as u32);
        }

        let new_max = {
            let page = self.pager.get_page(cursor.page_num)?;
            let mut old_leaf = LeafNodeMut::from_page(&mut page[..])?;
            for i in 0..LEAF_LEFT_SPLIT_COUNT {
                old_leaf.write_cell(i, keys[i], &values[i])?;
            }
            old_leaf.set_num_cells(LEAF_LEFT_SPLIT_COUNT as u32);
            old_leaf.set_next_leaf(new_page_num);
            keys[LEAF_LEFT_SPLIT_COUNT - 1]
        };

        if old_is_root {
            self.create_new_root(new_page_num)?;
        } else {
            self.update_internal_key(old_parent, old_max, new_max)?;
            self.insert_into_internal(old_parent, new_page_num)?;
        }

        Ok(InsertOutcome::Inserted)
    }

    /// Rebuilds page 0 as an internal root over the old root's contents
    /// (moved to a fresh page) and `right_child_page`.
    fn create_new_root(&mut self, right_child_page: u32) -> Result<()> {
        let left_child_page = self.pager.allocate_page();

        let root_bytes: PageBuf = *self.pager.get_page(self.root_page)?;
        {
            let page = self.pager.get_page(left_child_page)?;
            *page = root_bytes;
            let header = NodeHeader::from_bytes_mut(&mut page[..])?;
            header.set_is_root(false);
            header.set_parent(self.root_page);
        }
        let left_max = self.node_max_key(left_child_page)?;

        {
            let page = self.pager.get_page(self.root_page)?;
            let mut root = InternalNodeMut::init(&mut page[..])?;
            root.set_is_root(true);
            root.set_num_keys(1);
            root.set_cell(0, left_child_page, left_max)?;
            root.set_right_child(right_child_page);
        }

        let page = self.pager.get_page(right_child_page)?;
        NodeHeader::from_bytes_mut(&mut page[..])?.set_parent(self.root_page);

        Ok(())
    }

    /// Rewrites the separator that tracked `old_key` after the key range of a
    /// child shrank. A key tracked by the right-child pointer has no
    /// separator cell, so nothing needs rewriting.
    fn update_internal_key(&mut self, page_num: u32, old_key: u32, new_key: u32) -> Result<()> {
        let page = self.pager.get_page(page_num)?;
        let mut internal = InternalNodeMut::from_page(&mut page[..])?;

        let index = internal.as_ref().find_child_index(old_key)?;
        if index < internal.num_keys() as usize {
            internal.set_key(index, new_key)?;
        }

        Ok(())
    }

    /// Adds `child_page` to the internal node at `parent_page`, keyed by the
    /// child's maximum key. A child past the current right child demotes the
    /// old right child into the cell array.
    fn insert_into_internal(&mut self, parent_page: u32, child_page: u32) -> Result<()> {
        let child_max = self.node_max_key(child_page)?;

        let (num_keys, right_child_page) = {
            let page = self.pager.get_page(parent_page)?;
            let parent = InternalNode::from_page(&page[..])?;
            (parent.num_keys() as usize, parent.right_child())
        };
        ensure!(
            num_keys < INTERNAL_MAX_CELLS,
            "internal node splitting is not implemented"
        );

        let right_max = self.node_max_key(right_child_page)?;

        let page = self.pager.get_page(parent_page)?;
        let mut parent = InternalNodeMut::from_page(&mut page[..])?;
        if child_max > right_max {
            parent.insert_cell(num_keys, right_child_page, right_max)?;
            parent.set_right_child(child_page);
        } else {
            let index = parent.as_ref().find_child_index(child_max)?;
            parent.insert_cell(index, child_page, child_max)?;
        }

        Ok(())
    }

    /// Maximum key of a node. Internal cell keys already carry their
    /// subtree's maximum, so no descent is needed.
    fn node_max_key(&mut self, page_num: u32) -> Result<u32> {
        let page = self.pager.get_page(page_num)?;
        match node::node_type(&page[..])? {
            NodeType::Leaf => LeafNode::from_page(&page[..])?.max_key(),
            NodeType::Internal => InternalNode::from_page(&page[..])?.max_key(),
        }
    }

    /// Renders the tree structure for the `.btree` meta-command: two spaces
    /// of indentation per level, leaves listing their keys, internal nodes
    /// interleaving child subtrees with their separator keys.
    pub fn render(&mut self) -> Result<String> {
        let mut out = String::new();
        self.render_node(self.root_page, 0, &mut out)?;
        Ok(out)
    }

    fn render_node(&mut self, page_num: u32, depth: usize, out: &mut String) -> Result<()> {
        let indent = "  ".repeat(depth);

        let page = self.pager.get_page(page_num)?;
        match node::node_type(&page[..])? {
            NodeType::Leaf => {
                let leaf = LeafNode::from_page(&page[..])?;
                let num_cells = leaf.num_cells();
                writeln!(out, "{}- leaf (size {})", indent, num_cells)?;
                for i in 0..num_cells as usize {
                    writeln!(out, "{}  - {}", indent, leaf.key_at(i)?)?;
                }
            }
            NodeType::Internal => {
                let internal = InternalNode::from_page(&page[..])?;
                let num_keys = internal.num_keys() as usize;
                let mut keys = Vec::with_capacity(num_keys);
                let mut children = Vec::with_capacity(num_keys + 1);
                for i in 0..num_keys {
                    keys.push(internal.key_at(i)?);
                    children.push(internal.child_at(i)?);
                }
                children.push(internal.right_child());

                writeln!(out, "{}- internal (size {})", indent, num_keys)?;
                for i in 0..num_keys {
                    self.render_node(children[i], depth + 1, out)?;
                    writeln!(out, "{}  - key {}", indent, keys[i])?;
                }
                self.render_node(children[num_keys], depth + 1, out)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TABLE_MAX_PAGES;
    use tempfile::tempdir;

    fn value_of(byte: u8) -> Vec<u8> {
        vec![byte; LEAF_VALUE_SIZE]
    }

    fn open_tree_pager(dir: &tempfile::TempDir) -> Pager {
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();
        let page = pager.get_page(0).unwrap();
        let mut root = LeafNodeMut::init(&mut page[..]).unwrap();
        root.set_is_root(true);
        pager
    }

    #[test]
    fn find_on_empty_tree_points_at_cell_zero() {
        let dir = tempdir().unwrap();
        let mut pager = open_tree_pager(&dir);
        let mut tree = BTree::new(&mut pager, 0);

        let cursor = tree.find(42).unwrap();

        assert_eq!(cursor.page_num, 0);
        assert_eq!(cursor.cell_num, 0);
    }

    #[test]
    fn start_on_empty_tree_is_end_of_table() {
        let dir = tempdir().unwrap();
        let mut pager = open_tree_pager(&dir);
        let mut tree = BTree::new(&mut pager, 0);

        let cursor = tree.start().unwrap();

        assert!(cursor.end_of_table);
    }

    #[test]
    fn insert_and_scan_sorted() {
        let dir = tempdir().unwrap();
        let mut pager = open_tree_pager(&dir);
        let mut tree = BTree::new(&mut pager, 0);

        for key in [3u32, 1, 2] {
            let outcome = tree.insert(key, &value_of(key as u8)).unwrap();
            assert_eq!(outcome, InsertOutcome::Inserted);
        }

        let mut cursor = tree.start().unwrap();
        let mut seen = Vec::new();
        while !cursor.end_of_table {
            let page = tree.pager.get_page(cursor.page_num).unwrap();
            let leaf = LeafNode::from_page(&page[..]).unwrap();
            seen.push(leaf.key_at(cursor.cell_num as usize).unwrap());
            tree.advance(&mut cursor).unwrap();
        }

        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn duplicate_key_is_reported() {
        let dir = tempdir().unwrap();
        let mut pager = open_tree_pager(&dir);
        let mut tree = BTree::new(&mut pager, 0);

        tree.insert(1, &value_of(1)).unwrap();
        let outcome = tree.insert(1, &value_of(2)).unwrap();

        assert_eq!(outcome, InsertOutcome::DuplicateKey);
    }

    #[test]
    fn value_returns_inserted_bytes() {
        let dir = tempdir().unwrap();
        let mut pager = open_tree_pager(&dir);
        let mut tree = BTree::new(&mut pager, 0);

        tree.insert(7, &value_of(0x77)).unwrap();

        let cursor = tree.find(7).unwrap();
        assert_eq!(tree.value(&cursor).unwrap(), &value_of(0x77)[..]);
    }

    #[test]
    fn root_split_builds_internal_root_at_page_zero() {
        let dir = tempdir().unwrap();
        let mut pager = open_tree_pager(&dir);
        let mut tree = BTree::new(&mut pager, 0);

        for key in 1..=(LEAF_MAX_CELLS as u32 + 1) {
            tree.insert(key, &value_of(0)).unwrap();
        }

        let page = pager.get_page(0).unwrap();
        let root = InternalNode::from_page(&page[..]).unwrap();
        assert!(root.is_root());
        assert_eq!(root.num_keys(), 1);
        assert_eq!(root.key_at(0).unwrap(), LEAF_LEFT_SPLIT_COUNT as u32);

        let left_page = root.child_at(0).unwrap();
        let right_page = root.right_child();

        let page = pager.get_page(left_page).unwrap();
        let left = LeafNode::from_page(&page[..]).unwrap();
        assert_eq!(left.num_cells(), LEAF_LEFT_SPLIT_COUNT as u32);
        assert_eq!(left.parent(), 0);
        assert_eq!(left.next_leaf(), right_page);

        let page = pager.get_page(right_page).unwrap();
        let right = LeafNode::from_page(&page[..]).unwrap();
        assert_eq!(right.num_cells(), LEAF_RIGHT_SPLIT_COUNT as u32);
        assert_eq!(right.parent(), 0);
        assert_eq!(right.next_leaf(), 0);
    }

    #[test]
    fn split_keeps_all_keys_in_order() {
        let dir = tempdir().unwrap();
        let mut pager = open_tree_pager(&dir);
        let mut tree = BTree::new(&mut pager, 0);

        // Descending inserts force the split position away from the tail.
        let total = LEAF_MAX_CELLS as u32 + 1;
        for key in (1..=total).rev() {
            tree.insert(key, &value_of(0)).unwrap();
        }

        let mut cursor = tree.start().unwrap();
        let mut seen = Vec::new();
        while !cursor.end_of_table {
            let page = tree.pager.get_page(cursor.page_num).unwrap();
            let leaf = LeafNode::from_page(&page[..]).unwrap();
            seen.push(leaf.key_at(cursor.cell_num as usize).unwrap());
            tree.advance(&mut cursor).unwrap();
        }

        assert_eq!(seen, (1..=total).collect::<Vec<_>>());
    }

    #[test]
    fn table_full_when_parent_has_no_room() {
        let dir = tempdir().unwrap();
        let mut pager = open_tree_pager(&dir);
        let mut tree = BTree::new(&mut pager, 0);

        let mut key = 0u32;
        let outcome = loop {
            key += 1;
            match tree.insert(key, &value_of(0)).unwrap() {
                InsertOutcome::Inserted => continue,
                other => break other,
            }
        };

        assert_eq!(outcome, InsertOutcome::TableFull);
        // 4 leaves of 13, minus the splits' redistribution slack.
        assert_eq!(key, 35);
        assert!(pager.num_pages() < TABLE_MAX_PAGES as u32);
    }

    #[test]
    fn table_full_does_not_mutate_tree() {
        let dir = tempdir().unwrap();
        let mut pager = open_tree_pager(&dir);
        let mut tree = BTree::new(&mut pager, 0);

        for key in 1..=34u32 {
            assert_eq!(
                tree.insert(key, &value_of(0)).unwrap(),
                InsertOutcome::Inserted
            );
        }

        let num_pages = pager.num_pages();
        let mut snapshot = Vec::new();
        for i in 0..num_pages {
            snapshot.push(*pager.get_page(i).unwrap());
        }

        let mut tree = BTree::new(&mut pager, 0);
        assert_eq!(
            tree.insert(35, &value_of(0)).unwrap(),
            InsertOutcome::TableFull
        );

        assert_eq!(pager.num_pages(), num_pages);
        for (i, before) in snapshot.iter().enumerate() {
            assert_eq!(
                &pager.get_page(i as u32).unwrap()[..],
                &before[..],
                "page {} changed",
                i
            );
        }
    }

    #[test]
    fn render_single_leaf() {
        let dir = tempdir().unwrap();
        let mut pager = open_tree_pager(&dir);
        let mut tree = BTree::new(&mut pager, 0);

        for key in [3u32, 1, 2] {
            tree.insert(key, &value_of(0)).unwrap();
        }

        assert_eq!(
            tree.render().unwrap(),
            "- leaf (size 3)\n  - 1\n  - 2\n  - 3\n"
        );
    }

    #[test]
    fn render_after_root_split() {
        let dir = tempdir().unwrap();
        let mut pager = open_tree_pager(&dir);
        let mut tree = BTree::new(&mut pager, 0);

        for key in 1..=(LEAF_MAX_CELLS as u32 + 1) {
            tree.insert(key, &value_of(0)).unwrap();
        }

        let mut expected = String::from("- internal (size 1)\n");
        expected.push_str("  - leaf (size 7)\n");
        for key in 1..=7 {
            expected.push_str(&format!("    - {}\n", key));
        }
        expected.push_str("  - key 7\n");
        expected.push_str("  - leaf (size 7)\n");
        for key in 8..=14 {
            expected.push_str(&format!("    - {}\n", key));
        }

        assert_eq!(tree.render().unwrap(), expected);
    }
}
