//! # B+Tree Leaf Node Codec
//!
//! Leaf nodes store the actual key-value cells and are chained together
//! through `next_leaf` for ordered scans. A leaf page is laid out as:
//!
//! ```text
//! +-----------------------+
//! | Common header (6B)    |  node_type, is_root, parent
//! +-----------------------+
//! | num_cells (4B)        |
//! | next_leaf (4B)        |  0 = no right sibling
//! +-----------------------+
//! | Cell 0                |  key (4B LE) + value (291B)
//! | Cell 1                |
//! | ...                   |
//! +-----------------------+
//! ```
//!
//! Cells are packed, gap-free, and ordered by ascending key. With 4096-byte
//! pages and 295-byte cells a leaf holds at most 13 cells; a split
//! redistributes the 14 conceptual cells (13 existing plus the incoming one)
//! into 7 + 7.
//!
//! ## Views
//!
//! [`LeafNode`] and [`LeafNodeMut`] borrow the page buffer and expose typed
//! accessors over it. Value reads return slices pointing directly into the
//! page; nothing is copied.

use eyre::{ensure, Result};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::node::{NodeType, COMMON_HEADER_SIZE};
use crate::row::ROW_SIZE;
use crate::storage::PAGE_SIZE;

pub const LEAF_HEADER_SIZE: usize = COMMON_HEADER_SIZE + 4 + 4;
pub const LEAF_KEY_SIZE: usize = 4;
pub const LEAF_VALUE_SIZE: usize = ROW_SIZE;
pub const LEAF_CELL_SIZE: usize = LEAF_KEY_SIZE + LEAF_VALUE_SIZE;
pub const LEAF_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_HEADER_SIZE;
pub const LEAF_MAX_CELLS: usize = LEAF_SPACE_FOR_CELLS / LEAF_CELL_SIZE;

pub const LEAF_RIGHT_SPLIT_COUNT: usize = (LEAF_MAX_CELLS + 1) / 2;
pub const LEAF_LEFT_SPLIT_COUNT: usize = LEAF_MAX_CELLS + 1 - LEAF_RIGHT_SPLIT_COUNT;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct LeafHeader {
    node_type: u8,
    is_root: u8,
    parent: U32,
    num_cells: U32,
    next_leaf: U32,
}

const _: () = assert!(std::mem::size_of::<LeafHeader>() == LEAF_HEADER_SIZE);

impl LeafHeader {
    fn from_bytes(data: &[u8]) -> Result<&Self> {
        ensure!(
            data.len() >= LEAF_HEADER_SIZE,
            "buffer too small for LeafHeader: {} < {}",
            data.len(),
            LEAF_HEADER_SIZE
        );

        Self::ref_from_bytes(&data[..LEAF_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read LeafHeader: {:?}", e))
    }

    fn from_bytes_mut(data: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            data.len() >= LEAF_HEADER_SIZE,
            "buffer too small for LeafHeader: {} < {}",
            data.len(),
            LEAF_HEADER_SIZE
        );

        Self::mut_from_bytes(&mut data[..LEAF_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read LeafHeader: {:?}", e))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    Found(usize),
    NotFound(usize),
}

impl SearchResult {
    /// The cell index carried by either variant: the match position or the
    /// position where the key would be inserted.
    pub fn index(self) -> usize {
        match self {
            SearchResult::Found(i) | SearchResult::NotFound(i) => i,
        }
    }
}

#[derive(Debug)]
pub struct LeafNode<'a> {
    data: &'a [u8],
}

pub struct LeafNodeMut<'a> {
    data: &'a mut [u8],
}

impl<'a> LeafNode<'a> {
    pub fn from_page(data: &'a [u8]) -> Result<Self> {
        ensure!(
            data.len() == PAGE_SIZE,
            "invalid page size: {} != {}",
            data.len(),
            PAGE_SIZE
        );
        let header = LeafHeader::from_bytes(data)?;
        ensure!(
            NodeType::from_byte(header.node_type)? == NodeType::Leaf,
            "expected leaf node, got internal"
        );
        Ok(Self { data })
    }

    fn header(&self) -> &LeafHeader {
        LeafHeader::from_bytes(self.data).unwrap() // INVARIANT: page validated in from_page
    }

    pub fn num_cells(&self) -> u32 {
        self.header().num_cells.get()
    }

    pub fn next_leaf(&self) -> u32 {
        self.header().next_leaf.get()
    }

    pub fn is_root(&self) -> bool {
        self.header().is_root != 0
    }

    pub fn parent(&self) -> u32 {
        self.header().parent.get()
    }

    pub fn key_at(&self, index: usize) -> Result<u32> {
        ensure!(
            index < self.num_cells() as usize,
            "cell index {} out of bounds (num_cells={})",
            index,
            self.num_cells()
        );
        let offset = cell_offset(index);
        let bytes: [u8; LEAF_KEY_SIZE] = self.data[offset..offset + LEAF_KEY_SIZE].try_into()?;
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn value_at(&self, index: usize) -> Result<&'a [u8]> {
        ensure!(
            index < self.num_cells() as usize,
            "cell index {} out of bounds (num_cells={})",
            index,
            self.num_cells()
        );
        let offset = cell_offset(index) + LEAF_KEY_SIZE;
        Ok(&self.data[offset..offset + LEAF_VALUE_SIZE])
    }

    pub fn max_key(&self) -> Result<u32> {
        ensure!(self.num_cells() > 0, "max_key of an empty leaf");
        self.key_at(self.num_cells() as usize - 1)
    }

    /// Lower-bound search: the smallest index whose key is `>= key`, or
    /// `num_cells` when every key is smaller.
    pub fn find(&self, key: u32) -> Result<SearchResult> {
        let mut lo = 0usize;
        let mut hi = self.num_cells() as usize;

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.key_at(mid)? < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        if lo < self.num_cells() as usize && self.key_at(lo)? == key {
            Ok(SearchResult::Found(lo))
        } else {
            Ok(SearchResult::NotFound(lo))
        }
    }
}

impl<'a> LeafNodeMut<'a> {
    pub fn from_page(data: &'a mut [u8]) -> Result<Self> {
        ensure!(
            data.len() == PAGE_SIZE,
            "invalid page size: {} != {}",
            data.len(),
            PAGE_SIZE
        );
        let header = LeafHeader::from_bytes(data)?;
        ensure!(
            NodeType::from_byte(header.node_type)? == NodeType::Leaf,
            "expected leaf node, got internal"
        );
        Ok(Self { data })
    }

    /// Initializes a fresh page as an empty non-root leaf.
    pub fn init(data: &'a mut [u8]) -> Result<Self> {
        ensure!(
            data.len() == PAGE_SIZE,
            "invalid page size: {} != {}",
            data.len(),
            PAGE_SIZE
        );

        let header = LeafHeader::from_bytes_mut(data)?;
        header.node_type = NodeType::Leaf.as_byte();
        header.is_root = 0;
        header.parent = U32::new(0);
        header.num_cells = U32::new(0);
        header.next_leaf = U32::new(0);

        Ok(Self { data })
    }

    pub fn as_ref(&self) -> LeafNode<'_> {
        LeafNode { data: self.data }
    }

    fn header_mut(&mut self) -> &mut LeafHeader {
        LeafHeader::from_bytes_mut(self.data).unwrap() // INVARIANT: page validated in constructor
    }

    pub fn num_cells(&self) -> u32 {
        self.as_ref().num_cells()
    }

    pub fn set_num_cells(&mut self, num_cells: u32) {
        self.header_mut().num_cells = U32::new(num_cells);
    }

    pub fn next_leaf(&self) -> u32 {
        self.as_ref().next_leaf()
    }

    pub fn set_next_leaf(&mut self, page_num: u32) {
        self.header_mut().next_leaf = U32::new(page_num);
    }

    pub fn set_is_root(&mut self, is_root: bool) {
        self.header_mut().is_root = u8::from(is_root);
    }

    pub fn set_parent(&mut self, page_num: u32) {
        self.header_mut().parent = U32::new(page_num);
    }

    /// Overwrites the cell at `index` without touching `num_cells`. Used by
    /// split redistribution, which fixes the count once all cells are placed.
    pub fn write_cell(&mut self, index: usize, key: u32, value: &[u8]) -> Result<()> {
        ensure!(
            index < LEAF_MAX_CELLS,
            "cell index {} out of bounds (max {})",
            index,
            LEAF_MAX_CELLS
        );
        ensure!(
            value.len() == LEAF_VALUE_SIZE,
            "value must be exactly {} bytes, got {}",
            LEAF_VALUE_SIZE,
            value.len()
        );

        let offset = cell_offset(index);
        self.data[offset..offset + LEAF_KEY_SIZE].copy_from_slice(&key.to_le_bytes());
        self.data[offset + LEAF_KEY_SIZE..offset + LEAF_CELL_SIZE].copy_from_slice(value);
        Ok(())
    }

    /// Inserts a cell at `index`, shifting later cells one slot right.
    pub fn insert_cell(&mut self, index: usize, key: u32, value: &[u8]) -> Result<()> {
        let num_cells = self.num_cells() as usize;
        ensure!(num_cells < LEAF_MAX_CELLS, "leaf node is full");
        ensure!(
            index <= num_cells,
            "insert index {} out of bounds (num_cells={})",
            index,
            num_cells
        );

        for i in (index..num_cells).rev() {
            let src = cell_offset(i);
            let dst = cell_offset(i + 1);
            self.data.copy_within(src..src + LEAF_CELL_SIZE, dst);
        }

        self.write_cell(index, key, value)?;
        self.set_num_cells(num_cells as u32 + 1);
        Ok(())
    }
}

fn cell_offset(index: usize) -> usize {
    LEAF_HEADER_SIZE + index * LEAF_CELL_SIZE
}
