//! # B+Tree Internal Node Codec
//!
//! Internal nodes store separator keys and child page pointers:
//!
//! ```text
//! +-----------------------+
//! | Common header (6B)    |  node_type, is_root, parent
//! +-----------------------+
//! | num_keys (4B)         |
//! | right_child (4B)      |
//! +-----------------------+
//! | Cell 0                |  child_page (4B LE) + key (4B LE)
//! | Cell 1                |
//! | ...                   |
//! +-----------------------+
//! ```
//!
//! A node with `K` keys has `K + 1` children: one per cell plus the right
//! child in the header. The key stored in cell `i` equals the maximum key
//! reachable through `child(i)`, so every key in subtree `i` is `<= key(i)`
//! and every key under the right child is greater than all cell keys.
//!
//! The cell capacity is deliberately tiny (3) so that split behavior shows
//! up after a handful of inserts. Internal nodes never split in this engine;
//! an insert that would require it is rejected before any page is touched.

use eyre::{ensure, Result};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::node::{NodeType, COMMON_HEADER_SIZE};
use crate::storage::PAGE_SIZE;

pub const INTERNAL_HEADER_SIZE: usize = COMMON_HEADER_SIZE + 4 + 4;
pub const INTERNAL_CELL_SIZE: usize = 8;
pub const INTERNAL_MAX_CELLS: usize = 3;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct InternalHeader {
    node_type: u8,
    is_root: u8,
    parent: U32,
    num_keys: U32,
    right_child: U32,
}

const _: () = assert!(std::mem::size_of::<InternalHeader>() == INTERNAL_HEADER_SIZE);

impl InternalHeader {
    fn from_bytes(data: &[u8]) -> Result<&Self> {
        ensure!(
            data.len() >= INTERNAL_HEADER_SIZE,
            "buffer too small for InternalHeader: {} < {}",
            data.len(),
            INTERNAL_HEADER_SIZE
        );

        Self::ref_from_bytes(&data[..INTERNAL_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read InternalHeader: {:?}", e))
    }

    fn from_bytes_mut(data: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            data.len() >= INTERNAL_HEADER_SIZE,
            "buffer too small for InternalHeader: {} < {}",
            data.len(),
            INTERNAL_HEADER_SIZE
        );

        Self::mut_from_bytes(&mut data[..INTERNAL_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read InternalHeader: {:?}", e))
    }
}

#[repr(C)]
#[derive(
    Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, PartialEq, Eq,
)]
pub struct InternalCell {
    child: U32,
    key: U32,
}

const _: () = assert!(std::mem::size_of::<InternalCell>() == INTERNAL_CELL_SIZE);

impl InternalCell {
    pub fn new(child: u32, key: u32) -> Self {
        Self {
            child: U32::new(child),
            key: U32::new(key),
        }
    }

    pub fn child(&self) -> u32 {
        self.child.get()
    }

    pub fn key(&self) -> u32 {
        self.key.get()
    }
}

#[derive(Debug)]
pub struct InternalNode<'a> {
    data: &'a [u8],
}

pub struct InternalNodeMut<'a> {
    data: &'a mut [u8],
}

impl<'a> InternalNode<'a> {
    pub fn from_page(data: &'a [u8]) -> Result<Self> {
        ensure!(
            data.len() == PAGE_SIZE,
            "invalid page size: {} != {}",
            data.len(),
            PAGE_SIZE
        );
        let header = InternalHeader::from_bytes(data)?;
        ensure!(
            NodeType::from_byte(header.node_type)? == NodeType::Internal,
            "expected internal node, got leaf"
        );
        Ok(Self { data })
    }

    fn header(&self) -> &InternalHeader {
        InternalHeader::from_bytes(self.data).unwrap() // INVARIANT: page validated in from_page
    }

    pub fn num_keys(&self) -> u32 {
        self.header().num_keys.get()
    }

    pub fn right_child(&self) -> u32 {
        self.header().right_child.get()
    }

    pub fn is_root(&self) -> bool {
        self.header().is_root != 0
    }

    pub fn parent(&self) -> u32 {
        self.header().parent.get()
    }

    pub fn cell_at(&self, index: usize) -> Result<&InternalCell> {
        ensure!(
            index < self.num_keys() as usize,
            "cell index {} out of bounds (num_keys={})",
            index,
            self.num_keys()
        );
        let offset = cell_offset(index);
        InternalCell::ref_from_bytes(&self.data[offset..offset + INTERNAL_CELL_SIZE])
            .map_err(|e| eyre::eyre!("failed to read internal cell at index {}: {:?}", index, e))
    }

    pub fn key_at(&self, index: usize) -> Result<u32> {
        Ok(self.cell_at(index)?.key())
    }

    /// Child pointer at `index`; `index == num_keys` addresses the right child.
    pub fn child_at(&self, index: usize) -> Result<u32> {
        let num_keys = self.num_keys() as usize;
        ensure!(
            index <= num_keys,
            "child index {} out of bounds (num_keys={})",
            index,
            num_keys
        );
        if index == num_keys {
            Ok(self.right_child())
        } else {
            Ok(self.cell_at(index)?.child())
        }
    }

    pub fn max_key(&self) -> Result<u32> {
        ensure!(self.num_keys() > 0, "max_key of an empty internal node");
        self.key_at(self.num_keys() as usize - 1)
    }

    /// Lower-bound search over the separator keys: the smallest index in
    /// `[0, num_keys]` whose key is `>= key`.
    pub fn find_child_index(&self, key: u32) -> Result<usize> {
        let mut lo = 0usize;
        let mut hi = self.num_keys() as usize;

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.key_at(mid)? < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        Ok(lo)
    }
}

impl<'a> InternalNodeMut<'a> {
    pub fn from_page(data: &'a mut [u8]) -> Result<Self> {
        ensure!(
            data.len() == PAGE_SIZE,
            "invalid page size: {} != {}",
            data.len(),
            PAGE_SIZE
        );
        let header = InternalHeader::from_bytes(data)?;
        ensure!(
            NodeType::from_byte(header.node_type)? == NodeType::Internal,
            "expected internal node, got leaf"
        );
        Ok(Self { data })
    }

    /// Initializes a page as an empty non-root internal node.
    pub fn init(data: &'a mut [u8]) -> Result<Self> {
        ensure!(
            data.len() == PAGE_SIZE,
            "invalid page size: {} != {}",
            data.len(),
            PAGE_SIZE
        );

        let header = InternalHeader::from_bytes_mut(data)?;
        header.node_type = NodeType::Internal.as_byte();
        header.is_root = 0;
        header.parent = U32::new(0);
        header.num_keys = U32::new(0);
        header.right_child = U32::new(0);

        Ok(Self { data })
    }

    pub fn as_ref(&self) -> InternalNode<'_> {
        InternalNode { data: self.data }
    }

    fn header_mut(&mut self) -> &mut InternalHeader {
        InternalHeader::from_bytes_mut(self.data).unwrap() // INVARIANT: page validated in constructor
    }

    pub fn num_keys(&self) -> u32 {
        self.as_ref().num_keys()
    }

    pub fn set_num_keys(&mut self, num_keys: u32) {
        self.header_mut().num_keys = U32::new(num_keys);
    }

    pub fn right_child(&self) -> u32 {
        self.as_ref().right_child()
    }

    pub fn set_right_child(&mut self, page_num: u32) {
        self.header_mut().right_child = U32::new(page_num);
    }

    pub fn set_is_root(&mut self, is_root: bool) {
        self.header_mut().is_root = u8::from(is_root);
    }

    pub fn set_parent(&mut self, page_num: u32) {
        self.header_mut().parent = U32::new(page_num);
    }

    pub fn set_cell(&mut self, index: usize, child: u32, key: u32) -> Result<()> {
        ensure!(
            index < self.num_keys() as usize,
            "cell index {} out of bounds (num_keys={})",
            index,
            self.num_keys()
        );
        let offset = cell_offset(index);
        let cell = InternalCell::new(child, key);
        self.data[offset..offset + INTERNAL_CELL_SIZE].copy_from_slice(cell.as_bytes());
        Ok(())
    }

    /// Rewrites the separator key at `index`, keeping its child pointer.
    pub fn set_key(&mut self, index: usize, key: u32) -> Result<()> {
        let child = self.as_ref().cell_at(index)?.child();
        self.set_cell(index, child, key)
    }

    /// Inserts a (child, key) cell at `index`, shifting later cells right.
    pub fn insert_cell(&mut self, index: usize, child: u32, key: u32) -> Result<()> {
        let num_keys = self.num_keys() as usize;
        ensure!(num_keys < INTERNAL_MAX_CELLS, "internal node is full");
        ensure!(
            index <= num_keys,
            "insert index {} out of bounds (num_keys={})",
            index,
            num_keys
        );

        for i in (index..num_keys).rev() {
            let src = cell_offset(i);
            let dst = cell_offset(i + 1);
            self.data.copy_within(src..src + INTERNAL_CELL_SIZE, dst);
        }

        self.set_num_keys(num_keys as u32 + 1);
        self.set_cell(index, child, key)?;
        Ok(())
    }
}

fn cell_offset(index: usize) -> usize {
    INTERNAL_HEADER_SIZE + index * INTERNAL_CELL_SIZE
}
