//! # Common Node Header
//!
//! Every page that holds a tree node starts with the same 6-byte header:
//!
//! ```text
//! Offset  Size  Field        Description
//! ------  ----  -----------  ---------------------------------
//! 0       1     node_type    0 = internal, 1 = leaf
//! 1       1     is_root      0/1 flag
//! 2       4     parent       page number of the parent node
//! ```
//!
//! The leaf and internal codecs extend this header with their own fields;
//! this module owns the shared prefix and the node-type discriminant used
//! to pick the right view for a page.

use eyre::{bail, ensure, Result};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

pub const COMMON_HEADER_SIZE: usize = 6;

const NODE_TYPE_INTERNAL: u8 = 0;
const NODE_TYPE_LEAF: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Internal,
    Leaf,
}

impl NodeType {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            NODE_TYPE_INTERNAL => Ok(NodeType::Internal),
            NODE_TYPE_LEAF => Ok(NodeType::Leaf),
            other => bail!("unknown node type byte: {:#04x}", other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            NodeType::Internal => NODE_TYPE_INTERNAL,
            NodeType::Leaf => NODE_TYPE_LEAF,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct NodeHeader {
    node_type: u8,
    is_root: u8,
    parent: U32,
}

const _: () = assert!(std::mem::size_of::<NodeHeader>() == COMMON_HEADER_SIZE);

impl NodeHeader {
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        ensure!(
            data.len() >= COMMON_HEADER_SIZE,
            "buffer too small for NodeHeader: {} < {}",
            data.len(),
            COMMON_HEADER_SIZE
        );

        Self::ref_from_bytes(&data[..COMMON_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read NodeHeader: {:?}", e))
    }

    pub fn from_bytes_mut(data: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            data.len() >= COMMON_HEADER_SIZE,
            "buffer too small for NodeHeader: {} < {}",
            data.len(),
            COMMON_HEADER_SIZE
        );

        Self::mut_from_bytes(&mut data[..COMMON_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read NodeHeader: {:?}", e))
    }

    pub fn node_type(&self) -> Result<NodeType> {
        NodeType::from_byte(self.node_type)
    }

    pub fn set_node_type(&mut self, node_type: NodeType) {
        self.node_type = node_type.as_byte();
    }

    pub fn is_root(&self) -> bool {
        self.is_root != 0
    }

    pub fn set_is_root(&mut self, is_root: bool) {
        self.is_root = u8::from(is_root);
    }

    pub fn parent(&self) -> u32 {
        self.parent.get()
    }

    pub fn set_parent(&mut self, page_num: u32) {
        self.parent = U32::new(page_num);
    }
}

/// Reads the node-type discriminant of a page.
pub fn node_type(page: &[u8]) -> Result<NodeType> {
    NodeHeader::from_bytes(page)?.node_type()
}
