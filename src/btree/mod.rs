//! # B+Tree Index
//!
//! A disk-persistent B+Tree organized into fixed-size pages. The module
//! splits into pure codecs and the algorithms over them:
//!
//! - [`node`]: the 6-byte common header shared by both node variants
//! - [`leaf`]: leaf pages holding packed key-value cells, chained through
//!   `next_leaf` for ordered scans
//! - [`internal`]: internal pages holding separator keys and child pointers
//! - [`tree`]: search, insert, split, and parent-link maintenance
//! - [`cursor`]: a plain-value position within the leaf layer
//!
//! ## Node Variants
//!
//! Byte 0 of every node page discriminates leaf from internal. Both variants
//! share the common header (type, root flag, parent pointer) and extend it
//! with their own fields. All integers are little-endian at fixed offsets;
//! the codecs are zerocopy views over the raw page buffer.
//!
//! ## Capacity
//!
//! With 4096-byte pages and 291-byte row values a leaf holds 13 cells.
//! Internal nodes are capped at 3 keys (4 children), which keeps the whole
//! tree small enough to exercise every split path from a terminal session.

mod cursor;
mod internal;
mod leaf;
mod node;
mod tree;

pub use cursor::Cursor;
pub use internal::{
    InternalCell, InternalNode, InternalNodeMut, INTERNAL_CELL_SIZE, INTERNAL_HEADER_SIZE,
    INTERNAL_MAX_CELLS,
};
pub use leaf::{
    LeafNode, LeafNodeMut, SearchResult, LEAF_CELL_SIZE, LEAF_HEADER_SIZE, LEAF_KEY_SIZE,
    LEAF_LEFT_SPLIT_COUNT, LEAF_MAX_CELLS, LEAF_RIGHT_SPLIT_COUNT, LEAF_SPACE_FOR_CELLS,
    LEAF_VALUE_SIZE,
};
pub use node::{node_type, NodeHeader, NodeType, COMMON_HEADER_SIZE};
pub use tree::{BTree, InsertOutcome};
