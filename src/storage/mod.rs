//! # Storage Module
//!
//! The foundational storage layer: a file-backed [`Pager`] that materializes
//! fixed-size pages on demand and writes them back on close.
//!
//! Unlike mmap-based engines, the pager does explicit `seek`/`read`/`write`
//! I/O and keeps each loaded page in an owned heap buffer. That keeps the
//! durability boundary trivial to reason about: a page reaches disk exactly
//! when it is flushed, and the whole cache is flushed on close.
//!
//! ## Page Size
//!
//! All storage uses 4096-byte pages, the atomic unit of disk I/O. The file
//! grows by whole pages and is never truncated.

mod pager;

pub use pager::{PageBuf, Pager};

pub const PAGE_SIZE: usize = 4096;
pub const TABLE_MAX_PAGES: usize = 100;
