//! # pagedb - Embedded Single-Table B+Tree Store
//!
//! pagedb is a small embedded relational store: one table, one disk file,
//! one B+Tree. It exists to show, end to end, how a page-cached storage
//! engine threads together a pager, a cursor abstraction, a B+Tree organized
//! into fixed-size pages, and a minimal SQL-like command surface.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        CLI / REPL (src/cli)         │
//! ├─────────────────────────────────────┤
//! │     Table lifecycle (src/table)     │
//! ├─────────────────────────────────────┤
//! │      B+Tree + Cursor (src/btree)    │
//! ├─────────────────────────────────────┤
//! │  Row codec (src/row) │ Node codecs  │
//! ├─────────────────────────────────────┤
//! │    Pager + page cache (src/storage) │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! The database is a single file of 4096-byte pages. Page 0 always holds the
//! root node; there is no separate file header. All multi-byte integers are
//! little-endian.
//!
//! ## Module Overview
//!
//! - [`storage`]: file-backed pager with an in-memory page cache
//! - [`btree`]: node codecs, B+Tree search/insert/split, ordered cursors
//! - [`row`]: fixed-width row serialization (id, username, email)
//! - [`table`]: open/close lifecycle binding a pager to the root page
//! - [`cli`]: statement parsing, meta-commands, and the interactive loop
//!
//! ## Concurrency Model
//!
//! The engine is strictly single-threaded and synchronous. Durability is
//! reached only through `Table::close`; there is no WAL and no intermediate
//! checkpoint.

pub mod btree;
pub mod cli;
pub mod row;
pub mod storage;
pub mod table;

pub use row::Row;
pub use table::Table;
