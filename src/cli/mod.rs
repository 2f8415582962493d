//! # CLI Module
//!
//! The thin glue around the storage engine: statement preparation, dotted
//! meta-commands, and the read-eval-print loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │                  REPL Loop                     │
//! │  prompt → read line → dispatch → print result  │
//! ├───────────────────────┬────────────────────────┤
//! │   Meta-commands       │   Statements           │
//! │  (.exit, .btree,      │  (insert ..., select)  │
//! │   .constants)         │                        │
//! └───────────────────────┴────────────────────────┘
//! ```
//!
//! All user-visible strings live here; the engine below reports outcomes as
//! enums and never prints.

pub mod commands;
pub mod repl;
pub mod statement;

pub use repl::Repl;
