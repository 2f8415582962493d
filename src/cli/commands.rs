//! # Meta-Command Handler
//!
//! Dotted commands sit outside the statement surface and are dispatched
//! before statement preparation:
//!
//! | Command      | Description                                |
//! |--------------|--------------------------------------------|
//! | `.exit`      | flush, close, and leave the process        |
//! | `.btree`     | print the tree structure for debugging     |
//! | `.constants` | print the page layout constants            |
//!
//! Anything else starting with a dot is unrecognized and reported back with
//! the offending input.

use eyre::Result;

use crate::btree::{
    COMMON_HEADER_SIZE, LEAF_CELL_SIZE, LEAF_HEADER_SIZE, LEAF_MAX_CELLS, LEAF_SPACE_FOR_CELLS,
};
use crate::row::ROW_SIZE;
use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Exit,
    Output(String),
    Unrecognized,
}

pub struct CommandHandler;

impl CommandHandler {
    pub fn is_command(input: &str) -> bool {
        input.starts_with('.')
    }

    pub fn execute(input: &str, table: &mut Table) -> Result<CommandResult> {
        match input {
            ".exit" => Ok(CommandResult::Exit),
            ".btree" => {
                let tree = table.btree().render()?;
                Ok(CommandResult::Output(format!("Tree:\n{}", tree)))
            }
            ".constants" => Ok(CommandResult::Output(constants_text())),
            _ => Ok(CommandResult::Unrecognized),
        }
    }
}

fn constants_text() -> String {
    format!(
        "Constants:\n\
         ROW_SIZE: {}\n\
         COMMON_NODE_HEADER_SIZE: {}\n\
         LEAF_NODE_HEADER_SIZE: {}\n\
         LEAF_NODE_CELL_SIZE: {}\n\
         LEAF_NODE_SPACE_FOR_CELLS: {}\n\
         LEAF_NODE_MAX_CELLS: {}\n",
        ROW_SIZE,
        COMMON_HEADER_SIZE,
        LEAF_HEADER_SIZE,
        LEAF_CELL_SIZE,
        LEAF_SPACE_FOR_CELLS,
        LEAF_MAX_CELLS,
    )
}
