//! # Statement Parsing and Execution
//!
//! The statement surface is two command words:
//!
//! - `insert <id> <username> <email>` inserts one row
//! - `select` prints every row in ascending id order
//!
//! Preparation failures (bad syntax, overlong strings, unknown words) are
//! plain enum values the REPL reports before continuing; only I/O and
//! invariant violations travel as errors.

use std::io::Write;

use eyre::Result;

use crate::btree::InsertOutcome;
use crate::row::{Row, EMAIL_SIZE, USERNAME_SIZE};
use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareError {
    /// The insert arguments could not be read.
    SyntaxError,
    /// Username or email exceeds its column width.
    StringTooLong,
    /// Unknown command word.
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteOutcome {
    Success,
    DuplicateKey,
    TableFull,
}

impl Statement {
    pub fn prepare(input: &str) -> Result<Statement, PrepareError> {
        let mut parts = input.split_whitespace();

        match parts.next() {
            Some("insert") => {
                let id = parts.next().ok_or(PrepareError::SyntaxError)?;
                let username = parts.next().ok_or(PrepareError::SyntaxError)?;
                let email = parts.next().ok_or(PrepareError::SyntaxError)?;

                let id: u32 = id.parse().map_err(|_| PrepareError::SyntaxError)?;
                if username.len() > USERNAME_SIZE || email.len() > EMAIL_SIZE {
                    return Err(PrepareError::StringTooLong);
                }

                Ok(Statement::Insert(Row::new(id, username, email)))
            }
            Some("select") => Ok(Statement::Select),
            _ => Err(PrepareError::Unrecognized),
        }
    }

    /// Runs the statement against `table`, writing any row output to `out`.
    pub fn execute<W: Write>(&self, table: &mut Table, out: &mut W) -> Result<ExecuteOutcome> {
        match self {
            Statement::Insert(row) => Ok(match table.insert(row)? {
                InsertOutcome::Inserted => ExecuteOutcome::Success,
                InsertOutcome::DuplicateKey => ExecuteOutcome::DuplicateKey,
                InsertOutcome::TableFull => ExecuteOutcome::TableFull,
            }),
            Statement::Select => {
                for row in table.select()? {
                    writeln!(out, "{}", row)?;
                }
                Ok(ExecuteOutcome::Success)
            }
        }
    }
}
