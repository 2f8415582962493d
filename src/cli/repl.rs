//! # REPL - Read-Eval-Print Loop
//!
//! The interactive front-end. Each input line is either a dotted
//! meta-command (dispatched immediately) or a statement (prepared, then
//! executed). Preparation and execution failures print a diagnostic and the
//! loop continues; I/O and invariant violations propagate out as errors and
//! terminate the process.
//!
//! The loop is generic over its reader and writer so the end-to-end suites
//! can drive it with in-memory buffers. The binary wires it to locked
//! stdin/stdout.
//!
//! ## Exit Paths
//!
//! `.exit` and end-of-input both flush and close the table before the loop
//! returns; that close is the only point at which buffered pages are
//! guaranteed to reach disk.

use std::io::{BufRead, Write};

use eyre::Result;

use crate::cli::commands::{CommandHandler, CommandResult};
use crate::cli::statement::{ExecuteOutcome, PrepareError, Statement};
use crate::table::Table;

const PROMPT: &str = "db > ";

pub struct Repl<R, W> {
    table: Table,
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Repl<R, W> {
    pub fn new(table: Table, input: R, out: W) -> Self {
        Self { table, input, out }
    }

    pub fn run(&mut self) -> Result<()> {
        self.print_banner()?;

        loop {
            write!(self.out, "{}", PROMPT)?;
            self.out.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                // End of input closes the table like `.exit` would, so
                // buffered pages still reach disk.
                self.table.close()?;
                return Ok(());
            }

            let line = line.trim_end_matches(['\r', '\n']);
            if !self.handle_line(line)? {
                self.table.close()?;
                return Ok(());
            }
        }
    }

    /// Processes one input line. Returns `false` when the loop should stop.
    fn handle_line(&mut self, line: &str) -> Result<bool> {
        if line.is_empty() {
            return Ok(true);
        }

        if CommandHandler::is_command(line) {
            return match CommandHandler::execute(line, &mut self.table)? {
                CommandResult::Exit => Ok(false),
                CommandResult::Output(text) => {
                    write!(self.out, "{}", text)?;
                    Ok(true)
                }
                CommandResult::Unrecognized => {
                    writeln!(self.out, "Unrecognized command '{}'.", line)?;
                    Ok(true)
                }
            };
        }

        let statement = match Statement::prepare(line) {
            Ok(statement) => statement,
            Err(PrepareError::SyntaxError) => {
                writeln!(self.out, "Syntax error. Could not parse statement.")?;
                return Ok(true);
            }
            Err(PrepareError::StringTooLong) => {
                writeln!(self.out, "String is too long.")?;
                return Ok(true);
            }
            Err(PrepareError::Unrecognized) => {
                writeln!(self.out, "Unrecognized command '{}'.", line)?;
                return Ok(true);
            }
        };

        match statement.execute(&mut self.table, &mut self.out)? {
            ExecuteOutcome::Success => writeln!(self.out, "Executed.")?,
            ExecuteOutcome::DuplicateKey => writeln!(self.out, "Error: Duplicate key.")?,
            ExecuteOutcome::TableFull => writeln!(self.out, "Error: Table full.")?,
        }

        Ok(true)
    }

    fn print_banner(&mut self) -> Result<()> {
        writeln!(self.out, "Simple SQLite")?;
        writeln!(self.out, "---------------------")?;
        Ok(())
    }
}
