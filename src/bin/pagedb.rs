//! # pagedb CLI Entry Point
//!
//! ```bash
//! pagedb ./mydb.db
//! ```
//!
//! Takes a single positional argument, the database file path, then reads
//! commands from stdin until `.exit` or end of input. Fatal I/O and
//! invariant errors print a diagnostic to stderr and exit non-zero.

use std::env;
use std::io;

use eyre::Result;
use pagedb::cli::Repl;
use pagedb::Table;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let path = match args.next() {
        Some(path) => path,
        None => {
            println!("Must supply a database filename.");
            std::process::exit(1);
        }
    };

    let table = Table::open(&path)?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut repl = Repl::new(table, stdin.lock(), stdout.lock());
    repl.run()
}
