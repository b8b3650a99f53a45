//! Output helpers: JSON data on stdout, notices on stderr.

use std::io::Write;

use anyhow::Result;
use serde_json::Value;

use crate::opts::GlobalOpts;

pub fn print_success(opts: &GlobalOpts, data: Value, warnings: Vec<String>) -> Result<()> {
    if !opts.quiet {
        let mut stderr = std::io::stderr();
        for w in warnings {
            writeln!(stderr, "notice: {w}")?;
        }
    }
    if opts.pretty {
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("{}", serde_json::to_string(&data)?);
    }
    Ok(())
}
