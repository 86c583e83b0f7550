//! supabase-cli: one-shot commands against a Supabase project.
//!
//! Results print as pretty JSON on stdout. On failure the message goes to
//! stderr and the process exits with the library's numeric error code.

#![allow(
    missing_docs,
    missing_debug_implementations,
    clippy::print_stderr,
    clippy::print_stdout
)]

mod cmd;

use std::process;

use clap::Parser;
use serde_json::Value;

use crate::cmd::Cli;

fn main() {
    match cmd::run(Cli::parse()) {
        Ok(Value::Null) => {}
        Ok(Value::String(s)) => println!("{s}"),
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(e.code().map_or(1, |c| c as i32));
        }
    }
}
