//! stackbuild CLI entry point
//!
//! Parses the command line, runs the command, and renders failures with
//! [`user_friendly_error`] before exiting with status 1.
//!
//! - `build` - build every resource in the stack document
//! - `validate` - check the stack document without provisioning
//! - `names` - print each resource's physical name

use anyhow::Result;
use clap::Parser;
use stackbuild_cli::cli;
use stackbuild_cli::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
