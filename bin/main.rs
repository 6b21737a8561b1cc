//! Catalog CLI Entry Point
//!
//! This binary provides the command-line interface for the product store.

mod cli;

use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
