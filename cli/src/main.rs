use anyhow::Result;
use clap::Parser;
use docrag_cli::{Cli, run};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();

    run(Cli::parse()).await
}
