use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use minesweepr::json::{solve_json, SolveRequest};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON SolveRequest document; reads stdin if omitted.
    request: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let body = match cli.request {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading request from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading request from stdin")?;
            buf
        }
    };

    let request: SolveRequest =
        serde_json::from_str(&body).context("parsing request as JSON")?;
    let response = solve_json(&request);

    let reply = serde_json::to_string_pretty(&response).context("serializing response")?;
    println!("{reply}");

    if response.solution.is_none() {
        anyhow::bail!("solver could not produce a solution for this request");
    }

    Ok(())
}
