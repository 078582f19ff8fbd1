use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "verityd",
    about = "Verity content verifier: promotes downloaded objects once their digest checks out",
    version,
)]
pub struct Cli {
    /// TOML configuration file; built-in defaults are used when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
