use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = supplier_recon_cli::Cli::parse();
    supplier_recon_cli::run_cli(cli)
}
