use anyhow::Result;
use clap::Parser;
use splitbill::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    splitbill::telemetry::init(&cli.config());
    cli.run().await
}
