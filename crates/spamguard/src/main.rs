use clap::Parser as _;
use spamguard::{setup_logging, App, Args};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_file)?;

    App::run(args).await
}
