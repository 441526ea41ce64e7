use anyhow::Result;
use clap::Parser;
use pdf_stitch::cli;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        // Logging may not be initialized yet (e.g. a bad config file).
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
    Ok(())
}
