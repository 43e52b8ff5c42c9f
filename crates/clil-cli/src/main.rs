//! Main entry point for the CLIL CLI

use clap::Parser;
use clap_verbosity_flag::LevelFilter;
use clil_cli::{cli::Args, output::print_error};
use color_eyre::eyre::{eyre, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::config::HookBuilder::default()
        .display_location_section(false)
        .display_env_section(false)
        .install()?;

    match args.verbosity.log_level_filter() {
        LevelFilter::Off | LevelFilter::Error => {}
        _ => {
            std::env::set_var("RUST_LIB_BACKTRACE", "1");
        }
    }

    // Silent unless -v or RUST_LOG asks for output
    clil_common::logging::init_cli_logging(&args.verbosity, "clil_cli=error,clil_sdk=error")
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

    let verbose = args.verbosity.log_level().is_some();
    match args.run().await {
        Ok(()) => Ok(()),
        Err(err) if !verbose => {
            print_error(&err.to_string());
            std::process::exit(err.exit_code());
        }
        Err(err) => Err(err.into()),
    }
}
