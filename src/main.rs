//! Entry point: parse CLI, install logging and dispatch to command handlers.

use clap::Parser;
use faceit_ow::{
    cli::{App, Commands},
    commands::{
        export::handle_export,
        ingest::{handle_ingest, IngestParams},
        process::{handle_process, ProcessParams},
    },
    Result,
};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run the CLI.
#[tokio::main]
async fn main() -> Result<()> {
    let app = App::parse();
    init_logging(app.verbose);

    match app.command {
        Commands::Ingest {
            championship,
            api_key,
            refresh,
            limit,
            pipeline,
        } => {
            handle_ingest(IngestParams {
                championship,
                api_key,
                refresh,
                limit,
                config: pipeline.config(),
                db: pipeline.db,
                dry_run: pipeline.dry_run,
                as_json: pipeline.json,
            })
            .await?
        }

        Commands::Process { input, pipeline } => handle_process(ProcessParams {
            input,
            config: pipeline.config(),
            db: pipeline.db,
            dry_run: pipeline.dry_run,
            as_json: pipeline.json,
        })?,

        Commands::Export { db, player, output } => handle_export(db, player, output)?,
    }

    Ok(())
}
