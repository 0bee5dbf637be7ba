//! CLI argument definitions and parsing.

pub mod types;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use types::{ChampionshipId, RoundSelection};

use crate::pipeline::{quality::DEFAULT_SECONDS_PER_POINT, PipelineConfig};

/// Pipeline and sink arguments shared by the commands that run the pipeline
#[derive(Debug, Args)]
pub struct PipelineArgs {
    /// How a player's rows are matched to the match's rounds
    /// (`mode-mask` or `round-index`).
    #[clap(long, default_value_t = RoundSelection::default())]
    pub round_selection: RoundSelection,

    /// Minimum playing time per adjusted point before a match is treated as
    /// implausible.
    #[clap(long, default_value_t = DEFAULT_SECONDS_PER_POINT)]
    pub seconds_per_point: f64,

    /// Database path (or set `FACEIT_OW_DB`).
    #[clap(long)]
    pub db: Option<PathBuf>,

    /// Run the pipeline without writing to the database.
    #[clap(long)]
    pub dry_run: bool,

    /// Print the run summary as JSON.
    #[clap(long)]
    pub json: bool,
}

impl PipelineArgs {
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            round_selection: self.round_selection,
            seconds_per_point: self.seconds_per_point,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download every match of a championship, process it and store the result.
    Ingest {
        /// FACEIT championship id.
        #[clap(long, short)]
        championship: ChampionshipId,

        /// FACEIT API key (or set `FACEIT_API_KEY`).
        #[clap(long)]
        api_key: Option<String>,

        /// Refetch payloads even if they are cached on disk.
        #[clap(long)]
        refresh: bool,

        /// Only process the first N matches of the championship.
        #[clap(long)]
        limit: Option<usize>,

        #[clap(flatten)]
        pipeline: PipelineArgs,
    },

    /// Process payloads from a local JSON file, or re-score the stored tables.
    ///
    /// The file holds a list of `{"details": ..., "stats": ...}` objects. With no
    /// file, stored matches are reloaded and run through filtering, allocation
    /// and scoring again.
    Process {
        /// JSON file of raw match payloads.
        input: Option<PathBuf>,

        #[clap(flatten)]
        pipeline: PipelineArgs,
    },

    /// Write stored player rows in long format as JSON lines.
    Export {
        /// Database path (or set `FACEIT_OW_DB`).
        #[clap(long)]
        db: Option<PathBuf>,

        /// Only export rows of this nickname.
        #[clap(long, short)]
        player: Option<String>,

        /// Output file; stdout when omitted.
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Parser)]
#[clap(name = "faceit-ow", about = "FACEIT Overwatch match statistics pipeline")]
pub struct App {
    /// Log at debug level (overrides `RUST_LOG`).
    #[clap(long, short, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_defaults() {
        let app = App::try_parse_from(["faceit-ow", "ingest", "-c", "champ-1"]).unwrap();
        let Commands::Ingest {
            championship,
            api_key,
            refresh,
            pipeline,
            ..
        } = app.command
        else {
            panic!("expected ingest");
        };

        assert_eq!(championship.as_str(), "champ-1");
        assert!(api_key.is_none());
        assert!(!refresh);
        assert_eq!(pipeline.config(), PipelineConfig::default());
    }

    #[test]
    fn test_process_with_round_index() {
        let app = App::try_parse_from([
            "faceit-ow",
            "process",
            "matches.json",
            "--round-selection",
            "round-index",
            "--dry-run",
            "-v",
        ])
        .unwrap();

        assert!(app.verbose);
        let Commands::Process { input, pipeline } = app.command else {
            panic!("expected process");
        };
        assert_eq!(input, Some(PathBuf::from("matches.json")));
        assert_eq!(pipeline.round_selection, RoundSelection::RoundIndex);
        assert!(pipeline.dry_run);
    }

    #[test]
    fn test_invalid_round_selection_is_rejected() {
        let result = App::try_parse_from(["faceit-ow", "process", "--round-selection", "random"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_export_args() {
        let app = App::try_parse_from(["faceit-ow", "export", "-p", "kiriko", "-o", "out.jsonl"])
            .unwrap();
        let Commands::Export { db, player, output } = app.command else {
            panic!("expected export");
        };
        assert!(db.is_none());
        assert_eq!(player.as_deref(), Some("kiriko"));
        assert_eq!(output, Some(PathBuf::from("out.jsonl")));
    }
}
