//! FACEIT Overwatch match statistics
//!
//! Downloads FACEIT Overwatch 2 championship matches, normalises the raw
//! payloads into a matches table and a per-round players table, removes
//! incomplete or implausible matches, apportions each match's playing time
//! across its rounds and scores every player round.
//!
//! ## Pipeline
//!
//! 1. **Extract**: flatten match details and match stats payloads
//! 2. **Build**: canonical columns, type coercion, backfilled defaults
//! 3. **Filter**: completeness and plausibility checks per match
//! 4. **Allocate**: round durations proportional to points scored
//! 5. **Score**: per-10-minute rates and a role-weighted value score
//!
//! Matches that fail a stage are dropped as a unit and counted in a
//! [`BatchReport`]; a batch never fails because of bad data.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use faceit_ow::{Pipeline, PipelineConfig, RawMatchPayload, TracingTelemetry};
//! use serde_json::json;
//!
//! let pipeline = Pipeline::new(PipelineConfig::default(), TracingTelemetry::shared());
//! let output = pipeline.run(vec![RawMatchPayload::new(
//!     json!({"match_id": "1-abc"}),
//!     json!({"rounds": []}),
//! )]);
//! println!("{}", output.report);
//! ```
//!
//! ## Environment Configuration
//!
//! ```bash
//! export FACEIT_API_KEY=...           # required by `ingest`
//! export FACEIT_OW_DB=./overwatch.db  # optional database location
//! ```

pub mod cli;
pub mod commands;
pub mod core;
pub mod error;
pub mod faceit;
pub mod pipeline;
pub mod storage;

// Re-export commonly used types
pub use cli::types::{ChampionshipId, MapType, MatchId, Role, RoundSelection};
pub use error::{PipelineError, Result};
pub use pipeline::{
    BatchReport, DropReason, MatchRecord, Pipeline, PipelineConfig, PipelineEvent,
    PipelineOutput, PlayerRound, RawMatchPayload, RecordingTelemetry, Tables, Telemetry,
    TracingTelemetry,
};
pub use storage::{MatchDatabase, Sink};

pub const API_KEY_ENV_VAR: &str = "FACEIT_API_KEY";
pub const DATABASE_ENV_VAR: &str = "FACEIT_OW_DB";
