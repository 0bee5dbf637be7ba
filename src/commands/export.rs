//! Export command: stored player rows in long format.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use crate::{
    storage::{write_json_lines, MatchDatabase},
    Result,
};

use super::common::resolve_database_path;

/// Handle the export command
pub fn handle_export(
    db: Option<PathBuf>,
    player: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let db = MatchDatabase::open(&resolve_database_path(db)?)?;
    let rows = db.long_format(player.as_deref())?;

    let written = match &output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating export file {}", path.display()))?;
            write_json_lines(&rows, BufWriter::new(file))?
        }
        None => write_json_lines(&rows, io::stdout().lock())?,
    };

    info!(rows = written, player = ?player, "export finished");
    Ok(())
}
