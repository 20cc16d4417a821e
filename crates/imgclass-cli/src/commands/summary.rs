//! Per-file CSV summary.

use std::path::Path;

use imgclass_core::{BatchSummary, FileStatus};

pub fn write_summary(path: &Path, summary: &BatchSummary) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["filename", "status", "predicted_class", "processing_time_ms", "error"])?;

    for outcome in &summary.outcomes {
        let filename = outcome.path.display().to_string();
        let elapsed = outcome.elapsed.as_millis().to_string();

        match &outcome.status {
            FileStatus::Classified { predicted_class } => {
                let predicted = predicted_class.map(|c| c.to_string()).unwrap_or_default();
                wtr.write_record([filename.as_str(), "success", predicted.as_str(), elapsed.as_str(), ""])?;
            }
            FileStatus::Failed { error } => {
                wtr.write_record([filename.as_str(), "error", "", elapsed.as_str(), error.as_str()])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
