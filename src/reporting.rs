// Reporting and output for idox
// Terminal summary plus a timestamped JSON export in the output directory

use crate::stats::RunStatistics;
use chrono::Local;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct SummaryFile<'a> {
    generated_at: String,
    total_attempts: u64,
    #[serde(flatten)]
    stats: &'a RunStatistics,
}

/// Human-readable histogram listing, keys in ascending order.
pub fn render_summary(stats: &RunStatistics) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Requests: {} ({} responses, {} errors)\n",
        stats.total_attempts(),
        stats.total_responses(),
        stats.total_errors()
    ));

    out.push_str("Status codes:\n");
    if stats.seen_codes.is_empty() {
        out.push_str("  none\n");
    }
    for (code, count) in &stats.seen_codes {
        out.push_str(&format!("  {}: {}\n", code, count));
    }

    out.push_str("Errors:\n");
    if stats.seen_errors.is_empty() {
        out.push_str("  none\n");
    }
    for (kind, count) in &stats.seen_errors {
        out.push_str(&format!("  {}: {}\n", kind, count));
    }
    out
}

/// Write `idox_summary_<timestamp>.json` under `dir` and return its path.
pub fn export_summary(stats: &RunStatistics, dir: &Path) -> Result<PathBuf, std::io::Error> {
    let now = Local::now();
    let path = dir.join(format!("idox_summary_{}.json", now.format("%Y%m%d_%H%M%S")));
    let summary = SummaryFile {
        generated_at: now.to_rfc3339(),
        total_attempts: stats.total_attempts(),
        stats,
    };

    let mut file = File::create(&path)?;
    serde_json::to_writer_pretty(&mut file, &summary)?;
    writeln!(file)?;
    Ok(path)
}
