use crate::error::CliError;
use engine_core::{
    progress::PipelineStatus,
    state::models::{RunOutcome, StoredRecord},
};
use engine_runtime::driver::RunReport;
use serde::Serialize;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn date_or_none(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "none".to_string())
}

pub fn print_run(report: &RunReport, as_json: bool) -> Result<(), CliError> {
    if as_json {
        return print_json(report);
    }

    println!("Run '{}':", report.run_id);
    println!("-----------------------------");
    println!("{:<16} {}", "Window", report.window);
    println!("{:<16} {}", "Watermark", date_or_none(report.watermark_before));
    println!("{:<16} {}", "New dates", report.new_dates.len());
    let outcome = match &report.outcome {
        RunOutcome::NoNewData => "no new data".to_string(),
        RunOutcome::Committed { records, failed } => {
            format!("{records} record(s) committed, {failed} skipped")
        }
        RunOutcome::NothingExtracted { failed } => format!("all {failed} image(s) failed"),
        RunOutcome::Failed { error } => format!("failed: {error}"),
    };
    println!("{:<16} {}", "Outcome", outcome);
    if let Some(commit) = &report.commit {
        println!("{:<16} {}", "Batch", commit.batch_id);
        if let Some(path) = &commit.artifact {
            println!("{:<16} {}", "Artifact", path.display());
        }
    }
    println!("{:<16} {}", "Watermark now", date_or_none(report.watermark_after()));
    for failed in &report.failed {
        println!("  skipped {} ({}): {}", failed.date, failed.image_id, failed.reason);
    }
    Ok(())
}

pub fn print_status(status: &PipelineStatus, as_json: bool) -> Result<(), CliError> {
    if as_json {
        return print_json(status);
    }

    println!("{:<16} {}", "Watermark", date_or_none(status.watermark));
    match &status.latest_run {
        None => println!("{:<16} never", "Latest run"),
        Some(run) => {
            println!("{:<16} {}", "Latest run", run.run_id);
            println!("{:<16} {}", "Stage", run.stage);
            let started = run
                .started_at
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_else(|| "n/a".to_string());
            println!("{:<16} {}", "Started", started);
            println!("{:<16} {}", "Committed", run.committed);
            if let Some(error) = &run.error {
                println!("{:<16} {}", "Error", error);
            }
        }
    }

    if status.gaps.is_empty() {
        println!("{:<16} none", "Gaps");
    } else {
        println!("Gaps (failed dates at or below the watermark):");
        for gap in &status.gaps {
            println!("  {} {} ({})", gap.date, gap.image_id, gap.reason);
        }
    }
    Ok(())
}

pub fn print_history(records: &[StoredRecord], as_json: bool) -> Result<(), CliError> {
    if as_json {
        return print_json(records);
    }

    println!("{:<12} {:>12}  {}", "Date", "Value", "Class");
    for stored in records {
        let value = stored
            .record
            .value
            .map(|v| format!("{v:.4}"))
            .unwrap_or_else(|| "-".to_string());
        println!("{:<12} {:>12}  {}", stored.record.date, value, stored.record.label);
    }
    Ok(())
}
