//! Human-readable rendering of verdicts, reports and jobs.

use threatscan_core::{ClassifyReport, LevelSummary, Verdict};
use threatscan_host::{JobRecord, JobState};

const TEXT_PREVIEW: usize = 72;

/// Print a classification report: one row per verdict, then a summary.
pub fn print_report(report: &ClassifyReport) {
    let origin = if report.cache_hit { "cached" } else { "classified" };
    println!("=== {} ({origin}) ===", report.source_id);
    print_verdicts(&report.results);
    println!();
    if !report.cache_hit {
        println!(
            "  windows {:<6} dropped {:<6} kept {}",
            report.windows,
            report.dropped_windows,
            report.results.len()
        );
    }
    print_summary(&report.results);
}

pub fn print_verdicts(verdicts: &[Verdict]) {
    if verdicts.is_empty() {
        println!("  (no verdicts)");
        return;
    }
    for (i, v) in verdicts.iter().enumerate() {
        println!("  {:>4}  {:<14} {}", i + 1, v.threat_level, preview(&v.source_text));
    }
}

pub fn print_verdict(v: &Verdict) {
    println!("  {:<14} {}", "status", v.status.as_str());
    println!("  {:<14} {}", "threat_level", v.threat_level);
    println!("  {:<14} {}", "justification", v.justification.trim());
    if let Some(err) = &v.error {
        println!("  {:<14} {}", "error", err);
    }
}

pub fn print_summary(verdicts: &[Verdict]) {
    let summary = LevelSummary::from_verdicts(verdicts);
    for (level, count) in &summary.counts {
        println!("  {:<14} {}", level.as_str(), count);
    }
    if summary.unrecognized > 0 {
        println!("  {:<14} {}", "(unrecognized)", summary.unrecognized);
    }
    if let Some(highest) = summary.highest() {
        println!("  highest level: {highest}");
    }
}

pub fn print_jobs(jobs: &[JobRecord]) {
    for job in jobs {
        let detail = match &job.state {
            JobState::Pending => "pending".to_string(),
            JobState::InProgress => "in progress".to_string(),
            JobState::Complete { report, delivered } => {
                let mut s = format!(
                    "complete: {} verdicts, {} dropped{}",
                    report.results.len(),
                    report.dropped_windows,
                    if report.cache_hit { ", cached" } else { "" }
                );
                match delivered {
                    Some(true) => s.push_str(", delivered"),
                    Some(false) => s.push_str(", delivery failed"),
                    None => {}
                }
                s
            }
            JobState::Failed { error } => format!("failed: {error}"),
        };
        println!("  {}  {:<32} {detail}", job.id, job.source_id);
    }
}

fn preview(text: &str) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= TEXT_PREVIEW {
        return flat;
    }
    let cut: String = flat.chars().take(TEXT_PREVIEW - 3).collect();
    format!("{cut}...")
}
