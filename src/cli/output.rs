//! CLI output formatting utilities.

use crate::ingest::{IngestReport, IngestStatus};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print one ingested item.
    pub fn item_info(title: &str, id: &str, kind: &str, status: Option<&str>, vectors: usize) {
        println!(
            "  {} {} ({}, {}, {} vectors, {})",
            style("*").cyan(),
            style(title).bold(),
            style(id).dim(),
            kind,
            vectors,
            status.unwrap_or("not ingested")
        );
    }

    /// Print the outcome of one ingestion.
    pub fn report(report: &IngestReport) {
        let line = format!(
            "{} [{}] {}/{} chunks{}",
            report.content_id,
            report.status,
            report.vector_ids.len(),
            report.total_chunks,
            report
                .namespace
                .as_deref()
                .map(|ns| format!(" into {}", ns))
                .unwrap_or_default()
        );

        match report.status {
            IngestStatus::Complete => Self::success(&line),
            IngestStatus::Partial => {
                Self::warning(&line);
                for failure in &report.failures {
                    Self::kv(&format!("chunk {}", failure.index), &failure.error);
                }
            }
            IngestStatus::Failed => Self::error(&format!(
                "{} failed at {}: {}",
                report.content_id,
                report.stage,
                report.error.as_deref().unwrap_or("unknown error")
            )),
        }
    }

    /// Print a summary line for many reports.
    pub fn report_summary(reports: &[IngestReport]) {
        let count = |status: IngestStatus| reports.iter().filter(|r| r.status == status).count();
        Self::header("Summary");
        Self::kv("Complete", &count(IngestStatus::Complete).to_string());
        Self::kv("Partial", &count(IngestStatus::Partial).to_string());
        Self::kv("Failed", &count(IngestStatus::Failed).to_string());
    }

    /// Print search result.
    pub fn search_result(title: &str, score: f32, content: &str, url: Option<&str>) {
        println!(
            "\n{} {} (score: {:.2})",
            style(">>").green(),
            style(title).bold(),
            score
        );
        println!("   {}", content_preview(content, 200));
        if let Some(u) = url {
            println!("   {}", style(u).dim());
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(template);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview_counts_chars() {
        assert_eq!(content_preview("line one\nline two", 50), "line one line two");
        assert_eq!(content_preview("café au lait", 4), "café...");
    }
}
