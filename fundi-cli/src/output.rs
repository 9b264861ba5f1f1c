//! Output formatting for the `fundi` commands

use std::io::{self, Write};

use anyhow::Result;
use libfundi::types::{Category, Fundi, Job, JobApplication, Portfolio};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, one record per line
    Text,
    /// JSON array (or object for single records)
    Json,
    /// One JSON object per line
    Jsonl,
    /// CSV with a header row
    Csv,
}

/// A record that can be printed in every output format
pub trait Row: Serialize {
    fn headers() -> &'static [&'static str];
    fn fields(&self) -> Vec<String>;
    fn text(&self) -> String;
}

pub fn print_records<R: Row>(records: &[R], format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_records(&mut out, records, format)
}

pub fn print_record<R: Row>(record: &R, format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(record)?)?;
            Ok(())
        }
        _ => write_records(&mut out, std::slice::from_ref(record), format),
    }
}

pub fn write_records<W: Write, R: Row>(out: &mut W, records: &[R], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(records)?)?;
        }
        OutputFormat::Jsonl => {
            for record in records {
                writeln!(out, "{}", serde_json::to_string(record)?)?;
            }
        }
        OutputFormat::Csv => {
            writeln!(out, "{}", R::headers().join(","))?;
            for record in records {
                let fields: Vec<String> = record.fields().iter().map(|f| csv_field(f)).collect();
                writeln!(out, "{}", fields.join(","))?;
            }
        }
        OutputFormat::Text => {
            // Empty results print nothing
            for record in records {
                writeln!(out, "{}", record.text())?;
            }
        }
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn amount(value: Option<f64>) -> String {
    value.map(|v| format!("{:.0}", v)).unwrap_or_default()
}

fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

impl Row for Job {
    fn headers() -> &'static [&'static str] {
        &["id", "status", "title", "category", "budget", "location", "applications"]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.status.to_string(),
            self.title.clone(),
            self.category.clone(),
            amount(self.budget),
            self.location.clone().unwrap_or_default(),
            self.applications_count.to_string(),
        ]
    }

    fn text(&self) -> String {
        let budget = self
            .budget
            .map(|b| format!("KES {:.0}", b))
            .unwrap_or_else(|| "no budget".to_string());
        format!(
            "{} | {} | {} | {} | {}",
            self.id,
            self.status,
            preview(&self.title, 60),
            self.category,
            budget
        )
    }
}

impl Row for JobApplication {
    fn headers() -> &'static [&'static str] {
        &["id", "job_id", "fundi_id", "status", "total", "estimated_days", "message"]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.job_id.to_string(),
            self.fundi_id.to_string(),
            self.status.to_string(),
            format!("{:.2}", self.proposed_budget.total()),
            self.estimated_days.to_string(),
            self.message.clone(),
        ]
    }

    fn text(&self) -> String {
        let fundi = self
            .fundi
            .as_ref()
            .and_then(|f| f.profile())
            .map(|f| f.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("fundi {}", self.fundi_id));
        format!(
            "{} | {} | {} | KES {:.0} | {} days",
            self.id,
            self.status,
            fundi,
            self.proposed_budget.total(),
            self.estimated_days
        )
    }
}

impl Row for Fundi {
    fn headers() -> &'static [&'static str] {
        &["id", "name", "category", "location", "rating", "available", "verified"]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.category.clone().unwrap_or_default(),
            self.location.clone().unwrap_or_default(),
            self.rating.map(|r| format!("{:.1}", r)).unwrap_or_default(),
            self.is_available.to_string(),
            self.is_verified.to_string(),
        ]
    }

    fn text(&self) -> String {
        let rating = self
            .rating
            .map(|r| format!("{:.1} ({} reviews)", r, self.review_count))
            .unwrap_or_else(|| "unrated".to_string());
        let verified = if self.is_verified { " ✓" } else { "" };
        format!(
            "{} | {}{} | {} | {}",
            self.id,
            self.name,
            verified,
            self.skills.join(", "),
            rating
        )
    }
}

impl Row for Portfolio {
    fn headers() -> &'static [&'static str] {
        &["id", "fundi_id", "title", "category", "cost", "duration_days", "media"]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.fundi_id.to_string(),
            self.title.clone(),
            self.category.clone().unwrap_or_default(),
            amount(self.cost),
            self.duration_days.map(|d| d.to_string()).unwrap_or_default(),
            self.media_urls.len().to_string(),
        ]
    }

    fn text(&self) -> String {
        format!(
            "{} | fundi {} | {} | {}",
            self.id,
            self.fundi_id,
            preview(&self.title, 60),
            self.category.as_deref().unwrap_or("uncategorised")
        )
    }
}

impl Row for Category {
    fn headers() -> &'static [&'static str] {
        &["id", "name", "slug"]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.slug.clone().unwrap_or_default(),
        ]
    }

    fn text(&self) -> String {
        format!("{} | {}", self.id, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jobs() -> Vec<Job> {
        serde_json::from_value(serde_json::json!([
            {"id": 1, "title": "Fix sink, urgent", "category": "Plumbing", "budget": 2500, "status": "open"},
            {"id": 2, "title": "Paint \"blue\" room", "category": "Painting", "status": "in_progress"}
        ]))
        .unwrap()
    }

    fn render(format: OutputFormat) -> String {
        let mut out = Vec::new();
        write_records(&mut out, &jobs(), format).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_csv_escapes_fields() {
        let csv = render(OutputFormat::Csv);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "id,status,title,category,budget,location,applications");
        assert_eq!(lines[1], "1,open,\"Fix sink, urgent\",Plumbing,2500,,0");
        assert_eq!(lines[2], "2,in_progress,\"Paint \"\"blue\"\" room\",Painting,,,0");
    }

    #[test]
    fn test_jsonl_one_object_per_line() {
        let jsonl = render(OutputFormat::Jsonl);
        let lines: Vec<&str> = jsonl.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["id"], "1");
    }

    #[test]
    fn test_text_rows() {
        let text = render(OutputFormat::Text);
        assert!(text.starts_with("1 | open | Fix sink, urgent | Plumbing | KES 2500"));
        assert!(text.contains("no budget"));
    }

    #[test]
    fn test_empty_text_prints_nothing() {
        let mut out = Vec::new();
        write_records::<_, Job>(&mut out, &[], OutputFormat::Text).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_preview_truncates_on_chars() {
        assert_eq!(preview("ñandú", 3), "ñan...");
        assert_eq!(preview("short", 10), "short");
    }
}
