use std::fmt::Write as FmtWrite;

use crate::models::{OutputFormat, RetrievalOutcome};
use crate::services::IndexStats;

pub trait Formatter {
    fn format_retrieval(&self, outcome: &RetrievalOutcome) -> String;
    fn format_answer(&self, answer: &str, outcome: &RetrievalOutcome) -> String;
    fn format_index_stats(&self, stats: &IndexStats, duration_ms: u64) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

fn preview(text: &str, max_chars: usize) -> String {
    let head: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        format!("{}...", head)
    } else {
        head
    }
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_retrieval(&self, outcome: &RetrievalOutcome) -> String {
        if outcome.is_empty() {
            return format!("No results found for: {}\n", outcome.query);
        }

        let mut output = String::new();
        writeln!(output, "Search results for: \"{}\"", outcome.query).unwrap();
        writeln!(output, "Found {} results\n", outcome.len()).unwrap();

        for (i, result) in outcome.results.iter().enumerate() {
            writeln!(output, "{}. [Score: {:.4}]", i + 1, result.score).unwrap();
            writeln!(
                output,
                "   Document: {} (offset {})",
                result.payload.source_index, result.payload.offset
            )
            .unwrap();
            writeln!(output, "   ---").unwrap();
            for line in preview(&result.payload.text, 200).lines() {
                writeln!(output, "   {}", line).unwrap();
            }
            writeln!(output).unwrap();
        }

        output
    }

    fn format_answer(&self, answer: &str, _outcome: &RetrievalOutcome) -> String {
        format!("Assistant: {}\n", answer)
    }

    fn format_index_stats(&self, stats: &IndexStats, duration_ms: u64) -> String {
        let mut output = String::new();
        writeln!(output, "Indexing Complete").unwrap();
        writeln!(output, "-----------------").unwrap();
        writeln!(output, "Documents: {}", stats.documents).unwrap();
        writeln!(output, "Chunks created: {}", stats.chunks).unwrap();
        writeln!(output, "Duration: {}ms", duration_ms).unwrap();
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, value: &serde_json::Value) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)) + "\n"
    }
}

impl Formatter for JsonFormatter {
    fn format_retrieval(&self, outcome: &RetrievalOutcome) -> String {
        self.render(&serde_json::json!(outcome))
    }

    fn format_answer(&self, answer: &str, outcome: &RetrievalOutcome) -> String {
        self.render(&serde_json::json!({
            "query": outcome.query,
            "answer": answer,
            "results": outcome.results,
        }))
    }

    fn format_index_stats(&self, stats: &IndexStats, duration_ms: u64) -> String {
        self.render(&serde_json::json!({
            "documents": stats.documents,
            "chunks": stats.chunks,
            "duration_ms": duration_ms,
        }))
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string() + "\n"
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string() + "\n"
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_retrieval(&self, outcome: &RetrievalOutcome) -> String {
        if outcome.is_empty() {
            return format!("## No results found\n\nQuery: `{}`\n", outcome.query);
        }

        let mut output = String::new();
        writeln!(output, "## Search Results\n").unwrap();
        writeln!(output, "**Query:** `{}`\n", outcome.query).unwrap();

        for (i, result) in outcome.results.iter().enumerate() {
            writeln!(output, "### {}. Score: {:.4}\n", i + 1, result.score).unwrap();
            writeln!(
                output,
                "**Document:** {} (offset {})\n",
                result.payload.source_index, result.payload.offset
            )
            .unwrap();
            writeln!(output, "```").unwrap();
            writeln!(output, "{}", result.payload.text).unwrap();
            writeln!(output, "```\n").unwrap();
        }

        output
    }

    fn format_answer(&self, answer: &str, outcome: &RetrievalOutcome) -> String {
        let mut output = String::new();
        writeln!(output, "## Answer\n").unwrap();
        writeln!(output, "**Question:** `{}`\n", outcome.query).unwrap();
        writeln!(output, "{}\n", answer).unwrap();
        if !outcome.is_empty() {
            writeln!(output, "### Sources\n").unwrap();
            for (i, result) in outcome.results.iter().enumerate() {
                writeln!(
                    output,
                    "{}. ({:.4}) {}",
                    i + 1,
                    result.score,
                    preview(&result.payload.text, 80).replace('\n', " ")
                )
                .unwrap();
            }
        }
        output
    }

    fn format_index_stats(&self, stats: &IndexStats, duration_ms: u64) -> String {
        let mut output = String::new();
        writeln!(output, "## Indexing Complete\n").unwrap();
        writeln!(output, "| Metric | Value |").unwrap();
        writeln!(output, "|--------|-------|").unwrap();
        writeln!(output, "| Documents | {} |", stats.documents).unwrap();
        writeln!(output, "| Chunks created | {} |", stats.chunks).unwrap();
        writeln!(output, "| Duration | {}ms |", duration_ms).unwrap();
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}
