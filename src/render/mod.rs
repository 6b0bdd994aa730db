//! Terminal rendering for messages, queries, and result tables

use colored::Colorize;
use prettytable::{format, Cell, Row, Table};

use crate::conversation::{Message, MessageStatus, QueryResults, Sender};

/// Result tables show at most this many rows; `row_count` keeps the total.
pub const MAX_PREVIEW_ROWS: usize = 10;

/// Render one message as it appears in the transcript.
///
/// `show_sql` is the session-wide toggle for generated-query visibility.
pub fn render_message(message: &Message, show_sql: bool) -> String {
    match message.sender {
        Sender::User => {
            let mut line = format!("{} {}", "you:".bold(), message.content);
            if message.status == Some(MessageStatus::Error) {
                line.push_str(&format!(" {}", "(not delivered)".red()));
            }
            line
        }
        Sender::Assistant => {
            let mut out = format!("{} {}", "genie:".cyan().bold(), message.content);
            if show_sql {
                if let Some(sql) = &message.sql_query {
                    out.push_str(&format!("\n{}\n{}", "generated sql:".dimmed(), sql));
                }
            }
            if let Some(results) = &message.query_results {
                out.push('\n');
                out.push_str(&results_table(results));
            }
            out
        }
    }
}

/// Render a result payload as a bordered table, previewing at most
/// [`MAX_PREVIEW_ROWS`] rows and noting how many are hidden.
pub fn results_table(results: &QueryResults) -> String {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(Row::new(
        results
            .columns
            .iter()
            .map(|c| Cell::new(&c.as_str().bold().to_string()))
            .collect(),
    ));

    for row in results.data.iter().take(MAX_PREVIEW_ROWS) {
        table.add_row(Row::new(row.iter().map(|v| Cell::new(&cell_text(v))).collect()));
    }

    let mut out = table.to_string();

    let shown = results.data.len().min(MAX_PREVIEW_ROWS);
    let hidden = results.row_count.saturating_sub(shown);
    if hidden > 0 {
        out.push_str(
            &format!(
                "... and {hidden} more rows ({} total)\n",
                results.row_count
            )
            .dimmed()
            .to_string(),
        );
    }

    out
}

pub fn thinking_line() -> String {
    "thinking...".dimmed().italic().to_string()
}

pub fn error_line(reason: &str) -> String {
    format!("{} {}", "error:".red().bold(), reason)
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
