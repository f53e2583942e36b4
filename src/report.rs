//! Report rendering
//!
//! The orchestrator hands the finished `ComputationResult` to a sink; the
//! core never formats output itself.

use crate::error::Result;
use crate::message::ComputationResult;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Output format for the final report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Sink for the terminal artifact of a run.
pub trait ReportSink: Send + Sync {
    fn render(&self, result: &ComputationResult) -> Result<()>;
}

/// Renders the report to stdout in the selected format.
pub struct ConsoleReport {
    format: OutputFormat,
}

impl ConsoleReport {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl ReportSink for ConsoleReport {
    fn render(&self, result: &ComputationResult) -> Result<()> {
        match self.format {
            OutputFormat::Text => print!("{}", format_text(result)),
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(result)
                    .map_err(|e| std::io::Error::other(e.to_string()))?;
                println!("{json}");
            }
        }
        Ok(())
    }
}

/// Human-readable report: overall profit banner, then one block per
/// product with its leftover totals. Partial aggregates are marked.
pub fn format_text(result: &ComputationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "---");
    let _ = writeln!(out, "The whole profit: {:.2}", result.total_profit);
    let _ = writeln!(out, "---");
    for summary in result.products.values() {
        let _ = writeln!(out, "{}", summary.product);
        let _ = writeln!(
            out,
            "\tTotal leftover quantity ---> {}",
            summary.leftover_quantity
        );
        let _ = writeln!(
            out,
            "\tTotal leftover price ---> {:.2}",
            summary.leftover_value
        );
        if !summary.is_complete() {
            let _ = writeln!(
                out,
                "\t(partial: {} of {} warehouses reported)",
                summary.contributions_received, summary.contributions_expected
            );
        }
    }
    out
}
