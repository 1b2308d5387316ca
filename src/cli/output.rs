//! Output formatting for CLI commands.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::cli::args::{ChangeLearnArgs, OutputFormat};
use crate::error::Result;
use crate::experiment::ExperimentReport;
use crate::ml::evaluation::{ConfusionMatrix, EvaluationReport};
use crate::ml::labels::LabelSet;
use crate::ml::trainer::TrainingReport;

/// Result structure for the capture command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CaptureResult {
    pub path: String,
    pub records: usize,
    pub batches: u64,
    pub duration_ms: u64,
}

/// Results that know how to print themselves for a terminal.
pub trait HumanReadable {
    fn render_human(&self) -> String;
}

impl HumanReadable for TrainingReport {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Training");
        let _ = writeln!(out, "  Observations: {}", self.observations);
        let _ = writeln!(out, "  Batches: {}", self.batches);
        let _ = writeln!(
            out,
            "  Duration: {}ms ({:.1} obs/s)",
            self.duration_ms, self.observations_per_second
        );
        let _ = writeln!(out, "  Ended: {:?}", self.end);
        let _ = writeln!(
            out,
            "  {:<6} {:>10} {:>9} {:>10}",
            "label", "log loss", "accuracy", "positives"
        );
        for metrics in &self.labels {
            let _ = writeln!(
                out,
                "  {:<6} {:>10.4} {:>9.4} {:>10}",
                metrics.label.name(),
                metrics.mean_log_loss,
                metrics.accuracy,
                metrics.positives
            );
        }
        out
    }
}

impl HumanReadable for EvaluationReport {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Evaluation");
        let _ = writeln!(out, "  Observations: {}", self.observations);
        let _ = writeln!(
            out,
            "  Exact match accuracy: {:.4}",
            self.exact_match_accuracy
        );
        for label in &self.labels {
            let _ = writeln!(
                out,
                "  {:<6} accuracy {:.4}  actual+ {}  predicted+ {}",
                label.label.name(),
                label.accuracy,
                label.actual_positives,
                label.predicted_positives
            );
        }
        let _ = writeln!(out);
        out.push_str(&format_confusion_matrix(&self.matrix));
        out
    }
}

impl HumanReadable for ExperimentReport {
    fn render_human(&self) -> String {
        format!(
            "Run {}\n\n{}\n{}",
            self.run_id,
            self.training.render_human(),
            self.evaluation.render_human()
        )
    }
}

impl HumanReadable for CaptureResult {
    fn render_human(&self) -> String {
        format!(
            "Captured {} records in {} batches to {} ({}ms)\n",
            self.records, self.batches, self.path, self.duration_ms
        )
    }
}

/// Format a confusion matrix as a table, rows are actual tuples
/// (bot, minor, new) and columns are predicted tuples.
pub fn format_confusion_matrix(matrix: &ConfusionMatrix) -> String {
    const CELL: usize = 9;
    let mut out = String::new();

    let _ = write!(out, "{:<CELL$}", "act\\pred");
    for tuple in LabelSet::all() {
        let _ = write!(out, "{:>CELL$}", tuple.to_string());
    }
    let _ = writeln!(out, "{:>CELL$}", "total");

    let totals = matrix.row_totals();
    for (i, actual) in LabelSet::all().enumerate() {
        let _ = write!(out, "{:<CELL$}", actual.to_string());
        for count in matrix.rows()[i] {
            let _ = write!(out, "{count:>CELL$}");
        }
        let _ = writeln!(out, "{:>CELL$}", totals[i]);
    }

    let _ = write!(out, "{:<CELL$}", "total");
    for count in matrix.column_totals() {
        let _ = write!(out, "{count:>CELL$}");
    }
    let _ = writeln!(out, "{:>CELL$}", matrix.total());
    out
}

/// Output a result in the specified format.
pub fn output_result<T>(message: &str, result: &T, args: &ChangeLearnArgs) -> Result<()>
where
    T: Serialize + HumanReadable,
{
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: HumanReadable>(message: &str, result: &T, args: &ChangeLearnArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }
    print!("{}", result.render_human());
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &ChangeLearnArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{json}");
    Ok(())
}
