//! Record-by-record evaluation loop

use crate::config::OutputFormat;
use crate::records::{Record, RecordReader};
use anyhow::Result;
use chrono::SecondsFormat;
use serde::Serialize;
use std::io::{Read, Write};
use tracing::{debug, info, warn};
use voltage_expr::{date, CursorSettings, ExprError, Expression, TimedValue, Value};

/// Outcome counts of one replay run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub evaluated: u64,
    /// Records without a synchronized value
    pub skipped: u64,
    pub failed: u64,
    /// Cursor directives issued by the expression
    pub cursor: CursorSettings,
}

#[derive(Serialize)]
struct ResultLine<'a> {
    line: u64,
    timestamp: i64,
    value: &'a Value,
}

#[derive(Serialize)]
struct ErrorLine<'a> {
    line: u64,
    error: &'a str,
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    summary: &'a Summary,
}

fn render_time(nanos: i64) -> String {
    date::to_datetime(nanos).to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

struct Printer<'w, W: Write> {
    out: &'w mut W,
    format: OutputFormat,
}

impl<W: Write> Printer<'_, W> {
    fn result(&mut self, line: u64, result: &TimedValue) -> Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(
                self.out,
                "{line}\t{}\t{}",
                render_time(result.timestamp),
                result.value
            )?,
            OutputFormat::Json => {
                let row = ResultLine {
                    line,
                    timestamp: result.timestamp,
                    value: &result.value,
                };
                writeln!(self.out, "{}", serde_json::to_string(&row)?)?;
            },
        }
        Ok(())
    }

    fn error(&mut self, line: u64, error: &str) -> Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.out, "{line}\terror\t{error}")?,
            OutputFormat::Json => {
                let row = ErrorLine { line, error };
                writeln!(self.out, "{}", serde_json::to_string(&row)?)?;
            },
        }
        Ok(())
    }

    fn summary(&mut self, summary: &Summary) -> Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(
                self.out,
                "evaluated={} skipped={} failed={} cursor={}",
                summary.evaluated,
                summary.skipped,
                summary.failed,
                serde_json::to_string(&summary.cursor)?
            )?,
            OutputFormat::Json => {
                writeln!(self.out, "{}", serde_json::to_string(&SummaryLine { summary })?)?;
            },
        }
        Ok(())
    }
}

/// Column index to the variable it feeds, `None` for the time column and
/// for columns the expression never reads
fn bind_columns<R: Read>(expr: &Expression, records: &RecordReader<R>) -> Vec<Option<String>> {
    records
        .columns()
        .iter()
        .enumerate()
        .map(|(index, column)| {
            if index == records.time_index() {
                return None;
            }
            if expr.variables().lookup(column).is_none() {
                debug!(column = %column, "Column not referenced by the expression");
                return None;
            }
            Some(column.clone())
        })
        .collect()
}

fn assign(
    expr: &mut Expression,
    bindings: &[Option<String>],
    record: Record,
) -> Result<(), ExprError> {
    for (index, value) in record.cells {
        if let Some(Some(name)) = bindings.get(index) {
            expr.set_variable(name, value, record.timestamp)?;
        }
    }
    Ok(())
}

/// Assign, evaluate and print every record, then print the summary
pub fn replay<R: Read, W: Write>(
    expr: &mut Expression,
    records: RecordReader<R>,
    format: OutputFormat,
    out: &mut W,
) -> Result<Summary> {
    let bindings = bind_columns(expr, &records);
    let mut summary = Summary::default();
    let mut printer = Printer { out, format };

    for (line, record) in records {
        let outcome = record
            .and_then(|record| Ok(assign(expr, &bindings, record)?))
            .and_then(|()| Ok(expr.evaluate(&mut summary.cursor)?));

        match outcome {
            Ok(result) => {
                summary.evaluated += 1;
                printer.result(line, &result)?;
            },
            Err(e) if matches!(
                e.downcast_ref::<ExprError>(),
                Some(ExprError::SynchronizationUnavailable)
            ) => {
                summary.skipped += 1;
                debug!(line, "No synchronized value, record skipped");
            },
            Err(e) => {
                summary.failed += 1;
                warn!(line, error = %e, "Record failed");
                printer.error(line, &e.to_string())?;
            },
        }
    }

    printer.summary(&summary)?;
    info!(
        evaluated = summary.evaluated,
        skipped = summary.skipped,
        failed = summary.failed,
        "Replay finished"
    );
    Ok(summary)
}
