//! CSV telemetry records
//!
//! One time column plus one column per variable. Cells are read with the
//! literal grammar of postfix constants; anything else is taken as text.
//! Empty cells leave the variable untouched for that record.

use anyhow::{anyhow, bail, Context, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use voltage_expr::{date, parse_literal, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 1-based data line, header excluded
    pub line: u64,
    pub timestamp: i64,
    /// `(column index, value)` for every non-empty variable cell
    pub cells: Vec<(usize, Value)>,
}

pub struct RecordReader<R: Read> {
    reader: csv::Reader<R>,
    time_index: usize,
    columns: Vec<String>,
    line: u64,
}

impl RecordReader<BufReader<File>> {
    pub fn open(path: &Path, time_column: &str) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open records: {}", path.display()))?;
        Self::from_reader(BufReader::new(file), time_column)
    }
}

impl<R: Read> RecordReader<R> {
    pub fn from_reader(reader: R, time_column: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let columns: Vec<String> = reader
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(String::from)
            .collect();
        let Some(time_index) = columns.iter().position(|c| c == time_column) else {
            bail!("Time column '{time_column}' not found in header");
        };
        Ok(Self {
            reader,
            time_index,
            columns,
            line: 0,
        })
    }

    /// Header names, the time column included
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn time_index(&self) -> usize {
        self.time_index
    }

    fn parse(&self, record: &csv::StringRecord) -> Result<Record> {
        let time = record
            .get(self.time_index)
            .ok_or_else(|| anyhow!("missing time cell"))?;
        let timestamp =
            parse_time(time).ok_or_else(|| anyhow!("unrecognized time '{time}'"))?;

        let mut cells = Vec::with_capacity(record.len().saturating_sub(1));
        for (index, cell) in record.iter().enumerate() {
            if index == self.time_index || cell.is_empty() {
                continue;
            }
            cells.push((index, parse_cell(cell)?));
        }
        Ok(Record {
            line: self.line,
            timestamp,
            cells,
        })
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = (u64, Result<Record>);

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = csv::StringRecord::new();
        let read = self.reader.read_record(&mut record);
        self.line += 1;
        match read {
            Ok(false) => None,
            Ok(true) => Some((self.line, self.parse(&record))),
            Err(e) => Some((self.line, Err(e.into()))),
        }
    }
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]`, or integer nanoseconds
pub fn parse_time(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(nanos) = text.parse::<i64>() {
        return Some(nanos);
    }
    date::parse(text)
}

pub fn parse_cell(cell: &str) -> Result<Value> {
    Ok(parse_literal(cell)?.unwrap_or_else(|| Value::text(cell)))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const S: i64 = 1_000_000_000;

    #[test]
    fn test_time_formats() {
        assert_eq!(parse_time("1500"), Some(1500));
        assert_eq!(parse_time("1970-01-01T00:00:02Z"), Some(2 * S));
        assert_eq!(parse_time("1970-01-01 00:01:00"), Some(60 * S));
        assert_eq!(parse_time("yesterday"), None);
    }

    #[test]
    fn test_cells_use_literal_grammar() {
        assert_eq!(parse_cell("42").unwrap(), Value::Int(42));
        assert_eq!(parse_cell("2.5").unwrap(), Value::Float(2.5));
        assert_eq!(parse_cell("&hFF").unwrap(), Value::Int(255));
        assert_eq!(parse_cell("open").unwrap(), Value::text("open"));
        assert!(parse_cell("#not a date#").is_err());
    }

    #[test]
    fn test_reads_records_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "time,P,Q\n1,10,\n2, 20 ,5\nbad,1,1\n").unwrap();

        let reader = RecordReader::open(file.path(), "time").unwrap();
        assert_eq!(reader.columns(), ["time", "P", "Q"]);
        let records: Vec<_> = reader.collect();
        assert_eq!(records.len(), 3);

        let (line, first) = &records[0];
        let first = first.as_ref().unwrap();
        assert_eq!(*line, 1);
        assert_eq!(first.timestamp, 1);
        assert_eq!(first.cells, vec![(1, Value::Int(10))], "empty Q cell is skipped");

        let second = records[1].1.as_ref().unwrap();
        assert_eq!(second.cells, vec![(1, Value::Int(20)), (2, Value::Int(5))]);

        assert_eq!(records[2].0, 3);
        assert!(records[2].1.is_err());
    }

    #[test]
    fn test_missing_time_column() {
        let data = "timestamp,P\n1,2\n";
        let err = RecordReader::from_reader(data.as_bytes(), "time").err().unwrap();
        assert!(err.to_string().contains("'time'"));
    }
}
