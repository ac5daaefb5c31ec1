//! Delimited text loader producing a [`RecordSet`].
//!
//! The first line names the columns. Column kinds are inferred from the
//! data: integer when every non-empty cell is a whole number (`3` or `3.0`),
//! float when every non-empty cell is a number, text otherwise. Empty cells in
//! numeric columns load as zero. Cells are split verbatim; quoting is not
//! interpreted.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{Result, SubgroupError};
use crate::record::{Field, Kind, Record, RecordSet, Schema, Value};

fn whole(cell: &str) -> Option<i64> {
    if let Ok(i) = cell.parse::<i64>() {
        return Some(i);
    }
    let f = cell.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

fn infer(rows: &[Vec<&str>], column: usize) -> Kind {
    let mut cells = rows.iter().map(|r| r[column]).filter(|c| !c.is_empty()).peekable();
    if cells.peek().is_none() {
        return Kind::Text;
    }
    let mut kind = Kind::Integer;
    for cell in cells {
        if kind == Kind::Integer && whole(cell).is_none() {
            kind = Kind::Float;
        }
        if kind == Kind::Float && cell.parse::<f64>().is_err() {
            return Kind::Text;
        }
    }
    kind
}

fn value(cell: &str, kind: Kind) -> Value {
    match kind {
        Kind::Text => Value::from(cell),
        Kind::Integer => Value::Integer(whole(cell).unwrap_or(0)),
        Kind::Float => Value::Float(cell.parse().unwrap_or(0.0)),
    }
}

pub fn parse(text: &str, delimiter: char) -> Result<RecordSet> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty());
    let Some((_, header)) = lines.next() else {
        return Err(SubgroupError::Load { line: 1, message: "missing header line".into() });
    };
    let names: Vec<&str> = header.split(delimiter).map(str::trim).collect();

    let mut rows = Vec::new();
    for (line, entry) in lines {
        let cells: Vec<&str> = entry.split(delimiter).map(str::trim).collect();
        if cells.len() != names.len() {
            return Err(SubgroupError::Load {
                line,
                message: format!("expected {} cells, found {}", names.len(), cells.len()),
            });
        }
        rows.push(cells);
    }

    let kinds: Vec<Kind> = (0..names.len()).map(|c| infer(&rows, c)).collect();
    let schema = Schema::new(names.iter().zip(kinds.iter()).map(|(n, k)| Field::new(*n, *k)).collect());
    let records = rows
        .iter()
        .map(|cells| Record::new(cells.iter().zip(kinds.iter()).map(|(c, k)| value(c, *k)).collect()))
        .collect();
    RecordSet::new(schema, records)
}

pub fn load(path: impl AsRef<Path>, delimiter: char) -> Result<RecordSet> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let records = parse(&text, delimiter)?;
    info!(path = %path.display(), records = records.len(), fields = records.schema().len(), "dataset loaded");
    Ok(records)
}
