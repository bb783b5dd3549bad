//! CSV input and output
//!
//! Loading training and prediction records from CSV files, and writing
//! predictions back out.
use crate::constants::UNKNOWN_PREDICTION;
use crate::data::{Dataset, FeatureType, Record};
use crate::errors::DecisionTreeError;
use crate::model::Model;
use crate::value::Value;
use chrono::NaiveDate;
use hashbrown::HashMap;
use log::info;
use std::collections::HashMap as StdHashMap;
use std::fs;
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a raw CSV cell.
///
/// Tried in order: empty (missing), integer, float, `true`/`false`,
/// `YYYY-MM-DD` date, and finally plain text. Non-finite numbers such as
/// `NaN` or `inf` are missing.
pub fn parse_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Missing;
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Value::Int(v);
    }
    if let Ok(v) = raw.parse::<f64>() {
        return if v.is_finite() { Value::Float(v) } else { Value::Missing };
    }
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Value::Date(d);
    }
    Value::Str(raw.to_string())
}

/// Feature type implied by a parsed value, `None` for a missing one.
pub fn infer_feature_type(value: &Value) -> Option<FeatureType> {
    match value {
        Value::Int(_) | Value::Float(_) => Some(FeatureType::Numerical),
        Value::Str(_) | Value::Bool(_) | Value::Date(_) => Some(FeatureType::Categorical),
        Value::Missing => None,
    }
}

fn read_header<R: std::io::Read>(reader: &mut csv::Reader<R>, path: &Path) -> Result<Vec<String>, DecisionTreeError> {
    let columns: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    if columns.is_empty() {
        return Err(DecisionTreeError::EmptyInput(path.display().to_string()));
    }
    Ok(columns)
}

fn open_reader(path: &Path, flexible: bool) -> Result<csv::Reader<fs::File>, DecisionTreeError> {
    let file = fs::File::open(path).map_err(|e| DecisionTreeError::UnableToRead(format!("{}: {}", path.display(), e)))?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(flexible)
        .from_reader(file))
}

/// Load a training set.
///
/// Every row must have as many fields as the header. A column's feature
/// type comes from its first non-missing value, and columns that are
/// entirely missing are categorical.
///
/// * `path` - CSV file with a header row.
/// * `target_column` - Column that must be present in the header.
pub fn load_training_data<P: AsRef<Path>>(path: P, target_column: &str) -> Result<Dataset, DecisionTreeError> {
    let path = path.as_ref();
    let mut reader = open_reader(path, false)?;
    let columns = read_header(&mut reader, path)?;
    if !columns.iter().any(|c| c == target_column) {
        return Err(DecisionTreeError::TargetNotFound(target_column.to_string()));
    }

    let mut feature_types: StdHashMap<String, FeatureType> = StdHashMap::new();
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut record = Record::with_capacity(columns.len());
        for (column, raw) in columns.iter().zip(row.iter()) {
            let value = parse_value(raw);
            if !feature_types.contains_key(column) {
                if let Some(t) = infer_feature_type(&value) {
                    feature_types.insert(column.clone(), t);
                }
            }
            if !value.is_missing() {
                record.insert(column.clone(), value);
            }
        }
        records.push(record);
    }
    for column in &columns {
        feature_types.entry(column.clone()).or_insert(FeatureType::Categorical);
    }

    info!(
        "Loaded {} records with {} columns from {}.",
        records.len(),
        columns.len(),
        path.display()
    );
    Ok(Dataset::new(columns, records, feature_types))
}

// Per-column fill value for empty cells.
#[derive(Default)]
struct ColumnSummary<'a> {
    sum: f64,
    n_numeric: usize,
    // Non-numeric cell counts, with the order in which values first appeared.
    counts: HashMap<&'a str, usize>,
    order: Vec<&'a str>,
}

impl<'a> ColumnSummary<'a> {
    fn observe(&mut self, raw: &'a str) {
        if raw.is_empty() {
            return;
        }
        if let Ok(v) = raw.parse::<f64>() {
            self.sum += v;
            self.n_numeric += 1;
            return;
        }
        let count = self.counts.entry(raw).or_insert(0);
        if *count == 0 {
            self.order.push(raw);
        }
        *count += 1;
    }

    /// Mean when any cell is numeric, otherwise the most frequent text.
    fn fill_value(&self) -> Value {
        if self.n_numeric > 0 {
            return Value::Float(self.sum / self.n_numeric as f64);
        }
        let mut best: Option<(&str, usize)> = None;
        for &raw in &self.order {
            let count = self.counts.get(raw).copied().unwrap_or(0);
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((raw, count));
            }
        }
        best.map_or(Value::Missing, |(raw, _)| parse_value(raw))
    }
}

/// Load records to predict.
///
/// Short rows are padded with empty cells. Empty cells are imputed with the
/// column mean when the column holds numbers, and with the column mode
/// otherwise. Feature types are taken from `model`.
pub fn load_prediction_data<P: AsRef<Path>>(path: P, model: &Model) -> Result<Dataset, DecisionTreeError> {
    let path = path.as_ref();
    let mut reader = open_reader(path, true)?;
    let columns = read_header(&mut reader, path)?;

    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
    let mut summaries: Vec<ColumnSummary> = columns.iter().map(|_| ColumnSummary::default()).collect();
    for row in &rows {
        for (summary, raw) in summaries.iter_mut().zip(row.iter()) {
            summary.observe(raw);
        }
    }
    let fills: Vec<Value> = summaries.iter().map(ColumnSummary::fill_value).collect();

    let records: Vec<Record> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .filter_map(|(i, column)| {
                    let value = match row.get(i).unwrap_or("") {
                        "" => fills[i].clone(),
                        raw => parse_value(raw),
                    };
                    (!value.is_missing()).then(|| (column.clone(), value))
                })
                .collect()
        })
        .collect();

    info!(
        "Loaded {} records with {} columns for prediction from {}.",
        records.len(),
        columns.len(),
        path.display()
    );
    let feature_types = model.feature_types.iter().map(|(k, v)| (k.clone(), *v)).collect();
    Ok(Dataset::new(columns, records, feature_types))
}

/// Write predictions as a single `prediction` column.
///
/// Missing predictions are written as `unknown`. Parent directories are
/// created when needed.
pub fn save_predictions<P: AsRef<Path>>(path: P, predictions: &[Value]) -> Result<(), DecisionTreeError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DecisionTreeError::UnableToWrite(e.to_string()))?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["prediction"])?;
    for prediction in predictions {
        let field = match prediction {
            Value::Missing => UNKNOWN_PREDICTION.to_string(),
            p => p.to_string(),
        };
        writer.write_record([field])?;
    }
    writer
        .flush()
        .map_err(|e| DecisionTreeError::UnableToWrite(e.to_string()))?;
    info!("Saved {} predictions to {}.", predictions.len(), path.display());
    Ok(())
}
