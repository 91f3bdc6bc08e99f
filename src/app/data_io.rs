use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::{info, warn};

use super::text::sanitize;
use super::types::{DataFormat, Record};
use super::vocabulary::PREFERRED_ORDER;

pub(crate) const BASE_COLUMNS: [&str; 9] = [
    "strain_name",
    "breeder",
    "description",
    "current_price",
    "original_price",
    "discount_percent",
    "pack_options",
    "product_url",
    "image_url",
];

#[derive(Debug, Error)]
pub(crate) enum DataError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("column {column} holds a non-numeric value {value:?}")]
    InvalidNumber { column: String, value: String },
    #[error("expected a JSON array of objects")]
    NotAnArray,
}

enum Cell<'a> {
    Text(&'a str),
    Decimal(Option<f64>),
    Missing,
}

fn cell<'a>(record: &'a Record, column: &str) -> Cell<'a> {
    match column {
        "strain_name" => Cell::Text(&record.strain_name),
        "breeder" => Cell::Text(&record.breeder),
        "description" => Cell::Text(&record.description),
        "current_price" => Cell::Decimal(record.current_price),
        "original_price" => Cell::Decimal(record.original_price),
        "discount_percent" => Cell::Decimal(record.discount_percent),
        "pack_options" => Cell::Text(&record.pack_options),
        "product_url" => Cell::Text(&record.product_url),
        "image_url" => Cell::Text(&record.image_url),
        other => record
            .extra
            .get(other)
            .map_or(Cell::Missing, |value| Cell::Text(value)),
    }
}

fn parse_decimal(column: &str, value: &str) -> Result<Option<f64>, DataError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| DataError::InvalidNumber {
            column: column.to_string(),
            value: value.to_string(),
        })
}

/// Builds a record from `(column, value)` pairs exactly as stored. Nothing is
/// sanitized or validated; unknown columns land in `extra` verbatim.
fn record_from_cells<K, V>(cells: impl IntoIterator<Item = (K, V)>) -> Result<Record, DataError>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut record = Record::default();
    for (column, value) in cells {
        let (column, value) = (column.as_ref().trim(), value.as_ref());
        match column {
            "strain_name" => record.strain_name = value.to_string(),
            "breeder" => record.breeder = value.to_string(),
            "description" => record.description = value.to_string(),
            "current_price" => record.current_price = parse_decimal(column, value)?,
            "original_price" => record.original_price = parse_decimal(column, value)?,
            "discount_percent" => record.discount_percent = parse_decimal(column, value)?,
            "pack_options" => record.pack_options = value.to_string(),
            "product_url" => record.product_url = value.to_string(),
            "image_url" => record.image_url = value.to_string(),
            other => {
                record.extra.insert(other.to_string(), value.to_string());
            }
        }
    }
    Ok(record)
}

fn load_records_from_csv(path: &Path) -> Result<Vec<Record>, DataError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(record_from_cells(headers.iter().zip(row.iter()))?);
    }
    Ok(records)
}

fn load_records_from_json(path: &Path) -> Result<Vec<Record>, DataError> {
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let Value::Array(rows) = serde_json::from_str::<Value>(&content)? else {
        return Err(DataError::NotAnArray);
    };
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let Value::Object(fields) = row else {
            return Err(DataError::NotAnArray);
        };
        let cells = fields.into_iter().filter_map(|(column, value)| match value {
            Value::Null => None,
            Value::String(text) => Some((column, text)),
            other => Some((column, other.to_string())),
        });
        records.push(record_from_cells(cells)?);
    }
    Ok(records)
}

pub(crate) fn detect_data_format(path: &str, fallback: DataFormat) -> DataFormat {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".json") {
        DataFormat::Json
    } else if lower.ends_with(".csv") {
        DataFormat::Csv
    } else {
        fallback
    }
}

pub(crate) fn load_records(path: &Path, format: DataFormat) -> Result<Vec<Record>, DataError> {
    match format {
        DataFormat::Csv => load_records_from_csv(path),
        DataFormat::Json => load_records_from_json(path),
    }
}

/// Reads the previous run's output. A missing or unreadable file yields an
/// empty dataset so the crawl can start fresh.
pub(crate) fn load_prior_records(path: &Path, format: DataFormat) -> Vec<Record> {
    if !path.exists() {
        info!(path = %path.display(), "no prior dataset, starting fresh");
        return Vec::new();
    }
    match load_records(path, format) {
        Ok(records) => records,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not read prior dataset, starting fresh");
            Vec::new()
        }
    }
}

pub(crate) fn seen_urls(records: &[Record]) -> HashSet<String> {
    records
        .iter()
        .filter(|record| !record.product_url.is_empty())
        .map(|record| record.product_url.clone())
        .collect()
}

/// Base columns, then present detail keys in preferred order, then any other
/// present keys sorted.
pub(crate) fn column_set(records: &[Record]) -> Vec<String> {
    let present = records
        .iter()
        .flat_map(|record| record.extra.keys().map(String::as_str))
        .collect::<BTreeSet<_>>();

    let mut columns = BASE_COLUMNS
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    columns.extend(
        PREFERRED_ORDER
            .iter()
            .filter(|key| present.contains(*key))
            .map(ToString::to_string),
    );
    columns.extend(
        present
            .iter()
            .filter(|key| !PREFERRED_ORDER.contains(*key))
            .map(ToString::to_string),
    );
    columns
}

/// Appends `new` after `prior` without touching either side.
pub(crate) fn merge(prior: Vec<Record>, new: Vec<Record>) -> (Vec<Record>, Vec<String>) {
    let mut combined = prior;
    combined.extend(new);
    let columns = column_set(&combined);
    (combined, columns)
}

fn csv_cell(record: &Record, column: &str) -> String {
    match cell(record, column) {
        Cell::Text(text) => sanitize(text),
        Cell::Decimal(Some(value)) => value.to_string(),
        Cell::Decimal(None) | Cell::Missing => String::new(),
    }
}

fn json_cell(record: &Record, column: &str) -> Value {
    match cell(record, column) {
        Cell::Text(text) => Value::String(sanitize(text)),
        Cell::Decimal(Some(value)) => Number::from_f64(value).map_or(Value::Null, Value::Number),
        Cell::Decimal(None) | Cell::Missing => Value::Null,
    }
}

fn save_records_to_csv(path: &Path, records: &[Record], columns: &[String]) -> Result<(), DataError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(columns)?;
    for record in records {
        writer.write_record(columns.iter().map(|column| csv_cell(record, column)))?;
    }
    writer.flush()?;
    Ok(())
}

fn save_records_to_json(path: &Path, records: &[Record], columns: &[String]) -> Result<(), DataError> {
    let rows = records
        .iter()
        .map(|record| {
            Value::Object(
                columns
                    .iter()
                    .map(|column| (column.clone(), json_cell(record, column)))
                    .collect::<Map<_, _>>(),
            )
        })
        .collect::<Vec<_>>();
    let mut out = serde_json::to_string_pretty(&rows)?;
    out.push('\n');
    fs::write(path, out)?;
    Ok(())
}

/// Writes every record under `columns`; string cells are sanitized on the way
/// out.
pub(crate) fn save_records(
    path: &Path,
    format: DataFormat,
    records: &[Record],
    columns: &[String],
) -> Result<(), DataError> {
    match format {
        DataFormat::Csv => save_records_to_csv(path, records, columns),
        DataFormat::Json => save_records_to_json(path, records, columns),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tempfile::tempdir;

    use super::*;

    fn record(url: &str, extra: &[(&str, &str)]) -> Record {
        Record {
            strain_name: format!("Strain {url}"),
            breeder: "Royal Queen Seeds".to_string(),
            current_price: Some(24.5),
            product_url: format!("https://www.seed-city.com/en/{url}"),
            extra: extra
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            ..Record::default()
        }
    }

    #[test]
    fn merging_nothing_new_returns_prior_unchanged() {
        let prior = vec![record("a", &[("thc", "20%")]), record("b", &[])];
        let (combined, _) = merge(prior.clone(), Vec::new());
        assert_eq!(combined, prior);
        let (again, _) = merge(combined, Vec::new());
        assert_eq!(again, prior);
    }

    #[test]
    fn merge_keeps_prior_first() {
        let (combined, _) = merge(vec![record("a", &[])], vec![record("b", &[])]);
        let urls = combined
            .iter()
            .map(|r| r.product_url.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            urls,
            vec![
                "https://www.seed-city.com/en/a",
                "https://www.seed-city.com/en/b"
            ]
        );
    }

    #[test]
    fn columns_follow_preferred_then_lexicographic_order() {
        let records = vec![
            record("a", &[("zeta_note", "x"), ("thc", "20%")]),
            record("b", &[("alpha_note", "y"), ("overview", "Classic")]),
        ];
        let columns = column_set(&records);
        assert_eq!(&columns[..BASE_COLUMNS.len()], BASE_COLUMNS.as_slice());
        assert_eq!(
            &columns[BASE_COLUMNS.len()..],
            ["overview", "thc", "alpha_note", "zeta_note"].as_slice()
        );
    }

    #[test]
    fn seen_urls_ignores_empty_urls() {
        let mut blank = record("x", &[]);
        blank.product_url.clear();
        let seen = seen_urls(&[record("a", &[]), blank]);
        assert_eq!(seen.len(), 1);
        assert!(seen.contains("https://www.seed-city.com/en/a"));
    }

    #[test]
    fn csv_round_trip_preserves_records_and_extra_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("strains.csv");
        let records = vec![
            record("a", &[("thc", "20%"), ("custom_note", "kept")]),
            record("b", &[]),
        ];
        let columns = column_set(&records);

        save_records(&path, DataFormat::Csv, &records, &columns).unwrap();
        let loaded = load_records(&path, DataFormat::Csv).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], records[0]);
        assert_eq!(loaded[1].current_price, Some(24.5));
        assert_eq!(loaded[1].original_price, None);
        // columns present in the file are carried as empty extras
        assert_eq!(loaded[1].extra["thc"], "");
        assert_eq!(column_set(&loaded), columns);
    }

    #[test]
    fn csv_output_is_sanitized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("strains.csv");
        let mut dirty = record("a", &[("effect", "Happy\u{7}\n")]);
        dirty.description = " line one\nline two\u{0} ".to_string();
        let columns = column_set(std::slice::from_ref(&dirty));

        save_records(&path, DataFormat::Csv, &[dirty], &columns).unwrap();
        let loaded = load_records(&path, DataFormat::Csv).unwrap();

        assert_eq!(loaded[0].description, "line one line two");
        assert_eq!(loaded[0].extra["effect"], "Happy");
    }

    #[test]
    fn json_round_trip_keeps_nulls_out_of_extra() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("strains.json");
        let records = vec![record("a", &[("thc", "20%")]), record("b", &[])];
        let columns = column_set(&records);

        save_records(&path, DataFormat::Json, &records, &columns).unwrap();
        let loaded = load_records(&path, DataFormat::Json).unwrap();

        assert_eq!(loaded, records);
    }

    #[test]
    fn loading_prior_tolerates_missing_and_broken_files() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.csv");
        assert!(load_prior_records(&missing, DataFormat::Csv).is_empty());

        let broken = dir.path().join("broken.csv");
        fs::write(
            &broken,
            "strain_name,current_price,product_url\nA,not-a-price,https://x/a\n",
        )
        .unwrap();
        assert!(matches!(
            load_records(&broken, DataFormat::Csv),
            Err(DataError::InvalidNumber { .. })
        ));
        assert!(load_prior_records(&broken, DataFormat::Csv).is_empty());

        let not_array = dir.path().join("broken.json");
        fs::write(&not_array, "{\"strain_name\": \"A\"}").unwrap();
        assert!(load_prior_records(&not_array, DataFormat::Json).is_empty());
    }

    #[test]
    fn loading_does_not_revalidate_prior_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prior.csv");
        fs::write(
            &path,
            "strain_name,breeder,current_price,product_url,legacy_flag\n---,,,https://x/a, yes \n",
        )
        .unwrap();

        let loaded = load_prior_records(&path, DataFormat::Csv);

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].strain_name, "---");
        assert_eq!(loaded[0].current_price, None);
        assert_eq!(loaded[0].extra["legacy_flag"], " yes ");
    }

    #[test]
    fn detects_format_from_extension() {
        assert_eq!(detect_data_format("out.JSON", DataFormat::Csv), DataFormat::Json);
        assert_eq!(detect_data_format("out.csv", DataFormat::Json), DataFormat::Csv);
        assert_eq!(detect_data_format("out.tsv", DataFormat::Json), DataFormat::Json);
    }
}
