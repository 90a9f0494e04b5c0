use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use arrow::array::Array;
use arrow::util::display::array_value_to_string;
use chrono::NaiveDateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{title_case, Dataset, Listing};
use super::states::state_name;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Anything that stops a dataset from loading. All variants are fatal.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a top-level JSON array of records")]
    NotRecords,
    #[error("row {0} is not a JSON object")]
    NotAnObject(usize),
    #[error("parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("arrow: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("row {row}: invalid {column} value '{value}'")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("row {row}: posting date '{value}' does not match YYYY-MM-DDTHH:MM:SS followed by a 5-character offset")]
    InvalidDate { row: usize, value: String },
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Columns kept after load. `id`, `url`, `region_url`, `description`,
/// `image_url` and the leading index column may be present but are ignored.
pub const REQUIRED_COLUMNS: [&str; 20] = [
    "region",
    "price",
    "year",
    "manufacturer",
    "model",
    "condition",
    "cylinders",
    "fuel",
    "odometer",
    "title_status",
    "transmission",
    "VIN",
    "drive",
    "size",
    "category",
    "paint_color",
    "state",
    "lat",
    "lon",
    "posting_date",
];

/// Length of the timezone suffix on `posting_date` (`-0500`).
const TZ_SUFFIX_LEN: usize = 5;
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One source row, cells aligned with [`REQUIRED_COLUMNS`].
/// `None` marks a missing value.
struct RawRow {
    row: usize,
    cells: Vec<Option<String>>,
}

impl RawRow {
    fn cell(&self, column: &str) -> &str {
        REQUIRED_COLUMNS
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.cells.get(i))
            .and_then(|c| c.as_deref())
            .unwrap_or("")
    }

    fn is_complete(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }
}

fn clean_cell(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn missing_columns<'a>(present: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let present: BTreeSet<&str> = present.into_iter().collect();
    REQUIRED_COLUMNS
        .iter()
        .filter(|c| !present.contains(*c))
        .map(|c| c.to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a listings dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with the source column names
/// * `.json`    – `[{ "region": "...", "price": 6995, ... }, ...]`
/// * `.parquet` – one column per source column
pub fn load_file(path: &Path) -> Result<Dataset, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    match ext.as_str() {
        "csv" => load_csv_reader(File::open(path).map_err(io_err)?),
        "json" => load_json_str(&std::fs::read_to_string(path).map_err(io_err)?),
        "parquet" | "pq" => load_parquet(File::open(path).map_err(io_err)?),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Load listings from CSV text with a header row.
pub fn load_csv_reader<R: Read>(reader: R) -> Result<Dataset, LoadError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();

    let missing = missing_columns(headers.iter().map(str::trim));
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    let positions: Vec<usize> = REQUIRED_COLUMNS
        .iter()
        .filter_map(|c| headers.iter().position(|h| h.trim() == *c))
        .collect();

    let mut rows = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let cells = positions
            .iter()
            .map(|&i| record.get(i).and_then(clean_cell))
            .collect();
        rows.push(RawRow { row, cells });
    }

    normalize(rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Load listings from a records-oriented JSON array
/// (`df.to_json(orient='records')`).
pub fn load_json_str(text: &str) -> Result<Dataset, LoadError> {
    let root: JsonValue = serde_json::from_str(text)?;
    let records = root.as_array().ok_or(LoadError::NotRecords)?;

    let mut objects = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        objects.push(rec.as_object().ok_or(LoadError::NotAnObject(i))?);
    }

    let missing = missing_columns(objects.iter().flat_map(|o| o.keys().map(String::as_str)));
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    let rows = objects
        .into_iter()
        .enumerate()
        .map(|(row, obj)| RawRow {
            row,
            cells: REQUIRED_COLUMNS
                .iter()
                .map(|c| obj.get(*c).and_then(json_cell))
                .collect(),
        })
        .collect();

    normalize(rows)
}

fn json_cell(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::Null => None,
        JsonValue::String(s) => clean_cell(s),
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load listings from a Parquet file whose columns carry the source names.
/// Cells of any primitive Arrow type are rendered to text and then parsed
/// exactly like CSV cells.
fn load_parquet(file: File) -> Result<Dataset, LoadError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let schema = builder.schema().clone();
    let missing = missing_columns(schema.fields().iter().map(|f| f.name().as_str()));
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    let reader = builder.build()?;
    let mut rows = Vec::new();

    for batch in reader {
        let batch = batch?;
        let columns = REQUIRED_COLUMNS
            .iter()
            .map(|c| batch.schema().index_of(c).map(|i| batch.column(i).clone()))
            .collect::<Result<Vec<_>, _>>()?;

        for r in 0..batch.num_rows() {
            let mut cells = Vec::with_capacity(columns.len());
            for col in &columns {
                let cell = if col.is_null(r) {
                    None
                } else {
                    clean_cell(&array_value_to_string(col.as_ref(), r)?)
                };
                cells.push(cell);
            }
            rows.push(RawRow {
                row: rows.len(),
                cells,
            });
        }
    }

    normalize(rows)
}

// ---------------------------------------------------------------------------
// Normalisation
// ---------------------------------------------------------------------------

/// Turn raw rows into typed listings: drop incomplete rows, normalise casing,
/// parse numbers and dates, attach state names.
fn normalize(rows: Vec<RawRow>) -> Result<Dataset, LoadError> {
    let total = rows.len();
    let mut listings = Vec::with_capacity(total);

    for raw in rows.iter().filter(|r| r.is_complete()) {
        listings.push(parse_listing(raw)?);
    }

    let dropped = total - listings.len();
    log::info!(
        "Loaded {} listings ({dropped} incomplete rows dropped)",
        listings.len()
    );
    Ok(Dataset::from_listings(listings))
}

fn parse_listing(raw: &RawRow) -> Result<Listing, LoadError> {
    let text = |column: &str| raw.cell(column).to_string();
    let state = raw.cell("state").to_ascii_uppercase();

    Ok(Listing {
        vin: text("VIN"),
        price: parse_number(raw, "price", 0.0, f64::MAX)?,
        year: parse_year(raw)?,
        odometer: parse_number(raw, "odometer", 0.0, f64::MAX)?,
        region: title_case(raw.cell("region")),
        manufacturer: text("manufacturer"),
        model: text("model"),
        condition: text("condition"),
        cylinders: text("cylinders"),
        fuel: text("fuel"),
        title_status: text("title_status"),
        transmission: text("transmission"),
        drive: text("drive"),
        size: text("size"),
        category: text("category"),
        paint_color: text("paint_color"),
        state_name: state_name(&state),
        state,
        lat: parse_number(raw, "lat", -90.0, 90.0)?,
        lon: parse_number(raw, "lon", -180.0, 180.0)?,
        posted_at: parse_posting_date(raw.row, raw.cell("posting_date"))?,
    })
}

fn parse_number(raw: &RawRow, column: &'static str, min: f64, max: f64) -> Result<f64, LoadError> {
    let value = raw.cell(column);
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && (min..=max).contains(v))
        .ok_or_else(|| LoadError::InvalidNumber {
            row: raw.row,
            column,
            value: value.to_string(),
        })
}

fn parse_year(raw: &RawRow) -> Result<i32, LoadError> {
    let year = parse_number(raw, "year", 1900.0, 2100.0)?;
    if year.fract() != 0.0 {
        return Err(LoadError::InvalidNumber {
            row: raw.row,
            column: "year",
            value: raw.cell("year").to_string(),
        });
    }
    Ok(year as i32)
}

/// Parse `2021-04-17T12:30:50-0500`: the 5-character offset is cut off and
/// the remainder must match `YYYY-MM-DDTHH:MM:SS` exactly.
pub fn parse_posting_date(row: usize, value: &str) -> Result<NaiveDateTime, LoadError> {
    let invalid = || LoadError::InvalidDate {
        row,
        value: value.to_string(),
    };

    let cut = value.len().checked_sub(TZ_SUFFIX_LEN).ok_or_else(invalid)?;
    let local = value.get(..cut).ok_or_else(invalid)?;
    NaiveDateTime::parse_from_str(local, DATE_FORMAT).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::{Datelike, Timelike};
    use tempfile::NamedTempFile;

    use super::*;

    const HEADER: &str = ",id,url,region,region_url,price,year,manufacturer,model,condition,cylinders,fuel,odometer,title_status,transmission,VIN,drive,size,category,paint_color,image_url,description,state,lat,lon,posting_date";

    fn csv_row(index: usize, region: &str, state: &str, drive: &str, date: &str) -> String {
        format!(
            "{index},7000{index},http://x,{region},http://r,6995.0,2012.0,ford,f-150,good,6 cylinders,gas,91000.0,clean,automatic,VIN{index},{drive},full-size,truck,white,http://img,nice truck,{state},42.36,-71.06,{date}"
        )
    }

    fn csv_text(rows: &[String]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text.push('\n');
        text
    }

    #[test]
    fn loads_and_normalises_csv_rows() {
        let text = csv_text(&[
            csv_row(0, "st louis", "mo", "4wd", "2021-04-17T12:30:50-0500"),
            csv_row(1, "boston", "MA", "FWD", "2021-05-03T08:00:00-0400"),
        ]);
        let ds = load_csv_reader(text.as_bytes()).unwrap();

        assert_eq!(ds.len(), 2);
        let first = &ds.listings()[0];
        assert_eq!(first.region, "St Louis");
        assert_eq!(first.state, "MO");
        assert_eq!(first.state_name, Some("Missouri"));
        assert_eq!(first.year, 2012);
        assert_eq!(first.price, 6995.0);
        assert_eq!(first.vin, "VIN0");
        assert_eq!(first.posted_at.hour(), 12);
        assert_eq!(first.posted_at.day(), 17);
        assert_eq!(ds.listings()[1].drive, "FWD");
    }

    #[test]
    fn drops_rows_with_any_missing_value() {
        let incomplete = csv_row(1, "boston", "MA", " ", "2021-05-03T08:00:00-0400");
        let text = csv_text(&[
            csv_row(0, "boston", "MA", "4wd", "2021-04-17T12:30:50-0500"),
            incomplete,
            csv_row(2, "albany", "NY", "rwd", "2021-04-18T09:15:00-0500"),
        ]);
        let ds = load_csv_reader(text.as_bytes()).unwrap();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.listings()[0].vin, "VIN0");
        assert_eq!(ds.listings()[1].vin, "VIN2");
    }

    #[test]
    fn discarded_columns_may_be_empty() {
        let row = csv_row(0, "boston", "MA", "4wd", "2021-04-17T12:30:50-0500")
            .replace("http://img,nice truck", ",");
        let ds = load_csv_reader(csv_text(&[row]).as_bytes()).unwrap();
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn missing_required_columns_are_fatal() {
        let text = "region,price,year\nboston,1,2000\n";
        match load_csv_reader(text.as_bytes()) {
            Err(LoadError::MissingColumns(cols)) => {
                assert!(cols.contains(&"VIN".to_string()));
                assert!(cols.contains(&"posting_date".to_string()));
                assert!(!cols.contains(&"region".to_string()));
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn malformed_date_is_fatal() {
        let text = csv_text(&[csv_row(0, "boston", "MA", "4wd", "04/17/2021 12:30-0500")]);
        assert!(matches!(
            load_csv_reader(text.as_bytes()),
            Err(LoadError::InvalidDate { row: 0, .. })
        ));
    }

    #[test]
    fn posting_date_requires_offset_suffix() {
        assert!(parse_posting_date(0, "2021-04-17T12:30:50-0500").is_ok());
        assert!(parse_posting_date(0, "2021-04-17T12:30:50").is_err());
        assert!(parse_posting_date(0, "-05").is_err());
    }

    #[test]
    fn negative_price_is_fatal() {
        let row = csv_row(0, "boston", "MA", "4wd", "2021-04-17T12:30:50-0500")
            .replace(",6995.0,", ",-5,");
        assert!(matches!(
            load_csv_reader(csv_text(&[row]).as_bytes()),
            Err(LoadError::InvalidNumber { column: "price", .. })
        ));
    }

    #[test]
    fn loads_json_records_from_file() {
        let json = r#"[
            {"region": "boston", "price": 6995, "year": 2012, "manufacturer": "ford",
             "model": "f-150", "condition": "good", "cylinders": "6 cylinders", "fuel": "gas",
             "odometer": 91000, "title_status": "clean", "transmission": "automatic",
             "VIN": "ABC", "drive": "4wd", "size": "full-size", "category": "truck",
             "paint_color": "white", "state": "ma", "lat": 42.36, "lon": -71.06,
             "posting_date": "2021-04-17T12:30:50-0500", "url": "http://x"},
            {"region": "boston", "price": null, "year": 2012, "manufacturer": "ford",
             "model": "f-150", "condition": "good", "cylinders": "6 cylinders", "fuel": "gas",
             "odometer": 91000, "title_status": "clean", "transmission": "automatic",
             "VIN": "DEF", "drive": "4wd", "size": "full-size", "category": "truck",
             "paint_color": "white", "state": "ma", "lat": 42.36, "lon": -71.06,
             "posting_date": "2021-04-17T12:30:50-0500"}
        ]"#;
        let mut tmp = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(tmp, "{json}").unwrap();

        let ds = load_file(tmp.path()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.listings()[0].state, "MA");
        assert_eq!(ds.listings()[0].price, 6995.0);
    }

    #[test]
    fn loads_csv_from_file_by_extension() {
        let mut tmp = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(
            tmp,
            "{}",
            csv_text(&[csv_row(0, "boston", "MA", "4wd", "2021-04-17T12:30:50-0500")])
        )
        .unwrap();
        assert_eq!(load_file(tmp.path()).unwrap().len(), 1);
    }

    fn write_parquet(path: &Path, drives: &[Option<&str>]) {
        use std::sync::Arc;

        use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let n = drives.len();
        let text = |v: &str| -> ArrayRef { Arc::new(StringArray::from(vec![v; n])) };
        let columns: Vec<(&str, ArrayRef)> = vec![
            ("id", Arc::new(Int64Array::from((0..n as i64).collect::<Vec<_>>()))),
            ("region", text("sf bay area")),
            ("price", Arc::new(Float64Array::from(vec![6995.0; n]))),
            ("year", Arc::new(Int64Array::from(vec![2012; n]))),
            ("manufacturer", text("ford")),
            ("model", text("f-150")),
            ("condition", text("good")),
            ("cylinders", text("6 cylinders")),
            ("fuel", text("gas")),
            ("odometer", Arc::new(Float64Array::from(vec![91000.0; n]))),
            ("title_status", text("clean")),
            ("transmission", text("automatic")),
            (
                "VIN",
                Arc::new(StringArray::from(
                    (0..n).map(|i| format!("VIN{i}")).collect::<Vec<_>>(),
                )),
            ),
            ("drive", Arc::new(StringArray::from(drives.to_vec()))),
            ("size", text("full-size")),
            ("category", text("truck")),
            ("paint_color", text("white")),
            ("state", text("ca")),
            ("lat", Arc::new(Float64Array::from(vec![37.77; n]))),
            ("lon", Arc::new(Float64Array::from(vec![-122.42; n]))),
            ("posting_date", text("2021-04-17T12:30:50-0700")),
        ];
        let schema = Arc::new(Schema::new(
            columns
                .iter()
                .map(|(name, a)| Field::new(*name, a.data_type().clone(), true))
                .collect::<Vec<_>>(),
        ));
        let batch =
            RecordBatch::try_new(schema.clone(), columns.into_iter().map(|(_, a)| a).collect())
                .unwrap();

        let mut writer = ArrowWriter::try_new(File::create(path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn loads_parquet_and_drops_rows_with_nulls() {
        let tmp = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        write_parquet(tmp.path(), &[Some("4wd"), None, Some("FWD")]);

        let ds = load_file(tmp.path()).unwrap();
        assert_eq!(ds.len(), 2);
        let first = &ds.listings()[0];
        assert_eq!(first.price, 6995.0);
        assert_eq!(first.year, 2012);
        assert_eq!(first.odometer, 91000.0);
        assert_eq!(first.lat, 37.77);
        assert_eq!(first.region, "Sf Bay Area");
        assert_eq!(first.state, "CA");
        assert_eq!(ds.listings()[1].vin, "VIN2");
        assert_eq!(ds.listings()[1].drive, "FWD");
    }

    #[test]
    fn parquet_without_required_columns_is_fatal() {
        use std::sync::Arc;

        use arrow::array::{ArrayRef, Float64Array};
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let price: ArrayRef = Arc::new(Float64Array::from(vec![1.0]));
        let schema = Arc::new(Schema::new(vec![Field::new("price", price.data_type().clone(), false)]));
        let batch = RecordBatch::try_new(schema.clone(), vec![price]).unwrap();

        let tmp = tempfile::Builder::new().suffix(".pq").tempfile().unwrap();
        let mut writer =
            ArrowWriter::try_new(File::create(tmp.path()).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        assert!(matches!(
            load_file(tmp.path()),
            Err(LoadError::MissingColumns(cols)) if cols.contains(&"VIN".to_string())
        ));
    }

    #[test]
    fn rejects_unknown_extensions() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().with_extension("xls");
        assert!(matches!(
            load_file(&path),
            Err(LoadError::UnsupportedFormat(ext)) if ext == "xls"
        ));
    }
}
