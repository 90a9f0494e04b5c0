//! Writes a synthetic listings file for trying the dashboard.
//!
//! Usage: `generate_sample [OUTPUT]`, where OUTPUT ends in `.csv` or
//! `.parquet` (default `sample_listings.parquet`).

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const ROWS: usize = 2000;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }
}

/// (region, state code, lat, lon) for a handful of real metro areas.
const PLACES: [(&str, &str, f64, f64); 10] = [
    ("boston", "ma", 42.3601, -71.0589),
    ("worcester / central MA", "ma", 42.2626, -71.8023),
    ("western massachusetts", "ma", 42.1015, -72.5898),
    ("new york city", "ny", 40.7128, -74.0060),
    ("albany", "ny", 42.6526, -73.7562),
    ("los angeles", "ca", 34.0522, -118.2437),
    ("sf bay area", "ca", 37.7749, -122.4194),
    ("austin", "tx", 30.2672, -97.7431),
    ("denver", "co", 39.7392, -104.9903),
    ("seattle-tacoma", "wa", 47.6062, -122.3321),
];

const MAKES: [(&str, &[&str]); 5] = [
    ("ford", &["f-150", "escape", "focus"]),
    ("toyota", &["camry", "corolla", "rav4"]),
    ("honda", &["civic", "accord", "cr-v"]),
    ("chevrolet", &["silverado 1500", "malibu"]),
    ("subaru", &["outback", "forester"]),
];

const CONDITIONS: [&str; 4] = ["excellent", "good", "fair", "like new"];
const CYLINDERS: [&str; 3] = ["4 cylinders", "6 cylinders", "8 cylinders"];
const FUELS: [&str; 3] = ["gas", "diesel", "hybrid"];
const DRIVES: [&str; 4] = ["4wd", "4WD", "fwd", "rwd"];
const SIZES: [&str; 3] = ["compact", "mid-size", "full-size"];
const CATEGORIES: [&str; 4] = ["sedan", "SUV", "truck", "wagon"];
const COLORS: [&str; 5] = ["white", "black", "silver", "blue", "red"];

struct Columns {
    index: Vec<i64>,
    id: Vec<i64>,
    url: Vec<String>,
    region: Vec<String>,
    region_url: Vec<String>,
    price: Vec<f64>,
    year: Vec<i64>,
    manufacturer: Vec<String>,
    model: Vec<String>,
    condition: Vec<Option<String>>,
    cylinders: Vec<String>,
    fuel: Vec<String>,
    odometer: Vec<f64>,
    title_status: Vec<String>,
    transmission: Vec<String>,
    vin: Vec<String>,
    drive: Vec<String>,
    size: Vec<Option<String>>,
    category: Vec<String>,
    paint_color: Vec<String>,
    image_url: Vec<String>,
    description: Vec<String>,
    state: Vec<String>,
    lat: Vec<f64>,
    lon: Vec<f64>,
    posting_date: Vec<String>,
}

fn generate(rng: &mut SimpleRng) -> Columns {
    let mut c = Columns {
        index: Vec::new(),
        id: Vec::new(),
        url: Vec::new(),
        region: Vec::new(),
        region_url: Vec::new(),
        price: Vec::new(),
        year: Vec::new(),
        manufacturer: Vec::new(),
        model: Vec::new(),
        condition: Vec::new(),
        cylinders: Vec::new(),
        fuel: Vec::new(),
        odometer: Vec::new(),
        title_status: Vec::new(),
        transmission: Vec::new(),
        vin: Vec::new(),
        drive: Vec::new(),
        size: Vec::new(),
        category: Vec::new(),
        paint_color: Vec::new(),
        image_url: Vec::new(),
        description: Vec::new(),
        state: Vec::new(),
        lat: Vec::new(),
        lon: Vec::new(),
        posting_date: Vec::new(),
    };

    for i in 0..ROWS {
        let (region, state, lat, lon) = PLACES[rng.below(PLACES.len())];
        let (make, models) = MAKES[rng.below(MAKES.len())];
        let year = 2000 + rng.below(21) as i64;
        let age = (2021 - year) as f64;
        let odometer = (age * 11_000.0 + rng.next_f64() * 20_000.0).round();
        let base = (30_000.0 - age * 1_300.0).max(1_500.0);
        let price = (base * (0.8 + 0.4 * rng.next_f64())).round();

        // Every tenth listing reuses its metro's exact coordinates; the rest
        // are scattered around it.
        let (lat, lon) = if i % 10 == 0 {
            (lat, lon)
        } else {
            (lat + (rng.next_f64() - 0.5) * 0.6, lon + (rng.next_f64() - 0.5) * 0.6)
        };

        c.index.push(i as i64);
        c.id.push(7_300_000_000 + i as i64);
        c.url.push(format!("https://example.org/listing/{i}"));
        c.region.push(region.to_string());
        c.region_url.push(format!("https://{}.example.org", region.replace(' ', "")));
        c.price.push(price);
        c.year.push(year);
        c.manufacturer.push(make.to_string());
        c.model.push(rng.pick(models).to_string());
        // A few incomplete rows to exercise the loader's row dropping.
        c.condition
            .push((i % 37 != 5).then(|| rng.pick(&CONDITIONS).to_string()));
        c.cylinders.push(rng.pick(&CYLINDERS).to_string());
        c.fuel.push(rng.pick(&FUELS).to_string());
        c.odometer.push(odometer);
        c.title_status.push("clean".to_string());
        c.transmission.push("automatic".to_string());
        c.vin.push(format!("1FTEW1EP{:09}", i));
        c.drive.push(rng.pick(&DRIVES).to_string());
        c.size.push((i % 53 != 7).then(|| rng.pick(&SIZES).to_string()));
        c.category.push(rng.pick(&CATEGORIES).to_string());
        c.paint_color.push(rng.pick(&COLORS).to_string());
        c.image_url.push(format!("https://images.example.org/{i}.jpg"));
        c.description.push(format!("{year} {make} in great shape"));
        c.state.push(state.to_string());
        c.lat.push(lat);
        c.lon.push(lon);
        c.posting_date.push(format!(
            "2021-{:02}-{:02}T{:02}:{:02}:{:02}-0500",
            4 + rng.below(2),
            1 + rng.below(28),
            rng.below(24),
            rng.below(60),
            rng.below(60)
        ));
    }
    c
}

fn utf8(values: &[String]) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

fn nullable_utf8(values: &[Option<String>]) -> ArrayRef {
    Arc::new(values.iter().map(|v| v.as_deref()).collect::<StringArray>())
}

fn to_batch(c: &Columns) -> Result<RecordBatch> {
    let columns: Vec<(&str, ArrayRef)> = vec![
        ("", Arc::new(Int64Array::from(c.index.clone()))),
        ("id", Arc::new(Int64Array::from(c.id.clone()))),
        ("url", utf8(&c.url)),
        ("region", utf8(&c.region)),
        ("region_url", utf8(&c.region_url)),
        ("price", Arc::new(Float64Array::from(c.price.clone()))),
        ("year", Arc::new(Int64Array::from(c.year.clone()))),
        ("manufacturer", utf8(&c.manufacturer)),
        ("model", utf8(&c.model)),
        ("condition", nullable_utf8(&c.condition)),
        ("cylinders", utf8(&c.cylinders)),
        ("fuel", utf8(&c.fuel)),
        ("odometer", Arc::new(Float64Array::from(c.odometer.clone()))),
        ("title_status", utf8(&c.title_status)),
        ("transmission", utf8(&c.transmission)),
        ("VIN", utf8(&c.vin)),
        ("drive", utf8(&c.drive)),
        ("size", nullable_utf8(&c.size)),
        ("category", utf8(&c.category)),
        ("paint_color", utf8(&c.paint_color)),
        ("image_url", utf8(&c.image_url)),
        ("description", utf8(&c.description)),
        ("state", utf8(&c.state)),
        ("lat", Arc::new(Float64Array::from(c.lat.clone()))),
        ("lon", Arc::new(Float64Array::from(c.lon.clone()))),
        ("posting_date", utf8(&c.posting_date)),
    ];

    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, array)| {
                Field::new(*name, array.data_type().clone(), array.null_count() > 0)
            })
            .collect::<Vec<_>>(),
    ));
    let arrays = columns.into_iter().map(|(_, a)| a).collect();
    RecordBatch::try_new(schema, arrays).context("building record batch")
}

fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = std::fs::File::create(path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).context("creating writer")?;
    writer.write(batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn write_csv(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = std::fs::File::create(path).context("creating output file")?;
    let mut writer = arrow::csv::WriterBuilder::new()
        .with_header(true)
        .build(file);
    writer.write(batch).context("writing CSV")?;
    Ok(())
}

fn main() -> Result<()> {
    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_listings.parquet".to_string());
    let path = Path::new(&output);

    let mut rng = SimpleRng::new(42);
    let batch = to_batch(&generate(&mut rng))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("parquet") | Some("pq") => write_parquet(path, &batch)?,
        Some("csv") => write_csv(path, &batch)?,
        other => bail!("unsupported output extension: {other:?}"),
    }

    println!("Wrote {} listings to {output}", batch.num_rows());
    Ok(())
}
