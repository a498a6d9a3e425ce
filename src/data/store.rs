use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, Float32Array, Float64Array, Float64Builder, Int32Array, Int32Builder,
    Int64Array, LargeListArray, LargeStringArray, ListArray, ListBuilder, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use super::model::{SpectrumRecord, SpectrumTable};

/// File name of the cached query result inside the output directory.
pub const CACHE_FILE_NAME: &str = "DESI_DR1_spec.parquet";

// ---------------------------------------------------------------------------
// SpectrumCache – explicit on-disk cache of one retrieved table
// ---------------------------------------------------------------------------

/// Parquet file holding the last retrieved [`SpectrumTable`].
///
/// Presence of the file is what makes a run skip the remote query.
#[derive(Debug, Clone)]
pub struct SpectrumCache {
    path: PathBuf,
}

impl SpectrumCache {
    /// Cache at `<dir>/DESI_DR1_spec.parquet`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CACHE_FILE_NAME),
        }
    }

    /// Cache at an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the cached table, `None` when no cache file exists yet.
    pub fn load(&self) -> Result<Option<SpectrumTable>> {
        if !self.exists() {
            return Ok(None);
        }
        let table = load_parquet(&self.path)
            .with_context(|| format!("reading cache {}", self.path.display()))?;
        Ok(Some(table))
    }

    /// Write `table` as Snappy-compressed Parquet, replacing any previous cache.
    pub fn store(&self, table: &SpectrumTable) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        write_parquet(&self.path, table)
            .with_context(|| format!("writing cache {}", self.path.display()))
    }
}

// ---------------------------------------------------------------------------
// Public entry-point for arbitrary files
// ---------------------------------------------------------------------------

/// Load a spectrum table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – the cache layout written by [`SpectrumCache::store`]
/// * `.json`    – `[{ "sparcl_id": ..., "wavelength": [...], ... }, ...]`
pub fn load_file(path: &Path) -> Result<SpectrumTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path) -> Result<SpectrumTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let records: Vec<SpectrumRecord> =
        serde_json::from_str(&text).context("parsing JSON records")?;
    for (i, rec) in records.iter().enumerate() {
        rec.validate().with_context(|| format!("Row {i}"))?;
    }
    Ok(SpectrumTable::from_records(records))
}

// ---------------------------------------------------------------------------
// Parquet schema
// ---------------------------------------------------------------------------

fn list_of(item: DataType) -> DataType {
    DataType::List(Arc::new(Field::new("item", item, true)))
}

/// Column layout of the cache file.
pub fn cache_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("sparcl_id", DataType::Utf8, false),
        Field::new("specid", DataType::Int64, true),
        Field::new("targetid", DataType::Int64, true),
        Field::new("data_release", DataType::Utf8, false),
        Field::new("ra", DataType::Float64, false),
        Field::new("dec", DataType::Float64, false),
        Field::new("spectype", DataType::Utf8, false),
        Field::new("redshift", DataType::Float64, false),
        Field::new("wavelength", list_of(DataType::Float64), false),
        Field::new("flux", list_of(DataType::Float64), false),
        Field::new("ivar", list_of(DataType::Float64), false),
        Field::new("model", list_of(DataType::Float64), true),
        Field::new("mask", list_of(DataType::Int32), true),
    ]))
}

// ---------------------------------------------------------------------------
// Parquet writer
// ---------------------------------------------------------------------------

fn f64_list<'a>(rows: impl Iterator<Item = Option<&'a Vec<f64>>>) -> ArrayRef {
    let mut builder = ListBuilder::new(Float64Builder::new());
    for row in rows {
        match row {
            Some(values) => {
                builder.values().append_slice(values);
                builder.append(true);
            }
            None => builder.append(false),
        }
    }
    Arc::new(builder.finish())
}

fn i32_list<'a>(rows: impl Iterator<Item = Option<&'a Vec<i32>>>) -> ArrayRef {
    let mut builder = ListBuilder::new(Int32Builder::new());
    for row in rows {
        match row {
            Some(values) => {
                builder.values().append_slice(values);
                builder.append(true);
            }
            None => builder.append(false),
        }
    }
    Arc::new(builder.finish())
}

/// Convert a table into a single Arrow record batch in cache layout.
pub fn to_record_batch(table: &SpectrumTable) -> Result<RecordBatch> {
    let recs = &table.records;
    let strings = |f: fn(&SpectrumRecord) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(recs.iter().map(f).collect::<Vec<_>>()))
    };
    let floats = |f: fn(&SpectrumRecord) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(recs.iter().map(f).collect::<Vec<_>>()))
    };
    let ints = |f: fn(&SpectrumRecord) -> Option<i64>| -> ArrayRef {
        Arc::new(Int64Array::from(recs.iter().map(f).collect::<Vec<_>>()))
    };

    let columns: Vec<ArrayRef> = vec![
        strings(|r| r.sparcl_id.as_str()),
        ints(|r| r.specid),
        ints(|r| r.targetid),
        strings(|r| r.data_release.as_str()),
        floats(|r| r.ra),
        floats(|r| r.dec),
        strings(|r| r.spectype.as_str()),
        floats(|r| r.redshift),
        f64_list(recs.iter().map(|r| Some(&r.wavelength))),
        f64_list(recs.iter().map(|r| Some(&r.flux))),
        f64_list(recs.iter().map(|r| Some(&r.ivar))),
        f64_list(recs.iter().map(|r| r.model.as_ref())),
        i32_list(recs.iter().map(|r| r.mask.as_ref())),
    ];

    RecordBatch::try_new(cache_schema(), columns).context("building record batch")
}

fn write_parquet(path: &Path, table: &SpectrumTable) -> Result<()> {
    let batch = to_record_batch(table)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), Some(props)).context("creating writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;

    log::debug!("wrote {} records to {}", table.len(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file in cache layout.
///
/// Works with files written by this crate and by **Pandas**
/// (`df.to_parquet()` after `json_normalize` of SPARCL records):
/// list columns may be List or LargeList of Float32 or Float64, and the
/// `specid`, `targetid`, `model` and `mask` columns are optional.
fn load_parquet(path: &Path) -> Result<SpectrumTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let cols = Columns::locate(&batch)?;

        for row in 0..batch.num_rows() {
            let rec = cols
                .record(row)
                .with_context(|| format!("Row {}", records.len()))?;
            rec.validate()?;
            records.push(rec);
        }
    }

    Ok(SpectrumTable::from_records(records))
}

/// Column handles of one batch.
struct Columns<'a> {
    sparcl_id: &'a ArrayRef,
    specid: Option<&'a ArrayRef>,
    targetid: Option<&'a ArrayRef>,
    data_release: &'a ArrayRef,
    ra: &'a ArrayRef,
    dec: &'a ArrayRef,
    spectype: &'a ArrayRef,
    redshift: &'a ArrayRef,
    wavelength: &'a ArrayRef,
    flux: &'a ArrayRef,
    ivar: &'a ArrayRef,
    model: Option<&'a ArrayRef>,
    mask: Option<&'a ArrayRef>,
}

impl<'a> Columns<'a> {
    fn locate(batch: &'a RecordBatch) -> Result<Self> {
        let required = move |name: &str| -> Result<&'a ArrayRef> {
            batch
                .column_by_name(name)
                .with_context(|| format!("Parquet file missing '{name}' column"))
        };
        let optional = move |name: &str| batch.column_by_name(name);

        Ok(Self {
            sparcl_id: required("sparcl_id")?,
            specid: optional("specid"),
            targetid: optional("targetid"),
            data_release: required("data_release")?,
            ra: required("ra")?,
            dec: required("dec")?,
            spectype: required("spectype")?,
            redshift: required("redshift")?,
            wavelength: required("wavelength")?,
            flux: required("flux")?,
            ivar: required("ivar")?,
            model: optional("model"),
            mask: optional("mask"),
        })
    }

    fn record(&self, row: usize) -> Result<SpectrumRecord> {
        let opt_f64_list = |col: Option<&ArrayRef>| -> Result<Option<Vec<f64>>> {
            match col {
                Some(c) if !c.is_null(row) => extract_f64_list(c, row).map(Some),
                _ => Ok(None),
            }
        };

        Ok(SpectrumRecord {
            sparcl_id: extract_string(self.sparcl_id, row).context("reading 'sparcl_id'")?,
            specid: self.specid.and_then(|c| extract_i64(c, row)),
            targetid: self.targetid.and_then(|c| extract_i64(c, row)),
            data_release: extract_string(self.data_release, row)
                .context("reading 'data_release'")?,
            ra: extract_f64(self.ra, row).context("reading 'ra'")?,
            dec: extract_f64(self.dec, row).context("reading 'dec'")?,
            spectype: extract_string(self.spectype, row).context("reading 'spectype'")?,
            redshift: extract_f64(self.redshift, row).context("reading 'redshift'")?,
            wavelength: extract_f64_list(self.wavelength, row)
                .context("failed to read 'wavelength'")?,
            flux: extract_f64_list(self.flux, row).context("failed to read 'flux'")?,
            ivar: extract_f64_list(self.ivar, row).context("failed to read 'ivar'")?,
            model: opt_f64_list(self.model).context("failed to read 'model'")?,
            mask: match self.mask {
                Some(c) if !c.is_null(row) => {
                    Some(extract_i32_list(c, row).context("failed to read 'mask'")?)
                }
                _ => None,
            },
        })
    }
}

// -- Parquet / Arrow helpers --

/// Values array of a List or LargeList column at the given row.
fn list_values(col: &ArrayRef, row: usize) -> Result<ArrayRef> {
    if col.is_null(row) {
        bail!("null value in list column");
    }
    match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            Ok(list_arr.value(row))
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            Ok(list_arr.value(row))
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    }
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &ArrayRef, row: usize) -> Result<Vec<f64>> {
    let values_array = list_values(col, row)?;

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

fn extract_i32_list(col: &ArrayRef, row: usize) -> Result<Vec<i32>> {
    let values_array = list_values(col, row)?;

    if let Some(i32_arr) = values_array.as_any().downcast_ref::<Int32Array>() {
        Ok(i32_arr.iter().map(|v| v.unwrap_or(0)).collect())
    } else if let Some(i64_arr) = values_array.as_any().downcast_ref::<Int64Array>() {
        i64_arr
            .iter()
            .map(|v| {
                let v = v.unwrap_or(0);
                i32::try_from(v).with_context(|| format!("mask value {v} does not fit in i32"))
            })
            .collect()
    } else {
        bail!(
            "List inner type is {:?}, expected Int32 or Int64",
            values_array.data_type()
        )
    }
}

fn extract_string(col: &ArrayRef, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null value in string column");
    }
    if let Some(s) = col.as_any().downcast_ref::<StringArray>() {
        Ok(s.value(row).to_string())
    } else if let Some(s) = col.as_any().downcast_ref::<LargeStringArray>() {
        Ok(s.value(row).to_string())
    } else {
        bail!("Expected string column, got {:?}", col.data_type())
    }
}

fn extract_f64(col: &ArrayRef, row: usize) -> Result<f64> {
    if col.is_null(row) {
        return Ok(f64::NAN);
    }
    if let Some(arr) = col.as_any().downcast_ref::<Float64Array>() {
        Ok(arr.value(row))
    } else if let Some(arr) = col.as_any().downcast_ref::<Float32Array>() {
        Ok(arr.value(row) as f64)
    } else if let Some(arr) = col.as_any().downcast_ref::<Int64Array>() {
        Ok(arr.value(row) as f64)
    } else {
        bail!("Expected numeric column, got {:?}", col.data_type())
    }
}

fn extract_i64(col: &ArrayRef, row: usize) -> Option<i64> {
    if col.is_null(row) {
        return None;
    }
    if let Some(arr) = col.as_any().downcast_ref::<Int64Array>() {
        Some(arr.value(row))
    } else {
        col.as_any()
            .downcast_ref::<Int32Array>()
            .map(|arr| arr.value(row) as i64)
    }
}
