//! Flat data-file output (CSV, JSON, Parquet; CSV and JSON optionally compressed)

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::codec::{detect, Sink};
use super::{prepare_targets, OutputFormat, Target};
use crate::reduce::{ReduceOp, ReducedTable};
use crate::{Error, Result};

/// Reduced values laid out on the union of steps, one column per `(tag, op)`.
struct FlatTable<'a> {
    steps: Vec<i64>,
    columns: Vec<FlatColumn<'a>>,
}

struct FlatColumn<'a> {
    tag: &'a str,
    op: ReduceOp,
    /// `None` where the tag has no row or the statistic is undefined
    values: Vec<Option<f64>>,
}

impl<'a> FlatTable<'a> {
    fn new(reduced: &'a ReducedTable) -> Self {
        let steps: Vec<i64> = reduced
            .iter()
            .flat_map(|(_, by_tag)| by_tag.values().flat_map(|series| series.steps().iter().copied()))
            .collect::<BTreeSet<i64>>()
            .into_iter()
            .collect();
        let index: HashMap<i64, usize> = steps.iter().enumerate().map(|(i, s)| (*s, i)).collect();

        let mut columns = Vec::new();
        for tag in reduced.tags() {
            for (op, by_tag) in reduced.iter() {
                let Some(series) = by_tag.get(tag) else {
                    continue;
                };
                let mut values = vec![None; steps.len()];
                for (step, value) in series.iter() {
                    if !value.is_nan() {
                        values[index[&step]] = Some(value);
                    }
                }
                columns.push(FlatColumn { tag, op, values });
            }
        }
        Self { steps, columns }
    }

    fn record_batch(&self) -> Result<RecordBatch> {
        let mut fields = vec![Field::new("step", DataType::Int64, false)];
        let mut arrays: Vec<ArrayRef> = vec![Arc::new(Int64Array::from(self.steps.clone()))];
        for column in &self.columns {
            let metadata = HashMap::from([
                ("tag".to_string(), column.tag.to_string()),
                ("op".to_string(), column.op.name().to_string()),
            ]);
            fields.push(
                Field::new(format!("{}/{}", column.tag, column.op), DataType::Float64, true)
                    .with_metadata(metadata),
            );
            arrays.push(Arc::new(Float64Array::from(column.values.clone())));
        }
        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }

    /// Three header rows: tags, ops, and the index name.
    fn csv_header(&self) -> Result<RecordBatch> {
        let width = self.columns.len() + 1;
        let mut fields = Vec::with_capacity(width);
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(width);

        fields.push(Field::new("index", DataType::Utf8, false));
        arrays.push(Arc::new(StringArray::from(vec!["", "", "step"])));
        for (i, column) in self.columns.iter().enumerate() {
            fields.push(Field::new(format!("c{i}"), DataType::Utf8, false));
            arrays.push(Arc::new(StringArray::from(vec![
                column.tag,
                column.op.name(),
                "",
            ])));
        }
        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }

    fn to_json(&self) -> BTreeMap<&str, BTreeMap<&str, BTreeMap<i64, Option<f64>>>> {
        let mut nested: BTreeMap<&str, BTreeMap<&str, BTreeMap<i64, Option<f64>>>> =
            BTreeMap::new();
        for column in &self.columns {
            let by_step = self.steps.iter().copied().zip(column.values.iter().copied()).collect();
            nested
                .entry(column.tag)
                .or_default()
                .insert(column.op.name(), by_step);
        }
        nested
    }
}

/// Write `reduced` into a single `.csv`, `.json` or `.parquet` file.
///
/// CSV and JSON are compressed when the name ends in `.gz` or `.zst`.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if the name is not a writable data file,
/// [`Error::OutputConflict`] if the file exists and `overwrite` is not set,
/// or an I/O or encoding error
pub fn write_data_file(
    reduced: &ReducedTable,
    outpath: impl AsRef<Path>,
    overwrite: bool,
) -> Result<()> {
    let outpath = outpath.as_ref();
    let (format, codec) = detect(outpath)?;
    if !format.is_flat() {
        return Err(Error::Configuration(format!(
            "'{}' does not end in .csv, .json or .parquet",
            outpath.display()
        )));
    }
    codec.ensure_available()?;
    prepare_targets(&[Target::File(outpath.to_path_buf())], overwrite)?;
    if let Some(parent) = outpath.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let table = FlatTable::new(reduced);
    let mut out = Sink::create(outpath, codec)?;
    match format {
        OutputFormat::Csv => {
            let header = table.csv_header()?;
            let body = table.record_batch()?;
            let mut writer = WriterBuilder::new().with_header(false).build(&mut out);
            writer.write(&header)?;
            writer.write(&body)?;
            drop(writer);
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &table.to_json())?;
        }
        OutputFormat::Parquet => {
            let batch = table.record_batch()?;
            let mut writer = ArrowWriter::try_new(out, batch.schema(), None)?;
            writer.write(&batch)?;
            out = writer.into_inner()?;
        }
        OutputFormat::EventDirs => {}
    }
    out.finish()
}
