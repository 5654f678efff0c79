use std::io::Write;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::record_batch::RecordBatch;
use weir_common::Result;
use weir_operators::{OperatorContext, Sink};

/// Prints record batches as fixed-width ASCII tables.
pub struct Console {
    max_rows: i32,
    writer: Box<dyn Write + Send>,
    count: i64,
}

impl Console {
    /// Create a console sink writing to stdout.
    ///
    /// `max_rows > 0` caps the rows printed per batch.
    pub fn new(max_rows: i32) -> Self {
        Self {
            max_rows,
            writer: Box::new(std::io::stdout()),
            count: 0,
        }
    }

    /// Create a console sink with an injected writer.
    pub fn with_writer(max_rows: i32, writer: Box<dyn Write + Send>) -> Self {
        Self {
            max_rows,
            writer,
            count: 0,
        }
    }

    /// Total rows written so far.
    pub fn rows_written(&self) -> i64 {
        self.count
    }
}

impl Sink for Console {
    fn open(&mut self, _ctx: &OperatorContext) -> Result<()> {
        Ok(())
    }

    fn write_batch(&mut self, batch: RecordBatch) -> Result<()> {
        let schema = batch.schema();
        let num_cols = batch.num_columns();
        let mut num_rows = batch.num_rows();
        if self.max_rows > 0 && num_rows > self.max_rows as usize {
            num_rows = self.max_rows as usize;
        }

        // Column widths cover the header and every printed value.
        let mut widths: Vec<usize> = schema.fields().iter().map(|f| f.name().len()).collect();
        for row in 0..num_rows {
            for col in 0..num_cols {
                let val = format_value(batch.column(col), row);
                if val.len() > widths[col] {
                    widths[col] = val.len();
                }
            }
        }

        let header = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(col, f)| pad_right(f.name(), widths[col]))
            .collect::<Vec<_>>()
            .join(" | ");
        writeln!(self.writer, "| {header} |")?;

        let separator = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-|-");
        writeln!(self.writer, "|-{separator}-|")?;

        for row in 0..num_rows {
            let line = (0..num_cols)
                .map(|col| pad_right(&format_value(batch.column(col), row), widths[col]))
                .collect::<Vec<_>>()
                .join(" | ");
            writeln!(self.writer, "| {line} |")?;
        }

        if batch.num_rows() > num_rows {
            writeln!(self.writer, "... ({} more rows)", batch.num_rows() - num_rows)?;
        }
        writeln!(self.writer)?;

        self.count += batch.num_rows() as i64;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn format_value(arr: &ArrayRef, row: usize) -> String {
    if arr.is_null(row) {
        return "NULL".to_string();
    }
    let any = arr.as_any();
    if let Some(a) = any.downcast_ref::<Int64Array>() {
        a.value(row).to_string()
    } else if let Some(a) = any.downcast_ref::<Int32Array>() {
        a.value(row).to_string()
    } else if let Some(a) = any.downcast_ref::<Float64Array>() {
        format!("{:.4}", a.value(row))
    } else if let Some(a) = any.downcast_ref::<Float32Array>() {
        format!("{:.4}", a.value(row))
    } else if let Some(a) = any.downcast_ref::<StringArray>() {
        a.value(row).to_string()
    } else if let Some(a) = any.downcast_ref::<BooleanArray>() {
        if a.value(row) { "true" } else { "false" }.to_string()
    } else {
        "?".to_string()
    }
}

fn pad_right(s: &str, width: usize) -> String {
    if s.len() >= width {
        s.to_string()
    } else {
        format!("{s}{}", " ".repeat(width - s.len()))
    }
}
