use crate::config::TimestampRecord;
use anyhow::{Result, anyhow};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

const COLUMNS: [&str; 5] = ["source", "raw", "before", "canonical", "error"];

pub enum Writer {
    Stdout(Box<dyn Write + Send>),
    JsonFile(BufWriter<File>, bool), // bool tracks if we've written the opening bracket
    JsonlFile(BufWriter<File>),
    CsvFile(BufWriter<File>, bool), // bool tracks if we've written headers
    TsvFile(BufWriter<File>, bool),
}

fn columns(rec: &TimestampRecord) -> [&str; 5] {
    [
        rec.source.as_deref().unwrap_or(""),
        rec.raw.as_deref().unwrap_or(""),
        rec.before.as_deref().unwrap_or(""),
        rec.canonical.as_deref().unwrap_or(""),
        rec.error.as_deref().unwrap_or(""),
    ]
}

impl Writer {
    pub fn write_batch(&mut self, records: &[TimestampRecord]) -> Result<()> {
        match self {
            Writer::Stdout(writer) => {
                for rec in records {
                    match (&rec.canonical, &rec.error) {
                        (Some(c), _) => writeln!(writer, "{}", c)?,
                        (None, Some(e)) => writeln!(writer, "{}\t# {}", rec.raw.as_deref().unwrap_or(""), e)?,
                        (None, None) => writeln!(writer, "{}", rec.raw.as_deref().unwrap_or(""))?,
                    }
                }
            }
            Writer::JsonFile(writer, is_first) => {
                for rec in records {
                    if *is_first {
                        write!(writer, "[")?;
                        *is_first = false;
                    } else {
                        write!(writer, ",")?;
                    }
                    let serialized = serde_json::to_string_pretty(rec)?;
                    write!(writer, "\n{}", serialized)?;
                }
            }
            Writer::JsonlFile(writer) => {
                for rec in records {
                    let serialized = serde_json::to_string(rec)?;
                    writeln!(writer, "{}", serialized)?;
                }
            }
            Writer::CsvFile(writer, headers_written) => {
                if !*headers_written {
                    writeln!(writer, "{}", COLUMNS.join(","))?;
                    *headers_written = true;
                }
                for rec in records {
                    let row: Vec<String> = columns(rec).iter().map(|f| escape_csv_field(f)).collect();
                    writeln!(writer, "{}", row.join(","))?;
                }
            }
            Writer::TsvFile(writer, headers_written) => {
                if !*headers_written {
                    writeln!(writer, "{}", COLUMNS.join("\t"))?;
                    *headers_written = true;
                }
                for rec in records {
                    let row: Vec<String> = columns(rec).iter().map(|f| escape_tsv_field(f)).collect();
                    writeln!(writer, "{}", row.join("\t"))?;
                }
            }
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        match self {
            Writer::JsonFile(ref mut writer, is_first) => {
                if is_first {
                    write!(writer, "[")?;
                }
                writeln!(writer, "\n]")?;
                writer.flush()?;
            }
            Writer::JsonlFile(ref mut writer)
            | Writer::CsvFile(ref mut writer, _)
            | Writer::TsvFile(ref mut writer, _) => {
                writer.flush()?;
            }
            Writer::Stdout(ref mut writer) => {
                writer.flush()?;
            }
        }
        Ok(())
    }
}

pub fn create_writer(output_arg: &str) -> Result<Writer> {
    match output_arg {
        "stdout" => Ok(Writer::Stdout(Box::new(io::stdout()))),
        path if path.ends_with(".json") => Ok(Writer::JsonFile(open(path)?, true)),
        path if path.ends_with(".jsonl") || path.ends_with(".ndjson") => {
            Ok(Writer::JsonlFile(open(path)?))
        }
        path if path.ends_with(".csv") => Ok(Writer::CsvFile(open(path)?, false)),
        path if path.ends_with(".tsv") => Ok(Writer::TsvFile(open(path)?, false)),
        path => {
            // Default to JSON file if it looks like a path
            if path.contains('/') || path.contains('\\') || path.contains('.') {
                Ok(Writer::JsonFile(open(path)?, true))
            } else {
                Err(anyhow!(
                    "Unknown output format: {}. Use 'stdout' or a .json/.jsonl/.csv/.tsv path",
                    output_arg
                ))
            }
        }
    }
}

fn open(path: &str) -> Result<BufWriter<File>> {
    if let Some(parent) = Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn escape_tsv_field(field: &str) -> String {
    field
        .replace('\t', " ")
        .replace('\n', " ")
        .replace('\r', " ")
}
