use std::borrow::Cow;
use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{info, warn};

use crate::config::datasets::LoadOptions;
use crate::data::dataset::{Dataset, Row};
use crate::errors::KitError;

/// Load a delimited file into a dataset.
///
/// A missing source is a [`KitError::DataLoad`] when `options.required`, an
/// empty dataset otherwise. Records that fail to parse are logged and skipped.
pub fn load(name: &str, source: &Path, options: &LoadOptions) -> Result<Dataset, KitError> {
    let content = match fs::read_to_string(source) {
        Ok(content) => content,
        Err(err) => {
            let reason = format!("cannot read '{}': {}", source.display(), err);
            if options.required {
                return Err(KitError::DataLoad {
                    dataset: name.to_owned(),
                    reason,
                });
            }
            warn!(dataset = name, %reason, "optional dataset unavailable, using empty dataset");
            return Ok(Dataset::empty(name));
        }
    };
    read_rows(name, &content, options)
}

/// Same as [`load`] for in-memory text
pub fn load_str(name: &str, content: &str, options: &LoadOptions) -> Result<Dataset, KitError> {
    read_rows(name, content, options)
}

fn read_rows(name: &str, content: &str, options: &LoadOptions) -> Result<Dataset, KitError> {
    let delimiter = u8::try_from(options.delimiter).map_err(|_| KitError::DataLoad {
        dataset: name.to_owned(),
        reason: format!("delimiter '{}' is not a single byte", options.delimiter),
    })?;

    // the csv reader drops empty lines on its own
    let source = if options.skip_empty_lines {
        Cow::Borrowed(content)
    } else {
        Cow::Owned(fill_empty_lines(content, delimiter))
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(options.has_headers)
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(source.as_bytes());

    let headers: Option<Vec<String>> = if options.has_headers {
        let headers = reader.headers().map_err(|err| KitError::DataLoad {
            dataset: name.to_owned(),
            reason: format!("unreadable header row: {}", err),
        })?;
        Some(headers.iter().map(|h| h.to_owned()).collect())
    } else {
        None
    };

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (line, record) in reader.records().enumerate() {
        match record {
            Ok(record) => {
                if options.skip_empty_lines && is_blank(&record) {
                    continue;
                }
                rows.push(to_row(&record, headers.as_deref()));
            }
            Err(err) => {
                skipped += 1;
                warn!(dataset = name, record = line, error = %err, "skipping unparsable record");
            }
        }
    }

    info!(dataset = name, rows = rows.len(), skipped, "dataset loaded");
    Ok(Dataset::new(name, rows))
}

/// Replace every empty line after the first record with a record of empty
/// fields, as wide as that first record.
fn fill_empty_lines(content: &str, delimiter: u8) -> String {
    let mut lines = content.lines();
    let mut out: Vec<Cow<'_, str>> = Vec::new();

    let first = loop {
        match lines.next() {
            Some(line) if is_empty_line(line) => out.push(Cow::Borrowed(line)),
            Some(line) => break line,
            None => return content.to_owned(),
        }
    };
    out.push(Cow::Borrowed(first));

    let width = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .from_reader(first.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .map_or(1, |record| record.len().max(1));
    let blank_record = if width == 1 {
        "\"\"".to_owned()
    } else {
        char::from(delimiter).to_string().repeat(width - 1)
    };

    for line in lines {
        if is_empty_line(line) {
            out.push(Cow::Owned(blank_record.clone()));
        } else {
            out.push(Cow::Borrowed(line));
        }
    }
    out.join("\n")
}

fn is_empty_line(line: &str) -> bool {
    line.trim_end_matches('\r').is_empty()
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

/// Without headers columns are named by zero-based position.
fn to_row(record: &StringRecord, headers: Option<&[String]>) -> Row {
    record
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            let key = headers
                .and_then(|h| h.get(idx))
                .cloned()
                .unwrap_or_else(|| idx.to_string());
            (key, value.to_owned())
        })
        .collect()
}
