// CSV/TSV snapshot import

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use stocktally_core::{Dataset, Value};

/// Read a delimited export. `.tsv` is always tab-separated; anything else
/// has its delimiter sniffed from the first lines.
pub fn import(path: &Path) -> Result<Dataset, String> {
    let content = read_file_as_utf8(path)?;
    let is_tsv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tsv"));
    let delimiter = if is_tsv { b'\t' } else { sniff_delimiter(&content) };
    import_from_string(&content, delimiter)
}

/// Pick the candidate delimiter that splits the sample lines most consistently.
///
/// Score per candidate is (lines with the same field count as line 1) times
/// that field count; a candidate must yield more than one field on line 1.
pub(crate) fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0usize;

    for delim in [b'\t', b';', b',', b'|'] {
        let counts: Vec<usize> = sample.iter().map(|line| field_count(line, delim)).collect();
        let Some(&target) = counts.first() else { break };
        if target <= 1 {
            continue;
        }
        let score = counts.iter().filter(|&&c| c == target).count() * target;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

fn field_count(line: &str, delimiter: u8) -> usize {
    ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(|r| r.ok())
        .map_or(1, |r| r.len())
}

/// Read a file as UTF-8, falling back to Windows-1252 (Excel's usual CSV encoding).
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(s)),
        Err(e) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
            Ok(decoded.into_owned())
        }
    }
}

fn import_from_string(content: &str, delimiter: u8) -> Result<Dataset, String> {
    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers().map_err(|e| e.to_string())?.clone();
    if headers.iter().all(str::is_empty) {
        return Err("file has no header row".to_string());
    }
    let columns: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| if h.is_empty() { format!("Unnamed: {i}") } else { h.to_string() })
        .collect();

    let mut dataset = Dataset::new(columns);
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        dataset
            .push_row(record.iter().map(parse_field).collect())
            .map_err(|e| e.to_string())?;
    }
    Ok(dataset)
}

/// Infer a typed value from a text field.
pub(crate) fn parse_field(field: &str) -> Value {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        // keep zero-padded codes as text
        if !(trimmed.len() > 1 && trimmed.starts_with('0')) {
            return Value::Int(n);
        }
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        if n.is_finite() {
            return Value::Float(n);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Value::Date(d);
    }
    Value::Text(field.to_string())
}
