// Excel/ODS snapshot import (xlsx, xlsm, xls, xlsb, ods)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use stocktally_core::{Dataset, Value};

/// Read the first worksheet; its first row is the header.
pub fn import(path: &Path) -> Result<Dataset, String> {
    let mut workbook = open_workbook_auto(path).map_err(|e| format!("Failed to open workbook: {}", e))?;

    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Err("Workbook contains no sheets".to_string());
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Err(format!("Sheet '{}' is empty", sheet_name));
    };
    let columns: Vec<String> = header.iter().enumerate().map(|(i, c)| header_name(i, c)).collect();

    let mut dataset = Dataset::new(columns);
    for row in rows {
        let values: Vec<Value> = row.iter().map(cell_value).collect();
        if values.iter().all(Value::is_null) {
            continue;
        }
        dataset.push_row(values).map_err(|e| e.to_string())?;
    }

    log::debug!(
        "read {} row(s) from {} [{}]",
        dataset.len(),
        path.display(),
        sheet_name
    );
    Ok(dataset)
}

fn header_name(index: usize, cell: &Data) -> String {
    match cell_value(cell) {
        Value::Null => format!("Unnamed: {index}"),
        v => v.to_string(),
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        // integral floats are how spreadsheets store integer ids
        Data::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => Value::Int(*n as i64),
        Data::Float(n) => Value::Float(*n),
        Data::Int(n) => Value::Int(*n),
        Data::Bool(b) => Value::Bool(*b),
        // calamine does not expose the 1904 flag without the dates feature; assume 1900
        Data::DateTime(dt) => from_serial(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

/// Excel 1900-system serial to a date, or to `YYYY-MM-DD HH:MM:SS` text when
/// it carries a time of day.
pub(crate) fn from_serial(serial: f64) -> Value {
    match serial_to_datetime(serial) {
        Some(dt) if dt.time() == chrono::NaiveTime::MIN => Value::Date(dt.date()),
        Some(dt) => Value::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        None => Value::Float(serial),
    }
}

pub(crate) fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    // serial 60 is the phantom 1900-02-29
    let epoch = if serial < 61.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    epoch
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))
}
