// Report export: classification tables to CSV/XLSX, any report to JSON

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::Serialize;
use thiserror::Error;

use stocktally_config::Labels;
use stocktally_recon::classify::round_percent;
use stocktally_recon::ClassificationRecord;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported export format '{0}' (expected .csv, .xlsx or .json)")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] ::csv::Error),
    #[error(transparent)]
    Xlsx(#[from] XlsxError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Json,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ExportError::UnsupportedFormat(ext)),
        }
    }
}

/// Write the ranked classification to `path`, format chosen by extension.
/// Percentages are rounded to `decimals` places.
pub fn export_classification(
    records: &[ClassificationRecord],
    labels: &Labels,
    decimals: u32,
    path: &Path,
) -> Result<ExportFormat, ExportError> {
    let format = ExportFormat::from_path(path)?;
    match format {
        ExportFormat::Csv => write_csv(records, labels, decimals, path)?,
        ExportFormat::Xlsx => write_xlsx(records, labels, decimals, path)?,
        ExportFormat::Json => write_json(records, path)?,
    }
    log::info!("exported {} product(s) to {}", records.len(), path.display());
    Ok(format)
}

pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), ExportError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

/// Percentage as shown in reports: rounded, with a `%` suffix.
pub fn format_percent(value: f64, decimals: u32) -> String {
    format!("{:.*}%", decimals as usize, round_percent(value, decimals))
}

fn write_csv(records: &[ClassificationRecord], labels: &Labels, decimals: u32, path: &Path) -> Result<(), ExportError> {
    let mut writer = ::csv::Writer::from_path(path)?;
    writer.write_record(labels.classification_headers())?;
    for r in records {
        writer.write_record([
            r.product_code.to_string(),
            r.product_name.clone(),
            r.total_quantity.to_string(),
            format_percent(r.share, decimals),
            format_percent(r.cumulative, decimals),
            r.tier.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_xlsx(records: &[ClassificationRecord], labels: &Labels, decimals: u32, path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(labels.sheet_name)?;

    let bold = Format::new().set_bold();
    let percent = Format::new().set_num_format(percent_format(decimals));

    for (col, header) in labels.classification_headers().iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (i, r) in records.iter().enumerate() {
        let row = i as u32 + 1;
        match r.product_code.as_f64() {
            Some(n) if r.product_code.as_str().is_none() => worksheet.write_number(row, 0, n)?,
            _ => worksheet.write_string(row, 0, r.product_code.to_string())?,
        };
        worksheet.write_string(row, 1, &r.product_name)?;
        worksheet.write_number(row, 2, r.total_quantity as f64)?;
        // stored as fractions so Excel's percent format applies
        worksheet.write_number_with_format(row, 3, round_percent(r.share, decimals) / 100.0, &percent)?;
        worksheet.write_number_with_format(row, 4, round_percent(r.cumulative, decimals) / 100.0, &percent)?;
        worksheet.write_string(row, 5, r.tier.to_string())?;
    }

    worksheet.set_column_width(1, 32)?;
    workbook.save(path)?;
    Ok(())
}

fn percent_format(decimals: u32) -> String {
    if decimals == 0 {
        "0%".to_string()
    } else {
        format!("0.{}%", "0".repeat(decimals as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocktally_config::Locale;
    use stocktally_core::Value;
    use stocktally_recon::Tier;
    use tempfile::tempdir;

    fn records() -> Vec<ClassificationRecord> {
        vec![
            ClassificationRecord {
                product_code: Value::Int(1),
                product_name: "Bolt".into(),
                total_quantity: 2,
                share: 200.0 / 3.0,
                cumulative: 200.0 / 3.0,
                tier: Tier::C,
            },
            ClassificationRecord {
                product_code: Value::Int(2),
                product_name: "Nut".into(),
                total_quantity: 1,
                share: 100.0 / 3.0,
                cumulative: 100.0,
                tier: Tier::C,
            },
        ]
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("abc.XLSX")).unwrap(), ExportFormat::Xlsx);
        assert!(matches!(
            ExportFormat::from_path(Path::new("abc.pdf")),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn percent_rendering() {
        assert_eq!(format_percent(200.0 / 3.0, 2), "66.67%");
        assert_eq!(format_percent(100.0, 0), "100%");
        assert_eq!(percent_format(3), "0.000%");
    }

    #[test]
    fn csv_with_polish_headers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("analiza_abc.csv");
        export_classification(&records(), Labels::for_locale(Locale::Pl), 2, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Kod Produktu,Nazwa Produktu,Suma Sprzedaży,Procent Sprzedaży,Narastająco,Analiza ABC"
        );
        assert_eq!(lines.next().unwrap(), "1,Bolt,2,66.67%,66.67%,C");
        assert_eq!(lines.next().unwrap(), "2,Nut,1,33.33%,100.00%,C");
    }

    #[test]
    fn xlsx_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("abc.xlsx");
        export_classification(&records(), Labels::for_locale(Locale::En), 2, &path).unwrap();

        let ds = crate::xlsx::import(&path).unwrap();
        assert_eq!(ds.columns()[1], "Product Name");
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[1][1], Value::from("Nut"));
    }

    #[test]
    fn json_export() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("abc.json");
        export_classification(&records(), Labels::for_locale(Locale::En), 2, &path).unwrap();

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json[0]["product_name"], "Bolt");
        assert_eq!(json[1]["tier"], "C");
    }
}
