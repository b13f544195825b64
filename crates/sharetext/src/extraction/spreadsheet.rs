//! Spreadsheet extraction (XLSX, XLS, ODS) using `calamine`.
//!
//! Every worksheet becomes a [`Sheet`] whose first non-empty row is the header.
//! Column keys come from the header cells, deduplicated with positional
//! suffixes (see [`dedupe_headers`](crate::extraction::normalize::dedupe_headers)).
//!
//! # Example
//!
//! ```rust,no_run
//! use sharetext::extraction::spreadsheet::read_xlsx;
//!
//! # fn example() -> sharetext::Result<()> {
//! let bytes = std::fs::read("budget.xlsx")?;
//! let workbook = read_xlsx(&bytes)?;
//! for sheet in &workbook.sheets {
//!     println!("{}: {} rows", sheet.name, sheet.rows.len());
//! }
//! # Ok(())
//! # }
//! ```

use std::io::{Cursor, Read, Seek};

use calamine::{Data, Range, Reader};

use crate::core::config::ExtractionConfig;
use crate::core::format::FormatTag;
use crate::extraction::normalize::sheet_from_grid;
use crate::extraction::office_metadata::{core_properties, odf_meta};
use crate::extraction::ole;
use crate::extraction::ooxml::Package;
use crate::types::{CellValue, Metadata, Sheet, Spreadsheet};
use crate::{Result, SharetextError};

pub fn read_xlsx(bytes: &[u8]) -> Result<Spreadsheet> {
    read_xlsx_with_config(bytes, &ExtractionConfig::default())
}

pub fn read_xls(bytes: &[u8]) -> Result<Spreadsheet> {
    read_xls_with_config(bytes, &ExtractionConfig::default())
}

pub fn read_ods(bytes: &[u8]) -> Result<Spreadsheet> {
    read_ods_with_config(bytes, &ExtractionConfig::default())
}

#[tracing::instrument(skip_all, fields(size = bytes.len()))]
pub fn read_xlsx_with_config(bytes: &[u8], _config: &ExtractionConfig) -> Result<Spreadsheet> {
    let workbook = calamine::Xlsx::new(Cursor::new(bytes))
        .map_err(|e| SharetextError::corrupt_container_with_source("Failed to open XLSX workbook", e))?;
    let metadata = match Package::open(bytes) {
        Ok(mut package) => core_properties(&mut package),
        Err(_) => Metadata::default(),
    };
    Ok(Spreadsheet {
        format: FormatTag::Xlsx,
        metadata,
        sheets: read_sheets(workbook)?,
    })
}

#[tracing::instrument(skip_all, fields(size = bytes.len()))]
pub fn read_xls_with_config(bytes: &[u8], _config: &ExtractionConfig) -> Result<Spreadsheet> {
    let workbook = calamine::Xls::new(Cursor::new(bytes))
        .map_err(|e| SharetextError::corrupt_container_with_source("Failed to open XLS workbook", e))?;
    let metadata = match ole::open(bytes) {
        Ok(mut file) => ole::summary_information(&mut file),
        Err(_) => Metadata::default(),
    };
    Ok(Spreadsheet {
        format: FormatTag::Xls,
        metadata,
        sheets: read_sheets(workbook)?,
    })
}

#[tracing::instrument(skip_all, fields(size = bytes.len()))]
pub fn read_ods_with_config(bytes: &[u8], _config: &ExtractionConfig) -> Result<Spreadsheet> {
    let workbook = calamine::Ods::new(Cursor::new(bytes))
        .map_err(|e| SharetextError::corrupt_container_with_source("Failed to open ODS workbook", e))?;
    let metadata = match Package::open(bytes) {
        Ok(mut package) => odf_meta(&mut package),
        Err(_) => Metadata::default(),
    };
    Ok(Spreadsheet {
        format: FormatTag::Ods,
        metadata,
        sheets: read_sheets(workbook)?,
    })
}

/// All worksheets in workbook order. A sheet whose cells cannot be read is
/// kept with its name and no rows.
fn read_sheets<RS, R>(mut workbook: R) -> Result<Vec<Sheet>>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let names = workbook.sheet_names();
    let mut sheets = Vec::with_capacity(names.len());

    for name in &names {
        match workbook.worksheet_range(name) {
            Ok(range) => sheets.push(sheet_from_range(name, &range)),
            Err(e) => {
                tracing::debug!("Sheet {} could not be read: {}", name, e);
                sheets.push(sheet_from_grid(name, Vec::new()));
            }
        }
    }
    Ok(sheets)
}

/// Convert a calamine range into a sheet. Ranges need not start at A1; the
/// grid is padded so column positions (and letter names) match the sheet.
fn sheet_from_range(name: &str, range: &Range<Data>) -> Sheet {
    let leading_columns = range.start().map(|(_, col)| col as usize).unwrap_or(0);
    let grid = range
        .rows()
        .map(|row| {
            let mut cells = Vec::with_capacity(leading_columns + row.len());
            cells.resize(leading_columns, CellValue::Empty);
            cells.extend(row.iter().map(cell_value));
            cells
        })
        .collect();
    sheet_from_grid(name, grid)
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::String(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => CellValue::DateTime(datetime.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => CellValue::DateTime(s.clone()),
        Data::DurationIso(s) => CellValue::Duration(s.clone()),
        Data::Error(e) => CellValue::Error(format!("{:?}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{CellErrorType, ExcelDateTime, ExcelDateTimeType};
    use std::io::Write;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn xlsx_bytes(sheet_xml: &str) -> Vec<u8> {
        let parts: [(&str, &str); 6] = [
            (
                "[Content_Types].xml",
                r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#,
            ),
            (
                "_rels/.rels",
                r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#,
            ),
            (
                "xl/workbook.xml",
                r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Sales" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#,
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#,
            ),
            ("xl/worksheets/sheet1.xml", sheet_xml),
            (
                "docProps/core.xml",
                r#"<?xml version="1.0" encoding="UTF-8"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/">
<dc:title>Sales 2024</dc:title>
</cp:coreProperties>"#,
            ),
        ];

        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            let options = SimpleFileOptions::default();
            for (name, content) in parts {
                zip.start_file(name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buffer
    }

    #[test]
    fn test_read_xlsx_with_duplicate_headers() {
        let sheet = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1">
  <c r="A1" t="inlineStr"><is><t>Region</t></is></c>
  <c r="B1" t="inlineStr"><is><t>Total</t></is></c>
  <c r="C1" t="inlineStr"><is><t>Total</t></is></c>
</row>
<row r="2">
  <c r="A2" t="inlineStr"><is><t>North</t></is></c>
  <c r="B2"><v>10</v></c>
  <c r="C2"><v>12.5</v></c>
</row>
<row r="3">
  <c r="A3" t="inlineStr"><is><t>South</t></is></c>
  <c r="B3"><v>7</v></c>
  <c r="C3" t="b"><v>1</v></c>
</row>
</sheetData>
</worksheet>"#;
        let workbook = read_xlsx(&xlsx_bytes(sheet)).unwrap();

        assert_eq!(workbook.format, FormatTag::Xlsx);
        assert_eq!(workbook.metadata.title.as_deref(), Some("Sales 2024"));
        assert_eq!(workbook.sheets.len(), 1);

        let sheet = &workbook.sheets[0];
        assert_eq!(sheet.name, "Sales");
        assert_eq!(sheet.columns, vec!["Region", "Total", "Total_2"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0]["Region"], CellValue::String("North".to_string()));
        assert_eq!(sheet.rows[0]["Total_2"], CellValue::Float(12.5));
        assert_eq!(sheet.rows[1]["Total_2"], CellValue::Bool(true));
        assert_eq!(sheet.rows[1]["Total"].to_string(), "7");
    }

    #[test]
    fn test_read_xlsx_rejects_garbage() {
        let err = read_xlsx(b"PK\x03\x04 not really a workbook").unwrap_err();
        assert!(matches!(err, SharetextError::CorruptContainer { .. }));
    }

    #[test]
    fn test_read_xls_rejects_non_ole() {
        let err = read_xls(b"plain bytes").unwrap_err();
        assert!(matches!(err, SharetextError::CorruptContainer { .. }));
    }

    #[test]
    fn test_sheet_from_range_pads_leading_columns() {
        let mut range = Range::new((2, 1), (3, 2));
        range.set_value((2, 1), Data::String("Name".to_owned()));
        range.set_value((2, 2), Data::String("Age".to_owned()));
        range.set_value((3, 1), Data::String("Alice".to_owned()));
        range.set_value((3, 2), Data::Int(30));

        let sheet = sheet_from_range("People", &range);
        assert_eq!(sheet.columns, vec!["A", "Name", "Age"]);
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0]["Age"], CellValue::Int(30));
        assert_eq!(sheet.rows[0]["A"], CellValue::Empty);
    }

    #[test]
    fn test_cell_value_conversion() {
        assert_eq!(cell_value(&Data::Empty), CellValue::Empty);
        assert_eq!(cell_value(&Data::Int(5)), CellValue::Int(5));
        assert_eq!(
            cell_value(&Data::DurationIso("PT1H30M".to_owned())),
            CellValue::Duration("PT1H30M".to_string())
        );
        assert_eq!(
            cell_value(&Data::DateTimeIso("2024-01-01T10:30:00".to_owned())),
            CellValue::DateTime("2024-01-01T10:30:00".to_string())
        );
        assert_eq!(cell_value(&Data::Error(CellErrorType::Div0)), CellValue::Error("Div0".to_string()));

        let dt = Data::DateTime(ExcelDateTime::new(45_292.5, ExcelDateTimeType::DateTime, false));
        assert_eq!(cell_value(&dt), CellValue::DateTime("2024-01-01T12:00:00".to_string()));
    }
}
