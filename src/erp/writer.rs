//! CSV and spreadsheet output for ERP extracts

use std::io::Write;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook};

use super::ErpError;

/// Byte order mark so spreadsheet apps detect UTF-8
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

/// A row with a fixed column layout
pub trait Tabular {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<Cell<'_>>;
}

/// `<base>_<YYYYMMDD_HHMMSS>.<ext>` using local time
pub fn timestamped_path(base: &str, extension: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("{}_{}.{}", base, stamp, extension))
}

pub fn write_csv<R: Tabular>(path: &Path, rows: &[R], with_bom: bool) -> Result<(), ErpError> {
    let mut file = std::fs::File::create(path)?;
    if with_bom {
        file.write_all(UTF8_BOM)?;
    }

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(R::HEADERS)?;
    for row in rows {
        let record: Vec<String> = row
            .cells()
            .into_iter()
            .map(|cell| match cell {
                Cell::Text(text) => text.to_string(),
                Cell::Number(value) => value.to_string(),
            })
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_xlsx<R: Tabular>(path: &Path, rows: &[R], sheet_name: &str) -> Result<(), ErpError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;

        for (col, header) in R::HEADERS.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }
        for (index, row) in rows.iter().enumerate() {
            let row_num = index as u32 + 1;
            for (col, cell) in row.cells().into_iter().enumerate() {
                match cell {
                    Cell::Text(text) => worksheet.write_string(row_num, col as u16, text)?,
                    Cell::Number(value) => worksheet.write_number(row_num, col as u16, value)?,
                };
            }
        }
        worksheet.set_freeze_panes(1, 0)?;
        worksheet.autofit();
    }

    workbook.save(path)?;
    Ok(())
}
