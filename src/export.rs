//! Report card encoders.
//!
//! Both encoders are pure: they take the report tables and return bytes.
//! Writing the bytes somewhere is the caller's job.

use crate::report::{DetailRow, SummaryRow};
use anyhow::Context;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const CSV_MIME: &str = "text/csv";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const SUMMARY_HEADERS: [&str; 4] = ["Alumno", "Materia", "Promedio_Materia", "Total_Notas"];
pub const DETAIL_HEADERS: [&str; 4] = ["Alumno", "Materia", "Calificacion", "Fecha"];

pub const SUMMARY_SHEET: &str = "Resumen";
pub const DETAIL_SHEET: &str = "Historial Completo";

pub fn csv_file_name(student_name: &str) -> String {
    format!("Reporte_Promedios_{}.csv", student_name.replace(' ', "_"))
}

pub fn workbook_file_name(student_name: &str) -> String {
    format!("Boletin_Completo_{}.xlsx", student_name.replace(' ', "_"))
}

/// On-disk form of an export file name. Path separators, characters Windows
/// rejects in file names, and control characters become `_`, so the result is
/// always a single path component.
pub fn disk_file_name(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Shortest text that parses back to the same value, keeping `.0` on whole numbers.
fn format_number(v: f64) -> String {
    format!("{:?}", v)
}

/// Summary table as UTF-8 CSV with a header row and no index column.
pub fn encode_summary_csv(summary: &[SummaryRow]) -> Vec<u8> {
    let mut csv = SUMMARY_HEADERS.join(",");
    csv.push('\n');
    for row in summary {
        csv.push_str(&format!(
            "{},{},{},{}\n",
            csv_quote(&row.student_name),
            csv_quote(&row.subject_name),
            format_number(row.average),
            row.grade_count
        ));
    }
    csv.into_bytes()
}

enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

/// `_xHHHH_` as used by OOXML for characters XML 1.0 cannot carry.
fn is_ooxml_escape(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 7
        && b[0] == b'_'
        && b[1] == b'x'
        && b[2..6].iter().all(|c| c.is_ascii_hexdigit())
        && b[6] == b'_'
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, ch) in s.char_indices() {
        match ch {
            // A literal `_xHHHH_` would be decoded by readers; escape its underscore.
            '_' if is_ooxml_escape(&s[i..]) => out.push_str("_x005F_"),
            '\t' | '\n' | '\r' => out.push(ch),
            c if (c as u32) < 0x20 => out.push_str(&format!("_x{:04X}_", c as u32)),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Spreadsheet column letters for a zero-based index (0 -> A, 26 -> AA).
fn column_name(mut idx: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'A' + (idx % 26) as u8);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

fn sheet_xml<'a>(headers: &[&'a str], rows: &[Vec<Cell<'a>>]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData>",
    );
    let header_row: Vec<Cell<'a>> = headers.iter().map(|&h| Cell::Text(h)).collect();
    for (r, cells) in std::iter::once(&header_row).chain(rows.iter()).enumerate() {
        let row_no = r + 1;
        xml.push_str(&format!("<row r=\"{}\">", row_no));
        for (c, cell) in cells.iter().enumerate() {
            let cell_ref = format!("{}{}", column_name(c), row_no);
            match cell {
                Cell::Text(s) => xml.push_str(&format!(
                    "<c r=\"{}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                    cell_ref,
                    xml_escape(s)
                )),
                Cell::Number(v) => xml.push_str(&format!(
                    "<c r=\"{}\"><v>{}</v></c>",
                    cell_ref,
                    format_number(*v)
                )),
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn content_types_xml(sheet_count: usize) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         <Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
         <Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>",
    );
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            "<Override PartName=\"/xl/worksheets/sheet{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
            i
        ));
    }
    xml.push_str("</Types>");
    xml
}

const ROOT_RELS_XML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>\
</Relationships>";

const STYLES_XML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
<styleSheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\
<fonts count=\"1\"><font><sz val=\"11\"/><name val=\"Calibri\"/></font></fonts>\
<fills count=\"2\"><fill><patternFill patternType=\"none\"/></fill><fill><patternFill patternType=\"gray125\"/></fill></fills>\
<borders count=\"1\"><border><left/><right/><top/><bottom/><diagonal/></border></borders>\
<cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>\
<cellXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\"/></cellXfs>\
<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>\
</styleSheet>";

fn workbook_xml(sheet_names: &[&str]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\"><sheets>",
    );
    for (i, name) in sheet_names.iter().enumerate() {
        xml.push_str(&format!(
            "<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>",
            xml_escape(name),
            i + 1,
            i + 1
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    );
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            "<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet{}.xml\"/>",
            i, i
        ));
    }
    xml.push_str(&format!(
        "<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>",
        sheet_count + 1
    ));
    xml.push_str("</Relationships>");
    xml
}

/// Two-sheet workbook: `Resumen` (summary) followed by `Historial Completo` (detail).
pub fn encode_workbook(summary: &[SummaryRow], detail: &[DetailRow]) -> anyhow::Result<Vec<u8>> {
    let summary_rows: Vec<Vec<Cell<'_>>> = summary
        .iter()
        .map(|r| {
            vec![
                Cell::Text(&r.student_name),
                Cell::Text(&r.subject_name),
                Cell::Number(r.average),
                Cell::Number(r.grade_count as f64),
            ]
        })
        .collect();
    let detail_rows: Vec<Vec<Cell<'_>>> = detail
        .iter()
        .map(|r| {
            vec![
                Cell::Text(&r.student_name),
                Cell::Text(&r.subject_name),
                Cell::Number(r.score),
                Cell::Text(&r.date),
            ]
        })
        .collect();

    let sheets = [
        (SUMMARY_SHEET, sheet_xml(&SUMMARY_HEADERS, &summary_rows)),
        (DETAIL_SHEET, sheet_xml(&DETAIL_HEADERS, &detail_rows)),
    ];
    let names: Vec<&str> = sheets.iter().map(|(name, _)| *name).collect();

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries: Vec<(String, String)> = vec![
        (
            "[Content_Types].xml".to_string(),
            content_types_xml(sheets.len()),
        ),
        ("_rels/.rels".to_string(), ROOT_RELS_XML.to_string()),
        ("xl/workbook.xml".to_string(), workbook_xml(&names)),
        (
            "xl/_rels/workbook.xml.rels".to_string(),
            workbook_rels_xml(sheets.len()),
        ),
        ("xl/styles.xml".to_string(), STYLES_XML.to_string()),
    ];
    for (i, (_, xml)) in sheets.iter().enumerate() {
        entries.push((format!("xl/worksheets/sheet{}.xml", i + 1), xml.clone()));
    }

    for (name, body) in entries {
        zip.start_file(name.as_str(), opts)
            .with_context(|| format!("failed to start workbook entry {}", name))?;
        zip.write_all(body.as_bytes())
            .with_context(|| format!("failed to write workbook entry {}", name))?;
    }

    let cursor = zip.finish().context("failed to finalize workbook")?;
    Ok(cursor.into_inner())
}
