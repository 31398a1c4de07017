//! In-memory workbook fixtures for the integration tests.
//!
//! Both builders produce complete, minimal packages: the XLSX one writes
//! the XML parts a streaming writer would, the XLSB one emits raw BIFF12
//! records.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// A fixture cell. `Date`/`RkDate` reference the temporal style (xf 1),
/// everything else the general style (xf 0).
#[derive(Debug, Clone)]
pub enum Cell {
    Num(f64),
    Date(f64),
    Str(&'static str),
    Shared(u32),
    Bool(bool),
    Err(u8),
    Rk(u32),
    RkDate(u32),
    Blank,
}

pub type Row = Vec<Option<Cell>>;

pub fn row(cells: &[Option<Cell>]) -> Row {
    cells.to_vec()
}

/// Shorthands so test tables stay readable.
pub fn n(v: f64) -> Option<Cell> {
    Some(Cell::Num(v))
}
pub fn d(v: f64) -> Option<Cell> {
    Some(Cell::Date(v))
}
pub fn s(v: &'static str) -> Option<Cell> {
    Some(Cell::Str(v))
}
pub fn sh(i: u32) -> Option<Cell> {
    Some(Cell::Shared(i))
}
pub fn b(v: bool) -> Option<Cell> {
    Some(Cell::Bool(v))
}
pub fn blank() -> Option<Cell> {
    Some(Cell::Blank)
}
pub fn gap() -> Option<Cell> {
    None
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn column_letter(col: u32) -> String {
    let mut result = String::new();
    let mut c = col + 1;
    while c > 0 {
        c -= 1;
        result.insert(0, (b'A' + (c % 26) as u8) as char);
        c /= 26;
    }
    result
}

fn error_text(code: u8) -> &'static str {
    match code {
        0x07 => "#DIV/0!",
        0x0F => "#VALUE!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        _ => "#NULL!",
    }
}

/// Build an XLSX workbook from (sheet name, rows) pairs.
pub fn xlsx_workbook(sheets: &[(&str, &[Row])], shared: &[&str]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
"#,
    );
    for i in 0..sheets.len() {
        content_types.push_str(&format!(
            "<Override PartName=\"/xl/worksheets/sheet{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>\n",
            i + 1
        ));
    }
    content_types.push_str("</Types>");
    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(content_types.as_bytes()).unwrap();

    zip.start_file("_rels/.rels", options).unwrap();
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#,
    )
    .unwrap();

    let mut workbook = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>
"#,
    );
    for (i, (name, _)) in sheets.iter().enumerate() {
        workbook.push_str(&format!(
            "<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>\n",
            escape_xml(name),
            i + 1,
            i + 1
        ));
    }
    workbook.push_str("</sheets>\n</workbook>");
    zip.start_file("xl/workbook.xml", options).unwrap();
    zip.write_all(workbook.as_bytes()).unwrap();

    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
    );
    for i in 0..sheets.len() {
        rels.push_str(&format!(
            "<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet{}.xml\"/>\n",
            i + 1,
            i + 1
        ));
    }
    rels.push_str("</Relationships>");
    zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
    zip.write_all(rels.as_bytes()).unwrap();

    // xf 0: general, xf 1: built-in date format 14
    zip.start_file("xl/styles.xml", options).unwrap();
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<cellXfs count="2">
<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
<xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0"/>
</cellXfs>
</styleSheet>"#,
    )
    .unwrap();

    if !shared.is_empty() {
        let mut sst = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<sst xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" count=\"{0}\" uniqueCount=\"{0}\">\n",
            shared.len()
        );
        for text in shared {
            sst.push_str(&format!("<si><t>{}</t></si>\n", escape_xml(text)));
        }
        sst.push_str("</sst>");
        zip.start_file("xl/sharedStrings.xml", options).unwrap();
        zip.write_all(sst.as_bytes()).unwrap();
    }

    for (i, (_, rows)) in sheets.iter().enumerate() {
        let mut sheet = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
"#,
        );
        for (r, cells) in rows.iter().enumerate() {
            sheet.push_str(&format!("<row r=\"{}\">", r + 1));
            for (c, cell) in cells.iter().enumerate() {
                let Some(cell) = cell else { continue };
                let coord = format!("{}{}", column_letter(c as u32), r + 1);
                match cell {
                    Cell::Num(v) => {
                        sheet.push_str(&format!("<c r=\"{coord}\"><v>{v}</v></c>"))
                    }
                    Cell::Date(v) => {
                        sheet.push_str(&format!("<c r=\"{coord}\" s=\"1\"><v>{v}</v></c>"))
                    }
                    Cell::Str(text) => sheet.push_str(&format!(
                        "<c r=\"{coord}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                        escape_xml(text)
                    )),
                    Cell::Shared(idx) => {
                        sheet.push_str(&format!("<c r=\"{coord}\" t=\"s\"><v>{idx}</v></c>"))
                    }
                    Cell::Bool(v) => sheet.push_str(&format!(
                        "<c r=\"{coord}\" t=\"b\"><v>{}</v></c>",
                        u8::from(*v)
                    )),
                    Cell::Err(code) => sheet.push_str(&format!(
                        "<c r=\"{coord}\" t=\"e\"><v>{}</v></c>",
                        error_text(*code)
                    )),
                    Cell::Rk(_) | Cell::RkDate(_) => {
                        panic!("RK cells exist only in the binary format")
                    }
                    Cell::Blank => sheet.push_str(&format!("<c r=\"{coord}\" s=\"0\"/>")),
                }
            }
            sheet.push_str("</row>\n");
        }
        sheet.push_str("</sheetData>\n</worksheet>");
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)
            .unwrap();
        zip.write_all(sheet.as_bytes()).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

pub fn xlsx_sheet(rows: &[Row]) -> Vec<u8> {
    xlsx_workbook(&[("Sheet1", rows)], &[])
}

pub fn xlsx_sheet_with_shared(rows: &[Row], shared: &[&str]) -> Vec<u8> {
    xlsx_workbook(&[("Sheet1", rows)], shared)
}

// --- XLSB ---------------------------------------------------------------

fn biff_record(id: u16, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 6);
    if id < 0x80 {
        out.push(id as u8);
    } else {
        out.push((id & 0xFF) as u8);
        out.push((id >> 8) as u8);
    }
    let mut size = data.len();
    loop {
        let mut byte = (size & 0x7F) as u8;
        size >>= 7;
        if size > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if size == 0 {
            break;
        }
    }
    out.extend_from_slice(data);
    out
}

fn wide_string(text: &str) -> Vec<u8> {
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut out = (units.len() as u32).to_le_bytes().to_vec();
    out.extend(units.into_iter().flat_map(u16::to_le_bytes));
    out
}

fn cell_prefix(col: u32, xf: u32) -> Vec<u8> {
    let mut out = col.to_le_bytes().to_vec();
    out.extend_from_slice(&xf.to_le_bytes()[..3]);
    out.push(0);
    out
}

/// Build an XLSB workbook from (sheet name, rows) pairs.
pub fn xlsb_workbook(sheets: &[(&str, &[Row])], shared: &[&str]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let mut workbook = Vec::new();
    for (i, (name, _)) in sheets.iter().enumerate() {
        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_le_bytes()); // hsState: visible
        data.extend_from_slice(&(i as u32 + 1).to_le_bytes()); // iTabID
        data.extend(wide_string(&format!("rId{}", i + 1)));
        data.extend(wide_string(name));
        workbook.extend(biff_record(0x019C, &data));
    }
    zip.start_file("xl/workbook.bin", options).unwrap();
    zip.write_all(&workbook).unwrap();

    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
    );
    for i in 0..sheets.len() {
        rels.push_str(&format!(
            "<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet{}.bin\"/>\n",
            i + 1,
            i + 1
        ));
    }
    rels.push_str("</Relationships>");
    zip.start_file("xl/_rels/workbook.bin.rels", options).unwrap();
    zip.write_all(rels.as_bytes()).unwrap();

    // xf 0: general, xf 1: built-in date format 14
    let mut styles = Vec::new();
    for fmt in [0u16, 14] {
        let mut data = 0u16.to_le_bytes().to_vec(); // ixfeParent: cell xf
        data.extend_from_slice(&fmt.to_le_bytes());
        data.extend_from_slice(&[0u8; 4]);
        styles.extend(biff_record(0x002F, &data));
    }
    zip.start_file("xl/styles.bin", options).unwrap();
    zip.write_all(&styles).unwrap();

    if !shared.is_empty() {
        let mut sst = Vec::new();
        for text in shared {
            let mut data = vec![0u8]; // flags: plain string
            data.extend(wide_string(text));
            sst.extend(biff_record(0x0013, &data));
        }
        zip.start_file("xl/sharedStrings.bin", options).unwrap();
        zip.write_all(&sst).unwrap();
    }

    for (i, (_, rows)) in sheets.iter().enumerate() {
        let mut sheet = Vec::new();
        for (r, cells) in rows.iter().enumerate() {
            let mut row_hdr = (r as u32).to_le_bytes().to_vec();
            row_hdr.extend_from_slice(&[0u8; 4]);
            sheet.extend(biff_record(0x0000, &row_hdr));
            for (c, cell) in cells.iter().enumerate() {
                let Some(cell) = cell else { continue };
                let col = c as u32;
                match cell {
                    Cell::Num(v) => {
                        let mut data = cell_prefix(col, 0);
                        data.extend_from_slice(&v.to_le_bytes());
                        sheet.extend(biff_record(0x0005, &data));
                    }
                    Cell::Date(v) => {
                        let mut data = cell_prefix(col, 1);
                        data.extend_from_slice(&v.to_le_bytes());
                        sheet.extend(biff_record(0x0005, &data));
                    }
                    Cell::Rk(raw) => {
                        let mut data = cell_prefix(col, 0);
                        data.extend_from_slice(&raw.to_le_bytes());
                        sheet.extend(biff_record(0x0002, &data));
                    }
                    Cell::RkDate(raw) => {
                        let mut data = cell_prefix(col, 1);
                        data.extend_from_slice(&raw.to_le_bytes());
                        sheet.extend(biff_record(0x0002, &data));
                    }
                    Cell::Str(text) => {
                        let mut data = cell_prefix(col, 0);
                        data.extend(wide_string(text));
                        sheet.extend(biff_record(0x0006, &data));
                    }
                    Cell::Shared(idx) => {
                        let mut data = cell_prefix(col, 0);
                        data.extend_from_slice(&idx.to_le_bytes());
                        sheet.extend(biff_record(0x0007, &data));
                    }
                    Cell::Bool(v) => {
                        let mut data = cell_prefix(col, 0);
                        data.push(u8::from(*v));
                        sheet.extend(biff_record(0x0004, &data));
                    }
                    Cell::Err(code) => {
                        let mut data = cell_prefix(col, 0);
                        data.push(*code);
                        sheet.extend(biff_record(0x0003, &data));
                    }
                    Cell::Blank => {
                        let mut data = cell_prefix(col, 0);
                        sheet.extend(biff_record(0x0001, &data));
                    }
                }
            }
        }
        sheet.extend(biff_record(0x0192, &[]));
        zip.start_file(format!("xl/worksheets/sheet{}.bin", i + 1), options)
            .unwrap();
        zip.write_all(&sheet).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

pub fn xlsb_sheet(rows: &[Row]) -> Vec<u8> {
    xlsb_workbook(&[("Sheet1", rows)], &[])
}

/// Encode an integer as an RK value.
pub fn rk_int(v: i32) -> u32 {
    ((v as u32) << 2) | 0b10
}

/// Encode a float as a truncated-double RK value (loses the low mantissa).
pub fn rk_float(v: f64) -> u32 {
    ((v.to_bits() >> 32) as u32) & 0xFFFF_FFFC
}
