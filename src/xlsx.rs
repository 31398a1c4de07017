//! XLSX package adapter: ZIP members tokenized with quick-xml and emitted
//! as a row-major cell stream.

#[cfg(feature = "fast-hash")]
use hashbrown::HashMap;
#[cfg(not(feature = "fast-hash"))]
use std::collections::HashMap;

use std::io::{BufRead, BufReader, Read, Seek};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use crate::cell::{error_code_from_str, CellEvent, CellSink, RawCell};
use crate::error::{Result, SheetcastError};
use crate::read::NullValues;
use crate::shared::SharedStrings;
use crate::styles::{classify_format, StyleTable};
use crate::utils::{parse_coordinate_bytes, parse_f64_bytes, parse_u32_bytes};

/// Parse a `.rels` part into an Id → Target map. Shared with the XLSB
/// adapter, whose relationships are still plain XML.
pub(crate) fn parse_relationships<R: BufRead>(reader: R) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_reader(reader);
    reader.config_mut().trim_text(true);

    let mut rels = HashMap::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let mut rel_id: Option<String> = None;
                    let mut target: Option<String> = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Id" => rel_id = Some(String::from_utf8_lossy(&attr.value).into_owned()),
                            b"Target" => {
                                target = Some(String::from_utf8_lossy(&attr.value).into_owned())
                            }
                            _ => {}
                        }
                    }
                    if let (Some(id), Some(tgt)) = (rel_id, target) {
                        rels.insert(id, tgt);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// Resolve a relationship target (relative to `xl/`) to a package path.
pub(crate) fn resolve_part_path(target: &str) -> String {
    if let Some(stripped) = target.strip_prefix('/') {
        stripped.to_owned()
    } else {
        format!("xl/{target}")
    }
}

/// An open XLSX package with its sheet catalog.
pub(crate) struct XlsxWorkbook<RS> {
    archive: ZipArchive<RS>,
    /// (sheet name, part path) in workbook order.
    sheets: Vec<(String, String)>,
}

impl<RS: Read + Seek> XlsxWorkbook<RS> {
    pub fn open(mut archive: ZipArchive<RS>) -> Result<Self> {
        let rels = match archive.by_name("xl/_rels/workbook.xml.rels") {
            Ok(part) => parse_relationships(BufReader::new(part))?,
            Err(_) => HashMap::new(),
        };

        let workbook = archive.by_name("xl/workbook.xml").map_err(|_| {
            SheetcastError::format("xl/workbook.xml missing from archive")
        })?;
        let raw_sheets = parse_sheet_list(BufReader::new(workbook))?;

        let sheets = raw_sheets
            .into_iter()
            .enumerate()
            .map(|(idx, (name, rid))| {
                let path = rels
                    .get(&rid)
                    .map(|target| resolve_part_path(target))
                    .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", idx + 1));
                (name, path)
            })
            .collect();

        Ok(XlsxWorkbook { archive, sheets })
    }

    pub fn sheets(&self) -> &[(String, String)] {
        &self.sheets
    }

    /// Load and trim the shared-strings table, nulling entries that match
    /// the caller's null predicate.
    pub fn load_shared_strings(&mut self, nulls: Option<&NullValues>) -> Result<SharedStrings> {
        let part = match self.archive.by_name("xl/sharedStrings.xml") {
            Ok(part) => part,
            Err(_) => return Ok(SharedStrings::default()),
        };
        let mut reader = Reader::from_reader(BufReader::new(part));
        reader.config_mut().trim_text(false);

        let mut shared = SharedStrings::default();
        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_t = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    if e.local_name().as_ref() == b"t" {
                        in_t = true;
                    }
                }
                Ok(Event::Text(e)) => {
                    if in_t {
                        current.push_str(&e.unescape().unwrap_or_default());
                    }
                }
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"t" => in_t = false,
                    b"si" => {
                        let text = current.trim();
                        let entry = if text.is_empty()
                            || nulls.is_some_and(|n| n.matches(text))
                        {
                            None
                        } else {
                            Some(text.to_owned())
                        };
                        shared.push(entry);
                        current.clear();
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(e.into()),
                _ => {}
            }
            buf.clear();
        }

        Ok(shared)
    }

    /// Build the cell-xf → style class table from styles.xml.
    pub fn load_styles(&mut self) -> Result<StyleTable> {
        let part = match self.archive.by_name("xl/styles.xml") {
            Ok(part) => part,
            Err(_) => return Ok(StyleTable::default()),
        };
        let mut reader = Reader::from_reader(BufReader::new(part));
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut custom_formats: HashMap<u16, String> = HashMap::new();
        let mut xf_format_ids: Vec<u16> = Vec::new();
        let mut in_cell_xfs = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                    b"numFmt" => {
                        let mut fmt_id: Option<u16> = None;
                        let mut code: Option<String> = None;
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"numFmtId" => {
                                    fmt_id = parse_u32_bytes(&attr.value).map(|v| v as u16)
                                }
                                b"formatCode" => {
                                    code = Some(
                                        attr.unescape_value().unwrap_or_default().into_owned(),
                                    )
                                }
                                _ => {}
                            }
                        }
                        if let (Some(id), Some(code)) = (fmt_id, code) {
                            custom_formats.insert(id, code);
                        }
                    }
                    b"cellXfs" => in_cell_xfs = true,
                    b"xf" if in_cell_xfs => {
                        let mut fmt_id = 0u16;
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"numFmtId" {
                                fmt_id = parse_u32_bytes(&attr.value).unwrap_or(0) as u16;
                            }
                        }
                        xf_format_ids.push(fmt_id);
                    }
                    _ => {}
                },
                Ok(Event::End(e)) => {
                    if e.local_name().as_ref() == b"cellXfs" {
                        in_cell_xfs = false;
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(e.into()),
                _ => {}
            }
            buf.clear();
        }

        let classes = xf_format_ids
            .into_iter()
            .map(|fmt_id| classify_format(fmt_id, custom_formats.get(&fmt_id).map(String::as_str)))
            .collect();
        Ok(StyleTable::from_xfs(classes))
    }

    /// Stream one worksheet part into the sink, skipping `skip_cols`
    /// (sorted, 0-based). Stops early when the sink reports completion.
    pub fn scan_sheet(
        &mut self,
        part_path: &str,
        styles: &StyleTable,
        shared: &SharedStrings,
        nulls: Option<&NullValues>,
        skip_cols: &[u32],
        sink: &mut dyn CellSink,
    ) -> Result<()> {
        let part = self.archive.by_name(part_path).map_err(|_| {
            SheetcastError::format(format!("worksheet part {part_path} missing from archive"))
        })?;
        let mut reader = Reader::from_reader(BufReader::new(part));
        reader.config_mut().trim_text(false);

        let mut buf = Vec::new();

        #[derive(Clone, Copy, PartialEq)]
        enum CellType {
            Number,
            Shared,
            Bool,
            Error,
            Text,
        }

        let mut current_row: i64 = -1;
        let mut next_col: u32 = 0;

        let mut in_value = false;
        let mut cell_open = false;
        let mut cell_row: u32 = 0;
        let mut cell_col: u32 = 0;
        let mut cell_type = CellType::Number;
        let mut cell_temporal = false;
        let mut cell_styled = false;
        let mut cell_text = String::new();
        let mut cell_has_value = false;

        macro_rules! open_cell {
            ($e:expr) => {{
                cell_open = true;
                cell_type = CellType::Number;
                cell_temporal = false;
                cell_styled = false;
                cell_text.clear();
                cell_has_value = false;
                cell_row = current_row.max(0) as u32;
                cell_col = next_col;
                for attr in $e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"r" => {
                            if let Some((row, col)) = parse_coordinate_bytes(&attr.value) {
                                cell_row = row;
                                cell_col = col;
                            }
                        }
                        b"t" => {
                            cell_type = match attr.value.as_ref() {
                                b"s" => CellType::Shared,
                                b"b" => CellType::Bool,
                                b"e" => CellType::Error,
                                b"str" | b"inlineStr" | b"d" => CellType::Text,
                                _ => CellType::Number,
                            };
                        }
                        b"s" => {
                            cell_styled = true;
                            if let Some(style) = parse_u32_bytes(&attr.value) {
                                cell_temporal = styles.is_temporal(style);
                            }
                        }
                        _ => {}
                    }
                }
                next_col = cell_col + 1;
            }};
        }

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"row" => {
                        let mut row_attr: Option<u32> = None;
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"r" {
                                row_attr = parse_u32_bytes(&attr.value)
                                    .filter(|r| *r > 0)
                                    .map(|r| r - 1);
                            }
                        }
                        current_row = row_attr.map_or(current_row + 1, i64::from);
                        next_col = 0;
                    }
                    b"c" => open_cell!(e),
                    b"v" | b"t" if cell_open => in_value = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) => {
                    if e.local_name().as_ref() == b"c" {
                        open_cell!(e);
                        // styled but valueless cell: recovered as a blank
                        if cell_styled {
                            log::debug!(
                                "cell ({cell_row},{cell_col}) carries a style but no value"
                            );
                        }
                        if skip_cols.binary_search(&cell_col).is_err()
                            && !sink.push_cell(CellEvent {
                                row: cell_row,
                                col: cell_col,
                                cell: RawCell::Blank,
                            })?
                        {
                            return Ok(());
                        }
                        cell_open = false;
                    }
                }
                Ok(Event::Text(e)) => {
                    if in_value {
                        cell_text.push_str(&e.unescape().unwrap_or_default());
                        cell_has_value = true;
                    }
                }
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"v" | b"t" => in_value = false,
                    b"c" if cell_open => {
                        cell_open = false;
                        if skip_cols.binary_search(&cell_col).is_ok() {
                            continue;
                        }
                        let text = cell_text.trim();
                        let raw = if !cell_has_value || text.is_empty() {
                            if cell_styled {
                                log::debug!(
                                    "cell ({cell_row},{cell_col}) carries a style but no value"
                                );
                            }
                            RawCell::Blank
                        } else if nulls.is_some_and(|n| n.matches(text))
                            && cell_type != CellType::Shared
                        {
                            RawCell::Blank
                        } else {
                            match cell_type {
                                CellType::Number => match parse_f64_bytes(text.as_bytes()) {
                                    Some(value) => RawCell::Number {
                                        value,
                                        temporal: cell_temporal,
                                    },
                                    None => {
                                        log::warn!(
                                            "cell ({cell_row},{cell_col}): unparseable numeric \
                                             value {text:?}; keeping as text"
                                        );
                                        RawCell::InlineString(text.to_owned())
                                    }
                                },
                                CellType::Shared => match parse_u32_bytes(text.as_bytes()) {
                                    Some(idx) if shared.is_null(idx) => RawCell::Blank,
                                    Some(idx) => RawCell::SharedStringRef(idx),
                                    None => {
                                        log::warn!(
                                            "cell ({cell_row},{cell_col}): bad shared string \
                                             index {text:?}"
                                        );
                                        RawCell::Blank
                                    }
                                },
                                CellType::Bool => RawCell::Boolean(text == "1" || text == "true"),
                                CellType::Error => match error_code_from_str(text) {
                                    Some(code) => RawCell::ErrorCode(code),
                                    None => RawCell::InlineString(text.to_owned()),
                                },
                                CellType::Text => RawCell::InlineString(text.to_owned()),
                            }
                        };
                        if !sink.push_cell(CellEvent {
                            row: cell_row,
                            col: cell_col,
                            cell: raw,
                        })? {
                            return Ok(());
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(e.into()),
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }
}

/// Parse workbook.xml into (sheet name, relationship id) pairs in order.
fn parse_sheet_list<R: BufRead>(reader: R) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_reader(reader);
    reader.config_mut().trim_text(true);

    let mut sheets = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"sheet" {
                    let mut name: Option<String> = None;
                    let mut rid: Option<String> = None;
                    for attr in e.attributes().flatten() {
                        let key = attr.key;
                        if key.as_ref() == b"name" {
                            name = Some(
                                attr.unescape_value().unwrap_or_default().into_owned(),
                            );
                        } else if key.local_name().as_ref() == b"id" {
                            rid = Some(String::from_utf8_lossy(&attr.value).into_owned());
                        }
                    }
                    if let (Some(name), Some(rid)) = (name, rid) {
                        sheets.push((name, rid));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}
