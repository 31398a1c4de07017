//! XLSB package adapter: BIFF12 record streams emitted as the same
//! row-major cell stream as the XML format.

#[cfg(feature = "fast-hash")]
use hashbrown::HashMap;
#[cfg(not(feature = "fast-hash"))]
use std::collections::HashMap;

use std::io::{BufReader, Read, Seek};

use zip::ZipArchive;

use crate::biff::{
    read_f64, read_nullable_wide_string, read_u16, read_u24, read_u32, read_wide_string, rec,
    RecordReader,
};
use crate::cell::{CellEvent, CellSink, RawCell};
use crate::error::{Result, SheetcastError};
use crate::read::NullValues;
use crate::shared::SharedStrings;
use crate::styles::{classify_format, StyleTable};
use crate::xlsx::{parse_relationships, resolve_part_path};

/// An open XLSB package with its sheet catalog.
pub(crate) struct XlsbWorkbook<RS> {
    archive: ZipArchive<RS>,
    /// (sheet name, part path) in workbook order.
    sheets: Vec<(String, String)>,
}

impl<RS: Read + Seek> XlsbWorkbook<RS> {
    pub fn open(mut archive: ZipArchive<RS>) -> Result<Self> {
        let rels = match archive.by_name("xl/_rels/workbook.bin.rels") {
            Ok(part) => parse_relationships(BufReader::new(part))?,
            Err(_) => HashMap::new(),
        };

        let workbook = archive.by_name("xl/workbook.bin").map_err(|_| {
            SheetcastError::format("xl/workbook.bin missing from archive")
        })?;
        let mut records = RecordReader::new(BufReader::new(workbook));
        let mut sheets = Vec::new();

        while let Some((id, data)) = records.next_record()? {
            if id != rec::BUNDLE_SH {
                continue;
            }
            // BrtBundleSh: hsState u32, iTabID u32, strRelID, strName
            let Some((rel_id, offset)) = read_nullable_wide_string(data, 8) else {
                return Err(SheetcastError::format("malformed BrtBundleSh record"));
            };
            let Some((name, _)) = read_wide_string(data, offset) else {
                return Err(SheetcastError::format("malformed BrtBundleSh record"));
            };
            let path = rel_id
                .as_ref()
                .and_then(|rid| rels.get(rid))
                .map(|target| resolve_part_path(target))
                .unwrap_or_else(|| format!("xl/worksheets/sheet{}.bin", sheets.len() + 1));
            sheets.push((name, path));
        }

        drop(records);

        Ok(XlsbWorkbook { archive, sheets })
    }

    pub fn sheets(&self) -> &[(String, String)] {
        &self.sheets
    }

    /// Load sharedStrings.bin, nulling entries that match the caller's
    /// null predicate.
    pub fn load_shared_strings(&mut self, nulls: Option<&NullValues>) -> Result<SharedStrings> {
        let part = match self.archive.by_name("xl/sharedStrings.bin") {
            Ok(part) => part,
            Err(_) => return Ok(SharedStrings::default()),
        };
        let mut records = RecordReader::new(BufReader::new(part));
        let mut shared = SharedStrings::default();

        while let Some((id, data)) = records.next_record()? {
            if id != rec::SST_ITEM {
                continue;
            }
            // BrtSSTItem: flags u8, then an XLWideString
            let entry = read_wide_string(data, 1)
                .map(|(s, _)| s)
                .ok_or_else(|| SheetcastError::format("malformed BrtSSTItem record"))?;
            let text = entry.trim();
            let entry = if text.is_empty() || nulls.is_some_and(|n| n.matches(text)) {
                None
            } else {
                Some(text.to_owned())
            };
            shared.push(entry);
        }

        Ok(shared)
    }

    /// Build the cell-xf → style class table from styles.bin.
    pub fn load_styles(&mut self) -> Result<StyleTable> {
        let part = match self.archive.by_name("xl/styles.bin") {
            Ok(part) => part,
            Err(_) => return Ok(StyleTable::default()),
        };
        let mut records = RecordReader::new(BufReader::new(part));

        let mut custom_formats: HashMap<u16, String> = HashMap::new();
        let mut xf_format_ids: Vec<u16> = Vec::new();

        while let Some((id, data)) = records.next_record()? {
            match id {
                // BrtFmt: ifmt u16, stFmtCode XLWideString
                rec::FMT => {
                    let fmt_id = read_u16(data, 0)
                        .ok_or_else(|| SheetcastError::format("malformed BrtFmt record"))?;
                    let (code, _) = read_wide_string(data, 2)
                        .ok_or_else(|| SheetcastError::format("malformed BrtFmt record"))?;
                    custom_formats.insert(fmt_id, code);
                }
                // BrtXF: ixfeParent u16 (0xFFFF marks a style xf), iFmt u16
                rec::XF => {
                    let parent = read_u16(data, 0)
                        .ok_or_else(|| SheetcastError::format("malformed BrtXF record"))?;
                    if parent != 0xFFFF {
                        let fmt_id = read_u16(data, 2)
                            .ok_or_else(|| SheetcastError::format("malformed BrtXF record"))?;
                        xf_format_ids.push(fmt_id);
                    }
                }
                _ => {}
            }
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
        let mut records = RecordReader::new(BufReader::new(part));

        let mut current_row: u32 = 0;

        while let Some((id, data)) = records.next_record()? {
            match id {
                rec::ROW_HDR => {
                    current_row = read_u32(data, 0).ok_or_else(|| {
                        SheetcastError::format("malformed BrtRowHdr record")
                    })?;
                    continue;
                }
                rec::END_SHEET_DATA => break,
                rec::CELL_BLANK
                | rec::CELL_RK
                | rec::CELL_ERROR
                | rec::CELL_BOOL
                | rec::CELL_REAL
                | rec::CELL_ST
                | rec::CELL_ISST
                | rec::FMLA_STRING
                | rec::FMLA_NUM
                | rec::FMLA_BOOL => {}
                _ => continue,
            }

            let Some(col) = read_u32(data, 0) else {
                log::warn!("row {current_row}: truncated cell record 0x{id:04X}");
                continue;
            };
            if skip_cols.binary_search(&col).is_ok() {
                continue;
            }
            let temporal = read_u24(data, 4).is_some_and(|xf| styles.is_temporal(xf));

            // truncated payloads are recovered as blanks, not errors
            let raw = match id {
                rec::CELL_BLANK => RawCell::Blank,
                rec::CELL_RK => match read_u32(data, 8) {
                    Some(raw) => RawCell::RkNumber { raw, temporal },
                    None => blank_for_short(current_row, col, id),
                },
                rec::CELL_REAL | rec::FMLA_NUM => match read_f64(data, 8) {
                    Some(value) => RawCell::Number { value, temporal },
                    None => blank_for_short(current_row, col, id),
                },
                rec::CELL_BOOL | rec::FMLA_BOOL => match data.get(8) {
                    Some(b) => RawCell::Boolean(*b != 0),
                    None => blank_for_short(current_row, col, id),
                },
                rec::CELL_ERROR => match data.get(8) {
                    Some(code) => RawCell::ErrorCode(*code),
                    None => blank_for_short(current_row, col, id),
                },
                rec::CELL_ST | rec::FMLA_STRING => match read_wide_string(data, 8) {
                    Some((text, _)) => {
                        let text = text.trim();
                        if text.is_empty() || nulls.is_some_and(|n| n.matches(text)) {
                            RawCell::Blank
                        } else {
                            RawCell::InlineString(text.to_owned())
                        }
                    }
                    None => blank_for_short(current_row, col, id),
                },
                rec::CELL_ISST => match read_u32(data, 8) {
                    Some(idx) if shared.is_null(idx) => RawCell::Blank,
                    Some(idx) => RawCell::SharedStringRef(idx),
                    None => blank_for_short(current_row, col, id),
                },
                _ => unreachable!("filtered above"),
            };

            if !sink.push_cell(CellEvent {
                row: current_row,
                col,
                cell: raw,
            })? {
                return Ok(());
            }
        }

        Ok(())
    }
}

fn blank_for_short(row: u32, col: u32, id: u16) -> RawCell {
    log::warn!("cell ({row},{col}): record 0x{id:04X} shorter than its value; treating as blank");
    RawCell::Blank
}
