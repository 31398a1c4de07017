//! BIFF12 record stream tokenizer.
//!
//! XLSB parts are flat streams of records: a 1–2 byte record id (second
//! byte present when bit 7 of the first is set) followed by a 1–4 byte
//! 7-bit varint payload length and the payload itself.

use std::io::Read;

use crate::error::{Result, SheetcastError};

pub(crate) mod rec {
    pub const ROW_HDR: u16 = 0x0000;
    pub const CELL_BLANK: u16 = 0x0001;
    pub const CELL_RK: u16 = 0x0002;
    pub const CELL_ERROR: u16 = 0x0003;
    pub const CELL_BOOL: u16 = 0x0004;
    pub const CELL_REAL: u16 = 0x0005;
    pub const CELL_ST: u16 = 0x0006;
    pub const CELL_ISST: u16 = 0x0007;
    pub const FMLA_STRING: u16 = 0x0008;
    pub const FMLA_NUM: u16 = 0x0009;
    pub const FMLA_BOOL: u16 = 0x000A;
    pub const SST_ITEM: u16 = 0x0013;
    pub const FMT: u16 = 0x002C;
    pub const XF: u16 = 0x002F;
    pub const END_SHEET_DATA: u16 = 0x0192;
    pub const BUNDLE_SH: u16 = 0x019C;
}

/// Pull-based record scanner over any byte stream. The payload buffer is
/// reused between calls; callers copy what they keep.
pub(crate) struct RecordReader<R: Read> {
    inner: R,
    data: Vec<u8>,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        RecordReader {
            inner,
            data: Vec::new(),
        }
    }

    /// Read the next record header and payload. `Ok(None)` at a clean end
    /// of stream; truncation inside a record is a format error.
    pub fn next_record(&mut self) -> Result<Option<(u16, &[u8])>> {
        let Some(first) = self.read_byte()? else {
            return Ok(None);
        };
        let mut id = first as u16;
        if first & 0x80 != 0 {
            let second = self.require_byte("record id")?;
            id |= (second as u16) << 8;
        }

        let mut size: usize = 0;
        for shift in [0u32, 7, 14, 21] {
            let b = self.require_byte("record length")?;
            size |= ((b & 0x7F) as usize) << shift;
            if b & 0x80 == 0 {
                break;
            }
            if shift == 21 {
                return Err(SheetcastError::format("record length varint too long"));
            }
        }

        self.data.clear();
        self.data.resize(size, 0);
        self.inner.read_exact(&mut self.data).map_err(|e| {
            SheetcastError::format(format!("truncated record 0x{id:04X} ({size} bytes): {e}"))
        })?;
        Ok(Some((id, &self.data)))
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.inner.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => self.read_byte(),
            Err(e) => Err(e.into()),
        }
    }

    fn require_byte(&mut self, what: &str) -> Result<u8> {
        self.read_byte()?
            .ok_or_else(|| SheetcastError::format(format!("stream ended inside {what}")))
    }
}

/// Little-endian field helpers for record payloads. All return `None` when
/// the payload is too short, so malformed cells can be recovered as blanks.
pub(crate) fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

pub(crate) fn read_u24(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 3)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], 0]))
}

pub(crate) fn read_f64(data: &[u8], offset: usize) -> Option<f64> {
    data.get(offset..offset + 8)
        .map(|b| f64::from_le_bytes(b.try_into().expect("8-byte slice")))
}

/// Read an `XLWideString`: u32 char count followed by UTF-16LE code units.
/// Returns the string and the offset just past it. Lossy on unpaired
/// surrogates, like every other consumer of these files.
pub(crate) fn read_wide_string(data: &[u8], offset: usize) -> Option<(String, usize)> {
    let cch = read_u32(data, offset)? as usize;
    let start = offset + 4;
    let end = start + cch * 2;
    let bytes = data.get(start..end)?;
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect();
    Some((String::from_utf16_lossy(&units), end))
}

/// `XLNullableWideString`: 0xFFFFFFFF char count means absent.
pub(crate) fn read_nullable_wide_string(data: &[u8], offset: usize) -> Option<(Option<String>, usize)> {
    let cch = read_u32(data, offset)?;
    if cch == 0xFFFF_FFFF {
        return Some((None, offset + 4));
    }
    read_wide_string(data, offset).map(|(s, end)| (Some(s), end))
}
