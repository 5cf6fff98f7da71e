//! Reader for MATLAB Level 5 MAT-files, enough to load physiological
//! recordings exported by acquisition software.
//!
//! Layout:
//! ```text
//!  128-byte header (text, subsys offset, version, endian indicator "IM"/"MI")
//!  data element*   (tag: type u32 + byte count u32, payload padded to 8 bytes)
//!     miMATRIX     -> array flags, dimensions, name, real part [, imaginary part]
//!     miCOMPRESSED -> zlib stream holding one more data element
//! ```
//! Numeric classes are widened to `f64`; char arrays keep their code units.
//! Cell, struct, object and sparse arrays are skipped.

use crate::domain::recording::Recording;
use crate::utils::error::{CheckError, Result};
use flate2::read::ZlibDecoder;
use ndarray::{Array2, ShapeBuilder};
use std::io::Read;
use std::path::Path;

const HEADER_LEN: usize = 128;

const MI_INT8: u32 = 1;
const MI_UINT8: u32 = 2;
const MI_INT16: u32 = 3;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_SINGLE: u32 = 7;
const MI_DOUBLE: u32 = 9;
const MI_INT64: u32 = 12;
const MI_UINT64: u32 = 13;
const MI_MATRIX: u32 = 14;
const MI_COMPRESSED: u32 = 15;
const MI_UTF8: u32 = 16;
const MI_UTF16: u32 = 17;
const MI_UTF32: u32 = 18;

const MX_CHAR: u32 = 4;
const MX_DOUBLE: u32 = 6;
const MX_UINT64: u32 = 15;

const COMPLEX_FLAG: u32 = 0x0800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

impl Endian {
    fn u16(self, b: &[u8]) -> u16 {
        let bytes = [b[0], b[1]];
        match self {
            Endian::Little => u16::from_le_bytes(bytes),
            Endian::Big => u16::from_be_bytes(bytes),
        }
    }

    fn u32(self, b: &[u8]) -> u32 {
        let bytes = [b[0], b[1], b[2], b[3]];
        match self {
            Endian::Little => u32::from_le_bytes(bytes),
            Endian::Big => u32::from_be_bytes(bytes),
        }
    }

    fn u64(self, b: &[u8]) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&b[..8]);
        match self {
            Endian::Little => u64::from_le_bytes(bytes),
            Endian::Big => u64::from_be_bytes(bytes),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatData {
    Numeric(Vec<f64>),
    /// Character code units in column-major order.
    Char(Vec<u32>),
}

impl MatData {
    pub fn len(&self) -> usize {
        match self {
            MatData::Numeric(values) => values.len(),
            MatData::Char(codes) => codes.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatVariable {
    pub name: String,
    pub dims: Vec<usize>,
    pub data: MatData,
}

impl MatVariable {
    pub fn rows(&self) -> usize {
        self.dims.first().copied().unwrap_or(0)
    }

    /// Product of every dimension after the first.
    pub fn cols(&self) -> usize {
        self.dims.iter().skip(1).fold(1, |acc: usize, &d| acc.saturating_mul(d))
    }

    pub fn numeric(&self) -> Option<&[f64]> {
        match &self.data {
            MatData::Numeric(values) => Some(values),
            MatData::Char(_) => None,
        }
    }

    pub fn scalar(&self) -> Option<f64> {
        self.numeric().and_then(|values| values.first().copied())
    }

    /// Decode a char matrix into one trimmed string per row.
    pub fn char_rows(&self) -> Option<Vec<String>> {
        let codes = match &self.data {
            MatData::Char(codes) => codes,
            MatData::Numeric(_) => return None,
        };
        let (rows, cols) = (self.rows(), self.cols());

        let decoded = (0..rows)
            .map(|i| {
                let row: String = (0..cols)
                    .filter_map(|j| codes.get(i + j * rows))
                    .map(|&code| char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect();
                row.trim_matches(|c: char| c.is_whitespace() || c == '\0')
                    .to_string()
            })
            .collect();
        Some(decoded)
    }
}

#[derive(Debug, Clone)]
pub struct MatFile {
    pub header_text: String,
    pub variables: Vec<MatVariable>,
}

impl MatFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(CheckError::mat("file is shorter than the 128-byte MAT header"));
        }

        let header_text = String::from_utf8_lossy(&bytes[..116])
            .trim_end_matches(|c: char| c == ' ' || c == '\0')
            .to_string();
        if header_text.contains("MATLAB 7.3") {
            return Err(CheckError::mat("MAT v7.3 (HDF5) files are not supported"));
        }

        let endian = match &bytes[126..128] {
            b"IM" => Endian::Little,
            b"MI" => Endian::Big,
            _ => return Err(CheckError::mat("missing endian indicator; not a Level 5 MAT-file")),
        };
        tracing::debug!("MAT header: {:?} ({:?} endian)", header_text, endian);

        let mut variables = Vec::new();
        let mut cursor = ElementCursor::new(&bytes[HEADER_LEN..], endian);
        while let Some((data_type, payload)) = cursor.next_element()? {
            if let Some(var) = read_element(data_type, payload, endian)? {
                tracing::debug!("MAT variable '{}' dims {:?}", var.name, var.dims);
                variables.push(var);
            }
        }

        Ok(Self {
            header_text,
            variables,
        })
    }

    pub fn find(&self, name: &str) -> Option<&MatVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    fn require(&self, name: &str) -> Result<&MatVariable> {
        self.find(name)
            .ok_or_else(|| CheckError::mat(format!("variable '{}' not found", name)))
    }
}

struct ElementCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> ElementCursor<'a> {
    fn new(buf: &'a [u8], endian: Endian) -> Self {
        Self { buf, pos: 0, endian }
    }

    /// Next `(type, payload)` pair, `None` at the end of the buffer.
    fn next_element(&mut self) -> Result<Option<(u32, &'a [u8])>> {
        let buf = self.buf;
        if buf.len().saturating_sub(self.pos) < 8 {
            return Ok(None);
        }

        let tag = &buf[self.pos..self.pos + 8];
        let first = self.endian.u32(&tag[..4]);

        // 小型資料元素：型別與長度擠在前四個位元組
        if first >> 16 != 0 {
            let data_type = first & 0xFFFF;
            let len = (first >> 16) as usize;
            if len > 4 {
                return Err(CheckError::mat("small data element longer than 4 bytes"));
            }
            let payload = &buf[self.pos + 4..self.pos + 4 + len];
            self.pos += 8;
            return Ok(Some((data_type, payload)));
        }

        let data_type = first;
        let len = self.endian.u32(&tag[4..]) as usize;
        let start = self.pos + 8;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= buf.len())
            .ok_or_else(|| {
                CheckError::mat(format!(
                    "data element of {} bytes runs past the end of the file",
                    len
                ))
            })?;

        self.pos = if data_type == MI_COMPRESSED {
            end
        } else {
            (start + len.div_ceil(8) * 8).min(buf.len())
        };
        Ok(Some((data_type, &buf[start..end])))
    }

    fn expect_element(&mut self, what: &str) -> Result<(u32, &'a [u8])> {
        self.next_element()?
            .ok_or_else(|| CheckError::mat(format!("matrix is missing its {}", what)))
    }
}

fn read_element(data_type: u32, payload: &[u8], endian: Endian) -> Result<Option<MatVariable>> {
    match data_type {
        MI_MATRIX => read_matrix(payload, endian),
        MI_COMPRESSED => {
            let mut inflated = Vec::new();
            ZlibDecoder::new(payload)
                .read_to_end(&mut inflated)
                .map_err(|e| CheckError::mat(format!("corrupt compressed element: {}", e)))?;

            let mut inner = ElementCursor::new(&inflated, endian);
            match inner.next_element()? {
                Some((inner_type, inner_payload)) => read_element(inner_type, inner_payload, endian),
                None => Ok(None),
            }
        }
        other => {
            tracing::debug!("Skipping top-level data element of type {}", other);
            Ok(None)
        }
    }
}

fn read_matrix(payload: &[u8], endian: Endian) -> Result<Option<MatVariable>> {
    if payload.is_empty() {
        return Ok(None);
    }
    let mut cursor = ElementCursor::new(payload, endian);

    let (_, flags) = cursor.expect_element("array flags")?;
    if flags.len() < 4 {
        return Err(CheckError::mat("array flags element is too short"));
    }
    let flags = endian.u32(flags);
    let class = flags & 0xFF;

    let (dims_type, dims_bytes) = cursor.expect_element("dimensions")?;
    let dims: Vec<usize> = decode_numeric(dims_type, dims_bytes, endian)?
        .into_iter()
        .map(|d| d.max(0.0) as usize)
        .collect();

    let (_, name_bytes) = cursor.expect_element("name")?;
    let name = String::from_utf8_lossy(name_bytes).to_string();

    let expected = element_count(&dims).ok_or_else(|| {
        CheckError::mat(format!("variable '{}' has oversized dimensions {:?}", name, dims))
    })?;

    if class != MX_CHAR && !(MX_DOUBLE..=MX_UINT64).contains(&class) {
        tracing::debug!("Skipping variable '{}' with unsupported class {}", name, class);
        return Ok(None);
    }
    if flags & COMPLEX_FLAG != 0 {
        tracing::debug!("Variable '{}' is complex; keeping the real part only", name);
    }

    let (real_type, real_bytes) = match cursor.next_element()? {
        Some(element) => element,
        None if expected == 0 => (MI_DOUBLE, &[][..]),
        None => return Err(CheckError::mat(format!("variable '{}' has no data", name))),
    };

    let data = if class == MX_CHAR {
        MatData::Char(decode_chars(real_type, real_bytes, endian)?)
    } else {
        MatData::Numeric(decode_numeric(real_type, real_bytes, endian)?)
    };
    if data.len() < expected {
        return Err(CheckError::mat(format!(
            "variable '{}' holds {} value(s) but its dimensions {:?} need {}",
            name,
            data.len(),
            dims,
            expected
        )));
    }

    Ok(Some(MatVariable { name, dims, data }))
}

/// Number of elements described by `dims`; `None` when it does not fit in `usize`.
fn element_count(dims: &[usize]) -> Option<usize> {
    // 非零維度的乘積不溢位時，任何子乘積（例如 cols）也不會溢位
    let nonzero = dims
        .iter()
        .filter(|&&d| d != 0)
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))?;
    Some(if dims.contains(&0) { 0 } else { nonzero })
}

fn decode_numeric(data_type: u32, bytes: &[u8], endian: Endian) -> Result<Vec<f64>> {
    let values = match data_type {
        MI_INT8 => bytes.iter().map(|&b| b as i8 as f64).collect(),
        MI_UINT8 | MI_UTF8 => bytes.iter().map(|&b| b as f64).collect(),
        MI_INT16 => bytes.chunks_exact(2).map(|c| endian.u16(c) as i16 as f64).collect(),
        MI_UINT16 | MI_UTF16 => bytes.chunks_exact(2).map(|c| endian.u16(c) as f64).collect(),
        MI_INT32 => bytes.chunks_exact(4).map(|c| endian.u32(c) as i32 as f64).collect(),
        MI_UINT32 | MI_UTF32 => bytes.chunks_exact(4).map(|c| endian.u32(c) as f64).collect(),
        MI_SINGLE => bytes
            .chunks_exact(4)
            .map(|c| f32::from_bits(endian.u32(c)) as f64)
            .collect(),
        MI_DOUBLE => bytes
            .chunks_exact(8)
            .map(|c| f64::from_bits(endian.u64(c)))
            .collect(),
        MI_INT64 => bytes.chunks_exact(8).map(|c| endian.u64(c) as i64 as f64).collect(),
        MI_UINT64 => bytes.chunks_exact(8).map(|c| endian.u64(c) as f64).collect(),
        other => {
            return Err(CheckError::mat(format!("unsupported numeric data type {}", other)));
        }
    };
    Ok(values)
}

fn decode_chars(data_type: u32, bytes: &[u8], endian: Endian) -> Result<Vec<u32>> {
    match data_type {
        MI_UTF8 => Ok(String::from_utf8_lossy(bytes).chars().map(|c| c as u32).collect()),
        _ => Ok(decode_numeric(data_type, bytes, endian)?
            .into_iter()
            .map(|v| v as u32)
            .collect()),
    }
}

// ---------------------------------------------------------------------------
// Recording
// ---------------------------------------------------------------------------

/// Build a [`Recording`] from the `data`, `labels`, `units`, `isi` and
/// `isi_units` variables of an exported recording.
pub fn recording_from_mat(file: &MatFile) -> Result<Recording> {
    let data_var = file.require("data")?;
    let values = data_var
        .numeric()
        .ok_or_else(|| CheckError::mat("'data' is not a numeric matrix"))?;
    let (rows, cols) = (data_var.rows(), data_var.cols());
    let data = Array2::from_shape_vec((rows, cols).f(), values.to_vec())
        .map_err(|e| CheckError::mat(format!("'data' has an inconsistent shape: {}", e)))?;

    let labels = file
        .require("labels")?
        .char_rows()
        .ok_or_else(|| CheckError::mat("'labels' is not a char array"))?;
    let units = file
        .require("units")?
        .char_rows()
        .ok_or_else(|| CheckError::mat("'units' is not a char array"))?;
    let isi = file
        .require("isi")?
        .scalar()
        .ok_or_else(|| CheckError::mat("'isi' is not a numeric scalar"))?;
    let isi_units = file
        .require("isi_units")?
        .char_rows()
        .and_then(|rows| rows.into_iter().next())
        .unwrap_or_default();

    if labels.len() != cols {
        tracing::warn!(
            "⚠️ Recording has {} channels but {} labels",
            cols,
            labels.len()
        );
    }

    Ok(Recording {
        data,
        labels,
        units,
        isi,
        isi_units,
    })
}

pub fn load_recording<P: AsRef<Path>>(path: P) -> Result<Recording> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CheckError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let bytes = std::fs::read(path)?;
    tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());
    let file = MatFile::parse(&bytes)?;
    recording_from_mat(&file)
}
