use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use regex::Regex;

use crate::error::{Error, Result};

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

const MX_CELL: u8 = 1;
const MX_STRUCT: u8 = 2;
const MX_CHAR: u8 = 4;
const MX_DOUBLE: u8 = 6;
const MX_UINT64: u8 = 15;

const COMPLEX_FLAG: u32 = 0x0800;

type Parse<T> = std::result::Result<T, String>;

// ---------------------------------------------------------------------------
// Decoded values
// ---------------------------------------------------------------------------

/// A numeric matrix, real part only, stored column-major as in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    pub dims: Vec<usize>,
    pub data: Vec<f64>,
}

impl NumericArray {
    pub fn column_vector(data: Vec<f64>) -> Self {
        NumericArray {
            dims: vec![data.len(), 1],
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn rows(&self) -> usize {
        self.dims.first().copied().unwrap_or(0)
    }

    pub fn cols(&self) -> usize {
        if self.dims.len() < 2 {
            return usize::from(!self.data.is_empty());
        }
        self.dims[1..].iter().product()
    }

    /// Values in row-major order, treating the array as `rows x cols`.
    pub fn row_major(&self) -> Vec<f64> {
        let (rows, cols) = (self.rows(), self.cols());
        if rows <= 1 || cols <= 1 {
            return self.data.clone();
        }
        (0..rows)
            .flat_map(|i| (0..cols).map(move |j| j * rows + i))
            .filter_map(|k| self.data.get(k).copied())
            .collect()
    }
}

/// One node of the MAT element tree.
#[derive(Debug, Clone, PartialEq)]
pub enum MatValue {
    Numeric(NumericArray),
    Text(String),
    /// `elements[i][f]` is field `fields[f]` of struct element `i`.
    Struct {
        dims: Vec<usize>,
        fields: Vec<String>,
        elements: Vec<Vec<MatValue>>,
    },
    Cell {
        dims: Vec<usize>,
        items: Vec<MatValue>,
    },
    /// Sparse, object and other classes we never read signals from.
    Unsupported { class: u8 },
}

impl MatValue {
    /// 1x1 struct built from `(field, value)` pairs.
    pub fn record(fields: Vec<(&str, MatValue)>) -> Self {
        let (names, values): (Vec<String>, Vec<MatValue>) = fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .unzip();
        MatValue::Struct {
            dims: vec![1, 1],
            fields: names,
            elements: vec![values],
        }
    }
}

/// A flattened leaf, borrowed from its [`MatFile`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatLeaf<'a> {
    Numeric(&'a NumericArray),
    Text(&'a str),
}

// ---------------------------------------------------------------------------
// MatFile
// ---------------------------------------------------------------------------

/// All top-level variables of a MAT file, in file order.
#[derive(Debug, Clone, Default)]
pub struct MatFile {
    variables: Vec<(String, MatValue)>,
}

impl MatFile {
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&bytes).map_err(|message| Error::Mat {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::parse(bytes).map_err(|message| Error::Mat {
            path: PathBuf::from("<memory>"),
            message,
        })
    }

    pub fn variables(&self) -> &[(String, MatValue)] {
        &self.variables
    }

    /// Every numeric/text leaf keyed by its path: `name`, `name.field`,
    /// `name[i].field` (struct arrays, 0-based) or `name{i}` (cells).
    pub fn flatten(&self) -> Vec<(String, MatLeaf<'_>)> {
        let mut out = Vec::new();
        for (name, value) in &self.variables {
            flatten_into(name.clone(), value, &mut out);
        }
        out
    }

    pub fn numeric(&self, key: &str) -> Option<&NumericArray> {
        self.flatten().into_iter().find_map(|(k, leaf)| match leaf {
            MatLeaf::Numeric(a) if k == key => Some(a),
            _ => None,
        })
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.flatten().into_iter().find_map(|(k, leaf)| match leaf {
            MatLeaf::Text(s) if k == key => Some(s),
            _ => None,
        })
    }

    /// First numeric leaf whose key matches `pattern`.
    pub fn find_numeric(&self, pattern: &Regex) -> Option<(String, &NumericArray)> {
        self.flatten().into_iter().find_map(|(k, leaf)| match leaf {
            MatLeaf::Numeric(a) if pattern.is_match(&k) => Some((k, a)),
            _ => None,
        })
    }

    fn parse(bytes: &[u8]) -> Parse<Self> {
        if bytes.len() < HEADER_LEN {
            return Err("file shorter than the 128-byte header".into());
        }
        let big_endian = match &bytes[126..128] {
            b"IM" => false,
            b"MI" => true,
            _ => return Err("not a level-5 MAT file (bad endian indicator)".into()),
        };

        let mut variables = Vec::new();
        let mut cursor = Cursor::new(&bytes[HEADER_LEN..], big_endian);
        while cursor.remaining() >= 8 {
            let element = cursor.element()?;
            match element.dtype {
                MI_MATRIX => variables.push(parse_matrix(element.data, big_endian)?),
                MI_COMPRESSED => {
                    let mut inflated = Vec::new();
                    ZlibDecoder::new(element.data)
                        .read_to_end(&mut inflated)
                        .map_err(|e| format!("corrupt compressed element: {e}"))?;
                    let mut inner = Cursor::new(&inflated, big_endian);
                    while inner.remaining() >= 8 {
                        let element = inner.element()?;
                        if element.dtype == MI_MATRIX {
                            variables.push(parse_matrix(element.data, big_endian)?);
                        }
                    }
                }
                other => log::debug!("skipping top-level MAT element of type {other}"),
            }
        }
        Ok(MatFile { variables })
    }
}

fn flatten_into<'a>(path: String, value: &'a MatValue, out: &mut Vec<(String, MatLeaf<'a>)>) {
    match value {
        MatValue::Numeric(a) => out.push((path, MatLeaf::Numeric(a))),
        MatValue::Text(s) => out.push((path, MatLeaf::Text(s))),
        MatValue::Struct {
            fields, elements, ..
        } => {
            let indexed = elements.len() > 1;
            for (i, element) in elements.iter().enumerate() {
                let base = if indexed {
                    format!("{path}[{i}]")
                } else {
                    path.clone()
                };
                for (field, v) in fields.iter().zip(element) {
                    flatten_into(format!("{base}.{field}"), v, out);
                }
            }
        }
        MatValue::Cell { items, .. } => {
            for (i, item) in items.iter().enumerate() {
                flatten_into(format!("{path}{{{i}}}"), item, out);
            }
        }
        MatValue::Unsupported { .. } => {}
    }
}

// ---------------------------------------------------------------------------
// Element parsing
// ---------------------------------------------------------------------------

struct Element<'a> {
    dtype: u32,
    data: &'a [u8],
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    big_endian: bool,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8], big_endian: bool) -> Self {
        Cursor {
            buf,
            pos: 0,
            big_endian,
        }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Parse<&'a [u8]> {
        if n > self.remaining() {
            return Err(format!(
                "element needs {n} bytes, only {} left",
                self.remaining()
            ));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u32(&mut self) -> Parse<u32> {
        let b: [u8; 4] = self.take(4)?.try_into().map_err(|_| "short tag")?;
        Ok(if self.big_endian {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        })
    }

    fn align8(&mut self) {
        self.pos = ((self.pos + 7) & !7).min(self.buf.len());
    }

    fn element(&mut self) -> Parse<Element<'a>> {
        let first = self.u32()?;
        let small_len = (first >> 16) as usize;
        if small_len != 0 {
            if small_len > 4 {
                return Err(format!("small element claims {small_len} bytes"));
            }
            let packed = self.take(4)?;
            return Ok(Element {
                dtype: first & 0xFFFF,
                data: &packed[..small_len],
            });
        }
        let len = self.u32()? as usize;
        let data = self.take(len)?;
        if first != MI_COMPRESSED {
            self.align8();
        }
        Ok(Element { dtype: first, data })
    }
}

fn parse_matrix(data: &[u8], big_endian: bool) -> Parse<(String, MatValue)> {
    if data.is_empty() {
        return Ok((String::new(), MatValue::Numeric(NumericArray::column_vector(Vec::new()))));
    }
    let mut c = Cursor::new(data, big_endian);

    let flags = c.element()?;
    let flags_word = numbers(&flags, big_endian)?
        .first()
        .copied()
        .ok_or("empty array flags")? as u32;
    let class = (flags_word & 0xFF) as u8;

    let dims: Vec<usize> = numbers(&c.element()?, big_endian)?
        .into_iter()
        .map(|d| d as usize)
        .collect();
    let count = dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| format!("dims {dims:?} overflow"))?;
    let name = String::from_utf8_lossy(c.element()?.data).into_owned();

    let value = match class {
        MX_DOUBLE..=MX_UINT64 => {
            let real = numbers(&c.element()?, big_endian)?;
            if real.len() != count {
                return Err(format!(
                    "'{name}': dims {dims:?} need {count} values, found {}",
                    real.len()
                ));
            }
            if flags_word & COMPLEX_FLAG != 0 {
                log::debug!("'{name}': dropping imaginary part");
            }
            MatValue::Numeric(NumericArray { dims, data: real })
        }
        MX_CHAR => MatValue::Text(text(&c.element()?, big_endian)?),
        MX_STRUCT => {
            let field_len = numbers(&c.element()?, big_endian)?
                .first()
                .copied()
                .ok_or("missing struct field name length")? as usize;
            if field_len == 0 {
                return Err(format!("'{name}': zero field name length"));
            }
            let fields: Vec<String> = c
                .element()?
                .data
                .chunks(field_len)
                .map(|raw| {
                    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
                    String::from_utf8_lossy(&raw[..end]).into_owned()
                })
                .collect();
            let needed = if fields.is_empty() { 0 } else { count };
            fits(&c, &name, needed.checked_mul(fields.len()))?;
            let mut elements = Vec::with_capacity(needed);
            for _ in 0..needed {
                let mut element = Vec::with_capacity(fields.len());
                for _ in &fields {
                    let sub = c.element()?;
                    element.push(parse_matrix(sub.data, big_endian)?.1);
                }
                elements.push(element);
            }
            MatValue::Struct {
                dims,
                fields,
                elements,
            }
        }
        MX_CELL => {
            fits(&c, &name, Some(count))?;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let sub = c.element()?;
                items.push(parse_matrix(sub.data, big_endian)?.1);
            }
            MatValue::Cell { dims, items }
        }
        other => MatValue::Unsupported { class: other },
    };
    Ok((name, value))
}

/// Every sub-element takes at least an 8-byte tag, so `n` of them must fit
/// in what is left of the parent.
fn fits(c: &Cursor<'_>, name: &str, n: Option<usize>) -> Parse<()> {
    match n {
        Some(n) if n <= c.remaining() / 8 => Ok(()),
        _ => Err(format!(
            "'{name}': dims claim more elements than the {} bytes left",
            c.remaining()
        )),
    }
}

fn numbers(el: &Element<'_>, big_endian: bool) -> Parse<Vec<f64>> {
    macro_rules! decode {
        ($t:ty) => {{
            const W: usize = std::mem::size_of::<$t>();
            el.data
                .chunks_exact(W)
                .map(|chunk| {
                    let mut b = [0u8; W];
                    b.copy_from_slice(chunk);
                    if big_endian {
                        <$t>::from_be_bytes(b) as f64
                    } else {
                        <$t>::from_le_bytes(b) as f64
                    }
                })
                .collect()
        }};
    }
    Ok(match el.dtype {
        MI_DOUBLE => decode!(f64),
        MI_SINGLE => decode!(f32),
        MI_INT8 => decode!(i8),
        MI_UINT8 => decode!(u8),
        MI_INT16 => decode!(i16),
        MI_UINT16 => decode!(u16),
        MI_INT32 => decode!(i32),
        MI_UINT32 => decode!(u32),
        MI_INT64 => decode!(i64),
        MI_UINT64 => decode!(u64),
        other => return Err(format!("data type {other} is not numeric")),
    })
}

fn text(el: &Element<'_>, big_endian: bool) -> Parse<String> {
    match el.dtype {
        MI_UTF8 | MI_UINT8 | MI_INT8 => Ok(String::from_utf8_lossy(el.data).into_owned()),
        MI_UTF16 | MI_UINT16 => {
            let units: Vec<u16> = numbers(
                &Element {
                    dtype: MI_UINT16,
                    data: el.data,
                },
                big_endian,
            )?
            .into_iter()
            .map(|u| u as u16)
            .collect();
            Ok(String::from_utf16_lossy(&units))
        }
        MI_UTF32 => Ok(numbers(
            &Element {
                dtype: MI_UINT32,
                data: el.data,
            },
            big_endian,
        )?
        .into_iter()
        .filter_map(|c| char::from_u32(c as u32))
        .collect()),
        other => Err(format!("data type {other} is not text")),
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Little-endian level-5 writer for synthetic datasets and fixtures.
#[derive(Debug, Default)]
pub struct MatWriter {
    compress: bool,
    variables: Vec<(String, MatValue)>,
}

impl MatWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap every variable in a zlib `miCOMPRESSED` element (MAT v7 style).
    pub fn compressed(mut self, yes: bool) -> Self {
        self.compress = yes;
        self
    }

    pub fn add(&mut self, name: &str, value: MatValue) -> &mut Self {
        self.variables.push((name.to_string(), value));
        self
    }

    pub fn add_vector(&mut self, name: &str, values: &[f64]) -> &mut Self {
        self.add(
            name,
            MatValue::Numeric(NumericArray::column_vector(values.to_vec())),
        )
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut text = b"MATLAB 5.0 MAT-file, Platform: rolbearing".to_vec();
        text.resize(116, b' ');
        out.extend_from_slice(&text);
        out.extend_from_slice(&[0u8; 8]);
        out.extend_from_slice(&0x0100u16.to_le_bytes());
        out.extend_from_slice(b"IM");

        for (name, value) in &self.variables {
            let element = encode_matrix(name, value);
            if self.compress {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder
                    .write_all(&element)
                    .and_then(|_| encoder.finish())
                    .map(|packed| {
                        out.extend_from_slice(&MI_COMPRESSED.to_le_bytes());
                        out.extend_from_slice(&(packed.len() as u32).to_le_bytes());
                        out.extend_from_slice(&packed);
                    })
                    .map_err(|e| Error::io("<zlib>", e))?;
            } else {
                out.extend_from_slice(&element);
            }
        }
        Ok(out)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes).map_err(|e| Error::io(path, e))
    }
}

fn push_element(out: &mut Vec<u8>, dtype: u32, data: &[u8]) {
    out.extend_from_slice(&dtype.to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    while out.len() % 8 != 0 {
        out.push(0);
    }
}

fn encode_matrix(name: &str, value: &MatValue) -> Vec<u8> {
    let (class, dims): (u8, Vec<usize>) = match value {
        MatValue::Numeric(a) => (MX_DOUBLE, a.dims.clone()),
        MatValue::Text(s) => (MX_CHAR, vec![1, s.encode_utf16().count()]),
        MatValue::Struct { dims, .. } => (MX_STRUCT, dims.clone()),
        MatValue::Cell { dims, .. } => (MX_CELL, dims.clone()),
        MatValue::Unsupported { .. } => (MX_DOUBLE, vec![0, 0]),
    };

    let mut body = Vec::new();
    let flags: Vec<u8> = [u32::from(class), 0]
        .iter()
        .flat_map(|w| w.to_le_bytes())
        .collect();
    push_element(&mut body, MI_UINT32, &flags);
    let dims_bytes: Vec<u8> = dims
        .iter()
        .flat_map(|&d| (d as i32).to_le_bytes())
        .collect();
    push_element(&mut body, MI_INT32, &dims_bytes);
    push_element(&mut body, MI_INT8, name.as_bytes());

    match value {
        MatValue::Numeric(a) => {
            let raw: Vec<u8> = a.data.iter().flat_map(|v| v.to_le_bytes()).collect();
            push_element(&mut body, MI_DOUBLE, &raw);
        }
        MatValue::Text(s) => {
            let raw: Vec<u8> = s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
            push_element(&mut body, MI_UINT16, &raw);
        }
        MatValue::Struct {
            fields, elements, ..
        } => {
            let field_len = fields.iter().map(|f| f.len()).max().unwrap_or(0) + 1;
            push_element(&mut body, MI_INT32, &(field_len as i32).to_le_bytes());
            let mut names = Vec::with_capacity(field_len * fields.len());
            for field in fields {
                let mut raw = field.as_bytes().to_vec();
                raw.resize(field_len, 0);
                names.extend_from_slice(&raw);
            }
            push_element(&mut body, MI_INT8, &names);
            for element in elements {
                for v in element {
                    body.extend_from_slice(&encode_matrix("", v));
                }
            }
        }
        MatValue::Cell { items, .. } => {
            for item in items {
                body.extend_from_slice(&encode_matrix("", item));
            }
        }
        MatValue::Unsupported { .. } => push_element(&mut body, MI_DOUBLE, &[]),
    }

    let mut out = Vec::with_capacity(body.len() + 8);
    out.extend_from_slice(&MI_MATRIX.to_le_bytes());
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 * 0.5).collect()
    }

    #[test]
    fn reads_back_plain_and_compressed_vectors() {
        for compress in [false, true] {
            let mut writer = MatWriter::new().compressed(compress);
            writer.add_vector("X097_DE_time", &ramp(10));
            writer.add_vector("X097_FE_time", &ramp(3));
            let mat = MatFile::from_bytes(&writer.to_bytes().unwrap()).unwrap();

            let de = mat.numeric("X097_DE_time").unwrap();
            assert_eq!(de.dims, vec![10, 1]);
            assert_eq!(de.data, ramp(10));
            assert_eq!(mat.numeric("X097_FE_time").unwrap().len(), 3);
        }
    }

    #[test]
    fn flattens_nested_struct_arrays() {
        let channel = |name: &str, data: Vec<f64>| {
            vec![
                MatValue::Text(name.to_string()),
                MatValue::Numeric(NumericArray {
                    dims: vec![1, data.len()],
                    data,
                }),
            ]
        };
        let y = MatValue::Struct {
            dims: vec![1, 2],
            fields: vec!["Name".into(), "Data".into()],
            elements: vec![channel("force", vec![1.0]), channel("vibration_1", ramp(4))],
        };
        let mut writer = MatWriter::new();
        writer.add("N15_M07_F10_K001_1", MatValue::record(vec![("Y", y)]));
        let mat = MatFile::from_bytes(&writer.to_bytes().unwrap()).unwrap();

        assert_eq!(mat.text("N15_M07_F10_K001_1.Y[1].Name"), Some("vibration_1"));
        let data = mat.numeric("N15_M07_F10_K001_1.Y[1].Data").unwrap();
        assert_eq!(data.data, ramp(4));
        assert_eq!(data.cols(), 4);
    }

    #[test]
    fn row_major_transposes_column_storage() {
        // [[1, 2, 3], [4, 5, 6]] stored column by column.
        let array = NumericArray {
            dims: vec![2, 3],
            data: vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0],
        };
        assert_eq!(array.row_major(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(NumericArray::column_vector(ramp(3)).row_major(), ramp(3));
    }

    #[test]
    fn finds_first_key_matching_pattern() {
        let mut writer = MatWriter::new();
        writer.add_vector("X118RPM", &[1797.0]);
        writer.add_vector("X118_DE_time", &ramp(5));
        let mat = MatFile::from_bytes(&writer.to_bytes().unwrap()).unwrap();

        let pattern = Regex::new(r"DE_time$").unwrap();
        let (key, array) = mat.find_numeric(&pattern).unwrap();
        assert_eq!(key, "X118_DE_time");
        assert_eq!(array.len(), 5);
    }

    #[test]
    fn decodes_small_element_format() {
        // flags (small: 8 bytes do not fit, so normal), dims normal,
        // name "ab" small, one int8 value small.
        let mut body = Vec::new();
        push_element(
            &mut body,
            MI_UINT32,
            &[u32::from(MX_DOUBLE), 0].map(u32::to_le_bytes).concat(),
        );
        push_element(&mut body, MI_INT32, &[1i32, 1].map(i32::to_le_bytes).concat());
        body.extend_from_slice(&((2u32 << 16) | MI_INT8).to_le_bytes());
        body.extend_from_slice(b"ab\0\0");
        body.extend_from_slice(&((1u32 << 16) | MI_INT8).to_le_bytes());
        body.extend_from_slice(&[0xFB, 0, 0, 0]);

        let mut bytes = MatWriter::new().to_bytes().unwrap();
        bytes.extend_from_slice(&MI_MATRIX.to_le_bytes());
        bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&body);

        let mat = MatFile::from_bytes(&bytes).unwrap();
        assert_eq!(mat.numeric("ab").unwrap().data, vec![-5.0]);
    }

    /// Cell array header claiming `dims` elements with no payload behind it.
    fn bare_cell(dims: [i32; 2]) -> Vec<u8> {
        let mut body = Vec::new();
        push_element(&mut body, MI_UINT32, &[u32::from(MX_CELL), 0].map(u32::to_le_bytes).concat());
        push_element(&mut body, MI_INT32, &dims.map(i32::to_le_bytes).concat());
        push_element(&mut body, MI_INT8, b"c");

        let mut bytes = MatWriter::new().to_bytes().unwrap();
        bytes.extend_from_slice(&MI_MATRIX.to_le_bytes());
        bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&body);
        bytes
    }

    #[test]
    fn oversized_dims_are_rejected_without_allocating() {
        let err = MatFile::from_bytes(&bare_cell([i32::MAX, i32::MAX])).unwrap_err();
        assert!(err.to_string().contains("elements"));
        assert!(MatFile::from_bytes(&bare_cell([0, 0])).is_ok());
    }

    #[test]
    fn rejects_non_mat_bytes() {
        let err = MatFile::from_bytes(&[0u8; 200]).unwrap_err();
        assert!(err.to_string().contains("endian"));
        assert!(MatFile::from_bytes(b"short").is_err());
    }
}
