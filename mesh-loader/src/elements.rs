/// Typed element-stream reading over a parsed header description
use std::io::{BufRead, Read};

use crate::error::{MeshError, Result};
use crate::header::{ElementDecl, Format, PropertyKind, ScalarType};

/// One decoded property value. Integers widen losslessly into f64 for the
/// value ranges PLY files carry.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    List(Vec<f64>),
}

impl Value {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[f64]> {
        match self {
            Value::List(items) => Some(items),
            Value::Scalar(_) => None,
        }
    }
}

/// A decoded element row, one slot per declared property.
///
/// ASCII rows may run out of tokens before the declaration does; the
/// missing tail decodes as `None` so optional-attribute probing can fail
/// per property instead of aborting the row.
pub type Row = Vec<Option<Value>>;

/// Fetch a named property from a row, `None` when the property is not
/// declared or its slot is empty
pub fn row_value<'a>(decl: &ElementDecl, row: &'a Row, name: &str) -> Option<&'a Value> {
    let index = decl.property_index(name)?;
    row.get(index)?.as_ref()
}

/// Decode the next row of `decl` from the stream
pub fn read_row<R: BufRead>(reader: &mut R, format: Format, decl: &ElementDecl) -> Result<Row> {
    match format {
        Format::Ascii => read_ascii_row(reader, decl),
        Format::BinaryLittleEndian => read_binary_row(reader, decl, false),
        Format::BinaryBigEndian => read_binary_row(reader, decl, true),
    }
}

fn read_ascii_row<R: BufRead>(reader: &mut R, decl: &ElementDecl) -> Result<Row> {
    let mut line = String::new();
    // skip blank lines between rows
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(MeshError::Data(format!(
                "stream ended inside '{}' element data",
                decl.name
            )));
        }
        if !line.trim().is_empty() {
            break;
        }
    }

    let mut tokens = line.split_whitespace();
    let mut row = Row::with_capacity(decl.properties.len());
    for property in &decl.properties {
        match &property.kind {
            PropertyKind::Scalar(_) => {
                row.push(tokens.next().and_then(|t| t.parse().ok()).map(Value::Scalar));
            }
            PropertyKind::List { .. } => {
                let Some(count) = tokens.next().and_then(|t| t.parse::<usize>().ok()) else {
                    row.push(None);
                    continue;
                };
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    match tokens.next().and_then(|t| t.parse().ok()) {
                        Some(v) => items.push(v),
                        None => break,
                    }
                }
                row.push(Some(Value::List(items)));
            }
        }
    }
    Ok(row)
}

fn read_binary_row<R: Read>(reader: &mut R, decl: &ElementDecl, big_endian: bool) -> Result<Row> {
    let mut row = Row::with_capacity(decl.properties.len());
    for property in &decl.properties {
        match &property.kind {
            PropertyKind::Scalar(ty) => {
                row.push(Some(Value::Scalar(read_scalar(reader, *ty, big_endian)?)));
            }
            PropertyKind::List { count, item } => {
                let n = read_scalar(reader, *count, big_endian)? as usize;
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(read_scalar(reader, *item, big_endian)?);
                }
                row.push(Some(Value::List(items)));
            }
        }
    }
    Ok(row)
}

fn read_scalar<R: Read>(reader: &mut R, ty: ScalarType, big_endian: bool) -> Result<f64> {
    let mut buf = [0u8; 8];
    let bytes = &mut buf[..ty.size()];
    reader
        .read_exact(bytes)
        .map_err(|_| MeshError::Data("stream ended inside a binary element".to_string()))?;

    macro_rules! decode {
        ($t:ty) => {{
            let mut raw = [0u8; size_of::<$t>()];
            raw.copy_from_slice(bytes);
            if big_endian {
                <$t>::from_be_bytes(raw) as f64
            } else {
                <$t>::from_le_bytes(raw) as f64
            }
        }};
    }

    Ok(match ty {
        ScalarType::Char => decode!(i8),
        ScalarType::UChar => decode!(u8),
        ScalarType::Short => decode!(i16),
        ScalarType::UShort => decode!(u16),
        ScalarType::Int => decode!(i32),
        ScalarType::UInt => decode!(u32),
        ScalarType::Float => decode!(f32),
        ScalarType::Double => decode!(f64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Header;
    use std::io::Cursor;

    fn vertex_decl() -> ElementDecl {
        let text = "ply\n\
            format ascii 1.0\n\
            element vertex 2\n\
            property float x\n\
            property float y\n\
            property float z\n\
            property uchar red\n\
            end_header\n";
        Header::parse(&mut Cursor::new(text)).unwrap().elements[0].clone()
    }

    #[test]
    fn ascii_rows_mark_missing_trailing_tokens() {
        let decl = vertex_decl();
        let mut data = Cursor::new("1 2 3 255\n4 5 6\n");

        let full = read_row(&mut data, Format::Ascii, &decl).unwrap();
        assert_eq!(row_value(&decl, &full, "red").unwrap().as_scalar(), Some(255.0));

        let short = read_row(&mut data, Format::Ascii, &decl).unwrap();
        assert_eq!(row_value(&decl, &short, "x").unwrap().as_scalar(), Some(4.0));
        assert!(row_value(&decl, &short, "red").is_none());
    }

    #[test]
    fn ascii_list_rows_decode_count_prefix() {
        let text = "ply\n\
            format ascii 1.0\n\
            element face 1\n\
            property list uchar int vertex_indices\n\
            end_header\n";
        let decl = Header::parse(&mut Cursor::new(text)).unwrap().elements[0].clone();
        let mut data = Cursor::new("4 0 1 2 3\n");
        let row = read_row(&mut data, Format::Ascii, &decl).unwrap();
        assert_eq!(
            row_value(&decl, &row, "vertex_indices").unwrap().as_list(),
            Some([0.0, 1.0, 2.0, 3.0].as_slice())
        );
    }

    #[test]
    fn binary_rows_respect_endianness() {
        let decl = vertex_decl();

        let mut le = Vec::new();
        for v in [1.0f32, 2.0, 3.0] {
            le.extend_from_slice(&v.to_le_bytes());
        }
        le.push(128);
        let row = read_row(&mut Cursor::new(le), Format::BinaryLittleEndian, &decl).unwrap();
        assert_eq!(row_value(&decl, &row, "z").unwrap().as_scalar(), Some(3.0));
        assert_eq!(row_value(&decl, &row, "red").unwrap().as_scalar(), Some(128.0));

        let mut be = Vec::new();
        for v in [1.0f32, 2.0, 3.0] {
            be.extend_from_slice(&v.to_be_bytes());
        }
        be.push(128);
        let row = read_row(&mut Cursor::new(be), Format::BinaryBigEndian, &decl).unwrap();
        assert_eq!(row_value(&decl, &row, "y").unwrap().as_scalar(), Some(2.0));
    }

    #[test]
    fn truncated_binary_row_is_a_data_error() {
        let decl = vertex_decl();
        let result = read_row(
            &mut Cursor::new([0u8; 5]),
            Format::BinaryLittleEndian,
            &decl,
        );
        assert!(matches!(result, Err(MeshError::Data(_))));
    }
}
