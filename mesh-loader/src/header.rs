/// PLY header model: encoding, element declarations and typed properties
use std::io::BufRead;

use crate::error::{MeshError, Result};

/// Stream encoding declared by the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

/// Scalar value types of the PLY type system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Double,
}

impl ScalarType {
    fn from_token(token: &str) -> Option<ScalarType> {
        match token {
            "char" | "int8" => Some(ScalarType::Char),
            "uchar" | "uint8" => Some(ScalarType::UChar),
            "short" | "int16" => Some(ScalarType::Short),
            "ushort" | "uint16" => Some(ScalarType::UShort),
            "int" | "int32" => Some(ScalarType::Int),
            "uint" | "uint32" => Some(ScalarType::UInt),
            "float" | "float32" => Some(ScalarType::Float),
            "double" | "float64" => Some(ScalarType::Double),
        _ => None,
        }
    }

    /// Encoded size in bytes
    pub fn size(self) -> usize {
        match self {
            ScalarType::Char | ScalarType::UChar => 1,
            ScalarType::Short | ScalarType::UShort => 2,
            ScalarType::Int | ScalarType::UInt | ScalarType::Float => 4,
            ScalarType::Double => 8,
        }
    }
}

/// A property is either one scalar or a count-prefixed list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    Scalar(ScalarType),
    List { count: ScalarType, item: ScalarType },
}

#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub kind: PropertyKind,
}

/// One element declaration: name, instance count, ordered properties
#[derive(Debug, Clone)]
pub struct ElementDecl {
    pub name: String,
    pub count: usize,
    pub properties: Vec<Property>,
}

impl ElementDecl {
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }
}

/// Parsed header: format plus element declarations in stream order
#[derive(Debug, Clone)]
pub struct Header {
    pub format: Format,
    pub elements: Vec<ElementDecl>,
}

impl Header {
    pub fn element(&self, name: &str) -> Option<&ElementDecl> {
        self.elements.iter().find(|e| e.name == name)
    }

    /// Parse the header lines up to and including `end_header`.
    ///
    /// The reader is left positioned at the first byte of element data.
    pub fn parse<R: BufRead>(reader: &mut R) -> Result<Header> {
        let mut line_no = 0;
        let mut line = String::new();

        let mut read_line = |reader: &mut R, line: &mut String| -> Result<usize> {
            line.clear();
            let n = reader.read_line(line)?;
            Ok(n)
        };

        read_line(reader, &mut line)?;
        line_no += 1;
        if line.trim_end() != "ply" {
            return Err(MeshError::Header {
                line: line_no,
                reason: "missing 'ply' magic".to_string(),
            });
        }

        let mut format = None;
        let mut elements: Vec<ElementDecl> = Vec::new();

        loop {
            if read_line(reader, &mut line)? == 0 {
                return Err(MeshError::Header {
                    line: line_no,
                    reason: "unexpected end of header".to_string(),
                });
            }
            line_no += 1;
            let mut tokens = line.split_whitespace();
            let Some(keyword) = tokens.next() else {
                continue;
            };

            match keyword {
                "format" => {
                    format = match tokens.next() {
                        Some("ascii") => Some(Format::Ascii),
                        Some("binary_little_endian") => Some(Format::BinaryLittleEndian),
                        Some("binary_big_endian") => Some(Format::BinaryBigEndian),
                        other => {
                            return Err(MeshError::Header {
                                line: line_no,
                                reason: format!(
                                    "unknown format '{}'",
                                    other.unwrap_or("")
                                ),
                            });
                        }
                    };
                }
                "comment" | "obj_info" => {}
                "element" => {
                    let name = tokens.next().unwrap_or("").to_string();
                    let count = tokens
                        .next()
                        .and_then(|t| t.parse().ok())
                        .ok_or_else(|| MeshError::Header {
                            line: line_no,
                            reason: format!("element '{name}' has no count"),
                        })?;
                    elements.push(ElementDecl {
                        name,
                        count,
                        properties: Vec::new(),
                    });
                }
                "property" => {
                    let element = elements.last_mut().ok_or_else(|| MeshError::Header {
                        line: line_no,
                        reason: "property before any element".to_string(),
                    })?;
                    let first = tokens.next().unwrap_or("");
                    let kind = if first == "list" {
                        let count_ty = tokens.next().and_then(ScalarType::from_token);
                        let item_ty = tokens.next().and_then(ScalarType::from_token);
                        match (count_ty, item_ty) {
                            (Some(count), Some(item)) => PropertyKind::List { count, item },
                            _ => {
                                return Err(MeshError::Header {
                                    line: line_no,
                                    reason: "malformed list property".to_string(),
                                });
                            }
                        }
                    } else {
                        let ty = ScalarType::from_token(first).ok_or_else(|| {
                            MeshError::Header {
                                line: line_no,
                                reason: format!("unknown property type '{first}'"),
                            }
                        })?;
                        PropertyKind::Scalar(ty)
                    };
                    let name =
                        tokens.next().ok_or_else(|| MeshError::Header {
                            line: line_no,
                            reason: "property has no name".to_string(),
                        })?;
                    element.properties.push(Property {
                        name: name.to_string(),
                        kind,
                    });
                }
                "end_header" => break,
                other => {
                    return Err(MeshError::Header {
                        line: line_no,
                        reason: format!("unknown keyword '{other}'"),
                    });
                }
            }
        }

        let format = format.ok_or(MeshError::Header {
            line: line_no,
            reason: "no format declaration".to_string(),
        })?;
        Ok(Header { format, elements })
    }
}
