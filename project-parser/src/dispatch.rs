/// Generic consumer for the repeated-child "array" tags of the project schema
use log::warn;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::source::{TagReader, attr};

/// One item surfaced while scanning an array subtree
pub enum ArrayItem<'a> {
    /// A start tag matching the expected element name. The handler consumes
    /// through the element's end tag; self-closing elements set `is_empty`
    /// and have no subtree.
    Element {
        start: &'a BytesStart<'static>,
        is_empty: bool,
    },
    /// An inline property tag (depth-map arrays carry these)
    Property { name: String, value: String },
}

/// Consume an array of repeated child elements.
///
/// The cursor must be positioned just inside the opening array tag.
/// Scanning stops at the end tag matching `array_name`.
///
/// A single malformed element (`Error::Decode` from the handler) is logged,
/// skipped to its end tag, and scanning continues with the next sibling.
/// Any other start tag has no meaning here; it is logged and its whole
/// subtree skipped so the cursor can never desynchronize.
pub fn read_element_array<F>(
    reader: &mut TagReader,
    array_name: &str,
    element_name: &str,
    mut handler: F,
) -> Result<()>
where
    F: FnMut(&mut TagReader, ArrayItem) -> Result<()>,
{
    loop {
        match reader.next()? {
            Event::Start(e) if e.local_name().as_ref() == element_name.as_bytes() => {
                let name = e.name().as_ref().to_vec();
                let item = ArrayItem::Element {
                    start: &e,
                    is_empty: false,
                };
                match handler(reader, item) {
                    Ok(()) => {}
                    Err(Error::Decode { element, reason }) => {
                        warn!("skipping malformed <{element}> element: {reason}");
                        reader.skip_subtree(&name)?;
                    }
                    Err(other) => return Err(other),
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == element_name.as_bytes() => {
                let item = ArrayItem::Element {
                    start: &e,
                    is_empty: true,
                };
                if let Err(Error::Decode { element, reason }) = handler(reader, item) {
                    warn!("skipping malformed <{element}> element: {reason}");
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"property" => {
                handler(reader, property_item(&e)?)?;
                // Properties carry no meaningful children
                let name = e.name().as_ref().to_vec();
                reader.skip_subtree(&name)?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"property" => {
                handler(reader, property_item(&e)?)?;
            }
            Event::Start(e) => {
                warn!(
                    "no handler for <{}> inside <{array_name}>, skipping",
                    String::from_utf8_lossy(e.local_name().as_ref())
                );
                let name = e.name().as_ref().to_vec();
                reader.skip_subtree(&name)?;
            }
            Event::Empty(e) => {
                warn!(
                    "no handler for <{}/> inside <{array_name}>",
                    String::from_utf8_lossy(e.local_name().as_ref())
                );
            }
            Event::End(e) if e.local_name().as_ref() == array_name.as_bytes() => {
                return Ok(());
            }
            Event::Eof => return Err(Error::UnexpectedEof(array_name.to_string())),
            _ => {}
        }
    }
}

fn property_item(e: &BytesStart) -> Result<ArrayItem<'static>> {
    Ok(ArrayItem::Property {
        name: attr(e, "name")?.unwrap_or_default(),
        value: attr(e, "value")?.unwrap_or_default(),
    })
}
