/// Streaming tag cursor with follow-path resolution across files and archives
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use log::debug;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use zip::ZipArchive;

use crate::error::{Error, Result};

/// Read an attribute value off a start tag, unescaped
pub fn attr(start: &BytesStart, name: &str) -> Result<Option<String>> {
    match start.try_get_attribute(name)? {
        Some(a) => Ok(Some(a.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// A streaming tag cursor bound to the file it reads from.
///
/// Portions of a project document are stripped out into sibling files or
/// archive entries and referenced through `path` attributes. Each cursor
/// remembers its own source path so relative references resolve against the
/// right directory; following a reference yields a new owned cursor, and
/// dropping it closes the underlying stream. There is no explicit file
/// stack to unwind on error paths.
pub struct TagReader {
    reader: Reader<Box<dyn BufRead + Send>>,
    source: PathBuf,
    buf: Vec<u8>,
}

impl TagReader {
    /// Open a cursor for a project file, dispatching on its extension.
    ///
    /// Archive extensions are opened as zip containers and the fixed
    /// `doc.xml` entry is streamed; plain extensions are streamed directly.
    /// Anything else is a resolution failure.
    pub fn open(path: &Path) -> Result<TagReader> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        if constants::ARCHIVE_EXTENSIONS.contains(&ext.as_str()) {
            let file = File::open(path)
                .map_err(|e| Error::resolution(path, e.to_string()))?;
            let mut archive = ZipArchive::new(BufReader::new(file))
                .map_err(|e| Error::resolution(path, e.to_string()))?;
            let mut entry = archive
                .by_name(constants::DOC_ENTRY_NAME)
                .map_err(|e| {
                    Error::resolution(
                        path,
                        format!("no {} entry: {e}", constants::DOC_ENTRY_NAME),
                    )
                })?;
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            Ok(TagReader::from_stream(
                Box::new(Cursor::new(data)),
                path.to_path_buf(),
            ))
        } else if constants::PLAIN_EXTENSIONS.contains(&ext.as_str()) {
            let file = File::open(path)
                .map_err(|e| Error::resolution(path, e.to_string()))?;
            Ok(TagReader::from_stream(
                Box::new(BufReader::new(file)),
                path.to_path_buf(),
            ))
        } else {
            Err(Error::resolution(
                path,
                format!("unsupported project file extension '{ext}'"),
            ))
        }
    }

    fn from_stream(stream: Box<dyn BufRead + Send>, source: PathBuf) -> TagReader {
        let mut reader = Reader::from_reader(stream);
        reader.config_mut().trim_text(true);
        TagReader {
            reader,
            source,
            buf: Vec::new(),
        }
    }

    /// Path of the file this cursor streams from
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Advance to the next event
    pub fn next(&mut self) -> Result<Event<'static>> {
        self.buf.clear();
        let event = self.reader.read_event_into(&mut self.buf)?;
        Ok(event.into_owned())
    }

    /// Consume everything up to and including the matching end tag
    pub fn skip_subtree(&mut self, name: &[u8]) -> Result<()> {
        let mut skip_buf = Vec::new();
        self.reader.read_to_end_into(QName(name), &mut skip_buf)?;
        Ok(())
    }

    /// Collect the text content of the current element, consuming through
    /// its end tag
    pub fn read_element_text(&mut self, name: &[u8]) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.next()? {
                Event::Text(t) => text.push_str(&t.unescape()?),
                Event::End(e) if e.local_name().as_ref() == name => return Ok(text),
                Event::Eof => {
                    return Err(Error::UnexpectedEof(
                        String::from_utf8_lossy(name).into_owned(),
                    ));
                }
                _ => {}
            }
        }
    }

    /// Follow a `path` attribute on the given start tag, if present.
    ///
    /// The `{projectname}` token is substituted with this cursor's file
    /// stem and the remainder resolved relative to its directory. Returns a
    /// cursor over the referenced file, or `None` when there is nothing to
    /// follow. Callers consume the referenced subtree from the new cursor
    /// and then drop it, resuming on `self`.
    pub fn resolve_path_attr(&self, start: &BytesStart) -> Result<Option<TagReader>> {
        let Some(rel) = attr(start, "path")? else {
            return Ok(None);
        };
        if rel.is_empty() {
            return Ok(None);
        }

        let rel = if rel.contains(constants::PROJECT_NAME_TOKEN) {
            let stem = self
                .source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            rel.replace(constants::PROJECT_NAME_TOKEN, &stem)
        } else {
            rel
        };

        let parent = self.source.parent().unwrap_or_else(|| Path::new("."));
        let target = parent.join(&rel);
        debug!("following '{}' from {}", rel, self.source.display());
        let target = target
            .canonicalize()
            .map_err(|e| Error::resolution(&target, e.to_string()))?;
        Ok(Some(TagReader::open(&target)?))
    }
}

impl std::fmt::Debug for TagReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagReader")
            .field("source", &self.source)
            .finish()
    }
}
