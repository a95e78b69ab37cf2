/// Document model builder: walks the resolved tag stream into the entity graph
use std::path::Path;

use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};

use crate::dispatch::{ArrayItem, read_element_array};
use crate::error::{Error, Result};
use crate::model::{Camera, Chunk, Image, ModelRef, ProjectDocument, Sensor};
use crate::props;
use crate::source::{TagReader, attr};

/// Structural mode of the builder. Camera tags are overloaded: at chunk
/// level they define calibration-bound cameras, inside a frame they are
/// posed image associations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseContext {
    ChunkLevel,
    FrameLevel,
}

impl ProjectDocument {
    /// Resolve and parse a project file into the full entity graph.
    ///
    /// Chunks that fail to parse are logged and dropped; their siblings are
    /// unaffected. Stream corruption in the primary file aborts the whole
    /// document.
    pub fn open(path: &Path) -> Result<ProjectDocument> {
        let mut reader = TagReader::open(path)?;
        let mut doc = ProjectDocument::new(path.to_path_buf());

        loop {
            match reader.next()? {
                Event::Start(e) | Event::Empty(e)
                    if e.local_name().as_ref() == b"document" =>
                {
                    if let Some(version) = attr(&e, "version")? {
                        doc.version = version;
                    }
                    // The primary file may be a stub pointing at the real
                    // document; keep reading from the referenced file
                    if let Some(nested) = reader.resolve_path_attr(&e)? {
                        reader = nested;
                    }
                }
                Event::Start(e) if e.local_name().as_ref() == b"chunks" => {
                    let chunks = &mut doc.chunks;
                    read_element_array(&mut reader, "chunks", "chunk", |reader, item| {
                        if let ArrayItem::Element { start, is_empty } = item {
                            match parse_chunk(reader, start, is_empty) {
                                Ok(chunk) => chunks.push(chunk),
                                Err(e @ Error::Syntax(_)) => return Err(e),
                                Err(e) => {
                                    return Err(Error::decode("chunk", e.to_string()));
                                }
                            }
                        }
                        Ok(())
                    })?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        for chunk in &mut doc.chunks {
            chunk.refresh_status();
        }
        Ok(doc)
    }
}

/// Parse one chunk element, following its path reference if present.
/// Attributes on the outer tag are merged with those on the inner chunk tag
/// of a referenced file, inner values winning.
fn parse_chunk(reader: &mut TagReader, start: &BytesStart, is_empty: bool) -> Result<Chunk> {
    let mut chunk = Chunk::default();
    apply_chunk_attrs(&mut chunk, start)?;

    if let Some(mut nested) = reader.resolve_path_attr(start)? {
        parse_chunk_body(&mut nested, &mut chunk)?;
        if !is_empty {
            reader.skip_subtree(b"chunk")?;
        }
    } else if !is_empty {
        parse_chunk_body(reader, &mut chunk)?;
    }

    Ok(chunk)
}

fn apply_chunk_attrs(chunk: &mut Chunk, start: &BytesStart) -> Result<()> {
    if let Some(id) = attr(start, "id")? {
        chunk.id = id.parse().unwrap_or(0);
    }
    if let Some(label) = attr(start, "label")? {
        chunk.label = label;
    }
    if let Some(enabled) = attr(start, "enabled")? {
        chunk.enabled = enabled == "true" || enabled == "1";
    }
    Ok(())
}

fn parse_chunk_body(reader: &mut TagReader, chunk: &mut Chunk) -> Result<()> {
    loop {
        match reader.next()? {
            Event::Start(e) => match e.local_name().as_ref() {
                // Wrapper tag of a referenced file
                b"document" => {}
                // Inner chunk tag of a referenced file
                b"chunk" => apply_chunk_attrs(chunk, &e)?,
                b"sensors" => {
                    read_element_array(reader, "sensors", "sensor", |reader, item| {
                        match item {
                            ArrayItem::Element { start, is_empty } => {
                                match parse_sensor(reader, start, is_empty) {
                                    Ok(sensor) => chunk.add_sensor(sensor),
                                    Err(e @ Error::Syntax(_)) => return Err(e),
                                    Err(e) => {
                                        return Err(Error::decode("sensor", e.to_string()));
                                    }
                                }
                            }
                            ArrayItem::Property { name, value } => {
                                props::apply(chunk, &name, &value);
                            }
                        }
                        Ok(())
                    })?;
                }
                b"cameras" => {
                    read_camera_array(reader, chunk, ParseContext::ChunkLevel)?;
                }
                b"frames" => {
                    read_element_array(reader, "frames", "frame", |reader, item| {
                        match item {
                            ArrayItem::Element { start, is_empty } => {
                                match parse_frame(reader, start, is_empty, chunk) {
                                    Ok(()) => {}
                                    Err(e @ Error::Syntax(_)) => return Err(e),
                                    Err(e) => {
                                        return Err(Error::decode("frame", e.to_string()));
                                    }
                                }
                            }
                            ArrayItem::Property { name, value } => {
                                props::apply(chunk, &name, &value);
                            }
                        }
                        Ok(())
                    })?;
                }
                // Markers and scalebars are counted, never materialized
                b"markers" => {
                    read_element_array(reader, "markers", "marker", |reader, item| {
                        if let ArrayItem::Element { is_empty, .. } = item {
                            chunk.marker_count += 1;
                            if !is_empty {
                                reader.skip_subtree(b"marker")?;
                            }
                        }
                        Ok(())
                    })?;
                }
                b"scalebars" => {
                    read_element_array(reader, "scalebars", "scalebar", |reader, item| {
                        if let ArrayItem::Element { is_empty, .. } = item {
                            chunk.scalebar_count += 1;
                            if !is_empty {
                                reader.skip_subtree(b"scalebar")?;
                            }
                        }
                        Ok(())
                    })?;
                }
                b"property" => {
                    apply_property(reader, chunk, &e, false)?;
                }
                // Unknown containers (settings, region, ...) are descended
                // transparently; property tags anywhere below chunk level
                // decode against the chunk
                other => {
                    debug!(
                        "descending into <{}> at chunk level",
                        String::from_utf8_lossy(other)
                    );
                }
            },
            Event::Empty(e) if e.local_name().as_ref() == b"property" => {
                apply_property(reader, chunk, &e, true)?;
            }
            Event::End(e) if e.local_name().as_ref() == b"chunk" => break,
            // Referenced chunk files end without a closing outer tag
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

fn apply_property(
    reader: &mut TagReader,
    chunk: &mut Chunk,
    start: &BytesStart,
    is_empty: bool,
) -> Result<()> {
    let name = attr(start, "name")?.unwrap_or_default();
    let value = attr(start, "value")?.unwrap_or_default();
    props::apply(chunk, &name, &value);
    if !is_empty {
        reader.skip_subtree(b"property")?;
    }
    Ok(())
}

/// Consume a cameras array. At chunk level the elements become `Camera`
/// definitions; inside a frame they become `Image` pose associations.
fn read_camera_array(
    reader: &mut TagReader,
    chunk: &mut Chunk,
    context: ParseContext,
) -> Result<()> {
    read_element_array(reader, "cameras", "camera", |reader, item| {
        match item {
            ArrayItem::Element { start, is_empty } => {
                let parsed = match context {
                    ParseContext::ChunkLevel => parse_camera(reader, start, is_empty)
                        .map(|camera| chunk.add_camera(camera)),
                    ParseContext::FrameLevel => parse_image(reader, start, is_empty)
                        .map(|image| chunk.add_image(image)),
                };
                match parsed {
                    Ok(()) => {}
                    Err(e @ Error::Syntax(_)) => return Err(e),
                    Err(e) => return Err(Error::decode("camera", e.to_string())),
                }
            }
            ArrayItem::Property { name, value } => props::apply(chunk, &name, &value),
        }
        Ok(())
    })
}

fn parse_sensor(reader: &mut TagReader, start: &BytesStart, is_empty: bool) -> Result<Sensor> {
    let id = attr(start, "id")?.and_then(|v| v.parse().ok()).unwrap_or(0);
    let label = attr(start, "label")?.unwrap_or_default();
    let mut sensor = Sensor::new(id, label);
    sensor.sensor_type = attr(start, "type")?.unwrap_or_default();
    if is_empty {
        return Ok(sensor);
    }

    let mut in_calibration = false;
    let mut in_bands = false;
    let mut in_covariance = false;

    loop {
        let event = reader.next()?;
        match &event {
            Event::Start(e) | Event::Empty(e) => {
                let local = e.local_name().as_ref().to_vec();
                let text_element = matches!(&event, Event::Start(_));
                match local.as_slice() {
                    b"bands" => in_bands = true,
                    b"calibration" => in_calibration = true,
                    b"covariance" => in_covariance = true,
                    // Physical sensor resolution, not the calibrated one
                    b"resolution" if !in_calibration => {
                        sensor.width =
                            attr(e, "width")?.and_then(|v| v.parse().ok()).unwrap_or(0);
                        sensor.height =
                            attr(e, "height")?.and_then(|v| v.parse().ok()).unwrap_or(0);
                    }
                    b"property" => {
                        let name = attr(e, "name")?.unwrap_or_default();
                        let value = attr(e, "value")?.unwrap_or_default();
                        match name.as_str() {
                            "fixed" => sensor.fixed = value == "true",
                            "pixel_width" => {
                                sensor.pixel_width = value.parse().unwrap_or(0.0);
                            }
                            "pixel_height" => {
                                sensor.pixel_height = value.parse().unwrap_or(0.0);
                            }
                            "focal_length" => {
                                sensor.focal_length = value.parse().unwrap_or(0.0);
                            }
                            _ => {}
                        }
                    }
                    b"band" if in_bands => {
                        sensor.bands.push(attr(e, "label")?.unwrap_or_default());
                    }
                    b"fx" | b"fy" | b"cx" | b"cy" | b"b1" | b"b2" | b"skew" | b"k1"
                    | b"k2" | b"k3" | b"k4" | b"p1" | b"p2" | b"p3" | b"p4"
                        if text_element =>
                    {
                        let value = reader
                            .read_element_text(&local)?
                            .trim()
                            .parse()
                            .unwrap_or(0.0);
                        match local.as_slice() {
                            b"fx" => sensor.fx = value,
                            b"fy" => sensor.fy = value,
                            b"cx" => sensor.cx = value,
                            b"cy" => sensor.cy = value,
                            b"b1" => sensor.b1 = value,
                            b"b2" => sensor.b2 = value,
                            b"skew" => sensor.skew = value,
                            b"k1" => sensor.k1 = value,
                            b"k2" => sensor.k2 = value,
                            b"k3" => sensor.k3 = value,
                            b"k4" => sensor.k4 = value,
                            b"p1" => sensor.p1 = value,
                            b"p2" => sensor.p2 = value,
                            b"p3" => sensor.p3 = value,
                            b"p4" => sensor.p4 = value,
                            _ => unreachable!(),
                        }
                    }
                    b"params" if in_covariance && text_element => {
                        sensor.covariance_params =
                            reader.read_element_text(b"params")?.trim().to_string();
                    }
                    b"coeffs" if in_covariance && text_element => {
                        sensor.covariance_coeffs = reader
                            .read_element_text(b"coeffs")?
                            .split_whitespace()
                            .map(|t| t.parse().unwrap_or(0.0))
                            .collect();
                    }
                    _ => {}
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"calibration" => in_calibration = false,
                b"bands" => in_bands = false,
                b"covariance" => in_covariance = false,
                b"sensor" => return Ok(sensor),
                _ => {}
            },
            Event::Eof => return Err(Error::UnexpectedEof("sensor".to_string())),
            _ => {}
        }
    }
}

fn parse_camera(reader: &mut TagReader, start: &BytesStart, is_empty: bool) -> Result<Camera> {
    let id = attr(start, "id")?.and_then(|v| v.parse().ok()).unwrap_or(0);
    let mut camera = Camera::new(id);
    camera.label = attr(start, "label")?.unwrap_or_default();
    camera.enabled = matches!(attr(start, "enabled")?.as_deref(), Some("true") | Some("1"));
    camera.sensor_id = attr(start, "sensor_id")?
        .and_then(|v| v.parse().ok())
        .unwrap_or(-1);
    if is_empty {
        return Ok(camera);
    }

    loop {
        match reader.next()? {
            Event::Start(e) if e.local_name().as_ref() == b"transform" => {
                camera.transform = Some(
                    reader
                        .read_element_text(b"transform")?
                        .split_whitespace()
                        .map(|t| t.parse().unwrap_or(0.0))
                        .collect(),
                );
            }
            Event::End(e) if e.local_name().as_ref() == b"camera" => return Ok(camera),
            Event::Eof => return Err(Error::UnexpectedEof("camera".to_string())),
            _ => {}
        }
    }
}

/// Frame-context camera tag: a posed image association.
/// Some older formats omit the camera ID entirely.
fn parse_image(reader: &mut TagReader, start: &BytesStart, is_empty: bool) -> Result<Image> {
    let camera_id = attr(start, "camera_id")?
        .and_then(|v| v.parse().ok())
        .unwrap_or(-1);
    let mut image = Image::new(camera_id);
    if is_empty {
        return Ok(image);
    }

    loop {
        match reader.next()? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"photo" => {
                    if let Some(path) = attr(&e, "path")? {
                        image.file_path = path;
                    }
                }
                b"property" => {
                    let name = attr(&e, "name")?.unwrap_or_default();
                    let value = attr(&e, "value")?.unwrap_or_default();
                    image.properties.insert(name, value);
                }
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"camera" => return Ok(image),
            Event::Eof => return Err(Error::UnexpectedEof("camera".to_string())),
            _ => {}
        }
    }
}

/// Parse one frame element, following its path reference if present
fn parse_frame(
    reader: &mut TagReader,
    start: &BytesStart,
    is_empty: bool,
    chunk: &mut Chunk,
) -> Result<()> {
    match reader.resolve_path_attr(start) {
        Ok(Some(mut nested)) => {
            parse_frame_body(&mut nested, chunk)?;
            if !is_empty {
                reader.skip_subtree(b"frame")?;
            }
        }
        Ok(None) => {
            if !is_empty {
                parse_frame_body(reader, chunk)?;
            }
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

/// Scan a frame subtree. Container tags (depth_maps, point_cloud,
/// dense_cloud, thumbnails) are descended transparently: their property
/// tags decode against the owning chunk and each depth_map bumps the
/// depth-image count.
fn parse_frame_body(reader: &mut TagReader, chunk: &mut Chunk) -> Result<()> {
    loop {
        match reader.next()? {
            Event::Start(e) => match e.local_name().as_ref() {
                // Wrapper and inner tags of a referenced file
                b"document" | b"frame" => {}
                b"cameras" => {
                    read_camera_array(reader, chunk, ParseContext::FrameLevel)?;
                }
                b"depth_maps" | b"thumbnails" | b"point_cloud" | b"dense_cloud" => {}
                b"depth_map" => {
                    chunk.add_depth_image();
                    reader.skip_subtree(b"depth_map")?;
                }
                // Markers inside a frame are ignored entirely
                b"markers" => reader.skip_subtree(b"markers")?,
                b"model" => parse_model_element(reader, &e, false, chunk)?,
                b"property" => apply_property(reader, chunk, &e, false)?,
                other => {
                    debug!(
                        "descending into <{}> inside frame",
                        String::from_utf8_lossy(other)
                    );
                }
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"depth_map" => chunk.add_depth_image(),
                b"model" => parse_model_element(reader, &e, true, chunk)?,
                b"property" => apply_property(reader, chunk, &e, true)?,
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"frame" => break,
            // Referenced frame files end without a closing outer tag
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

/// Resolve and parse a model tag into the chunk's `ModelRef`.
/// A resolution failure loses the model but not the frame.
fn parse_model_element(
    reader: &mut TagReader,
    start: &BytesStart,
    is_empty: bool,
    chunk: &mut Chunk,
) -> Result<()> {
    match reader.resolve_path_attr(start) {
        Ok(Some(mut nested)) => {
            let source = nested.source().to_path_buf();
            let model = parse_model(&mut nested, chunk, &source)?;
            chunk.model = Some(model);
            if !is_empty {
                reader.skip_subtree(b"model")?;
            }
        }
        Ok(None) => {
            if !is_empty {
                let source = reader.source().to_path_buf();
                let model = parse_model(reader, chunk, &source)?;
                chunk.model = Some(model);
            }
        }
        Err(e) => {
            warn!("cannot resolve model reference: {e}");
            if !is_empty {
                reader.skip_subtree(b"model")?;
            }
        }
    }
    Ok(())
}

fn parse_model(reader: &mut TagReader, chunk: &mut Chunk, source: &Path) -> Result<ModelRef> {
    let mut model = ModelRef::new(source);

    loop {
        let event = reader.next()?;
        match &event {
            Event::Start(e) | Event::Empty(e) => {
                let local = e.local_name().as_ref().to_vec();
                let text_element = matches!(&event, Event::Start(_));
                match local.as_slice() {
                    // Inner model tag of a referenced file
                    b"model" => {}
                    b"mesh" => {
                        if let Some(path) = attr(e, "path")? {
                            model.mesh_path = path;
                        }
                    }
                    b"hasVertexColors" if text_element => {
                        model.has_vertex_colors =
                            reader.read_element_text(&local)?.trim() == "true";
                    }
                    b"hasUV" if text_element => {
                        model.has_uv = reader.read_element_text(&local)?.trim() == "true";
                    }
                    b"faceCount" if text_element => {
                        model.face_count = reader
                            .read_element_text(&local)?
                            .trim()
                            .parse()
                            .unwrap_or(0);
                    }
                    b"vertexCount" if text_element => {
                        model.vertex_count = reader
                            .read_element_text(&local)?
                            .trim()
                            .parse()
                            .unwrap_or(0);
                    }
                    b"texture" => {
                        if let Some(path) = attr(e, "path")? {
                            // Single-texture models often omit the ID
                            let id = attr(e, "id")?
                                .and_then(|v| v.parse().ok())
                                .unwrap_or(0);
                            model.add_texture(id, path);
                        }
                    }
                    b"property" => {
                        let name = attr(e, "name")?.unwrap_or_default();
                        let value = attr(e, "value")?.unwrap_or_default();
                        // Older formats only expose the face count this way
                        if name.contains("face_count") && model.face_count <= 0 {
                            model.face_count = value.parse().unwrap_or(0);
                        }
                        props::apply(chunk, &name, &value);
                    }
                    _ => {}
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"model" => return Ok(model),
            // Referenced model files end without a closing outer tag
            Event::Eof => return Ok(model),
            _ => {}
        }
    }
}
