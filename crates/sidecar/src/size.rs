//! Raster dimensions from PDS4 label documents.
//!
//! Raw strips carry no header, so width and height come from the
//! `Axis_Array` entries of the product label:
//!
//! ```xml
//! <Axis_Array>
//!   <axis_name>Sample</axis_name>
//!   <elements>12000</elements>
//! </Axis_Array>
//! ```
//!
//! `Sample` is the width and `Line` the height.

use std::path::Path;

use patch_common::{CaptureKind, RasterSize};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use tracing::{debug, warn};

use crate::error::{Result, SidecarError};
use crate::manifest::CaptureManifest;

/// Namespace of the PDS4 common dictionary.
pub const PDS4_NAMESPACE: &str = "http://pds.nasa.gov/pds4/pds/v1";

/// Child element of `Axis_Array` currently being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisField {
    Name,
    Elements,
}

#[derive(Debug, Default)]
struct AxisArray {
    name: String,
    elements: String,
}

fn is_pds(ns: &ResolveResult<'_>) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == PDS4_NAMESPACE.as_bytes())
}

fn xml_error(path: &Path, e: impl std::fmt::Display) -> SidecarError {
    SidecarError::Xml {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Parse one label document and return its raster size.
///
/// Only elements bound to [`PDS4_NAMESPACE`] are considered. Fails when the
/// document is malformed or either axis is missing.
pub fn parse_size_descriptor(path: &Path) -> Result<RasterSize> {
    let mut reader = NsReader::from_file(path).map_err(|e| xml_error(path, e))?;
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut current: Option<AxisArray> = None;
    let mut field: Option<AxisField> = None;
    let mut width: Option<String> = None;
    let mut height: Option<String> = None;

    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((ns, Event::Start(e))) if is_pds(&ns) => match e.local_name().as_ref() {
                b"Axis_Array" => current = Some(AxisArray::default()),
                b"axis_name" if current.is_some() => field = Some(AxisField::Name),
                b"elements" if current.is_some() => field = Some(AxisField::Elements),
                _ => {}
            },
            Ok((_, Event::Text(t))) => {
                if let (Some(axis), Some(f)) = (current.as_mut(), field) {
                    let text = t.unescape().map_err(|e| xml_error(path, e))?;
                    match f {
                        AxisField::Name => axis.name.push_str(&text),
                        AxisField::Elements => axis.elements.push_str(&text),
                    }
                }
            }
            Ok((ns, Event::End(e))) if is_pds(&ns) => match e.local_name().as_ref() {
                b"Axis_Array" => {
                    if let Some(axis) = current.take() {
                        match axis.name.trim().to_lowercase().as_str() {
                            "sample" => width = Some(axis.elements),
                            "line" => height = Some(axis.elements),
                            _ => {}
                        }
                    }
                }
                b"axis_name" | b"elements" => field = None,
                _ => {}
            },
            Ok((_, Event::Eof)) => break,
            Err(e) => {
                return Err(xml_error(
                    path,
                    format!("at position {}: {}", reader.buffer_position(), e),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    let width = width.ok_or_else(|| SidecarError::MissingAxis {
        path: path.to_path_buf(),
        axis: "sample",
    })?;
    let height = height.ok_or_else(|| SidecarError::MissingAxis {
        path: path.to_path_buf(),
        axis: "line",
    })?;

    Ok(RasterSize::new(
        parse_axis_length(path, &width)?,
        parse_axis_length(path, &height)?,
    ))
}

fn parse_axis_length(path: &Path, value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(SidecarError::InvalidAxis {
            path: path.to_path_buf(),
            value: value.to_string(),
        }),
    }
}

/// Resolve a capture's raster size from its label documents.
///
/// Documents are tried in manifest order; the first that yields both axes
/// wins. Returns `None` when no document resolves, which callers treat as
/// "cannot decode" for headerless sources.
pub fn resolve_size(manifest: &CaptureManifest) -> Option<RasterSize> {
    for path in &manifest.size_descriptors {
        match parse_size_descriptor(path) {
            Ok(size) => {
                debug!(capture = %manifest.name, %size, path = %path.display(), "Resolved raster size");
                return Some(size);
            }
            Err(e) => {
                warn!(capture = %manifest.name, error = %e, "Unusable size descriptor");
            }
        }
    }

    if manifest.kind == CaptureKind::RawStrip {
        warn!(capture = %manifest.name, "No size descriptor resolved");
    }
    None
}
