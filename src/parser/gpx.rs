//! GPX route parser.
//!
//! Every `<trkpt>` becomes one location sample, in document order. Apple
//! Health route files add `<extensions>` with speed, course and accuracy;
//! those are picked up when present.

use super::xml::{child_element, child_text, invalid_value, missing_field, parse_document, required_attr};
use super::FormatParser;
use crate::record::types::{in_range, LATITUDE_RANGE, LONGITUDE_RANGE};
use crate::record::{LocationSample, Record};
use crate::utils::error::ParseError;
use crate::utils::time::parse_rfc3339;
use log::{debug, warn};
use roxmltree::Node;
use std::path::Path;
use std::sync::Arc;

const GPX_ROOT: &str = "gpx";

/// Parser for GPX track files
#[derive(Debug, Clone, Copy, Default)]
pub struct GpxParser;

impl FormatParser for GpxParser {
    fn parse(&self, origin: &Path, content: &str) -> Result<Vec<Record>, ParseError> {
        debug!("Parsing GPX file: {}", origin.display());

        let doc = parse_document(origin, content, GPX_ROOT)?;
        let source: Arc<Path> = Arc::from(origin);

        let mut records = Vec::new();
        for point in doc
            .root_element()
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "trkpt")
        {
            let sample = parse_track_point(origin, point, &source)?;
            records.push(sample.into());
        }

        if records.is_empty() {
            warn!("{}: no track points found", origin.display());
        }
        debug!("Parsed {} track points", records.len());

        Ok(records)
    }
}

fn parse_track_point(
    origin: &Path,
    point: Node<'_, '_>,
    source: &Arc<Path>,
) -> Result<LocationSample, ParseError> {
    let latitude = coordinate(origin, point, "lat", LATITUDE_RANGE)?;
    let longitude = coordinate(origin, point, "lon", LONGITUDE_RANGE)?;

    let time = child_text(point, "time").ok_or_else(|| missing_field(origin, point, "time"))?;
    let timestamp =
        parse_rfc3339(time).map_err(|e| invalid_value(origin, point, "time", time, e))?;

    let mut sample = LocationSample::new(timestamp, latitude, longitude, Arc::clone(source));

    // Elevation is a coordinate too: absent is fine, garbage is not
    if let Some(ele) = child_text(point, "ele") {
        let elevation = ele
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid_value(origin, point, "ele", ele, "not a finite number"))?;
        sample.elevation = Some(elevation);
    }

    if let Some(extensions) = child_element(point, "extensions") {
        sample.speed = extension_value(origin, extensions, "speed");
        sample.course = extension_value(origin, extensions, "course");
        sample.horizontal_accuracy = extension_value(origin, extensions, "hAcc");
        sample.vertical_accuracy = extension_value(origin, extensions, "vAcc");
    }

    Ok(sample)
}

/// Parse a `lat`/`lon` attribute and check its range
fn coordinate(
    origin: &Path,
    point: Node<'_, '_>,
    name: &str,
    range: (f64, f64),
) -> Result<f64, ParseError> {
    let raw = required_attr(origin, point, name)?;
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|e| invalid_value(origin, point, name, raw, e))?;

    if !in_range(value, range) {
        return Err(invalid_value(
            origin,
            point,
            name,
            raw,
            format!("outside [{}, {}]", range.0, range.1),
        ));
    }

    Ok(value)
}

/// Optional numeric extension; unparseable values are dropped, never zeroed
fn extension_value(origin: &Path, extensions: Node<'_, '_>, name: &str) -> Option<f64> {
    let raw = child_text(extensions, name)?;
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            warn!(
                "{}: ignoring unparseable <{}> value '{}'",
                super::xml::node_location(origin, extensions),
                name,
                raw
            );
            None
        }
    }
}
