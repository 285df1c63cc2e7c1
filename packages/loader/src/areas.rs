//! Conservation-area polygon loading.
//!
//! Accepts a GeoJSON `FeatureCollection` (or a single `Feature`) whose
//! features carry `Polygon` or `MultiPolygon` geometries. The legacy
//! `crs` member from GeoJSON 2008 is honored so that Web Mercator exports
//! are inverse-projected to WGS84.

use std::io::Read;

use geo::{Coord, CoordsIter as _, MapCoords as _, MultiPolygon};
use geojson::{Feature, GeoJson, JsonObject};
use richness_map_models::{AreaSource, ConservationArea, Crs};

use crate::{
    CoordinateSystemError, DatasetError, LoadError, SchemaError, in_bounds, open, resolve_crs,
};

/// Loads conservation areas from the file named by `source`.
///
/// # Errors
///
/// Returns [`DatasetError`] if the file cannot be read, is not a GeoJSON
/// feature collection, lacks the name property, or declares an unsupported
/// coordinate reference system.
pub fn load_areas(source: &AreaSource) -> Result<Vec<ConservationArea>, DatasetError> {
    let reader = open(&source.path)?;
    read_areas(reader, &source.path.display().to_string(), source)
}

/// Loads conservation areas from any reader. `label` names the dataset in
/// errors and log lines.
///
/// Features with null or non-polygonal geometry are skipped with a warning.
/// Each retained area's `index` is its position in the returned list.
///
/// # Errors
///
/// See [`load_areas`].
pub fn read_areas<R: Read>(
    reader: R,
    label: &str,
    source: &AreaSource,
) -> Result<Vec<ConservationArea>, DatasetError> {
    let geojson = GeoJson::from_reader(reader).map_err(|e| LoadError::GeoJson {
        path: label.to_string(),
        source: e,
    })?;

    let (features, foreign_members) = match geojson {
        GeoJson::FeatureCollection(fc) => (fc.features, fc.foreign_members),
        GeoJson::Feature(feature) => {
            let foreign = feature.foreign_members.clone();
            (vec![feature], foreign)
        }
        GeoJson::Geometry(_) => {
            return Err(LoadError::Malformed {
                path: label.to_string(),
                message: "expected a FeatureCollection, found a bare geometry".to_string(),
            }
            .into());
        }
    };

    let crs = match source
        .crs
        .clone()
        .or_else(|| declared_crs(foreign_members.as_ref()))
    {
        Some(name) => resolve_crs(&name, label)?,
        None => Crs::Wgs84,
    };
    log::debug!("Reading {} area features from {label} as {crs}", features.len());

    let mut areas = Vec::with_capacity(features.len());
    let mut skipped = 0usize;

    for (position, feature) in features.into_iter().enumerate() {
        let name = feature_name(&feature, &source.name_field);

        let Some(geometry) = to_multipolygon(feature, label, position)? else {
            match &name {
                Some(name) => {
                    log::warn!("Skipping area '{name}' (feature {position}): no polygon geometry");
                }
                None => log::warn!("Skipping feature {position}: no polygon geometry"),
            }
            skipped += 1;
            continue;
        };

        let name = name.ok_or_else(|| SchemaError::MissingProperty {
            path: label.to_string(),
            property: source.name_field.clone(),
            feature: position,
        })?;

        let geometry = normalize(geometry, crs, label)?;

        areas.push(ConservationArea {
            index: areas.len(),
            name,
            geometry,
        });
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} features without polygon geometry in {label}");
    }
    log::info!("Loaded {} conservation areas from {label}", areas.len());

    Ok(areas)
}

/// Extracts the CRS name from a legacy `"crs": {"type": "name", ...}`
/// member. A `crs` member of any other shape is returned verbatim so that
/// it fails resolution instead of being silently ignored.
fn declared_crs(foreign_members: Option<&JsonObject>) -> Option<String> {
    let crs = foreign_members?.get("crs")?;
    if crs.is_null() {
        return None;
    }
    Some(
        crs.get("properties")
            .and_then(|p| p.get("name"))
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| crs.to_string(), ToString::to_string),
    )
}

/// Reads the name property, accepting strings and numbers.
fn feature_name(feature: &Feature, field: &str) -> Option<String> {
    match feature.properties.as_ref()?.get(field)? {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Converts a feature's geometry into a [`MultiPolygon`], promoting plain
/// polygons. Returns `Ok(None)` for null or non-polygonal geometry.
fn to_multipolygon(
    feature: Feature,
    label: &str,
    position: usize,
) -> Result<Option<MultiPolygon<f64>>, LoadError> {
    let Some(geometry) = feature.geometry else {
        return Ok(None);
    };

    let geometry: geo::Geometry<f64> =
        geometry.try_into().map_err(|e| LoadError::Malformed {
            path: label.to_string(),
            message: format!("feature {position} has invalid geometry: {e}"),
        })?;

    Ok(match geometry {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    })
}

/// Converts a polygon layer to WGS84 and checks every vertex is in range.
fn normalize(
    geometry: MultiPolygon<f64>,
    crs: Crs,
    label: &str,
) -> Result<MultiPolygon<f64>, CoordinateSystemError> {
    let geometry = if crs == Crs::Wgs84 {
        geometry
    } else {
        geometry.map_coords(|c| {
            let (x, y) = crs.to_wgs84(c.x, c.y);
            Coord { x, y }
        })
    };

    if let Some(c) = geometry.coords_iter().find(|c| !in_bounds(c.x, c.y)) {
        return Err(CoordinateSystemError::OutOfRange {
            path: label.to_string(),
            lng: c.x,
            lat: c.y,
        });
    }

    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> AreaSource {
        AreaSource {
            name_field: "nombre".to_string(),
            ..AreaSource::default()
        }
    }

    fn read(json: &str) -> Result<Vec<ConservationArea>, DatasetError> {
        read_areas(json.as_bytes(), "areas.geojson", &source())
    }

    const TWO_AREAS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "nombre": "Area1" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-85, 9], [-84, 9], [-84, 10], [-85, 10], [-85, 9]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "nombre": "Marker" },
                "geometry": { "type": "Point", "coordinates": [-84.5, 9.5] }
            },
            {
                "type": "Feature",
                "properties": { "nombre": "Area2" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[-83, 9], [-82, 9], [-82, 10], [-83, 10], [-83, 9]]],
                        [[[-81, 9], [-80, 9], [-80, 10], [-81, 10], [-81, 9]]]
                    ]
                }
            }
        ]
    }"#;

    #[test]
    fn reads_polygons_and_multipolygons() {
        let areas = read(TWO_AREAS).unwrap();
        assert_eq!(areas.len(), 2);
        assert_eq!(areas[0].name, "Area1");
        assert_eq!(areas[0].index, 0);
        assert_eq!(areas[0].geometry.0.len(), 1);
        assert_eq!(areas[1].name, "Area2");
        assert_eq!(areas[1].index, 1);
        assert_eq!(areas[1].geometry.0.len(), 2);
    }

    #[test]
    fn numeric_names_are_stringified() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "nombre": 42 },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]
                }
            }]
        }"#;
        let areas = read(json).unwrap();
        assert_eq!(areas[0].name, "42");
    }

    #[test]
    fn missing_name_is_schema_error() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "other": "x" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]
                }
            }]
        }"#;
        let err = read(json).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::Schema(SchemaError::MissingProperty { feature: 0, .. })
        ));
    }

    #[test]
    fn unnamed_features_without_polygons_are_skipped() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "nombre": "Area1" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[-85, 9], [-84, 9], [-84, 10], [-85, 10], [-85, 9]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": { "type": "Point", "coordinates": [-84.5, 9.5] }
                },
                {
                    "type": "Feature",
                    "properties": null,
                    "geometry": null
                }
            ]
        }"#;
        let areas = read(json).unwrap();
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].name, "Area1");
        assert_eq!(areas[0].index, 0);
    }

    #[test]
    fn bare_geometry_is_malformed() {
        let json = r#"{ "type": "Point", "coordinates": [0, 0] }"#;
        let err = read(json).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::Load(LoadError::Malformed { .. })
        ));
    }

    #[test]
    fn invalid_json_is_load_error() {
        let err = read("{ not json").unwrap_err();
        assert!(matches!(err, DatasetError::Load(LoadError::GeoJson { .. })));
    }

    #[test]
    fn web_mercator_crs_is_reprojected() {
        let json = r#"{
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::3857" } },
            "features": [{
                "type": "Feature",
                "properties": { "nombre": "Area1" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [-9462156.717428254, 1006021.0627551326],
                        [-9350837.226634981, 1006021.0627551326],
                        [-9350837.226634981, 1118889.9748579597],
                        [-9462156.717428254, 1118889.9748579597],
                        [-9462156.717428254, 1006021.0627551326]
                    ]]
                }
            }]
        }"#;
        let areas = read(json).unwrap();
        let first = areas[0].geometry.coords_iter().next().unwrap();
        assert!((first.x - -85.0).abs() < 1e-6, "x was {}", first.x);
        assert!((first.y - 9.0).abs() < 1e-6, "y was {}", first.y);
    }

    #[test]
    fn unsupported_crs_is_rejected() {
        let json = r#"{
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "EPSG:5367" } },
            "features": []
        }"#;
        let err = read(json).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::CoordinateSystem(CoordinateSystemError::Unsupported { .. })
        ));
    }

    #[test]
    fn blank_crs_override_is_unset() {
        let source = AreaSource {
            crs: Some(String::new()),
            ..source()
        };
        let err = read_areas(TWO_AREAS.as_bytes(), "areas.geojson", &source).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::CoordinateSystem(CoordinateSystemError::Unset { .. })
        ));
    }

    #[test]
    fn projected_coordinates_without_crs_are_out_of_range() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "nombre": "Area1" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[500000, 1000000], [510000, 1000000], [510000, 1010000], [500000, 1000000]]]
                }
            }]
        }"#;
        let err = read(json).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::CoordinateSystem(CoordinateSystemError::OutOfRange { .. })
        ));
    }
}
