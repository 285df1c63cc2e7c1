//! GeoJSON layers for the interactive map.
//!
//! The area layer carries a precomputed fill color on the richness ramp.
//! The occurrence layer carries a marker color per species, assigned by
//! occurrence frequency so the most recorded species get distinct colors.

use std::collections::BTreeMap;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use richness_map_models::{ConservationArea, JoinedOccurrence, RichnessSummary};
use serde_json::Value;

use crate::color;

/// Builds the area layer. Every area gets a feature, including those with
/// zero richness.
#[must_use]
pub fn area_layer(areas: &[ConservationArea], summary: &RichnessSummary) -> FeatureCollection {
    let max = summary.records.iter().map(|r| r.richness).max().unwrap_or(0);
    let by_index: BTreeMap<usize, (u64, u64)> = summary
        .records
        .iter()
        .map(|r| (r.area_index, (r.richness, r.occurrence_count)))
        .collect();

    let features = areas
        .iter()
        .map(|area| {
            let (richness, occurrences) = by_index.get(&area.index).copied().unwrap_or((0, 0));

            let mut props = JsonObject::new();
            props.insert("name".to_string(), Value::from(area.name.clone()));
            props.insert("richness".to_string(), Value::from(richness));
            props.insert("occurrences".to_string(), Value::from(occurrences));
            props.insert("fill".to_string(), Value::from(color::ramp(richness, max)));

            feature(Geometry::new(geojson::Value::from(&area.geometry)), props)
        })
        .collect();

    collection(features)
}

/// Builds the occurrence layer, tagging each point with the name of the
/// area it joined to.
#[must_use]
pub fn occurrence_layer(
    areas: &[ConservationArea],
    joined: &[JoinedOccurrence],
) -> FeatureCollection {
    let names: BTreeMap<usize, &str> = areas.iter().map(|a| (a.index, a.name.as_str())).collect();
    let colors = species_colors(joined);

    let features = joined
        .iter()
        .map(|j| {
            let o = &j.occurrence;
            let marker = o
                .species
                .as_deref()
                .and_then(|s| colors.get(s).copied())
                .unwrap_or(color::UNIDENTIFIED);

            let mut props = JsonObject::new();
            props.insert("species".to_string(), opt(o.species.as_deref()));
            props.insert("locality".to_string(), opt(o.locality.as_deref()));
            props.insert("eventDate".to_string(), opt(o.event_date.as_deref()));
            props.insert("institution".to_string(), opt(o.institution.as_deref()));
            props.insert("recordId".to_string(), opt(o.record_id.as_deref()));
            props.insert(
                "area".to_string(),
                opt(j.area.and_then(|idx| names.get(&idx).copied())),
            );
            props.insert("color".to_string(), Value::from(marker));

            feature(Geometry::new(geojson::Value::from(&o.location)), props)
        })
        .collect();

    collection(features)
}

/// Assigns a palette color to each species, most frequent first. Ties are
/// broken by name so the assignment is deterministic.
#[must_use]
pub fn species_colors(joined: &[JoinedOccurrence]) -> BTreeMap<&str, &'static str> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for species in joined
        .iter()
        .filter_map(|j| j.occurrence.species.as_deref())
    {
        *counts.entry(species).or_default() += 1;
    }

    let mut ranked: Vec<(&str, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    ranked
        .into_iter()
        .enumerate()
        .map(|(rank, (species, _))| (species, color::category(rank)))
        .collect()
}

fn opt(value: Option<&str>) -> Value {
    value.map_or(Value::Null, Value::from)
}

fn feature(geometry: Geometry, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
