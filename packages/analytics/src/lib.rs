#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Species richness aggregation.
//!
//! Groups joined occurrences by conservation area, counts distinct species
//! per area, and left-joins the result onto the full area list so every
//! area gets exactly one [`RichnessRecord`]. Also ranks species by
//! occurrence count for the report's species chart.

use std::collections::{BTreeMap, BTreeSet};

use richness_map_models::{
    ConservationArea, JoinedOccurrence, RichnessRecord, RichnessSummary, SpeciesCount,
};

/// Default number of species shown in the species ranking.
pub const DEFAULT_TOP_SPECIES: usize = 10;

/// Computes species richness for every area.
///
/// Null species do not add to richness but still count toward the area's
/// `occurrence_count`. Areas with no occurrences get zero. Records are
/// sorted by richness descending; ties keep the order of `areas`.
///
/// An occurrence joined to an index that is not in `areas` is counted as
/// unjoined so the record totals still add up.
#[must_use]
pub fn richness(areas: &[ConservationArea], joined: &[JoinedOccurrence]) -> RichnessSummary {
    let known: BTreeSet<usize> = areas.iter().map(|a| a.index).collect();

    let mut species_by_area: BTreeMap<usize, BTreeSet<&str>> = BTreeMap::new();
    let mut occurrences_by_area: BTreeMap<usize, u64> = BTreeMap::new();
    let mut unjoined_count = 0u64;

    for j in joined {
        let area = match j.area {
            Some(area) if known.contains(&area) => area,
            Some(area) => {
                log::warn!("Occurrence joined to unknown area index {area}; counting as unjoined");
                unjoined_count += 1;
                continue;
            }
            None => {
                unjoined_count += 1;
                continue;
            }
        };

        *occurrences_by_area.entry(area).or_default() += 1;
        if let Some(species) = j.occurrence.species.as_deref() {
            species_by_area.entry(area).or_default().insert(species);
        }
    }

    let mut records: Vec<RichnessRecord> = areas
        .iter()
        .map(|area| RichnessRecord {
            area_index: area.index,
            area_name: area.name.clone(),
            richness: species_by_area
                .get(&area.index)
                .map_or(0, |species| species.len() as u64),
            occurrence_count: occurrences_by_area.get(&area.index).copied().unwrap_or(0),
        })
        .collect();

    // Stable: equal richness keeps area order.
    records.sort_by(|a, b| b.richness.cmp(&a.richness));

    let summary = RichnessSummary {
        records,
        unjoined_count,
        total_occurrences: joined.len() as u64,
    };

    log::info!(
        "Computed richness for {} areas ({} occurrences, {} outside all areas)",
        summary.records.len(),
        summary.total_occurrences,
        summary.unjoined_count
    );

    summary
}

/// Ranks species by number of occurrences, joined or not.
///
/// Sorted by count descending, ties by species name ascending, truncated
/// to `limit`. Null species are excluded.
#[must_use]
pub fn top_species(joined: &[JoinedOccurrence], limit: usize) -> Vec<SpeciesCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for species in joined
        .iter()
        .filter_map(|j| j.occurrence.species.as_deref())
    {
        *counts.entry(species).or_default() += 1;
    }

    // BTreeMap iteration is name-ascending, and the sort below is stable.
    let mut ranked: Vec<SpeciesCount> = counts
        .into_iter()
        .map(|(species, count)| SpeciesCount {
            species: species.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

/// Number of distinct non-null species across all occurrences.
#[must_use]
pub fn distinct_species(joined: &[JoinedOccurrence]) -> usize {
    joined
        .iter()
        .filter_map(|j| j.occurrence.species.as_deref())
        .collect::<BTreeSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use geo::{MultiPolygon, polygon};
    use richness_map_models::Occurrence;

    use super::*;

    fn area(index: usize, name: &str) -> ConservationArea {
        let x = -85.0 + 2.0 * index as f64;
        ConservationArea {
            index,
            name: name.to_string(),
            geometry: MultiPolygon(vec![polygon![
                (x: x, y: 9.0),
                (x: x + 1.0, y: 9.0),
                (x: x + 1.0, y: 10.0),
                (x: x, y: 10.0),
                (x: x, y: 9.0),
            ]]),
        }
    }

    fn joined(area: Option<usize>, species: Option<&str>) -> JoinedOccurrence {
        JoinedOccurrence {
            occurrence: Occurrence::at(0.0, 0.0, species),
            area,
        }
    }

    fn record<'a>(summary: &'a RichnessSummary, name: &str) -> &'a RichnessRecord {
        summary
            .records
            .iter()
            .find(|r| r.area_name == name)
            .unwrap_or_else(|| panic!("no record for {name}"))
    }

    #[test]
    fn single_area_scenario() {
        let areas = vec![area(0, "Area1")];
        let occurrences = vec![
            joined(Some(0), Some("Epidendrum sp.")),
            joined(None, Some("Oncidium sp.")),
        ];

        let summary = richness(&areas, &occurrences);

        assert_eq!(summary.records.len(), 1);
        assert_eq!(record(&summary, "Area1").richness, 1);
        assert_eq!(summary.unjoined_count, 1);
        assert_eq!(summary.total_occurrences, 2);
    }

    #[test]
    fn every_area_appears_exactly_once_with_zero_fill() {
        let areas = vec![area(0, "A"), area(1, "B"), area(2, "C")];
        let occurrences = vec![joined(Some(1), Some("x"))];

        let summary = richness(&areas, &occurrences);

        assert_eq!(summary.records.len(), 3);
        for a in &areas {
            let matching = summary
                .records
                .iter()
                .filter(|r| r.area_index == a.index)
                .count();
            assert_eq!(matching, 1, "area {} appears {matching} times", a.name);
        }
        assert_eq!(record(&summary, "A").richness, 0);
        assert_eq!(record(&summary, "A").occurrence_count, 0);
        assert_eq!(record(&summary, "B").richness, 1);
    }

    #[test]
    fn duplicate_names_stay_separate() {
        let areas = vec![area(0, "Refugio"), area(1, "Refugio")];
        let occurrences = vec![joined(Some(0), Some("x")), joined(Some(0), Some("y"))];

        let summary = richness(&areas, &occurrences);

        assert_eq!(summary.records.len(), 2);
        assert_eq!(summary.records[0].area_index, 0);
        assert_eq!(summary.records[0].richness, 2);
        assert_eq!(summary.records[1].area_index, 1);
        assert_eq!(summary.records[1].richness, 0);
    }

    #[test]
    fn richness_counts_distinct_non_null_species() {
        let areas = vec![area(0, "A")];
        let occurrences = vec![
            joined(Some(0), Some("Vanilla planifolia")),
            joined(Some(0), Some("Vanilla planifolia")),
            joined(Some(0), Some("Epidendrum radicans")),
            joined(Some(0), None),
            joined(Some(0), None),
        ];

        let summary = richness(&areas, &occurrences);
        let a = record(&summary, "A");

        assert_eq!(a.richness, 2);
        assert_eq!(a.occurrence_count, 5);
    }

    #[test]
    fn records_are_conserved() {
        let areas = vec![area(0, "A"), area(1, "B")];
        let occurrences = vec![
            joined(Some(0), Some("x")),
            joined(Some(1), None),
            joined(Some(1), Some("y")),
            joined(None, Some("z")),
            joined(None, None),
            joined(Some(7), Some("orphan")),
        ];

        let summary = richness(&areas, &occurrences);
        let joined_total: u64 = summary.records.iter().map(|r| r.occurrence_count).sum();

        assert_eq!(summary.unjoined_count, 3);
        assert_eq!(
            joined_total + summary.unjoined_count,
            summary.total_occurrences
        );
        assert_eq!(summary.total_occurrences, occurrences.len() as u64);
    }

    #[test]
    fn sorted_by_richness_with_stable_ties() {
        let areas = vec![area(0, "A"), area(1, "B"), area(2, "C"), area(3, "D")];
        let occurrences = vec![
            joined(Some(1), Some("x")),
            joined(Some(3), Some("x")),
            joined(Some(2), Some("x")),
            joined(Some(2), Some("y")),
        ];

        let summary = richness(&areas, &occurrences);
        let names: Vec<&str> = summary
            .records
            .iter()
            .map(|r| r.area_name.as_str())
            .collect();

        assert_eq!(names, vec!["C", "B", "D", "A"]);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let areas = vec![area(0, "A"), area(1, "B")];
        let occurrences = vec![
            joined(Some(0), Some("x")),
            joined(Some(1), Some("y")),
            joined(None, Some("z")),
        ];

        assert_eq!(richness(&areas, &occurrences), richness(&areas, &occurrences));
    }

    #[test]
    fn top_species_keeps_ten_highest_in_order() {
        let mut occurrences = Vec::new();
        for i in 1..=15u64 {
            let name = format!("Species {i:02}");
            for _ in 0..i {
                occurrences.push(joined(None, Some(&name)));
            }
        }

        let top = top_species(&occurrences, DEFAULT_TOP_SPECIES);

        assert_eq!(top.len(), 10);
        let counts: Vec<u64> = top.iter().map(|s| s.count).collect();
        assert_eq!(counts, (6..=15).rev().collect::<Vec<u64>>());
        assert_eq!(top[0].species, "Species 15");
        assert_eq!(top[9].species, "Species 06");
    }

    #[test]
    fn top_species_ties_break_by_name_and_skip_nulls() {
        let occurrences = vec![
            joined(Some(0), Some("Oncidium")),
            joined(None, Some("Epidendrum")),
            joined(None, None),
            joined(None, None),
            joined(None, None),
        ];

        let top = top_species(&occurrences, 10);

        assert_eq!(
            top,
            vec![
                SpeciesCount {
                    species: "Epidendrum".to_string(),
                    count: 1
                },
                SpeciesCount {
                    species: "Oncidium".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn counts_distinct_species_overall() {
        let occurrences = vec![
            joined(Some(0), Some("x")),
            joined(None, Some("x")),
            joined(None, Some("y")),
            joined(None, None),
        ];
        assert_eq!(distinct_species(&occurrences), 2);
    }
}
