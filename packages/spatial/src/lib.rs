#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory spatial index for attaching occurrences to conservation areas.
//!
//! Builds an R-tree over area bounding boxes and answers point-in-polygon
//! lookups with "within" semantics: a point matches an area only when it
//! lies in the polygon interior. Points exactly on a boundary edge match
//! nothing.

use std::sync::Arc;

use geo::{BoundingRect as _, Contains as _, MultiPolygon, Point};
use richness_map_models::progress::ProgressCallback;
use richness_map_models::{ConservationArea, JoinedOccurrence, Occurrence};
use rstar::{AABB, RTree, RTreeObject};

/// Occurrences processed between progress updates.
const PROGRESS_CHUNK: usize = 1_000;

/// An area polygon stored in the R-tree with its index.
struct AreaEntry<'a> {
    index: usize,
    envelope: AABB<[f64; 2]>,
    polygon: &'a MultiPolygon<f64>,
}

impl RTreeObject for AreaEntry<'_> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over a borrowed set of conservation areas.
pub struct AreaIndex<'a> {
    tree: RTree<AreaEntry<'a>>,
}

impl<'a> AreaIndex<'a> {
    /// Builds the index. Areas with empty geometry are left out since they
    /// cannot contain anything.
    #[must_use]
    pub fn new(areas: &'a [ConservationArea]) -> Self {
        let entries: Vec<AreaEntry<'a>> = areas
            .iter()
            .filter_map(|area| {
                let envelope = compute_envelope(&area.geometry)?;
                Some(AreaEntry {
                    index: area.index,
                    envelope,
                    polygon: &area.geometry,
                })
            })
            .collect();

        log::debug!("Indexed {} of {} areas", entries.len(), areas.len());

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed areas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index holds no areas.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Looks up the area whose interior contains `point`.
    ///
    /// Areas are not expected to overlap. When they do, the lowest area
    /// index (the first area in input order) wins.
    #[must_use]
    pub fn lookup(&self, point: Point<f64>) -> Option<usize> {
        let query_env = AABB::from_point([point.x(), point.y()]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&point))
            .map(|entry| entry.index)
            .min()
    }
}

/// Joins every occurrence to the area containing it.
///
/// Output order matches input order, one [`JoinedOccurrence`] per
/// occurrence.
#[must_use]
pub fn join(
    areas: &[ConservationArea],
    occurrences: &[Occurrence],
    progress: &Arc<dyn ProgressCallback>,
) -> Vec<JoinedOccurrence> {
    let index = AreaIndex::new(areas);

    progress.set_total(occurrences.len() as u64);
    progress.set_message("Joining occurrences to areas".to_string());

    let mut joined = Vec::with_capacity(occurrences.len());
    for chunk in occurrences.chunks(PROGRESS_CHUNK) {
        joined.extend(chunk.iter().map(|occurrence| JoinedOccurrence {
            area: index.lookup(occurrence.location),
            occurrence: occurrence.clone(),
        }));
        progress.inc(chunk.len() as u64);
    }

    let matched = joined.iter().filter(|j| j.area.is_some()).count();
    progress.finish(format!(
        "Joined {matched} of {} occurrences to areas",
        joined.len()
    ));
    log::info!(
        "Joined {matched} of {} occurrences to {} areas",
        joined.len(),
        index.len()
    );

    joined
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

#[cfg(test)]
mod tests {
    use geo::{Polygon, polygon};
    use richness_map_models::progress::null_progress;

    use super::*;

    fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon<f64> {
        polygon![
            (x: min_x, y: min_y),
            (x: max_x, y: min_y),
            (x: max_x, y: max_y),
            (x: min_x, y: max_y),
            (x: min_x, y: min_y),
        ]
    }

    fn area(index: usize, name: &str, polygon: Polygon<f64>) -> ConservationArea {
        ConservationArea {
            index,
            name: name.to_string(),
            geometry: MultiPolygon(vec![polygon]),
        }
    }

    /// Checks every area without the index.
    fn brute_force(areas: &[ConservationArea], point: Point<f64>) -> Option<usize> {
        areas
            .iter()
            .find(|a| a.geometry.contains(&point))
            .map(|a| a.index)
    }

    #[test]
    fn point_inside_area_is_joined() {
        let areas = vec![area(0, "Area1", rect(-85.0, 9.0, -84.0, 10.0))];
        let index = AreaIndex::new(&areas);
        assert_eq!(index.lookup(Point::new(-84.5, 9.5)), Some(0));
        assert_eq!(index.lookup(Point::new(-80.0, 5.0)), None);
    }

    #[test]
    fn boundary_points_do_not_match() {
        let areas = vec![area(0, "Area1", rect(-85.0, 9.0, -84.0, 10.0))];
        let index = AreaIndex::new(&areas);
        assert_eq!(index.lookup(Point::new(-85.0, 9.5)), None);
        assert_eq!(index.lookup(Point::new(-84.0, 10.0)), None);
    }

    #[test]
    fn hole_is_outside() {
        let outer = rect(0.0, 0.0, 10.0, 10.0);
        let hole = rect(4.0, 4.0, 6.0, 6.0);
        let with_hole = Polygon::new(outer.exterior().clone(), vec![hole.exterior().clone()]);
        let areas = vec![area(0, "Donut", with_hole)];
        let index = AreaIndex::new(&areas);
        assert_eq!(index.lookup(Point::new(5.0, 5.0)), None);
        assert_eq!(index.lookup(Point::new(2.0, 2.0)), Some(0));
    }

    #[test]
    fn overlapping_areas_resolve_to_first_in_input_order() {
        let areas = vec![
            area(0, "Big", rect(0.0, 0.0, 10.0, 10.0)),
            area(1, "Small", rect(2.0, 2.0, 3.0, 3.0)),
        ];
        let index = AreaIndex::new(&areas);
        assert_eq!(index.lookup(Point::new(2.5, 2.5)), Some(0));
        assert_eq!(index.lookup(Point::new(8.0, 8.0)), Some(0));
    }

    #[test]
    fn empty_geometry_is_not_indexed() {
        let areas = vec![
            ConservationArea {
                index: 0,
                name: "Empty".to_string(),
                geometry: MultiPolygon(vec![]),
            },
            area(1, "Area1", rect(0.0, 0.0, 1.0, 1.0)),
        ];
        let index = AreaIndex::new(&areas);
        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup(Point::new(0.5, 0.5)), Some(1));
    }

    #[test]
    fn join_preserves_order_and_count() {
        let areas = vec![
            area(0, "West", rect(-85.0, 9.0, -84.0, 10.0)),
            area(1, "East", rect(-83.0, 9.0, -82.0, 10.0)),
        ];
        let occurrences = vec![
            Occurrence::at(-82.5, 9.5, Some("A")),
            Occurrence::at(-80.0, 5.0, Some("B")),
            Occurrence::at(-84.5, 9.5, None),
        ];
        let joined = join(&areas, &occurrences, &null_progress());

        assert_eq!(joined.len(), occurrences.len());
        let areas_joined: Vec<Option<usize>> = joined.iter().map(|j| j.area).collect();
        assert_eq!(areas_joined, vec![Some(1), None, Some(0)]);
        for (j, o) in joined.iter().zip(&occurrences) {
            assert_eq!(&j.occurrence, o);
        }
    }

    #[test]
    fn index_agrees_with_brute_force() {
        let areas: Vec<ConservationArea> = (0..5u8)
            .map(|i| {
                let x = f64::from(i) * 2.0;
                area(usize::from(i), &format!("A{i}"), rect(x, 0.0, x + 1.5, 1.5))
            })
            .collect();
        let index = AreaIndex::new(&areas);

        for xi in 0..40u8 {
            for yi in 0..8u8 {
                let point = Point::new(f64::from(xi) * 0.27, f64::from(yi) * 0.23);
                assert_eq!(
                    index.lookup(point),
                    brute_force(&areas, point),
                    "mismatch at {point:?}"
                );
            }
        }
    }

    #[test]
    fn joined_points_lie_within_their_area() {
        let areas = vec![
            area(0, "West", rect(-85.0, 9.0, -84.0, 10.0)),
            area(1, "East", rect(-83.0, 9.0, -82.0, 10.0)),
        ];
        let occurrences: Vec<Occurrence> = (0..50u8)
            .map(|i| Occurrence::at(-86.0 + f64::from(i) * 0.1, 9.5, None))
            .collect();

        for j in join(&areas, &occurrences, &null_progress()) {
            match j.area {
                Some(idx) => assert!(areas[idx].geometry.contains(&j.occurrence.location)),
                None => assert!(
                    areas
                        .iter()
                        .all(|a| !a.geometry.contains(&j.occurrence.location))
                ),
            }
        }
    }
}
