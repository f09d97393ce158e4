//! Distance ranking of located records around a reference point.

use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;

/// Anything that may carry a position. Records without one are skipped by
/// every resolver in this module.
pub trait Located {
    fn location(&self) -> Option<Coordinates>;
}

/// A candidate annotated with its planar distance to the reference point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranked<T> {
    #[serde(flatten)]
    pub item: T,
    pub distance: f64,
}

/// Sorts candidates by ascending distance and keeps the first `limit`.
///
/// The sort is stable, so equally distant candidates keep their input order.
pub fn rank_nearest<T, I>(origin: &Coordinates, candidates: I, limit: usize) -> Vec<Ranked<T>>
where
    T: Located,
    I: IntoIterator<Item = T>,
{
    let mut ranked = annotate(origin, candidates);
    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    ranked.truncate(limit);
    ranked
}

/// Keeps candidates within `radius` of the origin, in input order.
pub fn within_radius<T, I>(origin: &Coordinates, candidates: I, radius: f64) -> Vec<Ranked<T>>
where
    T: Located,
    I: IntoIterator<Item = T>,
{
    annotate(origin, candidates)
        .into_iter()
        .filter(|ranked| ranked.distance <= radius)
        .collect()
}

fn annotate<T, I>(origin: &Coordinates, candidates: I) -> Vec<Ranked<T>>
where
    T: Located,
    I: IntoIterator<Item = T>,
{
    candidates
        .into_iter()
        .filter_map(|item| {
            let location = item.location()?;
            Some(Ranked {
                distance: origin.planar_distance(&location),
                item,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        label: &'static str,
        at: Option<Coordinates>,
    }

    impl Located for Point {
        fn location(&self) -> Option<Coordinates> {
            self.at
        }
    }

    fn point(label: &'static str, offset: f64) -> Point {
        Point {
            label,
            at: Some(Coordinates::new(offset, 0.0)),
        }
    }

    #[test]
    fn ranks_ascending_and_truncates() {
        let origin = Coordinates::new(0.0, 0.0);
        let candidates = vec![
            point("a", 5.0),
            point("b", 1.0),
            point("c", 3.0),
            point("d", 9.0),
            point("e", 2.0),
            point("f", 7.0),
        ];

        let top_five = rank_nearest(&origin, candidates.clone(), 5);
        let distances: Vec<f64> = top_five.iter().map(|r| r.distance).collect();
        assert_eq!(distances, vec![1.0, 2.0, 3.0, 5.0, 7.0]);

        let top_three = rank_nearest(&origin, candidates, 3);
        let labels: Vec<&str> = top_three.iter().map(|r| r.item.label).collect();
        assert_eq!(labels, vec!["b", "e", "c"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let origin = Coordinates::new(0.0, 0.0);
        let candidates = vec![point("first", 2.0), point("second", -2.0), point("near", 1.0)];

        let ranked = rank_nearest(&origin, candidates, 5);
        let labels: Vec<&str> = ranked.iter().map(|r| r.item.label).collect();
        assert_eq!(labels, vec!["near", "first", "second"]);
    }

    #[test]
    fn skips_candidates_without_coordinates() {
        let origin = Coordinates::new(0.0, 0.0);
        let candidates = vec![
            Point {
                label: "nowhere",
                at: None,
            },
            point("here", 4.0),
        ];

        let ranked = rank_nearest(&origin, candidates, 5);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].item.label, "here");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let origin = Coordinates::new(10.0, 10.0);
        assert!(rank_nearest::<Point, _>(&origin, Vec::new(), 3).is_empty());
        assert!(within_radius::<Point, _>(&origin, Vec::new(), 20.0).is_empty());
    }

    #[test]
    fn radius_filter_preserves_order() {
        let origin = Coordinates::new(0.0, 0.0);
        let candidates = vec![point("far", 25.0), point("edge", 20.0), point("close", 3.0)];

        let kept = within_radius(&origin, candidates, 20.0);
        let labels: Vec<&str> = kept.iter().map(|r| r.item.label).collect();
        assert_eq!(labels, vec!["edge", "close"]);
    }
}
