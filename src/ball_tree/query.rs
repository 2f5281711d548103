//! Exact lookup, k-nearest-neighbour and radius queries over a built tree.

use std::cmp::Ordering;

use log::warn;
use num_traits::AsPrimitive;

use super::heap_utils::KBestNeighbors;
use super::{Ball, BallTree, Neighbor, SearchStrategy};
use crate::common_types::{Key, squared_distance};
use crate::error::QueryError;

/// Relative slack applied before pruning a ball, so rounding in the square roots can never
/// discard a point that belongs in the answer.
const PRUNE_TOLERANCE: f64 = 1e-9;

/// A candidate held in the k-best heap. Ordered by key, which is unique within a tree.
struct Candidate<'a, V> {
    key: &'a Key,
    value: &'a V,
}

impl<V> PartialEq for Candidate<'_, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl<V> Eq for Candidate<'_, V> {}

impl<V> PartialOrd for Candidate<'_, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V> Ord for Candidate<'_, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(other.key)
    }
}

/// Smallest distance any point of `ball` can have from a query `query_to_pivot` away from its pivot.
fn lower_bound<V>(ball: &Ball<V>, query_to_pivot: f64) -> f64 {
    (query_to_pivot.sqrt() - ball.radius()).max(0.0)
}

fn beyond(lower_bound: f64, limit: f64) -> bool {
    lower_bound > limit * (1.0 + PRUNE_TOLERANCE) + PRUNE_TOLERANCE
}

fn compare_values<V: PartialOrd>(a: &V, b: &V) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

impl<V> BallTree<V> {
    fn check_dimensions(&self, query: &Key) -> Result<(), QueryError> {
        if query.dimensions() != self.dimensions {
            warn!(
                "Query dimensionality ({}) does not match tree dimensionality ({}).",
                query.dimensions(),
                self.dimensions
            );
            return Err(QueryError::DimensionMismatch {
                expected: self.dimensions,
                found: query.dimensions(),
            });
        }
        Ok(())
    }

    /// Returns the value stored under `key`, or `None` when the key is absent or has the wrong
    /// number of coordinates.
    pub fn find<T: AsPrimitive<f64>>(&self, key: &[T]) -> Option<&V> {
        self.try_find(key).ok()
    }

    pub fn try_find<T: AsPrimitive<f64>>(&self, key: &[T]) -> Result<&V, QueryError> {
        let key = Key::from_coordinates(key);
        self.check_dimensions(&key)?;

        // Descend exactly the way construction routed the key.
        let mut ball: &Ball<V> = &self.root;
        loop {
            if ball.pivot == key {
                return Ok(&ball.value);
            }
            match ball.child_towards(key.coordinates()) {
                Some(child) => ball = child,
                None => return Err(QueryError::NotFound),
            }
        }
    }

    fn collect_nearest<'a>(
        &'a self,
        query: &Key,
        k: usize,
    ) -> Result<Vec<Neighbor<'a, V>>, QueryError> {
        self.check_dimensions(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        // No more than `size` points can ever be kept.
        let mut best = KBestNeighbors::new(k.min(self.size));
        let coordinates = query.coordinates();
        match self.strategy {
            SearchStrategy::Exhaustive => search_nn_recursive(&self.root, coordinates, &mut best),
            SearchStrategy::Pruned => {
                let to_root = squared_distance(coordinates, self.root.pivot.coordinates());
                search_nn_pruned(&self.root, to_root, coordinates, &mut best);
            }
        }

        Ok(best
            .into_sorted_vec()
            .into_iter()
            .map(|elem| Neighbor {
                key: elem.data.key,
                value: elem.data.value,
                squared_distance: elem.distance.0,
            })
            .collect())
    }

    fn collect_within<'a>(
        &'a self,
        query: &Key,
        radius: f64,
    ) -> Result<Vec<Neighbor<'a, V>>, QueryError> {
        self.check_dimensions(query)?;
        // Written this way round so NaN is rejected too.
        if !(radius > 0.0) {
            warn!("Search radius must be positive, got {}.", radius);
            return Err(QueryError::InvalidRadius(radius));
        }

        let mut found = Vec::new();
        let squared_radius = radius * radius;
        match self.strategy {
            SearchStrategy::Exhaustive => {
                search_radius_recursive(&self.root, query, squared_radius, &mut found)
            }
            SearchStrategy::Pruned => {
                let to_root = squared_distance(query.coordinates(), self.root.pivot.coordinates());
                search_radius_pruned(&self.root, to_root, query, radius, &mut found);
            }
        }
        // Keys break ties between equal values.
        found.sort_by(|a, b| a.key.cmp(b.key));
        Ok(found)
    }
}

impl<V: PartialOrd> BallTree<V> {
    /// The `k` points closest to `query`, closest first, with their keys and squared distances.
    ///
    /// A point at distance zero (the query itself, when it is indexed) is never its own neighbour.
    /// Equal distances are ordered by value, then by key.
    pub fn nearest_neighbors<T: AsPrimitive<f64>>(
        &self,
        query: &[T],
        k: usize,
    ) -> Option<Vec<Neighbor<'_, V>>> {
        self.try_nearest_neighbors(query, k).ok()
    }

    pub fn try_nearest_neighbors<T: AsPrimitive<f64>>(
        &self,
        query: &[T],
        k: usize,
    ) -> Result<Vec<Neighbor<'_, V>>, QueryError> {
        let mut neighbors = self.collect_nearest(&Key::from_coordinates(query), k)?;
        // The heap hands them back ordered by (distance, key); the stable sort keeps that for ties.
        neighbors.sort_by(|a, b| {
            a.squared_distance
                .total_cmp(&b.squared_distance)
                .then_with(|| compare_values(a.value, b.value))
        });
        Ok(neighbors)
    }

    /// Values of the `k` nearest neighbours of `query`, closest first.
    ///
    /// Returns `None` on a dimensionality mismatch and an empty list when `k == 0`.
    pub fn k_nearest<T: AsPrimitive<f64>>(&self, query: &[T], k: usize) -> Option<Vec<&V>> {
        self.try_k_nearest(query, k).ok()
    }

    pub fn try_k_nearest<T: AsPrimitive<f64>>(
        &self,
        query: &[T],
        k: usize,
    ) -> Result<Vec<&V>, QueryError> {
        Ok(self
            .try_nearest_neighbors(query, k)?
            .into_iter()
            .map(|n| n.value)
            .collect())
    }

    /// Every point other than `query` itself strictly closer than `radius`, ordered by value.
    pub fn neighbors_within<T: AsPrimitive<f64>>(
        &self,
        query: &[T],
        radius: f64,
    ) -> Option<Vec<Neighbor<'_, V>>> {
        self.try_neighbors_within(query, radius).ok()
    }

    pub fn try_neighbors_within<T: AsPrimitive<f64>>(
        &self,
        query: &[T],
        radius: f64,
    ) -> Result<Vec<Neighbor<'_, V>>, QueryError> {
        let mut found = self.collect_within(&Key::from_coordinates(query), radius)?;
        found.sort_by(|a, b| compare_values(a.value, b.value));
        Ok(found)
    }

    /// Values of every point strictly within `radius` of `query`, ascending.
    ///
    /// Returns `None` when `radius <= 0` or the dimensionality does not match.
    pub fn within_radius<T: AsPrimitive<f64>>(&self, query: &[T], radius: f64) -> Option<Vec<&V>> {
        self.try_within_radius(query, radius).ok()
    }

    pub fn try_within_radius<T: AsPrimitive<f64>>(
        &self,
        query: &[T],
        radius: f64,
    ) -> Result<Vec<&V>, QueryError> {
        Ok(self
            .try_neighbors_within(query, radius)?
            .into_iter()
            .map(|n| n.value)
            .collect())
    }
}

fn offer<'a, V>(
    ball: &'a Ball<V>,
    squared: f64,
    best: &mut KBestNeighbors<Candidate<'a, V>>,
) {
    // A point is never its own neighbour.
    if squared != 0.0 {
        best.add(squared, Candidate { key: &ball.pivot, value: &ball.value });
    }
}

fn search_nn_recursive<'a, V>(
    ball: &'a Ball<V>,
    query: &[f64],
    best: &mut KBestNeighbors<Candidate<'a, V>>,
) {
    offer(ball, squared_distance(query, ball.pivot.coordinates()), best);
    for child in ball.children() {
        search_nn_recursive(child, query, best);
    }
}

fn search_nn_pruned<'a, V>(
    ball: &'a Ball<V>,
    to_pivot: f64,
    query: &[f64],
    best: &mut KBestNeighbors<Candidate<'a, V>>,
) {
    if let Some(farthest) = best.current_farthest_distance() {
        if beyond(lower_bound(ball, to_pivot), farthest.sqrt()) {
            return; // This ball cannot contain a better neighbor
        }
    }
    offer(ball, to_pivot, best);

    // Search the child whose pivot is closer to the query first.
    let mut children: Vec<(&Ball<V>, f64)> = ball
        .children()
        .map(|child| (child, squared_distance(query, child.pivot.coordinates())))
        .collect();
    children.sort_by(|a, b| a.1.total_cmp(&b.1));
    for (child, to_child) in children {
        search_nn_pruned(child, to_child, query, best);
    }
}

fn search_radius_recursive<'a, V>(
    ball: &'a Ball<V>,
    query: &Key,
    squared_radius: f64,
    found: &mut Vec<Neighbor<'a, V>>,
) {
    if ball.pivot != *query {
        let squared = squared_distance(query.coordinates(), ball.pivot.coordinates());
        if squared < squared_radius {
            found.push(Neighbor { key: &ball.pivot, value: &ball.value, squared_distance: squared });
        }
    }
    for child in ball.children() {
        search_radius_recursive(child, query, squared_radius, found);
    }
}

fn search_radius_pruned<'a, V>(
    ball: &'a Ball<V>,
    to_pivot: f64,
    query: &Key,
    radius: f64,
    found: &mut Vec<Neighbor<'a, V>>,
) {
    if beyond(lower_bound(ball, to_pivot), radius) {
        return;
    }
    if ball.pivot != *query && to_pivot < radius * radius {
        found.push(Neighbor { key: &ball.pivot, value: &ball.value, squared_distance: to_pivot });
    }
    for child in ball.children() {
        let to_child = squared_distance(query.coordinates(), child.pivot.coordinates());
        search_radius_pruned(child, to_child, query, radius, found);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brute_force::LinearScan;
    use crate::common_types::DataPoint;
    use crate::synthetic::{CoordinateKind, generate_key, generate_points};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const STRATEGIES: [SearchStrategy; 2] = [SearchStrategy::Exhaustive, SearchStrategy::Pruned];

    fn build_sample_tree() -> BallTree<&'static str> {
        BallTree::build(vec![
            ([0, 0], "A"),
            ([1, 0], "B"),
            ([0, 1], "C"),
            ([5, 5], "D"),
        ])
        .expect("Sample tree creation failed")
    }

    fn build_line_tree() -> BallTree<i32> {
        // Points 0..10 on a line, value = coordinate.
        BallTree::build((0..10).map(|i| (vec![i as f64], i))).expect("Line tree creation failed")
    }

    #[test]
    fn test_sample_scenario() {
        for strategy in STRATEGIES {
            let tree = build_sample_tree().with_strategy(strategy);
            assert_eq!(tree.find(&[1, 0]), Some(&"B"));
            assert_eq!(tree.k_nearest(&[0, 0], 2), Some(vec![&"B", &"C"]));
            assert_eq!(tree.within_radius(&[0, 0], 1.5), Some(vec![&"B", &"C"]));
            assert_eq!(tree.within_radius(&[0, 0], 0.5), Some(vec![]));
        }
    }

    #[test]
    fn test_find_every_point() {
        let tree = build_sample_tree();
        assert_eq!(tree.find(&[0.0, 0.0]), Some(&"A"));
        assert_eq!(tree.find(&[0.0, 1.0]), Some(&"C"));
        assert_eq!(tree.find(&[5u8, 5]), Some(&"D"));
        assert_eq!(tree.find(&[2, 2]), None);
        assert_eq!(tree.try_find(&[2, 2]), Err(QueryError::NotFound));
    }

    #[test]
    fn test_find_numeric_type_invariance() {
        let tree = BallTree::build(vec![(vec![3i64, 4], 1.5), (vec![-2, 7], 2.5)]).unwrap();
        assert_eq!(tree.find(&[3i32, 4]), Some(&1.5));
        assert_eq!(tree.find(&[3.0f64, 4.0]), Some(&1.5));
        assert_eq!(tree.find(&[3.0f32, 4.0]), Some(&1.5));
        assert_eq!(tree.find(&[-2.0, 7.0]), tree.find(&[-2i64, 7]));
    }

    #[test]
    fn test_dimension_mismatch_is_absent() {
        let tree = build_sample_tree();
        assert_eq!(tree.find(&[0.0]), None);
        assert_eq!(tree.find(&[0.0, 0.0, 0.0]), None);
        assert_eq!(tree.find::<f64>(&[]), None);
        assert_eq!(tree.k_nearest(&[0.0], 1), None);
        assert_eq!(tree.k_nearest(&[0.0, 0.0, 0.0], 0), None);
        assert_eq!(tree.within_radius(&[0.0, 0.0, 0.0], 1.0), None);
        assert_eq!(
            tree.try_find(&[1.0, 2.0, 3.0]),
            Err(QueryError::DimensionMismatch { expected: 2, found: 3 })
        );
    }

    #[test]
    fn test_single_point_tree_queries() {
        let tree = BallTree::build(vec![([1.0, 2.0], 42)]).unwrap();
        assert_eq!(tree.find(&[1.0, 2.0]), Some(&42));
        assert_eq!(tree.find(&[2.0, 2.0]), None);
        // The only point is the query itself.
        assert_eq!(tree.k_nearest(&[1.0, 2.0], 3), Some(vec![]));
        assert_eq!(tree.k_nearest(&[0.0, 0.0], 3), Some(vec![&42]));
    }

    #[test]
    fn test_knn_zero_neighbors_requested() {
        let tree = build_sample_tree();
        assert_eq!(tree.k_nearest(&[0.5, 0.5], 0), Some(vec![]));
    }

    #[test]
    fn test_knn_excludes_self_and_orders_by_distance() {
        for strategy in STRATEGIES {
            let tree = build_line_tree().with_strategy(strategy);
            let neighbors = tree.nearest_neighbors(&[4.0], 3).unwrap();
            let values: Vec<i32> = neighbors.iter().map(|n| *n.value).collect();
            // 3 and 5 tie at distance 1; the value breaks the tie.
            assert_eq!(values, vec![3, 5, 2]);
            assert_eq!(neighbors[0].squared_distance, 1.0);
            assert_eq!(neighbors[2].distance(), 2.0);
        }
    }

    #[test]
    fn test_knn_k_larger_than_dataset() {
        let tree = build_line_tree();
        assert_eq!(tree.k_nearest(&[4.0], 100).map(|v| v.len()), Some(9));
        assert_eq!(tree.k_nearest(&[4.5], 100).map(|v| v.len()), Some(10));
    }

    #[test]
    fn test_knn_huge_k_returns_every_other_point() {
        for strategy in STRATEGIES {
            let tree = build_sample_tree().with_strategy(strategy);
            assert_eq!(tree.k_nearest(&[0, 0], usize::MAX), Some(vec![&"B", &"C", &"D"]));
            assert_eq!(tree.k_nearest(&[0.5, 0.5], 1 << 40).map(|v| v.len()), Some(4));
        }
    }

    #[test]
    fn test_radius_bounds() {
        for strategy in STRATEGIES {
            let tree = build_line_tree().with_strategy(strategy);
            // Distance exactly 2 is not strictly inside.
            assert_eq!(tree.within_radius(&[4.0], 2.0), Some(vec![&3, &5]));
            assert_eq!(tree.within_radius(&[4.0], 2.0001), Some(vec![&2, &3, &5, &6]));
            assert_eq!(tree.within_radius(&[4.0], 0.0), None);
            assert_eq!(tree.within_radius(&[4.0], -1.0), None);
            assert_eq!(tree.within_radius(&[4.0], f64::NAN), None);
            assert_eq!(tree.try_within_radius(&[4.0], -1.0), Err(QueryError::InvalidRadius(-1.0)));
            assert_eq!(tree.within_radius(&[4.0], f64::INFINITY).map(|v| v.len()), Some(9));
        }
    }

    #[test]
    fn test_radius_orders_by_value() {
        let tree = BallTree::build(vec![
            ([0.0, 0.0], 9),
            ([0.0, 1.0], 1),
            ([1.0, 0.0], 5),
            ([0.5, 0.5], 3),
        ])
        .unwrap();
        assert_eq!(tree.within_radius(&[0.1, 0.1], 2.0), Some(vec![&1, &3, &5, &9]));
    }

    #[test]
    fn test_concurrent_queries() {
        let mut rng = StdRng::seed_from_u64(11);
        let points = generate_points(&mut rng, 3, 500, CoordinateKind::Real, -100.0, 100.0).unwrap();
        let tree = BallTree::from_points(points.clone()).unwrap();
        std::thread::scope(|scope| {
            for chunk in points.chunks(125) {
                let tree = &tree;
                scope.spawn(move || {
                    for point in chunk {
                        assert_eq!(tree.find(point.key.coordinates()), Some(&point.value));
                        assert_eq!(tree.k_nearest(point.key.coordinates(), 5).map(|v| v.len()), Some(5));
                    }
                });
            }
        });
    }

    fn check_against_linear_scan(points: Vec<DataPoint<f64>>, rng: &mut StdRng, kind: CoordinateKind) {
        let n = points.len();
        let dims = points[0].key.dimensions();
        let scan = LinearScan::new(points.clone()).unwrap();

        for strategy in STRATEGIES {
            let tree = BallTree::from_points(points.clone()).unwrap().with_strategy(strategy);
            assert_eq!(tree.size(), n);
            assert_eq!(tree.size(), scan.size());

            for point in &points {
                assert_eq!(tree.find(point.key.coordinates()), Some(&point.value));
            }

            // Member queries and fresh random queries.
            let mut queries: Vec<Key> = points.iter().step_by(7).map(|p| p.key.clone()).collect();
            for _ in 0..10 {
                queries.push(generate_key(rng, dims, kind, -1000.0, 1000.0).unwrap());
            }

            for query in &queries {
                let q = query.coordinates();
                assert_eq!(tree.find(q), scan.find(q));
                for k in [0, 1, 2, n.saturating_sub(1), n, n + 1] {
                    let expected = scan.k_nearest(q, k).unwrap();
                    let actual = tree.k_nearest(q, k).unwrap();
                    assert_eq!(actual, expected, "k = {} with {:?}", k, strategy);
                }
                for radius in [-1.0, 0.0, 50.0, 400.0, 1500.0] {
                    assert_eq!(tree.within_radius(q, radius), scan.within_radius(q, radius));
                }
            }
        }
    }

    #[test]
    fn test_matches_linear_scan_integers() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..3 {
            for (dims, amount) in [(rng.gen_range(2..=4), 10), (rng.gen_range(5..=7), 50), (rng.gen_range(8..=10), 200)] {
                let points =
                    generate_points(&mut rng, dims, amount, CoordinateKind::Integer, -1000.0, 1000.0).unwrap();
                check_against_linear_scan(points, &mut rng, CoordinateKind::Integer);
            }
        }
    }

    #[test]
    fn test_matches_linear_scan_reals() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..3 {
            for (dims, amount) in [(rng.gen_range(2..=4), 10), (rng.gen_range(5..=7), 50), (rng.gen_range(8..=10), 200)] {
                let points =
                    generate_points(&mut rng, dims, amount, CoordinateKind::Real, -1000.0, 1000.0).unwrap();
                check_against_linear_scan(points, &mut rng, CoordinateKind::Real);
            }
        }
    }

    #[test]
    fn test_matches_linear_scan_dense_integer_grid() {
        // A small coordinate range makes equal distances common.
        let mut rng = StdRng::seed_from_u64(3);
        let points = generate_points(&mut rng, 2, 120, CoordinateKind::Integer, 0.0, 15.0).unwrap();
        let n = points.len();
        let scan = LinearScan::new(points.clone()).unwrap();
        for strategy in STRATEGIES {
            let tree = BallTree::from_points(points.clone()).unwrap().with_strategy(strategy);
            for x in 0..16 {
                for y in 0..16 {
                    let q = [x as f64, y as f64];
                    for k in [1, 4, 9, n] {
                        assert_eq!(tree.k_nearest(&q, k), scan.k_nearest(&q, k));
                    }
                    for radius in [1.0, 2.0, 3.5] {
                        assert_eq!(tree.within_radius(&q, radius), scan.within_radius(&q, radius));
                    }
                }
            }
        }
    }
}
