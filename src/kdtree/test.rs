use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::kdtree::{
    ArrayComparator, DistanceFns, KDTree, KDTreeBuilder, KDTreeIndex, ParamBlock,
    SquaredDistanceMetric, SquaredEuclidean, INTEGRAL, NOT_EQUAL, SINGLE_PREC,
};
use crate::r#type::MetricNum;
use crate::KDTreeError;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn int2_cmp(axis: usize, a: &[i32; 2], b: &[i32; 2]) -> Ordering {
    a[axis].cmp(&b[axis])
}

fn int2_asdist(a: &[i32; 2], b: &[i32; 2], axis: usize) -> f64 {
    let d = (a[axis] - b[axis]) as f64;
    d * d
}

fn int2_sdist(a: &[i32; 2], b: &[i32; 2]) -> f64 {
    int2_asdist(a, b, 0) + int2_asdist(a, b, 1)
}

type Int2Metric = DistanceFns<
    f64,
    fn(&[i32; 2], &[i32; 2]) -> f64,
    fn(&[i32; 2], &[i32; 2], usize) -> f64,
>;
type Int2Params = ParamBlock<[i32; 2], fn(usize, &[i32; 2], &[i32; 2]) -> Ordering, Int2Metric>;

fn int2_params() -> Int2Params {
    ParamBlock::new(
        2,
        int2_cmp as fn(usize, &[i32; 2], &[i32; 2]) -> Ordering,
        DistanceFns::new(
            int2_sdist as fn(&[i32; 2], &[i32; 2]) -> f64,
            int2_asdist as fn(&[i32; 2], &[i32; 2], usize) -> f64,
        ),
    )
}

/// Smallest distance from `key` to any item, optionally skipping items equal to it.
fn brute_force<T, D>(items: &[T], key: &T, metric: &D, skip: impl Fn(&T) -> bool) -> Option<D::Num>
where
    D: SquaredDistanceMetric<T>,
{
    items
        .iter()
        .filter(|item| !skip(item))
        .map(|item| metric.squared_distance(item, key))
        .fold(None, |best, d| match best {
            Some(best) if best <= d => Some(best),
            _ => Some(d),
        })
}

#[test]
fn test_empty() {
    init_logger();

    let tree = KDTree::try_new(&mut [], int2_params()).unwrap();
    assert!(tree.is_empty());
    assert_eq!(tree.num_items(), 0);
    assert_eq!(tree.nearest(&[1, 1]), None);
    assert_eq!(tree.nearest_excluding(&[1, 1]), None);

    // every numeric domain accepts an empty item set
    let tree = KDTree::try_new(&mut [], ParamBlock::<[f32; 2], _, _>::euclidean()).unwrap();
    assert_eq!(tree.nearest(&[0., 0.]), None);
    let params =
        ParamBlock::<[f32; 2], _, _>::new(2, ArrayComparator, SquaredEuclidean::<f32>::new());
    assert!(KDTree::try_new(&mut [], params).unwrap().is_empty());
    let params =
        ParamBlock::<[u32; 2], _, _>::new(2, ArrayComparator, SquaredEuclidean::<u64>::new());
    assert!(KDTree::try_new(&mut [], params).unwrap().is_empty());
    let params =
        ParamBlock::<[u16; 2], _, _>::new(2, ArrayComparator, SquaredEuclidean::<u32>::new());
    assert!(KDTree::try_new(&mut [], params).unwrap().is_empty());
}

#[test]
fn test_bogus_inputs() {
    init_logger();

    let mut items = [[1, 2], [3, 4]];

    let mut params = int2_params();
    params.k = 0;
    let err = KDTree::try_new(&mut items, params).unwrap_err();
    assert!(matches!(err, KDTreeError::InvalidArgument(_)));

    let err = KDTree::try_new(&mut items, int2_params().with_item_size(0)).unwrap_err();
    assert!(matches!(err, KDTreeError::InvalidArgument(_)));

    let err = KDTree::try_new(&mut items, int2_params().with_flags(0x4)).unwrap_err();
    assert!(matches!(err, KDTreeError::InvalidArgument(_)));

    // a recognized domain that does not match the metric's
    let err = KDTree::try_new(&mut items, int2_params().with_flags(INTEGRAL)).unwrap_err();
    assert!(matches!(err, KDTreeError::InvalidArgument(_)));

    // the items are left untouched by a rejected build
    assert_eq!(items, [[1, 2], [3, 4]]);
}

#[test]
fn test_simple() {
    init_logger();

    let mut input = [[1, 2], [3, 4], [5, 5]];
    let tree = KDTree::try_new(&mut input, int2_params()).unwrap();

    assert_eq!(tree.nearest_ex(&[3, 3], 0).unwrap(), Some(&[3, 4]));
    assert_eq!(tree.nearest_ex(&[1, 2], 0).unwrap(), Some(&[1, 2]));
    assert_eq!(tree.nearest_ex(&[1, 2], NOT_EQUAL).unwrap(), Some(&[3, 4]));
    assert_eq!(tree.nearest_ex(&[3, 4], NOT_EQUAL).unwrap(), Some(&[5, 5]));

    assert_eq!(tree.nearest(&[3, 3]), Some(&[3, 4]));
    assert_eq!(tree.nearest(&[1, 2]), Some(&[1, 2]));
}

#[test]
fn test_round_trip() {
    init_logger();

    let mut rng = StdRng::seed_from_u64(42);
    let points: Vec<[f64; 3]> = (0..500)
        .map(|_| {
            [
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
            ]
        })
        .collect();

    let mut items = points.clone();
    let tree = KDTree::try_new(&mut items, ParamBlock::euclidean()).unwrap();
    let metric = tree.params().metric();

    for point in &points {
        let found = tree.nearest(point).unwrap();
        assert_eq!(metric.squared_distance(found, point), 0.0);
    }
}

#[test]
fn test_walk_visits_every_node() {
    init_logger();

    let mut rng = StdRng::seed_from_u64(7);
    let mut items: Vec<[i32; 2]> = (0..777)
        .map(|_| [rng.gen_range(0..50), rng.gen_range(0..50)])
        .collect();
    let tree = KDTree::try_new(&mut items, int2_params()).unwrap();

    let mut count = 0;
    tree.walk(
        |depth, _| {
            assert!(depth < tree.height());
            count += 1;
            Ok::<(), ()>(())
        },
        0,
    )
    .unwrap();
    assert_eq!(count, 777);
}

fn check_against_brute_force<T, C, D>(points: &[T], queries: &[T], params: ParamBlock<T, C, D>)
where
    T: bytemuck::Pod + std::fmt::Debug,
    C: crate::kdtree::AxisComparator<T>,
    D: SquaredDistanceMetric<T>,
{
    let mut items = points.to_vec();
    let tree = KDTree::try_new(&mut items, params).unwrap();
    let params = tree.params();

    for key in queries {
        let found = tree.nearest(key).unwrap();
        let expected = brute_force(points, key, params.metric(), |_| false).unwrap();
        assert!(
            params.metric().squared_distance(found, key) == expected,
            "nearest to {:?} returned {:?}",
            key,
            found
        );

        let found = tree.nearest_excluding(key);
        let expected = brute_force(points, key, params.metric(), |item| {
            params.items_equal(item, key)
        });
        match (found, expected) {
            (Some(found), Some(expected)) => {
                assert!(!params.items_equal(found, key));
                assert!(
                    params.metric().squared_distance(found, key) == expected,
                    "nearest (excluding) to {:?} returned {:?}",
                    key,
                    found
                );
            }
            (None, None) => {}
            (found, expected) => panic!(
                "nearest (excluding) to {:?} returned {:?}, expected distance {:?}",
                key, found, expected
            ),
        }
    }
}

#[test]
fn test_double_domain_matches_brute_force() {
    init_logger();

    let mut rng = StdRng::seed_from_u64(1);
    let points: Vec<[f64; 2]> = (0..1000)
        .map(|_| [rng.gen_range(-180.0..180.0), rng.gen_range(-90.0..90.0)])
        .collect();
    let mut queries: Vec<[f64; 2]> = (0..200)
        .map(|_| [rng.gen_range(-200.0..200.0), rng.gen_range(-100.0..100.0)])
        .collect();
    queries.extend_from_slice(&points[..100]);

    check_against_brute_force(&points, &queries, ParamBlock::euclidean());
}

#[test]
fn test_single_domain_matches_brute_force() {
    init_logger();

    let mut rng = StdRng::seed_from_u64(2);
    let points: Vec<[f32; 4]> = (0..800)
        .map(|_| {
            [
                rng.gen_range(0.0..1.0),
                rng.gen_range(0.0..1.0),
                rng.gen_range(0.0..1.0),
                rng.gen_range(0.0..1.0),
            ]
        })
        .collect();
    let mut queries: Vec<[f32; 4]> = points.iter().step_by(7).copied().collect();
    queries.push([0.5, 0.5, 0.5, 0.5]);
    queries.push([2.0, -1.0, 0.0, 0.25]);

    let params = ParamBlock::new(4, ArrayComparator, SquaredEuclidean::<f32>::new());
    assert_eq!(params.flags(), SINGLE_PREC);
    check_against_brute_force(&points, &queries, params);
}

#[test]
fn test_uint64_domain_matches_brute_force() {
    init_logger();

    let mut rng = StdRng::seed_from_u64(3);
    let points: Vec<[u32; 3]> = (0..600)
        .map(|_| {
            [
                rng.gen_range(0..10_000),
                rng.gen_range(0..10_000),
                rng.gen_range(0..10_000),
            ]
        })
        .collect();
    let mut queries: Vec<[u32; 3]> = points.iter().step_by(5).copied().collect();
    queries.push([0, 0, 0]);
    queries.push([9_999, 0, 5_000]);

    let params = ParamBlock::new(3, ArrayComparator, SquaredEuclidean::<u64>::new());
    assert_eq!(params.flags(), INTEGRAL);
    check_against_brute_force(&points, &queries, params);
}

#[test]
fn test_uint32_domain_with_duplicates() {
    init_logger();

    // a small grid forces many exact duplicates and ties on every axis
    let mut rng = StdRng::seed_from_u64(4);
    let points: Vec<[u16; 2]> = (0..400)
        .map(|_| [rng.gen_range(0..16), rng.gen_range(0..16)])
        .collect();
    let mut queries = points.clone();
    for x in 0..17 {
        for y in 0..17 {
            queries.push([x, y]);
        }
    }

    let params = ParamBlock::new(2, ArrayComparator, SquaredEuclidean::<u32>::new());
    assert_eq!(params.flags(), INTEGRAL | SINGLE_PREC);
    check_against_brute_force(&points, &queries, params);
}

#[test]
fn test_exclude_exact_with_only_equal_item() {
    init_logger();

    let mut items = [[1, 1], [1, 1], [9, 9]];
    let tree = KDTree::try_new(&mut items, int2_params()).unwrap();
    assert_eq!(tree.nearest_excluding(&[1, 1]), Some(&[9, 9]));
    assert_eq!(tree.nearest_excluding(&[9, 9]), Some(&[1, 1]));

    let mut items = [[9, 9]];
    let tree = KDTree::try_new(&mut items, int2_params()).unwrap();
    assert_eq!(tree.nearest_excluding(&[9, 9]), None);
}

/// A geographic record: two indexed axes plus a payload the comparator ignores.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
struct City {
    lon: f32,
    lat: f32,
    id: u32,
}

// SAFETY: `City` is `repr(C)`, made only of `Pod` fields and has no padding.
unsafe impl bytemuck::Zeroable for City {}
unsafe impl bytemuck::Pod for City {}

fn city_params() -> ParamBlock<
    City,
    impl Fn(usize, &City, &City) -> Ordering,
    impl SquaredDistanceMetric<City, Num = f64>,
> {
    fn coord(city: &City, axis: usize) -> f64 {
        if axis == 0 {
            city.lon as f64
        } else {
            city.lat as f64
        }
    }

    ParamBlock::new(
        2,
        |axis: usize, a: &City, b: &City| coord(a, axis).total_cmp(&coord(b, axis)),
        DistanceFns::<f64, _, _>::new(
            |a: &City, b: &City| {
                let dx = coord(a, 0) - coord(b, 0);
                let dy = coord(a, 1) - coord(b, 1);
                dx * dx + dy * dy
            },
            |a: &City, b: &City, axis: usize| {
                let d = coord(a, axis) - coord(b, axis);
                d * d
            },
        ),
    )
}

#[test]
fn test_records_with_payload() {
    init_logger();

    let cities = [
        City { lon: -74.0, lat: 40.7, id: 1 },
        City { lon: -0.1, lat: 51.5, id: 2 },
        City { lon: 2.35, lat: 48.85, id: 3 },
        City { lon: 139.7, lat: 35.7, id: 4 },
        // same place as id 3, different payload
        City { lon: 2.35, lat: 48.85, id: 5 },
    ];

    let mut builder = KDTreeBuilder::new(city_params());
    builder.add_slice(&cities);
    let tree = builder.finish().unwrap();
    assert_eq!(tree.params().item_size(), 12);

    let key = City { lon: 2.3, lat: 48.9, id: 0 };
    let found = tree.nearest(&key).unwrap();
    assert!(found.id == 3 || found.id == 5);

    // equal on every axis means excluded, even though the payload differs
    let found = tree.nearest_excluding(&cities[2]).unwrap();
    assert_eq!(found.id, 2);

    let found = tree.nearest_excluding(&cities[1]).unwrap();
    assert!(found.id == 3 || found.id == 5);
}

#[test]
fn test_from_bytes() {
    init_logger();

    let points: [[i32; 2]; 3] = [[1, 2], [3, 4], [5, 5]];
    // offset by one byte so the records are not aligned for `i32`
    let mut buffer = vec![0u8];
    buffer.extend_from_slice(bytemuck::cast_slice(&points));

    let tree = KDTree::from_bytes(&buffer[1..], int2_params()).unwrap();
    assert_eq!(tree.num_items(), 3);
    assert_eq!(tree.nearest(&[3, 3]), Some(&[3, 4]));
    assert_eq!(tree.nearest_excluding(&[3, 4]), Some(&[5, 5]));

    let err = KDTree::from_bytes(&buffer[1..buffer.len() - 1], int2_params()).unwrap_err();
    assert!(matches!(err, KDTreeError::InvalidArgument(_)));

    let tree = KDTree::from_bytes(&[], int2_params()).unwrap();
    assert!(tree.is_empty());
}

#[test]
fn test_domains_are_consistent() {
    // the same points give the same answers whatever domain distances are computed in
    let mut rng = StdRng::seed_from_u64(5);
    let points: Vec<[u16; 2]> = (0..300)
        .map(|_| [rng.gen_range(0..1000), rng.gen_range(0..1000)])
        .collect();

    fn distances<M: MetricNum>(points: &[[u16; 2]], queries: &[[u16; 2]]) -> Vec<f64> {
        let mut items = points.to_vec();
        let params = ParamBlock::new(2, ArrayComparator, SquaredEuclidean::<M>::new());
        let tree = KDTree::try_new(&mut items, params).unwrap();
        let metric = SquaredEuclidean::<f64>::new();
        queries
            .iter()
            .map(|key| metric.squared_distance(tree.nearest(key).unwrap(), key))
            .collect()
    }

    let queries: Vec<[u16; 2]> = (0..50)
        .map(|_| [rng.gen_range(0..1000), rng.gen_range(0..1000)])
        .collect();
    let expected = distances::<f64>(&points, &queries);
    assert_eq!(distances::<f32>(&points, &queries), expected);
    assert_eq!(distances::<u64>(&points, &queries), expected);
    assert_eq!(distances::<u32>(&points, &queries), expected);
}

#[test]
fn test_extreme_signed_coordinates() {
    init_logger();

    let mut items = [[-100i8], [100i8]];
    let tree = KDTree::try_new(&mut items, ParamBlock::euclidean()).unwrap();
    assert_eq!(tree.nearest(&[-100]), Some(&[-100]));
    assert_eq!(tree.nearest(&[90]), Some(&[100]));
    assert_eq!(tree.nearest_excluding(&[-100]), Some(&[100]));

    let mut items = [[i32::MIN, i32::MAX], [i32::MAX, i32::MIN], [0, 0]];
    let tree = KDTree::try_new(&mut items, ParamBlock::euclidean()).unwrap();
    assert_eq!(tree.nearest(&[i32::MIN, i32::MIN]), Some(&[0, 0]));
    // both corners tie, either is fine
    let found = tree.nearest_excluding(&[0, 0]).unwrap();
    assert_ne!(found, &[0, 0]);
    assert_eq!(tree.nearest(&[i32::MAX, i32::MIN + 1]), Some(&[i32::MAX, i32::MIN]));
}

#[test]
fn test_fractional_coordinates_in_integral_domain() {
    init_logger();

    // 0.4 apart must not collapse to distance zero
    let mut items = [[0.0f64, 0.0], [0.4, 0.0], [5.0, 5.0]];
    let params = ParamBlock::new(2, ArrayComparator, SquaredEuclidean::<u64>::new());
    let tree = KDTree::try_new(&mut items, params).unwrap();
    assert_eq!(tree.nearest(&[0.0, 0.0]), Some(&[0.0, 0.0]));
    assert_eq!(tree.nearest_excluding(&[0.0, 0.0]), Some(&[0.4, 0.0]));
    assert_eq!(tree.params().metric().squared_distance(&[0.0, 0.0], &[0.4, 0.0]), 1);
}
