//! Concurrent query tests for the spatial index.
//!
//! A shared `SpatialIndex` must answer queries from many threads exactly as
//! it does serially.
//!
//! Run with: `cargo test --test index_concurrency`

use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lightscout::index::{LightRecord, NearbyLight, SpatialIndex};

const THREADS: usize = 8;
const QUERIES_PER_THREAD: usize = 200;

/// Random lights scattered around a city-sized area.
fn random_index(rng: &mut StdRng, count: usize) -> SpatialIndex {
    let records = (0..count)
        .map(|i| {
            LightRecord::new(
                i as i64,
                45.0 + rng.random_range(-0.2..0.2),
                -75.0 + rng.random_range(-0.3..0.3),
            )
        })
        .collect();
    SpatialIndex::from_records(records).unwrap()
}

#[derive(Debug, Clone, Copy)]
struct QueryCase {
    lat: f64,
    lon: f64,
    radius_m: f64,
    heading: Option<f64>,
    cone_deg: f64,
}

fn random_queries(rng: &mut StdRng, count: usize) -> Vec<QueryCase> {
    (0..count)
        .map(|_| QueryCase {
            lat: 45.0 + rng.random_range(-0.2..0.2),
            lon: -75.0 + rng.random_range(-0.3..0.3),
            radius_m: rng.random_range(100.0..3000.0),
            heading: rng.random_bool(0.7).then(|| rng.random_range(0.0..360.0)),
            cone_deg: rng.random_range(10.0..180.0),
        })
        .collect()
}

fn run(index: &SpatialIndex, case: &QueryCase) -> Vec<NearbyLight> {
    index
        .query(case.lat, case.lon, case.radius_m, case.heading, case.cone_deg)
        .unwrap()
}

#[test]
fn test_parallel_queries_match_serial() {
    let mut rng = StdRng::seed_from_u64(0x5ca1ab1e);
    let index = Arc::new(random_index(&mut rng, 5_000));
    let queries = Arc::new(random_queries(&mut rng, THREADS * QUERIES_PER_THREAD));

    let expected: Vec<Vec<NearbyLight>> = queries.iter().map(|q| run(&index, q)).collect();
    assert!(expected.iter().any(|r| !r.is_empty()));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let index = Arc::clone(&index);
            let queries = Arc::clone(&queries);
            thread::spawn(move || {
                let range = t * QUERIES_PER_THREAD..(t + 1) * QUERIES_PER_THREAD;
                range
                    .map(|i| (i, run(&index, &queries[i])))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for (i, result) in handle.join().unwrap() {
            assert_eq!(result, expected[i], "query {} differs", i);
        }
    }
}

#[test]
fn test_all_threads_query_same_point() {
    let mut rng = StdRng::seed_from_u64(7);
    let index = Arc::new(random_index(&mut rng, 2_000));
    let case = QueryCase {
        lat: 45.0,
        lon: -75.0,
        radius_m: 5_000.0,
        heading: Some(45.0),
        cone_deg: 90.0,
    };
    let expected = run(&index, &case);

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                (0..QUERIES_PER_THREAD)
                    .map(|_| run(&index, &case))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for result in handle.join().unwrap() {
            assert_eq!(result, expected);
        }
    }
}
