//! Tests for the construction-time distance cache.

use super::dist_cache::DistanceCache;

#[test]
fn miss_computes_then_hit_serves_cached() {
    let mut cache = DistanceCache::new(16);

    let mut calls = 0;
    let d = cache.get_or_compute(1, 2, || {
        calls += 1;
        0.25
    });
    assert!((d - 0.25).abs() < f32::EPSILON);
    assert_eq!(calls, 1);

    let d = cache.get_or_compute(1, 2, || {
        calls += 1;
        0.99
    });
    assert!((d - 0.25).abs() < f32::EPSILON, "hit must return cached value");
    assert_eq!(calls, 1);
    assert_eq!(cache.hits(), 1);
    assert_eq!(cache.lookups(), 2);
}

#[test]
fn keying_is_order_insensitive() {
    let mut cache = DistanceCache::new(16);
    cache.get_or_compute(7, 3, || 0.5);
    let d = cache.get_or_compute(3, 7, || 1.5);
    assert!((d - 0.5).abs() < f32::EPSILON);
    assert_eq!(cache.hits(), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn capacity_bounds_retention_not_results() {
    let mut cache = DistanceCache::new(2);
    cache.get_or_compute(0, 1, || 0.1);
    cache.get_or_compute(0, 2, || 0.2);
    let d = cache.get_or_compute(0, 3, || 0.3);
    assert!((d - 0.3).abs() < f32::EPSILON);
    assert_eq!(cache.len(), 2, "full cache retains nothing new");
}

#[test]
fn resize_without_preserve_drops_entries() {
    let mut cache = DistanceCache::new(16);
    cache.get_or_compute(0, 1, || 0.1);
    cache.get_or_compute(0, 2, || 0.2);

    cache.resize(32, false);
    assert!(cache.is_empty());
    assert_eq!(cache.capacity(), 32);
    // Counters survive the wipe.
    assert_eq!(cache.lookups(), 2);
}

#[test]
fn resize_with_preserve_keeps_entries() {
    let mut cache = DistanceCache::new(16);
    cache.get_or_compute(0, 1, || 0.1);

    cache.resize(8, true);
    let d = cache.get_or_compute(1, 0, || 9.0);
    assert!((d - 0.1).abs() < f32::EPSILON);
}

#[test]
fn hit_rate_is_bounded_and_monotone_under_repeats() {
    let mut cache = DistanceCache::new(16);
    assert!((cache.hit_rate() - 0.0).abs() < f64::EPSILON);

    cache.get_or_compute(0, 1, || 0.1);
    let mut previous = cache.hit_rate();
    for _ in 0..10 {
        cache.get_or_compute(0, 1, || 0.1);
        let rate = cache.hit_rate();
        assert!((0.0..=1.0).contains(&rate));
        assert!(rate >= previous);
        previous = rate;
    }
}

#[test]
fn zero_capacity_cache_computes_every_time() {
    let mut cache = DistanceCache::new(0);
    let mut calls = 0;
    for _ in 0..3 {
        cache.get_or_compute(4, 5, || {
            calls += 1;
            0.7
        });
    }
    assert_eq!(calls, 3);
    assert!(cache.is_empty());
}
