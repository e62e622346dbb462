use light_curve_transit::*;
use light_curve_transit_test_util::SINGLE_TRANSIT_LIGHT_CURVE;

use tempfile::tempdir;

fn search() -> TransitSearch {
    let mut search = TransitSearch::default();
    search
        .grid
        .set_period_range(1.0, 5.5)
        .set_log_spread(0.15, 0.15)
        .set_n_duty_cycles(5);
    search.extraction.max_detections = 2;
    search
}

#[test]
fn cached_run_is_idempotent() {
    let (t, flux, flux_err) = &*SINGLE_TRANSIT_LIGHT_CURVE;
    let series = FluxSeries::new(t, flux, flux_err).unwrap();
    let dir = tempdir().unwrap();
    let cache = CsvResultCache::new(dir.path());

    let first = search().run_cached("synthetic-1", &series, &cache).unwrap();
    assert!(first.periodogram.is_some());
    assert!(!first.detections.is_empty());
    assert!(cache.contains("synthetic-1").unwrap());

    let second = search().run_cached("synthetic-1", &series, &cache).unwrap();
    // loaded from the cache, no search is done
    assert!(second.periodogram.is_none());
    assert_eq!(first.detections.len(), second.detections.len());
    for (a, b) in first.detections.iter().zip(second.detections.iter()) {
        assert_eq!(a.period.to_bits(), b.period.to_bits());
        assert_eq!(a.epoch.to_bits(), b.epoch.to_bits());
        assert_eq!(a.duration_hours.to_bits(), b.duration_hours.to_bits());
        assert_eq!(a.depth_ppt.to_bits(), b.depth_ppt.to_bits());
        assert_eq!(a.sde.to_bits(), b.sde.to_bits());
        assert_eq!(a.fap.to_bits(), b.fap.to_bits());
        assert_eq!(a, b);
    }
}

#[test]
fn stored_record_is_returned_unchanged() {
    let (t, flux, flux_err) = &*SINGLE_TRANSIT_LIGHT_CURVE;
    let series = FluxSeries::new(t, flux, flux_err).unwrap();
    let dir = tempdir().unwrap();
    let cache = CsvResultCache::new(dir.path());

    let stored = vec![DetectionResult {
        period: 1.234,
        epoch: 0.5,
        duration_hours: 1.0,
        depth_ppt: 3.0,
        sde: 8.0,
        fap: 1e-3,
        duty_cycle: 0.03,
        period_uncertainty: 1e-3,
        transit_count: 4,
    }];
    cache.store("precomputed", &stored).unwrap();
    let outcome = search().run_cached("precomputed", &series, &cache).unwrap();
    assert_eq!(outcome.detections, stored);
}

#[test]
fn failed_run_is_not_cached() {
    let (t, flux, flux_err) = &*SINGLE_TRANSIT_LIGHT_CURVE;
    let series = FluxSeries::new(t, flux, flux_err).unwrap();
    let dir = tempdir().unwrap();
    let cache = CsvResultCache::new(dir.path());

    let mut search = search();
    search.grid.set_duration_range_hours(Some(0.1), None);
    assert!(matches!(
        search.run_cached("bad-config", &series, &cache),
        Err(CacheError::Search(SearchError::UnresolvableDuration { .. }))
    ));
    assert!(!cache.contains("bad-config").unwrap());
}

#[test]
fn invalid_run_id() {
    let (t, flux, flux_err) = &*SINGLE_TRANSIT_LIGHT_CURVE;
    let series = FluxSeries::new(t, flux, flux_err).unwrap();
    let dir = tempdir().unwrap();
    let cache = CsvResultCache::new(dir.path());
    assert!(matches!(
        search().run_cached("../outside", &series, &cache),
        Err(CacheError::InvalidRunId(_))
    ));
}
