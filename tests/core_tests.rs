// tests/core_tests.rs
use std::time::Duration;
use trailblazer_core::bearing::{summarize, BearingEma};
use trailblazer_core::navigation::{hold_for_spread, Decision, EndReason, Observation};
use trailblazer_core::{NavigationConfig, NavigationState, Region, ScaleRange, ScreenPoint, ScreenSize};

#[test]
fn test_circular_stats_reference_sets() {
    let same = summarize(&[0.0, 0.0, 0.0]).unwrap();
    assert_eq!(same.mean, Some(0.0));
    assert!(same.std_dev < 0.1);

    let opposite = summarize(&[0.0, 180.0]).unwrap();
    assert_eq!(opposite.mean, None);

    let across_north = summarize(&[350.0, 10.0]).unwrap();
    let mean = across_north.mean.unwrap();
    assert!(mean < 1e-6 || mean > 360.0 - 1e-6, "mean {mean}");

    assert!(summarize(&[]).is_none());
}

#[test]
fn test_ema_moves_forward_through_north() {
    let mut ema = BearingEma::seeded(0.35, 350.0);
    let v = ema.update(10.0);
    assert!((v - 357.0).abs() < 1e-9, "ema {v}");
}

#[test]
fn test_region_clamping() {
    let screen = ScreenSize::new(1920, 1080);

    let r = Region::new(-50, -20, 300, 200).clamp_to(screen);
    assert_eq!((r.x, r.y, r.width, r.height), (0, 0, 300, 200));

    let r = Region::new(1900, 1000, 500, 500).clamp_to(screen);
    assert_eq!((r.x, r.y, r.width, r.height), (1900, 1000, 20, 80));

    let r = Region::new(5000, 5000, 10, 10).clamp_to(screen);
    assert!(r.width >= 1 && r.height >= 1);
    assert_eq!((r.x, r.y), (1919, 1079));

    let around = Region::square_around(ScreenPoint::new(100.0, 100.0), 140.0).clamp_to(screen);
    assert_eq!((around.x, around.y), (0, 0));
}

#[test]
fn test_scale_range_is_linear() {
    let scales = ScaleRange::default().to_vec();
    assert_eq!(scales.len(), 7);
    assert!((scales[0] - 0.8).abs() < 1e-12);
    assert!((scales[3] - 1.0).abs() < 1e-12);
    assert!((scales[6] - 1.2).abs() < 1e-12);

    assert_eq!(ScaleRange::new(0.9, 1.1, 1).unwrap().to_vec(), vec![0.9]);
    assert!(ScaleRange::new(1.2, 0.8, 3).is_err());
}

#[test]
fn test_hold_time_interpolates_between_thresholds() {
    let cfg = NavigationConfig::default();
    assert_eq!(hold_for_spread(0.0, &cfg), cfg.max_hold());
    assert_eq!(hold_for_spread(90.0, &cfg), cfg.min_hold());

    let mid = hold_for_spread((cfg.stable_std_deg + cfg.relock_std_deg) / 2.0, &cfg);
    assert!(mid > cfg.min_hold() && mid < cfg.max_hold());
}

#[test]
fn test_session_without_beacon_is_bounded() {
    let cfg = NavigationConfig::default();
    let mut state = NavigationState::begin(90.0, Duration::ZERO, &cfg);

    // One sampling window plus the cycle pause between observations
    let per_cycle = cfg.sample_window() + cfg.cycle_pause();
    let mut decisions = Vec::new();
    let mut now = Duration::ZERO;
    for _ in 0..20 {
        now += cfg.sample_window();
        let decision = state.observe(Observation::NoBeacon, now, &cfg);
        decisions.push(decision);
        if matches!(decision, Decision::End(_)) {
            break;
        }
        now += cfg.cycle_pause();
    }

    assert_eq!(decisions.len() as u32, cfg.miss_tolerance + 1);
    assert!(state.elapsed(now) <= per_cycle * (cfg.miss_tolerance + 1));
    assert_eq!(decisions.last(), Some(&Decision::End(EndReason::BeaconGone)));
    assert!(state.is_finished());
    assert_eq!(state.drags(), 0);
}
