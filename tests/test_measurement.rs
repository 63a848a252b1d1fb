//! Integration tests for contour extraction and zone gap measurement.

mod common;

use gluegap::config::{Calibration, EdgeThresholds};
use gluegap::detection::contours::{find_external_contours, gap_between_first_two, min_distance};

use common::*;

fn measurer(width: u32, height: u32, zones: Vec<ZoneDefinition>) -> ZoneContourMeasurer {
    ZoneContourMeasurer::new(zone_set(width, height, zones), EdgeThresholds::default(), Calibration::default())
}

#[test]
fn test_min_distance_is_symmetric() {
    let a = Contour::new(vec![(0, 0), (3, 4), (12, 12)]);
    let b = Contour::new(vec![(6, 8), (20, 1), (-5, 2)]);

    let ab = min_distance(&a, &b).unwrap();
    let ba = min_distance(&b, &a).unwrap();
    assert_eq!(ab, ba);
    assert!((ab - 5.0).abs() < 1e-12);
}

#[test]
fn test_min_distance_of_empty_set_is_undefined() {
    let a = Contour::new(vec![(1, 1)]);
    assert_eq!(min_distance(&a, &Contour::default()), None);
    assert_eq!(gap_between_first_two(&[a]), None);
    assert_eq!(gap_between_first_two(&[]), None);
}

#[test]
fn test_gap_uses_first_two_contours_only() {
    let first = Contour::new(vec![(0, 0)]);
    let second = Contour::new(vec![(0, 30)]);
    let third = Contour::new(vec![(0, 1)]);
    assert_eq!(gap_between_first_two(&[first, second, third]), Some(30.0));
}

#[test]
fn test_external_contours_of_two_outlines() {
    let mut edges = black_gray(100, 60);
    outline(&mut edges, 10, 10, 20, 40);
    outline(&mut edges, 40, 10, 50, 40);

    let contours = find_external_contours(&edges);
    assert_eq!(contours.len(), 2);
    // Raster order: the left outline is met first
    assert_eq!(contours[0].bounds(), Some((10, 10, 20, 40)));
    assert_eq!(contours[1].bounds(), Some((40, 10, 50, 40)));
    assert_eq!(gap_between_first_two(&contours), Some(20.0));
}

#[test]
fn test_external_contours_skip_nested_borders() {
    let mut edges = black_gray(100, 100);
    outline(&mut edges, 10, 10, 80, 80);
    outline(&mut edges, 30, 30, 50, 50);

    let contours = find_external_contours(&edges);
    assert_eq!(contours.len(), 1);
    assert_eq!(contours[0].bounds(), Some((10, 10, 80, 80)));
}

#[test]
fn test_contour_translation() {
    let c = Contour::new(vec![(0, 0), (2, 3)]);
    assert_eq!(c.translated(10, 20).points(), &[(10, 20), (12, 23)]);
}

#[test]
fn test_blank_zone_is_undefined() {
    let m = measurer(200, 100, vec![ZoneDefinition::new(ZoneLabel::Left, 0, 0, 200, 100)]);
    let gray = black_gray(200, 100);

    let result = m.measure_zone(&gray, &m.zones().zones()[0]);
    assert_eq!(result.measurement.contour_count, 0);
    assert_eq!(result.measurement.distance_px, None);
    assert_eq!(result.measurement.distance_mm, None);
}

#[test]
fn test_single_contour_zone_is_undefined() {
    let m = measurer(200, 100, vec![ZoneDefinition::new(ZoneLabel::Top, 0, 0, 200, 100)]);
    let mut gray = black_gray(200, 100);
    fill_white(&mut gray, 80, 30, 120, 70);

    let result = m.measure_zone(&gray, &m.zones().zones()[0]);
    assert_eq!(result.measurement.contour_count, 1);
    assert!(!result.measurement.is_defined());
}

#[test]
fn test_two_bars_gap_end_to_end() {
    let m = measurer(400, 300, vec![ZoneDefinition::new(ZoneLabel::Left, 0, 0, 200, 300)]);
    let mut frame = WorkingFrame::Gray(two_bars_frame());

    let report = m.measure(&mut frame);
    let left = report.get(ZoneLabel::Left).unwrap();

    assert_eq!(left.contour_count, 2);
    let px = left.distance_px.unwrap();
    let mm = left.distance_mm.unwrap();
    assert!((px - 90.0).abs() <= 3.0, "distance {px}");
    assert!((mm - 18.0).abs() <= 0.6, "distance {mm} mm");
    assert!((mm / 0.2 - px).abs() < 1e-9);
}

#[test]
fn test_contours_are_reported_in_frame_coordinates() {
    let m = measurer(400, 300, vec![ZoneDefinition::new(ZoneLabel::Right, 100, 20, 300, 280)]);
    let gray = two_bars_frame();

    let result = m.measure_zone(&gray, &m.zones().zones()[0]);
    assert_eq!(result.contours.len(), 1);
    let (min_x, min_y, max_x, max_y) = result.contours[0].bounds().unwrap();
    assert!((145..=152).contains(&min_x), "min_x {min_x}");
    assert!((157..=164).contains(&max_x), "max_x {max_x}");
    assert!((45..=52).contains(&min_y), "min_y {min_y}");
    assert!((247..=254).contains(&max_y), "max_y {max_y}");
}

#[test]
fn test_scale_follows_calibration() {
    let zones = zone_set(400, 300, vec![ZoneDefinition::new(ZoneLabel::Left, 0, 0, 200, 300)]);
    let m = ZoneContourMeasurer::new(zones, EdgeThresholds::default(), Calibration { mm_per_px: 0.5 });

    let result = m.measure_zone(&two_bars_frame(), &m.zones().zones()[0]);
    let px = result.measurement.distance_px.unwrap();
    assert_eq!(result.measurement.distance_mm, Some(px * 0.5));
}

#[test]
fn test_report_follows_zone_order() {
    let zones = vec![
        ZoneDefinition::new(ZoneLabel::Bottom, 0, 200, 400, 300),
        ZoneDefinition::new(ZoneLabel::Top, 0, 0, 400, 100),
        ZoneDefinition::new(ZoneLabel::Right, 200, 0, 400, 300),
        ZoneDefinition::new(ZoneLabel::Left, 0, 0, 200, 300),
    ];
    let m = measurer(400, 300, zones);
    let mut frame = WorkingFrame::Gray(black_gray(400, 300));

    let report = m.measure(&mut frame);
    let labels: Vec<ZoneLabel> = report.iter().map(|m| m.zone).collect();
    assert_eq!(labels, ZoneLabel::ALL.to_vec());
    assert!(report.iter().all(|m| m.distance_px.is_none()));
}

#[test]
fn test_overlapping_zones_ignore_each_others_overlay() {
    let zones = vec![
        ZoneDefinition::new(ZoneLabel::Left, 0, 0, 200, 150),
        ZoneDefinition::new(ZoneLabel::Right, 100, 50, 300, 200),
        ZoneDefinition::new(ZoneLabel::Top, 150, 100, 350, 250),
    ];
    let m = measurer(400, 300, zones);
    let mut frame = WorkingFrame::Gray(black_gray(400, 300));

    let report = m.measure(&mut frame);
    assert!(report.iter().all(|m| m.contour_count == 0), "{report}");
    // The rectangles were drawn, so they really cross the other zones
    assert_ne!(frame, WorkingFrame::Gray(black_gray(400, 300)));
}

#[test]
fn test_overlapping_zones_match_independent_measurement() {
    let zones = vec![
        ZoneDefinition::new(ZoneLabel::Left, 0, 0, 200, 300),
        ZoneDefinition::new(ZoneLabel::Right, 100, 20, 300, 280),
    ];
    let m = measurer(400, 300, zones);
    let gray = two_bars_frame();
    let mut frame = WorkingFrame::Gray(gray.clone());

    let report = m.measure(&mut frame);
    for zone in m.zones().zones() {
        let alone = m.measure_zone(&gray, zone).measurement;
        assert_eq!(report.get(zone.label), Some(&alone), "zone {}", zone.label);
    }
}
