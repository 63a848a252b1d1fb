use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};

use crate::models::Contour;

/// Outer boundaries of the top-level components of a binary edge map,
/// in raster discovery order. Holes and nested borders are dropped.
pub fn find_external_contours(edges: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(edges)
        .into_iter()
        .filter(|c| c.parent.is_none() && c.border_type == BorderType::Outer)
        .map(|c| Contour::new(c.points.into_iter().map(|p| (p.x, p.y)).collect()))
        .filter(|c| !c.is_empty())
        .collect()
}

/// Minimum Euclidean distance over the full cross product of two point sets.
/// `None` if either set is empty.
pub fn min_distance(a: &Contour, b: &Contour) -> Option<f64> {
    let mut best: Option<i64> = None;
    for &(ax, ay) in a.points() {
        for &(bx, by) in b.points() {
            let dx = i64::from(ax - bx);
            let dy = i64::from(ay - by);
            let d2 = dx * dx + dy * dy;
            if best.is_none_or(|b| d2 < b) {
                best = Some(d2);
            }
        }
    }
    best.map(|d2| (d2 as f64).sqrt())
}

/// Gap between the first and second contour in extraction order.
pub fn gap_between_first_two(contours: &[Contour]) -> Option<f64> {
    match contours {
        [first, second, ..] => min_distance(first, second),
        _ => None,
    }
}
