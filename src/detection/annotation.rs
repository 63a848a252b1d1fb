use image::{Luma, Pixel, Rgb};
use imageproc::drawing::{Canvas, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::models::{Contour, WorkingFrame, ZoneDefinition};

pub const OVERLAY_COLOR: Rgb<u8> = Rgb([29, 233, 182]);
pub const CONTOUR_THICKNESS: i32 = 3;
pub const ZONE_THICKNESS: u32 = 2;

/// Stroke every contour as a closed polyline.
pub fn draw_contours(frame: &mut WorkingFrame, contours: &[Contour]) {
    let luma = OVERLAY_COLOR.to_luma()[0];
    match frame {
        WorkingFrame::Gray(img) => contours.iter().for_each(|c| stroke_contour(img, c, Luma([luma]))),
        WorkingFrame::Color(img) => contours.iter().for_each(|c| stroke_contour(img, c, OVERLAY_COLOR)),
        WorkingFrame::Laplacian(img) => {
            contours.iter().for_each(|c| stroke_contour(img, c, Luma([i16::from(luma)])))
        }
    }
}

/// Outline a zone rectangle.
pub fn draw_zone(frame: &mut WorkingFrame, zone: &ZoneDefinition) {
    let luma = OVERLAY_COLOR.to_luma()[0];
    match frame {
        WorkingFrame::Gray(img) => outline_zone(img, zone, Luma([luma])),
        WorkingFrame::Color(img) => outline_zone(img, zone, OVERLAY_COLOR),
        WorkingFrame::Laplacian(img) => outline_zone(img, zone, Luma([i16::from(luma)])),
    }
}

fn stroke_contour<C>(canvas: &mut C, contour: &Contour, color: C::Pixel)
where
    C: Canvas,
    C::Pixel: 'static,
{
    let points = contour.points();
    let half = CONTOUR_THICKNESS / 2;
    for (i, &(ax, ay)) in points.iter().enumerate() {
        let (bx, by) = points[(i + 1) % points.len()];
        for oy in -half..=half {
            for ox in -half..=half {
                draw_line_segment_mut(
                    canvas,
                    ((ax + ox) as f32, (ay + oy) as f32),
                    ((bx + ox) as f32, (by + oy) as f32),
                    color,
                );
            }
        }
    }
}

fn outline_zone<C>(canvas: &mut C, zone: &ZoneDefinition, color: C::Pixel)
where
    C: Canvas,
    C::Pixel: 'static,
{
    for inset in 0..ZONE_THICKNESS {
        let width = zone.width().saturating_sub(2 * inset);
        let height = zone.height().saturating_sub(2 * inset);
        if width == 0 || height == 0 {
            break;
        }
        let rect = Rect::at((zone.x1 + inset) as i32, (zone.y1 + inset) as i32).of_size(width, height);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}
