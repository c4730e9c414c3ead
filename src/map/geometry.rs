use glam::IVec2;

use crate::braille::BrailleCanvas;
use crate::geo::Coordinate;
use crate::map::projection::Viewport;

/// Bresenham segment between two pixel positions, end points included
pub fn draw_segment(canvas: &mut BrailleCanvas, from: IVec2, to: IVec2) {
    let delta = (to - from).abs();
    let step = (to - from).signum();
    let mut err = delta.x - delta.y;
    let mut at = from;

    loop {
        canvas.set_pixel(at.x, at.y);
        if at == to {
            break;
        }
        let e2 = 2 * err;
        if e2 > -delta.y {
            err -= delta.y;
            at.x += step.x;
        }
        if e2 < delta.x {
            err += delta.x;
            at.y += step.y;
        }
    }
}

/// Project and draw a coordinate line.
///
/// Segments wholly outside the viewport are skipped, as are jumps wider than
/// the canvas, which only happen when a line crosses the antimeridian.
pub fn draw_polyline(canvas: &mut BrailleCanvas, line: &[Coordinate], viewport: &Viewport) {
    let max_jump = (viewport.width.max(1) * 2) as i32;
    let projected = line.iter().map(|&c| IVec2::from(viewport.project(c)));

    let mut prev: Option<IVec2> = None;
    for point in projected {
        if let Some(last) = prev {
            if (point.x - last.x).abs() < max_jump
                && viewport.line_might_be_visible(last.into(), point.into())
            {
                draw_segment(canvas, last, point);
            }
        }
        prev = Some(point);
    }
}

/// A pin: ring of `radius` with its centre dot lit
pub fn draw_pin(canvas: &mut BrailleCanvas, centre: IVec2, radius: i32) {
    let outer = radius * radius;
    let inner = (radius - 1).max(0).pow(2);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let d = dx * dx + dy * dy;
            if d <= outer && (d > inner || d == 0) {
                canvas.set_pixel(centre.x + dx, centre.y + dy);
            }
        }
    }
}
