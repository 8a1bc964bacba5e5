//! Dashed lines drawn as a row of small square marks.
//!
//! A line of length `L` with mark size `m` and gap `g` gets
//! `floor(L / (m + g))` marks spaced evenly from the start point, plus one
//! trailing mark on the end point.

use crate::canvas::{Canvas, Cursor, PaintMode};

/// Mark size used for the ticket ornaments, in millimetres.
pub const MARK_SIZE: f32 = 0.1;
/// Gap between marks, in millimetres.
pub const GAP_LENGTH: f32 = 0.5;

const STEP_TOLERANCE: f64 = 1e-5;

/// Centre points of the marks for a dashed line from `(x1, y1)` to `(x2, y2)`.
pub fn dash_marks(x1: f32, y1: f32, x2: f32, y2: f32, mark_size: f32, gap_length: f32) -> Vec<(f32, f32)> {
    let dx = x2 - x1;
    let dy = y2 - y1;
    // f32 inputs like 0.1 + 0.5 land a hair off the decimal step, so exact
    // multiples of the step are counted in f64 with a relative tolerance
    let length = f64::from(dx).hypot(f64::from(dy));
    let step = f64::from(mark_size) + f64::from(gap_length);

    let segments = if length.is_finite() && length > 0.0 && step > 0.0 {
        let ratio = length / step;
        (ratio * (1.0 + STEP_TOLERANCE)).floor() as usize
    } else {
        0
    };

    let mut marks = Vec::with_capacity(segments + 1);
    for i in 0..segments {
        let t = i as f32 / segments as f32;
        marks.push((x1 + dx * t, y1 + dy * t));
    }
    marks.push((x2, y2));
    marks
}

/// Draw a dashed line with filled-and-outlined square marks in the cursor's
/// fill and draw colours.
pub fn dashed_line(
    canvas: &mut Canvas<'_>,
    cursor: Cursor,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    mark_size: f32,
    gap_length: f32,
) -> Cursor {
    let half = mark_size / 2.0;
    for (x, y) in dash_marks(x1, y1, x2, y2, mark_size, gap_length) {
        canvas.rect(cursor, x - half, y - half, mark_size, mark_size, PaintMode::FillStroke);
    }
    cursor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::FontAssets;
    use crate::canvas::DrawOp;

    #[test]
    fn test_mark_count_horizontal() {
        // L = 10, step 0.6 -> floor(16.67) = 16 interior marks + trailing
        let marks = dash_marks(10.0, 50.0, 20.0, 50.0, 0.1, 0.5);
        assert_eq!(marks.len(), 16 + 1);
        assert_eq!(marks[0], (10.0, 50.0));
        assert_eq!(*marks.last().unwrap(), (20.0, 50.0));
    }

    #[test]
    fn test_mark_count_diagonal() {
        // 3-4-5 triangle, L = 5 -> floor(8.33) = 8
        let marks = dash_marks(0.0, 0.0, 3.0, 4.0, 0.1, 0.5);
        assert_eq!(marks.len(), 8 + 1);
        for (x, y) in &marks {
            assert!((y - x * 4.0 / 3.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_exact_multiples_of_step() {
        // 9.0 / 0.6 must give 15, not 14
        assert_eq!(dash_marks(0.0, 0.0, 9.0, 0.0, MARK_SIZE, GAP_LENGTH).len(), 15 + 1);

        for k in 1..=400u32 {
            let length = 0.6 * k as f32;
            let marks = dash_marks(0.0, 0.0, length, 0.0, MARK_SIZE, GAP_LENGTH);
            assert_eq!(marks.len(), k as usize + 1, "length {length}");

            let vertical = dash_marks(50.0, 10.0, 50.0, 10.0 + length, MARK_SIZE, GAP_LENGTH);
            assert_eq!(vertical.len(), k as usize + 1, "vertical length {length}");
        }
    }

    #[test]
    fn test_just_short_of_a_step_rounds_down() {
        assert_eq!(dash_marks(0.0, 0.0, 0.59, 0.0, MARK_SIZE, GAP_LENGTH).len(), 1);
        assert_eq!(dash_marks(0.0, 0.0, 8.99, 0.0, MARK_SIZE, GAP_LENGTH).len(), 14 + 1);
    }

    #[test]
    fn test_zero_length_is_single_mark() {
        assert_eq!(dash_marks(5.0, 5.0, 5.0, 5.0, 0.1, 0.5), vec![(5.0, 5.0)]);
    }

    #[test]
    fn test_degenerate_step_does_not_divide_by_zero() {
        assert_eq!(dash_marks(0.0, 0.0, 10.0, 0.0, 0.0, 0.0), vec![(10.0, 0.0)]);
    }

    #[test]
    fn test_dashed_line_draws_square_marks() {
        let fonts = FontAssets::builtin();
        let (mut canvas, cursor) = Canvas::new(&fonts);

        dashed_line(&mut canvas, cursor, 100.0, 10.0, 100.0, 16.0, MARK_SIZE, GAP_LENGTH);
        let doc = canvas.finish();

        let expected = dash_marks(100.0, 10.0, 100.0, 16.0, MARK_SIZE, GAP_LENGTH).len();
        assert_eq!(doc.pages[0].ops.len(), expected);
        for op in &doc.pages[0].ops {
            match op {
                DrawOp::Rect { w, h, mode, .. } => {
                    assert_eq!((*w, *h), (MARK_SIZE, MARK_SIZE));
                    assert_eq!(*mode, PaintMode::FillStroke);
                }
                other => panic!("unexpected op {other:?}"),
            }
        }
    }
}
