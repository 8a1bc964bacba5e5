//! Page/cursor state machine.
//!
//! Coordinates are millimetres on an A4 portrait page with the origin at the
//! top-left corner. Every primitive takes the current [`Cursor`] by value and
//! hands back the updated one, and records its drawing operations on the
//! current page of the [`Document`]. Nothing is rendered to PDF here; see
//! `pdf::write_document` for that.

use crate::assets::{FontAssets, FontFace};
use crate::font_metrics::PT_TO_MM;

// ============================================================================
// CONSTANTS
// ============================================================================

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const MARGIN_LEFT: f32 = 10.0;
pub const MARGIN_RIGHT: f32 = 10.0;
pub const MARGIN_TOP: f32 = 7.0;
/// Horizontal padding between a cell's edge and its text.
pub const CELL_PADDING: f32 = 1.0;
/// Marks text cut short by [`Canvas::wrap_clamped`].
pub const ELLIPSIS: &str = "...";

// ============================================================================
// STYLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const GREY: Color = Color::rgb(240, 240, 240);
    pub const MUTED: Color = Color::rgb(110, 110, 110);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintMode {
    Fill,
    Stroke,
    FillStroke,
}

/// Drawing position and active style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub x: f32,
    pub y: f32,
    pub face: FontFace,
    /// Font size in points
    pub size: f32,
    pub text_color: Color,
    pub fill_color: Color,
    pub draw_color: Color,
    /// Stroke width in millimetres
    pub line_width: f32,
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor {
            x: MARGIN_LEFT,
            y: MARGIN_TOP,
            face: FontFace::Regular,
            size: 10.0,
            text_color: Color::BLACK,
            fill_color: Color::BLACK,
            draw_color: Color::BLACK,
            line_width: 0.2,
        }
    }
}

impl Cursor {
    pub fn at(self, x: f32, y: f32) -> Self {
        Cursor { x, y, ..self }
    }

    pub fn at_x(self, x: f32) -> Self {
        Cursor { x, ..self }
    }

    pub fn with_font(self, face: FontFace, size: f32) -> Self {
        Cursor { face, size, ..self }
    }

    pub fn with_colors(self, text_color: Color, fill_color: Color, draw_color: Color) -> Self {
        Cursor {
            text_color,
            fill_color,
            draw_color,
            ..self
        }
    }

    pub fn with_text_color(self, text_color: Color) -> Self {
        Cursor { text_color, ..self }
    }

    pub fn with_fill(self, fill_color: Color) -> Self {
        Cursor { fill_color, ..self }
    }

    pub fn with_line_width(self, line_width: f32) -> Self {
        Cursor { line_width, ..self }
    }

    /// Font size converted to millimetres.
    pub fn size_mm(&self) -> f32 {
        self.size * PT_TO_MM
    }
}

// ============================================================================
// RECORDED OPERATIONS
// ============================================================================

/// Index of an image registered with [`Canvas::register_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        baseline: f32,
        text: String,
        face: FontFace,
        size: f32,
        color: Color,
    },
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        mode: PaintMode,
        fill: Color,
        stroke: Color,
        line_width: f32,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        color: Color,
        line_width: f32,
    },
    Polygon {
        points: Vec<(f32, f32)>,
        mode: PaintMode,
        fill: Color,
        stroke: Color,
    },
    Image {
        id: ImageId,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    },
}

impl DrawOp {
    /// Lowest point (largest y) this operation touches.
    #[cfg(test)]
    pub fn bottom(&self) -> f32 {
        match self {
            DrawOp::Text { baseline, .. } => *baseline,
            DrawOp::Rect { y, h, .. } | DrawOp::Image { y, h, .. } => y + h,
            DrawOp::Line { y1, y2, .. } => y1.max(*y2),
            DrawOp::Polygon { points, .. } => points.iter().map(|p| p.1).fold(f32::MIN, f32::max),
        }
    }

    #[cfg(test)]
    pub fn text(&self) -> Option<&str> {
        match self {
            DrawOp::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    #[cfg(test)]
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(DrawOp::text)
    }

    #[cfg(test)]
    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().any(|t| t.contains(needle))
    }
}

/// Laid-out pages plus the raster images they reference.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub pages: Vec<Page>,
    /// PNG-encoded images, indexed by [`ImageId`]
    pub images: Vec<Vec<u8>>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Index of the first page holding a text op containing `needle`.
    #[cfg(test)]
    pub fn page_of(&self, needle: &str) -> Option<usize> {
        self.pages.iter().position(|p| p.contains_text(needle))
    }
}

// ============================================================================
// CANVAS
// ============================================================================

pub struct Canvas<'f> {
    doc: Document,
    fonts: &'f FontAssets,
}

impl<'f> Canvas<'f> {
    /// A document with one blank page, and the cursor at the top-left margin.
    pub fn new(fonts: &'f FontAssets) -> (Self, Cursor) {
        let canvas = Canvas {
            doc: Document {
                pages: vec![Page::default()],
                images: Vec::new(),
            },
            fonts,
        };
        (canvas, Cursor::default())
    }

    #[cfg(test)]
    pub fn page_count(&self) -> usize {
        self.doc.pages.len()
    }

    pub fn finish(self) -> Document {
        self.doc
    }

    /// Append a blank page and move the cursor back to the top margin.
    pub fn new_page(&mut self, cursor: Cursor) -> Cursor {
        self.doc.pages.push(Page::default());
        tracing::debug!(page = self.doc.pages.len(), "started new page");
        cursor.at(MARGIN_LEFT, MARGIN_TOP)
    }

    fn push(&mut self, op: DrawOp) {
        // `new` always creates the first page
        if let Some(page) = self.doc.pages.last_mut() {
            page.ops.push(op);
        }
    }

    /// Width of `text` in the cursor's active font, in millimetres.
    pub fn text_width(&self, cursor: &Cursor, text: &str) -> f32 {
        self.fonts.metrics(cursor.face).string_width_mm(text, cursor.size)
    }

    /// Draw `text` left-aligned inside a cell at the cursor. The cursor moves
    /// right by `width` (to the right margin when `width` is 0); y is kept.
    pub fn cell(&mut self, cursor: Cursor, width: f32, height: f32, text: &str) -> Cursor {
        if !text.is_empty() {
            // Vertically centred, as with a classic cell
            let baseline = cursor.y + height / 2.0 + 0.3 * cursor.size_mm();
            self.push(DrawOp::Text {
                x: cursor.x + CELL_PADDING,
                baseline,
                text: text.to_string(),
                face: cursor.face,
                size: cursor.size,
                color: cursor.text_color,
            });
        }

        let next_x = if width == 0.0 {
            PAGE_WIDTH - MARGIN_RIGHT
        } else {
            cursor.x + width
        };
        cursor.at_x(next_x)
    }

    pub fn rect(&mut self, cursor: Cursor, x: f32, y: f32, w: f32, h: f32, mode: PaintMode) -> Cursor {
        self.push(DrawOp::Rect {
            x,
            y,
            w,
            h,
            mode,
            fill: cursor.fill_color,
            stroke: cursor.draw_color,
            line_width: cursor.line_width,
        });
        cursor
    }

    pub fn line(&mut self, cursor: Cursor, x1: f32, y1: f32, x2: f32, y2: f32) -> Cursor {
        self.push(DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            color: cursor.draw_color,
            line_width: cursor.line_width,
        });
        cursor
    }

    pub fn polygon(&mut self, cursor: Cursor, points: &[(f32, f32)], mode: PaintMode) -> Cursor {
        self.push(DrawOp::Polygon {
            points: points.to_vec(),
            mode,
            fill: cursor.fill_color,
            stroke: cursor.draw_color,
        });
        cursor
    }

    /// Keep PNG bytes for later placement with [`Canvas::image`].
    pub fn register_image(&mut self, png: Vec<u8>) -> ImageId {
        self.doc.images.push(png);
        ImageId(self.doc.images.len() - 1)
    }

    pub fn image(&mut self, cursor: Cursor, id: ImageId, x: f32, y: f32, w: f32, h: f32) -> Cursor {
        self.push(DrawOp::Image { id, x, y, w, h });
        cursor
    }

    /// Break `text` into lines that fit `width` in the active font.
    /// `width` 0 means "up to the right margin". Explicit newlines are kept,
    /// so an empty line separates paragraphs.
    pub fn wrap(&self, cursor: &Cursor, width: f32, text: &str) -> Vec<String> {
        let max_width = text_area(cursor, width);

        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let mut current = String::new();
            for word in paragraph.split_whitespace() {
                let tentative = if current.is_empty() {
                    word.to_string()
                } else {
                    format!("{} {}", current, word)
                };

                if self.text_width(cursor, &tentative) > max_width && !current.is_empty() {
                    lines.push(current);
                    current = word.to_string();
                } else {
                    current = tentative;
                }
            }
            lines.push(current);
        }
        lines
    }

    /// Like [`Canvas::wrap`], but keeps at most `max_lines`. When lines are
    /// dropped the last kept one is shortened to end in `...` within `width`.
    pub fn wrap_clamped(&self, cursor: &Cursor, width: f32, text: &str, max_lines: usize) -> Vec<String> {
        let mut lines = self.wrap(cursor, width, text);
        if lines.len() <= max_lines {
            return lines;
        }
        lines.truncate(max_lines);

        let max_width = text_area(cursor, width);
        if let Some(last) = lines.last_mut() {
            let mut kept = last.trim_end().to_string();
            loop {
                let candidate = format!("{}{}", kept, ELLIPSIS);
                if kept.is_empty() || self.text_width(cursor, &candidate) <= max_width {
                    *last = candidate;
                    break;
                }
                kept.pop();
                kept.truncate(kept.trim_end().len());
            }
        }
        lines
    }

    /// Draw already wrapped lines one below the other. The cursor ends at the
    /// left margin, one line height below the last line.
    pub fn text_lines(&mut self, cursor: Cursor, width: f32, line_height: f32, lines: &[String]) -> Cursor {
        let mut row = cursor;
        for line in lines {
            self.cell(row, width, line_height, line);
            row = row.at(cursor.x, row.y + line_height);
        }
        row.at_x(MARGIN_LEFT)
    }

    /// Wrapped text block. The cursor ends at the left margin, one line
    /// height below the last line.
    pub fn multi_cell(&mut self, cursor: Cursor, width: f32, line_height: f32, text: &str) -> Cursor {
        let lines = self.wrap(&cursor, width, text);
        self.text_lines(cursor, width, line_height, &lines)
    }
}

/// Room for text inside a cell of `width` at the cursor (0 = to the right
/// margin), padding excluded.
fn text_area(cursor: &Cursor, width: f32) -> f32 {
    let width = if width == 0.0 {
        PAGE_WIDTH - MARGIN_RIGHT - cursor.x
    } else {
        width
    };
    width - 2.0 * CELL_PADDING
}
