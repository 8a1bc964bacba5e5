//! Page-break policy: a block is placed whole or moved whole to a new page.

use crate::canvas::{Canvas, Cursor, PAGE_HEIGHT};

/// True when a block of `block_height` starting at `current_y` would run past
/// the bottom of the page.
pub fn will_overflow(current_y: f32, block_height: f32) -> bool {
    current_y + block_height > PAGE_HEIGHT
}

/// Start a new page first if the block would not fit on this one.
pub fn ensure_room(canvas: &mut Canvas<'_>, cursor: Cursor, block_height: f32) -> Cursor {
    if will_overflow(cursor.y, block_height) {
        tracing::debug!(y = cursor.y, block_height, "block does not fit, breaking page");
        canvas.new_page(cursor)
    } else {
        cursor
    }
}
