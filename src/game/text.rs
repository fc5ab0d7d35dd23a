// On-screen and spoken strings.
use crate::charset::Mode;
use crate::progress::ScoreBook;
use crate::raster::Point;

pub(super) fn prompt(mode: Mode, target: &str) -> String {
    format!("Draw the {}: {}", mode.label(), target)
}

pub(super) fn score_line(book: &ScoreBook, mode: Mode, target: &str) -> String {
    let n = book.correct_for(mode, target);
    let times = if n == 1 { "time" } else { "times" };
    format!(
        "Score: {} | You've drawn {} correctly {} {}",
        book.total(),
        target,
        n,
        times
    )
}

/// Compact per-character table, e.g. `1×2  2×0  3×1`.
pub(super) fn stats_line(book: &ScoreBook, mode: Mode, extended_unlocked: bool) -> String {
    book.summary(mode)
        .into_iter()
        .filter(|(t, _)| mode != Mode::Numbers || extended_unlocked || t.len() == 1)
        .map(|(t, n)| format!("{t}×{n}"))
        .collect::<Vec<_>>()
        .join("  ")
}

pub(super) fn feedback(correct: bool, attempts: u32, guide_attempts: u32) -> String {
    if correct {
        "Great job!".to_string()
    } else if attempts >= guide_attempts {
        "Not quite. Try it without the guide!".to_string()
    } else {
        "Not quite, try again!".to_string()
    }
}

pub(super) const UNLOCK_MESSAGE: &str = "New numbers unlocked: 10 to 20!";
pub(super) const EMPTY_CANVAS: &str = "Draw something first!";

/// Client coordinates to canvas pixels, compensating for CSS scaling.
pub(super) fn to_canvas_coords(
    client_x: f64,
    client_y: f64,
    rect: (f64, f64, f64, f64), // left, top, width, height
    canvas_w: u32,
    canvas_h: u32,
) -> Point {
    let (left, top, width, height) = rect;
    let sx = if width > 0.0 { canvas_w as f64 / width } else { 1.0 };
    let sy = if height > 0.0 { canvas_h as f64 / height } else { 1.0 };
    Point::new((client_x - left) * sx, (client_y - top) * sy)
}
