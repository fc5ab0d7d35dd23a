// Canvas painting: guide glyph, player strokes, OCR export and glyph templates.
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement};

use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::raster::{Bitmap, GRID, Point, Stroke};
use crate::round::Round;

pub(super) fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")?
        .ok_or(GameError::NoContext)?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| GameError::NoContext)
}

pub(super) fn clear(ctx: &CanvasRenderingContext2d, canvas: &HtmlCanvasElement) {
    ctx.clear_rect(0.0, 0.0, canvas.width() as f64, canvas.height() as f64);
}

/// Faint target glyph centered on the canvas.
pub(super) fn draw_guide(
    ctx: &CanvasRenderingContext2d,
    canvas: &HtmlCanvasElement,
    target: &str,
    cfg: &GameConfig,
) {
    ctx.save();
    ctx.set_font(&cfg.guide_font);
    ctx.set_fill_style_str(&format!("rgba(0, 0, 0, {})", cfg.guide_alpha));
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.fill_text(target, canvas.width() as f64 / 2.0, canvas.height() as f64 / 2.0)
        .ok();
    ctx.restore();
}

pub(super) fn stroke_segment(
    ctx: &CanvasRenderingContext2d,
    from: Point,
    to: Point,
    color: &str,
    width: f64,
) {
    ctx.set_line_width(width);
    ctx.set_line_cap("round");
    ctx.set_line_join("round");
    ctx.set_stroke_style_str(color);
    ctx.begin_path();
    ctx.move_to(from.x, from.y);
    ctx.line_to(to.x, to.y);
    ctx.stroke();
}

fn stroke_all(ctx: &CanvasRenderingContext2d, strokes: &[Stroke], color: &str, width: f64) {
    for stroke in strokes {
        match stroke.as_slice() {
            [] => {}
            [only] => stroke_segment(ctx, *only, *only, color, width),
            points => {
                for pair in points.windows(2) {
                    stroke_segment(ctx, pair[0], pair[1], color, width);
                }
            }
        }
    }
}

/// Full repaint from round state (after clear / retry / new level).
pub(super) fn redraw(
    ctx: &CanvasRenderingContext2d,
    canvas: &HtmlCanvasElement,
    round: &Round,
    cfg: &GameConfig,
) {
    clear(ctx, canvas);
    if round.show_guide(cfg.guide_attempts) {
        draw_guide(ctx, canvas, round.target(), cfg);
    }
    stroke_all(ctx, round.strokes(), round.color(), cfg.line_width);
}

fn offscreen(doc: &Document, width: u32, height: u32) -> Result<(HtmlCanvasElement, CanvasRenderingContext2d)> {
    let canvas: HtmlCanvasElement = doc
        .create_element("canvas")?
        .dyn_into()
        .map_err(|_| GameError::MissingElement("offscreen canvas".into()))?;
    canvas.set_width(width);
    canvas.set_height(height);
    let ctx = context_2d(&canvas)?;
    Ok((canvas, ctx))
}

/// Strokes only, black on white: the guide and the stroke color would both
/// confuse OCR.
pub(super) fn export_for_ocr(
    doc: &Document,
    strokes: &[Stroke],
    width: u32,
    height: u32,
    line_width: f64,
) -> Result<HtmlCanvasElement> {
    let (canvas, ctx) = offscreen(doc, width, height)?;
    ctx.set_fill_style_str("#ffffff");
    ctx.fill_rect(0.0, 0.0, width as f64, height as f64);
    stroke_all(&ctx, strokes, "#000000", line_width);
    Ok(canvas)
}

/// Rasterize `target` in the guide font into a template bitmap.
pub(super) fn glyph_bitmap(doc: &Document, target: &str, width: u32, height: u32, font: &str) -> Result<Bitmap> {
    let (_canvas, ctx) = offscreen(doc, width, height)?;
    ctx.set_font(font);
    ctx.set_fill_style_str("#000000");
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.fill_text(target, width as f64 / 2.0, height as f64 / 2.0)?;
    let image = ctx.get_image_data(0.0, 0.0, width as f64, height as f64)?;
    let pixels = image.data();
    Ok(Bitmap::from_rgba(width as usize, height as usize, &pixels.0, GRID, 128))
}
