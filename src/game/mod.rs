//! Browser runtime for the drawing game.
//!
//! All mutable state lives in one `GameState` inside a thread-local cell.
//! DOM listeners borrow it briefly; the only async step (OCR) runs in
//! `spawn_local` and re-borrows the cell once the result is in, so no borrow is
//! ever held across an `await`. Input is locked by the round's `Checking` /
//! `Feedback` phases rather than by a separate flag.

use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::convert::FromWasmAbi;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, EventTarget, HtmlButtonElement, HtmlCanvasElement,
    MouseEvent, TouchEvent, window,
};

use crate::charset::{self, Mode};
use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::progress::ScoreBook;
use crate::raster::{Bitmap, GRID, Point, similarity};
use crate::recognizer::{OcrEngine, Verdict, grade};
use crate::round::{Round, pick_color, pick_target, rand_index};
use crate::storage::{KeyValueStore, default_store};

mod render;
mod speech;
mod text;

struct GameState {
    cfg: GameConfig,
    doc: Document,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    check_button: HtmlButtonElement,
    mode_button: HtmlButtonElement,
    prompt: Element,
    feedback: Element,
    score: Element,
    stats: Element,
    mode: Mode,
    round: Round,
    book: ScoreBook,
    store: Box<dyn KeyValueStore>,
    ocr: Rc<OcrEngine>,
    // Rendered guide glyphs, keyed by target.
    templates: HashMap<&'static str, Bitmap>,
}

thread_local! {
    static GAME: std::cell::RefCell<Option<GameState>> = std::cell::RefCell::new(None);
}

fn with_game<R>(f: impl FnOnce(&mut GameState) -> R) -> Option<R> {
    GAME.with(|cell| match cell.try_borrow_mut() {
        Ok(mut game) => game.as_mut().map(f),
        Err(_) => {
            log::warn!("game state already borrowed; dropping event");
            None
        }
    })
}

// --- Entry points -------------------------------------------------------------

pub(crate) fn start(cfg: GameConfig) -> Result<()> {
    if GAME.with(|g| g.borrow().is_some()) {
        log::warn!("start called twice; keeping the running game");
        return Ok(());
    }
    cfg.validate()?;
    let win = window().ok_or(GameError::NoWindow)?;
    let doc = win.document().ok_or(GameError::NoDocument)?;

    let prompt = ensure_element(&doc, &cfg.prompt_id, "h1", "", PROMPT_STYLE)?;
    let canvas_existed = doc.get_element_by_id(&cfg.canvas_id).is_some();
    let canvas: HtmlCanvasElement = ensure_element(&doc, &cfg.canvas_id, "canvas", "", CANVAS_STYLE)?
        .dyn_into()
        .map_err(|_| GameError::MissingElement(cfg.canvas_id.clone()))?;
    if !canvas_existed {
        canvas.set_width(cfg.canvas_width);
        canvas.set_height(cfg.canvas_height);
    }
    let check_button = ensure_button(&doc, &cfg.check_button_id, "Check")?;
    let clear_button = ensure_button(&doc, &cfg.clear_button_id, "Clear")?;
    let mode_button = ensure_button(&doc, &cfg.mode_button_id, "Letters")?;
    let feedback = ensure_element(&doc, &cfg.feedback_id, "div", "", FEEDBACK_STYLE)?;
    let score = ensure_element(&doc, &cfg.score_id, "div", "Score: 0", SCORE_STYLE)?;
    let stats = ensure_element(&doc, &cfg.stats_id, "div", "", STATS_STYLE)?;

    let ctx = render::context_2d(&canvas)?;
    let store = default_store();
    let book = ScoreBook::load(&*store);
    log::info!(
        "loaded progress: total={} numbers={} letters={}",
        book.total(),
        book.mode_total(Mode::Numbers),
        book.mode_total(Mode::Letters)
    );

    let mode = Mode::Numbers;
    let round = next_round(&cfg, &book, mode, None);
    let mut state = GameState {
        cfg,
        doc,
        canvas: canvas.clone(),
        ctx,
        check_button: check_button.clone(),
        mode_button: mode_button.clone(),
        prompt,
        feedback,
        score,
        stats,
        mode,
        round,
        book,
        store,
        ocr: Rc::new(OcrEngine::new("eng")),
        templates: HashMap::new(),
    };
    state.present_level();
    GAME.with(|g| g.replace(Some(state)));

    install_listeners(&canvas, &check_button, &clear_button, &mode_button)?;
    Ok(())
}

pub(crate) fn reset_progress() -> Result<()> {
    let handled = with_game(|st| -> Result<()> {
        st.book.reset(&*st.store)?;
        st.refresh_overlays();
        Ok(())
    });
    match handled {
        Some(res) => res,
        None => ScoreBook::default().reset(&*default_store()),
    }
}

pub(crate) fn current_target() -> Option<String> {
    with_game(|st| st.round.target().to_string())
}

pub(crate) fn total_score() -> Option<u64> {
    with_game(|st| st.book.total())
}

// --- DOM setup ----------------------------------------------------------------

const PROMPT_STYLE: &str = "font-family:'Comic Sans MS', sans-serif; text-align:center; color:#444;";
const CANVAS_STYLE: &str = "display:block; margin:12px auto; background:#fffdf6; border:3px solid #ffb6d9; border-radius:18px; touch-action:none;";
const BUTTON_STYLE: &str = "font-family:'Comic Sans MS', sans-serif; font-size:20px; margin:4px 6px; padding:8px 18px; border-radius:12px; border:2px solid #ff69b4; background:#fff0f7; cursor:pointer;";
const FEEDBACK_STYLE: &str = "font-family:'Comic Sans MS', sans-serif; font-size:24px; text-align:center; min-height:32px; color:#ff69b4;";
const SCORE_STYLE: &str = "font-family:'Fira Code', monospace; font-size:15px; text-align:center; color:#555;";
const STATS_STYLE: &str = "font-family:'Fira Code', monospace; font-size:12px; text-align:center; color:#888; margin-top:6px;";

/// Reuse the host page's element when present, otherwise append one to <body>.
fn ensure_element(doc: &Document, id: &str, tag: &str, text: &str, style: &str) -> Result<Element> {
    if let Some(el) = doc.get_element_by_id(id) {
        return Ok(el);
    }
    let body = doc
        .body()
        .ok_or_else(|| GameError::MissingElement("body".into()))?;
    let el = doc.create_element(tag)?;
    el.set_id(id);
    if !text.is_empty() {
        el.set_text_content(Some(text));
    }
    el.set_attribute("style", style).ok();
    body.append_child(&el)?;
    Ok(el)
}

fn ensure_button(doc: &Document, id: &str, label: &str) -> Result<HtmlButtonElement> {
    ensure_element(doc, id, "button", label, BUTTON_STYLE)?
        .dyn_into()
        .map_err(|_| GameError::MissingElement(id.to_string()))
}

fn listen<E>(target: &EventTarget, kind: &str, handler: impl FnMut(E) + 'static) -> Result<()>
where
    E: FromWasmAbi + 'static,
{
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(E)>);
    target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn install_listeners(
    canvas: &HtmlCanvasElement,
    check_button: &HtmlButtonElement,
    clear_button: &HtmlButtonElement,
    mode_button: &HtmlButtonElement,
) -> Result<()> {
    // Mouse
    listen(canvas, "mousedown", |evt: MouseEvent| {
        evt.prevent_default();
        with_game(|st| st.pointer_down(evt.client_x() as f64, evt.client_y() as f64));
    })?;
    listen(canvas, "mousemove", |evt: MouseEvent| {
        evt.prevent_default();
        with_game(|st| st.pointer_move(evt.client_x() as f64, evt.client_y() as f64));
    })?;
    for kind in ["mouseup", "mouseout"] {
        listen(canvas, kind, |evt: MouseEvent| {
            evt.prevent_default();
            with_game(|st| st.pointer_up());
        })?;
    }

    // Touch (first finger only)
    listen(canvas, "touchstart", |evt: TouchEvent| {
        evt.prevent_default();
        if let Some(t) = evt.touches().get(0) {
            with_game(|st| st.pointer_down(t.client_x() as f64, t.client_y() as f64));
        }
    })?;
    listen(canvas, "touchmove", |evt: TouchEvent| {
        evt.prevent_default();
        if let Some(t) = evt.touches().get(0) {
            with_game(|st| st.pointer_move(t.client_x() as f64, t.client_y() as f64));
        }
    })?;
    for kind in ["touchend", "touchcancel"] {
        listen(canvas, kind, |evt: TouchEvent| {
            evt.prevent_default();
            with_game(|st| st.pointer_up());
        })?;
    }

    // Buttons
    listen(check_button, "click", |_evt: MouseEvent| check_drawing())?;
    listen(clear_button, "click", |_evt: MouseEvent| {
        with_game(|st| st.clear_drawing());
    })?;
    listen(mode_button, "click", |_evt: MouseEvent| {
        with_game(|st| st.toggle_mode());
    })?;
    Ok(())
}

// --- Level flow ---------------------------------------------------------------

fn next_round(cfg: &GameConfig, book: &ScoreBook, mode: Mode, previous: Option<&str>) -> Round {
    let pool = charset::pool(mode, book.extended_unlocked(cfg.unlock_threshold));
    let target = pick_target(&pool, previous, rand_index).unwrap_or(charset::BASIC_NUMBERS[0]);
    let color = pick_color(&cfg.stroke_palette, rand_index).to_string();
    Round::start(target, color)
}

/// Run `f` on the game after `ms` milliseconds.
fn schedule(ms: i32, f: impl FnOnce(&mut GameState) + 'static) {
    let Some(win) = window() else {
        return;
    };
    let cb = Closure::once_into_js(move || {
        with_game(f);
    });
    if let Err(e) = win.set_timeout_with_callback_and_timeout_and_arguments_0(cb.unchecked_ref(), ms) {
        log::error!("setTimeout failed: {}", GameError::from(e));
    }
}

/// Everything grading needs, detached from the state cell so it can cross an
/// `await`.
struct CheckJob {
    target: &'static str,
    ocr: Rc<OcrEngine>,
    image: Option<HtmlCanvasElement>,
    whitelist: String,
    template_score: Option<f64>,
    cfg: GameConfig,
}

impl CheckJob {
    async fn run(self) -> Verdict {
        let recognition = match &self.image {
            Some(image) if OcrEngine::available() => {
                match self.ocr.recognize(image, &self.whitelist, self.target.len() > 1).await {
                    Ok(r) => Some(r),
                    Err(e) => {
                        log::warn!("OCR failed, falling back to template: {e}");
                        None
                    }
                }
            }
            _ => {
                log::debug!("OCR not available; grading by template");
                None
            }
        };
        let verdict = grade(self.target, recognition.as_ref(), self.template_score, &self.cfg);
        log::info!(
            "graded {:?}: ocr={:?} template={:?} -> {:?}",
            self.target,
            recognition,
            self.template_score,
            verdict
        );
        verdict
    }
}

fn check_drawing() {
    let Some(Some(job)) = with_game(|st| st.begin_check()) else {
        return;
    };
    wasm_bindgen_futures::spawn_local(async move {
        let verdict = job.run().await;
        with_game(|st| st.finish_check(verdict));
    });
}

impl GameState {
    fn start_level(&mut self) {
        let previous = self.round.target();
        self.round = next_round(&self.cfg, &self.book, self.mode, Some(previous));
        self.present_level();
    }

    fn present_level(&mut self) {
        let target = self.round.target();
        log::info!("new level: {} {:?}", self.mode.label(), target);
        self.prompt
            .set_text_content(Some(&text::prompt(self.mode, target)));
        self.feedback.set_text_content(Some(""));
        self.check_button.set_disabled(false);
        self.mode_button.set_text_content(Some(match self.mode.toggled() {
            Mode::Numbers => "Numbers",
            Mode::Letters => "Letters",
        }));
        self.say(target);
        render::redraw(&self.ctx, &self.canvas, &self.round, &self.cfg);
        self.refresh_overlays();
    }

    fn say(&self, words: &str) {
        if !self.cfg.speech_enabled {
            return;
        }
        if let Err(e) = speech::speak(words, self.cfg.speech_rate) {
            log::warn!("speech unavailable: {e}");
        }
    }

    fn refresh_overlays(&self) {
        let target = self.round.target();
        self.score
            .set_text_content(Some(&text::score_line(&self.book, self.mode, target)));
        let unlocked = self.book.extended_unlocked(self.cfg.unlock_threshold);
        self.stats
            .set_text_content(Some(&text::stats_line(&self.book, self.mode, unlocked)));
    }

    fn canvas_point(&self, client_x: f64, client_y: f64) -> Point {
        let rect = self.canvas.get_bounding_client_rect();
        text::to_canvas_coords(
            client_x,
            client_y,
            (rect.left(), rect.top(), rect.width(), rect.height()),
            self.canvas.width(),
            self.canvas.height(),
        )
    }

    fn pointer_down(&mut self, client_x: f64, client_y: f64) {
        let p = self.canvas_point(client_x, client_y);
        if self.round.begin_stroke(p) {
            render::stroke_segment(&self.ctx, p, p, self.round.color(), self.cfg.line_width);
        }
    }

    fn pointer_move(&mut self, client_x: f64, client_y: f64) {
        if !self.round.is_drawing() {
            return;
        }
        let p = self.canvas_point(client_x, client_y);
        if let Some(prev) = self.round.extend_stroke(p) {
            render::stroke_segment(&self.ctx, prev, p, self.round.color(), self.cfg.line_width);
        }
    }

    fn pointer_up(&mut self) {
        self.round.end_stroke();
    }

    fn clear_drawing(&mut self) {
        if self.round.clear() {
            self.feedback.set_text_content(Some(""));
            render::redraw(&self.ctx, &self.canvas, &self.round, &self.cfg);
        }
    }

    fn toggle_mode(&mut self) {
        if !self.round.accepts_input() {
            return;
        }
        self.mode = self.mode.toggled();
        log::info!("switched to {:?} mode", self.mode);
        // Old target belongs to the other pool; no repeat guard needed.
        self.round = next_round(&self.cfg, &self.book, self.mode, None);
        self.present_level();
    }

    fn template_score(&mut self) -> Option<f64> {
        let target = self.round.target();
        let (w, h) = (self.canvas.width(), self.canvas.height());
        if !self.templates.contains_key(target) {
            match render::glyph_bitmap(&self.doc, target, w, h, &self.cfg.guide_font) {
                Ok(bmp) => {
                    self.templates.insert(target, bmp);
                }
                Err(e) => {
                    log::warn!("template for {target:?} unavailable: {e}");
                    return None;
                }
            }
        }
        let glyph = self.templates.get(target)?;
        let drawn = Bitmap::from_strokes(
            self.round.strokes(),
            w as f64,
            h as f64,
            GRID,
            self.cfg.line_width / 2.0,
        );
        Some(similarity(&drawn, glyph))
    }

    fn begin_check(&mut self) -> Option<CheckJob> {
        if !self.round.accepts_input() {
            return None;
        }
        if !self.round.has_ink() {
            self.feedback.set_text_content(Some(text::EMPTY_CANVAS));
            self.say(text::EMPTY_CANVAS);
            return None;
        }
        let template_score = self.template_score();
        let image = match render::export_for_ocr(
            &self.doc,
            self.round.strokes(),
            self.canvas.width(),
            self.canvas.height(),
            self.cfg.line_width,
        ) {
            Ok(c) => Some(c),
            Err(e) => {
                log::warn!("could not export drawing for OCR: {e}");
                None
            }
        };
        if !self.round.begin_check() {
            return None;
        }
        self.check_button.set_disabled(true);
        self.feedback.set_text_content(Some("Checking..."));
        Some(CheckJob {
            target: self.round.target(),
            ocr: Rc::clone(&self.ocr),
            image,
            whitelist: charset::whitelist(self.mode),
            template_score,
            cfg: self.cfg.clone(),
        })
    }

    fn finish_check(&mut self, verdict: Verdict) {
        if !self.round.resolve(verdict.correct) {
            log::warn!("verdict arrived outside of a check; ignored");
            return;
        }
        let mut message = text::feedback(verdict.correct, self.round.attempts(), self.cfg.guide_attempts);
        if verdict.correct {
            let threshold = self.cfg.unlock_threshold;
            let was_unlocked = self.book.extended_unlocked(threshold);
            self.book.record_correct(self.mode, self.round.target());
            if let Err(e) = self.book.save(&*self.store) {
                log::error!("saving progress: {e}");
            }
            if !was_unlocked && self.book.extended_unlocked(threshold) {
                log::info!("extended number range unlocked");
                message = format!("{message} {}", text::UNLOCK_MESSAGE);
            }
            self.feedback.set_text_content(Some(&message));
            self.say(&message);
            schedule(self.cfg.correct_delay_ms, |st| st.start_level());
        } else {
            self.feedback.set_text_content(Some(&message));
            self.say("Try again");
            schedule(self.cfg.retry_delay_ms, |st| st.retry());
        }
        self.refresh_overlays();
    }

    fn retry(&mut self) {
        if self.round.retry() {
            self.check_button.set_disabled(false);
            render::redraw(&self.ctx, &self.canvas, &self.round, &self.cfg);
            if !self.round.show_guide(self.cfg.guide_attempts) {
                log::debug!("guide hidden after {} attempts", self.round.attempts());
            }
        }
    }
}
