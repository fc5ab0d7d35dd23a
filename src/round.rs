//! Per-level state machine.
//!
//! ```text
//! Idle ──begin_stroke──► Drawing ──end_stroke──► Idle
//!   │                       │
//!   └──────begin_check──────┴──► Checking ──resolve──► Feedback{correct}
//!                                                      │
//!           Idle ◄──retry (wrong) / start (correct)────┘
//! ```
//!
//! Pointer input is only accepted in `Idle` / `Drawing`; while a drawing is
//! being graded or feedback is on screen, every input method returns `false`.

use crate::raster::{Point, Stroke};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Drawing,
    Checking,
    Feedback { correct: bool },
}

#[derive(Clone, Debug)]
pub struct Round {
    target: &'static str,
    color: String,
    attempts: u32,
    phase: Phase,
    strokes: Vec<Stroke>,
}

impl Round {
    /// Fresh level: no strokes, zero attempts.
    pub fn start(target: &'static str, color: impl Into<String>) -> Self {
        Self {
            target,
            color: color.into(),
            attempts: 0,
            phase: Phase::Idle,
            strokes: Vec::new(),
        }
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn accepts_input(&self) -> bool {
        matches!(self.phase, Phase::Idle | Phase::Drawing)
    }

    pub fn is_drawing(&self) -> bool {
        self.phase == Phase::Drawing
    }

    pub fn is_checking(&self) -> bool {
        self.phase == Phase::Checking
    }

    pub fn has_ink(&self) -> bool {
        self.strokes.iter().any(|s| !s.is_empty())
    }

    pub fn show_guide(&self, guide_attempts: u32) -> bool {
        self.attempts < guide_attempts
    }

    pub fn begin_stroke(&mut self, p: Point) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.strokes.push(vec![p]);
        self.phase = Phase::Drawing;
        true
    }

    /// Append a point; returns the previous point so the caller can paint the
    /// segment.
    pub fn extend_stroke(&mut self, p: Point) -> Option<Point> {
        if self.phase != Phase::Drawing {
            return None;
        }
        let stroke = self.strokes.last_mut()?;
        let prev = stroke.last().copied();
        stroke.push(p);
        prev
    }

    pub fn end_stroke(&mut self) -> bool {
        if self.phase != Phase::Drawing {
            return false;
        }
        self.phase = Phase::Idle;
        true
    }

    /// Wipe the drawing without touching attempts.
    pub fn clear(&mut self) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.strokes.clear();
        self.phase = Phase::Idle;
        true
    }

    /// Lock input for grading. Rejected when there is nothing to grade.
    pub fn begin_check(&mut self) -> bool {
        if !self.accepts_input() || !self.has_ink() {
            return false;
        }
        self.phase = Phase::Checking;
        true
    }

    pub fn resolve(&mut self, correct: bool) -> bool {
        if self.phase != Phase::Checking {
            return false;
        }
        if !correct {
            self.attempts += 1;
        }
        self.phase = Phase::Feedback { correct };
        true
    }

    /// After a wrong answer: same target, blank canvas.
    pub fn retry(&mut self) -> bool {
        if self.phase != (Phase::Feedback { correct: false }) {
            return false;
        }
        self.strokes.clear();
        self.phase = Phase::Idle;
        true
    }
}

/// Uniform pick that never repeats `previous` when there is an alternative.
/// `roll(n)` must return a value in `0..n`.
pub fn pick_target(
    pool: &[&'static str],
    previous: Option<&str>,
    mut roll: impl FnMut(usize) -> usize,
) -> Option<&'static str> {
    if pool.is_empty() {
        return None;
    }
    let candidates: Vec<&'static str> = match previous {
        Some(prev) if pool.len() > 1 => pool.iter().copied().filter(|t| *t != prev).collect(),
        _ => pool.to_vec(),
    };
    let candidates = if candidates.is_empty() { pool.to_vec() } else { candidates };
    Some(candidates[roll(candidates.len()) % candidates.len()])
}

pub fn pick_color(palette: &[String], roll: impl FnOnce(usize) -> usize) -> &str {
    match palette.len() {
        0 => "#ff69b4",
        n => &palette[roll(n) % n],
    }
}

/// Uniform index in `0..len` from the platform RNG (crypto.getRandomValues in
/// the browser).
pub fn rand_index(len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let mut buf = [0u8; 4];
    if let Err(e) = getrandom::getrandom(&mut buf) {
        log::warn!("getrandom failed: {e}");
        return 0;
    }
    u32::from_le_bytes(buf) as usize % len
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn draw_check_wrong_retry_cycle() {
        let mut r = Round::start("7", "#ff69b4");
        assert_eq!(r.phase(), Phase::Idle);
        assert!(r.begin_stroke(p(1.0, 1.0)));
        assert_eq!(r.extend_stroke(p(2.0, 2.0)), Some(p(1.0, 1.0)));
        assert!(r.end_stroke());
        assert!(r.begin_check());
        assert!(r.is_checking());
        assert!(r.resolve(false));
        assert_eq!(r.phase(), Phase::Feedback { correct: false });
        assert_eq!(r.attempts(), 1);
        assert!(r.retry());
        assert!(r.strokes().is_empty());
        assert_eq!(r.target(), "7");
    }

    #[test]
    fn input_ignored_while_checking() {
        let mut r = Round::start("3", "#000");
        r.begin_stroke(p(0.0, 0.0));
        assert!(r.begin_check(), "check closes an open stroke");
        assert!(!r.begin_stroke(p(5.0, 5.0)));
        assert_eq!(r.extend_stroke(p(6.0, 6.0)), None);
        assert!(!r.clear());
        assert!(!r.begin_check());
        assert_eq!(r.strokes().len(), 1);
    }

    #[test]
    fn blank_canvas_cannot_be_checked() {
        let mut r = Round::start("1", "#000");
        assert!(!r.begin_check());
        assert_eq!(r.phase(), Phase::Idle);
    }

    #[test]
    fn correct_answer_keeps_attempts() {
        let mut r = Round::start("1", "#000");
        r.begin_stroke(p(0.0, 0.0));
        r.end_stroke();
        r.begin_check();
        r.resolve(true);
        assert_eq!(r.attempts(), 0);
        assert!(!r.retry(), "retry only follows a wrong answer");
        assert!(!r.accepts_input());
    }

    #[test]
    fn guide_hidden_after_five_misses() {
        let mut r = Round::start("8", "#000");
        for _ in 0..5 {
            assert!(r.show_guide(5));
            r.begin_stroke(p(0.0, 0.0));
            r.end_stroke();
            r.begin_check();
            r.resolve(false);
            r.retry();
        }
        assert_eq!(r.attempts(), 5);
        assert!(!r.show_guide(5));
    }

    #[test]
    fn pick_target_avoids_repeat() {
        let pool = ["1", "2"];
        for roll in 0..4 {
            assert_eq!(pick_target(&pool, Some("1"), |_| roll), Some("2"));
        }
        assert_eq!(pick_target(&["5"], Some("5"), |_| 0), Some("5"));
        assert_eq!(pick_target(&[], None, |_| 0), None);
    }

    #[test]
    fn pick_color_wraps() {
        let palette = vec!["#a".to_string(), "#b".to_string()];
        assert_eq!(pick_color(&palette, |_| 3), "#b");
        assert_eq!(pick_color(&[], |_| 0), "#ff69b4");
    }

    #[test]
    fn rand_index_in_range() {
        for len in 1..20 {
            assert!(rand_index(len) < len);
        }
        assert_eq!(rand_index(0), 0);
    }
}
