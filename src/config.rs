//! Game tunables. Every field has a default so a host page can override only
//! what it cares about via `start_game_with_config('{"line_width": 20}')`.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // --- DOM element ids (created when missing) ---
    pub canvas_id: String,
    pub check_button_id: String,
    pub clear_button_id: String,
    pub mode_button_id: String,
    pub prompt_id: String,
    pub feedback_id: String,
    pub score_id: String,
    pub stats_id: String,
    pub canvas_width: u32,
    pub canvas_height: u32,

    // --- Drawing ---
    pub line_width: f64,
    pub stroke_palette: Vec<String>,
    /// Guide glyph stays visible while attempts < guide_attempts.
    pub guide_attempts: u32,
    pub guide_font: String,
    pub guide_alpha: f64,

    // --- Progression / grading ---
    pub unlock_threshold: u32,
    /// OCR confidence (0..=100) below which the template fallback decides.
    pub confidence_floor: f64,
    /// Template similarity (0..=1) needed to accept a drawing.
    pub template_threshold: f64,

    // --- Timing (ms) ---
    pub correct_delay_ms: i32,
    pub retry_delay_ms: i32,

    // --- Speech ---
    pub speech_enabled: bool,
    pub speech_rate: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            canvas_id: "drawing-canvas".into(),
            check_button_id: "check-button".into(),
            clear_button_id: "clear-button".into(),
            mode_button_id: "mode-button".into(),
            prompt_id: "number-prompt".into(),
            feedback_id: "feedback".into(),
            score_id: "score-display".into(),
            stats_id: "stats".into(),
            canvas_width: 400,
            canvas_height: 400,
            line_width: 15.0,
            stroke_palette: [
                "#ff69b4", "#ff8c42", "#4ecdc4", "#7b68ee", "#32cd32", "#1e90ff",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            guide_attempts: 5,
            guide_font: "200px \"Comic Sans MS\"".into(),
            guide_alpha: 0.1,
            unlock_threshold: 4,
            confidence_floor: 60.0,
            template_threshold: 0.5,
            correct_delay_ms: 1500,
            retry_delay_ms: 1200,
            speech_enabled: true,
            speech_rate: 0.9,
        }
    }
}

impl GameConfig {
    /// Parse a (possibly partial) JSON override and validate it.
    pub fn from_json(raw: &str) -> Result<GameConfig> {
        let cfg: GameConfig = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stroke_palette.is_empty() {
            return Err(GameError::InvalidConfig("stroke_palette is empty".into()));
        }
        if !(self.line_width > 0.0) {
            return Err(GameError::InvalidConfig(format!(
                "line_width must be positive, got {}",
                self.line_width
            )));
        }
        if !(0.0..=100.0).contains(&self.confidence_floor) {
            return Err(GameError::InvalidConfig(format!(
                "confidence_floor {} outside 0..=100",
                self.confidence_floor
            )));
        }
        if !(0.0..=1.0).contains(&self.template_threshold) {
            return Err(GameError::InvalidConfig(format!(
                "template_threshold {} outside 0..=1",
                self.template_threshold
            )));
        }
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(GameError::InvalidConfig("canvas size must be non-zero".into()));
        }
        if self.correct_delay_ms < 0 || self.retry_delay_ms < 0 {
            return Err(GameError::InvalidConfig("delays must be non-negative".into()));
        }
        Ok(())
    }
}
