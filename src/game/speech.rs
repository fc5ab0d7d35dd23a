use web_sys::{SpeechSynthesisUtterance, window};

use crate::error::{GameError, Result};

/// Say `text` aloud, cutting off anything still being spoken.
pub(super) fn speak(text: &str, rate: f32) -> Result<()> {
    let win = window().ok_or(GameError::NoWindow)?;
    let synth = win.speech_synthesis()?;
    synth.cancel();
    let utterance = SpeechSynthesisUtterance::new_with_text(text)?;
    utterance.set_rate(rate);
    synth.speak(&utterance);
    Ok(())
}
