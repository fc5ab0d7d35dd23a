//! Grading: OCR through Tesseract.js when the host page loaded it, with a
//! bitmap template comparison as the fallback for low-confidence or missing
//! OCR results.

use std::cell::RefCell;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlCanvasElement;

use crate::config::GameConfig;
use crate::error::{GameError, Result, describe_js};

/// OCR output after whitelist filtering.
#[derive(Clone, Debug, PartialEq)]
pub struct Recognition {
    pub text: String,
    /// 0..=100 as reported by Tesseract.
    pub confidence: f64,
}

impl Recognition {
    pub fn from_raw(raw: &str, confidence: f64, whitelist: &str) -> Self {
        Self {
            text: normalize_text(raw, whitelist),
            confidence,
        }
    }
}

/// Drop whitespace and anything outside the whitelist; letters are compared
/// uppercase.
pub fn normalize_text(raw: &str, whitelist: &str) -> String {
    raw.chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| !c.is_whitespace() && whitelist.contains(*c))
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerdictSource {
    Ocr,
    Template,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub correct: bool,
    pub source: VerdictSource,
}

/// A confident OCR reading decides on its own. Otherwise the template score
/// decides, and with neither the answer counts as wrong.
pub fn grade(
    target: &str,
    recognition: Option<&Recognition>,
    template_score: Option<f64>,
    cfg: &GameConfig,
) -> Verdict {
    if let Some(r) = recognition {
        if r.confidence >= cfg.confidence_floor {
            return Verdict {
                correct: r.text == target,
                source: VerdictSource::Ocr,
            };
        }
    }
    match template_score {
        Some(score) => Verdict {
            correct: score >= cfg.template_threshold,
            source: VerdictSource::Template,
        },
        None => Verdict {
            correct: false,
            source: VerdictSource::None,
        },
    }
}

// --- Tesseract.js bindings ----------------------------------------------------

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = Tesseract, js_name = createWorker, catch)]
    fn create_worker(lang: &str) -> std::result::Result<js_sys::Promise, JsValue>;

    #[derive(Clone, Debug)]
    type TesseractWorker;

    #[wasm_bindgen(method, js_name = setParameters, catch)]
    fn set_parameters(
        this: &TesseractWorker,
        params: &JsValue,
    ) -> std::result::Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn recognize(
        this: &TesseractWorker,
        image: &HtmlCanvasElement,
    ) -> std::result::Result<js_sys::Promise, JsValue>;
}

// Tesseract page segmentation modes.
const PSM_SINGLE_WORD: &str = "8";
const PSM_SINGLE_CHAR: &str = "10";

/// Lazily created Tesseract worker, reused across rounds.
pub struct OcrEngine {
    lang: String,
    worker: RefCell<Option<TesseractWorker>>,
}

impl OcrEngine {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            worker: RefCell::new(None),
        }
    }

    /// Whether the host page exposes a `Tesseract` global.
    pub fn available() -> bool {
        js_sys::Reflect::has(&js_sys::global(), &JsValue::from_str("Tesseract")).unwrap_or(false)
    }

    async fn worker(&self) -> Result<TesseractWorker> {
        if let Some(w) = self.worker.borrow().as_ref() {
            return Ok(w.clone());
        }
        if !Self::available() {
            return Err(GameError::Recognizer("Tesseract is not loaded".into()));
        }
        log::info!("starting OCR worker ({})", self.lang);
        let promise = create_worker(&self.lang).map_err(|e| GameError::Recognizer(describe_js(&e)))?;
        let worker: TesseractWorker = JsFuture::from(promise)
            .await
            .map_err(|e| GameError::Recognizer(describe_js(&e)))?
            .unchecked_into();
        *self.worker.borrow_mut() = Some(worker.clone());
        Ok(worker)
    }

    /// Run OCR on `canvas`, restricted to `whitelist`.
    pub async fn recognize(
        &self,
        canvas: &HtmlCanvasElement,
        whitelist: &str,
        multi_char: bool,
    ) -> Result<Recognition> {
        let worker = self.worker().await?;

        let params = js_sys::Object::new();
        js_sys::Reflect::set(
            &params,
            &JsValue::from_str("tessedit_char_whitelist"),
            &JsValue::from_str(whitelist),
        )?;
        let psm = if multi_char { PSM_SINGLE_WORD } else { PSM_SINGLE_CHAR };
        js_sys::Reflect::set(
            &params,
            &JsValue::from_str("tessedit_pageseg_mode"),
            &JsValue::from_str(psm),
        )?;
        let set = worker
            .set_parameters(&params)
            .map_err(|e| GameError::Recognizer(describe_js(&e)))?;
        JsFuture::from(set)
            .await
            .map_err(|e| GameError::Recognizer(describe_js(&e)))?;

        let job = worker
            .recognize(canvas)
            .map_err(|e| GameError::Recognizer(describe_js(&e)))?;
        let result = JsFuture::from(job)
            .await
            .map_err(|e| GameError::Recognizer(describe_js(&e)))?;

        let data = js_sys::Reflect::get(&result, &JsValue::from_str("data"))?;
        let text = js_sys::Reflect::get(&data, &JsValue::from_str("text"))?
            .as_string()
            .unwrap_or_default();
        let confidence = js_sys::Reflect::get(&data, &JsValue::from_str("confidence"))?
            .as_f64()
            .unwrap_or(0.0);
        log::debug!("ocr raw={text:?} confidence={confidence:.1}");
        Ok(Recognition::from_raw(&text, confidence, whitelist))
    }
}
