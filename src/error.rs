use wasm_bindgen::{JsCast, JsValue};

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("no window")]
    NoWindow,

    #[error("no document")]
    NoDocument,

    #[error("element #{0} is missing or has the wrong type")]
    MissingElement(String),

    #[error("2d canvas context unavailable")]
    NoContext,

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("recognizer error: {0}")]
    Recognizer(String),

    #[error("javascript error: {0}")]
    Js(String),
}

impl From<JsValue> for GameError {
    fn from(value: JsValue) -> Self {
        GameError::Js(describe_js(&value))
    }
}

impl From<GameError> for JsValue {
    fn from(err: GameError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// Best-effort text for a thrown JS value (strings, Error objects, anything else).
pub(crate) fn describe_js(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    format!("{value:?}")
}

pub type Result<T> = std::result::Result<T, GameError>;
