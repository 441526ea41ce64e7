use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterDiag {
    pub converter_path: Option<String>,
    pub version: Option<String>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl ConverterDiag {
    pub fn missing(hint: impl Into<String>) -> Self {
        Self {
            converter_path: None,
            version: None,
            ok: false,
            error: Some(hint.into()),
        }
    }
}
