use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::SlidecastResult;

/// A run of narration text, optionally tagged with the image subgroup it talks about.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScriptSection {
    #[serde(default)]
    pub topic: Option<String>,
    pub text: String,
}

impl ScriptSection {
    pub fn untagged(text: impl Into<String>) -> Self {
        Self {
            topic: None,
            text: text.into(),
        }
    }
}

/// Load a narration script.
///
/// `.json` files hold an array of [`ScriptSection`]s; anything else is read as one plain-text
/// section with no topic.
pub fn load_script(path: &Path) -> SlidecastResult<Vec<ScriptSection>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read narration script '{}'", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        return Ok(vec![ScriptSection::untagged(raw)]);
    }

    let sections: Vec<ScriptSection> = serde_json::from_str(&raw)
        .with_context(|| format!("parse narration script JSON '{}'", path.display()))?;
    Ok(sections)
}
