use std::fmt;

use crate::foundation::core::UnitId;

pub type SlidecastResult<T> = Result<T, SlidecastError>;

/// Pipeline stage an error originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Segment,
    Synthesize,
    Narration,
    Assign,
    Mix,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Segment => "segment",
            Stage::Synthesize => "synthesize",
            Stage::Narration => "narration",
            Stage::Assign => "assign",
            Stage::Mix => "mix",
            Stage::Render => "render",
        };
        f.write_str(s)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SlidecastError {
    #[error("[segment] empty input: {0}")]
    EmptyInput(String),

    #[error("[synthesize] unit {unit_id}: synthesis failed: {message}")]
    Synthesis { unit_id: UnitId, message: String },

    #[error("[narration] unit {unit_id}: degenerate clip (zero-length audio)")]
    DegenerateClip { unit_id: UnitId },

    #[error("[assign] unit {unit_id}: no image available")]
    NoImageAvailable { unit_id: UnitId },

    #[error("[mix] duration mismatch: {0}")]
    DurationMismatch(String),

    #[error("[render] {}: {message}", unit_label(.unit_id))]
    Render {
        unit_id: Option<UnitId>,
        message: String,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn unit_label(unit_id: &Option<UnitId>) -> String {
    match unit_id {
        Some(id) => format!("unit {id}"),
        None => "timeline".to_string(),
    }
}

impl SlidecastError {
    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    pub fn synthesis(unit_id: UnitId, msg: impl Into<String>) -> Self {
        Self::Synthesis {
            unit_id,
            message: msg.into(),
        }
    }

    pub fn duration_mismatch(msg: impl Into<String>) -> Self {
        Self::DurationMismatch(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            unit_id: None,
            message: msg.into(),
        }
    }

    pub fn render_unit(unit_id: UnitId, msg: impl Into<String>) -> Self {
        Self::Render {
            unit_id: Some(unit_id),
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Stage the error belongs to, when it is one of the pipeline stage errors.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::EmptyInput(_) => Some(Stage::Segment),
            Self::Synthesis { .. } => Some(Stage::Synthesize),
            Self::DegenerateClip { .. } => Some(Stage::Narration),
            Self::NoImageAvailable { .. } => Some(Stage::Assign),
            Self::DurationMismatch(_) => Some(Stage::Mix),
            Self::Render { .. } => Some(Stage::Render),
            Self::Validation(_) | Self::Other(_) => None,
        }
    }

    /// Offending unit, if the error is tied to one.
    pub fn unit_id(&self) -> Option<UnitId> {
        match self {
            Self::Synthesis { unit_id, .. }
            | Self::DegenerateClip { unit_id }
            | Self::NoImageAvailable { unit_id } => Some(*unit_id),
            Self::Render { unit_id, .. } => *unit_id,
            _ => None,
        }
    }
}
