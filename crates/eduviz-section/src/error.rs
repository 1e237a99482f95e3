//! Section Processor (C6) error types (spec §7's `RenderingError` row and
//! the Animation Agent rows it forwards).

use thiserror::Error;

pub type SectionResult<T> = Result<T, SectionError>;

#[derive(Debug, Error)]
pub enum SectionError {
    #[error("animation agent failed: {0}")]
    Animation(#[from] eduviz_animation::AnimationError),

    #[error("media adapter failed: {0}")]
    Media(#[from] eduviz_media::MediaError),

    #[error("job store failed: {0}")]
    Store(#[from] eduviz_core::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("section {index} abandoned after {attempts} correction attempts: {reason}")]
    Abandoned { index: usize, attempts: u32, reason: String },
}

impl SectionError {
    /// The short code written to the section's `status` detail field and
    /// surfaced in `SectionResult{error}` (spec §7 Kind column).
    pub fn reason_code(&self) -> &'static str {
        match self {
            SectionError::Animation(eduviz_animation::AnimationError::Choreography(_)) => "choreography_error",
            SectionError::Animation(eduviz_animation::AnimationError::Refinement(_)) => "refinement_error",
            SectionError::Animation(eduviz_animation::AnimationError::Abandoned) => "implementation_error",
            SectionError::Animation(_) => "animation_error",
            SectionError::Media(_) => "rendering_error",
            SectionError::Store(_) => "store_error",
            SectionError::Io(_) => "io_error",
            SectionError::Json(_) => "json_error",
            SectionError::Abandoned { .. } => "rendering_error",
        }
    }
}
