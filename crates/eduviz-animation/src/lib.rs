//! Animation Agent (C5): per-section choreography, implementation, and the
//! adaptive refinement loop that produces validated Manim-style source
//! (spec §4.5).

pub mod agent;
pub mod choreographer;
pub mod error;
pub mod implementer;
pub mod refiner;
pub mod scaffolder;
pub mod whitelist;

pub use agent::{correct_after_render_failure, produce_animation, AnimationOutcome, BASE_TEMPERATURE, MAX_CORRECTION_ATTEMPTS};
pub use choreographer::{generate_plan, normalize_plan, ChoreographerInput};
pub use error::{AnimationError, AnimationResult};
pub use refiner::validate::{Severity, SpatialIssue, ValidatorConfig};
pub use refiner::{refine, Refined, RefinerConfig, MAX_REFINEMENT_ATTEMPTS};
pub use whitelist::SpatialWhitelist;
