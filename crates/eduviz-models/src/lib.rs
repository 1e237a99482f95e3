//! Shared data models for the EduViz job pipeline engine.
//!
//! This crate provides Serde/JsonSchema records for:
//! - Job identity and lifecycle
//! - Script, Section, and Narration Segment
//! - Choreography Plan v2
//! - Search/Replace patches
//! - Cost records

pub mod choreography;
pub mod cost;
pub mod ids;
pub mod job;
pub mod patch;
pub mod script;
pub mod section;

pub use choreography::{
    AbsolutePlacement, ChoreographyPlan, Constraints, Lifecycle, ObjectContent, Placement,
    PlacementType, Relation, RelativePlacement, SafeBounds, Scene, SceneMode, SceneObject,
    TimelineAction, TimelineSegment, SCENE_BUILTINS,
};
pub use cost::{CostRecord, CostSummary};
pub use ids::{is_safe_id, InvalidId, InvalidIdKind};
pub use job::{JobId, JobLifecycle, ScriptMode, SectionStatus, SourceMaterial};
pub use patch::{Patch, PatchOutcome, StructuredEdit, StructuredEditResponse};
pub use script::{
    is_supported_language, Outline, Script, SectionOutlineEntry, DEFAULT_LANGUAGE,
    SUPPORTED_LANGUAGES,
};
pub use section::{NarrationSegment, PageRange, Section, SectionArtifacts, SupportingDataItem};
