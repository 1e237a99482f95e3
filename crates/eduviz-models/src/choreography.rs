//! Choreography Plan v2 (spec §3) — the normalized scene description that is
//! the single carrier of intent between the Choreographer and the
//! Implementer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SceneMode {
    #[serde(rename = "2D")]
    TwoD,
    #[serde(rename = "3D")]
    ThreeD,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SafeBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for SafeBounds {
    fn default() -> Self {
        Self {
            x_min: -5.5,
            x_max: 5.5,
            y_min: -3.0,
            y_max: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    pub mode: SceneMode,
    #[serde(default)]
    pub camera: Option<serde_json::Value>,
    #[serde(default)]
    pub safe_bounds: SafeBounds,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            mode: SceneMode::TwoD,
            camera: None,
            safe_bounds: SafeBounds::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlacementType {
    Absolute,
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Above,
    Below,
    LeftOf,
    RightOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AbsolutePlacement {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RelativePlacement {
    pub relative_to: String,
    pub relation: Relation,
    pub spacing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Placement {
    #[serde(rename = "type")]
    pub kind: PlacementType,
    #[serde(default)]
    pub absolute: Option<AbsolutePlacement>,
    #[serde(default)]
    pub relative: Option<RelativePlacement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectContent {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub latex: Option<String>,
    #[serde(default)]
    pub asset_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Lifecycle {
    pub appear_at: f64,
    pub remove_at: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneObject {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub content: ObjectContent,
    pub placement: Placement,
    pub lifecycle: Lifecycle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimelineAction {
    pub at: f64,
    pub op: String,
    pub target: String,
    #[serde(default)]
    pub source: Option<String>,
    pub run_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimelineSegment {
    pub segment_index: usize,
    pub start_at: f64,
    pub end_at: f64,
    pub actions: Vec<TimelineAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Constraints {
    pub language: String,
    pub max_visible_objects: u32,
    #[serde(default)]
    pub forbidden_constants: Vec<String>,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            max_visible_objects: 8,
            forbidden_constants: Vec::new(),
        }
    }
}

/// Normalized scene description produced by the Choreographer.
///
/// Invariants: object ids unique; every timeline `target` resolves to an
/// object id or scene built-in; `appear_at <= remove_at`; segment
/// timelines are non-overlapping and sorted; forbidden placement constants
/// are never emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChoreographyPlan {
    pub scene: Scene,
    pub objects: Vec<SceneObject>,
    pub timeline: Vec<TimelineSegment>,
    pub constraints: Constraints,
}

/// Scene built-ins a timeline `target` may resolve to without an object id.
pub const SCENE_BUILTINS: &[&str] = &["scene", "camera"];

impl ChoreographyPlan {
    pub fn object_ids_unique(&self) -> bool {
        let mut ids: Vec<&str> = self.objects.iter().map(|o| o.id.as_str()).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        ids.len() == before
    }

    pub fn resolves_target(&self, target: &str) -> bool {
        SCENE_BUILTINS.contains(&target) || self.objects.iter().any(|o| o.id == target)
    }

    pub fn timeline_is_sorted_and_disjoint(&self) -> bool {
        let mut prev_end: Option<f64> = None;
        let mut segs: Vec<&TimelineSegment> = self.timeline.iter().collect();
        segs.sort_by(|a, b| a.start_at.partial_cmp(&b.start_at).unwrap());
        for seg in segs {
            if seg.start_at > seg.end_at {
                return false;
            }
            if let Some(pe) = prev_end {
                if seg.start_at < pe {
                    return false;
                }
            }
            prev_end = Some(seg.end_at);
        }
        true
    }

    pub fn lifecycles_valid(&self) -> bool {
        self.objects.iter().all(|o| o.lifecycle.appear_at <= o.lifecycle.remove_at)
    }

    pub fn all_targets_resolve(&self) -> bool {
        self.timeline
            .iter()
            .flat_map(|seg| seg.actions.iter())
            .all(|action| self.resolves_target(&action.target))
    }

    pub fn no_forbidden_constants(&self, text: &str) -> bool {
        !self
            .constraints
            .forbidden_constants
            .iter()
            .any(|c| text.contains(c.as_str()))
    }

    /// Full invariant check (used by the Refiner and by tests of
    /// normalization idempotence, P7).
    pub fn is_valid(&self) -> bool {
        self.object_ids_unique()
            && self.all_targets_resolve()
            && self.lifecycles_valid()
            && self.timeline_is_sorted_and_disjoint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_plan() -> ChoreographyPlan {
        ChoreographyPlan {
            scene: Scene::default(),
            objects: vec![SceneObject {
                id: "title".into(),
                kind: "text".into(),
                content: ObjectContent {
                    text: Some("Hello".into()),
                    ..Default::default()
                },
                placement: Placement {
                    kind: PlacementType::Absolute,
                    absolute: Some(AbsolutePlacement { x: 0.0, y: 0.0 }),
                    relative: None,
                },
                lifecycle: Lifecycle {
                    appear_at: 0.0,
                    remove_at: 2.0,
                },
            }],
            timeline: vec![TimelineSegment {
                segment_index: 0,
                start_at: 0.0,
                end_at: 2.0,
                actions: vec![TimelineAction {
                    at: 0.0,
                    op: "write".into(),
                    target: "title".into(),
                    source: None,
                    run_time: 1.0,
                }],
            }],
            constraints: Constraints::default(),
        }
    }

    #[test]
    fn minimal_plan_is_valid() {
        assert!(minimal_plan().is_valid());
    }

    #[test]
    fn duplicate_object_ids_invalid() {
        let mut plan = minimal_plan();
        let dup = plan.objects[0].clone();
        plan.objects.push(dup);
        assert!(!plan.object_ids_unique());
        assert!(!plan.is_valid());
    }

    #[test]
    fn unresolved_target_invalid() {
        let mut plan = minimal_plan();
        plan.timeline[0].actions[0].target = "missing".into();
        assert!(!plan.all_targets_resolve());
        assert!(!plan.is_valid());
    }

    #[test]
    fn overlapping_segments_invalid() {
        let mut plan = minimal_plan();
        plan.timeline.push(TimelineSegment {
            segment_index: 1,
            start_at: 1.0,
            end_at: 3.0,
            actions: vec![],
        });
        assert!(!plan.timeline_is_sorted_and_disjoint());
    }
}
