//! Choreographer (spec §4.5.1): produces a normalized Choreography Plan v2
//! from a section's narration, segments, and target duration.

use eduviz_gateway::{Gateway, GenerateConfig, GenerateOpts, ResponseFormat, Turn};
use eduviz_models::{
    AbsolutePlacement, ChoreographyPlan, Constraints, Lifecycle, ObjectContent, Placement,
    PlacementType, Relation, RelativePlacement, Scene, SceneMode, SceneObject, TimelineAction,
    TimelineSegment,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{AnimationError, AnimationResult};

pub struct ChoreographerInput<'a> {
    pub narration: &'a str,
    pub segment_count: usize,
    pub target_duration: f64,
    pub style: &'a str,
    pub language: &'a str,
    pub visual_hints: &'a [String],
}

fn build_prompt(input: &ChoreographerInput, compact: bool) -> String {
    let hints = if input.visual_hints.is_empty() {
        "none".to_string()
    } else {
        input.visual_hints.join(", ")
    };
    if compact {
        format!(
            "Produce a short scene plan (objects, a timeline, constraints) for this narration in {} seconds. \
Style: {}. Language: {}. Visual hints: {}.\n\nNarration:\n{}",
            input.target_duration, input.style, input.language, hints, input.narration
        )
    } else {
        format!(
            "Produce a Choreography Plan for an educational animation covering this narration, lasting \
approximately {} seconds ({} narration segments). Style: {}. Language: {}. Visual hints: {}.\n\n\
Narration:\n{}",
            input.target_duration, input.segment_count, input.style, input.language, hints, input.narration
        )
    }
}

pub async fn generate_plan(gateway: &Gateway, job_id: &str, input: &ChoreographerInput<'_>) -> AnimationResult<ChoreographyPlan> {
    let schema = schemars::schema_for!(ChoreographyPlan);
    let full_prompt = build_prompt(input, false);
    let config = GenerateConfig {
        response_format: ResponseFormat::Json,
        response_schema: Some(serde_json::to_value(&schema).unwrap_or_default()),
        require_json_valid: true,
        max_retries: 2,
        ..Default::default()
    };
    let opts = GenerateOpts {
        contents: Some(vec![Turn::user(full_prompt.clone())]),
        ..Default::default()
    };

    let result = gateway.generate(job_id, &full_prompt, &config, &opts).await;
    if result.success {
        if let Some(value) = &result.parsed_json {
            if let Some(plan) = normalize_plan(value, input.target_duration, input.language) {
                return Ok(plan);
            }
            warn!("full-schema choreography response failed normalization, falling back");
        }
    } else {
        warn!("full-schema choreography call failed: {:?}", result.error);
    }

    // Compact fallback: shorter prompt, no schema enforcement.
    let compact_prompt = build_prompt(input, true);
    let compact_config = GenerateConfig {
        response_format: ResponseFormat::Json,
        response_schema: None,
        require_json_valid: true,
        max_retries: 2,
        ..Default::default()
    };
    let compact_opts = GenerateOpts {
        contents: Some(vec![Turn::user(compact_prompt.clone())]),
        ..Default::default()
    };
    let compact_result = gateway.generate(job_id, &compact_prompt, &compact_config, &compact_opts).await;

    if compact_result.success {
        if let Some(value) = &compact_result.parsed_json {
            if let Some(plan) = normalize_plan(value, input.target_duration, input.language) {
                return Ok(plan);
            }
        }
    }

    Err(AnimationError::Choreography(
        compact_result.error.unwrap_or_else(|| "normalization failed on both attempts".to_string()),
    ))
}

/// Accepts either a v2-shaped plan or a legacy/loose shape and coerces it
/// into normalized v2 (spec §4.5.1 step 4). Returns `None` only when the
/// value has no recognizable object list at all.
pub fn normalize_plan(value: &Value, target_duration: f64, language: &str) -> Option<ChoreographyPlan> {
    if let Ok(plan) = serde_json::from_value::<ChoreographyPlan>(value.clone()) {
        if plan.is_valid() {
            return Some(plan);
        }
    }

    let objects_value = value.get("objects").or_else(|| value.get("mobjects"))?;
    let objects_array = objects_value.as_array()?;

    let scene = normalize_scene(value.get("scene"));
    let mut objects: Vec<SceneObject> = Vec::new();
    let mut seen_ids: std::collections::HashSet<String> = std::collections::HashSet::new();

    for (i, raw) in objects_array.iter().enumerate() {
        let mut id = raw
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("obj_{i}"));
        if !seen_ids.insert(id.clone()) {
            id = format!("{id}_{i}");
            seen_ids.insert(id.clone());
        }

        let kind = raw.get("kind").and_then(Value::as_str).unwrap_or("shape").to_string();
        let content = ObjectContent {
            text: raw.get("content").and_then(|c| c.get("text")).and_then(Value::as_str).map(str::to_string),
            latex: raw.get("content").and_then(|c| c.get("latex")).and_then(Value::as_str).map(str::to_string),
            asset_path: raw.get("content").and_then(|c| c.get("asset_path")).and_then(Value::as_str).map(str::to_string),
        };
        let placement = normalize_placement(raw.get("placement"));
        let lifecycle = Lifecycle {
            appear_at: raw.get("lifecycle").and_then(|l| l.get("appear_at")).and_then(Value::as_f64).unwrap_or(0.0),
            remove_at: raw
                .get("lifecycle")
                .and_then(|l| l.get("remove_at"))
                .and_then(Value::as_f64)
                .unwrap_or(target_duration),
        };

        objects.push(SceneObject { id, kind, content, placement, lifecycle });
    }

    let timeline = normalize_timeline(value, &objects, target_duration);

    let constraints = Constraints {
        language: language.to_string(),
        max_visible_objects: value
            .get("constraints")
            .and_then(|c| c.get("max_visible_objects"))
            .and_then(Value::as_u64)
            .map(|v| v as u32)
            .unwrap_or(8),
        forbidden_constants: Vec::new(),
    };

    let plan = ChoreographyPlan { scene, objects, timeline, constraints };
    Some(repair_targets(plan))
}

fn normalize_scene(raw: Option<&Value>) -> Scene {
    let Some(raw) = raw else { return Scene::default() };
    let mode = match raw.get("mode").and_then(Value::as_str) {
        Some("3D") | Some("3d") => SceneMode::ThreeD,
        _ => SceneMode::TwoD,
    };
    Scene { mode, camera: raw.get("camera").cloned(), safe_bounds: Default::default() }
}

fn normalize_placement(raw: Option<&Value>) -> Placement {
    let Some(raw) = raw else {
        return Placement { kind: PlacementType::Absolute, absolute: Some(AbsolutePlacement { x: 0.0, y: 0.0 }), relative: None };
    };

    let is_relative = raw.get("type").and_then(Value::as_str) == Some("relative") || raw.get("relative_to").is_some();

    if is_relative {
        if let Some(relative_to) = raw.get("relative_to").and_then(Value::as_str) {
            let relation = match raw.get("relation").and_then(Value::as_str) {
                Some("above") => Relation::Above,
                Some("left_of") => Relation::LeftOf,
                Some("right_of") => Relation::RightOf,
                _ => Relation::Below,
            };
            let spacing = raw.get("spacing").and_then(Value::as_f64).unwrap_or(0.5);
            return Placement {
                kind: PlacementType::Relative,
                absolute: None,
                relative: Some(RelativePlacement { relative_to: relative_to.to_string(), relation, spacing }),
            };
        }
    }

    let x = raw.get("x").and_then(Value::as_f64).unwrap_or(0.0);
    let y = raw.get("y").and_then(Value::as_f64).unwrap_or(0.0);
    Placement { kind: PlacementType::Absolute, absolute: Some(AbsolutePlacement { x, y }), relative: None }
}

fn normalize_timeline(value: &Value, objects: &[SceneObject], target_duration: f64) -> Vec<TimelineSegment> {
    if let Some(segments) = value.get("timeline").and_then(Value::as_array) {
        if !segments.is_empty() {
            return segments
                .iter()
                .enumerate()
                .map(|(i, seg)| {
                    let start_at = seg.get("start_at").and_then(Value::as_f64).unwrap_or(0.0);
                    let end_at = seg.get("end_at").and_then(Value::as_f64).unwrap_or(target_duration).max(start_at);
                    let actions = seg
                        .get("actions")
                        .and_then(Value::as_array)
                        .map(|acts| acts.iter().filter_map(normalize_action).collect())
                        .unwrap_or_default();
                    TimelineSegment { segment_index: i, start_at, end_at, actions }
                })
                .collect();
        }
    }

    // Legacy flat "actions" list: wrap in a single segment spanning the target duration.
    let flat_actions = value
        .get("actions")
        .and_then(Value::as_array)
        .map(|acts| acts.iter().filter_map(normalize_action).collect())
        .unwrap_or_else(|| default_actions_for(objects));

    vec![TimelineSegment { segment_index: 0, start_at: 0.0, end_at: target_duration, actions: flat_actions }]
}

fn normalize_action(raw: &Value) -> Option<TimelineAction> {
    let target = raw.get("target").and_then(Value::as_str)?.to_string();
    Some(TimelineAction {
        at: raw.get("at").and_then(Value::as_f64).unwrap_or(0.0),
        op: raw.get("op").and_then(Value::as_str).unwrap_or("write").to_string(),
        target,
        source: raw.get("source").and_then(Value::as_str).map(str::to_string),
        run_time: raw.get("run_time").and_then(Value::as_f64).unwrap_or(1.0).max(0.1),
    })
}

fn default_actions_for(objects: &[SceneObject]) -> Vec<TimelineAction> {
    objects
        .iter()
        .map(|o| TimelineAction { at: o.lifecycle.appear_at, op: "write".to_string(), target: o.id.clone(), source: None, run_time: 1.0 })
        .collect()
}

/// Drops timeline actions whose target does not resolve to any known
/// object id or scene builtin, rather than failing the whole plan.
fn repair_targets(mut plan: ChoreographyPlan) -> ChoreographyPlan {
    let resolvable: Vec<bool> = plan
        .timeline
        .iter()
        .flat_map(|seg| seg.actions.iter())
        .map(|a| plan.resolves_target(&a.target))
        .collect();
    let mut i = 0;
    for segment in &mut plan.timeline {
        segment.actions.retain(|_| {
            let keep = resolvable[i];
            i += 1;
            keep
        });
    }
    info!(objects = plan.objects.len(), segments = plan.timeline.len(), "normalized choreography plan");
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_legacy_flat_action_shape() {
        let value = json!({
            "objects": [{"id": "title", "kind": "text", "content": {"text": "Hi"}}],
            "actions": [{"target": "title", "op": "write"}]
        });
        let plan = normalize_plan(&value, 10.0, "en").unwrap();
        assert!(plan.is_valid());
        assert_eq!(plan.timeline.len(), 1);
    }

    #[test]
    fn drops_unresolved_targets_instead_of_failing() {
        let value = json!({
            "objects": [{"id": "title"}],
            "actions": [{"target": "ghost", "op": "write"}]
        });
        let plan = normalize_plan(&value, 5.0, "en").unwrap();
        assert!(plan.timeline[0].actions.is_empty());
        assert!(plan.is_valid());
    }

    #[test]
    fn deduplicates_repeated_ids() {
        let value = json!({
            "objects": [{"id": "a"}, {"id": "a"}],
        });
        let plan = normalize_plan(&value, 5.0, "en").unwrap();
        assert!(plan.object_ids_unique());
    }
}
