//! Implementer (spec §4.5.2): turns a normalized plan into a raw code
//! snippet, then cleans it into the body of a single rendering routine.

use eduviz_gateway::{Gateway, GenerateConfig, GenerateOpts, ResponseFormat, Turn};
use eduviz_models::ChoreographyPlan;
use regex::Regex;

use crate::error::{AnimationError, AnimationResult};

/// Indentation level the cleaned snippet is normalized to before scaffolding.
pub const SNIPPET_INDENT: usize = 8;

fn build_prompt(plan: &ChoreographyPlan, target_duration: f64, temperature_note: &str) -> String {
    let plan_json = serde_json::to_string_pretty(plan).unwrap_or_default();
    format!(
        "Write the body of a single Manim construct method implementing this Choreography Plan. \
Target duration: {target_duration:.1} seconds. {temperature_note}\n\
Return only the method body (no enclosing class, no imports, no `def construct(self):` line). \
Wrap the code in a single fenced code block.\n\nPlan:\n{plan_json}"
    )
}

pub async fn generate_snippet(
    gateway: &Gateway,
    job_id: &str,
    plan: &ChoreographyPlan,
    target_duration: f64,
    temperature: f32,
) -> AnimationResult<String> {
    let note = if temperature > 0.4 {
        "Prior attempts for this section failed; vary your approach from a typical solution."
    } else {
        ""
    };
    let prompt = build_prompt(plan, target_duration, note);
    let config = GenerateConfig { response_format: ResponseFormat::Text, temperature, max_retries: 2, ..Default::default() };
    let opts = GenerateOpts { contents: Some(vec![Turn::user(prompt.clone())]), ..Default::default() };

    let result = gateway.generate(job_id, &prompt, &config, &opts).await;
    if !result.success {
        return Err(AnimationError::Gateway(result.error.unwrap_or_else(|| "implementer call failed".to_string())));
    }

    Ok(clean_snippet(&result.response))
}

/// Extracts the longest fenced block (if any), strips import/class/
/// signature lines, and reindents to [`SNIPPET_INDENT`].
pub fn clean_snippet(raw: &str) -> String {
    let body = extract_longest_fence(raw).unwrap_or(raw);
    let stripped = strip_boilerplate_lines(body);
    reindent(&stripped, SNIPPET_INDENT)
}

fn extract_longest_fence(text: &str) -> Option<&str> {
    let fence = Regex::new(r"```(?:python)?\n([\s\S]*?)```").ok()?;
    fence
        .captures_iter(text)
        .map(|c| c.get(1).unwrap().as_str())
        .max_by_key(|s| s.len())
}

fn strip_boilerplate_lines(body: &str) -> String {
    let import_re = Regex::new(r"^\s*(import |from )").unwrap();
    let class_re = Regex::new(r"^\s*class\s+\w+").unwrap();
    let def_re = Regex::new(r"^\s*def\s+construct\s*\(").unwrap();

    body.lines()
        .filter(|line| !import_re.is_match(line) && !class_re.is_match(line) && !def_re.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Re-indents so the snippet's minimum nonblank indentation becomes `target`.
fn reindent(body: &str, target: usize) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let min_indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let pad = " ".repeat(target);
    lines
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{pad}{}", &line[min_indent.min(line.len())..])
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_longest_fenced_block() {
        let raw = "here's a short one:\n```python\nx = 1\n```\nand the real one:\n```python\nself.play(Write(title))\nself.wait(1)\n```\n";
        let cleaned = clean_snippet(raw);
        assert!(cleaned.contains("self.play"));
        assert!(!cleaned.contains("x = 1"));
    }

    #[test]
    fn strips_imports_and_class_header() {
        let raw = "```python\nimport numpy as np\nclass MyScene(Scene):\n    def construct(self):\n        self.play(Write(title))\n```";
        let cleaned = clean_snippet(raw);
        assert!(!cleaned.contains("import"));
        assert!(!cleaned.contains("class MyScene"));
        assert!(cleaned.contains("self.play(Write(title))"));
    }

    #[test]
    fn reindents_to_configured_level() {
        let cleaned = clean_snippet("```python\nself.play(Write(title))\n```");
        assert!(cleaned.starts_with(&" ".repeat(SNIPPET_INDENT)));
    }
}
