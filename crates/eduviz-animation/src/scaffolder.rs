//! Scaffolder (glossary): wraps a cleaned snippet in a fixed import block
//! and a scene class header to produce a complete source file.

/// Symbols whose presence in the snippet triggers an extra import line.
const AUTO_IMPORTS: &[(&str, &str)] = &[
    ("np.", "import numpy as np"),
    ("math.", "import math"),
    ("random.", "import random"),
    ("itertools.", "import itertools"),
];

const BASE_PRELUDE: &str = "from manim import *\n";

pub struct Scaffolded {
    pub source: String,
    /// Number of lines preceding the snippet body; used to translate
    /// renderer-reported line numbers back to snippet-local ones.
    pub prelude_lines: usize,
}

/// Assembles the final source file from a class name and a cleaned,
/// already-reindented snippet body.
pub fn scaffold(class_name: &str, snippet_body: &str) -> Scaffolded {
    let mut prelude = String::from(BASE_PRELUDE);
    for (marker, import_line) in AUTO_IMPORTS {
        if snippet_body.contains(marker) {
            prelude.push_str(import_line);
            prelude.push('\n');
        }
    }
    prelude.push('\n');

    let header = format!("class {class_name}(Scene):\n    def construct(self):\n");
    let prelude_lines = prelude.lines().count() + header.lines().count();

    let body = if snippet_body.trim().is_empty() { "        pass".to_string() } else { snippet_body.to_string() };

    let source = format!("{prelude}{header}{body}\n");
    Scaffolded { source, prelude_lines }
}

/// Guards a PascalCased section class name (spec §3: "stable id,
/// PascalCased into a class name for the renderer") against the one case
/// `Section::class_name` doesn't: a leading digit, which Python identifiers
/// cannot start with.
pub fn safe_class_name(pascal_name: &str) -> String {
    if pascal_name.is_empty() {
        return "Section".to_string();
    }
    if pascal_name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("Scene{pascal_name}")
    } else {
        pascal_name.to_string()
    }
}

/// Translates a line number reported against the full scaffolded file back
/// to a snippet-local line number, if it falls within the body.
pub fn translate_line(full_file_line: usize, prelude_lines: usize) -> Option<usize> {
    full_file_line.checked_sub(prelude_lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_well_formed_names() {
        assert_eq!(safe_class_name("IntroToForces"), "IntroToForces");
    }

    #[test]
    fn prefixes_leading_digit() {
        assert_eq!(safe_class_name("3dRotations"), "Scene3dRotations");
    }

    #[test]
    fn detects_numpy_usage_and_adds_import() {
        let scaffolded = scaffold("Section1Scene", "        arr = np.array([1, 2, 3])");
        assert!(scaffolded.source.contains("import numpy as np"));
    }

    #[test]
    fn omits_unused_auto_imports() {
        let scaffolded = scaffold("Section1Scene", "        self.wait(1)");
        assert!(!scaffolded.source.contains("import numpy"));
    }

    #[test]
    fn empty_body_becomes_pass() {
        let scaffolded = scaffold("EmptyScene", "   ");
        assert!(scaffolded.source.contains("pass"));
    }

    #[test]
    fn line_translation_subtracts_prelude() {
        assert_eq!(translate_line(12, 5), Some(7));
        assert_eq!(translate_line(2, 5), None);
    }
}
