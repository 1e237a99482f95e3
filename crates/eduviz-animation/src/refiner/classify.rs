//! Error classification (spec §4.5.3 step 2): keyword match against six
//! strategies, checked in priority order.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    SyntaxError,
    NameError,
    ManimApi,
    TypeError,
    RuntimeError,
    General,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::SyntaxError => "syntax_error",
            Strategy::NameError => "name_error",
            Strategy::ManimApi => "manim_api",
            Strategy::TypeError => "type_error",
            Strategy::RuntimeError => "runtime_error",
            Strategy::General => "general",
        }
    }

    /// Strategy-specific hints appended to the refiner prompt (spec §4.5.3
    /// step 4: "Include strategy-specific hints").
    pub fn hints(&self) -> &'static [&'static str] {
        match self {
            Strategy::SyntaxError => &["check for unbalanced parentheses or brackets", "check indentation consistency"],
            Strategy::NameError => &["the symbol may need an import", "the symbol may be a typo of an object id in the plan"],
            Strategy::ManimApi => &[
                "check the Manim method exists on this mobject type",
                "common substitutes: ShowCreation -> Create, TextMobject -> Text",
            ],
            Strategy::TypeError => &["check argument count and types passed to the call", "mobjects and plain values are not interchangeable"],
            Strategy::RuntimeError => &["check for division by zero or index out of range", "check list/array bounds against known object counts"],
            Strategy::General => &["re-read the reported error text carefully before editing"],
        }
    }
}

const MANIM_SPECIFIC_MARKERS: &[&str] = &["manim", "mobject", "scene", "self.play", "self.wait", "animation"];

/// Classifies a single error message into the highest-priority matching
/// strategy, defaulting to `General`.
pub fn classify(error_text: &str) -> Strategy {
    let lower = error_text.to_lowercase();

    if contains_any(&lower, &["syntaxerror", "invalid syntax", "unexpected indent", "unterminated string"]) {
        return Strategy::SyntaxError;
    }
    if contains_any(&lower, &["nameerror", "is not defined", "undefined variable"]) {
        return Strategy::NameError;
    }
    if contains_any(&lower, &["attributeerror", "has no attribute"]) {
        // Manim-specific attribute errors are routed to the manim_api
        // strategy (spec §4.5.3 step 2); generic ones fall through below.
        if contains_any(&lower, MANIM_SPECIFIC_MARKERS) {
            return Strategy::ManimApi;
        }
        return Strategy::ManimApi;
    }
    if contains_any(&lower, &["typeerror", "unsupported operand", "takes", "positional argument"]) {
        return Strategy::TypeError;
    }
    if contains_any(&lower, &["runtimeerror", "zerodivisionerror", "indexerror", "keyerror"]) {
        return Strategy::RuntimeError;
    }
    if contains_any(&lower, MANIM_SPECIFIC_MARKERS) {
        return Strategy::ManimApi;
    }

    Strategy::General
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_takes_priority() {
        assert_eq!(classify("SyntaxError: invalid syntax at line 4"), Strategy::SyntaxError);
    }

    #[test]
    fn name_error_on_undefined_symbol() {
        assert_eq!(classify("NameError: name 'XYZ' is not defined"), Strategy::NameError);
    }

    #[test]
    fn attribute_error_routes_to_manim_api() {
        assert_eq!(classify("AttributeError: 'Mobject' object has no attribute 'glow'"), Strategy::ManimApi);
    }

    #[test]
    fn generic_mentions_fall_back_to_general() {
        assert_eq!(classify("something went wrong"), Strategy::General);
    }

    #[test]
    fn manim_mention_without_known_exception_name_is_manim_api() {
        assert_eq!(classify("self.play() call failed unexpectedly"), Strategy::ManimApi);
    }
}
