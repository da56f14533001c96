//! Source-stripping transpiler: erases static-type syntax from the
//! author's annotated body before execution.
//!
//! This is deliberately a best-effort, order-sensitive text transform over
//! a small constrained language subset, not a compiler. The rule order is
//! fixed because each rule can interact with artifacts of the previous one
//! (comment stripping must run before annotation erasure so commented-out
//! type syntax cannot corrupt the output). The pipeline never errors;
//! unsupported syntax yields output that fails later, at execution time.

use std::sync::OnceLock;

use regex::Regex;

struct Rule {
    pattern: &'static Regex,
    replacement: &'static str,
}

/// Applies the fixed erasure pipeline, in order:
/// 1. block comments
/// 2. `interface Name { … }` declarations
/// 3. `type Name = …;` aliases
/// 4. `: Type` annotations before `,` or `)`
/// 5. `): Type` return annotations before `{`
/// 6. `as Type` casts
/// 7. generic argument lists attached to an identifier
/// 8. runs of three or more blank lines, collapsed to two
///
/// Idempotent: re-running on its own output is a no-op.
pub fn strip_source(source: &str) -> String {
    let mut out = source.to_string();
    for rule in rules() {
        out = rule
            .pattern
            .replace_all(&out, rule.replacement)
            .into_owned();
    }
    out
}

fn rules() -> &'static [Rule; 8] {
    static RULES: OnceLock<[Rule; 8]> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            Rule {
                pattern: block_comment_re(),
                replacement: "",
            },
            Rule {
                pattern: interface_re(),
                replacement: "",
            },
            Rule {
                pattern: type_alias_re(),
                replacement: "",
            },
            Rule {
                pattern: annotation_re(),
                replacement: "$delim",
            },
            Rule {
                pattern: return_annotation_re(),
                replacement: ") {",
            },
            Rule {
                pattern: cast_re(),
                replacement: "",
            },
            Rule {
                pattern: generic_args_re(),
                replacement: "$ident",
            },
            Rule {
                pattern: blank_run_re(),
                replacement: "\n\n",
            },
        ]
    })
}

fn block_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"))
}

fn interface_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\binterface\s+[A-Za-z_$][\w$]*\s*\{[^{}]*\}").expect("valid regex")
    })
}

fn type_alias_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\btype\s+[A-Za-z_$][\w$]*\s*=[^;]*;").expect("valid regex"))
}

fn annotation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#":\s*[A-Za-z_$][\w$.]*(?:\[\])?\s*(?P<delim>[,)])"#).expect("valid regex")
    })
}

fn return_annotation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\)\s*:\s*[^{\n]+\{").expect("valid regex"))
}

fn cast_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\s+as\s+[A-Za-z_$][\w$.]*(?:\[\])?").expect("valid regex")
    })
}

fn generic_args_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?P<ident>[A-Za-z_$][\w$]*)<[\w$,\s.\[\]"|]*>"#).expect("valid regex")
    })
}

fn blank_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)(?:^[ \t]*\n){3,}").expect("valid regex"))
}

#[cfg(test)]
mod tests {
    use super::strip_source;

    #[test]
    fn strips_parameter_and_return_annotations() {
        let source = "function helper(a: number, b: string): boolean {\n  return a > 0;\n}";
        let stripped = strip_source(source);
        assert_eq!(
            stripped,
            "function helper(a, b) {\n  return a > 0;\n}"
        );
    }

    #[test]
    fn strips_interfaces_aliases_and_casts() {
        let source = "interface Extra { a: number }\ntype Flag = boolean;\nconst x = params.qty as number;\nreturn x;";
        let stripped = strip_source(source);
        assert!(!stripped.contains("interface"));
        assert!(!stripped.contains("type Flag"));
        assert!(stripped.contains("const x = params.qty;"));
    }

    #[test]
    fn comment_stripping_runs_before_annotation_erasure() {
        let source = "/* old: number, draft) */\nreturn params.qty;";
        let stripped = strip_source(source);
        assert_eq!(stripped.trim(), "return params.qty;");
    }

    #[test]
    fn strips_generic_argument_lists() {
        let source = "const seen = new Set<string>();\nreturn seen.has(params.color);";
        let stripped = strip_source(source);
        assert!(stripped.contains("new Set();"));
    }

    #[test]
    fn collapses_blank_runs_to_two_lines() {
        let source = "a\n\n\n\n\n\nb";
        assert_eq!(strip_source(source), "a\n\n\nb");
    }

    #[test]
    fn is_idempotent() {
        let source = "interface I { x: number }\nfunction f(a: number): number {\n\n\n\n\n  return (a as number) + 1;\n}";
        let once = strip_source(source);
        assert_eq!(strip_source(&once), once);
    }

    #[test]
    fn leaves_comparisons_alone() {
        let source = "return params.qty < 10 && params.qty > 2;";
        assert_eq!(strip_source(source), source);
    }
}
