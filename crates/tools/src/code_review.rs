//! Code review tool: static line-level heuristics.
//!
//! Gives the model concrete findings to build a review on instead of asking
//! it to spot everything unaided. Checks are language-agnostic where
//! possible; a few only fire for the language they apply to.

use async_trait::async_trait;
use localagent_core::error::ToolError;
use localagent_core::tool::{Tool, ToolResult};
use serde::Serialize;

use crate::primary_arg;

const MAX_LINE_LENGTH: usize = 100;
const MAX_INDENT_DEPTH: usize = 5;
const MAX_FINDINGS: usize = 25;

pub struct CodeReviewTool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub line: usize,
    pub rule: &'static str,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Language {
    Python,
    Rust,
    JavaScript,
    Other,
}

impl Language {
    fn detect(hint: Option<&str>, code: &str) -> Self {
        match hint.map(|h| h.trim().to_lowercase()).as_deref() {
            Some("python" | "py") => return Self::Python,
            Some("rust" | "rs") => return Self::Rust,
            Some("javascript" | "js" | "typescript" | "ts") => return Self::JavaScript,
            Some(_) => return Self::Other,
            None => {}
        }

        if code.contains("fn ") && (code.contains("let ") || code.contains("->")) {
            Self::Rust
        } else if code.contains("def ") || (code.contains("import ") && code.contains(':')) {
            Self::Python
        } else if code.contains("function ") || code.contains("const ") || code.contains("=>") {
            Self::JavaScript
        } else {
            Self::Other
        }
    }
}

/// Run every heuristic over `code`, in line order.
pub fn review(code: &str, language_hint: Option<&str>) -> Vec<Finding> {
    let language = Language::detect(language_hint, code);
    let mut findings = Vec::new();
    let mut saw_tab_indent = false;
    let mut saw_space_indent = false;

    for (idx, line) in code.lines().enumerate() {
        let n = idx + 1;
        let trimmed = line.trim_start();
        let mut push = |rule: &'static str, severity: Severity, message: String| {
            findings.push(Finding { line: n, rule, severity, message });
        };

        if line.chars().count() > MAX_LINE_LENGTH {
            push(
                "line-too-long",
                Severity::Info,
                format!("Line is {} characters (limit {MAX_LINE_LENGTH})", line.chars().count()),
            );
        }

        if line != line.trim_end() {
            push("trailing-whitespace", Severity::Info, "Trailing whitespace".into());
        }

        let indent = &line[..line.len() - trimmed.len()];
        if !trimmed.is_empty() {
            saw_tab_indent |= indent.contains('\t');
            saw_space_indent |= indent.contains(' ');
            let depth = indent.chars().filter(|c| *c == '\t').count() + indent.matches("    ").count();
            if depth > MAX_INDENT_DEPTH {
                push(
                    "deep-nesting",
                    Severity::Warning,
                    format!("Nested {depth} levels deep; consider extracting a function"),
                );
            }
        }

        let upper = trimmed.to_uppercase();
        if ["TODO", "FIXME", "XXX"].iter().any(|m| upper.contains(m)) && is_comment(trimmed, language) {
            push("todo-marker", Severity::Info, "Unresolved TODO/FIXME marker".into());
        }

        let lowered = trimmed.to_lowercase();
        if ["password", "secret", "api_key", "apikey", "token"]
            .iter()
            .any(|k| lowered.contains(k))
            && (lowered.contains("= \"") || lowered.contains("= '") || lowered.contains("=\"") || lowered.contains("='"))
        {
            push(
                "hardcoded-secret",
                Severity::Error,
                "Possible hardcoded credential; load it from the environment".into(),
            );
        }

        match language {
            Language::Python => {
                if trimmed.starts_with("except:") {
                    push(
                        "bare-except",
                        Severity::Warning,
                        "Bare `except:` also catches KeyboardInterrupt and SystemExit".into(),
                    );
                }
                if trimmed.starts_with("print(") {
                    push("debug-output", Severity::Info, "print() left in code; prefer logging".into());
                }
                if trimmed.contains("eval(") || trimmed.contains("exec(") {
                    push("dynamic-eval", Severity::Error, "eval/exec on dynamic input is unsafe".into());
                }
                if trimmed.starts_with("from ") && trimmed.ends_with("import *") {
                    push("wildcard-import", Severity::Warning, "Wildcard import hides where names come from".into());
                }
            }
            Language::Rust => {
                if trimmed.contains(".unwrap()") {
                    push(
                        "unwrap",
                        Severity::Warning,
                        "`.unwrap()` panics on error; propagate with `?` instead".into(),
                    );
                }
                if trimmed.starts_with("dbg!(") || trimmed.starts_with("println!(\"DEBUG") {
                    push("debug-output", Severity::Info, "Debug output left in code".into());
                }
                if trimmed.starts_with("unsafe ") || trimmed.contains(" unsafe {") {
                    push("unsafe-block", Severity::Warning, "`unsafe` block needs a safety comment".into());
                }
            }
            Language::JavaScript => {
                if trimmed.contains("console.log(") {
                    push("debug-output", Severity::Info, "console.log left in code".into());
                }
                if trimmed.contains("eval(") {
                    push("dynamic-eval", Severity::Error, "eval on dynamic input is unsafe".into());
                }
                if trimmed.starts_with("var ") {
                    push("var-declaration", Severity::Info, "Prefer `let` or `const` over `var`".into());
                }
                if trimmed.contains(" == ") && !trimmed.contains(" === ") {
                    push("loose-equality", Severity::Warning, "Use `===` to avoid type coercion".into());
                }
            }
            Language::Other => {}
        }
    }

    if saw_tab_indent && saw_space_indent {
        findings.push(Finding {
            line: 0,
            rule: "mixed-indentation",
            severity: Severity::Warning,
            message: "File mixes tab and space indentation".into(),
        });
    }

    findings
}

fn is_comment(trimmed: &str, language: Language) -> bool {
    match language {
        Language::Python => trimmed.starts_with('#'),
        Language::Rust | Language::JavaScript => trimmed.starts_with("//") || trimmed.starts_with("/*"),
        Language::Other => {
            trimmed.starts_with('#') || trimmed.starts_with("//") || trimmed.starts_with("/*")
        }
    }
}

fn render(findings: &[Finding]) -> String {
    if findings.is_empty() {
        return "No issues found by the static checks.".into();
    }

    let mut lines = vec![format!("Found {} issue(s):", findings.len())];
    for f in findings.iter().take(MAX_FINDINGS) {
        let severity = match f.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        if f.line == 0 {
            lines.push(format!("- [{severity}] {}: {}", f.rule, f.message));
        } else {
            lines.push(format!("- line {} [{severity}] {}: {}", f.line, f.rule, f.message));
        }
    }
    if findings.len() > MAX_FINDINGS {
        lines.push(format!("... and {} more", findings.len() - MAX_FINDINGS));
    }
    lines.join("\n")
}

#[async_trait]
impl Tool for CodeReviewTool {
    fn name(&self) -> &str {
        "code_review"
    }

    fn description(&self) -> &str {
        "Run static checks over source code and list concrete issues with line numbers. \
         Input: the code to check."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "The source code to review"
                },
                "language": {
                    "type": "string",
                    "description": "Optional language hint: python, rust, javascript"
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let code = primary_arg(&arguments, "code")
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'code' argument".into()))?;

        let findings = review(code, arguments["language"].as_str());
        tracing::debug!(findings = findings.len(), "Code review complete");

        Ok(ToolResult {
            success: true,
            output: render(&findings),
            data: serde_json::to_value(&findings).ok(),
        })
    }
}
