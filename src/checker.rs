use std::path::{Path, PathBuf};

use crate::error::Result;

const MAX_LINE_LENGTH: usize = 120;
const INDENT_UNIT: usize = 4;

#[derive(Debug, Clone)]
pub struct StyleIssue {
    /// 0-based line number.
    pub line: u32,
    pub message: String,
    pub fixable: bool,
}

#[derive(Debug)]
pub struct CheckOutcome {
    pub issues: Vec<StyleIssue>,
    /// Path of the `.new` sibling, when fixes were written.
    pub fixed: Option<PathBuf>,
}

/// Check one file and write a `<file>.new` sibling when any issue could
/// be fixed mechanically.
pub fn check_file(path: &Path) -> Result<CheckOutcome> {
    let source = std::fs::read_to_string(path)?;
    let (issues, fixed_source) = check_source(&source);
    let mut fixed = None;
    if fixed_source != source && issues.iter().any(|i| i.fixable) {
        let new_path = sibling_path(path);
        std::fs::write(&new_path, fixed_source)?;
        log::info!("wrote style fixes to {}", new_path.display());
        fixed = Some(new_path);
    }
    Ok(CheckOutcome { issues, fixed })
}

fn sibling_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".new");
    path.with_file_name(name)
}

/// Style-check a source text; returns the issues and the fixed text.
pub fn check_source(source: &str) -> (Vec<StyleIssue>, String) {
    let mut issues = Vec::new();
    let mut fixed_lines = Vec::new();

    for (lineno, line) in source.lines().enumerate() {
        let lineno = lineno as u32;
        let mut fixed = line.to_string();

        let rest = fixed.trim_start_matches([' ', '\t']);
        let indent_part = &fixed[..fixed.len() - rest.len()];
        if indent_part.contains('\t') {
            issues.push(StyleIssue {
                line: lineno,
                message: "tab in indentation (use 4 spaces)".to_string(),
                fixable: true,
            });
            fixed = format!("{}{}", indent_part.replace('\t', "    "), rest);
        }

        if fixed.trim_end().len() != fixed.len() {
            issues.push(StyleIssue {
                line: lineno,
                message: "trailing whitespace".to_string(),
                fixable: true,
            });
            fixed.truncate(fixed.trim_end().len());
        }

        let indent = fixed.len() - fixed.trim_start().len();
        if !fixed.trim_start().is_empty() && indent % INDENT_UNIT != 0 {
            issues.push(StyleIssue {
                line: lineno,
                message: format!("indentation of {indent} is not a multiple of {INDENT_UNIT}"),
                fixable: true,
            });
            let rounded = (indent + INDENT_UNIT / 2) / INDENT_UNIT * INDENT_UNIT;
            fixed = format!("{}{}", " ".repeat(rounded), fixed.trim_start());
        }

        if let Some(canonical) = uppercase_hex(&fixed) {
            issues.push(StyleIssue {
                line: lineno,
                message: "lowercase hex literal".to_string(),
                fixable: true,
            });
            fixed = canonical;
        }

        if let Some(name) = declared_symbol(&fixed) {
            if !name
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
            {
                issues.push(StyleIssue {
                    line: lineno,
                    message: format!("symbol name {name} should match [A-Z0-9_]+"),
                    fixable: false,
                });
            }
        }

        if fixed.len() > MAX_LINE_LENGTH {
            issues.push(StyleIssue {
                line: lineno,
                message: format!("line longer than {MAX_LINE_LENGTH} characters"),
                fixable: false,
            });
        }

        fixed_lines.push(fixed);
    }

    if !source.is_empty() && !source.ends_with('\n') {
        issues.push(StyleIssue {
            line: source.lines().count().saturating_sub(1) as u32,
            message: "missing newline at end of file".to_string(),
            fixable: true,
        });
    }

    let mut fixed_text = fixed_lines.join("\n");
    if !fixed_text.is_empty() {
        fixed_text.push('\n');
    }
    (issues, fixed_text)
}

/// Uppercase the digits of `0x` literals outside of quoted strings.
/// Returns the rewritten line only when something changed.
fn uppercase_hex(line: &str) -> Option<String> {
    let bytes = line.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut in_string = false;
    let mut changed = false;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'"' {
            in_string = !in_string;
        }
        if !in_string
            && b == b'0'
            && bytes.get(i + 1).is_some_and(|&c| c == b'x' || c == b'X')
            && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit)
        {
            out.push(b'0');
            out.push(b'x');
            changed |= bytes[i + 1] == b'X';
            i += 2;
            while i < bytes.len() && bytes[i].is_ascii_hexdigit() {
                changed |= bytes[i].is_ascii_lowercase();
                out.push(bytes[i].to_ascii_uppercase());
                i += 1;
            }
            continue;
        }
        out.push(b);
        i += 1;
    }
    if changed {
        String::from_utf8(out).ok()
    } else {
        None
    }
}

fn declared_symbol(line: &str) -> Option<&str> {
    let rest = line.trim_start();
    let rest = rest
        .strip_prefix("config ")
        .or_else(|| rest.strip_prefix("menuconfig "))?;
    let name = rest.split_whitespace().next()?;
    Some(name)
}
