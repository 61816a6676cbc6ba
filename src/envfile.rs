//! Parse captured environment files into a variable map.
//!
//! Two shapes are accepted, freely mixed:
//!
//! - batch-style `@SET KEY=VALUE` / `SET KEY=VALUE` lines, as found in
//!   `vcvars*.bat`-like scripts;
//! - bare `KEY=VALUE` lines, as printed by `set` inside a Visual Studio
//!   Developer Command Prompt.
//!
//! The resulting map is layered over the process [`Environment`] so that
//! `VSINSTALLDIR`, `WindowsSdkDir` and friends are available even when the
//! tool runs outside a developer prompt.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::macros::Environment;

/// Expand `%VAR%` references in a value using the already-accumulated map,
/// then the base environment.  Unknown variables expand to the empty string.
///
/// Splitting on `%` alternates literal text (even segments) and variable
/// names (odd segments); a trailing unterminated name is still looked up.
fn expand_percent_vars(s: &str, vars: &HashMap<String, String>, base: &Environment) -> String {
    s.split('%')
        .enumerate()
        .map(|(i, segment)| {
            if i % 2 == 0 {
                segment
            } else {
                vars.get(segment)
                    .map(String::as_str)
                    .or_else(|| base.get(segment))
                    .unwrap_or_default()
            }
        })
        .collect()
}

/// Parse the contents of an environment file.
///
/// Blank lines, `REM` / `::` comments and anything without a `KEY=` part are
/// skipped.  `%VAR%` references are expanded in document order.
pub fn parse_env_file(content: &str, base: &Environment) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("::") {
            continue;
        }

        let rest = trimmed.strip_prefix('@').unwrap_or(trimmed);

        if rest.get(..3).is_some_and(|head| head.eq_ignore_ascii_case("rem"))
            && rest[3..].chars().next().is_none_or(char::is_whitespace)
        {
            continue;
        }

        // Optional SET keyword, which must be followed by whitespace.
        let rest = match rest.get(..4) {
            Some(head)
                if head.get(..3).is_some_and(|kw| kw.eq_ignore_ascii_case("set"))
                    && head.ends_with(char::is_whitespace) =>
            {
                rest[4..].trim_start()
            }
            _ => rest,
        };

        let Some((key, raw_value)) = rest.split_once('=') else {
            continue;
        };

        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            continue;
        }

        let value = if raw_value.contains('%') {
            expand_percent_vars(raw_value, &vars, base)
        } else {
            raw_value.to_string()
        };

        vars.insert(key.to_string(), value);
    }

    vars
}

/// Read and parse an environment file from disk.
pub fn parse_env_file_at(
    path: impl AsRef<Path>,
    base: &Environment,
) -> Result<HashMap<String, String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_env_file(&content, base))
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
