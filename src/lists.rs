//! Semicolon-delimited MSBuild list handling.
//!
//! [`merge`] flattens several `a;b;c` lists into one, and the sanitizers strip
//! the `%(…)` inheritance markers MSBuild uses to splice in values from an
//! outer scope.  Once the scopes have been merged here those markers mean
//! nothing, so they are removed after merging.

// ═══════════════════════════════════════════════════════════════════════════════
//  Merging
// ═══════════════════════════════════════════════════════════════════════════════

/// Merge semicolon-delimited lists in order.
///
/// Tokens are trimmed; empty tokens and `.` are dropped, and an exact
/// duplicate of an earlier token is skipped (first occurrence wins, case
/// sensitive).
pub fn merge<'a>(lists: impl IntoIterator<Item = &'a str>) -> String {
    let mut tokens: Vec<&str> = Vec::new();
    for list in lists {
        for token in list.split(';').map(str::trim) {
            if token.is_empty() || token == "." || tokens.contains(&token) {
                continue;
            }
            tokens.push(token);
        }
    }
    tokens.join(";")
}

/// Split a merged list into its tokens.
pub fn tokens(list: &str) -> impl Iterator<Item = &str> {
    list.split(';').map(str::trim).filter(|t| !t.is_empty())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Placeholder sanitizing
// ═══════════════════════════════════════════════════════════════════════════════

/// MSBuild item-metadata inheritance markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    AdditionalIncludeDirectories,
    PreprocessorDefinitions,
    AdditionalOptions,
    AdditionalUsingDirectories,
}

impl Placeholder {
    pub fn marker(self) -> &'static str {
        match self {
            Self::AdditionalIncludeDirectories => "%(AdditionalIncludeDirectories)",
            Self::PreprocessorDefinitions => "%(PreprocessorDefinitions)",
            Self::AdditionalOptions => "%(AdditionalOptions)",
            Self::AdditionalUsingDirectories => "%(AdditionalUsingDirectories)",
        }
    }
}

/// Remove every occurrence of `placeholder` from a semicolon list, then
/// collapse `;;` runs and trim `;` from both ends.
pub fn sanitize(list: &str, placeholder: Placeholder) -> String {
    let marker = placeholder.marker();
    let mut out = list
        .replace(&format!(";{marker}"), "")
        .replace(&format!("{marker};"), "")
        .replace(marker, "");

    while out.contains(";;") {
        out = out.replace(";;", ";");
    }

    out.trim_matches(';').to_string()
}

pub fn sanitize_includes(list: &str) -> String {
    sanitize(list, Placeholder::AdditionalIncludeDirectories)
}

pub fn sanitize_definitions(list: &str) -> String {
    sanitize(list, Placeholder::PreprocessorDefinitions)
}

pub fn sanitize_using_directories(list: &str) -> String {
    sanitize(list, Placeholder::AdditionalUsingDirectories)
}

/// Join option fragments with single spaces, skipping blank ones.  Unlike
/// [`merge`] this never splits on `;`, which may appear inside an option.
pub fn join_options<'a>(fragments: impl IntoIterator<Item = &'a str>) -> String {
    fragments
        .into_iter()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Options are a free-form command-line fragment rather than a list, so only
/// the marker itself is removed.
pub fn sanitize_options(options: &str) -> String {
    options
        .replace(Placeholder::AdditionalOptions.marker(), "")
        .trim()
        .to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
