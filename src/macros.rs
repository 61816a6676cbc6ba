//! `$(Name)` macro substitution.
//!
//! The process environment is captured once into an [`Environment`] and then
//! layered under project properties and the reserved MSBuild built-ins
//! (`ProjectDir`, `Configuration`, `Platform`, `SolutionDir`, …) inside a
//! [`MacroTable`].  Substitution is a pure function of the input text and the
//! table.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;

use log::debug;

// ═══════════════════════════════════════════════════════════════════════════════
//  Environment snapshot
// ═══════════════════════════════════════════════════════════════════════════════

/// Immutable snapshot of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Snapshot the current process environment.  Variables whose name or
    /// value is not valid Unicode are skipped.
    pub fn capture() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    /// Build a snapshot from raw OS pairs, keeping only the ones that are
    /// valid Unicode.
    pub fn from_os_vars(pairs: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        let vars = pairs
            .into_iter()
            .filter_map(|(name, value)| match (name.into_string(), value.into_string()) {
                (Ok(name), Ok(value)) => Some((name, value)),
                (Ok(name), Err(_)) => {
                    debug!("environment variable '{name}' is not valid Unicode, skipped");
                    None
                }
                (Err(name), _) => {
                    debug!("environment variable {name:?} has a non-Unicode name, skipped");
                    None
                }
            })
            .collect();
        Self { vars }
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    /// Layer `overrides` on top of this snapshot; later values win.
    pub fn with_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.vars.extend(overrides);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn vars(&self) -> &HashMap<String, String> {
        &self.vars
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  MacroTable
// ═══════════════════════════════════════════════════════════════════════════════

/// Names that always resolve to the values computed for the current
/// project / configuration, whatever the environment or project says.
pub const RESERVED: &[&str] = &[
    "ProjectDir",
    "ProjectName",
    "ProjectFileName",
    "ProjectPath",
    "MSBuildProjectName",
    "MSBuildProjectDirectory",
    "Configuration",
    "ConfigurationName",
    "Platform",
    "PlatformName",
    "SolutionDir",
    "SolutionName",
    "SolutionFileName",
    "SolutionPath",
];

/// Lookup table for `$(Name)` tokens, keyed by the bare name.
///
/// Three layers, lowest priority first: environment variables, project
/// properties, reserved built-ins.  [`insert_property`](Self::insert_property)
/// refuses to shadow a built-in, and [`insert_builtin`](Self::insert_builtin)
/// always overwrites, so the order in which layers are filled does not matter.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    values: BTreeMap<String, String>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the table with every variable of `env`.
    pub fn from_environment(env: &Environment) -> Self {
        let values = env
            .vars()
            .iter()
            .filter(|(k, _)| !is_reserved(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self { values }
    }

    /// Set a reserved built-in, overriding any environment or property value.
    pub fn insert_builtin(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    /// Set a project-defined property.  Reserved names are ignored.
    pub fn insert_property(&mut self, name: &str, value: impl Into<String>) {
        if is_reserved(name) {
            return;
        }
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Replace every `$(Name)` token whose name is in the table.
    ///
    /// Tokens without a matching entry, and unterminated `$(`, are copied
    /// through untouched.
    pub fn substitute(&self, text: &str) -> String {
        if !text.contains("$(") {
            return text.to_string();
        }

        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find("$(") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find(')') else {
                result.push_str(&rest[start..]);
                return result;
            };
            let name = &after[..end];
            match self.values.get(name) {
                Some(value) => result.push_str(value),
                None => result.push_str(&rest[start..start + 2 + end + 1]),
            }
            rest = &after[end + 1..];
        }

        result.push_str(rest);
        result
    }
}

fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// True when `text` still carries a `$(…)` token.
pub fn has_unresolved(text: &str) -> bool {
    text.find("$(")
        .is_some_and(|start| text[start + 2..].contains(')'))
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
