//! `compile_commands.json` generation.
//!
//! For every `<ClCompile>` item of every project the resolved configuration
//! settings, the item's own overrides and the system include directories are
//! merged into a single `clang-cl` invocation.

use std::collections::BTreeSet;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::lists;
use crate::macros::{self, Environment};
use crate::resolve::{self, Resolution};
use crate::sln::SolutionModel;
use crate::system_includes::{MsvcSystemIncludes, SystemIncludeProvider};
use crate::vcxproj::{CompileSettings, ProjectModel, Scope, SourceFile};

pub const DEFAULT_COMPILER: &str = "clang-cl.exe";
pub const DEFAULT_CONFIGURATION: &str = "Debug|x64";

// ═══════════════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════════════

/// One entry of a JSON compilation database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileCommandEntry {
    pub directory: String,
    pub command: String,
    pub file: String,
}

#[derive(Debug)]
pub struct GeneratorOptions {
    /// Executable written at the start of every command.
    pub compiler: String,
    pub system_includes: Box<dyn SystemIncludeProvider>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            compiler: DEFAULT_COMPILER.to_string(),
            system_includes: Box::new(MsvcSystemIncludes),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Generation
// ═══════════════════════════════════════════════════════════════════════════════

/// Macros the MSVC project templates define implicitly, derived from the
/// requested configuration string (case-insensitive).
pub fn default_definitions(requested: &str) -> Vec<&'static str> {
    let lower = requested.to_ascii_lowercase();
    let mut defs = vec!["WIN32", "_WINDOWS", "_MBCS"];

    if lower.contains("debug") {
        defs.extend(["_DEBUG", "DEBUG"]);
    } else {
        defs.push("NDEBUG");
    }

    if lower.contains("win32") {
        defs.push("_WIN32");
    } else if lower.contains("x64") {
        defs.push("_WIN64");
    }

    defs
}

/// Generate one entry per source file, projects and files in discovery
/// order.
///
/// The first project whose configuration cannot be resolved aborts the
/// whole run.  Projects without source files are never resolved.
pub fn generate(
    solution: &SolutionModel,
    requested: &str,
    env: &Environment,
    options: &GeneratorOptions,
) -> Result<Vec<CompileCommandEntry>> {
    let base = solution.macros(env);
    let system = options.system_includes.include_directories(env).join(";");
    let defaults = default_definitions(requested).join(";");

    let mut entries = Vec::new();

    for project in solution.projects() {
        if project.source_files().is_empty() {
            debug!("{}: no source files, skipped", project.path().display());
            continue;
        }

        let resolution = resolve::resolve(project, requested, &base)?;
        let table = resolve::project_macros(project, &resolution.key, &base);
        let mut dropped = BTreeSet::new();

        for file in project.source_files() {
            let item = file
                .override_for(requested)
                .map(|s| s.substitute(&table))
                .unwrap_or_else(|| CompileSettings::empty(Scope::PerItem));

            let command = CommandBuilder {
                compiler: &options.compiler,
                resolution: &resolution,
                item: &item,
                system: &system,
                defaults: &defaults,
            }
            .build(file, &mut dropped);

            entries.push(CompileCommandEntry {
                directory: project.directory().to_string_lossy().into_owned(),
                command,
                file: file.include.clone(),
            });
        }

        report_dropped(project, &dropped);
    }

    Ok(entries)
}

fn report_dropped(project: &ProjectModel, dropped: &BTreeSet<String>) {
    if dropped.is_empty() {
        return;
    }
    let list: Vec<&str> = dropped.iter().map(String::as_str).collect();
    warn!(
        "{}: dropped entries with unresolved macros: {}",
        project.path().display(),
        list.join(", ")
    );
}

// ─── Command assembly ────────────────────────────────────────────────────────

struct CommandBuilder<'a> {
    compiler: &'a str,
    resolution: &'a Resolution,
    item: &'a CompileSettings,
    system: &'a str,
    defaults: &'a str,
}

impl CommandBuilder<'_> {
    fn build(&self, file: &SourceFile, dropped: &mut BTreeSet<String>) -> String {
        let resolved = &self.resolution.settings;

        let using = lists::sanitize_using_directories(&resolved.using_directories);
        let includes = lists::sanitize_includes(&lists::merge([
            resolved.include_directories.as_str(),
            using.as_str(),
            self.item.include_directories.as_str(),
            self.system,
        ]));

        let definitions = lists::sanitize_definitions(&lists::merge([
            resolved.preprocessor_definitions.as_str(),
            self.item.preprocessor_definitions.as_str(),
            self.defaults,
        ]));

        let options = lists::sanitize_options(&lists::join_options([
            resolved.additional_options.as_str(),
            self.item.additional_options.as_str(),
        ]));

        let mut parts = vec![self.compiler.to_string()];

        let defines_block = flag_block("-D", &definitions, dropped);
        if !defines_block.is_empty() {
            parts.push(defines_block);
        }

        let includes_block = flag_block("-I", &includes, dropped);
        if !includes_block.is_empty() {
            parts.push(includes_block);
        }

        let options_block = options
            .split_whitespace()
            .filter(|word| keep_resolved(word, dropped))
            .collect::<Vec<_>>()
            .join(" ");
        if !options_block.is_empty() {
            parts.push(options_block);
        }

        parts.push("-c".to_string());
        parts.push(file.include.clone());
        parts.join(" ")
    }
}

/// `-D{token}` / `-I{token}` for every token, space-joined.  Tokens with
/// whitespace are double-quoted.
fn flag_block(flag: &str, list: &str, dropped: &mut BTreeSet<String>) -> String {
    lists::tokens(list)
        .filter(|token| keep_resolved(token, dropped))
        .map(|token| {
            if token.contains(char::is_whitespace) {
                format!("{flag}\"{token}\"")
            } else {
                format!("{flag}{token}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn keep_resolved(token: &str, dropped: &mut BTreeSet<String>) -> bool {
    if macros::has_unresolved(token) {
        dropped.insert(token.to_string());
        return false;
    }
    true
}

// ═══════════════════════════════════════════════════════════════════════════════
//  JSON
// ═══════════════════════════════════════════════════════════════════════════════

/// Serialize entries as a compact JSON array.
pub fn to_json(entries: &[CompileCommandEntry]) -> Result<String> {
    Ok(serde_json::to_string(entries)?)
}

pub fn from_json(json: &str) -> Result<Vec<CompileCommandEntry>> {
    Ok(serde_json::from_str(json)?)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
