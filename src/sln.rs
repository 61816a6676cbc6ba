//! Visual Studio solution (`.sln`) handling.
//!
//! A solution is treated as opaque text: every double-quoted literal ending
//! in `.vcxproj` is a project reference relative to the solution directory,
//! for example
//!
//! ```text
//! Project("{8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942}") = "App", "src\App\App.vcxproj", "{…}"
//! ```
//!
//! Passing a `.vcxproj` directly yields a single-project solution.
//!
//! Uses [`chumsky`] for the quoted-literal scanner.

use std::path::{Path, PathBuf};

use chumsky::prelude::*;
use log::debug;

use crate::error::{Error, Result};
use crate::macros::{Environment, MacroTable};
use crate::vcxproj::ProjectModel;

pub const SOLUTION_EXTENSION: &str = "sln";
pub const PROJECT_EXTENSION: &str = "vcxproj";

// ═══════════════════════════════════════════════════════════════════════════════
//  Chumsky scanner
// ═══════════════════════════════════════════════════════════════════════════════

/// Scan text into the contents of its double-quoted literals, skipping
/// everything in between.  A literal cannot span lines; an unterminated
/// quote is treated as ordinary text.
fn quoted_literals<'a>() -> impl Parser<'a, &'a str, Vec<&'a str>, extra::Err<Simple<'a, char>>> {
    // ── "…" ──────────────────────────────────────────────────────────────
    let quoted = just('"')
        .ignore_then(none_of(['"', '\r', '\n']).repeated().to_slice())
        .then_ignore(just('"'))
        .map(Some);

    // ── Anything else, one char at a time ────────────────────────────────
    let other = any().to(None::<&'a str>);

    choice((quoted, other))
        .repeated()
        .collect::<Vec<Option<&'a str>>>()
        .map(|items| items.into_iter().flatten().collect())
}

/// Extract project paths (as written, trimmed) from solution text, in
/// order of appearance.
pub fn project_references(text: &str) -> Vec<String> {
    quoted_literals()
        .parse(text)
        .into_output()
        .unwrap_or_default()
        .into_iter()
        .map(str::trim)
        .filter(|lit| lit.ends_with(".vcxproj"))
        .map(String::from)
        .collect()
}

/// Turn a solution-relative reference into a host path.  Solutions written
/// on Windows use `\`, which other hosts do not treat as a separator.
fn native_relative(reference: &str) -> PathBuf {
    if std::path::MAIN_SEPARATOR == '\\' {
        PathBuf::from(reference)
    } else {
        PathBuf::from(reference.replace('\\', "/"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  SolutionModel
// ═══════════════════════════════════════════════════════════════════════════════

/// A solution and its projects, in discovery order.
#[derive(Debug, Clone)]
pub struct SolutionModel {
    path: PathBuf,
    directory: PathBuf,
    projects: Vec<ProjectModel>,
}

impl SolutionModel {
    /// Open a `.sln` or a single `.vcxproj`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        if extension != SOLUTION_EXTENSION && extension != PROJECT_EXTENSION {
            return Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: if extension.is_empty() {
                    String::new()
                } else {
                    format!(".{extension}")
                },
            });
        }

        let absolute = dunce::canonicalize(path).map_err(|source| Error::InvalidPath {
            path: path.to_path_buf(),
            source,
        })?;
        let directory = absolute.parent().map(Path::to_path_buf).unwrap_or_default();

        if extension == PROJECT_EXTENSION {
            let project = ProjectModel::from_file(&absolute)?;
            return Ok(Self::from_projects(absolute, vec![project]));
        }

        let text = std::fs::read_to_string(&absolute).map_err(|source| Error::Read {
            path: absolute.clone(),
            source,
        })?;

        let references = project_references(&text);
        if references.is_empty() {
            return Err(Error::NoProjectsFound { path: absolute });
        }

        let mut projects = Vec::with_capacity(references.len());
        for reference in &references {
            debug!("{}: loading project '{reference}'", absolute.display());
            projects.push(ProjectModel::from_file(directory.join(native_relative(reference)))?);
        }

        Ok(Self { path: absolute, directory, projects })
    }

    /// Build a solution from already-parsed projects.  `path` is the solution
    /// (or lone project) file; its parent becomes the solution directory.
    pub fn from_projects(path: impl Into<PathBuf>, projects: Vec<ProjectModel>) -> Self {
        let path = path.into();
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self { path, directory, projects }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absolute solution directory (`$(SolutionDir)`).
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn projects(&self) -> &[ProjectModel] {
        &self.projects
    }

    /// Environment variables plus the solution-level built-ins.
    pub fn macros(&self, env: &Environment) -> MacroTable {
        let mut table = MacroTable::from_environment(env);
        let file_name = self
            .path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = self
            .path
            .file_stem()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();

        table.insert_builtin("SolutionDir", self.directory.to_string_lossy());
        table.insert_builtin("SolutionPath", self.path.to_string_lossy());
        table.insert_builtin("SolutionFileName", file_name);
        table.insert_builtin("SolutionName", name);
        table
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
