//! System include directories appended after the project's own includes.
//!
//! clang tooling running outside a Developer Command Prompt has no idea where
//! the MSVC headers and the Windows SDK live, so the generator asks a
//! [`SystemIncludeProvider`] for them.  The default, [`MsvcSystemIncludes`],
//! reads the variables `vcvarsall.bat` sets and falls back to the stock
//! Visual Studio 2022 install locations.

use crate::macros::Environment;

pub trait SystemIncludeProvider: std::fmt::Debug {
    /// Include directories, in search order.
    fn include_directories(&self, env: &Environment) -> Vec<String>;
}

// ─── MSVC + Windows SDK ──────────────────────────────────────────────────────

const DEFAULT_TOOLSET: &str = "v143";

/// Visual Studio 2022 / Windows 10 SDK defaults used when the environment
/// carries no toolchain variables at all.
pub const FALLBACK_INCLUDES: &[&str] = &[
    r"C:\Program Files\Microsoft Visual Studio\2022\Community\VC\Tools\MSVC\14.39.33519\include",
    r"C:\Program Files (x86)\Windows Kits\10\Include\10.0.22621.0\um",
    r"C:\Program Files (x86)\Windows Kits\10\Include\10.0.22621.0\shared",
    r"C:\Program Files (x86)\Windows Kits\10\Include\10.0.22621.0\winrt",
];

const SDK_SUBDIRS: &[&str] = &["um", "shared", "winrt", "cppwinrt"];

#[derive(Debug, Clone, Copy, Default)]
pub struct MsvcSystemIncludes;

impl MsvcSystemIncludes {
    fn toolchain_include(env: &Environment) -> Option<String> {
        if let Some(tools) = non_empty(env, "VCToolsInstallDir") {
            return Some(join_windows(&[tools, "include"]));
        }
        let install = non_empty(env, "VSINSTALLDIR")?;
        let version = non_empty(env, "VCToolsVersion")
            .or_else(|| non_empty(env, "PlatformToolsetVersion"))
            .unwrap_or(DEFAULT_TOOLSET);
        Some(join_windows(&[install, "VC", "Tools", "MSVC", version, "include"]))
    }

    fn sdk_includes(env: &Environment) -> Vec<String> {
        let (Some(sdk), Some(version)) = (
            non_empty(env, "WindowsSdkDir"),
            non_empty(env, "WindowsSdkVersion"),
        ) else {
            return Vec::new();
        };
        SDK_SUBDIRS
            .iter()
            .map(|sub| join_windows(&[sdk, "Include", version, sub]))
            .collect()
    }
}

impl SystemIncludeProvider for MsvcSystemIncludes {
    fn include_directories(&self, env: &Environment) -> Vec<String> {
        // The SDK is only consulted alongside a Visual Studio install.
        let mut dirs = Vec::new();
        if let Some(toolchain) = Self::toolchain_include(env) {
            dirs.push(toolchain);
            dirs.extend(Self::sdk_includes(env));
        }

        if dirs.is_empty() {
            return FALLBACK_INCLUDES.iter().map(|s| s.to_string()).collect();
        }
        dirs
    }
}

// ─── Alternatives ────────────────────────────────────────────────────────────

/// Adds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSystemIncludes;

impl SystemIncludeProvider for NoSystemIncludes {
    fn include_directories(&self, _env: &Environment) -> Vec<String> {
        Vec::new()
    }
}

/// A fixed, caller-supplied list.
#[derive(Debug, Clone, Default)]
pub struct FixedSystemIncludes(pub Vec<String>);

impl SystemIncludeProvider for FixedSystemIncludes {
    fn include_directories(&self, _env: &Environment) -> Vec<String> {
        self.0.clone()
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn non_empty<'a>(env: &'a Environment, name: &str) -> Option<&'a str> {
    env.get(name)
        .map(|v| v.trim().trim_end_matches(['\\', '/']))
        .filter(|v| !v.is_empty())
}

/// Join Windows path segments with `\`, whatever the host platform.
fn join_windows(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim_end_matches(['\\', '/']))
        .collect::<Vec<_>>()
        .join("\\")
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
