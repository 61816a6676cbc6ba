//! Configuration resolution: pick the declared configuration matching a
//! requested `configuration|platform` string and compute the compile
//! settings that apply to it.
//!
//! Conditions are never evaluated as MSBuild expressions.  A scope applies
//! when the canonical `Configuration|Platform` text occurs verbatim inside
//! its `Condition` attribute (see [`condition_matches`]), which is how
//! Visual Studio writes them:
//!
//! ```text
//! Condition="'$(Configuration)|$(Platform)'=='Debug|x64'"
//! ```

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::lists;
use crate::macros::MacroTable;
use crate::vcxproj::{CompileSettings, ConfigurationKey, ProjectModel, Scope};

/// Outcome of resolving a requested configuration against one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The declared configuration that was used.
    pub key: ConfigurationKey,
    /// Fully macro-substituted settings.  `include_directories` already
    /// holds the property-group entries followed by the item-definition
    /// group entries.
    pub settings: CompileSettings,
    /// `true` when `key` differs from the requested string (same-platform
    /// fallback).
    pub fallback: bool,
}

/// Best-effort condition matcher: case-sensitive substring containment of
/// the canonical key in the raw condition text.
pub fn condition_matches(condition: &str, key: &ConfigurationKey) -> bool {
    condition.contains(&key.to_string())
}

/// Find the declared configuration for `requested`.
///
/// Exact matches win.  Otherwise, when `requested` parses as
/// `configuration|platform`, the first declared key on the same platform is
/// used and `fallback` is set.
pub fn match_configuration(
    project: &ProjectModel,
    requested: &str,
) -> Result<(ConfigurationKey, bool)> {
    let declared = project.configurations();
    if declared.is_empty() {
        return Err(Error::NoConfigurationsDeclared {
            project: project.path().to_path_buf(),
        });
    }

    if let Some(key) = declared.iter().find(|k| k.to_string() == requested) {
        return Ok((key.clone(), false));
    }

    let same_platform = ConfigurationKey::parse(requested)
        .and_then(|wanted| declared.iter().find(|k| k.platform == wanted.platform));

    match same_platform {
        Some(key) => Ok((key.clone(), true)),
        None => Err(Error::ConfigurationNotFound {
            project: project.path().to_path_buf(),
            requested: requested.to_string(),
            declared: declared.iter().map(ToString::to_string).collect(),
        }),
    }
}

/// Build the macro table for one project and configuration.
///
/// Starts from `base` (environment plus solution-level built-ins), adds the
/// project and configuration built-ins, then the properties of every
/// property group that applies to `key`, in document order.
pub fn project_macros(
    project: &ProjectModel,
    key: &ConfigurationKey,
    base: &MacroTable,
) -> MacroTable {
    let mut table = base.clone();

    let dir = project.directory().to_string_lossy().into_owned();
    let path = project.path().to_string_lossy().into_owned();
    let name = project.name();
    let file_name = project
        .path()
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();

    table.insert_builtin("ProjectDir", dir.clone());
    table.insert_builtin("MSBuildProjectDirectory", dir);
    table.insert_builtin("ProjectPath", path);
    table.insert_builtin("ProjectName", name.clone());
    table.insert_builtin("MSBuildProjectName", name);
    table.insert_builtin("ProjectFileName", file_name);
    table.insert_builtin("Configuration", key.configuration.clone());
    table.insert_builtin("ConfigurationName", key.configuration.clone());
    table.insert_builtin("Platform", key.platform.clone());
    table.insert_builtin("PlatformName", key.platform.clone());

    for pg in project.property_groups() {
        if !pg.condition.as_deref().is_none_or(|c| condition_matches(c, key)) {
            continue;
        }
        for (tag, value) in &pg.properties {
            let expanded = table.substitute(value);
            table.insert_property(tag, expanded);
        }
    }

    table
}

/// Resolve `requested` against `project`.
///
/// Fails with [`Error::NoConfigurationsDeclared`] or
/// [`Error::ConfigurationNotFound`]; a missing item-definition group is not
/// an error and yields empty settings.
pub fn resolve(project: &ProjectModel, requested: &str, base: &MacroTable) -> Result<Resolution> {
    let (key, fallback) = match_configuration(project, requested)?;
    if fallback {
        warn!(
            "{}: configuration '{requested}' not declared, falling back to '{key}'",
            project.path().display()
        );
    }

    let per_configuration = project
        .item_definition_groups()
        .iter()
        .find(|idg| idg.condition.as_deref().is_some_and(|c| condition_matches(c, &key)))
        .map(|idg| idg.settings.clone())
        .unwrap_or_else(|| CompileSettings::empty(Scope::PerConfiguration));

    let property_includes: Vec<String> = project
        .property_groups()
        .iter()
        .filter(|pg| pg.condition.as_deref().is_none_or(|c| condition_matches(c, &key)))
        .map(|pg| pg.include_directories())
        .collect();

    let include_directories = lists::merge(
        property_includes
            .iter()
            .map(String::as_str)
            .chain([per_configuration.include_directories.as_str()]),
    );

    let merged = CompileSettings {
        include_directories,
        ..per_configuration
    };

    let table = project_macros(project, &key, base);
    let settings = merged.substitute(&table);

    debug!(
        "{}: resolved '{key}' ({} include entries)",
        project.path().display(),
        lists::tokens(&settings.include_directories).count()
    );

    Ok(Resolution { key, settings, fallback })
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn project(body: &str) -> ProjectModel {
        let xml = format!(
            r#"<Project xmlns="http://schemas.microsoft.com/developer/msbuild/2003">{body}</Project>"#
        );
        ProjectModel::parse(&xml, "/work/App/App.vcxproj").unwrap()
    }

    const CONFIGS_X64: &str = r#"
      <ItemGroup Label="ProjectConfigurations">
        <ProjectConfiguration Include="Debug|x64" />
        <ProjectConfiguration Include="Release|x64" />
      </ItemGroup>"#;

    #[test]
    fn no_configurations_declared() {
        let p = project("<ItemGroup><ClCompile Include=\"a.cpp\" /></ItemGroup>");
        let err = resolve(&p, "Debug|x64", &MacroTable::new()).unwrap_err();
        assert!(matches!(err, Error::NoConfigurationsDeclared { .. }));
    }

    #[test]
    fn exact_match_has_no_fallback() {
        let p = project(CONFIGS_X64);
        let r = resolve(&p, "Release|x64", &MacroTable::new()).unwrap();
        assert_eq!(r.key, ConfigurationKey::new("Release", "x64"));
        assert!(!r.fallback);
    }

    #[test]
    fn unknown_platform_lists_declared_keys() {
        let p = project(CONFIGS_X64);
        let err = resolve(&p, "Debug|Win32", &MacroTable::new()).unwrap_err();
        match err {
            Error::ConfigurationNotFound { requested, declared, .. } => {
                assert_eq!(requested, "Debug|Win32");
                assert_eq!(declared, vec!["Debug|x64", "Release|x64"]);
            }
            other => panic!("expected ConfigurationNotFound, got {other:?}"),
        }
    }

    #[test]
    fn same_platform_fallback_takes_first_declared() {
        let p = project(CONFIGS_X64);
        let r = resolve(&p, "Profile|x64", &MacroTable::new()).unwrap();
        assert_eq!(r.key.to_string(), "Debug|x64");
        assert!(r.fallback);
    }

    #[test]
    fn unparseable_request_without_exact_match_fails() {
        let p = project(CONFIGS_X64);
        let err = resolve(&p, "Debug", &MacroTable::new()).unwrap_err();
        assert!(matches!(err, Error::ConfigurationNotFound { .. }));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let p = project(CONFIGS_X64);
        let r = resolve(&p, "debug|x64", &MacroTable::new()).unwrap();
        // Falls back on the platform rather than matching "Debug" loosely.
        assert!(r.fallback);
    }

    #[test]
    fn missing_item_definition_group_gives_empty_settings() {
        let p = project(CONFIGS_X64);
        let r = resolve(&p, "Debug|x64", &MacroTable::new()).unwrap();
        assert!(r.settings.is_empty());
    }

    #[test]
    fn property_group_includes_precede_item_definition_includes() {
        let p = project(&format!(
            r#"{CONFIGS_X64}
            <PropertyGroup><IncludePath>c</IncludePath></PropertyGroup>
            <ItemDefinitionGroup Condition="'$(Configuration)|$(Platform)'=='Debug|x64'">
              <ClCompile><AdditionalIncludeDirectories>a;b</AdditionalIncludeDirectories></ClCompile>
            </ItemDefinitionGroup>"#
        ));
        let r = resolve(&p, "Debug|x64", &MacroTable::new()).unwrap();
        assert_eq!(r.settings.include_directories, "c;a;b");
    }

    #[test]
    fn matching_property_group_includes_precede_item_definition_includes() {
        let p = project(&format!(
            r#"{CONFIGS_X64}
            <PropertyGroup Condition="'$(Configuration)|$(Platform)'=='Debug|x64'">
              <IncludePath>debug_pg</IncludePath>
            </PropertyGroup>
            <PropertyGroup Condition="'$(Configuration)|$(Platform)'=='Release|x64'">
              <IncludePath>release_pg</IncludePath>
            </PropertyGroup>
            <PropertyGroup><IncludePath>common_pg</IncludePath></PropertyGroup>
            <ItemDefinitionGroup Condition="'$(Configuration)|$(Platform)'=='Debug|x64'">
              <ClCompile><AdditionalIncludeDirectories>idg_a;idg_b</AdditionalIncludeDirectories></ClCompile>
            </ItemDefinitionGroup>"#
        ));
        let r = resolve(&p, "Debug|x64", &MacroTable::new()).unwrap();
        assert_eq!(r.settings.include_directories, "debug_pg;common_pg;idg_a;idg_b");

        let r = resolve(&p, "Release|x64", &MacroTable::new()).unwrap();
        assert_eq!(r.settings.include_directories, "release_pg;common_pg");
    }

    #[test]
    fn other_configuration_scopes_are_ignored() {
        let p = project(&format!(
            r#"{CONFIGS_X64}
            <PropertyGroup Condition="'$(Configuration)|$(Platform)'=='Release|x64'">
              <IncludePath>release_only</IncludePath>
            </PropertyGroup>
            <ItemDefinitionGroup Condition="'$(Configuration)|$(Platform)'=='Release|x64'">
              <ClCompile><PreprocessorDefinitions>REL</PreprocessorDefinitions></ClCompile>
            </ItemDefinitionGroup>
            <ItemDefinitionGroup Condition="'$(Configuration)|$(Platform)'=='Debug|x64'">
              <ClCompile>
                <PreprocessorDefinitions>DBG;%(PreprocessorDefinitions)</PreprocessorDefinitions>
                <AdditionalUsingDirectories>winmd</AdditionalUsingDirectories>
                <AdditionalOptions>/bigobj</AdditionalOptions>
              </ClCompile>
            </ItemDefinitionGroup>"#
        ));
        let r = resolve(&p, "Debug|x64", &MacroTable::new()).unwrap();
        assert_eq!(r.settings.include_directories, "");
        assert_eq!(r.settings.preprocessor_definitions, "DBG;%(PreprocessorDefinitions)");
        assert_eq!(r.settings.using_directories, "winmd");
        assert_eq!(r.settings.additional_options, "/bigobj");
    }

    #[test]
    fn macros_use_matched_key_and_project_dir() {
        let p = project(&format!(
            r#"{CONFIGS_X64}
            <ItemDefinitionGroup Condition="'$(Configuration)|$(Platform)'=='Debug|x64'">
              <ClCompile>
                <AdditionalIncludeDirectories>$(ProjectDir)/gen/$(Configuration)/$(Platform);$(SolutionDir)/deps;$(SDK_ROOT)/inc</AdditionalIncludeDirectories>
                <PreprocessorDefinitions>CFG_$(ConfigurationName)</PreprocessorDefinitions>
              </ClCompile>
            </ItemDefinitionGroup>"#
        ));
        let mut base = MacroTable::new();
        base.insert_builtin("SolutionDir", "/work");
        base.insert_property("SDK_ROOT", "/opt/sdk");

        // Fallback: the matched key, not the requested one, feeds the macros.
        let r = resolve(&p, "Checked|x64", &base).unwrap();
        assert_eq!(
            r.settings.include_directories,
            "/work/App/gen/Debug/x64;/work/deps;/opt/sdk/inc"
        );
        assert_eq!(r.settings.preprocessor_definitions, "CFG_Debug");
    }

    #[test]
    fn project_properties_become_macros() {
        let p = project(&format!(
            r#"{CONFIGS_X64}
            <PropertyGroup Label="UserMacros">
              <ThirdParty>$(ProjectDir)/third_party</ThirdParty>
              <ProjectDir>/hijacked</ProjectDir>
            </PropertyGroup>
            <PropertyGroup Condition="'$(Configuration)|$(Platform)'=='Release|x64'">
              <ThirdParty>/wrong</ThirdParty>
            </PropertyGroup>
            <ItemDefinitionGroup Condition="'$(Configuration)|$(Platform)'=='Debug|x64'">
              <ClCompile><AdditionalIncludeDirectories>$(ThirdParty)/zlib</AdditionalIncludeDirectories></ClCompile>
            </ItemDefinitionGroup>"#
        ));
        let r = resolve(&p, "Debug|x64", &MacroTable::new()).unwrap();
        assert_eq!(r.settings.include_directories, "/work/App/third_party/zlib");
    }

    #[test]
    fn condition_matcher_is_plain_containment() {
        let key = ConfigurationKey::new("Debug", "x64");
        assert!(condition_matches("'$(Configuration)|$(Platform)'=='Debug|x64'", &key));
        assert!(condition_matches("whatever Debug|x64 whatever", &key));
        assert!(!condition_matches("'$(Configuration)'=='Debug'", &key));
        assert!(!condition_matches("'$(Configuration)|$(Platform)'=='debug|x64'", &key));
    }
}
