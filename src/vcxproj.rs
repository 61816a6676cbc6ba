//! Typed model of a Visual C++ `.vcxproj` file.
//!
//! Only the parts that drive compile commands are captured: declared
//! `<ProjectConfiguration>`s, `<PropertyGroup>` properties and include
//! paths, `<ItemDefinitionGroup><ClCompile>` settings, `<ClCompile>` source
//! items with their per-item metadata, and `<Import>` elements (recorded,
//! never followed).

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::lists;
use crate::macros::MacroTable;

// ═══════════════════════════════════════════════════════════════════════════════
//  ConfigurationKey
// ═══════════════════════════════════════════════════════════════════════════════

/// A `(configuration, platform)` pair such as `Debug|x64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigurationKey {
    pub configuration: String,
    pub platform: String,
}

impl ConfigurationKey {
    pub fn new(configuration: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            configuration: configuration.into(),
            platform: platform.into(),
        }
    }

    /// Parse `configuration|platform`.  Both halves must be non-empty.
    pub fn parse(s: &str) -> Option<Self> {
        let (configuration, platform) = s.split_once('|')?;
        let (configuration, platform) = (configuration.trim(), platform.trim());
        if configuration.is_empty() || platform.is_empty() || platform.contains('|') {
            return None;
        }
        Some(Self::new(configuration, platform))
    }
}

impl fmt::Display for ConfigurationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.configuration, self.platform)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  CompileSettings
// ═══════════════════════════════════════════════════════════════════════════════

/// Where a set of compile settings came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// A `<PropertyGroup>` (unconditional or configuration-gated).
    PropertyWide,
    /// `<ItemDefinitionGroup Condition="…"><ClCompile>`.
    PerConfiguration,
    /// Metadata on a single `<ClCompile Include="…">` item.
    PerItem,
}

/// Include directories, macro definitions, extra options and using
/// directories, each kept as the raw semicolon-delimited MSBuild value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileSettings {
    pub scope: Scope,
    pub include_directories: String,
    pub preprocessor_definitions: String,
    pub additional_options: String,
    pub using_directories: String,
}

impl CompileSettings {
    pub fn empty(scope: Scope) -> Self {
        Self {
            scope,
            include_directories: String::new(),
            preprocessor_definitions: String::new(),
            additional_options: String::new(),
            using_directories: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.include_directories.trim().is_empty()
            && self.preprocessor_definitions.trim().is_empty()
            && self.additional_options.trim().is_empty()
            && self.using_directories.trim().is_empty()
    }

    /// Apply `$(Name)` substitution to every field.
    pub fn substitute(&self, table: &MacroTable) -> Self {
        Self {
            scope: self.scope,
            include_directories: table.substitute(&self.include_directories),
            preprocessor_definitions: table.substitute(&self.preprocessor_definitions),
            additional_options: table.substitute(&self.additional_options),
            using_directories: table.substitute(&self.using_directories),
        }
    }

    fn field_mut(&mut self, field: SettingField) -> &mut String {
        match field {
            SettingField::IncludeDirectories => &mut self.include_directories,
            SettingField::PreprocessorDefinitions => &mut self.preprocessor_definitions,
            SettingField::AdditionalOptions => &mut self.additional_options,
            SettingField::UsingDirectories => &mut self.using_directories,
        }
    }

    /// Append `value` to `field`, `;`-separated.
    fn append(&mut self, field: SettingField, value: &str) {
        if value.trim().is_empty() {
            return;
        }
        let slot = self.field_mut(field);
        if !slot.is_empty() {
            slot.push(';');
        }
        slot.push_str(value);
    }
}

/// The `<ClCompile>` metadata elements that feed a compile command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingField {
    IncludeDirectories,
    PreprocessorDefinitions,
    AdditionalOptions,
    UsingDirectories,
}

impl SettingField {
    fn from_cl_compile_tag(tag: &str) -> Option<Self> {
        match tag {
            "AdditionalIncludeDirectories" => Some(Self::IncludeDirectories),
            "PreprocessorDefinitions" => Some(Self::PreprocessorDefinitions),
            "AdditionalOptions" => Some(Self::AdditionalOptions),
            "AdditionalUsingDirectories" => Some(Self::UsingDirectories),
            _ => None,
        }
    }
}

/// `<PropertyGroup>` children that carry include paths.
const PROPERTY_INCLUDE_TAGS: &[&str] = &[
    "IncludePath",
    "AdditionalIncludeDirectories",
    "IncludeDirectories",
];

// ═══════════════════════════════════════════════════════════════════════════════
//  Type definitions
// ═══════════════════════════════════════════════════════════════════════════════

// ─── PropertyGroup ───────────────────────────────────────────────────────────

/// A `<PropertyGroup>`, optionally gated by a `Condition`.
#[derive(Debug, Clone)]
pub struct PropertyGroup {
    pub condition: Option<String>,
    /// `Label` attribute (`Globals`, `Configuration`, `UserMacros`, …).  Not
    /// used by resolution; exposed so callers can tell groups apart.
    pub label: Option<String>,
    /// Include paths from `IncludePath`, `AdditionalIncludeDirectories` and
    /// `IncludeDirectories`, in element order.
    pub settings: CompileSettings,
    /// Every child element as `(tag, text)`, in document order.
    pub properties: Vec<(String, String)>,
}

impl PropertyGroup {
    /// Include list of this group with empty entries dropped.
    pub fn include_directories(&self) -> String {
        lists::merge([self.settings.include_directories.as_str()])
    }
}

// ─── ItemDefinitionGroup ─────────────────────────────────────────────────────

/// `<ItemDefinitionGroup>` with its first `<ClCompile>` block.
#[derive(Debug, Clone)]
pub struct ItemDefinitionGroup {
    pub condition: Option<String>,
    pub settings: CompileSettings,
    /// Remaining `<ClCompile>` children (`WarningLevel`, `Optimization`, …),
    /// keyed by tag.  Not used by resolution; exposed for library callers.
    pub other: HashMap<String, String>,
}

// ─── SourceFile ──────────────────────────────────────────────────────────────

/// One metadata element on a `<ClCompile Include="…">` item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMetadata {
    pub field: SettingField,
    pub value: String,
    pub condition: Option<String>,
}

/// A `<ClCompile Include="…">` source item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path exactly as written in the project (usually project-relative).
    pub include: String,
    pub metadata: Vec<ItemMetadata>,
}

impl SourceFile {
    /// Per-item settings that apply to `requested`, if any.
    ///
    /// Best-effort matching: the item applies when `requested` occurs
    /// verbatim in any metadata value or any metadata `Condition` text.
    /// Once it applies, unconditional metadata and metadata whose condition
    /// names `requested` contribute.
    pub fn override_for(&self, requested: &str) -> Option<CompileSettings> {
        let applies = self.metadata.iter().any(|m| {
            m.value.contains(requested)
                || m.condition.as_deref().is_some_and(|c| c.contains(requested))
        });
        if !applies {
            return None;
        }

        let mut settings = CompileSettings::empty(Scope::PerItem);
        for m in &self.metadata {
            let selected = match &m.condition {
                Some(c) => c.contains(requested),
                None => true,
            };
            if selected {
                settings.append(m.field, &m.value);
            }
        }
        Some(settings)
    }
}

// ─── Import ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub project: String,
    pub condition: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  ProjectModel – top-level handle
// ═══════════════════════════════════════════════════════════════════════════════

/// A parsed `.vcxproj`.
#[derive(Debug, Clone)]
pub struct ProjectModel {
    path: PathBuf,
    directory: PathBuf,
    configurations: Vec<ConfigurationKey>,
    property_groups: Vec<PropertyGroup>,
    item_definition_groups: Vec<ItemDefinitionGroup>,
    source_files: Vec<SourceFile>,
    imports: Vec<Import>,
}

impl ProjectModel {
    /// Load a `.vcxproj` from disk.  The path is made absolute first.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let absolute = dunce::canonicalize(path).map_err(|source| Error::InvalidPath {
            path: path.to_path_buf(),
            source,
        })?;
        let source = std::fs::read_to_string(&absolute).map_err(|source| Error::Read {
            path: absolute.clone(),
            source,
        })?;
        Self::parse(&source, absolute)
    }

    /// Parse project XML.  `path` is the (absolute) location of the file; its
    /// parent becomes the project directory.
    pub fn parse(source: &str, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let doc = roxmltree::Document::parse(source).map_err(|source| Error::ParseError {
            path: path.clone(),
            source,
        })?;

        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut project = Self {
            path,
            directory,
            configurations: Vec::new(),
            property_groups: Vec::new(),
            item_definition_groups: Vec::new(),
            source_files: Vec::new(),
            imports: Vec::new(),
        };

        for child in doc.root_element().children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "PropertyGroup" => {
                    project.property_groups.push(PropertyGroup::parse(&child));
                }
                "ItemDefinitionGroup" => {
                    project
                        .item_definition_groups
                        .push(ItemDefinitionGroup::parse(&child));
                }
                "ItemGroup" => project.parse_item_group(&child),
                "Import" => project.imports.push(Import::parse(&child)),
                "ImportGroup" => {
                    for import in child
                        .children()
                        .filter(|n| n.is_element() && n.tag_name().name() == "Import")
                    {
                        project.imports.push(Import::parse(&import));
                    }
                }
                _ => {}
            }
        }

        Ok(project)
    }

    /// Absolute path of the `.vcxproj` file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absolute directory containing the `.vcxproj` file.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File name without extension (e.g. `App` for `App.vcxproj`).
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Declared configurations, duplicates removed (first occurrence wins).
    pub fn configurations(&self) -> &[ConfigurationKey] {
        &self.configurations
    }

    pub fn property_groups(&self) -> &[PropertyGroup] {
        &self.property_groups
    }

    pub fn item_definition_groups(&self) -> &[ItemDefinitionGroup] {
        &self.item_definition_groups
    }

    /// `<ClCompile>` items in document order.
    pub fn source_files(&self) -> &[SourceFile] {
        &self.source_files
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    fn parse_item_group(&mut self, node: &roxmltree::Node) {
        for child in node.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "ProjectConfiguration" => {
                    if let Some(key) = parse_project_configuration(&child) {
                        if !self.configurations.contains(&key) {
                            self.configurations.push(key);
                        }
                    }
                }
                "ClCompile" => {
                    let include = child.attribute("Include").unwrap_or("").trim();
                    if include.is_empty() {
                        continue;
                    }
                    self.source_files.push(SourceFile {
                        include: include.to_string(),
                        metadata: parse_item_metadata(&child),
                    });
                }
                _ => {}
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Parsing – roxmltree → owned types
// ═══════════════════════════════════════════════════════════════════════════════

impl PropertyGroup {
    fn parse(node: &roxmltree::Node) -> Self {
        let mut pg = Self {
            condition: node.attribute("Condition").map(String::from),
            label: node.attribute("Label").map(String::from),
            settings: CompileSettings::empty(Scope::PropertyWide),
            properties: Vec::new(),
        };

        for child in node.children().filter(|n| n.is_element()) {
            let tag = child.tag_name().name();
            let text = child.text().unwrap_or("").trim().to_string();

            if PROPERTY_INCLUDE_TAGS.contains(&tag) {
                pg.settings.append(SettingField::IncludeDirectories, &text);
            }
            pg.properties.push((tag.to_string(), text));
        }

        pg
    }
}

impl ItemDefinitionGroup {
    fn parse(node: &roxmltree::Node) -> Self {
        let mut idg = Self {
            condition: node.attribute("Condition").map(String::from),
            settings: CompileSettings::empty(Scope::PerConfiguration),
            other: HashMap::new(),
        };

        let Some(cl) = node
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == "ClCompile")
        else {
            return idg;
        };

        for child in cl.children().filter(|n| n.is_element()) {
            let tag = child.tag_name().name();
            let text = child.text().unwrap_or("").trim();
            match SettingField::from_cl_compile_tag(tag) {
                Some(field) => idg.settings.append(field, text),
                None => {
                    idg.other.insert(tag.to_string(), text.to_string());
                }
            }
        }

        idg
    }
}

impl Import {
    fn parse(node: &roxmltree::Node) -> Self {
        Self {
            project: node.attribute("Project").unwrap_or("").to_string(),
            condition: node.attribute("Condition").map(String::from),
        }
    }
}

/// `<ProjectConfiguration Include="Debug|x64">` with optional
/// `<Configuration>` / `<Platform>` children, which win over the attribute.
fn parse_project_configuration(node: &roxmltree::Node) -> Option<ConfigurationKey> {
    let from_include = node.attribute("Include").and_then(ConfigurationKey::parse);

    let configuration = find_child_text(node, "Configuration")
        .or_else(|| from_include.as_ref().map(|k| k.configuration.clone()))?;
    let platform = find_child_text(node, "Platform")
        .or_else(|| from_include.as_ref().map(|k| k.platform.clone()))?;

    Some(ConfigurationKey::new(configuration, platform))
}

fn parse_item_metadata(node: &roxmltree::Node) -> Vec<ItemMetadata> {
    node.children()
        .filter(|n| n.is_element())
        .filter_map(|child| {
            let field = SettingField::from_cl_compile_tag(child.tag_name().name())?;
            let value = child.text().unwrap_or("").trim();
            if value.is_empty() {
                return None;
            }
            Some(ItemMetadata {
                field,
                value: value.to_string(),
                condition: child.attribute("Condition").map(String::from),
            })
        })
        .collect()
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Return the trimmed, non-empty text of the first child element with the
/// given tag name.
fn find_child_text(parent: &roxmltree::Node, tag: &str) -> Option<String> {
    parent
        .children()
        .find(|c| c.is_element() && c.tag_name().name() == tag)
        .and_then(|c| c.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project DefaultTargets="Build" ToolsVersion="17.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <ItemGroup Label="ProjectConfigurations">
    <ProjectConfiguration Include="Debug|x64">
      <Configuration>Debug</Configuration>
      <Platform>x64</Platform>
    </ProjectConfiguration>
    <ProjectConfiguration Include="Release|x64">
      <Configuration>Release</Configuration>
      <Platform>x64</Platform>
    </ProjectConfiguration>
    <ProjectConfiguration Include="Debug|x64" />
  </ItemGroup>
  <PropertyGroup Label="Globals">
    <ProjectGuid>{11111111-2222-3333-4444-555555555555}</ProjectGuid>
  </PropertyGroup>
  <Import Project="$(VCTargetsPath)\Microsoft.Cpp.Default.props" />
  <ImportGroup Label="PropertySheets">
    <Import Project="$(UserRootDir)\Microsoft.Cpp.$(Platform).user.props" Condition="exists('x')" />
  </ImportGroup>
  <PropertyGroup Condition="'$(Configuration)|$(Platform)'=='Debug|x64'">
    <IncludePath>$(SolutionDir)third_party;$(IncludePath)</IncludePath>
  </PropertyGroup>
  <ItemDefinitionGroup Condition="'$(Configuration)|$(Platform)'=='Debug|x64'">
    <ClCompile>
      <WarningLevel>Level3</WarningLevel>
      <AdditionalIncludeDirectories>include;%(AdditionalIncludeDirectories)</AdditionalIncludeDirectories>
      <PreprocessorDefinitions>APP_DEBUG;%(PreprocessorDefinitions)</PreprocessorDefinitions>
      <AdditionalOptions>/utf-8 %(AdditionalOptions)</AdditionalOptions>
    </ClCompile>
    <Link>
      <SubSystem>Console</SubSystem>
    </Link>
  </ItemDefinitionGroup>
  <ItemGroup>
    <ClCompile Include="main.cpp" />
    <ClCompile Include="src\util.cpp">
      <PreprocessorDefinitions Condition="'$(Configuration)|$(Platform)'=='Debug|x64'">UTIL_TRACE;%(PreprocessorDefinitions)</PreprocessorDefinitions>
    </ClCompile>
    <ClInclude Include="util.h" />
  </ItemGroup>
</Project>
"#;

    fn sample() -> ProjectModel {
        ProjectModel::parse(SAMPLE, "/work/App/App.vcxproj").unwrap()
    }

    #[test]
    fn configuration_key_parse_and_display() {
        let key = ConfigurationKey::parse("Debug|x64").unwrap();
        assert_eq!(key, ConfigurationKey::new("Debug", "x64"));
        assert_eq!(key.to_string(), "Debug|x64");
        assert!(ConfigurationKey::parse("Debug").is_none());
        assert!(ConfigurationKey::parse("|x64").is_none());
        assert!(ConfigurationKey::parse("a|b|c").is_none());
    }

    #[test]
    fn declared_configurations_deduplicated() {
        let project = sample();
        let names: Vec<String> = project.configurations().iter().map(|k| k.to_string()).collect();
        assert_eq!(names, vec!["Debug|x64", "Release|x64"]);
    }

    #[test]
    fn directory_is_parent_of_path() {
        let project = sample();
        assert_eq!(project.directory(), Path::new("/work/App"));
        assert_eq!(project.name(), "App");
    }

    #[test]
    fn property_groups_capture_includes_and_properties() {
        let project = sample();
        let pgs = project.property_groups();
        assert_eq!(pgs.len(), 2);
        assert_eq!(pgs[0].label.as_deref(), Some("Globals"));
        assert!(pgs[0].condition.is_none());
        assert_eq!(pgs[0].properties[0].0, "ProjectGuid");

        assert_eq!(pgs[1].settings.scope, Scope::PropertyWide);
        assert_eq!(
            pgs[1].include_directories(),
            "$(SolutionDir)third_party;$(IncludePath)"
        );
    }

    #[test]
    fn item_definition_group_settings() {
        let project = sample();
        let idg = &project.item_definition_groups()[0];
        assert!(idg.condition.as_deref().unwrap().contains("Debug|x64"));
        assert_eq!(idg.settings.scope, Scope::PerConfiguration);
        assert_eq!(
            idg.settings.include_directories,
            "include;%(AdditionalIncludeDirectories)"
        );
        assert_eq!(
            idg.settings.preprocessor_definitions,
            "APP_DEBUG;%(PreprocessorDefinitions)"
        );
        assert_eq!(idg.settings.additional_options, "/utf-8 %(AdditionalOptions)");
        assert_eq!(idg.other.get("WarningLevel").map(String::as_str), Some("Level3"));
    }

    #[test]
    fn source_files_in_order_without_headers() {
        let project = sample();
        let files: Vec<&str> = project.source_files().iter().map(|f| f.include.as_str()).collect();
        assert_eq!(files, vec!["main.cpp", "src\\util.cpp"]);
        assert!(project.source_files()[0].metadata.is_empty());
    }

    #[test]
    fn imports_are_recorded_not_followed() {
        let project = sample();
        assert_eq!(project.imports().len(), 2);
        assert!(project.imports()[0].project.ends_with("Microsoft.Cpp.Default.props"));
        assert!(project.imports()[1].condition.is_some());
    }

    #[test]
    fn per_item_override_matches_condition_text() {
        let project = sample();
        let util = &project.source_files()[1];

        let debug = util.override_for("Debug|x64").unwrap();
        assert_eq!(debug.scope, Scope::PerItem);
        assert_eq!(
            debug.preprocessor_definitions,
            "UTIL_TRACE;%(PreprocessorDefinitions)"
        );

        assert!(util.override_for("Release|x64").is_none());
        assert!(project.source_files()[0].override_for("Debug|x64").is_none());
    }

    #[test]
    fn per_item_override_matches_value_text() {
        let file = SourceFile {
            include: "a.cpp".into(),
            metadata: vec![
                ItemMetadata {
                    field: SettingField::IncludeDirectories,
                    value: "out\\Debug|x64\\gen".into(),
                    condition: None,
                },
                ItemMetadata {
                    field: SettingField::AdditionalOptions,
                    value: "/bigobj".into(),
                    condition: None,
                },
                ItemMetadata {
                    field: SettingField::PreprocessorDefinitions,
                    value: "ONLY_RELEASE".into(),
                    condition: Some("'$(Configuration)'=='Release|x64'".into()),
                },
            ],
        };
        let s = file.override_for("Debug|x64").unwrap();
        assert_eq!(s.include_directories, "out\\Debug|x64\\gen");
        assert_eq!(s.additional_options, "/bigobj");
        assert_eq!(s.preprocessor_definitions, "");
    }

    #[test]
    fn substitute_applies_to_all_fields() {
        let mut table = MacroTable::new();
        table.insert_builtin("Platform", "x64");
        let mut settings = CompileSettings::empty(Scope::PerConfiguration);
        settings.include_directories = "lib/$(Platform)".into();
        settings.preprocessor_definitions = "ARCH_$(Platform)".into();
        settings.additional_options = "/D$(Platform)".into();
        settings.using_directories = "$(Platform)".into();
        let s = settings.substitute(&table);
        assert_eq!(s.include_directories, "lib/x64");
        assert_eq!(s.preprocessor_definitions, "ARCH_x64");
        assert_eq!(s.additional_options, "/Dx64");
        assert_eq!(s.using_directories, "x64");
        assert_eq!(s.scope, Scope::PerConfiguration);
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let with_bom = format!("\u{feff}{SAMPLE}");
        let project = ProjectModel::parse(&with_bom, "/work/App/App.vcxproj").unwrap();
        assert_eq!(project.configurations().len(), 2);
    }

    #[test]
    fn malformed_xml_is_parse_error() {
        let err = ProjectModel::parse("<Project><ItemGroup>", "/x/Broken.vcxproj").unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
        assert!(err.to_string().contains("Broken.vcxproj"));
    }

    #[test]
    fn missing_file_is_invalid_path() {
        let err = ProjectModel::from_file("testdata/NoSuch/NoSuch.vcxproj").unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
    }

    #[test]
    fn from_file_makes_directory_absolute() {
        let project = ProjectModel::from_file("testdata/App/App.vcxproj").unwrap();
        assert!(project.directory().is_absolute());
        assert!(project.directory().ends_with("App"));
    }
}
