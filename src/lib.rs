pub mod compdb;
pub mod envfile;
pub mod error;
pub mod lists;
pub mod macros;
pub mod resolve;
pub mod sln;
pub mod system_includes;
pub mod vcxproj;

pub use compdb::{generate, to_json, CompileCommandEntry, GeneratorOptions};
pub use envfile::{parse_env_file, parse_env_file_at};
pub use error::{Error, Result};
pub use macros::{Environment, MacroTable};
pub use resolve::{resolve, Resolution};
pub use sln::SolutionModel;
pub use system_includes::{
    FixedSystemIncludes, MsvcSystemIncludes, NoSystemIncludes, SystemIncludeProvider,
};
pub use vcxproj::{CompileSettings, ConfigurationKey, ProjectModel, Scope, SourceFile};
