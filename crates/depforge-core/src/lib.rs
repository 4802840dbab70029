mod constraint;
mod project;
mod recipe;
mod requirement;
mod variable;
mod version;

pub use constraint::VersionConstraint;
pub use project::ProjectManifest;
pub use recipe::{PackageInfo, PackageRecipe};
pub use requirement::{validate_package_name, Requirement};
pub use variable::{
    validate_package_variable, validate_variable_name, RESERVED_PACKAGE_VARIABLES,
};
pub use version::parse_lenient_version;
