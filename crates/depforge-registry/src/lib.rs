mod package_lookup;
mod registry_index;
mod sources;

pub use package_lookup::package_variables;
pub use registry_index::{select_highest_compatible, RegistryIndex};
pub use sources::{ConfiguredRegistryIndex, RegistrySourceRecord};

#[cfg(test)]
mod tests;
