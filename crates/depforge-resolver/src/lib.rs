mod constraints;
mod cycles;
mod error;
mod lookup;
mod order;
mod resolve;
mod types;

pub use error::ResolveError;
pub use lookup::{PackageLookup, ResolvedPackage};
pub use order::schedule;
pub use resolve::{resolve, ROOT_REQUESTER};
pub use types::{BuildPlan, DependencyGraph, PackageNode};
