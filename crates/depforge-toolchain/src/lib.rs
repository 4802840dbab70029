mod emit;
mod error;
mod format;
mod pipeline;

pub use emit::{emit, fingerprint, Emitter};
pub use error::{EmitError, ToolchainError};
pub use format::DescriptorFormat;
pub use pipeline::{generate, generate_for_project, Toolchain};
