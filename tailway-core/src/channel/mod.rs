mod registry;
mod taxonomy;

pub use registry::*;
pub use taxonomy::*;
