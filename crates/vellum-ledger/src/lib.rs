pub mod backend;
pub mod fs;
mod index;
pub mod lock;
pub mod memory;
pub mod paths;

pub use backend::{ArtifactBackend, ContentPair, HEAD_REF};
pub use fs::FsBackend;
pub use lock::WorkspaceLock;
pub use memory::MemoryBackend;
pub use paths::VellumPaths;
