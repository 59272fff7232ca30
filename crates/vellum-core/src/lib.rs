pub mod artifact;
pub mod category;
pub mod change;
pub mod checkpoint;
pub mod digest;
pub mod error;
pub mod ids;
pub mod namespace;
pub mod session;
pub mod state;

pub use artifact::{new_version_entry, ArtifactMeta, VersionEntry, VersionOp};
pub use category::{ContentCategory, SizeLimits};
pub use change::{ChangeKind, ChangeOp};
pub use checkpoint::{ArtifactSnapshot, Checkpoint, CheckpointSummary, ContentEncoding};
pub use error::{ErrorKind, Result, VellumError};
pub use session::{Session, SessionStatus, Turn, TurnStatus};
pub use state::{GlobalState, Goal};
