//! Sessions, transactional changesets and verification on top of
//! `vellum-store`, behind the single-writer [`Workspace`] facade.

pub mod changeset;
pub mod session;
#[cfg(test)]
pub(crate) mod testing;
pub mod verify;
pub mod workspace;

pub use changeset::{AppliedChange, ChangesetOptions, ChangesetOutcome};
pub use verify::{mask_secrets, ShellVerifier, Verifier, VerifyOutcome};
pub use workspace::Workspace;
