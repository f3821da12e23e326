//! Git operations: reading the index with git2 and committing via the CLI.

pub mod commit;
pub mod repository;

pub use commit::{Committer, GitCommitter};
pub use repository::GitRepository;
