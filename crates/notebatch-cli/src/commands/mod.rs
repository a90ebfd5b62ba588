//! Command handlers

pub mod config;
pub mod list;
pub mod note;
pub mod status;
pub mod sync;

use notebatch_core::RepositoryError;

/// Turn a repository failure into its user-facing message
pub fn user_error(e: RepositoryError) -> anyhow::Error {
    anyhow::anyhow!(e.user_message())
}
