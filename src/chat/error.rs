//! Chat error taxonomy.

use thiserror::Error;

use crate::remote::RemoteError;

#[derive(Debug, Error)]
pub enum ChatError {
    /// A channel with this name already exists (possibly archived).
    #[error("channel #{name} already exists")]
    NameTaken { name: String },

    /// No unarchived channel has this name.
    #[error("channel #{name} not found")]
    ChannelNotFound { name: String },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}
