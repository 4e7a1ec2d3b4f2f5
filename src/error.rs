// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the on-disk guild configuration.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything a command or button can fail with.
///
/// The `Display` text of the user-facing variants is exactly what gets sent
/// back to the member, so keep it short and friendly.
#[derive(Debug, Error)]
pub enum TicketError {
    /// `setup` without a role mention or a colour token.
    #[error("Usage: {prefix}setup @staff #hexColor [optional direct image URL]")]
    Usage { prefix: String },

    #[error("Administrator perms needed!")]
    SetupForbidden,

    #[error("Admins only!")]
    PanelForbidden,

    #[error("Run {prefix}setup first.")]
    SetupMissing { prefix: String },

    #[error("Panel not set up.")]
    PanelNotSetUp,

    #[error("Use this inside a ticket channel!")]
    NotATicket,

    #[error("Cannot close this ticket.")]
    CloseForbidden,

    #[error("You already have an open ticket.")]
    AlreadyOpen,

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Transport failure from the chat platform. Logged, never shown.
    #[error("platform call failed: {0}")]
    Platform(#[from] anyhow::Error),
}

impl TicketError {
    /// Usage, authorization and precondition errors are replied to the member;
    /// store and transport failures only go to the log.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, TicketError::Store(_) | TicketError::Platform(_))
    }
}

pub type TicketResult<T> = std::result::Result<T, TicketError>;
