use thiserror::Error;

/// Failures surfaced by a [`Group`](crate::Group) call.
///
/// Per-row parse failures never reach this type; they are dropped while the
/// page is processed (see [`RowError`](crate::parse::RowError)).
#[derive(Debug, Error)]
pub enum Error {
    /// Network or protocol failure fetching `url`.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// Markup the request depends on was missing or unreadable.
    #[error("unexpected markup at {url}: {message}")]
    Structure { url: String, message: String },
}

impl Error {
    pub(crate) fn transport(url: impl Into<String>, message: impl ToString) -> Self {
        Error::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn structure(url: impl Into<String>, message: impl ToString) -> Self {
        Error::Structure {
            url: url.into(),
            message: message.to_string(),
        }
    }
}
