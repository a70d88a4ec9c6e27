use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("\"{key}\" is empty or has too little text to type")]
    EmptyText { key: String },

    #[error("enter a page number from 1 to {page_count}")]
    PageOutOfRange { requested: usize, page_count: usize },

    #[error("storage error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Errors the user caused and can fix from the UI; everything else is
    /// an environment problem worth logging.
    #[must_use]
    pub fn is_user_notice(&self) -> bool {
        matches!(self, Self::EmptyText { .. } | Self::PageOutOfRange { .. })
    }
}
