use thiserror::Error;

/// Everything that can go wrong while fetching or decoding CATe pages.
#[derive(Debug, Error)]
pub enum Error {
    /// The document does not match the fixed CATe template. Fatal: no
    /// partial timetable is ever returned.
    #[error("unexpected page structure: {0}")]
    Structure(String),

    /// A date lookup past the right edge of the timetable grid.
    #[error("column index {index} is outside the date grid (width {width})")]
    OutOfRange { index: usize, width: usize },

    #[error("course {0} is not in the timetable")]
    CourseNotFound(String),

    #[error("{0} is not a CATe URL")]
    BadUrl(String),

    #[error("{0} is not a valid range")]
    BadRange(String),

    #[error(transparent)]
    Prompt(#[from] dialoguer::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn structure(context: impl Into<String>) -> Self {
        Self::Structure(context.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
