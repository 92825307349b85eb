use matinee_prop::PropError;
use thiserror::Error;

pub type PageResult<T> = std::result::Result<T, PageError>;

#[derive(Debug, Error)]
pub enum PageError {
    /// A builder call was rejected before touching the tree.
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    #[error(transparent)]
    Prop(#[from] PropError),
}

impl PageError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Lets façade calls inside subscription callbacks propagate with `?`.
impl From<PageError> for matinee_prop::CallbackError {
    fn from(err: PageError) -> Self {
        matinee_prop::CallbackError::new(err.to_string())
    }
}
