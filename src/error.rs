/// Errors that can occur when operating on a ConcurrentMap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A constructor or configuration argument is out of range.
    InvalidParameter(String),
    /// A node that is already linked into a chain was handed to another chain.
    InvalidPairType(String),
    /// A chain array resize was abandoned.
    ///
    /// The previous chain array stays published. The insert or delete that
    /// triggered the resize has already been applied.
    RedistributionFailure(String),
}

impl Error {
    pub(crate) fn invalid_parameter(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    pub(crate) fn redistribution(msg: impl Into<String>) -> Self {
        Error::RedistributionFailure(msg.into())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidParameter(msg) => write!(f, "illegal parameter: {}", msg),
            Error::InvalidPairType(msg) => write!(f, "illegal pair type: {}", msg),
            Error::RedistributionFailure(msg) => {
                write!(f, "failing pair redistribution: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}
