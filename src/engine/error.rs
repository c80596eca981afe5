use ulid::Ulid;

/// Failures of the data-access collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transport failure: the store could not be reached or answered with an error.
    Unavailable(String),
    /// The store answered with a record that failed the shape check.
    Malformed(String),
    NotFound(Ulid),
    /// A store-side uniqueness constraint rejected the write.
    Conflict(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::Unavailable(e) => write!(f, "backing store unavailable: {e}"),
            ProviderError::Malformed(e) => write!(f, "malformed record: {e}"),
            ProviderError::NotFound(id) => write!(f, "not found: {id}"),
            ProviderError::Conflict(e) => write!(f, "store conflict: {e}"),
        }
    }
}

impl std::error::Error for ProviderError {}

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    InvalidInput(String),
    LimitExceeded(&'static str),
    Provider(ProviderError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Provider(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Provider(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ProviderError> for EngineError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::NotFound(id) => EngineError::NotFound(id),
            other => EngineError::Provider(other),
        }
    }
}
