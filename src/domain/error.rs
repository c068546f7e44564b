use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Username and password required")]
    MalformedRequest,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Duplicate username: {0}")]
    DuplicateUsername(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Hashing failed: {0}")]
    Hashing(String),

    #[error("Random source unavailable: {0}")]
    Randomness(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(String),
}
