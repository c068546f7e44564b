pub mod argon2_password_hasher;
pub mod configured_password_hasher;
pub mod in_memory_credential_repository;
pub mod sha256_password_hasher;
