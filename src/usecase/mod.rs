pub mod authorize_usecase;
pub mod verify_usecase;
