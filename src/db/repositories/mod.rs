pub mod poll_repository;
pub mod token_repository;

pub use poll_repository::*;
pub use token_repository::*;
