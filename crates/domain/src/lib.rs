pub mod error;
pub mod mutation;
pub mod ports;
pub mod questions;
pub mod responses;
pub mod surveys;
pub mod token;
pub mod util;

pub type DomainResult<T> = Result<T, error::DomainError>;
