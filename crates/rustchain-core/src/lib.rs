pub mod constants;
pub mod error;
pub mod types;

pub use error::RcError;
