pub mod environment;
pub mod error;
pub mod types;

pub use environment::Environment;
pub use error::Error;
pub use types::{User, UserId};
