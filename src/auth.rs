//! Service-account credentials, their loaders, and the access-token model.

pub mod credential;
pub mod loader;
pub mod token;

pub use credential::*;
pub use loader::*;
pub use token::*;
