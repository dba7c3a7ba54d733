pub mod cli;
pub mod credentials;
pub mod email_content;
pub mod error;
pub mod gmail_api;
pub mod pipeline;
pub mod reply;
pub mod types;

pub use error::{AuthFailure, Error, Result};
