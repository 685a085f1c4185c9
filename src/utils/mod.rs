// Utility functions
pub mod error;
pub mod fields;
pub mod http;

pub use error::*;
pub use fields::*;
pub use http::*;
