pub mod config;
pub mod error;
pub mod error_utils;
pub mod review;
pub mod swipe;
pub mod types;

pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use review::*;
pub use swipe::*;
pub use types::*;
