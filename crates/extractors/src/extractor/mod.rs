pub mod cache;
pub mod default;
pub mod error;
pub mod factory;
pub mod http;
pub mod options;
pub mod platform_extractor;
pub mod platforms;
pub mod playlist;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

pub use default::{default_client, default_registry};
