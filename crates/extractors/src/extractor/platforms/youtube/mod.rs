mod builder;
pub mod cipher;
mod models;
pub mod player;

pub use builder::{URL_REGEX, Youtube};
