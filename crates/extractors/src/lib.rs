pub mod extractor;
pub mod media;

pub use extractor::default::{default_client, default_registry};
pub use extractor::error::ExtractorError;
pub use extractor::factory::ExtractorRegistry;
pub use extractor::options::Options;
pub use media::{Data, DataType, Part, Stream};
