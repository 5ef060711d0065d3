pub mod data;
pub mod stream;

pub use data::{Data, DataBuilder, DataType};
pub use stream::{Part, Stream, StreamBuilder};
