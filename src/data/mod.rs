pub mod downsampler;
pub mod parser;
pub mod schema;
pub mod source;
pub mod store;
pub mod stride;
