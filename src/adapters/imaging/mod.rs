pub mod annotate;
pub mod codec;
