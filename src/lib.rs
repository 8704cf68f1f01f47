mod adler;
mod chunks;
mod crc;
mod decoder;
mod error;
mod filters;
pub mod identicon;
mod layout;
mod palette;
mod pixel;
mod png;
mod utils;

pub use chunks::{ChunkSpan, ChunkType};
pub use decoder::{decode, DecodedImage};
pub use error::EncodeError;
pub use layout::Layout;
pub use palette::{ColorSlot, SaturationPolicy};
pub use pixel::Pixel;
pub use png::PngEncoder;
