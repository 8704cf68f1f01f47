use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("invalid dimensions {width}x{height} with palette depth {depth}; width and height must be positive and depth within 1..=256")]
    InvalidDimensions { width: u32, height: u32, depth: u16 },
    #[error("a {width}x{height} image needs {data_size} bytes of image data, more than a PNG chunk can hold")]
    ImageTooLarge {
        width: u32,
        height: u32,
        data_size: u64,
    },
    #[error("palette already holds {depth} colors")]
    PaletteExhausted { depth: u16 },
    #[error("pixel ({x}, {y}) lies outside the {width}x{height} image")]
    IndexOutOfRange {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    #[error("palette index {index} is not below the palette depth {depth}")]
    PaletteIndexOutOfRange { index: u8, depth: u16 },
}
