//! Entry point for turning a seed into an inline PNG.
//!
//! How a seed maps to colors and pixels is up to a [`Painter`]. Without one
//! the image stays blank: every pixel is palette index 0.

use log::debug;

use crate::{error::EncodeError, png::PngEncoder};

pub const WIDTH: u32 = 100;
pub const HEIGHT: u32 = 100;
pub const DEPTH: u16 = 16;

/// Draws a seed's pattern onto a fresh encoder.
pub trait Painter {
    fn paint(&mut self, seed: &str, png: &mut PngEncoder) -> Result<(), EncodeError>;
}

/// Leaves the image untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Blank;
impl Painter for Blank {
    fn paint(&mut self, _seed: &str, _png: &mut PngEncoder) -> Result<(), EncodeError> {
        Ok(())
    }
}

/// Base64 PNG for `seed`, using the blank painter.
pub fn generate(seed: &str) -> Result<String, EncodeError> {
    generate_with(seed, &mut Blank)
}

pub fn generate_with<P: Painter + ?Sized>(
    seed: &str,
    painter: &mut P,
) -> Result<String, EncodeError> {
    let mut png = PngEncoder::new(WIDTH, HEIGHT, DEPTH)?;
    painter.paint(seed, &mut png)?;
    debug!("painted identicon for {seed:?} with {} colors", png.palette_len());
    Ok(png.to_base64())
}
