use base64::{engine::general_purpose::STANDARD, Engine};
use log::{debug, trace, warn};

use crate::{
    adler::Adler32,
    chunks::{ChunkType, SIGNATURE},
    crc::calculate_crc,
    error::EncodeError,
    layout::Layout,
    palette::{Allocation, ColorSlot, Palette, SaturationPolicy},
    pixel::Pixel,
    utils::write_be_u32,
};

/// Writes an 8-bit palette PNG into a buffer whose layout is fixed at
/// construction.
///
/// Colors go through [`register_color`](Self::register_color), which hands out
/// palette indices. Indices are placed with [`write_pixel`](Self::write_pixel).
/// Every pixel starts out as index 0.
///
/// ```
/// use identicon_png::PngEncoder;
///
/// let mut png = PngEncoder::new(2, 2, 2)?;
/// let black = png.color(0, 0, 0)?.index();
/// let red = png.color(255, 0, 0)?.index();
/// png.write_pixel(0, 0, red)?;
/// png.write_pixel(1, 1, black)?;
/// assert!(png.to_base64().starts_with("iVBORw0KGgo"));
/// # Ok::<(), identicon_png::EncodeError>(())
/// ```
#[derive(Debug)]
pub struct PngEncoder {
    layout: Layout,
    buffer: Vec<u8>,
    palette: Palette,
    policy: SaturationPolicy,
    saturated: bool,
}

impl PngEncoder {
    pub fn new(width: u32, height: u32, depth: u16) -> Result<Self, EncodeError> {
        let layout = Layout::plan(width, height, depth)?;
        let mut buffer = vec![0; layout.buffer_size()];
        layout.write_static(&mut buffer);
        Ok(Self {
            palette: Palette::new(depth),
            layout,
            buffer,
            policy: SaturationPolicy::default(),
            saturated: false,
        })
    }

    pub fn with_saturation(mut self, policy: SaturationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn width(&self) -> u32 {
        self.layout.width()
    }

    pub fn height(&self) -> u32 {
        self.layout.height()
    }

    /// Number of palette slots in use.
    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }

    /// Registers an opaque color.
    pub fn color(&mut self, red: u8, green: u8, blue: u8) -> Result<ColorSlot, EncodeError> {
        self.register_color(red, green, blue, u8::MAX)
    }

    pub fn register_color(
        &mut self,
        red: u8,
        green: u8,
        blue: u8,
        alpha: u8,
    ) -> Result<ColorSlot, EncodeError> {
        self.register_pixel(Pixel::new(red, green, blue, alpha))
    }

    /// Looks the color up in the palette, adding it to the next free slot if it
    /// is new. Known colors never touch the buffer.
    pub fn register_pixel(&mut self, color: Pixel) -> Result<ColorSlot, EncodeError> {
        match self.palette.allocate(color) {
            Allocation::Existing(index) => Ok(ColorSlot::Assigned(index)),
            Allocation::New(index) => {
                let offset = self.layout.palette_offset(index);
                self.buffer[offset..offset + 3].copy_from_slice(&[
                    color.red,
                    color.green,
                    color.blue,
                ]);
                self.buffer[self.layout.alpha_offset(index)] = color.alpha;
                trace!("palette slot {index} = {color:?}");
                Ok(ColorSlot::Assigned(index))
            }
            Allocation::Full => {
                if !self.saturated {
                    warn!(
                        "palette of {} colors is full, dropping {color:?}",
                        self.layout.depth()
                    );
                    self.saturated = true;
                }
                match self.policy {
                    SaturationPolicy::Clamp => Ok(ColorSlot::Saturated),
                    SaturationPolicy::Reject => Err(EncodeError::PaletteExhausted {
                        depth: self.layout.depth(),
                    }),
                }
            }
        }
    }

    fn check_bounds(&self, x: u32, y: u32) -> Result<(), EncodeError> {
        if x >= self.width() || y >= self.height() {
            return Err(EncodeError::IndexOutOfRange {
                x,
                y,
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(())
    }

    pub fn write_pixel(&mut self, x: u32, y: u32, index: u8) -> Result<(), EncodeError> {
        self.check_bounds(x, y)?;
        if index as u16 >= self.layout.depth() {
            return Err(EncodeError::PaletteIndexOutOfRange {
                index,
                depth: self.layout.depth(),
            });
        }
        let offset = self.layout.pixel_offset(x, y);
        self.buffer[offset] = index;
        Ok(())
    }

    /// Palette index currently stored at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        self.check_bounds(x, y).ok()?;
        Some(self.buffer[self.layout.pixel_offset(x, y)])
    }

    /// Fills in the Adler-32 trailer and every chunk CRC. Safe to call again
    /// after more pixels are written.
    pub fn finalize(&mut self) {
        let mut adler = Adler32::new();
        for block in self.layout.stored_blocks() {
            adler.update(&self.buffer[block.data()]);
        }
        let checksum = adler.finish();
        write_be_u32(&mut self.buffer, self.layout.adler_offset(), checksum);

        // IDAT's CRC covers the trailer, so checksums come first.
        for chunk in ChunkType::ALL {
            let span = self.layout.span(chunk);
            let crc = calculate_crc(self.buffer[span.crc_range()].iter().copied());
            write_be_u32(&mut self.buffer, span.crc_offset(), crc);
        }
        debug!(
            "finalized {}x{} image, adler32 {checksum:#010x}, {} palette colors",
            self.width(),
            self.height(),
            self.palette.len()
        );
    }

    /// The complete PNG file, signature included.
    pub fn to_bytes(&mut self) -> Vec<u8> {
        self.finalize();
        let mut bytes = Vec::with_capacity(SIGNATURE.len() + self.buffer.len());
        bytes.extend(SIGNATURE);
        bytes.extend(&self.buffer);
        bytes
    }

    pub fn to_base64(&mut self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// `data:` URI ready to drop into an `<img src>`.
    pub fn to_data_uri(&mut self) -> String {
        format!("data:image/png;base64,{}", self.to_base64())
    }
}
