use std::marker::PhantomData;

use anyhow::{anyhow, bail, ensure, Context};
use log::debug;
use miniz_oxide::inflate::decompress_to_vec_zlib;

use crate::{
    chunks::{
        ihdr::{ColorType, IHDRChunk},
        iter_chunks, parse_signature,
        plte::PLTEChunk,
        trns::tRNSChunk,
        Chunk,
    },
    filters::reconstruct_scanlines,
    pixel::Pixel,
};

/// An indexed image read back from PNG bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub palette: Vec<Pixel>,
    /// Row-major palette indices.
    pub indices: Vec<u8>,
}
impl DecodedImage {
    pub fn index(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.indices
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        self.palette.get(self.index(x, y)? as usize).copied()
    }
}

/// Reads an 8-bit indexed, non-interlaced PNG, checking every chunk CRC and
/// the zlib checksum along the way.
pub fn decode(bytes: &[u8]) -> anyhow::Result<DecodedImage> {
    let decoder = PNGDecoder::new(bytes)?;
    let (decoder, ihdr) = decoder.parse_ihdr()?;
    decoder.parse_image(ihdr)
}

struct PNGDecoder<'a, State>(&'a [u8], PhantomData<State>);

enum Start {}
enum Chunks {}

impl<'a> PNGDecoder<'a, Start> {
    fn new(data: &'a [u8]) -> anyhow::Result<Self> {
        let (rest, _) = parse_signature(data)
            .map_err(|_| anyhow!("input doesn't start with expected signature"))?;
        Ok(Self(rest, PhantomData))
    }

    fn parse_ihdr(self) -> anyhow::Result<(PNGDecoder<'a, Chunks>, IHDRChunk)> {
        let mut chunks = iter_chunks(self.0);
        let Some(Chunk::IHDR(ihdr)) = chunks.next().transpose()? else {
            bail!("IHDR must be the first chunk");
        };
        ensure!(
            ihdr.bit_depth == 8 && ihdr.color_type == ColorType::IndexedColor,
            "only 8-bit indexed images are supported, got {ihdr:?}"
        );
        ensure!(
            ihdr.compression_method == 0 && ihdr.filter_method == 0,
            "unknown compression or filter method"
        );
        ensure!(ihdr.interlace_method == 0, "interlaced images are not supported");
        Ok((PNGDecoder(chunks.remaining(), PhantomData), ihdr))
    }
}

impl<'a> PNGDecoder<'a, Chunks> {
    fn parse_image(self, ihdr: IHDRChunk) -> anyhow::Result<DecodedImage> {
        let mut plte: Option<PLTEChunk> = None;
        let mut trns: Option<tRNSChunk> = None;
        let mut compressed = vec![];
        let mut seen_end = false;
        for chunk in iter_chunks(self.0) {
            match chunk.context("Failed to read chunk")? {
                Chunk::PLTE(chunk) => plte = Some(chunk),
                Chunk::tRNS(chunk) => trns = Some(chunk),
                Chunk::IDAT(idat) => compressed.extend_from_slice(idat.data),
                Chunk::IEND => seen_end = true,
                Chunk::IHDR(_) => bail!("duplicate IHDR"),
                Chunk::Unknown(raw) => debug!("skipping {:?} chunk", raw.chunk_type),
            }
        }
        ensure!(seen_end, "missing IEND");
        let plte = plte.ok_or_else(|| anyhow!("indexed image without PLTE"))?;

        let palette = (0..plte.len())
            .filter_map(|i| {
                let index = i as u8;
                let (red, green, blue) = plte.get_color(index)?;
                let alpha = trns.as_ref().map_or(u8::MAX, |t| t.as_palette(index));
                Some(Pixel::new(red, green, blue, alpha))
            })
            .collect();

        let data = decompress_to_vec_zlib(&compressed)
            .map_err(|e| anyhow!("{e:?}"))
            .context("Failed to decompress image data.")?;
        let width = ihdr.width as usize;
        ensure!(
            data.len() == ihdr.height as usize * (width + 1),
            "image data is {} bytes, expected {} rows of {}",
            data.len(),
            ihdr.height,
            width + 1
        );
        let indices = reconstruct_scanlines(&data, width)?;

        Ok(DecodedImage {
            width: ihdr.width,
            height: ihdr.height,
            palette,
            indices,
        })
    }
}
