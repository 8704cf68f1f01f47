use log::debug;

use crate::{
    chunks::{ihdr::IHDRChunk, ChunkSpan, ChunkType, CHUNK_OVERHEAD},
    error::EncodeError,
    utils::{div_ceil, write_be_u16, write_be_u32, write_bytes, write_le_u16},
};

/// Largest payload a stored deflate block can carry.
pub(crate) const MAX_BLOCK_LEN: usize = 0xffff;
/// BFINAL/BTYPE byte plus LEN and NLEN.
pub(crate) const BLOCK_HEADER_LEN: usize = 5;
const ZLIB_HEADER_LEN: usize = 2;
const ADLER_LEN: usize = 4;
/// PNG caps chunk lengths at 2^31 - 1.
const MAX_CHUNK_LEN: u64 = 0x7fff_ffff;
pub(crate) const MAX_DEPTH: u16 = 256;

/// Byte layout of an indexed PNG, fixed once width, height and palette depth
/// are known.
///
/// The layout never changes after planning. Every later write lands inside
/// one of the spans computed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    width: u32,
    height: u32,
    depth: u16,
    pixel_size: usize,
    data_size: usize,
    ihdr: ChunkSpan,
    plte: ChunkSpan,
    trns: ChunkSpan,
    idat: ChunkSpan,
    iend: ChunkSpan,
}

/// A stored (uncompressed) deflate block inside the IDAT payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StoredBlock {
    pub(crate) header_offset: usize,
    pub(crate) len: usize,
    pub(crate) is_final: bool,
}
impl StoredBlock {
    pub(crate) fn data(&self) -> std::ops::Range<usize> {
        let start = self.header_offset + BLOCK_HEADER_LEN;
        start..start + self.len
    }
}

impl Layout {
    pub fn plan(width: u32, height: u32, depth: u16) -> Result<Self, EncodeError> {
        if width == 0 || height == 0 || depth == 0 || depth > MAX_DEPTH {
            return Err(EncodeError::InvalidDimensions {
                width,
                height,
                depth,
            });
        }

        // One filter byte leads every row.
        let pixel_size = height as u64 * (width as u64 + 1);
        let block_count = pixel_size.div_ceil(MAX_BLOCK_LEN as u64);
        let data_size = pixel_size
            .saturating_add(BLOCK_HEADER_LEN as u64 * block_count)
            .saturating_add((ZLIB_HEADER_LEN + ADLER_LEN) as u64);
        if data_size > MAX_CHUNK_LEN {
            return Err(EncodeError::ImageTooLarge {
                width,
                height,
                data_size,
            });
        }
        let (pixel_size, data_size) = (pixel_size as usize, data_size as usize);

        let ihdr = ChunkSpan {
            offset: 0,
            size: CHUNK_OVERHEAD + crate::chunks::ihdr::PAYLOAD_LEN,
        };
        let plte = ChunkSpan {
            offset: ihdr.end(),
            size: CHUNK_OVERHEAD + 3 * depth as usize,
        };
        let trns = ChunkSpan {
            offset: plte.end(),
            size: CHUNK_OVERHEAD + depth as usize,
        };
        let idat = ChunkSpan {
            offset: trns.end(),
            size: CHUNK_OVERHEAD + data_size,
        };
        let iend = ChunkSpan {
            offset: idat.end(),
            size: CHUNK_OVERHEAD,
        };

        let layout = Self {
            width,
            height,
            depth,
            pixel_size,
            data_size,
            ihdr,
            plte,
            trns,
            idat,
            iend,
        };
        debug!(
            "planned {width}x{height} image with depth {depth}: {} bytes, {} stored blocks",
            layout.buffer_size(),
            layout.block_count()
        );
        Ok(layout)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Filter bytes plus pixel bytes.
    pub fn pixel_size(&self) -> usize {
        self.pixel_size
    }

    /// Size of the zlib stream carried by IDAT.
    pub fn data_size(&self) -> usize {
        self.data_size
    }

    /// Length of the buffer, signature excluded.
    pub fn buffer_size(&self) -> usize {
        self.iend.end()
    }

    pub fn span(&self, chunk: ChunkType) -> ChunkSpan {
        match chunk {
            ChunkType::IHDR => self.ihdr,
            ChunkType::PLTE => self.plte,
            ChunkType::tRNS => self.trns,
            ChunkType::IDAT => self.idat,
            ChunkType::IEND => self.iend,
        }
    }

    pub(crate) fn block_count(&self) -> usize {
        div_ceil(self.pixel_size, MAX_BLOCK_LEN)
    }

    /// First byte after the zlib header.
    fn stream_start(&self) -> usize {
        self.idat.payload_offset() + ZLIB_HEADER_LEN
    }

    /// Maps a position in the filter+pixel stream to its buffer offset,
    /// stepping over the header of every stored block up to and including
    /// the one that holds it.
    pub(crate) fn data_offset(&self, logical: usize) -> usize {
        self.stream_start() + BLOCK_HEADER_LEN * (logical / MAX_BLOCK_LEN + 1) + logical
    }

    /// Buffer offset of the filter byte that opens row `y`.
    pub fn filter_offset(&self, y: u32) -> usize {
        self.data_offset(y as usize * (self.width as usize + 1))
    }

    /// Buffer offset of pixel `(x, y)`. Coordinates are not checked.
    pub fn pixel_offset(&self, x: u32, y: u32) -> usize {
        self.data_offset(y as usize * (self.width as usize + 1) + x as usize + 1)
    }

    pub(crate) fn palette_offset(&self, index: u8) -> usize {
        self.plte.payload_offset() + 3 * index as usize
    }

    pub(crate) fn alpha_offset(&self, index: u8) -> usize {
        self.trns.payload_offset() + index as usize
    }

    pub(crate) fn adler_offset(&self) -> usize {
        self.idat.crc_offset() - ADLER_LEN
    }

    pub(crate) fn stored_blocks(&self) -> impl Iterator<Item = StoredBlock> + '_ {
        let count = self.block_count();
        (0..count).map(move |k| StoredBlock {
            header_offset: self.stream_start() + k * (BLOCK_HEADER_LEN + MAX_BLOCK_LEN),
            len: MAX_BLOCK_LEN.min(self.pixel_size - k * MAX_BLOCK_LEN),
            is_final: k + 1 == count,
        })
    }

    /// Writes everything that does not depend on colors or pixels: chunk
    /// lengths and tags, the IHDR payload, the zlib header and every stored
    /// block header.
    pub(crate) fn write_static(&self, buffer: &mut [u8]) {
        for chunk in ChunkType::ALL {
            let span = self.span(chunk);
            write_be_u32(buffer, span.offset, span.payload_len() as u32);
            write_bytes(buffer, span.offset + 4, chunk.header());
        }
        write_bytes(
            buffer,
            self.ihdr.payload_offset(),
            &IHDRChunk::indexed(self.width, self.height).to_payload(),
        );
        write_be_u16(buffer, self.idat.payload_offset(), zlib_header());
        for block in self.stored_blocks() {
            let len = block.len as u16;
            buffer[block.header_offset] = block.is_final as u8;
            write_le_u16(buffer, block.header_offset + 1, len);
            write_le_u16(buffer, block.header_offset + 3, !len);
        }
    }
}

/// CMF/FLG pair: deflate with a 32K window, maximum compression level hint,
/// FCHECK chosen so the pair is a multiple of 31.
const fn zlib_header() -> u16 {
    let header: u16 = ((8 + (7 << 4)) << 8) | (3 << 6);
    header + (31 - header % 31)
}
