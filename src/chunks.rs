use nom::{
    bytes::complete::{tag, take},
    combinator::map,
    multi::length_data,
    number::complete::be_u32,
    sequence::{terminated, tuple},
    IResult,
};

use crate::crc::calculate_crc;

pub(crate) const SIGNATURE: &[u8; 8] = b"\x89PNG\x0d\x0a\x1a\x0a";

/// Length prefix plus type tag plus trailing CRC.
pub(crate) const CHUNK_OVERHEAD: usize = 4 + 4 + 4;

/// The five chunks an encoded image is made of, in file order.
#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    IHDR,
    PLTE,
    tRNS,
    IDAT,
    IEND,
}
impl ChunkType {
    pub const ALL: [ChunkType; 5] = [
        ChunkType::IHDR,
        ChunkType::PLTE,
        ChunkType::tRNS,
        ChunkType::IDAT,
        ChunkType::IEND,
    ];

    pub fn header(self) -> &'static [u8; 4] {
        match self {
            ChunkType::IHDR => ihdr::HEADER,
            ChunkType::PLTE => plte::HEADER,
            ChunkType::tRNS => trns::HEADER,
            ChunkType::IDAT => idat::HEADER,
            ChunkType::IEND => iend::HEADER,
        }
    }
}

/// Where a chunk lives inside the encoder buffer. The buffer holds no
/// signature, so offset 0 is the IHDR length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub offset: usize,
    pub size: usize,
}
impl ChunkSpan {
    pub(crate) fn payload_offset(&self) -> usize {
        self.offset + 8
    }

    pub(crate) fn payload_len(&self) -> usize {
        self.size - CHUNK_OVERHEAD
    }

    pub(crate) fn crc_offset(&self) -> usize {
        self.offset + self.size - 4
    }

    /// Type tag and payload, the bytes covered by the chunk CRC.
    pub(crate) fn crc_range(&self) -> std::ops::Range<usize> {
        self.offset + 4..self.crc_offset()
    }

    pub(crate) fn end(&self) -> usize {
        self.offset + self.size
    }
}

#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[derive(Debug)]
pub(crate) enum Chunk<'a> {
    IHDR(ihdr::IHDRChunk),
    PLTE(plte::PLTEChunk<'a>),
    tRNS(trns::tRNSChunk<'a>),
    IDAT(idat::IDATChunk<'a>),
    IEND,
    Unknown(RawChunk<'a>),
}

pub(crate) fn parse_signature(input: &[u8]) -> IResult<&[u8], &[u8]> {
    tag(SIGNATURE)(input)
}

fn parse_chunk(input: &[u8]) -> IResult<&[u8], Chunk<'_>> {
    let (rest, (header, chunk_data)) = valid_chunk(input)?;
    match header {
        ihdr::HEADER => Ok((rest, Chunk::IHDR(ihdr::parse_data(chunk_data)?.1))),
        plte::HEADER => Ok((rest, Chunk::PLTE(plte::parse_data(chunk_data)?.1))),
        trns::HEADER => Ok((rest, Chunk::tRNS(trns::parse_data(chunk_data)?.1))),
        idat::HEADER => Ok((rest, Chunk::IDAT(idat::parse_data(chunk_data)?.1))),
        iend::HEADER => Ok((rest, Chunk::IEND)),
        _ => Ok((
            rest,
            Chunk::Unknown(RawChunk {
                chunk_type: header,
                _chunk_data: chunk_data,
            }),
        )),
    }
}

pub(crate) fn iter_chunks(source: &[u8]) -> ChunkIter {
    ChunkIter {
        source,
        finished: false,
    }
}

pub(crate) struct ChunkIter<'a> {
    source: &'a [u8],
    finished: bool,
}
impl<'a> ChunkIter<'a> {
    /// Bytes not consumed yet.
    pub(crate) fn remaining(&self) -> &'a [u8] {
        self.source
    }
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = anyhow::Result<Chunk<'a>>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match parse_chunk(self.source) {
            Ok((rest, chunk)) => {
                self.source = rest;
                if matches!(chunk, Chunk::IEND) {
                    self.finished = true;
                }
                Some(Ok(chunk))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e.to_owned().into()))
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct RawChunk<'a> {
    pub(crate) chunk_type: &'a [u8; 4],
    _chunk_data: &'a [u8],
}

fn valid_chunk<'a, Error: nom::error::ParseError<&'a [u8]>>(
    input: &'a [u8],
) -> IResult<&'a [u8], (&'a [u8; 4], &'a [u8]), Error> {
    let (header_length, crc_length) = (4, 4);
    let (input, chunk_data) = length_data(map(be_u32, |v: u32| {
        v.saturating_add(header_length + crc_length)
    }))(input)?;
    let crc = calculate_crc(
        chunk_data[0..chunk_data.len() - crc_length as usize]
            .iter()
            .copied(),
    )
    .to_be_bytes();
    let (_, (chunk_type, data)) = tuple((
        take(header_length),
        terminated(
            take(chunk_data.len() - (header_length + crc_length) as usize),
            tag(crc),
        ),
    ))(chunk_data)?;
    let chunk_type: &[u8; 4] = match chunk_type.try_into() {
        Ok(chunk_type) => chunk_type,
        Err(_) => {
            return Err(nom::Err::Error(Error::from_error_kind(
                chunk_type,
                nom::error::ErrorKind::LengthValue,
            )))
        }
    };
    Ok((input, (chunk_type, data)))
}

pub(crate) mod ihdr {
    use nom::{
        bytes::complete::take,
        combinator::map_opt,
        number::complete::{be_u32, u8},
        sequence::tuple,
        IResult,
    };

    pub(crate) const HEADER: &[u8; 4] = b"IHDR";
    pub(crate) const PAYLOAD_LEN: usize = 13;

    #[derive(Debug)]
    pub(crate) struct IHDRChunk {
        pub(crate) width: u32,
        pub(crate) height: u32,
        pub(crate) bit_depth: u8,
        pub(crate) color_type: ColorType,
        pub(crate) compression_method: u8,
        pub(crate) filter_method: u8,
        pub(crate) interlace_method: u8,
    }
    impl IHDRChunk {
        /// 8-bit palette image, deflate, adaptive filtering, no interlacing.
        pub(crate) fn indexed(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                bit_depth: 8,
                color_type: ColorType::IndexedColor,
                compression_method: 0,
                filter_method: 0,
                interlace_method: 0,
            }
        }

        pub(crate) fn to_payload(&self) -> [u8; PAYLOAD_LEN] {
            let mut bytes = [0; PAYLOAD_LEN];
            bytes[0..4].copy_from_slice(&self.width.to_be_bytes());
            bytes[4..8].copy_from_slice(&self.height.to_be_bytes());
            bytes[8] = self.bit_depth;
            bytes[9] = self.color_type as u8;
            bytes[10] = self.compression_method;
            bytes[11] = self.filter_method;
            bytes[12] = self.interlace_method;
            bytes
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) enum ColorType {
        Greyscale = 0,
        Truecolor = 2,
        IndexedColor = 3,
        GreyscaleWithAlpha = 4,
        TruecolorWithAlpha = 6,
    }
    impl ColorType {
        fn from_u8(value: u8) -> Option<Self> {
            match value {
                0 => Some(Self::Greyscale),
                2 => Some(Self::Truecolor),
                3 => Some(Self::IndexedColor),
                4 => Some(Self::GreyscaleWithAlpha),
                6 => Some(Self::TruecolorWithAlpha),
                _ => None,
            }
        }
    }

    pub(crate) fn parse_data(chunk_data: &[u8]) -> IResult<&[u8], IHDRChunk> {
        let (rest, (width, height, bit_depth, color_type, other_bytes)) = tuple((
            be_u32,
            be_u32,
            u8,
            map_opt(u8, ColorType::from_u8),
            take(3usize),
        ))(chunk_data)?;
        Ok((
            rest,
            IHDRChunk {
                width,
                height,
                bit_depth,
                color_type,
                compression_method: other_bytes[0],
                filter_method: other_bytes[1],
                interlace_method: other_bytes[2],
            },
        ))
    }
}

pub(crate) mod plte {
    use nom::IResult;

    pub(crate) const HEADER: &[u8; 4] = b"PLTE";

    #[derive(Debug)]
    pub(crate) struct PLTEChunk<'a> {
        colors: &'a [u8],
    }
    impl PLTEChunk<'_> {
        pub(crate) fn len(&self) -> usize {
            self.colors.len() / 3
        }

        pub(crate) fn get_color(&self, index: u8) -> Option<(u8, u8, u8)> {
            let index = index as usize * 3;
            Some((
                *self.colors.get(index)?,
                *self.colors.get(index + 1)?,
                *self.colors.get(index + 2)?,
            ))
        }
    }

    pub(crate) fn parse_data(chunk_data: &[u8]) -> IResult<&[u8], PLTEChunk> {
        Ok((&chunk_data[0..0], PLTEChunk { colors: chunk_data }))
    }
}

pub(crate) mod trns {
    use nom::IResult;

    pub(crate) const HEADER: &[u8; 4] = b"tRNS";

    #[allow(non_camel_case_types)]
    #[derive(Debug)]
    pub(crate) struct tRNSChunk<'a> {
        inner: &'a [u8],
    }
    impl tRNSChunk<'_> {
        pub(crate) fn as_palette(&self, index: u8) -> u8 {
            *self.inner.get(index as usize).unwrap_or(&255)
        }
    }

    pub(crate) fn parse_data(chunk_data: &[u8]) -> IResult<&[u8], tRNSChunk> {
        Ok((&chunk_data[0..0], tRNSChunk { inner: chunk_data }))
    }
}

pub(crate) mod idat {
    use nom::IResult;

    pub(crate) const HEADER: &[u8; 4] = b"IDAT";

    #[derive(Debug)]
    pub(crate) struct IDATChunk<'a> {
        pub(crate) data: &'a [u8],
    }

    pub(crate) fn parse_data(chunk_data: &[u8]) -> IResult<&[u8], IDATChunk> {
        Ok((&chunk_data[0..0], IDATChunk { data: chunk_data }))
    }
}

pub(crate) mod iend {
    pub(crate) const HEADER: &[u8; 4] = b"IEND";
}

#[cfg(test)]
mod tests {
    use super::{iter_chunks, parse_signature, Chunk, ChunkSpan};
    use crate::crc::calculate_crc;

    fn chunk(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut bytes = (data.len() as u32).to_be_bytes().to_vec();
        bytes.extend(chunk_type);
        bytes.extend(data);
        let crc = calculate_crc(bytes[4..].iter().copied());
        bytes.extend(crc.to_be_bytes());
        bytes
    }

    #[test]
    fn span_arithmetic() {
        let span = ChunkSpan {
            offset: 25,
            size: 15,
        };
        assert_eq!(span.payload_offset(), 33);
        assert_eq!(span.payload_len(), 3);
        assert_eq!(span.crc_offset(), 36);
        assert_eq!(span.crc_range(), 29..36);
        assert_eq!(span.end(), 40);
    }

    #[test]
    fn signature_is_required() {
        assert!(parse_signature(b"\x89PNG\x0d\x0a\x1a\x0arest").is_ok());
        assert!(parse_signature(b"GIF89a").is_err());
    }

    #[test]
    fn iterates_until_iend() {
        let mut bytes = chunk(b"teXt", b"hello");
        bytes.extend(chunk(b"IEND", &[]));
        bytes.extend(chunk(b"IDAT", &[1, 2, 3]));
        let chunks: Vec<_> = iter_chunks(&bytes).collect::<anyhow::Result<_>>().unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(matches!(&chunks[0], Chunk::Unknown(raw) if raw.chunk_type == b"teXt"));
        assert!(matches!(chunks[1], Chunk::IEND));
    }

    #[test]
    fn rejects_bad_crc() {
        let mut bytes = chunk(b"IEND", &[]);
        bytes[11] ^= 0xff;
        let mut chunks = iter_chunks(&bytes);
        assert!(chunks.next().unwrap().is_err());
        assert!(chunks.next().is_none());
    }
}
