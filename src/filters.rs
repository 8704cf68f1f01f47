use anyhow::anyhow;

pub(crate) enum Filter {
    None,
    Sub,
}
impl Filter {
    /// `a` is the reconstructed byte one pixel to the left, 0 at the row start.
    pub(crate) fn reconstruct(&self, x: u8, a: u8) -> u8 {
        match self {
            Filter::None => x,
            Filter::Sub => x.wrapping_add(a),
        }
    }
}
impl TryFrom<u8> for Filter {
    type Error = anyhow::Error;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Sub),
            i => Err(anyhow!("We don't support filter type {i}")),
        }
    }
}

/// Undoes per-row filtering for 1-byte-per-pixel scanlines, returning the
/// pixel bytes without their filter bytes.
pub(crate) fn reconstruct_scanlines(data: &[u8], width: usize) -> anyhow::Result<Vec<u8>> {
    let mut pixels = Vec::with_capacity(data.len() - data.len() / (width + 1));
    for scanline in data.chunks(width + 1) {
        let (&filter_type, row) = scanline
            .split_first()
            .ok_or_else(|| anyhow!("empty scanline"))?;
        let filter = Filter::try_from(filter_type)?;
        let mut left = 0;
        for &x in row {
            left = filter.reconstruct(x, left);
            pixels.push(left);
        }
    }
    Ok(pixels)
}
