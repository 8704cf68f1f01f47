use std::collections::HashMap;

use crate::pixel::Pixel;

/// Outcome of registering a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSlot {
    Assigned(u8),
    /// Every palette slot was already taken by another color.
    Saturated,
}
impl ColorSlot {
    /// The byte to store in the pixel plane. A saturated palette falls back to
    /// index 0.
    pub fn index(self) -> u8 {
        match self {
            ColorSlot::Assigned(index) => index,
            ColorSlot::Saturated => 0,
        }
    }
}

/// What to do with a new color once the palette is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaturationPolicy {
    /// Hand back [`ColorSlot::Saturated`] and leave the palette alone.
    #[default]
    Clamp,
    /// Fail with [`EncodeError::PaletteExhausted`](crate::EncodeError::PaletteExhausted).
    Reject,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Allocation {
    Existing(u8),
    New(u8),
    Full,
}

/// Colors seen so far, keyed by their packed ARGB value, indexed in the order
/// they were first registered.
#[derive(Debug)]
pub(crate) struct Palette {
    indices: HashMap<u32, u8>,
    capacity: u16,
}
impl Palette {
    pub(crate) fn new(capacity: u16) -> Self {
        Self {
            indices: HashMap::with_capacity(capacity as usize),
            capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.indices.len()
    }

    pub(crate) fn allocate(&mut self, color: Pixel) -> Allocation {
        let key = color.key();
        if let Some(&index) = self.indices.get(&key) {
            return Allocation::Existing(index);
        }
        if self.len() >= self.capacity as usize {
            return Allocation::Full;
        }
        // capacity never exceeds 256, so the next index fits a byte
        let index = self.len() as u8;
        self.indices.insert(key, index);
        Allocation::New(index)
    }
}
