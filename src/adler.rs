/// Largest prime smaller than 65536.
const BASE: u32 = 65521;
/// Largest n such that 255n(n+1)/2 + (n+1)(BASE-1) <= 2^32-1.
const NMAX: usize = 5552;

/// Running Adler-32 over the zlib stream contents.
///
/// Sums are only reduced every [`NMAX`] bytes, which keeps `s2` inside a `u32`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Adler32 {
    s1: u32,
    s2: u32,
    pending: usize,
}

impl Adler32 {
    pub(crate) fn new() -> Self {
        Self {
            s1: 1,
            s2: 0,
            pending: 0,
        }
    }

    pub(crate) fn update(&mut self, data: &[u8]) {
        for &b in data {
            self.s1 += b as u32;
            self.s2 += self.s1;
            self.pending += 1;
            if self.pending == NMAX {
                self.s1 %= BASE;
                self.s2 %= BASE;
                self.pending = 0;
            }
        }
    }

    pub(crate) fn finish(self) -> u32 {
        ((self.s2 % BASE) << 16) | (self.s1 % BASE)
    }
}
