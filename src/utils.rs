pub(crate) const fn div_ceil(lhs: usize, rhs: usize) -> usize {
    let d = lhs / rhs;
    let r = lhs % rhs;
    if r > 0 && rhs > 0 {
        d + 1
    } else {
        d
    }
}

pub(crate) fn write_bytes(buffer: &mut [u8], offset: usize, bytes: &[u8]) {
    buffer[offset..offset + bytes.len()].copy_from_slice(bytes);
}

pub(crate) fn write_be_u32(buffer: &mut [u8], offset: usize, value: u32) {
    write_bytes(buffer, offset, &value.to_be_bytes());
}

pub(crate) fn write_be_u16(buffer: &mut [u8], offset: usize, value: u16) {
    write_bytes(buffer, offset, &value.to_be_bytes());
}

pub(crate) fn write_le_u16(buffer: &mut [u8], offset: usize, value: u16) {
    write_bytes(buffer, offset, &value.to_le_bytes());
}
