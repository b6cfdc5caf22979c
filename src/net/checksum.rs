/// RFC 1071 internet checksum.
///
/// Bytes are summed as big-endian 16-bit words. An odd trailing byte is
/// treated as if it were followed by a zero byte; the buffer itself is never
/// extended. Carries are folded back into the low 16 bits until none remain
/// and the result is complemented.
pub fn rfc1071_checksum(buffer: &[u8]) -> u16 {
    !fold(sum_words(0, buffer))
}

/// Adds the 16-bit words of `buffer` to `sum` without folding.
pub(crate) fn sum_words(mut sum: u32, buffer: &[u8]) -> u32 {
    let mut words = buffer.chunks_exact(2);
    for word in &mut words {
        sum = sum.wrapping_add(u32::from(u16::from_be_bytes([word[0], word[1]])));
    }
    if let [last] = words.remainder() {
        sum = sum.wrapping_add(u32::from(*last) << 8);
    }
    sum
}

pub(crate) fn fold(mut sum: u32) -> u16 {
    while (sum >> 16) > 0 {
        sum = (sum >> 16) + (sum & 0xFFFF);
    }
    sum as u16
}
