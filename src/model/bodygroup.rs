// Packed body value codec.
//
// The selected submodel of every body part is packed into one integer using
// mixed-radix encoding: each body part is a digit whose base is its submodel
// count, least-significant digit first. An explicit encode/decode pair keeps
// the arithmetic in one place.

/// Place value of one digit: the product of all earlier radices.
/// Radices below 2 contribute nothing and count as base 1.
fn place_base(radices: &[usize], place: usize) -> u32 {
    radices[..place]
        .iter()
        .map(|&r| r.max(1) as u32)
        .product()
}

/// Decodes the digit stored at `place`. Returns 0 for an unknown place or a
/// degenerate (0/1-submodel) radix.
pub fn decode_digit(value: u32, radices: &[usize], place: usize) -> usize {
    if place >= radices.len() || radices[place] <= 1 {
        return 0;
    }
    ((value / place_base(radices, place)) % radices[place] as u32) as usize
}

/// Re-encodes `value` with the digit at `place` replaced by `digit`, leaving
/// every other digit unchanged. Out-of-range places or digits (including any
/// digit for a zero-submodel part) return `value` untouched.
pub fn encode_digit(value: u32, radices: &[usize], place: usize, digit: usize) -> u32 {
    if place >= radices.len() || radices[place] == 0 || digit >= radices[place] {
        return value;
    }
    let base = place_base(radices, place);
    let current = decode_digit(value, radices, place) as u32;
    value - current * base + digit as u32 * base
}
