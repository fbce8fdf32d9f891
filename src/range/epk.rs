//! Effective partition key arithmetic
//!
//! Keys are upper-case hex strings. Splitting a range needs a key that sorts
//! strictly between its bounds.

/// Extra bytes of precision tried before giving up on a midpoint
const MAX_EXTRA_BYTES: usize = 4;

/// Find a hex key strictly between `min` and `max`.
///
/// Returns `None` when either bound is not hex or no such key exists.
pub fn midpoint(min: &str, max: &str) -> Option<String> {
    if min >= max {
        return None;
    }

    let low = decode_hex(min)?;
    let high = decode_hex(max)?;
    let mut width = low.len().max(high.len()).max(1);

    for _ in 0..=MAX_EXTRA_BYTES {
        let mid = average(&pad(&low, width), &pad(&high, width));
        let candidate = encode_hex(&mid);
        if candidate.as_str() > min && candidate.as_str() < max {
            return Some(candidate);
        }
        width += 1;
    }

    None
}

fn decode_hex(value: &str) -> Option<Vec<u8>> {
    if !value.is_ascii() || value.len() % 2 != 0 {
        return None;
    }
    (0..value.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&value[i..i + 2], 16).ok())
        .collect()
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

// Right-pad: "7F" and "7F00" denote the same position in the key space.
fn pad(bytes: &[u8], width: usize) -> Vec<u8> {
    let mut padded = bytes.to_vec();
    padded.resize(width, 0);
    padded
}

// (a + b) / 2 over big-endian integers of equal width
fn average(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut sum = vec![0u8; a.len()];
    let mut carry = 0u16;
    for i in (0..a.len()).rev() {
        let s = u16::from(a[i]) + u16::from(b[i]) + carry;
        sum[i] = (s & 0xFF) as u8;
        carry = s >> 8;
    }

    let mut out = vec![0u8; a.len()];
    let mut high = carry;
    for (i, byte) in sum.iter().enumerate() {
        let v = (high << 8) | u16::from(*byte);
        out[i] = (v >> 1) as u8;
        high = v & 1;
    }
    out
}
