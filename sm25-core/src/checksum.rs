//! SM25 frame checksum
//!
//! The trailer of every frame is the low 16 bits of the arithmetic sum of
//! every byte that precedes it (prefix through the last data byte).
//! Outgoing packets and incoming frames use the same function.

use tracing::trace;

/// Calculate the checksum of the bytes preceding a checksum field
///
/// # Examples
///
/// ```
/// use sm25_core::checksum;
///
/// assert_eq!(checksum::calculate(&[0x55, 0xAA, 0x01, 0x00]), 0x0100);
/// ```
pub fn calculate(bytes: &[u8]) -> u16 {
    let sum = bytes
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)));

    trace!(
        len = bytes.len(),
        checksum = format!("0x{:04X}", sum),
        "Calculated checksum"
    );

    sum
}

/// Verify a checksum against the bytes it covers
pub fn verify(bytes: &[u8], expected: u16) -> bool {
    calculate(bytes) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_empty() {
        assert_eq!(calculate(&[]), 0);
    }

    #[test]
    fn test_checksum_sums_bytes() {
        assert_eq!(calculate(&[1, 2, 3, 4]), 10);
        assert_eq!(calculate(&[0xFF, 0xFF]), 0x01FE);
    }

    #[test]
    fn test_checksum_wraps() {
        // 258 * 0xFF = 0x100FE, truncated to 16 bits
        let bytes = vec![0xFF; 258];
        assert_eq!(calculate(&bytes), 0x00FE);
    }

    #[test]
    fn test_checksum_verify() {
        let bytes = [0x55, 0xAA, 0x30, 0x01];
        let checksum = calculate(&bytes);

        assert!(verify(&bytes, checksum));
        assert!(!verify(&bytes, checksum.wrapping_add(1)));
    }
}
