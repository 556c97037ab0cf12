//! Word codec errors

use thiserror::Error;

use super::width::WordWidth;

/// Result type for word codec operations
pub type WordResult<T> = Result<T, WordError>;

/// Failures raised while validating or decoding fixed-width words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WordError {
    #[error("value {value} does not fit in {width} (max {max})")]
    OutOfBitDepth {
        value: u64,
        width: WordWidth,
        max: u64,
    },

    #[error("signed value {value} does not fit in {width} (range {min}..={max})")]
    SignedOutOfBitDepth {
        value: i64,
        width: WordWidth,
        min: i64,
        max: i64,
    },

    #[error("need {needed} bytes to decode {width}, only {available} available")]
    EndOfStream {
        width: WordWidth,
        needed: usize,
        available: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bit_depth_display() {
        let err = WordWidth::Byte.ensure_can_fit(256).unwrap_err();
        let display = err.to_string();
        assert!(display.contains("256"));
        assert!(display.contains("BYTE"));
        assert!(display.contains("255"));
    }
}
