//! The fixed family of word widths
//!
//! Every size and pointer in a chunk header is stored at one of eight widths.
//! The width table is a compile-time constant.

use std::fmt;

use super::errors::{WordError, WordResult};

/// One of the eight fixed integer encodings, ordered by byte count.
///
/// The discriminant is the 3-bit index stored in chunk header flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum WordWidth {
    /// 0 bytes, only represents 0
    Void = 0,
    /// 1 byte
    Byte = 1,
    /// 2 bytes
    Short = 2,
    /// 3 bytes
    SmallInt = 3,
    /// 4 bytes
    Int = 4,
    /// 5 bytes
    BigInt = 5,
    /// 6 bytes
    SmallLong = 6,
    /// 8 bytes, the native 64-bit range
    Long = 7,
}

#[derive(Debug, Clone, Copy)]
struct WidthInfo {
    bytes: usize,
    max_unsigned: u64,
    signed_min: i64,
    signed_max: i64,
    name: &'static str,
}

const fn width_info(bytes: usize, name: &'static str) -> WidthInfo {
    if bytes == 0 {
        WidthInfo {
            bytes,
            max_unsigned: 0,
            signed_min: 0,
            signed_max: 0,
            name,
        }
    } else if bytes >= 8 {
        WidthInfo {
            bytes,
            max_unsigned: u64::MAX,
            signed_min: i64::MIN,
            signed_max: i64::MAX,
            name,
        }
    } else {
        let bits = (bytes * 8) as u32;
        WidthInfo {
            bytes,
            max_unsigned: (1u64 << bits) - 1,
            signed_min: -(1i64 << (bits - 1)),
            signed_max: (1i64 << (bits - 1)) - 1,
            name,
        }
    }
}

const WIDTH_TABLE: [WidthInfo; 8] = [
    width_info(0, "VOID"),
    width_info(1, "BYTE"),
    width_info(2, "SHORT"),
    width_info(3, "SMALL_INT"),
    width_info(4, "INT"),
    width_info(5, "BIG_INT"),
    width_info(6, "SMALL_LONG"),
    width_info(8, "LONG"),
];

impl WordWidth {
    /// All widths, narrowest first.
    pub const ALL: [WordWidth; 8] = [
        WordWidth::Void,
        WordWidth::Byte,
        WordWidth::Short,
        WordWidth::SmallInt,
        WordWidth::Int,
        WordWidth::BigInt,
        WordWidth::SmallLong,
        WordWidth::Long,
    ];

    /// The widest width.
    pub const LARGEST: WordWidth = WordWidth::Long;

    fn info(self) -> &'static WidthInfo {
        &WIDTH_TABLE[self as usize]
    }

    /// Index used in header flag bits (0..=7).
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Width for a 3-bit header index, `None` above 7.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Encoded length in bytes.
    pub fn bytes(self) -> usize {
        self.info().bytes
    }

    pub fn max_unsigned(self) -> u64 {
        self.info().max_unsigned
    }

    pub fn signed_min(self) -> i64 {
        self.info().signed_min
    }

    pub fn signed_max(self) -> i64 {
        self.info().signed_max
    }

    /// Table name (`VOID`, `BYTE`, ... `LONG`).
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Next narrower width, `None` for VOID.
    pub fn prev(self) -> Option<Self> {
        match self.index() {
            0 => None,
            i => Self::from_index(i - 1),
        }
    }

    /// Next wider width, `None` for LONG.
    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// Smallest width whose unsigned range covers `value`.
    pub fn for_unsigned(value: u64) -> Self {
        Self::ALL
            .into_iter()
            .find(|w| value <= w.max_unsigned())
            .unwrap_or(Self::LARGEST)
    }

    /// Smallest width whose signed range covers `value`.
    pub fn for_signed(value: i64) -> Self {
        Self::ALL
            .into_iter()
            .find(|w| w.can_fit_signed(value))
            .unwrap_or(Self::LARGEST)
    }

    pub fn can_fit(self, value: u64) -> bool {
        value <= self.max_unsigned()
    }

    pub fn can_fit_signed(self, value: i64) -> bool {
        value >= self.signed_min() && value <= self.signed_max()
    }

    /// Fails with `OutOfBitDepth` when `value` exceeds the unsigned range.
    pub fn ensure_can_fit(self, value: u64) -> WordResult<()> {
        if self.can_fit(value) {
            Ok(())
        } else {
            Err(WordError::OutOfBitDepth {
                value,
                width: self,
                max: self.max_unsigned(),
            })
        }
    }

    /// Fails with `SignedOutOfBitDepth` when `value` is outside the signed range.
    pub fn ensure_can_fit_signed(self, value: i64) -> WordResult<()> {
        if self.can_fit_signed(value) {
            Ok(())
        } else {
            Err(WordError::SignedOutOfBitDepth {
                value,
                width: self,
                min: self.signed_min(),
                max: self.signed_max(),
            })
        }
    }
}

impl fmt::Display for WordWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_counts_match_table() {
        let bytes: Vec<usize> = WordWidth::ALL.iter().map(|w| w.bytes()).collect();
        assert_eq!(bytes, vec![0, 1, 2, 3, 4, 5, 6, 8]);
    }

    #[test]
    fn test_ranges() {
        assert_eq!(WordWidth::Void.max_unsigned(), 0);
        assert_eq!(WordWidth::Byte.max_unsigned(), 255);
        assert_eq!(WordWidth::Short.max_unsigned(), 65_535);
        assert_eq!(WordWidth::SmallInt.max_unsigned(), 0xFF_FFFF);
        assert_eq!(WordWidth::SmallLong.max_unsigned(), 0xFFFF_FFFF_FFFF);
        assert_eq!(WordWidth::Long.max_unsigned(), u64::MAX);

        assert_eq!(WordWidth::Byte.signed_min(), -128);
        assert_eq!(WordWidth::Byte.signed_max(), 127);
        assert_eq!(WordWidth::Long.signed_min(), i64::MIN);
        assert_eq!(WordWidth::Void.signed_min(), 0);
    }

    #[test]
    fn test_ordering_by_byte_count() {
        for pair in WordWidth::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].bytes() < pair[1].bytes());
            assert!(pair[0].max_unsigned() < pair[1].max_unsigned());
        }
    }

    #[test]
    fn test_prev_next_navigation() {
        assert_eq!(WordWidth::Void.prev(), None);
        assert_eq!(WordWidth::Long.next(), None);
        assert_eq!(WordWidth::Byte.next(), Some(WordWidth::Short));
        assert_eq!(WordWidth::Long.prev(), Some(WordWidth::SmallLong));
    }

    #[test]
    fn test_for_unsigned_is_minimal() {
        for width in WordWidth::ALL {
            let max = width.max_unsigned();
            assert_eq!(WordWidth::for_unsigned(max), width);
            if let Some(prev) = width.prev() {
                assert!(!prev.can_fit(max));
            }
        }
        assert_eq!(WordWidth::for_unsigned(0), WordWidth::Void);
        assert_eq!(WordWidth::for_unsigned(256), WordWidth::Short);
    }

    #[test]
    fn test_for_unsigned_is_monotonic() {
        let mut last = WordWidth::Void;
        for v in (0u64..70_000).chain([u32::MAX as u64, u32::MAX as u64 + 1]) {
            let w = WordWidth::for_unsigned(v);
            assert!(w >= last, "width for {} went down", v);
            last = w;
        }
    }

    #[test]
    fn test_for_signed() {
        assert_eq!(WordWidth::for_signed(0), WordWidth::Void);
        assert_eq!(WordWidth::for_signed(-1), WordWidth::Byte);
        assert_eq!(WordWidth::for_signed(127), WordWidth::Byte);
        assert_eq!(WordWidth::for_signed(128), WordWidth::Short);
        assert_eq!(WordWidth::for_signed(-129), WordWidth::Short);
        assert_eq!(WordWidth::for_signed(i64::MIN), WordWidth::Long);
    }

    #[test]
    fn test_ensure_can_fit() {
        assert!(WordWidth::Byte.ensure_can_fit(255).is_ok());
        assert!(matches!(
            WordWidth::Byte.ensure_can_fit(256),
            Err(WordError::OutOfBitDepth { value: 256, .. })
        ));
        assert!(WordWidth::Short.ensure_can_fit_signed(-32_768).is_ok());
        assert!(WordWidth::Short.ensure_can_fit_signed(32_768).is_err());
    }

    #[test]
    fn test_index_round_trip() {
        for width in WordWidth::ALL {
            assert_eq!(WordWidth::from_index(width.index()), Some(width));
        }
        assert_eq!(WordWidth::from_index(8), None);
    }
}
