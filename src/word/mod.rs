//! Compact fixed-width integer codec
//!
//! Sizes and pointers throughout the store are written at the narrowest of
//! eight widths (0, 1, 2, 3, 4, 5, 6 or 8 bytes), big-endian.

mod codec;
mod errors;
mod width;

pub use codec::{
    encode_word, read_signed, read_word, to_signed, to_unsigned, write_signed, write_word,
    write_word_checked,
};
pub use errors::{WordError, WordResult};
pub use width::WordWidth;
