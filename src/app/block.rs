//! Typed view of the Block1 option (RFC 7959 §2.2).

use coap_lite::error::IncompatibleOptionValueFormat;
use coap_lite::option_value::OptionValueType;

/// Largest block number representable in the 3-byte option value.
const MAX_BLOCK_NUM: u32 = (1 << 20) - 1;

/// Size exponent 7 is reserved for BERT, which only exists on reliable transports.
const MAX_SIZE_EXPONENT: u8 = 6;

/// Block1 descriptor of a request: which slice of a larger logical payload it carries.
///
/// Requests without the option are not blockwise at all; [`crate::app::Request::block1`]
/// returns `None` for them, which callers treat as a single chunk at offset 0 with nothing
/// more to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block1 {
    pub num: u32,
    pub more: bool,
    pub size_exponent: u8,
}

impl Block1 {
    pub fn new(num: u32, more: bool, size_exponent: u8) -> Result<Self, IncompatibleOptionValueFormat> {
        if num > MAX_BLOCK_NUM {
            return Err(IncompatibleOptionValueFormat {
                message: format!("block number {num} does not fit in 20 bits"),
            });
        }
        if size_exponent > MAX_SIZE_EXPONENT {
            return Err(IncompatibleOptionValueFormat {
                message: format!("size exponent {size_exponent} is reserved"),
            });
        }
        Ok(Self {
            num,
            more,
            size_exponent,
        })
    }

    /// Block size in bytes, 16 through 1024.
    pub fn size(&self) -> usize {
        1 << (self.size_exponent + 4)
    }

    /// Byte offset of this block within the logical payload.
    pub fn offset(&self) -> usize {
        (self.num as usize) << (self.size_exponent + 4)
    }

    fn to_uint(self) -> u32 {
        (self.num << 4) | (u32::from(self.more) << 3) | u32::from(self.size_exponent)
    }
}

impl From<Block1> for Vec<u8> {
    fn from(block: Block1) -> Self {
        // Option values are minimal-length big-endian uints; zero is the empty string.
        let bytes = block.to_uint().to_be_bytes();
        let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        bytes[first_nonzero..].to_vec()
    }
}

impl TryFrom<Vec<u8>> for Block1 {
    type Error = IncompatibleOptionValueFormat;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        if value.len() > 3 {
            return Err(IncompatibleOptionValueFormat {
                message: format!("Block1 value is {} bytes, at most 3 allowed", value.len()),
            });
        }
        let raw = value
            .iter()
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
        let size_exponent = (raw & 0x07) as u8;
        Self::new(raw >> 4, raw & 0x08 != 0, size_exponent)
    }
}

impl OptionValueType for Block1 {}
