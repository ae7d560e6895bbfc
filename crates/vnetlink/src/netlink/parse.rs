//! Parser combinators and the `FromNetlink` trait for typed responses.

use winnow::binary::le_u16;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take;

use super::attr::{NLA_HDRLEN, NLA_TYPE_MASK, nla_align};
use super::error::{Error, Result};

/// Result type for winnow parsers.
pub type PResult<T> = core::result::Result<T, ErrMode<ContextError>>;

/// Trait for types that can be parsed from a netlink message payload
/// (family header plus attributes).
pub trait FromNetlink: Sized {
    /// Parse from a mutable byte slice reference.
    /// The slice is advanced past the consumed bytes.
    fn parse(input: &mut &[u8]) -> PResult<Self>;

    /// Parse from a complete payload.
    fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::parse
            .parse(data)
            .map_err(|e| Error::InvalidMessage(format!("{}", e)))
    }
}

/// Error value for a payload that cannot be decoded.
pub(crate) fn cut() -> ErrMode<ContextError> {
    ErrMode::Cut(ContextError::new())
}

/// Parse one attribute and return (type without flags, payload).
///
/// Consumes the alignment padding when present.
pub fn parse_attr<'a>(input: &mut &'a [u8]) -> PResult<(u16, &'a [u8])> {
    let len = le_u16.parse_next(input)? as usize;
    let attr_type = le_u16.parse_next(input)?;

    if len < NLA_HDRLEN {
        return Err(cut());
    }

    let payload: &[u8] = take(len - NLA_HDRLEN).parse_next(input)?;

    let padding = nla_align(len) - len;
    let padding = padding.min(input.len());
    let _: &[u8] = take(padding).parse_next(input)?;

    Ok((attr_type & NLA_TYPE_MASK, payload))
}

/// Parse a fixed family header that is at least `size` bytes long.
pub fn parse_header<'a>(input: &mut &'a [u8], size: usize) -> PResult<&'a [u8]> {
    if input.len() < size {
        return Err(cut());
    }
    take(size).parse_next(input)
}

/// Decode a string from a NUL-terminated attribute payload.
pub fn parse_string_from_bytes(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}
