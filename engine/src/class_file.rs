//! Constant-pool rewriting for compiled class payloads.
//!
//! Every symbolic reference a class makes (its own name, super types, field
//! and method descriptors, string literals used for reflection) lives in a
//! `CONSTANT_Utf8` entry of the constant pool. Each of those entries is a
//! big-endian `u16` length followed by modified UTF-8 bytes, and other
//! structures refer to them by index only. Rewriting a class therefore means
//! re-emitting the constant pool with new lengths and copying the remainder
//! of the file verbatim.

use thiserror::Error;

/// Magic number at the start of every class file.
pub const CLASS_MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

/// Bytes before the constant pool count: magic, minor and major version.
const HEADER_LEN: usize = 8;

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

/// Structural problems found while walking a constant pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassFormatError {
    /// The payload ended in the middle of a structure.
    #[error("class data truncated at byte {offset}")]
    Truncated {
        /// Offset at which more bytes were expected.
        offset: usize,
    },

    /// A constant pool entry carries a tag this reader does not know.
    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownTag {
        /// The unrecognised tag byte.
        tag: u8,
        /// Constant pool index of the entry.
        index: u16,
    },

    /// A rewritten UTF-8 constant no longer fits its `u16` length prefix.
    #[error("constant {index} grows to {len} bytes, above the 65535 byte limit")]
    ConstantTooLong {
        /// Constant pool index of the entry.
        index: u16,
        /// Length the rewritten constant would need.
        len: usize,
    },
}

/// Return whether `path` and `content` describe a compiled class.
#[must_use]
pub fn is_class_file(path: &str, content: &[u8]) -> bool {
    path.ends_with(".class") && content.starts_with(&CLASS_MAGIC)
}

/// Rewrite every `CONSTANT_Utf8` entry of `class` through `rewrite`.
///
/// `rewrite` returns `Some(bytes)` for constants it changed and `None` for
/// constants to keep. Returns `Ok(None)` when no constant changed, so the
/// caller can keep the original buffer.
///
/// # Errors
///
/// Returns [`ClassFormatError`] if the constant pool is truncated, carries
/// an unknown tag, or a rewritten constant exceeds 65535 bytes.
pub fn rewrite_utf8_constants<F>(
    class: &[u8],
    mut rewrite: F,
) -> Result<Option<Vec<u8>>, ClassFormatError>
where
    F: FnMut(&[u8]) -> Option<Vec<u8>>,
{
    let mut reader = Reader::new(class);
    reader.take(HEADER_LEN)?;
    let count = reader.u16()?;

    let mut out = Vec::with_capacity(class.len());
    out.extend_from_slice(reader.consumed());
    let mut changed = false;

    let mut index: u16 = 1;
    while index < count {
        let tag = reader.u8()?;
        out.push(tag);
        match tag {
            TAG_UTF8 => {
                let len = usize::from(reader.u16()?);
                let bytes = reader.take(len)?;
                match rewrite(bytes) {
                    Some(replacement) => {
                        let new_len = u16::try_from(replacement.len()).map_err(|_| {
                            ClassFormatError::ConstantTooLong {
                                index,
                                len: replacement.len(),
                            }
                        })?;
                        out.extend_from_slice(&new_len.to_be_bytes());
                        out.extend_from_slice(&replacement);
                        changed = true;
                    }
                    None => {
                        out.extend_from_slice(&u16_bytes(len));
                        out.extend_from_slice(bytes);
                    }
                }
            }
            TAG_LONG | TAG_DOUBLE => {
                out.extend_from_slice(reader.take(8)?);
                // Eight-byte constants occupy two pool slots.
                index = index.saturating_add(1);
            }
            _ => {
                let width = fixed_width(tag).ok_or(ClassFormatError::UnknownTag { tag, index })?;
                out.extend_from_slice(reader.take(width)?);
            }
        }
        index = index.saturating_add(1);
    }

    if !changed {
        return Ok(None);
    }
    out.extend_from_slice(reader.remaining());
    Ok(Some(out))
}

/// Payload width of constants that have no variable-length part.
const fn fixed_width(tag: u8) -> Option<usize> {
    match tag {
        TAG_CLASS | TAG_STRING | TAG_METHOD_TYPE | TAG_MODULE | TAG_PACKAGE => Some(2),
        TAG_METHOD_HANDLE => Some(3),
        TAG_INTEGER
        | TAG_FLOAT
        | TAG_FIELDREF
        | TAG_METHODREF
        | TAG_INTERFACE_METHODREF
        | TAG_NAME_AND_TYPE
        | TAG_DYNAMIC
        | TAG_INVOKE_DYNAMIC => Some(4),
        _ => None,
    }
}

fn u16_bytes(len: usize) -> [u8; 2] {
    // Lengths read from a u16 prefix always fit back into one.
    u16::try_from(len).unwrap_or(u16::MAX).to_be_bytes()
}

/// Forward-only cursor over class bytes.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ClassFormatError> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(ClassFormatError::Truncated { offset: self.pos })?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(ClassFormatError::Truncated { offset: self.pos })?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ClassFormatError> {
        let offset = self.pos;
        self.take(1)?
            .first()
            .copied()
            .ok_or(ClassFormatError::Truncated { offset })
    }

    fn u16(&mut self) -> Result<u16, ClassFormatError> {
        let offset = self.pos;
        let bytes: [u8; 2] = self
            .take(2)?
            .try_into()
            .map_err(|_| ClassFormatError::Truncated { offset })?;
        Ok(u16::from_be_bytes(bytes))
    }

    fn consumed(&self) -> &'a [u8] {
        self.bytes.get(..self.pos).unwrap_or_default()
    }

    fn remaining(&self) -> &'a [u8] {
        self.bytes.get(self.pos..).unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "class_file_tests.rs"]
mod tests;
