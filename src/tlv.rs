//! The type-length-value list loop shared by actions, instructions, queue properties,
//! hello elements, meter bands, and table-feature properties.
//!
//! Every element starts with `type:u16, length:u16`, where `length` counts the header.
//! The loop never trusts a length it has not checked against both the list bounds and the
//! buffer: a short remainder or an element running past the list end ends the list, and
//! the cursor is always left at the list end so that siblings stay aligned.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use crate::bits::{length_u16, write_padding_bytes};
use crate::ofp_error::{OfpSerializationError, Result};
use crate::ofp_message::DecodeContext;
use crate::registry::{Registries, TypeRegistry};

/// Size of the `type, length` prefix every element begins with.
pub const TLV_HEADER_LENGTH: usize = 4;

/// One member of a TLV element family.
pub trait TlvElement: Sized {
    /// Family name, used in errors and logs.
    const KIND: &'static str;
    /// Smallest legal declared length: the family's fixed header.
    const HEADER_LENGTH: usize = TLV_HEADER_LENGTH;

    /// The registry resolving this family's codes. Families without one decode every
    /// element as the generic representative.
    fn registry(registries: &Registries) -> Option<&TypeRegistry<Self>>;

    /// The generic representative for a code with no registered type.
    fn unknown(typ: u16, length: u16) -> Self;

    /// Decode the element whose header starts at the cursor. The cursor spans exactly the
    /// element's declared length.
    fn read_from(&mut self, bytes: &mut Cursor<&[u8]>, ctx: &DecodeContext) -> Result<()>;

    /// Append the element, header included, without trailing list padding.
    fn write_to(&self, bytes: &mut Vec<u8>) -> Result<()>;

    /// The length written into the element header.
    fn length(&self) -> usize;

    /// Bytes the element occupies in a list, given its declared length.
    fn padded_length(declared: usize) -> usize {
        declared
    }
}

/// Peek at the `(type, length)` header starting at `pos`, if the buffer holds one.
pub fn peek_tlv_header(buf: &[u8], pos: usize) -> Option<(u16, usize)> {
    let raw = buf.get(pos..pos + TLV_HEADER_LENGTH)?;
    Some((BigEndian::read_u16(raw), BigEndian::read_u16(&raw[2..]) as usize))
}

/// Consume the header of the element the cursor is positioned on.
pub fn read_tlv_header(bytes: &mut Cursor<&[u8]>) -> Result<(u16, u16)> {
    let typ = bytes.read_u16::<BigEndian>()?;
    let length = bytes.read_u16::<BigEndian>()?;
    Ok((typ, length))
}

/// Read everything left in an element's cursor.
pub fn read_remaining(bytes: &mut Cursor<&[u8]>) -> Result<Vec<u8>> {
    let mut rest = vec![];
    bytes.read_to_end(&mut rest)?;
    Ok(rest)
}

pub fn write_tlv_header(bytes: &mut Vec<u8>, typ: u16, length: usize) -> Result<()> {
    bytes.write_u16::<BigEndian>(typ)?;
    bytes.write_u16::<BigEndian>(length_u16("TLV element", length)?)?;
    Ok(())
}

/// Decode the elements packed into the next `length` bytes.
///
/// Stops early, without error, on a short remainder, an element declared past the list end,
/// an element whose own decode runs out of bytes, or once `ctx.element_limit` elements have
/// been collected. Either way the cursor ends at the list end, clamped to the buffer.
pub fn parse_tlv_list<T: TlvElement>(bytes: &mut Cursor<&[u8]>,
                                     length: usize,
                                     ctx: &DecodeContext)
                                     -> Result<Vec<T>> {
    let buf: &[u8] = *bytes.get_ref();
    let start = bytes.position() as usize;
    let end = (start + length).min(buf.len());
    let mut elements = vec![];
    let mut pos = start;

    while pos + TLV_HEADER_LENGTH <= end {
        if ctx.element_limit.map_or(false, |limit| elements.len() >= limit) {
            break;
        }
        let (typ, declared) = match peek_tlv_header(buf, pos) {
            Some(header) => header,
            None => break,
        };
        if declared < T::HEADER_LENGTH {
            return Err(OfpSerializationError::MalformedHeader {
                kind: T::KIND,
                reason: format!("declared length {} is shorter than the {}-byte header",
                                declared,
                                T::HEADER_LENGTH),
            });
        }
        if pos + declared > end {
            break;
        }

        let mut element = match T::registry(ctx.registries) {
            None => T::unknown(typ, declared as u16),
            Some(registry) => {
                match registry.instantiate(typ) {
                    Ok(element) => element,
                    Err(err) => {
                        debug!(kind = T::KIND, code = typ, %err, "decoding as a generic element");
                        T::unknown(typ, declared as u16)
                    }
                }
            }
        };
        let mut sub = Cursor::new(&buf[pos..pos + declared]);
        match element.read_from(&mut sub, ctx) {
            Ok(()) => {}
            Err(OfpSerializationError::TruncatedInput(reason)) => {
                debug!(kind = T::KIND, code = typ, %reason, "element shorter than its type");
                break;
            }
            Err(err) => return Err(err),
        }
        elements.push(element);
        pos = (pos + T::padded_length(declared)).min(end);
    }

    bytes.set_position(end as u64);
    Ok(elements)
}

/// Append every element, each followed by its family's list padding.
pub fn write_tlv_list<T: TlvElement>(elements: &[T], bytes: &mut Vec<u8>) -> Result<()> {
    for element in elements {
        let before = bytes.len();
        element.write_to(bytes)?;
        let written = bytes.len() - before;
        write_padding_bytes(bytes, T::padded_length(written) - written)?;
    }
    Ok(())
}

/// Bytes `write_tlv_list` produces for `elements`.
pub fn tlv_list_length<T: TlvElement>(elements: &[T]) -> usize {
    elements.iter().map(|e| T::padded_length(e.length())).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::hello::HelloElement;

    fn output(port: u32) -> Vec<u8> {
        let mut bytes = vec![];
        write_tlv_list(&[Action::Output {
                              port,
                              max_len: 0xffff,
                          }],
                       &mut bytes)
            .unwrap();
        bytes
    }

    #[test]
    fn partial_trailing_element_is_dropped() {
        let mut bytes = output(1);
        bytes.extend(output(2));
        bytes.extend(&output(3)[..10]);
        bytes.extend(&[0xaa; 6]);
        let declared = 16 + 16 + 10;

        let mut cursor = Cursor::new(&bytes[..]);
        let actions: Vec<Action> = parse_tlv_list(&mut cursor, declared, &DecodeContext::default())
            .unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[1],
                   Action::Output {
                       port: 2,
                       max_len: 0xffff,
                   });
        assert_eq!(cursor.position() as usize, declared);
    }

    #[test]
    fn unknown_codes_keep_their_header_and_length() {
        let mut bytes = vec![0x12, 0x34, 0x00, 0x0c, 1, 2, 3, 4, 5, 6, 7, 8];
        bytes.extend(output(9));
        let mut cursor = Cursor::new(&bytes[..]);
        let actions: Vec<Action> =
            parse_tlv_list(&mut cursor, bytes.len(), &DecodeContext::default()).unwrap();
        assert_eq!(actions.len(), 2);
        match actions[0] {
            Action::Unknown { typ: 0x1234, length: 12, ref body } => {
                assert_eq!(body, &vec![1, 2, 3, 4, 5, 6, 7, 8])
            }
            ref other => panic!("expected a generic action, got {:?}", other),
        }
        assert_eq!(actions[1],
                   Action::Output {
                       port: 9,
                       max_len: 0xffff,
                   });
        assert!(actions[0].is_unknown());
    }

    #[test]
    fn zero_declared_length_is_malformed() {
        let bytes = [0, 0, 0, 0, 0, 0, 0, 0];
        let result: Result<Vec<Action>> =
            parse_tlv_list(&mut Cursor::new(&bytes[..]), 8, &DecodeContext::default());
        match result {
            Err(OfpSerializationError::MalformedHeader { kind: "action", .. }) => {}
            other => panic!("expected a malformed header, got {:?}", other),
        }
    }

    #[test]
    fn element_shorter_than_its_type_ends_the_list() {
        // An output action declaring only 8 of its 16 bytes.
        let bytes = [0, 0, 0, 8, 0, 0, 0, 1];
        let mut cursor = Cursor::new(&bytes[..]);
        let actions: Vec<Action> =
            parse_tlv_list(&mut cursor, 8, &DecodeContext::default()).unwrap();
        assert!(actions.is_empty());
        assert_eq!(cursor.position(), 8);
    }

    #[test]
    fn element_limit_caps_the_list() {
        let mut bytes = output(1);
        bytes.extend(output(2));
        bytes.extend(output(3));
        let ctx = DecodeContext::default().with_element_limit(2);
        let mut cursor = Cursor::new(&bytes[..]);
        let actions: Vec<Action> = parse_tlv_list(&mut cursor, bytes.len(), &ctx).unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(cursor.position() as usize, bytes.len());
    }

    #[test]
    fn declared_range_larger_than_buffer_is_clamped() {
        let bytes = output(4);
        let mut cursor = Cursor::new(&bytes[..]);
        let actions: Vec<Action> =
            parse_tlv_list(&mut cursor, 64, &DecodeContext::default()).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(cursor.position(), 16);
    }

    #[test]
    fn padded_families_skip_to_the_next_boundary() {
        let elements = vec![HelloElement::VersionBitmap(vec![1 << 4]),
                            HelloElement::VersionBitmap(vec![1 << 1 | 1 << 4])];
        let mut bytes = vec![];
        write_tlv_list(&elements, &mut bytes).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(tlv_list_length(&elements), 16);
        assert_eq!(&bytes[..8], &[0, 1, 0, 8, 0, 0, 0, 0x10]);

        let mut cursor = Cursor::new(&bytes[..]);
        let decoded: Vec<HelloElement> =
            parse_tlv_list(&mut cursor, bytes.len(), &DecodeContext::default()).unwrap();
        assert_eq!(decoded, elements);
    }
}
