use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::bits::{length_u16, pad8, test_bit};
use crate::ofp_error::{OfpSerializationError, Result};
use crate::ofp_header::{MsgCode, OfpHeader, OPENFLOW_0_04_VERSION};
use crate::ofp_message::{DecodeContext, OfpMessage};
use crate::registry::{Registries, TypeRegistry};
use crate::tlv::{parse_tlv_list, read_remaining, read_tlv_header, tlv_list_length,
                 write_tlv_header, write_tlv_list, TlvElement, TLV_HEADER_LENGTH};

#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HelloElementType {
    VersionBitmap = 1,
}

/// An element of a hello message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HelloElement {
    /// Bit `n` of the bitmap sequence is set when wire version `n` is supported.
    VersionBitmap(Vec<u32>),
    Unknown { typ: u16, length: u16, body: Vec<u8> },
}

impl HelloElement {
    pub fn standard_types() -> TypeRegistry<HelloElement> {
        let mut registry = TypeRegistry::new(HelloElement::KIND);
        registry.register(HelloElementType::VersionBitmap as u16,
                          || HelloElement::VersionBitmap(vec![]));
        registry
    }

    /// A version bitmap advertising every version in `versions`.
    pub fn supporting(versions: &[u8]) -> HelloElement {
        let words = versions.iter().map(|v| *v as usize / 32 + 1).max().unwrap_or(1);
        let mut bitmaps = vec![0u32; words];
        for v in versions {
            bitmaps[*v as usize / 32] |= 1 << (*v as u32 % 32);
        }
        HelloElement::VersionBitmap(bitmaps)
    }

    pub fn code(&self) -> u16 {
        match *self {
            HelloElement::VersionBitmap(_) => HelloElementType::VersionBitmap as u16,
            HelloElement::Unknown { typ, .. } => typ,
        }
    }
}

impl TlvElement for HelloElement {
    const KIND: &'static str = "hello element";

    fn registry(registries: &Registries) -> Option<&TypeRegistry<HelloElement>> {
        Some(&registries.hello_elements)
    }

    fn unknown(typ: u16, length: u16) -> HelloElement {
        HelloElement::Unknown {
            typ,
            length,
            body: vec![],
        }
    }

    fn read_from(&mut self, bytes: &mut Cursor<&[u8]>, _: &DecodeContext) -> Result<()> {
        let (_, declared) = read_tlv_header(bytes)?;
        match *self {
            HelloElement::VersionBitmap(ref mut bitmaps) => {
                let count = (declared as usize).saturating_sub(TLV_HEADER_LENGTH) / 4;
                *bitmaps = (0..count)
                    .map(|_| bytes.read_u32::<BigEndian>())
                    .collect::<std::io::Result<Vec<u32>>>()?;
            }
            HelloElement::Unknown { ref mut length, ref mut body, .. } => {
                *length = declared;
                *body = read_remaining(bytes)?;
            }
        }
        Ok(())
    }

    fn write_to(&self, bytes: &mut Vec<u8>) -> Result<()> {
        write_tlv_header(bytes, self.code(), self.length())?;
        match *self {
            HelloElement::VersionBitmap(ref bitmaps) => {
                for bitmap in bitmaps {
                    bytes.write_u32::<BigEndian>(*bitmap)?;
                }
            }
            HelloElement::Unknown { ref body, .. } => bytes.extend_from_slice(body),
        }
        Ok(())
    }

    fn length(&self) -> usize {
        match *self {
            HelloElement::VersionBitmap(ref bitmaps) => TLV_HEADER_LENGTH + 4 * bitmaps.len(),
            HelloElement::Unknown { ref body, .. } => TLV_HEADER_LENGTH + body.len(),
        }
    }

    fn padded_length(declared: usize) -> usize {
        pad8(declared)
    }
}

/// Hello message, exchanged when a connection opens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hello {
    pub xid: u32,
    pub elements: Vec<HelloElement>,
}

impl Hello {
    /// Whether the peer advertised `version`. Peers without a bitmap only name their
    /// highest version in the header, which this message does not keep.
    pub fn supports(&self, version: u8) -> bool {
        self.elements.iter().any(|e| match *e {
            HelloElement::VersionBitmap(ref bitmaps) => {
                bitmaps.get(version as usize / 32)
                    .map_or(false, |b| test_bit(version as u64 % 32, *b as u64))
            }
            _ => false,
        })
    }
}

impl OfpMessage for Hello {
    fn size_of(hello: &Hello) -> usize {
        OfpHeader::size() + tlv_list_length(&hello.elements)
    }

    fn parse(bytes: &mut Cursor<&[u8]>, ctx: &DecodeContext) -> Result<Hello> {
        let header = OfpHeader::parse(bytes)?;
        if header.type_code() != Some(MsgCode::Hello) {
            return Err(OfpSerializationError::MalformedHeader {
                kind: "hello",
                reason: format!("message type {:?} is not a hello", header.type_code()),
            });
        }
        let elements = parse_tlv_list(bytes, header.length() - OfpHeader::size(), ctx)?;
        Ok(Hello {
            xid: header.xid(),
            elements,
        })
    }

    fn marshal(hello: &Hello, bytes: &mut Vec<u8>) -> Result<()> {
        let header = OfpHeader::new(OPENFLOW_0_04_VERSION,
                                    MsgCode::Hello as u8,
                                    length_u16("hello", Hello::size_of(hello))?,
                                    hello.xid);
        OfpHeader::marshal(bytes, header)?;
        write_tlv_list(&hello.elements, bytes)
    }
}
