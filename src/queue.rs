use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::bits::{length_u16, skip_padding_bytes, write_padding_bytes};
use crate::ofp_error::{OfpSerializationError, Result};
use crate::ofp_message::{DecodeContext, OfpMessage};
use crate::registry::{Registries, TypeRegistry};
use crate::tlv::{parse_tlv_list, read_remaining, read_tlv_header, tlv_list_length,
                 write_tlv_header, write_tlv_list, TlvElement};

/// Queue property header: type, length, and 4 pad bytes.
pub const QUEUE_PROPERTY_HEADER_LENGTH: usize = 8;

/// Fixed part of a queue description ahead of its properties.
pub const PACKET_QUEUE_HEADER_LENGTH: usize = 16;

#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QueuePropertyType {
    MinRate = 1,
    MaxRate = 2,
}

/// A queue configuration property. Rates are in 1/10 of a percent of link speed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueueProperty {
    MinRate(u16),
    MaxRate(u16),
    Unknown { typ: u16, length: u16, body: Vec<u8> },
}

impl QueueProperty {
    pub fn standard_types() -> TypeRegistry<QueueProperty> {
        let mut registry = TypeRegistry::new(QueueProperty::KIND);
        registry.register(QueuePropertyType::MinRate as u16, || QueueProperty::MinRate(0))
            .register(QueuePropertyType::MaxRate as u16, || QueueProperty::MaxRate(0));
        registry
    }

    pub fn code(&self) -> u16 {
        match *self {
            QueueProperty::MinRate(_) => QueuePropertyType::MinRate as u16,
            QueueProperty::MaxRate(_) => QueuePropertyType::MaxRate as u16,
            QueueProperty::Unknown { typ, .. } => typ,
        }
    }
}

impl TlvElement for QueueProperty {
    const KIND: &'static str = "queue property";
    const HEADER_LENGTH: usize = QUEUE_PROPERTY_HEADER_LENGTH;

    fn registry(registries: &Registries) -> Option<&TypeRegistry<QueueProperty>> {
        Some(&registries.queue_properties)
    }

    fn unknown(typ: u16, length: u16) -> QueueProperty {
        QueueProperty::Unknown {
            typ,
            length,
            body: vec![],
        }
    }

    fn read_from(&mut self, bytes: &mut Cursor<&[u8]>, _: &DecodeContext) -> Result<()> {
        let (_, declared) = read_tlv_header(bytes)?;
        skip_padding_bytes(bytes, 4)?;
        match *self {
            QueueProperty::MinRate(ref mut rate) |
            QueueProperty::MaxRate(ref mut rate) => {
                *rate = bytes.read_u16::<BigEndian>()?;
                skip_padding_bytes(bytes, 6)?;
            }
            QueueProperty::Unknown { ref mut length, ref mut body, .. } => {
                *length = declared;
                *body = read_remaining(bytes)?;
            }
        }
        Ok(())
    }

    fn write_to(&self, bytes: &mut Vec<u8>) -> Result<()> {
        write_tlv_header(bytes, self.code(), self.length())?;
        write_padding_bytes(bytes, 4)?;
        match *self {
            QueueProperty::MinRate(rate) |
            QueueProperty::MaxRate(rate) => {
                bytes.write_u16::<BigEndian>(rate)?;
                write_padding_bytes(bytes, 6)?;
            }
            QueueProperty::Unknown { length, ref body, .. } => {
                let room = (length as usize).saturating_sub(QUEUE_PROPERTY_HEADER_LENGTH);
                let n = body.len().min(room);
                bytes.extend_from_slice(&body[..n]);
                write_padding_bytes(bytes, room - n)?;
            }
        }
        Ok(())
    }

    fn length(&self) -> usize {
        match *self {
            QueueProperty::Unknown { length, .. } => {
                (length as usize).max(QUEUE_PROPERTY_HEADER_LENGTH)
            }
            _ => 16,
        }
    }
}

/// Description of one queue attached to a port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketQueue {
    pub queue_id: u32,
    pub port: u32,
    pub properties: Vec<QueueProperty>,
}

impl OfpMessage for PacketQueue {
    fn size_of(queue: &PacketQueue) -> usize {
        PACKET_QUEUE_HEADER_LENGTH + tlv_list_length(&queue.properties)
    }

    fn parse(bytes: &mut Cursor<&[u8]>, ctx: &DecodeContext) -> Result<PacketQueue> {
        let queue_id = bytes.read_u32::<BigEndian>()?;
        let port = bytes.read_u32::<BigEndian>()?;
        let len = bytes.read_u16::<BigEndian>()? as usize;
        skip_padding_bytes(bytes, 6)?;
        if len < PACKET_QUEUE_HEADER_LENGTH {
            return Err(OfpSerializationError::MalformedHeader {
                kind: "packet queue",
                reason: format!("length {} is shorter than the queue header", len),
            });
        }
        let properties = parse_tlv_list(bytes, len - PACKET_QUEUE_HEADER_LENGTH, ctx)?;
        Ok(PacketQueue {
            queue_id,
            port,
            properties,
        })
    }

    fn marshal(queue: &PacketQueue, bytes: &mut Vec<u8>) -> Result<()> {
        bytes.write_u32::<BigEndian>(queue.queue_id)?;
        bytes.write_u32::<BigEndian>(queue.port)?;
        let length = length_u16("packet queue", PacketQueue::size_of(queue))?;
        bytes.write_u16::<BigEndian>(length)?;
        write_padding_bytes(bytes, 6)?;
        write_tlv_list(&queue.properties, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_with_rates_round_trips() {
        let queue = PacketQueue {
            queue_id: 1,
            port: 2,
            properties: vec![QueueProperty::MinRate(100), QueueProperty::MaxRate(900)],
        };
        let bytes = PacketQueue::encode(&queue).unwrap();
        assert_eq!(bytes.len(), 48);
        assert_eq!(&bytes[8..10], &[0, 48]);
        assert_eq!(&bytes[16..24], &[0, 1, 0, 16, 0, 0, 0, 0]);

        let (decoded, consumed) = PacketQueue::decode(&bytes, &DecodeContext::default()).unwrap();
        assert_eq!(decoded, queue);
        assert_eq!(consumed, 48);
    }

    #[test]
    fn experimenter_properties_are_generic() {
        let mut bytes = vec![0, 0, 0, 1, 0, 0, 0, 2, 0, 32, 0, 0, 0, 0, 0, 0];
        bytes.extend(&[0xff, 0xff, 0, 16, 0, 0, 0, 0, 0, 0, 0x23, 0x20, 0, 0, 0, 0]);
        let (queue, _) = PacketQueue::decode(&bytes, &DecodeContext::default()).unwrap();
        match queue.properties[0] {
            QueueProperty::Unknown { typ: 0xffff, length: 16, ref body } => assert_eq!(body.len(), 8),
            ref other => panic!("expected a generic property, got {:?}", other),
        }
    }

    #[test]
    fn property_shorter_than_its_header_is_malformed() {
        let bytes = [0, 0, 0, 1, 0, 0, 0, 2, 0, 24, 0, 0, 0, 0, 0, 0, 0, 1, 0, 4, 0, 0, 0, 0];
        match PacketQueue::decode(&bytes, &DecodeContext::default()) {
            Err(OfpSerializationError::MalformedHeader { kind: "queue property", .. }) => {}
            other => panic!("expected a malformed property, got {:?}", other),
        }
    }
}
