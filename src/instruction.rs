use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::action::Action;
use crate::bits::{skip_padding_bytes, write_padding_bytes};
use crate::ofp_error::Result;
use crate::ofp_message::DecodeContext;
use crate::registry::{Registries, TypeRegistry};
use crate::tlv::{parse_tlv_list, read_remaining, read_tlv_header, tlv_list_length,
                 write_tlv_header, write_tlv_list, TlvElement, TLV_HEADER_LENGTH};

/// OpenFlow 1.3 instruction type codes.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InstructionType {
    GotoTable = 1,
    WriteMetadata = 2,
    WriteActions = 3,
    ApplyActions = 4,
    ClearActions = 5,
    Meter = 6,
}

/// Header plus the 4 pad bytes ahead of an action list.
const ACTIONS_HEADER_LENGTH: usize = 8;

/// What a flow entry does with a packet it matches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    GotoTable(u8),
    WriteMetadata { metadata: u64, mask: u64 },
    WriteActions(Vec<Action>),
    ApplyActions(Vec<Action>),
    ClearActions,
    Meter(u32),
    Unknown { typ: u16, length: u16, body: Vec<u8> },
}

impl Instruction {
    pub fn standard_types() -> TypeRegistry<Instruction> {
        let mut registry = TypeRegistry::new(Instruction::KIND);
        registry.register(InstructionType::GotoTable as u16, || Instruction::GotoTable(0))
            .register(InstructionType::WriteMetadata as u16, || {
                Instruction::WriteMetadata {
                    metadata: 0,
                    mask: 0,
                }
            })
            .register(InstructionType::WriteActions as u16,
                      || Instruction::WriteActions(vec![]))
            .register(InstructionType::ApplyActions as u16,
                      || Instruction::ApplyActions(vec![]))
            .register(InstructionType::ClearActions as u16, || Instruction::ClearActions)
            .register(InstructionType::Meter as u16, || Instruction::Meter(0));
        registry
    }

    pub fn code(&self) -> u16 {
        match *self {
            Instruction::GotoTable(_) => InstructionType::GotoTable as u16,
            Instruction::WriteMetadata { .. } => InstructionType::WriteMetadata as u16,
            Instruction::WriteActions(_) => InstructionType::WriteActions as u16,
            Instruction::ApplyActions(_) => InstructionType::ApplyActions as u16,
            Instruction::ClearActions => InstructionType::ClearActions as u16,
            Instruction::Meter(_) => InstructionType::Meter as u16,
            Instruction::Unknown { typ, .. } => typ,
        }
    }

    /// The action list of a write or apply instruction.
    pub fn actions(&self) -> Option<&[Action]> {
        match *self {
            Instruction::WriteActions(ref actions) |
            Instruction::ApplyActions(ref actions) => Some(actions),
            _ => None,
        }
    }
}

impl TlvElement for Instruction {
    const KIND: &'static str = "instruction";

    fn registry(registries: &Registries) -> Option<&TypeRegistry<Instruction>> {
        Some(&registries.instructions)
    }

    fn unknown(typ: u16, length: u16) -> Instruction {
        Instruction::Unknown {
            typ,
            length,
            body: vec![],
        }
    }

    fn read_from(&mut self, bytes: &mut Cursor<&[u8]>, ctx: &DecodeContext) -> Result<()> {
        let (_, declared) = read_tlv_header(bytes)?;
        match *self {
            Instruction::GotoTable(ref mut table_id) => {
                *table_id = bytes.read_u8()?;
                skip_padding_bytes(bytes, 3)?;
            }
            Instruction::WriteMetadata { ref mut metadata, ref mut mask } => {
                skip_padding_bytes(bytes, 4)?;
                *metadata = bytes.read_u64::<BigEndian>()?;
                *mask = bytes.read_u64::<BigEndian>()?;
            }
            Instruction::WriteActions(ref mut actions) |
            Instruction::ApplyActions(ref mut actions) => {
                skip_padding_bytes(bytes, 4)?;
                let length = (declared as usize).saturating_sub(ACTIONS_HEADER_LENGTH);
                *actions = parse_tlv_list(bytes, length, ctx)?;
            }
            Instruction::ClearActions => skip_padding_bytes(bytes, 4)?,
            Instruction::Meter(ref mut meter_id) => *meter_id = bytes.read_u32::<BigEndian>()?,
            Instruction::Unknown { ref mut length, ref mut body, .. } => {
                *length = declared;
                *body = read_remaining(bytes)?;
            }
        }
        Ok(())
    }

    fn write_to(&self, bytes: &mut Vec<u8>) -> Result<()> {
        write_tlv_header(bytes, self.code(), self.length())?;
        match *self {
            Instruction::GotoTable(table_id) => {
                bytes.write_u8(table_id)?;
                write_padding_bytes(bytes, 3)?;
            }
            Instruction::WriteMetadata { metadata, mask } => {
                write_padding_bytes(bytes, 4)?;
                bytes.write_u64::<BigEndian>(metadata)?;
                bytes.write_u64::<BigEndian>(mask)?;
            }
            Instruction::WriteActions(ref actions) |
            Instruction::ApplyActions(ref actions) => {
                write_padding_bytes(bytes, 4)?;
                write_tlv_list(actions, bytes)?;
            }
            Instruction::ClearActions => write_padding_bytes(bytes, 4)?,
            Instruction::Meter(meter_id) => bytes.write_u32::<BigEndian>(meter_id)?,
            Instruction::Unknown { length, ref body, .. } => {
                let room = (length as usize).saturating_sub(TLV_HEADER_LENGTH);
                let n = body.len().min(room);
                bytes.extend_from_slice(&body[..n]);
                write_padding_bytes(bytes, room - n)?;
            }
        }
        Ok(())
    }

    fn length(&self) -> usize {
        match *self {
            Instruction::WriteMetadata { .. } => 24,
            Instruction::WriteActions(ref actions) |
            Instruction::ApplyActions(ref actions) => ACTIONS_HEADER_LENGTH + tlv_list_length(actions),
            Instruction::Unknown { length, .. } => (length as usize).max(TLV_HEADER_LENGTH),
            _ => 8,
        }
    }
}
