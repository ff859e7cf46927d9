use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use crate::bits::{pad8, skip_padding_bytes, write_padding_bytes};
use crate::ofp_error::{OfpSerializationError, Result};
use crate::ofp_message::{DecodeContext, OfpMessage, UnknownFieldPolicy};
use crate::oxm::{check_field_context, FieldContext, OxmField, OxmHeader};
use crate::registry::{Registries, TypeRegistry};
use crate::tlv::{read_remaining, read_tlv_header, write_tlv_header, TlvElement,
                 TLV_HEADER_LENGTH};

/// OpenFlow 1.3 action type codes.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActionType {
    Output = 0,
    CopyTtlOut = 11,
    CopyTtlIn = 12,
    SetMplsTtl = 15,
    DecMplsTtl = 16,
    PushVlan = 17,
    PopVlan = 18,
    PushMpls = 19,
    PopMpls = 20,
    SetQueue = 21,
    Group = 22,
    SetNwTtl = 23,
    DecNwTtl = 24,
    SetField = 25,
    PushPbb = 26,
    PopPbb = 27,
}

/// Port number meaning "send to the controller".
pub const OFPP_CONTROLLER: u32 = 0xffff_fffd;

/// `max_len` asking the switch to send the whole packet to the controller.
pub const OFPCML_NO_BUFFER: u16 = 0xffff;

/// A set-field action: rewrite one header field with the value of an OXM field.
///
/// An action whose field is not in the catalog keeps its body verbatim in `raw`, so that
/// re-encoding reproduces it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SetField {
    field: Option<OxmField>,
    raw: Vec<u8>,
}

impl SetField {
    /// Fails with `DisallowedFieldForContext` for pipeline fields.
    pub fn new(field: OxmField) -> Result<SetField> {
        check_field_context(field.descriptor(), FieldContext::SetField)?;
        Ok(SetField {
            field: Some(field),
            raw: vec![],
        })
    }

    /// The field to write. Empty only for an action decoded around an unknown field.
    pub fn field(&self) -> Option<&OxmField> {
        self.field.as_ref()
    }

    /// The undecoded body of an action carrying an unknown field, padding included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    fn length(&self) -> usize {
        match self.field {
            Some(ref field) => pad8(TLV_HEADER_LENGTH + OxmField::size_of(field)),
            None => TLV_HEADER_LENGTH + self.raw.len(),
        }
    }

    fn read_from(&mut self, bytes: &mut Cursor<&[u8]>, ctx: &DecodeContext) -> Result<()> {
        let start = bytes.position();
        let header = OxmHeader::peek(bytes)?;
        match OxmField::read(bytes, &ctx.registries.fields) {
            Ok(field) => {
                self.field = Some(field);
                self.raw.clear();
            }
            Err(OfpSerializationError::UnknownFieldType { .. })
                if ctx.unknown_fields == UnknownFieldPolicy::Skip => {
                debug!(class = header.class,
                       field = header.field,
                       "set-field action carries an unknown OXM field");
                bytes.set_position(start);
                self.field = None;
                self.raw = read_remaining(bytes)?;
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }

    fn write_to(&self, bytes: &mut Vec<u8>) -> Result<()> {
        match self.field {
            Some(ref field) => OxmField::marshal(field, bytes),
            None => {
                bytes.extend_from_slice(&self.raw);
                Ok(())
            }
        }
    }
}

/// Actions associated with flows and packets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Output { port: u32, max_len: u16 },
    CopyTtlOut,
    CopyTtlIn,
    SetMplsTtl(u8),
    DecMplsTtl,
    PushVlan(u16),
    PopVlan,
    PushMpls(u16),
    PopMpls(u16),
    SetQueue(u32),
    Group(u32),
    SetNwTtl(u8),
    DecNwTtl,
    SetField(SetField),
    PushPbb(u16),
    PopPbb,
    Unknown { typ: u16, length: u16, body: Vec<u8> },
}

impl Action {
    /// Every action type this crate decodes.
    pub fn standard_types() -> TypeRegistry<Action> {
        let mut registry = TypeRegistry::new(Action::KIND);
        registry.register(ActionType::Output as u16, || {
                Action::Output {
                    port: 0,
                    max_len: 0,
                }
            })
            .register(ActionType::CopyTtlOut as u16, || Action::CopyTtlOut)
            .register(ActionType::CopyTtlIn as u16, || Action::CopyTtlIn)
            .register(ActionType::SetMplsTtl as u16, || Action::SetMplsTtl(0))
            .register(ActionType::DecMplsTtl as u16, || Action::DecMplsTtl)
            .register(ActionType::PushVlan as u16, || Action::PushVlan(0))
            .register(ActionType::PopVlan as u16, || Action::PopVlan)
            .register(ActionType::PushMpls as u16, || Action::PushMpls(0))
            .register(ActionType::PopMpls as u16, || Action::PopMpls(0))
            .register(ActionType::SetQueue as u16, || Action::SetQueue(0))
            .register(ActionType::Group as u16, || Action::Group(0))
            .register(ActionType::SetNwTtl as u16, || Action::SetNwTtl(0))
            .register(ActionType::DecNwTtl as u16, || Action::DecNwTtl)
            .register(ActionType::SetField as u16, || Action::SetField(SetField::default()))
            .register(ActionType::PushPbb as u16, || Action::PushPbb(0))
            .register(ActionType::PopPbb as u16, || Action::PopPbb);
        registry
    }

    /// A set-field action, validated against the fields a switch may rewrite.
    pub fn set_field(field: OxmField) -> Result<Action> {
        SetField::new(field).map(Action::SetField)
    }

    pub fn to_controller(max_len: u16) -> Action {
        Action::Output {
            port: OFPP_CONTROLLER,
            max_len,
        }
    }

    /// Wire type code of the action.
    pub fn code(&self) -> u16 {
        match *self {
            Action::Output { .. } => ActionType::Output as u16,
            Action::CopyTtlOut => ActionType::CopyTtlOut as u16,
            Action::CopyTtlIn => ActionType::CopyTtlIn as u16,
            Action::SetMplsTtl(_) => ActionType::SetMplsTtl as u16,
            Action::DecMplsTtl => ActionType::DecMplsTtl as u16,
            Action::PushVlan(_) => ActionType::PushVlan as u16,
            Action::PopVlan => ActionType::PopVlan as u16,
            Action::PushMpls(_) => ActionType::PushMpls as u16,
            Action::PopMpls(_) => ActionType::PopMpls as u16,
            Action::SetQueue(_) => ActionType::SetQueue as u16,
            Action::Group(_) => ActionType::Group as u16,
            Action::SetNwTtl(_) => ActionType::SetNwTtl as u16,
            Action::DecNwTtl => ActionType::DecNwTtl as u16,
            Action::SetField(_) => ActionType::SetField as u16,
            Action::PushPbb(_) => ActionType::PushPbb as u16,
            Action::PopPbb => ActionType::PopPbb as u16,
            Action::Unknown { typ, .. } => typ,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(*self, Action::Unknown { .. })
    }
}

impl TlvElement for Action {
    const KIND: &'static str = "action";

    fn registry(registries: &Registries) -> Option<&TypeRegistry<Action>> {
        Some(&registries.actions)
    }

    fn unknown(typ: u16, length: u16) -> Action {
        Action::Unknown {
            typ,
            length,
            body: vec![],
        }
    }

    fn read_from(&mut self, bytes: &mut Cursor<&[u8]>, ctx: &DecodeContext) -> Result<()> {
        let (_, declared) = read_tlv_header(bytes)?;
        match *self {
            Action::Output { ref mut port, ref mut max_len } => {
                *port = bytes.read_u32::<BigEndian>()?;
                *max_len = bytes.read_u16::<BigEndian>()?;
                skip_padding_bytes(bytes, 6)?;
            }
            Action::SetMplsTtl(ref mut ttl) |
            Action::SetNwTtl(ref mut ttl) => {
                *ttl = bytes.read_u8()?;
                skip_padding_bytes(bytes, 3)?;
            }
            Action::PushVlan(ref mut ethertype) |
            Action::PushMpls(ref mut ethertype) |
            Action::PopMpls(ref mut ethertype) |
            Action::PushPbb(ref mut ethertype) => {
                *ethertype = bytes.read_u16::<BigEndian>()?;
                skip_padding_bytes(bytes, 2)?;
            }
            Action::SetQueue(ref mut id) |
            Action::Group(ref mut id) => *id = bytes.read_u32::<BigEndian>()?,
            Action::SetField(ref mut set_field) => set_field.read_from(bytes, ctx)?,
            Action::CopyTtlOut |
            Action::CopyTtlIn |
            Action::DecMplsTtl |
            Action::PopVlan |
            Action::DecNwTtl |
            Action::PopPbb => skip_padding_bytes(bytes, 4)?,
            Action::Unknown { ref mut length, ref mut body, .. } => {
                *length = declared;
                *body = read_remaining(bytes)?;
            }
        }
        Ok(())
    }

    fn write_to(&self, bytes: &mut Vec<u8>) -> Result<()> {
        write_tlv_header(bytes, self.code(), self.length())?;
        match *self {
            Action::Output { port, max_len } => {
                bytes.write_u32::<BigEndian>(port)?;
                bytes.write_u16::<BigEndian>(max_len)?;
                write_padding_bytes(bytes, 6)?;
            }
            Action::SetMplsTtl(ttl) |
            Action::SetNwTtl(ttl) => {
                bytes.write_u8(ttl)?;
                write_padding_bytes(bytes, 3)?;
            }
            Action::PushVlan(ethertype) |
            Action::PushMpls(ethertype) |
            Action::PopMpls(ethertype) |
            Action::PushPbb(ethertype) => {
                bytes.write_u16::<BigEndian>(ethertype)?;
                write_padding_bytes(bytes, 2)?;
            }
            Action::SetQueue(id) |
            Action::Group(id) => bytes.write_u32::<BigEndian>(id)?,
            Action::SetField(ref set_field) => {
                let start = bytes.len() - TLV_HEADER_LENGTH;
                set_field.write_to(bytes)?;
                let written = bytes.len() - start;
                write_padding_bytes(bytes, set_field.length() - written)?;
            }
            Action::CopyTtlOut |
            Action::CopyTtlIn |
            Action::DecMplsTtl |
            Action::PopVlan |
            Action::DecNwTtl |
            Action::PopPbb => write_padding_bytes(bytes, 4)?,
            Action::Unknown { length, ref body, .. } => {
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
            Action::Output { .. } => 16,
            Action::SetField(ref set_field) => set_field.length(),
            Action::Unknown { length, .. } => (length as usize).max(TLV_HEADER_LENGTH),
            _ => 8,
        }
    }
}
