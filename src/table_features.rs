//! Table features: what each flow table of a switch can match on and do.
//!
//! A table's capabilities are a list of properties, each padded to 8 bytes. Instruction and
//! action capabilities are lists of element ids, which are bare element headers and decode
//! through the same TLV loop as full elements.

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::bits::{length_u16, pad8, read_fixed_size_string, skip_padding_bytes,
                  write_fixed_size_string, write_padding_bytes};
use crate::ofp_error::{OfpSerializationError, Result};
use crate::ofp_message::{DecodeContext, OfpMessage};
use crate::oxm::OxmHeader;
use crate::registry::{Registries, TypeRegistry};
use crate::tlv::{parse_tlv_list, read_remaining, read_tlv_header, tlv_list_length,
                 write_tlv_header, write_tlv_list, TlvElement, TLV_HEADER_LENGTH};

/// Fixed part of a table features body ahead of its properties.
pub const TABLE_FEATURES_HEADER_LENGTH: usize = 64;

pub const MAX_TABLE_NAME_LEN: usize = 32;

/// Property codes. The `*Miss` codes describe the table-miss flow entry.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TableFeaturePropType {
    Instructions = 0,
    InstructionsMiss = 1,
    NextTables = 2,
    NextTablesMiss = 3,
    WriteActions = 4,
    WriteActionsMiss = 5,
    ApplyActions = 6,
    ApplyActionsMiss = 7,
    Match = 8,
    Wildcards = 10,
    WriteSetField = 12,
    WriteSetFieldMiss = 13,
    ApplySetField = 14,
    ApplySetFieldMiss = 15,
}

/// The header of an instruction or action, naming a supported type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementId {
    pub typ: u16,
    pub length: u16,
    pub body: Vec<u8>,
}

impl ElementId {
    pub fn new(typ: u16) -> ElementId {
        ElementId {
            typ,
            length: TLV_HEADER_LENGTH as u16,
            body: vec![],
        }
    }
}

impl TlvElement for ElementId {
    const KIND: &'static str = "element id";

    fn registry(_: &Registries) -> Option<&TypeRegistry<ElementId>> {
        None
    }

    fn unknown(typ: u16, length: u16) -> ElementId {
        ElementId {
            typ,
            length,
            body: vec![],
        }
    }

    fn read_from(&mut self, bytes: &mut Cursor<&[u8]>, _: &DecodeContext) -> Result<()> {
        let (typ, length) = read_tlv_header(bytes)?;
        self.typ = typ;
        self.length = length;
        self.body = read_remaining(bytes)?;
        Ok(())
    }

    fn write_to(&self, bytes: &mut Vec<u8>) -> Result<()> {
        write_tlv_header(bytes, self.typ, self.length())?;
        bytes.extend_from_slice(&self.body);
        Ok(())
    }

    fn length(&self) -> usize {
        TLV_HEADER_LENGTH + self.body.len()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActionsProperty {
    Write,
    Apply,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OxmProperty {
    Match,
    Wildcards,
    WriteSetField,
    ApplySetField,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableFeatureProperty {
    Instructions { miss: bool, ids: Vec<ElementId> },
    NextTables { miss: bool, tables: Vec<u8> },
    Actions { kind: ActionsProperty, miss: bool, ids: Vec<ElementId> },
    /// Supported OXM fields, named by their headers. `Match` and `Wildcards` have no
    /// table-miss variant.
    Oxm { kind: OxmProperty, miss: bool, fields: Vec<OxmHeader> },
    Unknown { typ: u16, length: u16, body: Vec<u8> },
}

impl TableFeatureProperty {
    pub fn standard_types() -> TypeRegistry<TableFeatureProperty> {
        use self::TableFeaturePropType as T;
        use self::TableFeatureProperty as P;
        let mut registry = TypeRegistry::new(P::KIND);
        registry.register(T::Instructions as u16, || {
                P::Instructions {
                    miss: false,
                    ids: vec![],
                }
            })
            .register(T::InstructionsMiss as u16, || {
                P::Instructions {
                    miss: true,
                    ids: vec![],
                }
            })
            .register(T::NextTables as u16, || {
                P::NextTables {
                    miss: false,
                    tables: vec![],
                }
            })
            .register(T::NextTablesMiss as u16, || {
                P::NextTables {
                    miss: true,
                    tables: vec![],
                }
            })
            .register(T::WriteActions as u16, || P::actions(ActionsProperty::Write, false))
            .register(T::WriteActionsMiss as u16, || P::actions(ActionsProperty::Write, true))
            .register(T::ApplyActions as u16, || P::actions(ActionsProperty::Apply, false))
            .register(T::ApplyActionsMiss as u16, || P::actions(ActionsProperty::Apply, true))
            .register(T::Match as u16, || P::oxm(OxmProperty::Match, false))
            .register(T::Wildcards as u16, || P::oxm(OxmProperty::Wildcards, false))
            .register(T::WriteSetField as u16, || P::oxm(OxmProperty::WriteSetField, false))
            .register(T::WriteSetFieldMiss as u16,
                      || P::oxm(OxmProperty::WriteSetField, true))
            .register(T::ApplySetField as u16, || P::oxm(OxmProperty::ApplySetField, false))
            .register(T::ApplySetFieldMiss as u16,
                      || P::oxm(OxmProperty::ApplySetField, true));
        registry
    }

    fn actions(kind: ActionsProperty, miss: bool) -> TableFeatureProperty {
        TableFeatureProperty::Actions {
            kind,
            miss,
            ids: vec![],
        }
    }

    fn oxm(kind: OxmProperty, miss: bool) -> TableFeatureProperty {
        TableFeatureProperty::Oxm {
            kind,
            miss,
            fields: vec![],
        }
    }

    pub fn code(&self) -> u16 {
        use self::TableFeaturePropType as T;
        let (base, miss) = match *self {
            TableFeatureProperty::Instructions { miss, .. } => (T::Instructions, miss),
            TableFeatureProperty::NextTables { miss, .. } => (T::NextTables, miss),
            TableFeatureProperty::Actions { kind: ActionsProperty::Write, miss, .. } => {
                (T::WriteActions, miss)
            }
            TableFeatureProperty::Actions { kind: ActionsProperty::Apply, miss, .. } => {
                (T::ApplyActions, miss)
            }
            TableFeatureProperty::Oxm { kind: OxmProperty::Match, .. } => (T::Match, false),
            TableFeatureProperty::Oxm { kind: OxmProperty::Wildcards, .. } => {
                (T::Wildcards, false)
            }
            TableFeatureProperty::Oxm { kind: OxmProperty::WriteSetField, miss, .. } => {
                (T::WriteSetField, miss)
            }
            TableFeatureProperty::Oxm { kind: OxmProperty::ApplySetField, miss, .. } => {
                (T::ApplySetField, miss)
            }
            TableFeatureProperty::Unknown { typ, .. } => return typ,
        };
        base as u16 + miss as u16
    }
}

impl TlvElement for TableFeatureProperty {
    const KIND: &'static str = "table feature property";

    fn registry(registries: &Registries) -> Option<&TypeRegistry<TableFeatureProperty>> {
        Some(&registries.table_feature_properties)
    }

    fn unknown(typ: u16, length: u16) -> TableFeatureProperty {
        TableFeatureProperty::Unknown {
            typ,
            length,
            body: vec![],
        }
    }

    fn read_from(&mut self, bytes: &mut Cursor<&[u8]>, ctx: &DecodeContext) -> Result<()> {
        let (_, declared) = read_tlv_header(bytes)?;
        let payload = (declared as usize).saturating_sub(TLV_HEADER_LENGTH);
        match *self {
            TableFeatureProperty::Instructions { ref mut ids, .. } |
            TableFeatureProperty::Actions { ref mut ids, .. } => {
                *ids = parse_tlv_list(bytes, payload, ctx)?;
            }
            TableFeatureProperty::NextTables { ref mut tables, .. } => {
                *tables = read_remaining(bytes)?;
            }
            TableFeatureProperty::Oxm { ref mut fields, .. } => {
                *fields = (0..payload / 4)
                    .map(|_| bytes.read_u32::<BigEndian>().map(OxmHeader::of_int))
                    .collect::<std::io::Result<Vec<OxmHeader>>>()?;
            }
            TableFeatureProperty::Unknown { ref mut length, ref mut body, .. } => {
                *length = declared;
                *body = read_remaining(bytes)?;
            }
        }
        Ok(())
    }

    fn write_to(&self, bytes: &mut Vec<u8>) -> Result<()> {
        write_tlv_header(bytes, self.code(), self.length())?;
        match *self {
            TableFeatureProperty::Instructions { ref ids, .. } |
            TableFeatureProperty::Actions { ref ids, .. } => write_tlv_list(ids, bytes)?,
            TableFeatureProperty::NextTables { ref tables, .. } => bytes.extend_from_slice(tables),
            TableFeatureProperty::Oxm { ref fields, .. } => {
                for field in fields {
                    bytes.write_u32::<BigEndian>(OxmHeader::to_int(*field))?;
                }
            }
            TableFeatureProperty::Unknown { ref body, .. } => bytes.extend_from_slice(body),
        }
        Ok(())
    }

    fn length(&self) -> usize {
        TLV_HEADER_LENGTH +
        match *self {
            TableFeatureProperty::Instructions { ref ids, .. } |
            TableFeatureProperty::Actions { ref ids, .. } => tlv_list_length(ids),
            TableFeatureProperty::NextTables { ref tables, .. } => tables.len(),
            TableFeatureProperty::Oxm { ref fields, .. } => 4 * fields.len(),
            TableFeatureProperty::Unknown { ref body, .. } => body.len(),
        }
    }

    fn padded_length(declared: usize) -> usize {
        pad8(declared)
    }
}

/// Features of one flow table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableFeatures {
    pub table_id: u8,
    pub name: String,
    pub metadata_match: u64,
    pub metadata_write: u64,
    pub config: u32,
    pub max_entries: u32,
    pub properties: Vec<TableFeatureProperty>,
}

impl OfpMessage for TableFeatures {
    fn size_of(tf: &TableFeatures) -> usize {
        TABLE_FEATURES_HEADER_LENGTH + tlv_list_length(&tf.properties)
    }

    fn parse(bytes: &mut Cursor<&[u8]>, ctx: &DecodeContext) -> Result<TableFeatures> {
        let length = bytes.read_u16::<BigEndian>()? as usize;
        if length < TABLE_FEATURES_HEADER_LENGTH {
            return Err(OfpSerializationError::MalformedHeader {
                kind: "table features",
                reason: format!("length {} is shorter than the fixed part", length),
            });
        }
        let table_id = bytes.read_u8()?;
        skip_padding_bytes(bytes, 5)?;
        let pos = bytes.position() as usize;
        let raw_name = bytes.get_ref()
            .get(pos..pos + MAX_TABLE_NAME_LEN)
            .ok_or_else(|| OfpSerializationError::TruncatedInput("table name".to_string()))?;
        let name = read_fixed_size_string(raw_name);
        bytes.set_position((pos + MAX_TABLE_NAME_LEN) as u64);
        let metadata_match = bytes.read_u64::<BigEndian>()?;
        let metadata_write = bytes.read_u64::<BigEndian>()?;
        let config = bytes.read_u32::<BigEndian>()?;
        let max_entries = bytes.read_u32::<BigEndian>()?;
        let properties = parse_tlv_list(bytes, length - TABLE_FEATURES_HEADER_LENGTH, ctx)?;
        Ok(TableFeatures {
            table_id,
            name,
            metadata_match,
            metadata_write,
            config,
            max_entries,
            properties,
        })
    }

    fn marshal(tf: &TableFeatures, bytes: &mut Vec<u8>) -> Result<()> {
        let length = length_u16("table features", TableFeatures::size_of(tf))?;
        bytes.write_u16::<BigEndian>(length)?;
        bytes.write_u8(tf.table_id)?;
        write_padding_bytes(bytes, 5)?;
        write_fixed_size_string(bytes, &tf.name, MAX_TABLE_NAME_LEN)?;
        bytes.write_u64::<BigEndian>(tf.metadata_match)?;
        bytes.write_u64::<BigEndian>(tf.metadata_write)?;
        bytes.write_u32::<BigEndian>(tf.config)?;
        bytes.write_u32::<BigEndian>(tf.max_entries)?;
        write_tlv_list(&tf.properties, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionType;
    use crate::instruction::InstructionType;
    use crate::oxm::OxmFieldType;

    fn features() -> TableFeatures {
        TableFeatures {
            table_id: 0,
            name: "classifier".to_string(),
            metadata_match: u64::MAX,
            metadata_write: u64::MAX,
            config: 0,
            max_entries: 1 << 20,
            properties: vec![
                TableFeatureProperty::Instructions {
                    miss: false,
                    ids: vec![ElementId::new(InstructionType::GotoTable as u16),
                              ElementId::new(InstructionType::ApplyActions as u16)],
                },
                TableFeatureProperty::NextTables {
                    miss: true,
                    tables: vec![1, 2, 3],
                },
                TableFeatureProperty::Actions {
                    kind: ActionsProperty::Apply,
                    miss: false,
                    ids: vec![ElementId::new(ActionType::Output as u16)],
                },
                TableFeatureProperty::Oxm {
                    kind: OxmProperty::Match,
                    miss: false,
                    fields: vec![OxmHeader::of_descriptor(&OxmFieldType::EthType.descriptor(),
                                                          false),
                                 OxmHeader::of_descriptor(&OxmFieldType::Ipv4Dst.descriptor(),
                                                          true)],
                },
            ],
        }
    }

    #[test]
    fn table_features_round_trip() {
        let tf = features();
        let bytes = TableFeatures::encode(&tf).unwrap();
        // Properties: 4+8 -> 16, 4+3 -> 8, 4+4 -> 8, 4+8 -> 16.
        assert_eq!(bytes.len(), 64 + 16 + 8 + 8 + 16);
        assert_eq!(&bytes[..2], &[0, 112]);
        let (decoded, consumed) = TableFeatures::decode(&bytes, &DecodeContext::default()).unwrap();
        assert_eq!(decoded, tf);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn output_action_id_is_only_a_header() {
        // A full output action needs 16 bytes; as an id it is 4 and must not be read as one.
        let prop = [0, 6, 0, 8, 0, 0, 0, 4];
        let decoded: Vec<TableFeatureProperty> = parse_tlv_list(&mut Cursor::new(&prop[..]),
                                                                8,
                                                                &DecodeContext::default())
            .unwrap();
        assert_eq!(decoded,
                   vec![TableFeatureProperty::Actions {
                            kind: ActionsProperty::Apply,
                            miss: false,
                            ids: vec![ElementId::new(0)],
                        }]);
    }

    #[test]
    fn miss_variants_use_the_odd_codes() {
        let prop = TableFeatureProperty::Oxm {
            kind: OxmProperty::ApplySetField,
            miss: true,
            fields: vec![],
        };
        assert_eq!(prop.code(), 15);
        assert_eq!(TableFeatureProperty::Oxm {
                           kind: OxmProperty::Wildcards,
                           miss: false,
                           fields: vec![],
                       }
                       .code(),
                   10);
    }

    #[test]
    fn experimenter_properties_are_generic() {
        let prop = [0xff, 0xff, 0, 12, 0, 0, 0x23, 0x20, 0, 0, 0, 1, 0, 0, 0, 0];
        let decoded: Vec<TableFeatureProperty> = parse_tlv_list(&mut Cursor::new(&prop[..]),
                                                                16,
                                                                &DecodeContext::default())
            .unwrap();
        assert_eq!(decoded,
                   vec![TableFeatureProperty::Unknown {
                            typ: 0xffff,
                            length: 12,
                            body: vec![0, 0, 0x23, 0x20, 0, 0, 0, 1],
                        }]);
    }
}
