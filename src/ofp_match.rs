//! The match structure of flow entries, stats requests, and packet-ins.
//!
//! The OpenFlow 1.3 wire form is a 4-byte `type, length` header followed by OXM fields and
//! zero padding to an 8-byte boundary. `length` counts the header and fields but never the
//! padding. Standard (OpenFlow 1.1) matches are accepted on decode and converted into the
//! equivalent OXM fields.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use crate::bits::{pad8, pad_len, write_padding_bytes};
use crate::ofp_error::{OfpSerializationError, Result};
use crate::ofp_message::{DecodeContext, OfpMessage, UnknownFieldPolicy};
use crate::oxm::{OxmField, OxmFieldType, OxmHeader, OxmValue, OXM_HEADER_LENGTH};

/// Size of the `type, length` header of a match.
pub const MATCH_HEADER_LENGTH: usize = 4;

/// Size of an OpenFlow 1.1 standard match, header included.
pub const STANDARD_MATCH_LENGTH: usize = 88;

pub const ETH_TYPE_IPV4: u16 = 0x0800;
pub const ETH_TYPE_ARP: u16 = 0x0806;
pub const ETH_TYPE_VLAN: u16 = 0x8100;

pub const IP_PROTO_ICMP: u8 = 1;
pub const IP_PROTO_TCP: u8 = 6;
pub const IP_PROTO_UDP: u8 = 17;
pub const IP_PROTO_SCTP: u8 = 132;

/// Wildcard bits of the standard match. A set bit means the field is not matched on.
pub mod wildcards {
    pub const IN_PORT: u32 = 1 << 0;
    pub const DL_VLAN: u32 = 1 << 1;
    pub const DL_VLAN_PCP: u32 = 1 << 2;
    pub const DL_TYPE: u32 = 1 << 3;
    pub const NW_TOS: u32 = 1 << 4;
    pub const NW_PROTO: u32 = 1 << 5;
    pub const TP_SRC: u32 = 1 << 6;
    pub const TP_DST: u32 = 1 << 7;
    pub const MPLS_LABEL: u32 = 1 << 8;
    pub const MPLS_TC: u32 = 1 << 9;
    pub const ALL: u32 = (1 << 10) - 1;

    /// Whether the field guarded by `flag` is present.
    pub fn is_exact(wildcards: u32, flag: u32) -> bool {
        wildcards & flag == 0
    }
}

#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatchType {
    Standard = 0,
    Oxm = 1,
}

impl MatchType {
    fn of_int(code: u16) -> Option<MatchType> {
        match code {
            0 => Some(MatchType::Standard),
            1 => Some(MatchType::Oxm),
            _ => None,
        }
    }
}

/// An ordered set of OXM fields holding at most one field per type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    typ: MatchType,
    length: u16,
    fields: Vec<OxmField>,
}

impl Default for Match {
    fn default() -> Match {
        Match::match_all()
    }
}

impl Match {
    /// The empty match, which matches every packet.
    pub fn match_all() -> Match {
        Match {
            typ: MatchType::Oxm,
            length: MATCH_HEADER_LENGTH as u16,
            fields: vec![],
        }
    }

    pub fn typ(&self) -> MatchType {
        self.typ
    }

    /// Declared length: the header plus every field, without trailing padding.
    pub fn length(&self) -> usize {
        self.length as usize
    }

    pub fn fields(&self) -> &[OxmField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Insert `field`, replacing the value and mask of a field of the same type if present.
    pub fn set(&mut self, field: OxmField) -> &mut Match {
        match self.fields.iter_mut().find(|f| f.same_type(field.descriptor())) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self.recompute_length();
        self
    }

    /// Set an exact-match field. Any mask of a previous field of this type is dropped.
    pub fn set_field<V>(&mut self, typ: OxmFieldType, value: V) -> Result<&mut Match>
        where V: Into<OxmValue>
    {
        let field = OxmField::new(typ, value)?;
        Ok(self.set(field))
    }

    /// Set a masked field.
    pub fn set_masked_field<V, M>(&mut self,
                                  typ: OxmFieldType,
                                  value: V,
                                  mask: M)
                                  -> Result<&mut Match>
        where V: Into<OxmValue>,
              M: Into<OxmValue>
    {
        let field = OxmField::masked(typ, value, mask)?;
        Ok(self.set(field))
    }

    pub fn get(&self, typ: OxmFieldType) -> Option<&OxmField> {
        self.fields.iter().find(|f| f.is(typ))
    }

    pub fn get_field(&self, typ: OxmFieldType) -> Option<&OxmValue> {
        self.get(typ).map(|f| f.value())
    }

    fn recompute_length(&mut self) {
        let fields: usize = self.fields.iter().map(OxmField::size_of).sum();
        self.length = (MATCH_HEADER_LENGTH + fields) as u16;
    }

    fn parse_oxm_fields(bytes: &mut Cursor<&[u8]>,
                        start: usize,
                        length: usize,
                        ctx: &DecodeContext)
                        -> Result<Match> {
        let buf_len = bytes.get_ref().len();
        let end = (start + length).min(buf_len);
        let mut m = Match::match_all();
        while bytes.position() as usize + OXM_HEADER_LENGTH <= end {
            let pos = bytes.position() as usize;
            let header = OxmHeader::peek(bytes)?;
            match ctx.registries.fields.lookup(header.class, header.field) {
                Ok(descriptor) => {
                    let copies = if header.has_mask { 2 } else { 1 };
                    if pos + OXM_HEADER_LENGTH + descriptor.payload_length() * copies > end {
                        break;
                    }
                    m.set(OxmField::read(bytes, &ctx.registries.fields)?);
                }
                Err(err) => {
                    if ctx.unknown_fields == UnknownFieldPolicy::Reject {
                        return Err(err);
                    }
                    let skip = header.wire_length();
                    if pos + skip > end {
                        break;
                    }
                    debug!(class = header.class, field = header.field, "skipping unknown OXM field");
                    bytes.set_position((pos + skip) as u64);
                }
            }
        }
        bytes.set_position((start + pad8(length)).min(buf_len) as u64);
        Ok(m)
    }

    /// Convert a standard match into OXM fields. Every wire field is consumed, present or not.
    fn parse_standard(bytes: &mut Cursor<&[u8]>, start: usize, length: usize) -> Result<Match> {
        let end = (start + length).min(bytes.get_ref().len()) as u64;
        let mut m = Match::match_all();

        let in_port = bytes.read_u32::<BigEndian>()?;
        let w = bytes.read_u32::<BigEndian>()?;
        if wildcards::is_exact(w, wildcards::IN_PORT) {
            m.set_field(OxmFieldType::InPort, in_port)?;
        }

        for typ in [OxmFieldType::EthSrc, OxmFieldType::EthDst].iter() {
            let mut addr = [0u8; 6];
            let mut mask = [0u8; 6];
            bytes.read_exact(&mut addr)?;
            bytes.read_exact(&mut mask)?;
            m.set(standard_field(*typ, addr, mask)?);
        }

        let vlan = bytes.read_u16::<BigEndian>()?;
        if wildcards::is_exact(w, wildcards::DL_VLAN) {
            m.set_field(OxmFieldType::VlanVid, vlan)?;
        }
        let pcp = bytes.read_u8()?;
        if wildcards::is_exact(w, wildcards::DL_VLAN_PCP) {
            m.set_field(OxmFieldType::VlanPcp, pcp)?;
        }
        bytes.read_u8()?;

        let dl_type = bytes.read_u16::<BigEndian>()?;
        let dl_type = if wildcards::is_exact(w, wildcards::DL_TYPE) {
            m.set_field(OxmFieldType::EthType, dl_type)?;
            dl_type
        } else {
            0
        };
        if dl_type != ETH_TYPE_IPV4 && dl_type != ETH_TYPE_ARP && dl_type != ETH_TYPE_VLAN {
            bytes.set_position(end);
            return Ok(m);
        }

        let tos = bytes.read_u8()?;
        if wildcards::is_exact(w, wildcards::NW_TOS) {
            m.set_field(OxmFieldType::IpDscp, tos)?;
        }
        let proto = bytes.read_u8()?;
        let proto = if wildcards::is_exact(w, wildcards::NW_PROTO) {
            m.set_field(OxmFieldType::IpProto, proto)?;
            proto
        } else {
            0
        };

        for typ in [OxmFieldType::Ipv4Src, OxmFieldType::Ipv4Dst].iter() {
            let addr = bytes.read_u32::<BigEndian>()?;
            let mask = bytes.read_u32::<BigEndian>()?;
            if addr != 0 {
                m.set(standard_field(*typ, addr, mask)?);
            }
        }

        if proto != IP_PROTO_TCP && proto != IP_PROTO_UDP && proto != IP_PROTO_SCTP {
            bytes.set_position(end);
            return Ok(m);
        }

        // Ports are demultiplexed by the protocol read above, not by their own identity.
        let tp_src = bytes.read_u16::<BigEndian>()?;
        if wildcards::is_exact(w, wildcards::TP_SRC) {
            m.set_field(transport_field(proto, true), tp_src)?;
        }
        let tp_dst = bytes.read_u16::<BigEndian>()?;
        if wildcards::is_exact(w, wildcards::TP_DST) {
            m.set_field(transport_field(proto, false), tp_dst)?;
        }

        let label = bytes.read_u32::<BigEndian>()?;
        if wildcards::is_exact(w, wildcards::MPLS_LABEL) {
            m.set_field(OxmFieldType::MplsLabel, label)?;
        }
        let tc = bytes.read_u8()?;
        if wildcards::is_exact(w, wildcards::MPLS_TC) {
            m.set_field(OxmFieldType::MplsTc, tc)?;
        }
        let mut pad = [0u8; 3];
        bytes.read_exact(&mut pad)?;

        let metadata = bytes.read_u64::<BigEndian>()?;
        let metadata_mask = bytes.read_u64::<BigEndian>()?;
        m.set(standard_field(OxmFieldType::Metadata, metadata, metadata_mask)?);

        bytes.set_position(end);
        Ok(m)
    }
}

/// Build a field from a standard-match value and mask pair.
///
/// The mask is attached only when it is all zero bits. Standard-match masks mark wildcarded
/// bits with ones, so this keeps the mask exactly when it constrains nothing.
fn standard_field<V: Into<OxmValue>>(typ: OxmFieldType, value: V, mask: V) -> Result<OxmField> {
    let mask = mask.into();
    if mask.is_all_zero() {
        OxmField::masked(typ, value, mask)
    } else {
        OxmField::new(typ, value)
    }
}

fn transport_field(proto: u8, source: bool) -> OxmFieldType {
    match (proto, source) {
        (IP_PROTO_UDP, true) => OxmFieldType::UdpSrc,
        (IP_PROTO_UDP, false) => OxmFieldType::UdpDst,
        (IP_PROTO_SCTP, true) => OxmFieldType::SctpSrc,
        (IP_PROTO_SCTP, false) => OxmFieldType::SctpDst,
        (_, true) => OxmFieldType::TcpSrc,
        (_, false) => OxmFieldType::TcpDst,
    }
}

impl OfpMessage for Match {
    fn size_of(m: &Match) -> usize {
        pad8(m.length())
    }

    fn parse(bytes: &mut Cursor<&[u8]>, ctx: &DecodeContext) -> Result<Match> {
        let start = bytes.position() as usize;
        let typ = bytes.read_u16::<BigEndian>()?;
        let length = bytes.read_u16::<BigEndian>()? as usize;
        if length < MATCH_HEADER_LENGTH {
            return Err(OfpSerializationError::MalformedHeader {
                kind: "match",
                reason: format!("length {} is shorter than the match header", length),
            });
        }
        match MatchType::of_int(typ) {
            Some(MatchType::Oxm) => Match::parse_oxm_fields(bytes, start, length, ctx),
            Some(MatchType::Standard) if length < STANDARD_MATCH_LENGTH => {
                Err(OfpSerializationError::MalformedHeader {
                    kind: "match",
                    reason: format!("standard match length {} is shorter than {}",
                                    length,
                                    STANDARD_MATCH_LENGTH),
                })
            }
            Some(MatchType::Standard) => Match::parse_standard(bytes, start, length),
            None => {
                Err(OfpSerializationError::MalformedHeader {
                    kind: "match",
                    reason: format!("unknown match type {}", typ),
                })
            }
        }
    }

    fn marshal(m: &Match, bytes: &mut Vec<u8>) -> Result<()> {
        bytes.write_u16::<BigEndian>(m.typ as u16)?;
        bytes.write_u16::<BigEndian>(m.length)?;
        for field in m.fields.iter() {
            OxmField::marshal(field, bytes)?;
        }
        write_padding_bytes(bytes, pad_len(m.length()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    use crate::oxm::{FieldCatalog, FieldDescriptor, OxmClass};
    use crate::registry::Registries;

    fn scenario_match() -> Match {
        let mut m = Match::match_all();
        m.set_field(OxmFieldType::EthType, ETH_TYPE_IPV4).unwrap();
        m.set_masked_field(OxmFieldType::Ipv4Dst,
                              Ipv4Addr::new(10, 0, 0, 1),
                              Ipv4Addr::new(255, 255, 255, 0))
            .unwrap();
        m
    }

    #[test]
    fn masked_ipv4_destination_round_trips() {
        let m = scenario_match();
        assert_eq!(m.length(), 22);
        let bytes = Match::encode(&m).unwrap();
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[..4], &[0, 1, 0, 22]);
        assert_eq!(&bytes[22..], &[0, 0]);

        let (decoded, consumed) = Match::decode(&bytes, &DecodeContext::default()).unwrap();
        assert_eq!(consumed, 24);
        assert_eq!(decoded.fields().len(), 2);
        let dst = decoded.get(OxmFieldType::Ipv4Dst).unwrap();
        assert!(dst.has_mask());
        let mut mask = vec![];
        OxmField::marshal(dst, &mut mask).unwrap();
        assert_eq!(&mask[8..], &[255, 255, 255, 0]);
        assert_eq!(decoded, m);
    }

    #[test]
    fn setting_a_type_twice_keeps_one_field() {
        let mut m = Match::match_all();
        m.set_field(OxmFieldType::TcpDst, 80u16).unwrap();
        m.set_field(OxmFieldType::IpProto, IP_PROTO_TCP).unwrap();
        m.set_field(OxmFieldType::TcpDst, 443u16).unwrap();
        assert_eq!(m.fields().len(), 2);
        assert_eq!(m.fields()[0].value(), &OxmValue::U16(443));
        assert_eq!(m.get_field(OxmFieldType::TcpDst), Some(&OxmValue::U16(443)));
        assert_eq!(m.length(), 4 + 6 + 5);
    }

    #[test]
    fn replacing_a_field_swaps_its_mask_wholesale() {
        let mut m = scenario_match();
        m.set_field(OxmFieldType::Ipv4Dst, Ipv4Addr::new(10, 0, 0, 2)).unwrap();
        assert!(!m.get(OxmFieldType::Ipv4Dst).unwrap().has_mask());
        assert_eq!(m.length(), 4 + 6 + 8);

        m.set_masked_field(OxmFieldType::Ipv4Dst, 0u32, 0u32).unwrap();
        assert!(m.get(OxmFieldType::Ipv4Dst).unwrap().has_mask());
        assert_eq!(m.length(), 22);
    }

    #[test]
    fn declared_length_excludes_padding() {
        let mut m = Match::match_all();
        assert_eq!(Match::encode(&m).unwrap(), vec![0, 1, 0, 4, 0, 0, 0, 0]);
        m.set_field(OxmFieldType::InPort, 1u32).unwrap();
        m.set_field(OxmFieldType::EthSrc, [0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(m.length(), 4 + 8 + 10);
        assert_eq!(Match::encode(&m).unwrap().len(), 24);
        assert_eq!(Match::size_of(&m), 24);
    }

    #[test]
    fn truncated_buffer_is_clamped() {
        let bytes = Match::encode(&scenario_match()).unwrap();
        // Cut inside the IPV4_DST field: only ETH_TYPE survives.
        let (decoded, consumed) = Match::decode(&bytes[..14], &DecodeContext::default()).unwrap();
        assert_eq!(decoded.fields().len(), 1);
        assert_eq!(decoded.get_field(OxmFieldType::EthType), Some(&OxmValue::U16(0x0800)));
        assert_eq!(consumed, 14);
    }

    #[test]
    fn sibling_after_match_stays_aligned() {
        let mut bytes = Match::encode(&scenario_match()).unwrap();
        bytes.extend_from_slice(&[0xde, 0xad]);
        let mut cursor = Cursor::new(&bytes[..]);
        Match::parse(&mut cursor, &DecodeContext::default()).unwrap();
        assert_eq!(cursor.read_u16::<BigEndian>().unwrap(), 0xdead);
    }

    fn with_unknown_field() -> Vec<u8> {
        // ETH_TYPE, then an experimenter field of 2 bytes, then IP_PROTO.
        vec![0, 1, 0, 21,
             0x80, 0x00, 0x0a, 0x02, 0x08, 0x00,
             0xff, 0xff, 0x0e, 0x02, 0xaa, 0xbb,
             0x80, 0x00, 0x14, 0x01, 0x06,
             0, 0, 0]
    }

    #[test]
    fn unknown_fields_are_skipped_by_declared_length() {
        let bytes = with_unknown_field();
        let (decoded, consumed) = Match::decode(&bytes, &DecodeContext::default()).unwrap();
        assert_eq!(consumed, 24);
        assert_eq!(decoded.fields().len(), 2);
        assert_eq!(decoded.get_field(OxmFieldType::IpProto), Some(&OxmValue::U8(6)));
    }

    #[test]
    fn unknown_fields_can_be_rejected() {
        let bytes = with_unknown_field();
        let ctx = DecodeContext::default().with_unknown_fields(UnknownFieldPolicy::Reject);
        match Match::decode(&bytes, &ctx) {
            Err(OfpSerializationError::UnknownFieldType { class: 0xffff, field: 7 }) => {}
            other => panic!("expected an unknown field, got {:?}", other),
        }
    }

    #[test]
    fn custom_catalog_decodes_experimenter_fields() {
        let mut registries = Registries::openflow13();
        registries.fields.register(FieldDescriptor::new("EXP_TAG", OxmClass::Experimenter as u16, 7, 2, false));
        let bytes = with_unknown_field();
        let (decoded, _) = Match::decode(&bytes, &DecodeContext::new(&registries)).unwrap();
        assert_eq!(decoded.fields().len(), 3);
        assert_eq!(decoded.fields()[1].value(), &OxmValue::U16(0xaabb));
        assert_eq!(FieldCatalog::openflow_basic().len() + 1, registries.fields.len());
    }

    #[test]
    fn short_declared_length_is_malformed() {
        let bytes = [0, 1, 0, 2, 0, 0, 0, 0];
        match Match::decode(&bytes, &DecodeContext::default()) {
            Err(OfpSerializationError::MalformedHeader { kind: "match", .. }) => {}
            other => panic!("expected a malformed header, got {:?}", other),
        }
    }

    struct Standard {
        wildcards: u32,
        dl_type: u16,
        nw_proto: u8,
        nw_src: u32,
        nw_dst: u32,
        tp_src: u16,
        tp_dst: u16,
        metadata_mask: u64,
    }

    impl Standard {
        fn encode(&self) -> Vec<u8> {
            let mut b = vec![];
            b.write_u16::<BigEndian>(0).unwrap();
            b.write_u16::<BigEndian>(STANDARD_MATCH_LENGTH as u16).unwrap();
            b.write_u32::<BigEndian>(3).unwrap();
            b.write_u32::<BigEndian>(self.wildcards).unwrap();
            b.extend_from_slice(&[0, 0, 0, 0, 0, 1]);
            b.extend_from_slice(&[0xff; 6]);
            b.extend_from_slice(&[0, 0, 0, 0, 0, 2]);
            b.extend_from_slice(&[0; 6]);
            b.write_u16::<BigEndian>(10).unwrap();
            b.write_u8(5).unwrap();
            b.write_u8(0).unwrap();
            b.write_u16::<BigEndian>(self.dl_type).unwrap();
            b.write_u8(4).unwrap();
            b.write_u8(self.nw_proto).unwrap();
            b.write_u32::<BigEndian>(self.nw_src).unwrap();
            b.write_u32::<BigEndian>(0).unwrap();
            b.write_u32::<BigEndian>(self.nw_dst).unwrap();
            b.write_u32::<BigEndian>(0xff).unwrap();
            b.write_u16::<BigEndian>(self.tp_src).unwrap();
            b.write_u16::<BigEndian>(self.tp_dst).unwrap();
            b.write_u32::<BigEndian>(16).unwrap();
            b.write_u8(1).unwrap();
            b.extend_from_slice(&[0; 3]);
            b.write_u64::<BigEndian>(0x1234).unwrap();
            b.write_u64::<BigEndian>(self.metadata_mask).unwrap();
            assert_eq!(b.len(), STANDARD_MATCH_LENGTH);
            b
        }
    }

    fn tcp_standard() -> Standard {
        Standard {
            wildcards: 0,
            dl_type: ETH_TYPE_IPV4,
            nw_proto: IP_PROTO_TCP,
            nw_src: 0x0a000001,
            nw_dst: 0x0a000002,
            tp_src: 1234,
            tp_dst: 80,
            metadata_mask: 0,
        }
    }

    #[test]
    fn standard_match_converts_to_oxm_fields() {
        let mut bytes = tcp_standard().encode();
        bytes.extend_from_slice(&[0xbe, 0xef]);
        let (m, consumed) = Match::decode(&bytes, &DecodeContext::default()).unwrap();
        assert_eq!(consumed, STANDARD_MATCH_LENGTH);
        assert_eq!(m.typ(), MatchType::Oxm);

        let order: Vec<&str> = m.fields().iter().map(|f| f.descriptor().name).collect();
        assert_eq!(order,
                   vec!["IN_PORT", "ETH_SRC", "ETH_DST", "VLAN_VID", "VLAN_PCP", "ETH_TYPE",
                        "IP_DSCP", "IP_PROTO", "IPV4_SRC", "IPV4_DST", "TCP_SRC", "TCP_DST",
                        "MPLS_LABEL", "MPLS_TC", "METADATA"]);
        assert_eq!(m.get_field(OxmFieldType::TcpSrc), Some(&OxmValue::U16(1234)));
        assert_eq!(m.get_field(OxmFieldType::IpDscp), Some(&OxmValue::U8(4)));
        assert_eq!(m.get_field(OxmFieldType::MplsLabel), Some(&OxmValue::U32(16)));
    }

    #[test]
    fn short_standard_match_does_not_read_its_siblings() {
        let mut bytes = vec![0, 0, 0, 8, 0, 0, 0, 0];
        bytes.extend_from_slice(&[0x11; 84]);
        match Match::decode(&bytes, &DecodeContext::default()) {
            Err(OfpSerializationError::MalformedHeader { kind: "match", .. }) => {}
            other => panic!("expected a malformed header, got {:?}", other),
        }
    }

    #[test]
    fn standard_match_masks_attach_only_when_all_zero() {
        // Standard masks use ones for wildcarded bits, and the conversion keeps a mask only
        // when it is all zero. A fully wildcarded MAC therefore loses its mask while an
        // exact one gains a zero mask.
        let (m, _) = Match::decode(&tcp_standard().encode(), &DecodeContext::default()).unwrap();
        assert!(!m.get(OxmFieldType::EthSrc).unwrap().has_mask());
        assert!(m.get(OxmFieldType::EthDst).unwrap().has_mask());
        assert!(m.get(OxmFieldType::Ipv4Src).unwrap().has_mask());
        assert!(!m.get(OxmFieldType::Ipv4Dst).unwrap().has_mask());
        assert!(m.get(OxmFieldType::Metadata).unwrap().has_mask());
    }

    #[test]
    fn wildcarded_protocol_stops_before_transport_fields() {
        let standard = Standard {
            wildcards: wildcards::NW_PROTO,
            nw_src: 0,
            ..tcp_standard()
        };
        let mut bytes = standard.encode();
        bytes.extend_from_slice(&[0xbe, 0xef]);
        let mut cursor = Cursor::new(&bytes[..]);
        let m = Match::parse(&mut cursor, &DecodeContext::default()).unwrap();

        assert!(m.get(OxmFieldType::IpProto).is_none());
        // Zero address means absent; the non-zero destination is still decoded.
        assert!(m.get(OxmFieldType::Ipv4Src).is_none());
        assert_eq!(m.get_field(OxmFieldType::Ipv4Dst), Some(&OxmValue::U32(0x0a000002)));
        assert!(m.get(OxmFieldType::TcpSrc).is_none());
        assert!(m.get(OxmFieldType::MplsLabel).is_none());
        assert!(m.get(OxmFieldType::Metadata).is_none());
        assert_eq!(cursor.position() as usize, STANDARD_MATCH_LENGTH);
    }

    #[test]
    fn non_ip_ethertype_stops_after_link_fields() {
        let standard = Standard {
            wildcards: wildcards::IN_PORT | wildcards::DL_VLAN,
            dl_type: 0x86dd,
            ..tcp_standard()
        };
        let (m, consumed) = Match::decode(&standard.encode(), &DecodeContext::default()).unwrap();
        assert_eq!(consumed, STANDARD_MATCH_LENGTH);
        assert!(m.get(OxmFieldType::InPort).is_none());
        assert!(m.get(OxmFieldType::VlanVid).is_none());
        assert_eq!(m.get_field(OxmFieldType::EthType), Some(&OxmValue::U16(0x86dd)));
        assert!(m.get(OxmFieldType::IpProto).is_none());
    }

    #[test]
    fn transport_ports_follow_the_protocol() {
        let standard = Standard {
            nw_proto: IP_PROTO_SCTP,
            metadata_mask: u64::MAX,
            ..tcp_standard()
        };
        let (m, _) = Match::decode(&standard.encode(), &DecodeContext::default()).unwrap();
        assert_eq!(m.get_field(OxmFieldType::SctpSrc), Some(&OxmValue::U16(1234)));
        assert_eq!(m.get_field(OxmFieldType::SctpDst), Some(&OxmValue::U16(80)));
        assert!(m.get(OxmFieldType::TcpSrc).is_none());
        assert!(!m.get(OxmFieldType::Metadata).unwrap().has_mask());
    }
}
