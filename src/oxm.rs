//! OpenFlow Extensible Match (OXM) fields.
//!
//! An OXM field is a 4-byte header followed by a fixed-width value and, when the header's
//! mask bit is set, a mask of the same width:
//!
//! ```text
//! | class:16 | field:7 | hasmask:1 | length:8 | value | mask? |
//! ```
//!
//! The `FieldCatalog` maps `(class, field)` pairs to their `FieldDescriptor`, which fixes the
//! value width. The catalog's width is what decoding trusts; the header's length byte only
//! matters for skipping fields the catalog does not know.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::net::{Ipv4Addr, Ipv6Addr};

use byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};
use tracing::warn;

use crate::bits::{bit, test_bit};
use crate::ofp_error::{OfpSerializationError, Result};
use crate::ofp_message::{DecodeContext, OfpMessage};

/// Size of the header preceding every OXM value.
pub const OXM_HEADER_LENGTH: usize = 4;

/// OXM class identifiers.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OxmClass {
    Nxm0 = 0x0000,
    Nxm1 = 0x0001,
    OpenflowBasic = 0x8000,
    Experimenter = 0xffff,
}

/// Catalog entry describing how one OXM field type is laid out on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub class: u16,
    pub field: u8,
    pub payload_length: u8,
    pub maskable: bool,
}

impl FieldDescriptor {
    pub fn new(name: &'static str,
               class: u16,
               field: u8,
               payload_length: u8,
               maskable: bool)
               -> FieldDescriptor {
        FieldDescriptor {
            name,
            class,
            field: field & 0x7f,
            payload_length,
            maskable,
        }
    }

    pub fn payload_length(&self) -> usize {
        self.payload_length as usize
    }

    fn key(&self) -> (u16, u8) {
        (self.class, self.field)
    }
}

/// OpenFlow-basic match field types, numbered as on the wire.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OxmFieldType {
    InPort,
    InPhyPort,
    Metadata,
    EthDst,
    EthSrc,
    EthType,
    VlanVid,
    VlanPcp,
    IpDscp,
    IpEcn,
    IpProto,
    Ipv4Src,
    Ipv4Dst,
    TcpSrc,
    TcpDst,
    UdpSrc,
    UdpDst,
    SctpSrc,
    SctpDst,
    Icmpv4Type,
    Icmpv4Code,
    ArpOp,
    ArpSpa,
    ArpTpa,
    ArpSha,
    ArpTha,
    Ipv6Src,
    Ipv6Dst,
    Ipv6Flabel,
    Icmpv6Type,
    Icmpv6Code,
    Ipv6NdTarget,
    Ipv6NdSll,
    Ipv6NdTll,
    MplsLabel,
    MplsTc,
    MplsBos,
    PbbIsid,
    TunnelId,
    Ipv6Exthdr,
}

impl OxmFieldType {
    pub const ALL: [OxmFieldType; 40] = {
        use self::OxmFieldType::*;
        [InPort, InPhyPort, Metadata, EthDst, EthSrc, EthType, VlanVid, VlanPcp, IpDscp, IpEcn,
         IpProto, Ipv4Src, Ipv4Dst, TcpSrc, TcpDst, UdpSrc, UdpDst, SctpSrc, SctpDst, Icmpv4Type,
         Icmpv4Code, ArpOp, ArpSpa, ArpTpa, ArpSha, ArpTha, Ipv6Src, Ipv6Dst, Ipv6Flabel,
         Icmpv6Type, Icmpv6Code, Ipv6NdTarget, Ipv6NdSll, Ipv6NdTll, MplsLabel, MplsTc, MplsBos,
         PbbIsid, TunnelId, Ipv6Exthdr]
    };

    /// Name, payload length, and whether a mask may follow the value.
    fn layout(self) -> (&'static str, u8, bool) {
        use self::OxmFieldType::*;
        match self {
            InPort => ("IN_PORT", 4, false),
            InPhyPort => ("IN_PHY_PORT", 4, false),
            Metadata => ("METADATA", 8, true),
            EthDst => ("ETH_DST", 6, true),
            EthSrc => ("ETH_SRC", 6, true),
            EthType => ("ETH_TYPE", 2, false),
            VlanVid => ("VLAN_VID", 2, true),
            VlanPcp => ("VLAN_PCP", 1, false),
            IpDscp => ("IP_DSCP", 1, false),
            IpEcn => ("IP_ECN", 1, false),
            IpProto => ("IP_PROTO", 1, false),
            Ipv4Src => ("IPV4_SRC", 4, true),
            Ipv4Dst => ("IPV4_DST", 4, true),
            TcpSrc => ("TCP_SRC", 2, false),
            TcpDst => ("TCP_DST", 2, false),
            UdpSrc => ("UDP_SRC", 2, false),
            UdpDst => ("UDP_DST", 2, false),
            SctpSrc => ("SCTP_SRC", 2, false),
            SctpDst => ("SCTP_DST", 2, false),
            Icmpv4Type => ("ICMPV4_TYPE", 1, false),
            Icmpv4Code => ("ICMPV4_CODE", 1, false),
            ArpOp => ("ARP_OP", 2, false),
            ArpSpa => ("ARP_SPA", 4, true),
            ArpTpa => ("ARP_TPA", 4, true),
            ArpSha => ("ARP_SHA", 6, true),
            ArpTha => ("ARP_THA", 6, true),
            Ipv6Src => ("IPV6_SRC", 16, true),
            Ipv6Dst => ("IPV6_DST", 16, true),
            Ipv6Flabel => ("IPV6_FLABEL", 4, true),
            Icmpv6Type => ("ICMPV6_TYPE", 1, false),
            Icmpv6Code => ("ICMPV6_CODE", 1, false),
            Ipv6NdTarget => ("IPV6_ND_TARGET", 16, false),
            Ipv6NdSll => ("IPV6_ND_SLL", 6, false),
            Ipv6NdTll => ("IPV6_ND_TLL", 6, false),
            MplsLabel => ("MPLS_LABEL", 4, false),
            MplsTc => ("MPLS_TC", 1, false),
            MplsBos => ("MPLS_BOS", 1, false),
            PbbIsid => ("PBB_ISID", 3, true),
            TunnelId => ("TUNNEL_ID", 8, true),
            Ipv6Exthdr => ("IPV6_EXTHDR", 2, true),
        }
    }

    pub fn descriptor(self) -> FieldDescriptor {
        let (name, len, maskable) = self.layout();
        FieldDescriptor::new(name, OxmClass::OpenflowBasic as u16, self as u8, len, maskable)
    }
}

impl From<OxmFieldType> for FieldDescriptor {
    fn from(typ: OxmFieldType) -> FieldDescriptor {
        typ.descriptor()
    }
}

/// Lookup table from `(class, field)` to the descriptor of a known field type.
#[derive(Clone, Debug, Default)]
pub struct FieldCatalog {
    fields: HashMap<(u16, u8), FieldDescriptor>,
}

impl FieldCatalog {
    /// An empty catalog.
    pub fn new() -> FieldCatalog {
        FieldCatalog { fields: HashMap::new() }
    }

    /// A catalog holding every OpenFlow-basic field type.
    pub fn openflow_basic() -> FieldCatalog {
        let mut catalog = FieldCatalog::new();
        for typ in OxmFieldType::ALL.iter() {
            catalog.register(typ.descriptor());
        }
        catalog
    }

    /// Add `descriptor`, replacing any entry already registered for its `(class, field)` pair.
    pub fn register(&mut self, descriptor: FieldDescriptor) -> &mut FieldCatalog {
        self.fields.insert(descriptor.key(), descriptor);
        self
    }

    pub fn lookup(&self, class: u16, field: u8) -> Result<FieldDescriptor> {
        self.fields
            .get(&(class, field))
            .copied()
            .ok_or(OfpSerializationError::UnknownFieldType { class, field })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The unpacked 32-bit OXM header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OxmHeader {
    pub class: u16,
    pub field: u8,
    pub has_mask: bool,
    pub length: u8,
}

impl OxmHeader {
    pub fn of_descriptor(descriptor: &FieldDescriptor, has_mask: bool) -> OxmHeader {
        OxmHeader {
            class: descriptor.class,
            field: descriptor.field,
            has_mask,
            length: descriptor.payload_length,
        }
    }

    pub fn of_int(word: u32) -> OxmHeader {
        OxmHeader {
            class: (word >> 16) as u16,
            field: ((word >> 9) & 0x7f) as u8,
            has_mask: test_bit(8, word as u64),
            length: (word & 0xff) as u8,
        }
    }

    pub fn to_int(header: OxmHeader) -> u32 {
        let word = (header.class as u64) << 16 | ((header.field & 0x7f) as u64) << 9 |
                   header.length as u64;
        bit(8, word, header.has_mask) as u32
    }

    /// Read the header at the cursor without consuming it.
    pub fn peek(bytes: &Cursor<&[u8]>) -> Result<OxmHeader> {
        let pos = bytes.position() as usize;
        match bytes.get_ref().get(pos..pos + OXM_HEADER_LENGTH) {
            Some(raw) => Ok(OxmHeader::of_int(BigEndian::read_u32(raw))),
            None => {
                Err(OfpSerializationError::TruncatedInput(format!("OXM header at offset {}", pos)))
            }
        }
    }

    /// Bytes spanned by a field carrying this header, going by the header alone.
    pub fn wire_length(&self) -> usize {
        let copies = if self.has_mask { 2 } else { 1 };
        OXM_HEADER_LENGTH + self.length as usize * copies
    }
}

/// A field value or mask. The arm is fixed by the field's payload length.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OxmValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Bytes(Vec<u8>),
}

impl OxmValue {
    /// The all-zero value of the arm selected by `len`.
    pub fn zero(len: usize) -> OxmValue {
        match len {
            1 => OxmValue::U8(0),
            2 => OxmValue::U16(0),
            4 => OxmValue::U32(0),
            8 => OxmValue::U64(0),
            n => OxmValue::Bytes(vec![0; n]),
        }
    }

    pub fn len(&self) -> usize {
        match *self {
            OxmValue::U8(_) => 1,
            OxmValue::U16(_) => 2,
            OxmValue::U32(_) => 4,
            OxmValue::U64(_) => 8,
            OxmValue::Bytes(ref b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_all_zero(&self) -> bool {
        match *self {
            OxmValue::U8(v) => v == 0,
            OxmValue::U16(v) => v == 0,
            OxmValue::U32(v) => v == 0,
            OxmValue::U64(v) => v == 0,
            OxmValue::Bytes(ref b) => b.iter().all(|x| *x == 0),
        }
    }

    /// The value widened to `u64`, for the scalar arms.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            OxmValue::U8(v) => Some(v as u64),
            OxmValue::U16(v) => Some(v as u64),
            OxmValue::U32(v) => Some(v as u64),
            OxmValue::U64(v) => Some(v),
            OxmValue::Bytes(_) => None,
        }
    }

    /// Whether this value has the arm and width a `len`-byte payload decodes to.
    fn fits(&self, len: usize) -> bool {
        match (self, len) {
            (&OxmValue::U8(_), 1) |
            (&OxmValue::U16(_), 2) |
            (&OxmValue::U32(_), 4) |
            (&OxmValue::U64(_), 8) => true,
            (&OxmValue::Bytes(ref b), n) => b.len() == n && ![1, 2, 4, 8].contains(&n),
            _ => false,
        }
    }

    fn read(bytes: &mut Cursor<&[u8]>, len: usize) -> Result<OxmValue> {
        Ok(match len {
            1 => OxmValue::U8(bytes.read_u8()?),
            2 => OxmValue::U16(bytes.read_u16::<BigEndian>()?),
            4 => OxmValue::U32(bytes.read_u32::<BigEndian>()?),
            8 => OxmValue::U64(bytes.read_u64::<BigEndian>()?),
            n => {
                let mut raw = vec![0; n];
                bytes.read_exact(&mut raw)?;
                OxmValue::Bytes(raw)
            }
        })
    }

    fn write(&self, bytes: &mut Vec<u8>) -> Result<()> {
        match *self {
            OxmValue::U8(v) => bytes.write_u8(v)?,
            OxmValue::U16(v) => bytes.write_u16::<BigEndian>(v)?,
            OxmValue::U32(v) => bytes.write_u32::<BigEndian>(v)?,
            OxmValue::U64(v) => bytes.write_u64::<BigEndian>(v)?,
            OxmValue::Bytes(ref b) => bytes.extend_from_slice(b),
        }
        Ok(())
    }
}

impl From<u8> for OxmValue {
    fn from(v: u8) -> OxmValue {
        OxmValue::U8(v)
    }
}

impl From<u16> for OxmValue {
    fn from(v: u16) -> OxmValue {
        OxmValue::U16(v)
    }
}

impl From<u32> for OxmValue {
    fn from(v: u32) -> OxmValue {
        OxmValue::U32(v)
    }
}

impl From<u64> for OxmValue {
    fn from(v: u64) -> OxmValue {
        OxmValue::U64(v)
    }
}

impl<const N: usize> From<[u8; N]> for OxmValue {
    fn from(v: [u8; N]) -> OxmValue {
        OxmValue::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for OxmValue {
    fn from(v: Vec<u8>) -> OxmValue {
        OxmValue::Bytes(v)
    }
}

impl From<Ipv4Addr> for OxmValue {
    fn from(addr: Ipv4Addr) -> OxmValue {
        OxmValue::U32(u32::from(addr))
    }
}

impl From<Ipv6Addr> for OxmValue {
    fn from(addr: Ipv6Addr) -> OxmValue {
        OxmValue::Bytes(addr.octets().to_vec())
    }
}

/// Where a field is being used. Some pipeline fields can be matched on but never rewritten.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldContext {
    Match,
    SetField,
}

/// Reject field types that `context` does not permit.
pub fn check_field_context(descriptor: &FieldDescriptor, context: FieldContext) -> Result<()> {
    const PIPELINE_FIELDS: [OxmFieldType; 4] = [OxmFieldType::InPort,
                                                OxmFieldType::InPhyPort,
                                                OxmFieldType::Metadata,
                                                OxmFieldType::Ipv6Exthdr];
    match context {
        FieldContext::Match => Ok(()),
        FieldContext::SetField => {
            let pipeline = descriptor.class == OxmClass::OpenflowBasic as u16 &&
                           PIPELINE_FIELDS.iter().any(|t| *t as u8 == descriptor.field);
            if pipeline {
                Err(OfpSerializationError::DisallowedFieldForContext {
                    field: descriptor.name,
                    context: "a set-field action",
                })
            } else {
                Ok(())
            }
        }
    }
}

/// One OXM TLV: a typed value with an optional mask.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OxmField {
    descriptor: FieldDescriptor,
    value: OxmValue,
    mask: Option<OxmValue>,
}

impl OxmField {
    /// An exact-match field.
    pub fn new<D, V>(typ: D, value: V) -> Result<OxmField>
        where D: Into<FieldDescriptor>,
              V: Into<OxmValue>
    {
        let descriptor = typ.into();
        let value = value.into();
        OxmField::check_value(&descriptor, &value)?;
        Ok(OxmField {
            descriptor,
            value,
            mask: None,
        })
    }

    /// A field carrying `mask`. The mask is always kept, whatever its bits.
    pub fn masked<D, V, M>(typ: D, value: V, mask: M) -> Result<OxmField>
        where D: Into<FieldDescriptor>,
              V: Into<OxmValue>,
              M: Into<OxmValue>
    {
        let descriptor = typ.into();
        if !descriptor.maskable {
            return Err(OfpSerializationError::UnsupportedMask { field: descriptor.name });
        }
        let value = value.into();
        let mask = mask.into();
        OxmField::check_value(&descriptor, &value)?;
        OxmField::check_value(&descriptor, &mask)?;
        Ok(OxmField {
            descriptor,
            value,
            mask: Some(mask),
        })
    }

    fn check_value(descriptor: &FieldDescriptor, value: &OxmValue) -> Result<()> {
        if value.fits(descriptor.payload_length()) {
            Ok(())
        } else {
            Err(OfpSerializationError::ValueLengthMismatch {
                field: descriptor.name,
                expected: descriptor.payload_length(),
                found: value.len(),
            })
        }
    }

    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    /// Whether this field has the same `(class, field)` type as `descriptor`.
    pub fn same_type(&self, descriptor: &FieldDescriptor) -> bool {
        self.descriptor.key() == descriptor.key()
    }

    pub fn is(&self, typ: OxmFieldType) -> bool {
        self.same_type(&typ.descriptor())
    }

    pub fn value(&self) -> &OxmValue {
        &self.value
    }

    pub fn mask(&self) -> Option<&OxmValue> {
        self.mask.as_ref()
    }

    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }

    pub fn header(&self) -> OxmHeader {
        OxmHeader::of_descriptor(&self.descriptor, self.has_mask())
    }

    /// Decode one field, resolving its type through `catalog`.
    ///
    /// On `UnknownFieldType` the header has already been consumed; callers that want to
    /// skip the field should peek the header first and use `OxmHeader::wire_length`.
    pub fn read(bytes: &mut Cursor<&[u8]>, catalog: &FieldCatalog) -> Result<OxmField> {
        let header = OxmHeader::of_int(bytes.read_u32::<BigEndian>()?);
        let descriptor = catalog.lookup(header.class, header.field)?;
        let expected = descriptor.payload_length;
        let doubled = header.has_mask && header.length as usize == 2 * expected as usize;
        if header.length != expected && !doubled {
            warn!(field = descriptor.name,
                  declared = header.length,
                  expected,
                  "OXM header length disagrees with the catalog");
        }
        let value = OxmValue::read(bytes, descriptor.payload_length())?;
        let mask = if header.has_mask {
            Some(OxmValue::read(bytes, descriptor.payload_length())?)
        } else {
            None
        };
        Ok(OxmField {
            descriptor,
            value,
            mask,
        })
    }
}

impl OfpMessage for OxmField {
    fn size_of(field: &OxmField) -> usize {
        let copies = if field.has_mask() { 2 } else { 1 };
        OXM_HEADER_LENGTH + field.descriptor.payload_length() * copies
    }

    fn parse(bytes: &mut Cursor<&[u8]>, ctx: &DecodeContext) -> Result<OxmField> {
        OxmField::read(bytes, &ctx.registries.fields)
    }

    fn marshal(field: &OxmField, bytes: &mut Vec<u8>) -> Result<()> {
        bytes.write_u32::<BigEndian>(OxmHeader::to_int(field.header()))?;
        field.value.write(bytes)?;
        if let Some(ref mask) = field.mask {
            mask.write(bytes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use quickcheck::{Arbitrary, Gen};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Counts warning events raised while it is the default subscriber.
    struct WarningCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarningCounter {
        fn on_event(&self, event: &Event<'_>, _: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn warnings_during<T, F: FnOnce() -> T>(f: F) -> (T, usize) {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarningCounter(count.clone()));
        let result = tracing::subscriber::with_default(subscriber, f);
        (result, count.load(Ordering::SeqCst))
    }

    #[derive(Clone, Debug)]
    struct AnyField(OxmField);

    fn any_value(g: &mut Gen, len: usize) -> OxmValue {
        match len {
            1 => OxmValue::U8(u8::arbitrary(g)),
            2 => OxmValue::U16(u16::arbitrary(g)),
            4 => OxmValue::U32(u32::arbitrary(g)),
            8 => OxmValue::U64(u64::arbitrary(g)),
            n => OxmValue::Bytes((0..n).map(|_| u8::arbitrary(g)).collect()),
        }
    }

    impl Arbitrary for AnyField {
        fn arbitrary(g: &mut Gen) -> AnyField {
            let typ = *g.choose(&OxmFieldType::ALL).unwrap();
            let len = typ.descriptor().payload_length();
            let value = any_value(g, len);
            let field = if typ.descriptor().maskable && bool::arbitrary(g) {
                OxmField::masked(typ, value, any_value(g, len)).unwrap()
            } else {
                OxmField::new(typ, value).unwrap()
            };
            AnyField(field)
        }
    }

    #[quickcheck_macros::quickcheck]
    fn every_field_type_round_trips(field: AnyField) -> bool {
        let field = field.0;
        let bytes = OxmField::encode(&field).unwrap();
        let (decoded, consumed) = OxmField::decode(&bytes, &DecodeContext::default()).unwrap();
        decoded == field && consumed == bytes.len() && consumed == OxmField::size_of(&field)
    }

    #[test]
    fn header_word_packs_class_field_mask_and_length() {
        let eth_type = OxmHeader::of_descriptor(&OxmFieldType::EthType.descriptor(), false);
        assert_eq!(OxmHeader::to_int(eth_type), 0x8000_0a02);

        let ipv4_dst = OxmHeader::of_descriptor(&OxmFieldType::Ipv4Dst.descriptor(), true);
        assert_eq!(OxmHeader::to_int(ipv4_dst), 0x8000_1904);
        assert_eq!(OxmHeader::of_int(0x8000_1904), ipv4_dst);
    }

    #[test]
    fn unknown_pair_is_reported() {
        let catalog = FieldCatalog::openflow_basic();
        assert_eq!(catalog.len(), 40);
        match catalog.lookup(0x8000, 100) {
            Err(OfpSerializationError::UnknownFieldType { class: 0x8000, field: 100 }) => {}
            other => panic!("unexpected lookup result {:?}", other),
        }
    }

    #[test]
    fn masks_are_refused_for_unmaskable_types() {
        match OxmField::masked(OxmFieldType::EthType, 0x0800u16, 0xffffu16) {
            Err(OfpSerializationError::UnsupportedMask { field: "ETH_TYPE" }) => {}
            other => panic!("expected an unsupported mask, got {:?}", other),
        }
    }

    #[test]
    fn value_arm_must_match_payload_length() {
        assert!(OxmField::new(OxmFieldType::Ipv4Src, 0x0a000001u32).is_ok());
        match OxmField::new(OxmFieldType::Ipv4Src, 0x0a00u16) {
            Err(OfpSerializationError::ValueLengthMismatch { expected: 4, found: 2, .. }) => {}
            other => panic!("expected a length mismatch, got {:?}", other),
        }
        assert!(OxmField::new(OxmFieldType::EthDst, [1, 2, 3, 4, 5, 6]).is_ok());
        assert!(OxmField::new(OxmFieldType::EthDst, [1, 2, 3, 4]).is_err());
    }

    #[test]
    fn zero_length_fields_carry_only_a_header() {
        let presence = FieldDescriptor::new("EXP_PRESENT", OxmClass::Experimenter as u16, 3, 0, false);
        let mut catalog = FieldCatalog::new();
        catalog.register(presence);

        let field = OxmField::new(presence, Vec::<u8>::new()).unwrap();
        let bytes = OxmField::encode(&field).unwrap();
        assert_eq!(bytes, vec![0xff, 0xff, 0x06, 0x00]);

        let decoded = OxmField::read(&mut Cursor::new(&bytes[..]), &catalog).unwrap();
        assert_eq!(decoded, field);
        assert!(decoded.value().is_empty());
    }

    #[test]
    fn length_anomalies_still_decode_by_catalog_width() {
        // IN_PORT declaring 8 bytes: the catalog's 4 wins, the rest is left unread.
        let bytes = [0x80, 0x00, 0x00, 0x08, 0, 0, 0, 7, 0xaa, 0xbb];
        let mut cursor = Cursor::new(&bytes[..]);
        let catalog = FieldCatalog::openflow_basic();
        let (field, warnings) = warnings_during(|| OxmField::read(&mut cursor, &catalog));
        assert_eq!(field.unwrap().value(), &OxmValue::U32(7));
        assert_eq!(cursor.position(), 8);
        assert_eq!(warnings, 1);
    }

    #[test]
    fn agreeing_lengths_raise_no_warning() {
        let catalog = FieldCatalog::openflow_basic();
        let exact = [0x80, 0x00, 0x00, 0x04, 0, 0, 0, 7];
        let (_, warnings) =
            warnings_during(|| OxmField::read(&mut Cursor::new(&exact[..]), &catalog).unwrap());
        assert_eq!(warnings, 0);

        // A masked field may declare the doubled length.
        let doubled = [0x80, 0x00, 0x19, 0x08, 10, 0, 0, 1, 255, 255, 255, 0];
        let (_, warnings) =
            warnings_during(|| OxmField::read(&mut Cursor::new(&doubled[..]), &catalog).unwrap());
        assert_eq!(warnings, 0);
    }

    #[test]
    fn doubled_length_masked_fields_decode() {
        let bytes = [0x80, 0x00, 0x19, 0x08, 10, 0, 0, 1, 255, 255, 255, 0];
        let field = OxmField::read(&mut Cursor::new(&bytes[..]), &FieldCatalog::openflow_basic())
            .unwrap();
        assert!(field.is(OxmFieldType::Ipv4Dst));
        assert_eq!(field.mask(), Some(&OxmValue::U32(0xffffff00)));
    }

    #[test]
    fn truncated_value_is_an_error() {
        let bytes = [0x80, 0x00, 0x0a, 0x02, 0x08];
        match OxmField::read(&mut Cursor::new(&bytes[..]), &FieldCatalog::openflow_basic()) {
            Err(OfpSerializationError::TruncatedInput(_)) => {}
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn pipeline_fields_cannot_be_rewritten() {
        for typ in [OxmFieldType::InPort,
                    OxmFieldType::InPhyPort,
                    OxmFieldType::Metadata,
                    OxmFieldType::Ipv6Exthdr]
            .iter() {
            assert!(check_field_context(&typ.descriptor(), FieldContext::SetField).is_err());
            assert!(check_field_context(&typ.descriptor(), FieldContext::Match).is_ok());
        }
        assert!(check_field_context(&OxmFieldType::EthDst.descriptor(), FieldContext::SetField)
            .is_ok());
    }
}
