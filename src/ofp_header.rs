use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::ofp_error::{OfpSerializationError, Result};

/// Wire version of OpenFlow 1.3.
pub const OPENFLOW_0_04_VERSION: u8 = 0x04;

/// OpenFlow 1.3 message type codes, used by headers to identify meaning of the rest of a message.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MsgCode {
    Hello,
    Error,
    EchoReq,
    EchoResp,
    Experimenter,
    FeaturesReq,
    FeaturesResp,
    GetConfigReq,
    GetConfigResp,
    SetConfig,
    PacketIn,
    FlowRemoved,
    PortStatus,
    PacketOut,
    FlowMod,
    GroupMod,
    PortMod,
    TableMod,
    MultipartReq,
    MultipartResp,
    BarrierReq,
    BarrierResp,
    QueueGetConfigReq,
    QueueGetConfigResp,
    RoleReq,
    RoleResp,
    GetAsyncReq,
    GetAsyncResp,
    SetAsync,
    MeterMod,
}

impl MsgCode {
    /// Map a wire type code to a `MsgCode`, if it names one.
    pub fn of_int(code: u8) -> Option<MsgCode> {
        use self::MsgCode::*;
        const CODES: [MsgCode; 30] = [Hello, Error, EchoReq, EchoResp, Experimenter, FeaturesReq,
                                      FeaturesResp, GetConfigReq, GetConfigResp, SetConfig,
                                      PacketIn, FlowRemoved, PortStatus, PacketOut, FlowMod,
                                      GroupMod, PortMod, TableMod, MultipartReq, MultipartResp,
                                      BarrierReq, BarrierResp, QueueGetConfigReq,
                                      QueueGetConfigResp, RoleReq, RoleResp, GetAsyncReq,
                                      GetAsyncResp, SetAsync, MeterMod];
        CODES.get(code as usize).copied()
    }
}

/// OpenFlow Header
///
/// The first fields of every OpenFlow message, no matter the protocol version.
/// This is parsed to determine version and length of the remaining message, so that
/// it can be properly handled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OfpHeader {
    version: u8,
    typ: u8,
    length: u16,
    xid: u32,
}

impl OfpHeader {
    /// Create an `OfpHeader` out of the arguments.
    pub fn new(version: u8, typ: u8, length: u16, xid: u32) -> OfpHeader {
        OfpHeader {
            version,
            typ,
            length,
            xid,
        }
    }

    /// Return the byte-size of an `OfpHeader`.
    pub fn size() -> usize {
        8
    }

    /// Fills a message buffer with the header fields of an `OfpHeader`.
    pub fn marshal(bytes: &mut Vec<u8>, header: OfpHeader) -> Result<()> {
        bytes.write_u8(header.version())?;
        bytes.write_u8(header.typ)?;
        bytes.write_u16::<BigEndian>(header.length)?;
        bytes.write_u32::<BigEndian>(header.xid())?;
        Ok(())
    }

    /// Reads an `OfpHeader` from the cursor, rejecting lengths shorter than the header itself.
    pub fn parse(bytes: &mut Cursor<&[u8]>) -> Result<OfpHeader> {
        let header = OfpHeader {
            version: bytes.read_u8()?,
            typ: bytes.read_u8()?,
            length: bytes.read_u16::<BigEndian>()?,
            xid: bytes.read_u32::<BigEndian>()?,
        };
        if header.length() < OfpHeader::size() {
            return Err(OfpSerializationError::MalformedHeader {
                kind: "message",
                reason: format!("length {} is shorter than the header", header.length),
            });
        }
        Ok(header)
    }

    /// Return the `version` field of a header.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Return the OpenFlow message type code of a header, if it is a known one.
    pub fn type_code(&self) -> Option<MsgCode> {
        MsgCode::of_int(self.typ)
    }

    /// Return the `length` field of a header. Includes the length of the header itself.
    pub fn length(&self) -> usize {
        self.length as usize
    }

    /// Return the `xid` field of a header, the transaction id associated with this packet.
    ///  Replies use the same id to facilitate pairing.
    pub fn xid(&self) -> u32 {
        self.xid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let hdr = OfpHeader::new(OPENFLOW_0_04_VERSION, MsgCode::MultipartResp as u8, 16, 0x1234);
        let mut bytes = vec![];
        OfpHeader::marshal(&mut bytes, hdr).unwrap();
        assert_eq!(bytes, vec![0x04, 19, 0x00, 0x10, 0x00, 0x00, 0x12, 0x34]);

        let parsed = OfpHeader::parse(&mut Cursor::new(&bytes[..])).unwrap();
        assert_eq!(parsed, hdr);
        assert_eq!(parsed.type_code(), Some(MsgCode::MultipartResp));
    }

    #[test]
    fn short_length_is_malformed() {
        let bytes = [0x04, 0, 0x00, 0x04, 0, 0, 0, 1];
        match OfpHeader::parse(&mut Cursor::new(&bytes[..])) {
            Err(OfpSerializationError::MalformedHeader { .. }) => {}
            other => panic!("expected malformed header, got {:?}", other),
        }
    }

    #[test]
    fn unknown_type_codes_are_not_mapped() {
        assert_eq!(MsgCode::of_int(29), Some(MsgCode::MeterMod));
        assert_eq!(MsgCode::of_int(30), None);
    }
}
