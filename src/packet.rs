//! Derive an exact match from a raw Ethernet frame.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};
use tracing::trace;

use crate::ofp_error::Result;
use crate::ofp_match::{Match, ETH_TYPE_ARP, ETH_TYPE_IPV4, ETH_TYPE_VLAN, IP_PROTO_ICMP,
                       IP_PROTO_SCTP, IP_PROTO_TCP, IP_PROTO_UDP};
use crate::ofp_message::DecodeContext;
use crate::oxm::OxmFieldType;

/// ARP hardware type, protocol type, and the two address lengths precede the opcode.
const ARP_OPCODE_OFFSET: u64 = 6;
const ARP_PTYPE_OFFSET: u64 = 2;
const ARP_PLEN_OFFSET: u64 = 5;
const ARP_SPA_OFFSET: u64 = 14;
const ARP_TPA_OFFSET: u64 = 24;

fn read_mac(bytes: &mut Cursor<&[u8]>) -> Result<[u8; 6]> {
    let mut mac = [0; 6];
    bytes.read_exact(&mut mac)?;
    Ok(mac)
}

/// The match a packet arriving on `in_port` would hit exactly.
///
/// Fields are set in frame order: ingress port, Ethernet destination and source, the outer
/// ethertype, then VLAN id and priority if the frame carries a single 802.1Q tag. An IPv4
/// payload adds DSCP, protocol and both addresses, followed by ICMP type and code or
/// TCP, UDP or SCTP ports. An ARP payload adds the opcode and, for IPv4 over ARP, both
/// protocol addresses. Any other ethertype ends the match after the Ethernet fields.
pub fn match_of_packet(frame: &[u8], in_port: u32) -> Result<Match> {
    let mut pattern = Match::match_all();
    let mut bytes = Cursor::new(frame);

    pattern.set_field(OxmFieldType::InPort, in_port)?;
    pattern.set_field(OxmFieldType::EthDst, read_mac(&mut bytes)?)?;
    pattern.set_field(OxmFieldType::EthSrc, read_mac(&mut bytes)?)?;
    let mut dl_type = bytes.read_u16::<BigEndian>()?;
    pattern.set_field(OxmFieldType::EthType, dl_type)?;

    if dl_type == ETH_TYPE_VLAN {
        let tci = bytes.read_u16::<BigEndian>()?;
        pattern.set_field(OxmFieldType::VlanVid, tci & 0xfff)?;
        pattern.set_field(OxmFieldType::VlanPcp, ((tci & 0xe000) >> 13) as u8)?;
        dl_type = bytes.read_u16::<BigEndian>()?;
    }

    let nw_proto = match dl_type {
        ETH_TYPE_IPV4 => {
            let ip_start = bytes.position();
            let ihl = bytes.read_u8()? & 0x0f;
            let transport_offset = ip_start + 4 * ihl as u64;
            let tos = bytes.read_u8()?;
            pattern.set_field(OxmFieldType::IpDscp, (tos & 0xfc) >> 2)?;
            bytes.set_position(ip_start + 9);
            let proto = bytes.read_u8()?;
            pattern.set_field(OxmFieldType::IpProto, proto)?;
            bytes.set_position(ip_start + 12);
            pattern.set_field(OxmFieldType::Ipv4Src, bytes.read_u32::<BigEndian>()?)?;
            pattern.set_field(OxmFieldType::Ipv4Dst, bytes.read_u32::<BigEndian>()?)?;
            bytes.set_position(transport_offset);
            proto
        }
        ETH_TYPE_ARP => {
            let arp_start = bytes.position();
            bytes.set_position(arp_start + ARP_OPCODE_OFFSET);
            let op = bytes.read_u16::<BigEndian>()?;
            pattern.set_field(OxmFieldType::ArpOp, op & 0xff)?;
            bytes.set_position(arp_start + ARP_PTYPE_OFFSET);
            let ptype = bytes.read_u16::<BigEndian>()?;
            bytes.set_position(arp_start + ARP_PLEN_OFFSET);
            let plen = bytes.read_u8()?;
            if ptype == ETH_TYPE_IPV4 && plen == 4 {
                bytes.set_position(arp_start + ARP_SPA_OFFSET);
                pattern.set_field(OxmFieldType::ArpSpa, bytes.read_u32::<BigEndian>()?)?;
                bytes.set_position(arp_start + ARP_TPA_OFFSET);
                pattern.set_field(OxmFieldType::ArpTpa, bytes.read_u32::<BigEndian>()?)?;
            }
            return Ok(pattern);
        }
        _ => {
            trace!(dl_type, "no network fields for ethertype");
            return Ok(pattern);
        }
    };

    let ports = match nw_proto {
        IP_PROTO_ICMP => {
            pattern.set_field(OxmFieldType::Icmpv4Type, bytes.read_u8()?)?;
            pattern.set_field(OxmFieldType::Icmpv4Code, bytes.read_u8()?)?;
            None
        }
        IP_PROTO_TCP => Some((OxmFieldType::TcpSrc, OxmFieldType::TcpDst)),
        IP_PROTO_UDP => Some((OxmFieldType::UdpSrc, OxmFieldType::UdpDst)),
        IP_PROTO_SCTP => Some((OxmFieldType::SctpSrc, OxmFieldType::SctpDst)),
        _ => None,
    };
    if let Some((src, dst)) = ports {
        pattern.set_field(src, bytes.read_u16::<BigEndian>()?)?;
        pattern.set_field(dst, bytes.read_u16::<BigEndian>()?)?;
    }
    Ok(pattern)
}

/// Like `match_of_packet`, taking the ingress port from `ctx`.
pub fn match_of_packet_in(frame: &[u8], ctx: &DecodeContext) -> Result<Match> {
    match_of_packet(frame, ctx.in_port)
}
