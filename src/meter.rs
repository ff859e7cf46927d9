use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::bits::{skip_padding_bytes, write_padding_bytes};
use crate::ofp_error::Result;
use crate::ofp_message::DecodeContext;
use crate::registry::{Registries, TypeRegistry};
use crate::tlv::{read_remaining, read_tlv_header, write_tlv_header, TlvElement};

/// Band header: type, length, rate, and burst size.
pub const METER_BAND_HEADER_LENGTH: usize = 12;

#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MeterBandType {
    Drop = 1,
    DscpRemark = 2,
    Experimenter = 0xffff,
}

/// What a band does to packets exceeding its rate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MeterBandKind {
    Drop,
    /// Raise the drop precedence of the DSCP field by this amount.
    DscpRemark(u8),
    Experimenter { experimenter: u32, body: Vec<u8> },
    Unknown { typ: u16, length: u16, body: Vec<u8> },
}

/// One band of a meter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeterBand {
    pub rate: u32,
    pub burst_size: u32,
    pub kind: MeterBandKind,
}

impl MeterBand {
    pub fn new(rate: u32, burst_size: u32, kind: MeterBandKind) -> MeterBand {
        MeterBand {
            rate,
            burst_size,
            kind,
        }
    }

    pub fn standard_types() -> TypeRegistry<MeterBand> {
        let mut registry = TypeRegistry::new(MeterBand::KIND);
        registry.register(MeterBandType::Drop as u16,
                      || MeterBand::new(0, 0, MeterBandKind::Drop))
            .register(MeterBandType::DscpRemark as u16,
                      || MeterBand::new(0, 0, MeterBandKind::DscpRemark(0)))
            .register(MeterBandType::Experimenter as u16, || {
                MeterBand::new(0,
                               0,
                               MeterBandKind::Experimenter {
                                   experimenter: 0,
                                   body: vec![],
                               })
            });
        registry
    }

    pub fn code(&self) -> u16 {
        match self.kind {
            MeterBandKind::Drop => MeterBandType::Drop as u16,
            MeterBandKind::DscpRemark(_) => MeterBandType::DscpRemark as u16,
            MeterBandKind::Experimenter { .. } => MeterBandType::Experimenter as u16,
            MeterBandKind::Unknown { typ, .. } => typ,
        }
    }
}

impl TlvElement for MeterBand {
    const KIND: &'static str = "meter band";
    const HEADER_LENGTH: usize = METER_BAND_HEADER_LENGTH;

    fn registry(registries: &Registries) -> Option<&TypeRegistry<MeterBand>> {
        Some(&registries.meter_bands)
    }

    fn unknown(typ: u16, length: u16) -> MeterBand {
        MeterBand::new(0,
                       0,
                       MeterBandKind::Unknown {
                           typ,
                           length,
                           body: vec![],
                       })
    }

    fn read_from(&mut self, bytes: &mut Cursor<&[u8]>, _: &DecodeContext) -> Result<()> {
        let (_, declared) = read_tlv_header(bytes)?;
        self.rate = bytes.read_u32::<BigEndian>()?;
        self.burst_size = bytes.read_u32::<BigEndian>()?;
        match self.kind {
            MeterBandKind::Drop => skip_padding_bytes(bytes, 4)?,
            MeterBandKind::DscpRemark(ref mut prec_level) => {
                *prec_level = bytes.read_u8()?;
                skip_padding_bytes(bytes, 3)?;
            }
            MeterBandKind::Experimenter { ref mut experimenter, ref mut body } => {
                *experimenter = bytes.read_u32::<BigEndian>()?;
                *body = read_remaining(bytes)?;
            }
            MeterBandKind::Unknown { ref mut length, ref mut body, .. } => {
                *length = declared;
                *body = read_remaining(bytes)?;
            }
        }
        Ok(())
    }

    fn write_to(&self, bytes: &mut Vec<u8>) -> Result<()> {
        write_tlv_header(bytes, self.code(), self.length())?;
        bytes.write_u32::<BigEndian>(self.rate)?;
        bytes.write_u32::<BigEndian>(self.burst_size)?;
        match self.kind {
            MeterBandKind::Drop => write_padding_bytes(bytes, 4)?,
            MeterBandKind::DscpRemark(prec_level) => {
                bytes.write_u8(prec_level)?;
                write_padding_bytes(bytes, 3)?;
            }
            MeterBandKind::Experimenter { experimenter, ref body } => {
                bytes.write_u32::<BigEndian>(experimenter)?;
                bytes.extend_from_slice(body);
            }
            MeterBandKind::Unknown { length, ref body, .. } => {
                let room = (length as usize).saturating_sub(METER_BAND_HEADER_LENGTH);
                let n = body.len().min(room);
                bytes.extend_from_slice(&body[..n]);
                write_padding_bytes(bytes, room - n)?;
            }
        }
        Ok(())
    }

    fn length(&self) -> usize {
        match self.kind {
            MeterBandKind::Experimenter { ref body, .. } => 16 + body.len(),
            MeterBandKind::Unknown { length, .. } => {
                (length as usize).max(METER_BAND_HEADER_LENGTH)
            }
            _ => 16,
        }
    }
}
