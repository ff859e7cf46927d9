//! Multipart (statistics) messages.
//!
//! A multipart message carries a list of bodies whose shape depends on both the multipart
//! type and whether the message is a request or a reply. Bodies are counted against the
//! declared body length; a body that does not fit what is left ends the list, and the
//! remainder is discarded.

use std::io::Cursor;

use byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use crate::bits::{length_u16, pad8, read_fixed_size_string, skip_padding_bytes,
                  write_fixed_size_string, write_padding_bytes};
use crate::instruction::Instruction;
use crate::meter::MeterBand;
use crate::ofp_error::{OfpSerializationError, Result};
use crate::ofp_header::{MsgCode, OfpHeader, OPENFLOW_0_04_VERSION};
use crate::ofp_match::{Match, MATCH_HEADER_LENGTH};
use crate::ofp_message::{DecodeContext, OfpMessage};
use crate::registry::{Direction, MultipartRegistry};
use crate::table_features::TableFeatures;
use crate::tlv::{parse_tlv_list, read_remaining, tlv_list_length, write_tlv_list};

/// Message header plus multipart type, flags, and 4 pad bytes.
pub const MULTIPART_HEADER_LENGTH: usize = 16;

/// More messages of the same exchange follow this one.
pub const OFPMPF_MORE: u16 = 1 << 0;

const DESC_STR_LEN: usize = 256;
const SERIAL_NUM_LEN: usize = 32;

#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MultipartType {
    Desc = 0,
    Flow = 1,
    Aggregate = 2,
    Table = 3,
    PortStats = 4,
    Queue = 5,
    Group = 6,
    GroupDesc = 7,
    GroupFeatures = 8,
    Meter = 9,
    MeterConfig = 10,
    MeterFeatures = 11,
    TableFeatures = 12,
    PortDesc = 13,
    Experimenter = 0xffff,
}

fn read_string(bytes: &mut Cursor<&[u8]>, len: usize) -> Result<String> {
    let pos = bytes.position() as usize;
    let raw = bytes.get_ref()
        .get(pos..pos + len)
        .ok_or_else(|| OfpSerializationError::TruncatedInput(format!("{}-byte string", len)))?;
    let s = read_fixed_size_string(raw);
    bytes.set_position((pos + len) as u64);
    Ok(s)
}

fn peek_u16(buf: &[u8], at: usize) -> Option<u16> {
    buf.get(at..at + 2).map(BigEndian::read_u16)
}

/// Switch description strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SwitchDesc {
    pub mfr_desc: String,
    pub hw_desc: String,
    pub sw_desc: String,
    pub serial_num: String,
    pub dp_desc: String,
}

impl OfpMessage for SwitchDesc {
    fn size_of(_: &SwitchDesc) -> usize {
        4 * DESC_STR_LEN + SERIAL_NUM_LEN
    }

    fn parse(bytes: &mut Cursor<&[u8]>, _: &DecodeContext) -> Result<SwitchDesc> {
        Ok(SwitchDesc {
            mfr_desc: read_string(bytes, DESC_STR_LEN)?,
            hw_desc: read_string(bytes, DESC_STR_LEN)?,
            sw_desc: read_string(bytes, DESC_STR_LEN)?,
            serial_num: read_string(bytes, SERIAL_NUM_LEN)?,
            dp_desc: read_string(bytes, DESC_STR_LEN)?,
        })
    }

    fn marshal(desc: &SwitchDesc, bytes: &mut Vec<u8>) -> Result<()> {
        write_fixed_size_string(bytes, &desc.mfr_desc, DESC_STR_LEN)?;
        write_fixed_size_string(bytes, &desc.hw_desc, DESC_STR_LEN)?;
        write_fixed_size_string(bytes, &desc.sw_desc, DESC_STR_LEN)?;
        write_fixed_size_string(bytes, &desc.serial_num, SERIAL_NUM_LEN)?;
        write_fixed_size_string(bytes, &desc.dp_desc, DESC_STR_LEN)
    }
}

/// Selects flow entries for individual or aggregate flow statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowStatsRequest {
    pub table_id: u8,
    pub out_port: u32,
    pub out_group: u32,
    pub cookie: u64,
    pub cookie_mask: u64,
    pub pattern: Match,
}

const FLOW_STATS_REQUEST_HEADER_LENGTH: usize = 32;

impl OfpMessage for FlowStatsRequest {
    fn size_of(req: &FlowStatsRequest) -> usize {
        FLOW_STATS_REQUEST_HEADER_LENGTH + Match::size_of(&req.pattern)
    }

    fn parse(bytes: &mut Cursor<&[u8]>, ctx: &DecodeContext) -> Result<FlowStatsRequest> {
        let table_id = bytes.read_u8()?;
        skip_padding_bytes(bytes, 3)?;
        let out_port = bytes.read_u32::<BigEndian>()?;
        let out_group = bytes.read_u32::<BigEndian>()?;
        skip_padding_bytes(bytes, 4)?;
        let cookie = bytes.read_u64::<BigEndian>()?;
        let cookie_mask = bytes.read_u64::<BigEndian>()?;
        let pattern = Match::parse(bytes, ctx)?;
        Ok(FlowStatsRequest {
            table_id,
            out_port,
            out_group,
            cookie,
            cookie_mask,
            pattern,
        })
    }

    fn marshal(req: &FlowStatsRequest, bytes: &mut Vec<u8>) -> Result<()> {
        bytes.write_u8(req.table_id)?;
        write_padding_bytes(bytes, 3)?;
        bytes.write_u32::<BigEndian>(req.out_port)?;
        bytes.write_u32::<BigEndian>(req.out_group)?;
        write_padding_bytes(bytes, 4)?;
        bytes.write_u64::<BigEndian>(req.cookie)?;
        bytes.write_u64::<BigEndian>(req.cookie_mask)?;
        Match::marshal(&req.pattern, bytes)
    }
}

/// Statistics of one flow entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowStats {
    pub table_id: u8,
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub priority: u16,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    pub flags: u16,
    pub cookie: u64,
    pub packet_count: u64,
    pub byte_count: u64,
    pub pattern: Match,
    pub instructions: Vec<Instruction>,
}

const FLOW_STATS_HEADER_LENGTH: usize = 48;

impl OfpMessage for FlowStats {
    fn size_of(stats: &FlowStats) -> usize {
        FLOW_STATS_HEADER_LENGTH + Match::size_of(&stats.pattern) +
        tlv_list_length(&stats.instructions)
    }

    fn parse(bytes: &mut Cursor<&[u8]>, ctx: &DecodeContext) -> Result<FlowStats> {
        let start = bytes.position() as usize;
        let length = bytes.read_u16::<BigEndian>()? as usize;
        let table_id = bytes.read_u8()?;
        skip_padding_bytes(bytes, 1)?;
        let duration_sec = bytes.read_u32::<BigEndian>()?;
        let duration_nsec = bytes.read_u32::<BigEndian>()?;
        let priority = bytes.read_u16::<BigEndian>()?;
        let idle_timeout = bytes.read_u16::<BigEndian>()?;
        let hard_timeout = bytes.read_u16::<BigEndian>()?;
        let flags = bytes.read_u16::<BigEndian>()?;
        skip_padding_bytes(bytes, 4)?;
        let cookie = bytes.read_u64::<BigEndian>()?;
        let packet_count = bytes.read_u64::<BigEndian>()?;
        let byte_count = bytes.read_u64::<BigEndian>()?;
        let pattern = Match::parse(bytes, ctx)?;
        let consumed = bytes.position() as usize - start;
        let instructions = parse_tlv_list(bytes, length.saturating_sub(consumed), ctx)?;
        Ok(FlowStats {
            table_id,
            duration_sec,
            duration_nsec,
            priority,
            idle_timeout,
            hard_timeout,
            flags,
            cookie,
            packet_count,
            byte_count,
            pattern,
            instructions,
        })
    }

    fn marshal(stats: &FlowStats, bytes: &mut Vec<u8>) -> Result<()> {
        let length = length_u16("flow stats", FlowStats::size_of(stats))?;
        bytes.write_u16::<BigEndian>(length)?;
        bytes.write_u8(stats.table_id)?;
        write_padding_bytes(bytes, 1)?;
        bytes.write_u32::<BigEndian>(stats.duration_sec)?;
        bytes.write_u32::<BigEndian>(stats.duration_nsec)?;
        bytes.write_u16::<BigEndian>(stats.priority)?;
        bytes.write_u16::<BigEndian>(stats.idle_timeout)?;
        bytes.write_u16::<BigEndian>(stats.hard_timeout)?;
        bytes.write_u16::<BigEndian>(stats.flags)?;
        write_padding_bytes(bytes, 4)?;
        bytes.write_u64::<BigEndian>(stats.cookie)?;
        bytes.write_u64::<BigEndian>(stats.packet_count)?;
        bytes.write_u64::<BigEndian>(stats.byte_count)?;
        Match::marshal(&stats.pattern, bytes)?;
        write_tlv_list(&stats.instructions, bytes)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub packet_count: u64,
    pub byte_count: u64,
    pub flow_count: u32,
}

impl OfpMessage for AggregateStats {
    fn size_of(_: &AggregateStats) -> usize {
        24
    }

    fn parse(bytes: &mut Cursor<&[u8]>, _: &DecodeContext) -> Result<AggregateStats> {
        let packet_count = bytes.read_u64::<BigEndian>()?;
        let byte_count = bytes.read_u64::<BigEndian>()?;
        let flow_count = bytes.read_u32::<BigEndian>()?;
        skip_padding_bytes(bytes, 4)?;
        Ok(AggregateStats {
            packet_count,
            byte_count,
            flow_count,
        })
    }

    fn marshal(stats: &AggregateStats, bytes: &mut Vec<u8>) -> Result<()> {
        bytes.write_u64::<BigEndian>(stats.packet_count)?;
        bytes.write_u64::<BigEndian>(stats.byte_count)?;
        bytes.write_u32::<BigEndian>(stats.flow_count)?;
        write_padding_bytes(bytes, 4)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TableStats {
    pub table_id: u8,
    pub active_count: u32,
    pub lookup_count: u64,
    pub matched_count: u64,
}

impl OfpMessage for TableStats {
    fn size_of(_: &TableStats) -> usize {
        24
    }

    fn parse(bytes: &mut Cursor<&[u8]>, _: &DecodeContext) -> Result<TableStats> {
        let table_id = bytes.read_u8()?;
        skip_padding_bytes(bytes, 3)?;
        Ok(TableStats {
            table_id,
            active_count: bytes.read_u32::<BigEndian>()?,
            lookup_count: bytes.read_u64::<BigEndian>()?,
            matched_count: bytes.read_u64::<BigEndian>()?,
        })
    }

    fn marshal(stats: &TableStats, bytes: &mut Vec<u8>) -> Result<()> {
        bytes.write_u8(stats.table_id)?;
        write_padding_bytes(bytes, 3)?;
        bytes.write_u32::<BigEndian>(stats.active_count)?;
        bytes.write_u64::<BigEndian>(stats.lookup_count)?;
        bytes.write_u64::<BigEndian>(stats.matched_count)?;
        Ok(())
    }
}

/// Request naming a port, or a port and a queue.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PortQueueRequest {
    pub port_no: u32,
    /// Zero and ignored for port statistics.
    pub queue_id: u32,
}

impl OfpMessage for PortQueueRequest {
    fn size_of(_: &PortQueueRequest) -> usize {
        8
    }

    fn parse(bytes: &mut Cursor<&[u8]>, _: &DecodeContext) -> Result<PortQueueRequest> {
        Ok(PortQueueRequest {
            port_no: bytes.read_u32::<BigEndian>()?,
            queue_id: bytes.read_u32::<BigEndian>()?,
        })
    }

    fn marshal(req: &PortQueueRequest, bytes: &mut Vec<u8>) -> Result<()> {
        bytes.write_u32::<BigEndian>(req.port_no)?;
        bytes.write_u32::<BigEndian>(req.queue_id)?;
        Ok(())
    }
}

/// Counters of one port.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PortStats {
    pub port_no: u32,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_dropped: u64,
    pub tx_dropped: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
    pub rx_frame_err: u64,
    pub rx_over_err: u64,
    pub rx_crc_err: u64,
    pub collisions: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
}

impl OfpMessage for PortStats {
    fn size_of(_: &PortStats) -> usize {
        112
    }

    fn parse(bytes: &mut Cursor<&[u8]>, _: &DecodeContext) -> Result<PortStats> {
        let port_no = bytes.read_u32::<BigEndian>()?;
        skip_padding_bytes(bytes, 4)?;
        let mut counters = [0u64; 12];
        for counter in counters.iter_mut() {
            *counter = bytes.read_u64::<BigEndian>()?;
        }
        Ok(PortStats {
            port_no,
            rx_packets: counters[0],
            tx_packets: counters[1],
            rx_bytes: counters[2],
            tx_bytes: counters[3],
            rx_dropped: counters[4],
            tx_dropped: counters[5],
            rx_errors: counters[6],
            tx_errors: counters[7],
            rx_frame_err: counters[8],
            rx_over_err: counters[9],
            rx_crc_err: counters[10],
            collisions: counters[11],
            duration_sec: bytes.read_u32::<BigEndian>()?,
            duration_nsec: bytes.read_u32::<BigEndian>()?,
        })
    }

    fn marshal(stats: &PortStats, bytes: &mut Vec<u8>) -> Result<()> {
        bytes.write_u32::<BigEndian>(stats.port_no)?;
        write_padding_bytes(bytes, 4)?;
        for counter in &[stats.rx_packets,
                         stats.tx_packets,
                         stats.rx_bytes,
                         stats.tx_bytes,
                         stats.rx_dropped,
                         stats.tx_dropped,
                         stats.rx_errors,
                         stats.tx_errors,
                         stats.rx_frame_err,
                         stats.rx_over_err,
                         stats.rx_crc_err,
                         stats.collisions] {
            bytes.write_u64::<BigEndian>(*counter)?;
        }
        bytes.write_u32::<BigEndian>(stats.duration_sec)?;
        bytes.write_u32::<BigEndian>(stats.duration_nsec)?;
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub port_no: u32,
    pub queue_id: u32,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
}

impl OfpMessage for QueueStats {
    fn size_of(_: &QueueStats) -> usize {
        40
    }

    fn parse(bytes: &mut Cursor<&[u8]>, _: &DecodeContext) -> Result<QueueStats> {
        Ok(QueueStats {
            port_no: bytes.read_u32::<BigEndian>()?,
            queue_id: bytes.read_u32::<BigEndian>()?,
            tx_bytes: bytes.read_u64::<BigEndian>()?,
            tx_packets: bytes.read_u64::<BigEndian>()?,
            tx_errors: bytes.read_u64::<BigEndian>()?,
            duration_sec: bytes.read_u32::<BigEndian>()?,
            duration_nsec: bytes.read_u32::<BigEndian>()?,
        })
    }

    fn marshal(stats: &QueueStats, bytes: &mut Vec<u8>) -> Result<()> {
        bytes.write_u32::<BigEndian>(stats.port_no)?;
        bytes.write_u32::<BigEndian>(stats.queue_id)?;
        bytes.write_u64::<BigEndian>(stats.tx_bytes)?;
        bytes.write_u64::<BigEndian>(stats.tx_packets)?;
        bytes.write_u64::<BigEndian>(stats.tx_errors)?;
        bytes.write_u32::<BigEndian>(stats.duration_sec)?;
        bytes.write_u32::<BigEndian>(stats.duration_nsec)?;
        Ok(())
    }
}

/// Request naming a group or a meter by id.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IdRequest {
    pub id: u32,
}

impl OfpMessage for IdRequest {
    fn size_of(_: &IdRequest) -> usize {
        8
    }

    fn parse(bytes: &mut Cursor<&[u8]>, _: &DecodeContext) -> Result<IdRequest> {
        let id = bytes.read_u32::<BigEndian>()?;
        skip_padding_bytes(bytes, 4)?;
        Ok(IdRequest { id })
    }

    fn marshal(req: &IdRequest, bytes: &mut Vec<u8>) -> Result<()> {
        bytes.write_u32::<BigEndian>(req.id)?;
        write_padding_bytes(bytes, 4)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BucketCounter {
    pub packet_count: u64,
    pub byte_count: u64,
}

const BUCKET_COUNTER_LENGTH: usize = 16;
const GROUP_STATS_HEADER_LENGTH: usize = 40;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupStats {
    pub group_id: u32,
    pub ref_count: u32,
    pub packet_count: u64,
    pub byte_count: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub bucket_stats: Vec<BucketCounter>,
}

impl OfpMessage for GroupStats {
    fn size_of(stats: &GroupStats) -> usize {
        GROUP_STATS_HEADER_LENGTH + BUCKET_COUNTER_LENGTH * stats.bucket_stats.len()
    }

    fn parse(bytes: &mut Cursor<&[u8]>, _: &DecodeContext) -> Result<GroupStats> {
        let length = bytes.read_u16::<BigEndian>()? as usize;
        skip_padding_bytes(bytes, 2)?;
        let group_id = bytes.read_u32::<BigEndian>()?;
        let ref_count = bytes.read_u32::<BigEndian>()?;
        skip_padding_bytes(bytes, 4)?;
        let packet_count = bytes.read_u64::<BigEndian>()?;
        let byte_count = bytes.read_u64::<BigEndian>()?;
        let duration_sec = bytes.read_u32::<BigEndian>()?;
        let duration_nsec = bytes.read_u32::<BigEndian>()?;
        let buckets = length.saturating_sub(GROUP_STATS_HEADER_LENGTH) / BUCKET_COUNTER_LENGTH;
        let mut bucket_stats = Vec::with_capacity(buckets);
        for _ in 0..buckets {
            bucket_stats.push(BucketCounter {
                packet_count: bytes.read_u64::<BigEndian>()?,
                byte_count: bytes.read_u64::<BigEndian>()?,
            });
        }
        Ok(GroupStats {
            group_id,
            ref_count,
            packet_count,
            byte_count,
            duration_sec,
            duration_nsec,
            bucket_stats,
        })
    }

    fn marshal(stats: &GroupStats, bytes: &mut Vec<u8>) -> Result<()> {
        let length = length_u16("group stats", GroupStats::size_of(stats))?;
        bytes.write_u16::<BigEndian>(length)?;
        write_padding_bytes(bytes, 2)?;
        bytes.write_u32::<BigEndian>(stats.group_id)?;
        bytes.write_u32::<BigEndian>(stats.ref_count)?;
        write_padding_bytes(bytes, 4)?;
        bytes.write_u64::<BigEndian>(stats.packet_count)?;
        bytes.write_u64::<BigEndian>(stats.byte_count)?;
        bytes.write_u32::<BigEndian>(stats.duration_sec)?;
        bytes.write_u32::<BigEndian>(stats.duration_nsec)?;
        for bucket in &stats.bucket_stats {
            bytes.write_u64::<BigEndian>(bucket.packet_count)?;
            bytes.write_u64::<BigEndian>(bucket.byte_count)?;
        }
        Ok(())
    }
}

const METER_CONFIG_HEADER_LENGTH: usize = 8;

/// Configuration of one meter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeterConfig {
    pub flags: u16,
    pub meter_id: u32,
    pub bands: Vec<MeterBand>,
}

impl OfpMessage for MeterConfig {
    fn size_of(config: &MeterConfig) -> usize {
        METER_CONFIG_HEADER_LENGTH + tlv_list_length(&config.bands)
    }

    fn parse(bytes: &mut Cursor<&[u8]>, ctx: &DecodeContext) -> Result<MeterConfig> {
        let length = bytes.read_u16::<BigEndian>()? as usize;
        let flags = bytes.read_u16::<BigEndian>()?;
        let meter_id = bytes.read_u32::<BigEndian>()?;
        let bands = parse_tlv_list(bytes,
                                   length.saturating_sub(METER_CONFIG_HEADER_LENGTH),
                                   ctx)?;
        Ok(MeterConfig {
            flags,
            meter_id,
            bands,
        })
    }

    fn marshal(config: &MeterConfig, bytes: &mut Vec<u8>) -> Result<()> {
        let length = length_u16("meter config", MeterConfig::size_of(config))?;
        bytes.write_u16::<BigEndian>(length)?;
        bytes.write_u16::<BigEndian>(config.flags)?;
        bytes.write_u32::<BigEndian>(config.meter_id)?;
        write_tlv_list(&config.bands, bytes)
    }
}

/// Body of an experimenter multipart message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExperimenterBody {
    pub experimenter: u32,
    pub exp_type: u32,
    pub data: Vec<u8>,
}

impl OfpMessage for ExperimenterBody {
    fn size_of(body: &ExperimenterBody) -> usize {
        8 + body.data.len()
    }

    fn parse(bytes: &mut Cursor<&[u8]>, _: &DecodeContext) -> Result<ExperimenterBody> {
        Ok(ExperimenterBody {
            experimenter: bytes.read_u32::<BigEndian>()?,
            exp_type: bytes.read_u32::<BigEndian>()?,
            data: read_remaining(bytes)?,
        })
    }

    fn marshal(body: &ExperimenterBody, bytes: &mut Vec<u8>) -> Result<()> {
        bytes.write_u32::<BigEndian>(body.experimenter)?;
        bytes.write_u32::<BigEndian>(body.exp_type)?;
        bytes.extend_from_slice(&body.data);
        Ok(())
    }
}

/// One entry of a multipart message body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MultipartBody {
    /// Requests that carry no body.
    Empty,
    Desc(SwitchDesc),
    FlowStatsRequest(FlowStatsRequest),
    FlowStats(FlowStats),
    AggregateStatsRequest(FlowStatsRequest),
    AggregateStats(AggregateStats),
    TableStats(TableStats),
    PortStatsRequest(PortQueueRequest),
    PortStats(PortStats),
    QueueStatsRequest(PortQueueRequest),
    QueueStats(QueueStats),
    GroupStatsRequest(IdRequest),
    GroupStats(GroupStats),
    MeterRequest(IdRequest),
    MeterConfig(MeterConfig),
    TableFeatures(TableFeatures),
    Experimenter(ExperimenterBody),
    /// A body of a type or direction with no registered shape. Takes the rest of the list.
    Unknown(Vec<u8>),
}

impl MultipartBody {
    pub fn standard_types() -> MultipartRegistry {
        use self::MultipartBody as B;
        use self::MultipartType as T;
        let mut registry = MultipartRegistry::new();
        registry.request
            .register(T::Desc as u16, || B::Empty)
            .register(T::Flow as u16, || B::FlowStatsRequest(Default::default()))
            .register(T::Aggregate as u16, || B::AggregateStatsRequest(Default::default()))
            .register(T::Table as u16, || B::Empty)
            .register(T::PortStats as u16, || B::PortStatsRequest(Default::default()))
            .register(T::Queue as u16, || B::QueueStatsRequest(Default::default()))
            .register(T::Group as u16, || B::GroupStatsRequest(Default::default()))
            .register(T::GroupDesc as u16, || B::Empty)
            .register(T::GroupFeatures as u16, || B::Empty)
            .register(T::Meter as u16, || B::MeterRequest(Default::default()))
            .register(T::MeterConfig as u16, || B::MeterRequest(Default::default()))
            .register(T::MeterFeatures as u16, || B::Empty)
            .register(T::TableFeatures as u16, || B::TableFeatures(Default::default()))
            .register(T::PortDesc as u16, || B::Empty)
            .register(T::Experimenter as u16, || B::Experimenter(Default::default()));
        registry.reply
            .register(T::Desc as u16, || B::Desc(Default::default()))
            .register(T::Flow as u16, || B::FlowStats(Default::default()))
            .register(T::Aggregate as u16, || B::AggregateStats(Default::default()))
            .register(T::Table as u16, || B::TableStats(Default::default()))
            .register(T::PortStats as u16, || B::PortStats(Default::default()))
            .register(T::Queue as u16, || B::QueueStats(Default::default()))
            .register(T::Group as u16, || B::GroupStats(Default::default()))
            .register(T::MeterConfig as u16, || B::MeterConfig(Default::default()))
            .register(T::TableFeatures as u16, || B::TableFeatures(Default::default()))
            .register(T::Experimenter as u16, || B::Experimenter(Default::default()));
        registry
    }

    /// Encoded size of this body.
    pub fn length(&self) -> usize {
        match *self {
            MultipartBody::Empty => 0,
            MultipartBody::Desc(ref desc) => SwitchDesc::size_of(desc),
            MultipartBody::FlowStatsRequest(ref req) |
            MultipartBody::AggregateStatsRequest(ref req) => FlowStatsRequest::size_of(req),
            MultipartBody::FlowStats(ref stats) => FlowStats::size_of(stats),
            MultipartBody::AggregateStats(ref stats) => AggregateStats::size_of(stats),
            MultipartBody::TableStats(ref stats) => TableStats::size_of(stats),
            MultipartBody::PortStatsRequest(ref req) |
            MultipartBody::QueueStatsRequest(ref req) => PortQueueRequest::size_of(req),
            MultipartBody::PortStats(ref stats) => PortStats::size_of(stats),
            MultipartBody::QueueStats(ref stats) => QueueStats::size_of(stats),
            MultipartBody::GroupStatsRequest(ref req) |
            MultipartBody::MeterRequest(ref req) => IdRequest::size_of(req),
            MultipartBody::GroupStats(ref stats) => GroupStats::size_of(stats),
            MultipartBody::MeterConfig(ref config) => MeterConfig::size_of(config),
            MultipartBody::TableFeatures(ref tf) => TableFeatures::size_of(tf),
            MultipartBody::Experimenter(ref body) => ExperimenterBody::size_of(body),
            MultipartBody::Unknown(ref body) => body.len(),
        }
    }

    /// Bytes the body starting at `pos` occupies, judged from this zero value's shape and
    /// whatever length field the wire form carries. `None` if that length cannot be read.
    fn wire_length(&self, buf: &[u8], pos: usize, remaining: usize) -> Option<usize> {
        match *self {
            MultipartBody::FlowStatsRequest(_) |
            MultipartBody::AggregateStatsRequest(_) => {
                let match_length = peek_u16(buf, pos + FLOW_STATS_REQUEST_HEADER_LENGTH + 2)?;
                let match_length = (match_length as usize).max(MATCH_HEADER_LENGTH);
                Some(FLOW_STATS_REQUEST_HEADER_LENGTH + pad8(match_length))
            }
            MultipartBody::FlowStats(_) |
            MultipartBody::GroupStats(_) |
            MultipartBody::MeterConfig(_) |
            MultipartBody::TableFeatures(_) => peek_u16(buf, pos).map(|length| length as usize),
            MultipartBody::Experimenter(_) |
            MultipartBody::Unknown(_) => Some(remaining),
            ref fixed => Some(fixed.length()),
        }
    }

    fn read_from(&mut self, bytes: &mut Cursor<&[u8]>, ctx: &DecodeContext) -> Result<()> {
        match *self {
            MultipartBody::Empty => {}
            MultipartBody::Desc(ref mut desc) => *desc = SwitchDesc::parse(bytes, ctx)?,
            MultipartBody::FlowStatsRequest(ref mut req) |
            MultipartBody::AggregateStatsRequest(ref mut req) => {
                *req = FlowStatsRequest::parse(bytes, ctx)?
            }
            MultipartBody::FlowStats(ref mut stats) => *stats = FlowStats::parse(bytes, ctx)?,
            MultipartBody::AggregateStats(ref mut stats) => {
                *stats = AggregateStats::parse(bytes, ctx)?
            }
            MultipartBody::TableStats(ref mut stats) => *stats = TableStats::parse(bytes, ctx)?,
            MultipartBody::PortStatsRequest(ref mut req) |
            MultipartBody::QueueStatsRequest(ref mut req) => {
                *req = PortQueueRequest::parse(bytes, ctx)?
            }
            MultipartBody::PortStats(ref mut stats) => *stats = PortStats::parse(bytes, ctx)?,
            MultipartBody::QueueStats(ref mut stats) => *stats = QueueStats::parse(bytes, ctx)?,
            MultipartBody::GroupStatsRequest(ref mut req) |
            MultipartBody::MeterRequest(ref mut req) => *req = IdRequest::parse(bytes, ctx)?,
            MultipartBody::GroupStats(ref mut stats) => *stats = GroupStats::parse(bytes, ctx)?,
            MultipartBody::MeterConfig(ref mut config) => {
                *config = MeterConfig::parse(bytes, ctx)?
            }
            MultipartBody::TableFeatures(ref mut tf) => *tf = TableFeatures::parse(bytes, ctx)?,
            MultipartBody::Experimenter(ref mut body) => {
                *body = ExperimenterBody::parse(bytes, ctx)?
            }
            MultipartBody::Unknown(ref mut body) => *body = read_remaining(bytes)?,
        }
        Ok(())
    }

    fn write_to(&self, bytes: &mut Vec<u8>) -> Result<()> {
        match *self {
            MultipartBody::Empty => Ok(()),
            MultipartBody::Desc(ref desc) => SwitchDesc::marshal(desc, bytes),
            MultipartBody::FlowStatsRequest(ref req) |
            MultipartBody::AggregateStatsRequest(ref req) => FlowStatsRequest::marshal(req, bytes),
            MultipartBody::FlowStats(ref stats) => FlowStats::marshal(stats, bytes),
            MultipartBody::AggregateStats(ref stats) => AggregateStats::marshal(stats, bytes),
            MultipartBody::TableStats(ref stats) => TableStats::marshal(stats, bytes),
            MultipartBody::PortStatsRequest(ref req) |
            MultipartBody::QueueStatsRequest(ref req) => PortQueueRequest::marshal(req, bytes),
            MultipartBody::PortStats(ref stats) => PortStats::marshal(stats, bytes),
            MultipartBody::QueueStats(ref stats) => QueueStats::marshal(stats, bytes),
            MultipartBody::GroupStatsRequest(ref req) |
            MultipartBody::MeterRequest(ref req) => IdRequest::marshal(req, bytes),
            MultipartBody::GroupStats(ref stats) => GroupStats::marshal(stats, bytes),
            MultipartBody::MeterConfig(ref config) => MeterConfig::marshal(config, bytes),
            MultipartBody::TableFeatures(ref tf) => TableFeatures::marshal(tf, bytes),
            MultipartBody::Experimenter(ref body) => ExperimenterBody::marshal(body, bytes),
            MultipartBody::Unknown(ref body) => {
                bytes.extend_from_slice(body);
                Ok(())
            }
        }
    }
}

/// Decode the bodies of a multipart message of type `typ`, `length` bytes in all.
///
/// The shape of each body comes from `ctx.direction`, which must be set. Decoding stops at
/// the first body that would run past `length` or whose own decode runs out of bytes; the
/// cursor is then left at the declared end, clamped to the buffer.
pub fn parse_multipart_bodies(bytes: &mut Cursor<&[u8]>,
                              typ: u16,
                              length: usize,
                              ctx: &DecodeContext)
                              -> Result<Vec<MultipartBody>> {
    let direction = ctx.direction.ok_or(OfpSerializationError::MissingContext("multipart \
                                                                               direction"))?;
    let buf: &[u8] = *bytes.get_ref();
    let start = bytes.position() as usize;
    let constructor: fn() -> MultipartBody = match ctx.registries
        .multipart
        .resolve(typ, direction) {
        Ok(constructor) => constructor,
        Err(err) => {
            debug!(code = typ, ?direction, %err, "decoding as a generic multipart body");
            || MultipartBody::Unknown(vec![])
        }
    };

    let mut bodies = vec![];
    let mut count = 0;
    while count < length {
        if ctx.element_limit.map_or(false, |limit| bodies.len() >= limit) {
            break;
        }
        let mut body = constructor();
        let pos = start + count;
        let remaining = length - count;
        let needed = match body.wire_length(buf, pos, remaining) {
            Some(0) => break,
            Some(needed) if needed <= remaining && pos + needed <= buf.len() => needed,
            needed => {
                debug!(code = typ,
                       ?needed,
                       remaining,
                       "discarding the rest of a multipart body");
                break;
            }
        };
        let mut sub = Cursor::new(&buf[pos..pos + needed]);
        match body.read_from(&mut sub, ctx) {
            Ok(()) => {}
            Err(OfpSerializationError::TruncatedInput(reason)) => {
                debug!(code = typ, %reason, "multipart body shorter than its type");
                break;
            }
            Err(err) => return Err(err),
        }
        bodies.push(body);
        count += needed;
    }

    bytes.set_position((start + length).min(buf.len()) as u64);
    Ok(bodies)
}

/// A multipart request or reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipartMessage {
    pub direction: Direction,
    pub xid: u32,
    pub typ: u16,
    pub flags: u16,
    pub bodies: Vec<MultipartBody>,
}

impl MultipartMessage {
    pub fn request(xid: u32, typ: MultipartType, bodies: Vec<MultipartBody>) -> MultipartMessage {
        MultipartMessage {
            direction: Direction::Request,
            xid,
            typ: typ as u16,
            flags: 0,
            bodies,
        }
    }

    pub fn reply(xid: u32, typ: MultipartType, bodies: Vec<MultipartBody>) -> MultipartMessage {
        MultipartMessage {
            direction: Direction::Reply,
            ..MultipartMessage::request(xid, typ, bodies)
        }
    }

    /// Whether further messages of this exchange follow.
    pub fn more(&self) -> bool {
        self.flags & OFPMPF_MORE != 0
    }
}

impl OfpMessage for MultipartMessage {
    fn size_of(msg: &MultipartMessage) -> usize {
        MULTIPART_HEADER_LENGTH + msg.bodies.iter().map(|b| b.length()).sum::<usize>()
    }

    fn parse(bytes: &mut Cursor<&[u8]>, ctx: &DecodeContext) -> Result<MultipartMessage> {
        let header = OfpHeader::parse(bytes)?;
        let direction = match header.type_code() {
            Some(MsgCode::MultipartReq) => Direction::Request,
            Some(MsgCode::MultipartResp) => Direction::Reply,
            other => {
                return Err(OfpSerializationError::MalformedHeader {
                    kind: "multipart",
                    reason: format!("message type {:?} is not a multipart message", other),
                })
            }
        };
        if header.length() < MULTIPART_HEADER_LENGTH {
            return Err(OfpSerializationError::MalformedHeader {
                kind: "multipart",
                reason: format!("length {} is shorter than the multipart header",
                                header.length()),
            });
        }
        let typ = bytes.read_u16::<BigEndian>()?;
        let flags = bytes.read_u16::<BigEndian>()?;
        skip_padding_bytes(bytes, 4)?;
        let bodies = parse_multipart_bodies(bytes,
                                            typ,
                                            header.length() - MULTIPART_HEADER_LENGTH,
                                            &ctx.with_direction(direction))?;
        Ok(MultipartMessage {
            direction,
            xid: header.xid(),
            typ,
            flags,
            bodies,
        })
    }

    fn marshal(msg: &MultipartMessage, bytes: &mut Vec<u8>) -> Result<()> {
        let code = match msg.direction {
            Direction::Request => MsgCode::MultipartReq,
            Direction::Reply => MsgCode::MultipartResp,
        };
        let length = length_u16("multipart", MultipartMessage::size_of(msg))?;
        let header = OfpHeader::new(OPENFLOW_0_04_VERSION, code as u8, length, msg.xid);
        OfpHeader::marshal(bytes, header)?;
        bytes.write_u16::<BigEndian>(msg.typ)?;
        bytes.write_u16::<BigEndian>(msg.flags)?;
        write_padding_bytes(bytes, 4)?;
        for body in &msg.bodies {
            body.write_to(bytes)?;
        }
        Ok(())
    }
}
