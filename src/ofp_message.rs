use std::io::Cursor;

use crate::ofp_error::Result;
use crate::registry::{Direction, Registries};

/// Wildcard port number: "any port".
pub const OFPP_ANY: u32 = 0xffff_ffff;

/// How a match decode reacts to an OXM header the catalog does not know.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnknownFieldPolicy {
    /// Skip the field using the header's declared length.
    Skip,
    /// Fail with `UnknownFieldType`.
    Reject,
}

/// Per-call decode configuration.
#[derive(Copy, Clone, Debug)]
pub struct DecodeContext<'a> {
    pub registries: &'a Registries,
    /// Request/reply discriminant for multipart bodies decoded without their message header.
    pub direction: Option<Direction>,
    /// Ingress port recorded when a match is derived from a raw frame.
    pub in_port: u32,
    pub unknown_fields: UnknownFieldPolicy,
    /// Maximum number of elements a TLV list decode collects.
    pub element_limit: Option<usize>,
}

impl<'a> DecodeContext<'a> {
    pub fn new(registries: &'a Registries) -> DecodeContext<'a> {
        DecodeContext {
            registries,
            direction: None,
            in_port: OFPP_ANY,
            unknown_fields: UnknownFieldPolicy::Skip,
            element_limit: None,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> DecodeContext<'a> {
        self.direction = Some(direction);
        self
    }

    pub fn with_in_port(mut self, in_port: u32) -> DecodeContext<'a> {
        self.in_port = in_port;
        self
    }

    pub fn with_unknown_fields(mut self, policy: UnknownFieldPolicy) -> DecodeContext<'a> {
        self.unknown_fields = policy;
        self
    }

    pub fn with_element_limit(mut self, limit: usize) -> DecodeContext<'a> {
        self.element_limit = Some(limit);
        self
    }
}

impl Default for DecodeContext<'static> {
    fn default() -> DecodeContext<'static> {
        DecodeContext::new(Registries::standard())
    }
}

/// OpenFlow Message
///
/// Byte-buffer level API shared by every structure that can stand on its own on the wire:
/// OXM fields, matches, queues, and whole messages.
pub trait OfpMessage: Sized {
    /// Return the byte-size of an `OfpMessage`, including any trailing padding.
    fn size_of(msg: &Self) -> usize;
    /// Read a value starting at the cursor, leaving the cursor just past it.
    fn parse(bytes: &mut Cursor<&[u8]>, ctx: &DecodeContext) -> Result<Self>;
    /// Append the wire form of `msg` to `bytes`.
    fn marshal(msg: &Self, bytes: &mut Vec<u8>) -> Result<()>;

    /// Decode a value from the front of `buf`, returning it with the number of bytes consumed.
    fn decode(buf: &[u8], ctx: &DecodeContext) -> Result<(Self, usize)> {
        let mut bytes = Cursor::new(buf);
        let msg = Self::parse(&mut bytes, ctx)?;
        Ok((msg, bytes.position() as usize))
    }

    /// Return a fresh buffer holding the wire form of `msg`.
    fn encode(msg: &Self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(Self::size_of(msg));
        Self::marshal(msg, &mut bytes)?;
        Ok(bytes)
    }
}
