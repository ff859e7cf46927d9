#![crate_name = "rust_oxm"]
#![crate_type = "lib"]

//! OpenFlow 1.3 wire codec: OXM match fields and the TLV element lists built on them.
//!
//! Every standalone wire structure implements `OfpMessage`, decoding against a
//! `DecodeContext` that carries the type registries. Element lists (actions, instructions,
//! queue properties, hello elements, meter bands, table-feature properties) share one
//! truncation-tolerant loop in `tlv`.

pub mod bits;
pub mod ofp_error;
pub mod ofp_header;
pub mod ofp_message;
pub mod oxm;
pub mod ofp_match;
pub mod packet;
pub mod registry;
pub mod tlv;
pub mod action;
pub mod instruction;
pub mod queue;
pub mod hello;
pub mod meter;
pub mod table_features;
pub mod multipart;

pub use crate::ofp_error::{OfpSerializationError, Result};
pub use crate::ofp_message::{DecodeContext, OfpMessage};
pub use crate::ofp_match::Match;
pub use crate::oxm::{OxmField, OxmFieldType, OxmValue};
pub use crate::registry::{Direction, Registries};
