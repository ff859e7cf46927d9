//! Code to constructor tables for every TLV element family.
//!
//! Registries are plain values: build them once, then share them read-only through a
//! `DecodeContext`. `Registries::standard()` is the process-wide OpenFlow 1.3 set.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::action::Action;
use crate::hello::HelloElement;
use crate::instruction::Instruction;
use crate::meter::MeterBand;
use crate::multipart::MultipartBody;
use crate::ofp_error::{OfpSerializationError, Result};
use crate::oxm::FieldCatalog;
use crate::queue::QueueProperty;
use crate::table_features::TableFeatureProperty;

/// Which side of a multipart exchange a body belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Request,
    Reply,
}

/// Maps wire codes of one element family to zero-value constructors.
#[derive(Debug)]
pub struct TypeRegistry<T> {
    kind: &'static str,
    constructors: HashMap<u16, fn() -> T>,
}

impl<T> TypeRegistry<T> {
    pub fn new(kind: &'static str) -> TypeRegistry<T> {
        TypeRegistry {
            kind,
            constructors: HashMap::new(),
        }
    }

    /// Name of the element family, used in errors and logs.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Map `code` to `constructor`. Registering a code again replaces its constructor.
    pub fn register(&mut self, code: u16, constructor: fn() -> T) -> &mut TypeRegistry<T> {
        self.constructors.insert(code, constructor);
        self
    }

    pub fn unregister(&mut self, code: u16) -> Option<fn() -> T> {
        self.constructors.remove(&code)
    }

    pub fn resolve(&self, code: u16) -> Result<fn() -> T> {
        self.constructors
            .get(&code)
            .copied()
            .ok_or(OfpSerializationError::UnknownElementType {
                kind: self.kind,
                code,
            })
    }

    /// A zero value of the type registered for `code`.
    pub fn instantiate(&self, code: u16) -> Result<T> {
        self.resolve(code).map(|constructor| constructor())
    }

    pub fn contains(&self, code: u16) -> bool {
        self.constructors.contains_key(&code)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

/// Multipart bodies keyed by both code and direction.
#[derive(Debug)]
pub struct MultipartRegistry {
    pub request: TypeRegistry<MultipartBody>,
    pub reply: TypeRegistry<MultipartBody>,
}

impl MultipartRegistry {
    pub fn new() -> MultipartRegistry {
        MultipartRegistry {
            request: TypeRegistry::new("multipart request"),
            reply: TypeRegistry::new("multipart reply"),
        }
    }

    pub fn side(&self, direction: Direction) -> &TypeRegistry<MultipartBody> {
        match direction {
            Direction::Request => &self.request,
            Direction::Reply => &self.reply,
        }
    }

    pub fn side_mut(&mut self, direction: Direction) -> &mut TypeRegistry<MultipartBody> {
        match direction {
            Direction::Request => &mut self.request,
            Direction::Reply => &mut self.reply,
        }
    }

    pub fn resolve(&self, code: u16, direction: Direction) -> Result<fn() -> MultipartBody> {
        self.side(direction).resolve(code)
    }
}

impl Default for MultipartRegistry {
    fn default() -> MultipartRegistry {
        MultipartRegistry::new()
    }
}

/// The OXM field catalog together with one registry per TLV element family.
#[derive(Debug)]
pub struct Registries {
    pub fields: FieldCatalog,
    pub actions: TypeRegistry<Action>,
    pub instructions: TypeRegistry<Instruction>,
    pub queue_properties: TypeRegistry<QueueProperty>,
    pub hello_elements: TypeRegistry<HelloElement>,
    pub meter_bands: TypeRegistry<MeterBand>,
    pub table_feature_properties: TypeRegistry<TableFeatureProperty>,
    pub multipart: MultipartRegistry,
}

impl Registries {
    /// A fresh set holding every OpenFlow 1.3 type this crate knows.
    pub fn openflow13() -> Registries {
        Registries {
            fields: FieldCatalog::openflow_basic(),
            actions: Action::standard_types(),
            instructions: Instruction::standard_types(),
            queue_properties: QueueProperty::standard_types(),
            hello_elements: HelloElement::standard_types(),
            meter_bands: MeterBand::standard_types(),
            table_feature_properties: TableFeatureProperty::standard_types(),
            multipart: MultipartBody::standard_types(),
        }
    }

    /// The shared OpenFlow 1.3 set, built on first use.
    pub fn standard() -> &'static Registries {
        static STANDARD: OnceLock<Registries> = OnceLock::new();
        STANDARD.get_or_init(Registries::openflow13)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn unregistered_codes_fail_to_resolve() {
        let mut registry: TypeRegistry<u32> = TypeRegistry::new("sample");
        registry.register(1, || 10).register(2, || 20);
        assert_eq!(registry.instantiate(2).unwrap(), 20);
        match registry.resolve(3) {
            Err(OfpSerializationError::UnknownElementType { kind: "sample", code: 3 }) => {}
            other => panic!("expected an unknown element, got {:?}", other.map(|f| f())),
        }
    }

    #[test]
    fn registering_a_code_again_replaces_it() {
        let mut registry: TypeRegistry<u32> = TypeRegistry::new("sample");
        registry.register(1, || 10);
        registry.register(1, || 11);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.instantiate(1).unwrap(), 11);
        assert!(registry.unregister(1).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn multipart_sides_are_independent() {
        let registries = Registries::openflow13();
        // Descriptions are requested with an empty body and answered with strings.
        let request = registries.multipart.resolve(0, Direction::Request).unwrap()();
        let reply = registries.multipart.resolve(0, Direction::Reply).unwrap()();
        assert_ne!(request, reply);
        // Port descriptions only have a request shape.
        assert!(registries.multipart.resolve(13, Direction::Request).is_ok());
        assert!(registries.multipart.resolve(13, Direction::Reply).is_err());
    }

    #[test]
    fn standard_set_is_shared_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| thread::spawn(|| Registries::standard() as *const Registries as usize))
            .collect();
        let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(Registries::standard().fields.len(), 40);
    }
}
