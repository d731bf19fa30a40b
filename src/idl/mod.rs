//! The declaration model.
//!
//! Defines entity kinds, the per-kind declaration payloads a provider
//! hands out, and helpers for working with dotted fully-qualified names.

use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Well-Known Names ───────────────────────────────────────────────────────
//
// The core namespace carries the types every generated binding can lean on.
// Type rendering and dependency extraction special-case them.

/// Root interface every other interface ultimately derives from.
pub const ROOT_INTERFACE: &str = "api.core.XInterface";
/// Carrier for array-ranked types.
pub const SEQUENCE_TYPE: &str = "api.core.Sequence";
/// Runtime type descriptor.
pub const TYPE_TYPE: &str = "api.core.Type";
/// The dynamically-typed value carrier.
pub const ANY_TYPE: &str = "api.core.Any";
/// The core module itself.
pub const CORE_MODULE: &str = "api.core";
/// The property-bag struct: a sequence of these is rendered as a
/// structural record of name to Any in every backend.
pub const PROPERTY_BAG: &str = "api.beans.PropertyValue";

/// Polymorphic-struct instantiations over the legacy event-listener
/// interface have no counterpart in either output notation. They are
/// matched by this literal suffix and forced out of the output set
/// instead of aborting the run, since most scopes never reach them.
pub fn is_legacy_listener_instantiation(fqn: &str) -> bool {
    fqn.contains('<') && fqn.ends_with("XEventListener>")
}

/// Index of the dot separating namespace and leaf. Dots inside a type
/// argument list belong to the instantiated name, not the namespace.
fn leaf_split(fqn: &str) -> Option<usize> {
    let head = match fqn.find('<') {
        Some(open) => &fqn[..open],
        None => fqn,
    };
    head.rfind('.')
}

/// Last dot-separated segment of a fully-qualified name.
pub fn leaf_name(fqn: &str) -> &str {
    match leaf_split(fqn) {
        Some(idx) => &fqn[idx + 1..],
        None => fqn,
    }
}

/// Everything before the last dot-separated segment ("" for a bare name).
pub fn namespace_of(fqn: &str) -> &str {
    match leaf_split(fqn) {
        Some(idx) => &fqn[..idx],
        None => "",
    }
}

// ─── Entity Kinds ───────────────────────────────────────────────────────────

/// The declaration category of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A namespace node; never a code-generation target itself.
    Module,
    /// An enumeration of named integer values.
    Enum,
    /// A record type with typed members and an optional base.
    PlainStruct,
    /// A generic record template with named type parameters.
    PolymorphicStructTemplate,
    /// An error record; excluded from generated bindings.
    Exception,
    /// A set of attributes and methods behind a handle.
    Interface,
    /// An alias for another type reference.
    Typedef,
    /// A group of named literal constants.
    ConstantGroup,
    /// A constructible service backed by one interface.
    SingleInterfaceService,
    /// A legacy service accumulated from bases and properties.
    AccumulationService,
    /// A singleton instance of an interface.
    InterfaceSingleton,
    /// A singleton instance of a service.
    ServiceSingleton,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Module => write!(f, "module"),
            EntityKind::Enum => write!(f, "enum"),
            EntityKind::PlainStruct => write!(f, "plain_struct"),
            EntityKind::PolymorphicStructTemplate => write!(f, "polymorphic_struct_template"),
            EntityKind::Exception => write!(f, "exception"),
            EntityKind::Interface => write!(f, "interface"),
            EntityKind::Typedef => write!(f, "typedef"),
            EntityKind::ConstantGroup => write!(f, "constant_group"),
            EntityKind::SingleInterfaceService => write!(f, "single_interface_service"),
            EntityKind::AccumulationService => write!(f, "accumulation_service"),
            EntityKind::InterfaceSingleton => write!(f, "interface_singleton"),
            EntityKind::ServiceSingleton => write!(f, "service_singleton"),
        }
    }
}

// ─── Declarations ───────────────────────────────────────────────────────────

/// A declaration as handed out by an entity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declaration {
    /// Whether the source marks this as a stable/public declaration.
    #[serde(default)]
    pub published: bool,
    /// Documentation comment carried into the generated output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(flatten)]
    pub body: DeclBody,
}

impl Declaration {
    /// Synthesize a module placeholder.
    pub fn module() -> Self {
        Declaration {
            published: false,
            doc: None,
            body: DeclBody::Module,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match &self.body {
            DeclBody::Module => EntityKind::Module,
            DeclBody::Enum(_) => EntityKind::Enum,
            DeclBody::PlainStruct(_) => EntityKind::PlainStruct,
            DeclBody::PolymorphicStructTemplate(_) => EntityKind::PolymorphicStructTemplate,
            DeclBody::Exception(_) => EntityKind::Exception,
            DeclBody::Interface(_) => EntityKind::Interface,
            DeclBody::Typedef(_) => EntityKind::Typedef,
            DeclBody::ConstantGroup(_) => EntityKind::ConstantGroup,
            DeclBody::SingleInterfaceService(_) => EntityKind::SingleInterfaceService,
            DeclBody::AccumulationService(_) => EntityKind::AccumulationService,
            DeclBody::InterfaceSingleton(_) => EntityKind::InterfaceSingleton,
            DeclBody::ServiceSingleton(_) => EntityKind::ServiceSingleton,
        }
    }

    pub fn is_module(&self) -> bool {
        matches!(self.body, DeclBody::Module)
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.body, DeclBody::Interface(_))
    }

    pub fn is_exception(&self) -> bool {
        matches!(self.body, DeclBody::Exception(_))
    }
}

/// Per-kind declaration payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeclBody {
    Module,
    Enum(EnumBody),
    PlainStruct(StructBody),
    PolymorphicStructTemplate(PolyStructBody),
    Exception(StructBody),
    Interface(InterfaceBody),
    Typedef(TypedefBody),
    ConstantGroup(ConstantGroupBody),
    SingleInterfaceService(ServiceBody),
    AccumulationService(AccumulationBody),
    InterfaceSingleton(SingletonBody),
    ServiceSingleton(SingletonBody),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumBody {
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    pub value: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// Shared by plain structs and exceptions: an optional base plus members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default)]
    pub members: Vec<Field>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolyStructBody {
    pub type_parameters: Vec<String>,
    #[serde(default)]
    pub members: Vec<PolyField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolyField {
    pub name: String,
    /// A type reference, or a bare type-parameter name when `parameterized`.
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub parameterized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceBody {
    #[serde(default)]
    pub mandatory_bases: Vec<BaseRef>,
    #[serde(default)]
    pub optional_bases: Vec<BaseRef>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub methods: Vec<Method>,
}

/// An annotated reference to a base interface or service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub bound: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub return_type: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Exception FQNs the method may raise.
    #[serde(default)]
    pub exceptions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    In,
    Out,
    Inout,
}

impl Direction {
    pub fn is_out(self) -> bool {
        matches!(self, Direction::Out | Direction::Inout)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedefBody {
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantGroupBody {
    pub members: Vec<Constant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub value: ConstantValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// A literal constant value, tagged with its declared primitive type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConstantValue {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    UnsignedShort(u16),
    Long(i32),
    UnsignedLong(u32),
    Hyper(i64),
    UnsignedHyper(u64),
    Float(f32),
    Double(f64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceBody {
    /// The interface the service is constructed as.
    pub base: String,
    #[serde(default)]
    pub constructors: Vec<Constructor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constructor {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<CtorParameter>,
    #[serde(default)]
    pub exceptions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtorParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    /// A trailing rest parameter accepting any number of arguments.
    #[serde(default)]
    pub rest: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccumulationBody {
    #[serde(default)]
    pub mandatory_base_services: Vec<BaseRef>,
    #[serde(default)]
    pub optional_base_services: Vec<BaseRef>,
    #[serde(default)]
    pub mandatory_base_interfaces: Vec<BaseRef>,
    #[serde(default)]
    pub optional_base_interfaces: Vec<BaseRef>,
    #[serde(default)]
    pub properties: Vec<Attribute>,
}

impl AccumulationBody {
    /// View the accumulated service as a plain interface: every mandatory
    /// base becomes a mandatory interface base, every optional base an
    /// optional one, and the properties become attributes. Backends reuse
    /// their interface writer on the result.
    pub fn as_interface(&self) -> InterfaceBody {
        let mut mandatory: Vec<BaseRef> = self.mandatory_base_interfaces.clone();
        mandatory.extend(self.mandatory_base_services.iter().cloned());
        let mut optional: Vec<BaseRef> = self.optional_base_interfaces.clone();
        optional.extend(self.optional_base_services.iter().cloned());
        InterfaceBody {
            mandatory_bases: mandatory,
            optional_bases: optional,
            attributes: self.properties.clone(),
            methods: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingletonBody {
    pub base: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fqn_helpers() {
        assert_eq!(leaf_name("api.core.XInterface"), "XInterface");
        assert_eq!(namespace_of("api.core.XInterface"), "api.core");
        assert_eq!(leaf_name("Point"), "Point");
        assert_eq!(namespace_of("Point"), "");
        assert_eq!(
            leaf_name("api.beans.Optional<api.draw.Point>"),
            "Optional<api.draw.Point>"
        );
        assert_eq!(namespace_of("api.beans.Optional<api.draw.Point>"), "api.beans");
    }

    #[test]
    fn test_declaration_round_trip() {
        let json = r#"{
            "published": true,
            "kind": "interface",
            "mandatory_bases": [{"name": "api.core.XInterface"}],
            "methods": [{
                "name": "draw",
                "return_type": "void",
                "parameters": [{"name": "shape", "type": "api.draw.Shape"}]
            }]
        }"#;
        let decl: Declaration = serde_json::from_str(json).unwrap();
        assert!(decl.published);
        assert_eq!(decl.kind(), EntityKind::Interface);
        match &decl.body {
            DeclBody::Interface(body) => {
                assert_eq!(body.mandatory_bases[0].name, "api.core.XInterface");
                assert_eq!(body.methods[0].parameters[0].direction, Direction::In);
            }
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn test_constant_value_tagging() {
        let json = r#"{"name": "MAX", "value": {"type": "hyper", "value": 42}}"#;
        let constant: Constant = serde_json::from_str(json).unwrap();
        assert_eq!(constant.value, ConstantValue::Hyper(42));
    }

    #[test]
    fn test_accumulation_as_interface() {
        let body = AccumulationBody {
            mandatory_base_services: vec![BaseRef {
                name: "api.text.TextService".into(),
                doc: None,
            }],
            optional_base_services: vec![],
            mandatory_base_interfaces: vec![BaseRef {
                name: "api.text.XText".into(),
                doc: None,
            }],
            optional_base_interfaces: vec![],
            properties: vec![Attribute {
                name: "Width".into(),
                ty: "long".into(),
                read_only: false,
                bound: false,
                doc: None,
            }],
        };
        let iface = body.as_interface();
        assert_eq!(iface.mandatory_bases.len(), 2);
        assert_eq!(iface.mandatory_bases[0].name, "api.text.XText");
        assert_eq!(iface.attributes.len(), 1);
        assert!(iface.methods.is_empty());
    }

    #[test]
    fn test_legacy_listener_instantiation() {
        assert!(is_legacy_listener_instantiation(
            "api.events.MaybeListener<api.lang.XEventListener>"
        ));
        assert!(!is_legacy_listener_instantiation("api.lang.XEventListener"));
        assert!(!is_legacy_listener_instantiation(
            "api.beans.Optional<long>"
        ));
    }
}
