//! Native bridge backend.
//!
//! Produces one C++ header per entity plus an aggregated `typemap.hxx`
//! with hash-keyed type lookup and the `as()` capability-cast helper.
//! Interface dependencies become namespace forward declarations, so the
//! legitimately circular parts of the interface graph compile.

use std::collections::{BTreeSet, HashMap};

use super::{Backend, OutputSink};
use crate::error::Result;
use crate::graph::{EntityGraph, EntityNode};
use crate::idl::{
    self, leaf_name, namespace_of, AccumulationBody, ConstantGroupBody, ConstantValue, DeclBody,
    EnumBody, EntityKind, InterfaceBody, Method, PolyStructBody, ServiceBody, SingletonBody,
    StructBody, TypedefBody,
};
use crate::parser;

#[derive(Default)]
pub struct NativeBackend {
    /// Interface references of the entity being written. Rendered as
    /// handles, so the forward declaration is all they need.
    interface_refs: BTreeSet<String>,
    /// Forward-declaration dedup, one per (file, dependency).
    declared: HashMap<String, u32>,
}

impl NativeBackend {
    pub fn new() -> Self {
        NativeBackend::default()
    }

    fn render_name(&self, name: &str, buf: &mut String) {
        buf.push_str("::");
        buf.push_str(&name.replace('.', "::"));
    }

    fn render_type(&self, reference: &str, buf: &mut String) -> Result<()> {
        let descriptor = parser::decompose(reference)?;
        let mut rank = descriptor.rank;
        // Same escape hatches as the declaration backend.
        let literal = if rank > 0 && descriptor.nucleus == "byte" {
            rank -= 1;
            Some("::bridge::ByteBuffer")
        } else if rank > 0 && descriptor.nucleus == idl::PROPERTY_BAG {
            rank -= 1;
            Some("::bridge::PropertyBag")
        } else {
            None
        };
        let handle = literal.is_none()
            && descriptor.is_entity
            && self.interface_refs.contains(&descriptor.nucleus);
        for _ in 0..rank {
            buf.push_str("::bridge::Sequence<");
        }
        if handle {
            buf.push_str("::bridge::Handle<");
        }
        match literal {
            Some(text) => buf.push_str(text),
            None if descriptor.is_entity => self.render_name(&descriptor.nucleus, buf),
            None => buf.push_str(translate_simple_type(&descriptor.nucleus)),
        }
        if handle {
            buf.push('>');
        }
        if !descriptor.type_arguments.is_empty() {
            buf.push('<');
            for (idx, argument) in descriptor.type_arguments.iter().enumerate() {
                if idx != 0 {
                    buf.push_str(", ");
                }
                self.render_type(argument, buf)?;
            }
            buf.push('>');
        }
        for _ in 0..rank {
            buf.push('>');
        }
        Ok(())
    }

    fn render_method(&self, method: &Method, buf: &mut String) -> Result<()> {
        buf.push_str("    virtual ");
        match method.return_type.as_str() {
            "void" => buf.push_str("void"),
            other => self.render_type(other, buf)?,
        }
        buf.push(' ');
        buf.push_str(&method.name);
        buf.push('(');
        for (idx, parameter) in method.parameters.iter().enumerate() {
            if idx != 0 {
                buf.push_str(", ");
            }
            self.render_type(&parameter.ty, buf)?;
            if parameter.direction.is_out() {
                buf.push('&');
            } else {
                buf.push_str(" const&");
            }
            buf.push(' ');
            buf.push_str(&parameter.name);
        }
        buf.push_str(") = 0;\n");
        Ok(())
    }

    fn open_namespace(&self, fqn: &str, buf: &mut String) {
        let namespace = namespace_of(fqn);
        if !namespace.is_empty() {
            buf.push_str("namespace ");
            buf.push_str(&namespace.replace('.', "::"));
            buf.push_str(" {\n\n");
        }
    }

    fn close_namespace(&self, fqn: &str, buf: &mut String) {
        if !namespace_of(fqn).is_empty() {
            buf.push_str("\n}\n");
        }
    }

    fn doc_line(&self, doc: &Option<String>, buf: &mut String) {
        if let Some(doc) = doc {
            buf.push_str("/** ");
            buf.push_str(doc);
            buf.push_str(" */\n");
        }
    }
}

fn translate_simple_type(name: &str) -> &str {
    match name {
        "void" => "void",
        "boolean" => "bool",
        "byte" => "std::int8_t",
        "short" => "std::int16_t",
        "unsigned short" => "std::uint16_t",
        "long" => "std::int32_t",
        "unsigned long" => "std::uint32_t",
        "hyper" => "std::int64_t",
        "unsigned hyper" => "std::uint64_t",
        "float" => "float",
        "double" => "double",
        "char" => "char16_t",
        "string" => "std::u16string",
        "type" => "::bridge::Type",
        "any" => "::bridge::Any",
        other => other,
    }
}

fn constant_type(value: &ConstantValue) -> &'static str {
    match value {
        ConstantValue::Boolean(_) => "bool",
        ConstantValue::Byte(_) => "std::int8_t",
        ConstantValue::Short(_) => "std::int16_t",
        ConstantValue::UnsignedShort(_) => "std::uint16_t",
        ConstantValue::Long(_) => "std::int32_t",
        ConstantValue::UnsignedLong(_) => "std::uint32_t",
        ConstantValue::Hyper(_) => "std::int64_t",
        ConstantValue::UnsignedHyper(_) => "std::uint64_t",
        ConstantValue::Float(_) => "float",
        ConstantValue::Double(_) => "double",
    }
}

fn constant_literal(value: &ConstantValue) -> String {
    match value {
        ConstantValue::Boolean(v) => v.to_string(),
        ConstantValue::Byte(v) => v.to_string(),
        ConstantValue::Short(v) => v.to_string(),
        ConstantValue::UnsignedShort(v) => v.to_string(),
        ConstantValue::Long(v) => v.to_string(),
        ConstantValue::UnsignedLong(v) => v.to_string(),
        ConstantValue::Hyper(v) => v.to_string(),
        ConstantValue::UnsignedHyper(v) => v.to_string(),
        ConstantValue::Float(v) => format!("{:?}", v),
        ConstantValue::Double(v) => format!("{:?}", v),
    }
}

/// Header path for an entity.
fn header_path(fqn: &str) -> String {
    format!("bridge/{}.hxx", fqn.replace('.', "/"))
}

/// Names used in base-class or alias position, where C++ needs the
/// complete type even when the reference is an interface.
fn base_references(body: &DeclBody) -> Vec<String> {
    match body {
        DeclBody::Interface(body) => {
            let mut bases: Vec<String> = body
                .mandatory_bases
                .iter()
                .chain(&body.optional_bases)
                .map(|base| base.name.clone())
                .collect();
            if body.mandatory_bases.is_empty() {
                // The implicit root base the interface writer falls back to.
                bases.push(idl::ROOT_INTERFACE.to_string());
            }
            bases
        }
        DeclBody::AccumulationService(body) => body
            .mandatory_base_services
            .iter()
            .chain(&body.optional_base_services)
            .chain(&body.mandatory_base_interfaces)
            .chain(&body.optional_base_interfaces)
            .map(|base| base.name.clone())
            .collect(),
        DeclBody::SingleInterfaceService(body) => vec![body.base.clone()],
        DeclBody::InterfaceSingleton(body) | DeclBody::ServiceSingleton(body) => {
            vec![body.base.clone()]
        }
        _ => Vec::new(),
    }
}

impl Backend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn entity_file(&self, fqn: &str) -> String {
        header_path(fqn)
    }

    fn begin_entity(
        &mut self,
        out: &mut dyn OutputSink,
        _fqn: &str,
        node: &EntityNode,
    ) -> Result<()> {
        self.interface_refs = node.interface_dependencies.clone();
        // Base positions need the complete type, unlike handle-rendered
        // references.
        let mut includes: BTreeSet<String> = node.dependencies.clone();
        includes.extend(base_references(&node.decl.body));
        let mut buf = String::new();
        buf.push_str("#pragma once\n#include <cstdint>\n#include <string>\n");
        // Resolved against the bridge output root, like every generated
        // include below.
        buf.push_str("#include \"runtime.hxx\"\n");
        for dependency in &includes {
            if dependency.contains('<') || dependency == node.fqn.as_str() {
                continue;
            }
            buf.push_str(&format!(
                "#include \"{}.hxx\"\n",
                dependency.replace('.', "/")
            ));
        }
        buf.push('\n');
        out.write(&buf)
    }

    fn write_interface_dependency(
        &mut self,
        out: &mut dyn OutputSink,
        dependent: &str,
        dependency: &str,
        _published: bool,
    ) -> Result<()> {
        if dependency == dependent {
            return Ok(());
        }
        let counter = self
            .declared
            .entry(format!("{dependent}_{dependency}"))
            .or_insert(0);
        *counter += 1;
        if *counter != 1 {
            return Ok(());
        }
        let namespace = namespace_of(dependency);
        if namespace.is_empty() {
            out.write(&format!("class {};\n", leaf_name(dependency)))
        } else {
            out.write(&format!(
                "namespace {} {{ class {}; }}\n",
                namespace.replace('.', "::"),
                leaf_name(dependency)
            ))
        }
    }

    fn write_enum(&mut self, out: &mut dyn OutputSink, fqn: &str, body: &EnumBody) -> Result<()> {
        let mut buf = self.begin_definition(fqn);
        buf.push_str("enum class ");
        buf.push_str(leaf_name(fqn));
        buf.push_str(" : std::int32_t {\n");
        for member in &body.members {
            self.doc_line(&member.doc, &mut buf);
            buf.push_str("    ");
            buf.push_str(&member.name);
            buf.push_str(&format!(" = {},\n", member.value));
        }
        buf.push_str("};\n");
        self.close_namespace(fqn, &mut buf);
        out.write(&buf)
    }

    fn write_plain_struct(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &StructBody,
    ) -> Result<()> {
        let mut buf = self.begin_definition(fqn);
        buf.push_str("struct ");
        buf.push_str(leaf_name(fqn));
        if let Some(base) = &body.base {
            buf.push_str(" : public ");
            self.render_name(base, &mut buf);
        }
        buf.push_str(" {\n");
        for member in &body.members {
            self.doc_line(&member.doc, &mut buf);
            buf.push_str("    ");
            self.render_type(&member.ty, &mut buf)?;
            buf.push(' ');
            buf.push_str(&member.name);
            buf.push_str(";\n");
        }
        buf.push_str("};\n");
        self.close_namespace(fqn, &mut buf);
        out.write(&buf)
    }

    fn write_polymorphic_struct(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &PolyStructBody,
    ) -> Result<()> {
        let mut buf = self.begin_definition(fqn);
        buf.push_str("template <");
        for (idx, parameter) in body.type_parameters.iter().enumerate() {
            if idx != 0 {
                buf.push_str(", ");
            }
            buf.push_str("typename ");
            buf.push_str(parameter);
        }
        buf.push_str(">\nstruct ");
        buf.push_str(leaf_name(fqn));
        buf.push_str(" {\n");
        for member in &body.members {
            self.doc_line(&member.doc, &mut buf);
            buf.push_str("    ");
            if member.parameterized {
                buf.push_str(&member.ty);
            } else {
                self.render_type(&member.ty, &mut buf)?;
            }
            buf.push(' ');
            buf.push_str(&member.name);
            buf.push_str(";\n");
        }
        buf.push_str("};\n");
        self.close_namespace(fqn, &mut buf);
        out.write(&buf)
    }

    fn write_interface(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &InterfaceBody,
    ) -> Result<()> {
        let mut buf = self.begin_definition(fqn);
        buf.push_str("class ");
        buf.push_str(leaf_name(fqn));
        if body.mandatory_bases.is_empty() {
            if fqn != idl::ROOT_INTERFACE {
                buf.push_str(" : public virtual ");
                self.render_name(idl::ROOT_INTERFACE, &mut buf);
            }
        } else {
            buf.push_str(" : ");
            for (idx, base) in body.mandatory_bases.iter().enumerate() {
                if idx != 0 {
                    buf.push_str(", ");
                }
                buf.push_str("public virtual ");
                self.render_name(&base.name, &mut buf);
            }
        }
        buf.push_str(" {\npublic:\n");
        for attribute in &body.attributes {
            self.doc_line(&attribute.doc, &mut buf);
            buf.push_str("    virtual ");
            self.render_type(&attribute.ty, &mut buf)?;
            buf.push_str(&format!(" get{}() = 0;\n", attribute.name));
            if !attribute.read_only {
                buf.push_str("    virtual void ");
                buf.push_str(&format!("set{}(", attribute.name));
                self.render_type(&attribute.ty, &mut buf)?;
                buf.push_str(" const& value) = 0;\n");
            }
        }
        for method in &body.methods {
            self.doc_line(&method.doc, &mut buf);
            self.render_method(method, &mut buf)?;
        }
        buf.push_str("};\n");
        self.close_namespace(fqn, &mut buf);
        out.write(&buf)
    }

    fn write_typedef(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &TypedefBody,
    ) -> Result<()> {
        let mut buf = self.begin_definition(fqn);
        buf.push_str("using ");
        buf.push_str(leaf_name(fqn));
        buf.push_str(" = ");
        self.render_type(&body.ty, &mut buf)?;
        buf.push_str(";\n");
        self.close_namespace(fqn, &mut buf);
        out.write(&buf)
    }

    fn write_constant_group(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &ConstantGroupBody,
    ) -> Result<()> {
        let mut buf = self.begin_definition(fqn);
        buf.push_str("namespace ");
        buf.push_str(leaf_name(fqn));
        buf.push_str(" {\n");
        for member in &body.members {
            self.doc_line(&member.doc, &mut buf);
            buf.push_str("inline constexpr ");
            buf.push_str(constant_type(&member.value));
            buf.push(' ');
            buf.push_str(&member.name);
            buf.push_str(" = ");
            buf.push_str(&constant_literal(&member.value));
            buf.push_str(";\n");
        }
        buf.push_str("}\n");
        self.close_namespace(fqn, &mut buf);
        out.write(&buf)
    }

    fn write_single_interface_service(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &ServiceBody,
    ) -> Result<()> {
        let mut buf = self.begin_definition(fqn);
        buf.push_str("// service constructed as its base interface\n");
        buf.push_str("using ");
        buf.push_str(leaf_name(fqn));
        buf.push_str(" = ");
        self.render_name(&body.base, &mut buf);
        buf.push_str(";\n");
        self.close_namespace(fqn, &mut buf);
        out.write(&buf)
    }

    fn write_accumulation_service(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &AccumulationBody,
    ) -> Result<()> {
        let synthesized = body.as_interface();
        self.write_interface(out, fqn, &synthesized)?;
        out.write("// accumulated service, declarations for reference only\n")
    }

    fn write_interface_singleton(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &SingletonBody,
    ) -> Result<()> {
        let mut buf = self.begin_definition(fqn);
        buf.push_str("using ");
        buf.push_str(leaf_name(fqn));
        buf.push_str(" = ");
        self.render_name(&body.base, &mut buf);
        buf.push_str(";\n");
        self.close_namespace(fqn, &mut buf);
        out.write(&buf)
    }

    fn write_service_singleton(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &SingletonBody,
    ) -> Result<()> {
        self.write_interface_singleton(out, fqn, body)
    }

    fn finish(
        &mut self,
        out: &mut dyn OutputSink,
        graph: &EntityGraph,
        sorted: &[String],
    ) -> Result<()> {
        let mut interfaces = Vec::new();
        let mut structs = Vec::new();
        let mut enums = Vec::new();
        for fqn in sorted {
            let Some(node) = graph.get(fqn) else {
                continue;
            };
            if !node.relevant {
                continue;
            }
            match node.kind() {
                EntityKind::Interface => interfaces.push(fqn.clone()),
                EntityKind::PlainStruct => structs.push(fqn.clone()),
                EntityKind::Enum => enums.push(fqn.clone()),
                _ => continue,
            }
        }

        out.create("bridge/typemap.hxx")?;
        let mut buf = String::new();
        buf.push_str("#pragma once\n#include <cstdint>\n#include <string_view>\n\n");
        for fqn in interfaces.iter().chain(&structs).chain(&enums) {
            buf.push_str(&format!("#include \"{}.hxx\"\n", fqn.replace('.', "/")));
        }
        buf.push_str(
            r#"
namespace bridge {

// djb2 hash
constexpr std::uint32_t hash(const std::string_view key) {
    std::uint32_t hash = 5381;
    for (const auto& e : key)
        hash = ((hash << 5) + hash) + e;
    return hash;
}

inline const TypeDescription* interfaceType(std::uint32_t type_hash) {
    switch (type_hash) {
"#,
        );
        for fqn in &interfaces {
            buf.push_str(&format!("    case hash(\"{fqn}\"): "));
            buf.push_str(&format!(
                "return typeOf<::{}>();\n",
                fqn.replace('.', "::")
            ));
        }
        buf.push_str(
            r#"    }
    return nullptr;
}

inline const TypeDescription* enumType(std::uint32_t type_hash) {
    switch (type_hash) {
"#,
        );
        for fqn in &enums {
            buf.push_str(&format!("    case hash(\"{fqn}\"): "));
            buf.push_str(&format!(
                "return typeOf<::{}>();\n",
                fqn.replace('.', "::")
            ));
        }
        buf.push_str(
            r#"    }
    return nullptr;
}

inline const TypeDescription* structType(std::uint32_t type_hash) {
    switch (type_hash) {
"#,
        );
        for fqn in &structs {
            buf.push_str(&format!("    case hash(\"{fqn}\"): "));
            buf.push_str(&format!(
                "return typeOf<::{}>();\n",
                fqn.replace('.', "::")
            ));
        }
        buf.push_str(
            r#"    }
    return nullptr;
}

inline void* as(void* object, const char* type_name, int type_name_len) {
    if (!object) return nullptr;
    auto* type_desc = interfaceType(hash(std::string_view(type_name, type_name_len)));
    if (!type_desc) return nullptr;
    return queryInterface(object, type_desc);
}

} // namespace bridge
"#,
        );
        out.write(&buf)?;
        out.close()
    }
}

impl NativeBackend {
    /// Namespace opener for a definition.
    fn begin_definition(&self, fqn: &str) -> String {
        let mut buf = String::new();
        self.open_namespace(fqn, &mut buf);
        buf
    }
}
