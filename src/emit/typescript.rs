//! TypeScript declaration backend.
//!
//! Produces one `.d.ts` file per entity plus a re-exporting `index.d.ts`
//! per module that still contains something relevant. Interface
//! dependencies become relative import statements; the core carrier
//! types come from the core module's index, which also carries the
//! hand-maintained prelude.

use std::collections::{BTreeSet, HashMap};

use super::{Backend, OutputSink};
use crate::error::Result;
use crate::graph::EntityNode;
use crate::idl::{
    self, leaf_name, namespace_of, AccumulationBody, ConstantGroupBody, ConstantValue, EnumBody,
    InterfaceBody, PolyStructBody, ServiceBody, SingletonBody, StructBody, TypedefBody,
};
use crate::parser;

/// Leaf names resolved through the core index rather than a
/// same-directory import.
const CORE_EXPORTS: &[&str] = &["Any", "Sequence", "Type", "XInterface"];

#[derive(Default)]
pub struct TypeScriptBackend {
    current: String,
    adjacent: BTreeSet<String>,
    /// Import dedup: one import statement per (file, binding).
    imported: HashMap<String, u32>,
}

impl TypeScriptBackend {
    pub fn new() -> Self {
        TypeScriptBackend::default()
    }

    /// Reference a named entity from the current file.
    fn render_name(&self, name: &str, buf: &mut String) {
        let namespace = namespace_of(name);
        let leaf = leaf_name(name);
        let through_core_index = namespace == idl::CORE_MODULE && CORE_EXPORTS.contains(&leaf);
        if namespace == namespace_of(&self.current) && !through_core_index {
            buf.push_str(leaf);
        } else if namespace == idl::CORE_MODULE {
            buf.push_str("core.");
            buf.push_str(leaf);
        } else {
            // The alias its own import statement binds.
            let alias = namespace.rsplit('.').next().unwrap_or(namespace);
            buf.push_str(alias);
            buf.push('.');
            buf.push_str(leaf_name(name));
        }
    }

    fn render_type(&self, reference: &str, buf: &mut String) -> Result<()> {
        let descriptor = parser::decompose(reference)?;
        let mut rank = descriptor.rank;
        // Escape hatches the generated code depends on: byte sequences
        // are binary buffers, property-bag sequences are plain records.
        let literal = if rank > 0 && descriptor.nucleus == "byte" {
            rank -= 1;
            Some("ArrayBuffer")
        } else if rank > 0 && descriptor.nucleus == idl::PROPERTY_BAG {
            rank -= 1;
            Some("Record<string, core.Any>")
        } else {
            None
        };
        for _ in 0..rank {
            buf.push_str("core.Sequence<");
        }
        match literal {
            Some(text) => buf.push_str(text),
            None if descriptor.is_entity => self.render_name(&descriptor.nucleus, buf),
            None => buf.push_str(translate_simple_type(&descriptor.nucleus)),
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
        "void" => "undefined",
        "boolean" => "boolean",
        "byte" | "short" | "unsigned short" | "long" | "unsigned long" | "float" | "double" => {
            "number"
        }
        "hyper" | "unsigned hyper" => "bigint",
        "char" | "string" => "string",
        "type" => "core.Type",
        "any" => "core.Any",
        other => other,
    }
}

fn constant_category(value: &ConstantValue) -> &'static str {
    match value {
        ConstantValue::Boolean(_) => "boolean",
        ConstantValue::Hyper(_) | ConstantValue::UnsignedHyper(_) => "bigint",
        _ => "number",
    }
}

impl Backend for TypeScriptBackend {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn entity_file(&self, fqn: &str) -> String {
        format!("typescript/{}.d.ts", fqn.replace('.', "/"))
    }

    fn begin_entity(
        &mut self,
        _out: &mut dyn OutputSink,
        fqn: &str,
        node: &EntityNode,
    ) -> Result<()> {
        self.current = fqn.to_string();
        self.adjacent = node.adjacent_interfaces.clone();
        Ok(())
    }

    fn write_interface_dependency(
        &mut self,
        out: &mut dyn OutputSink,
        dependent: &str,
        dependency: &str,
        _published: bool,
    ) -> Result<()> {
        // Adjacent interfaces can ask for a self-referencing import.
        if dependency == dependent {
            return Ok(());
        }
        let dependent_ns: Vec<&str> = namespace_of(dependent).split('.').collect();
        let dependency_ns: Vec<&str> = namespace_of(dependency).split('.').collect();
        let common = dependent_ns
            .iter()
            .zip(&dependency_ns)
            .take_while(|(a, b)| a == b)
            .count();
        let ups = dependent_ns.len() - common;
        let leaf = leaf_name(dependency);
        let same_dir =
            ups == 0 && common == dependency_ns.len() && !CORE_EXPORTS.contains(&leaf);
        let alias = dependency_ns.last().copied().unwrap_or_default();

        let binding = if same_dir { leaf } else { alias };
        let counter = self
            .imported
            .entry(format!("{dependent}_{binding}"))
            .or_insert(0);
        *counter += 1;
        if *counter != 1 {
            return Ok(());
        }

        if same_dir {
            out.write(&format!("import {{ {leaf} }} from './{leaf}';\n"))?;
            return Ok(());
        }
        if namespace_of(dependency) == namespace_of(dependent) {
            // A core carrier referenced from inside its own module.
            out.write(&format!("import * as {alias} from './';\n"))?;
            return Ok(());
        }
        let mut path = String::new();
        if ups == 0 {
            path.push_str("./");
        }
        for _ in 0..ups {
            path.push_str("../");
        }
        path.push_str(&dependency_ns[common..].join("/"));
        out.write(&format!("import * as {alias} from '{path}';\n"))?;
        Ok(())
    }

    fn write_enum(&mut self, out: &mut dyn OutputSink, fqn: &str, body: &EnumBody) -> Result<()> {
        let mut buf = String::new();
        buf.push_str("export declare enum ");
        buf.push_str(leaf_name(fqn));
        buf.push_str(" {\n");
        for member in &body.members {
            self.doc_line(&member.doc, &mut buf);
            buf.push_str(&member.name);
            buf.push_str(",\n");
        }
        buf.push_str("};\n");
        out.write(&buf)
    }

    fn write_plain_struct(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &StructBody,
    ) -> Result<()> {
        let mut buf = String::new();
        buf.push_str("export interface ");
        buf.push_str(leaf_name(fqn));
        if let Some(base) = &body.base {
            buf.push_str(" extends ");
            self.render_name(base, &mut buf);
        }
        buf.push_str(" {\n");
        for member in &body.members {
            self.doc_line(&member.doc, &mut buf);
            buf.push_str(&member.name);
            buf.push_str(": ");
            self.render_type(&member.ty, &mut buf)?;
            buf.push_str(",\n");
        }
        buf.push_str("}\n");
        out.write(&buf)
    }

    fn write_polymorphic_struct(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &PolyStructBody,
    ) -> Result<()> {
        let mut buf = String::new();
        buf.push_str("export type ");
        buf.push_str(leaf_name(fqn));
        buf.push('<');
        buf.push_str(&body.type_parameters.join(", "));
        buf.push_str("> = {\n");
        for member in &body.members {
            self.doc_line(&member.doc, &mut buf);
            buf.push_str(&member.name);
            buf.push_str(": ");
            if member.parameterized {
                buf.push_str(&member.ty);
            } else {
                self.render_type(&member.ty, &mut buf)?;
            }
            buf.push_str(";\n");
        }
        buf.push_str("};\n");
        out.write(&buf)
    }

    fn write_interface(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &InterfaceBody,
    ) -> Result<()> {
        let mut buf = String::new();
        buf.push_str("export interface ");
        buf.push_str(leaf_name(fqn));
        buf.push_str(" extends BaseType {\n");

        if !body.attributes.is_empty() {
            buf.push_str("properties: {\n");
            for attribute in &body.attributes {
                self.doc_line(&attribute.doc, &mut buf);
                if attribute.read_only {
                    buf.push_str("readonly ");
                }
                buf.push_str(&attribute.name);
                buf.push_str(": ");
                self.render_type(&attribute.ty, &mut buf)?;
                buf.push_str(";\n");
            }
            buf.push_str("} & (BaseType extends core.Service ? BaseType['properties'] : {}),\n");
        }

        for method in &body.methods {
            self.doc_line(&method.doc, &mut buf);
            buf.push_str(&method.name);
            if method.return_type == "any" {
                buf.push_str("<T extends core.Any = core.Any>");
            }
            buf.push('(');
            let mut has_out = false;
            let mut first = true;
            for parameter in &method.parameters {
                if parameter.direction.is_out() {
                    has_out = true;
                    continue;
                }
                if !first {
                    buf.push_str(", ");
                }
                first = false;
                buf.push_str(&parameter.name);
                buf.push_str(": ");
                self.render_type(&parameter.ty, &mut buf)?;
            }
            if has_out {
                if !first {
                    buf.push_str(", ");
                }
                buf.push_str("out: {");
                let mut first_out = true;
                for parameter in &method.parameters {
                    if !parameter.direction.is_out() {
                        continue;
                    }
                    if !first_out {
                        buf.push_str(", ");
                    }
                    first_out = false;
                    buf.push_str(&parameter.name);
                    buf.push_str(": ");
                    self.render_type(&parameter.ty, &mut buf)?;
                }
                buf.push('}');
            }
            buf.push_str("): ");
            match method.return_type.as_str() {
                "void" => buf.push_str("void"),
                "any" => buf.push('T'),
                other => self.render_type(other, &mut buf)?,
            }
            buf.push_str(";\n");
        }
        buf.push_str("}\n");

        if !body.optional_bases.is_empty() {
            buf.push_str("type OptionalBase = {\n");
            for base in &body.optional_bases {
                buf.push_str(&format!(
                    "/** Attempts to cast this object as `{}`, otherwise returns undefined */\n",
                    base.name
                ));
                buf.push_str(&format!("as(type: '{}'): ", base.name));
                self.render_name(&base.name, &mut buf);
                buf.push_str(" | undefined,\n");
            }
            buf.push_str("};\n");
        }

        let adjacent = self.adjacent.clone();
        if !adjacent.is_empty() {
            buf.push_str("type AdjacentBase = {\n");
            for name in &adjacent {
                buf.push_str(&format!(
                    "/** Attempts to cast this object as `{}`, otherwise returns undefined */\n",
                    name
                ));
                buf.push_str(&format!("as(type: '{}'): ", name));
                self.render_name(name, &mut buf);
                buf.push_str(" | undefined,\n");
            }
            buf.push_str("};\n");
        }

        buf.push_str("type BaseType = {}");
        for base in &body.mandatory_bases {
            buf.push_str("\n & ");
            self.render_name(&base.name, &mut buf);
        }
        if !body.optional_bases.is_empty() {
            buf.push_str("\n & OptionalBase");
        }
        if !adjacent.is_empty() {
            buf.push_str("\n & AdjacentBase");
        }
        buf.push_str(";\n");
        out.write(&buf)
    }

    fn write_typedef(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &TypedefBody,
    ) -> Result<()> {
        let mut buf = String::new();
        buf.push_str("export type ");
        buf.push_str(leaf_name(fqn));
        buf.push_str(" = ");
        self.render_type(&body.ty, &mut buf)?;
        buf.push_str(";\n");
        out.write(&buf)
    }

    fn write_constant_group(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &ConstantGroupBody,
    ) -> Result<()> {
        let mut buf = String::new();
        buf.push_str("export declare const ");
        buf.push_str(leaf_name(fqn));
        buf.push_str(": Readonly<{\n");
        for member in &body.members {
            self.doc_line(&member.doc, &mut buf);
            buf.push_str(&member.name);
            buf.push_str(": ");
            buf.push_str(constant_category(&member.value));
            buf.push_str(",\n");
        }
        buf.push_str("}>;\n");
        out.write(&buf)
    }

    fn write_single_interface_service(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &ServiceBody,
    ) -> Result<()> {
        let mut buf = String::new();
        buf.push_str("export interface ");
        buf.push_str(leaf_name(fqn));
        buf.push_str(" extends ");
        self.render_name(&body.base, &mut buf);
        buf.push_str(" {}\n");

        buf.push_str("export declare const ");
        buf.push_str(leaf_name(fqn));
        buf.push_str(": {\n");
        for constructor in &body.constructors {
            self.doc_line(&constructor.doc, &mut buf);
            buf.push_str(&constructor.name);
            buf.push('(');
            for (idx, parameter) in constructor.parameters.iter().enumerate() {
                if idx != 0 {
                    buf.push_str(", ");
                }
                if parameter.rest {
                    buf.push_str("...");
                }
                buf.push_str(&parameter.name);
                buf.push_str(": ");
                self.render_type(&parameter.ty, &mut buf)?;
            }
            buf.push_str("): ");
            buf.push_str(leaf_name(fqn));
            buf.push_str(",\n");
        }
        buf.push_str("};\n");
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
        let mut buf = String::new();
        buf.push_str("export interface ");
        buf.push_str(leaf_name(fqn));
        buf.push_str(" extends ");
        self.render_name(&body.base, &mut buf);
        buf.push_str(" {}\n");
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

    fn module_index_file(&self, module_fqn: &str) -> Option<String> {
        Some(format!(
            "typescript/{}/index.d.ts",
            module_fqn.replace('.', "/")
        ))
    }

    fn write_module_index(
        &mut self,
        out: &mut dyn OutputSink,
        module_fqn: &str,
        submodules: &[String],
        members: &[String],
    ) -> Result<()> {
        let mut buf = String::new();
        for submodule in submodules {
            buf.push_str(&format!(
                "export * as {submodule} from './{submodule}';\n"
            ));
        }
        for member in members {
            // The prelude below supplies the root interface itself.
            if module_fqn == idl::CORE_MODULE && member == "XInterface" {
                continue;
            }
            buf.push_str(&format!("export * from './{member}';\n"));
        }
        if module_fqn == "api" {
            buf.push_str("\nexport as namespace Api;\n");
        }
        if module_fqn == idl::CORE_MODULE {
            buf.push_str(CORE_PRELUDE);
        }
        out.write(&buf)
    }
}

/// Hand-maintained bootstrap for the core module: the carrier types the
/// generated declarations lean on.
const CORE_PRELUDE: &str = r#"
export interface Type {
  typeName: string;
}

export interface Service {
  properties: Record<string, any>;
}

/** base interface of all generated interfaces */
export interface XInterface {
  /**
   * Attempts to cast this object as `interface_`
   *
   * @param interface_ The qualified name of the interface type
   * @returns This object cast as `interface_` if supported, otherwise undefined
   */
  as<T extends XInterface>(interface_: string): T | undefined;
}
export declare const XInterface: unique symbol;

/** A primitive value, including Type and XInterface */
export type Primitive =
  | undefined
  | boolean
  | number
  | bigint
  | string
  | Type
  | XInterface
  | Record<string, any>;

/** An array of a single element type */
export type Sequence<T = Primitive> = T[];

/** Any primitive or sequence */
export type Any<T extends Sequence | Primitive = any> = T extends Sequence
  ? Sequence
  : T extends Primitive
  ? Primitive
  : never;
"#;
