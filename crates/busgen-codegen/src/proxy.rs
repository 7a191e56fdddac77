//! Client proxy generation
//!
//! For every exported object the emitter writes, in this order:
//!
//! - a wrapper struct `<Type>Proxy` embedding the implementer and `proxy.Object`
//! - a constructor `New<Type>Proxy(conn, serviceName)` bound to the export path
//! - the implementer `interface<Type>` with the identity accessors
//! - property accessors, then signal subscriptions, then method call pairs
//!
//! Member order is taken as-is from the classified type.

use crate::config::CodegenConfig;
use crate::error::{CodegenError, Result};
use crate::source::{SourceBody, SourceFile};
use crate::Codegen;
use busgen_core::{Arg, ClassifiedType, Method, Property, Signal, TypeShape};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Identifiers the generated bodies use; arguments are renamed around them
const RESERVED_NAMES: &[&str] = &[
    "v", "p", "cb", "cb0", "flags", "ch", "call", "err", "obj", "rule", "sigRule",
    "handlerFunc", "sig", "value", "hasValue", "zero", "conn", "serviceName", "errors", "fmt",
    "unsafe", "dbus", "dbusutil", "proxy",
];

/// A classified type together with the identity it is exported under
#[derive(Debug, Clone, Serialize)]
pub struct ExportedObject {
    pub classified: ClassifiedType,
    pub export_path: String,
    pub interface_name: String,
}

/// Everything emitted into one generated file
#[derive(Debug, Clone, Serialize)]
pub struct ProxyUnit {
    pub package: String,
    pub objects: Vec<ExportedObject>,
}

pub struct ProxyEmitter {
    config: CodegenConfig,
}

impl Default for ProxyEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyEmitter {
    pub fn new() -> Self {
        Self {
            config: CodegenConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CodegenConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    fn write_guard(&self, body: &mut SourceBody) {
        body.line("/* prevent compile error */");
        body.line("var _ = errors.New");
        body.line("var _ dbusutil.SignalHandlerId");
        body.line("var _ = fmt.Sprintf");
        body.line("var _ unsafe.Pointer");
    }

    fn write_object(&self, body: &mut SourceBody, object: &ExportedObject) {
        let type_name = &object.classified.type_name;
        let implementer = implementer_name(type_name);
        debug!("emitting proxy for {} ({})", type_name, object.interface_name);
        if object.interface_name.is_empty() {
            warn!("{} is exported without an interface name", type_name);
        }

        self.write_wrapper(body, object, &implementer);
        write_implementer(body, object, &implementer);
        for property in &object.classified.properties {
            self.write_property(body, type_name, &implementer, property);
        }
        for signal in &object.classified.signals {
            write_signal(body, &implementer, signal);
        }
        for method in &object.classified.methods {
            write_method(body, &implementer, method);
        }
    }

    fn write_wrapper(&self, body: &mut SourceBody, object: &ExportedObject, implementer: &str) {
        let wrapper = self.config.wrapper_name(&object.classified.type_name);

        body.blank();
        body.open(format!("type {} struct {{", wrapper));
        body.line(format!("{} // interface {}", implementer, object.interface_name));
        body.line("proxy.Object");
        body.close("}");

        body.blank();
        body.open(format!(
            "func New{}(conn *dbus.Conn, serviceName string) *{} {{",
            wrapper, wrapper
        ));
        body.line(format!("obj := new({})", wrapper));
        body.line(format!(
            "obj.Object.Init_(conn, serviceName, {})",
            go_quote(&object.export_path)
        ));
        body.line("return obj");
        body.close("}");
    }

    fn write_property(
        &self,
        body: &mut SourceBody,
        type_name: &str,
        implementer: &str,
        property: &Property,
    ) {
        body.blank();
        body.line(format!("// property {} {}", property.name, property.ty));

        let accessor = match property.shape {
            TypeShape::Scalar(kind) => Some(format!("proxy.Prop{}", kind.accessor_name())),
            TypeShape::ScalarSlice(kind) => {
                Some(format!("proxy.Prop{}Array", kind.accessor_name()))
            }
            TypeShape::Other => None,
        };
        if let Some(accessor) = accessor {
            body.blank();
            body.open(format!(
                "func (v *{}) {}() {} {{",
                implementer, property.name, accessor
            ));
            body.open(format!("return {}{{", accessor));
            body.line("Impl: v,");
            body.line(format!("Name: {},", go_quote(&property.name)));
            body.close("}");
            body.close("}");
            return;
        }

        let prop_type = format!("prop{}{}", type_name, property.name);
        let value_type = property.ty.to_string();
        let name = go_quote(&property.name);

        body.blank();
        body.open(format!(
            "func (v *{}) {}() {} {{",
            implementer, property.name, prop_type
        ));
        body.open(format!("return {}{{", prop_type));
        body.line("Impl: v,");
        body.close("}");
        body.close("}");

        body.blank();
        body.open(format!("type {} struct {{", prop_type));
        body.line("Impl proxy.Implementer");
        body.close("}");

        if self.config.is_readable(&property.name) {
            body.blank();
            body.open(format!(
                "func (p {}) Get(flags dbus.Flags) (value {}, err error) {{",
                prop_type, value_type
            ));
            body.line(format!(
                "err = p.Impl.GetObject_().GetProperty_(flags, p.Impl.GetInterfaceName_(), {}, &value)",
                name
            ));
            body.line("return");
            body.close("}");
        }

        if self.config.is_writable(&property.name) {
            body.blank();
            body.open(format!(
                "func (p {}) Set(flags dbus.Flags, value {}) error {{",
                prop_type, value_type
            ));
            body.line(format!(
                "return p.Impl.GetObject_().SetProperty_(flags, p.Impl.GetInterfaceName_(), {}, value)",
                name
            ));
            body.close("}");
        }

        body.blank();
        body.open(format!(
            "func (p {}) ConnectChanged(cb func(hasValue bool, value {})) error {{",
            prop_type, value_type
        ));
        body.open("if cb == nil {");
        body.line("return errors.New(\"nil callback\")");
        body.close("}");
        body.open("cb0 := func(hasValue bool, value interface{}) {");
        body.open("if hasValue {");
        body.line(format!("var v {}", value_type));
        body.line("err := dbus.Store([]interface{}{value}, &v)");
        body.open("if err != nil {");
        body.line("return");
        body.close("}");
        body.line("cb(true, v)");
        body.middle("} else {");
        body.line(format!("var zero {}", value_type));
        body.line("cb(false, zero)");
        body.close("}");
        body.close("}");
        body.line(format!(
            "return p.Impl.GetObject_().ConnectPropertyChanged_(p.Impl.GetInterfaceName_(), {}, cb0)",
            name
        ));
        body.close("}");
    }
}

impl Codegen for ProxyEmitter {
    fn generate(&mut self, unit: &ProxyUnit) -> Result<String> {
        if unit.objects.is_empty() {
            return Err(CodegenError::EmptyUnit(unit.package.clone()));
        }

        let mut file = SourceFile::new(&unit.package);
        file.add_import("errors");
        file.add_import("fmt");
        file.add_import("unsafe");
        file.add_import(&import_spec("dbus", &self.config.dbus_import));
        file.add_import(&import_spec("dbusutil", &self.config.dbusutil_import));
        file.add_import(&import_spec("proxy", &self.config.proxy_import));

        self.write_guard(&mut file.body);
        for object in &unit.objects {
            self.write_object(&mut file.body, object);
        }
        file.render()
    }
}

pub fn implementer_name(type_name: &str) -> String {
    format!("interface{}", type_name)
}

/// Import spec that binds `path` to the package name the generated bodies use
fn import_spec(name: &str, path: &str) -> String {
    match path.rsplit('/').next() {
        Some(last) if last == name => path.to_string(),
        _ => format!("{},{}", name, path),
    }
}

fn write_implementer(body: &mut SourceBody, object: &ExportedObject, implementer: &str) {
    body.blank();
    body.line(format!("type {} struct{{}}", implementer));

    body.blank();
    body.open(format!("func (v *{}) GetObject_() *proxy.Object {{", implementer));
    body.line("return (*proxy.Object)(unsafe.Pointer(v))");
    body.close("}");

    body.blank();
    body.open(format!("func (*{}) GetInterfaceName_() string {{", implementer));
    body.line(format!("return {}", go_quote(&object.interface_name)));
    body.close("}");

    body.blank();
    body.open(format!(
        "func (*{}) GetObjectPath_() dbus.ObjectPath {{",
        implementer
    ));
    body.line(format!("return {}", go_quote(&object.export_path)));
    body.close("}");
}

fn write_signal(body: &mut SourceBody, implementer: &str, signal: &Signal) {
    let mut namer = ArgNamer::new();
    let names = namer.names(&signal.args);
    let member = go_quote(&signal.name);

    body.blank();
    body.line(format!("// signal {}", signal.name));
    body.blank();
    body.open(format!(
        "func (v *{}) Connect{}(cb func({})) (dbusutil.SignalHandlerId, error) {{",
        implementer,
        exported_name(&signal.name),
        params(&names, &signal.args)
    ));
    body.open("if cb == nil {");
    body.line("return 0, errors.New(\"nil callback\")");
    body.close("}");
    body.line("obj := v.GetObject_()");
    body.open("rule := fmt.Sprintf(");
    body.line("\"type='signal',interface='%s',member='%s',path='%s',sender='%s'\",");
    body.line(format!(
        "v.GetInterfaceName_(), {}, obj.Path_(), obj.ServiceName_())",
        member
    ));
    body.close("");
    body.open("sigRule := &dbusutil.SignalRule{");
    body.line("Path: obj.Path_(),");
    body.line(format!("Name: v.GetInterfaceName_() + {},", go_quote(&format!(".{}", signal.name))));
    body.close("}");
    body.open("handlerFunc := func(sig *dbus.Signal) {");
    if names.is_empty() {
        body.line("cb()");
    } else {
        for (name, arg) in names.iter().zip(&signal.args) {
            body.line(format!("var {} {}", name, arg.ty));
        }
        body.line(format!("err := dbus.Store(sig.Body, {})", references(&names)));
        body.open("if err == nil {");
        body.line(format!("cb({})", names.join(", ")));
        body.close("}");
    }
    body.close("}");
    body.line("return obj.ConnectSignal_(rule, sigRule, handlerFunc)");
    body.close("}");
}

fn write_method(body: &mut SourceBody, implementer: &str, method: &Method) {
    let mut namer = ArgNamer::new();
    let param_names = namer.names(&method.params);
    let result_names = namer.names(&method.results);
    let name = &method.name;

    let in_params = params(&param_names, &method.params);
    let in_args = param_names
        .iter()
        .map(|n| format!(", {}", n))
        .collect::<String>();
    let in_params_tail = if in_params.is_empty() {
        String::new()
    } else {
        format!(", {}", in_params)
    };

    body.blank();
    body.line(format!("// method {}", name));

    body.blank();
    body.open(format!(
        "func (v *{}) Go{}(flags dbus.Flags, ch chan *dbus.Call{}) *dbus.Call {{",
        implementer, name, in_params_tail
    ));
    body.line(format!(
        "return v.GetObject_().Go_(v.GetInterfaceName_()+{}, flags, ch{})",
        go_quote(&format!(".{}", name)),
        in_args
    ));
    body.close("}");

    if result_names.is_empty() {
        body.blank();
        body.open(format!(
            "func (v *{}) {}(flags dbus.Flags{}) error {{",
            implementer, name, in_params_tail
        ));
        body.line(format!(
            "return (<-v.Go{}(flags, make(chan *dbus.Call, 1){}).Done).Err",
            name, in_args
        ));
        body.close("}");
        return;
    }

    let out_params = params(&result_names, &method.results);

    body.blank();
    body.open(format!(
        "func (*{}) Store{}(call *dbus.Call) ({}, err error) {{",
        implementer, name, out_params
    ));
    body.line(format!("err = call.Store({})", references(&result_names)));
    body.line("return");
    body.close("}");

    body.blank();
    body.open(format!(
        "func (v *{}) {}(flags dbus.Flags{}) ({}, err error) {{",
        implementer, name, in_params_tail, out_params
    ));
    body.line(format!(
        "return v.Store{}(<-v.Go{}(flags, make(chan *dbus.Call, 1){}).Done)",
        name, name, in_args
    ));
    body.close("}");
}

/// Assigns argument names that are unique within one generated function
struct ArgNamer {
    used: BTreeSet<String>,
}

impl ArgNamer {
    fn new() -> Self {
        Self {
            used: RESERVED_NAMES.iter().map(|n| n.to_string()).collect(),
        }
    }

    fn name(&mut self, index: usize, declared: Option<&str>) -> String {
        let mut candidate = match declared {
            Some(name) if !name.is_empty() && name != "_" => name.to_string(),
            _ => format!("arg{}", index),
        };
        while self.used.contains(&candidate) {
            candidate.push('_');
        }
        self.used.insert(candidate.clone());
        candidate
    }

    fn names(&mut self, args: &[Arg]) -> Vec<String> {
        args.iter()
            .enumerate()
            .map(|(i, arg)| self.name(i, arg.name.as_deref()))
            .collect()
    }
}

fn params(names: &[String], args: &[Arg]) -> String {
    names
        .iter()
        .zip(args)
        .map(|(name, arg)| format!("{} {}", name, arg.ty))
        .collect::<Vec<_>>()
        .join(", ")
}

fn references(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("&{}", n))
        .collect::<Vec<_>>()
        .join(", ")
}

fn exported_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Go interpreted string literal
pub fn go_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
