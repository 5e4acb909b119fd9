//! Struct and exception bindings with their `read` / `write` codecs.
//!
//! The writer emits fields in declaration order and always ends with a stop
//! marker. The reader loops over field headers until the stop marker,
//! matches on `(id, wire type)` and skips anything it does not recognise.
//! Presence of required fields is tracked with one `Option` local per field.

use crate::code_writer::CodeWriter;
use crate::cw_line;
use crate::error::CodegenError;
use crate::names::{field_ident, local_ident, type_ident, RustTypes};
use crate::types::literal;
use ridl_schema::{Field, Requiredness, StructDef, Type};

/// A value being written: either a place (`self.x`) or a reference bound
/// by a pattern (`value`, `e0`).
struct Place {
    expr: String,
    by_ref: bool,
}

impl Place {
    fn owned(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            by_ref: false,
        }
    }

    fn by_ref(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            by_ref: true,
        }
    }

    fn value(&self) -> String {
        if self.by_ref {
            format!("*{}", self.expr)
        } else {
            self.expr.clone()
        }
    }

    fn borrow(&self) -> String {
        if self.by_ref {
            self.expr.clone()
        } else {
            format!("&{}", self.expr)
        }
    }
}

pub struct StructEmitter<'a, 'b> {
    types: &'b RustTypes<'a>,
    def: &'b StructDef,
    name: String,
}

impl<'a, 'b> StructEmitter<'a, 'b> {
    pub fn new(types: &'b RustTypes<'a>, def: &'b StructDef) -> Self {
        Self {
            types,
            def,
            name: type_ident(&def.name),
        }
    }

    pub fn emit(&self, w: &mut CodeWriter) -> Result<(), CodegenError> {
        self.emit_declaration(w)?;
        w.blank()?;
        self.emit_default(w)?;
        w.blank()?;
        let mut result = Ok(());
        w.block(&format!("impl {}", self.name), |w| {
            result = self.emit_write(w).and_then(|_| {
                w.blank()?;
                self.emit_read(w)
            });
            Ok(())
        })?;
        result?;
        w.blank()?;
        if self.def.is_exception {
            self.emit_error_impls(w)?;
            w.blank()?;
        }
        Ok(())
    }

    /// Rust type of a field as stored in the struct.
    fn field_type(&self, field: &Field) -> Result<String, CodegenError> {
        let mut ty = self.types.rust_type(&field.ty)?;
        if self.types.needs_box(&self.def.name, &field.ty)? {
            ty = format!("Box<{}>", ty);
        }
        if field.is_optional() {
            ty = format!("Option<{}>", ty);
        }
        Ok(ty)
    }

    fn is_boxed(&self, field: &Field) -> Result<bool, CodegenError> {
        self.types.needs_box(&self.def.name, &field.ty)
    }

    fn emit_declaration(&self, w: &mut CodeWriter) -> Result<(), CodegenError> {
        if self.def.is_synthetic() {
            cw_line!(w, "/// Wire struct `{}`.", self.def.name)?;
        }
        w.line("#[derive(Debug, Clone, PartialEq)]")?;
        let mut fields = Vec::with_capacity(self.def.fields.len());
        for field in &self.def.fields {
            fields.push(format!("pub {}: {},", field_ident(&field.name), self.field_type(field)?));
        }
        if fields.is_empty() {
            cw_line!(w, "pub struct {} {{}}", self.name)?;
            return Ok(());
        }
        w.block(&format!("pub struct {}", self.name), |w| {
            for line in &fields {
                w.line(line)?;
            }
            Ok(())
        })?;
        Ok(())
    }

    fn default_expr(&self, field: &Field) -> Result<String, CodegenError> {
        if field.is_optional() {
            return Ok("None".to_string());
        }
        match &field.default {
            Some(value) => {
                let context = format!("{}.{}", self.def.name, field.name);
                let expr = literal(self.types, &field.ty, value, &context)?;
                if self.is_boxed(field)? {
                    Ok(format!("Box::new({})", expr))
                } else {
                    Ok(expr)
                }
            }
            None => Ok("Default::default()".to_string()),
        }
    }

    fn emit_default(&self, w: &mut CodeWriter) -> Result<(), CodegenError> {
        let mut inits = Vec::with_capacity(self.def.fields.len());
        for field in &self.def.fields {
            inits.push(format!("{}: {},", field_ident(&field.name), self.default_expr(field)?));
        }
        w.block(&format!("impl Default for {}", self.name), |w| {
            w.block("fn default() -> Self", |w| {
                if inits.is_empty() {
                    return w.line("Self {}");
                }
                w.block("Self", |w| {
                    for line in &inits {
                        w.line(line)?;
                    }
                    Ok(())
                })
            })
        })?;
        Ok(())
    }

    fn emit_write(&self, w: &mut CodeWriter) -> Result<(), CodegenError> {
        let mut result = Ok(());
        w.block(
            "pub fn write<W: ProtocolWriter + ?Sized>(&self, o_prot: &mut W) -> Result<usize, ProtocolError>",
            |w| {
                result = self.emit_write_body(w);
                Ok(())
            },
        )?;
        result
    }

    fn emit_write_body(&self, w: &mut CodeWriter) -> Result<(), CodegenError> {
        cw_line!(w, "let mut written = o_prot.write_struct_begin({:?})?;", self.def.name)?;
        for field in &self.def.fields {
            let ident = field_ident(&field.name);
            let wire = self.types.wire_type(&field.ty)?;
            let header = format!(
                "written += o_prot.write_field_begin({:?}, {}, {})?;",
                field.name, wire, field.id
            );
            if field.is_optional() {
                let mut result = Ok(());
                w.block(&format!("if let Some(value) = &self.{}", ident), |w| {
                    w.line(&header)?;
                    result = write_value(w, self.types, &field.ty, &Place::by_ref("value"), 0);
                    w.line("written += o_prot.write_field_end()?;")
                })?;
                result?;
            } else {
                w.line(&header)?;
                write_value(w, self.types, &field.ty, &Place::owned(format!("self.{}", ident)), 0)?;
                w.line("written += o_prot.write_field_end()?;")?;
            }
        }
        w.line("written += o_prot.write_field_stop()?;")?;
        w.line("written += o_prot.write_struct_end()?;")?;
        w.line("Ok(written)")?;
        Ok(())
    }

    fn emit_read(&self, w: &mut CodeWriter) -> Result<(), CodegenError> {
        let mut result = Ok(());
        w.block(
            "pub fn read<R: ProtocolReader + ?Sized>(i_prot: &mut R) -> Result<Self, ProtocolError>",
            |w| {
                result = self.emit_read_body(w);
                Ok(())
            },
        )?;
        result
    }

    fn emit_read_body(&self, w: &mut CodeWriter) -> Result<(), CodegenError> {
        w.line("i_prot.read_struct_begin()?;")?;
        for field in &self.def.fields {
            cw_line!(
                w,
                "let mut {}: Option<{}> = None;",
                local_ident(&field.name),
                self.stored_type(field)?
            )?;
        }

        let mut result = Ok(());
        w.block("loop", |w| {
            w.line("let field = i_prot.read_field_begin()?;")?;
            w.block("if field.is_stop()", |w| w.line("break;"))?;
            w.block("match (field.id, field.wire_type)", |w| {
                result = self.emit_read_arms(w);
                w.line("_ => i_prot.skip(field.wire_type)?,")
            })?;
            w.line("i_prot.read_field_end()?;")
        })?;
        result?;
        w.line("i_prot.read_struct_end()?;")?;

        for field in &self.def.fields {
            if field.requiredness != Requiredness::Required {
                continue;
            }
            let local = local_ident(&field.name);
            w.write(&format!("let {} = {}.ok_or_else(|| ", local, local))?;
            w.block_with("ProtocolError::MissingRequiredField", ")?;", |w| {
                cw_line!(w, "struct_name: {:?}.to_string(),", self.def.name)?;
                cw_line!(w, "field: {:?}.to_string(),", field.name)
            })?;
        }

        if self.def.fields.is_empty() {
            w.line("Ok(Self {})")?;
            return Ok(());
        }
        let mut inits = Vec::with_capacity(self.def.fields.len());
        for field in &self.def.fields {
            let local = local_ident(&field.name);
            let value = match field.requiredness {
                Requiredness::Required | Requiredness::Optional => local,
                Requiredness::Default => match &field.default {
                    Some(_) => format!("{}.unwrap_or_else(|| {})", local, self.default_expr(field)?),
                    None => format!("{}.unwrap_or_default()", local),
                },
            };
            inits.push(format!("{}: {},", field_ident(&field.name), value));
        }
        w.block_with("Ok(Self", ")", |w| {
            for line in &inits {
                w.line(line)?;
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Field type without the `Option` wrapper of optional fields.
    fn stored_type(&self, field: &Field) -> Result<String, CodegenError> {
        let ty = self.types.rust_type(&field.ty)?;
        Ok(if self.is_boxed(field)? {
            format!("Box<{}>", ty)
        } else {
            ty
        })
    }

    fn emit_read_arms(&self, w: &mut CodeWriter) -> Result<(), CodegenError> {
        for field in &self.def.fields {
            let wire = self.types.wire_type(&field.ty)?;
            let boxed = self.is_boxed(field)?;
            let mut result = Ok(());
            w.block(&format!("({}, {}) =>", field.id, wire), |w| {
                result = read_value(w, self.types, &field.ty, 0).and_then(|expr| {
                    let expr = if boxed { format!("Box::new({})", expr) } else { expr };
                    cw_line!(w, "{} = Some({});", local_ident(&field.name), expr)?;
                    Ok(())
                });
                Ok(())
            })?;
            result?;
        }
        Ok(())
    }

    fn emit_error_impls(&self, w: &mut CodeWriter) -> Result<(), CodegenError> {
        w.block(&format!("impl fmt::Display for {}", self.name), |w| {
            w.block("fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result", |w| {
                w.line("write!(f, \"{:?}\", self)")
            })
        })?;
        w.blank()?;
        cw_line!(w, "impl std::error::Error for {} {{}}", self.name)?;
        Ok(())
    }
}

/// Writes the statements encoding `place` as `ty`.
fn write_value(
    w: &mut CodeWriter,
    types: &RustTypes<'_>,
    ty: &Type,
    place: &Place,
    depth: usize,
) -> Result<(), CodegenError> {
    match types.resolve(ty)? {
        Type::Void => {
            return Err(CodegenError::VoidType {
                context: format!("write of {}", place.expr),
            })
        }
        Type::Bool => cw_line!(w, "written += o_prot.write_bool({})?;", place.value())?,
        Type::Byte => cw_line!(w, "written += o_prot.write_byte({})?;", place.value())?,
        Type::I16 => cw_line!(w, "written += o_prot.write_i16({})?;", place.value())?,
        Type::I32 => cw_line!(w, "written += o_prot.write_i32({})?;", place.value())?,
        Type::I64 => cw_line!(w, "written += o_prot.write_i64({})?;", place.value())?,
        Type::Double => cw_line!(w, "written += o_prot.write_double({})?;", place.value())?,
        Type::String => cw_line!(w, "written += o_prot.write_string({})?;", place.borrow())?,
        Type::Enum(_) => cw_line!(w, "written += o_prot.write_i32({}.0)?;", place.expr)?,
        Type::Struct(_) => cw_line!(w, "written += {}.write(o_prot)?;", place.expr)?,
        Type::Typedef(name) => {
            return Err(CodegenError::Schema(ridl_schema::SchemaError::TypedefCycle(
                name.clone(),
            )))
        }
        Type::List(elem) | Type::Set(elem) => {
            let kind = if matches!(types.resolve(ty)?, Type::List(_)) { "list" } else { "set" };
            cw_line!(
                w,
                "written += o_prot.write_{}_begin({}, {}.len())?;",
                kind,
                types.wire_type(elem)?,
                place.expr
            )?;
            let item = format!("e{}", depth);
            let mut result = Ok(());
            w.block(&format!("for {} in {}.iter()", item, place.expr), |w| {
                result = write_value(w, types, elem, &Place::by_ref(item.clone()), depth + 1);
                Ok(())
            })?;
            result?;
            cw_line!(w, "written += o_prot.write_{}_end()?;", kind)?;
        }
        Type::Map(key, value) => {
            cw_line!(
                w,
                "written += o_prot.write_map_begin({}, {}, {}.len())?;",
                types.wire_type(key)?,
                types.wire_type(value)?,
                place.expr
            )?;
            let (k, v) = (format!("k{}", depth), format!("v{}", depth));
            let mut result = Ok(());
            w.block(&format!("for ({}, {}) in {}.iter()", k, v, place.expr), |w| {
                result = write_value(w, types, key, &Place::by_ref(k.clone()), depth + 1)
                    .and_then(|_| write_value(w, types, value, &Place::by_ref(v.clone()), depth + 1));
                Ok(())
            })?;
            result?;
            w.line("written += o_prot.write_map_end()?;")?;
        }
    }
    Ok(())
}

/// Writes any statements needed to decode a `ty` and returns the
/// expression holding the decoded value.
fn read_value(
    w: &mut CodeWriter,
    types: &RustTypes<'_>,
    ty: &Type,
    depth: usize,
) -> Result<String, CodegenError> {
    let expr = match types.resolve(ty)? {
        Type::Void => {
            return Err(CodegenError::VoidType {
                context: "read".to_string(),
            })
        }
        Type::Bool => "i_prot.read_bool()?".to_string(),
        Type::Byte => "i_prot.read_byte()?".to_string(),
        Type::I16 => "i_prot.read_i16()?".to_string(),
        Type::I32 => "i_prot.read_i32()?".to_string(),
        Type::I64 => "i_prot.read_i64()?".to_string(),
        Type::Double => "i_prot.read_double()?".to_string(),
        Type::String => "i_prot.read_string()?".to_string(),
        Type::Enum(name) => format!("{}(i_prot.read_i32()?)", type_ident(name)),
        Type::Struct(name) => format!("{}::read(i_prot)?", type_ident(name)),
        Type::Typedef(name) => {
            return Err(CodegenError::Schema(ridl_schema::SchemaError::TypedefCycle(
                name.clone(),
            )))
        }
        Type::List(elem) | Type::Set(elem) => {
            let is_list = matches!(types.resolve(ty)?, Type::List(_));
            let (kind, add) = match (is_list, types.is_orderable(elem)?) {
                (true, _) => ("list", "push"),
                (false, true) => ("set", "insert"),
                (false, false) => ("set", "push"),
            };
            let collection = if add == "insert" { "BTreeSet" } else { "Vec" };
            let (header, items) = (format!("header{}", depth), format!("items{}", depth));
            cw_line!(w, "let {} = i_prot.read_{}_begin()?;", header, kind)?;
            check_elem(w, &header, "elem_type", &types.wire_type(elem)?)?;
            cw_line!(w, "let mut {} = {}::new();", items, collection)?;
            let mut result = Ok(());
            w.block(&format!("for _ in 0..{}.size", header), |w| {
                result = read_value(w, types, elem, depth + 1).and_then(|expr| {
                    cw_line!(w, "{}.{}({});", items, add, expr)?;
                    Ok(())
                });
                Ok(())
            })?;
            result?;
            cw_line!(w, "i_prot.read_{}_end()?;", kind)?;
            items
        }
        Type::Map(key, value) => {
            let ordered = types.is_orderable(key)?;
            let (header, items) = (format!("header{}", depth), format!("items{}", depth));
            w.line(&format!("let {} = i_prot.read_map_begin()?;", header))?;
            check_elem(w, &header, "key_type", &types.wire_type(key)?)?;
            check_elem(w, &header, "value_type", &types.wire_type(value)?)?;
            cw_line!(
                w,
                "let mut {} = {}::new();",
                items,
                if ordered { "BTreeMap" } else { "Vec" }
            )?;
            let (k, v) = (format!("k{}", depth), format!("v{}", depth));
            let mut result = Ok(());
            w.block(&format!("for _ in 0..{}.size", header), |w| {
                result = (|| -> Result<(), CodegenError> {
                    let key_expr = read_value(w, types, key, depth + 1)?;
                    cw_line!(w, "let {} = {};", k, key_expr)?;
                    let value_expr = read_value(w, types, value, depth + 1)?;
                    cw_line!(w, "let {} = {};", v, value_expr)?;
                    if ordered {
                        cw_line!(w, "{}.insert({}, {});", items, k, v)?;
                    } else {
                        cw_line!(w, "{}.push(({}, {}));", items, k, v)?;
                    }
                    Ok(())
                })();
                Ok(())
            })?;
            result?;
            w.line("i_prot.read_map_end()?;")?;
            items
        }
    };
    Ok(expr)
}

/// Non-empty containers must carry the declared element tag.
fn check_elem(w: &mut CodeWriter, header: &str, slot: &str, wire: &str) -> Result<(), CodegenError> {
    w.block(&format!("if {h}.size > 0 && {h}.{s} != {wire}", h = header, s = slot, wire = wire), |w| {
        cw_line!(w, "return Err(ProtocolError::InvalidWireType({}.{}.as_u8()));", header, slot)
    })?;
    Ok(())
}
