//! Enums, typedefs, constants and literal expressions.

use crate::code_writer::CodeWriter;
use crate::cw_line;
use crate::error::CodegenError;
use crate::names::{const_ident, field_ident, type_ident, RustTypes};
use ridl_schema::{ConstDef, ConstValue, EnumDef, Type, TypedefDef};

/// Enums are open: a newtype over `i32` with one associated constant per
/// declared value, so unknown ordinals survive a round trip.
pub fn emit_enum(w: &mut CodeWriter, def: &EnumDef) -> Result<(), CodegenError> {
    let name = type_ident(&def.name);
    w.line("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]")?;
    cw_line!(w, "pub struct {}(pub i32);", name)?;
    w.blank()?;
    w.block(&format!("impl {}", name), |w| {
        for value in &def.values {
            cw_line!(w, "pub const {}: {} = {}({});", const_ident(&value.name), name, name, value.value)?;
        }
        let all = def
            .values
            .iter()
            .map(|v| format!("{}::{}", name, const_ident(&v.name)))
            .collect::<Vec<_>>()
            .join(", ");
        cw_line!(w, "pub const VALUES: &'static [{}] = &[{}];", name, all)?;
        w.blank()?;
        w.doc("Declared name of this value, if it has one.")?;
        w.block("pub fn name(self) -> Option<&'static str>", |w| {
            w.block("match self.0", |w| {
                for value in &def.values {
                    cw_line!(w, "{} => Some({:?}),", value.value, value.name)?;
                }
                w.line("_ => None,")
            })
        })
    })?;
    w.blank()?;
    w.block(&format!("impl From<i32> for {}", name), |w| {
        w.block("fn from(value: i32) -> Self", |w| cw_line!(w, "{}(value)", name))
    })?;
    w.blank()?;
    w.block(&format!("impl From<{}> for i32", name), |w| {
        w.block(&format!("fn from(value: {}) -> Self", name), |w| w.line("value.0"))
    })?;
    w.blank()?;
    Ok(())
}

pub fn emit_typedef(
    w: &mut CodeWriter,
    types: &RustTypes<'_>,
    def: &TypedefDef,
) -> Result<(), CodegenError> {
    cw_line!(w, "pub type {} = {};", type_ident(&def.name), types.rust_type(&def.target)?)?;
    Ok(())
}

/// Scalars and strings become `pub const` items; containers and structs,
/// which need allocation, become functions returning a fresh value.
pub fn emit_const(
    w: &mut CodeWriter,
    types: &RustTypes<'_>,
    def: &ConstDef,
) -> Result<(), CodegenError> {
    let ty = types.rust_type(&def.ty)?;
    match types.resolve(&def.ty)? {
        Type::Void => {
            return Err(CodegenError::VoidType {
                context: format!("constant {}", def.name),
            })
        }
        Type::String => {
            let value = match &def.value {
                ConstValue::String(s) => s,
                _ => return Err(CodegenError::constant(&def.name, "expected a string")),
            };
            cw_line!(w, "pub const {}: &str = {:?};", const_ident(&def.name), value)?;
        }
        Type::Bool | Type::Byte | Type::I16 | Type::I32 | Type::I64 | Type::Double | Type::Enum(_) => {
            let value = literal(types, &def.ty, &def.value, &def.name)?;
            cw_line!(w, "pub const {}: {} = {};", const_ident(&def.name), ty, value)?;
        }
        _ => {
            let value = literal(types, &def.ty, &def.value, &def.name)?;
            w.block(&format!("pub fn {}() -> {}", field_ident(&def.name), ty), |w| {
                w.line(&value)
            })?;
        }
    }
    Ok(())
}

fn double_literal(value: f64) -> String {
    if value.is_nan() {
        "f64::NAN".to_string()
    } else if value == f64::INFINITY {
        "f64::INFINITY".to_string()
    } else if value == f64::NEG_INFINITY {
        "f64::NEG_INFINITY".to_string()
    } else {
        format!("{:?}", value)
    }
}

/// Rust expression building `value` as a `ty`.
pub fn literal(
    types: &RustTypes<'_>,
    ty: &Type,
    value: &ConstValue,
    name: &str,
) -> Result<String, CodegenError> {
    let schema = types.schema();
    let resolved = types.resolve(ty)?;
    let expr = match (resolved, value) {
        (Type::Bool, ConstValue::Bool(b)) => b.to_string(),
        (Type::Byte | Type::I16 | Type::I32 | Type::I64, ConstValue::Integer(i)) => i.to_string(),
        (Type::Double, ConstValue::Double(d)) => double_literal(*d),
        (Type::Double, ConstValue::Integer(i)) => double_literal(*i as f64),
        (Type::String, ConstValue::String(s)) => format!("{:?}.to_string()", s),
        (Type::Enum(enum_name), ConstValue::Integer(i)) => {
            let rust_name = type_ident(enum_name);
            let label = schema
                .get_enum(enum_name)
                .and_then(|def| i32::try_from(*i).ok().and_then(|v| def.name_of(v)));
            match label {
                Some(label) => format!("{}::{}", rust_name, const_ident(label)),
                None => format!("{}({})", rust_name, i),
            }
        }
        (Type::List(elem), ConstValue::List(items)) => {
            format!("vec![{}]", literals(types, elem, items, name)?)
        }
        (Type::Set(elem), ConstValue::List(items)) => {
            if !types.is_orderable(elem)? {
                format!("vec![{}]", literals(types, elem, items, name)?)
            } else if items.is_empty() {
                "BTreeSet::new()".to_string()
            } else {
                format!("BTreeSet::from([{}])", literals(types, elem, items, name)?)
            }
        }
        (Type::Map(key_ty, value_ty), ConstValue::Map(entries)) => {
            let pairs = entries
                .iter()
                .map(|(k, v)| {
                    Ok(format!(
                        "({}, {})",
                        literal(types, key_ty, k, name)?,
                        literal(types, value_ty, v, name)?
                    ))
                })
                .collect::<Result<Vec<_>, CodegenError>>()?
                .join(", ");
            if !types.is_orderable(key_ty)? {
                format!("vec![{}]", pairs)
            } else if entries.is_empty() {
                "BTreeMap::new()".to_string()
            } else {
                format!("BTreeMap::from([{}])", pairs)
            }
        }
        (Type::Struct(struct_name), ConstValue::Struct(fields)) => {
            let def = schema
                .get_struct(struct_name)
                .ok_or_else(|| CodegenError::constant(name, format!("unknown struct {}", struct_name)))?;
            let mut parts = Vec::with_capacity(fields.len() + 1);
            for (field_name, field_value) in fields {
                let field = def.field_by_name(field_name).ok_or_else(|| {
                    CodegenError::constant(name, format!("{} has no field {}", struct_name, field_name))
                })?;
                let mut expr = literal(types, &field.ty, field_value, name)?;
                if types.needs_box(&def.name, &field.ty)? {
                    expr = format!("Box::new({})", expr);
                }
                if field.is_optional() {
                    expr = format!("Some({})", expr);
                }
                parts.push(format!("{}: {}", field_ident(&field.name), expr));
            }
            if fields.len() < def.fields.len() {
                parts.push("..Default::default()".to_string());
            }
            format!("{} {{ {} }}", type_ident(struct_name), parts.join(", "))
        }
        (resolved, value) => {
            return Err(CodegenError::constant(
                name,
                format!("{:?} is not a {} literal", value, resolved),
            ))
        }
    };
    Ok(expr)
}

fn literals(
    types: &RustTypes<'_>,
    elem: &Type,
    items: &[ConstValue],
    name: &str,
) -> Result<String, CodegenError> {
    Ok(items
        .iter()
        .map(|item| literal(types, elem, item, name))
        .collect::<Result<Vec<_>, _>>()?
        .join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridl_schema::Schema;

    fn schema() -> Schema {
        Schema::from_yaml_str(
            r#"
enums: [{name: Color, values: [RED, GREEN, {name: BLUE, value: 7}]}]
typedefs: [{name: Palette, type: "set<Color>"}]
structs:
  - name: Point
    fields:
      - {id: 1, name: x, type: i32, requiredness: required}
      - {id: 2, name: y, type: i32, requiredness: required}
      - {id: 3, name: tag, type: string, requiredness: optional}
consts:
  - {name: maxDepth, type: i32, value: 64}
  - {name: greeting, type: string, value: "hi \"there\""}
  - {name: favorite, type: Color, value: BLUE}
  - {name: ratio, type: double, value: 2}
  - {name: warm, type: Palette, value: [RED, 3]}
  - {name: origin, type: Point, value: {x: 0, y: -1}}
  - {name: weights, type: "map<string,double>", value: {a: 0.5}}
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_enum() {
        let schema = schema();
        let mut w = CodeWriter::new();
        emit_enum(&mut w, schema.get_enum("Color").unwrap()).unwrap();
        let out = w.finish();
        assert!(out.contains("pub struct Color(pub i32);"));
        assert!(out.contains("pub const BLUE: Color = Color(7);"));
        assert!(out.contains("7 => Some(\"BLUE\"),"));
        assert!(out.contains("impl From<i32> for Color"));
    }

    #[test]
    fn test_consts() {
        let schema = schema();
        let types = RustTypes::new(&schema);
        let mut w = CodeWriter::new();
        for def in schema.consts() {
            emit_const(&mut w, &types, def).unwrap();
        }
        let out = w.finish();
        assert!(out.contains("pub const MAX_DEPTH: i32 = 64;"));
        assert!(out.contains(r#"pub const GREETING: &str = "hi \"there\"";"#));
        assert!(out.contains("pub const FAVORITE: Color = Color::BLUE;"));
        assert!(out.contains("pub const RATIO: f64 = 2.0;"));
        assert!(out.contains("pub fn warm() -> Palette {\n    BTreeSet::from([Color::RED, Color(3)])\n}"));
        assert!(out.contains("Point { x: 0, y: -1, ..Default::default() }"));
        assert!(out.contains(r#"BTreeMap::from([("a".to_string(), 0.5)])"#));
    }

    #[test]
    fn test_typedef_and_mismatch() {
        let schema = schema();
        let types = RustTypes::new(&schema);
        let mut w = CodeWriter::new();
        emit_typedef(&mut w, &types, &schema.typedefs()[0]).unwrap();
        assert_eq!(w.finish(), "pub type Palette = BTreeSet<Color>;\n");

        let err = literal(&types, &Type::I32, &ConstValue::String("x".into()), "bad").unwrap_err();
        assert!(matches!(err, CodegenError::UnsupportedConstant { .. }));
    }
}
