//! Schema-compiled struct codecs.
//!
//! [`CodecRegistry::compile`] walks every struct of a schema (user and
//! synthetic) once and lowers each field type into a [`TypePlan`]: typedefs
//! are resolved, enums collapse to `I32` and struct references become
//! indices into the registry. Recursive structs therefore compile to finite
//! plans. The registry is immutable after compilation and is shared between
//! threads behind an `Arc`.

use crate::error::CodecError;
use crate::value::Value;
use ridl_protocol::WireType;
use ridl_schema::{Requiredness, Schema, Type};
use std::collections::HashMap;
use std::sync::Arc;

/// Maximum nesting of structs and containers accepted when decoding.
pub const MAX_DECODE_DEPTH: usize = 64;

/// Resolved shape of a field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypePlan {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    String,
    /// Index into the registry's struct codecs.
    Struct(usize),
    List(Box<TypePlan>),
    Set(Box<TypePlan>),
    Map(Box<TypePlan>, Box<TypePlan>),
}

impl TypePlan {
    pub fn wire_type(&self) -> WireType {
        match self {
            TypePlan::Bool => WireType::Bool,
            TypePlan::Byte => WireType::Byte,
            TypePlan::I16 => WireType::I16,
            TypePlan::I32 => WireType::I32,
            TypePlan::I64 => WireType::I64,
            TypePlan::Double => WireType::Double,
            TypePlan::String => WireType::String,
            TypePlan::Struct(_) => WireType::Struct,
            TypePlan::List(_) => WireType::List,
            TypePlan::Set(_) => WireType::Set,
            TypePlan::Map(_, _) => WireType::Map,
        }
    }
}

/// One field of a compiled struct codec.
#[derive(Debug, Clone)]
pub struct FieldPlan {
    pub id: i16,
    pub name: String,
    pub wire_type: WireType,
    pub plan: TypePlan,
    pub requiredness: Requiredness,
    /// Materialized default value.
    pub default: Option<Value>,
}

/// Encode/decode plan for one struct.
#[derive(Debug, Clone)]
pub struct StructCodec {
    pub name: String,
    pub fingerprint: String,
    pub is_exception: bool,
    /// Fields in declaration (wire) order.
    pub fields: Vec<FieldPlan>,
    by_id: HashMap<i16, usize>,
}

impl StructCodec {
    pub fn field(&self, id: i16) -> Option<&FieldPlan> {
        self.by_id.get(&id).map(|&i| &self.fields[i])
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldPlan> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Struct codecs for every struct in a schema.
#[derive(Debug)]
pub struct CodecRegistry {
    schema: Arc<Schema>,
    structs: Vec<StructCodec>,
    by_name: HashMap<String, usize>,
}

impl CodecRegistry {
    /// Compiles codecs for all user and synthetic structs of `schema`.
    pub fn compile(schema: Arc<Schema>) -> Result<Self, CodecError> {
        // Codec indices mirror the schema's struct order, so nested struct
        // references can be resolved before their target is compiled.
        let by_name: HashMap<String, usize> = schema
            .structs()
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();

        let mut registry = CodecRegistry {
            schema: schema.clone(),
            structs: Vec::with_capacity(schema.structs().len()),
            by_name,
        };

        for def in schema.structs() {
            let mut fields = Vec::with_capacity(def.fields.len());
            let mut by_id = HashMap::with_capacity(def.fields.len());
            for field in &def.fields {
                let context = format!("{}.{}", def.name, field.name);
                let plan = registry.plan_for(&field.ty, &context)?;
                let default = match &field.default {
                    Some(c) => Some(registry.materialize(&field.ty, c)?),
                    None => None,
                };
                by_id.insert(field.id, fields.len());
                fields.push(FieldPlan {
                    id: field.id,
                    name: field.name.clone(),
                    wire_type: plan.wire_type(),
                    plan,
                    requiredness: field.requiredness,
                    default,
                });
            }
            registry.structs.push(StructCodec {
                name: def.name.clone(),
                fingerprint: def.fingerprint.clone(),
                is_exception: def.is_exception,
                fields,
                by_id,
            });
        }

        tracing::debug!("compiled {} struct codecs", registry.structs.len());
        Ok(registry)
    }

    /// Lowers a schema type into a plan.
    pub fn plan_for(&self, ty: &Type, context: &str) -> Result<TypePlan, CodecError> {
        let plan = match self.schema.resolve(ty)? {
            Type::Void => {
                return Err(CodecError::VoidSerialization {
                    context: context.to_string(),
                })
            }
            Type::Bool => TypePlan::Bool,
            Type::Byte => TypePlan::Byte,
            Type::I16 => TypePlan::I16,
            Type::I32 | Type::Enum(_) => TypePlan::I32,
            Type::I64 => TypePlan::I64,
            Type::Double => TypePlan::Double,
            Type::String => TypePlan::String,
            Type::Struct(name) => TypePlan::Struct(self.index_of(name)?),
            Type::List(elem) => TypePlan::List(Box::new(self.plan_for(elem, context)?)),
            Type::Set(elem) => TypePlan::Set(Box::new(self.plan_for(elem, context)?)),
            Type::Map(key, value) => TypePlan::Map(
                Box::new(self.plan_for(key, context)?),
                Box::new(self.plan_for(value, context)?),
            ),
            Type::Typedef(name) => return Err(CodecError::UnknownStruct(name.clone())),
        };
        Ok(plan)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&StructCodec> {
        self.by_name.get(name).map(|&i| &self.structs[i])
    }

    pub fn codecs(&self) -> &[StructCodec] {
        &self.structs
    }

    pub(crate) fn index_of(&self, name: &str) -> Result<usize, CodecError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| CodecError::UnknownStruct(name.to_string()))
    }

    pub(crate) fn codec_at(&self, index: usize) -> &StructCodec {
        &self.structs[index]
    }
}
