//! Service descriptors.
//!
//! A descriptor is the per-method view the client stub and the processor
//! work from: synthetic struct names, argument slots and declared
//! exceptions, resolved once against a [`CodecRegistry`].

use crate::error::RpcError;
use ridl_codec::{CodecError, CodecRegistry, StructValue, TypePlan, Value};
use ridl_schema::{MethodRef, Type};
use std::sync::Arc;

/// One argument of a method.
#[derive(Debug, Clone)]
pub struct ArgDescriptor {
    pub id: i16,
    pub name: String,
    pub ty: Type,
    pub plan: TypePlan,
    pub default: Option<Value>,
}

/// One declared exception of a method.
#[derive(Debug, Clone)]
pub struct ThrowsDescriptor {
    /// Field id in the result struct.
    pub id: i16,
    /// Field name in the result struct.
    pub field: String,
    /// Exception struct name.
    pub exception: String,
}

/// A method as seen by the client stub and the processor.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub name: String,
    /// Service that declares the method.
    pub service: String,
    pub args_struct: String,
    /// `None` for oneway methods.
    pub result_struct: Option<String>,
    pub args: Vec<ArgDescriptor>,
    pub return_type: Type,
    pub throws: Vec<ThrowsDescriptor>,
    pub oneway: bool,
}

impl MethodDescriptor {
    pub fn from_method(registry: &CodecRegistry, method: MethodRef<'_>) -> Result<Self, RpcError> {
        let args_struct = method.args_struct();
        let codec = registry
            .get(&args_struct)
            .ok_or_else(|| CodecError::UnknownStruct(args_struct.clone()))?;

        let args = method
            .function
            .args
            .iter()
            .map(|field| {
                let plan = codec
                    .field(field.id)
                    .ok_or_else(|| CodecError::UnknownField {
                        struct_name: args_struct.clone(),
                        field: field.name.clone(),
                    })?;
                Ok(ArgDescriptor {
                    id: field.id,
                    name: field.name.clone(),
                    ty: field.ty.clone(),
                    plan: plan.plan.clone(),
                    default: plan.default.clone(),
                })
            })
            .collect::<Result<Vec<_>, CodecError>>()?;

        let throws = method
            .function
            .throws
            .iter()
            .filter_map(|field| match &field.ty {
                Type::Struct(exception) => Some(ThrowsDescriptor {
                    id: field.id,
                    field: field.name.clone(),
                    exception: exception.clone(),
                }),
                _ => None,
            })
            .collect();

        Ok(Self {
            name: method.function.name.clone(),
            service: method.owner.name.clone(),
            result_struct: (!method.function.oneway).then(|| method.result_struct()),
            args_struct,
            args,
            return_type: method.function.return_type.clone(),
            throws,
            oneway: method.function.oneway,
        })
    }

    pub fn returns_void(&self) -> bool {
        self.return_type.is_void()
    }

    /// Declared exception slot for the exception struct `exception`.
    pub fn throws_for(&self, exception: &str) -> Option<&ThrowsDescriptor> {
        self.throws.iter().find(|t| t.exception == exception)
    }

    /// Packs positional arguments into the args struct.
    pub fn pack_args(&self, args: &[Value]) -> Result<StructValue, RpcError> {
        if args.len() != self.args.len() {
            return Err(RpcError::ArgumentCount {
                method: self.name.clone(),
                expected: self.args.len(),
                found: args.len(),
            });
        }
        let mut out = StructValue::new(self.args_struct.clone());
        for (slot, value) in self.args.iter().zip(args) {
            out.set(slot.id, value.clone());
        }
        Ok(out)
    }

    /// Unpacks a decoded args struct into positional arguments. Absent
    /// arguments take their declared default, or the zero value of their
    /// type.
    pub fn unpack_args(
        &self,
        registry: &CodecRegistry,
        mut args: StructValue,
    ) -> Result<Vec<Value>, CodecError> {
        self.args
            .iter()
            .map(|slot| match args.take(slot.id) {
                Some(v) => Ok(v),
                None => match &slot.default {
                    Some(d) => Ok(d.clone()),
                    None => registry.zero_for_plan(&slot.plan),
                },
            })
            .collect()
    }
}

/// The methods a service declares itself, plus the name of its parent.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    name: String,
    extends: Option<String>,
    methods: Vec<Arc<MethodDescriptor>>,
}

impl ServiceDescriptor {
    pub fn new(registry: &CodecRegistry, service: &str) -> Result<Self, RpcError> {
        let schema = registry.schema();
        let def = schema
            .get_service(service)
            .ok_or_else(|| ridl_schema::SchemaError::UndefinedService(service.to_string()))?;
        let methods = def
            .functions
            .iter()
            .map(|function| {
                MethodDescriptor::from_method(registry, MethodRef { owner: def, function })
                    .map(Arc::new)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: def.name.clone(),
            extends: def.extends.clone(),
            methods,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extends(&self) -> Option<&str> {
        self.extends.as_deref()
    }

    /// Declared methods, in declaration order.
    pub fn methods(&self) -> &[Arc<MethodDescriptor>] {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&Arc<MethodDescriptor>> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Flattened method table of `service`, inherited methods included. The
/// most-derived declaration wins on a name collision.
pub fn flattened_methods(
    registry: &CodecRegistry,
    service: &str,
) -> Result<Vec<Arc<MethodDescriptor>>, RpcError> {
    registry
        .schema()
        .methods(service)?
        .into_iter()
        .map(|m| MethodDescriptor::from_method(registry, m).map(Arc::new))
        .collect()
}
