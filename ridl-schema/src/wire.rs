//! Mapping from schema types to wire type tags.

use crate::error::SchemaError;
use crate::schema::Schema;
use crate::types::Type;
use ridl_protocol::WireType;

/// Wire tag of an already-resolved type. Returns `None` for typedefs, which
/// need the schema to resolve.
pub fn resolved_wire_type(ty: &Type) -> Option<WireType> {
    let wire = match ty {
        Type::Void => WireType::Void,
        Type::Bool => WireType::Bool,
        Type::Byte => WireType::Byte,
        Type::I16 => WireType::I16,
        Type::I32 | Type::Enum(_) => WireType::I32,
        Type::I64 => WireType::I64,
        Type::Double => WireType::Double,
        Type::String => WireType::String,
        Type::Struct(_) => WireType::Struct,
        Type::List(_) => WireType::List,
        Type::Set(_) => WireType::Set,
        Type::Map(_, _) => WireType::Map,
        Type::Typedef(_) => return None,
    };
    Some(wire)
}

impl Schema {
    /// Wire tag of `ty`, following typedefs.
    pub fn wire_type(&self, ty: &Type) -> Result<WireType, SchemaError> {
        let resolved = self.resolve(ty)?;
        resolved_wire_type(resolved).ok_or_else(|| SchemaError::TypedefCycle(ty.to_string()))
    }
}
