//! Zero values.
//!
//! The zero value of a struct has every required field set to its zero (or
//! declared default), every default field with a declared default set, and
//! every optional field absent.

use crate::error::CodecError;
use crate::registry::{CodecRegistry, TypePlan, MAX_DECODE_DEPTH};
use crate::value::{StructValue, Value};
use ridl_schema::{Requiredness, Type};

impl CodecRegistry {
    /// Zero value of a schema type. Void has none.
    pub fn zero_value(&self, ty: &Type) -> Result<Value, CodecError> {
        let plan = self.plan_for(ty, "zero value")?;
        self.zero_for_plan(&plan)
    }

    pub fn zero_for_plan(&self, plan: &TypePlan) -> Result<Value, CodecError> {
        self.zero_at(plan, MAX_DECODE_DEPTH)
    }

    /// Zero value of the struct named `name`.
    pub fn zero_struct(&self, name: &str) -> Result<StructValue, CodecError> {
        let index = self.index_of(name)?;
        self.zero_struct_at(index, MAX_DECODE_DEPTH)
    }

    fn zero_at(&self, plan: &TypePlan, depth: usize) -> Result<Value, CodecError> {
        let value = match plan {
            TypePlan::Bool => Value::Bool(false),
            TypePlan::Byte => Value::Byte(0),
            TypePlan::I16 => Value::I16(0),
            TypePlan::I32 => Value::I32(0),
            TypePlan::I64 => Value::I64(0),
            TypePlan::Double => Value::Double(0.0),
            TypePlan::String => Value::String(String::new()),
            TypePlan::Struct(index) => Value::Struct(self.zero_struct_at(*index, depth)?),
            TypePlan::List(_) => Value::List(Vec::new()),
            TypePlan::Set(_) => Value::Set(Vec::new()),
            TypePlan::Map(_, _) => Value::Map(Vec::new()),
        };
        Ok(value)
    }

    fn zero_struct_at(&self, index: usize, depth: usize) -> Result<StructValue, CodecError> {
        // a struct that requires itself has no finite zero value
        if depth == 0 {
            return Err(CodecError::DepthLimit(MAX_DECODE_DEPTH));
        }
        let codec = self.codec_at(index);
        let mut out = StructValue::new(codec.name.clone());
        for field in &codec.fields {
            match (&field.default, field.requiredness) {
                (Some(default), Requiredness::Required | Requiredness::Default) => {
                    out.set(field.id, default.clone());
                }
                (None, Requiredness::Required) => {
                    out.set(field.id, self.zero_at(&field.plan, depth - 1)?);
                }
                _ => {}
            }
        }
        Ok(out)
    }
}
