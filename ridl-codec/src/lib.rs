//! # ridl-codec
//!
//! Struct codecs for ridl schemas.
//!
//! A [`CodecRegistry`] is compiled once from a [`ridl_schema::Schema`] and
//! holds an encode/decode plan for every user-defined and synthetic struct.
//! Values are dynamic ([`Value`], [`StructValue`]); the plans drive the
//! [`ridl_protocol::ProtocolWriter`] / [`ridl_protocol::ProtocolReader`]
//! calls.
//!
//! ```ignore
//! let registry = CodecRegistry::compile(Arc::new(schema))?;
//! let point = StructValue::new("Point").with(1, 3).with(2, 4);
//! let bytes = registry.encode_struct("Point", &point)?;
//! assert_eq!(registry.decode_struct("Point", bytes)?, point);
//! ```

pub mod constant;
pub mod decode;
pub mod encode;
pub mod error;
pub mod json;
pub mod registry;
pub mod value;
pub mod zero;

pub use error::CodecError;
pub use registry::{CodecRegistry, FieldPlan, StructCodec, TypePlan, MAX_DECODE_DEPTH};
pub use value::{StructValue, Value};
