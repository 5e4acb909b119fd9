//! Wire type tags, message types and the headers exchanged with a protocol.

use crate::error::ProtocolError;
use std::fmt;

/// Type tag carried on the wire in front of every field and inside every
/// container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    Stop = 0,
    Void = 1,
    Bool = 2,
    Byte = 3,
    Double = 4,
    I16 = 6,
    I32 = 8,
    I64 = 10,
    String = 11,
    Struct = 12,
    Map = 13,
    Set = 14,
    List = 15,
}

impl WireType {
    /// All tags, in numeric order.
    pub const ALL: [WireType; 13] = [
        WireType::Stop,
        WireType::Void,
        WireType::Bool,
        WireType::Byte,
        WireType::Double,
        WireType::I16,
        WireType::I32,
        WireType::I64,
        WireType::String,
        WireType::Struct,
        WireType::Map,
        WireType::Set,
        WireType::List,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns whether values of this type carry nested values.
    pub fn is_container(self) -> bool {
        matches!(self, WireType::Map | WireType::Set | WireType::List)
    }
}

impl TryFrom<u8> for WireType {
    type Error = ProtocolError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(WireType::Stop),
            1 => Ok(WireType::Void),
            2 => Ok(WireType::Bool),
            3 => Ok(WireType::Byte),
            4 => Ok(WireType::Double),
            6 => Ok(WireType::I16),
            8 => Ok(WireType::I32),
            10 => Ok(WireType::I64),
            11 => Ok(WireType::String),
            12 => Ok(WireType::Struct),
            13 => Ok(WireType::Map),
            14 => Ok(WireType::Set),
            15 => Ok(WireType::List),
            other => Err(ProtocolError::InvalidWireType(other)),
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WireType::Stop => "STOP",
            WireType::Void => "VOID",
            WireType::Bool => "BOOL",
            WireType::Byte => "BYTE",
            WireType::Double => "DOUBLE",
            WireType::I16 => "I16",
            WireType::I32 => "I32",
            WireType::I64 => "I64",
            WireType::String => "STRING",
            WireType::Struct => "STRUCT",
            WireType::Map => "MAP",
            WireType::Set => "SET",
            WireType::List => "LIST",
        };
        f.write_str(name)
    }
}

/// Kind of RPC message carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Call = 1,
    Reply = 2,
    Exception = 3,
    Oneway = 4,
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MessageType::Call),
            2 => Ok(MessageType::Reply),
            3 => Ok(MessageType::Exception),
            4 => Ok(MessageType::Oneway),
            other => Err(ProtocolError::InvalidMessageType(other)),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Call => write!(f, "CALL"),
            MessageType::Reply => write!(f, "REPLY"),
            MessageType::Exception => write!(f, "EXCEPTION"),
            MessageType::Oneway => write!(f, "ONEWAY"),
        }
    }
}

/// Message envelope: method name, message type and sequence id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub name: String,
    pub message_type: MessageType,
    pub seq_id: i32,
}

impl MessageHeader {
    pub fn new(name: impl Into<String>, message_type: MessageType, seq_id: i32) -> Self {
        Self {
            name: name.into(),
            message_type,
            seq_id,
        }
    }
}

/// Field header. The name is informational only; protocols that do not
/// transmit names report `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldHeader {
    pub name: Option<String>,
    pub wire_type: WireType,
    pub id: i16,
}

impl FieldHeader {
    pub fn new(wire_type: WireType, id: i16) -> Self {
        Self {
            name: None,
            wire_type,
            id,
        }
    }

    /// The header a reader reports at the end of a struct.
    pub fn stop() -> Self {
        Self::new(WireType::Stop, 0)
    }

    pub fn is_stop(&self) -> bool {
        self.wire_type == WireType::Stop
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHeader {
    pub elem_type: WireType,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetHeader {
    pub elem_type: WireType,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapHeader {
    pub key_type: WireType,
    pub value_type: WireType,
    pub size: usize,
}
