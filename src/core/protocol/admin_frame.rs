// src/core/protocol/admin_frame.rs

//! Implements the admin frame structure and the corresponding `Encoder` and
//! `Decoder` for network communication.
//!
//! Layout on the wire:
//!
//! ```text
//! +---------+------+----------------+   proto header (8 bytes)
//! | version | type | body length:48 |
//! +---------+------+----------------+
//! | 0 | result | command | nfields | 12 x 0 |   admin header (16 bytes)
//! +---------------------------------------+
//! | len:32 | id:8 | data ... |  x nfields      fields
//! ```

use crate::core::AdminError;
use crate::core::protocol::fields::{AdminField, FieldId};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

pub const PROTO_VERSION: u8 = 2;
pub const PROTO_TYPE_ADMIN: u8 = 2;
pub const PROTO_HEADER_LEN: usize = 8;
pub const ADMIN_HEADER_LEN: usize = 16;
const FIELD_HEADER_LEN: usize = 5;

// Protocol-level limit to prevent a peer from forcing huge allocations.
pub const MAX_BODY_LEN: usize = 1024 * 1024;

/// A single admin request or reply.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminFrame {
    pub command: u8,
    pub result_code: u8,
    pub fields: Vec<AdminField>,
}

impl AdminFrame {
    pub fn request(command: u8, fields: Vec<AdminField>) -> Self {
        Self {
            command,
            result_code: 0,
            fields,
        }
    }

    pub fn reply(command: u8, result_code: u8, fields: Vec<AdminField>) -> Self {
        Self {
            command,
            result_code,
            fields,
        }
    }

    /// Returns the first field with the given id.
    pub fn field(&self, id: FieldId) -> Option<&AdminField> {
        self.fields.iter().find(|f| f.id == id as u8)
    }

    /// A convenience method to encode a frame into a `Vec<u8>`.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, AdminError> {
        let mut buf = BytesMut::new();
        AdminFrameCodec.encode(self.clone(), &mut buf)?;
        Ok(buf.to_vec())
    }

    fn body_len(&self) -> usize {
        ADMIN_HEADER_LEN
            + self
                .fields
                .iter()
                .map(|f| FIELD_HEADER_LEN + f.data.len())
                .sum::<usize>()
    }
}

/// A `tokio_util::codec` implementation for encoding and decoding `AdminFrame`s.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdminFrameCodec;

impl Encoder<AdminFrame> for AdminFrameCodec {
    type Error = AdminError;

    fn encode(&mut self, item: AdminFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.fields.len() > u8::MAX as usize {
            return Err(AdminError::protocol("too many fields in one frame"));
        }
        let body_len = item.body_len();
        if body_len > MAX_BODY_LEN {
            return Err(AdminError::protocol(format!(
                "frame body of {body_len} bytes exceeds limit of {MAX_BODY_LEN}"
            )));
        }

        dst.reserve(PROTO_HEADER_LEN + body_len);
        dst.put_u8(PROTO_VERSION);
        dst.put_u8(PROTO_TYPE_ADMIN);
        // 48-bit big-endian length: the low six bytes of a u64.
        dst.put_slice(&(body_len as u64).to_be_bytes()[2..]);

        dst.put_u8(0);
        dst.put_u8(item.result_code);
        dst.put_u8(item.command);
        dst.put_u8(item.fields.len() as u8);
        dst.put_bytes(0, ADMIN_HEADER_LEN - 4);

        for field in item.fields {
            dst.put_u32(field.data.len() as u32 + 1);
            dst.put_u8(field.id);
            dst.put_slice(&field.data);
        }
        Ok(())
    }
}

impl Decoder for AdminFrameCodec {
    type Item = AdminFrame;
    type Error = AdminError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < PROTO_HEADER_LEN {
            return Ok(None);
        }

        if src[0] != PROTO_VERSION {
            return Err(AdminError::protocol(format!(
                "unsupported protocol version {}",
                src[0]
            )));
        }
        if src[1] != PROTO_TYPE_ADMIN {
            return Err(AdminError::protocol(format!(
                "unexpected message type {}",
                src[1]
            )));
        }

        let mut len_bytes = [0u8; 8];
        len_bytes[2..].copy_from_slice(&src[2..PROTO_HEADER_LEN]);
        let body_len = u64::from_be_bytes(len_bytes) as usize;
        if body_len > MAX_BODY_LEN {
            return Err(AdminError::protocol(format!(
                "frame body of {body_len} bytes exceeds limit of {MAX_BODY_LEN}"
            )));
        }
        if body_len < ADMIN_HEADER_LEN {
            return Err(AdminError::protocol("frame body shorter than admin header"));
        }

        if src.len() < PROTO_HEADER_LEN + body_len {
            // Not enough data yet; make room for the rest of the frame.
            src.reserve(PROTO_HEADER_LEN + body_len - src.len());
            return Ok(None);
        }

        src.advance(PROTO_HEADER_LEN);
        let mut body = src.split_to(body_len).freeze();
        parse_body(&mut body).map(Some)
    }
}

/// Parses the admin header and fields out of a complete frame body.
fn parse_body(body: &mut Bytes) -> Result<AdminFrame, AdminError> {
    let header = body.split_to(ADMIN_HEADER_LEN);
    let result_code = header[1];
    let command = header[2];
    let field_count = header[3] as usize;

    let mut fields = Vec::with_capacity(field_count);
    for _ in 0..field_count {
        if body.remaining() < FIELD_HEADER_LEN {
            return Err(AdminError::protocol("truncated field header"));
        }
        let len = body.get_u32() as usize;
        if len == 0 {
            return Err(AdminError::protocol("field length must include its id"));
        }
        let id = body.get_u8();
        let data_len = len - 1;
        if body.remaining() < data_len {
            return Err(AdminError::protocol("truncated field data"));
        }
        fields.push(AdminField {
            id,
            data: body.split_to(data_len),
        });
    }

    if body.has_remaining() {
        return Err(AdminError::protocol("trailing bytes after last field"));
    }

    Ok(AdminFrame {
        command,
        result_code,
        fields,
    })
}
