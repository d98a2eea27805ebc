// src/core/protocol/fields.rs

//! Field identifiers and payload encodings carried inside an admin frame.

use crate::core::AdminError;
use crate::core::errors::{InvalidRoleDetail, ResultCode};
use bytes::{BufMut, Bytes, BytesMut};

/// The maximum number of roles a single role-list field can carry.
pub const MAX_ROLES_PER_FIELD: usize = u8::MAX as usize;
/// The maximum length of one role name inside a role-list field.
pub const MAX_ROLE_NAME_LEN: usize = u8::MAX as usize;

/// Identifies the payload of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldId {
    User = 0,
    Password = 1,
    OldPassword = 2,
    Roles = 10,
}

impl TryFrom<u8> for FieldId {
    type Error = AdminError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FieldId::User),
            1 => Ok(FieldId::Password),
            2 => Ok(FieldId::OldPassword),
            10 => Ok(FieldId::Roles),
            _ => Err(AdminError::Server(ResultCode::InvalidField as u8)),
        }
    }
}

/// A single `(id, data)` field.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminField {
    pub id: u8,
    pub data: Bytes,
}

impl AdminField {
    pub fn new(id: FieldId, data: impl Into<Bytes>) -> Self {
        Self {
            id: id as u8,
            data: data.into(),
        }
    }

    pub fn string(id: FieldId, value: &str) -> Self {
        Self::new(id, Bytes::copy_from_slice(value.as_bytes()))
    }

    /// Builds a role-list field: a one-byte count followed by length-prefixed names.
    pub fn roles<S: AsRef<str>>(roles: &[S]) -> Result<Self, AdminError> {
        Ok(Self::new(FieldId::Roles, encode_roles(roles)?))
    }

    /// The field data as a UTF-8 string.
    pub fn as_string(&self) -> Result<String, AdminError> {
        Ok(String::from_utf8(self.data.to_vec())?)
    }

    /// Decodes the field data as a role list.
    pub fn as_roles(&self) -> Result<Vec<String>, AdminError> {
        decode_roles(&self.data)
    }
}

/// Encodes a role list. The count is derived from the list, never supplied by callers.
pub fn encode_roles<S: AsRef<str>>(roles: &[S]) -> Result<Bytes, AdminError> {
    if roles.len() > MAX_ROLES_PER_FIELD {
        return Err(AdminError::Param(format!(
            "at most {MAX_ROLES_PER_FIELD} roles can be sent in one request"
        )));
    }

    let payload_len: usize = roles.iter().map(|r| 1 + r.as_ref().len()).sum();
    let mut buf = BytesMut::with_capacity(1 + payload_len);
    buf.put_u8(roles.len() as u8);
    for role in roles {
        let name = role.as_ref();
        // A name this long cannot be a known role.
        if name.len() > MAX_ROLE_NAME_LEN {
            return Err(AdminError::InvalidRole(InvalidRoleDetail::Unknown(
                name.to_string(),
            )));
        }
        buf.put_u8(name.len() as u8);
        buf.put_slice(name.as_bytes());
    }
    Ok(buf.freeze())
}

/// Decodes a role list produced by `encode_roles`.
pub fn decode_roles(mut data: &[u8]) -> Result<Vec<String>, AdminError> {
    let Some((&count, rest)) = data.split_first() else {
        return Err(AdminError::protocol("empty role field"));
    };
    data = rest;

    let mut roles = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let Some((&len, rest)) = data.split_first() else {
            return Err(AdminError::protocol("truncated role field"));
        };
        let len = len as usize;
        if rest.len() < len {
            return Err(AdminError::protocol("truncated role name"));
        }
        roles.push(String::from_utf8(rest[..len].to_vec())?);
        data = &rest[len..];
    }

    if !data.is_empty() {
        return Err(AdminError::protocol("trailing bytes after role list"));
    }
    Ok(roles)
}
