// tests/property/codec_test.rs

//! Property-based tests for the admin wire codec
//! Decoding must never panic, and well-formed frames survive the trip intact

use bytes::{Bytes, BytesMut};
use proptest::prelude::*;
use spineldb_admin::core::protocol::admin_frame::MAX_BODY_LEN;
use spineldb_admin::core::protocol::fields::{decode_roles, encode_roles};
use spineldb_admin::core::protocol::{AdminField, AdminFrame, AdminFrameCodec};
use tokio_util::codec::{Decoder, Encoder};

fn arb_field() -> impl Strategy<Value = AdminField> {
    (any::<u8>(), prop::collection::vec(any::<u8>(), 0..64)).prop_map(|(id, data)| AdminField {
        id,
        data: Bytes::from(data),
    })
}

fn arb_frame() -> impl Strategy<Value = AdminFrame> {
    (
        any::<u8>(),
        any::<u8>(),
        prop::collection::vec(arb_field(), 0..8),
    )
        .prop_map(|(command, result_code, fields)| AdminFrame {
            command,
            result_code,
            fields,
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_decode_arbitrary_bytes_never_panics(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut buf = BytesMut::from(&data[..]);
        let _ = AdminFrameCodec.decode(&mut buf);
    }

    #[test]
    fn test_decode_with_valid_header_never_panics(
        body in prop::collection::vec(any::<u8>(), 16..128),
    ) {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[2, 2]);
        buf.extend_from_slice(&(body.len() as u64).to_be_bytes()[2..]);
        buf.extend_from_slice(&body);
        if let Ok(Some(frame)) = AdminFrameCodec.decode(&mut buf) {
            prop_assert_eq!(frame.fields.len(), body[3] as usize);
        }
    }

    #[test]
    fn test_encoded_frame_decodes_to_itself(frame in arb_frame()) {
        let mut buf = BytesMut::new();
        AdminFrameCodec.encode(frame.clone(), &mut buf).unwrap();
        prop_assert!(buf.len() <= 8 + MAX_BODY_LEN);

        let decoded = AdminFrameCodec.decode(&mut buf).unwrap();
        prop_assert_eq!(decoded, Some(frame));
        prop_assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_frame_waits_for_more_data(frame in arb_frame(), cut in 0usize..1000) {
        let bytes = frame.encode_to_vec().unwrap();
        let cut = cut % bytes.len();
        let mut buf = BytesMut::from(&bytes[..cut]);
        prop_assert_eq!(AdminFrameCodec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(&bytes[cut..]);
        prop_assert_eq!(AdminFrameCodec.decode(&mut buf).unwrap(), Some(frame));
    }

    #[test]
    fn test_role_list_count_is_derived_from_list(
        roles in prop::collection::vec("[a-z-]{0,20}", 0..16),
    ) {
        let encoded = encode_roles(&roles).unwrap();
        prop_assert_eq!(encoded[0] as usize, roles.len());
        prop_assert_eq!(decode_roles(&encoded).unwrap(), roles);
    }

    #[test]
    fn test_decode_roles_never_panics(data in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = decode_roles(&data);
    }
}
