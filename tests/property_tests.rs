//! Property-based tests using proptest
//!
//! These tests validate protocol invariants across a wide range of randomly
//! generated inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use bytes::BytesMut;
use object_exchange::core::codec::FrameCodec;
use object_exchange::core::frame::{Frame, HEADER_SIZE};
use object_exchange::error::ProtocolError;
use object_exchange::protocol::admission::AdmissionController;
use object_exchange::protocol::catalog::{Catalog, Category};
use object_exchange::protocol::message::ResultPayload;
use object_exchange::transport::connection::Connection;
use proptest::prelude::*;
use tokio_util::codec::{Decoder, Encoder};

fn category() -> impl Strategy<Value = Category> {
    prop_oneof![
        Just(Category::Cat),
        Just(Category::Dog),
        Just(Category::Human)
    ]
}

// Property: Any payload survives write_frame / read_frame over a stream
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn prop_frame_roundtrip_over_stream(payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..4096), 1..8)) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let received = runtime.block_on(async {
            let (a, b) = tokio::io::duplex(512);
            let mut writer = Connection::new(a);
            let mut reader = Connection::new(b);

            let outgoing = payloads.clone();
            let send = tokio::spawn(async move {
                for payload in outgoing {
                    writer.write_frame(payload).await.unwrap();
                }
            });

            let mut received = Vec::new();
            for _ in 0..payloads.len() {
                received.push(reader.read_frame().await.unwrap());
            }
            send.await.unwrap();
            received
        });

        prop_assert_eq!(received, payloads);
    }
}

// Property: The codec reassembles a frame no matter where the stream is split
proptest! {
    #[test]
    fn prop_codec_split_anywhere(payload in prop::collection::vec(any::<u8>(), 0..2000), split in any::<prop::sample::Index>()) {
        let bytes = Frame::new(payload.clone()).to_bytes();
        let at = split.index(bytes.len() + 1);

        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&bytes[..at]);
        let early = codec.decode(&mut buf).unwrap();
        if at < bytes.len() {
            prop_assert!(early.is_none());
            buf.extend_from_slice(&bytes[at..]);
            let frame = codec.decode(&mut buf).unwrap().expect("complete frame");
            prop_assert_eq!(frame.payload, payload);
        } else {
            prop_assert_eq!(early.expect("complete frame").payload, payload);
        }
        prop_assert!(buf.is_empty());
    }
}

// Property: Encoded size is always header plus payload
proptest! {
    #[test]
    fn prop_encoded_size_accurate(payload in prop::collection::vec(any::<u8>(), 0..10000)) {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Frame::new(payload.clone()), &mut buf).unwrap();
        prop_assert_eq!(buf.len(), HEADER_SIZE + payload.len());
        prop_assert_eq!(&buf[..HEADER_SIZE], &(payload.len() as u32).to_be_bytes()[..]);
    }
}

// Property: Decoding arbitrary bytes never panics
proptest! {
    #[test]
    fn prop_decode_garbage_never_panics(data in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut codec = FrameCodec::with_max_frame_size(1024);
        let mut buf = BytesMut::from(&data[..]);
        let _ = codec.decode(&mut buf);
        let _ = Frame::from_bytes(&data);
    }
}

// Property: The codec and in-memory parsing agree on oversized frames for the same limit
proptest! {
    #[test]
    fn prop_oversize_agrees_with_codec(len in 0u32..4096, limit in 0usize..4096) {
        let mut bytes = len.to_be_bytes().to_vec();
        bytes.resize(HEADER_SIZE + len as usize, 0);

        let mut codec = FrameCodec::with_max_frame_size(limit);
        let mut buf = BytesMut::from(&bytes[..]);
        let codec_oversized = matches!(codec.decode(&mut buf), Err(ProtocolError::OversizedFrame(_)));
        let frame_oversized = matches!(
            Frame::from_bytes_with_limit(&bytes, limit),
            Err(ProtocolError::OversizedFrame(_))
        );

        prop_assert_eq!(codec_oversized, frame_oversized);
        prop_assert_eq!(codec_oversized, len as usize > limit);
    }
}

// Property: Admission never exceeds capacity, and every grant is released
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]
    #[test]
    fn prop_admission_never_exceeds_capacity(max_clients in 0usize..8, attempts in 1usize..48) {
        let controller = Arc::new(AdmissionController::new(max_clients));
        let handles: Vec<_> = (0..attempts)
            .map(|_| {
                let controller = Arc::clone(&controller);
                std::thread::spawn(move || {
                    let admitted = controller.try_admit();
                    let observed = controller.active();
                    (admitted, observed)
                })
            })
            .collect();

        let results: Vec<(bool, usize)> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let granted = results.iter().filter(|(admitted, _)| *admitted).count();

        prop_assert_eq!(granted, max_clients.min(attempts));
        prop_assert!(results.iter().all(|(_, observed)| *observed <= max_clients));
        prop_assert_eq!(controller.active(), granted);

        for _ in 0..granted {
            controller.release();
        }
        prop_assert_eq!(controller.active(), 0);
    }
}

// Property: Prefix queries return exactly the matching records in insertion order
proptest! {
    #[test]
    fn prop_prefix_query_matches_filter(kinds in prop::collection::vec(category(), 1..30), wanted in category()) {
        let mut builder = Catalog::builder();
        for (i, kind) in kinds.iter().enumerate() {
            builder.add(*kind, format!("name-{i}"));
        }
        let catalog = builder.build();

        let expected: Vec<_> = catalog.iter().filter(|r| r.category == wanted).cloned().collect();
        let payload = catalog.resolve_query(wanted.as_str(), &mut rand::rng());

        if expected.is_empty() {
            match payload {
                ResultPayload::Single(record) => prop_assert!(catalog.contains(&record)),
                ResultPayload::Collection(_) => prop_assert!(false, "expected fallback record"),
            }
        } else {
            prop_assert_eq!(payload, ResultPayload::Collection(expected));
        }
    }
}
