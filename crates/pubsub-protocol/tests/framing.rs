//! Round-trip tests for message framing.
//!
//! Random topics and bodies (including absent and empty ones) are encoded
//! back to back into one buffer and decoded again, which also checks that
//! each frame ends exactly where the next begins.

use pubsub_protocol::{
    Message, MessageType, MsgPackCodec, ProtocolError, encode_message,
    read_message,
};
use rand::Rng;

// =========================================================================
// Helpers
// =========================================================================

const KINDS: [MessageType; 5] = [
    MessageType::KeepAlive,
    MessageType::Authenticate,
    MessageType::Subscribe,
    MessageType::Unsubscribe,
    MessageType::Publish,
];

/// A random optional field: absent, empty, or up to `max_len` random bytes.
fn random_field(rng: &mut impl Rng, max_len: usize) -> Option<Vec<u8>> {
    match rng.random_range(0..4) {
        0 => None,
        1 => Some(Vec::new()),
        _ => {
            let len = rng.random_range(1..=max_len);
            Some((0..len).map(|_| rng.random()).collect())
        }
    }
}

fn random_message(rng: &mut impl Rng, max_len: usize) -> Message {
    let kind = KINDS[rng.random_range(0..KINDS.len())];
    Message::new(kind, random_field(rng, max_len), random_field(rng, max_len))
}

// =========================================================================
// Round trips
// =========================================================================

#[tokio::test]
async fn test_random_messages_round_trip_back_to_back() {
    let mut rng = rand::rng();
    let messages: Vec<Message> =
        (0..200).map(|_| random_message(&mut rng, 300)).collect();

    let mut stream = Vec::new();
    for m in &messages {
        stream.extend(encode_message(&MsgPackCodec, m).unwrap());
    }

    let mut reader = stream.as_slice();
    for expected in &messages {
        let decoded = read_message(&MsgPackCodec, &mut reader).await.unwrap();
        assert_eq!(&decoded, expected);
    }
    assert!(reader.is_empty(), "decoder must consume every byte");
}

#[tokio::test]
async fn test_large_body_round_trips_through_bin32() {
    let body = vec![0xab; 70_000];
    let message = Message::publish("big", body.clone());
    let frame = encode_message(&MsgPackCodec, &message).unwrap();
    assert_eq!(frame[6], 0xc6, "body header should be bin32");

    let decoded = read_message(&MsgPackCodec, &mut frame.as_slice()).await.unwrap();
    assert_eq!(decoded.body(), Some(body.as_slice()));
}

#[tokio::test]
async fn test_every_strict_prefix_of_a_frame_fails() {
    let frame =
        encode_message(&MsgPackCodec, &Message::publish("topic", "body")).unwrap();

    for cut in 0..frame.len() {
        let mut reader = &frame[..cut];
        let err = read_message(&MsgPackCodec, &mut reader).await.unwrap_err();
        if cut == 0 {
            assert!(matches!(err, ProtocolError::Closed));
        } else {
            assert!(
                matches!(err, ProtocolError::Truncated(_)),
                "cut at {cut} gave {err:?}"
            );
        }
    }
}

#[tokio::test]
async fn test_decoding_through_a_duplex_stream() {
    use tokio::io::AsyncWriteExt;

    let (mut client, mut server) = tokio::io::duplex(8);
    let message = Message::publish("topic", vec![1u8; 64]);
    let frame = encode_message(&MsgPackCodec, &message).unwrap();

    // The duplex buffer is smaller than the frame, so decoding has to
    // interleave with the writer.
    let writer = tokio::spawn(async move {
        client.write_all(&frame).await.unwrap();
    });
    let decoded = read_message(&MsgPackCodec, &mut server).await.unwrap();
    writer.await.unwrap();
    assert_eq!(decoded, message);
}
