//! Raw log decoding.
//!
//! Decoding is done by hand rather than through `SolEvent::decode_log_data`
//! so that arity problems are reported as distinct [`DecodeError`] variants
//! and so that address topics are read from their low 20 bytes regardless of
//! what sits in the padding.

use alloy::primitives::{Address, U256};

use super::registry::EventKind;
use super::{DecodedEvent, RawLog};
use crate::error::DecodeError;

/// Decodes a raw log into a [`DecodedEvent`].
///
/// # Errors
///
/// - [`DecodeError::UnknownEvent`] when `topics[0]` is absent or unregistered
/// - [`DecodeError::MalformedTopics`] when the topic count is wrong
/// - [`DecodeError::MalformedPayload`] when the payload is not one word
pub fn decode(raw: &RawLog) -> Result<DecodedEvent, DecodeError> {
    let topic0 = raw.topics.first();
    let kind = topic0
        .and_then(EventKind::from_topic)
        .ok_or(DecodeError::UnknownEvent {
            topic0: topic0.copied(),
        })?;

    if raw.topics.len() != kind.topic_count() {
        return Err(DecodeError::MalformedTopics {
            event: kind,
            expected: kind.topic_count(),
            actual: raw.topics.len(),
        });
    }

    if raw.data.len() != kind.payload_len() {
        return Err(DecodeError::MalformedPayload {
            event: kind,
            expected: kind.payload_len(),
            actual: raw.data.len(),
        });
    }

    // Indexed addresses are left-padded to a full word.
    let first = Address::from_word(raw.topics[1]);
    let second = Address::from_word(raw.topics[2]);
    let value = U256::from_be_slice(&raw.data);

    let event = match kind {
        EventKind::Transfer => DecodedEvent::Transfer {
            from: first,
            to: second,
            value,
            block_number: raw.block_number,
            tx_hash: raw.tx_hash,
            log_index: raw.log_index,
        },
        EventKind::Approval => DecodedEvent::Approval {
            owner: first,
            spender: second,
            value,
            block_number: raw.block_number,
            tx_hash: raw.tx_hash,
            log_index: raw.log_index,
        },
    };

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256, Bytes, B256};

    fn word(value: U256) -> Bytes {
        Bytes::from(value.to_be_bytes::<32>().to_vec())
    }

    fn raw(topics: Vec<B256>, data: Bytes) -> RawLog {
        RawLog {
            address: address!("1234567890abcdef1234567890abcdef12345678"),
            topics,
            data,
            block_number: 19_000_000,
            tx_hash: b256!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            log_index: 7,
        }
    }

    #[test]
    fn test_decode_transfer() {
        let from = address!("1111111111111111111111111111111111111111");
        let to = address!("2222222222222222222222222222222222222222");
        let log = raw(
            vec![
                EventKind::Transfer.topic_hash(),
                from.into_word(),
                to.into_word(),
            ],
            word(U256::from(1000)),
        );

        let event = decode(&log).expect("transfer should decode");
        assert_eq!(
            event,
            DecodedEvent::Transfer {
                from,
                to,
                value: U256::from(1000),
                block_number: 19_000_000,
                tx_hash: log.tx_hash,
                log_index: 7,
            }
        );
    }

    #[test]
    fn test_decode_approval() {
        let owner = address!("3333333333333333333333333333333333333333");
        let spender = address!("4444444444444444444444444444444444444444");
        let log = raw(
            vec![
                EventKind::Approval.topic_hash(),
                owner.into_word(),
                spender.into_word(),
            ],
            word(U256::from(42)),
        );

        let event = decode(&log).expect("approval should decode");
        assert_eq!(event.kind(), EventKind::Approval);
        assert!(matches!(
            event,
            DecodedEvent::Approval { owner: o, spender: s, .. } if o == owner && s == spender
        ));
    }

    #[test]
    fn test_address_ignores_topic_padding() {
        // Dirty high-order bytes must not leak into the address.
        let topic = b256!("0xffffffffffffffffffffffff1234567890abcdef1234567890abcdef12345678");
        let log = raw(
            vec![EventKind::Transfer.topic_hash(), topic, topic],
            word(U256::from(1)),
        );

        let event = decode(&log).expect("transfer should decode");
        let expected = address!("1234567890abcdef1234567890abcdef12345678");
        assert_eq!(event.parties(), (expected, expected));
    }

    #[test]
    fn test_value_full_256_bit_range() {
        let log = raw(
            vec![
                EventKind::Transfer.topic_hash(),
                B256::ZERO,
                B256::ZERO,
            ],
            word(U256::MAX),
        );

        let event = decode(&log).expect("transfer should decode");
        assert_eq!(event.value(), U256::MAX);
        assert_eq!(
            event.value().to_string(),
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        );
    }

    #[test]
    fn test_unknown_signature() {
        let unknown = b256!("0x1c411e9a96e071241c2f21f7726b17ae89e3cab4c78be50e062b03a9fffbbad1");
        let log = raw(vec![unknown, B256::ZERO, B256::ZERO], word(U256::from(1)));

        assert_eq!(
            decode(&log),
            Err(DecodeError::UnknownEvent {
                topic0: Some(unknown)
            })
        );
    }

    #[test]
    fn test_no_topics() {
        let log = raw(vec![], Bytes::new());
        assert_eq!(decode(&log), Err(DecodeError::UnknownEvent { topic0: None }));
    }

    #[test]
    fn test_wrong_topic_count() {
        for topics in [1_usize, 2, 4] {
            let mut list = vec![EventKind::Transfer.topic_hash()];
            list.extend(std::iter::repeat(B256::ZERO).take(topics - 1));
            let log = raw(list, word(U256::from(1)));

            assert_eq!(
                decode(&log),
                Err(DecodeError::MalformedTopics {
                    event: EventKind::Transfer,
                    expected: 3,
                    actual: topics,
                })
            );
        }
    }

    #[test]
    fn test_wrong_payload_length() {
        for len in [0_usize, 31, 33, 64] {
            let log = raw(
                vec![
                    EventKind::Approval.topic_hash(),
                    B256::ZERO,
                    B256::ZERO,
                ],
                Bytes::from(vec![0_u8; len]),
            );

            assert_eq!(
                decode(&log),
                Err(DecodeError::MalformedPayload {
                    event: EventKind::Approval,
                    expected: 32,
                    actual: len,
                })
            );
        }
    }
}
