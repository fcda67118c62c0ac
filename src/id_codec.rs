//! Bit-packing for 64-bit term identifiers.
//!
//! An id is a 4-bit type tag (bits 63..60) followed by a 60-bit payload
//! (bits 59..0). Dictionary tags (URI/BNode/Literal) carry a sequence
//! number in the payload; inline tags (Integer/Decimal/DateTime) carry the
//! value itself, avoiding a dictionary round trip for common scalar types.

use chrono::{DateTime, TimeZone, Utc};

pub const PAYLOAD_BITS: u32 = 60;
pub const TAG_BITS: u32 = 4;
const PAYLOAD_MASK: u64 = (1u64 << PAYLOAD_BITS) - 1;

/// Exclusive upper bound on inline/dictionary payloads: 2^60.
pub const PAYLOAD_LIMIT: u64 = 1u64 << PAYLOAD_BITS;

/// Dictionary sequence numbers must stay strictly below 2^59 so that
/// `SequenceOverflow` can be raised before the payload field itself would
/// overflow.
pub const SEQUENCE_LIMIT: u64 = 1u64 << (PAYLOAD_BITS - 1);

pub const TAG_URI: u8 = 1;
pub const TAG_BNODE: u8 = 2;
pub const TAG_LITERAL: u8 = 3;
pub const TAG_INTEGER: u8 = 4;
pub const TAG_DECIMAL: u8 = 5;
pub const TAG_DATETIME: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Uri,
    BNode,
    Literal,
    Integer,
    Decimal,
    DateTime,
    Unknown,
}

impl Kind {
    fn from_tag(tag: u8) -> Kind {
        match tag {
            TAG_URI => Kind::Uri,
            TAG_BNODE => Kind::BNode,
            TAG_LITERAL => Kind::Literal,
            TAG_INTEGER => Kind::Integer,
            TAG_DECIMAL => Kind::Decimal,
            TAG_DATETIME => Kind::DateTime,
            _ => Kind::Unknown,
        }
    }
}

/// An inline-encoding range failure. Never surfaced to callers outside this
/// module: `DictionaryStore` catches it and routes the value through
/// dictionary allocation instead (see `error::Status` doc comment).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange;

/// Packs `tag` (0..=15) and `payload` (0..2^60) into a single id.
///
/// # Panics
///
/// Panics if `tag > 15` or `payload >= 2^60` — both are programmer errors at
/// every call site in this crate, never user input.
#[inline]
pub fn encode(tag: u8, payload: u64) -> u64 {
    assert!(tag <= 0x0F, "tag {} does not fit in 4 bits", tag);
    assert!(payload < PAYLOAD_LIMIT, "payload {} does not fit in 60 bits", payload);
    ((tag as u64) << PAYLOAD_BITS) | payload
}

/// Splits `id` back into its tag kind and payload.
#[inline]
pub fn decode(id: u64) -> (Kind, u64) {
    let tag = (id >> PAYLOAD_BITS) as u8;
    (Kind::from_tag(tag), id & PAYLOAD_MASK)
}

#[inline]
pub fn tag_of(id: u64) -> u8 {
    (id >> PAYLOAD_BITS) as u8
}

#[inline]
pub fn is_inline(id: u64) -> bool {
    matches!(tag_of(id), TAG_INTEGER | TAG_DECIMAL | TAG_DATETIME)
}

#[inline]
pub fn is_dictionary(id: u64) -> bool {
    matches!(tag_of(id), TAG_URI | TAG_BNODE | TAG_LITERAL)
}

/// Inline integer range: `[-2^59, 2^59)`. Values outside it are not
/// representable inline and must fall back to a Literal-tagged dictionary id.
pub const INTEGER_MIN: i64 = -(1i64 << (PAYLOAD_BITS - 1));
pub const INTEGER_MAX_EXCLUSIVE: i64 = 1i64 << (PAYLOAD_BITS - 1);

/// Encodes `value` as an inline Integer id, or `OutOfRange` if it falls
/// outside `[-2^59, 2^59)`.
pub fn encode_integer(value: i64) -> Result<u64, OutOfRange> {
    if value < INTEGER_MIN || value >= INTEGER_MAX_EXCLUSIVE {
        return Err(OutOfRange);
    }
    let payload = (value as u64) & PAYLOAD_MASK;
    Ok(encode(TAG_INTEGER, payload))
}

/// Decodes an inline Integer id produced by `encode_integer`, re-sign-extending
/// bit 59 into the full `i64` range.
pub fn decode_integer(id: u64) -> i64 {
    let payload = id & PAYLOAD_MASK;
    let sign_bit = 1u64 << (PAYLOAD_BITS - 1);
    if payload & sign_bit != 0 {
        // Sign-extend: set every bit above bit 59.
        (payload | !PAYLOAD_MASK) as i64
    } else {
        payload as i64
    }
}

/// Encodes a UTC datetime as inline milliseconds-since-epoch. Pre-1970
/// instants, and instants at or beyond `2^60` ms, are out of range and must
/// fall back to dictionary storage.
pub fn encode_datetime(dt: DateTime<Utc>) -> Result<u64, OutOfRange> {
    let millis = dt.timestamp_millis();
    if millis < 0 || (millis as u64) >= PAYLOAD_LIMIT {
        return Err(OutOfRange);
    }
    Ok(encode(TAG_DATETIME, millis as u64))
}

/// Decodes an inline DateTime id back to a UTC `DateTime`, truncated to
/// millisecond resolution (the resolution the encoding preserves).
pub fn decode_datetime(id: u64) -> DateTime<Utc> {
    let payload = id & PAYLOAD_MASK;
    Utc.timestamp_millis_opt(payload as i64)
        .single()
        .expect("payload was range-checked by encode_datetime")
}

/// Biased-exponent decimal: `sign(1) | biased_exponent(11) | coefficient(48)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    pub negative: bool,
    pub coefficient: u64,
    pub exponent: i32,
}

const DECIMAL_EXP_BIAS: i32 = 1023;
const DECIMAL_EXP_BITS: u32 = 11;
const DECIMAL_COEF_BITS: u32 = 48;
const DECIMAL_COEF_LIMIT: u64 = 1u64 << DECIMAL_COEF_BITS;
const DECIMAL_EXP_LIMIT: u32 = 1u32 << DECIMAL_EXP_BITS;

/// Encodes a decimal value inline. `coefficient == 0` always encodes as the
/// all-zero (signless) payload regardless of `negative`/`exponent`, matching
/// the "zero value is the all-zero payload" invariant.
pub fn encode_decimal(d: Decimal) -> Result<u64, OutOfRange> {
    if d.coefficient == 0 {
        return Ok(encode(TAG_DECIMAL, 0));
    }
    if d.coefficient >= DECIMAL_COEF_LIMIT {
        return Err(OutOfRange);
    }
    let biased = d.exponent + DECIMAL_EXP_BIAS;
    if biased < 0 || biased as u32 >= DECIMAL_EXP_LIMIT {
        return Err(OutOfRange);
    }
    let sign_bit = if d.negative { 1u64 } else { 0u64 };
    let payload = (sign_bit << (DECIMAL_EXP_BITS + DECIMAL_COEF_BITS))
        | ((biased as u64) << DECIMAL_COEF_BITS)
        | d.coefficient;
    Ok(encode(TAG_DECIMAL, payload))
}

/// Decodes an inline Decimal id produced by `encode_decimal`.
pub fn decode_decimal(id: u64) -> Decimal {
    let payload = id & PAYLOAD_MASK;
    if payload == 0 {
        return Decimal {
            negative: false,
            coefficient: 0,
            exponent: -DECIMAL_EXP_BIAS,
        };
    }
    let coefficient = payload & (DECIMAL_COEF_LIMIT - 1);
    let biased = (payload >> DECIMAL_COEF_BITS) & (DECIMAL_EXP_LIMIT as u64 - 1);
    let negative = (payload >> (DECIMAL_EXP_BITS + DECIMAL_COEF_BITS)) & 1 == 1;
    Decimal {
        negative,
        coefficient,
        exponent: biased as i32 - DECIMAL_EXP_BIAS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_payload_round_trip() {
        for tag in 1u8..=6 {
            for payload in [0u64, 1, 12345, PAYLOAD_LIMIT - 1] {
                let id = encode(tag, payload);
                let (kind, p) = decode(id);
                assert_eq!(p, payload);
                assert_eq!(tag_of(id), tag);
                match tag {
                    TAG_URI => assert_eq!(kind, Kind::Uri),
                    TAG_BNODE => assert_eq!(kind, Kind::BNode),
                    TAG_LITERAL => assert_eq!(kind, Kind::Literal),
                    TAG_INTEGER => assert_eq!(kind, Kind::Integer),
                    TAG_DECIMAL => assert_eq!(kind, Kind::Decimal),
                    TAG_DATETIME => assert_eq!(kind, Kind::DateTime),
                    _ => unreachable!(),
                }
            }
        }
    }

    #[test]
    fn inline_vs_dictionary_tags() {
        assert!(is_dictionary(encode(TAG_URI, 0)));
        assert!(is_dictionary(encode(TAG_BNODE, 0)));
        assert!(is_dictionary(encode(TAG_LITERAL, 0)));
        assert!(is_inline(encode(TAG_INTEGER, 0)));
        assert!(is_inline(encode(TAG_DECIMAL, 0)));
        assert!(is_inline(encode(TAG_DATETIME, 0)));
    }

    #[test]
    fn integer_boundaries() {
        for v in [0i64, 1, -1, INTEGER_MAX_EXCLUSIVE - 1, INTEGER_MIN] {
            let id = encode_integer(v).expect("in range");
            assert_eq!(tag_of(id), TAG_INTEGER);
            assert_eq!(decode_integer(id), v);
        }
        assert_eq!(encode_integer(INTEGER_MAX_EXCLUSIVE), Err(OutOfRange));
        assert_eq!(encode_integer(INTEGER_MIN - 1), Err(OutOfRange));
    }

    #[test]
    fn datetime_round_trip() {
        let dt = Utc.timestamp_millis_opt(1_700_000_000_123).single().unwrap();
        let id = encode_datetime(dt).expect("in range");
        assert_eq!(tag_of(id), TAG_DATETIME);
        assert_eq!(decode_datetime(id), dt);
    }

    #[test]
    fn datetime_before_epoch_is_out_of_range() {
        let dt = Utc.timestamp_millis_opt(-1).single().unwrap();
        assert_eq!(encode_datetime(dt), Err(OutOfRange));
    }

    #[test]
    fn decimal_round_trip() {
        let d = Decimal {
            negative: true,
            coefficient: 12345,
            exponent: -2,
        };
        let id = encode_decimal(d).expect("in range");
        assert_eq!(decode_decimal(id), d);
    }

    #[test]
    fn decimal_zero_is_signless() {
        let positive_zero = Decimal {
            negative: false,
            coefficient: 0,
            exponent: 5,
        };
        let negative_zero = Decimal {
            negative: true,
            coefficient: 0,
            exponent: -5,
        };
        let id_pos = encode_decimal(positive_zero).unwrap();
        let id_neg = encode_decimal(negative_zero).unwrap();
        assert_eq!(id_pos, id_neg);
        assert_eq!(id_pos & PAYLOAD_MASK, 0);
    }

    #[test]
    fn decimal_coefficient_out_of_range() {
        let d = Decimal {
            negative: false,
            coefficient: DECIMAL_COEF_LIMIT,
            exponent: 0,
        };
        assert_eq!(encode_decimal(d), Err(OutOfRange));
    }
}
