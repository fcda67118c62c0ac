//! Bridges typed literals to the inline id encodings in `id_codec`.
//!
//! A literal only takes the inline fast path when its lexical form is
//! *already* the canonical rendering this module would produce for the
//! parsed value — e.g. `"7"` is eligible, `"007"` is not. This keeps the
//! round-trip law (`lookup_term(get_or_create_id(t)) == t`) intact without
//! a separate canonicalization pass: a non-canonical numeric literal simply
//! falls through to ordinary dictionary storage, preserving its exact
//! lexical form (see the "literal canonicalization beyond NFC" design note).

use chrono::{DateTime, SecondsFormat, Utc};

use crate::id_codec::{self, Decimal};
use crate::term::{Literal, LiteralKind, Term};

pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
pub const XSD_DATETIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

/// Returns the inline id for `term` if it is a canonically-lexed typed
/// literal of one of the three inline-eligible XSD datatypes and its value
/// fits the inline range; `None` otherwise (caller falls back to the
/// dictionary).
pub fn try_inline_encode(term: &Term) -> Option<u64> {
    let Term::Literal(Literal {
        lexical,
        kind: LiteralKind::Typed(datatype),
    }) = term
    else {
        return None;
    };
    match datatype.as_str() {
        XSD_INTEGER => {
            let value: i64 = lexical.parse().ok()?;
            if value.to_string() != *lexical {
                return None;
            }
            id_codec::encode_integer(value).ok()
        }
        XSD_DECIMAL => {
            let decimal = parse_canonical_decimal(lexical)?;
            id_codec::encode_decimal(decimal).ok()
        }
        XSD_DATETIME => {
            let dt: DateTime<Utc> = lexical.parse().ok()?;
            if render_datetime(dt) != *lexical {
                return None;
            }
            id_codec::encode_datetime(dt).ok()
        }
        _ => None,
    }
}

/// Reconstructs the canonical typed-literal `Term` an inline id stands for.
pub fn try_inline_decode(id: u64) -> Option<Term> {
    let (kind, _) = id_codec::decode(id);
    match kind {
        id_codec::Kind::Integer => {
            let value = id_codec::decode_integer(id);
            Some(Term::literal(Literal::typed(value.to_string(), XSD_INTEGER)))
        }
        id_codec::Kind::Decimal => {
            let d = id_codec::decode_decimal(id);
            Some(Term::literal(Literal::typed(render_decimal(d), XSD_DECIMAL)))
        }
        id_codec::Kind::DateTime => {
            let dt = id_codec::decode_datetime(id);
            Some(Term::literal(Literal::typed(render_datetime(dt), XSD_DATETIME)))
        }
        _ => None,
    }
}

fn render_datetime(dt: DateTime<Utc>) -> String {
    if dt.timestamp_subsec_millis() == 0 {
        dt.to_rfc3339_opts(SecondsFormat::Secs, true)
    } else {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

fn render_decimal(d: Decimal) -> String {
    if d.coefficient == 0 {
        return "0.0".to_string();
    }
    let sign = if d.negative { "-" } else { "" };
    format!("{}{}", sign, format_unsigned(d.coefficient, d.exponent))
}

fn format_unsigned(coefficient: u64, exponent: i32) -> String {
    if exponent >= 0 {
        format!("{}{}.0", coefficient, "0".repeat(exponent as usize))
    } else {
        let shift = (-exponent) as usize;
        let digits = coefficient.to_string();
        if digits.len() <= shift {
            format!("0.{}{}", "0".repeat(shift - digits.len()), digits)
        } else {
            let split = digits.len() - shift;
            format!("{}.{}", &digits[..split], &digits[split..])
        }
    }
}

fn parse_canonical_decimal(lexical: &str) -> Option<Decimal> {
    let negative = lexical.starts_with('-');
    let rest = if negative || lexical.starts_with('+') {
        &lexical[1..]
    } else {
        lexical
    };
    let (int_part, frac_part) = match rest.find('.') {
        Some(pos) => (&rest[..pos], &rest[pos + 1..]),
        None => (rest, ""),
    };
    if int_part.is_empty() || frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits: String = format!("{}{}", int_part, frac_part);
    let coefficient: u64 = digits.parse().ok()?;
    let exponent = -(frac_part.len() as i32);
    let decimal = Decimal {
        negative,
        coefficient,
        exponent,
    };
    if render_decimal(decimal) != lexical {
        return None;
    }
    Some(decimal)
}
