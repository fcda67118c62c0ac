//! Serializes RDF terms to the binary layout used both as the `str2id` key
//! and as the `id2str` value: a discriminator byte followed by the term
//! body. See the external interfaces section for the column family layout.
//!
//! Numeric literal lexical forms are *not* canonicalized beyond NFC: `"1"`
//! and `"01"` of the same datatype are distinct terms here. Callers that
//! want canonical numerics should re-encode from a parsed value before
//! calling into the dictionary.

use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};
use crate::term::{Literal, LiteralKind, Term};

pub const MAX_TERM_BYTES: usize = 16_384;

const PREFIX_IRI: u8 = 1;
const PREFIX_BNODE: u8 = 2;
const PREFIX_LITERAL: u8 = 3;

const LITERAL_PLAIN: u8 = 0;
const LITERAL_TYPED: u8 = 1;
const LITERAL_LANGUAGE: u8 = 2;

fn nfc(s: &str) -> String {
    s.nfc().collect()
}

fn check_size(byte_len: usize) -> Result<()> {
    if byte_len > MAX_TERM_BYTES {
        return Err(Error::term_too_large(byte_len));
    }
    Ok(())
}

/// Validates and NFC-normalizes raw bytes meant to become the lexical
/// content of a URI. URIs may not contain NUL (it is reserved as the
/// intra-literal separator) and must be valid UTF-8.
pub fn validate_uri_bytes(bytes: &[u8]) -> Result<String> {
    check_size(bytes.len())?;
    if bytes.contains(&0) {
        return Err(Error::null_byte_in_uri());
    }
    let s = std::str::from_utf8(bytes).map_err(|_| Error::invalid_utf8())?;
    Ok(nfc(s))
}

/// Validates and NFC-normalizes raw bytes meant to become a literal's
/// lexical form. Unlike URIs, literals may legally contain NUL bytes.
pub fn validate_literal_bytes(bytes: &[u8]) -> Result<String> {
    check_size(bytes.len())?;
    let s = std::str::from_utf8(bytes).map_err(|_| Error::invalid_utf8())?;
    Ok(nfc(s))
}

/// Encodes a term to its binary key/value representation.
///
/// Validation order: overall size, then (for URIs) NUL-byte
/// presence, then UTF-8 validity — but since `Term`'s fields are already
/// `String`, UTF-8 validity is a type-level invariant by the time a `Term`
/// reaches this function; the UTF-8 check is exercised on the raw-bytes
/// entry points above, which is where ingestion actually meets untrusted
/// input. NFC normalization happens here, unconditionally, before framing.
pub fn encode(term: &Term) -> Result<Vec<u8>> {
    match term {
        Term::Iri(iri) => {
            let normalized = nfc(iri);
            check_size(normalized.len() + 1)?;
            if normalized.as_bytes().contains(&0) {
                return Err(Error::null_byte_in_uri());
            }
            let mut out = Vec::with_capacity(normalized.len() + 1);
            out.push(PREFIX_IRI);
            out.extend_from_slice(normalized.as_bytes());
            Ok(out)
        }
        Term::BlankNode(label) => {
            let normalized = nfc(label);
            check_size(normalized.len() + 1)?;
            let mut out = Vec::with_capacity(normalized.len() + 1);
            out.push(PREFIX_BNODE);
            out.extend_from_slice(normalized.as_bytes());
            Ok(out)
        }
        Term::Literal(lit) => encode_literal(lit),
    }
}

fn encode_literal(lit: &Literal) -> Result<Vec<u8>> {
    let lexical = nfc(&lit.lexical);
    let mut out = vec![PREFIX_LITERAL];
    match &lit.kind {
        LiteralKind::Plain => {
            out.push(LITERAL_PLAIN);
            out.extend_from_slice(lexical.as_bytes());
        }
        LiteralKind::Typed(datatype_iri) => {
            if datatype_iri.as_bytes().contains(&0) {
                return Err(Error::null_byte_in_uri());
            }
            let datatype = nfc(datatype_iri);
            out.push(LITERAL_TYPED);
            out.extend_from_slice(datatype.as_bytes());
            out.push(0);
            out.extend_from_slice(lexical.as_bytes());
        }
        LiteralKind::Language(lang) => {
            let lang = nfc(&lang.to_lowercase());
            out.push(LITERAL_LANGUAGE);
            out.extend_from_slice(lang.as_bytes());
            out.push(0);
            out.extend_from_slice(lexical.as_bytes());
        }
    }
    check_size(out.len())?;
    Ok(out)
}

/// Decodes a term from the bytes produced by `encode`.
pub fn decode(bytes: &[u8]) -> Result<Term> {
    let (&prefix, body) = bytes
        .split_first()
        .ok_or_else(|| Error::unsupported_term("empty term key"))?;
    match prefix {
        PREFIX_IRI => Ok(Term::Iri(utf8(body)?)),
        PREFIX_BNODE => Ok(Term::BlankNode(utf8(body)?)),
        PREFIX_LITERAL => decode_literal(body),
        other => Err(Error::unsupported_term(&format!("unknown term prefix byte {}", other))),
    }
}

fn decode_literal(body: &[u8]) -> Result<Term> {
    let (&subtype, rest) = body
        .split_first()
        .ok_or_else(|| Error::unsupported_term("empty literal body"))?;
    match subtype {
        LITERAL_PLAIN => Ok(Term::Literal(Literal::plain(utf8(rest)?))),
        LITERAL_TYPED => {
            let (datatype, lexical) = split_on_nul(rest)?;
            Ok(Term::Literal(Literal::typed(utf8(lexical)?, utf8(datatype)?)))
        }
        LITERAL_LANGUAGE => {
            let (lang, lexical) = split_on_nul(rest)?;
            Ok(Term::Literal(Literal::language_tagged(utf8(lexical)?, utf8(lang)?)))
        }
        other => Err(Error::unsupported_term(&format!("unknown literal subtype {}", other))),
    }
}

fn split_on_nul(body: &[u8]) -> Result<(&[u8], &[u8])> {
    let pos = body
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::unsupported_term("missing NUL separator in typed/language literal"))?;
    Ok((&body[..pos], &body[pos + 1..]))
}

fn utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(String::from)
        .map_err(|_| Error::invalid_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;

    #[test]
    fn iri_round_trip() {
        let term = Term::iri("http://example.org/a");
        let bytes = encode(&term).unwrap();
        assert_eq!(bytes[0], PREFIX_IRI);
        assert_eq!(decode(&bytes).unwrap(), term);
    }

    #[test]
    fn bnode_round_trip() {
        let term = Term::blank_node("b0");
        let bytes = encode(&term).unwrap();
        assert_eq!(bytes[0], PREFIX_BNODE);
        assert_eq!(decode(&bytes).unwrap(), term);
    }

    #[test]
    fn plain_literal_round_trip() {
        let term = Term::literal(Literal::plain("hello"));
        let bytes = encode(&term).unwrap();
        assert_eq!(decode(&bytes).unwrap(), term);
    }

    #[test]
    fn typed_literal_round_trip() {
        let term = Term::literal(Literal::typed(
            "42",
            "http://www.w3.org/2001/XMLSchema#integer",
        ));
        let bytes = encode(&term).unwrap();
        assert_eq!(decode(&bytes).unwrap(), term);
    }

    #[test]
    fn language_literal_is_lowercased() {
        let term = Term::literal(Literal::language_tagged("Bonjour", "FR"));
        let bytes = encode(&term).unwrap();
        match decode(&bytes).unwrap() {
            Term::Literal(lit) => assert_eq!(lit.kind, LiteralKind::Language("fr".to_string())),
            _ => panic!("expected literal"),
        }
    }

    #[test]
    fn literal_may_contain_nul() {
        let term = Term::literal(Literal::plain("a\0b"));
        let bytes = encode(&term).unwrap();
        assert_eq!(decode(&bytes).unwrap(), term);
    }

    #[test]
    fn uri_with_nul_is_rejected() {
        let term = Term::iri("http://ex/a\0b");
        let err = encode(&term).unwrap_err();
        assert_eq!(err.status(), Status::NullByteInUri);
    }

    #[test]
    fn oversized_term_is_rejected() {
        let huge = "a".repeat(MAX_TERM_BYTES + 1);
        let term = Term::iri(huge);
        let err = encode(&term).unwrap_err();
        assert_eq!(err.status(), Status::TermTooLarge);
    }

    #[test]
    fn oversized_uri_with_nul_reports_size_first() {
        let huge = format!("{}\0", "a".repeat(MAX_TERM_BYTES));
        let term = Term::iri(huge);
        let err = encode(&term).unwrap_err();
        assert_eq!(err.status(), Status::TermTooLarge);
    }

    #[test]
    fn nfc_normalizes_lexical_form() {
        // "e" + combining acute accent vs. precomposed "é" — same term after NFC.
        let decomposed = Term::iri("http://ex/caf\u{0065}\u{0301}");
        let precomposed = Term::iri("http://ex/caf\u{00e9}");
        assert_eq!(encode(&decomposed).unwrap(), encode(&precomposed).unwrap());
    }

    #[test]
    fn invalid_utf8_on_raw_bytes_is_rejected() {
        let bytes = [0xFFu8, 0xFE, 0xFD];
        let err = validate_uri_bytes(&bytes).unwrap_err();
        assert_eq!(err.status(), Status::InvalidUtf8);
    }

    #[test]
    fn distinct_numeric_lexical_forms_are_distinct_terms() {
        let one = Term::literal(Literal::typed("1", "http://www.w3.org/2001/XMLSchema#integer"));
        let zero_one = Term::literal(Literal::typed("01", "http://www.w3.org/2001/XMLSchema#integer"));
        assert_ne!(encode(&one).unwrap(), encode(&zero_one).unwrap());
    }
}
