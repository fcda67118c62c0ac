//! The RDF term model: an IRI, a blank node, or a literal.

/// A literal's datatype/language annotation. Exactly one of these three
/// shapes applies to any given literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Plain,
    Typed(String),
    Language(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub lexical: String,
    pub kind: LiteralKind,
}

impl Literal {
    pub fn plain(lexical: impl Into<String>) -> Self {
        Literal {
            lexical: lexical.into(),
            kind: LiteralKind::Plain,
        }
    }

    pub fn typed(lexical: impl Into<String>, datatype_iri: impl Into<String>) -> Self {
        Literal {
            lexical: lexical.into(),
            kind: LiteralKind::Typed(datatype_iri.into()),
        }
    }

    pub fn language_tagged(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Literal {
            lexical: lexical.into(),
            // Language tags are case-insensitive; normalize to lowercase up
            // front so that `Literal` equality matches term-identity rules.
            kind: LiteralKind::Language(language.into().to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Iri(String),
    BlankNode(String),
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn blank_node(label: impl Into<String>) -> Self {
        Term::BlankNode(label.into())
    }

    pub fn literal(literal: Literal) -> Self {
        Term::Literal(literal)
    }

    /// The dictionary tag a *dictionary-backed* encoding of this term would
    /// use. Callers that want the inline fast path check that separately —
    /// this reflects only term *kind*, not inline eligibility.
    pub fn dictionary_tag(&self) -> u8 {
        match self {
            Term::Iri(_) => crate::id_codec::TAG_URI,
            Term::BlankNode(_) => crate::id_codec::TAG_BNODE,
            Term::Literal(_) => crate::id_codec::TAG_LITERAL,
        }
    }
}
