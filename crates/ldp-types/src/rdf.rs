//! Minimal RDF model and N-Triples codec.
//!
//! Only what the persistence layer needs to store and return resource
//! graphs: IRIs and literals, no blank nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RdfError;
use crate::identifier::ResourceId;

/// Vocabulary IRIs used for server-managed triples.
pub mod vocab {
    pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
    pub const XSD_LONG: &str = "http://www.w3.org/2001/XMLSchema#long";

    pub const FEDORA_CREATED: &str = "http://fedora.info/definitions/v4/repository#created";
    pub const FEDORA_CREATED_BY: &str = "http://fedora.info/definitions/v4/repository#createdBy";
    pub const FEDORA_LAST_MODIFIED: &str =
        "http://fedora.info/definitions/v4/repository#lastModified";
    pub const FEDORA_LAST_MODIFIED_BY: &str =
        "http://fedora.info/definitions/v4/repository#lastModifiedBy";
    pub const FEDORA_HAS_PARENT: &str = "http://fedora.info/definitions/v4/repository#hasParent";

    pub const EBUCORE_MIME_TYPE: &str = "http://www.ebu.ch/metadata/ontologies/ebucore/ebucore#hasMimeType";
    pub const EBUCORE_FILENAME: &str = "http://www.ebu.ch/metadata/ontologies/ebucore/ebucore#filename";
    pub const PREMIS_SIZE: &str = "http://www.loc.gov/premis/rdf/v1#hasSize";
    pub const PREMIS_DIGEST: &str = "http://www.loc.gov/premis/rdf/v1#hasMessageDigest";
}

/// An RDF term in subject, predicate or object position.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    Iri(String),
    Literal {
        value: String,
        datatype: Option<String>,
        language: Option<String>,
    },
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Iri(iri.into())
    }

    /// A plain (`xsd:string`) literal.
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn lang(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(iri) => Some(iri),
            Self::Literal { .. } => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{iri}>"),
            Self::Literal {
                value,
                datatype,
                language,
            } => {
                f.write_str("\"")?;
                for c in value.chars() {
                    match c {
                        '\\' => f.write_str("\\\\")?,
                        '"' => f.write_str("\\\"")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")?;
                if let Some(language) = language {
                    write!(f, "@{language}")
                } else if let Some(datatype) = datatype {
                    write!(f, "^^<{datatype}>")
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// A single statement.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// A graph about one topic resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RdfStream {
    pub topic: ResourceId,
    pub triples: Vec<Triple>,
}

impl RdfStream {
    pub fn new(topic: ResourceId, triples: Vec<Triple>) -> Self {
        Self { topic, triples }
    }

    pub fn empty(topic: ResourceId) -> Self {
        Self::new(topic, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Serialize the triples as N-Triples, one statement per line.
    pub fn to_ntriples(&self) -> Vec<u8> {
        write_ntriples(&self.triples)
    }
}

/// Serialize triples as N-Triples.
pub fn write_ntriples(triples: &[Triple]) -> Vec<u8> {
    let mut out = String::new();
    for triple in triples {
        out.push_str(&triple.to_string());
        out.push('\n');
    }
    out.into_bytes()
}

/// Parse an N-Triples document. Comments and blank lines are skipped.
pub fn parse_ntriples(bytes: &[u8]) -> Result<Vec<Triple>, RdfError> {
    let text = std::str::from_utf8(bytes).map_err(|_| RdfError::InvalidUtf8)?;
    let mut triples = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut reader = LineReader {
            rest: line,
            line: index + 1,
        };
        let subject = reader.term()?;
        let predicate = reader.term()?;
        let object = reader.term()?;
        if subject.as_iri().is_none() || predicate.as_iri().is_none() {
            return Err(reader.error("subject and predicate must be IRIs"));
        }
        reader.skip_ws();
        if reader.rest != "." {
            return Err(reader.error("expected '.' at end of statement"));
        }
        triples.push(Triple::new(subject, predicate, object));
    }
    Ok(triples)
}

struct LineReader<'a> {
    rest: &'a str,
    line: usize,
}

impl<'a> LineReader<'a> {
    fn error(&self, reason: &str) -> RdfError {
        RdfError::Malformed {
            line: self.line,
            reason: reason.to_string(),
        }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn term(&mut self) -> Result<Term, RdfError> {
        self.skip_ws();
        if let Some(rest) = self.rest.strip_prefix('<') {
            let end = rest.find('>').ok_or_else(|| self.error("unterminated IRI"))?;
            let iri = &rest[..end];
            self.rest = &rest[end + 1..];
            return Ok(Term::Iri(iri.to_string()));
        }
        if self.rest.starts_with("_:") {
            return Err(self.error("blank nodes are not supported"));
        }
        if let Some(rest) = self.rest.strip_prefix('"') {
            self.rest = rest;
            let value = self.quoted()?;
            if let Some(rest) = self.rest.strip_prefix("^^<") {
                let end = rest
                    .find('>')
                    .ok_or_else(|| self.error("unterminated datatype IRI"))?;
                let datatype = rest[..end].to_string();
                self.rest = &rest[end + 1..];
                return Ok(Term::typed(value, datatype));
            }
            if let Some(rest) = self.rest.strip_prefix('@') {
                let end = rest
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
                    .unwrap_or(rest.len());
                if end == 0 {
                    return Err(self.error("empty language tag"));
                }
                let language = rest[..end].to_string();
                self.rest = &rest[end..];
                return Ok(Term::lang(value, language));
            }
            return Ok(Term::literal(value));
        }
        Err(self.error("expected IRI or literal"))
    }

    /// Read a literal body up to the closing quote, unescaping as it goes.
    fn quoted(&mut self) -> Result<String, RdfError> {
        let mut value = String::new();
        let mut chars = self.rest.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.rest = &self.rest[i + 1..];
                    return Ok(value);
                }
                '\\' => {
                    let unescaped = match chars.next() {
                        Some((_, '\\')) => '\\',
                        Some((_, '"')) => '"',
                        Some((_, 'n')) => '\n',
                        Some((_, 'r')) => '\r',
                        Some((_, 't')) => '\t',
                        _ => return Err(self.error("invalid escape sequence")),
                    };
                    value.push(unescaped);
                }
                c => value.push(c),
            }
        }
        Err(self.error("unterminated literal"))
    }
}
