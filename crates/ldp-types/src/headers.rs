use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifier::ResourceId;
use crate::rdf::{vocab, Term, Triple};

/// The LDP interaction model of a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionModel {
    BasicContainer,
    DirectContainer,
    IndirectContainer,
    NonRdfSource,
    NonRdfSourceDescription,
    Acl,
}

impl InteractionModel {
    /// The RDF type IRI for this model.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::BasicContainer => "http://www.w3.org/ns/ldp#BasicContainer",
            Self::DirectContainer => "http://www.w3.org/ns/ldp#DirectContainer",
            Self::IndirectContainer => "http://www.w3.org/ns/ldp#IndirectContainer",
            Self::NonRdfSource => "http://www.w3.org/ns/ldp#NonRDFSource",
            Self::NonRdfSourceDescription => {
                "http://fedora.info/definitions/v4/repository#NonRdfSourceDescription"
            }
            Self::Acl => "http://fedora.info/definitions/v4/webac#Acl",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::BasicContainer | Self::DirectContainer | Self::IndirectContainer
        )
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::NonRdfSource)
    }
}

/// How a binary whose content lives outside the repository is served.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalHandling {
    /// The repository streams the external content to the client.
    Proxy,
    /// The client is redirected to the external URL.
    Redirect,
}

/// Server-managed properties persisted beside every resource.
///
/// Serialized as JSON into the `.fcrepo` sidecar of the owning storage
/// object. Binary-only fields stay `None` for RDF sources.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHeaders {
    pub id: ResourceId,
    pub parent: Option<ResourceId>,
    pub archival_group_id: Option<ResourceId>,
    pub interaction_model: InteractionModel,
    pub created_date: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub last_modified_date: Option<DateTime<Utc>>,
    pub last_modified_by: Option<String>,
    pub state_token: Option<String>,
    #[serde(default)]
    pub archival_group: bool,
    #[serde(default)]
    pub object_root: bool,
    #[serde(default)]
    pub deleted: bool,
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    pub content_size: Option<u64>,
    #[serde(default)]
    pub digests: Vec<String>,
    pub content_path: Option<String>,
    /// Location of externally held content. Such a binary has no
    /// `content_path`.
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default)]
    pub external_handling: Option<ExternalHandling>,
}

impl ResourceHeaders {
    pub fn new(id: ResourceId, parent: Option<ResourceId>, model: InteractionModel) -> Self {
        Self {
            id,
            parent,
            archival_group_id: None,
            interaction_model: model,
            created_date: None,
            created_by: None,
            last_modified_date: None,
            last_modified_by: None,
            state_token: None,
            archival_group: false,
            object_root: false,
            deleted: false,
            mime_type: None,
            filename: None,
            content_size: None,
            digests: Vec::new(),
            content_path: None,
            external_url: None,
            external_handling: None,
        }
    }

    /// Returns `true` for a binary whose content is held outside the
    /// repository.
    pub fn is_external(&self) -> bool {
        self.external_url.is_some()
    }

    /// Stamp creation (and modification) time and principal.
    pub fn touch_created(&mut self, by: Option<&str>, at: DateTime<Utc>) {
        self.created_date = Some(at);
        self.created_by = by.map(str::to_string);
        self.touch_modified(by, at);
    }

    /// Stamp modification time and principal, regenerating the state token.
    pub fn touch_modified(&mut self, by: Option<&str>, at: DateTime<Utc>) {
        self.last_modified_date = Some(at);
        self.last_modified_by = by.map(str::to_string);
        let hash = blake3::hash(at.timestamp_millis().to_string().as_bytes());
        self.state_token = Some(hex::encode_upper(&hash.as_bytes()[..16]));
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Server-managed triples about `topic` derived from these headers.
    pub fn managed_triples(&self, topic: &ResourceId) -> Vec<Triple> {
        let subject = Term::iri(topic.full_id());
        let triple = |predicate: &str, object: Term| {
            Triple::new(subject.clone(), Term::iri(predicate), object)
        };

        let mut triples = vec![triple(vocab::RDF_TYPE, Term::iri(self.interaction_model.uri()))];
        if let Some(created) = self.created_date {
            triples.push(triple(
                vocab::FEDORA_CREATED,
                Term::typed(created.to_rfc3339(), vocab::XSD_DATE_TIME),
            ));
        }
        if let Some(by) = &self.created_by {
            triples.push(triple(vocab::FEDORA_CREATED_BY, Term::literal(by)));
        }
        if let Some(modified) = self.last_modified_date {
            triples.push(triple(
                vocab::FEDORA_LAST_MODIFIED,
                Term::typed(modified.to_rfc3339(), vocab::XSD_DATE_TIME),
            ));
        }
        if let Some(by) = &self.last_modified_by {
            triples.push(triple(vocab::FEDORA_LAST_MODIFIED_BY, Term::literal(by)));
        }
        if let Some(parent) = &self.parent {
            triples.push(triple(vocab::FEDORA_HAS_PARENT, Term::iri(parent.full_id())));
        }
        if self.interaction_model.is_binary() {
            if let Some(mime) = &self.mime_type {
                triples.push(triple(vocab::EBUCORE_MIME_TYPE, Term::literal(mime)));
            }
            if let Some(filename) = &self.filename {
                triples.push(triple(vocab::EBUCORE_FILENAME, Term::literal(filename)));
            }
            if let Some(size) = self.content_size {
                triples.push(triple(
                    vocab::PREMIS_SIZE,
                    Term::typed(size.to_string(), vocab::XSD_LONG),
                ));
            }
            for digest in &self.digests {
                triples.push(triple(vocab::PREMIS_DIGEST, Term::iri(digest)));
            }
        }
        triples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn id(raw: &str) -> ResourceId {
        ResourceId::parse(raw).unwrap()
    }

    fn binary_headers() -> ResourceHeaders {
        let mut headers = ResourceHeaders::new(
            id("info:fedora/a/bin"),
            Some(id("info:fedora/a")),
            InteractionModel::NonRdfSource,
        );
        headers.mime_type = Some("text/plain".into());
        headers.filename = Some("bin.txt".into());
        headers.content_size = Some(5);
        headers.digests = vec!["urn:blake3:abcd".into()];
        headers
    }

    #[test]
    fn interaction_model_kinds() {
        assert!(InteractionModel::BasicContainer.is_container());
        assert!(!InteractionModel::NonRdfSource.is_container());
        assert!(InteractionModel::NonRdfSource.is_binary());
        assert!(!InteractionModel::NonRdfSourceDescription.is_binary());
        assert!(InteractionModel::Acl.uri().ends_with("#Acl"));
    }

    #[test]
    fn touch_sets_dates_and_state_token() {
        let mut headers = binary_headers();
        let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        headers.touch_created(Some("alice"), created);
        assert_eq!(headers.created_date, Some(created));
        assert_eq!(headers.last_modified_date, Some(created));
        assert_eq!(headers.created_by.as_deref(), Some("alice"));
        let first = headers.state_token.clone().unwrap();
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));

        let modified = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
        headers.touch_modified(Some("bob"), modified);
        assert_eq!(headers.created_by.as_deref(), Some("alice"));
        assert_eq!(headers.last_modified_by.as_deref(), Some("bob"));
        assert_ne!(headers.state_token.unwrap(), first);
    }

    #[test]
    fn json_round_trip() {
        let mut headers = binary_headers();
        headers.touch_created(None, Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap());
        let json = headers.to_json().unwrap();
        let text = String::from_utf8(json.clone()).unwrap();
        assert!(text.contains("\"interaction_model\": \"non_rdf_source\""));
        assert_eq!(ResourceHeaders::from_json(&json).unwrap(), headers);
    }

    #[test]
    fn external_fields_default_when_absent() {
        let mut headers = binary_headers();
        headers.external_url = Some("https://example.org/data".into());
        headers.external_handling = Some(ExternalHandling::Redirect);
        assert!(headers.is_external());
        let text = String::from_utf8(headers.to_json().unwrap()).unwrap();
        assert!(text.contains("\"external_handling\": \"redirect\""));

        let json = br#"{"id":"info:fedora/a","parent":null,"archival_group_id":null,
            "interaction_model":"non_rdf_source","created_date":null,"created_by":null,
            "last_modified_date":null,"last_modified_by":null,"state_token":null,
            "mime_type":null,"filename":null,"content_size":null,"content_path":"a"}"#;
        let parsed = ResourceHeaders::from_json(json).unwrap();
        assert!(!parsed.is_external());
        assert_eq!(parsed.external_handling, None);
    }

    #[test]
    fn json_rejects_invalid_ids() {
        let json = br#"{"id":"info:fedora/a//b","parent":null,"archival_group_id":null,
            "interaction_model":"basic_container","created_date":null,"created_by":null,
            "last_modified_date":null,"last_modified_by":null,"state_token":null,
            "mime_type":null,"filename":null,"content_size":null,"content_path":null}"#;
        assert!(ResourceHeaders::from_json(json).is_err());
    }

    #[test]
    fn managed_triples_for_binary() {
        let headers = binary_headers();
        let topic = id("info:fedora/a/bin");
        let triples = headers.managed_triples(&topic);
        let predicates: Vec<_> = triples
            .iter()
            .filter_map(|t| t.predicate.as_iri())
            .collect();
        assert!(predicates.contains(&vocab::RDF_TYPE));
        assert!(predicates.contains(&vocab::FEDORA_HAS_PARENT));
        assert!(predicates.contains(&vocab::EBUCORE_MIME_TYPE));
        assert!(predicates.contains(&vocab::PREMIS_SIZE));
        assert!(predicates.contains(&vocab::PREMIS_DIGEST));
        assert!(triples.iter().all(|t| t.subject == Term::iri(topic.full_id())));
    }

    #[test]
    fn managed_triples_for_container_skip_binary_fields() {
        let mut headers = ResourceHeaders::new(id("info:fedora/a"), None, InteractionModel::BasicContainer);
        headers.mime_type = Some("text/turtle".into());
        let triples = headers.managed_triples(&headers.id);
        assert_eq!(triples.len(), 1);
        assert_eq!(
            triples[0].object,
            Term::iri("http://www.w3.org/ns/ldp#BasicContainer")
        );
    }
}
