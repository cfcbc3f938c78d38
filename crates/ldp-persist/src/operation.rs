//! Resource mutations submitted to a persistence session.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use ldp_types::{ExternalHandling, InteractionModel, ResourceHeaders, ResourceId, Triple};

/// What an operation does, independent of its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CreateRdfSource,
    UpdateRdfSource,
    CreateNonRdfSource,
    UpdateNonRdfSource,
    Delete,
    CreateVersion,
    Purge,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateRdfSource => "create rdf source",
            Self::UpdateRdfSource => "update rdf source",
            Self::CreateNonRdfSource => "create non-rdf source",
            Self::UpdateNonRdfSource => "update non-rdf source",
            Self::Delete => "delete",
            Self::CreateVersion => "create version",
            Self::Purge => "purge",
        };
        f.write_str(name)
    }
}

/// Server-managed values supplied by the client.
///
/// Each value present replaces the one the server stamps. Deciding whether
/// a client may assert them is left to the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelaxedProperties {
    pub created_date: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub last_modified_date: Option<DateTime<Utc>>,
    pub last_modified_by: Option<String>,
}

impl RelaxedProperties {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Overwrite the stamped creation and modification values.
    pub fn apply(&self, headers: &mut ResourceHeaders) {
        if let Some(date) = self.created_date {
            headers.created_date = Some(date);
        }
        if let Some(by) = &self.created_by {
            headers.created_by = Some(by.clone());
        }
        if let Some(date) = self.last_modified_date {
            headers.last_modified_date = Some(date);
        }
        if let Some(by) = &self.last_modified_by {
            headers.last_modified_by = Some(by.clone());
        }
    }
}

/// Content held outside the repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalContent {
    pub url: String,
    pub handling: ExternalHandling,
}

/// Payload for creating or replacing an RDF source (container,
/// description or ACL).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RdfSourceOperation {
    pub resource_id: ResourceId,
    /// Defaults to the parent of the resource's base id on create.
    pub parent_id: Option<ResourceId>,
    pub interaction_model: InteractionModel,
    pub triples: Vec<Triple>,
    /// Persist the resource and its future descendants as one storage object.
    pub archival_group: bool,
    pub user_principal: Option<String>,
    pub relaxed: RelaxedProperties,
}

impl RdfSourceOperation {
    pub fn new(resource_id: ResourceId, interaction_model: InteractionModel) -> Self {
        Self {
            resource_id,
            parent_id: None,
            interaction_model,
            triples: Vec::new(),
            archival_group: false,
            user_principal: None,
            relaxed: RelaxedProperties::default(),
        }
    }

    pub fn with_parent(mut self, parent: ResourceId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn with_triples(mut self, triples: Vec<Triple>) -> Self {
        self.triples = triples;
        self
    }

    pub fn as_archival_group(mut self) -> Self {
        self.archival_group = true;
        self
    }

    pub fn by(mut self, principal: impl Into<String>) -> Self {
        self.user_principal = Some(principal.into());
        self
    }

    pub fn with_relaxed(mut self, relaxed: RelaxedProperties) -> Self {
        self.relaxed = relaxed;
        self
    }
}

/// Payload for creating or replacing a binary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NonRdfSourceOperation {
    pub resource_id: ResourceId,
    pub parent_id: Option<ResourceId>,
    pub content: Bytes,
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    /// Size the client claims; checked against what was stored.
    pub content_size: Option<u64>,
    /// Digests the client claims, as `<algorithm>:<hex>`.
    pub digests: Vec<String>,
    pub user_principal: Option<String>,
    pub relaxed: RelaxedProperties,
    /// Set for a binary whose content is not stored by the repository;
    /// `content` is then ignored.
    pub external: Option<ExternalContent>,
}

impl NonRdfSourceOperation {
    pub fn new(resource_id: ResourceId, content: impl Into<Bytes>) -> Self {
        Self {
            resource_id,
            parent_id: None,
            content: content.into(),
            mime_type: None,
            filename: None,
            content_size: None,
            digests: Vec::new(),
            user_principal: None,
            relaxed: RelaxedProperties::default(),
            external: None,
        }
    }

    /// A binary whose content stays at `url`.
    pub fn external(
        resource_id: ResourceId,
        url: impl Into<String>,
        handling: ExternalHandling,
    ) -> Self {
        let mut op = Self::new(resource_id, Bytes::new());
        op.external = Some(ExternalContent {
            url: url.into(),
            handling,
        });
        op
    }

    pub fn with_parent(mut self, parent: ResourceId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_expected_size(mut self, size: u64) -> Self {
        self.content_size = Some(size);
        self
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digests.push(digest.into());
        self
    }

    pub fn by(mut self, principal: impl Into<String>) -> Self {
        self.user_principal = Some(principal.into());
        self
    }

    pub fn with_relaxed(mut self, relaxed: RelaxedProperties) -> Self {
        self.relaxed = relaxed;
        self
    }
}

/// A resource mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceOperation {
    CreateRdfSource(RdfSourceOperation),
    UpdateRdfSource(RdfSourceOperation),
    CreateNonRdfSource(NonRdfSourceOperation),
    UpdateNonRdfSource(NonRdfSourceOperation),
    /// Replace the resource with a tombstone.
    Delete {
        resource_id: ResourceId,
        user_principal: Option<String>,
    },
    /// Make the resource's next commit an immutable version.
    CreateVersion {
        resource_id: ResourceId,
        user_principal: Option<String>,
    },
    /// Remove a tombstoned resource entirely.
    Purge {
        resource_id: ResourceId,
        user_principal: Option<String>,
    },
}

impl ResourceOperation {
    pub fn delete(resource_id: ResourceId) -> Self {
        Self::Delete {
            resource_id,
            user_principal: None,
        }
    }

    pub fn create_version(resource_id: ResourceId) -> Self {
        Self::CreateVersion {
            resource_id,
            user_principal: None,
        }
    }

    pub fn purge(resource_id: ResourceId) -> Self {
        Self::Purge {
            resource_id,
            user_principal: None,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::CreateRdfSource(_) => OperationKind::CreateRdfSource,
            Self::UpdateRdfSource(_) => OperationKind::UpdateRdfSource,
            Self::CreateNonRdfSource(_) => OperationKind::CreateNonRdfSource,
            Self::UpdateNonRdfSource(_) => OperationKind::UpdateNonRdfSource,
            Self::Delete { .. } => OperationKind::Delete,
            Self::CreateVersion { .. } => OperationKind::CreateVersion,
            Self::Purge { .. } => OperationKind::Purge,
        }
    }

    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Self::CreateRdfSource(op) | Self::UpdateRdfSource(op) => &op.resource_id,
            Self::CreateNonRdfSource(op) | Self::UpdateNonRdfSource(op) => &op.resource_id,
            Self::Delete { resource_id, .. }
            | Self::CreateVersion { resource_id, .. }
            | Self::Purge { resource_id, .. } => resource_id,
        }
    }

    pub fn user_principal(&self) -> Option<&str> {
        match self {
            Self::CreateRdfSource(op) | Self::UpdateRdfSource(op) => op.user_principal.as_deref(),
            Self::CreateNonRdfSource(op) | Self::UpdateNonRdfSource(op) => {
                op.user_principal.as_deref()
            }
            Self::Delete { user_principal, .. }
            | Self::CreateVersion { user_principal, .. }
            | Self::Purge { user_principal, .. } => user_principal.as_deref(),
        }
    }
}

impl fmt::Display for ResourceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.kind(), self.resource_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ResourceId {
        ResourceId::parse(raw).unwrap()
    }

    #[test]
    fn accessors_cover_every_variant() {
        let ops = [
            ResourceOperation::CreateRdfSource(
                RdfSourceOperation::new(id("info:fedora/a"), InteractionModel::BasicContainer)
                    .by("alice"),
            ),
            ResourceOperation::UpdateNonRdfSource(
                NonRdfSourceOperation::new(id("info:fedora/a"), "x").by("alice"),
            ),
            ResourceOperation::Delete {
                resource_id: id("info:fedora/a"),
                user_principal: Some("alice".into()),
            },
        ];
        for op in &ops {
            assert_eq!(op.resource_id(), &id("info:fedora/a"));
            assert_eq!(op.user_principal(), Some("alice"));
        }
        assert_eq!(ResourceOperation::purge(id("info:fedora/a")).user_principal(), None);
    }

    #[test]
    fn display_names_kind_and_target() {
        let op = ResourceOperation::create_version(id("info:fedora/a"));
        assert_eq!(op.kind(), OperationKind::CreateVersion);
        assert_eq!(op.to_string(), "create version of info:fedora/a");
    }

    #[test]
    fn non_rdf_builder() {
        let op = NonRdfSourceOperation::new(id("info:fedora/bin"), "hello")
            .with_mime_type("text/plain")
            .with_filename("hello.txt")
            .with_expected_size(5)
            .with_digest("blake3:00");
        assert_eq!(op.content, Bytes::from_static(b"hello"));
        assert_eq!(op.content_size, Some(5));
        assert_eq!(op.digests, vec!["blake3:00".to_string()]);
        assert!(op.external.is_none());

        let external = NonRdfSourceOperation::external(
            id("info:fedora/ext"),
            "https://example.org/data",
            ExternalHandling::Proxy,
        );
        assert!(external.content.is_empty());
        assert_eq!(
            external.external.map(|e| e.handling),
            Some(ExternalHandling::Proxy)
        );
    }

    #[test]
    fn relaxed_properties_replace_only_what_is_given() {
        use chrono::TimeZone;

        let mut headers = ResourceHeaders::new(
            id("info:fedora/a"),
            None,
            InteractionModel::BasicContainer,
        );
        let stamped = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        headers.touch_created(Some("server"), stamped);

        let relaxed = RelaxedProperties {
            created_date: Some(Utc.with_ymd_and_hms(2001, 2, 3, 4, 5, 6).unwrap()),
            last_modified_by: Some("importer".into()),
            ..RelaxedProperties::default()
        };
        assert!(!relaxed.is_empty());
        assert!(RelaxedProperties::default().is_empty());
        relaxed.apply(&mut headers);

        assert_eq!(headers.created_date, relaxed.created_date);
        assert_eq!(headers.created_by.as_deref(), Some("server"));
        assert_eq!(headers.last_modified_date, Some(stamped));
        assert_eq!(headers.last_modified_by.as_deref(), Some("importer"));
    }
}
