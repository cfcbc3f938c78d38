use bytes::Bytes;
use chrono::Utc;
use ldp_index::ObjectMapping;
use ldp_ocfl::ObjectSession;
use ldp_types::{InteractionModel, ResourceHeaders};
use sha2::{Digest, Sha256, Sha512};
use tracing::debug;

use super::{
    ensure_absent, live_headers, mapping_for_new_resource, register_mapping, write_headers,
    PersistContext, Persister,
};
use crate::error::{PersistError, PersistResult};
use crate::operation::{NonRdfSourceOperation, ResourceOperation};
use crate::paths::{self, ContentKind};

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Creates and replaces binaries.
///
/// A new binary gets a description (headers plus an empty graph) in the
/// same object. Claimed size and digests are checked before anything is
/// staged.
pub struct NonRdfSourcePersister;

/// Digest algorithms a client may claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DigestAlgorithm {
    Blake3,
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "blake3" => Some(Self::Blake3),
            "sha-256" | "sha256" => Some(Self::Sha256),
            "sha-512" | "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Blake3 => "blake3",
            Self::Sha256 => "sha-256",
            Self::Sha512 => "sha-512",
        }
    }

    fn hex_digest(self, content: &[u8]) -> String {
        match self {
            Self::Blake3 => blake3::hash(content).to_hex().to_string(),
            Self::Sha256 => hex::encode(Sha256::digest(content)),
            Self::Sha512 => hex::encode(Sha512::digest(content)),
        }
    }
}

/// `blake3:<hex>` of `content`.
pub fn content_digest(content: &[u8]) -> String {
    let algorithm = DigestAlgorithm::Blake3;
    format!("{}:{}", algorithm.name(), algorithm.hex_digest(content))
}

/// Split `[urn:]<algorithm>:<hex>` into a known algorithm and its value.
fn parse_digest<'a>(resource: &str, claimed: &'a str) -> PersistResult<(DigestAlgorithm, &'a str)> {
    let unprefixed = claimed.strip_prefix("urn:").unwrap_or(claimed);
    let Some((name, value)) = unprefixed.split_once(':') else {
        return Err(PersistError::invalid_operation(
            resource,
            format!("malformed digest {claimed:?}"),
        ));
    };
    let algorithm = DigestAlgorithm::parse(name).ok_or_else(|| {
        PersistError::invalid_operation(resource, format!("unsupported digest algorithm {name:?}"))
    })?;
    Ok((algorithm, value))
}

/// Check the claimed size and digests against the content. Returns the
/// digests to record: the repository's own blake3 digest followed by every
/// verified claim.
fn verify_fixity(op: &NonRdfSourceOperation) -> PersistResult<Vec<String>> {
    let resource = op.resource_id.full_id();
    let size = op.content.len() as u64;
    if let Some(expected) = op.content_size {
        if expected != size {
            return Err(PersistError::Fixity {
                resource: resource.to_string(),
                reason: format!("expected {expected} bytes, received {size}"),
            });
        }
    }

    let mut digests = vec![content_digest(&op.content)];
    for claimed in &op.digests {
        let (algorithm, expected) = parse_digest(resource, claimed)?;
        let actual = algorithm.hex_digest(&op.content);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(PersistError::Fixity {
                resource: resource.to_string(),
                reason: format!("expected {claimed}, computed {}:{actual}", algorithm.name()),
            });
        }
        let verified = format!("{}:{actual}", algorithm.name());
        if !digests.contains(&verified) {
            digests.push(verified);
        }
    }
    Ok(digests)
}

/// Claimed digests of external content, normalized but not verified.
fn external_digests(op: &NonRdfSourceOperation) -> PersistResult<Vec<String>> {
    let resource = op.resource_id.full_id();
    op.digests
        .iter()
        .map(|claimed| {
            let (algorithm, value) = parse_digest(resource, claimed)?;
            Ok(format!("{}:{}", algorithm.name(), value.to_ascii_lowercase()))
        })
        .collect()
}

impl Persister for NonRdfSourcePersister {
    fn name(&self) -> &str {
        "non-rdf-source"
    }

    fn handles(&self, operation: &ResourceOperation) -> bool {
        matches!(
            operation,
            ResourceOperation::CreateNonRdfSource(_) | ResourceOperation::UpdateNonRdfSource(_)
        )
    }

    fn resolve_mapping(
        &self,
        context: &PersistContext<'_>,
        operation: &ResourceOperation,
    ) -> PersistResult<ObjectMapping> {
        match operation {
            ResourceOperation::CreateNonRdfSource(op) => {
                mapping_for_new_resource(context, &op.resource_id, false)
            }
            _ => context.mapping(operation.resource_id()),
        }
    }

    fn persist(
        &self,
        context: &PersistContext<'_>,
        session: &dyn ObjectSession,
        operation: &ResourceOperation,
        mapping: &ObjectMapping,
    ) -> PersistResult<()> {
        let (op, create) = match operation {
            ResourceOperation::CreateNonRdfSource(op) => (op, true),
            ResourceOperation::UpdateNonRdfSource(op) => (op, false),
            _ => return Err(PersistError::UnsupportedOperation(operation.to_string())),
        };
        let resource = &op.resource_id;
        if resource.is_acl() || resource.is_description() || resource.is_repository_root() {
            return Err(PersistError::invalid_operation(
                resource.full_id(),
                "only a plain resource can be a binary",
            ));
        }
        let resource = resource.as_base();
        let digests = match &op.external {
            Some(_) => external_digests(op)?,
            None => verify_fixity(op)?,
        };

        let owner = &mapping.owner_resource_id;
        let content_path = paths::content_path(ContentKind::Binary, owner, &resource)?;
        let now = Utc::now();
        let principal = operation.user_principal();

        let mut headers = if create {
            ensure_absent(session, mapping, &resource)?;
            let parent = op.parent_id.clone().or_else(|| resource.parent());
            let mut headers =
                ResourceHeaders::new(resource.clone(), parent, InteractionModel::NonRdfSource);
            let is_owner = owner.base_id() == resource.base_id();
            headers.object_root = is_owner;
            if !is_owner {
                headers.archival_group_id = Some(owner.clone());
            }
            headers.touch_created(principal, now);
            register_mapping(context, &resource, mapping, false)?;
            headers
        } else {
            let mut headers = live_headers(session, mapping, &resource)?;
            if !headers.interaction_model.is_binary() {
                return Err(PersistError::invalid_operation(
                    resource.full_id(),
                    "not a binary",
                ));
            }
            headers.touch_modified(principal, now);
            headers
        };
        op.relaxed.apply(&mut headers);
        let previous_content = headers.content_path.take();

        headers.mime_type = op
            .mime_type
            .clone()
            .or(headers.mime_type.take())
            .or_else(|| Some(DEFAULT_MIME_TYPE.to_string()));
        headers.filename = op.filename.clone().or(headers.filename.take());
        headers.digests = digests;
        match &op.external {
            Some(external) => {
                headers.content_size = op.content_size;
                headers.external_url = Some(external.url.clone());
                headers.external_handling = Some(external.handling);
                if let Some(previous) = previous_content {
                    session.delete(&previous)?;
                }
            }
            None => {
                headers.content_size = Some(op.content.len() as u64);
                headers.external_url = None;
                headers.external_handling = None;
                headers.content_path = Some(content_path.clone());
                session.write(&content_path, op.content.clone())?;
            }
        }
        write_headers(session, mapping, &headers)?;

        if create {
            let description = resource.as_description();
            let description_path = paths::content_path(ContentKind::Description, owner, &description)?;
            let mut desc_headers = ResourceHeaders::new(
                description,
                Some(resource.clone()),
                InteractionModel::NonRdfSourceDescription,
            );
            desc_headers.archival_group_id = headers.archival_group_id.clone();
            desc_headers.touch_created(principal, now);
            desc_headers.content_path = Some(description_path.clone());
            session.write(&description_path, Bytes::new())?;
            write_headers(session, mapping, &desc_headers)?;
        }

        debug!(
            resource = %resource,
            object = %mapping.storage_object_id,
            size = ?headers.content_size,
            external = headers.is_external(),
            create,
            "binary persisted"
        );
        Ok(())
    }
}
