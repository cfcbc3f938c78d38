use bytes::Bytes;
use chrono::Utc;
use ldp_index::ObjectMapping;
use ldp_ocfl::ObjectSession;
use ldp_types::rdf::write_ntriples;
use ldp_types::{ResourceHeaders, ResourceId};
use tracing::debug;

use super::{
    ensure_absent, live_headers, mapping_for_new_resource, read_headers_opt, register_mapping,
    write_headers, PersistContext, Persister,
};
use crate::error::{PersistError, PersistResult};
use crate::operation::ResourceOperation;
use crate::paths::{self, ContentKind};

/// Creates and replaces RDF sources: containers, binary descriptions and
/// ACLs.
pub struct RdfSourcePersister;

impl RdfSourcePersister {
    fn content_kind(
        session: &dyn ObjectSession,
        mapping: &ObjectMapping,
        resource: &ResourceId,
    ) -> PersistResult<ContentKind> {
        if resource.is_description() {
            return Ok(ContentKind::Description);
        }
        if resource.is_acl() {
            let protects_binary = read_headers_opt(session, mapping, &resource.as_base())?
                .is_some_and(|h| h.interaction_model.is_binary());
            return Ok(if protects_binary {
                ContentKind::BinaryAcl
            } else {
                ContentKind::ContainerAcl
            });
        }
        Ok(ContentKind::Container)
    }
}

impl Persister for RdfSourcePersister {
    fn name(&self) -> &str {
        "rdf-source"
    }

    fn handles(&self, operation: &ResourceOperation) -> bool {
        matches!(
            operation,
            ResourceOperation::CreateRdfSource(_) | ResourceOperation::UpdateRdfSource(_)
        )
    }

    fn resolve_mapping(
        &self,
        context: &PersistContext<'_>,
        operation: &ResourceOperation,
    ) -> PersistResult<ObjectMapping> {
        match operation {
            ResourceOperation::CreateRdfSource(op)
                if !op.resource_id.is_acl() && !op.resource_id.is_description() =>
            {
                mapping_for_new_resource(context, &op.resource_id, op.archival_group)
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
            ResourceOperation::CreateRdfSource(op) => (op, true),
            ResourceOperation::UpdateRdfSource(op) => (op, false),
            _ => return Err(PersistError::UnsupportedOperation(operation.to_string())),
        };
        let resource = op.resource_id.as_resource();
        if op.interaction_model.is_binary() {
            return Err(PersistError::invalid_operation(
                resource.full_id(),
                "a binary cannot be persisted as an RDF source",
            ));
        }

        let owner = &mapping.owner_resource_id;
        let kind = Self::content_kind(session, mapping, &resource)?;
        let content_path = paths::content_path(kind, owner, &resource)?;
        let now = Utc::now();
        let principal = operation.user_principal();
        let companion = resource.is_acl() || resource.is_description();

        let mut headers = if create {
            ensure_absent(session, mapping, &resource)?;
            let parent = if companion {
                Some(resource.as_base())
            } else {
                op.parent_id.clone().or_else(|| resource.parent())
            };
            let mut headers = ResourceHeaders::new(resource.clone(), parent, op.interaction_model);
            let is_owner = owner.base_id() == resource.base_id();
            headers.archival_group = op.archival_group;
            headers.object_root = is_owner && !companion;
            if !is_owner {
                headers.archival_group_id = Some(owner.clone());
            }
            headers.touch_created(principal, now);
            if !companion {
                register_mapping(context, &resource, mapping, op.archival_group)?;
            }
            headers
        } else {
            let mut headers = live_headers(session, mapping, &resource)?;
            headers.touch_modified(principal, now);
            headers
        };
        op.relaxed.apply(&mut headers);
        headers.content_path = Some(content_path.clone());

        session.write(&content_path, Bytes::from(write_ntriples(&op.triples)))?;
        write_headers(session, mapping, &headers)?;
        debug!(
            resource = %resource,
            object = %mapping.storage_object_id,
            triples = op.triples.len(),
            create,
            "rdf source persisted"
        );
        Ok(())
    }
}
