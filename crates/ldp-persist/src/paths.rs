//! Where resources live inside their storage object.
//!
//! ```text
//! fcr-container.nt                 object root container
//! <rel>/fcr-container.nt           child container
//! <rel>                            binary
//! <rel>~fcr-desc.nt                binary description
//! fcr-container~fcr-acl.nt         ACL of the object root container
//! <rel>/fcr-container~fcr-acl.nt   ACL of a child container
//! <rel>~fcr-acl.nt                 ACL of a binary
//! .fcrepo/<fcr-root|rel>[~fcr-desc|~fcr-acl].json   headers
//! ```
//!
//! `rel` is the resource's base id relative to the object root, or the
//! root's own last segment for the root itself.

use ldp_types::ResourceId;

use crate::error::{PersistError, PersistResult};

pub const HEADER_DIR: &str = ".fcrepo/";
const ROOT_PREFIX: &str = "fcr-root";
const CONTAINER_PREFIX: &str = "fcr-container";
const ACL_SUFFIX: &str = "~fcr-acl";
const DESCRIPTION_SUFFIX: &str = "~fcr-desc";
const RDF_EXTENSION: &str = ".nt";
const JSON_EXTENSION: &str = ".json";

/// How a resource's content is laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    Container,
    Binary,
    Description,
    ContainerAcl,
    BinaryAcl,
}

fn is_root(owner: &ResourceId, resource: &ResourceId) -> bool {
    owner.base_id() == resource.base_id()
}

/// Path of `resource` relative to the root of `owner`'s object.
pub fn relative_path(owner: &ResourceId, resource: &ResourceId) -> PersistResult<String> {
    if is_root(owner, resource) {
        return Ok(resource.last_segment().to_string());
    }
    if !owner.is_ancestor_of(resource) {
        return Err(PersistError::invalid_operation(
            resource.full_id(),
            format!("not stored under {owner}"),
        ));
    }
    Ok(resource.base_id()[owner.base_id().len() + 1..].to_string())
}

/// Subpath of the headers sidecar for `resource`.
pub fn header_path(owner: &ResourceId, resource: &ResourceId) -> PersistResult<String> {
    let mut path = if is_root(owner, resource) {
        ROOT_PREFIX.to_string()
    } else {
        relative_path(owner, resource)?
    };
    if resource.is_acl() {
        path.push_str(ACL_SUFFIX);
    } else if resource.is_description() {
        path.push_str(DESCRIPTION_SUFFIX);
    }
    Ok(format!("{HEADER_DIR}{path}{JSON_EXTENSION}"))
}

/// Subpath of the content file for `resource`.
pub fn content_path(
    kind: ContentKind,
    owner: &ResourceId,
    resource: &ResourceId,
) -> PersistResult<String> {
    if is_root(owner, resource) {
        match kind {
            ContentKind::Container => return Ok(format!("{CONTAINER_PREFIX}{RDF_EXTENSION}")),
            ContentKind::ContainerAcl => {
                return Ok(format!("{CONTAINER_PREFIX}{ACL_SUFFIX}{RDF_EXTENSION}"))
            }
            _ => {}
        }
    }

    let rel = relative_path(owner, resource)?;
    if rel.is_empty() {
        return Err(PersistError::invalid_operation(
            resource.full_id(),
            "the repository root can only be a container",
        ));
    }
    Ok(match kind {
        ContentKind::Binary => rel,
        ContentKind::Description => format!("{rel}{DESCRIPTION_SUFFIX}{RDF_EXTENSION}"),
        ContentKind::Container => format!("{rel}/{CONTAINER_PREFIX}{RDF_EXTENSION}"),
        ContentKind::ContainerAcl => {
            format!("{rel}/{CONTAINER_PREFIX}{ACL_SUFFIX}{RDF_EXTENSION}")
        }
        ContentKind::BinaryAcl => format!("{rel}{ACL_SUFFIX}{RDF_EXTENSION}"),
    })
}

pub fn is_header_file(path: &str) -> bool {
    path.starts_with(HEADER_DIR)
}
