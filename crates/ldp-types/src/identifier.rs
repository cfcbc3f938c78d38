//! Resource identifier parsing.
//!
//! A raw identifier has the shape
//!
//! ```text
//! info:fedora/<path>[/fcr:metadata][/fcr:versions[/<yyyyMMddHHmmss>]][/fcr:acl][#<fragment>]
//! info:fedora/<path>/fcr:tombstone[#<fragment>]
//! ```
//!
//! Parsing is order-sensitive. Each step strips its suffix before the next
//! one looks at what remains:
//!
//! 1. reject empty path segments (`//`)
//! 2. split off the hash fragment
//! 3. strip `fcr:tombstone`, which stands alone
//! 4. strip `fcr:acl`
//! 5. strip `fcr:versions` and an optional memento label
//! 6. strip `fcr:metadata`
//! 7. what is left, without trailing slashes, is the base id

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::IdentifierError;

/// Prefix shared by every resource identifier. Also the repository root id.
pub const FEDORA_ID_PREFIX: &str = "info:fedora";
/// Suffix addressing the RDF description of a binary.
pub const FCR_METADATA: &str = "fcr:metadata";
/// Suffix addressing the timemap, or a memento when followed by a label.
pub const FCR_VERSIONS: &str = "fcr:versions";
/// Suffix addressing a resource's access control list.
pub const FCR_ACL: &str = "fcr:acl";
/// Suffix addressing the tombstone left behind by a deleted resource.
pub const FCR_TOMBSTONE: &str = "fcr:tombstone";
/// Format of memento labels (`yyyyMMddHHmmss`, UTC).
pub const MEMENTO_LABEL_FORMAT: &str = "%Y%m%d%H%M%S";

/// Segments that would collide with the on-disk storage layout.
const RESERVED_SEGMENTS: &[&str] = &[".fcrepo", "fcr-root", "fcr-container.nt"];
/// Endings the final base segment may not carry, for the same reason.
const RESERVED_SUFFIXES: &[&str] = &["~fcr-desc", "~fcr-acl", "~fcr-desc.nt", "~fcr-acl.nt"];

const MEMENTO_LABEL_LEN: usize = 14;

/// A parsed, immutable resource identifier.
///
/// Equality, ordering and hashing are defined on [`full_id`](Self::full_id)
/// only; the other fields are derived from it.
#[derive(Clone)]
pub struct ResourceId {
    full_id: String,
    base_id: String,
    hash_fragment: Option<String>,
    repository_root: bool,
    acl: bool,
    tombstone: bool,
    description: bool,
    timemap: bool,
    memento: Option<DateTime<Utc>>,
}

impl ResourceId {
    /// Parse a raw identifier string.
    ///
    /// Trailing slashes are not significant: `info:fedora/a/` and
    /// `info:fedora/a` are the same resource. A fragment directly on the
    /// prefix (`info:fedora#x`) names a hash resource of the root.
    ///
    /// # Examples
    ///
    /// ```
    /// use ldp_types::ResourceId;
    ///
    /// let id = ResourceId::parse("info:fedora/a/bin/fcr:metadata").unwrap();
    /// assert!(id.is_description());
    /// assert_eq!(id.base_id(), "info:fedora/a/bin");
    /// assert!(ResourceId::parse("info:fedora/a//b").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let full_id = raw.trim_end_matches('/');
        let path = match full_id.strip_prefix(FEDORA_ID_PREFIX) {
            Some(rest) if rest.is_empty() || rest.starts_with(['/', '#']) => rest,
            _ => {
                return Err(IdentifierError::MissingPrefix {
                    path: raw.to_string(),
                    prefix: FEDORA_ID_PREFIX,
                })
            }
        };

        if full_id.contains("//") {
            return Err(IdentifierError::EmptySegment {
                path: raw.to_string(),
            });
        }

        if path.is_empty() {
            return Ok(Self::root());
        }

        let (path, hash_fragment) = match path.split_once('#') {
            Some((_, fragment)) if fragment.contains('#') => {
                return Err(IdentifierError::MultipleFragments {
                    path: raw.to_string(),
                })
            }
            Some((_, "")) => {
                return Err(IdentifierError::EmptyFragment {
                    path: raw.to_string(),
                })
            }
            Some((path, fragment)) => (path, Some(fragment.to_string())),
            None => (path, None),
        };

        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let tombstone = strip_final_suffix(&mut segments, FCR_TOMBSTONE, raw)?;
        if tombstone
            && [FCR_ACL, FCR_VERSIONS, FCR_METADATA]
                .iter()
                .any(|suffix| segments.contains(suffix))
        {
            return Err(IdentifierError::TombstoneCombination {
                path: raw.to_string(),
            });
        }

        let acl = strip_final_suffix(&mut segments, FCR_ACL, raw)?;
        if acl && (segments.contains(&FCR_VERSIONS) || segments.contains(&FCR_METADATA)) {
            return Err(IdentifierError::AclCombination {
                path: raw.to_string(),
            });
        }

        let mut timemap = false;
        let mut memento = None;
        match count(&segments, FCR_VERSIONS) {
            0 => {}
            1 => {
                let pos = segments
                    .iter()
                    .position(|s| *s == FCR_VERSIONS)
                    .unwrap_or(segments.len());
                match &segments[pos + 1..] {
                    [] => timemap = true,
                    [label] if is_memento_label(label) => {
                        memento = Some(parse_memento_label(label).ok_or_else(|| {
                            IdentifierError::InvalidMemento {
                                path: raw.to_string(),
                            }
                        })?);
                    }
                    _ => {
                        return Err(IdentifierError::InvalidMemento {
                            path: raw.to_string(),
                        })
                    }
                }
                segments.truncate(pos);
            }
            _ => {
                return Err(IdentifierError::DuplicateSuffix {
                    path: raw.to_string(),
                    suffix: FCR_VERSIONS,
                })
            }
        }

        let description = strip_final_suffix(&mut segments, FCR_METADATA, raw)?;

        check_layout_names(&segments, raw)?;

        Ok(Self {
            full_id: full_id.to_string(),
            base_id: join_base(&segments),
            hash_fragment,
            repository_root: false,
            acl,
            tombstone,
            description,
            timemap,
            memento,
        })
    }

    /// The repository root identifier, `info:fedora`.
    pub fn root() -> Self {
        Self::plain(FEDORA_ID_PREFIX.to_string())
    }

    /// Build an identifier from path parts below the repository root.
    ///
    /// Leading and trailing slashes of each part are ignored.
    pub fn from_path<S: AsRef<str>>(parts: &[S]) -> Result<Self, IdentifierError> {
        Self::root().resolve_under(FEDORA_ID_PREFIX, parts)
    }

    /// Resolve further path segments against this identifier.
    ///
    /// When the first segment starts with `/` the segments are appended to
    /// the base id (a sibling of the logical resource); otherwise they are
    /// appended to the full id, so `fcr:versions` resolved against a
    /// description yields the description's timemap.
    pub fn resolve<S: AsRef<str>>(&self, segments: &[S]) -> Result<Self, IdentifierError> {
        let anchor = match segments.first() {
            Some(first) if first.as_ref().starts_with('/') => self.base_id.as_str(),
            _ => self.full_id_without_fragment(),
        };
        self.resolve_under(anchor, segments)
    }

    fn resolve_under<S: AsRef<str>>(
        &self,
        anchor: &str,
        segments: &[S],
    ) -> Result<Self, IdentifierError> {
        if segments.is_empty() {
            return Err(IdentifierError::BlankSegment {
                base: self.full_id.clone(),
            });
        }
        let mut id = anchor.to_string();
        for segment in segments {
            let part = segment.as_ref().trim_matches('/');
            if part.is_empty() {
                return Err(IdentifierError::BlankSegment {
                    base: self.full_id.clone(),
                });
            }
            id.push('/');
            id.push_str(part);
        }
        Self::parse(&id)
    }

    /// The identifier as given, without trailing slashes.
    pub fn full_id(&self) -> &str {
        &self.full_id
    }

    /// The address of the owning logical resource, all suffixes removed.
    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    /// The full id below the `info:fedora` prefix (empty for the root).
    pub fn full_path(&self) -> &str {
        &self.full_id[FEDORA_ID_PREFIX.len()..]
    }

    /// Text after `#`, if any.
    pub fn hash_fragment(&self) -> Option<&str> {
        self.hash_fragment.as_deref()
    }

    pub fn is_repository_root(&self) -> bool {
        self.repository_root
    }

    pub fn is_acl(&self) -> bool {
        self.acl
    }

    pub fn is_tombstone(&self) -> bool {
        self.tombstone
    }

    pub fn is_description(&self) -> bool {
        self.description
    }

    pub fn is_timemap(&self) -> bool {
        self.timemap
    }

    pub fn is_memento(&self) -> bool {
        self.memento.is_some()
    }

    /// The instant a memento id points at. `None` unless [`is_memento`](Self::is_memento).
    pub fn memento_instant(&self) -> Option<DateTime<Utc>> {
        self.memento
    }

    /// The `yyyyMMddHHmmss` label of a memento id.
    pub fn memento_label(&self) -> Option<String> {
        self.memento
            .map(|instant| instant.format(MEMENTO_LABEL_FORMAT).to_string())
    }

    /// Id string of the physical resource this id describes.
    ///
    /// Mementos, timemaps and tombstones collapse onto the resource they
    /// refer to; a description or ACL keeps its suffix because it is stored
    /// separately.
    pub fn resource_id(&self) -> String {
        if self.description {
            self.description_id()
        } else if self.acl {
            format!("{}/{FCR_ACL}", self.base_id)
        } else {
            self.base_id.clone()
        }
    }

    /// Id string of the description belonging to this id's base resource.
    pub fn description_id(&self) -> String {
        format!("{}/{FCR_METADATA}", self.base_id)
    }

    /// The base resource as an identifier of its own.
    pub fn as_base(&self) -> Self {
        Self::plain(self.base_id.clone())
    }

    /// The physical resource (see [`resource_id`](Self::resource_id)) as an identifier.
    pub fn as_resource(&self) -> Self {
        if self.description {
            self.with_suffix(format!("{}/{FCR_METADATA}", self.base_id), |id| {
                id.description = true
            })
        } else if self.acl {
            self.as_acl()
        } else {
            self.as_base()
        }
    }

    /// The description of this id's base resource. Versioning suffixes are kept.
    pub fn as_description(&self) -> Self {
        if self.description {
            return self.clone();
        }
        let base = &self.base_id;
        if self.timemap {
            return self.with_suffix(format!("{base}/{FCR_METADATA}/{FCR_VERSIONS}"), |id| {
                id.description = true;
                id.timemap = true;
            });
        }
        if let (Some(label), Some(instant)) = (self.memento_label(), self.memento) {
            return self.with_suffix(
                format!("{base}/{FCR_METADATA}/{FCR_VERSIONS}/{label}"),
                |id| {
                    id.description = true;
                    id.memento = Some(instant);
                },
            );
        }
        self.with_suffix(format!("{base}/{FCR_METADATA}"), |id| {
            id.description = true
        })
    }

    /// The ACL of this id's base resource.
    pub fn as_acl(&self) -> Self {
        if self.acl {
            return self.clone();
        }
        self.with_suffix(format!("{}/{FCR_ACL}", self.base_id), |id| id.acl = true)
    }

    /// The tombstone of this id's base resource.
    pub fn as_tombstone(&self) -> Self {
        if self.tombstone {
            return self.clone();
        }
        self.with_suffix(format!("{}/{FCR_TOMBSTONE}", self.base_id), |id| {
            id.tombstone = true
        })
    }

    /// The timemap of this id. A description's timemap stays a description.
    pub fn as_timemap(&self) -> Self {
        if self.timemap {
            return self.clone();
        }
        if self.description {
            return self.with_suffix(
                format!("{}/{FCR_METADATA}/{FCR_VERSIONS}", self.base_id),
                |id| {
                    id.description = true;
                    id.timemap = true;
                },
            );
        }
        self.with_suffix(format!("{}/{FCR_VERSIONS}", self.base_id), |id| {
            id.timemap = true
        })
    }

    /// A memento of this id at `instant`, truncated to whole seconds.
    pub fn as_memento(&self, instant: DateTime<Utc>) -> Self {
        let instant = instant.with_nanosecond(0).unwrap_or(instant);
        let label = instant.format(MEMENTO_LABEL_FORMAT).to_string();
        let description = self.description;
        let full_id = if description {
            format!("{}/{FCR_METADATA}/{FCR_VERSIONS}/{label}", self.base_id)
        } else {
            format!("{}/{FCR_VERSIONS}/{label}", self.base_id)
        };
        self.with_suffix(full_id, |id| {
            id.description = description;
            id.memento = Some(instant);
        })
    }

    /// The parent of the base resource. `None` for the repository root.
    pub fn parent(&self) -> Option<Self> {
        if self.base_id == FEDORA_ID_PREFIX {
            return None;
        }
        let (parent, _) = self.base_id.rsplit_once('/')?;
        Some(Self::plain(parent.to_string()))
    }

    /// Last path segment of the base id (empty for the root).
    pub fn last_segment(&self) -> &str {
        if self.base_id == FEDORA_ID_PREFIX {
            return "";
        }
        self.base_id
            .rsplit_once('/')
            .map(|(_, last)| last)
            .unwrap_or_default()
    }

    /// Returns `true` if `other`'s base id lies strictly below this base id.
    pub fn is_ancestor_of(&self, other: &ResourceId) -> bool {
        other
            .base_id
            .strip_prefix(self.base_id.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    fn full_id_without_fragment(&self) -> &str {
        match self.full_id.split_once('#') {
            Some((id, _)) => id,
            None => &self.full_id,
        }
    }

    fn plain(base_id: String) -> Self {
        Self {
            repository_root: base_id == FEDORA_ID_PREFIX,
            full_id: base_id.clone(),
            base_id,
            hash_fragment: None,
            acl: false,
            tombstone: false,
            description: false,
            timemap: false,
            memento: None,
        }
    }

    fn with_suffix(&self, full_id: String, apply: impl FnOnce(&mut Self)) -> Self {
        let mut id = Self::plain(self.base_id.clone());
        id.full_id = full_id;
        id.repository_root = false;
        apply(&mut id);
        id
    }
}

fn count(segments: &[&str], suffix: &str) -> usize {
    segments.iter().filter(|s| **s == suffix).count()
}

/// Remove `suffix` if it is the final segment. Any other placement is an error.
fn strip_final_suffix(
    segments: &mut Vec<&str>,
    suffix: &'static str,
    raw: &str,
) -> Result<bool, IdentifierError> {
    match count(segments, suffix) {
        0 => Ok(false),
        1 if segments.last() == Some(&suffix) => {
            segments.pop();
            Ok(true)
        }
        1 => Err(IdentifierError::MisplacedSuffix {
            path: raw.to_string(),
            suffix,
        }),
        _ => Err(IdentifierError::DuplicateSuffix {
            path: raw.to_string(),
            suffix,
        }),
    }
}

fn check_layout_names(segments: &[&str], raw: &str) -> Result<(), IdentifierError> {
    if let Some(reserved) = segments.iter().find(|s| RESERVED_SEGMENTS.contains(*s)) {
        return Err(IdentifierError::ReservedName {
            path: raw.to_string(),
            part: reserved.to_string(),
        });
    }
    if let Some(last) = segments.last() {
        if let Some(suffix) = RESERVED_SUFFIXES.iter().find(|s| last.ends_with(**s)) {
            return Err(IdentifierError::ReservedName {
                path: raw.to_string(),
                part: suffix.to_string(),
            });
        }
    }
    Ok(())
}

fn join_base(segments: &[&str]) -> String {
    if segments.is_empty() {
        FEDORA_ID_PREFIX.to_string()
    } else {
        format!("{FEDORA_ID_PREFIX}/{}", segments.join("/"))
    }
}

fn is_memento_label(label: &str) -> bool {
    label.len() == MEMENTO_LABEL_LEN && label.bytes().all(|b| b.is_ascii_digit())
}

/// Parse a `yyyyMMddHHmmss` label. The caller has checked it is 14 digits.
fn parse_memento_label(label: &str) -> Option<DateTime<Utc>> {
    let field = |range: std::ops::Range<usize>| label.get(range)?.parse::<u32>().ok();
    let year = i32::try_from(field(0..4)?).ok()?;
    NaiveDate::from_ymd_opt(year, field(4..6)?, field(6..8)?)?
        .and_hms_opt(field(8..10)?, field(10..12)?, field(12..14)?)
        .map(|naive| naive.and_utc())
}

impl PartialEq for ResourceId {
    fn eq(&self, other: &Self) -> bool {
        self.full_id == other.full_id
    }
}

impl Eq for ResourceId {}

impl Hash for ResourceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full_id.hash(state);
    }
}

impl PartialOrd for ResourceId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ResourceId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.full_id.cmp(&other.full_id)
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.full_id)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_id)
    }
}

impl FromStr for ResourceId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ResourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.full_id)
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn id(raw: &str) -> ResourceId {
        ResourceId::parse(raw).unwrap()
    }

    // -----------------------------------------------------------------------
    // Basic decomposition
    // -----------------------------------------------------------------------

    #[test]
    fn plain_resource() {
        let r = id("info:fedora/object1/child");
        assert_eq!(r.full_id(), "info:fedora/object1/child");
        assert_eq!(r.base_id(), "info:fedora/object1/child");
        assert_eq!(r.full_path(), "/object1/child");
        assert!(!r.is_repository_root());
        assert!(!r.is_acl());
        assert!(!r.is_description());
        assert!(!r.is_timemap());
        assert!(!r.is_memento());
        assert!(r.hash_fragment().is_none());
    }

    #[test]
    fn repository_root() {
        for raw in ["info:fedora", "info:fedora/", "info:fedora///"] {
            let r = ResourceId::parse(raw).unwrap();
            assert!(r.is_repository_root(), "{raw}");
            assert_eq!(r.full_id(), FEDORA_ID_PREFIX);
            assert_eq!(r.base_id(), FEDORA_ID_PREFIX);
        }
        assert_eq!(ResourceId::root(), id("info:fedora"));
        assert!(ResourceId::root().parent().is_none());
    }

    #[test]
    fn trailing_slashes_are_stripped() {
        let r = id("info:fedora/a/b//");
        assert_eq!(r.full_id(), "info:fedora/a/b");
        assert_eq!(r, id("info:fedora/a/b"));
    }

    #[test]
    fn missing_prefix_is_rejected() {
        assert!(matches!(
            ResourceId::parse("/a/b"),
            Err(IdentifierError::MissingPrefix { .. })
        ));
        assert!(matches!(
            ResourceId::parse("info:fedorax/a"),
            Err(IdentifierError::MissingPrefix { .. })
        ));
    }

    #[test]
    fn empty_segment_is_rejected() {
        let err = ResourceId::parse("info:fedora/a//b").unwrap_err();
        assert_eq!(
            err,
            IdentifierError::EmptySegment {
                path: "info:fedora/a//b".into()
            }
        );
        assert!(err.to_string().contains("info:fedora/a//b"));
    }

    #[test]
    fn hash_fragment() {
        let r = id("info:fedora/a/b#frag");
        assert_eq!(r.hash_fragment(), Some("frag"));
        assert_eq!(r.base_id(), "info:fedora/a/b");
        assert_eq!(r.full_id(), "info:fedora/a/b#frag");

        assert!(matches!(
            ResourceId::parse("info:fedora/a#b#c"),
            Err(IdentifierError::MultipleFragments { .. })
        ));
        assert!(matches!(
            ResourceId::parse("info:fedora/a#"),
            Err(IdentifierError::EmptyFragment { .. })
        ));
    }

    #[test]
    fn hash_fragment_on_root() {
        let r = id("info:fedora#frag");
        assert_eq!(r.full_id(), "info:fedora#frag");
        assert_eq!(r.base_id(), FEDORA_ID_PREFIX);
        assert_eq!(r.hash_fragment(), Some("frag"));
        assert!(!r.is_repository_root());
        assert_eq!(r.as_base(), ResourceId::root());
        assert!(r.parent().is_none());

        let slashed = id("info:fedora/#frag");
        assert_eq!(slashed.base_id(), FEDORA_ID_PREFIX);
        assert_eq!(slashed.hash_fragment(), Some("frag"));

        assert!(matches!(
            ResourceId::parse("info:fedora#"),
            Err(IdentifierError::EmptyFragment { .. })
        ));
        assert!(matches!(
            ResourceId::parse("info:fedorax#frag"),
            Err(IdentifierError::MissingPrefix { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Suffixes
    // -----------------------------------------------------------------------

    #[test]
    fn acl_suffix() {
        let r = id("info:fedora/a/fcr:acl");
        assert!(r.is_acl());
        assert_eq!(r.base_id(), "info:fedora/a");
        assert_eq!(r.resource_id(), "info:fedora/a/fcr:acl");

        let root_acl = id("info:fedora/fcr:acl");
        assert!(root_acl.is_acl());
        assert_eq!(root_acl.base_id(), FEDORA_ID_PREFIX);
    }

    #[test]
    fn duplicate_acl_is_rejected() {
        assert!(matches!(
            ResourceId::parse("info:fedora/a/fcr:acl/fcr:acl"),
            Err(IdentifierError::DuplicateSuffix { suffix: FCR_ACL, .. })
        ));
    }

    #[test]
    fn acl_must_be_last() {
        assert!(matches!(
            ResourceId::parse("info:fedora/a/fcr:acl/b"),
            Err(IdentifierError::MisplacedSuffix { suffix: FCR_ACL, .. })
        ));
    }

    #[test]
    fn acl_after_memento_is_rejected() {
        for raw in [
            "info:fedora/a/fcr:versions/20200101000000/fcr:acl",
            "info:fedora/a/fcr:metadata/fcr:acl",
            "info:fedora/a/fcr:versions/fcr:acl",
        ] {
            assert!(
                matches!(
                    ResourceId::parse(raw),
                    Err(IdentifierError::AclCombination { .. })
                ),
                "{raw}"
            );
        }
    }

    #[test]
    fn tombstone_suffix() {
        let r = id("info:fedora/a/b/fcr:tombstone");
        assert!(r.is_tombstone());
        assert!(!r.is_acl());
        assert_eq!(r.base_id(), "info:fedora/a/b");
        assert_eq!(r.resource_id(), "info:fedora/a/b");
        assert_eq!(r.as_resource(), id("info:fedora/a/b"));
        assert_eq!(r.parent(), Some(id("info:fedora/a")));

        let with_fragment = id("info:fedora/a/fcr:tombstone#x");
        assert!(with_fragment.is_tombstone());
        assert_eq!(with_fragment.hash_fragment(), Some("x"));
    }

    #[test]
    fn tombstone_combined_with_other_suffixes_is_rejected() {
        for raw in [
            "info:fedora/a/fcr:acl/fcr:tombstone",
            "info:fedora/a/fcr:metadata/fcr:tombstone",
            "info:fedora/a/fcr:versions/fcr:tombstone",
            "info:fedora/a/fcr:versions/20200101000000/fcr:tombstone",
        ] {
            assert!(
                matches!(
                    ResourceId::parse(raw),
                    Err(IdentifierError::TombstoneCombination { .. })
                ),
                "{raw}"
            );
        }
        assert!(matches!(
            ResourceId::parse("info:fedora/a/fcr:tombstone/fcr:acl"),
            Err(IdentifierError::MisplacedSuffix {
                suffix: FCR_TOMBSTONE,
                ..
            })
        ));
        assert!(matches!(
            ResourceId::parse("info:fedora/a/fcr:tombstone/fcr:tombstone"),
            Err(IdentifierError::DuplicateSuffix {
                suffix: FCR_TOMBSTONE,
                ..
            })
        ));
    }

    #[test]
    fn timemap() {
        let r = id("info:fedora/a/fcr:versions");
        assert!(r.is_timemap());
        assert!(!r.is_memento());
        assert_eq!(r.base_id(), "info:fedora/a");

        let slashed = id("info:fedora/a/fcr:versions/");
        assert!(slashed.is_timemap());
    }

    #[test]
    fn memento_parses_label() {
        let r = id("info:fedora/a/fcr:versions/20200101000000");
        assert!(r.is_memento());
        assert!(!r.is_timemap());
        assert_eq!(r.base_id(), "info:fedora/a");
        assert_eq!(
            r.memento_instant(),
            Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(r.memento_label().as_deref(), Some("20200101000000"));
        assert_eq!(r.resource_id(), "info:fedora/a");
    }

    #[test]
    fn malformed_memento_labels_are_rejected() {
        for raw in [
            "info:fedora/a/fcr:versions/2020010100000X",
            "info:fedora/a/fcr:versions/2020",
            "info:fedora/a/fcr:versions/20201399000000",
            "info:fedora/a/fcr:versions/20200101000000/extra",
        ] {
            assert!(
                matches!(
                    ResourceId::parse(raw),
                    Err(IdentifierError::InvalidMemento { .. })
                ),
                "{raw}"
            );
        }
    }

    #[test]
    fn duplicate_versions_is_rejected() {
        assert!(matches!(
            ResourceId::parse("info:fedora/a/fcr:versions/fcr:versions"),
            Err(IdentifierError::DuplicateSuffix {
                suffix: FCR_VERSIONS,
                ..
            })
        ));
    }

    #[test]
    fn description() {
        let r = id("info:fedora/a/bin/fcr:metadata");
        assert!(r.is_description());
        assert_eq!(r.base_id(), "info:fedora/a/bin");
        assert_eq!(r.resource_id(), "info:fedora/a/bin/fcr:metadata");
        assert_eq!(r.description_id(), "info:fedora/a/bin/fcr:metadata");
    }

    #[test]
    fn duplicate_or_misplaced_metadata_is_rejected() {
        assert!(matches!(
            ResourceId::parse("info:fedora/a/fcr:metadata/fcr:metadata"),
            Err(IdentifierError::DuplicateSuffix {
                suffix: FCR_METADATA,
                ..
            })
        ));
        assert!(matches!(
            ResourceId::parse("info:fedora/a/fcr:metadata/b"),
            Err(IdentifierError::MisplacedSuffix {
                suffix: FCR_METADATA,
                ..
            })
        ));
    }

    #[test]
    fn description_memento() {
        let r = id("info:fedora/a/bin/fcr:metadata/fcr:versions/20210304050607");
        assert!(r.is_description());
        assert!(r.is_memento());
        assert_eq!(r.base_id(), "info:fedora/a/bin");
        assert_eq!(r.resource_id(), "info:fedora/a/bin/fcr:metadata");
    }

    #[test]
    fn reserved_layout_names_are_rejected() {
        for raw in [
            "info:fedora/a/.fcrepo",
            "info:fedora/fcr-root",
            "info:fedora/a/fcr-container.nt/b",
            "info:fedora/a/bin~fcr-desc",
            "info:fedora/a/x~fcr-acl.nt",
        ] {
            assert!(
                matches!(
                    ResourceId::parse(raw),
                    Err(IdentifierError::ReservedName { .. })
                ),
                "{raw}"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Resolution and derived ids
    // -----------------------------------------------------------------------

    #[test]
    fn resolve_relative_to_full_id() {
        let desc = id("info:fedora/a/bin/fcr:metadata");
        let timemap = desc.resolve(&["fcr:versions"]).unwrap();
        assert_eq!(timemap.full_id(), "info:fedora/a/bin/fcr:metadata/fcr:versions");
        assert!(timemap.is_description());
        assert!(timemap.is_timemap());
    }

    #[test]
    fn resolve_relative_to_base_id() {
        let desc = id("info:fedora/a/bin/fcr:metadata");
        let sibling = desc.resolve(&["/child"]).unwrap();
        assert_eq!(sibling.full_id(), "info:fedora/a/bin/child");
        assert!(!sibling.is_description());
    }

    #[test]
    fn resolve_multiple_segments() {
        let root = ResourceId::root();
        let r = root.resolve(&["a", "b/", "/c"]).unwrap();
        assert_eq!(r.full_id(), "info:fedora/a/b/c");
        assert_eq!(ResourceId::from_path(&["a", "b", "c"]).unwrap(), r);
    }

    #[test]
    fn resolve_rejects_blank_segments() {
        let r = id("info:fedora/a");
        assert!(matches!(
            r.resolve(&["/"]),
            Err(IdentifierError::BlankSegment { .. })
        ));
        assert!(r.resolve::<&str>(&[]).is_err());
    }

    #[test]
    fn resolve_drops_fragment() {
        let r = id("info:fedora/a#frag");
        assert_eq!(r.resolve(&["b"]).unwrap().full_id(), "info:fedora/a/b");
    }

    #[test]
    fn derived_ids() {
        let bin = id("info:fedora/a/bin");
        assert_eq!(bin.as_description(), id("info:fedora/a/bin/fcr:metadata"));
        assert_eq!(bin.as_acl(), id("info:fedora/a/bin/fcr:acl"));
        assert_eq!(bin.as_timemap(), id("info:fedora/a/bin/fcr:versions"));

        let desc = bin.as_description();
        assert_eq!(desc.as_base(), bin);
        assert_eq!(desc.as_resource(), desc);
        assert_eq!(
            desc.as_timemap(),
            id("info:fedora/a/bin/fcr:metadata/fcr:versions")
        );

        let instant = Utc.with_ymd_and_hms(2020, 5, 6, 7, 8, 9).unwrap();
        let memento = bin.as_memento(instant);
        assert_eq!(memento, id("info:fedora/a/bin/fcr:versions/20200506070809"));
        assert_eq!(memento.memento_instant(), Some(instant));
        assert_eq!(
            memento.as_description(),
            id("info:fedora/a/bin/fcr:metadata/fcr:versions/20200506070809")
        );
        assert_eq!(memento.as_resource(), bin);

        let tombstone = memento.as_tombstone();
        assert_eq!(tombstone, id("info:fedora/a/bin/fcr:tombstone"));
        assert_eq!(tombstone.as_tombstone(), tombstone);
        assert_eq!(tombstone.as_acl(), bin.as_acl());
        assert!(!tombstone.as_description().is_tombstone());
    }

    #[test]
    fn derived_ids_match_parsed_flags() {
        let bin = id("info:fedora/a/bin");
        let instant = Utc.with_ymd_and_hms(2020, 5, 6, 7, 8, 9).unwrap();
        for derived in [
            bin.as_description(),
            bin.as_acl(),
            bin.as_timemap(),
            bin.as_memento(instant),
            bin.as_description().as_timemap(),
            bin.as_description().as_memento(instant),
            bin.as_tombstone(),
        ] {
            let parsed = id(derived.full_id());
            assert_eq!(parsed.is_description(), derived.is_description());
            assert_eq!(parsed.is_acl(), derived.is_acl());
            assert_eq!(parsed.is_tombstone(), derived.is_tombstone());
            assert_eq!(parsed.is_timemap(), derived.is_timemap());
            assert_eq!(parsed.memento_instant(), derived.memento_instant());
            assert_eq!(parsed.base_id(), derived.base_id());
        }
    }

    #[test]
    fn parent_and_ancestry() {
        let r = id("info:fedora/a/b/c/fcr:metadata");
        assert_eq!(r.parent(), Some(id("info:fedora/a/b")));
        assert_eq!(r.last_segment(), "c");
        assert_eq!(id("info:fedora/a").parent(), Some(ResourceId::root()));

        let a = id("info:fedora/a");
        assert!(a.is_ancestor_of(&r));
        assert!(ResourceId::root().is_ancestor_of(&a));
        assert!(!a.is_ancestor_of(&id("info:fedora/ab")));
        assert!(!a.is_ancestor_of(&a));
    }

    #[test]
    fn equality_is_on_full_id() {
        let a = id("info:fedora/a");
        let desc = id("info:fedora/a/fcr:metadata");
        assert_eq!(a.base_id(), desc.base_id());
        assert_ne!(a, desc);
    }

    #[test]
    fn serde_as_string() {
        let r = id("info:fedora/a/fcr:metadata");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "\"info:fedora/a/fcr:metadata\"");
        let back: ResourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
        assert!(back.is_description());

        assert!(serde_json::from_str::<ResourceId>("\"info:fedora/a//b\"").is_err());
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn segment() -> impl Strategy<Value = String> {
        "[a-z0-9][a-z0-9_.-]{0,8}".prop_filter("reserved", |s| {
            !RESERVED_SEGMENTS.contains(&s.as_str())
        })
    }

    fn suffix() -> impl Strategy<Value = Vec<String>> {
        prop_oneof![
            Just(vec![]),
            Just(vec![FCR_METADATA.to_string()]),
            Just(vec![FCR_ACL.to_string()]),
            Just(vec![FCR_TOMBSTONE.to_string()]),
            Just(vec![FCR_VERSIONS.to_string()]),
            Just(vec![FCR_METADATA.to_string(), FCR_VERSIONS.to_string()]),
            (2000u32..2100, 1u32..13, 1u32..29, 0u32..24).prop_map(|(y, m, d, h)| vec![
                FCR_VERSIONS.to_string(),
                format!("{y:04}{m:02}{d:02}{h:02}3015"),
            ]),
        ]
    }

    proptest! {
        #[test]
        fn full_id_round_trips(
            path in prop::collection::vec(segment(), 1..5),
            suffix in suffix(),
        ) {
            let mut raw = format!("{FEDORA_ID_PREFIX}/{}", path.join("/"));
            for part in &suffix {
                raw.push('/');
                raw.push_str(part);
            }

            let parsed = ResourceId::parse(&raw).unwrap();
            prop_assert_eq!(parsed.full_id(), raw.as_str());
            prop_assert_eq!(
                parsed.base_id(),
                format!("{FEDORA_ID_PREFIX}/{}", path.join("/"))
            );

            let rebuilt = if suffix.is_empty() {
                parsed.as_base()
            } else {
                parsed.as_base().resolve(&suffix).unwrap()
            };
            prop_assert_eq!(rebuilt.full_id(), raw.as_str());
        }

        #[test]
        fn description_shares_base(path in prop::collection::vec(segment(), 1..5)) {
            let bin = ResourceId::from_path(&path).unwrap();
            let desc = ResourceId::parse(&bin.description_id()).unwrap();
            prop_assert_eq!(desc.base_id(), bin.base_id());
            prop_assert!(desc.is_description());
        }
    }
}
