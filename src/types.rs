//! Domain value objects for walks, tags, and map items.
//!
//! These types are plain data containers shared by the store, the recording
//! session, and the query layer. Tag flattening to and from the single-column
//! storage form lives here so that re-reads are deterministic regardless of
//! which store operation wrote the row.

use serde::{Deserialize, Serialize};

/// Delimiter used when flattening a walk's tags into a single text column.
///
/// The flattened form always carries a trailing delimiter; readers split on
/// the delimiter and drop empty segments.
pub const TAG_DELIMITER: &str = " , ";

/// Reserved walk id denoting the single in-progress, not-yet-saved walk.
pub const WALK_IN_PROGRESS_ID: i64 = 0;

// ============================================================================
// Tag
// ============================================================================

/// A label identified solely by its name. Equality and ordering are by name.
///
/// Names are normalized to lowercase at entry; tags have no row identity of
/// their own — a tag exists only as long as some walk references it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag {
    name: String,
}

impl Tag {
    /// Create a tag, trimming surrounding whitespace and lowercasing.
    pub fn new(name: &str) -> Self {
        Tag {
            name: name.trim().to_lowercase(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

/// Canonical tag list: empty names dropped, sorted by name, duplicates
/// collapsed. Applied before every serialization so the stored form is
/// independent of input order.
pub fn canonical_tags(mut tags: Vec<Tag>) -> Vec<Tag> {
    tags.retain(|t| !t.is_empty());
    tags.sort();
    tags.dedup();
    tags
}

/// Flatten tags into the delimited storage form (trailing delimiter always).
pub fn join_tags(tags: &[Tag]) -> String {
    let mut out = String::new();
    for tag in tags {
        out.push_str(tag.name());
        out.push_str(TAG_DELIMITER);
    }
    out
}

/// Parse the delimited storage form back into a canonical tag list.
pub fn split_tags(flat: &str) -> Vec<Tag> {
    canonical_tags(flat.split(TAG_DELIMITER).map(Tag::new).collect())
}

// ============================================================================
// Walk
// ============================================================================

/// How a list of walks should be ordered. Date orders sort on the row id,
/// which is insertion-ordered and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    DateAscending,
    DateDescending,
    NameAscending,
    NameDescending,
}

/// A recorded walk. Id `0` is reserved for the walk in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Walk {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Sorted, deduplicated; never contains an empty-named tag.
    pub tags: Vec<Tag>,
    /// Creation time, epoch milliseconds.
    pub date: i64,
}

impl Walk {
    pub fn new(id: i64, name: String, description: String, date: i64, tags: Vec<Tag>) -> Self {
        Walk {
            id,
            name,
            description,
            tags: canonical_tags(tags),
            date,
        }
    }

    /// Replace this walk's tags, re-canonicalizing.
    pub fn set_tags(&mut self, tags: Vec<Tag>) {
        self.tags = canonical_tags(tags);
    }

    /// True if this walk shares at least one tag with `selected`.
    pub fn has_any_tag(&self, selected: &[Tag]) -> bool {
        self.tags.iter().any(|t| selected.contains(t))
    }
}

// ============================================================================
// Map items
// ============================================================================

/// A position sample on a walk's path, stored as micro-degree fixed point
/// (degrees × 1e6) for precision and compactness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat_e6: i32,
    pub lon_e6: i32,
}

impl GeoPoint {
    pub fn from_degrees(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            lat_e6: (latitude * 1e6).round() as i32,
            lon_e6: (longitude * 1e6).round() as i32,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.lat_e6 as f64 / 1e6
    }

    pub fn longitude(&self) -> f64 {
        self.lon_e6 as f64 / 1e6
    }
}

/// A photo taken during a walk. The file path is an opaque reference owned
/// by the platform layer; the store never reads the file, only deletes it
/// when asked to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub walk_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub file: String,
}

/// A free-text note attached to a position on a walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub walk_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub text: String,
}
