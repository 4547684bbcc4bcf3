//! walklog: walk recording engine with local persistence.
//!
//! Records user walks as time-ordered GPS paths and persists them — with
//! photos, notes, and tags — in a local SQLite database, searchable via an
//! FTS5 shadow table. The crate is a library core for a mobile shell: the
//! platform supplies the location sensor and UI, this crate supplies the
//! recording state machine, the store, and the query layer.

// Domain value objects and tag serialization
pub mod types;
pub use types::{
    canonical_tags, join_tags, split_tags, GeoPoint, Note, Photo, SortOrder, Tag, Walk,
    TAG_DELIMITER, WALK_IN_PROGRESS_ID,
};

// Error handling
pub mod error;
pub use error::{Result, WalkError};

// SQLite persistence
pub mod store;
pub use store::{DeleteOutcome, DeleteProgress, DeleteWalksTask, WalkStore};

// Schema repair for databases written by older versions
pub mod migrations;

// Recording session state machine
pub mod service;
pub use service::{
    GpsSession, LocationProvider, NullObserver, SessionAbortReason, SessionConfig,
    SessionObserver, TrackState, DEFAULT_SAMPLE_INTERVAL,
};

// List composition: sorting, tag filtering, search
pub mod query;

/// Initialize logging for Android
#[cfg(target_os = "android")]
pub fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("walklog"),
    );
}

#[cfg(not(target_os = "android"))]
pub fn init_logging() {
    // No-op on non-Android platforms
}
