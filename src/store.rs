//! SQLite persistence for walks and their derived rows.
//!
//! One `WalkStore` owns one connection; callers that share a store across
//! threads wrap it in a `Mutex`. Background workers (bulk deletion, child-row
//! cleanup) open their own connection from the stored database path, so they
//! never contend with the owning connection mid-statement.
//!
//! The walk in progress lives under the reserved id `0`. Saving a walk
//! promotes its rows to a fresh permanent id; cancelling purges them. The
//! `walk_search` FTS5 table shadows each saved walk's name/description/tags
//! and is written in the same transaction as the walk row.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};
use rusqlite::{params, Connection};

use crate::error::{Result, WalkError};
use crate::migrations;
use crate::types::{
    join_tags, split_tags, GeoPoint, Note, Photo, SortOrder, Tag, Walk, WALK_IN_PROGRESS_ID,
};

// ============================================================================
// Store
// ============================================================================

/// Durable CRUD for walks, points, photos, notes, and the search shadow.
pub struct WalkStore {
    conn: Connection,
    /// Kept for spawning background workers with their own connection.
    /// `None` for in-memory stores, where workers run inline instead (a
    /// second `:memory:` connection would open a different database).
    db_path: Option<PathBuf>,
}

impl WalkStore {
    /// Open (or create) a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = open_connection(path.as_ref())?;
        Self::init_schema(&conn)?;
        migrations::repair_search_shadow(&conn)?;

        Ok(WalkStore {
            conn,
            db_path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(WalkStore {
            conn,
            db_path: None,
        })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS walks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                tags TEXT NOT NULL,
                date INTEGER NOT NULL
            );

            -- Path points, write-mostly, re-read in bulk
            CREATE TABLE IF NOT EXISTS points (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                walk_id INTEGER NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS photos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                walk_id INTEGER NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                file TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                walk_id INTEGER NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                note TEXT NOT NULL
            );

            -- Full-text shadow of walks, kept in lockstep with the walk row
            CREATE VIRTUAL TABLE IF NOT EXISTS walk_search USING fts5(
                name, description, tags, walk_id UNINDEXED
            );

            CREATE INDEX IF NOT EXISTS idx_points_walk ON points(walk_id);
            CREATE INDEX IF NOT EXISTS idx_photos_walk ON photos(walk_id);
            CREATE INDEX IF NOT EXISTS idx_notes_walk ON notes(walk_id);
            "#,
        )
    }

    // ========================================================================
    // Walk lifecycle
    // ========================================================================

    /// Insert the provisional walk under the reserved id.
    ///
    /// Any rows left under the reserved id by a crashed or killed session
    /// are purged first, so a new session never sees residue.
    pub fn create_provisional_walk(
        &mut self,
        name: &str,
        description: &str,
        tags: Vec<Tag>,
    ) -> Result<Walk> {
        require_text(name, "name")?;

        let walk = Walk::new(
            WALK_IN_PROGRESS_ID,
            name.to_string(),
            description.to_string(),
            Utc::now().timestamp_millis(),
            tags,
        );
        let flat = join_tags(&walk.tags);

        let tx = self.conn.transaction()?;
        purge_walk_id(&tx, WALK_IN_PROGRESS_ID)?;
        tx.execute(
            "INSERT INTO walks (id, name, description, tags, date) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![WALK_IN_PROGRESS_ID, walk.name, walk.description, flat, walk.date],
        )?;
        tx.commit()?;

        Ok(walk)
    }

    /// Promote the walk in progress to a permanent id.
    ///
    /// Inserts the walk under a fresh auto-assigned id together with its
    /// search-shadow row, re-parents all point/photo/note rows from the
    /// reserved id, then drops the reserved-id stub. The whole sequence is
    /// one transaction, so a crash can never observe re-parented rows
    /// without their walk.
    pub fn finalize_walk(&mut self, walk: &Walk) -> Result<Walk> {
        require_text(&walk.name, "name")?;

        let flat = join_tags(&walk.tags);

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO walks (name, description, tags, date) VALUES (?1, ?2, ?3, ?4)",
            params![walk.name, walk.description, flat, walk.date],
        )?;
        let new_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO walk_search (walk_id, name, description, tags) VALUES (?1, ?2, ?3, ?4)",
            params![new_id, walk.name, walk.description, flat],
        )?;
        for table in ["points", "photos", "notes"] {
            tx.execute(
                &format!("UPDATE {table} SET walk_id = ?1 WHERE walk_id = ?2"),
                params![new_id, WALK_IN_PROGRESS_ID],
            )?;
        }
        tx.execute(
            "DELETE FROM walks WHERE id = ?1",
            params![WALK_IN_PROGRESS_ID],
        )?;
        tx.commit()?;

        Ok(Walk {
            id: new_id,
            ..walk.clone()
        })
    }

    /// Delete the walk in progress and everything recorded under it.
    pub fn discard_provisional_walk(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        purge_walk_id(&tx, WALK_IN_PROGRESS_ID)?;
        tx.commit()?;
        Ok(())
    }

    /// True if a walk is currently in progress (reserved-id row exists).
    pub fn has_provisional_walk(&self) -> Result<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM walks WHERE id = ?1)",
            params![WALK_IN_PROGRESS_ID],
            |row| row.get(0),
        )?;
        Ok(exists != 0)
    }

    /// Delete a saved walk.
    ///
    /// The walk row and its shadow row go synchronously so the walk
    /// disappears from listings at once; child rows are cleared on a
    /// background worker with its own connection. Ids are never reused,
    /// so the deferred cleanup cannot collide with a future walk.
    pub fn delete_walk(&mut self, walk: &Walk) -> Result<()> {
        let id = walk.id;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM walks WHERE id = ?1", params![id])?;
        tx.execute("DELETE FROM walk_search WHERE walk_id = ?1", params![id])?;
        tx.commit()?;

        match &self.db_path {
            Some(path) => {
                let path = path.clone();
                thread::spawn(move || match open_connection(&path) {
                    Ok(conn) => {
                        if let Err(e) = delete_children(&conn, id) {
                            warn!("background cleanup for walk {} failed: {}", id, e);
                        }
                    }
                    Err(e) => warn!("background cleanup for walk {} failed: {}", id, e),
                });
            }
            None => delete_children(&self.conn, id)?,
        }

        Ok(())
    }

    /// Rewrite a walk's name, description, and tags on both the walk row
    /// and its shadow row.
    pub fn update_walk(&mut self, walk: &Walk) -> Result<()> {
        require_text(&walk.name, "name")?;

        let flat = join_tags(&walk.tags);

        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE walks SET name = ?1, description = ?2, tags = ?3 WHERE id = ?4",
            params![walk.name, walk.description, flat, walk.id],
        )?;
        if changed == 0 {
            return Err(WalkError::NotFound {
                what: "walk",
                id: walk.id,
            });
        }
        tx.execute(
            "UPDATE walk_search SET name = ?1, description = ?2, tags = ?3 WHERE walk_id = ?4",
            params![walk.name, walk.description, flat, walk.id],
        )?;
        tx.commit()?;

        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// All saved walks (the walk in progress is excluded) in the given order.
    pub fn walks(&self, sort: SortOrder) -> Result<Vec<Walk>> {
        let order = match sort {
            SortOrder::DateAscending => "id ASC",
            SortOrder::DateDescending => "id DESC",
            SortOrder::NameAscending => "name ASC",
            SortOrder::NameDescending => "name DESC",
        };

        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name, description, tags, date FROM walks WHERE id != 0 ORDER BY {order}"
        ))?;
        let walks = stmt
            .query_map([], row_to_walk)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(walks)
    }

    pub fn walk_by_id(&self, id: i64) -> Result<Walk> {
        self.conn
            .query_row(
                "SELECT id, name, description, tags, date FROM walks WHERE id = ?1",
                params![id],
                row_to_walk,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => WalkError::NotFound { what: "walk", id },
                other => other.into(),
            })
    }

    /// Path points for a walk, in insertion order.
    pub fn points_for(&self, walk: &Walk) -> Result<Vec<GeoPoint>> {
        let mut stmt = self.conn.prepare(
            "SELECT latitude, longitude FROM points WHERE walk_id = ?1 ORDER BY id ASC",
        )?;
        let points = stmt
            .query_map(params![walk.id], |row| {
                Ok(GeoPoint::from_degrees(row.get(0)?, row.get(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(points)
    }

    pub fn photos_for(&self, walk: &Walk) -> Result<Vec<Photo>> {
        photo_rows(&self.conn, walk.id).map_err(Into::into)
    }

    pub fn notes_for(&self, walk: &Walk) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, walk_id, latitude, longitude, note
             FROM notes WHERE walk_id = ?1 ORDER BY id ASC",
        )?;
        let notes = stmt
            .query_map(params![walk.id], |row| {
                Ok(Note {
                    id: row.get(0)?,
                    walk_id: row.get(1)?,
                    latitude: row.get(2)?,
                    longitude: row.get(3)?,
                    text: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    pub fn photo_count_for(&self, walk: &Walk) -> Result<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM photos WHERE walk_id = ?1",
            params![walk.id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn note_count_for(&self, walk: &Walk) -> Result<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE walk_id = ?1",
            params![walk.id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ========================================================================
    // Child-row inserts and edits
    // ========================================================================

    /// Record one path point. Points are write-mostly; they are re-read in
    /// bulk via [`points_for`](Self::points_for), so nothing is returned.
    pub fn add_point(&self, walk_id: i64, latitude: f64, longitude: f64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO points (walk_id, latitude, longitude) VALUES (?1, ?2, ?3)",
            params![walk_id, latitude, longitude],
        )?;
        Ok(())
    }

    pub fn add_photo(
        &self,
        walk_id: i64,
        latitude: f64,
        longitude: f64,
        file: &str,
    ) -> Result<Photo> {
        require_text(file, "file")?;

        self.conn.execute(
            "INSERT INTO photos (walk_id, latitude, longitude, file) VALUES (?1, ?2, ?3, ?4)",
            params![walk_id, latitude, longitude, file],
        )?;
        Ok(Photo {
            id: self.conn.last_insert_rowid(),
            walk_id,
            latitude,
            longitude,
            file: file.to_string(),
        })
    }

    pub fn add_note(&self, walk_id: i64, latitude: f64, longitude: f64, text: &str) -> Result<Note> {
        require_text(text, "note")?;

        self.conn.execute(
            "INSERT INTO notes (walk_id, latitude, longitude, note) VALUES (?1, ?2, ?3, ?4)",
            params![walk_id, latitude, longitude, text],
        )?;
        Ok(Note {
            id: self.conn.last_insert_rowid(),
            walk_id,
            latitude,
            longitude,
            text: text.to_string(),
        })
    }

    pub fn update_note(&self, id: i64, text: &str) -> Result<()> {
        require_text(text, "note")?;

        let changed = self.conn.execute(
            "UPDATE notes SET note = ?1 WHERE id = ?2",
            params![text, id],
        )?;
        if changed == 0 {
            return Err(WalkError::NotFound { what: "note", id });
        }
        Ok(())
    }

    /// Deletes are idempotent: removing an already-removed row is a no-op.
    pub fn delete_note(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM notes WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn delete_photo(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM photos WHERE id = ?1", params![id])?;
        Ok(())
    }

    // ========================================================================
    // Tags
    // ========================================================================

    /// Union of all tags across saved walks, deduplicated, sorted by name.
    pub fn all_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare("SELECT tags FROM walks WHERE id != 0")?;
        let flats = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut set = std::collections::BTreeSet::new();
        for flat in flats {
            set.extend(split_tags(&flat));
        }
        Ok(set.into_iter().collect())
    }

    /// Remove the given tags from every walk referencing any of them.
    ///
    /// Affected walks are found by a direct tag-membership scan rather than
    /// a full-text MATCH: token matching over- or under-selects against
    /// exact tag names.
    pub fn remove_tags(&mut self, remove: &[Tag]) -> Result<()> {
        if remove.is_empty() {
            return Ok(());
        }

        for mut walk in self.walks(SortOrder::DateAscending)? {
            if walk.has_any_tag(remove) {
                walk.tags.retain(|t| !remove.contains(t));
                self.update_walk(&walk)?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Full-text match over walk names, descriptions, and tags.
    ///
    /// Each whitespace-separated term of the input matches as a word
    /// prefix and all terms must match, so "river" finds "Riverside loop".
    /// An empty, unmatched, or malformed query yields an empty list, never
    /// an error — search must stay resilient to partial user input.
    pub fn search(&self, query: &str, sort: SortOrder) -> Result<Vec<Walk>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let order = match sort {
            SortOrder::DateAscending => "walk_id ASC",
            SortOrder::DateDescending => "walk_id DESC",
            SortOrder::NameAscending => "name ASC",
            SortOrder::NameDescending => "name DESC",
        };

        let match_expr = fts_prefix_query(query);

        let fetch = || -> rusqlite::Result<Vec<i64>> {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT walk_id FROM walk_search WHERE walk_search MATCH ?1 ORDER BY {order}"
            ))?;
            let ids = stmt
                .query_map(params![match_expr], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        };

        let ids = match fetch() {
            Ok(ids) => ids,
            Err(e) => {
                debug!("search query '{}' rejected by FTS: {}", query, e);
                return Ok(Vec::new());
            }
        };

        let mut walks = Vec::with_capacity(ids.len());
        for id in ids {
            match self.walk_by_id(id) {
                Ok(walk) => walks.push(walk),
                // Orphaned shadow row; the repair migration will collect it
                Err(WalkError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(walks)
    }

    // ========================================================================
    // Bulk deletion
    // ========================================================================

    /// Delete a batch of walks on a background worker.
    ///
    /// The returned handle exposes progress counters and cooperative
    /// cancellation: the worker checks the flag between walks and before
    /// each photo file removal, so cancelling leaves already-processed
    /// walks deleted and the rest intact. Photo-file failures are counted
    /// and reported once in the outcome; the rows are removed regardless.
    ///
    /// In-memory stores run the batch inline before returning.
    pub fn delete_walks_background(
        &mut self,
        walks: Vec<Walk>,
        delete_photo_files: bool,
    ) -> DeleteWalksTask {
        let progress = Arc::new(DeleteProgress::new(walks.len() as u32));
        let cancel = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = mpsc::channel();

        match &self.db_path {
            Some(path) => {
                let path = path.clone();
                let progress_worker = Arc::clone(&progress);
                let cancel_worker = Arc::clone(&cancel);
                thread::spawn(move || {
                    let outcome = match open_connection(&path) {
                        Ok(conn) => {
                            run_delete_batch(&conn, &walks, delete_photo_files, &progress_worker, &cancel_worker)
                        }
                        Err(e) => {
                            warn!("bulk delete worker could not open database: {}", e);
                            DeleteOutcome {
                                walks_deleted: 0,
                                failed_file_deletes: 0,
                                cancelled: false,
                            }
                        }
                    };
                    // Receiver may already be dropped; nothing to do then
                    let _ = sender.send(outcome);
                });
            }
            None => {
                let outcome =
                    run_delete_batch(&self.conn, &walks, delete_photo_files, &progress, &cancel);
                let _ = sender.send(outcome);
            }
        }

        DeleteWalksTask {
            receiver,
            progress,
            cancel,
        }
    }
}

// ============================================================================
// Bulk deletion task
// ============================================================================

/// Progress counters for a bulk deletion, shared between threads.
#[derive(Debug)]
pub struct DeleteProgress {
    completed: AtomicU32,
    total: AtomicU32,
}

impl DeleteProgress {
    fn new(total: u32) -> Self {
        DeleteProgress {
            completed: AtomicU32::new(0),
            total: AtomicU32::new(total),
        }
    }

    fn increment(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> u32 {
        self.total.load(Ordering::SeqCst)
    }
}

/// Final tally of a bulk deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub walks_deleted: u32,
    /// Photo files that could not be removed. Reported once per batch; the
    /// database rows were removed regardless.
    pub failed_file_deletes: u32,
    pub cancelled: bool,
}

/// Handle for a background bulk deletion.
pub struct DeleteWalksTask {
    receiver: mpsc::Receiver<DeleteOutcome>,
    progress: Arc<DeleteProgress>,
    cancel: Arc<AtomicBool>,
}

impl DeleteWalksTask {
    /// Request cooperative cancellation. Already-processed walks stay
    /// deleted; unprocessed walks stay intact.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Current progress as (completed, total).
    pub fn progress(&self) -> (u32, u32) {
        (self.progress.completed(), self.progress.total())
    }

    /// Check for completion without blocking.
    pub fn try_recv(&self) -> Option<DeleteOutcome> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the batch to finish (blocking).
    pub fn recv(self) -> Option<DeleteOutcome> {
        self.receiver.recv().ok()
    }
}

fn run_delete_batch(
    conn: &Connection,
    walks: &[Walk],
    delete_photo_files: bool,
    progress: &DeleteProgress,
    cancel: &AtomicBool,
) -> DeleteOutcome {
    let mut walks_deleted = 0;
    let mut failed_file_deletes = 0;

    for walk in walks {
        if cancel.load(Ordering::SeqCst) {
            break;
        }

        if delete_photo_files {
            let photos = photo_rows(conn, walk.id).unwrap_or_else(|e| {
                warn!("could not list photos for walk {}: {}", walk.id, e);
                Vec::new()
            });
            for photo in photos {
                // Stop touching files as soon as the user cancels
                if cancel.load(Ordering::SeqCst) {
                    break;
                }
                if fs::remove_file(&photo.file).is_err() {
                    failed_file_deletes += 1;
                }
            }
        }

        if cancel.load(Ordering::SeqCst) {
            break;
        }

        match delete_walk_rows(conn, walk.id) {
            Ok(()) => {
                walks_deleted += 1;
                progress.increment();
            }
            Err(e) => warn!("failed to delete walk {}: {}", walk.id, e),
        }
    }

    if failed_file_deletes > 0 {
        warn!(
            "bulk delete: {} photo file(s) could not be removed",
            failed_file_deletes
        );
    }

    DeleteOutcome {
        walks_deleted,
        failed_file_deletes,
        cancelled: cancel.load(Ordering::SeqCst),
    }
}

/// Turn raw user input into an FTS5 prefix query: each whitespace-separated
/// term is quoted (embedded quotes doubled) and matched as a prefix; terms
/// are implicitly AND-joined.
fn fts_prefix_query(input: &str) -> String {
    input
        .split_whitespace()
        .map(|term| format!("\"{}\"*", term.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Open a file-backed connection with a busy timeout, since the owning
/// connection and background workers share the database file.
fn open_connection(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}

// ============================================================================
// Row helpers
// ============================================================================

fn row_to_walk(row: &rusqlite::Row<'_>) -> rusqlite::Result<Walk> {
    let id: i64 = row.get(0)?;
    let name: String = row.get(1)?;
    let description: String = row.get(2)?;
    let flat: String = row.get(3)?;
    let date: i64 = row.get(4)?;
    Ok(Walk::new(id, name, description, date, split_tags(&flat)))
}

fn photo_rows(conn: &Connection, walk_id: i64) -> rusqlite::Result<Vec<Photo>> {
    let mut stmt = conn.prepare(
        "SELECT id, walk_id, latitude, longitude, file
         FROM photos WHERE walk_id = ?1 ORDER BY id ASC",
    )?;
    let photos = stmt
        .query_map(params![walk_id], |row| {
            Ok(Photo {
                id: row.get(0)?,
                walk_id: row.get(1)?,
                latitude: row.get(2)?,
                longitude: row.get(3)?,
                file: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(photos)
}

/// Delete a walk's child rows (points, photos, notes).
fn delete_children(conn: &Connection, walk_id: i64) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM points WHERE walk_id = ?1", params![walk_id])?;
    conn.execute("DELETE FROM photos WHERE walk_id = ?1", params![walk_id])?;
    conn.execute("DELETE FROM notes WHERE walk_id = ?1", params![walk_id])?;
    Ok(())
}

/// Delete every row stored under a walk id, the walk row included.
fn delete_walk_rows(conn: &Connection, walk_id: i64) -> rusqlite::Result<()> {
    delete_children(conn, walk_id)?;
    conn.execute("DELETE FROM walk_search WHERE walk_id = ?1", params![walk_id])?;
    conn.execute("DELETE FROM walks WHERE id = ?1", params![walk_id])?;
    Ok(())
}

/// Purge everything under a walk id except the shadow row (the provisional
/// walk never has one).
fn purge_walk_id(conn: &Connection, walk_id: i64) -> rusqlite::Result<()> {
    delete_children(conn, walk_id)?;
    conn.execute("DELETE FROM walks WHERE id = ?1", params![walk_id])?;
    Ok(())
}

fn require_text(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(WalkError::ConstraintViolation { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tag;

    #[test]
    fn test_empty_name_rejected() {
        let mut store = WalkStore::open_in_memory().unwrap();
        let err = store
            .create_provisional_walk("  ", "desc", vec![])
            .unwrap_err();
        assert!(matches!(err, WalkError::ConstraintViolation { field: "name" }));
    }

    #[test]
    fn test_malformed_search_is_empty_not_error() {
        let store = WalkStore::open_in_memory().unwrap();
        // Quote-escaping keeps hostile input a valid (empty) query
        let walks = store.search("\"broken", SortOrder::DateAscending).unwrap();
        assert!(walks.is_empty());
    }

    #[test]
    fn test_fts_prefix_query_quotes_and_stars_terms() {
        assert_eq!(fts_prefix_query("river"), "\"river\"*");
        assert_eq!(fts_prefix_query("canal  walk"), "\"canal\"* \"walk\"*");
        assert_eq!(fts_prefix_query("say \"hi\""), "\"say\"* \"\"\"hi\"\"\"*");
    }

    #[test]
    fn test_search_matches_word_prefixes() {
        let mut store = WalkStore::open_in_memory().unwrap();
        let walk = store
            .create_provisional_walk("Riverside loop", "", vec![])
            .unwrap();
        let saved = store.finalize_walk(&walk).unwrap();

        let hits = store.search("river", SortOrder::NameAscending).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, saved.id);

        // Both terms must match
        assert!(store
            .search("river mountain", SortOrder::NameAscending)
            .unwrap()
            .is_empty());
        let both = store.search("river loo", SortOrder::NameAscending).unwrap();
        assert_eq!(both.len(), 1);
    }

    #[test]
    fn test_delete_batch_honors_pre_set_cancel_flag() {
        let mut store = WalkStore::open_in_memory().unwrap();
        let mut walks = Vec::new();
        for name in ["A", "B"] {
            let w = store.create_provisional_walk(name, "", vec![]).unwrap();
            walks.push(store.finalize_walk(&w).unwrap());
        }

        let progress = DeleteProgress::new(walks.len() as u32);
        let cancel = AtomicBool::new(true);
        let outcome = run_delete_batch(&store.conn, &walks, true, &progress, &cancel);

        assert!(outcome.cancelled);
        assert_eq!(outcome.walks_deleted, 0);
        assert_eq!(progress.completed(), 0);
        // Unprocessed walks survive
        assert_eq!(store.walks(SortOrder::DateAscending).unwrap().len(), 2);
    }

    #[test]
    fn test_walk_by_id_not_found() {
        let store = WalkStore::open_in_memory().unwrap();
        let err = store.walk_by_id(99).unwrap_err();
        assert!(matches!(err, WalkError::NotFound { what: "walk", id: 99 }));
    }

    #[test]
    fn test_update_walk_not_found() {
        let mut store = WalkStore::open_in_memory().unwrap();
        let walk = Walk::new(7, "w".into(), "".into(), 0, vec![Tag::new("a")]);
        assert!(matches!(
            store.update_walk(&walk),
            Err(WalkError::NotFound { .. })
        ));
    }
}
