//! Read-only lookups against the published index.

use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::types::{MetadataError, SearchResult, ThumbRef};

/// Maximum number of search hits returned.
pub const SEARCH_LIMIT: usize = 100;

/// Named queries prepared once when the store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    Search,
    ThumbnailsForward,
    ThumbnailsBackward,
    VideoKey,
    Episodes,
}

impl Query {
    pub const ALL: [Query; 5] = [
        Query::Search,
        Query::ThumbnailsForward,
        Query::ThumbnailsBackward,
        Query::VideoKey,
        Query::Episodes,
    ];

    pub fn sql(self) -> &'static str {
        match self {
            Query::Search => {
                "SELECT episodes.season, episodes.episode, subtitles.start_ts, subtitles.end_ts, subtitles.text
                 FROM subtitles_fts
                 INNER JOIN subtitles ON subtitles.id = subtitles_fts.rowid
                 INNER JOIN episodes ON episodes.id = subtitles.episode_id
                 WHERE subtitles_fts MATCH ?1
                 ORDER BY subtitles_fts.rank
                 LIMIT ?2"
            }
            Query::ThumbnailsForward => {
                "SELECT storage_key, start_ts, end_ts FROM thumbnails
                 WHERE episode_id = (SELECT id FROM episodes WHERE season = ?1 AND episode = ?2)
                   AND start_ts >= ?3
                 ORDER BY start_ts ASC
                 LIMIT ?4"
            }
            Query::ThumbnailsBackward => {
                "SELECT storage_key, start_ts, end_ts FROM thumbnails
                 WHERE episode_id = (SELECT id FROM episodes WHERE season = ?1 AND episode = ?2)
                   AND start_ts <= ?3
                 ORDER BY start_ts DESC
                 LIMIT ?4"
            }
            Query::VideoKey => {
                "SELECT storage_key FROM videos
                 WHERE episode_id = (SELECT id FROM episodes WHERE season = ?1 AND episode = ?2)"
            }
            Query::Episodes => "SELECT season, episode FROM episodes ORDER BY season, episode",
        }
    }
}

/// Turns free text into an FTS5 expression matching every word, so user
/// punctuation never reaches the query syntax.
fn to_match_expression(text: &str) -> Option<String> {
    let terms: Vec<String> = text
        .split_whitespace()
        .map(|word| format!("\"{}\"", word.replace('"', "\"\"")))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

/// Read-only view of a published index.
///
/// Opening keeps a handle on the file that was published at that moment; a
/// later publish does not affect this instance.
///
/// Queries on one instance are serialized on its connection. Concurrent
/// readers each open their own `MetadataStore` over the same file.
pub struct MetadataStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl MetadataStore {
    /// Opens the published index read-only and prepares every named query.
    pub fn open(path: &Path) -> Result<Self, MetadataError> {
        if !path.exists() {
            return Err(MetadataError::NotFound(path.display().to_string()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.set_prepared_statement_cache_capacity(Query::ALL.len());
        for query in Query::ALL {
            conn.prepare_cached(query.sql())?;
        }
        debug!(path = %path.display(), "opened metadata index");

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, MetadataError> {
        self.conn
            .lock()
            .map_err(|_| MetadataError::Database("connection lock poisoned".to_string()))
    }

    /// Full-text search over cue text, best matches first, at most
    /// [`SEARCH_LIMIT`] hits.
    pub fn search(&self, text: &str) -> Result<Vec<SearchResult>, MetadataError> {
        let Some(expression) = to_match_expression(text) else {
            return Ok(Vec::new());
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(Query::Search.sql())?;
        let rows = stmt.query_map(params![expression, SEARCH_LIMIT as i64], |row| {
            Ok(SearchResult {
                season: row.get(0)?,
                episode: row.get(1)?,
                start_ms: row.get::<_, i64>(2)? as u64,
                end_ms: row.get::<_, i64>(3)? as u64,
                text: row.get(4)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Thumbnails around a seek point.
    ///
    /// Forward: `start >= timestamp_ms`, ascending. Reverse: `start <=
    /// timestamp_ms`, descending. At most `limit` entries either way.
    pub fn list_thumbnails(
        &self,
        season: u32,
        episode: u32,
        timestamp_ms: u64,
        limit: usize,
        reverse: bool,
    ) -> Result<Vec<ThumbRef>, MetadataError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query = if reverse {
            Query::ThumbnailsBackward
        } else {
            Query::ThumbnailsForward
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(query.sql())?;
        let rows = stmt.query_map(
            params![season, episode, timestamp_ms as i64, limit as i64],
            |row| {
                Ok(ThumbRef {
                    storage_key: row.get(0)?,
                    start_ms: row.get::<_, i64>(1)? as u64,
                    end_ms: row.get::<_, i64>(2)? as u64,
                })
            },
        )?;

        let mut thumbs = Vec::new();
        for row in rows {
            thumbs.push(row?);
        }
        Ok(thumbs)
    }

    /// Object key of the episode's proxy video.
    pub fn video_key(&self, season: u32, episode: u32) -> Result<String, MetadataError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(Query::VideoKey.sql())?;
        stmt.query_row(params![season, episode], |row| row.get(0))
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    MetadataError::NotFound(format!("S{:02}E{:02}", season, episode))
                }
                _ => MetadataError::from(e),
            })
    }

    /// Every indexed (season, episode), ordered.
    pub fn episodes(&self) -> Result<Vec<(u32, u32)>, MetadataError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(Query::Episodes.sql())?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut episodes = Vec::new();
        for row in rows {
            episodes.push(row?);
        }
        Ok(episodes)
    }
}
