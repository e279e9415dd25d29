//! Scratch index builder and atomic publish.

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema;
use super::types::{EpisodeMetadata, MetadataError};

/// Sibling scratch location for a publish path (`metadata.db` -> `metadata.db.tmp`).
pub fn scratch_path_for(publish_path: &Path) -> PathBuf {
    let mut name = publish_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "index".into());
    name.push(".tmp");
    publish_path.with_file_name(name)
}

fn io_error(path: &Path, e: std::io::Error) -> MetadataError {
    MetadataError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Accumulates episodes into a scratch index, then publishes it by rename.
///
/// One writer per publish path; concurrent builders targeting the same path
/// must be serialized by the caller.
pub struct IndexBuilder {
    conn: Connection,
    publish_path: PathBuf,
    scratch_path: PathBuf,
    poisoned: bool,
    episodes: usize,
}

impl IndexBuilder {
    /// Creates a fresh scratch index next to `publish_path`, discarding any
    /// stale one left by an earlier run.
    pub fn new(publish_path: &Path) -> Result<Self, MetadataError> {
        let scratch_path = scratch_path_for(publish_path);

        if let Some(parent) = publish_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        for stale in [scratch_path.clone(), journal_path(&scratch_path)] {
            if stale.exists() {
                warn!(path = %stale.display(), "removing stale scratch index");
                std::fs::remove_file(&stale).map_err(|e| io_error(&stale, e))?;
            }
        }

        let conn = Connection::open(&scratch_path)?;
        conn.execute_batch(schema::SCHEMA)?;
        debug!(path = %scratch_path.display(), "created scratch index");

        Ok(Self {
            conn,
            publish_path: publish_path.to_path_buf(),
            scratch_path,
            poisoned: false,
            episodes: 0,
        })
    }

    pub fn scratch_path(&self) -> &Path {
        &self.scratch_path
    }

    pub fn publish_path(&self) -> &Path {
        &self.publish_path
    }

    /// Number of episodes inserted so far.
    pub fn episode_count(&self) -> usize {
        self.episodes
    }

    /// Inserts one episode's rows in a single transaction. On failure nothing
    /// of this episode is kept and the builder refuses to publish.
    pub fn add_episode(&mut self, metadata: &EpisodeMetadata) -> Result<(), MetadataError> {
        if self.poisoned {
            return Err(MetadataError::Poisoned);
        }

        match Self::insert_episode(&mut self.conn, metadata) {
            Ok(()) => {
                self.episodes += 1;
                debug!(
                    season = metadata.season,
                    episode = metadata.episode,
                    thumbs = metadata.thumbs.len(),
                    cues = metadata.subtitles.len(),
                    "indexed episode"
                );
                Ok(())
            }
            Err(e) => {
                self.poisoned = true;
                Err(e)
            }
        }
    }

    fn insert_episode(conn: &mut Connection, metadata: &EpisodeMetadata) -> Result<(), MetadataError> {
        let tx = conn.transaction()?;
        {
            tx.execute(schema::INSERT_EPISODE, params![metadata.season, metadata.episode])?;
            let episode_id = tx.last_insert_rowid();

            let mut insert_thumb = tx.prepare_cached(schema::INSERT_THUMBNAIL)?;
            for thumb in &metadata.thumbs {
                insert_thumb.execute(params![
                    episode_id,
                    &thumb.storage_key,
                    thumb.start_ms as i64,
                    thumb.end_ms as i64,
                ])?;
            }

            tx.execute(schema::INSERT_VIDEO, params![episode_id, &metadata.video_file_key])?;

            let mut insert_cue = tx.prepare_cached(schema::INSERT_SUBTITLE)?;
            for cue in &metadata.subtitles {
                insert_cue.execute(params![
                    episode_id,
                    &cue.text,
                    cue.start_ms as i64,
                    cue.end_ms as i64,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Compacts the scratch index and renames it over the publish path.
    ///
    /// The rename is atomic only when both paths share a filesystem, which
    /// holds because the scratch file is a sibling of the publish path.
    pub fn build(self) -> Result<PathBuf, MetadataError> {
        if self.poisoned {
            return Err(MetadataError::Poisoned);
        }

        let Self {
            conn,
            publish_path,
            scratch_path,
            episodes,
            ..
        } = self;

        conn.execute(schema::OPTIMIZE_FTS, [])?;
        conn.execute_batch("VACUUM")?;
        conn.close().map_err(|(_, e)| MetadataError::from(e))?;

        std::fs::rename(&scratch_path, &publish_path).map_err(|e| io_error(&publish_path, e))?;

        info!(path = %publish_path.display(), episodes, "published metadata index");
        Ok(publish_path)
    }
}

fn journal_path(db_path: &Path) -> PathBuf {
    let mut name = db_path.as_os_str().to_os_string();
    name.push("-journal");
    PathBuf::from(name)
}
