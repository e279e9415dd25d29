//! Index schema and write statements.

pub(super) const SCHEMA: &str = r#"
    CREATE TABLE episodes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        season INTEGER NOT NULL,
        episode INTEGER NOT NULL,
        UNIQUE(season, episode)
    );

    CREATE TABLE thumbnails (
        episode_id INTEGER NOT NULL REFERENCES episodes(id),
        storage_key TEXT NOT NULL,
        start_ts INTEGER NOT NULL,
        end_ts INTEGER NOT NULL
    );

    CREATE INDEX idx_thumbnails_episode_start ON thumbnails(episode_id, start_ts);

    CREATE TABLE videos (
        episode_id INTEGER PRIMARY KEY REFERENCES episodes(id),
        storage_key TEXT NOT NULL
    );

    CREATE TABLE subtitles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        episode_id INTEGER NOT NULL REFERENCES episodes(id),
        text TEXT NOT NULL,
        start_ts INTEGER NOT NULL,
        end_ts INTEGER NOT NULL
    );

    CREATE INDEX idx_subtitles_episode ON subtitles(episode_id);

    -- Full-text index over cue text, fed by the insert trigger below
    CREATE VIRTUAL TABLE subtitles_fts USING fts5(
        text,
        content='subtitles',
        content_rowid='id'
    );

    CREATE TRIGGER subtitles_fts_insert AFTER INSERT ON subtitles BEGIN
        INSERT INTO subtitles_fts(rowid, text) VALUES (new.id, new.text);
    END;
"#;

pub(super) const INSERT_EPISODE: &str = "INSERT INTO episodes (season, episode) VALUES (?1, ?2)";

pub(super) const INSERT_THUMBNAIL: &str =
    "INSERT INTO thumbnails (episode_id, storage_key, start_ts, end_ts) VALUES (?1, ?2, ?3, ?4)";

pub(super) const INSERT_VIDEO: &str = "INSERT INTO videos (episode_id, storage_key) VALUES (?1, ?2)";

pub(super) const INSERT_SUBTITLE: &str =
    "INSERT INTO subtitles (episode_id, text, start_ts, end_ts) VALUES (?1, ?2, ?3, ?4)";

pub(super) const OPTIMIZE_FTS: &str = "INSERT INTO subtitles_fts(subtitles_fts) VALUES ('optimize')";
