#![forbid(unsafe_code)]

use super::StoreError;
use super::support::now_ms;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;

const SCHEMA_VERSION: i64 = 2;

const REQUIRED_TABLES: &[&str] = &[
    "store_state",
    "stories",
    "branches",
    "branch_votes",
    "link_requests",
    "wiki_tags",
    "wiki_entries",
    "wiki_entry_tags",
    "wiki_snapshots",
    "maps",
    "map_snapshots",
    "map_layers",
    "map_objects",
];

pub(super) fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if tables.is_empty() {
        return Ok(());
    }

    if tables
        .iter()
        .any(|table| !REQUIRED_TABLES.contains(&table.as_str()))
    {
        return Err(StoreError::ResetRequired("unsupported tables detected"));
    }
    if REQUIRED_TABLES.iter().any(|table| !tables.contains(*table)) {
        return Err(StoreError::ResetRequired("required table is missing"));
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        Some(_) => Err(StoreError::ResetRequired("schema version mismatch")),
        None => Err(StoreError::ResetRequired("schema state row is missing")),
    }
}

pub(super) fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    let now_ms = now_ms();

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS stories (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          author TEXT NOT NULL,
          title TEXT NOT NULL,
          allow_branching INTEGER NOT NULL,
          branch_count INTEGER NOT NULL DEFAULT 0 CHECK(branch_count >= 0),
          linked_branch_count INTEGER NOT NULL DEFAULT 0 CHECK(linked_branch_count >= 0),
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS branches (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          story_id INTEGER NOT NULL REFERENCES stories(id) ON DELETE CASCADE,
          author TEXT NOT NULL,
          is_main INTEGER NOT NULL,
          parent_branch_id INTEGER REFERENCES branches(id) ON DELETE CASCADE,
          fork_point INTEGER CHECK(fork_point IS NULL OR fork_point >= 0),
          name TEXT NOT NULL,
          description TEXT NOT NULL,
          cover_image_url TEXT,
          branch_type TEXT NOT NULL,
          visibility TEXT NOT NULL,
          canon_status TEXT NOT NULL,
          version INTEGER NOT NULL CHECK(version >= 1),
          vote_count INTEGER NOT NULL DEFAULT 0 CHECK(vote_count >= 0),
          vote_threshold INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          CHECK((is_main = 1 AND parent_branch_id IS NULL AND fork_point IS NULL)
             OR (is_main = 0 AND parent_branch_id IS NOT NULL)),
          CHECK(parent_branch_id IS NULL OR parent_branch_id <> id)
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_branches_one_main
          ON branches(story_id) WHERE is_main = 1;
        CREATE INDEX IF NOT EXISTS idx_branches_story_created
          ON branches(story_id, created_at_ms, id);
        CREATE INDEX IF NOT EXISTS idx_branches_parent
          ON branches(parent_branch_id);

        CREATE TABLE IF NOT EXISTS branch_votes (
          branch_id INTEGER NOT NULL REFERENCES branches(id) ON DELETE CASCADE,
          actor TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          PRIMARY KEY(branch_id, actor)
        );

        CREATE TABLE IF NOT EXISTS link_requests (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          branch_id INTEGER NOT NULL REFERENCES branches(id) ON DELETE CASCADE,
          status TEXT NOT NULL,
          request_message TEXT NOT NULL,
          reviewer TEXT,
          review_comment TEXT,
          reviewed_at_ms INTEGER,
          created_at_ms INTEGER NOT NULL,
          CHECK((status = 'PENDING' AND reviewer IS NULL AND reviewed_at_ms IS NULL)
             OR (status <> 'PENDING' AND reviewer IS NOT NULL AND reviewed_at_ms IS NOT NULL))
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_link_requests_one_pending
          ON link_requests(branch_id) WHERE status = 'PENDING';
        CREATE INDEX IF NOT EXISTS idx_link_requests_branch_created
          ON link_requests(branch_id, created_at_ms, id);

        CREATE TABLE IF NOT EXISTS wiki_tags (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          branch_id INTEGER NOT NULL REFERENCES branches(id) ON DELETE CASCADE,
          name TEXT NOT NULL,
          color TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          UNIQUE(branch_id, name)
        );

        CREATE TABLE IF NOT EXISTS wiki_entries (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          branch_id INTEGER NOT NULL REFERENCES branches(id) ON DELETE CASCADE,
          source_entry_id INTEGER,
          name TEXT NOT NULL,
          image_url TEXT,
          first_appearance INTEGER,
          hidden_note TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          UNIQUE(branch_id, name)
        );

        CREATE TABLE IF NOT EXISTS wiki_entry_tags (
          entry_id INTEGER NOT NULL REFERENCES wiki_entries(id) ON DELETE CASCADE,
          tag_id INTEGER NOT NULL REFERENCES wiki_tags(id) ON DELETE CASCADE,
          PRIMARY KEY(entry_id, tag_id)
        );

        CREATE TABLE IF NOT EXISTS wiki_snapshots (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          entry_id INTEGER NOT NULL REFERENCES wiki_entries(id) ON DELETE CASCADE,
          valid_from_chapter INTEGER NOT NULL CHECK(valid_from_chapter >= 0),
          content TEXT NOT NULL,
          contributor TEXT,
          contributor_type TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          UNIQUE(entry_id, valid_from_chapter)
        );

        CREATE TABLE IF NOT EXISTS maps (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          branch_id INTEGER NOT NULL REFERENCES branches(id) ON DELETE CASCADE,
          source_entry_id INTEGER,
          name TEXT NOT NULL,
          description TEXT NOT NULL,
          width INTEGER NOT NULL CHECK(width > 0),
          height INTEGER NOT NULL CHECK(height > 0),
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          UNIQUE(branch_id, name)
        );

        CREATE TABLE IF NOT EXISTS map_snapshots (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          map_id INTEGER NOT NULL REFERENCES maps(id) ON DELETE CASCADE,
          valid_from_chapter INTEGER NOT NULL CHECK(valid_from_chapter >= 0),
          base_image_url TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          UNIQUE(map_id, valid_from_chapter)
        );

        CREATE TABLE IF NOT EXISTS map_layers (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          snapshot_id INTEGER NOT NULL REFERENCES map_snapshots(id) ON DELETE CASCADE,
          name TEXT NOT NULL,
          layer_type TEXT NOT NULL,
          z_index INTEGER NOT NULL,
          is_visible INTEGER NOT NULL,
          style_json TEXT,
          created_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_map_layers_snapshot_z
          ON map_layers(snapshot_id, z_index, id);

        CREATE TABLE IF NOT EXISTS map_objects (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          layer_id INTEGER NOT NULL REFERENCES map_layers(id) ON DELETE CASCADE,
          object_type TEXT NOT NULL,
          coordinates_json TEXT NOT NULL,
          label TEXT NOT NULL,
          description TEXT NOT NULL,
          wiki_entry_id INTEGER REFERENCES wiki_entries(id) ON DELETE SET NULL,
          style_json TEXT,
          created_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_map_objects_layer
          ON map_objects(layer_id, id);
        "#,
    )?;

    conn.execute(
        "INSERT INTO store_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version, updated_at_ms=excluded.updated_at_ms",
        params![SCHEMA_VERSION, now_ms],
    )?;

    Ok(())
}
