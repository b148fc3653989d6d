// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod demo;

use anyhow::{Context, Result, anyhow, bail};
use europharm_app::{
    Brochure, BrochureFormInput, BrochureId, Cycle, CycleId, Item, ItemId, ItemPage, ItemPatch,
    ItemQuery, ItemStore, NewCycle, NewItem,
};
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::env;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, info};

pub const APP_NAME: &str = "europharm";
pub const MAX_BROCHURE_SIZE: i64 = 20 << 20;

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "items",
        &[
            "id",
            "code",
            "name",
            "alt_name",
            "is_active",
            "created_at",
            "updated_at",
        ],
    ),
    (
        "brochures",
        &[
            "id",
            "title",
            "description",
            "category",
            "file_name",
            "size_bytes",
            "sha256",
            "data",
            "created_at",
            "updated_at",
        ],
    ),
    (
        "cycles",
        &[
            "id",
            "name",
            "alt_name",
            "coefficient",
            "date_from",
            "date_to",
            "created_at",
            "updated_at",
        ],
    ),
];

/// (index, table, column) triples created on every bootstrap.
const TABLE_INDEXES: &[(&str, &str, &str)] = &[
    ("idx_items_created_at", "items", "created_at"),
    ("idx_items_code", "items", "code"),
    ("idx_brochures_category", "brochures", "category"),
    ("idx_cycles_date_from", "cycles", "date_from"),
];

const ITEM_COLUMNS: &str = "id, code, name, alt_name, is_active, created_at, updated_at";
const BROCHURE_COLUMNS: &str =
    "id, title, description, category, file_name, size_bytes, sha256, created_at, updated_at";

pub struct Store {
    conn: Connection,
    max_brochure_size: i64,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        debug!(path = %path.display(), "opened database");
        Ok(Self {
            conn,
            max_brochure_size: MAX_BROCHURE_SIZE,
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self {
            conn,
            max_brochure_size: MAX_BROCHURE_SIZE,
        })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if schema_object_count(&self.conn, "table")? > 0 {
            check_existing_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
            info!("created database schema");
        }

        create_indexes(&self.conn)
    }

    pub fn seed_demo_data(&self) -> Result<()> {
        demo::seed(self)
    }

    pub fn set_max_brochure_size(&mut self, value: i64) -> Result<()> {
        if value <= 0 {
            bail!("max brochure size must be positive, got {value}");
        }
        self.max_brochure_size = value;
        Ok(())
    }

    pub fn max_brochure_size(&self) -> i64 {
        self.max_brochure_size
    }

    pub fn count_items(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .context("count items")?;
        usize::try_from(count).context("item count overflow")
    }

    pub fn list_brochures(&self, search: &str) -> Result<Vec<Brochure>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {BROCHURE_COLUMNS} FROM brochures ORDER BY updated_at DESC, id DESC"
            ))
            .context("prepare brochures query")?;
        let rows = stmt
            .query_map([], brochure_from_row)
            .context("query brochures")?;
        let brochures = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("collect brochures")?;
        Ok(brochures
            .into_iter()
            .filter(|brochure| brochure.matches(search))
            .collect())
    }

    pub fn get_brochure(&self, brochure_id: BrochureId) -> Result<Brochure> {
        self.conn
            .query_row(
                &format!("SELECT {BROCHURE_COLUMNS} FROM brochures WHERE id = ?"),
                params![brochure_id.get()],
                brochure_from_row,
            )
            .optional()
            .with_context(|| format!("load brochure {}", brochure_id.get()))?
            .ok_or_else(|| anyhow!("brochure {} not found", brochure_id.get()))
    }

    pub fn create_brochure(&self, input: &BrochureFormInput) -> Result<BrochureId> {
        input.validate()?;
        let input = input.trimmed();
        let now = now_timestamp()?;
        self.conn
            .execute(
                "
                INSERT INTO brochures (
                  title, description, category, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?)
                ",
                params![input.title, input.description, input.category, now, now],
            )
            .context("insert brochure")?;
        let id = BrochureId::new(self.conn.last_insert_rowid());
        info!(id = id.get(), title = %input.title, "created brochure");
        Ok(id)
    }

    pub fn update_brochure(&self, brochure_id: BrochureId, input: &BrochureFormInput) -> Result<()> {
        input.validate()?;
        let input = input.trimmed();
        let now = now_timestamp()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE brochures
                SET
                  title = ?,
                  description = ?,
                  category = ?,
                  updated_at = ?
                WHERE id = ?
                ",
                params![
                    input.title,
                    input.description,
                    input.category,
                    now,
                    brochure_id.get(),
                ],
            )
            .context("update brochure")?;
        if rows_affected == 0 {
            bail!(
                "brochure {} not found -- choose an existing brochure and retry",
                brochure_id.get()
            );
        }
        Ok(())
    }

    pub fn delete_brochure(&self, brochure_id: BrochureId) -> Result<()> {
        let rows_affected = self
            .conn
            .execute(
                "DELETE FROM brochures WHERE id = ?",
                params![brochure_id.get()],
            )
            .context("delete brochure")?;
        if rows_affected == 0 {
            bail!("brochure {} not found", brochure_id.get());
        }
        info!(id = brochure_id.get(), "deleted brochure");
        Ok(())
    }

    pub fn attach_brochure_file(
        &self,
        brochure_id: BrochureId,
        file_name: &str,
        data: &[u8],
    ) -> Result<()> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            bail!("brochure file name is required -- choose a file and retry");
        }
        if data.is_empty() {
            bail!("brochure file is empty -- choose a file with content and retry");
        }
        let size = i64::try_from(data.len()).context("brochure size overflow")?;
        if size > self.max_brochure_size {
            bail!(
                "brochure file is {} bytes but max allowed is {}; shrink the file and retry",
                size,
                self.max_brochure_size
            );
        }

        let checksum = checksum_sha256(data);
        let now = now_timestamp()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE brochures
                SET file_name = ?, size_bytes = ?, sha256 = ?, data = ?, updated_at = ?
                WHERE id = ?
                ",
                params![file_name, size, checksum, data, now, brochure_id.get()],
            )
            .context("attach brochure file")?;
        if rows_affected == 0 {
            bail!("brochure {} not found", brochure_id.get());
        }
        info!(id = brochure_id.get(), size, "attached brochure file");
        Ok(())
    }

    pub fn attach_brochure_path(&self, brochure_id: BrochureId, path: &Path) -> Result<()> {
        let metadata =
            fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
        if i64::try_from(metadata.len()).unwrap_or(i64::MAX) > self.max_brochure_size {
            bail!(
                "{} is {} bytes but max allowed is {}; shrink the file and retry",
                path.display(),
                metadata.len(),
                self.max_brochure_size
            );
        }
        let data = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let file_name = path
            .file_name()
            .unwrap_or_else(|| OsStr::new("brochure.bin"))
            .to_string_lossy();
        self.attach_brochure_file(brochure_id, &file_name, &data)
    }

    pub fn extract_brochure(&self, brochure_id: BrochureId) -> Result<PathBuf> {
        self.extract_brochure_to(brochure_id, &brochure_cache_dir()?)
    }

    /// Writes the attachment as `<sha256>-<file name>` under `cache_dir`,
    /// reusing an existing copy of the same size.
    pub fn extract_brochure_to(&self, brochure_id: BrochureId, cache_dir: &Path) -> Result<PathBuf> {
        let row = self
            .conn
            .query_row(
                "SELECT data, file_name, sha256, size_bytes FROM brochures WHERE id = ?",
                params![brochure_id.get()],
                |row| {
                    let data: Option<Vec<u8>> = row.get(0)?;
                    let file_name: Option<String> = row.get(1)?;
                    let checksum: Option<String> = row.get(2)?;
                    let size_bytes: i64 = row.get(3)?;
                    Ok((data, file_name, checksum, size_bytes))
                },
            )
            .optional()
            .with_context(|| format!("load brochure content {}", brochure_id.get()))?
            .ok_or_else(|| anyhow!("brochure {} not found", brochure_id.get()))?;

        let (Some(data), Some(file_name), Some(checksum), size_bytes) = row else {
            bail!(
                "brochure {} has no attached file -- attach one and retry",
                brochure_id.get()
            );
        };
        if data.is_empty() {
            bail!("brochure {} has no content", brochure_id.get());
        }

        fs::create_dir_all(cache_dir)
            .with_context(|| format!("create cache directory {}", cache_dir.display()))?;
        let file_name = Path::new(&file_name)
            .file_name()
            .unwrap_or_else(|| OsStr::new("brochure.bin"))
            .to_string_lossy();
        let cache_path = cache_dir.join(format!("{checksum}-{file_name}"));

        let cache_hit = match fs::metadata(&cache_path) {
            Ok(metadata) => metadata.len() == u64::try_from(size_bytes).unwrap_or(0),
            Err(_) => false,
        };
        // Rewriting a hit refreshes its mtime for TTL eviction.
        fs::write(&cache_path, &data)
            .with_context(|| format!("write cache file {}", cache_path.display()))?;
        set_private_permissions(&cache_path)?;
        debug!(path = %cache_path.display(), cache_hit, "extracted brochure");

        Ok(cache_path)
    }

    pub fn list_cycles(&self) -> Result<Vec<Cycle>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT
                  id, name, alt_name, coefficient, date_from, date_to,
                  created_at, updated_at
                FROM cycles
                ORDER BY date_from DESC, id DESC
                ",
            )
            .context("prepare cycles query")?;
        let rows = stmt
            .query_map([], |row| {
                let date_from_raw: String = row.get(4)?;
                let date_to_raw: String = row.get(5)?;
                let created_at_raw: String = row.get(6)?;
                let updated_at_raw: String = row.get(7)?;

                Ok(Cycle {
                    id: CycleId::new(row.get(0)?),
                    name: row.get(1)?,
                    alt_name: row.get(2)?,
                    coefficient: row.get(3)?,
                    date_from: parse_date(&date_from_raw).map_err(to_sql_error)?,
                    date_to: parse_date(&date_to_raw).map_err(to_sql_error)?,
                    created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
                    updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
                })
            })
            .context("query cycles")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect cycles")
    }

    pub fn create_cycle(&self, cycle: &NewCycle) -> Result<CycleId> {
        if cycle.name.trim().is_empty() {
            bail!("cycle name is required -- enter a name and retry");
        }
        if cycle.coefficient <= 0 {
            bail!("cycle coefficient must be positive");
        }
        if cycle.date_to < cycle.date_from {
            bail!("cycle end date must be on/after start date");
        }

        let now = now_timestamp()?;
        self.conn
            .execute(
                "
                INSERT INTO cycles (
                  name, alt_name, coefficient, date_from, date_to,
                  created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    cycle.name.trim(),
                    cycle.alt_name.trim(),
                    cycle.coefficient,
                    format_date(cycle.date_from),
                    format_date(cycle.date_to),
                    now,
                    now,
                ],
            )
            .context("insert cycle")?;
        Ok(CycleId::new(self.conn.last_insert_rowid()))
    }
}

impl ItemStore for Store {
    fn query_items(&self, query: &ItemQuery) -> Result<ItemPage> {
        let pattern = like_pattern(&query.search.to_lowercase());
        let filter = "(?1 = '' OR fold_case(code) LIKE ?2 ESCAPE '\\' \
                      OR fold_case(name) LIKE ?2 ESCAPE '\\')";

        let total: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM items WHERE {filter}"),
                params![query.search, pattern],
                |row| row.get(0),
            )
            .context("count matching items")?;

        let direction = query.order.direction.as_sql();
        let sql = format!(
            "
            SELECT {ITEM_COLUMNS}
            FROM items
            WHERE {filter}
            ORDER BY {column} {direction}, id {direction}
            LIMIT ?3 OFFSET ?4
            ",
            column = query.order.key.column(),
        );
        let limit = i64::try_from(query.limit).context("page size overflow")?;
        let offset = i64::try_from(query.offset).context("page offset overflow")?;

        let mut stmt = self.conn.prepare(&sql).context("prepare items query")?;
        let rows = stmt
            .query_map(params![query.search, pattern, limit, offset], item_from_row)
            .context("query items")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("collect items")?;

        debug!(
            search = %query.search,
            offset = query.offset,
            rows = rows.len(),
            total,
            "queried items"
        );
        Ok(ItemPage {
            rows,
            total: usize::try_from(total).context("item count overflow")?,
        })
    }

    fn insert_item(&self, item: &NewItem) -> Result<ItemId> {
        let now = now_timestamp()?;
        self.conn
            .execute(
                "
                INSERT INTO items (code, name, is_active, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ",
                params![item.code, item.name, item.is_active, now, now],
            )
            .context("insert item")?;
        let id = ItemId::new(self.conn.last_insert_rowid().to_string());
        info!(id = %id, code = %item.code, "created item");
        Ok(id)
    }

    fn update_item(&self, id: &ItemId, patch: ItemPatch) -> Result<()> {
        let rowid = parse_item_rowid(id)?;
        let now = now_timestamp()?;
        let rows_affected = match patch {
            ItemPatch::IsActive(value) => self
                .conn
                .execute(
                    "UPDATE items SET is_active = ?, updated_at = ? WHERE id = ?",
                    params![value, now, rowid],
                )
                .with_context(|| format!("update item {id}"))?,
        };
        if rows_affected == 0 {
            bail!("item {id} not found -- refresh the list and retry");
        }
        info!(id = %id, column = patch.column(), "updated item");
        Ok(())
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("EUROPHARM_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set EUROPHARM_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("europharm.db"))
}

pub fn brochure_cache_dir() -> Result<PathBuf> {
    let cache_root = dirs::cache_dir().ok_or_else(|| {
        anyhow!("cannot resolve cache directory; set XDG_CACHE_HOME or platform equivalent")
    })?;
    let dir = cache_root.join(APP_NAME).join("brochures");
    fs::create_dir_all(&dir)
        .with_context(|| format!("create cache directory {}", dir.display()))?;
    Ok(dir)
}

pub fn evict_stale_cache(dir: &Path, ttl_days: i64) -> Result<usize> {
    if ttl_days <= 0 {
        return Ok(0);
    }
    if !dir.exists() {
        return Ok(0);
    }

    let ttl_secs = u64::try_from(ttl_days)
        .ok()
        .and_then(|days| days.checked_mul(24 * 60 * 60))
        .ok_or_else(|| anyhow!("ttl_days is too large: {ttl_days}"))?;
    let ttl = Duration::from_secs(ttl_secs);
    let now = std::time::SystemTime::now();

    let mut removed = 0usize;
    for entry in fs::read_dir(dir).with_context(|| format!("read cache dir {}", dir.display()))? {
        let entry = entry?;
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if metadata.is_dir() {
            continue;
        }
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        if now.duration_since(modified).unwrap_or(Duration::ZERO) > ttl
            && fs::remove_file(entry.path()).is_ok()
        {
            removed += 1;
        }
    }

    if removed > 0 {
        info!(removed, dir = %dir.display(), "evicted stale cache files");
    }
    Ok(removed)
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn item_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Item> {
    let id: i64 = row.get(0)?;
    let created_at_raw: String = row.get(5)?;
    let updated_at_raw: String = row.get(6)?;

    Ok(Item {
        id: ItemId::new(id.to_string()),
        code: row.get(1)?,
        name: row.get(2)?,
        alt_name: row.get(3)?,
        is_active: row.get(4)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
    })
}

fn brochure_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Brochure> {
    let created_at_raw: String = row.get(7)?;
    let updated_at_raw: String = row.get(8)?;

    Ok(Brochure {
        id: BrochureId::new(row.get(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        file_name: row.get(4)?,
        size_bytes: row.get(5)?,
        checksum_sha256: row.get(6)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
    })
}

fn parse_item_rowid(id: &ItemId) -> Result<i64> {
    id.as_str()
        .parse::<i64>()
        .with_context(|| format!("item id {id:?} is not a local row id"))
}

/// `%term%` with LIKE wildcards in `term` escaped. Callers lowercase `term`
/// and compare against `fold_case(column)`, since LIKE itself folds ASCII only.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn schema_object_count(conn: &Connection, kind: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name NOT LIKE 'sqlite_%'",
        params![kind],
        |row| row.get(0),
    )
    .with_context(|| format!("count {kind} objects in sqlite_master"))
}

/// Opening a database written by something else fails fast instead of
/// surfacing as a query error mid-session.
fn check_existing_schema(conn: &Connection) -> Result<()> {
    for (table, expected) in REQUIRED_SCHEMA {
        let present = column_names(conn, table)?;
        if present.is_empty() {
            bail!(
                "database is missing required table `{table}`; point [store].db_path at a europharm database"
            );
        }
        let absent = expected
            .iter()
            .filter(|column| !present.contains(**column))
            .copied()
            .collect::<Vec<_>>();
        if !absent.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; recreate the database or add them by hand",
                absent.join(", ")
            );
        }
    }
    Ok(())
}

fn create_indexes(conn: &Connection) -> Result<()> {
    for (name, table, column) in TABLE_INDEXES {
        conn.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS {name} ON {table} ({column});"
        ))
        .with_context(|| format!("create index `{name}` on {table}.{column}"))?;
    }
    debug!(
        indexes = schema_object_count(conn, "index")?,
        "database indexes in place"
    );
    Ok(())
}

/// Empty when the table does not exist.
fn column_names(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("read column list of {table}"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>("name"))
        .with_context(|| format!("read column list of {table}"))?
        .collect::<rusqlite::Result<BTreeSet<_>>>()?;
    Ok(names)
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")?;

    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text = ctx.get::<Option<String>>(0)?;
            Ok(text.map(|text| text.to_lowercase()))
        },
    )
    .context("register fold_case function")
}

/// Fixed-width UTC timestamps so `ORDER BY created_at` sorts text in time
/// order.
fn now_timestamp() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
        ))
        .context("format current timestamp")
}

fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    bail!("unsupported datetime format {raw:?}")
}

fn parse_date(raw: &str) -> Result<Date> {
    if let Ok(value) = Date::parse(raw, &format_description!("[year]-[month]-[day]")) {
        return Ok(value);
    }
    Ok(parse_datetime(raw)?.date())
}

fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            error.to_string(),
        )),
    )
}

fn format_date(value: Date) -> String {
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| "1970-01-01".to_owned())
}

fn checksum_sha256(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut output = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

fn set_private_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path)
            .with_context(|| format!("stat {}", path.display()))?
            .permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(path, permissions)
            .with_context(|| format!("set permissions on {}", path.display()))?;
    }
    Ok(())
}
