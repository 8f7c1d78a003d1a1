use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use rusqlite::{Connection, ErrorCode, OpenFlags, OptionalExtension, params};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, trace, warn};

use crate::config::StoreSettings;
use crate::error::StoreError;
use crate::util::{now_utc_string, sha256_text};

mod ids;
mod query;

pub use ids::new_object_id;
pub use query::{
    Filter, ID_FIELD, Projection, SortOrder, SortSpec, Update, compare_values, lookup,
    values_equal,
};

use query::{set_path, validate_replacement};

pub type Document = Map<String, Value>;

const STORE_SCHEMA_VERSION: &str = "0.1.0";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const COLLECTION_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_.-]*$";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionCount {
    pub collection: String,
    pub documents: u64,
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    settings: StoreSettings,
    database: String,
}

struct StoreSession {
    connection: Connection,
    path: PathBuf,
}

impl Drop for StoreSession {
    fn drop(&mut self) {
        trace!(path = %self.path.display(), "released document store connection");
    }
}

struct StoredDocument {
    seq: i64,
    document: Document,
}

impl DocumentStore {
    pub fn new(settings: StoreSettings, database: impl Into<String>) -> Self {
        Self {
            settings,
            database: database.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn database_path(&self) -> PathBuf {
        self.settings.database_path(&self.database)
    }

    pub fn insert_one(&self, collection: &str, document: Document) -> Result<Document, StoreError> {
        self.with_session("insert_one", Some(collection), |connection| {
            let tx = connection.transaction()?;
            let stored = insert_document(&tx, collection, document)?;
            tx.commit()?;
            Ok(stored)
        })
    }

    pub fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        self.with_session("insert_many", Some(collection), |connection| {
            let tx = connection.transaction()?;
            let mut stored = Vec::with_capacity(documents.len());
            for document in documents {
                stored.push(insert_document(&tx, collection, document)?);
            }
            tx.commit()?;
            Ok(stored)
        })
    }

    pub fn find(
        &self,
        collection: &str,
        filter: &Value,
        sort: Option<&SortSpec>,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError> {
        let filter = Filter::parse(filter)?;
        self.with_session("find", Some(collection), |connection| {
            let mut documents = matching_documents(connection, collection, &filter)?
                .into_iter()
                .map(|stored| stored.document)
                .collect::<Vec<Document>>();

            if let Some(sort) = sort.filter(|sort| !sort.is_empty()) {
                documents.sort_by(|left, right| sort.compare(left, right));
            }
            if limit > 0 {
                documents.truncate(limit);
            }
            Ok(documents)
        })
    }

    pub fn find_one(
        &self,
        collection: &str,
        filter: &Value,
        projection: Option<&Value>,
    ) -> Result<Option<Document>, StoreError> {
        let filter = Filter::parse(filter)?;
        let projection = projection.map(Projection::parse).transpose()?;
        self.with_session("find_one", Some(collection), |connection| {
            let found = first_match(connection, collection, &filter)?;
            Ok(found.map(|stored| project(stored.document, projection.as_ref())))
        })
    }

    pub fn find_one_and_replace(
        &self,
        collection: &str,
        filter: &Value,
        replacement: Document,
        projection: Option<&Value>,
    ) -> Result<Option<Document>, StoreError> {
        let filter = Filter::parse(filter)?;
        let projection = projection.map(Projection::parse).transpose()?;
        validate_replacement(&replacement)?;

        self.with_session("find_one_and_replace", Some(collection), |connection| {
            let tx = connection.transaction()?;
            let Some(stored) = first_match(&tx, collection, &filter)? else {
                return Ok(None);
            };

            let document = carry_id(&stored.document, replacement)?;
            update_document(&tx, stored.seq, &document)?;
            tx.commit()?;
            Ok(Some(project(document, projection.as_ref())))
        })
    }

    pub fn update_one(
        &self,
        collection: &str,
        selector: &Value,
        update: &Value,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        let filter = Filter::parse(selector)?;
        let update = Update::parse(update)?;

        self.with_session("update_one", Some(collection), |connection| {
            let tx = connection.transaction()?;
            let outcome = match first_match(&tx, collection, &filter)? {
                Some(stored) => {
                    let mut document = stored.document.clone();
                    update.apply(&mut document)?;
                    let modified = !same_document(&stored.document, &document);
                    if modified {
                        update_document(&tx, stored.seq, &document)?;
                    }
                    UpdateOutcome {
                        matched_count: 1,
                        modified_count: u64::from(modified),
                        upserted_id: None,
                    }
                }
                None if upsert => {
                    let mut document = filter.equality_seed()?;
                    update.apply(&mut document)?;
                    let stored = insert_document(&tx, collection, document)?;
                    UpdateOutcome {
                        upserted_id: stored.get(ID_FIELD).cloned(),
                        ..UpdateOutcome::default()
                    }
                }
                None => UpdateOutcome::default(),
            };
            tx.commit()?;
            Ok(outcome)
        })
    }

    pub fn replace_one(
        &self,
        collection: &str,
        selector: &Value,
        replacement: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        let filter = Filter::parse(selector)?;
        validate_replacement(&replacement)?;

        self.with_session("replace_one", Some(collection), |connection| {
            let tx = connection.transaction()?;
            let outcome = match first_match(&tx, collection, &filter)? {
                Some(stored) => {
                    let document = carry_id(&stored.document, replacement)?;
                    let modified = !same_document(&stored.document, &document);
                    if modified {
                        update_document(&tx, stored.seq, &document)?;
                    }
                    UpdateOutcome {
                        matched_count: 1,
                        modified_count: u64::from(modified),
                        upserted_id: None,
                    }
                }
                None if upsert => {
                    let mut document = replacement;
                    if !document.contains_key(ID_FIELD) {
                        if let Some(id) = filter.equality_seed()?.remove(ID_FIELD) {
                            document.insert(ID_FIELD.to_string(), id);
                        }
                    }
                    let stored = insert_document(&tx, collection, document)?;
                    UpdateOutcome {
                        upserted_id: stored.get(ID_FIELD).cloned(),
                        ..UpdateOutcome::default()
                    }
                }
                None => UpdateOutcome::default(),
            };
            tx.commit()?;
            Ok(outcome)
        })
    }

    pub fn delete_one(&self, collection: &str, filter: &Value) -> Result<u64, StoreError> {
        let filter = Filter::parse(filter)?;
        self.with_session("delete_one", Some(collection), |connection| {
            let tx = connection.transaction()?;
            let deleted = match first_match(&tx, collection, &filter)? {
                Some(stored) => tx.execute("DELETE FROM documents WHERE seq = ?1", params![stored.seq])?,
                None => 0,
            };
            tx.commit()?;
            Ok(deleted as u64)
        })
    }

    pub fn distinct(&self, collection: &str, field: &str) -> Result<Vec<Value>, StoreError> {
        self.with_session("distinct", Some(collection), |connection| {
            let mut values = Vec::<Value>::new();
            for stored in load_documents(connection, collection)? {
                let candidates = match lookup(&stored.document, field) {
                    Some(Value::Array(items)) => items.clone(),
                    Some(value) => vec![value.clone()],
                    None => continue,
                };
                for candidate in candidates {
                    if !values.iter().any(|seen| values_equal(seen, &candidate)) {
                        values.push(candidate);
                    }
                }
            }
            Ok(values)
        })
    }

    pub fn find_last(&self, collection: &str, field: &str) -> Result<Option<Document>, StoreError> {
        let sort = SortSpec::new().descending(field);
        let mut found = self.find(collection, &Value::Object(Map::new()), Some(&sort), 1)?;
        Ok(found.pop())
    }

    pub fn drop(&self, collection: &str) -> Result<bool, StoreError> {
        self.with_session("drop", Some(collection), |connection| {
            let tx = connection.transaction()?;
            let existed = drop_collection(&tx, collection)?;
            tx.commit()?;
            Ok(existed)
        })
    }

    pub fn replace_collection(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<usize, StoreError> {
        self.with_session("replace_collection", Some(collection), |connection| {
            // Drop and inserts commit together or not at all.
            let tx = connection.transaction()?;
            let existed = drop_collection(&tx, collection)?;
            trace!(collection, existed, "dropped collection before reload");

            let count = documents.len();
            for document in documents {
                insert_document(&tx, collection, document)?;
            }
            if count == 0 {
                ensure_collection(&tx, collection)?;
            }
            tx.commit()?;
            Ok(count)
        })
    }

    pub fn collection_counts(&self) -> Result<Vec<CollectionCount>, StoreError> {
        self.with_session("collection_counts", None, |connection| {
            let mut statement = connection.prepare(
                "
                SELECT c.name, COUNT(d.seq)
                FROM collections c
                LEFT JOIN documents d ON d.collection = c.name
                GROUP BY c.name
                ORDER BY c.name ASC
                ",
            )?;

            let mut rows = statement.query([])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(CollectionCount {
                    collection: row.get(0)?,
                    documents: row.get::<_, i64>(1)? as u64,
                });
            }
            Ok(out)
        })
    }

    pub fn add_user(&self, user: &str, password: &str) -> Result<(), StoreError> {
        self.with_session("add_user", None, |connection| {
            connection.execute(
                "
                INSERT INTO store_users(user, password_sha256, created_at)
                VALUES(?1, ?2, ?3)
                ON CONFLICT(user) DO UPDATE SET password_sha256=excluded.password_sha256
                ",
                params![user, password_digest(user, password), now_utc_string()],
            )?;
            Ok(())
        })
    }

    fn with_session<T>(
        &self,
        operation: &'static str,
        collection: Option<&str>,
        run: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let result = collection
            .map(validate_collection_name)
            .transpose()
            .and_then(|_| self.connect())
            .and_then(|mut session| run(&mut session.connection));

        if let Err(err) = &result {
            error!(
                operation,
                database = %self.database,
                collection = collection.unwrap_or_default(),
                error = %err,
                "document store operation failed"
            );
        }
        result
    }

    fn connect(&self) -> Result<StoreSession, StoreError> {
        let path = self.database_path();
        fs::create_dir_all(&self.settings.root).map_err(|source| StoreError::Root {
            path: self.settings.root.clone(),
            source,
        })?;

        let connection = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| StoreError::Connection {
            path: path.clone(),
            source,
        })?;
        let session = StoreSession { connection, path };

        configure_connection(&session.connection).map_err(|source| StoreError::Connection {
            path: session.path.clone(),
            source,
        })?;
        ensure_schema(&session.connection)?;
        self.authenticate(&session.connection)?;

        trace!(
            path = %session.path.display(),
            database = %self.database,
            "connected to document store"
        );
        Ok(session)
    }

    fn authenticate(&self, connection: &Connection) -> Result<(), StoreError> {
        if !self.settings.auth {
            return Ok(());
        }

        let user_count: i64 =
            connection.query_row("SELECT COUNT(*) FROM store_users", [], |row| row.get(0))?;
        if user_count == 0 {
            warn!(
                user = %self.settings.user,
                "no store users exist; accepting connection until one is added"
            );
            return Ok(());
        }

        let stored: Option<String> = connection
            .query_row(
                "SELECT password_sha256 FROM store_users WHERE user = ?1",
                params![self.settings.user],
                |row| row.get(0),
            )
            .optional()?;
        let presented = password_digest(
            &self.settings.user,
            self.settings.password.as_deref().unwrap_or_default(),
        );

        match stored {
            Some(digest) if digest == presented => Ok(()),
            _ => Err(StoreError::Authentication {
                user: self.settings.user.clone(),
            }),
        }
    }
}

fn configure_connection(connection: &Connection) -> rusqlite::Result<()> {
    connection.pragma_update(None, "journal_mode", "WAL")?;
    connection.pragma_update(None, "synchronous", "NORMAL")?;
    connection.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<(), StoreError> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS collections (
          name TEXT PRIMARY KEY,
          created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS documents (
          seq INTEGER PRIMARY KEY AUTOINCREMENT,
          collection TEXT NOT NULL,
          doc_id TEXT NOT NULL,
          body TEXT NOT NULL,
          UNIQUE(collection, doc_id)
        );

        CREATE TABLE IF NOT EXISTS store_users (
          user TEXT PRIMARY KEY,
          password_sha256 TEXT NOT NULL,
          created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_documents_collection_seq ON documents(collection, seq);
        ",
    )?;

    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('store_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [STORE_SCHEMA_VERSION],
    )?;

    Ok(())
}

pub fn validate_collection_name(name: &str) -> Result<(), StoreError> {
    let pattern = Regex::new(COLLECTION_NAME_PATTERN)
        .map_err(|err| StoreError::InvalidQuery(format!("collection name pattern: {err}")))?;
    if pattern.is_match(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}

fn password_digest(user: &str, password: &str) -> String {
    sha256_text(&format!("{user}:{password}"))
}

fn load_documents(connection: &Connection, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
    let mut statement = connection.prepare(
        "
        SELECT seq, body
        FROM documents
        WHERE collection = ?1
        ORDER BY seq ASC
        ",
    )?;

    let mut rows = statement.query(params![collection])?;
    let mut out = Vec::<StoredDocument>::new();

    while let Some(row) = rows.next()? {
        let seq: i64 = row.get(0)?;
        let body: String = row.get(1)?;
        out.push(StoredDocument {
            seq,
            document: serde_json::from_str(&body)?,
        });
    }

    Ok(out)
}

fn matching_documents(
    connection: &Connection,
    collection: &str,
    filter: &Filter,
) -> Result<Vec<StoredDocument>, StoreError> {
    Ok(load_documents(connection, collection)?
        .into_iter()
        .filter(|stored| filter.matches(&stored.document))
        .collect())
}

fn first_match(
    connection: &Connection,
    collection: &str,
    filter: &Filter,
) -> Result<Option<StoredDocument>, StoreError> {
    Ok(load_documents(connection, collection)?
        .into_iter()
        .find(|stored| filter.matches(&stored.document)))
}

fn ensure_collection(connection: &Connection, collection: &str) -> Result<(), StoreError> {
    connection.execute(
        "INSERT OR IGNORE INTO collections(name, created_at) VALUES(?1, ?2)",
        params![collection, now_utc_string()],
    )?;
    Ok(())
}

fn insert_document(
    connection: &Connection,
    collection: &str,
    mut document: Document,
) -> Result<Document, StoreError> {
    validate_replacement(&document)?;
    let id = document
        .entry(ID_FIELD.to_string())
        .or_insert_with(|| Value::String(new_object_id()))
        .clone();
    let key = serde_json::to_string(&id)?;
    let body = serde_json::to_string(&document)?;

    ensure_collection(connection, collection)?;
    connection
        .execute(
            "INSERT INTO documents(collection, doc_id, body) VALUES(?1, ?2, ?3)",
            params![collection, key, body],
        )
        .map_err(|err| match err {
            rusqlite::Error::SqliteFailure(ref failure, _)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    id: display_id(&id),
                }
            }
            other => StoreError::Sqlite(other),
        })?;

    Ok(document)
}

fn update_document(connection: &Connection, seq: i64, document: &Document) -> Result<(), StoreError> {
    let body = serde_json::to_string(document)?;
    connection.execute(
        "UPDATE documents SET body = ?1 WHERE seq = ?2",
        params![body, seq],
    )?;
    Ok(())
}

fn drop_collection(connection: &Connection, collection: &str) -> Result<bool, StoreError> {
    let documents = connection.execute(
        "DELETE FROM documents WHERE collection = ?1",
        params![collection],
    )?;
    let registered = connection.execute("DELETE FROM collections WHERE name = ?1", params![collection])?;
    Ok(documents > 0 || registered > 0)
}

fn carry_id(existing: &Document, mut replacement: Document) -> Result<Document, StoreError> {
    let Some(id) = existing.get(ID_FIELD) else {
        return Ok(replacement);
    };

    match replacement.get(ID_FIELD) {
        Some(new_id) if !values_equal(new_id, id) => Err(StoreError::InvalidQuery(
            "replacement cannot change the _id field".to_string(),
        )),
        _ => {
            set_path(&mut replacement, ID_FIELD, id.clone())?;
            Ok(replacement)
        }
    }
}

fn same_document(left: &Document, right: &Document) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .all(|(key, value)| right.get(key).is_some_and(|other| values_equal(value, other)))
}

fn display_id(id: &Value) -> String {
    match id {
        Value::String(value) => value.clone(),
        other => other.to_string(),
    }
}

fn project(document: Document, projection: Option<&Projection>) -> Document {
    match projection {
        Some(projection) => projection.apply(document),
        None => document,
    }
}
