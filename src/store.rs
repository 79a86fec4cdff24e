//! Hierarchical key-value store backed by a single redb table.
//!
//! The persisted configuration is a tree of named buckets holding string
//! leaves, in the spirit of a bolt database. redb only offers flat ordered
//! tables, so the tree is flattened into byte keys:
//!
//! - a bucket at `a/b` is marked by the key `a\0b\0` with an empty value
//! - a leaf `k` inside `a/b` lives at `a\0b\0\x01k`
//!
//! Every bucket owns the contiguous key range starting with its marker, which
//! makes listing and recursive deletion simple range operations.
//!
//! Reads happen inside [`Store::view`], writes inside [`Store::update`]; the
//! write closure either commits as a whole or not at all.

use crate::constants;
use crate::error::Error;
use redb::{Database, ReadOnlyTable, ReadableTable, Table, TableDefinition, TableError};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

const ENTRIES: TableDefinition<&'static [u8], &'static [u8]> = TableDefinition::new("entries");

const SEPARATOR: u8 = 0x00;
const LEAF_TAG: u8 = 0x01;

/// Address of a bucket as a sequence of names from the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BucketPath(Vec<String>);

impl BucketPath {
    #[must_use]
    pub fn root(name: &str) -> Self {
        Self(vec![name.to_string()])
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    fn prefix_of(segments: &[String]) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        for segment in segments {
            validate_segment(segment)?;
            out.extend_from_slice(segment.as_bytes());
            out.push(SEPARATOR);
        }
        Ok(out)
    }

    fn prefix(&self) -> Result<Vec<u8>, Error> {
        Self::prefix_of(&self.0)
    }

    fn leaf_key(&self, key: &str) -> Result<Vec<u8>, Error> {
        validate_segment(key)?;
        let mut out = self.prefix()?;
        out.push(LEAF_TAG);
        out.extend_from_slice(key.as_bytes());
        Ok(out)
    }
}

impl fmt::Display for BucketPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

fn validate_segment(segment: &str) -> Result<(), Error> {
    if segment.is_empty() {
        return Err(Error::invalid_name(segment, "name cannot be empty"));
    }
    // covers the separator and leaf tag bytes as well
    if segment.chars().any(char::is_control) {
        return Err(Error::invalid_name(
            segment,
            "name cannot contain control characters",
        ));
    }
    Ok(())
}

/// Exclusive upper bound of the key range owned by `prefix`.
///
/// Bucket prefixes always end with the separator byte, so bumping it to the
/// next value bounds every descendant key.
fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    if let Some(last) = end.last_mut() {
        *last += 1;
    }
    end
}

fn lookup_in<T>(table: &T, key: &[u8]) -> Result<Option<Vec<u8>>, Error>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    Ok(table.get(key)?.map(|guard| guard.value().to_vec()))
}

fn scan_in<T>(table: &T, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Error>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let end = prefix_end(prefix);
    let mut out = Vec::new();
    for item in table.range::<&[u8]>(prefix..end.as_slice())? {
        let (key, value) = item?;
        out.push((key.value().to_vec(), value.value().to_vec()));
    }
    Ok(out)
}

fn decode(key: &str, raw: Vec<u8>) -> Result<String, Error> {
    String::from_utf8(raw).map_err(|e| Error::InvalidStoredValue {
        key: key.to_string(),
        value: String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// A child of a bucket as seen by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf { key: String, value: String },
    Bucket { name: String },
}

impl Node {
    fn name(&self) -> &str {
        match self {
            Self::Leaf { key, .. } => key,
            Self::Bucket { name } => name,
        }
    }
}

/// Read access shared by read-only and read-write transactions.
pub trait StoreRead {
    /// Raw point lookup of an encoded key.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying table cannot be read.
    fn lookup(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;

    /// Raw range scan of every key starting with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying table cannot be read.
    fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Error>;

    /// Returns `true` if the bucket has been created.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment is not a valid name or the store cannot be read.
    fn bucket_exists(&self, bucket: &BucketPath) -> Result<bool, Error> {
        Ok(self.lookup(&bucket.prefix()?)?.is_some())
    }

    /// Reads a leaf value.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or the value is not UTF-8.
    fn get(&self, bucket: &BucketPath, key: &str) -> Result<Option<String>, Error> {
        self.lookup(&bucket.leaf_key(key)?)?
            .map(|raw| decode(key, raw))
            .transpose()
    }

    /// Lists the direct children of a bucket in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or a value is not UTF-8.
    fn children(&self, bucket: &BucketPath) -> Result<Vec<Node>, Error> {
        let prefix = bucket.prefix()?;
        let mut nodes = Vec::new();
        for (key, value) in self.scan(&prefix)? {
            let rest = &key[prefix.len()..];
            match rest.split_first() {
                None => {}
                Some((&LEAF_TAG, name)) => {
                    let key = String::from_utf8_lossy(name).into_owned();
                    let value = decode(&key, value)?;
                    nodes.push(Node::Leaf { key, value });
                }
                Some(_) => {
                    // only the marker of a direct child ends at its first separator
                    if rest.iter().position(|&b| b == SEPARATOR) == Some(rest.len() - 1) {
                        let name = String::from_utf8_lossy(&rest[..rest.len() - 1]).into_owned();
                        nodes.push(Node::Bucket { name });
                    }
                }
            }
        }
        nodes.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(nodes)
    }

    /// Leaf values of a bucket. A missing bucket yields an empty map.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn entries(&self, bucket: &BucketPath) -> Result<BTreeMap<String, String>, Error> {
        Ok(self
            .children(bucket)?
            .into_iter()
            .filter_map(|node| match node {
                Node::Leaf { key, value } => Some((key, value)),
                Node::Bucket { .. } => None,
            })
            .collect())
    }

    /// Names of the direct sub-buckets of a bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn buckets(&self, bucket: &BucketPath) -> Result<Vec<String>, Error> {
        Ok(self
            .children(bucket)?
            .into_iter()
            .filter_map(|node| match node {
                Node::Bucket { name } => Some(name),
                Node::Leaf { .. } => None,
            })
            .collect())
    }

    /// Renders a bucket recursively, four spaces of indentation per level.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn dump(&self, bucket: &BucketPath, level: usize) -> Result<Vec<String>, Error> {
        let padding = " ".repeat(level * 4);
        let mut lines = Vec::new();
        for node in self.children(bucket)? {
            match node {
                Node::Leaf { key, value } => lines.push(format!("{padding}{key}: {value}")),
                Node::Bucket { name } => {
                    lines.push(format!("{padding}{name}:"));
                    lines.extend(self.dump(&bucket.child(&name), level + 1)?);
                }
            }
        }
        Ok(lines)
    }
}

/// A read-only snapshot of the store.
pub struct ReadTx {
    table: Option<ReadOnlyTable<&'static [u8], &'static [u8]>>,
}

impl StoreRead for ReadTx {
    fn lookup(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        match &self.table {
            Some(table) => lookup_in(table, key),
            None => Ok(None),
        }
    }

    fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Error> {
        match &self.table {
            Some(table) => scan_in(table, prefix),
            None => Ok(Vec::new()),
        }
    }
}

/// A read-write transaction. Nothing is visible to others until the
/// enclosing [`Store::update`] commits.
pub struct WriteTx<'txn> {
    table: Table<'txn, &'static [u8], &'static [u8]>,
}

impl StoreRead for WriteTx<'_> {
    fn lookup(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        lookup_in(&self.table, key)
    }

    fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Error> {
        scan_in(&self.table, prefix)
    }
}

impl WriteTx<'_> {
    /// Creates the bucket and any missing ancestors.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment is not a valid name or the write fails.
    pub fn create_bucket(&mut self, bucket: &BucketPath) -> Result<(), Error> {
        let segments = bucket.segments();
        for depth in 1..=segments.len() {
            let marker = BucketPath::prefix_of(&segments[..depth])?;
            if self.lookup(&marker)?.is_none() {
                self.table.insert(marker.as_slice(), [].as_slice())?;
            }
        }
        Ok(())
    }

    /// Writes a leaf value, creating the bucket if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is invalid or the write fails.
    pub fn put(&mut self, bucket: &BucketPath, key: &str, value: &str) -> Result<(), Error> {
        self.create_bucket(bucket)?;
        let leaf = bucket.leaf_key(key)?;
        self.table.insert(leaf.as_slice(), value.as_bytes())?;
        Ok(())
    }

    /// Deletes a leaf value. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is invalid or the write fails.
    pub fn delete(&mut self, bucket: &BucketPath, key: &str) -> Result<bool, Error> {
        let leaf = bucket.leaf_key(key)?;
        let removed = self.table.remove(leaf.as_slice())?.is_some();
        Ok(removed)
    }

    /// Deletes a bucket with everything below it. Returns how many keys
    /// (leaves and bucket markers) were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is invalid or the write fails.
    pub fn delete_bucket(&mut self, bucket: &BucketPath) -> Result<usize, Error> {
        let prefix = bucket.prefix()?;
        let keys: Vec<Vec<u8>> = self.scan(&prefix)?.into_iter().map(|(k, _)| k).collect();
        for key in &keys {
            self.table.remove(key.as_slice())?;
        }
        Ok(keys.len())
    }
}

/// Handle on the database file.
pub struct Store {
    db: Database,
}

impl Store {
    /// Opens the database file, creating it (and its directory) if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot
    /// be opened, e.g. because another process holds it.
    pub fn open(path: &Path) -> Result<Self, Error> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        tracing::debug!(path = %path.display(), "opened store");
        Ok(Self { db })
    }

    /// Runs `f` against a consistent read-only snapshot.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or a store error if the snapshot cannot be taken.
    pub fn view<T>(&self, f: impl FnOnce(&ReadTx) -> Result<T, Error>) -> Result<T, Error> {
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(ENTRIES) {
            Ok(table) => Some(table),
            Err(TableError::TableDoesNotExist(_)) => None,
            Err(e) => return Err(e.into()),
        };
        f(&ReadTx { table })
    }

    /// Runs `f` inside a write transaction that commits only if `f` succeeds.
    ///
    /// # Errors
    ///
    /// Returns the error from `f` (after aborting), or a store error if the
    /// transaction cannot be started or committed.
    pub fn update<T>(&self, f: impl FnOnce(&mut WriteTx<'_>) -> Result<T, Error>) -> Result<T, Error> {
        let txn = self.db.begin_write()?;
        let outcome = {
            let table = txn.open_table(ENTRIES)?;
            let mut tx = WriteTx { table };
            f(&mut tx)
        };
        match outcome {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                txn.abort()?;
                Err(e)
            }
        }
    }
}

/// Default store location: `~/.rest.db`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_db_path() -> Result<PathBuf, Error> {
    dirs::home_dir()
        .map(|home| home.join(constants::DEFAULT_DB_FILE))
        .ok_or_else(|| {
            Error::InvalidArgument(
                "could not determine home directory, pass --db explicitly".to_string(),
            )
        })
}
