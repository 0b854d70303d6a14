//! JSONL (JSON Lines) storage.
//!
//! Each collection lives in one file, one JSON document per line.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{StorageConfig, StorageError};

/// Document collections, one JSONL file each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Players,
    Teams,
    PlayerTeams,
    Matches,
    Items,
    Carts,
    Sales,
    Coupons,
    Users,
}

impl Collection {
    pub const ALL: [Collection; 9] = [
        Collection::Players,
        Collection::Teams,
        Collection::PlayerTeams,
        Collection::Matches,
        Collection::Items,
        Collection::Carts,
        Collection::Sales,
        Collection::Coupons,
        Collection::Users,
    ];

    /// Get the filename for this collection.
    pub fn filename(&self) -> &'static str {
        match self {
            Collection::Players => "players.jsonl",
            Collection::Teams => "teams.jsonl",
            Collection::PlayerTeams => "player_teams.jsonl",
            Collection::Matches => "matches.jsonl",
            Collection::Items => "items.jsonl",
            Collection::Carts => "carts.jsonl",
            Collection::Sales => "sales.jsonl",
            Collection::Coupons => "coupons.jsonl",
            Collection::Users => "users.jsonl",
        }
    }
}

/// Get the path of a collection's file.
pub fn collection_path(config: &StorageConfig, collection: Collection) -> PathBuf {
    config.collections_dir().join(collection.filename())
}

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn for_collection(config: &StorageConfig, collection: Collection) -> Self {
        Self::new(collection_path(config, collection))
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Append a single document to the file.
    pub fn append(&self, doc: &T) -> Result<(), StorageError> {
        self.ensure_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = BufWriter::new(file);
        let json = serde_json::to_string(doc)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        debug!("Appended document to {:?}", self.path);
        Ok(())
    }

    /// Write documents, replacing the entire file.
    pub fn write_all(&self, docs: &[T]) -> Result<usize, StorageError> {
        self.write_with_raw(docs, &[])
    }

    /// Write documents followed by `raw` lines copied through untouched,
    /// replacing the entire file.
    ///
    /// Writes to a sibling temp file first and renames it over the
    /// original, so readers never see a half-written collection.
    pub fn write_with_raw(&self, docs: &[T], raw: &[String]) -> Result<usize, StorageError> {
        self.ensure_dir()?;

        let tmp = tmp_path(&self.path);
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        let mut count = 0;

        for doc in docs {
            let json = serde_json::to_string(doc)?;
            writeln!(writer, "{}", json)?;
            count += 1;
        }
        for line in raw {
            writeln!(writer, "{}", line)?;
        }

        writer.flush()?;
        drop(writer);
        fs::rename(&tmp, &self.path)?;
        debug!("Wrote {} documents to {:?}", count, self.path);

        Ok(count)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// A collection file split into the documents that parsed and the raw
/// lines that did not.
#[derive(Debug)]
pub struct Loaded<T> {
    pub docs: Vec<T>,
    pub unparsed: Vec<String>,
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn for_collection(config: &StorageConfig, collection: Collection) -> Self {
        Self::new(collection_path(config, collection))
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all documents from the file, skipping lines that do not parse.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        Ok(self.read_loaded()?.docs)
    }

    /// Read all documents, keeping the lines that do not parse so a
    /// rewrite of the file can carry them over.
    pub fn read_loaded(&self) -> Result<Loaded<T>, StorageError> {
        let mut docs = Vec::new();
        let mut unparsed = Vec::new();
        if !self.path.exists() {
            return Ok(Loaded { docs, unparsed });
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(&line) {
                Ok(doc) => docs.push(doc),
                Err(e) => {
                    warn!("Failed to parse line {} in {:?}: {}", idx + 1, self.path, e);
                    unparsed.push(line);
                }
            }
        }

        debug!("Read {} documents from {:?}", docs.len(), self.path);
        Ok(Loaded { docs, unparsed })
    }

    /// Read documents matching a predicate.
    pub fn read_where<F>(&self, predicate: F) -> Result<Vec<T>, StorageError>
    where
        F: Fn(&T) -> bool,
    {
        let all = self.read_all()?;
        Ok(all.into_iter().filter(predicate).collect())
    }
}
