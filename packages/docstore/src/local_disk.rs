use std::{fs, io, path};

use lazy_static::lazy_static;
use regex::Regex;

use flatrec_core::Value;
use flatrec_json::JsonCodec;

use crate::error::StoreError;
use crate::store::{prepare_save, stored_revision, DocumentId, DocumentStore, Revision};

const EXTENSION: &str = "json";

lazy_static! {
    static ref VALID_NAME: Regex = Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]*$").unwrap();
}

/// A document store keeping one JSON file per document, at
/// `<root>/<collection>/<id>.json`.
pub struct LocalDiskStore {
    root: path::PathBuf,
    codec: JsonCodec,
}

impl LocalDiskStore {
    pub fn new(root: path::PathBuf) -> Result<LocalDiskStore, StoreError> {
        let attr = fs::metadata(&root).map_err(|error| StoreError::RootPathInvalid {
            path: root.clone(),
            error,
        })?;

        if !attr.is_dir() {
            return Err(StoreError::RootPathInvalid {
                path: root,
                error: io::Error::other("Root path must be a directory."),
            });
        }

        if attr.permissions().readonly() {
            return Err(StoreError::RootPathInvalid {
                path: root,
                error: io::Error::other("Root directory must be writable"),
            });
        }

        match root.canonicalize() {
            Ok(root) => Ok(LocalDiskStore {
                root,
                codec: JsonCodec::pretty(),
            }),
            Err(error) => Err(StoreError::RootPathInvalid { path: root, error }),
        }
    }

    pub fn root(&self) -> &path::Path {
        &self.root
    }

    fn collection_dir(&self, collection: &str) -> Result<path::PathBuf, StoreError> {
        if !VALID_NAME.is_match(collection) {
            return Err(StoreError::InvalidCollection {
                name: collection.to_string(),
            });
        }
        Ok(self.root.join(collection))
    }

    fn document_path(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> Result<path::PathBuf, StoreError> {
        if !VALID_NAME.is_match(id.as_str()) {
            return Err(StoreError::InvalidId {
                id: id.to_string(),
            });
        }
        Ok(self
            .collection_dir(collection)?
            .join(format!("{}.{}", id, EXTENSION)))
    }

    fn read_document(&self, file_path: &path::Path) -> Result<Option<Value>, StoreError> {
        log::debug!("Reading {}...", file_path.display());
        match fs::read(file_path) {
            Ok(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn write_document(&self, file_path: &path::Path, doc: &Value) -> Result<(), StoreError> {
        log::debug!("Writing {}...", file_path.display());
        let bytes = self.codec.encode(doc)?;

        // Replace the file in one step so readers never see a partial write.
        let staging = file_path.with_extension("json.tmp");
        let written = fs::write(&staging, &bytes).and_then(|_| fs::rename(&staging, file_path));
        if let Err(error) = written {
            let _ = fs::remove_file(&staging);
            return Err(error.into());
        }
        Ok(())
    }

    /// Ids of every document in `collection`, in file name order.
    pub fn ids(&self, collection: &str) -> Result<Vec<DocumentId>, StoreError> {
        let dir = self.collection_dir(collection)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in walkdir::WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::from)?;
            let file_path = entry.path();
            if !entry.file_type().is_file()
                || file_path.extension().and_then(|e| e.to_str()) != Some(EXTENSION)
            {
                continue;
            }
            if let Some(stem) = file_path.file_stem().and_then(|s| s.to_str()) {
                ids.push(DocumentId::new(stem));
            }
        }
        Ok(ids)
    }
}

impl DocumentStore for LocalDiskStore {
    fn save(
        &mut self,
        collection: &str,
        doc: Value,
    ) -> Result<(DocumentId, Revision), StoreError> {
        let (id, rev, doc) = prepare_save(doc, |id| {
            let file_path = self.document_path(collection, id)?;
            Ok(self.read_document(&file_path)?.as_ref().and_then(stored_revision))
        })?;
        fs::create_dir_all(self.collection_dir(collection)?)?;
        self.write_document(&self.document_path(collection, &id)?, &doc)?;
        Ok((id, rev))
    }

    fn get(&mut self, collection: &str, id: &DocumentId) -> Result<Option<Value>, StoreError> {
        let file_path = self.document_path(collection, id)?;
        self.read_document(&file_path)
    }
}
