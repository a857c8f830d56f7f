//! Persistent free list of deleted record indices
//!
//! The file is a flat sequence of native-endian `u32` values. Pushing appends
//! to the tail, popping reads the tail and truncates it, so the most recently
//! freed index is handed out first.

use super::{Index, NULL_INDEX};
use crate::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const ID_SIZE: u64 = std::mem::size_of::<Index>() as u64;

/// Id store file path for a record store file (`<store>.id`)
pub fn id_store_path(store_path: &Path) -> PathBuf {
    let mut name = store_path.as_os_str().to_os_string();
    name.push(".id");
    PathBuf::from(name)
}

/// Free-list recycler backing one record store
#[derive(Debug)]
pub struct IdStore {
    file: File,
    path: PathBuf,
}

impl IdStore {
    /// Open (or create) the id store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let len = file.metadata()?.len();
        if len % ID_SIZE != 0 {
            return Err(Error::corruption(format!(
                "Id store {path:?}: length {len} is not a multiple of {ID_SIZE}"
            )));
        }

        Ok(Self { file, path })
    }

    /// Path on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored ids
    pub fn len(&self) -> Result<usize> {
        Ok((self.file.metadata()?.len() / ID_SIZE) as usize)
    }

    /// Whether no ids are stored
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Push a freed index
    pub fn store_id(&mut self, index: Index) -> Result<()> {
        if index == NULL_INDEX {
            return Err(Error::InvalidIndex { index });
        }
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&index.to_ne_bytes())?;
        Ok(())
    }

    /// Most recently stored index without removing it
    pub fn peek_id(&self) -> Result<Option<Index>> {
        let len = self.file.metadata()?.len();
        if len == 0 {
            return Ok(None);
        }

        let mut buf = [0u8; ID_SIZE as usize];
        let mut file = &self.file;
        file.seek(SeekFrom::Start(len - ID_SIZE))?;
        file.read_exact(&mut buf)?;
        Ok(Some(Index::from_ne_bytes(buf)))
    }

    /// Pop the most recently stored index; `None` when the list is empty
    pub fn get_id(&mut self) -> Result<Option<Index>> {
        let id = self.peek_id()?;
        if id.is_some() {
            let len = self.file.metadata()?.len();
            self.file.set_len(len - ID_SIZE)?;
        }
        Ok(id)
    }

    /// Every stored id, oldest first
    pub fn get_all_ids(&self) -> Result<Vec<Index>> {
        let mut raw = Vec::new();
        let mut file = &self.file;
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut raw)?;

        Ok(raw
            .chunks_exact(ID_SIZE as usize)
            .map(|chunk| Index::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    /// Replace the whole list; the last element is popped first
    pub fn replace_all_ids(&mut self, ids: &[Index]) -> Result<()> {
        if let Some(&index) = ids.iter().find(|&&id| id == NULL_INDEX) {
            return Err(Error::InvalidIndex { index });
        }

        let raw: Vec<u8> = ids.iter().flat_map(|id| id.to_ne_bytes()).collect();
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&raw)?;
        Ok(())
    }

    /// Drop every stored id
    pub fn clear(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        Ok(())
    }

    /// Flush to disk
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
