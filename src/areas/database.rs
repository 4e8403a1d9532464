//! Loose-object database
//!
//! Content-addressed storage for blobs, trees and commits. Objects are
//! zlib-compressed and stored under a two-character fan-out directory
//! derived from their digest (`ab/cdef...`).
//!
//! Writes are idempotent: storing an object that is already present is a
//! no-op, and the digest returned by `put_raw` is always computed from the
//! bytes actually written. The rewriters rely on this to suppress duplicate
//! blob copies and to obtain authoritative digests without composing them
//! by hand.

use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::{Object, ObjectBox, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use anyhow::Context;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::{BufRead, Cursor, Read, Write};
use std::path::{Path, PathBuf};

/// Content-addressed object database over a directory
#[derive(Debug)]
pub struct Database {
    /// Path to the objects directory (typically `<repo>/.git/objects`)
    path: Box<Path>,
}

impl Database {
    pub fn new(path: Box<Path>) -> Self {
        Database { path }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    /// Check whether the store already holds an object with this digest
    pub fn has(&self, object_id: &ObjectId) -> bool {
        self.path.join(object_id.to_path()).exists()
    }

    /// Store an encoded object, returning its digest
    ///
    /// The digest is computed from the encoded bytes; if an object with
    /// that digest already exists the write is suppressed.
    pub fn put_raw(&self, content: Bytes) -> anyhow::Result<ObjectId> {
        let mut hasher = Sha1::new();
        hasher.update(&content);
        let object_id = ObjectId::try_parse(format!("{:x}", hasher.finalize()))?;

        let object_path = self.path.join(object_id.to_path());
        if !object_path.exists() {
            std::fs::create_dir_all(
                object_path
                    .parent()
                    .context(format!("invalid object path {}", object_path.display()))?,
            )
            .context(format!(
                "unable to create object directory {}",
                object_path.display()
            ))?;

            self.write_object(object_path, content)?;
        }

        Ok(object_id)
    }

    /// Serialize and store an object, returning its digest
    pub fn store(&self, object: &impl Object) -> anyhow::Result<ObjectId> {
        self.put_raw(object.serialize()?)
    }

    /// Copy one object verbatim into another store
    ///
    /// The object is fetched, re-encoded and stored; the target digest is
    /// re-derived from the bytes and therefore always matches the source.
    pub fn copy_object_to(&self, object_id: &ObjectId, target: &Database) -> anyhow::Result<()> {
        let content = self.load(object_id)?;
        target.put_raw(content)?;
        Ok(())
    }

    /// Load the decompressed encoding of an object (including header)
    pub fn load(&self, object_id: &ObjectId) -> anyhow::Result<Bytes> {
        let object_path = self.path.join(object_id.to_path());

        self.read_object(object_path)
    }

    /// Load and decode an object of whichever kind it turns out to be
    pub fn parse_object(&self, object_id: &ObjectId) -> anyhow::Result<ObjectBox> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Blob => Ok(ObjectBox::Blob(Box::new(Blob::deserialize(object_reader)?))),
            ObjectType::Tree => Ok(ObjectBox::Tree(Box::new(Tree::deserialize(object_reader)?))),
            ObjectType::Commit => Ok(ObjectBox::Commit(Box::new(Commit::deserialize(
                object_reader,
            )?))),
        }
    }

    /// Load an object that must be a blob
    pub fn parse_object_as_blob(&self, object_id: &ObjectId) -> anyhow::Result<Blob> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Blob => Blob::deserialize(object_reader),
            other => Err(anyhow::anyhow!("object {object_id} is a {other}, not a blob")),
        }
    }

    /// Load an object that must be a tree
    pub fn parse_object_as_tree(&self, object_id: &ObjectId) -> anyhow::Result<Tree> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Tree => Tree::deserialize(object_reader),
            other => Err(anyhow::anyhow!("object {object_id} is a {other}, not a tree")),
        }
    }

    /// Load an object that must be a commit
    pub fn parse_object_as_commit(&self, object_id: &ObjectId) -> anyhow::Result<Commit> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Commit => Commit::deserialize(object_reader),
            other => Err(anyhow::anyhow!(
                "object {object_id} is a {other}, not a commit"
            )),
        }
    }

    fn parse_object_as_bytes(
        &self,
        object_id: &ObjectId,
    ) -> anyhow::Result<(ObjectType, impl BufRead)> {
        let object_path = self.path.join(object_id.to_path());
        let object_content = self.read_object(object_path)?;
        let mut object_reader = Cursor::new(object_content);

        let object_type = ObjectType::parse_object_type(&mut object_reader)?;

        Ok((object_type, object_reader))
    }

    fn read_object(&self, object_path: PathBuf) -> anyhow::Result<Bytes> {
        let object_content = std::fs::read(&object_path).context(format!(
            "unable to read object file {}",
            object_path.display()
        ))?;

        Self::decompress(object_content.into())
    }

    fn write_object(&self, object_path: PathBuf, object_content: Bytes) -> anyhow::Result<()> {
        let object_dir = object_path
            .parent()
            .context(format!("invalid object path {}", object_path.display()))?;
        let temp_object_path = object_dir.join(Self::generate_temp_name());

        let object_content = Self::compress(object_content)?;

        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_object_path)
            .context(format!(
                "unable to open object file {}",
                temp_object_path.display()
            ))?;

        file.write_all(&object_content).context(format!(
            "unable to write object file {}",
            temp_object_path.display()
        ))?;

        // rename the temp file to the object file to make the write atomic
        std::fs::rename(&temp_object_path, &object_path).context(format!(
            "unable to rename object file to {}",
            object_path.display()
        ))?;

        Ok(())
    }

    fn compress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(&data)
            .context("unable to compress object content")?;

        encoder
            .finish()
            .map(|compressed_content| compressed_content.into())
            .context("unable to finish compressing object content")
    }

    fn decompress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(&*data);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .context("unable to decompress object content")?;

        Ok(decompressed_content.into())
    }

    fn generate_temp_name() -> String {
        format!("tmp-obj-{}", rand::random::<u32>())
    }
}
