//! Docpack: Document Package Trees
//!
//! An in-memory analogue of a filesystem subtree, used by document-based
//! applications to bundle heterogeneous content (text, structured records,
//! binary blobs, images) into one logical unit saved as a folder of files.
//! Trees carry per-node dirty state, so saves can be differential: unchanged
//! on-disk files are left untouched.

pub mod codec;
pub mod content;
pub mod error;
pub mod pathutil;
pub mod persist;
pub mod tree;
