// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for memory pools.

use std::path::PathBuf;

/// Errors that can occur while mapping or addressing memory pools.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// A file-backed pool could not be opened or mapped.
    #[error("cannot map pool '{path}': {source}")]
    Map {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Flushing a writable mapping back to its file failed.
    #[error("cannot flush pool: {0}")]
    Flush(#[source] std::io::Error),

    /// A byte range does not fit inside the pool.
    #[error("range {offset}+{len} exceeds pool of {pool_len} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        pool_len: usize,
    },

    /// A pool index does not name a mapped pool.
    #[error("pool index {index} out of range ({count} pools)")]
    UnknownPool { index: usize, count: usize },

    /// A write was requested against a read-only mapping.
    #[error("pool is mapped read-only")]
    ReadOnly,

    /// Attempted to create a zero-sized pool.
    #[error("cannot create zero-sized pool")]
    ZeroSized,
}
