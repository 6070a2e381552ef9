// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pool descriptors and their run-time mappings.
//!
//! A model or request names its memory as a list of [`PoolDescriptor`]s and
//! addresses bytes as `(pool index, offset)`. Before use, every descriptor is
//! turned into a [`MappedPool`]:
//!
//! 1. Shared regions are mapped by taking another reference to the region.
//! 2. File-backed pools are mapped with `memmap2`, read-only or writable.
//!
//! After an execution writes its outputs, [`MappedPool::update`] pushes
//! writable file mappings back to storage.

use crate::{PoolError, SharedMemory};
use std::fs::OpenOptions;
use std::path::PathBuf;

/// Where a pool's bytes live.
#[derive(Debug, Clone)]
pub enum PoolDescriptor {
    /// An in-process shared region.
    Shared(SharedMemory),
    /// A byte range of a file.
    File {
        path: PathBuf,
        offset: u64,
        size: usize,
        writable: bool,
    },
}

impl PoolDescriptor {
    /// Creates a descriptor for a whole file.
    pub fn file(path: impl Into<PathBuf>, size: usize, writable: bool) -> Self {
        Self::File {
            path: path.into(),
            offset: 0,
            size,
            writable,
        }
    }
}

enum Backing {
    Shared(SharedMemory),
    ReadOnly(memmap2::Mmap),
    Writable(memmap2::MmapMut),
}

/// A pool mapped into the address space.
pub struct MappedPool {
    backing: Backing,
    base: *mut u8,
    len: usize,
}

// SAFETY: the base pointer is derived from the owned backing and stays valid
// for the lifetime of the mapping.
unsafe impl Send for MappedPool {}

impl MappedPool {
    /// Maps a single descriptor.
    pub fn map(descriptor: &PoolDescriptor) -> Result<Self, PoolError> {
        match descriptor {
            PoolDescriptor::Shared(shared) => Ok(Self {
                base: shared.as_ptr(),
                len: shared.len(),
                backing: Backing::Shared(shared.clone()),
            }),
            PoolDescriptor::File {
                path,
                offset,
                size,
                writable,
            } => {
                if *size == 0 {
                    return Err(PoolError::ZeroSized);
                }
                let map_err = |source| PoolError::Map {
                    path: path.clone(),
                    source,
                };
                let file = OpenOptions::new()
                    .read(true)
                    .write(*writable)
                    .open(path)
                    .map_err(map_err)?;

                let mut options = memmap2::MmapOptions::new();
                options.offset(*offset).len(*size);

                let pool = if *writable {
                    // SAFETY: the file stays open for the duration of the map
                    // call; concurrent truncation by another process is outside
                    // our control, as with any mapped file.
                    let mut mmap = unsafe { options.map_mut(&file) }.map_err(map_err)?;
                    Self {
                        base: mmap.as_mut_ptr(),
                        len: mmap.len(),
                        backing: Backing::Writable(mmap),
                    }
                } else {
                    // SAFETY: see above.
                    let mmap = unsafe { options.map(&file) }.map_err(map_err)?;
                    Self {
                        base: mmap.as_ptr() as *mut u8,
                        len: mmap.len(),
                        backing: Backing::ReadOnly(mmap),
                    }
                };
                tracing::debug!(
                    "mapped pool '{}' ({} bytes, {})",
                    path.display(),
                    pool.len,
                    if *writable { "rw" } else { "ro" },
                );
                Ok(pool)
            }
        }
    }

    /// Returns the mapped length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if the pool may be written (shared regions always can).
    pub fn is_writable(&self) -> bool {
        !matches!(self.backing, Backing::ReadOnly(_))
    }

    /// Returns the base address of the mapping.
    pub fn base_ptr(&self) -> *mut u8 {
        self.base
    }

    /// Borrows `len` bytes at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8], PoolError> {
        self.check_range(offset, len)?;
        // SAFETY: range checked against the mapping length.
        Ok(unsafe { std::slice::from_raw_parts(self.base.add(offset), len) })
    }

    /// Address of `len` readable bytes at `offset`.
    pub fn ptr_at(&self, offset: usize, len: usize) -> Result<*mut u8, PoolError> {
        self.check_range(offset, len)?;
        // SAFETY: range checked against the mapping length.
        Ok(unsafe { self.base.add(offset) })
    }

    /// Address of `len` writable bytes at `offset`.
    pub fn ptr_at_mut(&self, offset: usize, len: usize) -> Result<*mut u8, PoolError> {
        if !self.is_writable() {
            return Err(PoolError::ReadOnly);
        }
        self.ptr_at(offset, len)
    }

    /// Flushes a writable file mapping so results become visible to the
    /// pool's other users. A no-op for shared and read-only pools.
    pub fn update(&self) -> Result<(), PoolError> {
        match &self.backing {
            Backing::Writable(mmap) => mmap.flush().map_err(PoolError::Flush),
            Backing::Shared(_) | Backing::ReadOnly(_) => Ok(()),
        }
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<(), PoolError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(PoolError::OutOfBounds {
                offset,
                len,
                pool_len: self.len,
            }),
        }
    }
}

impl std::fmt::Debug for MappedPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.backing {
            Backing::Shared(_) => "shared",
            Backing::ReadOnly(_) => "file-ro",
            Backing::Writable(_) => "file-rw",
        };
        f.debug_struct("MappedPool")
            .field("kind", &kind)
            .field("len", &self.len)
            .finish()
    }
}

/// Maps every descriptor, in order.
pub fn map_pools(descriptors: &[PoolDescriptor]) -> Result<Vec<MappedPool>, PoolError> {
    descriptors.iter().map(MappedPool::map).collect()
}

/// Flushes every pool, stopping at the first failure.
pub fn update_pools(pools: &[MappedPool]) -> Result<(), PoolError> {
    pools.iter().try_for_each(MappedPool::update)
}

/// Looks up a pool by index.
pub fn pool_at(pools: &[MappedPool], index: usize) -> Result<&MappedPool, PoolError> {
    pools.get(index).ok_or(PoolError::UnknownPool {
        index,
        count: pools.len(),
    })
}
