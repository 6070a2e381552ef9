// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! In-process shared memory regions.
//!
//! A [`SharedMemory`] is a fixed-size heap region that several owners (the
//! client that fills a request, the driver that hands its address to the
//! accelerator) can hold at once. Cloning is cheap and shares the bytes.
//!
//! # Aliasing
//! Like any memory shared with a device, the region hands out raw addresses.
//! Callers must not read a region through [`SharedMemory::read`] while an
//! execution that writes it is in flight.

use crate::PoolError;
use std::cell::UnsafeCell;
use std::sync::Arc;

struct Region {
    bytes: Box<[UnsafeCell<u8>]>,
}

// SAFETY: access to the bytes goes through raw pointers; the aliasing rule in
// the module docs is the caller's contract.
unsafe impl Sync for Region {}
unsafe impl Send for Region {}

/// A reference-counted, fixed-size byte region.
#[derive(Clone)]
pub struct SharedMemory {
    region: Arc<Region>,
}

impl SharedMemory {
    /// Allocates a zero-filled region of `len` bytes.
    pub fn new(len: usize) -> Result<Self, PoolError> {
        if len == 0 {
            return Err(PoolError::ZeroSized);
        }
        let bytes = (0..len).map(|_| UnsafeCell::new(0u8)).collect();
        Ok(Self {
            region: Arc::new(Region { bytes }),
        })
    }

    /// Allocates a region initialised with a copy of `data`.
    pub fn from_bytes(data: &[u8]) -> Result<Self, PoolError> {
        let shared = Self::new(data.len())?;
        shared.write(0, data)?;
        Ok(shared)
    }

    /// Allocates a region holding `values` as little-endian `f32`s.
    pub fn from_f32(values: &[f32]) -> Result<Self, PoolError> {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::from_bytes(&bytes)
    }

    /// Returns the size of the region in bytes.
    pub fn len(&self) -> usize {
        self.region.bytes.len()
    }

    /// Always `false`; zero-sized regions cannot be created.
    pub fn is_empty(&self) -> bool {
        self.region.bytes.is_empty()
    }

    /// Returns the base address of the region.
    pub fn as_ptr(&self) -> *mut u8 {
        UnsafeCell::raw_get(self.region.bytes.as_ptr())
    }

    /// Copies `len` bytes starting at `offset` out of the region.
    pub fn read(&self, offset: usize, len: usize) -> Result<Vec<u8>, PoolError> {
        self.check_range(offset, len)?;
        let mut out = vec![0u8; len];
        // SAFETY: range checked above; see the aliasing contract.
        unsafe { std::ptr::copy_nonoverlapping(self.as_ptr().add(offset), out.as_mut_ptr(), len) };
        Ok(out)
    }

    /// Copies `data` into the region at `offset`.
    pub fn write(&self, offset: usize, data: &[u8]) -> Result<(), PoolError> {
        self.check_range(offset, data.len())?;
        // SAFETY: range checked above; see the aliasing contract.
        unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), self.as_ptr().add(offset), data.len()) };
        Ok(())
    }

    /// Reads `count` little-endian `f32`s starting at `offset`.
    pub fn read_f32(&self, offset: usize, count: usize) -> Result<Vec<f32>, PoolError> {
        let bytes = self.read(offset, count * 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<(), PoolError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len() => Ok(()),
            _ => Err(PoolError::OutOfBounds {
                offset,
                len,
                pool_len: self.len(),
            }),
        }
    }
}

impl std::fmt::Debug for SharedMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedMemory")
            .field("len", &self.len())
            .field("owners", &Arc::strong_count(&self.region))
            .finish()
    }
}
