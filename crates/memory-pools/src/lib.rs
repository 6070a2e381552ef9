// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-pools
//!
//! Memory pools shared between a model, its execution requests and the
//! accelerator.
//!
//! # Key Components
//!
//! - [`SharedMemory`] — a reference-counted heap region, cheap to clone.
//! - [`PoolDescriptor`] — where a pool lives (shared region or file range).
//! - [`MappedPool`] — a descriptor mapped into the address space, addressed
//!   by `(offset, length)` with bounds checks.
//!
//! # Ownership Model
//!
//! ```text
//! PoolDescriptor ──map()──► MappedPool ──ptr_at()──► accelerator tensor
//!                                │
//!                                │ update()
//!                                ▼
//!                         msync / no-op
//! ```
//!
//! # Example
//! ```
//! use memory_pools::{map_pools, PoolDescriptor, SharedMemory};
//!
//! let region = SharedMemory::from_f32(&[1.0, 2.0]).unwrap();
//! let pools = map_pools(&[PoolDescriptor::Shared(region)]).unwrap();
//! assert_eq!(pools[0].len(), 8);
//! ```

mod error;
pub mod pool;
mod shared;

pub use error::PoolError;
pub use pool::{map_pools, pool_at, update_pools, MappedPool, PoolDescriptor};
pub use shared::SharedMemory;
