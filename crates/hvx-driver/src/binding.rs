// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Write-once slots for accelerator tensor handles.

use hexagon_link::NodeInput;

/// The accelerator tensor an operand is bound to, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Binding {
    #[default]
    Unbound,
    Bound(NodeInput),
}

impl Binding {
    pub fn get(&self) -> Option<NodeInput> {
        match self {
            Binding::Bound(input) => Some(*input),
            Binding::Unbound => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, Binding::Bound(_))
    }

    /// Binds the slot. A bound slot is left unchanged and its current
    /// handle returned as the error.
    pub fn bind_once(&mut self, input: NodeInput) -> Result<(), NodeInput> {
        match self {
            Binding::Bound(existing) => Err(*existing),
            Binding::Unbound => {
                *self = Binding::Bound(input);
                Ok(())
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Binding::Unbound;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_once() {
        let mut slot = Binding::default();
        assert!(!slot.is_bound());
        slot.bind_once(NodeInput::new(3, 0)).unwrap();
        assert_eq!(slot.get(), Some(NodeInput::new(3, 0)));
        assert_eq!(slot.bind_once(NodeInput::new(4, 0)), Err(NodeInput::new(3, 0)));
        assert_eq!(slot.get(), Some(NodeInput::new(3, 0)));
        slot.clear();
        assert_eq!(slot.get(), None);
    }
}
