// SPDX-License-Identifier: MIT

//! Layout errors.
//!
//! Every failing operation validates before it mutates, so after an error
//! the tree still holds the geometry of the last successful flow.

use crate::dimer::{Dim, DimerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LytError {
    #[error("layout has no root")]
    MissingRoot,

    #[error("root needs a fixed, positive size, got {width:?} x {height:?}")]
    InvalidRoot { width: Dim, height: Dim },

    #[error("dimer id {0} is used more than once")]
    DuplicateId(DimerId),

    #[error("no dimer with id {0}")]
    NotFound(DimerId),
}
