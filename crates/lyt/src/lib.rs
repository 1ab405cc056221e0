// SPDX-License-Identifier: MIT

//! lyt — layout engine for stacked and chained panes.
//!
//! A layout is a tree of [`Dimer`]s. Leaves are panes; composites are
//! either a stacker (children top to bottom) or a chainer (children left
//! to right). A [`Manager`] flows the tree into absolute [`Rect`]s:
//!
//! ```
//! use lyt::{Dim, Dimer, Manager, Rect};
//!
//! let tree = Dimer::stacker(0, Dim::Fixed(80), Dim::Fixed(24), vec![
//!     Dimer::leaf(1, Dim::FILL, Dim::Fixed(1)),
//!     Dimer::leaf(2, Dim::FILL, Dim::FILL),
//! ]);
//! let mut layout = Manager::new(tree)?;
//! layout.reflow(|_| {})?;
//!
//! assert_eq!(layout.dimer(2).map(|d| d.rect()), Some(Rect::new(0, 1, 80, 23)));
//! assert!(layout.has_consistent_layout());
//! # Ok::<(), lyt::LytError>(())
//! ```
//!
//! The engine knows nothing about terminals; it computes geometry only.

pub mod dimer;
pub mod error;
pub mod manager;

pub use dimer::{Dim, Dimer, DimerId, Margins, Rect, Role};
pub use error::LytError;
pub use manager::Manager;
