// SPDX-License-Identifier: MIT

//! Manager — flows a dimer tree into absolute rectangles.
//!
//! # The flow
//!
//! The root is placed at the origin with its fixed size. Each composite
//! then divides its own area among its children along its stacking axis
//! (vertical for a stacker, horizontal for a chainer):
//!
//! 1. Fixed children take their size.
//! 2. What is left goes to the filling children, in proportion to their
//!    weights. Integer shares; the last filling child takes the rounding
//!    remainder so no cell is lost.
//! 3. Without filling children the slack becomes the trailing margin of
//!    the last child.
//! 4. If the fixed children alone do not fit, filling children get 0 and
//!    the excess is recorded as the composite's clip on that axis.
//!
//! On the cross axis a filling child spans the composite, a smaller fixed
//! child keeps its size plus a trailing margin, and a larger one sets the
//! composite's cross clip to the largest overflow. Composite children are
//! then flowed within their own area.
//!
//! After a flow, for every composite on its stacking axis:
//!
//! ```text
//! Σ child extent + Σ child margins − clip == extent
//! ```
//!
//! which is what [`Manager::has_consistent_layout`] checks.

use tracing::{debug, trace};

use crate::dimer::{Dim, Dimer, DimerId, Geometry, Margins, Rect, Role};
use crate::error::LytError;

/// Owns a layout tree and keeps its geometry current.
#[derive(Debug, Clone, Default)]
pub struct Manager {
    root: Option<Dimer>,
}

impl Manager {
    /// A manager for `root`.
    ///
    /// # Errors
    ///
    /// [`LytError::DuplicateId`] if two dimers share an id.
    pub fn new(root: Dimer) -> Result<Self, LytError> {
        check_unique(&root)?;
        Ok(Self { root: Some(root) })
    }

    /// A manager without a tree; every flow fails until a root is set.
    #[must_use]
    pub const fn empty() -> Self {
        Self { root: None }
    }

    /// Replace the tree, returning the previous one.
    ///
    /// # Errors
    ///
    /// [`LytError::DuplicateId`]; the current tree stays in place.
    pub fn set_root(&mut self, root: Dimer) -> Result<Option<Dimer>, LytError> {
        check_unique(&root)?;
        Ok(self.root.replace(root))
    }

    pub const fn take_root(&mut self) -> Option<Dimer> {
        self.root.take()
    }

    #[must_use]
    pub const fn root(&self) -> Option<&Dimer> {
        self.root.as_ref()
    }

    #[must_use]
    pub fn dimer(&self, id: DimerId) -> Option<&Dimer> {
        self.root.as_ref().and_then(|r| r.find(id))
    }

    // -- Flow ------------------------------------------------------------------

    /// Recompute the whole tree. `on_clean` sees every dimer whose geometry
    /// changed (or that was marked dirty), children before parents; each is
    /// clean afterwards.
    ///
    /// # Errors
    ///
    /// [`LytError::MissingRoot`], or [`LytError::InvalidRoot`] if the root
    /// is not fixed and positive on both axes.
    pub fn reflow(&mut self, mut on_clean: impl FnMut(&Dimer)) -> Result<(), LytError> {
        let root = self.root.as_mut().ok_or(LytError::MissingRoot)?;
        place_root(root)?;
        debug!(width = root.width(), height = root.height(), "reflow");
        flow(root, &mut on_clean);
        debug_assert!(consistent(root), "flow broke conservation");
        Ok(())
    }

    /// Whether every composite accounts for its extent exactly. False
    /// without a root.
    #[must_use]
    pub fn has_consistent_layout(&self) -> bool {
        self.root.as_ref().is_some_and(consistent)
    }

    /// Ids from the root down to `id`, both included. Empty if `id` is
    /// not in the tree.
    ///
    /// # Errors
    ///
    /// [`LytError::MissingRoot`].
    pub fn locate(&self, id: DimerId) -> Result<Vec<DimerId>, LytError> {
        let root = self.root.as_ref().ok_or(LytError::MissingRoot)?;
        let mut chain = Vec::new();
        if !path_to(root, id, &mut chain) {
            chain.clear();
        }
        Ok(chain)
    }

    /// Give `id` a fixed width and re-flow its parent's subtree. Returns
    /// the ids whose geometry changed, children before parents.
    ///
    /// # Errors
    ///
    /// [`LytError::MissingRoot`], [`LytError::NotFound`], or
    /// [`LytError::InvalidRoot`] when `id` is the root and `width` is 0.
    pub fn update_width(&mut self, id: DimerId, width: u16) -> Result<Vec<DimerId>, LytError> {
        self.update(id, Axis::Horizontal, width)
    }

    /// Give `id` a fixed height and re-flow its parent's subtree.
    ///
    /// # Errors
    ///
    /// See [`update_width`](Self::update_width).
    pub fn update_height(&mut self, id: DimerId, height: u16) -> Result<Vec<DimerId>, LytError> {
        self.update(id, Axis::Vertical, height)
    }

    fn update(&mut self, id: DimerId, axis: Axis, size: u16) -> Result<Vec<DimerId>, LytError> {
        let chain = self.locate(id)?;
        let root = self.root.as_mut().ok_or(LytError::MissingRoot)?;

        let target = root.find_mut(id).ok_or(LytError::NotFound(id))?;
        let previous = axis.set_dim(target, Dim::Fixed(size));
        target.dirty = true;

        let mut cleaned = Vec::new();
        let mut record = |d: &Dimer| cleaned.push(d.id());
        match chain.as_slice() {
            [] => return Err(LytError::NotFound(id)),
            [_] => {
                if let Err(err) = place_root(root) {
                    axis.set_dim(root, previous);
                    return Err(err);
                }
                flow(root, &mut record);
            }
            [.., parent, _] => {
                let parent = *parent;
                let parent = root.find_mut(parent).ok_or(LytError::NotFound(parent))?;
                flow(parent, &mut record);
            }
        }
        debug!(id, ?axis, size, changed = cleaned.len(), "update");
        Ok(cleaned)
    }

    /// Rectangles of all leaves, depth-first.
    #[must_use]
    pub fn rects(&self) -> Vec<(DimerId, Rect)> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            collect_rects(root, &mut out);
        }
        out
    }
}

// ─── Axes ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Vertical,
    Horizontal,
}

impl Axis {
    /// Stacking axis of a composite.
    const fn of(role: &Role) -> Option<Self> {
        match role {
            Role::Leaf => None,
            Role::Stacker(_) => Some(Self::Vertical),
            Role::Chainer(_) => Some(Self::Horizontal),
        }
    }

    const fn dim(self, d: &Dimer) -> Dim {
        match self {
            Self::Vertical => d.height_dim,
            Self::Horizontal => d.width_dim,
        }
    }

    const fn set_dim(self, d: &mut Dimer, dim: Dim) -> Dim {
        match self {
            Self::Vertical => std::mem::replace(&mut d.height_dim, dim),
            Self::Horizontal => std::mem::replace(&mut d.width_dim, dim),
        }
    }

    const fn extent(self, r: Rect) -> u16 {
        match self {
            Self::Vertical => r.height,
            Self::Horizontal => r.width,
        }
    }

    const fn origin(self, r: Rect) -> u16 {
        match self {
            Self::Vertical => r.y,
            Self::Horizontal => r.x,
        }
    }

    /// Leading plus trailing margin along this axis.
    fn margins(self, m: Margins) -> u32 {
        match self {
            Self::Vertical => u32::from(m.top) + u32::from(m.bottom),
            Self::Horizontal => u32::from(m.left) + u32::from(m.right),
        }
    }

    const fn clip(self, g: &Geometry) -> u32 {
        match self {
            Self::Vertical => g.clip_height,
            Self::Horizontal => g.clip_width,
        }
    }

    const fn cross(self) -> Self {
        match self {
            Self::Vertical => Self::Horizontal,
            Self::Horizontal => Self::Vertical,
        }
    }
}

// ─── Flow ────────────────────────────────────────────────────────────────────

fn root_extent(root: &Dimer) -> Result<(u16, u16), LytError> {
    match (root.width_dim, root.height_dim) {
        (Dim::Fixed(w), Dim::Fixed(h)) if w > 0 && h > 0 => Ok((w, h)),
        (width, height) => Err(LytError::InvalidRoot { width, height }),
    }
}

fn place_root(root: &mut Dimer) -> Result<(), LytError> {
    let (width, height) = root_extent(root)?;
    let geo = Geometry {
        rect: Rect::new(0, 0, width, height),
        margins: Margins::default(),
        ..root.geo
    };
    root.place(geo);
    Ok(())
}

/// Lay out the children of `node` within its current rect, then recurse.
fn flow<F: FnMut(&Dimer)>(node: &mut Dimer, on_clean: &mut F) {
    let (clip_width, clip_height) = divide(node);
    let geo = Geometry {
        clip_width,
        clip_height,
        ..node.geo
    };
    node.place(geo);

    for child in node.children_mut() {
        flow(child, on_clean);
    }

    if node.dirty {
        trace!(id = node.id(), rect = ?node.rect(), "clean");
        on_clean(node);
        node.dirty = false;
    }
}

/// Place the direct children of `node`. Returns its clips (width, height).
fn divide(node: &mut Dimer) -> (u32, u32) {
    let Some(axis) = Axis::of(&node.role) else {
        return (0, 0);
    };
    let cross = axis.cross();
    let rect = node.geo.rect;
    let children = node.children_mut();
    let Some(last) = children.len().checked_sub(1) else {
        return (0, 0);
    };

    let extent = u32::from(axis.extent(rect));
    let cross_extent = axis.cross().extent(rect);

    let fixed: u32 = children
        .iter()
        .filter_map(|c| match axis.dim(c) {
            Dim::Fixed(n) => Some(u32::from(n)),
            Dim::Filling(_) => None,
        })
        .sum();
    let total_weight: u32 = children
        .iter()
        .filter_map(|c| axis.dim(c).weight())
        .map(u32::from)
        .sum();
    let last_filling = children.iter().rposition(|c| axis.dim(c).is_filling());

    let (remaining, clip_main) = if fixed <= extent {
        (extent - fixed, 0)
    } else {
        (0, fixed - extent)
    };

    let mut handed_out = 0u32;
    let mut cursor = u32::from(axis.origin(rect));
    let mut clip_cross = 0u32;

    for (i, child) in children.iter_mut().enumerate() {
        let main = match axis.dim(child) {
            Dim::Fixed(n) => u32::from(n),
            Dim::Filling(_) if Some(i) == last_filling => remaining - handed_out,
            Dim::Filling(w) => {
                // Both factors fit in u16, so the product fits in u32.
                let share = remaining * u32::from(w.max(1)) / total_weight;
                handed_out += share;
                share
            }
        };
        let trailing = if i == last && last_filling.is_none() {
            remaining
        } else {
            0
        };

        let (cross_size, cross_margin) = match cross.dim(child) {
            Dim::Filling(_) => (cross_extent, 0),
            Dim::Fixed(n) if n <= cross_extent => (n, cross_extent - n),
            Dim::Fixed(n) => {
                clip_cross = clip_cross.max(u32::from(n - cross_extent));
                (n, 0)
            }
        };

        let main_size = saturate(main);
        let trailing = saturate(trailing);
        let at = saturate(cursor);
        let (rect, margins) = match axis {
            Axis::Vertical => (
                Rect::new(rect.x, at, cross_size, main_size),
                Margins {
                    bottom: trailing,
                    right: cross_margin,
                    ..Margins::default()
                },
            ),
            Axis::Horizontal => (
                Rect::new(at, rect.y, main_size, cross_size),
                Margins {
                    right: trailing,
                    bottom: cross_margin,
                    ..Margins::default()
                },
            ),
        };
        child.place(Geometry {
            rect,
            margins,
            ..child.geo
        });
        cursor += main + u32::from(trailing);
    }

    match axis {
        Axis::Vertical => (clip_cross, clip_main),
        Axis::Horizontal => (clip_main, clip_cross),
    }
}

fn saturate(n: u32) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

// ─── Queries ─────────────────────────────────────────────────────────────────

fn consistent(node: &Dimer) -> bool {
    let Some(axis) = Axis::of(&node.role) else {
        return true;
    };
    let children = node.children();
    if children.is_empty() {
        return true;
    }
    let cross = axis.cross();
    let rect = node.rect();

    let used: u64 = children
        .iter()
        .map(|c| u64::from(axis.extent(c.rect())) + u64::from(axis.margins(c.margins())))
        .sum();
    let conserved = used.checked_sub(u64::from(axis.clip(&node.geo)))
        == Some(u64::from(axis.extent(rect)));

    let cross_extent = u32::from(cross.extent(rect));
    let cross_clip = cross.clip(&node.geo);
    let spans = children.iter().all(|c| {
        let size = u32::from(cross.extent(c.rect()));
        size + cross.margins(c.margins()) == cross_extent
            || (size > cross_extent && size - cross_extent <= cross_clip)
    });

    conserved && spans && children.iter().all(consistent)
}

fn path_to(node: &Dimer, id: DimerId, path: &mut Vec<DimerId>) -> bool {
    path.push(node.id());
    if node.id() == id || node.children().iter().any(|c| path_to(c, id, path)) {
        return true;
    }
    path.pop();
    false
}

fn collect_rects(node: &Dimer, out: &mut Vec<(DimerId, Rect)>) {
    if node.is_leaf() {
        out.push((node.id(), node.rect()));
    }
    for child in node.children() {
        collect_rects(child, out);
    }
}

fn check_unique(root: &Dimer) -> Result<(), LytError> {
    let mut ids = root.ids();
    ids.sort_unstable();
    match ids.windows(2).find(|w| w[0] == w[1]) {
        Some(w) => Err(LytError::DuplicateId(w[0])),
        None => Ok(()),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
