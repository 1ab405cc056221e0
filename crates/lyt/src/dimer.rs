// SPDX-License-Identifier: MIT

//! Dimer — one node of a layout tree.
//!
//! A dimer is sized per axis, either a fixed number of cells or a weighted
//! share of whatever its parent has left over. Its role decides what it
//! does with its own area:
//!
//! ```text
//! Stacker (vertical)          Chainer (horizontal)
//! ┌──────────────┐            ┌────┬────────┬────┐
//! │ child 0      │            │ c0 │ c1     │ c2 │
//! ├──────────────┤            │    │        │    │
//! │ child 1      │            │    │        │    │
//! ├──────────────┤            └────┴────────┴────┘
//! │ child 2      │
//! └──────────────┘
//! ```
//!
//! Geometry (`rect`, margins, clips) is written by the
//! [`Manager`](crate::Manager) only; hosts read it after a flow.

/// Identifies a dimer within one tree. Unique per tree.
pub type DimerId = usize;

/// Sizing along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Exactly this many cells.
    Fixed(u16),
    /// A share of the parent's leftover space, proportional to the weight.
    /// A weight of 0 counts as 1.
    Filling(u16),
}

impl Dim {
    /// One even share.
    pub const FILL: Self = Self::Filling(1);

    #[must_use]
    #[inline]
    pub const fn is_filling(self) -> bool {
        matches!(self, Self::Filling(_))
    }

    /// Weight of a filling dim, `None` for a fixed one.
    #[must_use]
    pub const fn weight(self) -> Option<u16> {
        match self {
            Self::Filling(0) => Some(1),
            Self::Filling(w) => Some(w),
            Self::Fixed(_) => None,
        }
    }
}

/// A rectangle in absolute cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    #[must_use]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Unused space around a dimer, in cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Margins {
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
    pub left: u16,
}

/// What a dimer does with its area. A composite is a stacker or a chainer,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Leaf,
    /// Children top to bottom.
    Stacker(Vec<Dimer>),
    /// Children left to right.
    Chainer(Vec<Dimer>),
}

/// Everything a flow computes for one dimer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Geometry {
    pub(crate) rect: Rect,
    pub(crate) margins: Margins,
    pub(crate) clip_width: u32,
    pub(crate) clip_height: u32,
}

/// A layout node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimer {
    id: DimerId,
    pub(crate) width_dim: Dim,
    pub(crate) height_dim: Dim,
    pub(crate) role: Role,
    pub(crate) geo: Geometry,
    pub(crate) dirty: bool,
}

impl Dimer {
    fn with_role(id: DimerId, width: Dim, height: Dim, role: Role) -> Self {
        Self {
            id,
            width_dim: width,
            height_dim: height,
            role,
            geo: Geometry::default(),
            dirty: true,
        }
    }

    #[must_use]
    pub fn leaf(id: DimerId, width: Dim, height: Dim) -> Self {
        Self::with_role(id, width, height, Role::Leaf)
    }

    /// A dimer laying out `children` top to bottom.
    #[must_use]
    pub fn stacker(id: DimerId, width: Dim, height: Dim, children: Vec<Self>) -> Self {
        Self::with_role(id, width, height, Role::Stacker(children))
    }

    /// A dimer laying out `children` left to right.
    #[must_use]
    pub fn chainer(id: DimerId, width: Dim, height: Dim, children: Vec<Self>) -> Self {
        Self::with_role(id, width, height, Role::Chainer(children))
    }

    // -- Sizing ----------------------------------------------------------------

    #[must_use]
    #[inline]
    pub const fn id(&self) -> DimerId {
        self.id
    }

    #[must_use]
    #[inline]
    pub const fn width_dim(&self) -> Dim {
        self.width_dim
    }

    #[must_use]
    #[inline]
    pub const fn height_dim(&self) -> Dim {
        self.height_dim
    }

    #[must_use]
    pub const fn role(&self) -> &Role {
        &self.role
    }

    /// Children of a composite; empty for a leaf.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match &self.role {
            Role::Leaf => &[],
            Role::Stacker(c) | Role::Chainer(c) => c,
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Self] {
        match &mut self.role {
            Role::Leaf => &mut [],
            Role::Stacker(c) | Role::Chainer(c) => c,
        }
    }

    #[must_use]
    #[inline]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.role, Role::Leaf)
    }

    #[must_use]
    #[inline]
    pub const fn is_stacker(&self) -> bool {
        matches!(self.role, Role::Stacker(_))
    }

    #[must_use]
    #[inline]
    pub const fn is_chainer(&self) -> bool {
        matches!(self.role, Role::Chainer(_))
    }

    // -- Geometry --------------------------------------------------------------

    /// Absolute rectangle from the last flow.
    #[must_use]
    #[inline]
    pub const fn rect(&self) -> Rect {
        self.geo.rect
    }

    #[must_use]
    #[inline]
    pub const fn width(&self) -> u16 {
        self.geo.rect.width
    }

    #[must_use]
    #[inline]
    pub const fn height(&self) -> u16 {
        self.geo.rect.height
    }

    #[must_use]
    #[inline]
    pub const fn margins(&self) -> Margins {
        self.geo.margins
    }

    /// Columns by which the children overflow this dimer.
    #[must_use]
    #[inline]
    pub const fn clip_width(&self) -> u32 {
        self.geo.clip_width
    }

    /// Rows by which the children overflow this dimer.
    #[must_use]
    #[inline]
    pub const fn clip_height(&self) -> u32 {
        self.geo.clip_height
    }

    /// Whether the geometry changed since the last flow reported it.
    #[must_use]
    #[inline]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Store a new geometry; dirty if it differs.
    pub(crate) fn place(&mut self, geo: Geometry) {
        if self.geo != geo {
            self.geo = geo;
            self.dirty = true;
        }
    }

    // -- Search ----------------------------------------------------------------

    /// Depth-first search for `id`, this dimer included.
    #[must_use]
    pub fn find(&self, id: DimerId) -> Option<&Self> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(id))
    }

    pub(crate) fn find_mut(&mut self, id: DimerId) -> Option<&mut Self> {
        if self.id == id {
            return Some(self);
        }
        self.children_mut().iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Every id in the subtree, depth-first, parents before children.
    #[must_use]
    pub fn ids(&self) -> Vec<DimerId> {
        let mut out = Vec::new();
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids(&self, out: &mut Vec<DimerId>) {
        out.push(self.id);
        for child in self.children() {
            child.collect_ids(out);
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
