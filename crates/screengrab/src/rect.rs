use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A rectangle in virtual-desktop coordinates.
///
/// The origin `(0, 0)` is the top-left corner of the primary display, so displays positioned
/// left of or above the primary display have negative coordinates. `right` and `bottom` are
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// The x-coordinate of the left edge.
    pub left: i32,

    /// The y-coordinate of the top edge.
    pub top: i32,

    /// The x-coordinate of the right edge.
    pub right: i32,

    /// The y-coordinate of the bottom edge.
    pub bottom: i32,
}

impl Rect {
    /// Creates a rect from its edges, returns `InvalidRect` if the rect is degenerate.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Result<Self, InvalidRect> {
        Self {
            left,
            top,
            right,
            bottom,
        }
        .validate()
    }

    /// Creates a rect from a position and a size as reported by the OS.
    ///
    /// Returns `InvalidRect` if the far edges overflow or the rect is degenerate.
    pub fn from_position_size(x: i32, y: i32, width: i32, height: i32) -> Result<Self, InvalidRect> {
        let right = x.checked_add(width).ok_or(InvalidRect::Overflow)?;
        let bottom = y.checked_add(height).ok_or(InvalidRect::Overflow)?;

        Self::new(x, y, right, bottom)
    }

    /// Checks that the rect has a positive width and height.
    pub fn validate(self) -> Result<Self, InvalidRect> {
        if self.right <= self.left {
            return Err(InvalidRect::NonPositiveWidth(self));
        }

        if self.bottom <= self.top {
            return Err(InvalidRect::NonPositiveHeight(self));
        }

        Ok(self)
    }

    /// Returns if the rect has a positive width and height.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// The width of the rect, zero for degenerate rects.
    pub fn width(&self) -> u32 {
        if self.right > self.left {
            self.right.abs_diff(self.left)
        } else {
            0
        }
    }

    /// The height of the rect, zero for degenerate rects.
    pub fn height(&self) -> u32 {
        if self.bottom > self.top {
            self.bottom.abs_diff(self.top)
        } else {
            0
        }
    }

    /// `[width, height]`
    pub fn size(&self) -> [u32; 2] {
        [self.width(), self.height()]
    }

    /// Returns the rect moved by `dx` and `dy`, edges saturate at the `i32` bounds.
    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            left: self.left.saturating_add(dx),
            top: self.top.saturating_add(dy),
            right: self.right.saturating_add(dx),
            bottom: self.bottom.saturating_add(dy),
        }
    }

    /// Returns whether `other` lies entirely within this rect.
    pub fn contains_rect(&self, other: &Self) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right <= self.right
            && other.bottom <= self.bottom
    }

    /// The smallest rect containing every rect in `rects`, `None` when `rects` is empty.
    pub fn bounding(rects: &[Self]) -> Option<Self> {
        let (first, rest) = rects.split_first()?;

        Some(rest.iter().fold(*first, |bounds, rect| Self {
            left: bounds.left.min(rect.left),
            top: bounds.top.min(rect.top),
            right: bounds.right.max(rect.right),
            bottom: bounds.bottom.max(rect.bottom),
        }))
    }

    /// Builds a rect from an ordered `(left, top, right, bottom)` sequence.
    ///
    /// Any other length or a member outside of the `i32` range is rejected.
    pub fn from_edges(edges: &[i64]) -> Result<Self, InvalidRect> {
        let &[left, top, right, bottom] = edges else {
            return Err(InvalidRect::Arity(edges.len()));
        };

        let coordinate = |value: i64| i32::try_from(value).map_err(|_| InvalidRect::OutOfRange(value));

        Self::new(
            coordinate(left)?,
            coordinate(top)?,
            coordinate(right)?,
            coordinate(bottom)?,
        )
    }
}

impl TryFrom<&[i64]> for Rect {
    type Error = InvalidRect;

    fn try_from(value: &[i64]) -> Result<Self, Self::Error> {
        Self::from_edges(value)
    }
}

impl From<Rect> for [i32; 4] {
    fn from(value: Rect) -> Self {
        [value.left, value.top, value.right, value.bottom]
    }
}

impl FromStr for Rect {
    type Err = InvalidRect;

    /// Parses `left,top,right,bottom`, whitespace around members is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let edges = s
            .split(',')
            .map(|member| {
                let member = member.trim();
                member
                    .parse::<i64>()
                    .map_err(|_| InvalidRect::NotAnInteger(member.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_edges(&edges)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}) {}x{}",
            self.left,
            self.top,
            self.right,
            self.bottom,
            self.width(),
            self.height()
        )
    }
}

/// Translates `rects` so the smallest left and smallest top across all of them become zero.
///
/// The result is relative to the top-left corner of the bounding box of `rects`, which is the
/// origin of a capture of the whole virtual screen.
pub fn normalize_rects(rects: &[Rect]) -> Vec<Rect> {
    let Some(min_left) = rects.iter().map(|rect| rect.left).min() else {
        return Vec::new();
    };
    let min_top = rects.iter().map(|rect| rect.top).min().unwrap_or(0);

    rects
        .iter()
        .map(|rect| rect.translate(min_left.saturating_neg(), min_top.saturating_neg()))
        .collect()
}

/// Reasons a rect is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidRect {
    #[error("Rect {0} has a non-positive width")]
    NonPositiveWidth(Rect),

    #[error("Rect {0} has a non-positive height")]
    NonPositiveHeight(Rect),

    #[error("A rect needs exactly 4 members, got {0}")]
    Arity(usize),

    #[error("Rect member '{0}' is not an integer")]
    NotAnInteger(String),

    #[error("Rect member {0} is out of range")]
    OutOfRange(i64),

    #[error("Rect edges overflow")]
    Overflow,
}
