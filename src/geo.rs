use serde::Serialize;

/// Axis-aligned rectangle in PDF user space (origin bottom-left, y up).
///
/// `(x0, y0)` is the lower-left corner, `(x1, y1)` the upper-right. Region
/// math stays in user space end to end so values can be written straight
/// into annotation dictionaries without a coordinate flip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Rect { x0, y0, x1, y1 }
    }

    /// Smallest rectangle containing every point, whatever order the
    /// points arrive in. `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f32, f32)>,
    {
        let mut iter = points.into_iter();
        let (x, y) = iter.next()?;
        let mut rect = Rect::new(x, y, x, y);
        for (px, py) in iter {
            rect.x0 = rect.x0.min(px);
            rect.y0 = rect.y0.min(py);
            rect.x1 = rect.x1.max(px);
            rect.y1 = rect.y1.max(py);
        }
        Some(rect)
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// Bounding union over any number of rectangles; `None` when there are none.
///
/// This is the region reported for a match: one rectangle covering every
/// contributing token box, including any gap between fragments on
/// different lines.
pub fn bounding_region<'a, I>(rects: I) -> Option<Rect>
where
    I: IntoIterator<Item = &'a Rect>,
{
    rects.into_iter().fold(None, |acc, rect| match acc {
        None => Some(*rect),
        Some(joined) => Some(joined.union(rect)),
    })
}
