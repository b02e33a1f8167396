//! Search neighbourhoods around a raster cell

use std::ops::RangeInclusive;

/// Defines a neighborhood pattern around a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    /// Circular window of given radius in cells (Euclidean distance)
    Circle(usize),
}

/// One of the four quadrants around a centre cell.
///
/// Every non-zero offset belongs to exactly one quadrant: the boundary rays
/// are assigned counter-clockwise, so `(0, 1)` (east) is `East`, `(-1, 0)`
/// (north) is `North` and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    /// dc > 0, dr <= 0 (east to north-east)
    East = 0,
    /// dr < 0, dc <= 0 (north to north-west)
    North = 1,
    /// dc < 0, dr >= 0 (west to south-west)
    West = 2,
    /// dr > 0, dc >= 0 (south to south-east)
    South = 3,
}

impl Quadrant {
    /// Quadrant of a non-zero `(row, col)` offset; `None` for the centre.
    pub fn of(dr: isize, dc: isize) -> Option<Self> {
        match (dr, dc) {
            (0, 0) => None,
            (r, c) if c > 0 && r <= 0 => Some(Quadrant::East),
            (r, c) if r < 0 && c <= 0 => Some(Quadrant::North),
            (r, c) if c < 0 && r >= 0 => Some(Quadrant::West),
            _ => Some(Quadrant::South),
        }
    }

    /// Index in `0..4`
    pub fn index(self) -> usize {
        self as usize
    }

    /// Row and column offset ranges covering this quadrant's part of the
    /// square window of `radius`.
    pub fn extent(self, radius: usize) -> (RangeInclusive<isize>, RangeInclusive<isize>) {
        let r = radius as isize;
        match self {
            Quadrant::East => (-r..=0, 1..=r),
            Quadrant::North => (-r..=-1, -r..=0),
            Quadrant::West => (0..=r, -r..=-1),
            Quadrant::South => (1..=r, 0..=r),
        }
    }

    pub const ALL: [Quadrant; 4] = [Quadrant::East, Quadrant::North, Quadrant::West, Quadrant::South];
}

/// A relative position in a search window, with its squared distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOffset {
    pub dr: isize,
    pub dc: isize,
    pub dist_sq: usize,
    pub quadrant: Quadrant,
}

impl Neighborhood {
    /// Get the radius of the neighborhood
    pub fn radius(&self) -> usize {
        match self {
            Neighborhood::Circle(r) => *r,
        }
    }

    /// Get the size of the neighborhood (width and height)
    pub fn size(&self) -> usize {
        self.radius() * 2 + 1
    }

    /// Check if a relative position is within this neighborhood
    pub fn contains(&self, dr: isize, dc: isize) -> bool {
        match self {
            Neighborhood::Circle(r) => {
                let r = *r as isize;
                dr * dr + dc * dc <= r * r
            }
        }
    }

    /// Iterate over relative positions in this neighborhood, row-major
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        let r = self.radius() as isize;
        let mut offsets = Vec::with_capacity(self.size() * self.size());

        for dr in -r..=r {
            for dc in -r..=r {
                if self.contains(dr, dc) {
                    offsets.push((dr, dc));
                }
            }
        }

        offsets
    }

    /// Offsets excluding the centre, ordered by increasing distance.
    ///
    /// Ties in distance keep row-major order, so a scan over this list
    /// visits cells in a fixed, reproducible sequence.
    pub fn search_order(&self) -> Vec<SearchOffset> {
        let mut offsets: Vec<SearchOffset> = self
            .offsets()
            .into_iter()
            .filter_map(|(dr, dc)| {
                Quadrant::of(dr, dc).map(|quadrant| SearchOffset {
                    dr,
                    dc,
                    dist_sq: (dr * dr + dc * dc) as usize,
                    quadrant,
                })
            })
            .collect();
        offsets.sort_by_key(|o| o.dist_sq);
        offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighborhood_offsets() {
        // radius 1 circle: centre + 4 cardinal
        assert_eq!(Neighborhood::Circle(1).offsets().len(), 5);
        // radius 2 circle: 13 cells
        assert_eq!(Neighborhood::Circle(2).offsets().len(), 13);
        assert_eq!(Neighborhood::Circle(2).size(), 5);
    }

    #[test]
    fn test_quadrants_partition() {
        let mut counts = [0usize; 4];
        for dr in -3..=3 {
            for dc in -3..=3 {
                if let Some(q) = Quadrant::of(dr, dc) {
                    counts[q.index()] += 1;
                    let (rows, cols) = q.extent(3);
                    assert!(rows.contains(&dr) && cols.contains(&dc), "{:?} at ({}, {})", q, dr, dc);
                }
            }
        }
        // 48 non-centre cells split evenly
        assert_eq!(counts, [12, 12, 12, 12]);
        let area: usize = Quadrant::ALL
            .iter()
            .map(|q| {
                let (rows, cols) = q.extent(3);
                rows.count() * cols.count()
            })
            .sum();
        assert_eq!(area, 48);
        assert_eq!(Quadrant::of(0, 1), Some(Quadrant::East));
        assert_eq!(Quadrant::of(-1, 0), Some(Quadrant::North));
        assert_eq!(Quadrant::of(0, -1), Some(Quadrant::West));
        assert_eq!(Quadrant::of(1, 0), Some(Quadrant::South));
        assert_eq!(Quadrant::of(0, 0), None);
    }

    #[test]
    fn test_search_order_sorted() {
        let order = Neighborhood::Circle(5).search_order();
        assert!(order.windows(2).all(|w| w[0].dist_sq <= w[1].dist_sq));
        assert_eq!(order[0].dist_sq, 1);
        assert!(order.iter().all(|o| o.dist_sq <= 25));
        assert!(!order.iter().any(|o| o.dr == 0 && o.dc == 0));
    }
}
