//! Mesh addressing.
//!
//! Neighbour relationships are derived by arithmetic on `(x, y)`
//! coordinates rather than a precomputed graph or pointer structure —
//! the natural representation for a regular 2-D mesh, where every
//! router's neighbours are a closed-form function of its own address.

use std::fmt;

/// Physical port index. `0` is the local PE; `1..=4` are the cardinal mesh
/// directions.
pub mod port {
    /// Local processing element.
    pub const PE: usize = 0;
    /// West neighbour (−x).
    pub const WEST: usize = 1;
    /// East neighbour (+x).
    pub const EAST: usize = 2;
    /// South neighbour (−y).
    pub const SOUTH: usize = 3;
    /// North neighbour (+y).
    pub const NORTH: usize = 4;
    /// Number of physical ports per router.
    pub const COUNT: usize = 5;

    /// Maps a port to its mirror on the neighbouring router (W↔E, S↔N).
    pub fn mirror(p: usize) -> usize {
        match p {
            WEST => EAST,
            EAST => WEST,
            SOUTH => NORTH,
            NORTH => SOUTH,
            other => panic!("port {} has no mirror (not a mesh link port)", other),
        }
    }
}

/// A `(x, y)` address in a `K`×`K` mesh, `0 <= x,y < K`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Addr {
    pub x: u16,
    pub y: u16,
}

impl Addr {
    pub fn new(x: u16, y: u16) -> Addr {
        Addr { x, y }
    }

    /// Router id = `x*K + y`.
    pub fn id(self, k: u16) -> usize {
        self.x as usize * k as usize + self.y as usize
    }

    /// Inverse of [`Addr::id`].
    pub fn from_id(id: usize, k: u16) -> Addr {
        let k = k as usize;
        Addr {
            x: (id / k) as u16,
            y: (id % k) as u16,
        }
    }

    /// Manhattan distance to `other`, used by the one-hop latency bound
    /// (testable property 3).
    pub fn manhattan(self, other: Addr) -> u32 {
        (self.x as i32 - other.x as i32).unsigned_abs() + (self.y as i32 - other.y as i32).unsigned_abs()
    }

    /// The address reached by stepping out of physical `p` (one of the
    /// four cardinal [`port`] constants). `wrap` selects torus
    /// (modulo-`k`) vs. plain mesh addressing; callers must only ask for
    /// a mesh step that stays in range when `wrap` is false.
    pub fn neighbor(self, p: usize, k: u16, wrap: bool) -> Addr {
        let step = |v: u16, delta: i32| -> u16 {
            if wrap {
                (((v as i32 + delta) % k as i32 + k as i32) % k as i32) as u16
            } else {
                (v as i32 + delta) as u16
            }
        };
        match p {
            port::WEST => Addr::new(step(self.x, -1), self.y),
            port::EAST => Addr::new(step(self.x, 1), self.y),
            port::SOUTH => Addr::new(self.x, step(self.y, -1)),
            port::NORTH => Addr::new(self.x, step(self.y, 1)),
            other => panic!("port {} has no mesh neighbor", other),
        }
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_roundtrips() {
        let k = 8;
        for x in 0..k {
            for y in 0..k {
                let a = Addr::new(x, y);
                let id = a.id(k);
                assert_eq!(Addr::from_id(id, k), a);
            }
        }
    }

    #[test]
    fn manhattan_distance() {
        assert_eq!(Addr::new(0, 0).manhattan(Addr::new(3, 4)), 7);
        assert_eq!(Addr::new(2, 2).manhattan(Addr::new(2, 2)), 0);
    }

    #[test]
    fn neighbor_wraps_on_torus() {
        let corner = Addr::new(0, 0);
        assert_eq!(corner.neighbor(port::WEST, 8, true), Addr::new(7, 0));
        assert_eq!(corner.neighbor(port::EAST, 8, false), Addr::new(1, 0));
    }

    #[test]
    fn mirror_is_involutive() {
        for p in [port::WEST, port::EAST, port::SOUTH, port::NORTH] {
            assert_eq!(port::mirror(port::mirror(p)), p);
        }
    }
}
