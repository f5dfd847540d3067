//! Cube-surface geometry.
//!
//! Encodes the six faces of an N×N cube into a flat integer cell space and
//! provides the `step` operator that walks a `(cell, direction)` pair one
//! unit forward, transporting the direction coherently across face edges.
//! Every other subsystem builds on this module; it has no dependency on
//! [`crate::sim`] or [`crate::room`].

use serde::{Deserialize, Serialize};

/// A cell id. Invariant: always `< 6 * n * n` for the `n` it was encoded with.
pub type CellId = u32;

/// One of the six faces of the cube.
pub type Face = u8;

/// Quarter-turn direction in the current face's basis: `+u, +r, -u, -r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn from_index(v: i64) -> Option<Direction> {
        match v.rem_euclid(4) {
            0 => Some(Direction::North),
            1 => Some(Direction::East),
            2 => Some(Direction::South),
            3 => Some(Direction::West),
            _ => unreachable!(),
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Rotate by `delta` quarter-turns, wrapping mod 4. `delta` is typically
    /// in `{-1, 0, 1}` (the client `turn` command) but any integer works.
    pub fn turn(self, delta: i64) -> Direction {
        Direction::from_index(self.index() as i64 + delta).unwrap()
    }

    /// The direction directly behind this one (used to derive "backward"
    /// placement and to detect illegal 180° reversals).
    pub fn reverse(self) -> Direction {
        self.turn(2)
    }
}

impl Serialize for Direction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.index())
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = u8::deserialize(deserializer)?;
        Direction::from_index(v as i64)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid direction: {v}")))
    }
}

/// Immutable integer triple. Used only by this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vec3 {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Vec3 {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Vec3 { x, y, z }
    }

    pub fn scale(self, k: i64) -> Vec3 {
        Vec3::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn dot(self, other: Vec3) -> i64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

const X: Vec3 = Vec3::new(1, 0, 0);
const Y: Vec3 = Vec3::new(0, 1, 0);
const Z: Vec3 = Vec3::new(0, 0, 1);

/// Outward normal, face-local right, and face-local up for one face.
#[derive(Debug, Clone, Copy)]
pub struct FaceBasis {
    pub n: Vec3,
    pub r: Vec3,
    pub u: Vec3,
}

const FACE_BASIS: [FaceBasis; 6] = [
    FaceBasis { n: X, r: Vec3::new(0, 0, -1), u: Y }, // 0 (+X)
    FaceBasis { n: Vec3::new(-1, 0, 0), r: Z, u: Y }, // 1 (-X)
    FaceBasis { n: Y, r: X, u: Vec3::new(0, 0, -1) }, // 2 (+Y)
    FaceBasis { n: Vec3::new(0, -1, 0), r: X, u: Z }, // 3 (-Y)
    FaceBasis { n: Z, r: X, u: Y },                   // 4 (+Z)
    FaceBasis { n: Vec3::new(0, 0, -1), r: Vec3::new(-1, 0, 0), u: Y }, // 5 (-Z)
];

fn face_basis(face: Face) -> FaceBasis {
    FACE_BASIS[face as usize]
}

fn face_for_normal(n: Vec3) -> Face {
    if n == X {
        0
    } else if n == -X {
        1
    } else if n == Y {
        2
    } else if n == -Y {
        3
    } else if n == Z {
        4
    } else if n == -Z {
        5
    } else {
        unreachable!("not an axis-aligned unit normal: {n:?}")
    }
}

/// Encode `(face, u, v)` into a flat cell id. `encode_cell(..) < 6 * n * n`.
pub fn encode_cell(face: Face, u: u32, v: u32, n: u32) -> CellId {
    face as CellId * (n * n) + v * n + u
}

/// Decode a cell id back into `(face, u, v)`.
pub fn decode_cell(cell: CellId, n: u32) -> (Face, u32, u32) {
    let nn = n * n;
    let face = (cell / nn) as Face;
    let rem = cell % nn;
    let v = rem / n;
    let u = rem % n;
    (face, u, v)
}

fn dir_vec(basis: FaceBasis, dir: Direction) -> Vec3 {
    match dir {
        Direction::North => basis.u,
        Direction::East => basis.r,
        Direction::South => -basis.u,
        Direction::West => -basis.r,
    }
}

fn dir_from_vec(basis: FaceBasis, v: Vec3) -> Direction {
    if v == basis.u {
        Direction::North
    } else if v == basis.r {
        Direction::East
    } else if v == -basis.u {
        Direction::South
    } else if v == -basis.r {
        Direction::West
    } else {
        unreachable!("vector is not a valid face direction: {v:?}")
    }
}

/// Advance `(cell, dir)` by one cell, crossing face boundaries correctly.
/// Total for any valid `(cell, dir)` and `n >= 2`.
pub fn step(cell: CellId, dir: Direction, n: u32) -> (CellId, Direction) {
    let (face, u, v) = decode_cell(cell, n);
    let basis = face_basis(face);

    let n_i = n as i64;
    let x_num = 2 * u as i64 + 1 - n_i;
    let y_num = n_i - (2 * v as i64 + 1);
    let pos = basis.n.scale(n_i) + basis.r.scale(x_num) + basis.u.scale(y_num);

    let mv = dir_vec(basis, dir).scale(2);
    let pos2 = pos + mv;

    let (ax, ay, az) = (pos2.x.abs(), pos2.y.abs(), pos2.z.abs());
    let (max_abs, new_n) = if ax >= ay && ax >= az {
        (ax, if pos2.x >= 0 { X } else { -X })
    } else if ay >= ax && ay >= az {
        (ay, if pos2.y >= 0 { Y } else { -Y })
    } else {
        (az, if pos2.z >= 0 { Z } else { -Z })
    };

    let new_face = face_for_normal(new_n);
    let new_basis = face_basis(new_face);

    let dot_r = pos2.dot(new_basis.r);
    let dot_u = pos2.dot(new_basis.u);

    let mut new_u = ((dot_r + max_abs) * n_i) / (2 * max_abs);
    let mut new_v = ((max_abs - dot_u) * n_i) / (2 * max_abs);
    new_u = new_u.clamp(0, n_i - 1);
    new_v = new_v.clamp(0, n_i - 1);

    let new_cell = encode_cell(new_face, new_u as u32, new_v as u32, n);

    if new_face == face {
        (new_cell, dir)
    } else {
        let transported = -basis.n;
        let new_dir = dir_from_vec(new_basis, transported);
        (new_cell, new_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_cells(n: u32) -> impl Iterator<Item = CellId> {
        0..(6 * n * n)
    }

    #[test]
    fn decode_encode_roundtrip() {
        for n in [2, 3, 8, 17] {
            for cell in all_cells(n) {
                let (face, u, v) = decode_cell(cell, n);
                assert!(face < 6);
                assert!(u < n && v < n);
                assert_eq!(encode_cell(face, u, v, n), cell);
                assert!(cell < 6 * n * n);
            }
        }
    }

    #[test]
    fn step_stays_in_bounds() {
        for n in [2, 3, 8, 17] {
            for cell in all_cells(n) {
                for dir in Direction::ALL {
                    let (c2, _) = step(cell, dir, n);
                    let (face, u, v) = decode_cell(c2, n);
                    assert!(face < 6);
                    assert!(u < n && v < n);
                }
            }
        }
    }

    #[test]
    fn step_is_reversible() {
        for n in [2, 3, 8, 17] {
            for cell in all_cells(n) {
                for dir in Direction::ALL {
                    let (c2, d2) = step(cell, dir, n);
                    let (back, back_dir) = step(c2, d2.reverse(), n);
                    assert_eq!(back, cell, "n={n} cell={cell} dir={dir:?}");
                    assert_eq!(back_dir, dir.reverse());
                }
            }
        }
    }

    #[test]
    fn four_n_steps_around_great_circle_returns_home() {
        // Walking "north" 4N times from any cell returns to the start cell
        // and direction, since a meridian great circle has perimeter 4N.
        for n in [2, 3, 8] {
            for cell in all_cells(n) {
                let mut c = cell;
                let mut d = Direction::North;
                for _ in 0..(4 * n) {
                    let (c2, d2) = step(c, d, n);
                    c = c2;
                    d = d2;
                }
                assert_eq!(c, cell);
                assert_eq!(d, Direction::North);
            }
        }
    }

    #[test]
    fn known_path_on_plus_z_face() {
        // N=8, head at face 4 (+Z), u=3, v=3, walking North steps v down by one
        // each tick while staying on the same face, until it nears the edge.
        let n = 8;
        let mut cell = encode_cell(4, 3, 3, n);
        let mut dir = Direction::North;
        for expected_v in [2u32, 1, 0] {
            let (c2, d2) = step(cell, dir, n);
            let (face, u, v) = decode_cell(c2, n);
            assert_eq!(face, 4);
            assert_eq!(u, 3);
            assert_eq!(v, expected_v);
            cell = c2;
            dir = d2;
        }
    }
}
