//! Compass directions and the math that maps movement onto them.
//!
//! Sprite sheets only carry art for a fixed set of facings, so every
//! continuous quantity (a position delta, a rotation angle) has to be
//! bucketed into one of the eight [`Direction`] values before a frame can be
//! picked.
//!
//! Angles follow the host convention where the Y axis grows downward:
//! `0° = down`, `90° = left`, `180° = up`, `270° = right`, with the
//! diagonals on the 45° multiples in between.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the eight compass facings a sheet can be sliced into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Down,
    Left,
    Right,
    Up,
    DownLeft,
    DownRight,
    UpLeft,
    UpRight,
}

impl Direction {
    /// All directions, orthogonals first.
    pub const ALL: [Direction; 8] = [
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::DownLeft,
        Direction::DownRight,
        Direction::UpLeft,
        Direction::UpRight,
    ];

    /// Clockwise facing order used by isometric sheets.
    const CLOCKWISE: [Direction; 8] = [
        Direction::Down,
        Direction::DownRight,
        Direction::Right,
        Direction::UpRight,
        Direction::Up,
        Direction::UpLeft,
        Direction::Left,
        Direction::DownLeft,
    ];

    /// Direction name as used in animation keys (`"downleft"`, `"up"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::DownLeft => "downleft",
            Direction::DownRight => "downright",
            Direction::UpLeft => "upleft",
            Direction::UpRight => "upright",
        }
    }

    /// Unit grid vector for this facing (Y grows downward).
    pub fn unit_vector(self) -> (i32, i32) {
        match self {
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Up => (0, -1),
            Direction::DownLeft => (-1, 1),
            Direction::DownRight => (1, 1),
            Direction::UpLeft => (-1, -1),
            Direction::UpRight => (1, -1),
        }
    }

    pub fn is_diagonal(self) -> bool {
        let (x, y) = self.unit_vector();
        x != 0 && y != 0
    }

    /// Next facing clockwise (down -> downright -> right -> ...).
    pub fn rotate_clockwise(self) -> Direction {
        let idx = Self::CLOCKWISE
            .iter()
            .position(|d| *d == self)
            .unwrap_or(0);
        Self::CLOCKWISE[(idx + 1) % Self::CLOCKWISE.len()]
    }

    /// Rotation angle in degrees for this facing.
    pub fn to_angle(self) -> f32 {
        direction_to_angle(self)
    }

    /// Bucket an arbitrary angle into the nearest facing.
    pub fn from_angle(angle: f32) -> Direction {
        angle_to_direction(angle)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Direction::ALL
            .into_iter()
            .find(|d| d.name() == s)
            .ok_or_else(|| format!("Unknown direction: {}", s))
    }
}

/// Rounds halves toward positive infinity.
fn round_half_up(v: f32) -> f32 {
    (v + 0.5).floor()
}

/// Signum that maps `0.0` and `-0.0` to `0`.
fn sign(v: f32) -> i32 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Map a movement delta onto a compass direction.
///
/// Each axis is divided by the magnitude of the other axis (falling back to
/// its own magnitude, then `1`) and rounded, so the minor axis only counts
/// once it reaches half of the major axis. Exact halves round toward the
/// positive axis. A zero vector carries no directional signal and yields
/// [`Direction::Down`]; use [`vector_to_direction_or`] to keep a prior facing.
pub fn vector_to_direction(dx: f32, dy: f32) -> Direction {
    vector_to_direction_or(dx, dy, Direction::Down)
}

/// Like [`vector_to_direction`], but returns `fallback` when the vector has
/// no directional signal.
pub fn vector_to_direction_or(dx: f32, dy: f32, fallback: Direction) -> Direction {
    if !dx.is_finite() || !dy.is_finite() {
        return fallback;
    }
    let denom_x = nonzero_abs(dy, dx);
    let denom_y = nonzero_abs(dx, dy);
    let nx = sign(round_half_up(dx / denom_x));
    let ny = sign(round_half_up(dy / denom_y));
    Direction::ALL
        .into_iter()
        .find(|d| d.unit_vector() == (nx, ny))
        .unwrap_or(fallback)
}

/// `|first|`, or `|second|` when `first` is zero, or `1` when both are.
fn nonzero_abs(first: f32, second: f32) -> f32 {
    if first != 0.0 {
        first.abs()
    } else if second != 0.0 {
        second.abs()
    } else {
        1.0
    }
}

/// Rotation angle in degrees for a facing.
pub fn direction_to_angle(direction: Direction) -> f32 {
    match direction {
        Direction::Down => 0.0,
        Direction::DownLeft => 45.0,
        Direction::Left => 90.0,
        Direction::UpLeft => 135.0,
        Direction::Up => 180.0,
        Direction::UpRight => 225.0,
        Direction::Right => 270.0,
        Direction::DownRight => 315.0,
    }
}

/// Bucket an angle in degrees into one of eight 45° sectors.
///
/// Sector `n` covers `[n*45 - 22.5, n*45 + 22.5)`, wrapping at 360, so the
/// sectors partition the circle. Non-finite angles map to down.
pub fn angle_to_direction(angle: f32) -> Direction {
    if !angle.is_finite() {
        return Direction::Down;
    }
    let sector = (((angle + 22.5).rem_euclid(360.0)) / 45.0).floor() as usize % 8;
    match sector {
        0 => Direction::Down,
        1 => Direction::DownLeft,
        2 => Direction::Left,
        3 => Direction::UpLeft,
        4 => Direction::Up,
        5 => Direction::UpRight,
        6 => Direction::Right,
        _ => Direction::DownRight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinal_vectors() {
        assert_eq!(vector_to_direction(1.0, 0.0), Direction::Right);
        assert_eq!(vector_to_direction(0.0, 1.0), Direction::Down);
        assert_eq!(vector_to_direction(-1.0, 0.0), Direction::Left);
        assert_eq!(vector_to_direction(0.0, -1.0), Direction::Up);
    }

    #[test]
    fn test_diagonal_vectors() {
        assert_eq!(vector_to_direction(-1.0, -1.0), Direction::UpLeft);
        assert_eq!(vector_to_direction(3.0, 3.0), Direction::DownRight);
        assert_eq!(vector_to_direction(-200.0, 200.0), Direction::DownLeft);
        assert_eq!(vector_to_direction(50.0, -50.0), Direction::UpRight);
    }

    #[test]
    fn test_zero_vector_defaults_down() {
        assert_eq!(vector_to_direction(0.0, 0.0), Direction::Down);
    }

    #[test]
    fn test_zero_vector_keeps_fallback() {
        assert_eq!(
            vector_to_direction_or(0.0, 0.0, Direction::UpLeft),
            Direction::UpLeft
        );
    }

    #[test]
    fn test_dominant_axis_wins() {
        // minor axis below half of the major one is dropped
        assert_eq!(vector_to_direction(10.0, 4.0), Direction::Right);
        assert_eq!(vector_to_direction(-4.0, -10.0), Direction::Up);
        // at or past half it becomes diagonal
        assert_eq!(vector_to_direction(10.0, 6.0), Direction::DownRight);
    }

    #[test]
    fn test_half_ratio_tie_breaks_toward_positive() {
        assert_eq!(vector_to_direction(2.0, 1.0), Direction::DownRight);
        assert_eq!(vector_to_direction(2.0, -1.0), Direction::Right);
    }

    #[test]
    fn test_angle_round_trip() {
        for d in Direction::ALL {
            assert_eq!(angle_to_direction(direction_to_angle(d)), d, "{}", d);
        }
    }

    #[test]
    fn test_angle_sector_boundaries() {
        assert_eq!(angle_to_direction(22.4), Direction::Down);
        assert_eq!(angle_to_direction(22.5), Direction::DownLeft);
        assert_eq!(angle_to_direction(337.5), Direction::Down);
        assert_eq!(angle_to_direction(337.4), Direction::DownRight);
        assert_eq!(angle_to_direction(359.9), Direction::Down);
    }

    #[test]
    fn test_angle_wraps_negative_and_large() {
        assert_eq!(angle_to_direction(-90.0), Direction::Right);
        assert_eq!(angle_to_direction(450.0), Direction::Left);
        assert_eq!(angle_to_direction(-30.0), Direction::DownRight);
        assert_eq!(angle_to_direction(f32::NAN), Direction::Down);
    }

    #[test]
    fn test_every_angle_lands_in_exactly_one_sector() {
        let mut counts = [0usize; 8];
        for tenth in 0..3600 {
            let d = angle_to_direction(tenth as f32 / 10.0);
            let idx = Direction::ALL.iter().position(|x| *x == d).unwrap();
            counts[idx] += 1;
        }
        for c in counts {
            assert_eq!(c, 450);
        }
    }

    #[test]
    fn test_rotate_clockwise_cycles() {
        let mut d = Direction::Down;
        for _ in 0..8 {
            d = d.rotate_clockwise();
        }
        assert_eq!(d, Direction::Down);
        assert_eq!(Direction::Down.rotate_clockwise(), Direction::DownRight);
        assert_eq!(Direction::DownLeft.rotate_clockwise(), Direction::Down);
    }

    #[test]
    fn test_parse_names() {
        for d in Direction::ALL {
            assert_eq!(d.name().parse::<Direction>().unwrap(), d);
        }
        assert!("north".parse::<Direction>().is_err());
    }
}
