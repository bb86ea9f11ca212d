//! Encounter area boundaries.
//!
//! Each gate linked with an edge records one scalar for that edge: the x
//! coordinate for N/S, y for E/W, x+y for NW/SE and x-y for NE/SW. A position
//! is inside the area when it lies on the inner side of every recorded edge.

use hashbrown::HashMap;
use sanctum_types::{Boundary, Position};

/// Scalar recorded for a gate at `position` marking `boundary`.
pub fn edge_value(boundary: Boundary, position: Position) -> Option<f32> {
    match boundary {
        Boundary::N | Boundary::S => Some(position.x),
        Boundary::E | Boundary::W => Some(position.y),
        Boundary::Nw | Boundary::Se => Some(position.x + position.y),
        Boundary::Ne | Boundary::Sw => Some(position.x - position.y),
        Boundary::None => None,
    }
}

/// Whether `position` is on the inner side of `value` for `boundary`.
pub fn is_inside(boundary: Boundary, value: f32, position: Position) -> bool {
    let Some(p) = edge_value(boundary, position) else {
        return true;
    };
    match boundary {
        Boundary::N | Boundary::W | Boundary::Nw | Boundary::Ne => p <= value,
        Boundary::S | Boundary::E | Boundary::Se | Boundary::Sw => p >= value,
        Boundary::None => true,
    }
}

pub fn contains(boundaries: &HashMap<Boundary, f32>, position: Position) -> bool {
    boundaries
        .iter()
        .all(|(&boundary, &value)| is_inside(boundary, value, position))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_values_follow_axis() {
        let pos = Position::new(10.0, 4.0);
        assert_eq!(edge_value(Boundary::N, pos), Some(10.0));
        assert_eq!(edge_value(Boundary::W, pos), Some(4.0));
        assert_eq!(edge_value(Boundary::Se, pos), Some(14.0));
        assert_eq!(edge_value(Boundary::Sw, pos), Some(6.0));
        assert_eq!(edge_value(Boundary::None, pos), None);
    }

    #[test]
    fn box_contains_only_interior() {
        let mut boundaries = HashMap::new();
        boundaries.insert(Boundary::N, 100.0);
        boundaries.insert(Boundary::S, 0.0);
        boundaries.insert(Boundary::E, 0.0);
        boundaries.insert(Boundary::W, 50.0);

        assert!(contains(&boundaries, Position::new(50.0, 25.0)));
        assert!(!contains(&boundaries, Position::new(120.0, 25.0)));
        assert!(!contains(&boundaries, Position::new(-1.0, 25.0)));
        assert!(!contains(&boundaries, Position::new(50.0, 60.0)));
    }

    #[test]
    fn no_boundaries_contains_everything() {
        assert!(contains(&HashMap::new(), Position::new(-1e6, 1e6)));
    }
}
