//! Tetromino catalog: seven shapes, four rotations, 4x4 occupancy masks.

use crate::landed::Rgb;

/// Tetromino kinds (I, O, T, S, Z, J, L).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

/// Landing colours, all green-tinted to sit inside the rain palette.
pub const PIECE_COLORS: [Rgb; 7] = [
    Rgb(0, 255, 100),  // I
    Rgb(0, 200, 80),   // O
    Rgb(50, 255, 130), // T
    Rgb(0, 180, 60),   // S
    Rgb(30, 230, 90),  // Z
    Rgb(0, 160, 70),   // J
    Rgb(80, 255, 140), // L
];

/// `SHAPES[kind][rotation][row]`; bit 3 is mask column 0, bit 0 is column 3.
const SHAPES: [[[u8; 4]; 4]; 7] = [
    // I
    [
        [0b0000, 0b1111, 0b0000, 0b0000],
        [0b0010, 0b0010, 0b0010, 0b0010],
        [0b0000, 0b0000, 0b1111, 0b0000],
        [0b0100, 0b0100, 0b0100, 0b0100],
    ],
    // O
    [
        [0b0110, 0b0110, 0b0000, 0b0000],
        [0b0110, 0b0110, 0b0000, 0b0000],
        [0b0110, 0b0110, 0b0000, 0b0000],
        [0b0110, 0b0110, 0b0000, 0b0000],
    ],
    // T
    [
        [0b0100, 0b1110, 0b0000, 0b0000],
        [0b0100, 0b0110, 0b0100, 0b0000],
        [0b0000, 0b1110, 0b0100, 0b0000],
        [0b0100, 0b1100, 0b0100, 0b0000],
    ],
    // S
    [
        [0b0110, 0b1100, 0b0000, 0b0000],
        [0b0100, 0b0110, 0b0010, 0b0000],
        [0b0000, 0b0110, 0b1100, 0b0000],
        [0b1000, 0b1100, 0b0100, 0b0000],
    ],
    // Z
    [
        [0b1100, 0b0110, 0b0000, 0b0000],
        [0b0010, 0b0110, 0b0100, 0b0000],
        [0b0000, 0b1100, 0b0110, 0b0000],
        [0b0100, 0b1100, 0b1000, 0b0000],
    ],
    // J
    [
        [0b1000, 0b1110, 0b0000, 0b0000],
        [0b0110, 0b0100, 0b0100, 0b0000],
        [0b0000, 0b1110, 0b0010, 0b0000],
        [0b0100, 0b0100, 0b1100, 0b0000],
    ],
    // L
    [
        [0b0010, 0b1110, 0b0000, 0b0000],
        [0b0100, 0b0100, 0b0110, 0b0000],
        [0b0000, 0b1110, 0b1000, 0b0000],
        [0b1100, 0b0100, 0b0100, 0b0000],
    ],
];

impl PieceKind {
    pub const ALL: [Self; 7] = [
        Self::I,
        Self::O,
        Self::T,
        Self::S,
        Self::Z,
        Self::J,
        Self::L,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Occupied `(mask_row, mask_col)` cells for a rotation (taken mod 4).
    pub fn cells(self, rotation: u8) -> impl Iterator<Item = (i32, i32)> {
        let mask = SHAPES[self.index()][usize::from(rotation % 4)];
        (0..4i32).flat_map(move |r| {
            let bits = mask[r as usize];
            (0..4i32)
                .filter(move |c| bits & (0b1000 >> c) != 0)
                .map(move |c| (r, c))
        })
    }

    /// First mask row with an occupied cell. Renderers hang the tail above it.
    pub fn top_row(self, rotation: u8) -> i32 {
        self.cells(rotation).map(|(r, _)| r).min().unwrap_or(4)
    }

    pub fn color(self, palette: &[Rgb; 7]) -> Rgb {
        palette[self.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_rotation_has_four_cells() {
        for kind in PieceKind::ALL {
            for rot in 0..4 {
                assert_eq!(kind.cells(rot).count(), 4, "{kind:?} rotation {rot}");
            }
        }
    }

    #[test]
    fn test_o_is_rotation_invariant() {
        let base: Vec<_> = PieceKind::O.cells(0).collect();
        for rot in 1..4 {
            assert_eq!(PieceKind::O.cells(rot).collect::<Vec<_>>(), base);
        }
    }

    #[test]
    fn test_i_horizontal_and_vertical() {
        let flat: Vec<_> = PieceKind::I.cells(0).collect();
        assert_eq!(flat, vec![(1, 0), (1, 1), (1, 2), (1, 3)]);
        let upright: Vec<_> = PieceKind::I.cells(1).collect();
        assert_eq!(upright, vec![(0, 2), (1, 2), (2, 2), (3, 2)]);
    }

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(
            PieceKind::T.cells(5).collect::<Vec<_>>(),
            PieceKind::T.cells(1).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_top_row() {
        assert_eq!(PieceKind::I.top_row(0), 1);
        assert_eq!(PieceKind::T.top_row(2), 1);
        assert_eq!(PieceKind::L.top_row(1), 0);
    }

    #[test]
    fn test_colors_follow_catalog_order() {
        assert_eq!(PieceKind::I.color(&PIECE_COLORS), Rgb(0, 255, 100));
        assert_eq!(PieceKind::L.color(&PIECE_COLORS), Rgb(80, 255, 140));
    }
}
