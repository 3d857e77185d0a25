//! Core domain types: sides and piece kinds.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use shakmaty::{Color, Role};
use strum::{EnumIter, EnumString};

/// The side a player is on.
///
/// Parses case-insensitively from `"white"`, `"w"`, `"black"` or `"b"`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Side {
    /// White moves first.
    #[display("white")]
    #[strum(serialize = "white", serialize = "w")]
    White,
    /// Black.
    #[display("black")]
    #[strum(serialize = "black", serialize = "b")]
    Black,
}

impl Side {
    /// Returns the other side.
    pub fn opponent(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// Capitalized name for prompts.
    pub fn label(self) -> &'static str {
        match self {
            Side::White => "White",
            Side::Black => "Black",
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

/// Kind of chess piece, independent of side.
///
/// Parses case-insensitively from the full name or the usual letter
/// (`p`, `n`, `b`, `r`, `q`, `k`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum PieceKind {
    /// Pawn.
    #[display("pawn")]
    #[strum(serialize = "pawn", serialize = "p")]
    Pawn,
    /// Knight.
    #[display("knight")]
    #[strum(serialize = "knight", serialize = "n")]
    Knight,
    /// Bishop.
    #[display("bishop")]
    #[strum(serialize = "bishop", serialize = "b")]
    Bishop,
    /// Rook.
    #[display("rook")]
    #[strum(serialize = "rook", serialize = "r")]
    Rook,
    /// Queen.
    #[display("queen")]
    #[strum(serialize = "queen", serialize = "q")]
    Queen,
    /// King.
    #[display("king")]
    #[strum(serialize = "king", serialize = "k")]
    King,
}

impl PieceKind {
    /// Capitalized name for prompts.
    pub fn label(self) -> &'static str {
        match self {
            PieceKind::Pawn => "Pawn",
            PieceKind::Knight => "Knight",
            PieceKind::Bishop => "Bishop",
            PieceKind::Rook => "Rook",
            PieceKind::Queen => "Queen",
            PieceKind::King => "King",
        }
    }

    /// Lowercase letter used in UCI promotion suffixes.
    pub fn letter(self) -> char {
        Role::from(self).char()
    }

    /// Figurine for the given side.
    pub fn glyph(self, side: Side) -> char {
        match (side, self) {
            (Side::White, PieceKind::King) => '♔',
            (Side::White, PieceKind::Queen) => '♕',
            (Side::White, PieceKind::Rook) => '♖',
            (Side::White, PieceKind::Bishop) => '♗',
            (Side::White, PieceKind::Knight) => '♘',
            (Side::White, PieceKind::Pawn) => '♙',
            (Side::Black, PieceKind::King) => '♚',
            (Side::Black, PieceKind::Queen) => '♛',
            (Side::Black, PieceKind::Rook) => '♜',
            (Side::Black, PieceKind::Bishop) => '♝',
            (Side::Black, PieceKind::Knight) => '♞',
            (Side::Black, PieceKind::Pawn) => '♟',
        }
    }
}

impl From<Role> for PieceKind {
    fn from(role: Role) -> Self {
        match role {
            Role::Pawn => PieceKind::Pawn,
            Role::Knight => PieceKind::Knight,
            Role::Bishop => PieceKind::Bishop,
            Role::Rook => PieceKind::Rook,
            Role::Queen => PieceKind::Queen,
            Role::King => PieceKind::King,
        }
    }
}

impl From<PieceKind> for Role {
    fn from(kind: PieceKind) -> Self {
        match kind {
            PieceKind::Pawn => Role::Pawn,
            PieceKind::Knight => Role::Knight,
            PieceKind::Bishop => Role::Bishop,
            PieceKind::Rook => Role::Rook,
            PieceKind::Queen => Role::Queen,
            PieceKind::King => Role::King,
        }
    }
}
