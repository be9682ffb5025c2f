//! # FreeCell Engine
//!
//! Rules engine for FreeCell-style patience games: a configurable number of free cells
//! and cascades, four foundations, and an optional deck for dealing.
//!
//! A `Board` is an immutable value. Every operation returns a new board together with a
//! canonical text describing what happened (`previous_action`), and history-bearing texts
//! are appended to the board's history. Undo works by parsing and inverting those texts.
//!
//! It is used by two binaries:
//! - `freecell`: Interactive play from the command line.
//! - `replay`: Loads a printed board, validates its history and optionally undoes moves.
//!
//! ## Modules
//! - `card`: Suits, ranks, locations and the shorthand used in texts (`KH`, `5`, `a`, `h`).
//! - `action`: The action text grammar (`move 53 6H→7C`, `deal all cards`, ...).
//! - `engine`: The `Board`, shuffling, dealing, sequences, the cursor and touch handling.
//! - `moves`: Move legality, destination priority, execution and auto-foundation.
//! - `history`: History compaction, undo, restart and replay.
//! - `notation`: Printing a board as text and parsing it back.
//! - `error`: The crate-wide `EngineError`.

pub mod action;
pub mod card;
pub mod engine;
pub mod error;
pub mod history;
pub mod moves;
pub mod notation;

pub use action::{Action, ActionType, PreviousAction};
pub use card::{Card, Location, Rank, Suit};
pub use engine::{Board, BoardConfig, Direction, Sequence};
pub use error::{EngineError, HistoryStage};
pub use moves::{AutoFoundationLimit, AvailableMove};
pub use notation::PrintOptions;
