//! Error type shared by every fallible engine operation.
//!
//! Only construction problems, malformed notation and corrupt history are errors.
//! A move the rules forbid is not an error: it is recorded as an `invalid move`
//! action on the returned board.
use std::fmt;
use thiserror::Error;

/// The point in history validation where a replay disagreed with the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HistoryStage {
    /// The history text itself is not in the expected shape.
    Format,
    /// Re-executing an entry failed or produced a different action text.
    Replay,
    /// The replayed card arrangement differs from the printed board.
    Cards,
    /// The replayed final action text differs.
    PreviousAction,
    /// The replayed move list differs.
    Moves,
    /// An entry could not be inverted against the current cards.
    Undo,
}

impl fmt::Display for HistoryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HistoryStage::Format => "format",
            HistoryStage::Replay => "replay",
            HistoryStage::Cards => "cards",
            HistoryStage::PreviousAction => "previous action",
            HistoryStage::Moves => "moves",
            HistoryStage::Undo => "undo",
        };
        f.write_str(name)
    }
}

/// Errors produced by board construction, notation parsing and history handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid cell count {found}: must be between {min} and {max}")]
    InvalidCellCount { found: usize, min: usize, max: usize },

    #[error("invalid cascade count {found}: must be between {min} and {max}")]
    InvalidCascadeCount { found: usize, min: usize, max: usize },

    #[error("invalid shuffle seed {0}: must be between 1 and 32000")]
    InvalidSeed(u32),

    #[error("cannot shuffle: only {in_deck} of 52 cards are in the deck")]
    ShuffleRequiresFullDeck { in_deck: usize },

    #[error("invalid rank '{0}'")]
    InvalidRank(char),

    #[error("invalid suit '{0}'")]
    InvalidSuit(char),

    #[error("invalid card shorthand \"{0}\"")]
    InvalidShorthand(String),

    #[error("invalid position {0}")]
    InvalidPosition(String),

    #[error("invalid auto-foundation limit \"{0}\"")]
    InvalidLimit(String),

    #[error("expected 52 cards, found {found}")]
    CardCount { found: usize },

    #[error("duplicate card {0}")]
    DuplicateCard(String),

    #[error("malformed board at line {line}: {reason}")]
    MalformedBoard { line: usize, reason: String },

    #[error("invalid history ({stage}): {detail}")]
    InvalidHistory { stage: HistoryStage, detail: String },

    #[error("cannot parse action \"{0}\"")]
    InvalidAction(String),
}

impl EngineError {
    pub(crate) fn history(stage: HistoryStage, detail: impl Into<String>) -> Self {
        EngineError::InvalidHistory {
            stage,
            detail: detail.into(),
        }
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        EngineError::MalformedBoard {
            line,
            reason: reason.into(),
        }
    }
}
