//! Core board model for the FreeCell rules engine.
//!
//! This module defines:
//! - `BoardConfig`: the constructor-time parameters (cell and cascade counts, auto-foundation policy).
//! - `Sequence`: a run of cards rooted at a location, and whether it may move as a unit.
//! - `Board`: an immutable game state. Every command (`shuffle32`, `deal_all`, `move_cursor`,
//!   `touch`, ...) returns a new `Board` and records what happened in `previous_action`
//!   and, for state-changing actions, in `history`.
//!
//! The 52 cards are kept in one vector in fresh-deck order; each carries its own `Location`.
//! The per-fixture views (`deck`, `cells`, `foundations`, `tableau`) are rebuilt from those
//! locations after every change, so no card can be lost or duplicated.
use crate::action::{Action, CursorAction, DealAmount, InitKind, PreviousAction};
use crate::card::{
    face_at, position_shorthand, Card, Location, Rank, Suit, DECK_SIZE, FOUNDATION_COUNT,
};
use crate::error::EngineError;
use crate::moves::{AutoFoundationLimit, AvailableMove, MoveCycle};
use log::{debug, trace};
use rand::Rng;

/// Smallest and largest supported number of free cells.
pub const MIN_CELLS: usize = 1;
pub const MAX_CELLS: usize = 6;

/// Smallest and largest supported number of cascades.
pub const MIN_CASCADES: usize = FOUNDATION_COUNT;
pub const MAX_CASCADES: usize = 10;

/// Shuffle seeds accepted by `Board::shuffle32`.
pub const SEED_RANGE: std::ops::RangeInclusive<u32> = 1..=32000;

/// Constructor-time board parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardConfig {
    /// Number of free cells, 1 to 6.
    pub cell_count: usize,
    /// Number of tableau cascades, 4 to 10.
    pub cascade_count: usize,
    /// Whether moves are followed by automatic foundation promotion.
    pub auto_foundation: bool,
    /// How far ahead automatic promotion may run.
    pub auto_foundation_limit: AutoFoundationLimit,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            cell_count: 4,
            cascade_count: 8,
            auto_foundation: true,
            auto_foundation_limit: AutoFoundationLimit::OppositePlusOne,
        }
    }
}

impl BoardConfig {
    /// Checks the cell and cascade counts.
    ///
    /// # Returns
    /// * `Ok(())` when both counts are in range.
    /// * `Err(EngineError::InvalidCellCount)` or `Err(EngineError::InvalidCascadeCount)` naming
    ///   the offending value and the valid range.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(MIN_CELLS..=MAX_CELLS).contains(&self.cell_count) {
            return Err(EngineError::InvalidCellCount {
                found: self.cell_count,
                min: MIN_CELLS,
                max: MAX_CELLS,
            });
        }
        if !(MIN_CASCADES..=MAX_CASCADES).contains(&self.cascade_count) {
            return Err(EngineError::InvalidCascadeCount {
                found: self.cascade_count,
                min: MIN_CASCADES,
                max: MAX_CASCADES,
            });
        }
        Ok(())
    }
}

/// A run of cards rooted at `location`.
///
/// For a cascade the run continues while each next card is one rank lower and of the
/// opposite colour. `can_move` is `true` only when the run reaches the end of its
/// column (or is an occupied cell); otherwise the sequence is peek-only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sequence {
    pub location: Location,
    pub cards: Vec<Card>,
    pub can_move: bool,
}

impl Sequence {
    /// `true` when the run can be inspected but not moved.
    pub fn peek_only(&self) -> bool {
        !self.can_move
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// The first (highest-ranked) card of the run.
    pub fn head(&self) -> Option<&Card> {
        self.cards.first()
    }
}

/// Cursor step directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl From<Direction> for CursorAction {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => CursorAction::Up,
            Direction::Down => CursorAction::Down,
            Direction::Left => CursorAction::Left,
            Direction::Right => CursorAction::Right,
        }
    }
}

/// An immutable FreeCell game state.
///
/// # Examples
/// ```
/// use freecell_engine::engine::Board;
/// let board = Board::new().shuffle32(5).unwrap().deal_all();
/// assert_eq!(board.deck().len(), 0);
/// assert_eq!(board.tableau()[0].len(), 7);
/// assert_eq!(board.history(), ["init", "shuffle deck (5)", "deal all cards"]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    pub(crate) config: BoardConfig,
    /// All 52 cards in fresh-deck order; `cards[face_index]` is always that face.
    pub(crate) cards: Vec<Card>,
    pub(crate) deck: Vec<Card>,
    pub(crate) cells: Vec<Option<Card>>,
    pub(crate) foundations: Vec<Option<Card>>,
    pub(crate) tableau: Vec<Vec<Card>>,
    pub(crate) cursor: Location,
    pub(crate) selection: Option<Sequence>,
    pub(crate) available_moves: Option<Vec<AvailableMove>>,
    pub(crate) previous_action: PreviousAction,
    pub(crate) history: Vec<String>,
    /// Set while `auto_move` is cycling one selection through its destinations.
    pub(crate) move_cycle: Option<MoveCycle>,
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

impl Board {
    /// Creates a board with the default configuration and every card in the deck, in fresh order.
    pub fn new() -> Self {
        Board::build(BoardConfig::default())
    }

    /// Creates a board with a custom configuration.
    ///
    /// # Returns
    /// * `Err(EngineError::InvalidCellCount)` / `Err(EngineError::InvalidCascadeCount)` when the
    ///   counts are out of range.
    pub fn with_config(config: BoardConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Board::build(config))
    }

    fn build(config: BoardConfig) -> Self {
        let cards = (0..DECK_SIZE)
            .filter_map(|index| {
                face_at(index).map(|(rank, suit)| Card::new(rank, suit, Location::Deck(index)))
            })
            .collect();
        let init = Action::Init(InitKind::Fresh);
        let mut board = Board {
            config,
            cards,
            deck: Vec::new(),
            cells: Vec::new(),
            foundations: Vec::new(),
            tableau: Vec::new(),
            cursor: Location::Cell(0),
            selection: None,
            available_moves: None,
            previous_action: PreviousAction::new(&init),
            history: vec![init.to_string()],
            move_cycle: None,
        };
        board.settle();
        board
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// All 52 cards in fresh-deck order.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Undealt cards, bottom first.
    pub fn deck(&self) -> &[Card] {
        &self.deck
    }

    pub fn cells(&self) -> &[Option<Card>] {
        &self.cells
    }

    /// The top card of each foundation.
    pub fn foundations(&self) -> &[Option<Card>] {
        &self.foundations
    }

    pub fn tableau(&self) -> &[Vec<Card>] {
        &self.tableau
    }

    pub fn cursor(&self) -> Location {
        self.cursor
    }

    pub fn selection(&self) -> Option<&Sequence> {
        self.selection.as_ref()
    }

    /// Prioritised destinations for the current selection; `None` unless the selection can move.
    pub fn available_moves(&self) -> Option<&[AvailableMove]> {
        self.available_moves.as_deref()
    }

    pub fn previous_action(&self) -> &PreviousAction {
        &self.previous_action
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// The card with the given face.
    pub fn card(&self, rank: Rank, suit: Suit) -> &Card {
        &self.cards[crate::card::face_index(rank, suit)]
    }

    /// The card occupying a location, if any. For a foundation this is its top card.
    pub fn card_at(&self, location: Location) -> Option<&Card> {
        match location {
            Location::Deck(index) => self.deck.get(index),
            Location::Cell(index) => self.cells.get(index).and_then(Option::as_ref),
            Location::Foundation(index) => self.foundations.get(index).and_then(Option::as_ref),
            Location::Cascade { column, row } => {
                self.tableau.get(column).and_then(|cards| cards.get(row))
            }
        }
    }

    pub fn empty_cells(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_none()).count()
    }

    pub fn empty_cascades(&self) -> usize {
        self.tableau.iter().filter(|column| column.is_empty()).count()
    }

    /// Rank value (1-13) of the highest card of `suit` on any foundation, or 0.
    pub fn foundation_rank(&self, suit: Suit) -> u8 {
        self.foundations
            .iter()
            .flatten()
            .filter(|card| card.suit == suit)
            .map(|card| card.rank.value())
            .max()
            .unwrap_or(0)
    }

    /// `true` once every foundation tops out with a king.
    pub fn is_won(&self) -> bool {
        self.foundations
            .iter()
            .all(|top| matches!(top, Some(card) if card.rank == Rank::King))
    }

    /// Position character for a location on this board.
    pub(crate) fn position(&self, location: Location) -> char {
        let position =
            position_shorthand(location, self.config.cell_count, self.config.cascade_count);
        debug_assert!(position.is_ok(), "{:?} is off the board", location);
        position.unwrap_or('?')
    }

    /// Rebuilds the fixture views from card locations, renumbering deck indices and
    /// cascade rows so they stay contiguous, and keeps the cursor on a valid slot.
    pub(crate) fn settle(&mut self) {
        let mut deck: Vec<usize> = Vec::new();
        let mut columns: Vec<Vec<usize>> = vec![Vec::new(); self.config.cascade_count];
        let mut cells: Vec<Option<Card>> = vec![None; self.config.cell_count];
        let mut foundations: Vec<Option<Card>> = vec![None; FOUNDATION_COUNT];

        for (i, card) in self.cards.iter().enumerate() {
            match card.location {
                Location::Deck(_) => deck.push(i),
                Location::Cell(index) => {
                    if let Some(slot) = cells.get_mut(index) {
                        *slot = Some(*card);
                    }
                }
                Location::Foundation(index) => {
                    if let Some(slot) = foundations.get_mut(index) {
                        if slot.map_or(true, |top| top.rank < card.rank) {
                            *slot = Some(*card);
                        }
                    }
                }
                Location::Cascade { column, .. } => {
                    if let Some(cards) = columns.get_mut(column) {
                        cards.push(i);
                    }
                }
            }
        }

        deck.sort_by_key(|&i| self.cards[i].location.index());
        for (index, &i) in deck.iter().enumerate() {
            self.cards[i].location = Location::Deck(index);
        }
        for (column, indices) in columns.iter_mut().enumerate() {
            indices.sort_by_key(|&i| match self.cards[i].location {
                Location::Cascade { row, .. } => row,
                _ => 0,
            });
            for (row, &i) in indices.iter().enumerate() {
                self.cards[i].location = Location::Cascade { column, row };
            }
        }

        self.deck = deck.iter().map(|&i| self.cards[i]).collect();
        self.tableau = columns
            .iter()
            .map(|indices| indices.iter().map(|&i| self.cards[i]).collect())
            .collect();
        self.cells = cells;
        self.foundations = foundations;
        self.cursor = self.clamp_location(self.cursor);
    }

    /// Pulls a location back inside the board: cascade rows to the last card of the
    /// column, deck indices to the last deck card.
    pub(crate) fn clamp_location(&self, location: Location) -> Location {
        let last_column = self.config.cascade_count - 1;
        match location {
            Location::Cell(index) => Location::Cell(index.min(self.config.cell_count - 1)),
            Location::Foundation(index) => Location::Foundation(index.min(FOUNDATION_COUNT - 1)),
            Location::Cascade { column, row } => {
                let column = column.min(last_column);
                let len = self.tableau.get(column).map_or(0, Vec::len);
                Location::Cascade {
                    column,
                    row: row.min(len.saturating_sub(1)),
                }
            }
            Location::Deck(index) => {
                if self.deck.is_empty() {
                    let column = index.min(last_column);
                    let len = self.tableau.get(column).map_or(0, Vec::len);
                    Location::Cascade {
                        column,
                        row: len.saturating_sub(1),
                    }
                } else {
                    Location::Deck(index.min(self.deck.len() - 1))
                }
            }
        }
    }

    /// A copy of this board with new card locations, settled and with no selection.
    pub(crate) fn with_cards(&self, cards: Vec<Card>) -> Board {
        let mut next = self.clone();
        next.cards = cards;
        next.selection = None;
        next.available_moves = None;
        next.move_cycle = None;
        next.settle();
        next
    }

    /// Stores `action` as the previous action, appending it to history when it bears history.
    pub(crate) fn record(mut self, action: Action, tween_cards: Vec<Card>) -> Board {
        let previous = PreviousAction::new(&action).with_tween_cards(tween_cards);
        if previous.action_type.is_history_bearing() {
            self.push_history(&action);
        }
        self.previous_action = previous;
        self.move_cycle = None;
        self
    }

    // ---------------------------------------------------------------------------------------
    // Shuffle and deal
    // ---------------------------------------------------------------------------------------

    /// Shuffles the full deck with the classic 32000-deal generator.
    ///
    /// # Arguments
    /// * `seed`: the deal number, 1 to 32000.
    ///
    /// # Returns
    /// * `Err(EngineError::InvalidSeed)` for a seed outside the range.
    /// * `Err(EngineError::ShuffleRequiresFullDeck)` when some cards have left the deck.
    ///
    /// # Examples
    /// ```
    /// use freecell_engine::engine::Board;
    /// let board = Board::new().shuffle32(1).unwrap().deal_all();
    /// let first_row: Vec<String> = board.tableau().iter().map(|c| c[0].shorthand()).collect();
    /// assert_eq!(first_row, ["JD", "2D", "9H", "JC", "5D", "7H", "7C", "5H"]);
    /// ```
    pub fn shuffle32(&self, seed: u32) -> Result<Board, EngineError> {
        if !SEED_RANGE.contains(&seed) {
            return Err(EngineError::InvalidSeed(seed));
        }
        if self.deck.len() != DECK_SIZE {
            return Err(EngineError::ShuffleRequiresFullDeck {
                in_deck: self.deck.len(),
            });
        }
        let order = shuffle_order(&self.deck, seed, false);
        let next = self.with_deck_order(&order);
        debug!("shuffled deck with seed {}", seed);
        Ok(next.record(Action::Shuffle { seed }, Vec::new()))
    }

    /// A copy of this board whose deck holds `order`, bottom first.
    pub(crate) fn with_deck_order(&self, order: &[Card]) -> Board {
        let mut cards = self.cards.clone();
        for (index, card) in order.iter().enumerate() {
            cards[card.face_index()].location = Location::Deck(index);
        }
        self.with_cards(cards)
    }

    /// Deals every deck card onto the tableau, row by row.
    pub fn deal_all(&self) -> Board {
        let count = self.deck.len();
        let amount = if self.is_undealt() {
            DealAmount::All
        } else {
            DealAmount::Count(count)
        };
        self.deal_cards(count, false, amount)
    }

    /// Deals the complete tableau rows, then the leftover cards into the free cells.
    ///
    /// Once cards are out on the board only the complete rows are dealt.
    pub fn deal_most(&self) -> Board {
        let count = self.deck.len() - self.deck.len() % self.config.cascade_count;
        if self.is_undealt() {
            self.deal_cards(count, true, DealAmount::Most)
        } else {
            self.deal(count)
        }
    }

    fn is_undealt(&self) -> bool {
        self.tableau.iter().all(Vec::is_empty) && self.cells.iter().all(Option::is_none)
    }

    /// Deals the next `count` cards, continuing the row-by-row layout.
    pub fn deal(&self, count: usize) -> Board {
        let count = count.min(self.deck.len());
        self.deal_cards(count, false, DealAmount::Count(count))
    }

    fn deal_cards(&self, to_tableau: usize, fill_cells: bool, amount: DealAmount) -> Board {
        if self.deck.is_empty() || (to_tableau == 0 && !fill_cells) {
            return self.clone();
        }
        let cascade_count = self.config.cascade_count;
        let mut cards = self.cards.clone();
        let mut deck = self.deck.clone();
        let mut lengths: Vec<usize> = self.tableau.iter().map(Vec::len).collect();
        let start: usize = lengths.iter().sum();
        let mut dealt = Vec::new();

        for k in start..start + to_tableau {
            let Some(card) = deck.pop() else { break };
            let column = k % cascade_count;
            cards[card.face_index()].location = Location::Cascade {
                column,
                row: lengths[column],
            };
            lengths[column] += 1;
            dealt.push(card.face_index());
        }
        if fill_cells {
            for (index, slot) in self.cells.iter().enumerate() {
                if slot.is_some() {
                    continue;
                }
                let Some(card) = deck.pop() else { break };
                cards[card.face_index()].location = Location::Cell(index);
                dealt.push(card.face_index());
            }
        }

        let next = self.with_cards(cards);
        let tween = dealt.iter().map(|&i| next.cards[i]).collect();
        debug!("dealt {} cards", dealt.len());
        next.record(Action::Deal(amount), tween)
    }

    // ---------------------------------------------------------------------------------------
    // Sequence resolution
    // ---------------------------------------------------------------------------------------

    /// The run of cards rooted at `location`.
    ///
    /// Cells give their occupant (movable); foundations and the deck give their card as
    /// peek-only. A cascade walks forward from `row` while each next card stacks on the
    /// previous one; the run is movable only when that walk reaches the end of the column.
    pub fn sequence_at(&self, location: Location) -> Sequence {
        let single = |card: Option<&Card>, can_move: bool| {
            let cards: Vec<Card> = card.copied().into_iter().collect();
            let can_move = can_move && !cards.is_empty();
            Sequence {
                location,
                cards,
                can_move,
            }
        };
        match location {
            Location::Deck(_) | Location::Foundation(_) => single(self.card_at(location), false),
            Location::Cell(_) => single(self.card_at(location), true),
            Location::Cascade { column, row } => {
                let column_cards = self.tableau.get(column).map_or(&[][..], Vec::as_slice);
                let mut cards: Vec<Card> = Vec::new();
                if let Some(first) = column_cards.get(row) {
                    cards.push(*first);
                    for card in &column_cards[row + 1..] {
                        let last = cards[cards.len() - 1];
                        if !card.can_stack_on(&last) {
                            break;
                        }
                        cards.push(*card);
                    }
                }
                let can_move = !cards.is_empty() && row + cards.len() == column_cards.len();
                Sequence {
                    location,
                    cards,
                    can_move,
                }
            }
        }
    }

    /// Root of the longest movable run at the bottom of a column (row 0 for an empty column).
    pub fn run_root(&self, column: usize) -> Location {
        let cards = self.tableau.get(column).map_or(&[][..], Vec::as_slice);
        let mut row = cards.len().saturating_sub(1);
        while row > 0 && cards[row].can_stack_on(&cards[row - 1]) {
            row -= 1;
        }
        Location::Cascade { column, row }
    }

    // ---------------------------------------------------------------------------------------
    // Cursor
    // ---------------------------------------------------------------------------------------

    /// Places the cursor on a location (clamped onto the board).
    pub fn set_cursor(&self, location: Location) -> Board {
        let mut next = self.clone();
        next.cursor = self.clamp_location(location);
        let action = Action::Cursor {
            action: CursorAction::Set,
            wrapped: false,
            position: Some(self.position(next.cursor)),
            card: self.card_at(next.cursor).map(Card::face),
        };
        next.record(action, Vec::new())
    }

    /// Steps the cursor one slot, wrapping between fixtures.
    ///
    /// Produces `cursor <dir>[ w] <position>[ <card>]`, where `w` marks a step that crossed
    /// into another fixture or wrapped around an edge, or `cursor stop` when no step exists.
    pub fn move_cursor(&self, direction: Direction) -> Board {
        let mut next = self.clone();
        let action = match self.step_cursor(direction) {
            Some((location, wrapped)) => {
                next.cursor = location;
                Action::Cursor {
                    action: direction.into(),
                    wrapped,
                    position: Some(self.position(location)),
                    card: self.card_at(location).map(Card::face),
                }
            }
            None => Action::Cursor {
                action: CursorAction::Stop,
                wrapped: false,
                position: None,
                card: None,
            },
        };
        trace!("cursor {:?} -> {:?}", direction, next.cursor);
        next.record(action, Vec::new())
    }

    fn home_location(&self, slot: usize) -> Location {
        if slot < self.config.cell_count {
            Location::Cell(slot)
        } else {
            Location::Foundation(slot - self.config.cell_count)
        }
    }

    fn step_cursor(&self, direction: Direction) -> Option<(Location, bool)> {
        let cells = self.config.cell_count;
        let home_width = cells + FOUNDATION_COUNT;
        let columns = self.config.cascade_count;
        let column_len = |column: usize| self.tableau[column].len();
        let in_column = |column: usize, row: usize| Location::Cascade {
            column,
            row: row.min(column_len(column).saturating_sub(1)),
        };

        match self.cursor {
            Location::Cell(_) | Location::Foundation(_) => {
                let slot = match self.cursor {
                    Location::Foundation(index) => cells + index,
                    other => other.index(),
                };
                match direction {
                    Direction::Left if slot == 0 => {
                        Some((self.home_location(home_width - 1), true))
                    }
                    Direction::Left => Some((self.home_location(slot - 1), slot == cells)),
                    Direction::Right if slot == home_width - 1 => {
                        Some((self.home_location(0), true))
                    }
                    Direction::Right => Some((self.home_location(slot + 1), slot + 1 == cells)),
                    Direction::Up => None,
                    Direction::Down => Some((in_column(slot.min(columns - 1), 0), true)),
                }
            }
            Location::Cascade { column, row } => match direction {
                Direction::Left if column == 0 => Some((in_column(columns - 1, row), true)),
                Direction::Left => Some((in_column(column - 1, row), false)),
                Direction::Right if column == columns - 1 => Some((in_column(0, row), true)),
                Direction::Right => Some((in_column(column + 1, row), false)),
                Direction::Up if row == 0 => {
                    Some((self.home_location(column.min(home_width - 1)), true))
                }
                Direction::Up => Some((in_column(column, row - 1), false)),
                Direction::Down if row + 1 < column_len(column) => {
                    Some((in_column(column, row + 1), false))
                }
                Direction::Down if !self.deck.is_empty() => {
                    Some((Location::Deck(column.min(self.deck.len() - 1)), true))
                }
                Direction::Down => None,
            },
            Location::Deck(index) => {
                let last = self.deck.len().saturating_sub(1);
                match direction {
                    Direction::Left if index == 0 => Some((Location::Deck(last), true)),
                    Direction::Left => Some((Location::Deck(index - 1), false)),
                    Direction::Right if index >= last => Some((Location::Deck(0), true)),
                    Direction::Right => Some((Location::Deck(index + 1), false)),
                    Direction::Up => {
                        let column = index.min(columns - 1);
                        Some((in_column(column, column_len(column).saturating_sub(1)), true))
                    }
                    Direction::Down => None,
                }
            }
        }
    }

    // ---------------------------------------------------------------------------------------
    // Touch protocol
    // ---------------------------------------------------------------------------------------

    /// The single interaction primitive.
    ///
    /// * No selection: a non-empty location is selected (`select …`); an empty one gives `touch stop`.
    /// * Touching the selected location deselects it (`deselect …`).
    /// * Touching another row of the selected column re-roots the selection there.
    /// * Otherwise a movable selection attempts a move onto the touched location, recorded as
    ///   `move …` or, when the rules forbid it, `invalid move …` with the board unchanged.
    pub fn touch(&self, location: Location) -> Board {
        let location = self.clamp_location(location);
        let Some(selection) = &self.selection else {
            return self.select_at(location);
        };
        if selection.location == location {
            return self.deselect();
        }
        if let (
            Location::Cascade { column: selected, .. },
            Location::Cascade { column, row },
        ) = (selection.location, location)
        {
            if selected == column && row < self.tableau[column].len() {
                return self.select_at(location);
            }
        }
        if selection.peek_only() {
            return self.select_at(location);
        }
        match self.legal_destination(selection, location) {
            Some(destination) => self.execute_move(selection, destination),
            None => self.reject_move(selection, location),
        }
    }

    /// Touches the location named by a position character.
    ///
    /// A cascade digit names the root of the column's longest movable run when used as a
    /// source and the column itself when used as a destination; `h` names the foundation
    /// that accepts the selection, if any.
    pub fn touch_by_position(&self, position: char) -> Result<Board, EngineError> {
        let parsed = crate::card::parse_position(
            position,
            self.config.cell_count,
            self.config.cascade_count,
        )?;
        let movable = self.selection.as_ref().filter(|s| s.can_move);
        let location = match parsed {
            Location::Foundation(_) => match (&self.selection, movable) {
                (Some(selection), _) if selection.location.fixture() == parsed.fixture() => {
                    selection.location
                }
                (_, Some(selection)) => self
                    .find_available_moves(selection)
                    .into_iter()
                    .map(|m| m.location)
                    .find(|l| matches!(l, Location::Foundation(_)))
                    .unwrap_or(Location::Foundation(0)),
                _ => (0..FOUNDATION_COUNT)
                    .map(Location::Foundation)
                    .find(|&l| self.card_at(l).is_some())
                    .unwrap_or(Location::Foundation(0)),
            },
            Location::Cascade { column, .. } => match &self.selection {
                Some(selection)
                    if !matches!(
                        selection.location,
                        Location::Cascade { column: c, .. } if c == column
                    ) =>
                {
                    Location::Cascade { column, row: 0 }
                }
                _ => self.run_root(column),
            },
            Location::Deck(_) => Location::Deck(self.deck.len().saturating_sub(1)),
            other => other,
        };
        Ok(self.touch(location))
    }

    /// Moves the current selection (or the sequence under the cursor) to its
    /// highest-priority destination.
    ///
    /// Repeating it walks the cards through every destination that was available where they
    /// started, in priority order, and then back to the start when that is legal.
    pub fn auto_move(&self) -> Board {
        let cycle = self.move_cycle.clone();
        let board = if self.selection.is_some() {
            self.clone()
        } else {
            self.select_at(self.cursor)
        };
        let Some(selection) = board.selection.clone() else {
            return board;
        };
        if let Some(next) = cycle.and_then(|cycle| board.continue_cycle(&selection, &cycle)) {
            return next;
        }
        match board.available_moves.clone().filter(|moves| !moves.is_empty()) {
            Some(moves) => {
                let remaining = moves[1..].iter().map(|m| m.location).collect();
                board.cycle_move(&selection, moves[0].location, selection.location, remaining)
            }
            None => {
                let body = format!(
                    "move {} {}",
                    board.position(selection.location),
                    crate::card::sequence_shorthand(&selection.cards)
                );
                board.record(Action::Invalid(body), Vec::new())
            }
        }
    }

    /// Drops any selection without recording an action.
    pub fn clear_selection(&self) -> Board {
        let mut next = self.clone();
        next.selection = None;
        next.available_moves = None;
        next
    }

    fn select_at(&self, location: Location) -> Board {
        let sequence = self.sequence_at(location);
        let mut next = self.clone();
        next.cursor = location;
        if sequence.is_empty() {
            next.selection = None;
            next.available_moves = None;
            return next.record(Action::TouchStop, Vec::new());
        }
        let action = Action::Select {
            position: Some(self.position(location)),
            cards: Action::faces(&sequence.cards),
        };
        next.set_selection(sequence);
        next.record(action, Vec::new())
    }

    /// Installs a selection and derives its available moves.
    pub(crate) fn set_selection(&mut self, sequence: Sequence) {
        self.available_moves = if sequence.can_move {
            let candidates = self.find_available_moves(&sequence);
            Some(self.prioritize_available_moves(&sequence, candidates))
        } else {
            None
        };
        self.selection = Some(sequence);
    }

    fn deselect(&self) -> Board {
        let Some(selection) = &self.selection else {
            return self.clone();
        };
        let action = Action::Deselect {
            position: Some(self.position(selection.location)),
            cards: Action::faces(&selection.cards),
        };
        let mut next = self.clear_selection();
        next.cursor = selection.location;
        next.record(action, Vec::new())
    }

    fn reject_move(&self, selection: &Sequence, location: Location) -> Board {
        let body = format!(
            "move {}{} {}→{}",
            self.position(selection.location),
            self.position(location),
            crate::card::sequence_shorthand(&selection.cards),
            self.move_target(location)
        );
        debug!("rejected {}", body);
        self.clone().record(Action::Invalid(body), Vec::new())
    }
}

/// Picks a shuffle seed uniformly from the supported range.
pub fn random_seed(rng: &mut impl Rng) -> u32 {
    rng.gen_range(SEED_RANGE)
}

/// The swaps performed by the 32000-deal generator, in order.
fn deal_swaps(seed: u32) -> Vec<(usize, usize)> {
    let mut state = seed;
    (0..DECK_SIZE - 1)
        .map(|i| {
            state = state.wrapping_mul(214013).wrapping_add(2531011) & 0x7fff_ffff;
            let r = (state >> 16) as usize;
            (i, DECK_SIZE - 1 - r % (DECK_SIZE - i))
        })
        .collect()
}

/// Applies (or, with `inverse`, undoes) the seeded permutation to a deck, bottom first.
///
/// The generator works on the deal order, which is the deck read from the top.
pub(crate) fn shuffle_order(deck: &[Card], seed: u32, inverse: bool) -> Vec<Card> {
    let mut order: Vec<Card> = deck.iter().rev().copied().collect();
    let swaps = deal_swaps(seed);
    if inverse {
        for &(i, j) in swaps.iter().rev() {
            order.swap(i, j);
        }
    } else {
        for &(i, j) in &swaps {
            order.swap(i, j);
        }
    }
    order.reverse();
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionType;

    fn row(board: &Board, row: usize) -> Vec<String> {
        board
            .tableau()
            .iter()
            .filter_map(|column| column.get(row))
            .map(Card::shorthand)
            .collect()
    }

    #[test]
    fn test_new_board_has_fresh_deck() {
        let board = Board::new();
        assert_eq!(board.deck().len(), 52);
        assert_eq!(board.deck()[0].shorthand(), "AC");
        assert_eq!(board.deck()[3].shorthand(), "AS");
        assert_eq!(board.deck()[51].shorthand(), "KS");
        assert_eq!(board.cells().len(), 4);
        assert_eq!(board.tableau().len(), 8);
        assert_eq!(board.history(), ["init"]);
        assert_eq!(board.previous_action().action_type, ActionType::Init);
    }

    #[test]
    fn test_config_validation() {
        let config = BoardConfig {
            cell_count: 7,
            ..BoardConfig::default()
        };
        let err = Board::with_config(config).unwrap_err();
        assert_eq!(err.to_string(), "invalid cell count 7: must be between 1 and 6");
        let config = BoardConfig {
            cascade_count: 3,
            ..BoardConfig::default()
        };
        let err = Board::with_config(config).unwrap_err();
        assert_eq!(err.to_string(), "invalid cascade count 3: must be between 4 and 10");
        let config = BoardConfig {
            cell_count: 1,
            cascade_count: 10,
            ..BoardConfig::default()
        };
        assert!(Board::with_config(config).is_ok());
    }

    #[test]
    fn test_unshuffled_deal_all_is_reproducible() {
        let board = Board::new().deal_all();
        assert_eq!(row(&board, 0), ["KS", "KH", "KD", "KC", "QS", "QH", "QD", "QC"]);
        // the last eight cards dealt, in deal order
        let mut tail = row(&board, 5)[4..].to_vec();
        tail.extend(row(&board, 6));
        assert_eq!(tail, ["2S", "2H", "2D", "2C", "AS", "AH", "AD", "AC"]);
        assert_eq!(board.previous_action().text, "deal all cards");
        assert_eq!(board.previous_action().tween_cards.len(), 52);
    }

    #[test]
    fn test_shuffle_golden_deals() {
        let game1 = Board::new().shuffle32(1).unwrap().deal_all();
        assert_eq!(row(&game1, 0), ["JD", "2D", "9H", "JC", "5D", "7H", "7C", "5H"]);
        assert_eq!(row(&game1, 6), ["6S", "9C", "2H", "6H"]);

        let game5 = Board::new().shuffle32(5).unwrap().deal_all();
        assert_eq!(row(&game5, 0), ["AH", "8S", "2D", "QS", "4C", "9H", "2S", "3D"]);
        assert_eq!(row(&game5, 6), ["9S", "AD", "7C", "TS"]);

        let game617 = Board::new().shuffle32(617).unwrap().deal_all();
        assert_eq!(row(&game617, 0), ["7D", "AD", "5C", "3S", "5S", "8C", "2D", "AH"]);
        assert_eq!(row(&game617, 6), ["JD", "KS", "KC", "4H"]);
    }

    #[test]
    fn test_shuffle_errors() {
        assert_eq!(Board::new().shuffle32(0), Err(EngineError::InvalidSeed(0)));
        assert_eq!(Board::new().shuffle32(32001), Err(EngineError::InvalidSeed(32001)));
        let dealt = Board::new().deal(3);
        assert_eq!(
            dealt.shuffle32(4),
            Err(EngineError::ShuffleRequiresFullDeck { in_deck: 49 })
        );
    }

    #[test]
    fn test_shuffle_order_inverse() {
        let board = Board::new();
        let shuffled = shuffle_order(board.deck(), 11982, false);
        let restored = shuffle_order(&shuffled, 11982, true);
        assert_eq!(restored, board.deck());
    }

    #[test]
    fn test_deal_most_fills_cells_with_remainder() {
        let board = Board::new().deal_most();
        assert_eq!(board.tableau().iter().map(Vec::len).sum::<usize>(), 48);
        let cells: Vec<String> = board.cells().iter().flatten().map(Card::shorthand).collect();
        assert_eq!(cells, ["AS", "AH", "AD", "AC"]);
        assert_eq!(board.previous_action().text, "deal most cards");
    }

    #[test]
    fn test_partial_deals_continue_layout() {
        let board = Board::new().deal(10);
        assert_eq!(board.previous_action().text, "deal 10 cards");
        assert_eq!(board.tableau()[0].len(), 2);
        assert_eq!(board.tableau()[2].len(), 1);
        let board = board.deal(1);
        assert_eq!(board.previous_action().text, "deal 1 card");
        assert_eq!(board.tableau()[2].len(), 2);
        let board = board.deal_all();
        assert_eq!(board.previous_action().text, "deal 41 cards");
        assert_eq!(row(&board, 0), ["KS", "KH", "KD", "KC", "QS", "QH", "QD", "QC"]);
        assert!(board.deck().is_empty());
    }

    #[test]
    fn test_sequence_at_cascade() {
        // game 5, column 3 ends with ... JD 8C TH 7C: only the tail is movable
        let board = Board::new().shuffle32(5).unwrap().deal_all();
        let tail = board.sequence_at(Location::Cascade { column: 2, row: 6 });
        assert_eq!(tail.cards.len(), 1);
        assert!(tail.can_move);
        let inner = board.sequence_at(Location::Cascade { column: 2, row: 5 });
        assert_eq!(inner.cards.len(), 1);
        assert!(inner.peek_only());
        let beyond = board.sequence_at(Location::Cascade { column: 2, row: 9 });
        assert!(beyond.is_empty());
        assert!(!beyond.can_move);
    }

    #[test]
    fn test_sequence_at_other_fixtures() {
        let board = Board::new();
        let deck = board.sequence_at(Location::Deck(51));
        assert_eq!(deck.cards[0].shorthand(), "KS");
        assert!(deck.peek_only());
        let cell = board.sequence_at(Location::Cell(0));
        assert!(cell.is_empty());
        assert!(!cell.can_move);
        let board = Board::new().deal_most();
        let cell = board.sequence_at(Location::Cell(0));
        assert!(cell.can_move);
    }

    #[test]
    fn test_cursor_wraps_between_fixtures() {
        let board = Board::new().shuffle32(5).unwrap().deal_all();
        let board = board.move_cursor(Direction::Left);
        assert_eq!(board.cursor(), Location::Foundation(3));
        assert_eq!(board.previous_action().text, "cursor left w h");
        let board = board.move_cursor(Direction::Left).move_cursor(Direction::Left);
        let board = board.move_cursor(Direction::Left).move_cursor(Direction::Left);
        assert_eq!(board.cursor(), Location::Cell(3));
        assert_eq!(board.previous_action().text, "cursor left w d");
        let board = board.move_cursor(Direction::Up);
        assert_eq!(board.previous_action().text, "cursor stop");
        let board = board.move_cursor(Direction::Down);
        assert_eq!(board.cursor(), Location::Cascade { column: 3, row: 0 });
        assert_eq!(board.previous_action().text, "cursor down w 4 QS");
        let board = board.move_cursor(Direction::Up);
        assert_eq!(board.cursor(), Location::Cell(3));
    }

    #[test]
    fn test_cursor_in_tableau() {
        let board = Board::new().shuffle32(5).unwrap().deal_all();
        let board = board.set_cursor(Location::Cascade { column: 7, row: 5 });
        assert_eq!(board.previous_action().text, "cursor set 8 JS");
        let board = board.move_cursor(Direction::Down);
        assert_eq!(board.previous_action().text, "cursor stop");
        let board = board.move_cursor(Direction::Right);
        assert_eq!(board.cursor(), Location::Cascade { column: 0, row: 5 });
        assert_eq!(board.previous_action().text, "cursor right w 1 2H");
        let board = board.move_cursor(Direction::Down);
        assert_eq!(board.cursor(), Location::Cascade { column: 0, row: 6 });
        let board = board.move_cursor(Direction::Left);
        // column 8 only has six cards
        assert_eq!(board.cursor(), Location::Cascade { column: 7, row: 5 });
    }

    #[test]
    fn test_cursor_reaches_deck() {
        let board = Board::new().deal(8);
        let board = board.set_cursor(Location::Cascade { column: 2, row: 0 });
        let board = board.move_cursor(Direction::Down);
        assert_eq!(board.cursor(), Location::Deck(2));
        assert_eq!(board.previous_action().text, "cursor down w k AH");
        let board = board.move_cursor(Direction::Up);
        assert_eq!(board.cursor(), Location::Cascade { column: 2, row: 0 });
        let board = board.set_cursor(Location::Deck(0)).move_cursor(Direction::Left);
        assert_eq!(board.cursor(), Location::Deck(43));
    }

    #[test]
    fn test_touch_select_and_deselect() {
        let board = Board::new().shuffle32(5).unwrap().deal_all();
        let selected = board.touch(Location::Cascade { column: 4, row: 5 });
        assert_eq!(selected.previous_action().text, "select 5 6H");
        assert!(selected.selection().unwrap().can_move);
        assert!(selected.available_moves().is_some());
        let deselected = selected.touch(Location::Cascade { column: 4, row: 5 });
        assert_eq!(deselected.previous_action().text, "deselect 5 6H");
        assert!(deselected.selection().is_none());
        assert!(deselected.available_moves().is_none());
        assert_eq!(deselected.history(), board.history());
    }

    #[test]
    fn test_touch_peek_and_adjust() {
        let board = Board::new().shuffle32(5).unwrap().deal_all();
        let peek = board.touch(Location::Cascade { column: 4, row: 2 });
        assert_eq!(peek.previous_action().text, "select 5 KD");
        assert!(peek.selection().unwrap().peek_only());
        assert!(peek.available_moves().is_none());
        let adjusted = peek.touch(Location::Cascade { column: 4, row: 5 });
        assert_eq!(adjusted.previous_action().text, "select 5 6H");
        assert!(adjusted.selection().unwrap().can_move);
    }

    #[test]
    fn test_touch_empty_is_touch_stop() {
        let board = Board::new().shuffle32(5).unwrap().deal_all();
        let touched = board.touch(Location::Cell(2));
        assert_eq!(touched.previous_action().text, "touch stop");
        assert_eq!(touched.cursor(), Location::Cell(2));
        assert!(touched.selection().is_none());
    }

    #[test]
    fn test_touch_invalid_move_keeps_board() {
        let board = Board::new().shuffle32(5).unwrap().deal_all();
        let selected = board.touch(Location::Cascade { column: 4, row: 5 });
        let rejected = selected.touch(Location::Cascade { column: 0, row: 6 });
        assert_eq!(rejected.previous_action().text, "invalid move 51 6H→9S");
        assert_eq!(rejected.previous_action().action_type, ActionType::Invalid);
        assert_eq!(rejected.cards(), board.cards());
        assert_eq!(rejected.selection(), selected.selection());
        assert_eq!(rejected.history(), board.history());
    }

    #[test]
    fn test_touch_by_position_moves() {
        let board = Board::new().shuffle32(5).unwrap().deal_all();
        let board = board.touch_by_position('5').unwrap();
        assert_eq!(board.previous_action().text, "select 5 6H");
        let board = board.touch_by_position('3').unwrap();
        assert_eq!(
            board.previous_action().text,
            "move 53 6H→7C (auto-foundation 2 AD)"
        );
        assert!(board.touch_by_position('z').is_err());
    }

    #[test]
    fn test_positions_of_dealt_cards() {
        let board = Board::new().shuffle32(617).unwrap().deal_all();
        for card in board.cards() {
            assert_ne!(board.position(card.location), '?');
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "is off the board")]
    fn test_position_off_the_board() {
        Board::new().position(Location::Cell(4));
    }

    #[test]
    fn test_random_seed_in_range() {
        use rand::rngs::SmallRng;
        use rand::SeedableRng;
        let mut rng = SmallRng::seed_from_u64(514514);
        for _ in 0..100 {
            assert!(SEED_RANGE.contains(&random_seed(&mut rng)));
        }
    }

    #[test]
    fn test_is_won() {
        let board = Board::new();
        assert!(!board.is_won());
        let mut cards = board.cards().to_vec();
        for card in cards.iter_mut() {
            card.location = Location::Foundation(card.suit.index());
        }
        let won = board.with_cards(cards);
        assert!(won.is_won());
        assert_eq!(won.foundation_rank(Suit::Hearts), 13);
    }
}
