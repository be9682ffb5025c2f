//! Move legality, prioritisation and execution.
//!
//! Destination discovery and the supermove capacity rule live here, together with the
//! priority table that orders destinations so that repeatedly asking for "the best move"
//! cycles through every legal destination. Execution relocates card locations only; the
//! board views are rebuilt by `Board::settle`.
use crate::action::{Action, Face, MoveTarget, Promotion, PromotionKind};
use crate::card::{
    sequence_shorthand, Card, Fixture, Location, Rank, Suit, DECK_SIZE, FOUNDATION_COUNT,
};
use crate::engine::{Board, Sequence};
use crate::error::EngineError;
use log::debug;
use std::fmt;
use std::str::FromStr;

/// How far ahead automatic foundation promotion may run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AutoFoundationLimit {
    /// Promote anything that stacks.
    None,
    /// Next rank at most one above the lowest foundation.
    Rank,
    /// Next rank at most two above the lowest foundation.
    RankPlusOne,
    /// Next rank at most one above the lowest opposite-colour foundation; aces and twos always.
    OppositePlusOne,
    /// Next rank at most two above the lowest opposite-colour foundation.
    OppositePlusTwo,
}

impl fmt::Display for AutoFoundationLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AutoFoundationLimit::None => "none",
            AutoFoundationLimit::Rank => "rank",
            AutoFoundationLimit::RankPlusOne => "rank+1",
            AutoFoundationLimit::OppositePlusOne => "opp+1",
            AutoFoundationLimit::OppositePlusTwo => "opp+2",
        };
        f.write_str(name)
    }
}

impl FromStr for AutoFoundationLimit {
    type Err = EngineError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "none" => Ok(AutoFoundationLimit::None),
            "rank" => Ok(AutoFoundationLimit::Rank),
            "rank+1" => Ok(AutoFoundationLimit::RankPlusOne),
            "opp+1" => Ok(AutoFoundationLimit::OppositePlusOne),
            "opp+2" => Ok(AutoFoundationLimit::OppositePlusTwo),
            _ => Err(EngineError::InvalidLimit(text.to_string())),
        }
    }
}

/// Where a selection is moving from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveSourceType {
    Deck,
    Cell,
    Foundation,
    CascadeSingle,
    CascadeSequence,
}

impl fmt::Display for MoveSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MoveSourceType::Deck => "deck",
            MoveSourceType::Cell => "cell",
            MoveSourceType::Foundation => "foundation",
            MoveSourceType::CascadeSingle => "cascade:single",
            MoveSourceType::CascadeSequence => "cascade:sequence",
        };
        f.write_str(name)
    }
}

/// What kind of slot a destination is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveDestinationType {
    Cell,
    Foundation,
    CascadeEmpty,
    CascadeSequence,
}

impl fmt::Display for MoveDestinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MoveDestinationType::Cell => "cell",
            MoveDestinationType::Foundation => "foundation",
            MoveDestinationType::CascadeEmpty => "cascade:empty",
            MoveDestinationType::CascadeSequence => "cascade:sequence",
        };
        f.write_str(name)
    }
}

/// A legal destination for the current selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AvailableMove {
    /// The destination slot. For a non-empty cascade this is its tail card.
    pub location: Location,
    pub move_dest_type: MoveDestinationType,
    /// Higher is better; 0 until prioritised.
    pub priority: usize,
}

/// An `auto_move` cycle in progress.
///
/// `remaining` holds the destinations that were available at `origin` and have not been
/// visited yet, best first. `at` is where the cards sit now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MoveCycle {
    faces: Vec<Face>,
    origin: Location,
    at: Location,
    remaining: Vec<Location>,
}

/// Destination kinds in the order a source prefers them.
fn destination_preference(source: MoveSourceType, head: &Card) -> &'static [MoveDestinationType] {
    use MoveDestinationType::*;
    match source {
        MoveSourceType::Deck => &[Foundation, Cell, CascadeSequence, CascadeEmpty],
        MoveSourceType::Cell => &[Foundation, CascadeSequence, CascadeEmpty, Cell],
        MoveSourceType::Foundation => &[Cell, CascadeSequence, CascadeEmpty, Foundation],
        MoveSourceType::CascadeSingle if head.rank == Rank::King => {
            &[Foundation, CascadeSequence, CascadeEmpty, Cell]
        }
        MoveSourceType::CascadeSingle => &[Foundation, CascadeSequence, Cell, CascadeEmpty],
        MoveSourceType::CascadeSequence => &[CascadeSequence, CascadeEmpty],
    }
}

/// Whether `card` may be placed on a foundation whose top card is `top`.
///
/// # Examples
/// ```
/// use freecell_engine::card::{Card, Location, Rank, Suit};
/// use freecell_engine::moves::can_stack_foundation;
/// let ace = Card::new(Rank::Ace, Suit::Spades, Location::Cell(0));
/// let two = Card::new(Rank::Two, Suit::Spades, Location::Cell(1));
/// assert!(can_stack_foundation(None, &ace));
/// assert!(can_stack_foundation(Some(&ace), &two));
/// assert!(!can_stack_foundation(None, &two));
/// ```
pub fn can_stack_foundation(top: Option<&Card>, card: &Card) -> bool {
    match top {
        None => card.rank == Rank::Ace,
        Some(top) => top.suit == card.suit && crate::card::is_adjacent(top.rank, card.rank),
    }
}

/// The supermove capacity: how many cards may move as a unit.
///
/// `2^empty_cascades * (empty_cells + 1)`, halved when the destination is itself an
/// empty cascade (it cannot also serve as a helper).
pub fn max_sequence_length(
    empty_cells: usize,
    empty_cascades: usize,
    to_empty_cascade: bool,
) -> usize {
    let capacity = (1usize << empty_cascades) * (empty_cells + 1);
    if to_empty_cascade {
        capacity / 2
    } else {
        capacity
    }
}

impl Board {
    /// Source kind of a selection.
    pub fn move_source_type(&self, selection: &Sequence) -> MoveSourceType {
        match selection.location {
            Location::Deck(_) => MoveSourceType::Deck,
            Location::Cell(_) => MoveSourceType::Cell,
            Location::Foundation(_) => MoveSourceType::Foundation,
            Location::Cascade { .. } if selection.len() > 1 => MoveSourceType::CascadeSequence,
            Location::Cascade { .. } => MoveSourceType::CascadeSingle,
        }
    }

    /// Every legal destination for a movable selection, unprioritised.
    pub fn find_available_moves(&self, selection: &Sequence) -> Vec<AvailableMove> {
        let Some(head) = selection.head() else {
            return Vec::new();
        };
        if !selection.can_move {
            return Vec::new();
        }
        let length = selection.len();
        let empty_cells = self.empty_cells();
        let empty_cascades = self.empty_cascades();
        let candidate = |location, move_dest_type| AvailableMove {
            location,
            move_dest_type,
            priority: 0,
        };
        let mut moves = Vec::new();

        if length == 1 {
            for (index, cell) in self.cells.iter().enumerate() {
                if cell.is_none() {
                    moves.push(candidate(Location::Cell(index), MoveDestinationType::Cell));
                }
            }
            // only the first accepting foundation, so a replayed `h` lands in the same place
            let foundation = (0..FOUNDATION_COUNT).find(|&index| {
                selection.location != Location::Foundation(index)
                    && can_stack_foundation(self.foundations[index].as_ref(), head)
            });
            if let Some(index) = foundation {
                moves.push(candidate(
                    Location::Foundation(index),
                    MoveDestinationType::Foundation,
                ));
            }
        }

        for (column, cards) in self.tableau.iter().enumerate() {
            if matches!(selection.location, Location::Cascade { column: c, .. } if c == column) {
                continue;
            }
            match cards.last() {
                Some(tail) => {
                    if head.can_stack_on(tail)
                        && length <= max_sequence_length(empty_cells, empty_cascades, false)
                    {
                        moves.push(candidate(tail.location, MoveDestinationType::CascadeSequence));
                    }
                }
                None => {
                    if length <= max_sequence_length(empty_cells, empty_cascades, true) {
                        moves.push(candidate(
                            Location::Cascade { column, row: 0 },
                            MoveDestinationType::CascadeEmpty,
                        ));
                    }
                }
            }
        }
        moves
    }

    /// Keeps only the most preferred destination kind and orders it for cycling.
    ///
    /// Within the kept kind, destinations are ranked *linearly* (rightward from the source,
    /// wrapping) when the vacated source would itself be a destination of that kind, and by
    /// *closeness* otherwise (nearest first, ties to the right). The result is sorted by
    /// descending priority.
    pub fn prioritize_available_moves(
        &self,
        selection: &Sequence,
        candidates: Vec<AvailableMove>,
    ) -> Vec<AvailableMove> {
        let Some(head) = selection.head() else {
            return Vec::new();
        };
        let source_type = self.move_source_type(selection);
        let Some(kept) = destination_preference(source_type, head)
            .iter()
            .copied()
            .find(|kind| candidates.iter().any(|m| m.move_dest_type == *kind))
        else {
            return Vec::new();
        };

        let linear = self.returns_to_kind(selection, kept);
        let mut moves: Vec<AvailableMove> = candidates
            .into_iter()
            .filter(|m| m.move_dest_type == kept)
            .map(|mut m| {
                m.priority = if linear {
                    self.linear_priority(selection.location, m.location)
                } else {
                    self.closest_priority(selection.location, m.location)
                };
                m
            })
            .collect();
        moves.sort_by(|a, b| b.priority.cmp(&a.priority));
        moves
    }

    /// Whether the source slot, once vacated, is a destination of kind `kind`.
    fn returns_to_kind(&self, selection: &Sequence, kind: MoveDestinationType) -> bool {
        match (selection.location, kind) {
            (Location::Cell(_), MoveDestinationType::Cell) => true,
            (Location::Foundation(_), MoveDestinationType::Foundation) => true,
            (Location::Cascade { row: 0, .. }, MoveDestinationType::CascadeEmpty) => true,
            (Location::Cascade { column, row }, MoveDestinationType::CascadeSequence)
                if row > 0 =>
            {
                match (selection.head(), self.tableau[column].get(row - 1)) {
                    (Some(head), Some(above)) => head.can_stack_on(above),
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn fixture_width(&self, fixture: Fixture) -> usize {
        match fixture {
            Fixture::Cell => self.config.cell_count,
            Fixture::Foundation => FOUNDATION_COUNT,
            Fixture::Cascade => self.config.cascade_count,
            Fixture::Deck => self.deck.len().max(1),
        }
    }

    fn linear_priority(&self, source: Location, destination: Location) -> usize {
        let n = self.fixture_width(destination.fixture());
        let (s, d) = (source.index() % n, destination.index());
        if d == s {
            return 0;
        }
        n - ((d + n - s - 1) % n)
    }

    /// Horizontal position shared by every fixture: cells, then foundations, across the
    /// top; cascades (and the deck) from the left edge.
    fn horizontal(&self, location: Location) -> usize {
        match location {
            Location::Cell(index) => index,
            Location::Foundation(index) => self.config.cell_count + index,
            Location::Cascade { column, .. } => column,
            Location::Deck(index) => index.min(self.config.cascade_count - 1),
        }
    }

    fn closest_priority(&self, source: Location, destination: Location) -> usize {
        let width = (self.config.cell_count + FOUNDATION_COUNT).max(self.config.cascade_count);
        let (s, d) = (self.horizontal(source), self.horizontal(destination));
        2 * (width - s.abs_diff(d)) + usize::from(d > s)
    }

    /// Relocates a selection and returns the new card set (fresh-deck order).
    ///
    /// Cascade destinations receive the whole run, appended in order. Any other destination
    /// takes exactly one card; a longer run is refused and the cards come back unchanged.
    /// A deck destination inserts the card at that index and shifts the later deck cards.
    pub fn move_cards(&self, selection: &Sequence, destination: Location) -> Vec<Card> {
        let mut cards = self.cards.clone();
        let Some(head) = selection.head() else {
            return cards;
        };
        match destination {
            Location::Cascade { column, .. } => {
                if matches!(
                    selection.location,
                    Location::Cascade { column: c, .. } if c == column
                ) {
                    return cards;
                }
                let start = self.tableau.get(column).map_or(0, Vec::len);
                for (offset, card) in selection.cards.iter().enumerate() {
                    cards[card.face_index()].location = Location::Cascade {
                        column,
                        row: start + offset,
                    };
                }
            }
            _ if selection.len() > 1 => return cards,
            Location::Cell(_) | Location::Foundation(_) => {
                cards[head.face_index()].location = destination;
            }
            Location::Deck(index) => {
                for card in cards.iter_mut() {
                    if let Location::Deck(i) = card.location {
                        if i >= index {
                            card.location = Location::Deck(i + 1);
                        }
                    }
                }
                cards[head.face_index()].location = destination;
            }
        }
        cards
    }

    /// The text after the arrow for a move onto `destination`.
    pub(crate) fn move_target(&self, destination: Location) -> MoveTarget {
        let (top, fixture_target) = match destination {
            Location::Cell(_) => (None, MoveTarget::Cell),
            Location::Foundation(index) => (
                self.foundations.get(index).copied().flatten(),
                MoveTarget::Foundation,
            ),
            Location::Cascade { column, .. } => (
                self.tableau.get(column).and_then(|cards| cards.last()).copied(),
                MoveTarget::Cascade,
            ),
            // the deck is never a player destination
            Location::Deck(_) => (self.deck.last().copied(), MoveTarget::Cascade),
        };
        match top {
            Some(card) => MoveTarget::Card(card.rank, card.suit),
            None => fixture_target,
        }
    }

    /// Performs a move already known to be legal, then any automatic promotion.
    pub(crate) fn execute_move(&self, selection: &Sequence, destination: Location) -> Board {
        let from = self.position(selection.location);
        let to = self.position(destination);
        let target = self.move_target(destination);
        let mut next = self.with_cards(self.move_cards(selection, destination));
        let mut tween: Vec<Card> = selection
            .cards
            .iter()
            .map(|card| next.cards[card.face_index()])
            .collect();
        if let Some(head) = tween.first() {
            next.cursor = next.clamp_location(head.location);
        }

        let mut promotion = None;
        if self.config.auto_foundation {
            let (promoted_board, promoted) = next.promote_to_foundations();
            if !promoted.is_empty() {
                promotion = Some(promoted_board.promotion(&promoted));
                tween.extend(promoted.iter().map(|(_, card)| *card));
                next = promoted_board;
            }
        }

        let action = Action::Move {
            from,
            to,
            cards: Action::faces(&selection.cards),
            target,
            promotion,
        };
        debug!("{}", action);
        next.record(action, tween)
    }

    /// The legal destination that a touch on `location` asks for: the same cascade column or
    /// cell, or the foundation that accepts the selection.
    pub(crate) fn legal_destination(
        &self,
        selection: &Sequence,
        location: Location,
    ) -> Option<Location> {
        self.find_available_moves(selection)
            .into_iter()
            .map(|m| m.location)
            .find(|&destination| same_slot(destination, location))
    }

    /// Moves `selection` and remembers the rest of its cycle.
    pub(crate) fn cycle_move(
        &self,
        selection: &Sequence,
        destination: Location,
        origin: Location,
        remaining: Vec<Location>,
    ) -> Board {
        let mut next = self.execute_move(selection, destination);
        let Some(head) = selection.head() else {
            return next;
        };
        let at = next.cards[head.face_index()].location;
        if at.fixture() != Fixture::Foundation {
            next.move_cycle = Some(MoveCycle {
                faces: Action::faces(&selection.cards),
                origin,
                at,
                remaining,
            });
        }
        next
    }

    /// Takes the next step of `cycle` when `selection` is the cycling cards where the last
    /// step left them. Destinations that have stopped being legal are skipped; once none
    /// remain the cards go back to the origin. `None` means a fresh cycle should start.
    pub(crate) fn continue_cycle(&self, selection: &Sequence, cycle: &MoveCycle) -> Option<Board> {
        if cycle.at != selection.location || cycle.faces != Action::faces(&selection.cards) {
            return None;
        }
        let legal: Vec<Location> = self
            .find_available_moves(selection)
            .into_iter()
            .map(|m| m.location)
            .collect();
        let find = |wanted: Location| legal.iter().copied().find(|&l| same_slot(l, wanted));
        for (i, &wanted) in cycle.remaining.iter().enumerate() {
            if let Some(destination) = find(wanted) {
                let rest = cycle.remaining[i + 1..].to_vec();
                return Some(self.cycle_move(selection, destination, cycle.origin, rest));
            }
        }
        let home = find(cycle.origin)?;
        Some(self.execute_move(selection, home))
    }

    /// Executes `from` → `to` when legal, otherwise records `invalid move …`.
    ///
    /// Unlike `touch`, this needs no prior selection, which makes it convenient for
    /// scripted play and search.
    pub fn perform_move(&self, from: Location, to: Location) -> Board {
        let selection = self.sequence_at(from);
        match self.legal_destination(&selection, to) {
            Some(destination) => self.execute_move(&selection, destination),
            None => {
                let body = format!(
                    "move {}{} {}→{}",
                    self.position(selection.location),
                    self.position(self.clamp_location(to)),
                    sequence_shorthand(&selection.cards),
                    self.move_target(to)
                );
                self.clone().record(Action::Invalid(body), Vec::new())
            }
        }
    }

    /// Every movable sequence paired with its raw destinations.
    ///
    /// Cascade columns contribute each suffix of their bottom run, longest first.
    pub fn legal_moves(&self) -> Vec<(Sequence, Vec<AvailableMove>)> {
        let mut sources: Vec<Sequence> = (0..self.config.cell_count)
            .map(|index| self.sequence_at(Location::Cell(index)))
            .collect();
        for (column, cards) in self.tableau.iter().enumerate() {
            if let Location::Cascade { row: root, .. } = self.run_root(column) {
                for row in root..cards.len() {
                    sources.push(self.sequence_at(Location::Cascade { column, row }));
                }
            }
        }
        sources
            .into_iter()
            .filter(|sequence| sequence.can_move)
            .map(|sequence| {
                let moves = self.find_available_moves(&sequence);
                (sequence, moves)
            })
            .filter(|(_, moves)| !moves.is_empty())
            .collect()
    }

    /// One line describing the current selection's destinations, best first,
    /// e.g. `6H: 3 cascade:sequence 11`.
    pub fn available_move_summary(&self) -> String {
        let (Some(selection), Some(moves)) = (&self.selection, &self.available_moves) else {
            return String::new();
        };
        let mut summary = sequence_shorthand(&selection.cards);
        summary.push(':');
        for m in moves {
            summary.push_str(&format!(
                " {} {} {}",
                self.position(m.location),
                m.move_dest_type,
                m.priority
            ));
        }
        summary
    }

    // ---------------------------------------------------------------------------------------
    // Automatic foundation promotion
    // ---------------------------------------------------------------------------------------

    fn lowest_foundation_rank(&self, suits: impl Iterator<Item = Suit>) -> u8 {
        suits.map(|suit| self.foundation_rank(suit)).min().unwrap_or(0)
    }

    /// Whether the configured limit lets `card` be promoted automatically.
    fn limit_allows(&self, card: &Card) -> bool {
        let rank = card.rank.value();
        let opposite = || {
            let suits = Suit::ALL.into_iter().filter(|s| s.is_red() != card.is_red());
            self.lowest_foundation_rank(suits)
        };
        match self.config.auto_foundation_limit {
            AutoFoundationLimit::None => true,
            AutoFoundationLimit::Rank => {
                rank <= self.lowest_foundation_rank(Suit::ALL.into_iter()) + 1
            }
            AutoFoundationLimit::RankPlusOne => {
                rank <= self.lowest_foundation_rank(Suit::ALL.into_iter()) + 2
            }
            AutoFoundationLimit::OppositePlusOne => rank <= 2 || rank <= opposite() + 1,
            AutoFoundationLimit::OppositePlusTwo => rank <= opposite() + 2,
        }
    }

    /// Whether foundation `index` may take its next card under the configured limit.
    pub fn foundation_can_accept_cards(&self, index: usize) -> bool {
        match self.foundations.get(index) {
            None => false,
            Some(None) => true,
            Some(Some(top)) => match Rank::from_value(top.rank.value() + 1) {
                Some(rank) => self.limit_allows(&Card::new(rank, top.suit, top.location)),
                None => false,
            },
        }
    }

    /// Repeatedly promotes free-cell and cascade-tail cards until no foundation accepts one.
    ///
    /// Returns the settled board and the promoted cards (at their foundation locations),
    /// each with the position character it came from.
    pub(crate) fn promote_to_foundations(&self) -> (Board, Vec<(char, Card)>) {
        let mut board = self.clone();
        let mut promoted = Vec::new();
        loop {
            let mut moved = false;
            for index in 0..FOUNDATION_COUNT {
                if !board.foundation_can_accept_cards(index) {
                    continue;
                }
                let top = board.foundations[index];
                let candidate = board
                    .cells
                    .iter()
                    .flatten()
                    .chain(board.tableau.iter().filter_map(|column| column.last()))
                    .find(|card| {
                        can_stack_foundation(top.as_ref(), card) && board.limit_allows(card)
                    })
                    .copied();
                if let Some(card) = candidate {
                    let from = board.position(card.location);
                    let mut cards = board.cards.clone();
                    cards[card.face_index()].location = Location::Foundation(index);
                    let cursor = board.cursor;
                    board = board.with_cards(cards);
                    board.cursor = board.clamp_location(cursor);
                    promoted.push((from, board.cards[card.face_index()]));
                    moved = true;
                }
            }
            if !moved {
                break;
            }
        }
        (board, promoted)
    }

    fn promotion(&self, promoted: &[(char, Card)]) -> Promotion {
        let kind = if !self.is_won() {
            PromotionKind::AutoFoundation
        } else if promoted.len() == DECK_SIZE {
            PromotionKind::Flourish52
        } else {
            PromotionKind::Flourish
        };
        Promotion {
            kind,
            positions: promoted.iter().map(|(position, _)| *position).collect(),
            cards: promoted.iter().map(|(_, card)| card.face()).collect(),
        }
    }

    /// Promotes everything the limit allows as a standalone command.
    ///
    /// Records `auto-foundation …`, `flourish …` or `flourish52 …`, or `touch stop` when
    /// nothing could move.
    pub fn auto_foundation_all(&self) -> Board {
        let board = self.clear_selection();
        let (next, promoted) = board.promote_to_foundations();
        if promoted.is_empty() {
            return board.record(Action::TouchStop, Vec::new());
        }
        let action = Action::AutoFoundation(next.promotion(&promoted));
        debug!("{}", action);
        let tween = promoted.into_iter().map(|(_, card)| card).collect();
        next.record(action, tween)
    }
}

/// Whether a destination slot matches a requested location: same fixture and index,
/// ignoring cascade rows. Any foundation matches any other.
pub(crate) fn same_slot(destination: Location, requested: Location) -> bool {
    match (destination, requested) {
        (Location::Foundation(_), Location::Foundation(_)) => true,
        _ => {
            destination.fixture() == requested.fixture()
                && destination.index() == requested.index()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionType;
    use crate::engine::BoardConfig;

    fn game(seed: u32) -> Board {
        Board::new().shuffle32(seed).unwrap().deal_all()
    }

    fn cascade(column: usize, row: usize) -> Location {
        Location::Cascade { column, row }
    }

    #[test]
    fn test_limit_names() {
        for name in ["none", "rank", "rank+1", "opp+1", "opp+2"] {
            let limit: AutoFoundationLimit = name.parse().unwrap();
            assert_eq!(limit.to_string(), name);
        }
        assert_eq!(
            "opp+3".parse::<AutoFoundationLimit>(),
            Err(EngineError::InvalidLimit("opp+3".to_string()))
        );
    }

    #[test]
    fn test_capacity_formula() {
        assert_eq!(max_sequence_length(0, 0, false), 1);
        assert_eq!(max_sequence_length(4, 0, false), 5);
        assert_eq!(max_sequence_length(4, 1, false), 10);
        assert_eq!(max_sequence_length(4, 1, true), 5);
        assert_eq!(max_sequence_length(2, 3, true), 12);
        assert_eq!(max_sequence_length(0, 1, true), 1);
    }

    #[test]
    fn test_find_available_moves_single_card() {
        let board = game(5);
        let selection = board.sequence_at(cascade(4, 5));
        let moves = board.find_available_moves(&selection);
        let cells = moves.iter().filter(|m| m.move_dest_type == MoveDestinationType::Cell).count();
        assert_eq!(cells, 4);
        let stacks: Vec<Location> = moves
            .iter()
            .filter(|m| m.move_dest_type == MoveDestinationType::CascadeSequence)
            .map(|m| m.location)
            .collect();
        assert_eq!(stacks, vec![cascade(2, 6)]);
    }

    #[test]
    fn test_prioritize_prefers_cascade_for_single() {
        let board = game(5);
        let selected = board.touch(cascade(4, 5));
        let moves = selected.available_moves().unwrap();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].move_dest_type, MoveDestinationType::CascadeSequence);
        assert_eq!(moves[0].location, cascade(2, 6));
        assert_eq!(selected.available_move_summary(), "6H: 3 cascade:sequence 12");
    }

    #[test]
    fn test_peek_selection_has_no_moves() {
        let board = game(5);
        let peek = board.sequence_at(cascade(4, 2));
        assert!(board.find_available_moves(&peek).is_empty());
    }

    #[test]
    fn test_move_cards_refuses_sequence_to_cell() {
        let board = game(5);
        let selection = Sequence {
            location: cascade(0, 5),
            cards: board.tableau()[0][5..].to_vec(),
            can_move: true,
        };
        assert_eq!(board.move_cards(&selection, Location::Cell(0)), board.cards());
    }

    #[test]
    fn test_move_cards_into_deck_shifts() {
        let board = Board::new().deal(1);
        let king = board.sequence_at(cascade(0, 0));
        let cards = board.move_cards(&king, Location::Deck(0));
        let moved = board.with_cards(cards);
        assert_eq!(moved.deck().len(), 52);
        assert_eq!(moved.deck()[0].shorthand(), "KS");
        assert_eq!(moved.deck()[1].shorthand(), "AC");
    }

    #[test]
    fn test_execute_scenario_move_with_auto_foundation() {
        let board = game(5);
        let moved = board.touch(cascade(4, 5)).touch(cascade(2, 6));
        assert_eq!(
            moved.previous_action().text,
            "move 53 6H→7C (auto-foundation 2 AD)"
        );
        assert_eq!(moved.previous_action().action_type, ActionType::MoveFoundation);
        assert_eq!(moved.foundation_rank(Suit::Diamonds), 1);
        assert_eq!(moved.tableau()[1].last().unwrap().shorthand(), "TC");
        assert_eq!(moved.tableau()[4].last().unwrap().shorthand(), "KS");
        assert_eq!(moved.cursor(), cascade(2, 7));
        assert_eq!(moved.previous_action().tween_cards.len(), 2);
        assert_eq!(moved.history().last().unwrap(), "move 53 6H→7C (auto-foundation 2 AD)");
    }

    #[test]
    fn test_auto_foundation_disabled() {
        let config = BoardConfig {
            auto_foundation: false,
            ..BoardConfig::default()
        };
        let board = Board::with_config(config).unwrap().shuffle32(5).unwrap().deal_all();
        let moved = board.touch(cascade(4, 5)).touch(cascade(2, 6));
        assert_eq!(moved.previous_action().text, "move 53 6H→7C");
        assert_eq!(moved.foundation_rank(Suit::Diamonds), 0);
        let promoted = moved.auto_foundation_all();
        assert_eq!(promoted.previous_action().text, "auto-foundation 2 AD");
        assert_eq!(promoted.previous_action().action_type, ActionType::AutoFoundation);
        let nothing = promoted.auto_foundation_all();
        assert_eq!(nothing.previous_action().text, "touch stop");
        assert_eq!(nothing.history(), promoted.history());
    }

    #[test]
    fn test_flourish52_from_unshuffled_deal() {
        // with no limit every card of the sorted deal walks straight home
        let config = BoardConfig {
            auto_foundation: false,
            auto_foundation_limit: AutoFoundationLimit::None,
            ..BoardConfig::default()
        };
        let board = Board::with_config(config).unwrap().deal_all();
        let won = board.auto_foundation_all();
        assert!(won.is_won());
        assert_eq!(won.previous_action().action_type, ActionType::AutoFoundation);
        assert!(won.previous_action().text.starts_with("flourish52 "));
        assert_eq!(won.previous_action().tween_cards.len(), 52);
    }

    #[test]
    fn test_limits_gate_promotion() {
        // spades up to 5, every other suit up to 2
        let board = Board::new().deal_all();
        let mut cards = board.cards().to_vec();
        for card in cards.iter_mut() {
            let top = if card.suit == Suit::Spades { 5 } else { 2 };
            if card.rank.value() <= top {
                card.location = Location::Foundation(card.suit.index());
            }
        }
        let mut board = board.with_cards(cards);
        let hearts = Suit::Hearts.index();
        let spades = Suit::Spades.index();

        assert!(board.foundation_can_accept_cards(hearts));
        assert!(!board.foundation_can_accept_cards(spades));
        board.config.auto_foundation_limit = AutoFoundationLimit::OppositePlusTwo;
        assert!(!board.foundation_can_accept_cards(spades));
        board.config.auto_foundation_limit = AutoFoundationLimit::Rank;
        assert!(board.foundation_can_accept_cards(hearts));
        assert!(!board.foundation_can_accept_cards(spades));
        board.config.auto_foundation_limit = AutoFoundationLimit::None;
        assert!(board.foundation_can_accept_cards(spades));
    }

    #[test]
    fn test_sorted_deal_flourishes_under_default_limit() {
        let won = Board::new().deal_all().auto_foundation_all();
        assert!(won.is_won());
        assert!(won.previous_action().text.starts_with("flourish52 12345678"));
    }

    fn manual_game(seed: u32) -> Board {
        let config = BoardConfig {
            auto_foundation: false,
            ..BoardConfig::default()
        };
        Board::with_config(config).unwrap().shuffle32(seed).unwrap().deal_all()
    }

    #[test]
    fn test_auto_move_cycles_through_empty_cells() {
        let board = manual_game(5).set_cursor(cascade(0, 6));
        // 9S has no cascade to go to: it cycles across the four free cells
        let first = board.auto_move();
        assert_eq!(first.previous_action().text, "move 1a 9S→cell");
        let second = first.auto_move();
        assert_eq!(second.previous_action().text, "move ab 9S→cell");
        let third = second.auto_move().auto_move();
        assert_eq!(third.previous_action().text, "move cd 9S→cell");
        // 9S cannot go back onto 2H, so the cycle starts over from cell d
        let again = third.auto_move();
        assert_eq!(again.previous_action().text, "move da 9S→cell");
    }

    #[test]
    fn test_auto_move_cycle_ends_at_origin() {
        // 6H on 7C can only reach the free cells, and can always return to 7C
        let board = manual_game(5).perform_move(cascade(4, 5), cascade(2, 0));
        assert_eq!(board.previous_action().text, "move 53 6H→7C");
        let selected = board.touch(cascade(2, 7));
        let expected: Vec<Location> = selected
            .available_moves()
            .unwrap()
            .iter()
            .map(|m| m.location)
            .collect();
        assert_eq!(expected.len(), 4);

        let mut visited = Vec::new();
        let mut current = selected;
        for _ in 0..expected.len() {
            current = current.auto_move();
            assert_eq!(current.previous_action().action_type, ActionType::Move);
            visited.push(current.cursor());
        }
        assert_eq!(visited, expected);
        let home = current.auto_move();
        assert_eq!(home.previous_action().text, "move a3 6H→7C");
        assert_eq!(home.cards(), board.cards());
    }

    #[test]
    fn test_touch_moves_to_cell_foundation_and_empty_cascade() {
        let board = manual_game(5);
        let to_cell = board.touch(cascade(0, 6)).touch(Location::Cell(2));
        assert_eq!(to_cell.previous_action().text, "move 1c 9S→cell");
        assert_eq!(to_cell.card_at(Location::Cell(2)).unwrap().shorthand(), "9S");

        let to_foundation = board.touch(cascade(1, 6)).touch(Location::Foundation(3));
        assert_eq!(to_foundation.previous_action().text, "move 2h AD→foundation");
        assert_eq!(to_foundation.card_at(Location::Foundation(0)).unwrap().shorthand(), "AD");

        let partial = Board::new().deal(7);
        let to_empty = partial.touch(cascade(0, 0)).touch(cascade(7, 0));
        assert_eq!(to_empty.previous_action().text, "move 18 KS→cascade");
        assert_eq!(to_empty.card_at(cascade(7, 0)).unwrap().shorthand(), "KS");
    }

    #[test]
    fn test_foundation_moves_use_first_accepting_foundation() {
        let board = manual_game(5);
        let ace = board.sequence_at(cascade(1, 6));
        let foundations: Vec<Location> = board
            .find_available_moves(&ace)
            .into_iter()
            .filter(|m| m.move_dest_type == MoveDestinationType::Foundation)
            .map(|m| m.location)
            .collect();
        assert_eq!(foundations, vec![Location::Foundation(0)]);

        let moved = board.perform_move(cascade(1, 6), Location::Foundation(2));
        assert_eq!(moved.previous_action().text, "move 2h AD→foundation");
        assert_eq!(moved.card_at(Location::Foundation(0)).unwrap().shorthand(), "AD");
        assert!(moved.card_at(Location::Foundation(2)).is_none());

        let replayed = Board::replay(*moved.config(), moved.history()).unwrap();
        assert_eq!(replayed.cards(), moved.cards());
        let text = moved.print(&crate::notation::PrintOptions::with_history());
        let parsed = Board::parse_with_config(&text, *moved.config()).unwrap();
        assert_eq!(parsed.cards(), moved.cards());
        assert_eq!(parsed.history(), moved.history());
    }

    #[test]
    fn test_perform_move_rejects_illegal() {
        let board = game(5);
        let rejected = board.perform_move(cascade(0, 6), cascade(1, 0));
        assert_eq!(rejected.previous_action().text, "invalid move 12 9S→AD");
        assert_eq!(rejected.cards(), board.cards());
        let moved = board.perform_move(cascade(4, 5), cascade(2, 0));
        assert_eq!(moved.previous_action().action_type, ActionType::MoveFoundation);
    }

    #[test]
    fn test_legal_moves_lists_movable_sources() {
        let board = game(5);
        let moves = board.legal_moves();
        // every cascade tail can at least reach a free cell
        assert_eq!(moves.len(), 8);
        assert!(moves.iter().all(|(sequence, _)| sequence.can_move));
    }
}
