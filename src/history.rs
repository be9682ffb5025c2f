//! History bookkeeping: compaction, undo and replay.
//!
//! A board keeps no snapshots. Undo parses the last history entry and computes the inverse
//! card placement from the current cards; replay re-executes the entries from a fresh board.
use crate::action::{
    Action, DealAmount, Face, GameFunction, InitKind, MoveTarget, PreviousAction, Promotion,
};
use crate::card::{parse_position, Card, Location, FOUNDATION_COUNT};
use crate::engine::{shuffle_order, Board, BoardConfig, Sequence};
use crate::error::{EngineError, HistoryStage};
use crate::moves::{can_stack_foundation, same_slot};
use log::debug;

impl Board {
    /// Appends an action's text to history, folding repositioning moves together.
    ///
    /// A move that picks up the run the previous move dropped into an empty cascade and sets
    /// it down in another cascade replaces that previous entry with the net move. When the net
    /// move leads back to where the run started, both entries disappear.
    pub(crate) fn push_history(&mut self, action: &Action) {
        if let Some(merged) = self.compacted(action) {
            self.history.pop();
            if let Some(merged) = merged {
                debug!("compacted history entry into \"{}\"", merged);
                self.history.push(merged.to_string());
            }
            return;
        }
        self.history.push(action.to_string());
    }

    /// `Some(replacement)` when `action` folds into the last entry; `Some(None)` drops both.
    fn compacted(&self, action: &Action) -> Option<Option<Action>> {
        let Action::Move {
            from,
            to,
            cards,
            target,
            promotion,
        } = action
        else {
            return None;
        };
        let previous: Action = self.history.last()?.parse().ok()?;
        let Action::Move {
            from: origin,
            to: via,
            cards: previous_cards,
            target: MoveTarget::Cascade,
            promotion: None,
        } = previous
        else {
            return None;
        };
        let to_cascade = matches!(
            parse_position(*to, self.config.cell_count, self.config.cascade_count),
            Ok(Location::Cascade { .. })
        );
        if previous_cards != *cards || via != *from || !to_cascade {
            return None;
        }
        if origin == *to && promotion.is_none() {
            return Some(None);
        }
        Some(Some(Action::Move {
            from: origin,
            to: *to,
            cards: cards.clone(),
            target: *target,
            promotion: promotion.clone(),
        }))
    }

    /// Steps back one history entry by inverting its text against the current cards.
    ///
    /// `init` entries, and entries that never change cards, are left alone.
    ///
    /// # Returns
    /// * `Err(EngineError::InvalidAction)` when the entry does not parse.
    /// * `Err(EngineError::InvalidHistory { stage: HistoryStage::Undo, .. })` when the cards
    ///   are not where the entry says it left them.
    ///
    /// # Examples
    /// ```
    /// use freecell_engine::engine::Board;
    /// let board = Board::new().shuffle32(5).unwrap().deal_all();
    /// let moved = board.touch_by_position('5').unwrap().touch_by_position('3').unwrap();
    /// let undone = moved.undo().unwrap();
    /// assert_eq!(undone.cards(), board.cards());
    /// assert_eq!(undone.history(), board.history());
    /// ```
    pub fn undo(&self) -> Result<Board, EngineError> {
        let Some(last) = self.history.last() else {
            return Ok(self.clone());
        };
        let action: Action = last.parse()?;
        let restored = match &action {
            Action::Shuffle { seed } => self.undo_shuffle(*seed)?,
            Action::Deal(amount) => self.undo_deal(*amount)?,
            Action::Move {
                from,
                to,
                cards,
                promotion,
                ..
            } => {
                let board = match promotion {
                    Some(promotion) => self.undo_promotion(promotion)?,
                    None => self.clone(),
                };
                board.undo_sequence(cards, *to, *from)?
            }
            Action::AutoFoundation(promotion) => self.undo_promotion(promotion)?,
            _ => return Ok(self.clone()),
        };
        debug!("undid \"{}\"", last);

        let mut next = restored;
        next.history.pop();
        next.previous_action = match next.history.last() {
            Some(text) => PreviousAction::from_text(text)?,
            None => PreviousAction::new(&Action::Init(InitKind::Fresh)),
        }
        .with_game_function(GameFunction::Undo);
        Ok(next)
    }

    /// Undoes every move back to the deal.
    pub fn restart(&self) -> Result<Board, EngineError> {
        let mut board = self.clone();
        let mut undone = false;
        while let Some(last) = board.history.last() {
            let action: Action = last.parse()?;
            if !matches!(action, Action::Move { .. } | Action::AutoFoundation(_)) {
                break;
            }
            board = board.undo()?;
            undone = true;
        }
        if undone {
            board.previous_action = board
                .previous_action
                .clone()
                .with_game_function(GameFunction::Restart);
        }
        Ok(board)
    }

    fn undo_error(&self, detail: String) -> EngineError {
        EngineError::history(HistoryStage::Undo, detail)
    }

    fn undo_shuffle(&self, seed: u32) -> Result<Board, EngineError> {
        if self.deck.len() != crate::card::DECK_SIZE {
            return Err(self.undo_error(format!(
                "cannot unshuffle with {} cards in the deck",
                self.deck.len()
            )));
        }
        let order = shuffle_order(&self.deck, seed, true);
        Ok(self.with_deck_order(&order))
    }

    /// Returns the dealt cards to the top of the deck in reverse deal order.
    fn undo_deal(&self, amount: DealAmount) -> Result<Board, EngineError> {
        let cascade_count = self.config.cascade_count;
        let total: usize = self.tableau.iter().map(Vec::len).sum();
        let (count, from_cells) = match amount {
            DealAmount::All => (total, false),
            DealAmount::Most => (total, true),
            DealAmount::Count(count) => (count, false),
        };
        if count > total {
            return Err(self.undo_error(format!(
                "cannot take back {} cards from a tableau of {}",
                count, total
            )));
        }
        let mut dealt: Vec<Card> = (total - count..total)
            .map(|k| {
                self.tableau
                    .get(k % cascade_count)
                    .and_then(|column| column.get(k / cascade_count))
                    .copied()
                    .ok_or_else(|| {
                        self.undo_error(format!("tableau is not laid out in rows at card {}", k))
                    })
            })
            .collect::<Result<_, _>>()?;
        if from_cells {
            dealt.extend(self.cells.iter().flatten());
        }

        let mut cards = self.cards.clone();
        let base = self.deck.len();
        for (offset, card) in dealt.iter().rev().enumerate() {
            cards[card.face_index()].location = Location::Deck(base + offset);
        }
        Ok(self.with_cards(cards))
    }

    /// Sends promoted cards back to their sources, last promoted first.
    fn undo_promotion(&self, promotion: &Promotion) -> Result<Board, EngineError> {
        let mut board = self.clone();
        for (&position, &(rank, suit)) in promotion.positions.iter().zip(&promotion.cards).rev() {
            let card = *board.card(rank, suit);
            let on_top = matches!(card.location, Location::Foundation(index)
                if board.foundations[index] == Some(card));
            if !on_top {
                return Err(board.undo_error(format!("{} is not on top of a foundation", card)));
            }
            let destination = board.return_location(position, &card)?;
            let sequence = Sequence {
                location: card.location,
                cards: vec![card],
                can_move: true,
            };
            board = board.with_cards(board.move_cards(&sequence, destination));
        }
        Ok(board)
    }

    /// Moves a run currently at `at` back to `origin`.
    fn undo_sequence(&self, faces: &[Face], at: char, origin: char) -> Result<Board, EngineError> {
        let Some(&(rank, suit)) = faces.first() else {
            return Err(self.undo_error("move without cards".to_string()));
        };
        let head = *self.card(rank, suit);
        if self.position(head.location) != at {
            return Err(self.undo_error(format!(
                "{} is at {} instead of {}",
                head,
                self.position(head.location),
                at
            )));
        }
        let cards = match head.location {
            Location::Cascade { .. } => self.sequence_at(head.location).cards,
            _ => vec![head],
        };
        if Action::faces(&cards) != faces {
            return Err(self.undo_error(format!(
                "expected {} at {}",
                crate::card::sequence_shorthand(&cards),
                at
            )));
        }
        let destination = self.return_location(origin, &head)?;
        let sequence = Sequence {
            location: head.location,
            cards,
            can_move: true,
        };
        Ok(self.with_cards(self.move_cards(&sequence, destination)))
    }

    /// Where a card taken back to position `position` lands.
    fn return_location(&self, position: char, card: &Card) -> Result<Location, EngineError> {
        let location = parse_position(position, self.config.cell_count, self.config.cascade_count)?;
        match location {
            Location::Cell(index) if self.cells[index].is_none() => Ok(location),
            Location::Cell(index) => Err(self.undo_error(format!("cell {} is occupied", index))),
            Location::Cascade { column, .. } => Ok(Location::Cascade {
                column,
                row: self.tableau[column].len(),
            }),
            Location::Foundation(_) => (0..FOUNDATION_COUNT)
                .find(|&index| can_stack_foundation(self.foundations[index].as_ref(), card))
                .map(Location::Foundation)
                .ok_or_else(|| self.undo_error(format!("no foundation accepts {}", card))),
            Location::Deck(_) => Ok(Location::Deck(self.deck.len())),
        }
    }

    /// Moves by position characters, the way a player types a move.
    ///
    /// A cascade source tries its bottom runs from longest to shortest until one can reach
    /// `to`; `h` matches whichever foundation accepts the card. A move that is not legal is
    /// recorded as `invalid move …`.
    ///
    /// # Returns
    /// * `Err(EngineError::InvalidPosition)` when either character names no position on this board.
    pub fn move_by_position(&self, from: char, to: char) -> Result<Board, EngineError> {
        let (cells, cascades) = (self.config.cell_count, self.config.cascade_count);
        let source = parse_position(from, cells, cascades)?;
        let target = parse_position(to, cells, cascades)?;
        let board = self.clear_selection();

        let candidates: Vec<Sequence> = match source {
            Location::Cascade { column, .. } => match board.run_root(column) {
                Location::Cascade { row: root, .. } => (root..board.tableau[column].len())
                    .map(|row| board.sequence_at(Location::Cascade { column, row }))
                    .collect(),
                _ => Vec::new(),
            },
            Location::Deck(_) => {
                let top = Location::Deck(board.deck.len().saturating_sub(1));
                vec![board.sequence_at(top)]
            }
            other => vec![board.sequence_at(other)],
        };
        for sequence in candidates.iter().filter(|s| s.can_move) {
            let destination = board
                .find_available_moves(sequence)
                .into_iter()
                .map(|m| m.location)
                .find(|&location| same_slot(location, target));
            if let Some(destination) = destination {
                return Ok(board.execute_move(sequence, destination));
            }
        }

        let body = match candidates.first().filter(|s| !s.is_empty()) {
            Some(sequence) => format!(
                "move {}{} {}→{}",
                from,
                to,
                crate::card::sequence_shorthand(&sequence.cards),
                board.move_target(board.clamp_location(target))
            ),
            None => format!("move {}{}", from, to),
        };
        Ok(board.record(Action::Invalid(body), Vec::new()))
    }

    /// Re-executes one canonical action text.
    ///
    /// Moves are located by their cards rather than re-derived from positions, so any
    /// recorded move replays exactly; the produced text must match the input.
    pub fn apply_action(&self, text: &str) -> Result<Board, EngineError> {
        let action: Action = text.parse()?;
        let next = match &action {
            Action::Shuffle { seed } => self.shuffle32(*seed)?,
            Action::Deal(DealAmount::All) => self.deal_all(),
            Action::Deal(DealAmount::Most) => self.deal_most(),
            Action::Deal(DealAmount::Count(count)) => self.deal(*count),
            Action::Move { from, to, cards, .. } => self.replay_move(*from, *to, cards)?,
            Action::AutoFoundation(_) => self.auto_foundation_all(),
            Action::Init(_) => {
                return Err(EngineError::history(
                    HistoryStage::Replay,
                    format!("unexpected \"{}\" after the first entry", text),
                ))
            }
            _ => return Ok(self.clone()),
        };
        if next.previous_action.text != text {
            return Err(EngineError::history(
                HistoryStage::Replay,
                format!("expected \"{}\", replay produced \"{}\"", text, next.previous_action.text),
            ));
        }
        Ok(next)
    }

    fn replay_move(&self, from: char, to: char, faces: &[Face]) -> Result<Board, EngineError> {
        let replay_error = |detail: String| EngineError::history(HistoryStage::Replay, detail);
        let &(rank, suit) = faces
            .first()
            .ok_or_else(|| replay_error("move without cards".to_string()))?;
        let head = *self.card(rank, suit);
        if self.position(head.location) != from {
            return Err(replay_error(format!("{} is not at {}", head, from)));
        }
        let sequence = self.sequence_at(head.location);
        if Action::faces(&sequence.cards) != faces || !sequence.can_move {
            return Err(replay_error(format!("cannot pick up {:?} from {}", faces, from)));
        }
        let target = parse_position(to, self.config.cell_count, self.config.cascade_count)?;
        let destination = self
            .find_available_moves(&sequence)
            .into_iter()
            .map(|m| m.location)
            .find(|&location| same_slot(location, target))
            .ok_or_else(|| replay_error(format!("{} cannot move to {}", head, to)))?;
        Ok(self.clear_selection().execute_move(&sequence, destination))
    }

    /// Rebuilds a board from a history that starts with `init`.
    ///
    /// # Examples
    /// ```
    /// use freecell_engine::engine::{Board, BoardConfig};
    /// let board = Board::new().shuffle32(617).unwrap().deal_all();
    /// let replayed = Board::replay(BoardConfig::default(), board.history()).unwrap();
    /// assert_eq!(replayed.cards(), board.cards());
    /// ```
    pub fn replay(config: BoardConfig, history: &[String]) -> Result<Board, EngineError> {
        let mut board = Board::with_config(config)?;
        let Some((first, rest)) = history.split_first() else {
            return Err(EngineError::history(HistoryStage::Format, "history is empty"));
        };
        if first != "init" {
            return Err(EngineError::history(
                HistoryStage::Format,
                format!("history starts with \"{}\" instead of \"init\"", first),
            ));
        }
        for text in rest {
            board = board.apply_action(text)?;
        }
        if board.history != history {
            return Err(EngineError::history(
                HistoryStage::Moves,
                "replayed history differs from the recorded one",
            ));
        }
        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionType;

    fn game(seed: u32) -> Board {
        Board::new().shuffle32(seed).unwrap().deal_all()
    }

    #[test]
    fn test_undo_scenario_move() {
        let board = game(5);
        let moved = board.move_by_position('5', '3').unwrap();
        assert_eq!(moved.previous_action().text, "move 53 6H→7C (auto-foundation 2 AD)");
        let undone = moved.undo().unwrap();
        assert_eq!(undone.cards(), board.cards());
        assert_eq!(undone.history(), board.history());
        assert_eq!(undone.previous_action().text, "deal all cards");
        assert_eq!(undone.previous_action().game_function, Some(GameFunction::Undo));
    }

    #[test]
    fn test_undo_deal_and_shuffle() {
        let board = Board::new();
        let shuffled = board.shuffle32(1).unwrap();
        let dealt = shuffled.deal_all();
        let undealt = dealt.undo().unwrap();
        assert_eq!(undealt.cards(), shuffled.cards());
        let unshuffled = undealt.undo().unwrap();
        assert_eq!(unshuffled.cards(), board.cards());
        assert_eq!(unshuffled.history(), ["init"]);
        // init cannot be undone
        assert_eq!(unshuffled.undo().unwrap(), unshuffled);
    }

    #[test]
    fn test_undo_partial_and_most_deals() {
        let board = Board::new();
        let partial = board.deal(11).deal(5);
        let undone = partial.undo().unwrap();
        assert_eq!(undone.cards(), board.deal(11).cards());
        let most = board.deal_most();
        assert_eq!(most.undo().unwrap().cards(), board.cards());
    }

    #[test]
    fn test_undo_standalone_auto_foundation() {
        let board = Board::new().deal_all();
        let won = board.auto_foundation_all();
        let undone = won.undo().unwrap();
        assert_eq!(undone.cards(), board.cards());
    }

    #[test]
    fn test_undo_ignores_non_history_actions() {
        let board = game(5).touch_by_position('1').unwrap();
        assert_eq!(board.previous_action().action_type, ActionType::Select);
        let undone = board.undo().unwrap();
        // the deal is the last history entry, so it is the one undone
        assert_eq!(undone.history(), ["init", "shuffle deck (5)"]);
    }

    #[test]
    fn test_undo_corrupt_history() {
        let mut board = game(5);
        board.history.push("move 53 AH→7C".to_string());
        assert!(matches!(
            board.undo(),
            Err(EngineError::InvalidHistory {
                stage: HistoryStage::Undo,
                ..
            })
        ));
        board.history.push("gibberish".to_string());
        assert_eq!(
            board.undo(),
            Err(EngineError::InvalidAction("gibberish".to_string()))
        );
    }

    #[test]
    fn test_compaction_merges_and_drops() {
        // column 8 stays empty after dealing seven cards
        let board = Board::new().deal(7);
        let parked = board.move_by_position('5', '8').unwrap();
        assert_eq!(parked.history().last().unwrap(), "move 58 QS→cascade");

        let returned = parked.move_by_position('8', '5').unwrap();
        assert_eq!(returned.previous_action().text, "move 85 QS→cascade");
        assert_eq!(returned.history(), board.history());

        let merged = parked.move_by_position('8', '2').unwrap();
        assert_eq!(merged.previous_action().text, "move 82 QS→KH");
        assert_eq!(merged.history().last().unwrap(), "move 52 QS→KH");
        assert_eq!(merged.history().len(), board.history().len() + 1);
        assert_eq!(merged.undo().unwrap().cards(), board.cards());
    }

    #[test]
    fn test_restart_returns_to_deal() {
        let board = game(5);
        let played = board
            .move_by_position('5', '3')
            .unwrap()
            .move_by_position('2', 'a')
            .unwrap();
        let restarted = played.restart().unwrap();
        assert_eq!(restarted.cards(), board.cards());
        assert_eq!(restarted.history(), board.history());
        assert_eq!(
            restarted.previous_action().game_function,
            Some(GameFunction::Restart)
        );
    }

    #[test]
    fn test_move_by_position_invalid() {
        let board = game(5);
        let rejected = board.move_by_position('1', '2').unwrap();
        assert_eq!(rejected.previous_action().text, "invalid move 12 9S→AD");
        let rejected = board.move_by_position('a', '2').unwrap();
        assert_eq!(rejected.previous_action().text, "invalid move a2");
        assert!(board.move_by_position('x', '2').is_err());
    }

    #[test]
    fn test_replay_reproduces_board() {
        let board = game(5)
            .move_by_position('5', '3')
            .unwrap()
            .move_by_position('2', 'a')
            .unwrap();
        let replayed = Board::replay(BoardConfig::default(), board.history()).unwrap();
        assert_eq!(replayed.cards(), board.cards());
        assert_eq!(replayed.history(), board.history());
    }

    #[test]
    fn test_replay_rejects_wrong_text() {
        let history: Vec<String> = ["init", "shuffle deck (5)", "deal all cards", "move 53 6H→7C"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let err = Board::replay(BoardConfig::default(), &history).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidHistory {
                stage: HistoryStage::Replay,
                ..
            }
        ));
        let err = Board::replay(BoardConfig::default(), &history[1..]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidHistory {
                stage: HistoryStage::Format,
                ..
            }
        ));
    }
}
