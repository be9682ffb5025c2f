//! Plain-text board notation.
//!
//! A printed board is a block of fixed-width rows. Each row alternates one separator
//! character and one two-character card code, starting and ending with a separator:
//!
//! ```text
//! >KC          QC KD QH JS
//!  KS KH
//!     QS
//! :h shuffle32 5
//! : 53 2a
//! ```
//!
//! The first row holds the free cells followed by the four foundations (top card shown).
//! Then come the tableau rows, an optional `:d` deck row and an optional history section.
//! Separators mark the cursor (`>`, left of its slot), the selection (`|` on both sides)
//! and highlighted cards (`*`).
use crate::action::{Action, ActionType, InitKind, PreviousAction};
use crate::card::{
    face_index, face_shorthand, parse_shorthand, shorthand, Location, Rank, Suit,
    FOUNDATION_COUNT,
};
use crate::engine::{Board, BoardConfig};
use crate::error::{EngineError, HistoryStage};
use log::{debug, warn};
use std::collections::HashSet;
use std::fmt;

const WIN_BANNER: &str = "Y O U   W I N !";

/// Move pairs per history line in the compact form.
const PAIRS_PER_LINE: usize = 10;

/// Options for `Board::print`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrintOptions {
    /// Append the history section (compact when it validates, verbatim otherwise).
    pub include_history: bool,
    /// Slots to flag with `*`.
    pub highlight: Vec<Location>,
}

impl PrintOptions {
    pub fn with_history() -> Self {
        PrintOptions {
            include_history: true,
            highlight: Vec::new(),
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print(&PrintOptions::default()))
    }
}

/// A history that can be written as a seed and move pairs.
type CompactHistory = (u32, Vec<(char, char)>);

impl Board {
    /// Renders the board, one `\n`-terminated line per row.
    ///
    /// # Examples
    /// ```
    /// use freecell_engine::engine::Board;
    /// use freecell_engine::notation::PrintOptions;
    /// let board = Board::new().shuffle32(1).unwrap().deal_all();
    /// let text = board.print(&PrintOptions::with_history());
    /// assert_eq!(text.lines().nth(1), Some(" JD 2D 9H JC 5D 7H 7C 5H "));
    /// assert!(text.ends_with(":h shuffle32 1\n"));
    /// assert_eq!(Board::parse(&text).unwrap().history(), board.history());
    /// ```
    pub fn print(&self, options: &PrintOptions) -> String {
        let cells = self.config.cell_count;
        let columns = self.config.cascade_count;
        let mut lines = Vec::new();

        let home: Vec<Location> = (0..cells)
            .map(Location::Cell)
            .chain((0..FOUNDATION_COUNT).map(Location::Foundation))
            .collect();
        lines.push(self.render_row(&home, &options.highlight));

        if self.is_won() {
            let width = 3 * columns + 1;
            let pad = width.saturating_sub(WIN_BANNER.len()) / 2;
            lines.push(format!("{}{}", " ".repeat(pad), WIN_BANNER));
        }

        let rows = self.tableau.iter().map(Vec::len).max().unwrap_or(0).max(1);
        for row in 0..rows {
            let slots: Vec<Location> = (0..columns)
                .map(|column| Location::Cascade { column, row })
                .collect();
            lines.push(self.render_row(&slots, &options.highlight));
        }

        if !self.deck.is_empty() {
            let slots: Vec<Location> = (0..self.deck.len()).map(Location::Deck).collect();
            lines.push(format!(":d{}", self.render_row(&slots, &options.highlight)));
        }

        if options.include_history {
            lines.extend(self.history_lines());
        }

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }

    fn render_row(&self, slots: &[Location], highlight: &[Location]) -> String {
        let mut text = String::with_capacity(slots.len() * 3 + 1);
        for i in 0..=slots.len() {
            let before = i.checked_sub(1).map(|j| slots[j]);
            let after = slots.get(i).copied();
            text.push(self.separator(before, after, highlight));
            if let Some(location) = after {
                text.push_str(&shorthand(self.card_at(location)));
            }
        }
        text
    }

    fn separator(
        &self,
        before: Option<Location>,
        after: Option<Location>,
        highlight: &[Location],
    ) -> char {
        let either = |test: &dyn Fn(Location) -> bool| {
            before.map_or(false, test) || after.map_or(false, test)
        };
        if after == Some(self.cursor) {
            '>'
        } else if either(&|location| self.is_selected(location)) {
            '|'
        } else if either(&|location| highlight.contains(&location)) {
            '*'
        } else {
            ' '
        }
    }

    fn is_selected(&self, location: Location) -> bool {
        let Some(selection) = &self.selection else {
            return false;
        };
        match (selection.location, location) {
            (Location::Cascade { column, row }, Location::Cascade { column: c, row: r }) => {
                column == c && r >= row && r < row + selection.len()
            }
            (selected, location) => selected == location,
        }
    }

    fn history_lines(&self) -> Vec<String> {
        match self.compact_history() {
            Ok((seed, pairs)) => compact_lines(seed, &pairs),
            Err(err) => {
                match err {
                    EngineError::InvalidHistory {
                        stage: HistoryStage::Format,
                        ..
                    } => debug!("writing history verbatim: {}", err),
                    _ => warn!("compact history did not validate, writing it verbatim: {}", err),
                }
                self.history.iter().map(|text| format!(": {}", text)).collect()
            }
        }
    }

    /// The seed and move pairs for this board's history, when replaying them from scratch
    /// reproduces the cards, the last action and the full history.
    fn compact_history(&self) -> Result<CompactHistory, EngineError> {
        let (seed, pairs) = compact_form(&self.history)?;
        let replayed = replay_compact(self.config, seed, &pairs)?;
        if replayed.cards != self.cards {
            return Err(EngineError::history(HistoryStage::Cards, "replayed cards differ"));
        }
        if self.history.last() != Some(&replayed.previous_action.text) {
            return Err(EngineError::history(
                HistoryStage::PreviousAction,
                format!("replay ended with \"{}\"", replayed.previous_action.text),
            ));
        }
        if replayed.history != self.history {
            return Err(EngineError::history(HistoryStage::Moves, "replayed moves differ"));
        }
        Ok((seed, pairs))
    }

    /// Parses a printed board with the default configuration.
    ///
    /// Cell and cascade counts always come from the layout itself; `parse_with_config`
    /// supplies the auto-foundation settings used to replay history.
    pub fn parse(text: &str) -> Result<Board, EngineError> {
        Board::parse_with_config(text, BoardConfig::default())
    }

    /// Parses a printed board, failing on any history problem.
    pub fn parse_with_config(text: &str, config: BoardConfig) -> Result<Board, EngineError> {
        let layout = Layout::read(text)?;
        let board = layout.board(config)?;
        let board = layout.attach_history(board)?;
        Ok(layout.place_cursor(board))
    }

    /// Parses a printed board, replacing a history that fails validation with
    /// `init with invalid history`. Layout errors still fail.
    pub fn parse_lenient(text: &str, config: BoardConfig) -> Result<Board, EngineError> {
        let layout = Layout::read(text)?;
        let board = layout.board(config)?;
        let board = match layout.attach_history(board.clone()) {
            Ok(board) => board,
            Err(err) => {
                debug!("dropping history: {}", err);
                let mut board = board;
                let init = Action::Init(InitKind::InvalidHistory);
                board.history = vec![init.to_string()];
                board.previous_action = PreviousAction::new(&init);
                board
            }
        };
        Ok(layout.place_cursor(board))
    }
}

fn compact_lines(seed: u32, pairs: &[(char, char)]) -> Vec<String> {
    let mut lines = vec![format!(":h shuffle32 {}", seed)];
    for chunk in pairs.chunks(PAIRS_PER_LINE) {
        let tokens: Vec<String> = chunk
            .iter()
            .map(|&(from, to)| format!("{}{}", from, to))
            .collect();
        lines.push(format!(": {}", tokens.join(" ")));
    }
    lines
}

/// Splits a history into a seed and move pairs, if it has the compact shape
/// `init`, `shuffle deck (<seed>)`, `deal all cards`, then moves only.
fn compact_form(history: &[String]) -> Result<CompactHistory, EngineError> {
    let format_error = |detail: &str| EngineError::history(HistoryStage::Format, detail);
    let [init, shuffle, deal, moves @ ..] = history else {
        return Err(format_error("history is shorter than a deal"));
    };
    if init != "init" || deal != "deal all cards" {
        return Err(format_error("history does not start with a full deal"));
    }
    let Ok(Action::Shuffle { seed }) = shuffle.parse::<Action>() else {
        return Err(format_error("history has no shuffle seed"));
    };
    let pairs = moves
        .iter()
        .map(|text| match text.parse::<Action>() {
            Ok(Action::Move { from, to, .. }) => Ok((from, to)),
            _ => Err(format_error("history contains more than moves")),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((seed, pairs))
}

/// Deals `seed` and plays the pairs by position.
fn replay_compact(
    config: BoardConfig,
    seed: u32,
    pairs: &[(char, char)],
) -> Result<Board, EngineError> {
    let mut board = Board::with_config(config)?.shuffle32(seed)?.deal_all();
    for &(from, to) in pairs {
        board = board.move_by_position(from, to)?;
        if !matches!(
            board.previous_action.action_type,
            ActionType::Move | ActionType::MoveFoundation
        ) {
            return Err(EngineError::history(
                HistoryStage::Replay,
                format!("{}{}: {}", from, to, board.previous_action.text),
            ));
        }
    }
    Ok(board)
}

/// One slot of a printed row.
struct Slot {
    left: char,
    right: char,
    card: Option<(Rank, Suit)>,
}

impl Slot {
    fn is_selected_candidate(&self) -> bool {
        let marks = |c: char| c == '|' || c == '>';
        marks(self.left) && marks(self.right) && (self.left == '|' || self.right == '|')
    }
}

fn read_row(line: &str, line_number: usize) -> Result<Vec<Slot>, EngineError> {
    let chars: Vec<char> = line.chars().collect();
    let count = (chars.len() + 1) / 3;
    let at = |i: usize| chars.get(i).copied().unwrap_or(' ');
    for i in (0..chars.len()).step_by(3) {
        if !matches!(chars[i], ' ' | '>' | '|' | '*') {
            return Err(EngineError::malformed(
                line_number,
                format!("unexpected separator '{}'", chars[i]),
            ));
        }
    }
    (0..count)
        .map(|i| {
            let code: String = [at(3 * i + 1), at(3 * i + 2)].iter().collect();
            let card = if code == "  " {
                None
            } else {
                Some(parse_shorthand(&code)?)
            };
            Ok(Slot {
                left: at(3 * i),
                right: at(3 * i + 3),
                card,
            })
        })
        .collect()
}

/// The single selected slot of a row, if any. When the cursor sits beside the selection
/// two slots qualify; the one enclosed by `|` on both sides wins.
fn selected_slot(slots: &[Slot]) -> Option<usize> {
    let candidates: Vec<usize> = (0..slots.len())
        .filter(|&i| slots[i].is_selected_candidate())
        .collect();
    candidates
        .iter()
        .copied()
        .find(|&i| slots[i].left == '|' && slots[i].right == '|')
        .or_else(|| candidates.first().copied())
}

fn cursor_slot(slots: &[Slot]) -> Option<usize> {
    slots.iter().position(|slot| slot.left == '>')
}

enum HistorySection {
    Missing,
    Compact(CompactHistory),
    Verbatim(Vec<String>),
}

/// Everything read from the text before any board is built.
struct Layout {
    cell_count: usize,
    cascade_count: usize,
    placements: Vec<(Rank, Suit, Location)>,
    has_deck: bool,
    cursor: Option<Location>,
    selected: Option<Location>,
    history: HistorySection,
}

impl Layout {
    fn read(text: &str) -> Result<Layout, EngineError> {
        let mut lines: Vec<&str> = text.lines().collect();
        while lines.last() == Some(&"") {
            lines.pop();
        }
        let home_line = lines.first().ok_or_else(|| EngineError::malformed(1, "empty board"))?;
        let home = read_row(home_line, 1)?;
        if home.len() <= FOUNDATION_COUNT {
            return Err(EngineError::malformed(1, "home row needs cells and four foundations"));
        }
        let cell_count = home.len() - FOUNDATION_COUNT;
        let home_location = |i: usize| {
            if i < cell_count {
                Location::Cell(i)
            } else {
                Location::Foundation(i - cell_count)
            }
        };

        let mut placements = Vec::new();
        let mut cursor = cursor_slot(&home).map(home_location);
        let mut selected = selected_slot(&home).map(home_location);
        for (i, slot) in home.iter().enumerate() {
            let Some((rank, suit)) = slot.card else { continue };
            match home_location(i) {
                Location::Foundation(index) => {
                    for value in 1..=rank.value() {
                        if let Some(lower) = Rank::from_value(value) {
                            placements.push((lower, suit, Location::Foundation(index)));
                        }
                    }
                }
                location => placements.push((rank, suit, location)),
            }
        }

        let mut index = 1;
        if lines.get(index).map_or(false, |line| line.trim() == WIN_BANNER) {
            index += 1;
        }

        let mut rows = Vec::new();
        while let Some(line) = lines.get(index).filter(|line| !line.starts_with(':')) {
            rows.push((index + 1, read_row(line, index + 1)?));
            index += 1;
        }
        if rows.is_empty() {
            return Err(EngineError::malformed(index + 1, "missing tableau"));
        }
        let cascade_count = rows.iter().map(|(_, slots)| slots.len()).max().unwrap_or(0);
        let mut ended = vec![false; cascade_count];
        for (row, (line_number, slots)) in rows.iter().enumerate() {
            if let Some(column) = cursor_slot(slots) {
                cursor = Some(Location::Cascade { column, row });
            }
            if let Some(column) = selected_slot(slots) {
                selected = selected.or(Some(Location::Cascade { column, row }));
            }
            for column in 0..cascade_count {
                match slots.get(column).and_then(|slot| slot.card) {
                    Some((rank, suit)) if !ended[column] => {
                        placements.push((rank, suit, Location::Cascade { column, row }))
                    }
                    Some(_) => {
                        return Err(EngineError::malformed(
                            *line_number,
                            format!("gap in cascade {}", column + 1),
                        ))
                    }
                    None => ended[column] = true,
                }
            }
        }

        let mut has_deck = false;
        if let Some(rest) = lines.get(index).and_then(|line| line.strip_prefix(":d")) {
            let slots = read_row(rest, index + 1)?;
            for (i, slot) in slots.iter().enumerate() {
                let (rank, suit) = slot
                    .card
                    .ok_or_else(|| EngineError::malformed(index + 1, "gap in deck"))?;
                placements.push((rank, suit, Location::Deck(i)));
            }
            if let Some(i) = cursor_slot(&slots) {
                cursor = Some(Location::Deck(i));
            }
            if let Some(i) = selected_slot(&slots) {
                selected = selected.or(Some(Location::Deck(i)));
            }
            has_deck = !slots.is_empty();
            index += 1;
        }

        let history = read_history(&lines[index..], index + 1)?;
        Ok(Layout {
            cell_count,
            cascade_count,
            placements,
            has_deck,
            cursor,
            selected,
            history,
        })
    }

    /// Builds the card arrangement, checking that every card appears exactly once.
    fn board(&self, config: BoardConfig) -> Result<Board, EngineError> {
        let mut seen = HashSet::new();
        for &(rank, suit, _) in &self.placements {
            if !seen.insert((rank, suit)) {
                return Err(EngineError::DuplicateCard(face_shorthand(rank, suit)));
            }
        }
        if self.placements.len() != crate::card::DECK_SIZE {
            return Err(EngineError::CardCount {
                found: self.placements.len(),
            });
        }
        let config = BoardConfig {
            cell_count: self.cell_count,
            cascade_count: self.cascade_count,
            ..config
        };
        let board = Board::with_config(config)?;
        let mut cards = board.cards.clone();
        for &(rank, suit, location) in &self.placements {
            cards[face_index(rank, suit)].location = location;
        }
        let mut board = board.with_cards(cards);

        let init = Action::Init(if self.has_deck {
            InitKind::Partial
        } else {
            InitKind::HandJammed
        });
        board.history = vec![init.to_string()];
        board.previous_action = PreviousAction::new(&init);
        Ok(board)
    }

    fn attach_history(&self, mut board: Board) -> Result<Board, EngineError> {
        match &self.history {
            HistorySection::Missing => Ok(board),
            HistorySection::Compact((seed, pairs)) => {
                let replayed = replay_compact(board.config, *seed, pairs)?;
                if replayed.cards != board.cards {
                    return Err(EngineError::history(
                        HistoryStage::Cards,
                        format!(
                            "deal {} with {} moves does not reach this board",
                            seed,
                            pairs.len()
                        ),
                    ));
                }
                let (_, replayed_pairs) = compact_form(&replayed.history)?;
                if replayed_pairs != *pairs {
                    return Err(EngineError::history(
                        HistoryStage::Moves,
                        "moves were merged during replay",
                    ));
                }
                if replayed.history.last() != Some(&replayed.previous_action.text) {
                    return Err(EngineError::history(
                        HistoryStage::PreviousAction,
                        format!("replay ended with \"{}\"", replayed.previous_action.text),
                    ));
                }
                board.history = replayed.history;
                board.previous_action = replayed.previous_action;
                Ok(board)
            }
            HistorySection::Verbatim(texts) => {
                if texts.first().map(String::as_str) == Some("init") {
                    let replayed = Board::replay(board.config, texts)?;
                    if replayed.cards != board.cards {
                        return Err(EngineError::history(
                            HistoryStage::Cards,
                            "replayed cards differ",
                        ));
                    }
                    board.previous_action = replayed.previous_action;
                } else {
                    let mut previous = None;
                    for text in texts {
                        previous = Some(PreviousAction::from_text(text)?);
                    }
                    if let Some(previous) = previous {
                        board.previous_action = previous;
                    }
                }
                board.history = texts.clone();
                Ok(board)
            }
        }
    }

    fn place_cursor(&self, mut board: Board) -> Board {
        if let Some(cursor) = self.cursor {
            board.cursor = board.clamp_location(cursor);
        }
        if let Some(location) = self.selected {
            let sequence = board.sequence_at(location);
            if !sequence.is_empty() {
                board.set_selection(sequence);
            }
        }
        board
    }
}

fn read_history(lines: &[&str], first_line: usize) -> Result<HistorySection, EngineError> {
    let Some(first) = lines.first() else {
        return Ok(HistorySection::Missing);
    };
    let format_error = |offset: usize, detail: &str| {
        EngineError::history(
            HistoryStage::Format,
            format!("line {}: {}", first_line + offset, detail),
        )
    };

    if let Some(header) = first.strip_prefix(":h") {
        let mut words = header.split_whitespace();
        let seed = match (words.next(), words.next(), words.next()) {
            (Some("shuffle32"), Some(seed), None) => seed
                .parse::<u32>()
                .map_err(|_| format_error(0, "invalid seed"))?,
            _ => return Err(format_error(0, "expected \"shuffle32 <seed>\"")),
        };
        let mut pairs = Vec::new();
        for (offset, line) in lines.iter().enumerate().skip(1) {
            let tokens = line
                .strip_prefix(':')
                .ok_or_else(|| format_error(offset, "expected a move line"))?;
            for token in tokens.split_whitespace() {
                let mut chars = token.chars();
                match (chars.next(), chars.next(), chars.next()) {
                    (Some(from), Some(to), None) => pairs.push((from, to)),
                    _ => return Err(format_error(offset, "moves are two position characters")),
                }
            }
        }
        return Ok(HistorySection::Compact((seed, pairs)));
    }

    let mut texts = Vec::new();
    for (offset, line) in lines.iter().enumerate() {
        let text = line
            .strip_prefix(':')
            .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
            .filter(|text| !text.is_empty())
            .ok_or_else(|| format_error(offset, "expected \": <action>\""))?;
        texts.push(text.to_string());
    }
    Ok(HistorySection::Verbatim(texts))
}
