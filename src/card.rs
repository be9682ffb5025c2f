//! Card identity, fixture locations and the shorthand codecs built on them.
//!
//! This module defines:
//! - `Rank` and `Suit`: the 13 ordered ranks (ace low) and the four suits with their fixed colouring.
//! - `Location`: which fixture (deck, cell, foundation, cascade) a card sits in, and where.
//! - `Card`: an immutable `(rank, suit, location)` record.
//! - The two-character card shorthand (`"KH"`), the single-character position shorthand
//!   (`'a'`..`'f'` for cells, `'h'` for the foundation, `'1'`..`'0'` for cascades, `'k'` for the deck)
//!   and a bounded-integer symbol encoder used to pack a row or index next to a position.
use crate::error::EngineError;
use std::fmt;

/// Number of cards in the deck.
pub const DECK_SIZE: usize = 52;

/// Number of foundations (one per suit, although any empty foundation accepts any ace).
pub const FOUNDATION_COUNT: usize = 4;

/// Position characters for cells, in index order.
const CELL_POSITIONS: [char; 6] = ['a', 'b', 'c', 'd', 'e', 'f'];

/// Position characters for cascades, in column order.
const CASCADE_POSITIONS: [char; 10] = ['1', '2', '3', '4', '5', '6', '7', '8', '9', '0'];

const FOUNDATION_POSITION: char = 'h';
const DECK_POSITION: char = 'k';

/// First code point produced by `int_to_symbol`.
const SYMBOL_OFFSET: u32 = 0x21;

/// One of the four suits.
///
/// The declaration order (`C D H S`) is the order used to build a fresh deck.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    /// All suits in fresh-deck order.
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

    /// Returns `true` for diamonds and hearts.
    pub fn is_red(self) -> bool {
        matches!(self, Suit::Diamonds | Suit::Hearts)
    }

    /// Zero-based position of the suit in `Suit::ALL`.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Converts the suit to its shorthand character.
    ///
    /// # Examples
    /// ```
    /// use freecell_engine::card::Suit;
    /// assert_eq!(Suit::Hearts.to_char(), 'H');
    /// ```
    pub fn to_char(self) -> char {
        match self {
            Suit::Clubs => 'C',
            Suit::Diamonds => 'D',
            Suit::Hearts => 'H',
            Suit::Spades => 'S',
        }
    }

    /// Parses a shorthand suit character.
    pub fn from_char(c: char) -> Option<Suit> {
        match c {
            'C' => Some(Suit::Clubs),
            'D' => Some(Suit::Diamonds),
            'H' => Some(Suit::Hearts),
            'S' => Some(Suit::Spades),
            _ => None,
        }
    }
}

/// One of the 13 ordered ranks, ace low and king high.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Ace = 1,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

impl Rank {
    /// All ranks in ascending order.
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    /// Numeric value, 1 for ace through 13 for king.
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Inverse of `value`.
    pub fn from_value(value: u8) -> Option<Rank> {
        Rank::ALL.get(usize::from(value).checked_sub(1)?).copied()
    }

    /// Converts the rank to its shorthand character (`'A'`, `'2'`..`'9'`, `'T'`, `'J'`, `'Q'`, `'K'`).
    pub fn to_char(self) -> char {
        match self {
            Rank::Ace => 'A',
            Rank::Two => '2',
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
        }
    }

    /// Parses a shorthand rank character.
    pub fn from_char(c: char) -> Option<Rank> {
        Rank::ALL.into_iter().find(|rank| rank.to_char() == c)
    }
}

/// Returns `true` iff `max` is exactly one rank above `min`.
///
/// # Examples
/// ```
/// use freecell_engine::card::{is_adjacent, Rank};
/// assert!(is_adjacent(Rank::Ace, Rank::Two));
/// assert!(!is_adjacent(Rank::Two, Rank::Ace));
/// assert!(!is_adjacent(Rank::Queen, Rank::Queen));
/// ```
pub fn is_adjacent(min: Rank, max: Rank) -> bool {
    max.value() == min.value() + 1
}

/// Returns `true` for the red suits.
pub fn is_red(suit: Suit) -> bool {
    suit.is_red()
}

/// The kind of fixture a location refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Fixture {
    Deck,
    Cell,
    Foundation,
    Cascade,
}

impl fmt::Display for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Fixture::Deck => "deck",
            Fixture::Cell => "cell",
            Fixture::Foundation => "foundation",
            Fixture::Cascade => "cascade",
        };
        f.write_str(name)
    }
}

/// Where a card sits. Every card has exactly one location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Location {
    /// Index into the undealt deck; index 0 is the bottom, dealing pops the highest index.
    Deck(usize),
    /// A free cell.
    Cell(usize),
    /// A foundation pile; every card of the pile shares the same location.
    Foundation(usize),
    /// A tableau column and the row within it (row 0 is the card dealt first).
    Cascade { column: usize, row: usize },
}

impl Location {
    /// The fixture this location belongs to.
    pub fn fixture(&self) -> Fixture {
        match self {
            Location::Deck(_) => Fixture::Deck,
            Location::Cell(_) => Fixture::Cell,
            Location::Foundation(_) => Fixture::Foundation,
            Location::Cascade { .. } => Fixture::Cascade,
        }
    }

    /// The index within the fixture (the column for cascades).
    pub fn index(&self) -> usize {
        match *self {
            Location::Deck(index) | Location::Cell(index) | Location::Foundation(index) => index,
            Location::Cascade { column, .. } => column,
        }
    }

    /// JSON-like rendering used in error messages, e.g. `{"fixture":"cascade","data":[3,0]}`.
    pub fn to_json(&self) -> String {
        match *self {
            Location::Cascade { column, row } => {
                format!("{{\"fixture\":\"{}\",\"data\":[{},{}]}}", self.fixture(), column, row)
            }
            _ => format!("{{\"fixture\":\"{}\",\"data\":[{}]}}", self.fixture(), self.index()),
        }
    }
}

/// A card and where it currently sits.
///
/// Cards are plain values: moving a card produces a copy with a new `location`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
    pub location: Location,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit, location: Location) -> Self {
        Card {
            rank,
            suit,
            location,
        }
    }

    /// The `(rank, suit)` identity of the card, ignoring its location.
    pub fn face(&self) -> (Rank, Suit) {
        (self.rank, self.suit)
    }

    /// Position of this face in a fresh deck (`rank * 4 + suit`, zero-based).
    pub fn face_index(&self) -> usize {
        face_index(self.rank, self.suit)
    }

    /// Returns `true` if both cards have the same rank and suit.
    pub fn same_face(&self, other: &Card) -> bool {
        self.face() == other.face()
    }

    pub fn is_red(&self) -> bool {
        self.suit.is_red()
    }

    /// Returns `true` if this card may rest on `below` in a cascade:
    /// opposite colours and `below` exactly one rank higher.
    pub fn can_stack_on(&self, below: &Card) -> bool {
        self.is_red() != below.is_red() && is_adjacent(self.rank, below.rank)
    }

    /// A copy of the card at a different location.
    pub fn with_location(self, location: Location) -> Card {
        Card { location, ..self }
    }

    /// The two-character shorthand, e.g. `"TD"`.
    pub fn shorthand(&self) -> String {
        face_shorthand(self.rank, self.suit)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.to_char(), self.suit.to_char())
    }
}

/// Position of a face in a fresh deck.
pub fn face_index(rank: Rank, suit: Suit) -> usize {
    (usize::from(rank.value()) - 1) * 4 + suit.index()
}

/// The face at a fresh-deck position. Returns `None` past the end of the deck.
pub fn face_at(index: usize) -> Option<(Rank, Suit)> {
    if index >= DECK_SIZE {
        return None;
    }
    let rank = Rank::ALL[index / 4];
    let suit = Suit::ALL[index % 4];
    Some((rank, suit))
}

/// Two-character shorthand for a face.
pub fn face_shorthand(rank: Rank, suit: Suit) -> String {
    let mut text = String::with_capacity(2);
    text.push(rank.to_char());
    text.push(suit.to_char());
    text
}

/// Two-character shorthand for a slot that may be empty; an empty slot is two spaces.
///
/// # Examples
/// ```
/// use freecell_engine::card::{shorthand, Card, Location, Rank, Suit};
/// let card = Card::new(Rank::Ten, Suit::Diamonds, Location::Cell(0));
/// assert_eq!(shorthand(Some(&card)), "TD");
/// assert_eq!(shorthand(None), "  ");
/// ```
pub fn shorthand(card: Option<&Card>) -> String {
    match card {
        Some(card) => card.shorthand(),
        None => "  ".to_string(),
    }
}

/// Parses a two-character card shorthand into its face.
///
/// # Returns
/// * `Ok((rank, suit))` on success.
/// * `Err(EngineError::InvalidRank)` / `Err(EngineError::InvalidSuit)` naming the offending
///   character, or `Err(EngineError::InvalidShorthand)` when the text is not two characters long.
///
/// # Examples
/// ```
/// use freecell_engine::card::{parse_shorthand, Rank, Suit};
/// use freecell_engine::error::EngineError;
/// assert_eq!(parse_shorthand("QS"), Ok((Rank::Queen, Suit::Spades)));
/// assert_eq!(parse_shorthand("XS"), Err(EngineError::InvalidRank('X')));
/// assert_eq!(parse_shorthand("QX"), Err(EngineError::InvalidSuit('X')));
/// ```
pub fn parse_shorthand(text: &str) -> Result<(Rank, Suit), EngineError> {
    let mut chars = text.chars();
    let (Some(rank_char), Some(suit_char), None) = (chars.next(), chars.next(), chars.next()) else {
        return Err(EngineError::InvalidShorthand(text.to_string()));
    };
    let rank = Rank::from_char(rank_char).ok_or(EngineError::InvalidRank(rank_char))?;
    let suit = Suit::from_char(suit_char).ok_or(EngineError::InvalidSuit(suit_char))?;
    Ok((rank, suit))
}

/// Shorthand for a run of cards: the card codes joined by `-`.
pub fn sequence_shorthand(cards: &[Card]) -> String {
    cards
        .iter()
        .map(Card::shorthand)
        .collect::<Vec<_>>()
        .join("-")
}

/// Inverse of `sequence_shorthand`.
pub fn parse_sequence_shorthand(text: &str) -> Result<Vec<(Rank, Suit)>, EngineError> {
    text.split('-').map(parse_shorthand).collect()
}

/// Maps a location to its single position character.
///
/// Cells map to `'a'`.., the foundation to `'h'`, the deck to `'k'` and cascades to
/// `'1'`..`'9'`, `'0'`. Fails with the location's JSON rendering when the index lies
/// outside the configured board.
///
/// # Examples
/// ```
/// use freecell_engine::card::{position_shorthand, Location};
/// assert_eq!(position_shorthand(Location::Cell(1), 4, 8), Ok('b'));
/// assert_eq!(position_shorthand(Location::Cascade { column: 9, row: 3 }, 4, 10), Ok('0'));
/// assert!(position_shorthand(Location::Cascade { column: 8, row: 0 }, 4, 8).is_err());
/// ```
pub fn position_shorthand(
    location: Location,
    cell_count: usize,
    cascade_count: usize,
) -> Result<char, EngineError> {
    let out_of_bounds = || EngineError::InvalidPosition(location.to_json());
    match location {
        Location::Deck(_) => Ok(DECK_POSITION),
        Location::Foundation(index) if index < FOUNDATION_COUNT => Ok(FOUNDATION_POSITION),
        Location::Cell(index) if index < cell_count.min(CELL_POSITIONS.len()) => {
            Ok(CELL_POSITIONS[index])
        }
        Location::Cascade { column, .. } if column < cascade_count.min(CASCADE_POSITIONS.len()) => {
            Ok(CASCADE_POSITIONS[column])
        }
        _ => Err(out_of_bounds()),
    }
}

/// Inverse of `position_shorthand`.
///
/// The foundation parses as `Foundation(0)`, the deck as `Deck(0)` and cascades as row 0.
pub fn parse_position(
    position: char,
    cell_count: usize,
    cascade_count: usize,
) -> Result<Location, EngineError> {
    if position == FOUNDATION_POSITION {
        return Ok(Location::Foundation(0));
    }
    if position == DECK_POSITION {
        return Ok(Location::Deck(0));
    }
    if let Some(index) = CELL_POSITIONS.iter().position(|&c| c == position) {
        if index < cell_count {
            return Ok(Location::Cell(index));
        }
    }
    if let Some(column) = CASCADE_POSITIONS.iter().position(|&c| c == position) {
        if column < cascade_count {
            return Ok(Location::Cascade { column, row: 0 });
        }
    }
    Err(EngineError::InvalidPosition(format!("'{}'", position)))
}

/// Encodes a bounded integer as one printable symbol by a fixed code-point offset.
///
/// Returns `None` only when the shifted value is not a valid `char`.
///
/// # Examples
/// ```
/// use freecell_engine::card::{int_to_symbol, symbol_to_int};
/// assert_eq!(int_to_symbol(0), Some('!'));
/// assert_eq!(int_to_symbol(16), Some('1'));
/// assert_eq!(symbol_to_int('1'), 16);
/// ```
pub fn int_to_symbol(value: u32) -> Option<char> {
    char::from_u32(value.checked_add(SYMBOL_OFFSET)?)
}

/// Exact inverse of `int_to_symbol`. Symbols below the offset wrap to large values.
pub fn symbol_to_int(symbol: char) -> u32 {
    u32::from(symbol).wrapping_sub(SYMBOL_OFFSET)
}

/// Position character followed by a symbol for the secondary index:
/// the row for cascades, the pile for the foundation, the index for the deck.
/// Cells already carry their index and get no second symbol.
pub fn position_shorthand_extended(
    location: Location,
    cell_count: usize,
    cascade_count: usize,
) -> Result<String, EngineError> {
    let position = position_shorthand(location, cell_count, cascade_count)?;
    let secondary = match location {
        Location::Cell(_) => None,
        Location::Foundation(index) | Location::Deck(index) => Some(index),
        Location::Cascade { row, .. } => Some(row),
    };
    let mut text = String::from(position);
    if let Some(value) = secondary {
        let symbol = u32::try_from(value)
            .ok()
            .and_then(int_to_symbol)
            .ok_or_else(|| EngineError::InvalidPosition(location.to_json()))?;
        text.push(symbol);
    }
    Ok(text)
}

/// Inverse of `position_shorthand_extended`.
pub fn parse_position_extended(
    text: &str,
    cell_count: usize,
    cascade_count: usize,
) -> Result<Location, EngineError> {
    let mut chars = text.chars();
    let position = chars
        .next()
        .ok_or_else(|| EngineError::InvalidPosition(format!("\"{}\"", text)))?;
    let location = parse_position(position, cell_count, cascade_count)?;
    let secondary = chars.next().map(symbol_to_int).map(|v| v as usize);
    if chars.next().is_some() {
        return Err(EngineError::InvalidPosition(format!("\"{}\"", text)));
    }
    Ok(match (location, secondary) {
        (Location::Cell(index), None) => Location::Cell(index),
        (Location::Foundation(_), Some(index)) => Location::Foundation(index),
        (Location::Deck(_), Some(index)) => Location::Deck(index),
        (Location::Cascade { column, .. }, Some(row)) => Location::Cascade { column, row },
        _ => return Err(EngineError::InvalidPosition(format!("\"{}\"", text))),
    })
}
