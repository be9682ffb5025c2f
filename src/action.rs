//! Canonical action texts.
//!
//! Every state change on a board is described by one line of text, for example
//! `move 53 6H→7C (auto-foundation 2 AD)`. The text is the only thing history stores:
//! undo and replay both work by parsing it back into an `Action`.
use crate::card::{face_shorthand, parse_shorthand, Card, Rank, Suit};
use crate::error::EngineError;
use std::fmt;
use std::str::FromStr;

/// A card identity without a location, as it appears in action text.
pub type Face = (Rank, Suit);

/// Closed set of action kinds, cached next to the text for dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionType {
    Init,
    Shuffle,
    Deal,
    Cursor,
    Select,
    Deselect,
    Move,
    /// A move followed by automatic foundation promotion.
    MoveFoundation,
    AutoFoundation,
    Invalid,
    /// A touch that changed nothing but the cursor and selection.
    Touch,
}

impl ActionType {
    /// Whether actions of this type are recorded in history.
    pub fn is_history_bearing(self) -> bool {
        matches!(
            self,
            ActionType::Init
                | ActionType::Shuffle
                | ActionType::Deal
                | ActionType::Move
                | ActionType::MoveFoundation
                | ActionType::AutoFoundation
        )
    }
}

/// Why the board was (re)initialised.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InitKind {
    Fresh,
    InvalidHistory,
    Partial,
    HandJammed,
}

/// How many cards a deal distributed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DealAmount {
    All,
    Most,
    Count(usize),
}

/// Cursor step directions, plus the two non-step cursor actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CursorAction {
    Up,
    Left,
    Down,
    Right,
    Set,
    Stop,
}

impl CursorAction {
    fn as_str(self) -> &'static str {
        match self {
            CursorAction::Up => "up",
            CursorAction::Left => "left",
            CursorAction::Down => "down",
            CursorAction::Right => "right",
            CursorAction::Set => "set",
            CursorAction::Stop => "stop",
        }
    }

    fn parse(text: &str) -> Option<Self> {
        match text {
            "up" => Some(CursorAction::Up),
            "left" => Some(CursorAction::Left),
            "down" => Some(CursorAction::Down),
            "right" => Some(CursorAction::Right),
            "set" => Some(CursorAction::Set),
            "stop" => Some(CursorAction::Stop),
            _ => None,
        }
    }
}

/// What a move landed on, as written after the arrow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveTarget {
    /// The card the sequence now rests on (cascade tail or foundation top).
    Card(Rank, Suit),
    Cell,
    Foundation,
    Cascade,
}

impl fmt::Display for MoveTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MoveTarget::Card(rank, suit) => f.write_str(&face_shorthand(rank, suit)),
            MoveTarget::Cell => f.write_str("cell"),
            MoveTarget::Foundation => f.write_str("foundation"),
            MoveTarget::Cascade => f.write_str("cascade"),
        }
    }
}

impl FromStr for MoveTarget {
    type Err = EngineError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "cell" => Ok(MoveTarget::Cell),
            "foundation" => Ok(MoveTarget::Foundation),
            "cascade" => Ok(MoveTarget::Cascade),
            _ => {
                let (rank, suit) = parse_shorthand(text)?;
                Ok(MoveTarget::Card(rank, suit))
            }
        }
    }
}

/// Label of an automatic promotion run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PromotionKind {
    AutoFoundation,
    /// The promotion completed the game.
    Flourish,
    /// The promotion completed the game and moved all 52 cards at once.
    Flourish52,
}

impl PromotionKind {
    fn as_str(self) -> &'static str {
        match self {
            PromotionKind::AutoFoundation => "auto-foundation",
            PromotionKind::Flourish => "flourish",
            PromotionKind::Flourish52 => "flourish52",
        }
    }

    fn parse(text: &str) -> Option<Self> {
        match text {
            "auto-foundation" => Some(PromotionKind::AutoFoundation),
            "flourish" => Some(PromotionKind::Flourish),
            "flourish52" => Some(PromotionKind::Flourish52),
            _ => None,
        }
    }
}

/// Cards promoted to the foundations in order, with the position each came from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Promotion {
    pub kind: PromotionKind,
    pub positions: Vec<char>,
    pub cards: Vec<Face>,
}

impl fmt::Display for Promotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let positions: String = self.positions.iter().collect();
        let cards = self
            .cards
            .iter()
            .map(|&(rank, suit)| face_shorthand(rank, suit))
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{} {} {}", self.kind.as_str(), positions, cards)
    }
}

impl FromStr for Promotion {
    type Err = EngineError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidAction(text.to_string());
        let mut parts = text.split(' ');
        let kind = parts.next().and_then(PromotionKind::parse).ok_or_else(invalid)?;
        let positions: Vec<char> = parts.next().ok_or_else(invalid)?.chars().collect();
        let cards = parts
            .next()
            .ok_or_else(invalid)?
            .split(',')
            .map(parse_shorthand)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        if parts.next().is_some() || positions.len() != cards.len() || cards.is_empty() {
            return Err(invalid());
        }
        Ok(Promotion {
            kind,
            positions,
            cards,
        })
    }
}

/// A parsed action text.
///
/// `Display` produces the canonical text and `FromStr` is its exact inverse.
///
/// # Examples
/// ```
/// use freecell_engine::action::{Action, ActionType};
/// let action: Action = "move 53 6H→7C (auto-foundation 2 AD)".parse().unwrap();
/// assert_eq!(action.action_type(), ActionType::MoveFoundation);
/// assert_eq!(action.to_string(), "move 53 6H→7C (auto-foundation 2 AD)");
/// assert!("teleport 5H".parse::<Action>().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Init(InitKind),
    Shuffle {
        seed: u32,
    },
    Deal(DealAmount),
    Cursor {
        action: CursorAction,
        wrapped: bool,
        position: Option<char>,
        card: Option<Face>,
    },
    Select {
        position: Option<char>,
        cards: Vec<Face>,
    },
    Deselect {
        position: Option<char>,
        cards: Vec<Face>,
    },
    Move {
        from: char,
        to: char,
        cards: Vec<Face>,
        target: MoveTarget,
        promotion: Option<Promotion>,
    },
    /// A rejected attempt; the body is kept verbatim.
    Invalid(String),
    AutoFoundation(Promotion),
    TouchStop,
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        match self {
            Action::Init(_) => ActionType::Init,
            Action::Shuffle { .. } => ActionType::Shuffle,
            Action::Deal(_) => ActionType::Deal,
            Action::Cursor { .. } => ActionType::Cursor,
            Action::Select { .. } => ActionType::Select,
            Action::Deselect { .. } => ActionType::Deselect,
            Action::Move {
                promotion: Some(_), ..
            } => ActionType::MoveFoundation,
            Action::Move { .. } => ActionType::Move,
            Action::Invalid(_) => ActionType::Invalid,
            Action::AutoFoundation(_) => ActionType::AutoFoundation,
            Action::TouchStop => ActionType::Touch,
        }
    }

    /// Builds the `select`/`deselect` card list from board cards.
    pub fn faces(cards: &[Card]) -> Vec<Face> {
        cards.iter().map(Card::face).collect()
    }
}

fn faces_text(cards: &[Face]) -> String {
    cards
        .iter()
        .map(|&(rank, suit)| face_shorthand(rank, suit))
        .collect::<Vec<_>>()
        .join("-")
}

fn parse_faces(text: &str) -> Option<Vec<Face>> {
    text.split('-').map(|c| parse_shorthand(c).ok()).collect()
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Init(InitKind::Fresh) => f.write_str("init"),
            Action::Init(InitKind::InvalidHistory) => f.write_str("init with invalid history"),
            Action::Init(InitKind::Partial) => f.write_str("init partial"),
            Action::Init(InitKind::HandJammed) => f.write_str("init hand-jammed"),
            Action::Shuffle { seed } => write!(f, "shuffle deck ({})", seed),
            Action::Deal(DealAmount::All) => f.write_str("deal all cards"),
            Action::Deal(DealAmount::Most) => f.write_str("deal most cards"),
            Action::Deal(DealAmount::Count(1)) => f.write_str("deal 1 card"),
            Action::Deal(DealAmount::Count(n)) => write!(f, "deal {} cards", n),
            Action::Cursor {
                action,
                wrapped,
                position,
                card,
            } => {
                write!(f, "cursor {}", action.as_str())?;
                if *wrapped {
                    f.write_str(" w")?;
                }
                if let Some(position) = position {
                    write!(f, " {}", position)?;
                }
                if let Some((rank, suit)) = card {
                    write!(f, " {}", face_shorthand(*rank, *suit))?;
                }
                Ok(())
            }
            Action::Select { position, cards } | Action::Deselect { position, cards } => {
                let verb = if matches!(self, Action::Select { .. }) {
                    "select"
                } else {
                    "deselect"
                };
                match position {
                    Some(position) => write!(f, "{} {} {}", verb, position, faces_text(cards)),
                    None => write!(f, "{} {}", verb, faces_text(cards)),
                }
            }
            Action::Move {
                from,
                to,
                cards,
                target,
                promotion,
            } => {
                write!(f, "move {}{} {}→{}", from, to, faces_text(cards), target)?;
                if let Some(promotion) = promotion {
                    write!(f, " ({})", promotion)?;
                }
                Ok(())
            }
            Action::Invalid(body) => write!(f, "invalid {}", body),
            Action::AutoFoundation(promotion) => write!(f, "{}", promotion),
            Action::TouchStop => f.write_str("touch stop"),
        }
    }
}

impl FromStr for Action {
    type Err = EngineError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidAction(text.to_string());
        match text {
            "init" => return Ok(Action::Init(InitKind::Fresh)),
            "init with invalid history" => return Ok(Action::Init(InitKind::InvalidHistory)),
            "init partial" => return Ok(Action::Init(InitKind::Partial)),
            "init hand-jammed" => return Ok(Action::Init(InitKind::HandJammed)),
            "deal all cards" => return Ok(Action::Deal(DealAmount::All)),
            "deal most cards" => return Ok(Action::Deal(DealAmount::Most)),
            "touch stop" => return Ok(Action::TouchStop),
            _ => {}
        }

        if let Some(rest) = text.strip_prefix("shuffle deck (") {
            let seed = rest
                .strip_suffix(')')
                .and_then(|s| s.parse::<u32>().ok())
                .ok_or_else(invalid)?;
            return Ok(Action::Shuffle { seed });
        }
        if let Some(rest) = text.strip_prefix("deal ") {
            let (count, noun) = rest.split_once(' ').ok_or_else(invalid)?;
            let count: usize = count.parse().map_err(|_| invalid())?;
            let expected = if count == 1 { "card" } else { "cards" };
            if noun != expected {
                return Err(invalid());
            }
            return Ok(Action::Deal(DealAmount::Count(count)));
        }
        if let Some(rest) = text.strip_prefix("cursor ") {
            return parse_cursor(rest).ok_or_else(invalid);
        }
        if let Some(rest) = text.strip_prefix("select ") {
            let (position, cards) = parse_selection(rest).ok_or_else(invalid)?;
            return Ok(Action::Select { position, cards });
        }
        if let Some(rest) = text.strip_prefix("deselect ") {
            let (position, cards) = parse_selection(rest).ok_or_else(invalid)?;
            return Ok(Action::Deselect { position, cards });
        }
        if let Some(rest) = text.strip_prefix("move ") {
            return parse_move(rest).ok_or_else(invalid);
        }
        if let Some(rest) = text.strip_prefix("invalid ") {
            if rest.is_empty() {
                return Err(invalid());
            }
            return Ok(Action::Invalid(rest.to_string()));
        }
        if text.starts_with("auto-foundation ") || text.starts_with("flourish") {
            return Ok(Action::AutoFoundation(text.parse()?));
        }
        Err(invalid())
    }
}

fn parse_cursor(rest: &str) -> Option<Action> {
    let mut tokens = rest.split(' ').peekable();
    let action = CursorAction::parse(tokens.next()?)?;
    let wrapped = tokens.next_if_eq(&"w").is_some();
    let mut position = None;
    let mut card = None;
    if let Some(token) = tokens.next() {
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => position = Some(c),
            _ => return None,
        }
    }
    if let Some(token) = tokens.next() {
        card = Some(parse_shorthand(token).ok()?);
    }
    if tokens.next().is_some() {
        return None;
    }
    Some(Action::Cursor {
        action,
        wrapped,
        position,
        card,
    })
}

fn parse_selection(rest: &str) -> Option<(Option<char>, Vec<Face>)> {
    match rest.split_once(' ') {
        Some((position, cards)) => {
            let mut chars = position.chars();
            let position = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => return None,
            };
            Some((Some(position), parse_faces(cards)?))
        }
        None => Some((None, parse_faces(rest)?)),
    }
}

fn parse_move(rest: &str) -> Option<Action> {
    let (body, promotion) = match rest.split_once(" (") {
        Some((body, suffix)) => {
            let inner = suffix.strip_suffix(')')?;
            (body, Some(inner.parse::<Promotion>().ok()?))
        }
        None => (rest, None),
    };
    let (positions, movement) = body.split_once(' ')?;
    let mut chars = positions.chars();
    let (Some(from), Some(to), None) = (chars.next(), chars.next(), chars.next()) else {
        return None;
    };
    let (cards, target) = movement.split_once('→')?;
    Some(Action::Move {
        from,
        to,
        cards: parse_faces(cards)?,
        target: target.parse().ok()?,
        promotion,
    })
}

/// Metadata describing the most recent action applied to a board.
///
/// `text` is authoritative; `action_type` is derived from it and cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviousAction {
    pub text: String,
    pub action_type: ActionType,
    /// Cards that moved, at their new locations, in the order they moved.
    pub tween_cards: Vec<Card>,
    pub game_function: Option<GameFunction>,
}

/// A board-level function that produced the action rather than a player command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameFunction {
    Undo,
    Restart,
}

impl PreviousAction {
    pub fn new(action: &Action) -> Self {
        PreviousAction {
            text: action.to_string(),
            action_type: action.action_type(),
            tween_cards: Vec::new(),
            game_function: None,
        }
    }

    pub fn with_tween_cards(mut self, cards: Vec<Card>) -> Self {
        self.tween_cards = cards;
        self
    }

    pub fn with_game_function(mut self, game_function: GameFunction) -> Self {
        self.game_function = Some(game_function);
        self
    }

    /// Rebuilds the metadata from a canonical text.
    pub fn from_text(text: &str) -> Result<Self, EngineError> {
        let action: Action = text.parse()?;
        Ok(PreviousAction::new(&action))
    }
}
