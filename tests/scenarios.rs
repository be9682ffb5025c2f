use freecell_engine::action::ActionType;
use freecell_engine::card::{Location, Suit};
use freecell_engine::engine::{Board, BoardConfig};
use freecell_engine::error::{EngineError, HistoryStage};
use freecell_engine::notation::PrintOptions;

fn game(seed: u32) -> Board {
    Board::new().shuffle32(seed).unwrap().deal_all()
}

#[test]
fn golden_deals_print_their_first_row() {
    let rows: Vec<String> = [1, 617]
        .iter()
        .map(|&seed| game(seed).to_string().lines().nth(1).unwrap().to_string())
        .collect();
    assert_eq!(rows[0], " JD 2D 9H JC 5D 7H 7C 5H ");
    assert_eq!(rows[1], " 7D AD 5C 3S 5S 8C 2D AH ");
}

#[test]
fn seed_5_move_promotes_ace_of_diamonds() {
    let board = game(5).move_by_position('5', '3').unwrap();
    assert_eq!(board.previous_action().text, "move 53 6H→7C (auto-foundation 2 AD)");
    assert_eq!(board.previous_action().action_type, ActionType::MoveFoundation);
    assert_eq!(board.foundation_rank(Suit::Diamonds), 1);
    assert_eq!(
        board.card_at(Location::Cascade { column: 2, row: 7 }).unwrap().shorthand(),
        "6H"
    );
    assert_eq!(
        board.history(),
        [
            "init",
            "shuffle deck (5)",
            "deal all cards",
            "move 53 6H→7C (auto-foundation 2 AD)"
        ]
    );
}

#[test]
fn unshuffled_deal_flourishes_and_undoes() {
    let dealt = Board::new().deal_all();
    assert_eq!(dealt.to_string(), Board::new().deal_all().to_string());

    let won = dealt.auto_foundation_all();
    assert!(won.is_won());
    assert!(won.previous_action().text.starts_with("flourish52 "));
    assert_eq!(won.previous_action().tween_cards.len(), 52);

    let undone = won.undo().unwrap();
    assert_eq!(undone.cards(), dealt.cards());
    assert_eq!(undone.history(), dealt.history());
}

#[test]
fn undo_walks_back_to_the_deal() {
    let dealt = game(5);
    let played = dealt
        .move_by_position('5', '3')
        .unwrap()
        .move_by_position('2', 'a')
        .unwrap();
    assert_eq!(played.history().len(), 5);

    let once = played.undo().unwrap();
    assert_eq!(once.history(), &played.history()[..4]);
    let twice = once.undo().unwrap();
    assert_eq!(twice.cards(), dealt.cards());
    assert_eq!(twice.previous_action().text, "deal all cards");

    let restarted = played.restart().unwrap();
    assert_eq!(restarted.cards(), dealt.cards());
    assert_eq!(restarted.history(), dealt.history());
}

#[test]
fn replay_matches_played_board() {
    let played = game(5)
        .move_by_position('5', '3')
        .unwrap()
        .move_by_position('2', 'a')
        .unwrap();
    let replayed = Board::replay(BoardConfig::default(), played.history()).unwrap();
    assert_eq!(replayed.cards(), played.cards());
    assert_eq!(replayed.history(), played.history());
}

#[test]
fn print_and_parse_preserve_game() {
    let played = game(5)
        .move_by_position('5', '3')
        .unwrap()
        .move_by_position('2', 'a')
        .unwrap();
    let text = played.print(&PrintOptions::with_history());
    assert!(text.ends_with(":h shuffle32 5\n: 53 2a\n"));

    let parsed = Board::parse(&text).unwrap();
    assert_eq!(parsed.cards(), played.cards());
    assert_eq!(parsed.history(), played.history());
    assert_eq!(parsed.cursor(), played.cursor());
    assert_eq!(parsed.print(&PrintOptions::with_history()), text);

    let undone = parsed.undo().unwrap();
    assert_eq!(undone.print(&PrintOptions::with_history()).lines().last(), Some(": 53"));
}

#[test]
fn tampered_history_is_rejected() {
    let played = game(5).move_by_position('5', '3').unwrap();
    let text = played.print(&PrintOptions::with_history()).replace("shuffle32 5", "shuffle32 6");
    assert!(matches!(
        Board::parse(&text),
        Err(EngineError::InvalidHistory { .. })
    ));
    let lenient = Board::parse_lenient(&text, BoardConfig::default()).unwrap();
    assert_eq!(lenient.history(), ["init with invalid history"]);
    assert_eq!(lenient.cards(), played.cards());
}

#[test]
fn corrupt_history_fails_undo() {
    let played = game(5).move_by_position('5', '3').unwrap();
    let text = format!(
        "{}: init\n: shuffle deck (5)\n: deal all cards\n: move 53 6H→8C\n",
        played
    );
    assert!(matches!(
        Board::parse(&text),
        Err(EngineError::InvalidHistory {
            stage: HistoryStage::Replay,
            ..
        })
    ));
}
