use clap::Parser;
use freecell_engine::card::{position_shorthand, sequence_shorthand};
use freecell_engine::engine::{random_seed, Board, BoardConfig, Direction};
use freecell_engine::moves::AutoFoundationLimit;
use freecell_engine::notation::PrintOptions;
use log::info;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Deal number to play (1 to 32000); random when omitted
    #[clap(short, long)]
    seed: Option<u32>,

    /// Number of free cells
    #[clap(long, default_value_t = 4)]
    cells: usize,

    /// Number of cascades
    #[clap(long, default_value_t = 8)]
    cascades: usize,

    /// Auto-foundation limit: none, rank, rank+1, opp+1 or opp+2
    #[clap(short, long, default_value = "opp+1")]
    limit: AutoFoundationLimit,

    /// Leave cards where they are after each move
    #[clap(long)]
    no_auto_foundation: bool,

    /// Resume a printed board instead of dealing
    #[clap(long)]
    load: Option<PathBuf>,
}

const HELP: &str = "\
Commands:
  <from><to>      move by position, e.g. '53', '2a', '7h' (cells a-f, foundation h)
  <position>      touch one position: select, deselect or move the selection
  up/down/left/right, touch
                  move the cursor, touch the cursor location
  auto            cycle the selection to its next destination
  home            send every safe card to the foundations
  moves           list legal moves
  undo, restart   step back one action, or back to the deal
  history         print the board with its history
  q               quit";

fn start(args: &Args) -> Result<Board, Box<dyn Error>> {
    let config = BoardConfig {
        cell_count: args.cells,
        cascade_count: args.cascades,
        auto_foundation: !args.no_auto_foundation,
        auto_foundation_limit: args.limit,
    };
    if let Some(path) = &args.load {
        let text = fs::read_to_string(path)?;
        let board = Board::parse_lenient(&text, config)?;
        info!("loaded {} with {} history entries", path.display(), board.history().len());
        return Ok(board);
    }
    let seed = match args.seed {
        Some(seed) => seed,
        None => random_seed(&mut SmallRng::from_entropy()),
    };
    info!("dealing game {}", seed);
    Ok(Board::with_config(config)?.shuffle32(seed)?.deal_all())
}

fn apply(board: &Board, command: &str) -> Result<Board, Box<dyn Error>> {
    let next = match command {
        "up" => board.move_cursor(Direction::Up),
        "down" => board.move_cursor(Direction::Down),
        "left" => board.move_cursor(Direction::Left),
        "right" => board.move_cursor(Direction::Right),
        "touch" => board.touch(board.cursor()),
        "auto" => board.auto_move(),
        "home" => board.auto_foundation_all(),
        "undo" => board.undo()?,
        "restart" => board.restart()?,
        _ => {
            let mut chars = command.chars();
            match (chars.next(), chars.next(), chars.next()) {
                (Some(position), None, _) => board.touch_by_position(position)?,
                (Some(from), Some(to), None) => board.move_by_position(from, to)?,
                _ => return Err(format!("unknown command '{}'", command).into()),
            }
        }
    };
    Ok(next)
}

fn list_moves(board: &Board) {
    let config = board.config();
    let position = |location| {
        position_shorthand(location, config.cell_count, config.cascade_count).unwrap_or('?')
    };
    for (sequence, moves) in board.legal_moves() {
        let targets: String = moves.iter().map(|m| position(m.location)).collect();
        println!(
            "  {} {} -> {}",
            position(sequence.location),
            sequence_shorthand(&sequence.cards),
            targets
        );
    }
    if board.selection().is_some() {
        println!("  selected {}", board.available_move_summary());
    }
}

fn main() {
    env_logger::try_init().ok();
    let args = Args::parse();

    let mut board = match start(&args) {
        Ok(board) => board,
        Err(err) => {
            eprintln!("Could not start a game: {}", err);
            std::process::exit(1);
        }
    };
    println!("Welcome to FreeCell! Type 'help' for commands.");

    loop {
        println!("---------------------");
        print!("{}", board);
        println!("{}", board.previous_action().text);

        if board.is_won() {
            println!("---------------------");
            println!("Solved in {} moves.", board.history().len().saturating_sub(1));
            break;
        }

        print!("> ");
        io::stdout().flush().ok();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => {
                println!("Error reading input. Please try again.");
                continue;
            }
        }

        match input.trim() {
            "" => continue,
            "q" | "quit" => {
                println!("Thanks for playing!");
                break;
            }
            "help" => println!("{}", HELP),
            "moves" => list_moves(&board),
            "history" => print!("{}", board.print(&PrintOptions::with_history())),
            command => match apply(&board, command) {
                Ok(next) => board = next,
                Err(err) => println!("{}", err),
            },
        }
    }
}
