use clap::Parser;
use freecell_engine::engine::{Board, BoardConfig};
use freecell_engine::moves::AutoFoundationLimit;
use freecell_engine::notation::PrintOptions;
use log::{debug, warn};
use std::error::Error;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Number of history-bearing actions to undo after loading
    #[clap(short, long, default_value_t = 0)]
    undo: usize,

    /// Print the history one action per line instead of as a seed and move pairs
    #[clap(long)]
    verbatim: bool,

    /// Keep the board when its history does not validate
    #[clap(long)]
    lenient: bool,

    /// Auto-foundation limit used while replaying: none, rank, rank+1, opp+1 or opp+2
    #[clap(short, long, default_value = "opp+1")]
    limit: AutoFoundationLimit,

    /// Replay without automatic foundation promotion
    #[clap(long)]
    no_auto_foundation: bool,

    /// Path to a printed board
    board_file: PathBuf,
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let text = fs::read_to_string(&args.board_file)
        .map_err(|e| format!("Failed to read {}: {}", args.board_file.display(), e))?;
    let config = BoardConfig {
        auto_foundation: !args.no_auto_foundation,
        auto_foundation_limit: args.limit,
        ..BoardConfig::default()
    };
    let mut board = if args.lenient {
        Board::parse_lenient(&text, config)?
    } else {
        Board::parse_with_config(&text, config)?
    };
    println!("Loaded board from {}", args.board_file.display());
    println!("Last action: {}\n", board.previous_action().text);

    for step in 0..args.undo {
        if board.history().len() <= 1 {
            warn!("history exhausted after {} undos", step);
            break;
        }
        board = board.undo()?;
        debug!("undo {}: {}", step + 1, board.previous_action().text);
    }

    if args.verbatim {
        print!("{}", board);
        for text in board.history() {
            println!(": {}", text);
        }
    } else {
        print!("{}", board.print(&PrintOptions::with_history()));
    }
    Ok(())
}

fn main() {
    env_logger::try_init().ok();
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
