//! Self-play record generation (§4.J), grounded on the original engine's
//! `train()` entry point — itself a stub in the source, so the record
//! format and game loop below follow SPEC_FULL.md directly rather than any
//! concrete original implementation.
//!
//! One file per game is written under `games_dir/<index>`; each move is one
//! line of `<uci move> <8*8*85 input floats> <4096 mask floats> <4096 visit
//! ratio floats>`, followed by a final line holding the terminal value
//! `{-1, 0, 1}` from white's POV.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use crate::config::Config;
use crate::evaluator::Evaluator;
use crate::pool::{mirrored_policy_index, Pool};
use crate::position::Position;
use crate::POLICY_SIZE;

/// Self-play games longer than this are adjudicated a draw rather than
/// played out, bounding the cost of a single game (§4.J).
pub const MAX_GAME_PLIES: usize = 512;

/// Play `num_games` self-play games with `pool`, writing one record file per
/// game under `config.games_dir`. Returns the number of files written.
pub fn run_training<E: Evaluator + 'static>(
    pool: &mut Pool<E>,
    config: &Config,
    num_games: usize,
) -> io::Result<usize> {
    fs::create_dir_all(&config.games_dir)?;
    log::info!("starting self-play: {num_games} games into {}", config.games_dir.display());

    for index in 0..num_games {
        let path = config.games_dir.join(index.to_string());
        let result = play_one_game(pool, config, &path, Position::new(), MAX_GAME_PLIES)?;
        log::info!("game {index} finished, terminal value (white POV) = {result}");
    }
    Ok(num_games)
}

/// Play a single game to a natural or adjudicated conclusion, writing its
/// record file to `path`. Split out from [`run_training`] so tests can
/// start from an arbitrary position with a small ply cap.
fn play_one_game<E: Evaluator + 'static>(
    pool: &mut Pool<E>,
    config: &Config,
    path: &Path,
    mut position: Position,
    max_plies: usize,
) -> io::Result<f32> {
    let mut file = File::create(path)?;

    let mut plies = 0usize;
    let terminal = loop {
        if let Some(result) = position.is_game_over() {
            // `is_game_over`'s sign is already "white loss is negative"
            // regardless of whose turn it is, i.e. already white's POV.
            break result as f32;
        }
        if plies >= max_plies {
            log::warn!("game at {} hit the {max_plies}-ply cap, adjudicating draw", path.display());
            break 0.0;
        }

        let (mv, visit_ratios) = pool.search_training(&position, config.default_move_time_ms);
        if mv.is_null() {
            log::warn!("search returned no move at {} plies; adjudicating draw", plies);
            break 0.0;
        }

        write_move_record(&mut file, &position, mv, &visit_ratios)?;

        let applied = position.make_matched_move(mv);
        if applied.is_none() {
            log::warn!("search returned an illegal move {mv:?}; aborting game");
            break 0.0;
        }
        plies += 1;
    };

    writeln!(file, "{terminal}")?;
    Ok(terminal)
}

/// Write one move's training line: the chosen move, the side-to-move's
/// input tensor, the legal-move mask, and the visit-ratio distribution.
fn write_move_record(
    file: &mut File,
    position: &Position,
    mv: crate::moves::Move,
    visit_ratios: &[f32; POLICY_SIZE],
) -> io::Result<()> {
    write!(file, "{}", mv.to_uci())?;

    for &v in position.input_tensor(position.color_to_move()) {
        write!(file, " {v}")?;
    }

    let mut mask = [0f32; POLICY_SIZE];
    for legal in position.legal_moves() {
        mask[mirrored_policy_index(legal, position.color_to_move())] = 1.0;
    }
    for v in mask {
        write!(file, " {v}")?;
    }

    for v in visit_ratios {
        write!(file, " {v}")?;
    }
    writeln!(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::RandomEvaluator;
    use std::sync::Arc;

    #[test]
    fn stalemate_start_writes_a_single_terminal_line() {
        let dir = std::env::temp_dir().join(format!("mcts_engine_train_test_stalemate_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let config = Config::defaults();
        let mut pool = Pool::init(Arc::new(RandomEvaluator), 1, 4);

        let stalemated = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let path = dir.join("0");
        let result = play_one_game(&mut pool, &config, &path, stalemated, MAX_GAME_PLIES).unwrap();
        assert_eq!(result, 0.0);

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].parse::<f32>().unwrap(), 0.0);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn ply_cap_adjudicates_a_draw() {
        let dir = std::env::temp_dir().join(format!("mcts_engine_train_test_cap_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let mut config = Config::defaults();
        config.default_move_time_ms = 20;
        let mut pool = Pool::init(Arc::new(RandomEvaluator), 1, 4);

        let path = dir.join("0");
        let result = play_one_game(&mut pool, &config, &path, Position::new(), 1).unwrap();
        assert_eq!(result, 0.0);

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);

        fs::remove_dir_all(&dir).ok();
    }
}
