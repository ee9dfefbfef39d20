//! Binary entry point: read one mode line from stdin (`uci` or `train`) and
//! dispatch, the same two-mode contract as the original engine's `main.cpp`
//! (§4.I, §6).

use std::io::{self, BufRead};
use std::sync::Arc;

use mcts_engine::config::Config;
use mcts_engine::evaluator::RandomEvaluator;
use mcts_engine::pool::Pool;
use mcts_engine::{train, uci};

fn main() {
    env_logger::init();

    let config = Config::from_env();
    log::info!(
        "mcts_engine starting: threads={} batch_size={}",
        config.num_threads,
        config.batch_size
    );

    // No trained network is shipped with this crate (§4.H); RandomEvaluator
    // lets `uci`/`train` run end-to-end as a smoke test until a real model
    // loader is plugged in.
    let evaluator = Arc::new(RandomEvaluator);
    let mut pool = Pool::init(evaluator, config.num_threads, config.batch_size);
    let mut config = config;

    let mode = {
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        match lines.next() {
            Some(Ok(line)) => line,
            _ => {
                log::error!("no mode line on stdin");
                std::process::exit(1);
            }
        }
    };

    match mode.trim() {
        "uci" => uci::run(&mut pool, &mut config, io::stdin().lock(), |line| println!("{line}")),
        "train" => {
            if let Err(e) = train::run_training(&mut pool, &config, usize::MAX) {
                log::error!("training failed: {e}");
                std::process::exit(1);
            }
        }
        other => {
            eprintln!("Unknown mode '{other}'.");
            std::process::exit(1);
        }
    }
}
