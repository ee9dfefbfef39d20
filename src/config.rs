//! Engine-wide tunables (§4.K), read once at startup the way the teacher's
//! `uci::options` module reads `setoption` values, but sourced from
//! environment variables (`CHESS_*`) with hard-coded defaults as the
//! fallback.

use std::path::PathBuf;

/// Default worker thread count when `CHESS_THREADS` is unset: one per
/// logical CPU.
fn default_num_threads() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

pub const DEFAULT_BATCH_SIZE: usize = 16;
pub const MAX_BATCH_SIZE: usize = 256;
pub const DEFAULT_MOVE_TIME_MS: u64 = 5000;

/// Mutable-between-searches configuration (§4.G, §4.I `setoption`). Search
/// itself never writes this; `setoption` handlers do, between `go`s.
#[derive(Clone, Debug)]
pub struct Config {
    pub num_threads: usize,
    pub batch_size: usize,
    pub default_move_time_ms: u64,
    pub games_dir: PathBuf,
    pub model_dir: PathBuf,
}

impl Config {
    /// Defaults with no environment overrides applied.
    #[must_use]
    pub fn defaults() -> Self {
        Config {
            num_threads: default_num_threads(),
            batch_size: DEFAULT_BATCH_SIZE,
            default_move_time_ms: DEFAULT_MOVE_TIME_MS,
            games_dir: PathBuf::from("models/latest"),
            model_dir: PathBuf::from("models/latest"),
        }
    }

    /// Build from the environment, falling back to [`Config::defaults`] for
    /// anything unset or unparsable. Malformed values are logged and
    /// ignored rather than treated as fatal (§7).
    #[must_use]
    pub fn from_env() -> Self {
        let mut cfg = Config::defaults();

        if let Ok(v) = std::env::var("CHESS_THREADS") {
            match v.parse::<usize>() {
                Ok(n) if n > 0 => cfg.num_threads = n,
                _ => log::warn!("CHESS_THREADS={v:?} is not a positive integer, ignoring"),
            }
        }
        if let Ok(v) = std::env::var("CHESS_BATCH_SIZE") {
            match v.parse::<usize>() {
                Ok(n) if n > 0 => cfg.batch_size = n.min(MAX_BATCH_SIZE),
                _ => log::warn!("CHESS_BATCH_SIZE={v:?} is not a positive integer, ignoring"),
            }
        }
        if let Ok(v) = std::env::var("CHESS_MOVE_TIME_MS") {
            match v.parse::<u64>() {
                Ok(n) if n > 0 => cfg.default_move_time_ms = n,
                _ => log::warn!("CHESS_MOVE_TIME_MS={v:?} is not a positive integer, ignoring"),
            }
        }
        if let Ok(v) = std::env::var("CHESS_GAMES_DIR") {
            cfg.games_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("CHESS_MODEL_DIR") {
            cfg.model_dir = PathBuf::from(v);
        }

        cfg
    }

    /// Apply a UCI `setoption name Threads value N`, clamped to `1..=256`.
    pub fn set_threads(&mut self, threads: usize) {
        self.num_threads = threads.clamp(1, 256);
    }

    /// Apply a UCI `setoption name Batch value N`, clamped to `1..=MAX_BATCH_SIZE`.
    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
    }

    /// `ourtime/10` per §4.I, used when `go wtime/btime` is given instead of
    /// an explicit `movetime`.
    #[must_use]
    pub fn move_time_from_clock(&self, our_time_ms: u64) -> u64 {
        (our_time_ms / 10).max(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::defaults();
        assert_eq!(cfg.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(cfg.default_move_time_ms, DEFAULT_MOVE_TIME_MS);
        assert!(cfg.num_threads >= 1);
    }

    #[test]
    fn set_batch_size_clamps_to_max() {
        let mut cfg = Config::defaults();
        cfg.set_batch_size(10_000);
        assert_eq!(cfg.batch_size, MAX_BATCH_SIZE);
        cfg.set_batch_size(0);
        assert_eq!(cfg.batch_size, 1);
    }

    #[test]
    fn set_threads_clamps_to_256() {
        let mut cfg = Config::defaults();
        cfg.set_threads(1000);
        assert_eq!(cfg.num_threads, 256);
    }

    #[test]
    fn move_time_from_clock_divides_by_ten() {
        let cfg = Config::defaults();
        assert_eq!(cfg.move_time_from_clock(30_000), 3_000);
        assert_eq!(cfg.move_time_from_clock(5), 1);
    }
}
