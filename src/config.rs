use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

use crate::game::{Rules, DEFAULT_COLS, DEFAULT_ROWS};

pub const DEFAULT_TICK_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "blockdrop")]
#[command(about = "Falling-block puzzle in the terminal")]
pub struct Config {
    /// Board height in cells
    #[arg(long, default_value_t = DEFAULT_ROWS)]
    pub rows: usize,

    /// Board width in cells
    #[arg(long, default_value_t = DEFAULT_COLS)]
    pub cols: usize,

    /// Gravity period in milliseconds
    #[arg(long, default_value_t = DEFAULT_TICK_MS)]
    pub tick_ms: u64,

    /// Seed for a reproducible piece sequence
    #[arg(long)]
    pub seed: Option<u64>,

    /// Keep playing when a new piece spawns into locked cells
    #[arg(long, default_value_t = false)]
    pub no_game_over: bool,

    /// Write engine logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log level used with --log-file
    #[arg(long, default_value = "info")]
    pub log_level: log::LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            tick_ms: DEFAULT_TICK_MS,
            seed: None,
            no_game_over: false,
            log_file: None,
            log_level: log::LevelFilter::Info,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.rules().validate()?;
        if self.tick_ms == 0 {
            bail!("tick-ms must be greater than zero");
        }
        Ok(())
    }

    pub fn rules(&self) -> Rules {
        Rules {
            rows: self.rows,
            cols: self.cols,
            detect_game_over: !self.no_game_over,
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_board() {
        let config = Config::parse_from(["blockdrop"]);
        assert_eq!(config, Config::default());
        assert_eq!(config.tick_period(), Duration::from_millis(1000));
        assert!(config.rules().detect_game_over);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_all_flags() {
        let config = Config::parse_from([
            "blockdrop",
            "--rows",
            "12",
            "--cols",
            "8",
            "--tick-ms",
            "250",
            "--seed",
            "42",
            "--no-game-over",
            "--log-file",
            "engine.log",
            "--log-level",
            "debug",
        ]);

        assert_eq!(config.rows, 12);
        assert_eq!(config.cols, 8);
        assert_eq!(config.tick_ms, 250);
        assert_eq!(config.seed, Some(42));
        assert!(!config.rules().detect_game_over);
        assert_eq!(config.log_file, Some(PathBuf::from("engine.log")));
        assert_eq!(config.log_level, log::LevelFilter::Debug);
    }

    #[test]
    fn rejects_narrow_board() {
        let config = Config {
            cols: 4,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_short_board() {
        let config = Config {
            rows: 3,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_tick() {
        let config = Config {
            tick_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
