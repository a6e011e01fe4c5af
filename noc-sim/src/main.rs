//! Cycle-level event-driven simulator for a 2-D mesh NoC with per-router
//! DVFS.
//!
//! Thin entry point: parse args, build a config, run, print a summary,
//! exit 1 on error.

use std::path::Path;

use noc_sim::{config, controller, NetworkController};

fn main() {
    let tokens: Vec<String> = std::env::args().skip(1).collect();

    let cfg = match config::parse(&tokens) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let max_level = if cfg.verbose { slog::Level::Trace } else { slog::Level::Info };
    let logfile = cfg.logfile.as_ref().map(Path::new);
    let log = match noc_engine::logger::build_root_logger(logfile, max_level) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Error: cannot open logfile {:?}: {}", cfg.logfile, e);
            std::process::exit(1);
        }
    };
    let log = controller::child_logger(&log, &cfg);

    let controller = match NetworkController::new(cfg, log) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let summary = controller.run();
    print!("{}", summary);
}
