//! Command-line configuration.
//!
//! The CLI grammar is positional `name: value` tokens, not dash-flags —
//! this matches the trace-generation tooling this simulator interoperates
//! with, which already emits config in that form. Parsing validates,
//! builds a `Config`, and fails fast with a diagnostic naming the
//! offending option and value.

use std::fmt;

use noc_router::RoutingAlgo;
use noc_router::{Policy, PredictorMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficMode {
    Uniform,
    Hotspot,
    Transpose1,
    Transpose2,
    SelfSimilar,
    Tracefile,
}

impl TrafficMode {
    fn parse(s: &str) -> Option<TrafficMode> {
        match s {
            "UNIFORM" => Some(TrafficMode::Uniform),
            "HOTSPOT" => Some(TrafficMode::Hotspot),
            "TRANSPOSE1" => Some(TrafficMode::Transpose1),
            "TRANSPOSE2" => Some(TrafficMode::Transpose2),
            "SELFSIMILAR" => Some(TrafficMode::SelfSimilar),
            "TRACEFILE" => Some(TrafficMode::Tracefile),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Config {
    pub tracefile: Option<String>,
    pub traffic: TrafficMode,
    pub hotspots: Vec<usize>,
    pub hotspot_percentage: f64,
    pub injection_rate: f64,
    pub ary_size: u16,
    pub packet_size: usize,
    pub flit_size: usize,
    pub inp_buf: usize,
    pub out_buf: usize,
    pub routing: RoutingAlgo,
    pub vc_n: usize,
    pub link_bw: u64,
    pub cycles: u64,
    pub warmup: u64,
    pub seed: u64,
    pub use_gui: bool,
    pub gui_sbs: bool,
    pub verbose: bool,
    pub hist_window: u64,
    pub do_dvfs: bool,
    pub dvfs_mode: PredictorMode,
    pub use_boost: bool,
    pub use_link_pred: bool,
    /// Optional file to mirror structured logs into,
    /// in addition to stderr.
    pub logfile: Option<String>,
}

impl Default for Config {
    /// Defaults match a typical 8x8 mesh at moderate load; see DESIGN.md
    /// for the reasoning behind each one.
    fn default() -> Config {
        Config {
            tracefile: None,
            traffic: TrafficMode::Tracefile,
            hotspots: Vec::new(),
            hotspot_percentage: 10.0,
            injection_rate: 0.015,
            ary_size: 8,
            packet_size: 6,
            flit_size: 1,
            inp_buf: 16,
            out_buf: 16,
            routing: RoutingAlgo::Xy,
            vc_n: 4,
            link_bw: 64,
            cycles: 10_000,
            warmup: 1_000,
            seed: 1,
            use_gui: false,
            gui_sbs: false,
            verbose: false,
            hist_window: 200,
            do_dvfs: true,
            dvfs_mode: PredictorMode::Async,
            use_boost: false,
            use_link_pred: true,
            logfile: None,
        }
    }
}

impl Config {
    pub fn policy(&self) -> Policy {
        if !self.use_link_pred {
            Policy::C
        } else if self.use_boost {
            Policy::B
        } else {
            Policy::A
        }
    }
}

#[derive(Debug)]
pub struct ConfigError {
    pub option: String,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid value \"{}\" for option \"{}\": {}",
            self.value, self.option, self.reason
        )
    }
}

impl std::error::Error for ConfigError {}

fn err(option: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError {
        option: option.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_num<T: std::str::FromStr>(option: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| err(option, value, "expected a number"))
}

fn parse_bool01(option: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(err(option, value, "expected 0 or 1")),
    }
}

fn in_range<T: PartialOrd + fmt::Display + Copy>(option: &str, value: T, lo: T, hi: T) -> Result<T, ConfigError> {
    if value < lo || value > hi {
        Err(err(option, &value.to_string(), &format!("must be within [{}, {}]", lo, hi)))
    } else {
        Ok(value)
    }
}

/// Parses `name: value` positional tokens (e.g. the program's `argv`,
/// minus `argv[0]`) into a [`Config`].
pub fn parse(tokens: &[String]) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();
    let mut i = 0;

    let is_key = |s: &str| s.ends_with(':');
    let bare_flags = ["use_gui", "gui_sbs", "verbose"];

    while i < tokens.len() {
        let tok = tokens[i].as_str();

        if bare_flags.contains(&tok) {
            match tok {
                "use_gui" => cfg.use_gui = true,
                "gui_sbs" => cfg.gui_sbs = true,
                "verbose" => cfg.verbose = true,
                _ => unreachable!(),
            }
            i += 1;
            continue;
        }

        if !is_key(tok) {
            return Err(err("<argument>", tok, "expected a \"name:\" option token"));
        }
        let key = &tok[..tok.len() - 1];
        i += 1;

        macro_rules! next_value {
            () => {{
                let v = tokens.get(i).ok_or_else(|| err(key, "", "missing value"))?;
                i += 1;
                v.as_str()
            }};
        }

        match key {
            "tracefile" => cfg.tracefile = Some(next_value!().to_string()),
            "traffic" => {
                let v = next_value!();
                cfg.traffic = TrafficMode::parse(v).ok_or_else(|| err("traffic", v, "unknown traffic mode"))?;
            }
            "hotspots" => {
                cfg.hotspots.clear();
                while i < tokens.len() && !is_key(&tokens[i]) && !bare_flags.contains(&tokens[i].as_str()) {
                    cfg.hotspots.push(parse_num("hotspots", &tokens[i])?);
                    i += 1;
                }
            }
            "hotspot_percentage" => {
                let v = next_value!();
                cfg.hotspot_percentage = in_range("hotspot_percentage", parse_num(key, v)?, 5.0, 95.0)?;
            }
            "injection_rate" => {
                let v = next_value!();
                cfg.injection_rate = in_range("injection_rate", parse_num(key, v)?, 0.0001, 1.0)?;
            }
            "ary_size" => {
                let v = next_value!();
                cfg.ary_size = in_range("ary_size", parse_num(key, v)?, 2u16, 128)?;
            }
            "packet_size" => {
                let v = next_value!();
                cfg.packet_size = in_range("packet_size", parse_num(key, v)?, 2usize, 32)?;
            }
            "flit_size" => {
                let v = next_value!();
                cfg.flit_size = in_range("flit_size", parse_num(key, v)?, 1usize, 128)?;
            }
            "inp_buf" => cfg.inp_buf = parse_num(key, next_value!())?,
            "out_buf" => cfg.out_buf = parse_num(key, next_value!())?,
            "routing" => {
                let v = next_value!();
                cfg.routing = RoutingAlgo::parse(v).ok_or_else(|| err("routing", v, "unknown routing algorithm"))?;
            }
            "vc_n" => {
                let v = next_value!();
                cfg.vc_n = in_range("vc_n", parse_num(key, v)?, 1usize, 128)?;
            }
            "link_bw" => cfg.link_bw = parse_num(key, next_value!())?,
            "cycles" => cfg.cycles = parse_num(key, next_value!())?,
            "warmup" => cfg.warmup = parse_num(key, next_value!())?,
            "seed" => cfg.seed = parse_num(key, next_value!())?,
            "hist_window" => cfg.hist_window = parse_num(key, next_value!())?,
            "do_dvfs" => cfg.do_dvfs = parse_bool01(key, next_value!())?,
            "dvfs_mode" => {
                let v = next_value!();
                cfg.dvfs_mode = match v {
                    "SYNC" => PredictorMode::Sync,
                    "ASYNC" => PredictorMode::Async,
                    _ => return Err(err("dvfs_mode", v, "expected SYNC or ASYNC")),
                };
            }
            "use_boost" => cfg.use_boost = parse_bool01(key, next_value!())?,
            "use_link_pred" => cfg.use_link_pred = parse_bool01(key, next_value!())?,
            "logfile" => cfg.logfile = Some(next_value!().to_string()),
            other => return Err(err(other, "", "unknown option")),
        }
    }

    if cfg.traffic == TrafficMode::Tracefile && cfg.tracefile.is_none() {
        return Err(err("tracefile", "<missing>", "required when traffic: TRACEFILE"));
    }
    if cfg.routing == RoutingAlgo::TorusXy && cfg.vc_n < 2 {
        return Err(err("vc_n", &cfg.vc_n.to_string(), "Torus-XY routing requires vc_n >= 2"));
    }

    Ok(cfg)
}
