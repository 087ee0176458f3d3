//! Tutorial loop: one operative, four clocks, one place that notices.
//!
//! Each turn the Circle scores the operative, evaluates movement affordances,
//! maybe throws a complication, and then the operative acts. Actions are
//! recorded as affinity events, so a careless run turns the place hostile.

use std::fmt;
use std::path::PathBuf;

use affinity_core::{
    AffinityConfig, AffinityEngine, AffinityEvent, AffordanceCatalog, AffordanceContext, Place, ThresholdLabel,
    Timestamp, ValuationProfile,
};
use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

const PLACE_ID: &str = "circle_5th_amaranth";
const TURN_SECS: f64 = 900.0;
const CLOCK_MAX: u32 = 6;
const TIME_MAX: u32 = 10;

#[derive(Parser)]
#[command(name = "affinity-sim", about = "Tutorial loop driving the affinity engine")]
struct Cli {
    /// Seed for the operative's dice (the place seeds itself)
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Engine configuration as TOML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print engine counters in Prometheus format at the end
    #[arg(long)]
    metrics: bool,

    /// Print the place's persisted state as JSON at the end
    #[arg(long)]
    dump_state: bool,

    /// Enable verbose debug output
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<AffinityConfig> {
    let Some(path) = path else {
        return Ok(AffinityConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    AffinityConfig::from_toml(&text).with_context(|| format!("invalid config {}", path.display()))
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

struct Operative {
    actor_id: &'static str,
    tags: [&'static str; 3],
    grime: u32,
    game: u32,
    grift: u32,
    guns: u32,
    guile: u32,
}

#[derive(Debug, Default)]
struct Clocks {
    progress: u32,
    time: u32,
    heat: u32,
    exposure: u32,
    trauma: u32,
}

impl Clocks {
    fn raise(clock: &mut u32, by: u32) {
        *clock = (*clock + by).min(CLOCK_MAX);
    }

    fn lower(clock: &mut u32, by: u32) {
        *clock = clock.saturating_sub(by);
    }

    fn verdict(&self) -> Option<Verdict> {
        if self.progress >= CLOCK_MAX {
            Some(Verdict::Win)
        } else if self.time >= TIME_MAX {
            Some(Verdict::OutOfTime)
        } else if self.heat >= CLOCK_MAX {
            Some(Verdict::Blown)
        } else if self.exposure >= CLOCK_MAX {
            Some(Verdict::Claimed)
        } else {
            None
        }
    }
}

impl fmt::Display for Clocks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "STATE  progress={}/{CLOCK_MAX}  time={}/{TIME_MAX}  heat={}/{CLOCK_MAX}  exposure={}/{CLOCK_MAX}  trauma={}",
            self.progress, self.time, self.heat, self.exposure, self.trauma
        )
    }
}

enum Verdict {
    Win,
    OutOfTime,
    Blown,
    Claimed,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Win => write!(f, "WIN: progress complete, the meeting happens."),
            Self::OutOfTime => write!(f, "LOSE: out of time, the operation collapses."),
            Self::Blown => write!(f, "LOSE: heat maxed, blown."),
            Self::Claimed => write!(f, "LOSE: exposure maxed, the Circle has you."),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Blend,
    Probe,
    Press,
    Payoff,
    CutOut,
}

#[derive(Debug, Clone, Copy)]
enum Complication {
    WrongTurn,
    Watched,
    LocalMuscle,
    WardRipple,
}

/// `stat + d10 >= dc + 10`.
fn roll(stat: u32, rng: &mut StdRng, dc: u32) -> bool {
    stat + rng.gen_range(1..=10) >= dc + 10
}

fn uneasy(threshold: ThresholdLabel) -> bool {
    matches!(threshold, ThresholdLabel::Hostile | ThresholdLabel::Unwelcoming)
}

fn pick_complication(clocks: &Clocks, threshold: ThresholdLabel, rng: &mut StdRng) -> Option<Complication> {
    let mut chance = 0.15 + 0.05 * f64::from(clocks.exposure) + 0.03 * f64::from(clocks.heat);
    if uneasy(threshold) {
        chance += 0.15;
    }
    if rng.gen_range(0.0..1.0) > chance.min(0.85) {
        return None;
    }
    let bump = |on: bool| if on { 1.0 } else { 0.0 };
    let pool = [
        (Complication::WrongTurn, 1.0 + bump(clocks.exposure >= 3)),
        (Complication::Watched, 1.0 + bump(clocks.exposure >= 2)),
        (Complication::LocalMuscle, 1.0 + bump(clocks.heat >= 2)),
        (Complication::WardRipple, 0.5 + bump(uneasy(threshold))),
    ];
    pool.choose_weighted(rng, |entry| entry.1).ok().map(|entry| entry.0)
}

fn apply_complication(complication: Complication, clocks: &mut Clocks) -> &'static str {
    match complication {
        Complication::WrongTurn => {
            clocks.time += 1;
            Clocks::raise(&mut clocks.exposure, 1);
            "Wrong turn: +1 TIME, +1 EXPOSURE"
        }
        Complication::Watched => {
            Clocks::raise(&mut clocks.exposure, 1);
            "Watched: +1 EXPOSURE"
        }
        Complication::LocalMuscle => {
            Clocks::raise(&mut clocks.heat, 1);
            "Local muscle: +1 HEAT"
        }
        Complication::WardRipple => {
            Clocks::raise(&mut clocks.exposure, 2);
            "Ward ripple: +2 EXPOSURE"
        }
    }
}

fn choose_action(clocks: &Clocks, rng: &mut StdRng) -> Action {
    if clocks.time <= 1 {
        Action::Probe
    } else if clocks.progress <= 3 && clocks.exposure <= 3 && clocks.heat <= 3 && rng.gen_bool(0.4) {
        Action::Press
    } else if clocks.heat >= 4 {
        if rng.gen_bool(0.6) { Action::Payoff } else { Action::Blend }
    } else if clocks.exposure >= 4 {
        Action::CutOut
    } else {
        [(Action::Blend, 0.40), (Action::Probe, 0.35), (Action::Press, 0.25)]
            .choose_weighted(rng, |entry| entry.1)
            .map_or(Action::Blend, |entry| entry.0)
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

fn build_circle() -> Place {
    Place::new(
        PLACE_ID,
        "The Circle (5th & Amaranth)",
        ValuationProfile::new()
            .with("social.threaten", -0.9)
            .with("social", -0.2)
            .with("trespass.enter", -0.6)
            .with("trespass", -0.3)
            .with("harm.fire", -0.8)
            .with("harm", -0.2)
            .with("magic", 0.1),
    )
}

struct Sim {
    engine: AffinityEngine,
    place: Place,
    operative: Operative,
    clocks: Clocks,
    rng: StdRng,
}

impl Sim {
    fn event(&self, category: &str, intensity: f64, now: Timestamp) -> AffinityEvent {
        AffinityEvent::new(category, self.operative.actor_id, PLACE_ID, intensity, now).with_tags(self.operative.tags)
    }

    fn record(&mut self, event: &AffinityEvent) {
        self.engine.record_event(&mut self.place, event);
    }

    fn turn(&mut self, now: Timestamp) {
        let tags = self.operative.tags.iter().map(|t| (*t).to_string()).collect();
        let affinity = self.engine.compute_affinity(&self.place, self.operative.actor_id, &tags, now);
        let threshold = ThresholdLabel::from_affinity(affinity);

        let ctx = AffordanceContext::new(self.operative.actor_id, "move.pass", now).with_tags(self.operative.tags);
        let outcome = self.engine.evaluate(&mut self.place, &ctx);

        println!("\n--- TURN {} ---", self.clocks.time + 1);
        println!("Affinity={affinity:.3} ({threshold})");
        if let Some(tell) = outcome.narrative.first() {
            println!("WORLD: {tell}");
        }
        if let Some(modifier) = outcome.adjustments.get("room.travel_time_modifier") {
            println!("MOD: travel_time_modifier={modifier:+.3}");
        }
        debug!(
            seed = outcome.snapshot.seed,
            effects = outcome.effects.len(),
            "movement evaluated"
        );

        if let Some(complication) = pick_complication(&self.clocks, threshold, &mut self.rng) {
            println!("COMPLICATION: {}", apply_complication(complication, &mut self.clocks));
        }

        let action = choose_action(&self.clocks, &mut self.rng);
        println!("ACTION: {action:?}");
        self.act(action, now);

        let report = self.engine.tick(&mut self.place, now);
        if report.ran {
            debug!(expired = report.cooldowns_expired, "maintenance ran");
        }
        println!("{}", self.clocks);
    }

    fn act(&mut self, action: Action, now: Timestamp) {
        let op = &self.operative;
        let (grime, game, grift, guns, guile) = (op.grime, op.game, op.grift, op.guns, op.guile);
        match action {
            Action::Blend => {
                let ok = roll(grift + game, &mut self.rng, 9);
                if ok {
                    Clocks::lower(&mut self.clocks.heat, 1);
                    if self.rng.gen_bool(0.4) {
                        Clocks::raise(&mut self.clocks.progress, 1);
                    }
                }
                let event = self.event("trespass.enter", 0.15, now);
                self.record(&event);
            }
            Action::Probe => {
                if roll(guile, &mut self.rng, 9) {
                    Clocks::raise(&mut self.clocks.progress, 1);
                }
                Clocks::raise(&mut self.clocks.exposure, 1);
                let event = self.event("trespass.enter", 0.20, now);
                self.record(&event);
                let witness = AffinityEvent::new("magic.observe", "claire", PLACE_ID, 0.7, now).with_tags(["witch"]);
                self.record(&witness);
            }
            Action::Press => {
                let ok = roll(guns + grime, &mut self.rng, 11);
                Clocks::raise(&mut self.clocks.progress, if ok { 2 } else { 1 });
                Clocks::raise(&mut self.clocks.heat, 2);
                Clocks::raise(&mut self.clocks.exposure, 1);
                let event = self.event("social.threaten", 0.65, now);
                self.record(&event);
            }
            Action::Payoff => {
                let ok = roll(game, &mut self.rng, 10);
                Clocks::lower(&mut self.clocks.heat, if ok { 2 } else { 1 });
                Clocks::raise(&mut self.clocks.exposure, 1);
                let category = if ok { "trade.fair" } else { "trade.exploit" };
                let event = self.event(category, 0.3, now);
                self.record(&event);
            }
            Action::CutOut => {
                let ok = roll(grift, &mut self.rng, 9);
                Clocks::lower(&mut self.clocks.exposure, if ok { 2 } else { 1 });
                Clocks::lower(&mut self.clocks.progress, 1);
            }
        }
        self.clocks.time += 1;
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_ref())?;
    let engine = AffinityEngine::new(config, AffordanceCatalog::standard()?)?;
    let mut sim = Sim {
        engine,
        place: build_circle(),
        operative: Operative {
            actor_id: "switch",
            tags: ["human", "outsider", "crew"],
            grime: 4,
            game: 4,
            grift: 7,
            guns: 3,
            guile: 7,
        },
        clocks: Clocks::default(),
        rng: StdRng::seed_from_u64(cli.seed),
    };
    let cleared = sim.engine.reset_cooldowns(&mut sim.place);
    info!(seed = cli.seed, cleared, "tutorial loop starting");

    println!("{}", "=".repeat(72));
    println!("TUTORIAL LOOP: one operative, four clocks, one place that notices");
    println!("seed={}", cli.seed);
    println!("{}", "=".repeat(72));

    let mut now = Timestamp::from_secs(0.0);
    let entry = sim.event("trespass.enter", 0.25, now);
    sim.record(&entry);

    let verdict = loop {
        if let Some(verdict) = sim.clocks.verdict() {
            break verdict;
        }
        now = now.plus_secs(TURN_SECS);
        sim.turn(now);
    };
    println!("\n{verdict}");

    if cli.metrics {
        print!("{}", sim.engine.counters().to_prometheus());
    }
    if cli.dump_state {
        println!("{}", sim.place.capture_state().to_json()?);
    }
    Ok(())
}
