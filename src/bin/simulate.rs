use bomber_arena::constants::TICK_MS;
use bomber_arena::engine::{Participant, Round, RoundOptions};
use bomber_arena::error::{GameError, GameResult};
use bomber_arena::level::{generate_grid, load_level, LevelSpec};
use bomber_arena::rng::Rng;
use bomber_arena::types::{CellType, Difficulty, GameMode, RoundEndReason, RuntimeEvent, Snapshot};
use clap::Parser;
use log::Level;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs bot-only arena rounds headlessly")]
struct Cli {
    /// Level document; a classic auto-filled level is used when omitted.
    #[arg(long)]
    level: Option<PathBuf>,
    #[arg(long, default_value_t = 13)]
    width: i32,
    #[arg(long, default_value_t = 11)]
    height: i32,
    #[arg(long, default_value_t = 4)]
    bots: usize,
    /// Bot tier, clamped into 1..=3.
    #[arg(long, default_value_t = 3)]
    difficulty: i64,
    #[arg(long, default_value = "bot_game")]
    mode: String,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 180)]
    max_seconds: u64,
    #[arg(long, default_value_t = 1)]
    scenarios: usize,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    bots: usize,
    difficulty: Difficulty,
    mode: GameMode,
    seed: u32,
    #[serde(rename = "maxSeconds")]
    max_seconds: u64,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    bots: usize,
    difficulty: Difficulty,
    mode: GameMode,
    reason: RoundEndReason,
    winner: Option<String>,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    ticks: u64,
    #[serde(rename = "bombsPlaced")]
    bombs_placed: u32,
    #[serde(rename = "bricksDestroyed")]
    bricks_destroyed: u32,
    /// Eliminations credited to each bot; self-hits are not counted.
    #[serde(rename = "eliminationsBy")]
    eliminations_by: BTreeMap<String, u32>,
    #[serde(rename = "selfEliminations")]
    self_eliminations: u32,
    #[serde(rename = "flagsCaptured")]
    flags_captured: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let level = match resolve_level(&cli) {
        Ok(level) => level,
        Err(error) => {
            log::error!("invalid level: {error}");
            std::process::exit(2);
        }
    };
    let scenarios = match resolve_scenarios(&cli) {
        Ok(scenarios) => scenarios,
        Err(error) => {
            log::error!("{error}");
            std::process::exit(2);
        }
    };

    let mut has_anomaly = false;
    for scenario in scenarios {
        emit_log(
            Level::Info,
            "scenario_started",
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "bots": scenario.bots,
                "difficulty": scenario.difficulty,
                "mode": scenario.mode,
                "maxSeconds": scenario.max_seconds,
            }),
        );
        let result = match run_scenario(&level, &scenario) {
            Ok(result) => result,
            Err(error) => {
                emit_log(
                    Level::Error,
                    "scenario_failed",
                    Some(&scenario.name),
                    Some(scenario.seed),
                    None,
                    json!({ "error": error.to_string() }),
                );
                std::process::exit(2);
            }
        };

        for anomaly in &result.anomalies {
            emit_log(
                Level::Warn,
                "anomaly_detected",
                Some(&scenario.name),
                Some(scenario.seed),
                None,
                json!({ "message": anomaly }),
            );
        }
        has_anomaly |= !result.anomalies.is_empty();

        emit_log(
            Level::Info,
            "scenario_finished",
            Some(&scenario.name),
            Some(scenario.seed),
            Some(result.ticks),
            json!({
                "reason": result.reason,
                "winner": result.winner,
                "durationMs": result.duration_ms,
            }),
        );

        match serde_json::to_string(&result) {
            Ok(line) => println!("{line}"),
            Err(error) => log::error!("failed to serialize scenario result: {error}"),
        }
    }

    if has_anomaly {
        std::process::exit(1);
    }
}

fn resolve_level(cli: &Cli) -> GameResult<LevelSpec> {
    let level = match cli.level.as_deref() {
        Some(path) => load_level(path)?,
        None => LevelSpec::classic(cli.width, cli.height, true),
    };
    level.validate()?;
    Ok(level)
}

fn resolve_scenarios(cli: &Cli) -> GameResult<Vec<Scenario>> {
    let mode = GameMode::parse(&cli.mode)
        .ok_or_else(|| GameError::Configuration(format!("unknown mode '{}'", cli.mode)))?;
    let seed = cli.seed.unwrap_or_else(now_ms) as u32;
    let difficulty = Difficulty::from_level(cli.difficulty);
    let bots = cli.bots.clamp(1, 9);

    Ok((0..cli.scenarios.max(1))
        .map(|idx| Scenario {
            name: format!("{}-bots{}-{}", difficulty.label().to_lowercase(), bots, idx + 1),
            bots,
            difficulty,
            mode,
            seed: seed.wrapping_add(idx as u32),
            max_seconds: cli.max_seconds.max(1),
        })
        .collect())
}

fn run_scenario(level: &LevelSpec, scenario: &Scenario) -> GameResult<ScenarioResultLine> {
    let grid = generate_grid(level, &mut Rng::new(scenario.seed))?;
    let participants = (0..scenario.bots)
        .map(|idx| Participant::bot(format!("Bot-{:02}", idx + 1), scenario.difficulty.level() as i64))
        .collect();
    let options = RoundOptions {
        time_limit_ms: scenario.max_seconds * 1000,
        ..RoundOptions::default()
    };
    let mut round = Round::new(
        grid,
        participants,
        scenario.mode,
        options,
        Rng::new(scenario.seed.wrapping_mul(31).wrapping_add(17)),
        0,
    )?;

    let mut bombs_placed = 0;
    let mut bricks_destroyed = 0;
    let mut eliminations_by = BTreeMap::new();
    let mut self_eliminations = 0;
    let mut flags_captured = 0;
    let mut anomalies = Vec::new();
    let tick_limit = scenario.max_seconds * 1000 / TICK_MS + 1;

    while !round.is_ended() {
        let now_ms = (round.tick() + 1) * TICK_MS;
        round.step(now_ms);
        let snapshot = round.build_snapshot(now_ms);
        for message in collect_snapshot_anomalies(&snapshot) {
            if !anomalies.contains(&message) {
                anomalies.push(message);
            }
        }
        for event in round.drain_events() {
            match event {
                RuntimeEvent::BombPlaced { .. } => bombs_placed += 1,
                RuntimeEvent::BrickDestroyed { .. } => bricks_destroyed += 1,
                RuntimeEvent::PlayerEliminated { name, by } if name == by => self_eliminations += 1,
                RuntimeEvent::PlayerEliminated { by, .. } => *eliminations_by.entry(by).or_insert(0) += 1,
                RuntimeEvent::FlagCaptured { .. } => flags_captured += 1,
                _ => {}
            }
        }
        if round.tick() > tick_limit {
            anomalies.push(format!("round still running after {} ticks", round.tick()));
            break;
        }
    }

    let (reason, winner, duration_ms) = match round.outcome() {
        Some(outcome) => (outcome.reason, outcome.winner, outcome.duration_ms),
        None => (RoundEndReason::Timeout, None, round.tick() * TICK_MS),
    };
    Ok(ScenarioResultLine {
        scenario: scenario.name.clone(),
        seed: scenario.seed,
        bots: scenario.bots,
        difficulty: scenario.difficulty,
        mode: scenario.mode,
        reason,
        winner,
        duration_ms,
        ticks: round.tick(),
        bombs_placed,
        bricks_destroyed,
        eliminations_by,
        self_eliminations,
        flags_captured,
        anomalies,
    })
}

fn collect_snapshot_anomalies(snapshot: &Snapshot) -> Vec<String> {
    let mut anomalies = Vec::new();
    for player in &snapshot.players {
        match snapshot.grid.cell_type(player.position) {
            None => anomalies.push(format!("player outside grid: {}", player.name)),
            Some(CellType::Empty) => {}
            Some(other) => anomalies.push(format!("player inside {other:?}: {}", player.name)),
        }
    }

    let mut bomb_cells = HashSet::new();
    for bomb in &snapshot.bombs {
        if !bomb_cells.insert(bomb.position) {
            anomalies.push(format!("stacked bombs at ({}, {})", bomb.position.x, bomb.position.y));
        }
    }
    anomalies
}

fn emit_log(
    level: Level,
    event: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        event: event.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        tick,
        details,
    };
    match serde_json::to_string(&log_line) {
        Ok(text) => log::log!(level, "{text}"),
        Err(error) => log::error!("failed to serialize {event} log line: {error}"),
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
