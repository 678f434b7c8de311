//! vida CLI
//!
//! Usage:
//!   vida                       # Simulated challenge run (default)
//!   vida --steps 5 --seed 42   # Reproducible 5-movement run
//!   vida --score 40            # Simulated backend rejects the session
//!   vida --serve               # HTTP API server
//!   vida --json                # JSON state updates

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use colored::Colorize;

use vida::core::api::run_server;
use vida::core::{ChallengeRuntime, Event, EvidenceSource, LatestFrameEvidence, SimulatedBackend};
use vida::types::{ChallengeConfig, DetectionSample, MovementType, Thresholds, ValidationState};
use vida::{TICK_INTERVAL_MS, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "vida",
    version = VERSION,
    about = "Liveness challenge orchestrator - randomized head-movement and blink challenges",
    long_about = "vida drives a liveness validation session: a randomized sequence of\n\
                  head movements (up, down, left, right, approach), each gated by\n\
                  re-centering and a countdown, with blink counting running across\n\
                  the whole session. Evidence for every step is submitted to a\n\
                  scoring backend whose final decision settles the session.\n\n\
                  Modes:\n  \
                  (default)  Simulated run against the built-in backend\n  \
                  --serve    HTTP API server mode"
)]
struct Args {
    /// Run a simulated challenge against the built-in backend (default mode)
    #[arg(long)]
    simulate: bool,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Movements per session (clamped to the 5 available types)
    #[arg(long, default_value_t = 3)]
    steps: usize,

    /// Fixed RNG seed for a reproducible movement sequence
    #[arg(long)]
    seed: Option<u64>,

    /// Movement timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Score the simulated backend reports on the final step
    #[arg(long, default_value_t = 95.0)]
    score: f64,

    /// Output state updates as JSON lines
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vida=info")),
        )
        .init();

    let args = Args::parse();
    if args.no_color {
        colored::control::set_override(false);
    }

    let config = ChallengeConfig {
        steps: args.steps,
        movement_timeout: Duration::from_secs(args.timeout_secs),
        ..ChallengeConfig::default()
    };

    if args.serve && !args.simulate {
        run_serve(&args, config).await;
    } else {
        // Simulation is the default when no mode is given
        run_simulation(&args, config).await;
    }
}

/// Run HTTP API server
async fn run_serve(args: &Args, config: ChallengeConfig) {
    println!();
    println!("  👁 vida liveness API v{}", VERSION);
    println!();

    let backend = Arc::new(SimulatedBackend {
        final_score: args.score,
        ..SimulatedBackend::default()
    });
    if let Err(e) = run_server(&args.addr, config, Thresholds::default(), backend).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Drive one full challenge against the simulated backend with synthetic
/// detector frames, printing each state change.
async fn run_simulation(args: &Args, config: ChallengeConfig) {
    let thresholds = Thresholds::default();
    let backend = Arc::new(SimulatedBackend {
        final_score: args.score,
        ..SimulatedBackend::default()
    });
    let evidence = Arc::new(LatestFrameEvidence::new());
    evidence.store("c2ltdWxhdGVkLXBob3Rv".to_string());

    let (mut runtime, handle, mut events) = ChallengeRuntime::new(
        config,
        thresholds,
        backend,
        Arc::clone(&evidence) as Arc<dyn EvidenceSource>,
        args.seed,
    );

    if !args.json {
        println!();
        println!("{}", format!("  vida v{} - simulated run", VERSION).bold());
        println!();
    }

    // The runtime is driven directly with a simulated clock; submission
    // results still arrive through the event queue, drained each step.
    let mut now = Instant::now();
    runtime.handle_event(Event::Start { session_id: None }, now);

    let mut last_printed = String::new();
    let mut blink_frames_left = 4u32;
    let mut approach_baseline_sent = false;

    // Enough iterations for 5 steps with 3s countdowns at one tick per 200ms
    for _ in 0..2000 {
        // Let spawned submission tasks resolve, then feed their results back
        tokio::time::sleep(Duration::from_millis(2)).await;
        while let Ok(event) = events.try_recv() {
            runtime.handle_event(event, now);
        }

        let state = handle.state();
        print_update(&state, &mut last_printed, args.json);

        if !state.is_in_progress && state.phase != "idle" {
            break;
        }

        if state.phase != "awaiting_movement" {
            approach_baseline_sent = false;
        }
        if let Some(sample) =
            synthetic_frame(&state, &mut blink_frames_left, &mut approach_baseline_sent)
        {
            runtime.handle_event(Event::Frame(sample), now);
        }

        now += Duration::from_millis(TICK_INTERVAL_MS);
        runtime.handle_event(Event::Tick, now);
    }

    // Drain the final submission result if the loop ended on it
    tokio::time::sleep(Duration::from_millis(20)).await;
    while let Ok(event) = events.try_recv() {
        runtime.handle_event(event, now);
    }
    let state = handle.state();
    print_update(&state, &mut last_printed, args.json);

    if !args.json {
        println!();
        println!(
            "  movements: {:?} | blinks: {} | score: {}",
            state.movements_completed,
            state.blinks_detected,
            state
                .score
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }
}

/// Synthesize the detector frame that moves the session forward in its
/// current phase; a couple of blink frames are injected at the start
fn synthetic_frame(
    state: &ValidationState,
    blink_frames_left: &mut u32,
    approach_baseline_sent: &mut bool,
) -> Option<DetectionSample> {
    let mut sample = DetectionSample {
        nose_x: 0.5,
        nose_y: 0.5,
        left_eye_aperture: 0.02,
        right_eye_aperture: 0.02,
        inter_eye_distance: 0.10,
    };

    match state.phase.as_str() {
        "centering" => {
            // Alternate closed/open eyes first so blinks register
            if *blink_frames_left > 0 {
                if *blink_frames_left % 2 == 0 {
                    sample.left_eye_aperture = 0.001;
                    sample.right_eye_aperture = 0.001;
                }
                *blink_frames_left -= 1;
            }
            Some(sample)
        }
        "preparing" => Some(sample),
        "awaiting_movement" => {
            let movement = MovementType::ALL
                .iter()
                .find(|m| Some(m.wire_name()) == state.current_movement.as_deref())?;
            match movement {
                MovementType::Up => sample.nose_y = 0.20,
                MovementType::Down => sample.nose_y = 0.80,
                MovementType::Left => sample.nose_x = 0.80,
                MovementType::Right => sample.nose_x = 0.20,
                // The first frame in the phase sets the reference distance,
                // so a neutral baseline goes out before the approach frame
                MovementType::Approach => {
                    if *approach_baseline_sent {
                        sample.inter_eye_distance = 0.13;
                    } else {
                        *approach_baseline_sent = true;
                    }
                }
            }
            Some(sample)
        }
        _ => None,
    }
}

/// Print the state when its visible message changed
fn print_update(state: &ValidationState, last_printed: &mut String, json: bool) {
    let key = format!("{}|{}|{}", state.phase, state.status_message, state.blinks_detected);
    if key == *last_printed {
        return;
    }
    *last_printed = key;

    if json {
        if let Ok(line) = serde_json::to_string(state) {
            println!("{}", line);
        }
        return;
    }

    let phase = match state.phase.as_str() {
        "completed" => state.phase.green(),
        "failed" => state.phase.red(),
        "awaiting_movement" => state.phase.yellow(),
        _ => state.phase.cyan(),
    };
    println!(
        "  [{}/{}] {:<18} {}",
        state.current_step, state.total_steps, phase, state.status_message
    );
}
