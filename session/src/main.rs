use clap::{Parser, ValueEnum};
use log::{info, warn};
use session::demo::{Demo, DemoOptions};
use shared::{get_timestamp, GameMode, SessionConfig, TieBreak, TurnBattleMode};
use tokio::time::{interval, Duration, MissedTickBehavior};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Realtime,
    Turn,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Ruleset {
    Classic,
    Powerup,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Room name shown in the session browser
    #[arg(short, long, default_value = "Den")]
    room: String,

    /// Name of the hosting player
    #[arg(short, long, default_value = "Host")]
    name: String,

    /// Scripted bots joining the room (real-time rounds always use one)
    #[arg(short, long, default_value = "1")]
    bots: usize,

    #[arg(short, long, value_enum, default_value = "realtime")]
    mode: Mode,

    /// Turn-battle ruleset
    #[arg(long, value_enum, default_value = "classic")]
    ruleset: Ruleset,

    #[arg(long, default_value = "0")]
    map: u32,

    /// Frames per second of the session loop
    #[arg(short, long, default_value = "60")]
    fps: u32,

    /// Give up after this many frames
    #[arg(long, default_value = "36000")]
    frames: u64,

    /// Tag separating this deployment's sessions from others on the transport
    #[arg(short, long, default_value = "SNK")]
    tag: String,

    /// Seed for bot behaviour and food placement
    #[arg(long)]
    seed: Option<u64>,

    /// Route inbound messages through the bounded envelope queue
    #[arg(long)]
    buffered: bool,

    /// Report a tied turn battle as a draw instead of favouring the lower slot
    #[arg(long)]
    draw_on_tie: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = SessionConfig {
        team_tag: args.tag.clone(),
        buffered_dispatch: args.buffered,
        tie_break: if args.draw_on_tie {
            TieBreak::Draw
        } else {
            TieBreak::FirstSeenSlot
        },
        ..SessionConfig::default()
    };
    let options = DemoOptions {
        room: args.room.clone(),
        host_name: args.name.clone(),
        bots: args.bots,
        mode: match args.mode {
            Mode::Realtime => GameMode::RealTime,
            Mode::Turn => GameMode::TurnBattle,
        },
        ruleset: match args.ruleset {
            Ruleset::Classic => TurnBattleMode::Classic,
            Ruleset::Powerup => TurnBattleMode::PowerUp,
        },
        map: args.map,
        seed: args.seed.unwrap_or_else(rand::random),
        config,
    };

    info!("Starting session {:?} ({:?}, seed {})", options.room, options.mode, options.seed);
    let mut demo = Demo::new(options)?;

    let mut ticker = interval(Duration::from_micros(1_000_000 / u64::from(args.fps.max(1))));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    for _ in 0..args.frames {
        ticker.tick().await;
        let Some(outcome) = demo.step(get_timestamp()) else {
            continue;
        };

        info!("Session finished in {:?}", outcome.state);
        for (place, (name, score)) in outcome.standings.iter().enumerate() {
            info!("{}. {} - {}", place + 1, name, score);
        }
        match outcome.winner {
            Some(winner) => println!("Winner: {}", winner),
            None => println!("No winner"),
        }
        return Ok(());
    }

    warn!("No result after {} frames", args.frames);
    Ok(())
}
