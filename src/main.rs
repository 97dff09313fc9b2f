use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use pose_follow::config::Config;
use pose_follow::error::report;
use pose_follow::pose::{Estimator, KeypointSet, ReplayEstimator};
use pose_follow::sequence::DirPoseStore;
use pose_follow::session::{
    frame_period, run_session, RunOutcome, SessionCommand, SessionController, SessionEvent,
};

#[derive(Parser, Debug)]
#[command(name = "pose-follow", about = "Match the shown poses in order")]
struct Args {
    /// Config file (missing file = defaults)
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Play recorded keypoint frames instead of the camera
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Fixed seed for the pose order
    #[arg(long)]
    seed: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Camera or recorded frames, chosen at start-up.
enum FrameSource {
    Replay(ReplayEstimator),
    #[cfg(feature = "desktop")]
    Camera(pose_follow::pose::CameraEstimator),
}

impl Estimator for FrameSource {
    async fn estimate(&mut self) -> Result<Vec<KeypointSet>> {
        match self {
            FrameSource::Replay(replay) => replay.estimate().await,
            #[cfg(feature = "desktop")]
            FrameSource::Camera(camera) => camera.estimate().await,
        }
    }

    fn is_exhausted(&self) -> bool {
        match self {
            FrameSource::Replay(replay) => replay.is_exhausted(),
            #[cfg(feature = "desktop")]
            FrameSource::Camera(camera) => camera.is_exhausted(),
        }
    }
}

fn open_source(config: &Config, replay: Option<&PathBuf>) -> Result<FrameSource> {
    if let Some(path) = replay {
        let replay = ReplayEstimator::load(path)?;
        info!(path = %path.display(), frames = replay.remaining(), "replaying recorded frames");
        return Ok(FrameSource::Replay(replay));
    }
    #[cfg(feature = "desktop")]
    {
        let camera = pose_follow::pose::CameraEstimator::open(config)?;
        Ok(FrameSource::Camera(camera))
    }
    #[cfg(not(feature = "desktop"))]
    {
        let _ = config;
        anyhow::bail!("camera support needs the `desktop` feature; use --replay <FILE>")
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::SessionStarted { order } => {
            println!("セッション開始: 順番 {:?}", order);
        }
        SessionEvent::PoseChanged { pose, index } => {
            let image = pose
                .image
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(画像なし)".to_string());
            println!("ポーズ {} / id {} : {}", index + 1, pose.id, image);
        }
        SessionEvent::SessionFinished => println!("全ポーズ完了!"),
        SessionEvent::SessionAborted { reason } => println!("中断: {}", reason),
    }
}

fn parse_command(line: &str) -> Option<SessionCommand> {
    match line.trim() {
        "" | "s" => Some(SessionCommand::Skip),
        "r" => Some(SessionCommand::Restart),
        "q" => Some(SessionCommand::Stop),
        _ => None,
    }
}

/// Waits until the user asks for another session (true) or quits (false).
/// Skips mean nothing while no session is running.
async fn wait_for_restart(commands: &mut mpsc::Receiver<SessionCommand>) -> bool {
    loop {
        match commands.recv().await {
            Some(SessionCommand::Restart) => return true,
            Some(SessionCommand::Stop) | None => return false,
            Some(SessionCommand::Skip) => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level_filter = args
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);
    tracing_subscriber::fmt()
        .with_max_level(log_level_filter)
        .with_target(false)
        .init();

    let mut config = Config::load_or_default(&args.config);
    if args.seed.is_some() {
        config.sequence.seed = args.seed;
    }

    println!("=== Pose Follow ===");
    println!("コマンド:");
    println!("  Enter / s  - 次のポーズへスキップ");
    println!("  r          - 最初からやり直す");
    println!("  q          - 終了");
    println!();

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event);
        }
    });

    let (command_tx, mut commands) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_command(&line) {
                Some(command) => {
                    if command_tx.send(command).await.is_err() || command == SessionCommand::Stop {
                        break;
                    }
                }
                None => println!("不明なコマンド: {}", line.trim()),
            }
        }
    });

    let store = DirPoseStore::from_config(&config.assets);
    info!(dir = %store.root().display(), "reference poses");
    let mut controller = SessionController::new(&config, store, event_tx);
    let period = frame_period(config.app.target_fps);

    loop {
        let result = run_session(
            &mut controller,
            || open_source(&config, args.replay.as_ref()),
            &mut commands,
            period,
        )
        .await;

        let retry = match result {
            // the controller is idle; the abort reason reaches the printer as an event
            Err(e) => {
                error!(error = %report(&e), "session failed to start");
                println!("r で再試行、q で終了");
                wait_for_restart(&mut commands).await
            }
            Ok(RunOutcome::Finished) => {
                println!("r でもう一度、q で終了");
                wait_for_restart(&mut commands).await
            }
            Ok(RunOutcome::Stopped) => false,
            Ok(RunOutcome::SourceExhausted) => {
                warn!("frame source ran out before the session finished");
                false
            }
        };
        if !retry {
            break;
        }
    }

    drop(controller);
    printer.await.context("Event printer panicked")?;
    // tokio's stdin read cannot be cancelled; don't wait for the next line
    std::process::exit(0)
}
