use std::fs;
use std::time::Duration;

use pose_follow::config::Config;
use pose_follow::pose::{Keypoint, KeypointIndex, KeypointSet, ReplayEstimator};
use pose_follow::sequence::{has_forbidden_neighbours, DirPoseStore};
use pose_follow::session::{
    run_session, RunOutcome, SessionCommand, SessionController, SessionEvent, SessionPhase,
};
use pose_follow::tracker::MatchEvent;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Standing figure whose elbow bend depends on the pose id.
fn reference_pose(id: u32) -> KeypointSet {
    let spread = id as f32 * 12.0;
    KeypointIndex::ALL
        .iter()
        .map(|index| {
            let (x, y) = match index {
                KeypointIndex::LeftShoulder => (-20.0, 0.0),
                KeypointIndex::RightShoulder => (20.0, 0.0),
                KeypointIndex::LeftElbow => (-40.0, 0.0),
                KeypointIndex::RightElbow => (40.0, 0.0),
                KeypointIndex::LeftWrist => (-40.0 - spread.to_radians().cos() * 20.0, spread.to_radians().sin() * 20.0),
                KeypointIndex::RightWrist => (40.0 + spread.to_radians().cos() * 20.0, spread.to_radians().sin() * 20.0),
                KeypointIndex::LeftHip => (-15.0, 60.0),
                KeypointIndex::RightHip => (15.0, 60.0),
                KeypointIndex::LeftKnee => (-15.0, 100.0),
                KeypointIndex::RightKnee => (15.0, 100.0),
                KeypointIndex::LeftAnkle => (-15.0, 140.0),
                KeypointIndex::RightAnkle => (15.0, 140.0),
                _ => (0.0, -30.0),
            };
            Keypoint::new(index.name(), x, y, 0.9)
        })
        .collect()
}

fn write_poses(dir: &TempDir, ids: impl IntoIterator<Item = u32>) {
    for id in ids {
        let json = serde_json::to_string(&reference_pose(id)).unwrap();
        fs::write(dir.path().join(format!("pose{id}.json")), json).unwrap();
    }
}

fn config_for(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.assets.dir = dir.path().display().to_string();
    config.sequence.seed = Some(3);
    config
}

fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

#[test]
fn test_orders_never_put_five_next_to_seven() {
    let dir = TempDir::new().unwrap();
    write_poses(&dir, 1..=7);
    let config = config_for(&dir);
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut controller = SessionController::new(&config, DirPoseStore::from_config(&config.assets), tx)
        .with_rng(StdRng::seed_from_u64(99));

    for _ in 0..200 {
        controller.start(|| Ok(())).unwrap();
        let mut sorted = controller.order().to_vec();
        sorted.sort();
        assert_eq!(sorted, (1..=7).collect::<Vec<_>>());
        assert!(!has_forbidden_neighbours(controller.order(), &[(5, 7)]));
    }
}

#[test]
fn test_fifty_matching_frames_advance_and_forty_then_eleven_do_not() {
    let dir = TempDir::new().unwrap();
    write_poses(&dir, 1..=7);
    fs::write(dir.path().join("pose3.PNG"), b"png").unwrap();
    let config = config_for(&dir);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut controller = SessionController::new(&config, DirPoseStore::from_config(&config.assets), tx);

    controller.start(|| Ok(())).unwrap();
    let generation = controller.generation();

    let poses = controller.poses().to_vec();
    let with_image = poses.iter().find(|p| p.id == 3).unwrap();
    assert_eq!(with_image.image, Some(dir.path().join("pose3.PNG")));
    assert!(poses.iter().filter(|p| p.id != 3).all(|p| p.image.is_none()));

    // 40 good, 11 bad: streaks reset, pose stays
    let good = vec![poses[0].keypoints.clone()];
    let bad: Vec<KeypointSet> = Vec::new();
    for _ in 0..40 {
        controller.on_frame(generation, &good);
    }
    let mut last = None;
    for _ in 0..11 {
        last = controller.on_frame(generation, &bad);
    }
    assert_eq!(last, Some(MatchEvent::Cooldown));
    assert_eq!(controller.current_pose().unwrap().id, poses[0].id);

    // a fresh run of 50 advances exactly once
    drain(&mut rx);
    for _ in 0..50 {
        controller.on_frame(generation, &good);
    }
    assert_eq!(controller.current_pose().unwrap().id, poses[1].id);
    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], SessionEvent::PoseChanged { index: 1, pose } if pose.id == poses[1].id));
}

#[test]
fn test_missing_reference_data_fails_start() {
    let dir = TempDir::new().unwrap();
    write_poses(&dir, 1..=6);
    let config = config_for(&dir);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut controller = SessionController::new(&config, DirPoseStore::from_config(&config.assets), tx);

    let err = controller.start(|| Ok(())).unwrap_err();
    assert!(err.to_string().contains("pose 7"));
    assert_eq!(controller.phase(), SessionPhase::Idle);
    assert!(matches!(drain(&mut rx).as_slice(), [SessionEvent::SessionAborted { .. }]));
}

#[tokio::test]
async fn test_replayed_session_runs_to_the_end() {
    let dir = TempDir::new().unwrap();
    write_poses(&dir, 1..=7);
    let config = config_for(&dir);

    // learn the seeded order first, then record frames that follow it
    let (preview_tx, _preview_rx) = mpsc::unbounded_channel();
    let mut preview = SessionController::new(&config, DirPoseStore::from_config(&config.assets), preview_tx);
    preview.start(|| Ok(())).unwrap();
    let order = preview.order().to_vec();

    let mut frames: Vec<Option<KeypointSet>> = Vec::new();
    for id in &order {
        frames.extend(std::iter::repeat(None).take(5));
        frames.extend(std::iter::repeat(Some(reference_pose(*id))).take(50));
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut controller = SessionController::new(&config, DirPoseStore::from_config(&config.assets), tx);
    let (_commands_tx, mut commands) = mpsc::channel::<SessionCommand>(1);
    let mut replay = Some(ReplayEstimator::from_frames(frames));
    let outcome = run_session(
        &mut controller,
        || replay.take().ok_or_else(|| anyhow::anyhow!("no second replay")),
        &mut commands,
        Duration::ZERO,
    )
    .await
    .unwrap();

    assert_eq!(outcome, RunOutcome::Finished);
    let events = drain(&mut rx);
    assert_eq!(events.first(), Some(&SessionEvent::SessionStarted { order: order.clone() }));
    let shown: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::PoseChanged { pose, .. } => Some(pose.id),
            _ => None,
        })
        .collect();
    assert_eq!(shown, order);
    assert_eq!(events.last(), Some(&SessionEvent::SessionFinished));
}
