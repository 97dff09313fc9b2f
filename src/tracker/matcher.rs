use tracing::trace;

use crate::config::MatchingConfig;
use crate::pose::{angle, KeypointSet, NO_MATCH_SCORE};

/// 1フレーム処理した結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchEvent {
    /// 連続カウント中 (まだ判定なし)
    Tracking,
    /// 不一致が続いたので連続カウントをリセットした
    Cooldown,
    /// 次のポーズへ進んだ
    Advanced { index: usize },
    /// 最後のポーズを終えた
    Finished,
    /// 終了済みなので何もしていない
    Ignored,
}

/// トラッカーの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    Active {
        current_index: usize,
        success_streak: u32,
        fail_streak: u32,
    },
    Finished,
}

/// 連続一致フレームでポーズを進めるステートマシン
///
/// - 平均角度差 < `angle_threshold` なら一致フレーム、それ以外は不一致フレーム
/// - 一致が `required_frames` に達したら次のポーズへ
/// - 不一致が `max_fail_frames` を超えたら両カウントを0に戻す (ポーズは据え置き)
///
/// 2つのカウントは常に同時にリセットされる。
#[derive(Debug, Clone)]
pub struct MatchTracker {
    angle_threshold: f32,
    required_frames: u32,
    max_fail_frames: u32,
    pose_count: usize,
    current_index: usize,
    success_streak: u32,
    fail_streak: u32,
}

impl MatchTracker {
    pub fn new(pose_count: usize, angle_threshold: f32, required_frames: u32, max_fail_frames: u32) -> Self {
        Self {
            angle_threshold,
            required_frames,
            max_fail_frames,
            pose_count,
            current_index: 0,
            success_streak: 0,
            fail_streak: 0,
        }
    }

    /// 設定から作成
    pub fn from_config(config: &MatchingConfig, pose_count: usize) -> Self {
        Self::new(
            pose_count,
            config.angle_threshold,
            config.required_frames,
            config.max_fail_frames,
        )
    }

    pub fn state(&self) -> MatchState {
        if self.is_finished() {
            MatchState::Finished
        } else {
            MatchState::Active {
                current_index: self.current_index,
                success_streak: self.success_streak,
                fail_streak: self.fail_streak,
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.current_index >= self.pose_count
    }

    /// 現在のポーズ番号。終了後はポーズ数と等しい
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn success_streak(&self) -> u32 {
        self.success_streak
    }

    pub fn fail_streak(&self) -> u32 {
        self.fail_streak
    }

    pub fn pose_count(&self) -> usize {
        self.pose_count
    }

    /// ライブのキーポイントを基準ポーズと比較して1フレーム進める
    ///
    /// `live` が None (人物なし) の場合は不一致フレームとして扱う。
    pub fn observe(&mut self, live: Option<&KeypointSet>, reference: &KeypointSet) -> MatchEvent {
        let diff = match live {
            Some(live) => {
                let comparison = angle::compare(live, reference);
                if let Some((joint, worst)) = comparison.worst_joint() {
                    trace!(joint = joint.b.name(), diff = worst, "worst joint");
                }
                comparison.score
            }
            None => NO_MATCH_SCORE,
        };
        self.update(diff)
    }

    /// 角度差1フレーム分で状態を更新
    pub fn update(&mut self, diff: f32) -> MatchEvent {
        if self.is_finished() {
            return MatchEvent::Ignored;
        }

        // NaN は一致とみなさない
        if diff < self.angle_threshold {
            self.success_streak += 1;
        } else {
            self.fail_streak += 1;
        }

        if self.success_streak >= self.required_frames {
            self.advance()
        } else if self.fail_streak > self.max_fail_frames {
            self.reset_streaks();
            MatchEvent::Cooldown
        } else {
            MatchEvent::Tracking
        }
    }

    /// 比較なしで次のポーズへ進める (手動スキップ)
    pub fn skip(&mut self) -> MatchEvent {
        if self.is_finished() {
            return MatchEvent::Ignored;
        }
        self.advance()
    }

    fn advance(&mut self) -> MatchEvent {
        self.current_index += 1;
        self.reset_streaks();
        if self.is_finished() {
            MatchEvent::Finished
        } else {
            MatchEvent::Advanced {
                index: self.current_index,
            }
        }
    }

    fn reset_streaks(&mut self) {
        self.success_streak = 0;
        self.fail_streak = 0;
    }
}
