use serde::{Deserialize, Serialize};

/// 角度比較に使う信頼度閾値
pub const COMPARE_THRESHOLD: f32 = 0.5;
/// 描画に使う信頼度閾値
pub const DISPLAY_THRESHOLD: f32 = 0.4;

/// MoveNet の 17 キーポイントインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;

    pub const ALL: [KeypointIndex; KeypointIndex::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// 推定器が出力するキーポイント名 (snake_case)
    pub fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|index| index.name() == name)
    }
}

/// 名前付きキーポイント (ピクセル座標)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub name: String,
    pub x: f32,
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)。欠けている場合は 0 とみなす
    #[serde(default)]
    pub score: f32,
}

impl Keypoint {
    pub fn new(name: impl Into<String>, x: f32, y: f32, score: f32) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            score,
        }
    }

    /// 信頼度が閾値を超えているか (閾値ちょうどは不可)
    pub fn is_confident(&self, threshold: f32) -> bool {
        self.score > threshold
    }
}

/// 1フレーム分のキーポイント集合
///
/// JSON は `{ "keypoints": [...] }` と `[...]` のどちらの形でも読める。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "KeypointDocument")]
pub struct KeypointSet {
    keypoints: Vec<Keypoint>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeypointDocument {
    Bare(Vec<Keypoint>),
    Wrapped { keypoints: Vec<Keypoint> },
}

impl From<KeypointDocument> for KeypointSet {
    fn from(doc: KeypointDocument) -> Self {
        match doc {
            KeypointDocument::Bare(keypoints) | KeypointDocument::Wrapped { keypoints } => {
                Self { keypoints }
            }
        }
    }
}

impl KeypointSet {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// 名前でキーポイントを取得。重複時は最初のもの
    pub fn get(&self, name: &str) -> Option<&Keypoint> {
        self.keypoints.iter().find(|kp| kp.name == name)
    }

    pub fn get_index(&self, index: KeypointIndex) -> Option<&Keypoint> {
        self.get(index.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keypoint> {
        self.keypoints.iter()
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// 描画対象のキーポイント
    pub fn visible(&self, threshold: f32) -> impl Iterator<Item = &Keypoint> {
        self.keypoints.iter().filter(move |kp| kp.is_confident(threshold))
    }
}

impl FromIterator<Keypoint> for KeypointSet {
    fn from_iter<T: IntoIterator<Item = Keypoint>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
