use super::keypoint::{Keypoint, KeypointIndex, KeypointSet, COMPARE_THRESHOLD};

/// 比較できる関節が1つもない場合のスコア (どの閾値でも不一致になる)
pub const NO_MATCH_SCORE: f32 = 1000.0;

/// これ未満の長さのベクトルは角度を定義できない
const MIN_SEGMENT_LENGTH: f32 = 1e-6;

/// 中央の関節 `b` で測る3点の組
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointTriplet {
    pub a: KeypointIndex,
    pub b: KeypointIndex,
    pub c: KeypointIndex,
}

impl JointTriplet {
    pub const fn new(a: KeypointIndex, b: KeypointIndex, c: KeypointIndex) -> Self {
        Self { a, b, c }
    }

    /// 信頼度を満たす3点を取得。1点でも欠ければ None
    fn locate<'a>(&self, set: &'a KeypointSet) -> Option<[&'a Keypoint; 3]> {
        let a = set.get_index(self.a)?;
        let b = set.get_index(self.b)?;
        let c = set.get_index(self.c)?;
        [a, b, c]
            .iter()
            .all(|kp| kp.is_confident(COMPARE_THRESHOLD))
            .then_some([a, b, c])
    }
}

/// 比較に使う関節: 肘、膝、肩 (左右)
pub const JOINT_TRIPLETS: [JointTriplet; 6] = {
    use KeypointIndex::*;
    [
        JointTriplet::new(LeftShoulder, LeftElbow, LeftWrist),
        JointTriplet::new(RightShoulder, RightElbow, RightWrist),
        JointTriplet::new(LeftHip, LeftKnee, LeftAnkle),
        JointTriplet::new(RightHip, RightKnee, RightAnkle),
        JointTriplet::new(LeftElbow, LeftShoulder, LeftHip),
        JointTriplet::new(RightElbow, RightShoulder, RightHip),
    ]
};

/// `b` における内角 (度)
///
/// BA と BC のどちらかが長さ0なら None。
pub fn joint_angle(a: &Keypoint, b: &Keypoint, c: &Keypoint) -> Option<f32> {
    let ba = (a.x - b.x, a.y - b.y);
    let bc = (c.x - b.x, c.y - b.y);
    let ba_len = ba.0.hypot(ba.1);
    let bc_len = bc.0.hypot(bc.1);
    if ba_len < MIN_SEGMENT_LENGTH || bc_len < MIN_SEGMENT_LENGTH {
        return None;
    }

    let dot = ba.0 * bc.0 + ba.1 * bc.1;
    // 丸め誤差で ±1 をわずかに超えると acos が NaN になる
    let cos = (dot / (ba_len * bc_len)).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// 関節ごとの比較結果
#[derive(Debug, Clone, PartialEq)]
pub struct AngleComparison {
    /// 比較できた関節とその角度差
    pub joints: Vec<(JointTriplet, f32)>,
    /// 平均角度差。比較できた関節がなければ NO_MATCH_SCORE
    pub score: f32,
}

impl AngleComparison {
    /// 最も角度差の大きい関節
    pub fn worst_joint(&self) -> Option<(JointTriplet, f32)> {
        self.joints
            .iter()
            .copied()
            .max_by(|lhs, rhs| lhs.1.total_cmp(&rhs.1))
    }
}

/// 角度ベースの姿勢比較 (詳細付き)
pub fn compare(user: &KeypointSet, reference: &KeypointSet) -> AngleComparison {
    let joints: Vec<(JointTriplet, f32)> = JOINT_TRIPLETS
        .iter()
        .filter_map(|triplet| {
            let [ua, ub, uc] = triplet.locate(user)?;
            let [ra, rb, rc] = triplet.locate(reference)?;
            let user_angle = joint_angle(ua, ub, uc)?;
            let reference_angle = joint_angle(ra, rb, rc)?;
            Some((*triplet, (user_angle - reference_angle).abs()))
        })
        .collect();

    let score = if joints.is_empty() {
        NO_MATCH_SCORE
    } else {
        joints.iter().map(|(_, diff)| diff).sum::<f32>() / joints.len() as f32
    };

    AngleComparison { joints, score }
}

/// 角度ベースの姿勢比較。小さいほど一致
pub fn score(user: &KeypointSet, reference: &KeypointSet) -> f32 {
    compare(user, reference).score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    /// 両腕を横に伸ばし、脚をまっすぐにした姿勢
    fn t_pose(score: f32) -> KeypointSet {
        use KeypointIndex::*;
        let points = [
            (LeftShoulder, 200.0, 100.0),
            (RightShoulder, 100.0, 100.0),
            (LeftElbow, 250.0, 100.0),
            (RightElbow, 50.0, 100.0),
            (LeftWrist, 300.0, 100.0),
            (RightWrist, 0.0, 100.0),
            (LeftHip, 180.0, 250.0),
            (RightHip, 120.0, 250.0),
            (LeftKnee, 180.0, 330.0),
            (RightKnee, 120.0, 330.0),
            (LeftAnkle, 180.0, 410.0),
            (RightAnkle, 120.0, 410.0),
        ];
        points
            .iter()
            .map(|(index, x, y)| Keypoint::new(index.name(), *x, *y, score))
            .collect()
    }

    fn replace(set: &KeypointSet, name: &str, x: f32, y: f32) -> KeypointSet {
        set.iter()
            .map(|kp| {
                if kp.name == name {
                    Keypoint::new(name, x, y, kp.score)
                } else {
                    kp.clone()
                }
            })
            .collect()
    }

    #[test]
    fn test_joint_angle_right_angle() {
        let a = Keypoint::new("a", 0.0, 1.0, 1.0);
        let b = Keypoint::new("b", 0.0, 0.0, 1.0);
        let c = Keypoint::new("c", 1.0, 0.0, 1.0);
        assert!(approx_eq(joint_angle(&a, &b, &c).unwrap(), 90.0));
    }

    #[test]
    fn test_joint_angle_straight_line() {
        let a = Keypoint::new("a", -1.0, 0.0, 1.0);
        let b = Keypoint::new("b", 0.0, 0.0, 1.0);
        let c = Keypoint::new("c", 3.0, 0.0, 1.0);
        assert!(approx_eq(joint_angle(&a, &b, &c).unwrap(), 180.0));
    }

    #[test]
    fn test_joint_angle_degenerate() {
        let a = Keypoint::new("a", 5.0, 5.0, 1.0);
        let b = Keypoint::new("b", 5.0, 5.0, 1.0);
        let c = Keypoint::new("c", 1.0, 0.0, 1.0);
        assert_eq!(joint_angle(&a, &b, &c), None);
    }

    #[test]
    fn test_identical_sets_score_zero() {
        let pose = t_pose(0.9);
        let result = compare(&pose, &pose);
        assert_eq!(result.joints.len(), 6);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_zero_confidence_returns_sentinel() {
        let user = t_pose(0.0);
        let reference = t_pose(0.9);
        assert_eq!(score(&user, &reference), NO_MATCH_SCORE);
        assert_eq!(score(&reference, &user), NO_MATCH_SCORE);
    }

    #[test]
    fn test_empty_user_returns_sentinel() {
        assert_eq!(score(&KeypointSet::default(), &t_pose(0.9)), NO_MATCH_SCORE);
    }

    #[test]
    fn test_confidence_threshold_is_strict() {
        let pose = t_pose(0.5);
        assert_eq!(score(&pose, &pose), NO_MATCH_SCORE);
    }

    #[test]
    fn test_averages_only_included_joints() {
        let reference = t_pose(0.9);
        // 左手首を肘の真上に: 左肘が 180° → 90°
        let user = replace(&reference, "left_wrist", 250.0, 50.0);
        let result = compare(&user, &reference);
        assert_eq!(result.joints.len(), 6);
        assert!(approx_eq(result.score, 90.0 / 6.0));

        // 右側の肩を見えなくすると右肘・右肩の2関節が外れる
        let hidden: KeypointSet = user
            .iter()
            .map(|kp| {
                let score = if kp.name == "right_shoulder" { 0.1 } else { kp.score };
                Keypoint::new(kp.name.clone(), kp.x, kp.y, score)
            })
            .collect();
        let result = compare(&hidden, &reference);
        assert_eq!(result.joints.len(), 4);
        assert!(approx_eq(result.score, 90.0 / 4.0));
    }

    #[test]
    fn test_degenerate_triplet_is_excluded() {
        let reference = t_pose(0.9);
        // 左手首を左肘と同じ位置に置くと左肘の角度が定義できない
        let user = replace(&reference, "left_wrist", 250.0, 100.0);
        let result = compare(&user, &reference);
        assert_eq!(result.joints.len(), 5);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_worst_joint() {
        let reference = t_pose(0.9);
        let user = replace(&reference, "right_wrist", 50.0, 150.0);
        let (joint, diff) = compare(&user, &reference).worst_joint().unwrap();
        assert_eq!(joint.b, KeypointIndex::RightElbow);
        assert!(approx_eq(diff, 90.0));
    }
}
