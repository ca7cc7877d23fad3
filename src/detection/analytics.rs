use std::collections::HashMap;

use super::{ConfidenceTier, Detection};

/// 신뢰도 구간별 개수
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl TierCounts {
    pub fn get(&self, tier: ConfidenceTier) -> usize {
        match tier {
            ConfidenceTier::High => self.high,
            ConfidenceTier::Medium => self.medium,
            ConfidenceTier::Low => self.low,
        }
    }
}

/// 검출 결과 요약 통계
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSummary {
    pub total: usize,
    pub unique_classes: usize,
    /// 검출이 없으면 `None`
    pub average_confidence: Option<f32>,
    pub tiers: TierCounts,
    /// (클래스, 개수). 개수 내림차순, 같으면 이름순
    pub class_distribution: Vec<(String, usize)>,
    /// 신뢰도 상위 검출의 인덱스
    pub top: Vec<usize>,
}

impl DetectionSummary {
    pub fn from_detections(detections: &[Detection], top_n: usize) -> Self {
        if detections.is_empty() {
            return Self::default();
        }

        let mut tiers = TierCounts::default();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for det in detections {
            match det.tier() {
                ConfidenceTier::High => tiers.high += 1,
                ConfidenceTier::Medium => tiers.medium += 1,
                ConfidenceTier::Low => tiers.low += 1,
            }
            *counts.entry(det.label.as_str()).or_insert(0) += 1;
        }

        let mut class_distribution: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(label, count)| (label.to_string(), count))
            .collect();
        class_distribution.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut top: Vec<usize> = (0..detections.len()).collect();
        top.sort_by(|&a, &b| {
            detections[b]
                .confidence
                .partial_cmp(&detections[a].confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        top.truncate(top_n);

        let sum: f32 = detections.iter().map(|d| d.confidence).sum();

        Self {
            total: detections.len(),
            unique_classes: class_distribution.len(),
            average_confidence: Some(sum / detections.len() as f32),
            tiers,
            class_distribution,
            top,
        }
    }

    /// 구간 비율 (%)
    pub fn tier_percentage(&self, tier: ConfidenceTier) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.tiers.get(tier) as f32 / self.total as f32 * 100.0
    }

    /// 한 줄 요약, 예: `"2 person, 1 car"`
    pub fn describe(&self) -> String {
        self.class_distribution
            .iter()
            .map(|(label, count)| format!("{count} {label}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample() -> Vec<Detection> {
        vec![
            Detection::new("person", 0.95, vec![0.0, 0.0, 10.0, 10.0]),
            Detection::new("car", 0.65, vec![0.0, 0.0, 10.0, 10.0]),
            Detection::new("person", 0.81, vec![0.0, 0.0, 10.0, 10.0]),
            Detection::new("dog", 0.30, vec![0.0, 0.0, 10.0, 10.0]),
        ]
    }

    #[test]
    fn summary_counts() {
        let summary = DetectionSummary::from_detections(&sample(), 5);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.unique_classes, 3);
        assert_eq!(summary.tiers, TierCounts { high: 2, medium: 1, low: 1 });
        assert_abs_diff_eq!(summary.average_confidence.unwrap(), 0.6775, epsilon = 1e-5);
        assert_abs_diff_eq!(summary.tier_percentage(ConfidenceTier::High), 50.0);
    }

    #[test]
    fn distribution_is_sorted_by_count_then_name() {
        let summary = DetectionSummary::from_detections(&sample(), 5);
        assert_eq!(
            summary.class_distribution,
            vec![("person".to_string(), 2), ("car".to_string(), 1), ("dog".to_string(), 1)]
        );
        assert_eq!(summary.describe(), "2 person, 1 car, 1 dog");
    }

    #[test]
    fn top_detections_by_confidence() {
        let summary = DetectionSummary::from_detections(&sample(), 2);
        assert_eq!(summary.top, vec![0, 2]);
    }

    #[test]
    fn empty_input() {
        let summary = DetectionSummary::from_detections(&[], 5);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.average_confidence, None);
        assert_eq!(summary.tier_percentage(ConfidenceTier::Low), 0.0);
    }
}
