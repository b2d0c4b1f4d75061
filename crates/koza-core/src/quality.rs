//! # Cocoon Quality Scorer
//!
//! Turns a raw vision-model detection payload plus the environment stability
//! score into a 0-100 quality score, a grade and a market recommendation.
//!
//! ## Input Tolerance
//!
//! The detection payload is an externally versioned contract. Parsing is a
//! fallback chain at every level:
//! - detection array: `detections`, then `predictions`, then `boxes`
//! - label: `class`, then `label`, then `name`
//! - box: `x1/y1/x2/y2` fields, then `bbox[0..4]`
//! - metrics: optional `extra.size.area_ratio` and `extra.color.mean_hsv`
//!
//! Anything missing is skipped; the scorer never fails.
//!
//! ## Applicability
//!
//! With no cocoon-like detection the score is not applicable. The result
//! still carries `grade = C`, but `applicable = false` marks it as "not yet
//! measurable" rather than a failing batch.

use crate::stats::{clamp01, mean, round_half_up, score_0_100, std_dev};
use crate::types::{Grade, QualityReport};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Array fields that may hold the detections, in lookup order.
pub const DETECTION_FIELDS: [&str; 3] = ["detections", "predictions", "boxes"];

/// Area-ratio band considered a well-sized cocoon (bbox area / frame area).
const AREA_RATIO_MIN_OK: f64 = 0.01;
const AREA_RATIO_MAX_OK: f64 = 0.08;

/// HSV colour targets: hue near 20 deg, saturation above 25, value near 150.
const HUE_TARGET: f64 = 20.0;
const HUE_SPAN: f64 = 25.0;
const SATURATION_FLOOR: f64 = 25.0;
const SATURATION_SPAN: f64 = 80.0;
const VALUE_TARGET: f64 = 150.0;
const VALUE_SPAN: f64 = 120.0;

const SIZE_WEIGHT: f64 = 0.30;
const COLOR_WEIGHT: f64 = 0.25;
const HOMOGENEITY_WEIGHT: f64 = 0.20;
const STABILITY_WEIGHT: f64 = 0.25;

const DEFAULT_SIZE_SCORE: u8 = 60;
const DEFAULT_HOMOGENEITY_BASE: f64 = 0.6;

const EPSILON: f64 = 1e-6;

// =============================================================================
// LABEL VOCABULARY
// =============================================================================

const COCOON_MARKERS: [&str; 2] = ["cocoon", "koza"];
const MOLD_MARKERS: [&str; 5] = ["mold", "fung", "muscardine", "küf", "mantar"];
const DEFECT_MARKERS: [&str; 6] = ["defect", "damage", "delik", "hole", "tear", "çatlak"];
const STAIN_MARKERS: [&str; 4] = ["stain", "leke", "kir", "dirty"];
const HEALTHY_LABELS: [&str; 3] = ["healthy", "saglikli", "sağlıklı"];
const DISEASED_LABELS: [&str; 7] = [
    "diseased",
    "disease",
    "sick",
    "unhealthy",
    "hasta",
    "hastalikli",
    "hastalıklı",
];
const DISEASED_MARKERS: [&str; 3] = ["diseas", "hasta", "hastal"];

fn contains_any(label: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| label.contains(m))
}

/// Whether a label names a cocoon (case-insensitive substring match).
#[must_use]
pub fn is_cocoon_like(label: &str) -> bool {
    contains_any(&label.to_lowercase(), &COCOON_MARKERS)
}

fn is_diseased(label: &str) -> bool {
    DISEASED_LABELS.contains(&label) || contains_any(label, &DISEASED_MARKERS)
}

// =============================================================================
// DETECTION PARSING
// =============================================================================

/// Axis-aligned box in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    /// Box area; inverted edges count as zero width/height.
    #[must_use]
    pub fn area(&self) -> f64 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}

/// Mean HSV colour of a detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

/// Per-object metrics from the vision model's `extra` block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoonMetrics {
    pub area_ratio: Option<f64>,
    pub mean_hsv: Option<Hsv>,
}

/// One detection after permissive parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Normalized label (`class`/`label`/`name`, trimmed, lowercased); may be empty.
    pub label: String,
    /// Label as used for metric attribution (`label`/`class`, raw).
    pub metric_label: String,
    pub bbox: Option<BoundingBox>,
    /// Present only when the detection carried an `extra` object.
    pub metrics: Option<CocoonMetrics>,
}

impl Detection {
    /// Parse one detection. Returns `None` for non-object entries.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let label = ["class", "label", "name"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str).filter(|s| !s.is_empty()))
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        let metric_label = ["label", "class"]
            .iter()
            .find_map(|k| non_blank_str(obj, k))
            .map(str::to_string)
            .unwrap_or_else(|| label.clone());

        Some(Self {
            label,
            metric_label,
            bbox: read_box(obj),
            metrics: obj
                .get("extra")
                .and_then(Value::as_object)
                .map(read_metrics),
        })
    }

    fn is_cocoon(&self) -> bool {
        !self.metric_label.is_empty() && is_cocoon_like(&self.metric_label)
    }
}

fn non_blank_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn finite_num(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn read_box(obj: &Map<String, Value>) -> Option<BoundingBox> {
    let bbox = obj.get("bbox").and_then(Value::as_array);
    let coord = |key: &str, idx: usize| {
        finite_num(obj.get(key)).or_else(|| bbox.and_then(|b| finite_num(b.get(idx))))
    };

    Some(BoundingBox {
        x1: coord("x1", 0)?,
        y1: coord("y1", 1)?,
        x2: coord("x2", 2)?,
        y2: coord("y2", 3)?,
    })
}

fn read_metrics(extra: &Map<String, Value>) -> CocoonMetrics {
    let area_ratio = extra
        .get("size")
        .and_then(Value::as_object)
        .and_then(|size| finite_num(size.get("area_ratio")));

    let mean_hsv = extra
        .get("color")
        .and_then(Value::as_object)
        .and_then(|color| color.get("mean_hsv"))
        .and_then(Value::as_object)
        .and_then(|hsv| {
            Some(Hsv {
                h: finite_num(hsv.get("h"))?,
                s: finite_num(hsv.get("s"))?,
                v: finite_num(hsv.get("v"))?,
            })
        });

    CocoonMetrics {
        area_ratio,
        mean_hsv,
    }
}

/// Extract the detection list from a raw payload.
///
/// The first of [`DETECTION_FIELDS`] holding an array wins; non-object
/// entries are dropped. Anything else yields an empty list.
#[must_use]
pub fn normalize_detections(payload: &Value) -> Vec<Detection> {
    let Some(obj) = payload.as_object() else {
        return Vec::new();
    };

    DETECTION_FIELDS
        .iter()
        .find_map(|field| obj.get(*field).and_then(Value::as_array))
        .map(|items| items.iter().filter_map(Detection::from_value).collect())
        .unwrap_or_default()
}

// =============================================================================
// RESULT TYPES
// =============================================================================

/// Where a batch should be sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRecommendation {
    PremiumExport,
    StandardMarket,
    RejectOrRework,
}

impl MarketRecommendation {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MarketRecommendation::PremiumExport => "premium_export",
            MarketRecommendation::StandardMarket => "standard_market",
            MarketRecommendation::RejectOrRework => "reject_or_rework",
        }
    }

    /// Disease forces rework; otherwise A is export, B standard, C rework.
    #[must_use]
    pub const fn for_grade(grade: Grade, diseased: bool) -> Self {
        if diseased {
            return MarketRecommendation::RejectOrRework;
        }
        match grade {
            Grade::A => MarketRecommendation::PremiumExport,
            Grade::B => MarketRecommendation::StandardMarket,
            Grade::C => MarketRecommendation::RejectOrRework,
        }
    }
}

impl fmt::Display for MarketRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality verdict with its sub-scores and the reasons behind them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityResult {
    /// False when no cocoon was detected; the score is then meaningless.
    pub applicable: bool,
    pub size: u8,
    pub color: u8,
    /// Not rounded.
    pub homogeneity: f64,
    pub env_stability: u8,
    pub quality_score: u8,
    pub grade: Grade,
    pub market_recommendation: MarketRecommendation,
    pub reasons: Vec<String>,
}

impl QualityResult {
    /// The verdict as a quality-agent report, or `None` if not applicable.
    #[must_use]
    pub fn to_report(&self, timestamp: impl Into<String>) -> Option<QualityReport> {
        self.applicable.then(|| QualityReport {
            timestamp: timestamp.into(),
            quality_score: f64::from(self.quality_score),
            grade: self.grade,
            market_recommendation: self.market_recommendation.as_str().to_string(),
        })
    }
}

// =============================================================================
// SCORING
// =============================================================================

#[derive(Debug, Default)]
struct LabelCounts {
    mold: usize,
    defect: usize,
    stain: usize,
    healthy: usize,
    diseased: usize,
}

impl LabelCounts {
    fn tally<'a>(labels: impl Iterator<Item = &'a str>) -> Self {
        let mut counts = Self::default();
        for label in labels {
            counts.mold += usize::from(contains_any(label, &MOLD_MARKERS));
            counts.defect += usize::from(contains_any(label, &DEFECT_MARKERS));
            counts.stain += usize::from(contains_any(label, &STAIN_MARKERS));
            counts.healthy += usize::from(HEALTHY_LABELS.contains(&label));
            counts.diseased += usize::from(is_diseased(label));
        }
        counts
    }
}

/// Score a raw detection payload.
#[must_use]
pub fn compute_quality_score(payload: &Value, stability_score: f64) -> QualityResult {
    compute_quality_from_detections(&normalize_detections(payload), stability_score)
}

/// Score already-parsed detections.
#[must_use]
pub fn compute_quality_from_detections(
    detections: &[Detection],
    stability_score: f64,
) -> QualityResult {
    let labels: Vec<&str> = detections
        .iter()
        .map(|d| d.label.as_str())
        .filter(|l| !l.is_empty())
        .collect();
    let env_stability = score_0_100(stability_score);
    let mut reasons = Vec::new();

    if !labels.iter().any(|l| is_cocoon_like(l)) {
        reasons.push("No cocoon detected: quality is not scored at this stage (N/A)".to_string());
        return QualityResult {
            applicable: false,
            size: 0,
            color: 0,
            homogeneity: 0.0,
            env_stability,
            quality_score: 0,
            grade: Grade::C,
            market_recommendation: MarketRecommendation::RejectOrRework,
            reasons,
        };
    }

    let areas: Vec<f64> = detections
        .iter()
        .filter_map(|d| d.bbox.map(|b| b.area()))
        .filter(|a| a.is_finite())
        .collect();
    let cocoon_metrics: Vec<CocoonMetrics> = detections
        .iter()
        .filter(|d| d.is_cocoon())
        .filter_map(|d| d.metrics)
        .collect();
    let area_ratios: Vec<f64> = cocoon_metrics.iter().filter_map(|m| m.area_ratio).collect();
    let hsvs: Vec<Hsv> = cocoon_metrics.iter().filter_map(|m| m.mean_hsv).collect();

    let has_any = !detections.is_empty();
    let counts = LabelCounts::tally(labels.iter().copied());

    let size = size_score(&area_ratios, &areas, has_any, &mut reasons);
    let color = color_score(&hsvs, counts.stain, &mut reasons);
    let homogeneity = homogeneity_score(&area_ratios, &areas, has_any, &counts, &mut reasons);

    if counts.defect > 0 {
        reasons.push(format!("Physical defects: {}", counts.defect));
    }
    if counts.mold > 0 {
        reasons.push(format!("Suspected mold/fungus: {}", counts.mold));
    }
    if counts.healthy > 0 {
        reasons.push(format!("Healthy detections: {}", counts.healthy));
    }
    if counts.diseased > 0 {
        reasons.push(format!("Diseased detections: {}", counts.diseased));
    }

    let base_score = score_0_100(
        f64::from(size) * SIZE_WEIGHT
            + f64::from(color) * COLOR_WEIGHT
            + homogeneity * HOMOGENEITY_WEIGHT
            + f64::from(env_stability) * STABILITY_WEIGHT,
    );

    let disease_penalty = disease_penalty(counts.diseased);
    if disease_penalty > 0 {
        reasons.push(format!("Disease penalty: -{}", disease_penalty));
    }

    let quality_score = base_score.saturating_sub(disease_penalty);
    let grade = Grade::from_score(quality_score);
    let market_recommendation = MarketRecommendation::for_grade(grade, counts.diseased > 0);

    if reasons.is_empty() {
        reasons.push("No notable defects detected".to_string());
    }

    QualityResult {
        applicable: true,
        size,
        color,
        homogeneity,
        env_stability,
        quality_score,
        grade,
        market_recommendation,
        reasons,
    }
}

/// `min(35, 15 + 10n)` for n > 0 diseased detections.
fn disease_penalty(diseased: usize) -> u8 {
    if diseased == 0 {
        return 0;
    }
    15usize.saturating_add(diseased.saturating_mul(10)).min(35) as u8
}

fn size_score(area_ratios: &[f64], areas: &[f64], has_any: bool, reasons: &mut Vec<String>) -> u8 {
    if !area_ratios.is_empty() {
        let ratio_mean = mean(area_ratios);
        let ratio_std = std_dev(area_ratios);
        let t = (ratio_mean - AREA_RATIO_MIN_OK) / (AREA_RATIO_MAX_OK - AREA_RATIO_MIN_OK).max(EPSILON);
        let base = clamp01(t) * 100.0;
        let uniformity_bonus = clamp01(1.0 - ratio_std / ratio_mean.max(EPSILON)) * 10.0;
        reasons.push("Size: used extra.size.area_ratio".to_string());
        return score_0_100(base + uniformity_bonus);
    }
    if has_any {
        reasons.push("Size: used bounding-box area (fallback)".to_string());
        return score_0_100(clamp01(mean(areas)) * 100.0);
    }
    reasons.push("No detections: default size score".to_string());
    DEFAULT_SIZE_SCORE
}

fn color_score(hsvs: &[Hsv], stain: usize, reasons: &mut Vec<String>) -> u8 {
    if !hsvs.is_empty() {
        let h = mean(&hsvs.iter().map(|c| c.h).collect::<Vec<_>>());
        let s = mean(&hsvs.iter().map(|c| c.s).collect::<Vec<_>>());
        let v = mean(&hsvs.iter().map(|c| c.v).collect::<Vec<_>>());

        let hue = clamp01(1.0 - (h - HUE_TARGET).abs() / HUE_SPAN);
        let saturation = clamp01((s - SATURATION_FLOOR) / SATURATION_SPAN);
        let value = clamp01(1.0 - (v - VALUE_TARGET).abs() / VALUE_SPAN);

        reasons.push("Color: used extra.color.mean_hsv".to_string());
        return score_0_100((hue * 0.4 + saturation * 0.35 + value * 0.25) * 100.0);
    }

    let fallback = clamp01(1.0 - (stain as f64 / 4.0).min(1.0)) * 100.0;
    if stain > 0 {
        reasons.push(format!("Stain/dirt: {}", stain));
    }
    round_half_up(fallback) as u8
}

fn homogeneity_score(
    area_ratios: &[f64],
    areas: &[f64],
    has_any: bool,
    counts: &LabelCounts,
    reasons: &mut Vec<String>,
) -> f64 {
    let spread = |xs: &[f64]| clamp01(1.0 - (std_dev(xs) / mean(xs).max(EPSILON)).min(1.0));

    let base = if !area_ratios.is_empty() {
        reasons.push("Homogeneity: used extra.size.area_ratio variance".to_string());
        spread(area_ratios)
    } else if has_any {
        spread(areas)
    } else {
        DEFAULT_HOMOGENEITY_BASE
    };

    let penalty = clamp01((counts.defect + counts.mold) as f64 / 6.0);
    clamp01(base * (1.0 - 0.5 * penalty)) * 100.0
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cocoon(area_ratio: f64, h: f64, s: f64, v: f64) -> Value {
        json!({
            "class": "cocoon",
            "confidence": 0.93,
            "bbox": [10.0, 10.0, 60.0, 50.0],
            "extra": {
                "size": {"area_ratio": area_ratio, "area_px": 2000},
                "color": {"mean_hsv": {"h": h, "s": s, "v": v}}
            }
        })
    }

    #[test]
    fn no_cocoon_is_not_applicable() {
        let payload = json!({"detections": [{"class": "larva"}, {"class": "leaf"}]});
        let result = compute_quality_score(&payload, 80.0);
        assert!(!result.applicable);
        assert_eq!(result.quality_score, 0);
        assert_eq!(result.grade, Grade::C);
        assert_eq!(result.env_stability, 80);
        assert_eq!(result.reasons.len(), 1);
        assert!(result.to_report("t").is_none());
    }

    #[test]
    fn empty_payload_is_not_applicable() {
        assert!(!compute_quality_score(&json!({}), 50.0).applicable);
        assert!(!compute_quality_score(&json!(null), 50.0).applicable);
        assert!(!compute_quality_score(&json!([1, 2]), 50.0).applicable);
    }

    #[test]
    fn detection_field_fallback_order() {
        let payload = json!({
            "predictions": [{"label": "Koza"}],
            "boxes": []
        });
        assert_eq!(normalize_detections(&payload).len(), 1);

        let payload = json!({"detections": "oops", "boxes": [{"name": "cocoon"}, 3]});
        let dets = normalize_detections(&payload);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label, "cocoon");
    }

    #[test]
    fn label_prefers_class_and_normalizes() {
        let det = Detection::from_value(&json!({"class": "  Cocoon ", "label": "x"})).expect("object");
        assert_eq!(det.label, "cocoon");
        assert_eq!(det.metric_label, "x");
    }

    #[test]
    fn box_fields_fall_back_to_array() {
        let det = Detection::from_value(&json!({"x1": 0.0, "y1": 0.0, "bbox": [5, 5, 4.0, 3.0]}))
            .expect("object");
        let bbox = det.bbox.expect("bbox");
        assert!((bbox.area() - 12.0).abs() < 1e-9);

        let inverted = BoundingBox { x1: 10.0, y1: 0.0, x2: 5.0, y2: 3.0 };
        assert!(inverted.area().abs() < 1e-12);
    }

    #[test]
    fn ideal_cocoons_grade_a() {
        let payload = json!({"detections": [
            cocoon(0.08, 20.0, 105.0, 150.0),
            cocoon(0.08, 20.0, 105.0, 150.0),
        ]});
        let result = compute_quality_score(&payload, 100.0);
        assert!(result.applicable);
        assert_eq!(result.size, 100);
        assert_eq!(result.color, 100);
        assert!((result.homogeneity - 100.0).abs() < 1e-9);
        assert_eq!(result.quality_score, 100);
        assert_eq!(result.grade, Grade::A);
        assert_eq!(result.market_recommendation, MarketRecommendation::PremiumExport);
        assert_eq!(
            result.reasons,
            vec![
                "Size: used extra.size.area_ratio",
                "Color: used extra.color.mean_hsv",
                "Homogeneity: used extra.size.area_ratio variance",
            ]
        );
    }

    #[test]
    fn disease_forces_rework_and_penalizes() {
        let clean = json!({"detections": [cocoon(0.08, 20.0, 105.0, 150.0)]});
        let sick = json!({"detections": [
            cocoon(0.08, 20.0, 105.0, 150.0),
            {"class": "diseased"}
        ]});

        let a = compute_quality_score(&clean, 100.0);
        let b = compute_quality_score(&sick, 100.0);
        assert!(a.quality_score - b.quality_score >= 25);
        assert_eq!(b.market_recommendation, MarketRecommendation::RejectOrRework);
        assert!(b.reasons.iter().any(|r| r == "Disease penalty: -25"));
    }

    #[test]
    fn disease_penalty_caps_at_35() {
        assert_eq!(disease_penalty(0), 0);
        assert_eq!(disease_penalty(1), 25);
        assert_eq!(disease_penalty(2), 35);
        assert_eq!(disease_penalty(9), 35);
    }

    #[test]
    fn bbox_fallback_without_metrics() {
        // Bounding boxes in normalized coordinates: area 0.25 each.
        let payload = json!({"detections": [
            {"class": "cocoon", "x1": 0.0, "y1": 0.0, "x2": 0.5, "y2": 0.5},
            {"class": "cocoon", "x1": 0.5, "y1": 0.5, "x2": 1.0, "y2": 1.0},
        ]});
        let result = compute_quality_score(&payload, 55.0);
        assert_eq!(result.size, 25);
        assert_eq!(result.color, 100);
        assert!((result.homogeneity - 100.0).abs() < 1e-9);
        // 25*0.3 + 100*0.25 + 100*0.2 + 55*0.25 = 66.25 -> 66
        assert_eq!(result.quality_score, 66);
        assert_eq!(result.grade, Grade::C);
        assert_eq!(result.reasons, vec!["Size: used bounding-box area (fallback)"]);
    }

    #[test]
    fn stains_and_defects_reduce_color_and_homogeneity() {
        let payload = json!({"detections": [
            {"class": "cocoon"},
            {"class": "stain"},
            {"class": "dirty_spot"},
            {"class": "hole"},
            {"class": "mold"},
        ]});
        let result = compute_quality_score(&payload, 50.0);
        // 2 stains -> 1 - 2/4 = 0.5
        assert_eq!(result.color, 50);
        // no boxes: areas empty, spread(empty) = 1, penalty (1+1)/6
        assert!((result.homogeneity - 100.0 * (1.0 - 0.5 * (2.0 / 6.0))).abs() < 1e-9);
        assert!(result.reasons.iter().any(|r| r == "Stain/dirt: 2"));
        assert!(result.reasons.iter().any(|r| r == "Physical defects: 1"));
        assert!(result.reasons.iter().any(|r| r == "Suspected mold/fungus: 1"));
    }

    #[test]
    fn metrics_only_count_for_cocoon_detections() {
        let payload = json!({"detections": [
            {"class": "cocoon"},
            {"class": "larva", "extra": {"size": {"area_ratio": 0.5}}},
        ]});
        let result = compute_quality_score(&payload, 50.0);
        assert!(result.reasons.iter().all(|r| !r.contains("area_ratio")));
    }

    #[test]
    fn partial_hsv_is_ignored() {
        let payload = json!({"detections": [
            {"class": "cocoon", "extra": {"color": {"mean_hsv": {"h": 20.0, "s": 90.0}}}}
        ]});
        let result = compute_quality_score(&payload, 50.0);
        assert_eq!(result.color, 100);
        assert!(result.reasons.iter().all(|r| !r.contains("mean_hsv")));
    }

    #[test]
    fn healthy_labels_are_counted_exactly() {
        let payload = json!({"detections": [
            {"class": "cocoon"},
            {"class": "Healthy"},
            {"class": "healthy_larva"},
        ]});
        let result = compute_quality_score(&payload, 50.0);
        assert!(result.reasons.iter().any(|r| r == "Healthy detections: 1"));
    }

    #[test]
    fn applicable_result_converts_to_report() {
        let payload = json!({"detections": [cocoon(0.08, 20.0, 105.0, 150.0)]});
        let result = compute_quality_score(&payload, 90.0);
        let report = result.to_report("2026-03-01T10:00:00Z").expect("report");
        assert_eq!(report.grade, result.grade);
        assert_eq!(report.market_recommendation, "premium_export");
    }
}
