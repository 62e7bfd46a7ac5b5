//! Heuristic username analysis
//!
//! Pure string inspection; nothing here touches the network.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

const GENERIC_MARKERS: [&str; 4] = ["admin", "test", "user", "demo"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsernameFeatures {
    pub length: usize,
    pub has_digits: bool,
    pub has_underscore: bool,
    pub has_dot: bool,
    pub has_dash: bool,
    pub alphanumeric_ratio: f64,
    pub special_chars: usize,
    pub uppercase_count: usize,
    pub digit_count: usize,
}

impl UsernameFeatures {
    pub fn extract(username: &str) -> Self {
        let length = username.chars().count();
        let alphanumeric = username.chars().filter(|c| c.is_alphanumeric()).count();
        let digit_count = username.chars().filter(|c| c.is_numeric()).count();

        Self {
            length,
            has_digits: digit_count > 0,
            has_underscore: username.contains('_'),
            has_dot: username.contains('.'),
            has_dash: username.contains('-'),
            alphanumeric_ratio: if length == 0 {
                0.0
            } else {
                alphanumeric as f64 / length as f64
            },
            special_chars: length - alphanumeric,
            uppercase_count: username.chars().filter(|c| c.is_uppercase()).count(),
            digit_count,
        }
    }

    fn is_numeric_heavy(&self) -> bool {
        self.digit_count as f64 > self.length as f64 / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactors {
    pub common_pattern: bool,
    pub short_username: bool,
    pub suspicious_chars: bool,
    pub numeric_heavy: bool,
}

impl RiskFactors {
    fn flagged(&self) -> usize {
        [
            self.common_pattern,
            self.short_username,
            self.suspicious_chars,
            self.numeric_heavy,
        ]
        .iter()
        .filter(|f| **f)
        .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score > 0.6 {
            RiskLevel::High
        } else if score > 0.3 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub factors: RiskFactors,
    pub level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsernameAnalysis {
    pub username: String,
    pub pattern_type: String,
    pub patterns_detected: Vec<String>,
    pub features: UsernameFeatures,
    pub risk_assessment: RiskAssessment,
    /// Randomized presentation value, not derived from the username
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// Patterns in detection order
pub fn detect_patterns(username: &str, features: &UsernameFeatures) -> Vec<String> {
    let lowered = username.to_lowercase();
    let mut patterns = Vec::new();

    if GENERIC_MARKERS.iter().any(|m| lowered.contains(m)) {
        patterns.push("generic".to_string());
    }
    if features.length < 4 {
        patterns.push("short".to_string());
    }
    if features.is_numeric_heavy() {
        patterns.push("numeric_heavy".to_string());
    }
    if lowered == username && !features.has_underscore {
        patterns.push("simple_lowercase".to_string());
    }

    patterns
}

pub fn assess_risk(pattern_type: &str, features: &UsernameFeatures) -> RiskAssessment {
    let factors = RiskFactors {
        common_pattern: pattern_type == "generic",
        short_username: features.length < 5,
        suspicious_chars: features.special_chars > 3,
        numeric_heavy: features.is_numeric_heavy(),
    };
    let score = factors.flagged() as f64 / 4.0;

    RiskAssessment {
        score,
        level: RiskLevel::from_score(score),
        factors,
    }
}

/// Reject usernames that are empty or only whitespace.
///
/// The username itself is used exactly as given.
pub fn check_username(username: &str) -> Result<(), String> {
    if username.trim().is_empty() {
        Err("username must not be empty".to_string())
    } else {
        Ok(())
    }
}

/// Score a username's composition
pub fn analyze_username(username: &str) -> UsernameAnalysis {
    let features = UsernameFeatures::extract(username);
    let patterns_detected = detect_patterns(username, &features);
    let pattern_type = patterns_detected
        .first()
        .cloned()
        .unwrap_or_else(|| "custom".to_string());
    let risk_assessment = assess_risk(&pattern_type, &features);

    UsernameAnalysis {
        username: username.to_string(),
        pattern_type,
        patterns_detected,
        features,
        risk_assessment,
        confidence: rand::rng().random_range(0.75..0.98),
        timestamp: Utc::now(),
    }
}
