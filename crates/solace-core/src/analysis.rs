use serde::{Deserialize, Serialize};

/// The terminal payload of a completed backend computation.
///
/// `reply_text` is always present; everything else is independently
/// present-or-absent. Sub-records are read-only snapshots; consumers
/// forward them, never mutate them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub reply_text: String,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub coping_strategies: Vec<String>,
    #[serde(default)]
    pub crisis: Option<CrisisAssessment>,
    #[serde(default)]
    pub action_plan: Option<ActionPlanSuggestion>,
    #[serde(default)]
    pub schedule: Option<ScheduleSuggestion>,
    /// Opaque classification tags from the backend. Carried through as-is.
    #[serde(default)]
    pub memory_tags: Vec<String>,
}

impl AnalysisPayload {
    /// A payload with just a reply and nothing else (useful for testing).
    pub fn reply(text: &str) -> Self {
        Self {
            reply_text: text.to_string(),
            risk_level: None,
            resources: Vec::new(),
            coping_strategies: Vec::new(),
            crisis: None,
            action_plan: None,
            schedule: None,
            memory_tags: Vec::new(),
        }
    }

    /// The per-exchange analysis snapshot, without the workflow sub-records.
    pub fn snapshot(&self) -> Analysis {
        Analysis {
            risk_level: self.risk_level.clone(),
            resources: self.resources.clone(),
            coping_strategies: self.coping_strategies.clone(),
        }
    }
}

/// The analysis fields stored on a resolved exchange.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub coping_strategies: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Crisis,
}

/// Crisis sub-record. Wire format for `level` is SCREAMING_SNAKE_CASE,
/// matching the backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrisisAssessment {
    pub level: CrisisLevel,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub coping_strategies: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrisisLevel {
    None,
    Low,
    Medium,
    High,
    Crisis,
}

impl CrisisLevel {
    pub fn is_high_severity(&self) -> bool {
        matches!(self, Self::High | Self::Crisis)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionPlanSuggestion {
    pub should_suggest: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub steps: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleSuggestion {
    pub should_suggest: bool,
    #[serde(default)]
    pub activity: String,
    #[serde(default)]
    pub suggested_time: Option<String>,
}

/// The three independent follow-up workflow types.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    Crisis,
    ActionPlan,
    Schedule,
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Crisis => write!(f, "crisis"),
            Self::ActionPlan => write!(f, "action_plan"),
            Self::Schedule => write!(f, "schedule"),
        }
    }
}

impl std::str::FromStr for WorkflowKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crisis" => Ok(Self::Crisis),
            "action_plan" => Ok(Self::ActionPlan),
            "schedule" => Ok(Self::Schedule),
            other => Err(format!("unknown workflow kind: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_payload_is_bare() {
        let p = AnalysisPayload::reply("hello");
        assert_eq!(p.reply_text, "hello");
        assert!(p.crisis.is_none());
        assert!(p.action_plan.is_none());
        assert!(p.schedule.is_none());
        assert!(p.memory_tags.is_empty());
    }

    #[test]
    fn snapshot_strips_sub_records() {
        let mut p = AnalysisPayload::reply("hi");
        p.risk_level = Some(RiskLevel::Moderate);
        p.coping_strategies = vec!["breathing".into()];
        p.crisis = Some(CrisisAssessment {
            level: CrisisLevel::High,
            explanation: "elevated".into(),
            coping_strategies: vec![],
            resources: vec![],
        });

        let snap = p.snapshot();
        assert_eq!(snap.risk_level, Some(RiskLevel::Moderate));
        assert_eq!(snap.coping_strategies, vec!["breathing".to_string()]);
        // Sub-records stay on the payload, not the snapshot.
    }

    #[test]
    fn crisis_level_severity() {
        assert!(CrisisLevel::Crisis.is_high_severity());
        assert!(CrisisLevel::High.is_high_severity());
        assert!(!CrisisLevel::Medium.is_high_severity());
        assert!(!CrisisLevel::Low.is_high_severity());
        assert!(!CrisisLevel::None.is_high_severity());
    }

    #[test]
    fn crisis_level_wire_format() {
        let json = serde_json::to_string(&CrisisLevel::Crisis).unwrap();
        assert_eq!(json, r#""CRISIS""#);
        let parsed: CrisisLevel = serde_json::from_str(r#""HIGH""#).unwrap();
        assert_eq!(parsed, CrisisLevel::High);
    }

    #[test]
    fn payload_deserializes_with_missing_fields() {
        let json = r#"{"reply_text":"I hear you."}"#;
        let p: AnalysisPayload = serde_json::from_str(json).unwrap();
        assert_eq!(p.reply_text, "I hear you.");
        assert!(p.risk_level.is_none());
        assert!(p.resources.is_empty());
    }

    #[test]
    fn payload_deserializes_full_wire_shape() {
        let json = r#"{
            "reply_text": "Let's slow down together.",
            "risk_level": "high",
            "resources": ["988 Lifeline"],
            "coping_strategies": ["grounding"],
            "crisis": {
                "level": "CRISIS",
                "explanation": "self-harm language detected",
                "resources": ["988 Lifeline"]
            },
            "action_plan": {"should_suggest": true, "title": "Evening wind-down", "steps": ["dim lights"]},
            "schedule": {"should_suggest": false, "activity": ""},
            "memory_tags": ["emotional_anchor"]
        }"#;
        let p: AnalysisPayload = serde_json::from_str(json).unwrap();
        assert_eq!(p.risk_level, Some(RiskLevel::High));
        assert!(p.crisis.as_ref().unwrap().level.is_high_severity());
        assert!(p.action_plan.as_ref().unwrap().should_suggest);
        assert!(!p.schedule.as_ref().unwrap().should_suggest);
        assert_eq!(p.memory_tags, vec!["emotional_anchor".to_string()]);
    }

    #[test]
    fn payload_serde_roundtrip() {
        let mut p = AnalysisPayload::reply("roundtrip");
        p.schedule = Some(ScheduleSuggestion {
            should_suggest: true,
            activity: "walk".into(),
            suggested_time: Some("18:00".into()),
        });
        let json = serde_json::to_string(&p).unwrap();
        let parsed: AnalysisPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.reply_text, "roundtrip");
        assert_eq!(parsed.schedule.unwrap().suggested_time.as_deref(), Some("18:00"));
    }

    #[test]
    fn workflow_kind_display_and_parse() {
        for kind in [WorkflowKind::Crisis, WorkflowKind::ActionPlan, WorkflowKind::Schedule] {
            let s = kind.to_string();
            let parsed: WorkflowKind = s.parse().unwrap();
            assert_eq!(kind, parsed);
        }
        assert!("plan".parse::<WorkflowKind>().is_err());
    }
}
