use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Status reported for a finding in one snapshot.
///
/// Only `OPEN` and `FIXED` drive the ledger; every other scanner status
/// (`ACCEPTED`, `CONFIRMED`, `FALSE_POSITIVE`, `REOPENED`, ...) is kept
/// verbatim in [`FindingStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FindingStatus {
    Open,
    Fixed,
    Other(String),
}

impl FindingStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "OPEN",
            Self::Fixed => "FIXED",
            Self::Other(raw) => raw.as_str(),
        }
    }

    /// Returns `true` for statuses the ledger acts on.
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        matches!(self, Self::Open | Self::Fixed)
    }
}

impl From<String> for FindingStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "OPEN" => Self::Open,
            "FIXED" => Self::Fixed,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for FindingStatus {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<FindingStatus> for String {
    fn from(status: FindingStatus) -> Self {
        match status {
            FindingStatus::Other(raw) => raw,
            handled => handled.as_str().to_string(),
        }
    }
}

impl fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source location of a finding. Every bound is nullable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextRange {
    pub start_line: Option<i64>,
    pub end_line: Option<i64>,
    pub start_offset: Option<i64>,
    pub end_offset: Option<i64>,
}

/// One issue observation inside a snapshot.
///
/// Field names follow the scanner's issue-search payload. Metadata the
/// ledger never inspects (`impacts`, `flows`, `transitions`, `actions`,
/// `comments`) is carried as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawFinding")]
pub struct Finding {
    pub key: String,
    #[serde(rename = "issueStatus")]
    pub status: FindingStatus,
    pub author: Option<String>,
    pub severity: Option<String>,
    pub rule: Option<String>,
    #[serde(rename = "type")]
    pub issue_type: Option<String>,
    pub effort: Option<String>,
    pub debt: Option<String>,
    pub tags: Vec<String>,
    pub message: Option<String>,
    pub quick_fix_available: Option<bool>,
    pub clean_code_attribute: Option<String>,
    pub clean_code_attribute_category: Option<String>,
    pub component: Option<String>,
    pub text_range: Option<TextRange>,
    pub impacts: JsonValue,
    pub flows: JsonValue,
    pub transitions: JsonValue,
    pub actions: JsonValue,
    pub comments: JsonValue,
}

impl Finding {
    /// A finding with only identity and status set. Used by tests and
    /// synthetic corpora.
    #[must_use]
    pub fn new(key: impl Into<String>, status: impl Into<FindingStatus>) -> Self {
        Self {
            key: key.into(),
            status: status.into(),
            author: None,
            severity: None,
            rule: None,
            issue_type: None,
            effort: None,
            debt: None,
            tags: Vec::new(),
            message: None,
            quick_fix_available: None,
            clean_code_attribute: None,
            clean_code_attribute_category: None,
            component: None,
            text_range: None,
            impacts: JsonValue::Null,
            flows: JsonValue::Null,
            transitions: JsonValue::Null,
            actions: JsonValue::Null,
            comments: JsonValue::Null,
        }
    }

    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// Wire shape accepted from the scanner before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFinding {
    key: String,
    #[serde(default)]
    issue_status: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    rule: Option<String>,
    #[serde(default, rename = "type")]
    issue_type: Option<String>,
    #[serde(default)]
    effort: Option<String>,
    #[serde(default)]
    debt: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    quick_fix_available: Option<bool>,
    #[serde(default)]
    clean_code_attribute: Option<String>,
    #[serde(default)]
    clean_code_attribute_category: Option<String>,
    #[serde(default)]
    component: Option<String>,
    #[serde(default)]
    text_range: Option<TextRange>,
    #[serde(default)]
    impacts: JsonValue,
    #[serde(default)]
    flows: JsonValue,
    #[serde(default)]
    transitions: JsonValue,
    #[serde(default)]
    actions: JsonValue,
    #[serde(default)]
    comments: JsonValue,
}

/// The scanner sends `""` for unset text fields; treat it as missing.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl TryFrom<RawFinding> for Finding {
    type Error = String;

    fn try_from(raw: RawFinding) -> Result<Self, Self::Error> {
        if raw.key.trim().is_empty() {
            return Err("finding key is empty".to_string());
        }

        // `issueStatus` is the lifecycle status; older payloads only carry `status`.
        let status = raw
            .issue_status
            .or(raw.status)
            .map_or_else(|| FindingStatus::Other(String::new()), FindingStatus::from);

        Ok(Self {
            key: raw.key,
            status,
            author: non_empty(raw.author),
            severity: non_empty(raw.severity),
            rule: non_empty(raw.rule),
            issue_type: non_empty(raw.issue_type),
            effort: non_empty(raw.effort),
            debt: non_empty(raw.debt),
            tags: raw.tags.unwrap_or_default(),
            message: non_empty(raw.message),
            quick_fix_available: raw.quick_fix_available,
            clean_code_attribute: non_empty(raw.clean_code_attribute),
            clean_code_attribute_category: non_empty(raw.clean_code_attribute_category),
            component: non_empty(raw.component),
            text_range: raw.text_range,
            impacts: raw.impacts,
            flows: raw.flows,
            transitions: raw.transitions,
            actions: raw.actions,
            comments: raw.comments,
        })
    }
}
