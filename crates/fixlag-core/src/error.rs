use std::fmt;

/// Machine-readable error codes for scripts driving `fixlag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InputUnreadable,
    ConfigParseError,
    UnsupportedLogVersion,
    ReportWriteFailed,
    ReportHeaderMismatch,
    ReportRowInvalid,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InputUnreadable => "E1001",
            Self::ConfigParseError => "E1002",
            Self::UnsupportedLogVersion => "E2001",
            Self::ReportWriteFailed => "E3001",
            Self::ReportHeaderMismatch => "E3002",
            Self::ReportRowInvalid => "E3003",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InputUnreadable => "Snapshot log could not be read",
            Self::ConfigParseError => "Config file parse error",
            Self::UnsupportedLogVersion => "Snapshot log version not supported",
            Self::ReportWriteFailed => "Report write failed",
            Self::ReportHeaderMismatch => "Report header does not match",
            Self::ReportRowInvalid => "Report row invalid",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InputUnreadable => Some("Check the input path, or pass `-` to read stdin."),
            Self::ConfigParseError => Some("Fix syntax in fixlag.toml and retry."),
            Self::UnsupportedLogVersion => {
                Some("Upgrade fixlag, or regenerate the log with a supported header.")
            }
            Self::ReportWriteFailed => Some("Check disk space and write permissions."),
            Self::ReportHeaderMismatch => {
                Some("Regenerate the report with `fixlag analyze` from this version.")
            }
            Self::ReportRowInvalid => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
