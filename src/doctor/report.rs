//! Diagnostic reports for the doctor command

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, PartialOrd, Ord)]
pub enum Severity {
    Info,
    /// Degraded but usable
    Warning,
    /// The assistant cannot answer correctly
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Category of diagnostic check
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CheckCategory {
    Configuration,
    Storage,
    /// Model endpoint and credentials
    Model,
    /// Canned answers and pattern seeds
    Behavior,
}

impl fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckCategory::Configuration => write!(f, "Configuration"),
            CheckCategory::Storage => write!(f, "Storage"),
            CheckCategory::Model => write!(f, "Model"),
            CheckCategory::Behavior => write!(f, "Behavior"),
        }
    }
}

/// A single diagnostic check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub category: CheckCategory,
    pub severity: Severity,
    pub passed: bool,
    pub message: String,
    /// Optional fix suggestion
    pub fix: Option<String>,
    pub details: Vec<String>,
}

impl CheckResult {
    /// Create a passing check
    pub fn pass(name: impl Into<String>, category: CheckCategory, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category,
            severity: Severity::Info,
            passed: true,
            message: message.into(),
            fix: None,
            details: vec![],
        }
    }

    /// Create a failing check
    pub fn fail(
        name: impl Into<String>,
        category: CheckCategory,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            severity,
            passed: false,
            message: message.into(),
            fix: None,
            details: vec![],
        }
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }
}

/// Complete diagnostic report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub checks: Vec<CheckResult>,
    /// False once any check fails
    pub healthy: bool,
    pub summary: String,
}

impl DiagnosticReport {
    pub fn new(version: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            version: version.to_string(),
            checks: Vec::new(),
            healthy: true,
            summary: String::new(),
        }
    }

    pub fn add_check(&mut self, check: CheckResult) {
        if !check.passed {
            self.healthy = false;
        }
        self.checks.push(check);
    }

    /// Generate the summary line
    pub fn finalize(&mut self) {
        let failed = self.checks.iter().filter(|c| !c.passed).count();
        self.summary = if failed == 0 {
            format!("All {} checks passed", self.checks.len())
        } else {
            format!("{} of {} check(s) failed", failed, self.checks.len())
        };
    }

    /// Count failed checks by severity
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.checks
            .iter()
            .filter(|c| !c.passed && c.severity == severity)
            .count()
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "MANI DIAGNOSTIC REPORT")?;
        writeln!(f, "Generated: {}", self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f, "Version:   {}", self.version)?;
        writeln!(f)?;

        let mut categories: Vec<CheckCategory> = self.checks.iter().map(|c| c.category).collect();
        categories.sort();
        categories.dedup();

        for category in categories {
            writeln!(f, "┌─ {}", category)?;
            for check in self.checks.iter().filter(|c| c.category == category) {
                let status = if check.passed { "✓" } else { "✗" };
                writeln!(f, "│ {} {} [{}] {}", status, check.severity, check.name, check.message)?;

                for detail in &check.details {
                    writeln!(f, "│    • {}", detail)?;
                }

                if !check.passed {
                    if let Some(ref fix) = check.fix {
                        writeln!(f, "│    Fix: {}", fix)?;
                    }
                }
            }
            writeln!(f, "└─")?;
            writeln!(f)?;
        }

        writeln!(f, "{}", self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_health_and_summary() {
        let mut report = DiagnosticReport::new("0.1.0");
        report.add_check(CheckResult::pass("store", CheckCategory::Storage, "ok"));
        assert!(report.healthy);

        report.add_check(
            CheckResult::fail("token", CheckCategory::Model, Severity::Warning, "missing")
                .with_fix("mani config --set-hf-token TOKEN"),
        );
        report.finalize();

        assert!(!report.healthy);
        assert_eq!(report.summary, "1 of 2 check(s) failed");
        assert_eq!(report.count_by_severity(Severity::Warning), 1);

        let text = report.to_string();
        assert!(text.contains("Fix: mani config --set-hf-token TOKEN"));
        assert!(text.contains("┌─ Storage"));
    }
}
