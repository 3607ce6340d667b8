//! Validation report types.

use std::fmt;

use serde::Serialize;

/// Every issue found while validating one dataset.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Appends another report's issues.
    pub fn extend(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }

    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// True if any issue carries `code`.
    pub fn has(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }

    /// Pass/fail under the given strictness.
    pub fn passes(&self, strict: bool) -> bool {
        if strict {
            self.is_clean()
        } else {
            self.is_ok()
        }
    }

    /// Machine-readable form for `validate --output json`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct JsonReport<'a> {
            errors: usize,
            warnings: usize,
            issues: &'a [ValidationIssue],
        }

        serde_json::to_string_pretty(&JsonReport {
            errors: self.error_count(),
            warnings: self.warning_count(),
            issues: &self.issues,
        })
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(f, "Validation passed: no issues found");
        }

        writeln!(
            f,
            "Validation found {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
    pub context: IssueContext,
}

impl ValidationIssue {
    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            context,
        }
    }

    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            context,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Suspicious but still importable/exportable.
    Warning,
    /// The dataset cannot be written faithfully.
    Error,
}

/// Stable issue codes, one per check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    DuplicateImageId,
    DuplicateAnnotationId,
    DuplicateCategoryId,

    MissingImageRef,
    MissingCategoryRef,

    InvalidImageDimensions,
    EmptyFileName,
    /// The image's file is absent from the dataset's `raw/` directory.
    MissingImageFile,

    EmptyCategoryName,
    /// Two categories share both supercategory and name. Superb AI export
    /// would merge them into one property option.
    DuplicateCategoryName,
    /// Exported as an object class with an empty name.
    EmptySupercategory,

    #[serde(rename = "bbox_not_finite")]
    BBoxNotFinite,
    #[serde(rename = "invalid_bbox_ordering")]
    InvalidBBoxOrdering,
    #[serde(rename = "bbox_out_of_bounds")]
    BBoxOutOfBounds,
    #[serde(rename = "invalid_bbox_area")]
    InvalidBBoxArea,
}

/// Which record an issue is about.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueContext {
    Dataset,
    Image { id: u64 },
    Annotation { id: u64 },
    Category { id: u64 },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Dataset => write!(f, "dataset"),
            IssueContext::Image { id } => write!(f, "image {}", id),
            IssueContext::Annotation { id } => write!(f, "annotation {}", id),
            IssueContext::Category { id } => write!(f, "category {}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strictness_decides_on_warnings() {
        let mut report = ValidationReport::new();
        report.add(ValidationIssue::warning(
            IssueCode::EmptySupercategory,
            "empty supercategory",
            IssueContext::Category { id: 1 },
        ));
        assert!(report.passes(false));
        assert!(!report.passes(true));
    }

    #[test]
    fn json_report_carries_counts_and_codes() {
        let mut report = ValidationReport::new();
        report.add(ValidationIssue::error(
            IssueCode::MissingImageFile,
            "raw/a.jpg is missing",
            IssueContext::Image { id: 4 },
        ));

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["errors"], 1);
        assert_eq!(value["warnings"], 0);
        assert_eq!(value["issues"][0]["code"], "missing_image_file");
        assert_eq!(value["issues"][0]["severity"], "error");
        assert_eq!(
            value["issues"][0]["context"],
            serde_json::json!({"kind": "image", "id": 4})
        );
    }

    #[test]
    fn display_lists_every_issue() {
        let mut report = ValidationReport::new();
        report.add(ValidationIssue::error(
            IssueCode::DuplicateImageId,
            "duplicate",
            IssueContext::Image { id: 2 },
        ));
        let text = report.to_string();
        assert!(text.contains("1 error(s) and 0 warning(s)"));
        assert!(text.contains("[ERROR] DuplicateImageId in image 2: duplicate"));
    }
}
