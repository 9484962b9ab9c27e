//! Static checks over tool descriptors.

use std::fmt;

use strum::Display;

use crate::catalog::ToolCatalog;
use crate::metadata::{ToolDescriptor, ToolScope};
use crate::registry::ToolRegistry;

/// How serious a [`ValidationIssue`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Severity {
    /// Informational only.
    Info,
    /// Suspicious but usable.
    Warning,
    /// The tool will not work.
    Error,
    /// The tool breaks its host.
    Critical,
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Severity of the finding.
    pub severity: Severity,
    /// Area the finding concerns.
    pub category: &'static str,
    /// Human-readable explanation.
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.category, self.message)
    }
}

/// Findings for one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    tool_id: String,
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn new(tool_id: &str) -> Self {
        Self {
            tool_id: tool_id.to_owned(),
            issues: Vec::new(),
        }
    }

    fn push(&mut self, severity: Severity, category: &'static str, message: String) {
        self.issues.push(ValidationIssue {
            severity,
            category,
            message,
        });
    }

    /// Id of the validated tool.
    #[must_use]
    pub fn tool_id(&self) -> &str {
        &self.tool_id
    }

    /// Findings in discovery order.
    #[must_use]
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Number of error and critical findings.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity >= Severity::Error)
            .count()
    }

    /// Number of warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Warning)
            .count()
    }

    /// Returns `true` when there are no errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }
}

/// Checks `descriptor` against the catalogued classes and registered tools.
#[must_use]
pub fn validate_descriptor(
    descriptor: &ToolDescriptor,
    catalog: &ToolCatalog,
    registry: &ToolRegistry,
) -> ValidationReport {
    let mut report = ValidationReport::new(&descriptor.id);
    let metadata = &descriptor.metadata;

    if descriptor.id.trim().is_empty() {
        report.push(Severity::Error, "identity", String::from("tool id is empty"));
    }
    if metadata.name.trim().is_empty() {
        report.push(Severity::Error, "metadata", String::from("tool name is empty"));
    }
    if !catalog.contains(&descriptor.class) {
        report.push(
            Severity::Error,
            "contract",
            format!("class '{}' has no catalogued factory", descriptor.class),
        );
    }
    for dependency in &metadata.dependencies {
        if !registry.contains(dependency) {
            report.push(
                Severity::Warning,
                "dependencies",
                format!("dependency '{dependency}' is not registered"),
            );
        }
    }
    if metadata.scope == ToolScope::ModeSpecific && metadata.supported_modes.is_empty() {
        report.push(
            Severity::Warning,
            "modes",
            String::from("mode-specific tool lists no supported modes"),
        );
    }
    if metadata.requires_scene && metadata.scope == ToolScope::Global {
        report.push(
            Severity::Info,
            "scope",
            String::from("tool requires a scene but is scoped globally"),
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::contract::SharedTool;
    use crate::error::ToolError;
    use crate::metadata::ToolMetadata;

    #[fixture]
    fn catalog() -> ToolCatalog {
        let factory = |_: &crate::catalog::ToolContext,
                       descriptor: &ToolDescriptor|
         -> Result<SharedTool, ToolError> {
            Err(ToolError::Construction {
                class: descriptor.class.clone(),
                message: String::from("unused"),
            })
        };
        ToolCatalog::new().with("panel", Rc::new(factory))
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new([ToolDescriptor::new(
            "minimap",
            "panel",
            ToolMetadata::new("Minimap"),
        )])
    }

    #[rstest]
    fn well_formed_descriptors_pass(catalog: ToolCatalog) {
        let descriptor = ToolDescriptor::new(
            "inspector",
            "panel",
            ToolMetadata::new("Inspector").with_dependencies(["minimap"]),
        );

        let report = validate_descriptor(&descriptor, &catalog, &registry());

        assert!(report.is_valid());
        assert!(report.issues().is_empty());
    }

    #[rstest]
    fn blank_names_and_unknown_classes_are_errors(catalog: ToolCatalog) {
        let descriptor = ToolDescriptor::new("inspector", "ghost", ToolMetadata::new("  "));

        let report = validate_descriptor(&descriptor, &catalog, &registry());

        assert!(!report.is_valid());
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.warning_count(), 0);
    }

    #[rstest]
    fn missing_dependencies_and_empty_mode_lists_warn(catalog: ToolCatalog) {
        let descriptor = ToolDescriptor::new(
            "inspector",
            "panel",
            ToolMetadata::new("Inspector")
                .with_scope(ToolScope::ModeSpecific)
                .with_dependencies(["minimap", "ruler", "compass"]),
        );

        let report = validate_descriptor(&descriptor, &catalog, &registry());

        assert!(report.is_valid());
        assert_eq!(report.warning_count(), 3);
        assert_eq!(
            report
                .issues()
                .iter()
                .map(|issue| issue.category)
                .collect::<Vec<_>>(),
            ["dependencies", "dependencies", "modes"]
        );
    }

    #[rstest]
    fn global_scene_tools_are_noted(catalog: ToolCatalog) {
        let descriptor =
            ToolDescriptor::new("loader", "panel", ToolMetadata::new("Loader").requiring_scene());

        let report = validate_descriptor(&descriptor, &catalog, &registry());

        assert_eq!(
            report.issues().first().map(ToString::to_string).as_deref(),
            Some("[INFO] scope: tool requires a scene but is scoped globally")
        );
        assert!(report.is_valid());
    }
}
