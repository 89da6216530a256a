use std::collections::HashMap;

use crate::dtos::SasLinkParams;
use crate::error::AppError;

/// Resource families served by this service. Each kind has its own
/// container map, object-naming rule, and content-type policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Report,
    Certificate,
}

/// How the browser should handle the fetched object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispositionMode {
    Inline,
    #[default]
    Attachment,
}

impl DispositionMode {
    /// Parse a user-supplied `view` value. Anything other than `inline`
    /// or `attachment` (case-insensitive) coerces to `Attachment` rather
    /// than failing the request.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.to_ascii_lowercase()).as_deref() {
            Some("inline") => DispositionMode::Inline,
            _ => DispositionMode::Attachment,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DispositionMode::Inline => "inline",
            DispositionMode::Attachment => "attachment",
        }
    }
}

/// Fully resolved coordinates of one stored object, plus the response
/// header overrides its signed URL should carry.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLocator {
    pub container: String,
    pub object_name: String,
    pub content_type: String,
    pub disposition: DispositionMode,
    pub display_filename: String,
}

/// Maps an entity ID to the report object holding its document. Swappable
/// so a database-backed lookup can replace the rule-based default; a
/// returned empty string means "no mapping".
pub type ReportNamer = fn(&str) -> String;

fn default_report_name(entity_id: &str) -> String {
    format!("{}.pdf", entity_id)
}

/// Derives (container, object name, content type) from the request path
/// and query parameters. Holds the immutable region maps built at startup.
#[derive(Clone)]
pub struct Resolver {
    report_containers: HashMap<String, String>,
    certificate_containers: HashMap<String, String>,
    default_region: String,
    report_namer: ReportNamer,
}

impl Resolver {
    pub fn new(
        report_containers: HashMap<String, String>,
        certificate_containers: HashMap<String, String>,
        default_region: String,
    ) -> Self {
        Self {
            report_containers,
            certificate_containers,
            default_region,
            report_namer: default_report_name,
        }
    }

    /// Replace the report naming rule.
    pub fn with_report_namer(mut self, namer: ReportNamer) -> Self {
        self.report_namer = namer;
        self
    }

    pub fn resolve(
        &self,
        entity_id: &str,
        kind: ResourceKind,
        params: &SasLinkParams,
    ) -> Result<ResourceLocator, AppError> {
        let container =
            self.pick_container(kind, params.container.as_deref(), params.region.as_deref());

        let object_name = match kind {
            ResourceKind::Report => (self.report_namer)(entity_id),
            // Certificates use a fixed extension policy.
            ResourceKind::Certificate => format!("{}.png", entity_id),
        };
        if object_name.is_empty() {
            tracing::warn!("No object mapping for entity {}", entity_id);
            return Err(AppError::NotResolvable);
        }

        let content_type = match kind {
            ResourceKind::Report => params
                .content_type
                .clone()
                .filter(|ct| !ct.is_empty())
                .unwrap_or_else(|| "application/pdf".to_string()),
            ResourceKind::Certificate => "image/png".to_string(),
        };

        let display_filename = params
            .filename
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| basename(&object_name).to_string());

        Ok(ResourceLocator {
            container,
            object_name,
            content_type,
            disposition: DispositionMode::parse(params.view.as_deref()),
            display_filename,
        })
    }

    /// Container precedence: explicit override, then the region map
    /// (case-insensitive), then the default region's container.
    fn pick_container(
        &self,
        kind: ResourceKind,
        container_override: Option<&str>,
        region: Option<&str>,
    ) -> String {
        let map = match kind {
            ResourceKind::Report => &self.report_containers,
            ResourceKind::Certificate => &self.certificate_containers,
        };

        if let Some(container) = container_override.filter(|c| !c.is_empty()) {
            return container.to_string();
        }
        if let Some(region) = region {
            if let Some(container) = map.get(&region.to_lowercase()) {
                return container.clone();
            }
        }
        map.get(&self.default_region).cloned().unwrap_or_default()
    }
}

fn basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
