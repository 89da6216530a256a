use serde::Deserialize;

/// Query parameters accepted by the link endpoints. All optional; empty
/// strings are treated the same as absent values downstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SasLinkParams {
    /// Explicit container override; wins over `region`.
    pub container: Option<String>,
    /// Region code (`cn`/`hk`/`en`, case-insensitive) selecting the
    /// container from the per-kind map.
    pub region: Option<String>,
    /// `inline` or `attachment`; anything else coerces to `attachment`.
    pub view: Option<String>,
    /// Display filename for the download; defaults to the object name.
    pub filename: Option<String>,
    /// Content-type override; honored for reports only.
    pub content_type: Option<String>,
}
