//! Preview modes (alternate interpretations of one object)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Rendering interpretation requested for, or offered by, a preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Audio,
    Echarts,
    Editor,
    Fcs,
    Html,
    /// HTML rendered from `srcDoc` with the file-access SDK injected
    Iframe,
    Igv,
    Image,
    Json,
    Jupyter,
    Markdown,
    Ngl,
    Pdf,
    Tabular,
    Text,
    Vcf,
    Vega,
    Video,
    Voila,
}

impl FileType {
    pub const ALL: [FileType; 19] = [
        FileType::Audio,
        FileType::Echarts,
        FileType::Editor,
        FileType::Fcs,
        FileType::Html,
        FileType::Iframe,
        FileType::Igv,
        FileType::Image,
        FileType::Json,
        FileType::Jupyter,
        FileType::Markdown,
        FileType::Ngl,
        FileType::Pdf,
        FileType::Tabular,
        FileType::Text,
        FileType::Vcf,
        FileType::Vega,
        FileType::Video,
        FileType::Voila,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Audio => "audio",
            FileType::Echarts => "echarts",
            FileType::Editor => "editor",
            FileType::Fcs => "fcs",
            FileType::Html => "html",
            FileType::Iframe => "iframe",
            FileType::Igv => "igv",
            FileType::Image => "image",
            FileType::Json => "json",
            FileType::Jupyter => "jupyter",
            FileType::Markdown => "markdown",
            FileType::Ngl => "ngl",
            FileType::Pdf => "pdf",
            FileType::Tabular => "tabular",
            FileType::Text => "text",
            FileType::Vcf => "vcf",
            FileType::Vega => "vega",
            FileType::Video => "video",
            FileType::Voila => "voila",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        FileType::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| format!("unknown preview mode '{}'", s))
    }
}

/// Where the preview is shown; drives payload size for tabular data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Context {
    /// Standalone file page
    #[default]
    File,
    /// Inline preview inside a listing or summary
    Listing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for t in FileType::ALL {
            assert_eq!(t.as_str().parse::<FileType>().unwrap(), t);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Vega".parse::<FileType>().unwrap(), FileType::Vega);
        assert!("spreadsheet".parse::<FileType>().is_err());
    }
}
