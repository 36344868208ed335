//! Renderable preview payloads

use bytes::Bytes;
use serde_json::Value;

use super::action::{Action, ChangeHandler};
use super::handle::ObjectHandle;
use super::mode::FileType;

/// RGB foreground color of a highlighted segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// A segment of styled text (text with color)
#[derive(Debug, Clone, PartialEq)]
pub struct StyledSegment {
    pub text: String,
    pub color: Rgb,
}

/// A line with syntax highlighting
#[derive(Debug, Clone, PartialEq)]
pub struct StyledLine {
    pub segments: Vec<StyledSegment>,
}

impl StyledLine {
    /// Concatenated text of all segments
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Highlighted head and tail of a text preview
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Highlighted {
    pub head: Vec<StyledLine>,
    pub tail: Vec<StyledLine>,
}

/// Where an IFrame gets its document from
#[derive(Debug, Clone, PartialEq)]
pub enum IFrameSource {
    Url(String),
    SrcDoc(String),
}

/// Document kind behind a page-rendered preview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDocument {
    Pdf,
    Pptx,
}

impl PageDocument {
    pub fn as_str(self) -> &'static str {
        match self {
            PageDocument::Pdf => "pdf",
            PageDocument::Pptx => "pptx",
        }
    }
}

/// Tabular payload produced by the tabular preview service
#[derive(Debug, Clone, PartialEq)]
pub struct TabularData {
    /// Raw table (CSV text or Arrow bytes, see `format`)
    pub body: Bytes,
    pub format: TabularFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabularFormat {
    Csv,
    Arrow,
}

/// One renderable preview; exactly one per successful load
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewData {
    Audio {
        src: String,
    },
    Video {
        src: String,
    },
    Image {
        handle: ObjectHandle,
    },
    Text {
        head: String,
        tail: String,
        lang: String,
        highlighted: Highlighted,
        note: Option<String>,
        warnings: Option<String>,
    },
    Json {
        rendered: Value,
        modes: Vec<FileType>,
    },
    Markdown {
        rendered: String,
        modes: Vec<FileType>,
    },
    Notebook {
        preview: String,
        note: Option<String>,
        warnings: Option<String>,
        modes: Vec<FileType>,
    },
    Perspective {
        data: TabularData,
        meta: Option<Value>,
        truncated: bool,
        load_more: Option<Action>,
    },
    Vega {
        spec: Value,
    },
    ECharts {
        option: Value,
    },
    Igv {
        options: Value,
    },
    Pdf {
        handle: ObjectHandle,
        pages: u32,
        first_page_blob: Bytes,
        kind: PageDocument,
    },
    IFrame {
        source: IFrameSource,
        modes: Vec<FileType>,
        sandbox: Option<String>,
        bus: Option<crate::loaders::html::MessageBus>,
    },
    Voila {
        src: String,
        sandbox: String,
        modes: Vec<FileType>,
    },
    Vcf {
        meta: Vec<String>,
        header: Vec<String>,
        data: Vec<Vec<String>>,
        variants: Vec<String>,
    },
    Fcs {
        preview: String,
        metadata: Value,
    },
    Ngl {
        blob: Bytes,
        ext: String,
    },
    Editor {
        value: String,
        on_change: ChangeHandler,
    },
}

impl PreviewData {
    /// Short name of the variant, for logs and summaries
    pub fn kind(&self) -> &'static str {
        match self {
            PreviewData::Audio { .. } => "audio",
            PreviewData::Video { .. } => "video",
            PreviewData::Image { .. } => "image",
            PreviewData::Text { .. } => "text",
            PreviewData::Json { .. } => "json",
            PreviewData::Markdown { .. } => "markdown",
            PreviewData::Notebook { .. } => "notebook",
            PreviewData::Perspective { .. } => "perspective",
            PreviewData::Vega { .. } => "vega",
            PreviewData::ECharts { .. } => "echarts",
            PreviewData::Igv { .. } => "igv",
            PreviewData::Pdf { .. } => "pdf",
            PreviewData::IFrame { .. } => "iframe",
            PreviewData::Voila { .. } => "voila",
            PreviewData::Vcf { .. } => "vcf",
            PreviewData::Fcs { .. } => "fcs",
            PreviewData::Ngl { .. } => "ngl",
            PreviewData::Editor { .. } => "editor",
        }
    }

    /// Alternate modes this payload can be re-rendered in
    pub fn modes(&self) -> &[FileType] {
        match self {
            PreviewData::Json { modes, .. }
            | PreviewData::Markdown { modes, .. }
            | PreviewData::Notebook { modes, .. }
            | PreviewData::IFrame { modes, .. }
            | PreviewData::Voila { modes, .. } => modes,
            _ => &[],
        }
    }
}
