//! Display mapping from preview results to what the user sees

use std::fmt;

use serde_json::Value;

use crate::core::{
    Action, AsyncResult, IFrameSource, PreviewData, PreviewError, PreviewResult, TabularFormat,
};
use crate::store::{SignOptions, Signer};

/// What a message offers the user
#[derive(Debug, Clone, PartialEq)]
pub enum MessageAction {
    Retry(Action),
    /// "Load anyway" past the size gate
    Unlock(Action),
    /// Signed link to the object
    Download(String),
}

impl MessageAction {
    pub fn label(&self) -> &'static str {
        match self {
            MessageAction::Retry(_) => "Retry",
            MessageAction::Unlock(_) => "Load preview",
            MessageAction::Download(_) => "Download",
        }
    }
}

/// Rendered form of one preview state
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Progress,
    Message {
        heading: String,
        body: Option<String>,
        action: Option<MessageAction>,
    },
    Content(PreviewData),
}

fn message(heading: &str, body: Option<String>, action: Option<MessageAction>) -> Rendered {
    Rendered::Message {
        heading: heading.to_string(),
        body,
        action,
    }
}

/// Map a preview state to its rendering.
///
/// With a `signer`, objects that cannot be previewed offer a download link.
pub fn render(result: &PreviewResult, signer: Option<&dyn Signer>) -> Rendered {
    match result {
        AsyncResult::Init | AsyncResult::Pending => Rendered::Progress,
        AsyncResult::Ok(data) => Rendered::Content(data.clone()),
        AsyncResult::Err(e) => render_error(e, signer),
    }
}

fn render_error(e: &PreviewError, signer: Option<&dyn Signer>) -> Rendered {
    let download = |handle: &crate::core::ObjectHandle| {
        signer.map(|s| {
            MessageAction::Download(s.sign(&handle.location, &SignOptions::default()))
        })
    };
    match e {
        PreviewError::Deleted { .. } => message(
            "Delete Marker",
            Some("Selected version of the object is a delete marker".into()),
            None,
        ),
        PreviewError::Archived { .. } => message(
            "Object Archived",
            Some("Preview not available".into()),
            None,
        ),
        PreviewError::InvalidVersion { .. } => message(
            "Invalid Version",
            Some("Invalid version id specified".into()),
            None,
        ),
        PreviewError::Forbidden { .. } => message(
            "Access Denied",
            Some("Preview not available".into()),
            None,
        ),
        PreviewError::Gated { load, .. } => message(
            "Object is Large",
            Some("Object is too large to load automatically".into()),
            Some(MessageAction::Unlock(load.clone())),
        ),
        PreviewError::TooLarge { handle } => message(
            "Object is Too Large",
            Some("Object is too large to preview".into()),
            download(handle),
        ),
        PreviewError::Unsupported { handle } => {
            message("Preview Not Available", None, download(handle))
        }
        PreviewError::DoesNotExist { .. } => message(
            "No Such Object",
            Some("Object does not exist".into()),
            None,
        ),
        PreviewError::SrcDoesNotExist { path } => message(
            "Could Not Resolve Data File",
            Some(format!("Could not resolve data file \"{}\"", path)),
            None,
        ),
        PreviewError::MalformedJson { message: detail, .. } => {
            message("Malformed JSON", Some(detail.clone()), None)
        }
        PreviewError::Expired { retry } => message(
            "Session Expired",
            Some("Browsing session expired".into()),
            Some(MessageAction::Retry(retry.clone())),
        ),
        PreviewError::Unexpected { retry, .. } => message(
            "Unexpected Error",
            Some("Something went wrong while loading preview".into()),
            retry.clone().map(MessageAction::Retry),
        ),
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rendered::Progress => f.write_str("Loading..."),
            Rendered::Message {
                heading,
                body,
                action,
            } => {
                f.write_str(heading)?;
                if let Some(body) = body {
                    write!(f, "\n{}", body)?;
                }
                match action {
                    Some(MessageAction::Download(url)) => write!(f, "\nDownload: {}", url),
                    Some(action) => write!(f, "\n[{}]", action.label()),
                    None => Ok(()),
                }
            }
            Rendered::Content(data) => fmt_content(data, f),
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn fmt_content(data: &PreviewData, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match data {
        PreviewData::Audio { src } => write!(f, "audio: {}", src),
        PreviewData::Video { src } => write!(f, "video: {}", src),
        PreviewData::Image { handle } => write!(f, "image: {}", handle),
        PreviewData::Text {
            head,
            tail,
            note,
            warnings,
            ..
        } => {
            f.write_str(head)?;
            if !tail.is_empty() {
                write!(f, "\n...\n{}", tail)?;
            }
            if let Some(note) = note {
                write!(f, "\n\n{}", note)?;
            }
            if let Some(warnings) = warnings {
                write!(f, "\n\n{}", warnings)?;
            }
            Ok(())
        }
        PreviewData::Json { rendered, .. } => f.write_str(&pretty(rendered)),
        PreviewData::Markdown { rendered, .. } => f.write_str(rendered),
        PreviewData::Notebook { preview, note, .. } => {
            f.write_str(preview)?;
            match note {
                Some(note) => write!(f, "\n\n{}", note),
                None => Ok(()),
            }
        }
        PreviewData::Perspective {
            data, truncated, ..
        } => {
            match data.format {
                TabularFormat::Csv => f.write_str(&String::from_utf8_lossy(&data.body))?,
                TabularFormat::Arrow => write!(f, "arrow table ({} bytes)", data.body.len())?,
            }
            if *truncated {
                f.write_str("\n(truncated)")?;
            }
            Ok(())
        }
        PreviewData::Vega { spec } => write!(f, "vega spec\n{}", pretty(spec)),
        PreviewData::ECharts { option } => write!(f, "echarts option\n{}", pretty(option)),
        PreviewData::Igv { options } => write!(f, "igv options\n{}", pretty(options)),
        PreviewData::Pdf {
            handle,
            pages,
            first_page_blob,
            kind,
        } => write!(
            f,
            "{}: {} ({} pages, first page {} bytes)",
            kind.as_str(),
            handle,
            pages,
            first_page_blob.len()
        ),
        PreviewData::IFrame {
            source, sandbox, ..
        } => {
            match source {
                IFrameSource::Url(url) => write!(f, "iframe: {}", url)?,
                IFrameSource::SrcDoc(doc) => write!(f, "iframe document ({} bytes)", doc.len())?,
            }
            match sandbox {
                Some(sandbox) => write!(f, "\nsandbox: {}", sandbox),
                None => Ok(()),
            }
        }
        PreviewData::Voila { src, .. } => write!(f, "voila: {}", src),
        PreviewData::Vcf {
            meta,
            header,
            data,
            variants,
        } => {
            for line in meta {
                writeln!(f, "{}", line)?;
            }
            writeln!(f, "{}", header.join("\t"))?;
            for row in data {
                writeln!(f, "{}", row.join("\t"))?;
            }
            write!(f, "{} variants", variants.len())
        }
        PreviewData::Fcs { preview, .. } => f.write_str(preview),
        PreviewData::Ngl { blob, ext } => write!(f, "{} structure ({} bytes)", ext, blob.len()),
        PreviewData::Editor { value, .. } => f.write_str(value),
    }
}
