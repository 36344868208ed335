//! Ordered loader registry
//!
//! Entries are tried in registration order and the first detector that
//! accepts `(key, options)` wins. A [`Registry`] can only be built by
//! supplying a catch-all, so choosing a loader never fails.

use std::fmt;
use std::sync::Arc;

use crate::core::FileType;
use crate::loaders::chart::{EChartsLoader, IgvLoader, VegaLoader};
use crate::loaders::detect::{ext_in, strip_compression};
use crate::loaders::editor::EditorLoader;
use crate::loaders::fcs::FcsLoader;
use crate::loaders::html::{HtmlLoader, IFrameLoader};
use crate::loaders::json::JsonLoader;
use crate::loaders::markdown::MarkdownLoader;
use crate::loaders::media::{
    AudioLoader, ImageLoader, VideoLoader, AUDIO_EXTENSIONS, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS,
};
use crate::loaders::ngl::{NglLoader, MOLECULE_EXTENSIONS};
use crate::loaders::notebook::{NotebookLoader, VoilaLoader};
use crate::loaders::pdf::PdfLoader;
use crate::loaders::tabular::{TabularLoader, TABULAR_EXTENSIONS};
use crate::loaders::text::{TextLoader, TEXT_EXTENSIONS};
use crate::loaders::vcf::VcfLoader;
use crate::loaders::{LoadOptions, Loader, UnsupportedLoader};

/// Pure, synchronous detection predicate
pub type Detect = Box<dyn Fn(&str, &LoadOptions) -> bool + Send + Sync>;

/// Prefix of package-internal metadata keys
pub const MANIFEST_PREFIX: &str = ".quilt/";

pub struct Entry {
    name: &'static str,
    detect: Detect,
    loader: Arc<dyn Loader>,
}

impl Entry {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn loader(&self) -> &Arc<dyn Loader> {
        &self.loader
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry").field("name", &self.name).finish()
    }
}

/// Collects entries in priority order
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<Entry>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        name: &'static str,
        detect: impl Fn(&str, &LoadOptions) -> bool + Send + Sync + 'static,
        loader: impl Loader + 'static,
    ) -> Self {
        self.entries.push(Entry {
            name,
            detect: Box::new(detect),
            loader: Arc::new(loader),
        });
        self
    }

    /// Register a loader chosen by an explicit `mode`, or, without one, by
    /// extension (compression suffixes stripped)
    pub fn register_format(
        self,
        mode: FileType,
        extensions: &'static [&'static str],
        loader: impl Loader + 'static,
    ) -> Self {
        self.register(
            mode.as_str(),
            move |key, options| match options.mode {
                Some(requested) => requested == mode,
                None => ext_in(strip_compression(key), extensions),
            },
            loader,
        )
    }

    /// Register a loader reachable only through an explicit mode
    pub fn register_mode(self, mode: FileType, loader: impl Loader + 'static) -> Self {
        self.register(mode.as_str(), move |_, options| options.wants(mode), loader)
    }

    /// Close the chain with a loader that accepts everything
    pub fn fallback(self, loader: impl Loader + 'static) -> Registry {
        Registry {
            entries: self.entries,
            fallback: Entry {
                name: "fallback",
                detect: Box::new(|_, _| true),
                loader: Arc::new(loader),
            },
        }
    }
}

/// Ordered detector chain with a mandatory catch-all
pub struct Registry {
    entries: Vec<Entry>,
    fallback: Entry,
}

impl Registry {
    /// The catalog's loaders, most specific first
    pub fn standard() -> Self {
        RegistryBuilder::new()
            .register(
                "manifest",
                |key, options| options.mode.is_none() && key.starts_with(MANIFEST_PREFIX),
                TextLoader,
            )
            .register_mode(FileType::Editor, EditorLoader)
            .register_mode(FileType::Echarts, EChartsLoader)
            .register_mode(FileType::Vega, VegaLoader)
            .register_mode(FileType::Igv, IgvLoader)
            .register_mode(FileType::Voila, VoilaLoader)
            .register_mode(FileType::Iframe, IFrameLoader)
            .register_format(FileType::Tabular, TABULAR_EXTENSIONS, TabularLoader)
            .register_format(FileType::Fcs, &[".fcs"], FcsLoader)
            .register_format(FileType::Jupyter, &[".ipynb"], NotebookLoader)
            .register_format(FileType::Ngl, MOLECULE_EXTENSIONS, NglLoader)
            .register_format(FileType::Vcf, &[".vcf"], VcfLoader)
            .register_format(FileType::Pdf, &[".pdf", ".pptx"], PdfLoader)
            .register_format(FileType::Json, &[".json"], JsonLoader)
            .register_format(FileType::Markdown, &[".md", ".rmd"], MarkdownLoader)
            .register_format(FileType::Html, &[".htm", ".html"], HtmlLoader)
            .register_format(FileType::Audio, AUDIO_EXTENSIONS, AudioLoader)
            .register_format(FileType::Video, VIDEO_EXTENSIONS, VideoLoader)
            .register_format(FileType::Text, TEXT_EXTENSIONS, TextLoader)
            .register_format(FileType::Image, IMAGE_EXTENSIONS, ImageLoader)
            .fallback(UnsupportedLoader)
    }

    /// First entry accepting `(key, options)`; the catch-all otherwise
    pub fn choose(&self, key: &str, options: &LoadOptions) -> &Entry {
        self.entries
            .iter()
            .find(|entry| (entry.detect)(key, options))
            .unwrap_or(&self.fallback)
    }

    /// Entry names in priority order, catch-all last
    pub fn names(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .chain(std::iter::once(&self.fallback))
            .map(|e| e.name)
            .collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("entries", &self.names()).finish()
    }
}
