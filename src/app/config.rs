//! Application configuration from CLI arguments

use std::env;
use std::path::PathBuf;

use super::config_file::ConfigFile;
use super::exit_code;
use crate::core::{Context, FileType, ObjectHandle, PackageHandle, S3Handle};
use crate::loaders::LoadOptions;

/// Application configuration from CLI args and config file
#[derive(Debug)]
pub struct Config {
    /// Object to preview
    pub handle: ObjectHandle,
    /// Mode hint, context and gate override
    pub options: LoadOptions,
    /// Settings from the config file
    pub file: ConfigFile,
}

impl Config {
    pub fn from_args() -> anyhow::Result<Self> {
        Self::from_args_iter(env::args().skip(1))
    }

    /// Parse arguments (without the program name)
    pub fn from_args_iter(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut args = args.into_iter();
        let mut config_path: Option<PathBuf> = None;
        let mut location: Option<S3Handle> = None;
        let mut package: Option<PackageHandle> = None;
        let mut logical_key: Option<String> = None;
        let mut options = LoadOptions::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    if let Some(path) = args.next() {
                        config_path = Some(PathBuf::from(path));
                    } else {
                        anyhow::bail!("--config requires a file path");
                    }
                }
                "--mode" | "-m" => {
                    if let Some(mode) = args.next() {
                        options.mode = Some(mode.parse::<FileType>().map_err(|e| {
                            anyhow::anyhow!("{}. Valid modes: {}", e, mode_names())
                        })?);
                    } else {
                        anyhow::bail!("--mode requires a value ({})", mode_names());
                    }
                }
                "--listing" => options.context = Context::Listing,
                "--force" => options.force = true,
                "--package" => {
                    if let Some(spec) = args.next() {
                        package = Some(PackageHandle::parse(&spec).ok_or_else(|| {
                            anyhow::anyhow!(
                                "Invalid package '{}'. Expected bucket/user/name@hash",
                                spec
                            )
                        })?);
                    } else {
                        anyhow::bail!("--package requires bucket/user/name@hash");
                    }
                }
                "--logical-key" => {
                    if let Some(key) = args.next() {
                        logical_key = Some(key);
                    } else {
                        anyhow::bail!("--logical-key requires a path");
                    }
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(exit_code::SUCCESS);
                }
                "--version" | "-V" => {
                    println!("cpv {}", env!("CARGO_PKG_VERSION"));
                    std::process::exit(exit_code::SUCCESS);
                }
                uri if !uri.starts_with('-') => {
                    if location.is_some() {
                        anyhow::bail!("Only one object can be previewed at a time");
                    }
                    location = Some(S3Handle::parse_uri(uri).ok_or_else(|| {
                        anyhow::anyhow!("Invalid object URI '{}'. Expected s3://bucket/key", uri)
                    })?);
                }
                unknown => {
                    anyhow::bail!(
                        "Unknown option: {}. Use --help for usage information.",
                        unknown
                    );
                }
            }
        }

        let Some(location) = location else {
            anyhow::bail!("Missing object URI. Use --help for usage information.");
        };
        let handle = match (package, logical_key) {
            (Some(package), Some(key)) => ObjectHandle::new(location).in_package(package, key),
            (None, None) => ObjectHandle::new(location),
            _ => anyhow::bail!("--package and --logical-key must be given together"),
        };

        let file = match config_path {
            Some(path) => ConfigFile::load_from(&path)?,
            None => ConfigFile::load(),
        };

        Ok(Self {
            handle,
            options,
            file,
        })
    }
}

fn mode_names() -> String {
    FileType::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_help() {
    println!(
        r#"cpv - preview an object from a data catalog

USAGE:
    cpv [OPTIONS] s3://bucket/key[?versionId=ID]

OPTIONS:
    -m, --mode MODE         Preview as MODE instead of detecting from the key
    --listing               Use the smaller payloads of listing previews
    --force                 Load objects past the automatic size limit
    --package PKG           Object belongs to package bucket/user/name@hash
    --logical-key PATH      Path of the object inside --package
    -c, --config FILE       Read configuration from FILE
    -h, --help              Show this help message
    -V, --version           Show version

MODES:
    {}

EXIT CODES:
    0  Preview rendered
    1  Preview resolved to an error message
    2  Runtime error
    3  Invalid arguments

CONFIG:
    ~/.config/catalog-preview/config.toml

ENVIRONMENT:
    RUST_LOG                Log filter (default: warn), written to stderr"#,
        mode_names()
    );
}
