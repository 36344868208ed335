//! One-shot CLI preview

use std::sync::Arc;

use tracing::info;

use super::config::Config;
use super::config_file::ConfigFile;
use super::exit_code;
use super::preview::Preview;
use super::render::render;
use crate::core::AsyncResult;
use crate::error::Result;
use crate::loaders::Env;
use crate::registry::Registry;
use crate::services::{GraphqlSessionApi, HttpPreviewService};
use crate::session::SessionManager;
use crate::store::{HttpStore, UrlSigner};

/// Environment backed by the HTTP collaborators named in `file`
pub fn build_env(file: &ConfigFile) -> Result<Env> {
    let endpoints = file.endpoints.clone();
    let mut env = Env::new(
        Arc::new(HttpStore::new(&endpoints.s3)?),
        Arc::new(UrlSigner::new(&endpoints.s3)?),
        Arc::new(HttpPreviewService::new(endpoints.clone())?),
    );
    env.sessions = Some(SessionManager::new(
        Arc::new(GraphqlSessionApi::new(&endpoints)?),
        file.session.clone(),
    ));
    env.endpoints = endpoints;
    env.thresholds = file.thresholds;
    env.limits = file.limits;
    env.buckets = file.buckets.clone();
    Ok(env)
}

/// Preview the configured object, print its rendering and return the
/// process exit code
pub async fn run(config: Config) -> anyhow::Result<i32> {
    let env = Arc::new(build_env(&config.file)?);
    let preview = Preview::new(env.clone(), Registry::standard());

    info!(object = %config.handle, "previewing");
    let task = preview.load(config.handle, config.options);
    let result = task.settled().await;
    println!("{}", render(&result, Some(env.signer.as_ref())));
    task.close();

    Ok(match result {
        AsyncResult::Ok(_) => exit_code::SUCCESS,
        _ => exit_code::PREVIEW_ERROR,
    })
}
