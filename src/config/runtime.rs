use crate::config::file;
use crate::environment::{Environment, Exposure};
use thiserror::Error;

/// CI systems export the commit under deployment here.
const CI_COMMIT_SHA_VARIABLE: &str = "CIRCLE_SHA1";

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("no image tag: set {0} or CIRCLE_SHA1")]
    ImageTagNotFound(String),
}

/// Configuration for a single deployment, resolved from the
/// config file, the selected environment and the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub app: String,
    pub environment: Environment,
    pub http_hostname: String,
    pub ssh_hostname: String,
    pub expose: Exposure,
    /// Helm release name, doubling as the Kubernetes namespace.
    pub release_name: String,
    pub chart: String,
    pub content_dir: String,
    pub image_tag: String,
}

impl Config {
    /// `lookup` reads an environment variable; pass `|key| std::env::var(key).ok()` outside tests.
    pub fn new<F>(
        cfg: &file::File,
        environment: Environment,
        deploy_directory: &str,
        lookup: F,
    ) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app = cfg.app.clone();
        let prefix = environment.hostname_prefix();
        let content_dir = if environment.is_production() {
            cfg.persistence.production_path.clone()
        } else {
            cfg.persistence.development_path.clone()
        };

        Ok(Self {
            http_hostname: format!("{prefix}{app}.{}", cfg.domain),
            ssh_hostname: format!("{prefix}manage-{app}.{}", cfg.domain),
            expose: Exposure::for_environment(&environment),
            release_name: format!("{}-{app}", environment.short_name()),
            chart: format!("{deploy_directory}/{}/{app}", cfg.chart_directory),
            content_dir,
            image_tag: resolve_image_tag(&app, lookup)?,
            environment,
            app,
        })
    }
}

/// Name of the variable carrying an explicit version for `app`, e.g. `BRAIN_VERSION`.
pub fn version_variable(app: &str) -> String {
    format!("{}_VERSION", app.to_uppercase().replace('-', "_"))
}

/// Prefer `<APP>_VERSION`, then fall back to the CI commit SHA.
/// Empty values count as unset.
pub fn resolve_image_tag<F>(app: &str, lookup: F) -> Result<String, Error>
where
    F: Fn(&str) -> Option<String>,
{
    let version_variable = version_variable(app);
    let tag = [version_variable.as_str(), CI_COMMIT_SHA_VARIABLE]
        .into_iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.is_empty());
    tag.ok_or(Error::ImageTagNotFound(version_variable))
}
