use std::ffi::OsString;
use std::io::Write;
use std::process::{ExitStatus, Stdio};
use log::debug;
use thiserror::Error;
use crate::environment::Exposure;
use crate::values::{self, Values};

#[derive(Error, Debug)]
pub enum Error {
    #[error("helm exited with code {0}")]
    Helm(ExitStatus),

    #[error("render values: {0}")]
    Values(#[from] values::Error),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

/// Cluster credentials handed to Helm. Unset fields fall back to Helm's own defaults.
#[derive(Default, Debug, Clone)]
pub struct Provider {
    pub kubeconfig: Option<String>,
    pub kube_context: Option<String>,
}

/// A Helm release of the application chart.
#[derive(Debug, Clone)]
pub struct Release {
    pub name: String,
    pub namespace: String,
    pub chart: String,
    pub create_namespace: bool,
    pub hostname: String,
    pub expose: Exposure,
    pub values: Values,
}

#[derive(Default, Debug, Clone)]
pub struct Options {
    pub wait: bool,
    pub dry_run: bool,
}

/// Arguments for `helm`, given the path of the rendered values file.
fn helm_args(release: &Release, provider: &Provider, options: &Options, values_file: OsString) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "upgrade".into(),
        "--install".into(),
        release.name.clone().into(),
        release.chart.clone().into(),
        "--namespace".into(),
        release.namespace.clone().into(),
    ];

    if release.create_namespace {
        args.push("--create-namespace".into());
    }

    args.push("--values".into());
    args.push(values_file);
    args.push("--set-string".into());
    args.push(format!("hostname={}", release.hostname).into());
    args.push("--set-string".into());
    args.push(format!("expose={}", release.expose).into());

    if let Some(kubeconfig) = &provider.kubeconfig {
        args.push("--kubeconfig".into());
        args.push(kubeconfig.into());
    }
    if let Some(kube_context) = &provider.kube_context {
        args.push("--kube-context".into());
        args.push(kube_context.into());
    }
    if options.wait {
        args.push("--wait".into());
    }
    if options.dry_run {
        args.push("--dry-run".into());
    }
    args
}

/// Install or upgrade the release with `helm upgrade --install`.
pub fn apply(release: &Release, provider: &Provider, options: &Options) -> Result<(), Error> {
    // Kept until helm exits; the values contain secrets, so never write them anywhere permanent.
    let mut file = tempfile::Builder::new()
        .prefix("values-")
        .suffix(".yaml")
        .tempfile()?;
    file.write_all(release.values.to_yaml()?.as_bytes())?;
    file.flush()?;

    let args = helm_args(release, provider, options, file.path().as_os_str().to_owned());
    debug!("Running helm {:?}", args);

    std::process::Command::new("helm")
        .args(&args)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map(|exit_status| {
            if exit_status.success() {
                Ok(())
            } else {
                Err(Error::Helm(exit_status))
            }
        })?
}
