use serde::Deserialize;
use serde_inline_default::serde_inline_default;
use thiserror::Error;

const DEFAULT_CONFIG: &str = include_str!("../../default.toml");

#[derive(Error, Debug)]
pub enum Error {
    #[error("read {path}: {err}")]
    ReadFile {
        err: std::io::Error,
        path: String,
    },

    #[error("parse {path}: {err}")]
    Parse {
        err: toml::de::Error,
        path: String,
    },

    #[error("merge with defaults: {0}")]
    Merge(#[from] toml::de::Error),
}

/// A brain.toml file.
#[derive(Deserialize, Debug, Clone)]
pub struct File {
    pub description: Option<String>,
    pub app: String,
    pub domain: String,
    /// Directory holding one Helm chart per application, relative to the deploy directory.
    pub chart_directory: String,
    /// Used when neither `--environment` nor `BRAIN_ENV` is given.
    pub environment: Option<String>,
    pub secrets: Secrets,
    pub persistence: Persistence,
    pub ssh: Ssh,
    pub ingress: Ingress,
    #[serde(default = "Default::default")]
    pub helm: Helm,
}

impl Default for File {
    fn default() -> Self {
        // The default config is compiled into the program, so
        // make sure to test default() to catch panics compile-time.
        toml::from_str(DEFAULT_CONFIG).unwrap()
    }
}

impl File {
    /// Read a user configuration file and layer it on top of the built-in defaults.
    /// Tables are merged key by key, so a user file only needs the values it changes.
    pub fn default_with_user_config_file(path: &str) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|err| Error::ReadFile {
            err,
            path: path.to_string(),
        })?;
        Self::default_with_user_config(&contents).map_err(|err| match err {
            Error::Merge(err) => Error::Parse {
                err,
                path: path.to_string(),
            },
            err => err,
        })
    }

    pub fn default_with_user_config(contents: &str) -> Result<Self, Error> {
        let mut merged: toml::Table = toml::from_str(DEFAULT_CONFIG)?;
        let user: toml::Table = toml::from_str(contents)?;
        merge(&mut merged, user);
        Ok(toml::Value::Table(merged).try_into::<File>()?)
    }
}

fn merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                merge(base_table, overlay_table)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Where the deploy-time secrets live in Doppler.
#[derive(Deserialize, Debug, Clone)]
pub struct Secrets {
    pub project: String,
    /// Name of the secret holding the SSH host private key.
    pub host_key: String,
    pub api_url: String,
}

/// NFS volume backing the brain content directory.
#[derive(Deserialize, Debug, Clone)]
pub struct Persistence {
    pub nfs_server: String,
    pub production_path: String,
    pub development_path: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Ssh {
    #[serde(default = "Vec::new")]
    pub authorized_keys: Vec<String>,
    pub host_public_key: String,
}

#[serde_inline_default]
#[derive(Deserialize, Debug, Clone)]
pub struct Ingress {
    pub external_cluster_issuer: String,
    pub internal_cluster_issuer: String,
    #[serde_inline_default("websecure".to_string())]
    pub entrypoint: String,
    /// CNAME target published by external-dns for externally exposed hosts.
    pub dns_target: String,
}

#[serde_inline_default]
#[derive(Deserialize, Debug, Clone)]
pub struct Helm {
    #[serde_inline_default(true)]
    pub wait: bool,
    pub kubeconfig: Option<String>,
    pub kube_context: Option<String>,
}

impl Default for Helm {
    fn default() -> Self {
        Self {
            wait: true,
            kubeconfig: None,
            kube_context: None,
        }
    }
}

#[cfg(test)]
pub mod test {
    use super::File;

    #[test]
    pub fn load_default_configuration() {
        let cfg = File::default();
        assert_eq!(cfg.description, Some("Default configuration file".into()));
        assert_eq!(cfg.app, "brain");
        assert_eq!(cfg.secrets.host_key, "HOSTKEY");
        assert_eq!(cfg.persistence.production_path, "/tcdata/nfs/brain");
        assert_eq!(cfg.persistence.development_path, "/tcdata/nfs/dev-brain");
        assert_eq!(cfg.ssh.authorized_keys.len(), 1);
        assert!(cfg.helm.wait);
    }

    #[test]
    pub fn user_configuration_overrides_single_keys() {
        let cfg = File::default_with_user_config(
            r#"
domain = "example.org"

[persistence]
nfs_server = "nas.example.org"

[helm]
kube_context = "homelab"
"#,
        )
        .unwrap();

        assert_eq!(cfg.domain, "example.org");
        assert_eq!(cfg.persistence.nfs_server, "nas.example.org");
        // untouched keys in a merged table keep their defaults
        assert_eq!(cfg.persistence.production_path, "/tcdata/nfs/brain");
        assert_eq!(cfg.helm.kube_context.as_deref(), Some("homelab"));
        assert!(cfg.helm.wait);
        assert_eq!(cfg.app, "brain");
    }

    #[test]
    pub fn invalid_user_configuration() {
        assert!(File::default_with_user_config("app = [").is_err());
        assert!(File::default_with_user_config("app = 3").is_err());
    }
}
