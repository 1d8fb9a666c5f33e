use std::collections::BTreeMap;
use serde::Serialize;
use crate::config::file;
use crate::environment::Exposure;

pub type Annotations = BTreeMap<String, String>;

pub const CLUSTER_ISSUER: &str = "cert-manager.io/cluster-issuer";
pub const ROUTER_ENTRYPOINTS: &str = "traefik.ingress.kubernetes.io/router.entrypoints";
pub const EXTERNAL_DNS_HOSTNAME: &str = "external-dns.alpha.kubernetes.io/hostname";
pub const EXTERNAL_DNS_TARGET: &str = "external-dns.alpha.kubernetes.io/target";
pub const CLOUDFLARE_PROXIED: &str = "external-dns.alpha.kubernetes.io/cloudflare-proxied";
pub const PFSENSE_DNS_ENABLED: &str = "dns.pfsense.org/enabled";

/// Annotations for a route published to the internet through external-dns and Cloudflare.
pub fn external_annotations(settings: &file::Ingress, hostname: &str) -> Annotations {
    Annotations::from([
        (CLUSTER_ISSUER.to_string(), settings.external_cluster_issuer.clone()),
        (ROUTER_ENTRYPOINTS.to_string(), settings.entrypoint.clone()),
        (EXTERNAL_DNS_HOSTNAME.to_string(), hostname.to_string()),
        (EXTERNAL_DNS_TARGET.to_string(), settings.dns_target.clone()),
        (CLOUDFLARE_PROXIED.to_string(), "true".to_string()),
    ])
}

/// Annotations for a route only reachable from the internal network.
pub fn internal_annotations(settings: &file::Ingress) -> Annotations {
    Annotations::from([
        (CLUSTER_ISSUER.to_string(), settings.internal_cluster_issuer.clone()),
        (ROUTER_ENTRYPOINTS.to_string(), settings.entrypoint.clone()),
    ])
}

pub fn annotations_for(exposure: Exposure, settings: &file::Ingress, hostname: &str) -> Annotations {
    match exposure {
        Exposure::External => external_annotations(settings, hostname),
        Exposure::Internal => internal_annotations(settings),
    }
}

/// Annotations for the web ingress, which also routes the management hostname.
pub fn http_annotations(exposure: Exposure, settings: &file::Ingress, hostname: &str) -> Annotations {
    let mut annotations = annotations_for(exposure, settings, hostname);
    if exposure == Exposure::External {
        // Resolve straight to the load balancer IP inside the LAN to avoid NAT reflection.
        annotations.insert(PFSENSE_DNS_ENABLED.to_string(), "true".to_string());
    }
    annotations
}

/// Annotations for the raw SSH ingress. Internal environments need none.
pub fn ssh_annotations(exposure: Exposure, settings: &file::Ingress, hostname: &str) -> Annotations {
    match exposure {
        Exposure::External => {
            let mut annotations = external_annotations(settings, hostname);
            // Cloudflare terminates TLS on proxied hosts, which breaks SSH.
            annotations.insert(CLOUDFLARE_PROXIED.to_string(), "false".to_string());
            // No TLS termination here, and SSH uses its own entrypoint.
            annotations.remove(CLUSTER_ISSUER);
            annotations.remove(ROUTER_ENTRYPOINTS);
            annotations
        }
        Exposure::Internal => Annotations::new(),
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Path {
    pub path: String,
    pub path_type: String,
}

impl Path {
    pub fn root() -> Self {
        Self {
            path: "/".to_string(),
            path_type: "ImplementationSpecific".to_string(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Host {
    pub host: String,
    pub paths: Vec<Path>,
}

impl Host {
    pub fn root(host: &str) -> Self {
        Self {
            host: host.to_string(),
            paths: vec![Path::root()],
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tls {
    pub hosts: Vec<String>,
    pub secret_name: String,
}

impl Tls {
    /// Certificate for `hostname`, stored by cert-manager in `<hostname>-cert`.
    pub fn for_host(hostname: &str) -> Self {
        Self {
            hosts: vec![hostname.to_string()],
            secret_name: format!("{hostname}-cert"),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HttpIngress {
    pub annotations: Annotations,
    pub hosts: Vec<Host>,
    pub tls: Vec<Tls>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SshIngress {
    pub annotations: Annotations,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Ingress {
    pub http: HttpIngress,
    pub ssh: SshIngress,
}

impl Ingress {
    pub fn new(exposure: Exposure, settings: &file::Ingress, http_hostname: &str, ssh_hostname: &str) -> Self {
        Self {
            http: HttpIngress {
                annotations: http_annotations(exposure, settings, http_hostname),
                hosts: vec![Host::root(http_hostname), Host::root(ssh_hostname)],
                tls: vec![Tls::for_host(http_hostname)],
            },
            ssh: SshIngress {
                annotations: ssh_annotations(exposure, settings, ssh_hostname),
            },
        }
    }
}
