use std::collections::HashMap;
use std::time::Duration;
use log::debug;
use thiserror::Error;

const DOPPLER_TOKEN_VARIABLE: &str = "DOPPLER_TOKEN";

#[derive(Error, Debug)]
pub enum Error {
    #[error("DOPPLER_TOKEN is not set")]
    MissingToken,

    #[error("reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("code: {0}, body: {1}")]
    Response(u16, String),

    #[error("secret {key} not found in {project}/{config}")]
    MissingSecret {
        key: String,
        project: String,
        config: String,
    },
}

/// Secrets downloaded from one Doppler project config.
#[derive(Debug)]
pub struct Secrets {
    pub project: String,
    pub config: String,
    pub map: HashMap<String, String>,
}

impl Secrets {
    pub fn get(&self, key: &str) -> Result<&str, Error> {
        self.map
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| Error::MissingSecret {
                key: key.to_string(),
                project: self.project.clone(),
                config: self.config.clone(),
            })
    }
}

pub struct Client {
    api_url: String,
    token: String,
}

impl Client {
    pub fn new(api_url: &str, token: String) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn try_new_from_env(api_url: &str) -> Result<Self, Error> {
        std::env::var(DOPPLER_TOKEN_VARIABLE)
            .ok()
            .filter(|token| !token.is_empty())
            .map(|token| Self::new(api_url, token))
            .ok_or(Error::MissingToken)
    }

    /// Download every secret in `project`/`config` as a flat name to value map.
    pub async fn get_secrets(&self, project: &str, config: &str) -> Result<Secrets, Error> {
        debug!("Downloading secrets for Doppler project {project}, config {config}");
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        let resp = client
            .get(format!("{}/v3/configs/config/secrets/download", self.api_url))
            .bearer_auth(&self.token)
            .query(&[("project", project), ("config", config), ("format", "json")])
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;

        Ok(Secrets {
            project: project.to_string(),
            config: config.to_string(),
            map: decode(status.as_u16(), status.is_success(), &bytes)?,
        })
    }
}

fn decode(status: u16, success: bool, bytes: &[u8]) -> Result<HashMap<String, String>, Error> {
    match serde_json::from_slice(bytes) {
        Ok(map) if success => Ok(map),
        _ => {
            let body = String::from_utf8_lossy(bytes);
            Err(Error::Response(status, body.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_download_response() {
        let map = decode(200, true, br#"{"HOSTKEY":"private","DOPPLER_CONFIG":"prod"}"#).unwrap();
        assert_eq!(map["HOSTKEY"], "private");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn decode_error_response() {
        let body = br#"{"messages":["Invalid Auth token"],"success":false}"#;
        match decode(401, false, body) {
            Err(Error::Response(401, message)) => assert!(message.contains("Invalid Auth token")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(decode(200, true, b"not json"), Err(Error::Response(200, _))));
    }

    #[test]
    fn missing_secret() {
        let secrets = Secrets {
            project: "brain".into(),
            config: "dev".into(),
            map: HashMap::from([("HOSTKEY".to_string(), "private".to_string())]),
        };
        assert_eq!(secrets.get("HOSTKEY").unwrap(), "private");
        let err = secrets.get("OTHER").unwrap_err();
        assert_eq!(err.to_string(), "secret OTHER not found in brain/dev");
    }

    #[test]
    fn api_url_trailing_slash() {
        let client = Client::new("https://api.doppler.com/", "token".into());
        assert_eq!(client.api_url, "https://api.doppler.com");
    }
}
