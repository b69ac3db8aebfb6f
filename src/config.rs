use anyhow::{Context, Result};

/// Service settings, read once at startup and passed down by reference.
/// Request handlers never look at the environment themselves.
#[derive(Debug, Clone)]
pub struct AppSettings {
    /// Port the service API listens on.
    pub svc_api_port: u16,
    /// URI of the model artifact to load at startup.
    pub model_uri: String,
}

impl AppSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let svc_api_port = match lookup("SVC_API_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("SVC_API_PORT is not a valid port: {raw:?}"))?,
            None => 8080,
        };
        let model_uri = lookup("MODEL_URI").context("MODEL_URI not set")?;
        Ok(Self {
            svc_api_port,
            model_uri,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn port_defaults_to_8080() {
        let settings = AppSettings::from_lookup(vars(&[("MODEL_URI", "model.json")])).unwrap();
        assert_eq!(settings.svc_api_port, 8080);
        assert_eq!(settings.model_uri, "model.json");
    }

    #[test]
    fn explicit_port_is_used() {
        let settings = AppSettings::from_lookup(vars(&[
            ("SVC_API_PORT", "9000"),
            ("MODEL_URI", "file:///models/m.json"),
        ]))
        .unwrap();
        assert_eq!(settings.svc_api_port, 9000);
    }

    #[test]
    fn missing_model_uri_is_an_error() {
        let err = AppSettings::from_lookup(vars(&[])).unwrap_err();
        assert!(err.to_string().contains("MODEL_URI"));
    }

    #[test]
    fn garbage_port_is_an_error() {
        let err = AppSettings::from_lookup(vars(&[
            ("SVC_API_PORT", "not-a-port"),
            ("MODEL_URI", "model.json"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SVC_API_PORT"));
    }
}
