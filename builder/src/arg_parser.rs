use crate::docker::{ContainerSpec, BUILD_IMAGE};
use clap::Parser;

/// Run container builds requested over AMQP
#[derive(Debug, Parser)]
pub struct ArgParser {
    /// Connection string of the AMQP broker
    #[clap(long = "amqp-url", env = "AMQP_CONNECTION_URL")]
    pub amqp_url: String,
    /// Image every build container runs
    #[clap(long, env = "BUILD_IMAGE", default_value = BUILD_IMAGE)]
    pub image: String,
}

impl ArgParser {
    pub fn container_spec(&self) -> ContainerSpec {
        ContainerSpec {
            image: self.image.clone(),
            ..ContainerSpec::default()
        }
    }
}

/// Mask the password of a connection string before it is logged.
pub fn redact(url: &str) -> String {
    let authority = match url.find("://") {
        Some(idx) => idx + 3,
        None => return url.to_string(),
    };
    let at = match url[authority..].find('@') {
        Some(idx) => authority + idx,
        None => return url.to_string(),
    };
    match url[authority..at].find(':') {
        Some(idx) => format!("{}:***{}", &url[..authority + idx], &url[at..]),
        None => url.to_string(),
    }
}
