//! Credentials and regional endpoints

use std::fmt;

/// Access key pair used to sign requests
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// A service region, identified by its EC2 endpoint
///
/// The queue service lives next to EC2 in every region, so its endpoint is
/// derived from the EC2 one rather than configured separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub name: String,
    pub ec2_endpoint: String,
}

const KNOWN_REGIONS: &[(&str, &str)] = &[
    ("us-east-1", "https://ec2.us-east-1.amazonaws.com"),
    ("us-west-1", "https://ec2.us-west-1.amazonaws.com"),
    ("us-west-2", "https://ec2.us-west-2.amazonaws.com"),
    ("eu-west-1", "https://ec2.eu-west-1.amazonaws.com"),
    ("ap-southeast-1", "https://ec2.ap-southeast-1.amazonaws.com"),
    ("ap-southeast-2", "https://ec2.ap-southeast-2.amazonaws.com"),
    ("ap-northeast-1", "https://ec2.ap-northeast-1.amazonaws.com"),
    ("sa-east-1", "https://ec2.sa-east-1.amazonaws.com"),
];

impl Region {
    pub fn new(name: impl Into<String>, ec2_endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ec2_endpoint: ec2_endpoint.into(),
        }
    }

    /// Look up a well-known region by name
    pub fn from_name(name: &str) -> Option<Self> {
        KNOWN_REGIONS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(n, endpoint)| Self::new(*n, *endpoint))
    }

    /// All well-known regions
    pub fn known() -> impl Iterator<Item = Region> {
        KNOWN_REGIONS
            .iter()
            .map(|(n, endpoint)| Self::new(*n, *endpoint))
    }

    /// Queue service endpoint: the first `ec2` token becomes `sqs`
    pub fn sqs_endpoint(&self) -> String {
        self.ec2_endpoint.replacen("ec2", "sqs", 1)
    }
}
