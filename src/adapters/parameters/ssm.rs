use crate::adapters::parameters::ParameterStore;
use async_trait::async_trait;
use aws_sdk_ssm::Client;
use aws_sdk_ssm::operation::get_parameter::GetParameterError;

#[derive(Clone, Debug)]
pub struct SsmParameterStore {
    client: Client,
}

impl SsmParameterStore {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    /// Loads AWS configuration from the environment, overriding the region when given.
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config))
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    #[tracing::instrument(err, skip(self))]
    async fn get(&self, name: &str) -> anyhow::Result<Option<String>> {
        match self.client.get_parameter().name(name).with_decryption(true).send().await {
            Ok(output) => Ok(output.parameter().and_then(|p| p.value()).map(ToString::to_string)),
            Err(e) => match e.into_service_error() {
                GetParameterError::ParameterNotFound(_) => Ok(None),
                other => Err(anyhow::anyhow!("Cannot obtain SSM value for {name}: {other}")),
            },
        }
    }
}
