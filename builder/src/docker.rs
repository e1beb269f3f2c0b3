use async_trait::async_trait;
use bollard::{
    container::LogOutput,
    errors::Error as DockerError,
    models::ContainerCreateBody,
    query_parameters::{
        CreateContainerOptionsBuilder, InspectContainerOptions, LogsOptionsBuilder,
        RemoveContainerOptionsBuilder, StartContainerOptions,
    },
    Docker,
};
use buildlib::errors::RuntimeError;
use buildlib::runtime::{ContainerRuntime, LogStream};
use buildlib::types::ContainerId;
use futures::StreamExt;

pub const BUILD_IMAGE: &str = "statikk:build";
pub const SOURCE_ENV: &str = "REPOSITORY";

/// What every build container is launched with.
#[derive(Clone, Debug)]
pub struct ContainerSpec {
    pub image: String,
    /// Name of the variable carrying the source location.
    pub source_env: String,
}

impl ContainerSpec {
    fn env(&self, source_ref: &str) -> Vec<String> {
        vec![format!("{}={}", self.source_env, source_ref)]
    }
}

impl Default for ContainerSpec {
    fn default() -> Self {
        Self {
            image: BUILD_IMAGE.to_string(),
            source_env: SOURCE_ENV.to_string(),
        }
    }
}

pub struct DockerRuntime {
    docker: Docker,
    spec: ContainerSpec,
}

impl DockerRuntime {
    /// Connect to the local daemon and make sure it answers.
    pub async fn connect(spec: ContainerSpec) -> Result<Self, DockerError> {
        let docker = Docker::connect_with_local_defaults()?;
        docker.ping().await?;
        Ok(Self { docker, spec })
    }
}

fn runtime_error(container: &str, err: DockerError) -> RuntimeError {
    match err {
        DockerError::DockerResponseServerError {
            status_code: 404, ..
        } => RuntimeError::NotFound(container.to_string()),
        err => RuntimeError::Daemon(Box::new(err)),
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create_and_start(
        &self,
        job_id: &str,
        source_ref: &str,
    ) -> Result<ContainerId, RuntimeError> {
        let options = CreateContainerOptionsBuilder::default().name(job_id).build();
        let config = ContainerCreateBody {
            image: Some(self.spec.image.clone()),
            env: Some(self.spec.env(source_ref)),
            ..Default::default()
        };
        let id = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|err| runtime_error(job_id, err))?
            .id;
        self.docker
            .start_container(&id, None::<StartContainerOptions>)
            .await
            .map_err(|err| runtime_error(&id, err))?;
        Ok(id)
    }

    async fn open_log_stream(&self, container: &str) -> Result<LogStream, RuntimeError> {
        // the logs request is only sent once polled, so check the container up front
        self.docker
            .inspect_container(container, None::<InspectContainerOptions>)
            .await
            .map_err(|err| runtime_error(container, err))?;

        let options = LogsOptionsBuilder::default()
            .follow(true)
            .stdout(true)
            .stderr(true)
            .timestamps(true)
            .build();
        let name = container.to_string();
        let stream = self.docker.logs(container, Some(options)).map(move |item| {
            item.map(LogOutput::into_bytes)
                .map_err(|err| runtime_error(&name, err))
        });
        Ok(Box::pin(stream))
    }

    async fn force_remove(&self, container: &str) -> Result<(), RuntimeError> {
        let options = RemoveContainerOptionsBuilder::default().force(true).build();
        self.docker
            .remove_container(container, Some(options))
            .await
            .map_err(|err| runtime_error(container, err))
    }
}
