mod amqp;
mod arg_parser;
mod docker;
mod error;

use amqp::Broker;
use arg_parser::{redact, ArgParser};
use buildlib::config::BuildConfig;
use buildlib::{Dispatcher, JobCoordinator};
use clap::Parser;
use docker::DockerRuntime;
use error::WorkerError;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), WorkerError> {
    let args = ArgParser::parse();
    init_tracing();
    info!(amqp_url = %redact(&args.amqp_url), image = %args.image, "starting build worker");

    let config = BuildConfig::default();
    let runtime = DockerRuntime::connect(args.container_spec())
        .await
        .map_err(|err| WorkerError::connectivity("the Docker host", err))?;
    let broker = Broker::connect(&args.amqp_url)
        .await
        .map_err(|err| WorkerError::connectivity("the RabbitMQ server", err))?;
    broker
        .declare_topology(&config)
        .await
        .map_err(|err| WorkerError::connectivity("the RabbitMQ server", err))?;
    let consumer = broker
        .consume()
        .await
        .map_err(|err| WorkerError::connectivity("the RabbitMQ server", err))?;
    info!("successfully connected to the RabbitMQ server");

    let coordinator =
        JobCoordinator::spawn(Arc::new(runtime), Arc::new(broker.publisher()), config);
    let dispatcher = Dispatcher::new(coordinator.clone());
    let dispatched = dispatcher.run(amqp::instructions(consumer)).await;

    info!("waiting for in-flight builds to finish");
    if let Err(err) = coordinator.shutdown().await {
        error!(error = %err, "cannot drain the job coordinator");
    }
    if let Err(err) = broker.close().await {
        warn!(error = %err, "cannot close the RabbitMQ connection");
    }
    dispatched?;

    error!("the RabbitMQ connection has been closed");
    Err(WorkerError::SourceClosed)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
