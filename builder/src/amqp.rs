use async_trait::async_trait;
use buildlib::broadcast::BroadcastChannel;
use buildlib::config::BuildConfig;
use buildlib::errors::PublishError;
use buildlib::events::{LogChunk, StatusRecord};
use buildlib::instruction::RawInstruction;
use futures::{future, Stream, StreamExt};
use lapin::{
    message::Delivery,
    options::{
        BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions, QueueDeclareOptions,
    },
    types::{AMQPValue, FieldTable, LongString, ShortString},
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer, ExchangeKind,
};
use tracing::error;

pub const BUILDS_QUEUE: &str = "builds";
pub const CONSUMER_TAG: &str = "statikk.builder";

/// One connection and one channel, shared by the consumer and every publisher.
pub struct Broker {
    connection: Connection,
    channel: Channel,
}

impl Broker {
    pub async fn connect(url: &str) -> Result<Self, lapin::Error> {
        let connection = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        Ok(Self {
            connection,
            channel,
        })
    }

    /// Declare the build queue and the two fanout exchanges.
    pub async fn declare_topology(&self, config: &BuildConfig) -> Result<(), lapin::Error> {
        self.channel
            .queue_declare(
                BUILDS_QUEUE,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        for exchange in [&config.logs_topic, &config.status_topic] {
            self.channel
                .exchange_declare(
                    exchange,
                    ExchangeKind::Fanout,
                    ExchangeDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await?;
        }
        Ok(())
    }

    /// Deliveries are acknowledged by the broker as soon as they are sent.
    pub async fn consume(&self) -> Result<Consumer, lapin::Error> {
        self.channel
            .basic_consume(
                BUILDS_QUEUE,
                CONSUMER_TAG,
                BasicConsumeOptions {
                    no_ack: true,
                    no_local: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
    }

    pub fn publisher(&self) -> AmqpBroadcast {
        AmqpBroadcast {
            channel: self.channel.clone(),
        }
    }

    pub async fn close(&self) -> Result<(), lapin::Error> {
        self.connection.close(200, "build worker shutting down").await
    }
}

/// Turn deliveries into instructions; the stream ends at the first consumer error.
pub fn instructions(consumer: Consumer) -> impl Stream<Item = RawInstruction> {
    consumer
        .take_while(|delivery| {
            if let Err(err) = delivery {
                error!(error = %err, "the deliveries channel has failed");
            }
            future::ready(delivery.is_ok())
        })
        .filter_map(|delivery| future::ready(delivery.ok()))
        .map(|delivery| raw_instruction(&delivery))
}

fn raw_instruction(delivery: &Delivery) -> RawInstruction {
    let headers = delivery.properties.headers().as_ref();
    RawInstruction {
        delivery_tag: delivery.delivery_tag,
        action: header(headers, "action"),
        repository: header(headers, "repository"),
        repository_id: header(headers, "repository-id"),
    }
}

fn header(headers: Option<&FieldTable>, key: &str) -> Option<String> {
    match headers?.inner().get(&ShortString::from(key))? {
        AMQPValue::LongString(value) => Some(String::from_utf8_lossy(value.as_bytes()).into_owned()),
        AMQPValue::ShortString(value) => Some(value.as_str().to_string()),
        _ => None,
    }
}

fn log_headers(chunk: &LogChunk) -> FieldTable {
    let mut headers = FieldTable::default();
    headers.insert(
        "repository".into(),
        AMQPValue::LongString(LongString::from(chunk.job_id.as_str())),
    );
    headers
}

fn status_headers(record: &StatusRecord) -> FieldTable {
    let mut headers = FieldTable::default();
    headers.insert(
        "repository".into(),
        AMQPValue::LongString(LongString::from(record.job_id.as_str())),
    );
    headers.insert(
        "status".into(),
        AMQPValue::LongString(LongString::from(record.outcome.as_str())),
    );
    headers
}

#[derive(Clone)]
pub struct AmqpBroadcast {
    channel: Channel,
}

impl AmqpBroadcast {
    async fn publish(
        &self,
        exchange: &str,
        payload: &[u8],
        headers: FieldTable,
    ) -> Result<(), PublishError> {
        // the publisher confirm is not awaited
        self.channel
            .basic_publish(
                exchange,
                "",
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_headers(headers),
            )
            .await
            .map(|_confirm| ())
            .map_err(|err| PublishError {
                topic: exchange.to_string(),
                source: Box::new(err),
            })
    }
}

#[async_trait]
impl BroadcastChannel for AmqpBroadcast {
    async fn publish_log(&self, topic: &str, chunk: &LogChunk) -> Result<(), PublishError> {
        self.publish(topic, &chunk.payload, log_headers(chunk)).await
    }

    async fn publish_status(
        &self,
        topic: &str,
        record: &StatusRecord,
    ) -> Result<(), PublishError> {
        self.publish(topic, &[], status_headers(record)).await
    }
}
