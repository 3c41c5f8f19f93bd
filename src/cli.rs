use std::path::PathBuf;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use kafkanode::{
    ClientConfig, Compression, ConsumeRequest, KafkaNode, ProduceManyRequest, ProduceRequest,
    TopicSpec,
};
use serde_json::Value;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "kafkanode")]
pub struct Params {
    /// TOML client configuration.
    #[arg(long, env = "KAFKANODE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overrides the configured broker address.
    #[arg(long, env = "KAFKANODE_HOST")]
    pub host: Option<String>,

    #[arg(long, env = "KAFKANODE_NAME")]
    pub name: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List topics with their partitions.
    Topics,

    Create {
        topic: String,
        #[arg(long, default_value_t = 1)]
        partitions: u32,
        #[arg(long, default_value_t = 1)]
        replication_factor: u16,
        /// `name=value`, repeatable.
        #[arg(long = "config-entry", value_parser = parse_entry)]
        config_entries: Vec<(String, String)>,
    },

    /// Send one message. Valid JSON is sent as JSON, anything else as text.
    Produce {
        topic: String,
        message: String,
        #[arg(long, default_value_t = 0)]
        partition: u32,
        #[arg(long, value_enum, default_value_t = Compression::None)]
        compression: Compression,
    },

    /// Send all messages as a single batch envelope.
    ProduceMany {
        topic: String,
        #[arg(required = true)]
        messages: Vec<String>,
        #[arg(long, default_value_t = 0)]
        partition: u32,
        #[arg(long, value_enum, default_value_t = Compression::None)]
        compression: Compression,
    },

    /// Print records as JSON lines until interrupted.
    Consume {
        topic: String,
        #[arg(long)]
        group_id: Option<String>,
        #[arg(long, default_value_t = 0)]
        partition: u32,
        #[arg(long)]
        consumer_id: Option<String>,
    },
}

fn parse_entry(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got {:?}", raw))
}

fn parse_message(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub async fn run(params: Params) -> Result<()> {
    let mut config = ClientConfig::load_or_default(params.config.as_ref())?;
    if let Some(host) = params.host {
        config.host = host;
    }
    if let Some(name) = params.name {
        config.name = name;
    }

    let node = KafkaNode::wire(config);
    if !node.connect().await {
        bail!("could not connect to {}", node.config().host);
    }

    match params.command {
        Command::Topics => {
            let topics = node.list_topics().await?;
            for meta in topics.values() {
                println!("{}", serde_json::to_string(meta)?);
            }
        }
        Command::Create {
            topic,
            partitions,
            replication_factor,
            config_entries,
        } => {
            let spec = config_entries.into_iter().fold(
                TopicSpec::new(topic, partitions).replication_factor(replication_factor),
                |spec, (name, value)| spec.config_entry(name, value),
            );
            let created = node.create_topics(&[spec]).await?;
            if !created {
                warn!("topic already exists, nothing created");
            }
        }
        Command::Produce {
            topic,
            message,
            partition,
            compression,
        } => {
            let req = ProduceRequest::new(topic, parse_message(&message))
                .partition(partition)
                .compression(compression);
            let ack = node.produce_on_topic(req).await?;
            info!(partition = ack.partition, offset = ack.offset, "message acknowledged");
        }
        Command::ProduceMany {
            topic,
            messages,
            partition,
            compression,
        } => {
            let batch: Vec<Value> = messages.iter().map(|m| parse_message(m)).collect();
            let req = ProduceManyRequest::new(topic, batch)
                .partition(partition)
                .compression(compression);
            let ack = node.produce_many_on_topic(req).await?;
            info!(partition = ack.partition, offset = ack.offset, "batch acknowledged");
        }
        Command::Consume {
            topic,
            group_id,
            partition,
            consumer_id,
        } => consume(&node, topic, group_id, partition, consumer_id).await?,
    }
    Ok(())
}

async fn consume(
    node: &KafkaNode,
    topic: String,
    group_id: Option<String>,
    partition: u32,
    consumer_id: Option<String>,
) -> Result<()> {
    let mut req = ConsumeRequest::new(topic).partition(partition);
    req.group_id = group_id;
    req.consumer_id = consumer_id;

    let (sink, mut records) = node.delivery_channel();
    let registration = node.consume_on_topic(req, sink).await?;
    info!(consumer = %registration.id, "consuming, ctrl-c to stop");

    loop {
        tokio::select! {
            delivery = records.recv() => match delivery {
                Some(Ok(record)) => println!("{}", serde_json::to_string(&record)?),
                Some(Err(e)) => warn!(error = %e, "delivery failed"),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("listening for ctrl-c")?;
                break;
            }
        }
    }

    node.close_consumer(&registration.id).await;
    Ok(())
}
