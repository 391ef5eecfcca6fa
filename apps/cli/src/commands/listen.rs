use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use krs_amqp::AmqpTransport;
use krs_core::{
    AdminEvent, BusHandler, EventBus, EventListener, GroupCache, GroupCacheConfig,
    GroupCacheInvalidator, Invalidation, ListenerConfig, DEFAULT_AMQP_ADDRESS, DEFAULT_EXCHANGE,
    DEFAULT_PREFETCH_COUNT, DEFAULT_ROUTING_KEY,
};

use super::{keycloak, print_json};

#[derive(Args)]
pub struct ListenArgs {
    /// RabbitMQ address
    #[arg(long, env = "RABBITMQ_ADDRESS", default_value = DEFAULT_AMQP_ADDRESS)]
    address: String,

    /// RabbitMQ exchange
    #[arg(long, default_value = DEFAULT_EXCHANGE)]
    exchange: String,

    /// RabbitMQ routing key
    #[arg(long, default_value = DEFAULT_ROUTING_KEY)]
    routing_key: String,

    /// Message buffer (prefetch) count
    #[arg(long, default_value_t = DEFAULT_PREFETCH_COUNT)]
    message_count: u16,

    /// Dedup window in seconds (default: disabled)
    #[arg(long)]
    dedup: Option<u64>,

    /// Group path whose members are reprinted whenever an event changes them
    /// (repeatable; members are read through the group cache)
    #[arg(long = "watch-group", value_name = "PATH")]
    watch_groups: Vec<String>,

    /// Base group cache TTL in seconds
    #[arg(long, default_value_t = 3600)]
    cache_ttl: u64,
}

/// Group members read through a cache kept fresh by the event stream
struct GroupWatch {
    cache: Arc<GroupCache>,
    invalidator: GroupCacheInvalidator,
    paths: Vec<String>,
}

impl GroupWatch {
    fn new(paths: Vec<String>, cache_ttl: Duration) -> Result<Self> {
        let directory = Arc::new(keycloak()?);
        let cache = Arc::new(GroupCache::new(
            directory,
            GroupCacheConfig::from_base_ttl(cache_ttl),
        ));
        Ok(Self {
            invalidator: GroupCacheInvalidator::new(cache.clone()),
            cache,
            paths,
        })
    }

    async fn print_members(&self) {
        for path in &self.paths {
            match self.cache.get_members(path).await {
                Ok(members) => {
                    if let Err(e) = print_json(&json!({ "group": path, "members": &*members })) {
                        warn!(error = %e, "[krs] Failed to render group members");
                    }
                }
                Err(e) => warn!(group = %path, error = %e, "[krs] Failed to read group members"),
            }
        }
    }

    /// Invalidate what the event touched, then reprint if anything changed
    async fn on_event(&self, event: &AdminEvent) {
        if self.invalidator.apply(event) != Invalidation::None {
            self.print_members().await;
        }
    }
}

pub async fn run(args: ListenArgs) -> Result<()> {
    let mut config = ListenerConfig::default()
        .with_address(args.address)
        .with_exchange(args.exchange)
        .with_routing_key(args.routing_key)
        .with_prefetch_count(args.message_count);
    if let Some(seconds) = args.dedup {
        config = config.with_dedup_secs(seconds);
    }

    let watch = if args.watch_groups.is_empty() {
        None
    } else {
        let watch = GroupWatch::new(args.watch_groups, Duration::from_secs(args.cache_ttl))?;
        watch.print_members().await;
        Some(watch)
    };

    let bus = EventBus::new();
    let mut events = bus.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string_pretty(&event) {
                Ok(rendered) => println!("{rendered}"),
                Err(e) => warn!(error = %e, "[krs] Failed to render event"),
            }
            if let Some(watch) = &watch {
                watch.on_event(&event).await;
            }
        }
        if let Some(watch) = &watch {
            info!(stats = ?watch.cache.stats(), "[krs] Group cache");
        }
    });

    let transport = Arc::new(AmqpTransport::new(config.address.clone()));
    let listener = EventListener::new(config, transport, Arc::new(BusHandler::new(bus.sender())));
    listener
        .start()
        .await
        .context("Failed to start event listener")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for Ctrl-C")?;
    info!("[krs] Interrupted, shutting down");

    listener.stop().await;
    drop(listener);
    drop(bus);
    printer.await.ok();
    Ok(())
}
