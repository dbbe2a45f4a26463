use realtime_sync::lifecycle::setup_tracing;
use realtime_sync::model::{Identity, Role};
use realtime_sync::registry::topic;
use realtime_sync::{RealtimeConfig, RealtimeSystem};
use tracing::{info, info_span, warn, Instrument};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();

    let mut args = std::env::args().skip(1);
    let user_id = args.next().unwrap_or_else(|| "demo_user".to_string());
    let role: Role = args.next().as_deref().unwrap_or("customer").parse()?;
    let config = RealtimeConfig::from_env();

    async {
        let system = RealtimeSystem::websocket(&config, Identity::new(user_id, role));

        let _connection = system.subscribe(topic::CONNECTION, |event| {
            info!(%event, "Connection event");
            Ok(())
        });
        let _failed = system.subscribe(topic::CONNECTION_FAILED, |event| {
            warn!(%event, "Offline until reconnect");
            Ok(())
        });
        let _orders = system.subscribe("order_update", |data| {
            info!(order_id = ?data.get("orderId"), status = ?data.get("status"), "Order update");
            Ok(())
        });

        info!("Running, press Ctrl-C to stop");
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Could not listen for Ctrl-C");
        }

        system.shutdown().await
    }
    .instrument(info_span!("realtime"))
    .await?;

    Ok(())
}
