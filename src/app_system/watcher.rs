use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::clients::OrderClient;
use crate::domain::Order;
use crate::order_actor::OrderError;

/// Polls one order every `interval` and publishes it whenever it changed.
///
/// The receiver starts with the current order. The task stops once every
/// receiver is dropped, the order is deleted (receivers then see the sender
/// closed), or the order actor goes away. Values may be up to one interval stale.
pub async fn watch_order(
    client: OrderClient,
    id: String,
    interval: Duration,
) -> Result<(watch::Receiver<Order>, JoinHandle<()>), OrderError> {
    let initial = client
        .get_order(id.clone())
        .await?
        .ok_or_else(|| OrderError::NotFound(id.clone()))?;
    let (tx, rx) = watch::channel(initial);

    let span = info_span!("order_watch", order_id = %id);
    let handle = tokio::spawn(
        async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately and the initial value is already sent.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = tx.closed() => {
                        debug!("No receivers left");
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                match client.get_order(id.clone()).await {
                    Ok(Some(order)) => {
                        let changed = tx.send_if_modified(|current| {
                            if current.updated_at != order.updated_at || current.status != order.status {
                                *current = order;
                                true
                            } else {
                                false
                            }
                        });
                        if changed {
                            debug!("Published new order state");
                        }
                    }
                    Ok(None) => {
                        info!("Order deleted, stopping watch");
                        break;
                    }
                    Err(OrderError::ActorCommunicationError(e)) => {
                        warn!(error = %e, "Order actor unavailable, stopping watch");
                        break;
                    }
                    Err(e) => warn!(error = %e, "Poll failed, retrying next tick"),
                }
            }
        }
        .instrument(span),
    );

    Ok((rx, handle))
}
