use anyhow::Context;
use tracing::{info, warn, Instrument};

use deposit_desk::app_system::{setup_tracing, watch_order, DepositSystem};
use deposit_desk::config::Config;
use deposit_desk::domain::{progress, Actor, NewMessage, OrderCreate, Role};
use deposit_desk::user_actor::UserError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup tracing once for the entire application
    setup_tracing();

    let config = Config::from_env().context("loading configuration")?;
    info!(?config, "Starting deposit desk");

    let system = DepositSystem::start(&config).context("opening storage")?;

    // Seed the three parties
    let span = tracing::info_span!("user_setup");
    let (agent, renter, landlord) = async {
        let agent = system.user_client.login_or_create("agent@desk.example", Role::Agent).await?;
        let renter = system.user_client.register("renter@desk.example", Role::Renter, Some("Rita Renter")).await;
        let renter = match renter {
            Ok(user) => user,
            // Already registered by an earlier run against the same data dir.
            Err(UserError::AlreadyExists(_)) => {
                system.user_client.login_or_create("renter@desk.example", Role::Renter).await?
            }
            Err(e) => return Err(anyhow::Error::from(e)),
        };
        let landlord = system.user_client.login_or_create("landlord@desk.example", Role::Landlord).await?;
        anyhow::Ok((agent, renter, landlord))
    }
    .instrument(span)
    .await?;
    info!(agent = %agent.name, renter = %renter.name, landlord = %landlord.name, "Users ready");

    // Create the order; this flows through the user, order and chat actors
    let span = tracing::info_span!("order_processing");
    let order = async {
        system
            .order_client
            .create_order(OrderCreate {
                title: "Flat 3B deposit".to_string(),
                renter_email: renter.email.clone(),
                landlord_email: landlord.email.clone(),
                property_address: "12 Harbour Street".to_string(),
                deposit_amount: 1500.0,
                description: Some("Twelve month lease".to_string()),
                created_by: agent.email.clone(),
            })
            .await
    }
    .instrument(span)
    .await?;
    info!(order_id = %order.id, progress = progress::progress_percentage(&order), "Order created");

    // Follow the order the way a dashboard would, at the configured poll interval
    let (mut updates, watcher) =
        watch_order(system.order_client.clone(), order.id.clone(), config.poll_interval()).await?;
    let watch_log = tokio::spawn(
        async move {
            while updates.changed().await.is_ok() {
                let seen = updates.borrow_and_update().clone();
                info!(
                    status = %seen.status,
                    progress = progress::progress_percentage(&seen),
                    "Watcher saw an update"
                );
            }
            info!("Watcher stopped");
        }
        .instrument(tracing::info_span!("order_watch_log")),
    );

    // A landlord cannot jump ahead of the renter
    if let Err(e) = system.order_client.approve_as(order.id.clone(), landlord.actor()).await {
        warn!(error = %e, "Early landlord approval rejected as expected");
    }

    let order = system.order_client.approve_as(order.id.clone(), renter.actor()).await?;
    info!(progress = progress::progress_percentage(&order), status = %order.status, "Renter approved");

    let order = system.order_client.approve_as(order.id.clone(), landlord.actor()).await?;
    info!(progress = progress::progress_percentage(&order), status = %order.status, "Landlord approved");

    let order = system
        .order_client
        .finalize_order(order.id.clone(), Actor::agent(agent.email.clone()))
        .await?;
    info!(progress = progress::progress_percentage(&order), status = %order.status, "Order finalized");

    // Chat between the parties
    system
        .chat_client
        .post_message(
            order.id.clone(),
            NewMessage {
                sender_email: renter.email.clone(),
                sender_role: Role::Renter,
                sender_name: renter.name.clone(),
                text: "Thanks, keys returned.".to_string(),
            },
        )
        .await?;
    let rooms = system.order_client.chat_rooms_for_user(&landlord.email).await?;
    info!(rooms = rooms.len(), "Landlord chat rooms");

    for stage in &order.progress_stages {
        info!(
            stage = %stage.stage,
            completed = stage.completed,
            by = stage.completed_by.as_deref().unwrap_or("-"),
            "{}",
            stage.title
        );
    }

    system.order_client.delete_order(order.id.clone(), &agent.email).await?;
    info!(order_id = %order.id, "Order deleted");

    // The watcher notices the delete on its next poll and lets go of its client
    watcher.await.context("order watcher")?;
    watch_log.await.context("watcher log")?;

    // Shutdown system gracefully
    system.shutdown().await.map_err(anyhow::Error::msg)?;

    info!("Application completed successfully");
    Ok(())
}
