//! Subcommand implementations

use anyhow::{anyhow, Context, Result};
use knocki::{Event, KnockiClient, KnockiConfig, Trigger};
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::{info, warn};

/// Build a client, logging in with configured credentials when no token is set
async fn authenticated_client(config: &KnockiConfig) -> Result<KnockiClient> {
    let client = KnockiClient::from_config(config)?;
    if client.token().is_some() {
        return Ok(client);
    }

    let (email, password) = config
        .credentials()
        .ok_or_else(|| anyhow!("no token configured; set `token` or `email` and `password`"))?;
    client
        .login(email, password)
        .await
        .context("logging in to Knocki")?;
    Ok(client)
}

pub async fn login(
    config: &KnockiConfig,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let email = email
        .or_else(|| config.email.clone())
        .ok_or_else(|| anyhow!("no email given; pass --email or set `email`"))?;
    let password = password
        .or_else(|| config.password.clone())
        .ok_or_else(|| anyhow!("no password given; pass --password or set `password`"))?;

    let client = KnockiClient::from_config(config)?;
    let token = client
        .login(&email, &password)
        .await
        .context("logging in to Knocki")?;

    println!("token: {}", token.token);
    println!("user_id: {}", token.user_id);
    Ok(())
}

pub async fn link(config: &KnockiConfig) -> Result<()> {
    authenticated_client(config).await?.link().await?;
    info!("Linked Home Assistant integration");
    Ok(())
}

pub async fn unlink(config: &KnockiConfig) -> Result<()> {
    authenticated_client(config).await?.unlink().await?;
    info!("Unlinked Home Assistant integration");
    Ok(())
}

pub async fn triggers(config: &KnockiConfig) -> Result<()> {
    let triggers = authenticated_client(config).await?.get_triggers().await?;
    if triggers.is_empty() {
        println!("no triggers configured");
    }
    for trigger in &triggers {
        println!("{}", format_trigger(trigger));
    }
    Ok(())
}

pub async fn listen(config: &KnockiConfig) -> Result<()> {
    let client = authenticated_client(config).await?;
    let mut events = client.subscribe_all();

    let mut listener = tokio::spawn({
        let client = client.clone();
        async move { client.start_websocket().await }
    });

    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    let result = loop {
        tokio::select! {
            signal = &mut interrupted => {
                signal?;
                info!("Interrupted, closing websocket");
                client.close();
                break (&mut listener).await?;
            }
            joined = &mut listener => break joined?,
            received = events.recv() => match received {
                Ok(event) => println!("{}", format_event(&event)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Printing fell behind, events dropped");
                }
                Err(RecvError::Closed) => break (&mut listener).await?,
            },
        }
    };

    for line in drain_events(&mut events) {
        println!("{}", line);
    }
    result?;
    Ok(())
}

/// Format the events still queued on `events`, skipping over any lag
fn drain_events(events: &mut broadcast::Receiver<Event>) -> Vec<String> {
    let mut lines = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => lines.push(format_event(&event)),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "Printing fell behind, events dropped");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => return lines,
        }
    }
}

fn format_trigger(trigger: &Trigger) -> String {
    format!(
        "{}\t{}\t{}",
        trigger.device_id, trigger.details.trigger_id, trigger.details.name
    )
}

fn format_event(event: &Event) -> String {
    format!("{}\t{}", event.event, format_trigger(&event.payload))
}
