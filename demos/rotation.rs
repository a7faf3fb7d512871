//! # Demo: rotation
//!
//! A long-lived owner keeps asking a host for confirmation while the host is
//! destroyed and recreated (think screen rotation). Questions asked while no
//! host is alive wait in the identity's queue and are answered by the next one.
//!
//! ## Flow
//! ```text
//! Owner ──ask──► Survey queue (RetainedId) ──► host #1 (destroyed mid-question)
//!                      │
//!                      └──── retry same question ──► host #2 ──► answer
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example rotation --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use handover::{
    Config, DeliveryMode, Lifecycle, LifecycleState, LogWriter, Owner, RetainedId, Subscribe,
};
use tracing_subscriber::EnvFilter;

fn bind_host(
    survey: &handover::Survey<String, bool>,
    id: &RetainedId,
    name: &'static str,
    delay: Duration,
) -> Lifecycle {
    let host = Lifecycle::new();
    survey.bind(id, &host, DeliveryMode::All, move |question| async move {
        tokio::time::sleep(delay).await;
        tracing::info!(host = name, %question, "answering");
        true
    });
    host
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let owner = Owner::builder(Config::default())
        .with_label("settings")
        .with_subscribers(subs)
        .build();
    let confirm = owner.survey::<String, bool>();
    let id = RetainedId::new();

    let first = bind_host(&confirm, &id, "first", Duration::from_secs(5));
    first.move_to(LifecycleState::Resumed);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let answers = owner.ask(&confirm, "discard draft?".to_string())?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    tracing::info!("rotating");
    first.destroy();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let second = bind_host(&confirm, &id, "second", Duration::from_millis(100));
    second.move_to(LifecycleState::Resumed);

    match answers.single().await {
        Some(answer) => tracing::info!(answer, "confirmed"),
        None => anyhow::bail!("question was lost"),
    }

    owner.clear();
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
