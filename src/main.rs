/// slotkit installer
///
/// Opens the configured database and installs the slot relation for every host
/// table listed in SLOTKIT_HOSTS. Safe to run repeatedly.

use slotkit::{config::Config, SlotManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    // Load configuration (defaults to data/slots.db and the "slot" table)
    let config = Config::default();
    let manager = SlotManager::connect(&config).await?;

    if config.slots.hosts.is_empty() {
        tracing::warn!("No host tables configured, set SLOTKIT_HOSTS=post,page to install relations");
    }

    for host in &config.slots.hosts {
        let relation = manager.schema().install_table(host, "id").await?;
        tracing::info!("✅ {} slots available via {}", relation.host_table, relation.ref_table);
    }

    Ok(())
}
