//! Keystone demo
//!
//! Builds a small Customer/Order model the way a mapping layer would:
//! conventions first, explicit configuration on top, then prints the
//! resolved snapshot as JSON.

use anyhow::{Context, Result};
use keystone_core::{BuilderConfig, ClrClass, ClrType, ConfigurationSource, DeleteBehavior, TypeRegistry};
use keystone_ir::ModelBuilder;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ConfigurationSource::*;

fn registry() -> TypeRegistry {
    TypeRegistry::new()
        .with_class(
            ClrClass::new("Customer")
                .scalar("Id", ClrType::Int32)
                .scalar("Name", ClrType::String)
                .collection("Orders", "Order"),
        )
        .with_class(
            ClrClass::new("Order")
                .scalar("Id", ClrType::Int32)
                .scalar("CustomerId", ClrType::nullable(ClrType::Int32))
                .scalar("Placed", ClrType::DateTime)
                .reference("Customer", "Customer"),
        )
        .with_class(ClrClass::new("RushOrder").with_base("Order"))
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => BuilderConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => BuilderConfig::default(),
    };

    let mut mb = ModelBuilder::with_config(registry(), config);

    // Conventions
    let customer = mb.entity("Customer", Convention).context("Customer rejected")?.id();
    let order = mb.entity("Order", Convention).context("Order rejected")?.id();
    mb.entity("RushOrder", Convention)
        .context("RushOrder rejected")?
        .has_base_type(Some(order), Convention)?;
    for entity in [customer, order] {
        mb.entity_type_builder(entity)
            .context("entity type vanished")?
            .primary_key(&["Id"], Convention)?;
    }
    let discovered = mb.discover_relationships(order)?;
    info!("Discovered {} relationship(s) from Order", discovered);

    // Explicit configuration wins over what conventions picked
    mb.entity_type_builder(order)
        .context("entity type vanished")?
        .has_one(customer, Some("Customer"))?
        .context("navigation rejected")?
        .with_many(Some("Orders"))?
        .context("inverse rejected")?
        .has_foreign_key(&["CustomerId"], Explicit)?
        .context("foreign key rejected")?
        .delete_behavior(DeleteBehavior::SetNull, Explicit)
        .context("delete behavior rejected")?;

    mb.entity_type_builder(customer)
        .context("entity type vanished")?
        .property("Name", None, Explicit)?
        .context("property rejected")?
        .has_max_length(200, Explicit)
        .context("max length rejected")?;

    let snapshot = mb.snapshot()?;
    info!(
        "Model has {} entity type(s), snapshot {}",
        snapshot.entity_types.len(),
        snapshot.id
    );
    println!("{}", snapshot.to_json()?);

    Ok(())
}
