//! Demonstrates optimistic concurrency on the commit log and snapshot store.
//!
//! Every write states the version it last observed. When another writer got
//! there first the write is rejected with a conflict that carries the version
//! actually found, and the caller decides whether to reload and retry.
//!
//! Run with: `RUST_LOG=optimistic_concurrency=info,vellum_core=debug cargo run --example optimistic_concurrency`

use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt as _;
use tracing_subscriber::EnvFilter;
use vellum::{
    AdminAccess, AppendError, DomainEvent, Event, EventStore, JsonCodec,
    snapshot::{self, StateError, StateType, read_state, write_state},
    store::inmemory,
};

// =============================================================================
// Domain Events
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReserved {
    pub quantity: u32,
}

impl DomainEvent for ItemReserved {
    const KIND: &'static str = "inventory.item.reserved";
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRestocked {
    pub quantity: u32,
}

impl DomainEvent for ItemRestocked {
    const KIND: &'static str = "inventory.item.restocked";
}

// =============================================================================
// Materialised state
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub available: u32,
}

impl StateType for Stock {
    const TYPE_ID: &'static str = "inventory.stock";
}

type Store = EventStore<inmemory::Store<()>>;

/// Replay a stream into `Stock`, returning the state and the version it
/// reflects.
async fn load(
    store: &Store,
    stream: &str,
) -> Result<(Stock, Option<u64>), Box<dyn std::error::Error>> {
    let mut stock = Stock::default();
    let mut version = None;
    let mut events = store.read_stream(stream);
    while let Some(event) = events.next().await {
        let event = event?;
        match event.kind() {
            ItemRestocked::KIND => stock.available += event.decode::<ItemRestocked>()?.quantity,
            ItemReserved::KIND => {
                stock.available = stock
                    .available
                    .saturating_sub(event.decode::<ItemReserved>()?.quantity);
            }
            _ => {}
        }
        version = Some(event.version);
    }
    Ok((stock, version))
}

// =============================================================================
// Example Parts
// =============================================================================

/// Part 1: Appending with an expected version.
#[tracing::instrument(skip(store))]
async fn part1_basic_usage(store: &Store) -> Result<(), Box<dyn std::error::Error>> {
    println!("PART 1: Appending with an expected version\n");

    println!("1. Restocking SKU-001 with 100 units...");
    let committed = store
        .append(
            "SKU-001",
            None,
            vec![Event::encode(&ItemRestocked { quantity: 100 }, ())?],
        )
        .await?;
    println!("   Committed: {committed:?}");

    let (stock, version) = load(store, "SKU-001").await?;
    println!("2. Reserving 30 units at version {version:?}...");
    store
        .append(
            "SKU-001",
            version,
            vec![Event::encode(&ItemReserved { quantity: 30 }, ())?],
        )
        .await?;

    let (stock_after, version) = load(store, "SKU-001").await?;
    println!(
        "   Available: {} -> {} (version {version:?})\n",
        stock.available, stock_after.available
    );
    Ok(())
}

/// Part 2: Detecting a stale writer.
#[tracing::instrument(skip(store))]
async fn part2_conflict_detection(store: &Store) -> Result<(), Box<dyn std::error::Error>> {
    println!("PART 2: Detecting a stale writer\n");

    let (_, observed) = load(store, "SKU-001").await?;
    println!("3. Writer A observes version {observed:?}");

    println!("4. Writer B reserves 20 units first...");
    store
        .append(
            "SKU-001",
            observed,
            vec![Event::encode(&ItemReserved { quantity: 20 }, ())?],
        )
        .await?;

    println!("5. Writer A appends against its stale version...");
    match store
        .append(
            "SKU-001",
            observed,
            vec![Event::encode(&ItemReserved { quantity: 10 }, ())?],
        )
        .await
    {
        Err(AppendError::Conflict(conflict)) => println!("   Rejected: {conflict}\n"),
        Err(error) => return Err(error.into()),
        Ok(_) => println!("   Unexpectedly accepted\n"),
    }
    Ok(())
}

/// Part 3: Reloading and retrying after a conflict.
///
/// The store never retries on its own; the caller re-reads, re-checks its
/// business rules and tries again.
#[tracing::instrument(skip(store))]
async fn part3_retry_pattern(store: &Store) -> Result<(), Box<dyn std::error::Error>> {
    println!("PART 3: Reload and retry\n");

    let wanted = 10;
    for attempt in 1..=3 {
        let (stock, version) = load(store, "SKU-001").await?;
        if stock.available < wanted {
            println!("   Only {} available, giving up", stock.available);
            return Ok(());
        }
        let events = vec![Event::encode(&ItemReserved { quantity: wanted }, ())?];
        match store.append("SKU-001", version, events).await {
            Ok(_) => {
                println!("6. Reserved {wanted} units on attempt {attempt}");
                break;
            }
            Err(AppendError::Conflict(conflict)) => {
                tracing::info!(attempt, ?conflict.actual, "reservation lost, reloading");
                println!("   Attempt {attempt} lost: {conflict}");
            }
            Err(error) => return Err(error.into()),
        }
    }

    let (stock, version) = load(store, "SKU-001").await?;
    println!(
        "   Final available: {} at version {version:?} (100 - 30 - 20 - 10 = 40)\n",
        stock.available
    );
    Ok(())
}

/// Part 4: Snapshots follow the same rules.
#[tracing::instrument(skip(store))]
async fn part4_snapshots(store: &Store) -> Result<(), Box<dyn std::error::Error>> {
    println!("PART 4: Snapshot replacement\n");

    let snapshots = snapshot::inmemory::Store::new();
    let (stock, version) = load(store, "SKU-001").await?;
    let version = version.ok_or("stream is empty")?;

    println!("7. Saving a snapshot of SKU-001 at version {version}...");
    write_state(&snapshots, &JsonCodec, "stock/SKU-001", &stock, None, version).await?;

    println!("8. A second writer tries to save over nothing...");
    match write_state(&snapshots, &JsonCodec, "stock/SKU-001", &stock, None, version + 1).await {
        Err(StateError::Conflict(conflict)) => println!("   Rejected: {conflict}"),
        Err(error) => return Err(error.into()),
        Ok(()) => println!("   Unexpectedly accepted"),
    }

    let current = read_state::<_, _, Stock>(&snapshots, &JsonCodec, "stock/SKU-001")
        .await?
        .ok_or("snapshot missing")?;
    println!(
        "   Current snapshot: {} available at version {}\n",
        current.state.available, current.version
    );
    Ok(())
}

/// Part 5: Reading every stream.
#[tracing::instrument(skip(store))]
async fn part5_read_all(store: &Store) -> Result<(), Box<dyn std::error::Error>> {
    println!("PART 5: Unscoped reads\n");

    store
        .append(
            "SKU-002",
            None,
            vec![Event::encode(&ItemRestocked { quantity: 5 }, ())?],
        )
        .await?;

    let access = AdminAccess::acquire("inventory report");
    tracing::info!("reading every stream for the inventory report");
    let mut events = store.read_all(&access);
    let mut total = 0;
    while let Some(event) = events.next().await {
        let event = event?;
        println!("   {} #{} {}", event.stream, event.version, event.kind());
        total += 1;
    }
    println!("9. Read {total} events across all streams\n");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Optimistic Concurrency Example ===\n");

    let store = EventStore::new(inmemory::Store::new());

    part1_basic_usage(&store).await?;
    part2_conflict_detection(&store).await?;
    part3_retry_pattern(&store).await?;
    part4_snapshots(&store).await?;
    part5_read_all(&store).await?;

    println!("=== Example Complete ===");
    Ok(())
}
