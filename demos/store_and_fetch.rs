use std::{sync::Arc, time::Instant};

use atomdht::{AtomSpace, AtomStorage, AtomType, Handle, MemoryDht, Value};

use clap::Parser;

use tracing::Level;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of concepts to store
    #[arg(short, long, default_value_t = 100)]
    count: usize,
    /// Namespace to publish into
    #[arg(short, long, default_value = "demo")]
    namespace: String,
    /// Print the raw records of the first concept
    #[arg(long)]
    examine: bool,
}

fn main() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();

    let dht = MemoryDht::new();

    let space = Arc::new(AtomSpace::new());
    let writer = AtomStorage::builder()
        .namespace(&cli.namespace)
        .build(space.clone(), dht.clone());

    let weight = space.add_node(AtomType::PREDICATE_NODE, "weight");
    let concepts: Vec<Handle> = (0..cli.count)
        .map(|i| {
            let concept = space.add_node(AtomType::CONCEPT_NODE, format!("concept-{}", i));
            space.set_value(&concept, weight.clone(), Value::Float(vec![i as f64]));
            concept
        })
        .collect();

    for pair in concepts.windows(2) {
        space.add_link(AtomType::INHERITANCE_LINK, pair.to_vec());
    }

    println!("\n=== STORE ===");
    let start = Instant::now();
    let report = writer.store_all().expect("store_all failed");
    println!(
        "Stored {} atoms ({} failed) in {:?} seconds",
        report.succeeded,
        report.failed.len(),
        start.elapsed().as_secs_f32()
    );

    if cli.examine {
        if let Some(first) = concepts.first() {
            println!("\n=== EXAMINE ===");
            println!(
                "{}",
                writer
                    .examine(writer.identity_key(first))
                    .expect("examine failed")
            );
        }
    }

    println!("\n=== LOAD FROM ANOTHER PEER ===");
    let loaded = Arc::new(AtomSpace::new());
    let reader = AtomStorage::builder()
        .namespace(&cli.namespace)
        .read_only()
        .build(loaded.clone(), dht);

    let start = Instant::now();
    let report = reader
        .load_type(&AtomType::CONCEPT_NODE)
        .expect("load_type failed");
    println!(
        "Loaded {} concepts in {:?} seconds",
        report.succeeded,
        start.elapsed().as_secs_f32()
    );

    if let Some(first) = concepts.first() {
        let parents = reader.get_incoming_set(first).expect("incoming failed");
        println!("{} has {} incoming link(s)", first, parents.len());
        println!("{} = {:?}", first, loaded.get_value(first, &weight));
    }

    println!("\n=== STATS ===\n{}", reader.stats());
}
