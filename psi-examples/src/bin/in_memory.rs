//! In-memory example of PSI protocol execution.
//!
//! This example runs a client and a server within a single process, passing
//! the protocol messages directly instead of over the network. It runs the
//! exchange once per server data structure and compares their sizes.
//!
//! Run with:
//! ```bash
//! cargo run --bin in_memory
//! ```

use psi_engine::{DataStructure, PsiClient, PsiServer, SetupParameters};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::fmt;

const FPR: f64 = 1e-6;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    println!("=== PSI Engine In-Memory Example ===\n");

    let client_items: Vec<&str> = vec![
        "client_secret_1",
        "shared_secret_1",
        "client_secret_2",
        "shared_secret_2",
    ];
    let server_items: Vec<&str> = vec![
        "server_secret_1",
        "shared_secret_1",
        "server_secret_2",
        "shared_secret_2",
        "server_secret_3",
    ];

    println!("Client's items ({}):", client_items.len());
    for (i, item) in client_items.iter().enumerate() {
        println!("  {}: {}", i, item);
    }
    println!("\nServer's items ({}):", server_items.len());
    for (i, item) in server_items.iter().enumerate() {
        println!("  {}: {}", i, item);
    }

    // === Phase 1: Create both parties ===
    println!("\n--- Phase 1: Create Parties ---");
    let client = PsiClient::create_with_new_key(true)?;
    let server = PsiServer::create_with_new_key(true)?;

    // === Phase 2: Client -> Server ===
    println!("\n--- Phase 2: Client Request ---");
    let request = client.create_request(&client_items)?;
    for (i, element) in request.encrypted_elements.iter().enumerate() {
        println!("  {}: {}..", i, hex::encode(&element.as_bytes()[..8]));
    }

    // === Phase 3: Server -> Client ===
    println!("\n--- Phase 3: Server Setup and Response ---");
    let params = SetupParameters::new(FPR, client_items.len(), DataStructure::Gcs)?;
    let setup = server.setup_message_with(&params, &server_items)?;
    let response = server.process_request(&request)?;
    info!(
        data_structure = %setup.data_structure(),
        setup_bytes = setup.encoding.encoded_len(),
        response_elements = response.len(),
        "server answered"
    );

    // === Phase 4: Client computes the intersection ===
    println!("\n--- Phase 4: Compute Intersection ---");
    let intersection = client.get_intersection(&setup, &response)?;

    println!("\n=== Results ===");
    println!("Client found {} items in intersection:", intersection.len());
    for index in &intersection {
        println!("  {}: {}", index, client_items[*index]);
    }

    // === Cardinality only, every data structure ===
    println!("\n\n=== Large Sets, Size Only ===\n");

    let mut rng = StdRng::seed_from_u64(42);
    let client = PsiClient::create_with_rng(&mut rng, false)?;
    let server = PsiServer::create_with_rng(&mut rng, false)?;

    // 1000 client items, 100 server items, 50 in common
    let client_large: Vec<String> = (0..1000).map(|i| format!("Element {}", i)).collect();
    let server_large: Vec<String> = (950..1050).map(|i| format!("Element {}", i)).collect();
    println!(
        "Client: {} items, Server: {} items",
        client_large.len(),
        server_large.len()
    );

    let request = client.create_request(&client_large)?;
    let response = server.process_request(&request)?;

    for data_structure in DataStructure::ALL {
        let setup =
            server.create_setup_message(FPR, client_large.len(), &server_large, data_structure)?;
        let size = client.get_intersection_size(&setup, &response)?;
        println!(
            "  {:<12} setup {:>6} bytes, intersection size {} (expected: 50)",
            data_structure.to_string(),
            setup.encoding.encoded_len(),
            size
        );
    }

    println!("\n✓ Protocol completed successfully!");

    Ok(())
}
