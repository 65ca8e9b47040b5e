//! Basic usage of the `compact_pool` crate:
//!
//! * Creating a pool.
//! * Allocating items and initializing them through handles.
//! * Iterating over all items.
//! * Releasing items and watching the pool stay packed.

use compact_pool::CompactPool;

#[derive(Debug, Default)]
struct Player {
    name: String,
    score: u32,
}

fn main() {
    let mut pool = CompactPool::<Player>::new();

    // Allocating gives you a default-constructed item and a handle to initialize it with.
    let alice = pool.alloc().unwrap();
    pool.get_mut(&alice).unwrap().name = "Alice".to_string();

    let bob = pool
        .insert(Player {
            name: "Bob".to_string(),
            score: 10,
        })
        .unwrap();

    let charlie = pool
        .insert(Player {
            name: "Charlie".to_string(),
            score: 20,
        })
        .unwrap();

    println!(
        "Pool contains {} items in {} slots",
        pool.len(),
        pool.storage_len()
    );

    // Releasing Alice leaves a hole at the start of the storage.
    pool.release(&alice).unwrap();
    println!("After releasing Alice there are {} holes", pool.holes());

    // Iteration closes the hole first by moving Charlie into it.
    pool.iterate(|player, id| {
        player.score += 1;
        println!("Item {id}: {} has {} points", player.name, player.score);
    });

    println!("Holes after iteration: {}", pool.holes());

    // Handles still find their items, no matter where they have moved.
    println!("Bob: {:?}", pool.get(&bob).unwrap());
    println!("Charlie: {:?}", pool.get(&charlie).unwrap());

    // Handles of released items no longer resolve.
    match pool.get(&alice) {
        Ok(player) => println!("Unexpectedly found {player:?}"),
        Err(error) => println!("Alice is gone: {error}"),
    }
}
