//! Simulates a game-style update loop: every frame one entity is spawned, all entities are
//! updated and the ones that died are released.
//!
//! Run with `--release` and compare the timings between defragmentation policies.

use std::time::{Duration, Instant};

use compact_pool::{CompactPool, DefragPolicy};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const FRAMES: usize = 50_000;
const REPORT_EVERY: usize = 10_000;

#[derive(Debug, Default)]
struct Entity {
    hp: i32,
}

fn main() {
    for policy in [
        DefragPolicy::Immediate,
        DefragPolicy::Deferred,
        DefragPolicy::Manual,
    ] {
        println!("=== {policy:?} ===");
        run(policy);
        println!();
    }
}

fn run(policy: DefragPolicy) {
    let mut pool = CompactPool::<Entity>::builder()
        .defrag_policy(policy)
        .build();

    let mut rng = SmallRng::seed_from_u64(42);
    let mut dead = Vec::new();

    let mut alloc_time = Duration::ZERO;
    let mut update_time = Duration::ZERO;
    let mut release_time = Duration::ZERO;
    let mut updates: u64 = 0;

    for frame in 0..FRAMES {
        let start = Instant::now();
        let entity = pool.alloc().unwrap();
        pool.get_mut(&entity).unwrap().hp = rng.random_range(1..=25);
        alloc_time += start.elapsed();

        let start = Instant::now();
        pool.iterate(|entity, id| {
            if rng.random_range(0..1000) <= 1 {
                entity.hp -= 1;
            }

            updates += 1;

            if entity.hp < 0 {
                dead.push(id);
            }
        });
        update_time += start.elapsed();

        let start = Instant::now();
        for id in dead.drain(..) {
            pool.release(id).unwrap();
        }

        if policy == DefragPolicy::Manual && frame % 100 == 0 {
            pool.defrag();
        }
        release_time += start.elapsed();

        if frame % REPORT_EVERY == 0 {
            println!(
                "frame {frame}: {} live, {} updates, alloc {alloc_time:?}, update {update_time:?}, release {release_time:?}",
                pool.len(),
                updates
            );
        }
    }
}
