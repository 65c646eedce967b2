//! Example: two replicas of each set variant exchanging state.
//!
//! Replica 0 adds, removes and re-adds values; replica 1 only merges.
//! Before and after every merge we print whether replica 0 causally
//! precedes replica 1, followed by both internal states.
//!
//! Run with `cargo run --example replicate`.

use std::fmt::Display;

use orset_kit::prelude::*;

enum Action {
    Add(i32),
    Remove(i32),
}

const SCRIPT: [Action; 4] = [
    Action::Add(1),
    Action::Remove(1),
    Action::Add(1),
    Action::Add(2),
];

fn drive<S>(name: &str, mut r0: S, mut r1: S) -> orset_kit::Result<()>
where
    S: ReplicatedSet<i32> + Display,
{
    println!("=== {name} ===\n");

    for action in &SCRIPT {
        match action {
            Action::Add(v) => {
                println!("r0: add {v}");
                r0.add(*v)?;
            }
            Action::Remove(v) => {
                println!("r0: remove {v}");
                r0.remove(v);
            }
        }
        println!("compare: {}", r0.compare(&r1)?);
        r1.merge(&r0)?;
        println!("compare: {}", r0.compare(&r1)?);
        println!("r0: {r0}");
        println!("r1: {r1}\n");
    }
    Ok(())
}

fn main() -> orset_kit::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    drive("TombstoneSet", TombstoneSet::new(), TombstoneSet::new())?;
    drive(
        "DottedClockSet",
        DottedClockSet::new(0, 2)?,
        DottedClockSet::new(1, 2)?,
    )?;
    Ok(())
}
