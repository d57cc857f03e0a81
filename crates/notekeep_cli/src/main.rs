//! CLI smoke entry point.
//!
//! # Responsibility
//! - Compose config, logging, store, repository and feed explicitly.
//! - Seed sample notes, then run a short update/delete/list sequence against the core.

use log::info;
use notekeep_core::{sample_notes, CoreConfig, NoteFeed, NoteRepository, NoteStore, Snapshot};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("notekeep: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    println!("notekeep_core ping={}", notekeep_core::ping());
    println!("notekeep_core version={}", notekeep_core::core_version());

    let config = CoreConfig::from_env()?;
    config.init_logging()?;

    let store = config.open_store()?;
    let repository = NoteRepository::new(store);
    let feed = NoteFeed::new(config.empty_snapshot_policy);
    let mut stream = repository.get_all_notes()?;
    info!(
        "event=cli_start module=cli status=ok stream={}",
        stream.id()
    );

    let seeded = sample_notes();
    for note in &seeded {
        repository.add_note(note)?;
    }
    if let [first, second, ..] = seeded.as_slice() {
        repository.update_note(&first.revised(first.title.as_str(), "Milk, eggs, bread"))?;
        repository.delete_note(second)?;
    }

    while let Some(snapshot) = stream.try_next() {
        let applied = feed.apply(Snapshot::clone(&snapshot));
        print_snapshot(&snapshot, applied);
    }

    println!("notes stored={}", repository.store().snapshot()?.len());
    stream.unsubscribe();
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot, applied: bool) {
    let titles: Vec<&str> = snapshot.iter().map(|note| note.title.as_str()).collect();
    println!(
        "snapshot notes={} applied={applied} titles={titles:?}",
        snapshot.len()
    );
}
