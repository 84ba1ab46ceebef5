//! `memory show` and `memory clear`.

use std::error::Error;

use crate::core::config::data::path_display;
use crate::core::config::io::memory_path;
use crate::core::memory::{JsonFileStore, MemoryEntry, MemoryStore, MEMORY_LIMIT};

pub fn format_entries(entries: &[MemoryEntry]) -> Vec<String> {
    entries
        .iter()
        .enumerate()
        .flat_map(|(index, entry)| {
            [
                format!("{:>3}. Q: {}", index + 1, entry.q),
                format!("     A: {}", entry.a),
            ]
        })
        .collect()
}

pub fn show_memory() -> Result<(), Box<dyn Error>> {
    let store = JsonFileStore::new(memory_path()?);
    let entries = store.load()?;

    println!(
        "🧠 Persona memory: {} of {MEMORY_LIMIT} exchanges ({})",
        entries.len(),
        path_display(store.path())
    );
    for line in format_entries(&entries) {
        println!("{line}");
    }
    Ok(())
}

pub fn clear_memory() -> Result<(), Box<dyn Error>> {
    let store = JsonFileStore::new(memory_path()?);
    let forgotten = store.load().map(|entries| entries.len()).unwrap_or(0);
    store.save(&[])?;
    println!("✅ Cleared {forgotten} remembered exchanges");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_numbered_oldest_first() {
        let lines = format_entries(&[
            MemoryEntry::new("Hello", "Hi there"),
            MemoryEntry::new("How are you?", "Fine."),
        ]);
        assert_eq!(
            lines,
            vec![
                "  1. Q: Hello",
                "     A: Hi there",
                "  2. Q: How are you?",
                "     A: Fine.",
            ]
        );
    }
}
