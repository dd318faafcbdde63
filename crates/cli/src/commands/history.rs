//! `localagent history`: List recent tasks from memory.

use localagent_core::memory::MemoryEntry;

pub async fn run(limit: Option<usize>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let service = super::load_service()?;
    let entries = service.history(limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history_json(&entries))?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No history yet ({} backend).", service.memory_backend());
        return Ok(());
    }
    for entry in &entries {
        println!("{}", render_entry(entry));
    }
    Ok(())
}

fn history_json(entries: &[MemoryEntry]) -> serde_json::Value {
    let items: Vec<serde_json::Value> = entries
        .iter()
        .map(|e| {
            serde_json::json!({
                "id": e.id,
                "query": e.query,
                "response": e.response,
                "timestamp": e.timestamp.to_rfc3339(),
                "metadata": e.metadata,
            })
        })
        .collect();
    serde_json::json!({ "history": items })
}

fn render_entry(entry: &MemoryEntry) -> String {
    let status = entry
        .metadata
        .get("status")
        .and_then(|s| s.as_str())
        .unwrap_or("-");
    format!(
        "[{}] ({status}) {}\n    {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        first_line(&entry.query, 80),
        first_line(&entry.response, 100),
    )
}

fn first_line(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > max_chars {
        format!("{}…", line.chars().take(max_chars).collect::<String>())
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_shows_status_and_first_lines() {
        let entry = MemoryEntry::new("sort a list\nin place", "xs.sort()").with_metadata("status", "success");
        let text = render_entry(&entry);
        assert!(text.contains("(success) sort a list"));
        assert!(!text.contains("in place"));
        assert!(text.contains("xs.sort()"));
    }

    #[test]
    fn long_lines_are_cut() {
        let long = "a".repeat(120);
        assert_eq!(first_line(&long, 80).chars().count(), 81);
    }

    #[test]
    fn json_omits_embeddings() {
        let mut entry = MemoryEntry::new("q", "r");
        entry.embedding = Some(vec![0.1, 0.2]);
        let value = history_json(&[entry]);
        assert_eq!(value["history"][0]["query"], "q");
        assert!(value["history"][0].get("embedding").is_none());
    }
}
