//! Model listing functionality

use crate::core::config::data::Config;

/// One display line per catalog entry; the default selection is starred.
pub fn model_lines(config: &Config) -> Vec<String> {
    let catalog = config.catalog();
    let default_index = config
        .default_model
        .as_deref()
        .and_then(|id| catalog.position(id))
        .unwrap_or(0);

    catalog
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let marker = if index == default_index { "*" } else { " " };
            let mut line = format!("{marker} {:<32} {}", entry.id, entry.display_name);
            if entry.is_persona() {
                line.push_str(&format!(
                    "  (remembers recent exchanges; served by {})",
                    catalog.backend_model_for(&entry.id)
                ));
            }
            line
        })
        .collect()
}

pub fn list_models(config: &Config) {
    println!("🤖 Available Models");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for line in model_lines(config) {
        println!("{line}");
    }
    println!();
    println!("💡 Use -m <MODEL> to pick a model for one run, or 'jarvis-chat set default-model <MODEL>'");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persona_is_the_default_and_shows_its_backend() {
        let lines = model_lines(&Config::default());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("* jarvis-custom"));
        assert!(lines[0].contains("openai/gpt-3.5-turbo"));
        assert!(lines[1].starts_with("  mistralai/mistral-7b-instruct"));
    }

    #[test]
    fn configured_default_is_starred() {
        let config = Config {
            default_model: Some("mistralai/mistral-7b-instruct".to_string()),
            persona_backend_model: Some("openai/gpt-4o-mini".to_string()),
            ..Default::default()
        };
        let lines = model_lines(&config);
        assert!(lines[0].starts_with("  jarvis-custom"));
        assert!(lines[0].contains("openai/gpt-4o-mini"));
        assert!(lines[1].starts_with("* mistralai"));
    }
}
