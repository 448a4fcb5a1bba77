use std::fs;
use std::path::{Path, PathBuf};

use supportdesk_core::CustomerId;
use thiserror::Error;

/// Built-in instructions. `{{CUSTOMER_ID}}` and `{{AVAILABLE_TOOLS}}` are
/// filled in per turn.
pub const DEFAULT_INSTRUCTIONS: &str = "\
You are a customer support agent.

You are talking to the customer with id {{CUSTOMER_ID}}.

For the real ticket database:
- Use `save_ticket` to save a new ticket once you have a question, an answer and a category.
- Use `search_ticket` to look up stored tickets by question text.

For the demo dataset:
- Use `search_dummy_by_customer_id` if the user gives a number, like \"101 user info\".
- Use `search_dummy_by_customer` if the user gives a name, like \"Ali Khan\".
- Use `search_dummy_by_ticket_id` if the user says \"ticket 5\" or \"show ticket 5\".
- Use `search_dummy_by_status` if the user asks for \"resolved tickets\" or \"pending ones\".

Always call the matching tool instead of saying you don't know.
Available tools: {{AVAILABLE_TOOLS}}.
";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("failed to read system prompt '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("system prompt '{0}' is empty")]
    Empty(PathBuf),
}

/// Custom prompt file when configured, built-in instructions otherwise.
pub fn load_system_prompt(path: Option<&Path>) -> Result<String, PromptError> {
    let Some(path) = path else {
        return Ok(DEFAULT_INSTRUCTIONS.to_string());
    };

    let template = fs::read_to_string(path)
        .map_err(|source| PromptError::Read { path: path.to_path_buf(), source })?;
    if template.trim().is_empty() {
        return Err(PromptError::Empty(path.to_path_buf()));
    }
    Ok(template)
}

pub fn render_instructions(template: &str, customer_id: CustomerId, mut tools: Vec<&str>) -> String {
    tools.sort_unstable();
    let rendered_tools = if tools.is_empty() { "none".to_string() } else { tools.join(", ") };
    template
        .replace("{{CUSTOMER_ID}}", &customer_id.to_string())
        .replace("{{AVAILABLE_TOOLS}}", &rendered_tools)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use supportdesk_core::CustomerId;

    use super::{load_system_prompt, render_instructions, PromptError, DEFAULT_INSTRUCTIONS};

    #[test]
    fn default_prompt_states_every_selection_rule() {
        let prompt = load_system_prompt(None).expect("default prompt");
        assert_eq!(prompt, DEFAULT_INSTRUCTIONS);

        for tool in [
            "save_ticket",
            "search_ticket",
            "search_dummy_by_customer_id",
            "search_dummy_by_customer",
            "search_dummy_by_ticket_id",
            "search_dummy_by_status",
        ] {
            assert!(prompt.contains(&format!("`{tool}`")), "missing rule for {tool}");
        }
    }

    #[test]
    fn render_fills_customer_and_sorted_tools() {
        let rendered = render_instructions(DEFAULT_INSTRUCTIONS, CustomerId(42), vec!["search_ticket", "save_ticket"]);

        assert!(rendered.contains("customer with id 42"));
        assert!(rendered.contains("Available tools: save_ticket, search_ticket."));
        assert!(!rendered.contains("{{"));

        let bare = render_instructions("tools: {{AVAILABLE_TOOLS}}", CustomerId(1), Vec::new());
        assert_eq!(bare, "tools: none");
    }

    #[test]
    fn custom_prompt_file_replaces_builtin() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "Answer politely. Customer {{{{CUSTOMER_ID}}}}.").expect("write");

        let prompt = load_system_prompt(Some(file.path())).expect("custom prompt");
        assert_eq!(render_instructions(&prompt, CustomerId(7), Vec::new()).trim(), "Answer politely. Customer 7.");
    }

    #[test]
    fn missing_or_blank_prompt_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.md");
        assert!(matches!(load_system_prompt(Some(&missing)), Err(PromptError::Read { .. })));

        let blank = dir.path().join("blank.md");
        std::fs::write(&blank, "  \n").expect("write");
        assert!(matches!(load_system_prompt(Some(&blank)), Err(PromptError::Empty(_))));
    }
}
