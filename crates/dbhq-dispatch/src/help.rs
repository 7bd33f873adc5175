//! `help` command: lists every registered command with its description.

use crate::command::{Command, CommandTable};
use crate::error::RegistrationError;

pub const NAME: &str = "help";

/// Register `help`. Call after every other command so the listing is complete.
pub fn register(table: &mut CommandTable, prefix: &str) -> Result<(), RegistrationError> {
    let mut entries: Vec<(String, String)> = table
        .sorted()
        .iter()
        .map(|c| (c.name().to_lowercase(), c.description().to_string()))
        .collect();
    entries.push((NAME.to_string(), "Lists the available commands.".to_string()));
    entries.sort();

    let text = render(prefix, &entries);
    table.register(Command::new(NAME, "Lists the available commands.", move |ctx| {
        let text = text.clone();
        async move {
            ctx.reply(&text).await?;
            Ok(())
        }
    }))
}

fn render(prefix: &str, entries: &[(String, String)]) -> String {
    let mut out = String::from("**Commands**\n");
    for (name, description) in entries {
        out.push_str(&format!("- `{}{}`: {}\n", prefix, name, description));
    }
    out
}
