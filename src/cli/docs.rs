//! Helper documentation for the sprig CLI

use std::collections::BTreeMap;
use std::fmt::Write;

use super::CliError;
use crate::helpers::HelperRegistry;

const OVERVIEW: &str = r#"SPRIG HELPERS

Templates are JSON documents whose string leaves may hold expressions written
between (: and :). Expressions call helpers with space-separated arguments:

  (: map($items 'row') :)
  (: ?($paid 'yes' 'no') :)

"#;

/// Groups invocable names by the helper they call: canonical name to aliases.
fn grouped(registry: &HelperRegistry) -> BTreeMap<&str, Vec<&str>> {
    let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for name in registry.names() {
        let Some(record) = registry.get(name) else {
            continue;
        };
        let aliases = groups.entry(record.name.as_str()).or_default();
        if name != record.name {
            aliases.push(name);
        }
    }
    groups
}

/// One line per helper: its syntax and what it returns.
pub fn helper_listing(registry: &HelperRegistry) -> String {
    let metadata = registry.metadata();
    let mut out = String::from(OVERVIEW);
    out.push_str("AVAILABLE HELPERS\n\n");
    for (name, aliases) in grouped(registry) {
        let returns = metadata.get(name).map_or("", |meta| meta.returns.as_str());
        let _ = write!(out, "  {:<18} {}", name, returns);
        if !aliases.is_empty() {
            let _ = write!(out, " (also {})", aliases.join(" "));
        }
        out.push('\n');
    }
    out.push_str("\nRun 'sprig helpers <name>' for details.\n");
    out
}

/// The full documentation page of one helper, looked up by any of its names.
pub fn helper_page(registry: &HelperRegistry, name: &str) -> Result<String, CliError> {
    let record = registry
        .get(name)
        .ok_or_else(|| CliError::UnknownHelper(name.to_string()))?;
    let aliases = grouped(registry).remove(record.name.as_str()).unwrap_or_default();

    let mut out = String::new();
    let _ = writeln!(out, "{}", record.name.to_uppercase());
    match &record.meta {
        Some(meta) => {
            let _ = writeln!(out, "\n  {}\n", meta.syntax);
            let _ = writeln!(out, "RETURNS\n  {}\n", meta.returns);
            let _ = writeln!(out, "DESCRIPTION\n  {}", meta.description);
        }
        None => out.push_str("\n  No documentation.\n"),
    }
    if !aliases.is_empty() {
        let _ = writeln!(out, "\nALIASES\n  {}", aliases.join(" "));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Engine;

    #[test]
    fn test_listing_groups_aliases() {
        let engine = Engine::new();
        let listing = helper_listing(engine.helpers());
        let line = listing
            .lines()
            .find(|line| line.trim_start().starts_with("union "))
            .unwrap();
        assert!(line.contains("(also"));
        assert!(line.contains('∪'));
        assert!(!listing.lines().any(|line| line.trim_start().starts_with("∪ ")));
    }

    #[test]
    fn test_page_by_alias() {
        let engine = Engine::new();
        let page = helper_page(engine.helpers(), "#").unwrap();
        assert!(page.starts_with("NUM"));
        assert!(page.contains("num( $string )"));
        assert!(matches!(
            helper_page(engine.helpers(), "nope"),
            Err(CliError::UnknownHelper(_))
        ));
    }
}
