use crate::output::{EntryOutput, ModuleOutput, StatusOutput, WebpackOutput};

const UNKNOWN_CHANNEL: &str = "unknown";

pub fn render_status(status: &StatusOutput) -> String {
    let mut out = String::new();
    out.push_str(&format!("Currently loaded mapping: {}\n", status.generated));
    out.push_str(&format!(
        "Last known stable version: {}\n",
        status.latest_stable_version
    ));
    out.push_str(&format!(
        "Last known beta version: {}\n",
        status.latest_beta_version
    ));
    out.push_str(&format!("Mapped CSS class count: {}\n", status.class_count));
    if status.consistency_warnings > 0 {
        out.push_str(&format!(
            "Duplicate class registrations: {}\n",
            status.consistency_warnings
        ));
    }
    out.push_str("\nSteam versions mapped:\n");
    for (version, channel) in &status.versions {
        out.push_str(&format!("- {version} ({channel})\n"));
    }
    out
}

pub fn render_module(module: &ModuleOutput) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "## Module {}\n",
        module.name.as_deref().unwrap_or_default()
    ));
    out.push_str(&format!("- IDs: {}\n", module.ids.join(", ")));
    out.push_str(&format!(
        "- Steam versions: {}\n",
        module.steam_versions.join(", ")
    ));
    out.push_str(&format!(
        "- Webpack keys: {}\n",
        code_list(&module.webpack_keys)
    ));
    out.push_str(&format!(
        "- Ignored keys: {}\n",
        code_list(&module.ignored_webpack_keys)
    ));
    out
}

/// `channel_of` resolves a steam version to its release channel name.
pub fn render_entry<'a, F>(entry: &EntryOutput, channel_of: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut out = String::new();
    out.push_str(&format!("## Webpack key {}\n", entry.webpack_key));
    if let Some(name) = &entry.canonical_name {
        out.push_str(&format!("Cross-version css class: `.{name}`\n"));
    }
    out.push('\n');
    for (version, css_class) in &entry.classes {
        let channel = channel_of(version).unwrap_or(UNKNOWN_CHANNEL);
        out.push_str(&format!("{version} ({channel}) -> `{css_class}`\n"));
    }
    out
}

pub fn render_webpack<'a, F>(output: &WebpackOutput, channel_of: F) -> String
where
    F: Fn(&str) -> Option<&'a str> + Copy,
{
    let mut out = String::new();
    if output.truncated {
        out.push_str(&format!(
            "Entries truncated. Not all entries shown. Total {} found.\n\n",
            output.total
        ));
    }
    let sections: Vec<String> = output
        .entries
        .iter()
        .map(|entry| {
            format!(
                "{}\n{}",
                render_module(&entry.module),
                render_entry(entry, channel_of)
            )
        })
        .collect();
    out.push_str(&sections.join("\n"));
    out
}

fn code_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("`{item}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn module() -> ModuleOutput {
        ModuleOutput {
            module_id: "m1".to_string(),
            name: None,
            ids: vec!["99".to_string(), "98".to_string()],
            steam_versions: vec!["100".to_string(), "200".to_string()],
            webpack_keys: vec!["root".to_string(), "item".to_string()],
            ignored_webpack_keys: vec!["duration".to_string()],
        }
    }

    #[test]
    fn module_summary_lists_keys() {
        assert_eq!(
            render_module(&module()),
            "## Module \n- IDs: 99, 98\n- Steam versions: 100, 200\n- Webpack keys: `root`, `item`\n- Ignored keys: `duration`\n"
        );
    }

    #[test]
    fn entry_summary_marks_unknown_channels() {
        let mut classes = IndexMap::new();
        classes.insert("100".to_string(), "foo_abc".to_string());
        classes.insert("300".to_string(), "foo_new".to_string());
        let entry = EntryOutput {
            module: module(),
            webpack_key: "root".to_string(),
            canonical_name: Some("_99_root".to_string()),
            classes,
        };

        let rendered = render_entry(&entry, |v| (v == "100").then_some("stable"));
        assert_eq!(
            rendered,
            "## Webpack key root\nCross-version css class: `._99_root`\n\n100 (stable) -> `foo_abc`\n300 (unknown) -> `foo_new`\n"
        );
    }

    #[test]
    fn status_lists_versions_in_order() {
        let mut versions = IndexMap::new();
        versions.insert("100".to_string(), "stable".to_string());
        versions.insert("101".to_string(), "beta".to_string());
        let status = StatusOutput {
            generated: "2024-11-02".to_string(),
            latest_stable_version: "100".to_string(),
            latest_beta_version: "101".to_string(),
            class_count: 2,
            consistency_warnings: 0,
            versions,
        };
        let rendered = render_status(&status);
        assert!(rendered.starts_with("Currently loaded mapping: 2024-11-02\n"));
        assert!(rendered.ends_with("Steam versions mapped:\n- 100 (stable)\n- 101 (beta)\n"));
        assert!(!rendered.contains("Duplicate"));
    }
}
