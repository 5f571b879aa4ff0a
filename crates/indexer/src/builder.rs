use crate::snapshot::{ClassRef, ConsistencyWarning, CssClassIndex, Snapshot, WebpackKeyIndex};
use crate::{BuildError, BuildStats};
use cssmap_protocol::{Dataset, ReleaseChannel};
use indexmap::IndexMap;
use log::{debug, warn};
use std::time::Instant;

/// Alias key that names a (module, webpack key) pair independently of any
/// single version's literal class name.
#[must_use]
pub fn alias_key(first_module_id: &str, webpack_key: &str) -> String {
    format!("_{first_module_id}_{webpack_key}")
}

/// Build every derived index from a freshly fetched dataset.
pub fn build(dataset: Dataset) -> Result<Snapshot, BuildError> {
    let started = Instant::now();
    let mut webpack_keys: WebpackKeyIndex = IndexMap::new();
    let mut css_classes: CssClassIndex = IndexMap::new();
    let mut warnings: Vec<ConsistencyWarning> = Vec::new();
    let mut stats = BuildStats::default();

    for (module_id, module) in &dataset.module_mappings {
        let Some(first_id) = module.first_id() else {
            return Err(BuildError::ModuleWithoutIds {
                module_id: module_id.clone(),
            });
        };
        stats.add_module();

        for (webpack_key, classes) in &module.classname_mappings {
            let class_ref = ClassRef::new(module_id.as_str(), webpack_key.as_str());

            webpack_keys
                .entry(webpack_key.clone())
                .or_default()
                .push(class_ref.clone());

            let alias = alias_key(first_id, webpack_key);
            register(&mut css_classes, &mut warnings, &mut stats, alias, &class_ref);
            for css_class in classes.values() {
                register(
                    &mut css_classes,
                    &mut warnings,
                    &mut stats,
                    css_class.clone(),
                    &class_ref,
                );
            }
            stats.add_entry();
        }
    }

    let latest_stable = latest_on_channel(&dataset.versions, &ReleaseChannel::Stable, "stable")?;
    let latest_beta = latest_on_channel(&dataset.versions, &ReleaseChannel::Beta, "beta")?;

    #[allow(clippy::cast_possible_truncation)]
    let time_ms = started.elapsed().as_millis() as u64;
    stats.time_ms = time_ms;
    debug!(
        "Built mapping index: {} modules, {} entries, {} class keys, {} duplicates in {}ms",
        stats.modules,
        stats.webpack_entries,
        css_classes.len(),
        stats.duplicates,
        stats.time_ms
    );

    Ok(Snapshot {
        dataset,
        webpack_keys,
        css_classes,
        latest_stable,
        latest_beta,
        warnings,
        stats,
    })
}

fn register(
    css_classes: &mut CssClassIndex,
    warnings: &mut Vec<ConsistencyWarning>,
    stats: &mut BuildStats,
    css_class: String,
    class_ref: &ClassRef,
) {
    // A collision involves two conflicting pairs. The same literal repeated
    // across versions of one pair, or an alias re-registered by its own pair,
    // is not one.
    if let Some(previous) = css_classes.get(&css_class) {
        if previous != class_ref {
            warn!(
                "Duplicate css class {css_class} ({}/{}, {}/{})",
                previous.module_id,
                previous.webpack_key,
                class_ref.module_id,
                class_ref.webpack_key
            );
            warnings.push(ConsistencyWarning {
                css_class: css_class.clone(),
                previous: previous.clone(),
                replacement: class_ref.clone(),
            });
            stats.add_duplicate();
        }
    }
    css_classes.insert(css_class, class_ref.clone());
}

fn latest_on_channel(
    versions: &IndexMap<String, ReleaseChannel>,
    channel: &ReleaseChannel,
    channel_name: &'static str,
) -> Result<String, BuildError> {
    // Versions compare as integers; i128 keeps negative and oversized ones.
    let mut latest: Option<(i128, &str)> = None;
    for (version, version_channel) in versions {
        if version_channel != channel {
            continue;
        }
        let numeric = version
            .trim()
            .parse::<i128>()
            .map_err(|_| BuildError::NonNumericVersion {
                channel: channel_name,
                version: version.clone(),
            })?;
        if latest.map_or(true, |(best, _)| numeric > best) {
            latest = Some((numeric, version));
        }
    }

    latest
        .map(|(_, version)| version.to_string())
        .ok_or(BuildError::NoChannelVersions {
            channel: channel_name,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn dataset(value: serde_json::Value) -> Dataset {
        serde_json::from_value(value).unwrap()
    }

    fn example() -> Dataset {
        dataset(json!({
            "versions": {"100": "stable", "101": "beta"},
            "generated": "2024-11-02",
            "module_mappings": {
                "m1": {
                    "name": null,
                    "ids": {"100": "99"},
                    "classname_mappings": {"root": {"100": "foo_abc"}}
                }
            }
        }))
    }

    #[test]
    fn registers_literal_and_alias() {
        let snapshot = build(example()).unwrap();
        let expected = ClassRef::new("m1", "root");

        assert_eq!(snapshot.css_classes().get("foo_abc"), Some(&expected));
        assert_eq!(snapshot.css_classes().get("_99_root"), Some(&expected));
        assert_eq!(snapshot.class_count(), 2);
        assert_eq!(
            snapshot.webpack_keys().get("root"),
            Some(&vec![expected.clone()])
        );
        assert!(snapshot.warnings().is_empty());
        assert_eq!(snapshot.stats().modules, 1);
        assert_eq!(snapshot.stats().webpack_entries, 1);
    }

    #[test]
    fn every_literal_resolves_to_its_pair() {
        let snapshot = build(dataset(json!({
            "versions": {"100": "stable", "200": "stable", "300": "beta"},
            "generated": "g",
            "module_mappings": {
                "a": {
                    "name": "menu",
                    "ids": {"100": "11", "200": "12"},
                    "classname_mappings": {
                        "root": {"100": "root_1", "200": "root_2", "300": "root_3"},
                        "item": {"100": "item_1", "200": "item_1"}
                    }
                },
                "b": {
                    "name": null,
                    "ids": {"200": "21"},
                    "classname_mappings": {"root": {"200": "b_root"}}
                }
            }
        })))
        .unwrap();

        for (module_id, module) in &snapshot.dataset().module_mappings {
            for (key, classes) in &module.classname_mappings {
                let expected = ClassRef::new(module_id.as_str(), key.as_str());
                for css_class in classes.values() {
                    assert_eq!(snapshot.css_classes().get(css_class), Some(&expected));
                }
                let alias = alias_key(module.first_id().unwrap(), key);
                assert_eq!(snapshot.css_classes().get(&alias), Some(&expected));
            }
        }

        // Repeating a literal within one pair is not a collision.
        assert!(snapshot.warnings().is_empty());
        let roots: Vec<&str> = snapshot.webpack_keys()["root"]
            .iter()
            .map(|r| r.module_id.as_str())
            .collect();
        assert_eq!(roots, vec!["a", "b"]);
    }

    #[test]
    fn duplicate_literal_later_pair_wins() {
        let snapshot = build(dataset(json!({
            "versions": {"100": "stable", "101": "beta"},
            "generated": "g",
            "module_mappings": {
                "first": {"name": null, "ids": {"100": "1"}, "classname_mappings": {"root": {"100": "shared"}}},
                "second": {"name": null, "ids": {"100": "2"}, "classname_mappings": {"panel": {"100": "shared"}}}
            }
        })))
        .unwrap();

        assert_eq!(
            snapshot.css_classes().get("shared"),
            Some(&ClassRef::new("second", "panel"))
        );
        assert_eq!(
            snapshot.warnings(),
            &[ConsistencyWarning {
                css_class: "shared".to_string(),
                previous: ClassRef::new("first", "root"),
                replacement: ClassRef::new("second", "panel"),
            }]
        );
        assert_eq!(snapshot.stats().duplicates, 1);
    }

    #[test]
    fn latest_versions_use_numeric_order() {
        let snapshot = build(dataset(json!({
            "versions": {"99": "stable", "1000": "stable", "250": "beta", "1200": "beta", "5000": "nightly"},
            "generated": "g",
            "module_mappings": {}
        })))
        .unwrap();
        assert_eq!(snapshot.latest_stable_version(), "1000");
        assert_eq!(snapshot.latest_beta_version(), "1200");
    }

    #[test]
    fn latest_versions_accept_negative_and_oversized() {
        let snapshot = build(dataset(json!({
            "versions": {"-5": "stable", "-20": "stable", "18446744073709551616": "beta", "7": "beta"},
            "generated": "g",
            "module_mappings": {}
        })))
        .unwrap();
        assert_eq!(snapshot.latest_stable_version(), "-5");
        assert_eq!(snapshot.latest_beta_version(), "18446744073709551616");
    }

    #[test]
    fn missing_channel_is_a_build_error() {
        let err = build(dataset(json!({
            "versions": {"100": "stable"},
            "generated": "g",
            "module_mappings": {}
        })))
        .unwrap_err();
        assert_eq!(err, BuildError::NoChannelVersions { channel: "beta" });
    }

    #[test]
    fn non_numeric_channel_version_is_a_build_error() {
        let err = build(dataset(json!({
            "versions": {"abc": "stable", "101": "beta"},
            "generated": "g",
            "module_mappings": {}
        })))
        .unwrap_err();
        assert_eq!(
            err,
            BuildError::NonNumericVersion {
                channel: "stable",
                version: "abc".to_string()
            }
        );
    }

    #[test]
    fn module_without_ids_is_a_build_error() {
        let err = build(dataset(json!({
            "versions": {"100": "stable", "101": "beta"},
            "generated": "g",
            "module_mappings": {"empty": {"name": "x", "ids": {}, "classname_mappings": {}}}
        })))
        .unwrap_err();
        assert_eq!(
            err,
            BuildError::ModuleWithoutIds {
                module_id: "empty".to_string()
            }
        );
    }
}
