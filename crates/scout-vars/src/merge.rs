//! Precedence merge across per-backend variable maps

use std::collections::HashMap;

use crate::variable::Variable;

/// Merge per-backend maps into a single map, in the order given.
///
/// Callers pass maps in backend precedence order; a key present in more
/// than one map keeps the entry from the map that arrives last. Overwrites
/// are intentionally not an error, but they are logged at debug level so
/// a shadowed value can be diagnosed.
pub fn merge<I>(maps: I) -> HashMap<String, Variable>
where
    I: IntoIterator<Item = HashMap<String, Variable>>,
{
    let mut merged: HashMap<String, Variable> = HashMap::new();

    for map in maps {
        for (key, var) in map {
            if let Some(previous) = merged.get(&key) {
                tracing::debug!(
                    key = %key,
                    kept = %var.source,
                    shadowed = %previous.source,
                    "key collision, later source wins"
                );
            }
            merged.insert(key, var);
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::Source;

    fn map_of(source: Source, pairs: &[(&str, &str)]) -> HashMap<String, Variable> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Variable::new(*k, *v, source)))
            .collect()
    }

    #[test]
    fn test_merge_is_union_of_key_sets() {
        let ssm = map_of(Source::ParameterStore, &[("A", "1"), ("B", "2")]);
        let sm = map_of(Source::SecretsManager, &[("C", "3")]);
        let gcp = map_of(Source::GcpSecretManager, &[("D", "4")]);

        let merged = merge([ssm, sm, gcp]);

        let mut keys: Vec<&str> = merged.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["A", "B", "C", "D"]);
    }

    #[test]
    fn test_later_map_wins_on_collision() {
        let ssm = map_of(Source::ParameterStore, &[("TOKEN", "from-ssm")]);
        let sm = map_of(Source::SecretsManager, &[("TOKEN", "from-sm")]);
        let gcp = map_of(Source::GcpSecretManager, &[("TOKEN", "from-gcp")]);

        let merged = merge([ssm, sm, gcp]);

        assert_eq!(merged.len(), 1);
        let var = &merged["TOKEN"];
        assert_eq!(var.value, "from-gcp");
        assert_eq!(var.source, Source::GcpSecretManager);
    }

    #[test]
    fn test_middle_source_beats_first() {
        let ssm = map_of(Source::ParameterStore, &[("TOKEN", "from-ssm"), ("A", "1")]);
        let sm = map_of(Source::SecretsManager, &[("TOKEN", "from-sm")]);

        let merged = merge([ssm, sm, HashMap::new()]);

        assert_eq!(merged["TOKEN"].value, "from-sm");
        assert_eq!(merged["A"].value, "1");
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        let merged = merge(std::iter::empty::<HashMap<String, Variable>>());
        assert!(merged.is_empty());
    }
}
