//! Layered configuration merging.

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_tables_merge_per_key() {
        let mut base = parse(
            r#"
            [runtime]
            max_iterations = 10
            detection_mode = "hybrid"
        "#,
        );
        deep_merge(&mut base, &parse("[runtime]\nmax_iterations = 3"));

        let runtime = base.get("runtime").unwrap();
        assert_eq!(runtime.get("max_iterations").unwrap().as_integer(), Some(3));
        assert_eq!(
            runtime.get("detection_mode").unwrap().as_str(),
            Some("hybrid")
        );
    }

    #[test]
    fn test_arrays_replace() {
        let mut base = parse(r#"[logging]
directives = ["a=debug", "b=info"]"#);
        deep_merge(&mut base, &parse(r#"[logging]
directives = ["c=trace"]"#));
        let directives = base["logging"]["directives"].as_array().unwrap();
        assert_eq!(directives.len(), 1);
    }

    #[test]
    fn test_new_sections_are_added() {
        let mut base = parse("[runtime]\nmax_iterations = 10");
        deep_merge(
            &mut base,
            &parse("[personas.terse]\nsystem_prompt = \"Be brief.\""),
        );
        assert_eq!(
            base["personas"]["terse"]["system_prompt"].as_str(),
            Some("Be brief.")
        );
    }
}
