use serde::{Deserialize, Deserializer};

/// Normalizes an email address by stripping surrounding whitespace,
/// composing it into Unicode Normalization Form C and lowercasing it.
///
/// ```
/// use workshop_backend::normalization::normalize_email;
/// assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
/// ```
pub fn normalize_email(email: impl AsRef<str>) -> String {
    use unicode_normalization::UnicodeNormalization;

    email.as_ref().trim().nfc().collect::<String>().to_lowercase()
}

/// Deserializes a `String` after running it through `normalize_email`.
pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
where D: Deserializer<'de> {
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(normalize_email(s))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::normalize_email;

    #[test]
    fn composed_and_decomposed_forms_collapse() {
        // 'é' as a single code point vs. 'e' plus a combining accent
        assert_eq!(normalize_email("ren\u{e9}@example.com"), normalize_email("rene\u{301}@example.com"));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 10000, ..ProptestConfig::default()
        })]

        #[test]
        fn normalization_works(address in "[A-Za-z0-9._%+-]{1,20}@[A-Za-z0-9.-]{1,20}", space_before in "\\s*", space_after in "\\s*") {
            let normalized = normalize_email(format!("{}{}{}", space_before, address, space_after));

            prop_assert!(!normalized.starts_with(char::is_whitespace) && !normalized.ends_with(char::is_whitespace), "{:?} (normalized form of {:?}) has no surrounding whitespace", normalized, address);

            prop_assert!(!normalized.chars().any(|c| c.is_ascii_uppercase()), "{:?} (normalized form of {:?}) is lowercase", normalized, address);

            prop_assert_eq!(normalize_email(&normalized), normalized.clone(), "normalizing {:?} twice changes nothing", normalized);
        }
    }
}
