//! Query expansion (spec §4.3 step 1): split identifiers into their constituent words
//! and add a small set of domain synonyms so a query like "auth handler" also matches
//! code indexed under "authentication".

/// Synonym pairs are symmetric: if the query contains either side, both are added.
const SYNONYMS: &[(&str, &str)] = &[
    ("auth", "authentication"),
    ("config", "configuration"),
    ("db", "database"),
    ("repo", "repository"),
    ("func", "function"),
    ("impl", "implementation"),
    ("init", "initialize"),
    ("ctx", "context"),
    ("err", "error"),
    ("req", "request"),
    ("resp", "response"),
    ("cfg", "config"),
];

/// Split `camelCase`, `PascalCase`, and `snake_case`/`kebab-case` identifiers into
/// lowercase words. Non-identifier text passes through split on whitespace.
fn split_identifier(token: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = token.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev_lower = chars[i - 1].is_lowercase() || chars[i - 1].is_numeric();
            let next_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
            if prev_lower || next_lower {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c.to_ascii_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Expand raw query text into a deduplicated bag of lowercase terms: the original
/// whitespace-separated tokens, each token's split identifier words, and any matching
/// synonyms.
pub fn expand_query(text: &str) -> Vec<String> {
    let mut terms = Vec::new();
    for raw_token in text.split_whitespace() {
        let cleaned: String = raw_token.chars().filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-').collect();
        if cleaned.is_empty() {
            continue;
        }
        terms.push(cleaned.to_lowercase());
        terms.extend(split_identifier(&cleaned));
    }

    let mut synonym_additions = Vec::new();
    for term in &terms {
        for (a, b) in SYNONYMS {
            if term == a {
                synonym_additions.push((*b).to_string());
            } else if term == b {
                synonym_additions.push((*a).to_string());
            }
        }
    }
    terms.extend(synonym_additions);

    terms.sort();
    terms.dedup();
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_camel_case() {
        let words = split_identifier("getUserById");
        assert_eq!(words, vec!["get", "user", "by", "id"]);
    }

    #[test]
    fn splits_snake_case() {
        let words = split_identifier("context_pack_access");
        assert_eq!(words, vec!["context", "pack", "access"]);
    }

    #[test]
    fn expansion_adds_synonyms() {
        let terms = expand_query("auth handler");
        assert!(terms.contains(&"authentication".to_string()));
        assert!(terms.contains(&"auth".to_string()));
    }

    #[test]
    fn expansion_includes_split_identifiers_and_dedupes() {
        let terms = expand_query("getUserAuth getUserAuth");
        assert!(terms.contains(&"get".to_string()));
        assert!(terms.contains(&"user".to_string()));
        let auth_count = terms.iter().filter(|t| *t == "auth").count();
        assert_eq!(auth_count, 1);
    }
}
