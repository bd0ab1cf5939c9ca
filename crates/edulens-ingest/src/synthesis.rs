//! Helpers shared by the model-backed synthesizers.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// The first `max_chars` characters of `text`.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Pull a JSON array out of a model response.
///
/// Tolerates code fences and prose around the array, including prose that
/// itself contains brackets: every `[` is tried as the start of an array.
/// Elements that do not deserialize as `T` are skipped, and the first
/// array with at least one usable element wins. `None` when no array can
/// be parsed at all.
pub(crate) fn parse_json_array<T: DeserializeOwned>(response: &str) -> Option<Vec<T>> {
    let mut fallback = None;

    for (start, _) in response.match_indices('[') {
        let mut stream =
            serde_json::Deserializer::from_str(&response[start..]).into_iter::<Vec<Value>>();
        let values = match stream.next() {
            Some(Ok(values)) => values,
            Some(Err(e)) => {
                debug!("No JSON array at offset {}: {}", start, e);
                continue;
            }
            None => continue,
        };

        let parsed: Vec<T> = values
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect();
        if !parsed.is_empty() {
            return Some(parsed);
        }
        fallback.get_or_insert(parsed);
    }

    if fallback.is_none() {
        debug!("Model response holds no JSON array");
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 2), "he");
        assert_eq!(truncate_chars("日本語です", 3), "日本語");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_parse_json_array_variants() {
        let fenced = "```json\n[1, 2, 3]\n```";
        assert_eq!(parse_json_array::<u32>(fenced), Some(vec![1, 2, 3]));

        let mixed = r#"Sure! [1, "two", 3] Hope that helps."#;
        assert_eq!(parse_json_array::<u32>(mixed), Some(vec![1, 3]));

        assert_eq!(parse_json_array::<u32>("no json here"), None);
        assert_eq!(parse_json_array::<u32>("] backwards ["), None);
        assert_eq!(parse_json_array::<u32>("[1, 2"), None);
        assert_eq!(parse_json_array::<u32>("[]"), Some(vec![]));
    }

    #[test]
    fn test_parse_json_array_skips_bracketed_prose() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Named {
            name: String,
        }

        let reply = "Here are the topics [as JSON]:\n[{\"name\": \"Mitosis\", \"confidence\": 0.9}]";
        assert_eq!(
            parse_json_array::<Named>(reply),
            Some(vec![Named {
                name: "Mitosis".to_string()
            }])
        );

        // A leading array of the wrong shape does not hide the real one.
        let counted = r#"I found [1] topic: [{"name": "Cells"}]"#;
        assert_eq!(
            parse_json_array::<Named>(counted),
            Some(vec![Named {
                name: "Cells".to_string()
            }])
        );
    }
}
