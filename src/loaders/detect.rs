//! Key-based format detection helpers
//!
//! Detection is a pure function of the key: compression suffixes are
//! stripped first, then the extension of the last path segment is matched.

/// Known compression suffixes
pub const COMPRESSION_TYPES: [(&str, &str); 2] = [("gz", ".gz"), ("bz2", ".bz2")];

/// Compression type implied by the key suffix
pub fn get_compression(key: &str) -> Option<&'static str> {
    COMPRESSION_TYPES
        .iter()
        .find(|(_, ext)| key.ends_with(ext))
        .map(|(kind, _)| *kind)
}

/// Key without its compression suffix
pub fn strip_compression(key: &str) -> &str {
    COMPRESSION_TYPES
        .iter()
        .find_map(|(_, ext)| key.strip_suffix(ext))
        .unwrap_or(key)
}

/// Final path segment of a key
pub fn basename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Lowercased extension including the dot (`".csv"`); dotfiles have none
pub fn extension(key: &str) -> Option<String> {
    let name = basename(key);
    match name.rfind('.') {
        Some(i) if i > 0 => Some(name[i..].to_lowercase()),
        _ => None,
    }
}

pub fn ext_is(key: &str, ext: &str) -> bool {
    extension(key).as_deref() == Some(ext)
}

pub fn ext_in(key: &str, exts: &[&str]) -> bool {
    extension(key).is_some_and(|e| exts.contains(&e.as_str()))
}

/// Language name used for highlighting, derived from the extension
pub fn language(key: &str) -> String {
    let stripped = strip_compression(key);
    match extension(stripped).as_deref() {
        Some(".json") | Some(".jsonl") | Some(".ndjson") | Some(".ipynb") => "json".to_string(),
        Some(".md") | Some(".markdown") | Some(".rmd") => "markdown".to_string(),
        Some(".yml") | Some(".yaml") => "yaml".to_string(),
        Some(".py") => "python".to_string(),
        Some(".rs") => "rust".to_string(),
        Some(".sh") | Some(".bash") | Some(".zsh") => "bash".to_string(),
        Some(ext) => ext.trim_start_matches('.').to_string(),
        None => "plaintext".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression() {
        assert_eq!(get_compression("data.csv.gz"), Some("gz"));
        assert_eq!(get_compression("data.csv.bz2"), Some("bz2"));
        assert_eq!(get_compression("data.csv"), None);
        assert_eq!(strip_compression("a/data.csv.gz"), "a/data.csv");
        assert_eq!(strip_compression("a/data.csv"), "a/data.csv");
    }

    #[test]
    fn test_extension_follows_last_segment() {
        assert_eq!(extension("dir.v2/README").as_deref(), None);
        assert_eq!(extension("dir/.bashrc").as_deref(), None);
        assert_eq!(extension("dir/Table.CSV").as_deref(), Some(".csv"));
        assert_eq!(extension("a.tar.gz").as_deref(), Some(".gz"));
    }

    #[test]
    fn test_ext_matchers() {
        assert!(ext_is("x/y.json", ".json"));
        assert!(ext_in("x/y.htm", &[".html", ".htm"]));
        assert!(!ext_in("x/y", &[".html"]));
    }

    #[test]
    fn test_language() {
        assert_eq!(language("a/b.json.gz"), "json");
        assert_eq!(language("notes.txt"), "txt");
        assert_eq!(language("Makefile"), "plaintext");
    }
}
