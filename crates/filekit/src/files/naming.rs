//! File name helpers.

/// Name used for downloads whose URL carries no recognizable file name.
pub const UNKNOWN_FILE_NAME: &str = "unknown";

/// Last `/`-separated segment of `path`.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Extension of the file named by `path`.
///
/// Files without a dot and hidden files such as `.hidden` have no
/// extension. Only the last extension is returned (`tar.gz` -> `gz`).
pub fn file_extension(path: &str, to_lower: bool, include_dot: bool) -> String {
    let parts: Vec<&str> = file_name(path).split('.').collect();

    if parts.len() == 1 || (parts.len() == 2 && parts[0].is_empty()) {
        return String::new();
    }

    let ext = parts[parts.len() - 1];
    let ext = if to_lower {
        ext.to_lowercase()
    } else {
        ext.to_string()
    };

    if include_dot {
        format!(".{}", ext)
    } else {
        ext
    }
}

/// Cache directory for an order.
pub fn cache_dir(order_id: &str) -> String {
    format!("cache/{}/", order_id)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'
}

/// File name at the end of `url`: a run of `[A-Za-z0-9_.-]` characters
/// ending in `.` followed by lowercase letters.
pub fn file_name_from_url(url: &str) -> Option<&str> {
    let start = url
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_name_char(*c))
        .last()
        .map(|(i, _)| i)?;
    let candidate = &url[start..];

    let dot = candidate.rfind('.')?;
    let ext = &candidate[dot + 1..];
    if dot == 0 || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_lowercase()) {
        return None;
    }

    Some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("photos/2024/a.jpg"), "a.jpg");
        assert_eq!(file_name("a.jpg"), "a.jpg");
        assert_eq!(file_name("dir/"), "");
        assert_eq!(file_name(""), "");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("archive.tar.gz", true, true), ".gz");
        assert_eq!(file_extension("archive.tar.gz", false, false), "gz");
        assert_eq!(file_extension(".hidden", false, false), "");
        assert_eq!(file_extension("noext", true, true), "");
        assert_eq!(file_extension("Photo.JPG", true, false), "jpg");
        assert_eq!(file_extension("Photo.JPG", false, true), ".JPG");
    }

    #[test]
    fn test_file_extension_ignores_directories() {
        assert_eq!(file_extension("some.dir/noext", false, false), "");
        assert_eq!(file_extension("/a/b/.config.toml", false, false), "toml");
    }

    #[test]
    fn test_cache_dir() {
        assert_eq!(cache_dir("order42"), "cache/order42/");
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://cdn.example.com/media/clip-01_final.mov"),
            Some("clip-01_final.mov")
        );
        // Extensions with digits do not count
        assert_eq!(
            file_name_from_url("https://cdn.example.com/media/clip-01_final.mp4"),
            None
        );
        assert_eq!(file_name_from_url("https://example.com/memo.3gpp"), None);
        assert_eq!(
            file_name_from_url("https://example.com/archive.tar.gz"),
            Some("archive.tar.gz")
        );
        assert_eq!(file_name_from_url("https://example.com/Photo.JPG"), None);
        assert_eq!(file_name_from_url("https://example.com/download?id=7"), None);
        assert_eq!(file_name_from_url("https://example.com/.jpg"), None);
        assert_eq!(file_name_from_url(""), None);
    }
}
