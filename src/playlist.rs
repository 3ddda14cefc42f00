use tracing::warn;

/// A single raw line of a playlist file, tagged with its 0-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistLine {
    pub index: usize,
    pub text: String,
}

/// A metadata line paired with the URL line that follows it.
///
/// The metadata line is whatever occupies the line directly above the URL;
/// its content is not validated here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub metadata: PlaylistLine,
    pub url: PlaylistLine,
}

impl Entry {
    /// The URL to probe, with surrounding whitespace stripped.
    #[must_use]
    pub fn url_text(&self) -> &str {
        self.url.text.trim()
    }
}

/// Scans raw playlist lines and pairs every URL line with the line above it.
///
/// A line is a URL line when its trimmed text starts with `http`. A URL on
/// the very first line has no metadata line to pair with and is skipped with
/// a warning.
#[must_use]
pub fn extract_entries(lines: &[String]) -> Vec<Entry> {
    let mut entries = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if !line.trim().starts_with("http") {
            continue;
        }
        if index == 0 {
            warn!("Skipping URL on first line, it has no metadata line: {}", line.trim());
            continue;
        }

        entries.push(Entry {
            metadata: PlaylistLine {
                index: index - 1,
                text: lines[index - 1].clone(),
            },
            url: PlaylistLine {
                index,
                text: line.clone(),
            },
        });
    }

    entries
}

/// Serializes surviving entries back to playlist text, metadata line first,
/// one line per [`PlaylistLine`], in order.
#[must_use]
pub fn render_entries(entries: &[Entry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.metadata.text);
        out.push('\n');
        out.push_str(&entry.url.text);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn pairs_url_lines_with_preceding_metadata() {
        let lines = lines(&[
            "#EXTINF:-1,A",
            "http://dead.example",
            "#EXTINF:-1,B",
            "http://live.example",
        ]);

        let entries = extract_entries(&lines);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].metadata.text, "#EXTINF:-1,A");
        assert_eq!(entries[0].url.text, "http://dead.example");
        assert_eq!(entries[0].url.index, 1);
        assert_eq!(entries[1].metadata.index, 2);
        assert_eq!(entries[1].url.text, "http://live.example");
    }

    #[test]
    fn skips_url_on_first_line() {
        let lines = lines(&["http://orphan.example", "#EXTINF:-1,A", "http://ok.example"]);

        let entries = extract_entries(&lines);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url.text, "http://ok.example");
    }

    #[test]
    fn ignores_non_url_lines() {
        let lines = lines(&["#EXTM3U", "", "# just a comment", "not-a-url"]);

        assert!(extract_entries(&lines).is_empty());
    }

    #[test]
    fn recognizes_urls_with_leading_whitespace() {
        let lines = lines(&["#EXTINF:-1,A", "  https://padded.example  "]);

        let entries = extract_entries(&lines);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url_text(), "https://padded.example");
    }

    #[test]
    fn renders_entries_as_line_pairs() {
        let lines = lines(&["#EXTINF:-1,A", "http://a.example", "#EXTINF:-1,B", "http://b.example"]);
        let entries = extract_entries(&lines);

        let rendered = render_entries(&entries);

        assert_eq!(
            rendered,
            "#EXTINF:-1,A\nhttp://a.example\n#EXTINF:-1,B\nhttp://b.example\n"
        );
    }
}
