//! Declared-filename handling: sanitisation, stem/extension split,
//! collision suffixes and the extension filter.

/// Characters Unicode treats as line boundaries that are not already
/// covered by [`char::is_control`].
const EXTRA_LINE_BREAKS: [char; 2] = ['\u{2028}', '\u{2029}'];

/// Turn an untrusted declared filename into a single safe path component.
///
/// Line breaks and other control characters are removed outright (so
/// `"evil\nname.txt"` becomes `"evilname.txt"`), path separators become
/// `_`. Returns `None` when nothing usable is left.
pub fn sanitize_filename(declared: &str) -> Option<String> {
    let cleaned: String = declared
        .chars()
        .filter(|c| !c.is_control() && !EXTRA_LINE_BREAKS.contains(c))
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => None,
        _ => Some(cleaned),
    }
}

/// Split a filename into stem and extension (extension keeps its dot).
///
/// Leading dots belong to the stem, so `".bashrc"` has no extension and
/// `"archive.tar.gz"` splits into `"archive.tar"` and `".gz"`.
pub fn split_extension(filename: &str) -> (&str, &str) {
    let leading_dots = filename.len() - filename.trim_start_matches('.').len();
    match filename[leading_dots..].rfind('.') {
        Some(pos) => filename.split_at(leading_dots + pos),
        None => (filename, ""),
    }
}

/// Name for the `occurrence`-th distinct content stored under `filename`.
///
/// The first occurrence keeps the bare name; later ones get `stem(n).ext`.
pub fn occurrence_name(filename: &str, occurrence: usize) -> String {
    if occurrence <= 1 {
        return filename.to_string();
    }
    let (stem, ext) = split_extension(filename);
    format!("{stem}({occurrence}){ext}")
}

/// Ordered set of accepted filename suffixes, matched case-insensitively.
///
/// An empty filter accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionFilter {
    suffixes: Vec<String>,
}

impl ExtensionFilter {
    /// Build a filter from suffixes such as `".jpg"` or `"gif"`.
    ///
    /// Entries are lowercased and given a leading dot; blanks and repeats are dropped.
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for raw in suffixes {
            let s = raw.as_ref().trim().to_lowercase();
            if s.is_empty() || s == "." {
                continue;
            }
            let s = if s.starts_with('.') { s } else { format!(".{s}") };
            if !normalized.contains(&s) {
                normalized.push(s);
            }
        }
        Self {
            suffixes: normalized,
        }
    }

    /// Filter that accepts every filename.
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Whether `filename` passes the filter.
    pub fn accepts(&self, filename: &str) -> bool {
        if self.suffixes.is_empty() {
            return true;
        }
        let lower = filename.to_lowercase();
        self.suffixes.iter().any(|s| lower.ends_with(s.as_str()))
    }

    /// The normalised suffixes, in the order given.
    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }
}
