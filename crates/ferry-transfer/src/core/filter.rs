use crate::data::RemoteObject;

/// Content filter for remote objects enumerated for download.
///
/// Zero-byte objects are folder placeholders and never pass, whatever
/// `min_size` says.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectFilter {
    extensions: Vec<String>,
    min_size:   u64,
}

impl ObjectFilter {
    pub fn new() -> Self { Self::default() }

    /// Allow-list of extensions, matched case-insensitively. `"webp"` and
    /// `".webp"` are equivalent. An empty list allows every extension.
    #[must_use]
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }

    #[must_use]
    pub fn min_size(mut self, min_size: u64) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn matches(&self, object: &RemoteObject) -> bool {
        object.size >= self.min_size.max(1) && self.extension_allowed(&object.key)
    }

    fn extension_allowed(&self, key: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let name = key.rsplit('/').next().unwrap_or(key);
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webp_filter_with_min_size() {
        let filter = ObjectFilter::new().extensions([".webp"]).min_size(1);
        let objects = [
            RemoteObject::new("frames/a.webp", 100),
            RemoteObject::new("frames/b.txt", 50),
            RemoteObject::new("frames/c.webp", 0),
        ];
        let kept: Vec<&str> = objects.iter().filter(|o| filter.matches(o)).map(|o| o.key.as_str()).collect();
        assert_eq!(kept, vec!["frames/a.webp"]);
    }

    #[test]
    fn test_default_filter_only_drops_placeholders() {
        let filter = ObjectFilter::default();
        assert!(filter.matches(&RemoteObject::new("a/b", 1)));
        assert!(!filter.matches(&RemoteObject::new("a/", 0)));
    }

    #[test]
    fn test_extension_case_and_dot_insensitive() {
        let filter = ObjectFilter::new().extensions(["WEBP", "jpg"]);
        assert!(filter.matches(&RemoteObject::new("x/1.webp", 1)));
        assert!(filter.matches(&RemoteObject::new("x/2.JPG", 1)));
        assert!(!filter.matches(&RemoteObject::new("x/3.png", 1)));
    }

    #[test]
    fn test_dotfiles_and_dotted_folders() {
        let filter = ObjectFilter::new().extensions(["webp"]);
        assert!(!filter.matches(&RemoteObject::new("x/.webp", 1)));
        assert!(!filter.matches(&RemoteObject::new("x.webp/readme", 1)));
    }

    #[test]
    fn test_min_size_above_one() {
        let filter = ObjectFilter::new().min_size(10);
        assert!(!filter.matches(&RemoteObject::new("a", 9)));
        assert!(filter.matches(&RemoteObject::new("a", 10)));
    }
}
