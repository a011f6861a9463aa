/// Case-insensitive substring match of track titles against configured patterns.
#[derive(Debug, Clone, Default)]
pub struct SkipFilter {
    patterns: Vec<String>,
}

impl SkipFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    pub fn matches(&self, title: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let title = title.to_lowercase();
        self.patterns.iter().any(|p| title.contains(p.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
