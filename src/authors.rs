pub const EMBEDDED_AUTHORS: &str = include_str!("../assets/authors.txt");

#[derive(Debug, Clone, Default)]
pub struct AuthorIndex {
    names: Vec<String>,
    keys: Vec<String>,
}

impl AuthorIndex {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries: Vec<(String, String)> = names
            .into_iter()
            .map(|name| {
                let name = name.into();
                (name.to_lowercase(), name)
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let (keys, names) = entries.into_iter().unzip();
        Self { names, keys }
    }

    pub fn from_lines(data: &str) -> Self {
        Self::new(
            data.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    pub fn embedded() -> Self {
        Self::from_lines(EMBEDDED_AUTHORS)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// An empty prefix matches nothing; a `limit` of zero means no limit.
    pub fn search(&self, prefix: &str, limit: usize) -> Vec<&str> {
        let query = prefix.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let start = self.keys.partition_point(|key| key.as_str() < query.as_str());
        let matches = self.keys[start..]
            .iter()
            .zip(&self.names[start..])
            .take_while(|(key, _)| key.starts_with(&query))
            .map(|(_, name)| name.as_str());

        if limit == 0 {
            matches.collect()
        } else {
            matches.take(limit).collect()
        }
    }
}
