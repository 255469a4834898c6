//! Product search over titles.

/// Case-insensitive substring filter for product titles.
///
/// The query is matched literally; characters such as `.` or `*` have no
/// special meaning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TitleQuery {
    needle: String,
}

impl TitleQuery {
    /// Builds a filter from an optional `q` parameter. An absent or empty query
    /// means "no filter" and yields `None`.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let raw = raw.filter(|value| !value.is_empty())?;
        Some(Self { needle: raw.to_lowercase() })
    }

    pub fn matches(&self, title: &str) -> bool {
        title.to_lowercase().contains(&self.needle)
    }
}
