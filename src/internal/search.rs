use regex::{Regex, RegexBuilder};

/// Search type - how to interpret the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchType {
    #[default]
    Literal,
    Regex,
}

impl SearchType {
    pub fn toggle(&self) -> Self {
        match self {
            Self::Literal => Self::Regex,
            Self::Regex => Self::Literal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Literal => "Literal",
            Self::Regex => "Regex",
        }
    }
}

/// Filter applied to the step table.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub query: String,
    pub search_type: SearchType,
    compiled_regex: Option<Regex>,
    pub regex_error: Option<String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>, search_type: SearchType) -> Self {
        let query = query.into();
        let (compiled_regex, regex_error) = match search_type {
            SearchType::Regex => match RegexBuilder::new(&query).case_insensitive(true).build() {
                Ok(re) => (Some(re), None),
                Err(e) => (None, Some(format!("Regex error: {}", e))),
            },
            SearchType::Literal => (None, None),
        };

        Self {
            query,
            search_type,
            compiled_regex,
            regex_error,
        }
    }

    pub fn literal(query: impl Into<String>) -> Self {
        Self::new(query, SearchType::Literal)
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    /// Case-insensitive match. An invalid regex matches nothing.
    pub fn matches(&self, text: &str) -> bool {
        match self.search_type {
            SearchType::Literal => text.to_lowercase().contains(&self.query.to_lowercase()),
            SearchType::Regex => match &self.compiled_regex {
                Some(re) => re.is_match(text),
                None => false,
            },
        }
    }
}
