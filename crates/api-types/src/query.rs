//! Syntactic parsing of JSON:API query parameters.
//!
//! `Query::parse` understands `fields[<type>]`, `include`, `filter[<name>]`,
//! `sort` and the two `page[..]` styles. Validation against a resource
//! registry (declared relationships, known attributes) happens in the engine,
//! not here.

use indexmap::IndexMap;
use thiserror::Error;

use crate::pagination::PageParams;

/// Errors produced while parsing the query string.
#[derive(Debug, Error)]
pub enum QueryParseError {
    #[error("query parameter `{parameter}` expects an integer, got `{value}`")]
    InvalidNumber { parameter: String, value: String },

    #[error("page size must be at least 1")]
    ZeroPageSize,

    #[error("`page[number]`/`page[size]` cannot be combined with `page[offset]`/`page[limit]`")]
    MixedPageStyles,

    #[error("unsupported page parameter `{0}`")]
    UnknownPageParameter(String),
}

impl QueryParseError {
    /// The query parameter the error should be attributed to.
    pub fn parameter(&self) -> &str {
        match self {
            QueryParseError::InvalidNumber { parameter, .. } => parameter,
            QueryParseError::ZeroPageSize => "page[size]",
            QueryParseError::MixedPageStyles => "page",
            QueryParseError::UnknownPageParameter(_) => "page",
        }
    }
}

/// Sort direction; `-` prefixed fields sort descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// One key of the `sort` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

/// Parsed query parameters of a JSON:API request.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Sparse fieldsets: resource type -> requested field names.
    pub fields: IndexMap<String, Vec<String>>,
    /// Include paths, each split on `.`.
    pub include: Vec<Vec<String>>,
    /// Equality filters: attribute name -> value.
    pub filter: IndexMap<String, String>,
    pub sort: Vec<SortKey>,
    pub page: Option<PageParams>,
}

impl Query {
    /// Parse decoded key/value pairs from the query string.
    pub fn parse<'a, I>(pairs: I) -> Result<Self, QueryParseError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut query = Query::default();
        let mut page_raw: IndexMap<String, u64> = IndexMap::new();

        for (key, value) in pairs {
            if let Some(inner) = bracket_key(key, "fields") {
                query
                    .fields
                    .insert(inner.to_owned(), comma_list(value));
            } else if let Some(inner) = bracket_key(key, "filter") {
                query.filter.insert(inner.to_owned(), value.to_owned());
            } else if let Some(inner) = bracket_key(key, "page") {
                let parsed: u64 =
                    value
                        .parse()
                        .map_err(|_| QueryParseError::InvalidNumber {
                            parameter: key.to_owned(),
                            value: value.to_owned(),
                        })?;
                page_raw.insert(inner.to_owned(), parsed);
            } else if key == "include" {
                query.include = comma_list(value)
                    .into_iter()
                    .map(|path| path.split('.').map(str::to_owned).collect())
                    .collect();
            } else if key == "sort" {
                query.sort = comma_list(value)
                    .into_iter()
                    .map(|field| match field.strip_prefix('-') {
                        Some(rest) => SortKey {
                            field: rest.to_owned(),
                            direction: Direction::Desc,
                        },
                        None => SortKey {
                            field,
                            direction: Direction::Asc,
                        },
                    })
                    .collect();
            }
            // Unknown top-level parameters are ignored.
        }

        query.page = parse_page(page_raw)?;
        Ok(query)
    }

    /// Sparse fieldset for `resource_type`, if one was requested.
    pub fn fieldset(&self, resource_type: &str) -> Option<&[String]> {
        self.fields.get(resource_type).map(Vec::as_slice)
    }
}

fn parse_page(raw: IndexMap<String, u64>) -> Result<Option<PageParams>, QueryParseError> {
    if raw.is_empty() {
        return Ok(None);
    }
    for key in raw.keys() {
        if !matches!(key.as_str(), "number" | "size" | "offset" | "limit") {
            return Err(QueryParseError::UnknownPageParameter(key.clone()));
        }
    }
    let numbered = raw.contains_key("number") || raw.contains_key("size");
    let offset = raw.contains_key("offset") || raw.contains_key("limit");
    if numbered && offset {
        return Err(QueryParseError::MixedPageStyles);
    }
    let page = if numbered {
        let size = raw.get("size").copied().unwrap_or(0);
        if size == 0 {
            return Err(QueryParseError::ZeroPageSize);
        }
        PageParams::Number {
            number: raw.get("number").copied().unwrap_or(1).max(1),
            size,
        }
    } else {
        let limit = raw.get("limit").copied().unwrap_or(0);
        if limit == 0 {
            return Err(QueryParseError::ZeroPageSize);
        }
        PageParams::Offset {
            offset: raw.get("offset").copied().unwrap_or(0),
            limit,
        }
    };
    Ok(Some(page))
}

fn bracket_key<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)?
        .strip_prefix('[')?
        .strip_suffix(']')
}

fn comma_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pairs: &[(&str, &str)]) -> Query {
        Query::parse(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn parses_sparse_fieldsets_and_include() {
        let query = parse(&[
            ("fields[users]", "username,email"),
            ("include", "author.roles,comments"),
        ]);
        assert_eq!(
            query.fieldset("users"),
            Some(&["username".to_owned(), "email".to_owned()][..])
        );
        assert_eq!(query.include.len(), 2);
        assert_eq!(query.include[0], vec!["author", "roles"]);
    }

    #[test]
    fn parses_sort_directions() {
        let query = parse(&[("sort", "title,-created_at")]);
        assert_eq!(query.sort[0].direction, Direction::Asc);
        assert_eq!(query.sort[1].field, "created_at");
        assert_eq!(query.sort[1].direction, Direction::Desc);
    }

    #[test]
    fn parses_both_page_styles() {
        let numbered = parse(&[("page[number]", "2"), ("page[size]", "5")]);
        assert_eq!(
            numbered.page,
            Some(PageParams::Number { number: 2, size: 5 })
        );

        let offset = parse(&[("page[offset]", "10"), ("page[limit]", "5")]);
        assert_eq!(
            offset.page,
            Some(PageParams::Offset { offset: 10, limit: 5 })
        );
    }

    #[test]
    fn rejects_mixed_page_styles() {
        let err = Query::parse([("page[number]", "2"), ("page[limit]", "5")]).unwrap_err();
        assert!(matches!(err, QueryParseError::MixedPageStyles));
    }

    #[test]
    fn rejects_non_numeric_page() {
        let err = Query::parse([("page[size]", "lots")]).unwrap_err();
        assert!(matches!(err, QueryParseError::InvalidNumber { .. }));
        assert_eq!(err.parameter(), "page[size]");
    }
}
