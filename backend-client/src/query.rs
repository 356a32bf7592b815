use std::fmt::Display;

/// Filter, ordering and paging for one table read, rendered as the query
/// parameters the hosted table API understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    table: &'static str,
    select: String,
    filters: Vec<(String, String)>,
    order: Option<(String, bool)>,
    range: Option<(u32, u32)>,
}

impl TableQuery {
    pub fn from(table: &'static str) -> Self {
        Self {
            table,
            select: "*".to_string(),
            filters: Vec::new(),
            order: None,
            range: None,
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value)));
        self
    }

    pub fn in_list<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        let joined = values
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.filters
            .push((column.to_string(), format!("in.({})", joined)));
        self
    }

    pub fn order(mut self, column: &str, descending: bool) -> Self {
        self.order = Some((column.to_string(), descending));
        self
    }

    /// `limit` rows starting at `offset`.
    pub fn range(mut self, offset: u32, limit: u32) -> Self {
        self.range = Some((offset, limit));
        self
    }

    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.filters.len() + 4);
        params.push(("select".to_string(), self.select.clone()));
        params.extend(self.filters.iter().cloned());
        if let Some((column, descending)) = &self.order {
            let direction = if *descending { "desc" } else { "asc" };
            params.push(("order".to_string(), format!("{}.{}", column, direction)));
        }
        if let Some((offset, limit)) = self.range {
            params.push(("offset".to_string(), offset.to_string()));
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}
