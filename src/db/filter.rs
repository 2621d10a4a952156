use rusqlite::types::ToSql;

/// A search field whose SQL fragment is fixed at compile time. Each
/// fragment carries exactly one `?` placeholder.
pub trait FilterField: Copy {
    fn predicate(self) -> &'static str;
}

/// Parameterized `WHERE` clause assembled from enumerated filter fields.
/// User input only ever reaches SQLite as a bound parameter.
#[derive(Default)]
pub struct Predicates {
    clauses: Vec<&'static str>,
    params: Vec<Box<dyn ToSql>>,
}

impl Predicates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F, T>(&mut self, field: F, value: T) -> &mut Self
    where
        F: FilterField,
        T: ToSql + 'static,
    {
        self.clauses.push(field.predicate());
        self.params.push(Box::new(value));
        self
    }

    pub fn push_opt<F, T>(&mut self, field: F, value: Option<T>) -> &mut Self
    where
        F: FilterField,
        T: ToSql + 'static,
    {
        if let Some(value) = value {
            self.push(field, value);
        }
        self
    }

    /// Substring match; `%` and `_` in the input are matched literally.
    pub fn push_contains<F: FilterField>(&mut self, field: F, value: Option<&str>) -> &mut Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => self.push(field, format!("%{}%", escape_like(v))),
            _ => self,
        }
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p.as_ref() as &dyn ToSql).collect()
    }

    /// Filter parameters followed by trailing ones such as `LIMIT`/`OFFSET`.
    pub fn params_with<'a>(&'a self, extra: &[&'a dyn ToSql]) -> Vec<&'a dyn ToSql> {
        let mut params = self.params();
        params.extend_from_slice(extra);
        params
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    enum TestField {
        Status,
        Name,
    }

    impl FilterField for TestField {
        fn predicate(self) -> &'static str {
            match self {
                TestField::Status => "status = ?",
                TestField::Name => "name LIKE ? ESCAPE '\\'",
            }
        }
    }

    #[test]
    fn test_empty_predicates_produce_no_where() {
        let preds = Predicates::new();
        assert_eq!(preds.where_sql(), "");
        assert!(preds.params().is_empty());
    }

    #[test]
    fn test_clauses_joined_with_and() {
        let mut preds = Predicates::new();
        preds
            .push(TestField::Status, "confirmed".to_string())
            .push_opt(TestField::Name, None::<String>)
            .push_contains(TestField::Name, Some("An"));
        assert_eq!(preds.where_sql(), " WHERE status = ? AND name LIKE ? ESCAPE '\\'");
        assert_eq!(preds.len(), 2);
    }

    #[test]
    fn test_blank_contains_is_skipped() {
        let mut preds = Predicates::new();
        preds.push_contains(TestField::Name, Some("   "));
        assert!(preds.is_empty());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }

    #[test]
    fn test_params_bind_against_sqlite() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (status TEXT, name TEXT);
             INSERT INTO t VALUES ('confirmed', 'Anna'), ('confirmed', 'Bob'), ('cancelled', 'Annie');",
        )
        .unwrap();

        let mut preds = Predicates::new();
        preds
            .push(TestField::Status, "confirmed".to_string())
            .push_contains(TestField::Name, Some("Ann"));

        let sql = format!("SELECT COUNT(*) FROM t{}", preds.where_sql());
        let count: i64 = conn
            .query_row(&sql, preds.params().as_slice(), |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
