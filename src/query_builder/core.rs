//! Query builder facade
//!
//! Modifiers consume and return the builder; terminal calls borrow it,
//! compile the current state and hand the result to a fresh [`Query`].
//! Joins, conditions, grouping, ordering and limits survive terminal calls,
//! so one builder can run `count()` and then `all()` over the same filter.

use super::compose::{compile, Clauses, CompiledQuery, Join, JoinKind, StatementIntent};
use super::executor::{Fetched, Query};
use super::pagination::{FixedPage, PageSource, PageWindow, PaginationEnvelope};
use super::where_clause::{WhereBuilder, WhereClause};
use crate::database::driver::DatabaseConnection;
use crate::database::types::{Row, SqlValue};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::sync::Arc;

/// Fluent builder for statements against one table
pub struct QueryBuilder {
    connection: Arc<dyn DatabaseConnection>,
    table: String,
    intent: StatementIntent,
    clauses: Clauses,
    page_source: Arc<dyn PageSource>,
}

impl QueryBuilder {
    pub fn new(connection: Arc<dyn DatabaseConnection>, table: impl Into<String>) -> Self {
        Self {
            connection,
            table: table.into(),
            intent: StatementIntent::default(),
            clauses: Clauses::default(),
            page_source: Arc::new(FixedPage::default()),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Where [`QueryBuilder::paginate`] reads the page number from
    pub fn with_page_source(mut self, source: impl PageSource + 'static) -> Self {
        self.page_source = Arc::new(source);
        self
    }

    // Joins

    /// `LEFT JOIN <fragment>`, e.g. `left_join("orders o ON o.user_id = users.id")`
    pub fn left_join(self, fragment: &str) -> Self {
        self.join(JoinKind::Left, fragment)
    }

    pub fn right_join(self, fragment: &str) -> Self {
        self.join(JoinKind::Right, fragment)
    }

    pub fn inner_join(self, fragment: &str) -> Self {
        self.join(JoinKind::Inner, fragment)
    }

    pub fn cross_join(self, fragment: &str) -> Self {
        self.join(JoinKind::Cross, fragment)
    }

    /// Join fragment written out in full (`"NATURAL JOIN profiles"`)
    pub fn raw_join(self, fragment: &str) -> Self {
        self.join(JoinKind::Raw, fragment)
    }

    fn join(mut self, kind: JoinKind, fragment: &str) -> Self {
        self.clauses.joins.push(Join {
            kind,
            fragment: fragment.to_string(),
        });
        self
    }

    // Trailing clauses

    /// Append a GROUP BY expression; repeated calls are comma-joined
    pub fn group_by(mut self, expression: &str) -> Self {
        self.clauses.group_by.push(expression.to_string());
        self
    }

    /// Append an ORDER BY expression (`"id DESC"`); repeated calls are
    /// comma-joined
    pub fn order_by(mut self, expression: &str) -> Self {
        self.clauses.order_by.push(expression.to_string());
        self
    }

    /// LIMIT text rendered as given, so both `"10"` and `"20, 10"` work
    pub fn limit(mut self, limit: impl Into<String>) -> Self {
        self.clauses.limit = Some(limit.into());
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.clauses.offset = Some(offset);
        self
    }

    // Terminal calls

    /// Prepare a SELECT of `columns` (all columns when empty)
    pub fn select<I, S>(&mut self, columns: I) -> Result<Query>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.intent = StatementIntent::Select(columns.into_iter().map(Into::into).collect());
        self.prepare()
    }

    /// Prepare `SELECT *`
    pub fn select_all(&mut self) -> Result<Query> {
        self.select(Vec::<String>::new())
    }

    /// Prepare an INSERT of `data`, in the given column order
    pub fn insert<I, K, V>(&mut self, data: I) -> Result<Query>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SqlValue>,
    {
        self.intent = StatementIntent::Insert(collect_data(data));
        self.prepare()
    }

    /// Prepare an UPDATE setting `data` on the rows matched so far
    ///
    /// Each column binds under its own name, so a column such as `age0`
    /// collides with the placeholder of the first predicate on `age` and
    /// the call fails with `InvalidArgument`.
    pub fn update<I, K, V>(&mut self, data: I) -> Result<Query>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SqlValue>,
    {
        self.intent = StatementIntent::Update(collect_data(data));
        self.prepare()
    }

    /// Prepare a DELETE of the rows matched so far
    pub fn delete(&mut self) -> Result<Query> {
        self.intent = StatementIntent::Delete;
        self.prepare()
    }

    pub fn get(&mut self) -> Result<Fetched> {
        self.select_all()?.get()
    }

    pub fn get_one(&mut self) -> Result<Option<Row>> {
        self.select_all()?.get_one()
    }

    pub fn all(&mut self) -> Result<Vec<Row>> {
        self.select_all()?.all()
    }

    /// Number of rows matched by `SELECT *`
    pub fn count(&mut self) -> Result<u64> {
        self.select_all()?.count()
    }

    pub fn max(&mut self, field: &str) -> Result<SqlValue> {
        self.aggregate("MAX", field)
    }

    pub fn min(&mut self, field: &str) -> Result<SqlValue> {
        self.aggregate("MIN", field)
    }

    pub fn avg(&mut self, field: &str) -> Result<SqlValue> {
        self.aggregate("AVG", field)
    }

    pub fn sum(&mut self, field: &str) -> Result<SqlValue> {
        self.aggregate("SUM", field)
    }

    fn aggregate(&mut self, function: &str, field: &str) -> Result<SqlValue> {
        let row = self.select([format!("{}({})", function, field)])?.get_one()?;
        Ok(row
            .and_then(|row| row.value_at(0).cloned())
            .unwrap_or(SqlValue::Null))
    }

    /// Paginate with the builder's page source
    pub fn paginate<I, S>(&mut self, per_page: u64, columns: I) -> Result<PaginationEnvelope>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let page = self.page_source.page();
        self.paginate_page(page, per_page, columns)
    }

    /// Paginate with the page taken from `source`
    pub fn paginate_with<I, S>(
        &mut self,
        source: &dyn PageSource,
        per_page: u64,
        columns: I,
    ) -> Result<PaginationEnvelope>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paginate_page(source.page(), per_page, columns)
    }

    /// Count the matching rows, then fetch one page of them
    ///
    /// Any limit or offset set earlier is replaced; the page's
    /// `LIMIT offset, per_page` stays on the builder afterwards.
    fn paginate_page<I, S>(&mut self, page: u64, per_page: u64, columns: I) -> Result<PaginationEnvelope>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if per_page == 0 {
            return Err(Error::invalid_argument("Cannot paginate with 0 rows per page"));
        }
        let page = page.max(1);

        self.clauses.limit = None;
        self.clauses.offset = None;
        let total = self.count()?;

        let window = PageWindow::compute(total, per_page, page)?;
        self.clauses.limit = Some(format!("{}, {}", window.offset, per_page));
        let data = self.select(columns)?.all()?;

        log::debug!(
            "Paginated {}: page {} of {} ({} rows total)",
            self.table,
            page,
            window.last_page,
            total
        );

        Ok(PaginationEnvelope {
            total,
            per_page,
            current_page: page,
            last_page: window.last_page,
            next_page: window.next_page,
            prev_page: window.prev_page,
            from: window.from,
            to: window.to,
            data,
        })
    }

    /// Parameter dump of the current statement, prepared but not executed
    pub fn debug(&self) -> Result<String> {
        Ok(self.prepare()?.debug())
    }

    /// Compile the current statement without touching the connection
    pub fn to_sql(&self) -> Result<CompiledQuery> {
        compile(&self.table, &self.intent, &self.clauses)
    }

    fn prepare(&self) -> Result<Query> {
        let compiled = self.to_sql()?;
        Query::prepare(Arc::clone(&self.connection), &compiled.sql)?.values(compiled.values)
    }
}

impl WhereBuilder for QueryBuilder {
    fn where_clause_mut(&mut self) -> &mut WhereClause {
        &mut self.clauses.conditions
    }
}

fn collect_data<I, K, V>(data: I) -> IndexMap<String, SqlValue>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<SqlValue>,
{
    data.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}
