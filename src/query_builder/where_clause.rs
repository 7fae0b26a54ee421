//! Predicate tree for WHERE clauses
//!
//! Predicates are kept in insertion order. Parenthesized groups are not
//! stored as nodes: the first predicate of a group counts one more opening
//! parenthesis and the last one counts one more closing parenthesis, so the
//! composer can render the tree in a single pass.

use crate::database::types::SqlValue;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::fmt;

/// Comparison operators accepted in predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// `!=`
    NotEq,
    /// `<>`
    Ne,
    Like,
    NotLike,
    IsNull,
    IsNotNull,
    In,
    NotIn,
    Between,
    NotBetween,
    Regexp,
}

impl Operator {
    pub const ALL: [Operator; 16] = [
        Operator::Eq,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::NotEq,
        Operator::Ne,
        Operator::Like,
        Operator::NotLike,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::In,
        Operator::NotIn,
        Operator::Between,
        Operator::NotBetween,
        Operator::Regexp,
    ];

    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::NotEq => "!=",
            Operator::Ne => "<>",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
            Operator::Regexp => "REGEXP",
        }
    }

    /// Recognize an operator token, ignoring case and surrounding or
    /// repeated whitespace (`"not  like"` is `NOT LIKE`)
    pub fn from_token(token: &str) -> Option<Self> {
        let normalized = token
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();

        Self::ALL
            .iter()
            .copied()
            .find(|op| op.as_sql() == normalized)
    }

    /// Operators rendered without an operand
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// Operators taking a parenthesized list
    pub fn is_list(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// Operators taking exactly two bounds
    pub fn is_range(&self) -> bool {
        matches!(self, Operator::Between | Operator::NotBetween)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Keyword joining a predicate to the one before it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

/// What a predicate tests
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field OP operand`; list and range operators hold an `Array`
    Compare {
        field: String,
        operator: Operator,
        value: Option<SqlValue>,
    },
    /// Literal SQL emitted verbatim, with its own bindings
    Raw {
        sql: String,
        values: IndexMap<String, SqlValue>,
    },
}

/// One node of the predicate tree
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub conjunction: Conjunction,
    pub condition: Condition,
    /// Number of groups opened right before this predicate
    pub opens: usize,
    /// Number of groups closed right after this predicate
    pub closes: usize,
}

impl Predicate {
    pub fn is_raw(&self) -> bool {
        matches!(self.condition, Condition::Raw { .. })
    }
}

/// Ordered list of predicates, possibly grouped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    predicates: Vec<Predicate>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn clear(&mut self) {
        self.predicates.clear();
    }

    /// Append a comparison after checking the operand against the operator
    pub fn push_compare(
        &mut self,
        conjunction: Conjunction,
        field: impl Into<String>,
        operator: Operator,
        value: Option<SqlValue>,
    ) -> Result<()> {
        let field = field.into();
        let value = normalize_operand(&field, operator, value)?;

        self.predicates.push(Predicate {
            conjunction,
            condition: Condition::Compare {
                field,
                operator,
                value,
            },
            opens: 0,
            closes: 0,
        });
        Ok(())
    }

    /// Append an `IS NULL` or `IS NOT NULL` test, which takes no operand
    pub fn push_unary(&mut self, conjunction: Conjunction, field: impl Into<String>, operator: Operator) {
        debug_assert!(operator.is_unary());
        self.predicates.push(Predicate {
            conjunction,
            condition: Condition::Compare {
                field: field.into(),
                operator,
                value: None,
            },
            opens: 0,
            closes: 0,
        });
    }

    pub fn push_raw(&mut self, sql: impl Into<String>, values: IndexMap<String, SqlValue>) {
        self.predicates.push(Predicate {
            conjunction: Conjunction::And,
            condition: Condition::Raw {
                sql: sql.into(),
                values,
            },
            opens: 0,
            closes: 0,
        });
    }

    /// Append the predicates of `group` wrapped in one pair of parentheses
    ///
    /// The outer conjunction replaces the one of the group's first predicate.
    /// An empty group adds nothing.
    pub fn push_group(&mut self, conjunction: Conjunction, group: WhereClause) {
        let mut predicates = group.predicates;
        let Some(first) = predicates.first_mut() else {
            return;
        };
        first.conjunction = conjunction;
        first.opens += 1;
        if let Some(last) = predicates.last_mut() {
            last.closes += 1;
        }
        self.predicates.extend(predicates);
    }
}

/// Check arity and shape of an operand for `operator`
fn normalize_operand(
    field: &str,
    operator: Operator,
    value: Option<SqlValue>,
) -> Result<Option<SqlValue>> {
    if operator.is_unary() {
        return Ok(None);
    }

    if operator.is_list() {
        let items = match value {
            Some(SqlValue::Array(items)) => items,
            Some(scalar) => vec![scalar],
            None => Vec::new(),
        };
        if items.is_empty() {
            return Err(Error::invalid_argument(format!(
                "{} on '{}' needs at least one value",
                operator, field
            )));
        }
        if items.iter().any(SqlValue::is_array) {
            return Err(Error::invalid_argument(format!(
                "{} on '{}' takes scalar values only",
                operator, field
            )));
        }
        return Ok(Some(SqlValue::Array(items)));
    }

    if operator.is_range() {
        return match value {
            Some(SqlValue::Array(items)) if items.len() == 2 => Ok(Some(SqlValue::Array(items))),
            Some(SqlValue::Array(items)) => Err(Error::invalid_argument(format!(
                "{} on '{}' needs exactly 2 values, got {}",
                operator,
                field,
                items.len()
            ))),
            _ => Err(Error::invalid_argument(format!(
                "{} on '{}' needs exactly 2 values",
                operator, field
            ))),
        };
    }

    match value {
        Some(SqlValue::Array(_)) => Err(Error::invalid_argument(format!(
            "Operator {} on '{}' takes a single value",
            operator, field
        ))),
        Some(value) => Ok(Some(value)),
        None => Ok(Some(SqlValue::Null)),
    }
}

/// Fluent predicate methods shared by [`WhereClause`] and the query builder
///
/// `where_*` and `and_where_*` join with `AND`, `or_where_*` with `OR`.
/// Methods whose operand can be malformed return `Result`.
pub trait WhereBuilder: Sized {
    /// Predicate tree the methods append to
    fn where_clause_mut(&mut self) -> &mut WhereClause;

    /// `field = value`; a list value compares with `IN`
    ///
    /// Placeholders are named `<field><index>`, so a name already taken by
    /// another binding of the same statement is an `InvalidArgument` when
    /// the statement compiles. Examples: an `update` column called `age0`
    /// next to the first predicate on `age`, or a predicate on `a1` at
    /// index 1 next to one on `a` at index 11 (both `:a11`).
    fn where_(mut self, field: &str, value: impl Into<SqlValue>) -> Result<Self> {
        push_equality(self.where_clause_mut(), Conjunction::And, field, value.into())?;
        Ok(self)
    }

    fn and_where(self, field: &str, value: impl Into<SqlValue>) -> Result<Self> {
        self.where_(field, value)
    }

    fn or_where(mut self, field: &str, value: impl Into<SqlValue>) -> Result<Self> {
        push_equality(self.where_clause_mut(), Conjunction::Or, field, value.into())?;
        Ok(self)
    }

    fn where_op(mut self, field: &str, operator: Operator, value: impl Into<SqlValue>) -> Result<Self> {
        self.where_clause_mut()
            .push_compare(Conjunction::And, field, operator, Some(value.into()))?;
        Ok(self)
    }

    fn and_where_op(self, field: &str, operator: Operator, value: impl Into<SqlValue>) -> Result<Self> {
        self.where_op(field, operator, value)
    }

    fn or_where_op(mut self, field: &str, operator: Operator, value: impl Into<SqlValue>) -> Result<Self> {
        self.where_clause_mut()
            .push_compare(Conjunction::Or, field, operator, Some(value.into()))?;
        Ok(self)
    }

    /// Token form: a recognized operator token uses `value` as the operand;
    /// any other token is itself the operand of `=` and `value` is ignored
    fn where_token(mut self, field: &str, token: &str, value: impl Into<SqlValue>) -> Result<Self> {
        push_token(self.where_clause_mut(), Conjunction::And, field, token, value.into())?;
        Ok(self)
    }

    fn and_where_token(self, field: &str, token: &str, value: impl Into<SqlValue>) -> Result<Self> {
        self.where_token(field, token, value)
    }

    fn or_where_token(mut self, field: &str, token: &str, value: impl Into<SqlValue>) -> Result<Self> {
        push_token(self.where_clause_mut(), Conjunction::Or, field, token, value.into())?;
        Ok(self)
    }

    fn where_null(mut self, field: &str) -> Self {
        self.where_clause_mut().push_unary(Conjunction::And, field, Operator::IsNull);
        self
    }

    fn and_where_null(self, field: &str) -> Self {
        self.where_null(field)
    }

    fn or_where_null(mut self, field: &str) -> Self {
        self.where_clause_mut().push_unary(Conjunction::Or, field, Operator::IsNull);
        self
    }

    fn where_not_null(mut self, field: &str) -> Self {
        self.where_clause_mut().push_unary(Conjunction::And, field, Operator::IsNotNull);
        self
    }

    fn and_where_not_null(self, field: &str) -> Self {
        self.where_not_null(field)
    }

    fn or_where_not_null(mut self, field: &str) -> Self {
        self.where_clause_mut().push_unary(Conjunction::Or, field, Operator::IsNotNull);
        self
    }

    fn where_in<I, V>(self, field: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.where_op(field, Operator::In, SqlValue::array(values))
    }

    fn and_where_in<I, V>(self, field: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.where_in(field, values)
    }

    fn or_where_in<I, V>(self, field: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.or_where_op(field, Operator::In, SqlValue::array(values))
    }

    fn where_not_in<I, V>(self, field: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.where_op(field, Operator::NotIn, SqlValue::array(values))
    }

    fn and_where_not_in<I, V>(self, field: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.where_not_in(field, values)
    }

    fn or_where_not_in<I, V>(self, field: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.or_where_op(field, Operator::NotIn, SqlValue::array(values))
    }

    fn where_between<I, V>(self, field: &str, bounds: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.where_op(field, Operator::Between, SqlValue::array(bounds))
    }

    fn and_where_between<I, V>(self, field: &str, bounds: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.where_between(field, bounds)
    }

    fn or_where_between<I, V>(self, field: &str, bounds: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.or_where_op(field, Operator::Between, SqlValue::array(bounds))
    }

    fn where_not_between<I, V>(self, field: &str, bounds: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.where_op(field, Operator::NotBetween, SqlValue::array(bounds))
    }

    fn and_where_not_between<I, V>(self, field: &str, bounds: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.where_not_between(field, bounds)
    }

    fn or_where_not_between<I, V>(self, field: &str, bounds: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.or_where_op(field, Operator::NotBetween, SqlValue::array(bounds))
    }

    /// Parenthesized group built by `build` on a fresh clause
    ///
    /// ```ignore
    /// builder.where_("active", true)?.where_group(|g| {
    ///     g.where_("role", "admin")?.or_where("role", "owner")
    /// })?;
    /// // ... WHERE active = :active0 AND (role = :role1 OR role = :role2)
    /// ```
    fn where_group<F>(mut self, build: F) -> Result<Self>
    where
        F: FnOnce(WhereClause) -> Result<WhereClause>,
    {
        let group = build(WhereClause::new())?;
        self.where_clause_mut().push_group(Conjunction::And, group);
        Ok(self)
    }

    fn and_where_group<F>(self, build: F) -> Result<Self>
    where
        F: FnOnce(WhereClause) -> Result<WhereClause>,
    {
        self.where_group(build)
    }

    fn or_where_group<F>(mut self, build: F) -> Result<Self>
    where
        F: FnOnce(WhereClause) -> Result<WhereClause>,
    {
        let group = build(WhereClause::new())?;
        self.where_clause_mut().push_group(Conjunction::Or, group);
        Ok(self)
    }

    /// Literal SQL appended verbatim, keyword included
    /// (`"WHERE deleted_at IS NULL"`, `"AND score > :min"`)
    fn raw_where<I, K, V>(mut self, sql: &str, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SqlValue>,
    {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.where_clause_mut().push_raw(sql, values);
        self
    }
}

impl WhereBuilder for WhereClause {
    fn where_clause_mut(&mut self) -> &mut WhereClause {
        self
    }
}

/// Push `field = value`; a list becomes `IN` and an empty one matches nothing
fn push_equality(
    clause: &mut WhereClause,
    conjunction: Conjunction,
    field: &str,
    value: SqlValue,
) -> Result<()> {
    let (operator, value) = match value {
        SqlValue::Array(items) if items.is_empty() => {
            (Operator::In, SqlValue::Array(vec![SqlValue::Null]))
        }
        list @ SqlValue::Array(_) => (Operator::In, list),
        scalar => (Operator::Eq, scalar),
    };
    clause.push_compare(conjunction, field, operator, Some(value))
}

fn push_token(
    clause: &mut WhereClause,
    conjunction: Conjunction,
    field: &str,
    token: &str,
    value: SqlValue,
) -> Result<()> {
    match Operator::from_token(token) {
        Some(operator) => clause.push_compare(conjunction, field, operator, Some(value)),
        None => clause.push_compare(
            conjunction,
            field,
            Operator::Eq,
            Some(SqlValue::String(token.to_string())),
        ),
    }
}
