//! Statement compiler and clause composer
//!
//! Compilation is a pure function of the builder state: the statement
//! keyword comes first, then joins, WHERE, GROUP BY, ORDER BY, LIMIT and
//! OFFSET, whatever order the modifiers were called in. Every value ends up
//! in one map keyed by placeholder name; a name clash is an error rather
//! than a silent overwrite.

use super::where_clause::{Condition, Operator, Predicate, WhereClause};
use crate::database::types::SqlValue;
use crate::error::{Error, Result};
use indexmap::IndexMap;

/// Which statement a terminal call compiles
#[derive(Debug, Clone, PartialEq)]
pub enum StatementIntent {
    /// Column expressions; empty means `*`
    Select(Vec<String>),
    Insert(IndexMap<String, SqlValue>),
    Update(IndexMap<String, SqlValue>),
    Delete,
}

impl Default for StatementIntent {
    fn default() -> Self {
        StatementIntent::Select(Vec::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Right,
    Inner,
    Cross,
    /// Fragment rendered as-is
    Raw,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub fragment: String,
}

impl Join {
    fn render(&self) -> String {
        match self.kind {
            JoinKind::Left => format!(" LEFT JOIN {}", self.fragment),
            JoinKind::Right => format!(" RIGHT JOIN {}", self.fragment),
            JoinKind::Inner => format!(" INNER JOIN {}", self.fragment),
            JoinKind::Cross => format!(" CROSS JOIN {}", self.fragment),
            JoinKind::Raw => format!(" {}", self.fragment),
        }
    }
}

/// Everything after the statement keyword
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clauses {
    pub joins: Vec<Join>,
    pub conditions: WhereClause,
    pub group_by: Vec<String>,
    pub order_by: Vec<String>,
    /// Rendered verbatim, so `"20, 10"` is accepted
    pub limit: Option<String>,
    pub offset: Option<u64>,
}

/// SQL with named placeholders plus the values to bind
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub values: IndexMap<String, SqlValue>,
}

/// Compile a full statement for `table`
pub fn compile(table: &str, intent: &StatementIntent, clauses: &Clauses) -> Result<CompiledQuery> {
    let (mut sql, mut values) = compile_statement(table, intent)?;

    for join in &clauses.joins {
        sql.push_str(&join.render());
    }

    sql.push_str(&render_where(clauses.conditions.predicates(), &mut values)?);

    if !clauses.group_by.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&clauses.group_by.join(", "));
    }

    if !clauses.order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&clauses.order_by.join(", "));
    }

    if let Some(limit) = clauses.limit.as_deref().filter(|l| !l.trim().is_empty()) {
        sql.push_str(" LIMIT ");
        sql.push_str(limit);
    }

    if let Some(offset) = clauses.offset {
        sql.push_str(&format!(" OFFSET {}", offset));
    }

    #[cfg(debug_assertions)]
    {
        log::debug!("QueryBuilder SQL: {}", sql);
        log::debug!("  Parameters to bind: {:?}", values);
    }

    Ok(CompiledQuery { sql, values })
}

/// First fragment of the statement and its own bindings
pub fn compile_statement(
    table: &str,
    intent: &StatementIntent,
) -> Result<(String, IndexMap<String, SqlValue>)> {
    let mut values = IndexMap::new();

    let sql = match intent {
        StatementIntent::Select(columns) => {
            let columns = if columns.is_empty() {
                "*".to_string()
            } else {
                columns.join(", ")
            };
            format!("SELECT {} FROM {}", columns, table)
        }
        StatementIntent::Insert(data) => {
            if data.is_empty() {
                return Err(Error::invalid_argument(format!(
                    "No data provided for INSERT into {}",
                    table
                )));
            }
            let mut columns = Vec::with_capacity(data.len());
            let mut placeholders = Vec::with_capacity(data.len());
            for (column, value) in data {
                let name = placeholder_base(column)?;
                placeholders.push(format!(":{}", name));
                columns.push(column.as_str());
                insert_unique(&mut values, name, value.clone())?;
            }
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders.join(", ")
            )
        }
        StatementIntent::Update(data) => {
            if data.is_empty() {
                return Err(Error::invalid_argument(format!(
                    "No data provided for UPDATE of {}",
                    table
                )));
            }
            let mut assignments = Vec::with_capacity(data.len());
            for (column, value) in data {
                let name = placeholder_base(column)?;
                assignments.push(format!("{} = :{}", column, name));
                insert_unique(&mut values, name, value.clone())?;
            }
            format!("UPDATE {} SET {}", table, assignments.join(", "))
        }
        StatementIntent::Delete => format!("DELETE FROM {}", table),
    };

    Ok((sql, values))
}

/// Render the predicate list into ` WHERE ...`, adding its bindings
fn render_where(
    predicates: &[Predicate],
    values: &mut IndexMap<String, SqlValue>,
) -> Result<String> {
    let mut sql = String::new();

    for (index, predicate) in predicates.iter().enumerate() {
        let opens = "(".repeat(predicate.opens);
        let closes = ")".repeat(predicate.closes);

        match &predicate.condition {
            Condition::Raw { sql: raw, values: raw_values } => {
                sql.push(' ');
                sql.push_str(&opens);
                sql.push_str(raw);
                sql.push_str(&closes);
                for (name, value) in raw_values {
                    insert_unique(values, name.clone(), value.clone())?;
                }
            }
            Condition::Compare {
                field,
                operator,
                value,
            } => {
                if index == 0 {
                    sql.push_str(" WHERE ");
                } else {
                    sql.push(' ');
                    sql.push_str(predicate.conjunction.as_sql());
                    sql.push(' ');
                }
                sql.push_str(&opens);
                sql.push_str(&render_compare(index, field, *operator, value.as_ref(), values)?);
                sql.push_str(&closes);
            }
        }
    }

    Ok(sql)
}

fn render_compare(
    index: usize,
    field: &str,
    operator: Operator,
    value: Option<&SqlValue>,
    values: &mut IndexMap<String, SqlValue>,
) -> Result<String> {
    if operator.is_unary() {
        return Ok(format!("{} {}", field, operator));
    }

    let base = format!("{}{}", placeholder_base(field)?, index);

    if operator.is_list() {
        let items = list_items(field, operator, value)?;
        let mut placeholders = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            let name = format!("{}in{}", base, position);
            placeholders.push(format!(":{}", name));
            insert_unique(values, name, item.clone())?;
        }
        return Ok(format!("{} {} ({})", field, operator, placeholders.join(", ")));
    }

    if operator.is_range() {
        let items = list_items(field, operator, value)?;
        let [low, high] = items else {
            return Err(Error::invalid_argument(format!(
                "{} on '{}' needs exactly 2 values, got {}",
                operator,
                field,
                items.len()
            )));
        };
        let low_name = format!("{}btw0", base);
        let high_name = format!("{}btw1", base);
        let sql = format!("{} {} :{} AND :{}", field, operator, low_name, high_name);
        insert_unique(values, low_name, low.clone())?;
        insert_unique(values, high_name, high.clone())?;
        return Ok(sql);
    }

    let sql = format!("{} {} :{}", field, operator, base);
    insert_unique(values, base, value.cloned().unwrap_or(SqlValue::Null))?;
    Ok(sql)
}

fn list_items<'a>(
    field: &str,
    operator: Operator,
    value: Option<&'a SqlValue>,
) -> Result<&'a [SqlValue]> {
    match value {
        Some(SqlValue::Array(items)) => Ok(items),
        _ => Err(Error::invalid_argument(format!(
            "{} on '{}' needs a list of values",
            operator, field
        ))),
    }
}

/// Placeholder stem for a column expression: only `[A-Za-z0-9_]` survive,
/// so `u.age` gives `uage` and `` `order` `` gives `order`
pub fn placeholder_base(field: &str) -> Result<String> {
    let base: String = field
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();

    if base.is_empty() {
        return Err(Error::invalid_argument(format!(
            "Cannot derive a placeholder name from field '{}'",
            field
        )));
    }
    Ok(base)
}

fn insert_unique(
    values: &mut IndexMap<String, SqlValue>,
    name: String,
    value: SqlValue,
) -> Result<()> {
    if values.contains_key(&name) {
        return Err(Error::invalid_argument(format!(
            "Placeholder :{} is bound twice in one statement",
            name
        )));
    }
    values.insert(name, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::where_clause::WhereBuilder;

    fn select_with(conditions: WhereClause) -> CompiledQuery {
        let clauses = Clauses {
            conditions,
            ..Clauses::default()
        };
        compile("users", &StatementIntent::default(), &clauses).unwrap()
    }

    #[test]
    fn test_plain_select() {
        let compiled = compile("users", &StatementIntent::default(), &Clauses::default()).unwrap();
        assert_eq!(compiled.sql, "SELECT * FROM users");
        assert!(compiled.values.is_empty());
    }

    #[test]
    fn test_same_column_gets_distinct_placeholders() {
        let compiled = select_with(
            WhereClause::new()
                .where_op("age", Operator::Gt, 18)
                .unwrap()
                .where_op("age", Operator::Lt, 65)
                .unwrap()
                .or_where("age", 99)
                .unwrap(),
        );

        assert_eq!(
            compiled.sql,
            "SELECT * FROM users WHERE age > :age0 AND age < :age1 OR age = :age2"
        );
        assert_eq!(compiled.values.len(), 3);
    }

    #[test]
    fn test_in_and_between_naming() {
        let compiled = select_with(
            WhereClause::new()
                .where_in("u.id", vec![1, 2, 3])
                .unwrap()
                .where_between("age", vec![18, 30])
                .unwrap()
                .where_not_between("age", vec![40, 50])
                .unwrap(),
        );

        assert_eq!(
            compiled.sql,
            "SELECT * FROM users WHERE u.id IN (:uid0in0, :uid0in1, :uid0in2) \
             AND age BETWEEN :age1btw0 AND :age1btw1 \
             AND age NOT BETWEEN :age2btw0 AND :age2btw1"
        );
        assert_eq!(compiled.values.get("uid0in2"), Some(&SqlValue::Int(3)));
        assert_eq!(compiled.values.get("age2btw1"), Some(&SqlValue::Int(50)));
    }

    #[test]
    fn test_null_checks_have_no_placeholder() {
        let compiled = select_with(
            WhereClause::new()
                .where_null("deleted_at")
                .or_where_not_null("banned_at"),
        );
        assert_eq!(
            compiled.sql,
            "SELECT * FROM users WHERE deleted_at IS NULL OR banned_at IS NOT NULL"
        );
        assert!(compiled.values.is_empty());
    }

    #[test]
    fn test_group_renders_one_pair_of_parentheses() {
        let compiled = select_with(
            WhereClause::new()
                .where_("active", true)
                .unwrap()
                .where_group(|g| {
                    g.where_("role", "admin")?
                        .or_where("role", "owner")?
                        .or_where("role", "staff")
                })
                .unwrap(),
        );

        assert_eq!(
            compiled.sql,
            "SELECT * FROM users WHERE active = :active0 \
             AND (role = :role1 OR role = :role2 OR role = :role3)"
        );
        assert_eq!(compiled.sql.matches('(').count(), 1);
        assert_eq!(compiled.sql.matches(')').count(), 1);
    }

    #[test]
    fn test_nested_groups() {
        let compiled = select_with(
            WhereClause::new()
                .where_group(|g| {
                    g.where_("a", 1)?
                        .or_where_group(|inner| inner.where_("b", 2)?.where_("c", 3))
                })
                .unwrap()
                .where_("d", 4)
                .unwrap(),
        );

        assert_eq!(
            compiled.sql,
            "SELECT * FROM users WHERE (a = :a0 OR (b = :b1 AND c = :c2)) AND d = :d3"
        );
    }

    #[test]
    fn test_single_predicate_group() {
        let compiled = select_with(
            WhereClause::new()
                .where_("a", 1)
                .unwrap()
                .or_where_group(|g| g.where_("b", 2))
                .unwrap(),
        );
        assert_eq!(compiled.sql, "SELECT * FROM users WHERE a = :a0 OR (b = :b1)");
    }

    #[test]
    fn test_raw_where_is_verbatim() {
        let compiled = select_with(
            WhereClause::new()
                .where_("a", 1)
                .unwrap()
                .raw_where("AND score > :min", vec![("min", 10)]),
        );
        assert_eq!(
            compiled.sql,
            "SELECT * FROM users WHERE a = :a0 AND score > :min"
        );
        assert_eq!(compiled.values.get("min"), Some(&SqlValue::Int(10)));

        let leading = select_with(
            WhereClause::new().raw_where("WHERE deleted_at IS NULL", Vec::<(&str, i64)>::new()),
        );
        assert_eq!(leading.sql, "SELECT * FROM users WHERE deleted_at IS NULL");
    }

    #[test]
    fn test_raw_value_clash_is_rejected() {
        let clauses = Clauses {
            conditions: WhereClause::new()
                .where_("a", 1)
                .unwrap()
                .raw_where("OR a = :a0", vec![("a0", 2)]),
            ..Clauses::default()
        };
        let err = compile("t", &StatementIntent::default(), &clauses).unwrap_err();
        assert_eq!(err.error_code(), "E_INVALID_ARGUMENT");
    }

    #[test]
    fn test_clause_order_is_fixed() {
        let clauses = Clauses {
            joins: vec![
                Join {
                    kind: JoinKind::Left,
                    fragment: "orders o ON o.user_id = users.id".into(),
                },
                Join {
                    kind: JoinKind::Raw,
                    fragment: "NATURAL JOIN profiles".into(),
                },
            ],
            conditions: WhereClause::new().where_("o.status", "paid").unwrap(),
            group_by: vec!["users.id".into()],
            order_by: vec!["users.id DESC".into()],
            limit: Some("10".into()),
            offset: Some(20),
        };

        let compiled = compile(
            "users",
            &StatementIntent::Select(vec!["users.id".into(), "COUNT(o.id) AS n".into()]),
            &clauses,
        )
        .unwrap();

        assert_eq!(
            compiled.sql,
            "SELECT users.id, COUNT(o.id) AS n FROM users \
             LEFT JOIN orders o ON o.user_id = users.id NATURAL JOIN profiles \
             WHERE o.status = :ostatus0 GROUP BY users.id ORDER BY users.id DESC \
             LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_insert_and_update() {
        let data: IndexMap<String, SqlValue> = [
            ("name".to_string(), SqlValue::from("a")),
            ("age".to_string(), SqlValue::from(3)),
        ]
        .into_iter()
        .collect();

        let (sql, values) = compile_statement("t", &StatementIntent::Insert(data)).unwrap();
        assert_eq!(sql, "INSERT INTO t (name, age) VALUES (:name, :age)");
        assert_eq!(values.get("name"), Some(&SqlValue::from("a")));
        assert_eq!(values.get("age"), Some(&SqlValue::Int(3)));

        let data: IndexMap<String, SqlValue> =
            [("age".to_string(), SqlValue::from(4))].into_iter().collect();
        let (sql, values) = compile_statement("t", &StatementIntent::Update(data)).unwrap();
        assert_eq!(sql, "UPDATE t SET age = :age");
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_update_with_where_keeps_names_apart() {
        let data: IndexMap<String, SqlValue> =
            [("age".to_string(), SqlValue::from(4))].into_iter().collect();
        let clauses = Clauses {
            conditions: WhereClause::new().where_("age", 3).unwrap(),
            ..Clauses::default()
        };

        let compiled = compile("t", &StatementIntent::Update(data), &clauses).unwrap();
        assert_eq!(compiled.sql, "UPDATE t SET age = :age WHERE age = :age0");
        assert_eq!(compiled.values.get("age"), Some(&SqlValue::Int(4)));
        assert_eq!(compiled.values.get("age0"), Some(&SqlValue::Int(3)));
    }

    #[test]
    fn test_update_column_named_like_a_placeholder_clashes() {
        let data: IndexMap<String, SqlValue> =
            [("age0".to_string(), SqlValue::from(1))].into_iter().collect();
        let clauses = Clauses {
            conditions: WhereClause::new().where_("age", 3).unwrap(),
            ..Clauses::default()
        };

        let err = compile("t", &StatementIntent::Update(data), &clauses).unwrap_err();
        assert_eq!(err.error_code(), "E_INVALID_ARGUMENT");
        assert!(err.to_string().contains("age0"));
    }

    #[test]
    fn test_field_suffix_collision_is_rejected() {
        let mut conditions = WhereClause::new().where_("x", 0).unwrap().where_("a1", 1).unwrap();
        for i in 2..11 {
            conditions = conditions.where_("x", i).unwrap();
        }
        conditions = conditions.where_("a", 11).unwrap();

        let clauses = Clauses {
            conditions,
            ..Clauses::default()
        };
        let err = compile("t", &StatementIntent::default(), &clauses).unwrap_err();
        assert!(err.to_string().contains(":a11"));
    }

    #[test]
    fn test_empty_write_data_is_invalid() {
        let err = compile_statement("t", &StatementIntent::Insert(IndexMap::new())).unwrap_err();
        assert_eq!(err.error_code(), "E_INVALID_ARGUMENT");
        let err = compile_statement("t", &StatementIntent::Update(IndexMap::new())).unwrap_err();
        assert_eq!(err.error_code(), "E_INVALID_ARGUMENT");
    }

    #[test]
    fn test_delete() {
        let clauses = Clauses {
            conditions: WhereClause::new().where_("id", 9).unwrap(),
            ..Clauses::default()
        };
        let compiled = compile("t", &StatementIntent::Delete, &clauses).unwrap();
        assert_eq!(compiled.sql, "DELETE FROM t WHERE id = :id0");
    }

    #[test]
    fn test_placeholder_base_sanitizes() {
        assert_eq!(placeholder_base("u.age").unwrap(), "uage");
        assert_eq!(placeholder_base("`order`").unwrap(), "order");
        assert_eq!(placeholder_base("LOWER(name)").unwrap(), "LOWERname");
        assert!(placeholder_base("..").is_err());
    }
}
