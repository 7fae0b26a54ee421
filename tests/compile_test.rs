mod common;

use sqlfluent::prelude::*;

fn users() -> QueryBuilder {
    common::memory_db().table("users")
}

#[test]
fn test_end_to_end_example_compiles() {
    let query = users()
        .where_token("age", ">", 18)
        .unwrap()
        .or_where("vip", true)
        .unwrap()
        .order_by("id DESC")
        .limit("10");

    let compiled = query.to_sql().unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM users WHERE age > :age0 OR vip = :vip1 ORDER BY id DESC LIMIT 10"
    );
    assert_eq!(compiled.values.len(), 2);
    assert_eq!(compiled.values["age0"], SqlValue::Int(18));
    assert_eq!(compiled.values["vip1"], SqlValue::Bool(true));
}

#[test]
fn test_many_predicates_on_one_column_never_collide() {
    let mut query = users();
    for i in 0..12 {
        query = query.or_where("age", i).unwrap();
    }
    query = query
        .where_in("age", vec![1, 2])
        .unwrap()
        .where_between("age", vec![3, 4])
        .unwrap()
        .where_between("age", vec![5, 6])
        .unwrap();

    let compiled = query.to_sql().unwrap();
    // 12 scalars, 2 IN elements and 2 x 2 bounds
    assert_eq!(compiled.values.len(), 18);
    assert_eq!(compiled.sql.matches(':').count(), 18);
    assert!(compiled.values.contains_key("age11"));
    assert!(compiled.values.contains_key("age12in1"));
    assert!(compiled.values.contains_key("age13btw0"));
    assert!(compiled.values.contains_key("age14btw1"));
}

#[test]
fn test_between_arity_is_checked() {
    for bounds in [vec![], vec![1], vec![1, 2, 3]] {
        let err = users().where_between("age", bounds).err().unwrap();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
    assert!(users().or_where_not_between("age", vec![1, 2]).is_ok());
}

#[test]
fn test_group_wraps_exactly_its_predicates() {
    for k in 1..=4 {
        let query = users()
            .where_("active", 1)
            .unwrap()
            .or_where_group(|mut g| {
                for i in 0..k {
                    g = g.where_("score", i)?;
                }
                Ok(g)
            })
            .unwrap();

        let sql = query.to_sql().unwrap().sql;
        assert_eq!(sql.matches('(').count(), 1, "{}", sql);
        assert_eq!(sql.matches(')').count(), 1, "{}", sql);
        assert!(sql.contains("OR (score = :score1"), "{}", sql);
        assert!(sql.ends_with(&format!("score = :score{})", k)), "{}", sql);
    }
}

#[test]
fn test_deep_nesting() {
    let query = users()
        .where_group(|a| {
            a.where_("a", 1)?.or_where_group(|b| {
                b.where_("b", 2)?.where_group(|c| c.where_("c", 3)?.or_where("d", 4))
            })
        })
        .unwrap();

    assert_eq!(
        query.to_sql().unwrap().sql,
        "SELECT * FROM users WHERE (a = :a0 OR (b = :b1 AND (c = :c2 OR d = :d3)))"
    );
}

#[test]
fn test_joins_and_trailing_clauses() {
    let query = users()
        .order_by("users.name")
        .inner_join("orders ON orders.user_id = users.id")
        .group_by("users.id")
        .where_op("orders.total", Operator::Gte, 100)
        .unwrap()
        .cross_join("settings")
        .offset(5)
        .limit("5");

    assert_eq!(
        query.to_sql().unwrap().sql,
        "SELECT * FROM users INNER JOIN orders ON orders.user_id = users.id CROSS JOIN settings \
         WHERE orders.total >= :orderstotal0 GROUP BY users.id ORDER BY users.name LIMIT 5 OFFSET 5"
    );
}

#[test]
fn test_like_regexp_and_not_equal_operators() {
    let query = users()
        .where_op("name", Operator::Like, "a%")
        .unwrap()
        .where_token("name", "not like", "%z")
        .unwrap()
        .or_where_token("email", "regexp", "^admin")
        .unwrap()
        .where_op("age", Operator::Ne, 30)
        .unwrap()
        .where_op("age", Operator::NotEq, 31)
        .unwrap();

    assert_eq!(
        query.to_sql().unwrap().sql,
        "SELECT * FROM users WHERE name LIKE :name0 AND name NOT LIKE :name1 \
         OR email REGEXP :email2 AND age <> :age3 AND age != :age4"
    );
}
