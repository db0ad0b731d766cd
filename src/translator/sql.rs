use crate::parser::UniversalQuery;
use crate::parser::ast::{Condition, Operator};

/// Renders the query as one SQL SELECT statement. Everything in the
/// operator lexicon has a direct SQL counterpart, so this generator cannot
/// fail.
pub fn translate_sql(query: &UniversalQuery) -> String {
    let mut sql = String::from("SELECT ");
    sql.push_str(&select_list(query));
    sql.push_str(" FROM ");
    sql.push_str(&query.table.qualified());

    for join in &query.joins {
        sql.push(' ');
        sql.push_str(&join.join_type.to_string());
        sql.push(' ');
        sql.push_str(&join.table);
        if let Some(alias) = &join.alias {
            sql.push_str(" AS ");
            sql.push_str(alias);
        }
        sql.push_str(" ON ");
        sql.push_str(&format!("{} {} {}", join.on.left, join.on.operator, join.on.right));
    }

    if !query.conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&fold_conditions(&query.conditions));
    }

    if !query.group_by.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&query.group_by.join(", "));
    }

    if !query.having.is_empty() {
        sql.push_str(" HAVING ");
        sql.push_str(&fold_conditions(&query.having));
    }

    if !query.order_by.is_empty() {
        let entries: Vec<String> = query
            .order_by
            .iter()
            .map(|order| format!("{} {}", order_field(query, &order.field), order.direction))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&entries.join(", "));
    }

    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    if let Some(offset) = query.offset {
        sql.push_str(&format!(" OFFSET {}", offset));
    }

    sql.push(';');
    sql
}

fn select_list(query: &UniversalQuery) -> String {
    if !query.aggregates.is_empty() {
        let mut entries: Vec<String> = query.group_by.clone();
        for aggregate in &query.aggregates {
            entries.push(format!(
                "{}({}) AS {}",
                aggregate.function, aggregate.field, aggregate.alias
            ));
        }
        return entries.join(", ");
    }

    if query.fields.is_empty() {
        return "*".to_string();
    }

    query.fields.join(", ")
}

/// ORDER BY entries referencing an aggregate alias are substituted with the
/// underlying `FUNC(field)` expression; not every targeted dialect can sort
/// by a not-yet-materialized alias.
fn order_field(query: &UniversalQuery, field: &str) -> String {
    for aggregate in &query.aggregates {
        if aggregate.alias == field {
            return format!("{}({})", aggregate.function, aggregate.field);
        }
    }
    field.to_string()
}

/// Folds the condition list left-to-right, joining each pair with its
/// recorded connector. No parenthesization is introduced.
fn fold_conditions(conditions: &[Condition]) -> String {
    let mut sql = String::new();

    for (index, condition) in conditions.iter().enumerate() {
        if index > 0 {
            sql.push(' ');
            sql.push_str(&conditions[index - 1].connector.to_string());
            sql.push(' ');
        }
        sql.push_str(&render_condition(condition));
    }

    sql
}

fn render_condition(condition: &Condition) -> String {
    let value = condition.value.as_sql();
    match condition.operator {
        // `!=` is emitted verbatim; the targeted dialects accept it
        Operator::Eq
        | Operator::NotEq
        | Operator::Gt
        | Operator::Lt
        | Operator::GtEq
        | Operator::LtEq => format!("{} {} {}", condition.field, condition.operator, value),
        Operator::In => format!("{} IN {}", condition.field, value),
        Operator::NotIn => format!("{} NOT IN {}", condition.field, value),
        Operator::Like => format!("{} LIKE {}", condition.field, value),
        Operator::ILike => format!("{} ILIKE {}", condition.field, value),
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse;
    use crate::translator::translate_sql;

    #[test]
    pub fn test_simple_find() {
        let query = parse("FIND users").unwrap();

        assert_eq!(translate_sql(&query), "SELECT * FROM users;");
    }

    #[test]
    pub fn test_fields_and_where() {
        let query =
            parse("FIND users FIELDS id, name WHERE age >= 18 AND city = 'Porto'").unwrap();

        assert_eq!(
            translate_sql(&query),
            "SELECT id, name FROM users WHERE age >= 18 AND city = 'Porto';"
        );
    }

    #[test]
    pub fn test_not_equal_is_verbatim() {
        let query = parse("FIND users WHERE status != 'archived'").unwrap();

        assert_eq!(
            translate_sql(&query),
            "SELECT * FROM users WHERE status != 'archived';"
        );
    }

    #[test]
    pub fn test_in_and_like() {
        let query =
            parse("FIND users WHERE status IN ('new', 'open') OR name LIKE 'A%'").unwrap();

        assert_eq!(
            translate_sql(&query),
            "SELECT * FROM users WHERE status IN ('new', 'open') OR name LIKE 'A%';"
        );
    }

    #[test]
    pub fn test_namespace_qualifier() {
        let query = parse("FIND sales.orders LIMIT 5").unwrap();

        assert_eq!(translate_sql(&query), "SELECT * FROM sales.orders LIMIT 5;");
    }

    #[test]
    pub fn test_join_rendering() {
        let query = parse(
            "FIND users LEFT JOIN orders ON users.id = orders.user_id \
             FULL JOIN audits AS a ON users.id = a.user_id",
        )
        .unwrap();

        assert_eq!(
            translate_sql(&query),
            "SELECT * FROM users \
             LEFT JOIN orders ON users.id = orders.user_id \
             FULL OUTER JOIN audits AS a ON users.id = a.user_id;"
        );
    }

    #[test]
    pub fn test_aggregate_select_list_and_alias_substitution() {
        let query = parse(
            "FIND orders AGGREGATE COUNT(id) AS order_count GROUP BY customer_id \
             ORDER BY order_count DESC",
        )
        .unwrap();

        assert_eq!(
            translate_sql(&query),
            "SELECT customer_id, COUNT(id) AS order_count FROM orders \
             GROUP BY customer_id ORDER BY COUNT(id) DESC;"
        );
    }

    #[test]
    pub fn test_having_and_offset() {
        let query = parse(
            "FIND orders AGGREGATE total: SUM(amount) GROUP BY customer_id \
             HAVING total > 100 LIMIT 10 OFFSET 20",
        )
        .unwrap();

        assert_eq!(
            translate_sql(&query),
            "SELECT customer_id, SUM(amount) AS total FROM orders \
             GROUP BY customer_id HAVING total > 100 LIMIT 10 OFFSET 20;"
        );
    }
}
