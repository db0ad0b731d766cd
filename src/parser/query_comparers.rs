use once_cell::sync::Lazy;

use crate::parser::{QueryParser, WordComparer};

/// The fixed clause lexicon. Built once at process start and shared by every
/// parser instance; never mutated afterwards.
#[derive(Debug)]
pub struct QueryComparers {
    pub find: WordComparer,
    pub fields: WordComparer,
    pub r#where: WordComparer,
    pub group_by: WordComparer,
    pub having: WordComparer,
    pub order_by: WordComparer,
    pub limit: WordComparer,
    pub offset: WordComparer,
    pub aggregate: WordComparer,
    pub db_specific: WordComparer,
    pub inner_join: WordComparer,
    pub left_outer_join: WordComparer,
    pub left_join: WordComparer,
    pub right_outer_join: WordComparer,
    pub right_join: WordComparer,
    pub full_outer_join: WordComparer,
    pub full_join: WordComparer,
    pub join: WordComparer,
}

static COMPARERS: Lazy<QueryComparers> = Lazy::new(QueryComparers::new);

impl Default for QueryComparers {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryComparers {
    pub fn new() -> Self {
        Self {
            find: WordComparer::new("FIND"),
            fields: WordComparer::new("FIELDS"),
            r#where: WordComparer::new("WHERE"),
            group_by: WordComparer::new("GROUP BY"),
            having: WordComparer::new("HAVING"),
            order_by: WordComparer::new("ORDER BY"),
            limit: WordComparer::new("LIMIT"),
            offset: WordComparer::new("OFFSET"),
            aggregate: WordComparer::new("AGGREGATE"),
            db_specific: WordComparer::new("DB_SPECIFIC"),
            inner_join: WordComparer::new("INNER JOIN"),
            left_outer_join: WordComparer::new("LEFT OUTER JOIN"),
            left_join: WordComparer::new("LEFT JOIN"),
            right_outer_join: WordComparer::new("RIGHT OUTER JOIN"),
            right_join: WordComparer::new("RIGHT JOIN"),
            full_outer_join: WordComparer::new("FULL OUTER JOIN"),
            full_join: WordComparer::new("FULL JOIN"),
            join: WordComparer::new("JOIN"),
        }
    }

    pub fn global() -> &'static QueryComparers {
        &COMPARERS
    }

    /// True when `position` starts a top-level clause keyword. Join variants
    /// count as clause starts so that a clause body never swallows a join.
    pub fn is_clause_start(&self, parser: &QueryParser, position: usize) -> bool {
        self.find.compare_at(parser, position)
            || self.fields.compare_at(parser, position)
            || self.r#where.compare_at(parser, position)
            || self.group_by.compare_at(parser, position)
            || self.having.compare_at(parser, position)
            || self.order_by.compare_at(parser, position)
            || self.limit.compare_at(parser, position)
            || self.offset.compare_at(parser, position)
            || self.aggregate.compare_at(parser, position)
            || self.db_specific.compare_at(parser, position)
            || self.inner_join.compare_at(parser, position)
            || self.left_join.compare_at(parser, position)
            || self.right_join.compare_at(parser, position)
            || self.full_join.compare_at(parser, position)
            || self.left_outer_join.compare_at(parser, position)
            || self.right_outer_join.compare_at(parser, position)
            || self.full_outer_join.compare_at(parser, position)
            || self.join.compare_at(parser, position)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::{QueryComparers, QueryParser};

    #[test]
    pub fn test_clause_start_detection() {
        let parser = QueryParser::new("ORDER BY age DESC");
        let comparers = QueryComparers::global();

        assert!(comparers.is_clause_start(&parser, 0));
        assert!(!comparers.is_clause_start(&parser, 9));
    }

    #[test]
    pub fn test_clause_start_join_variants() {
        let parser = QueryParser::new("LEFT OUTER JOIN orders ON a = b");
        let comparers = QueryComparers::global();

        assert!(comparers.is_clause_start(&parser, 0));
        assert!(comparers.left_outer_join.compare(&parser));
    }
}
