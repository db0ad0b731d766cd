use crate::parser::{QueryComparers, WordComparer};

/// Character scanner over one DSL source string.
///
/// The scanner does not know the grammar; it exposes positional primitives
/// (`current`/`next`/`jump`) plus clause segmentation: `take_clause_body`
/// consumes everything up to the next top-level clause keyword, which is how
/// multi-line `WHERE`/`AGGREGATE`/`DB_SPECIFIC` bodies get buffered and
/// flushed exactly once.
#[derive(Debug)]
pub struct QueryParser {
    pub position: usize,
    pub length: usize,
    pub text_v: Vec<char>,
    pub text: String,

    pub comparers: &'static QueryComparers,
}

impl QueryParser {
    pub fn new(query: &str) -> Self {
        let text_v: Vec<char> = query.chars().collect();
        Self {
            position: 0,
            length: text_v.len(),
            text_v,
            text: query.to_string(),
            comparers: QueryComparers::global(),
        }
    }

    pub fn eof(&self) -> bool {
        self.position >= self.length
    }

    pub fn current(&self) -> char {
        if self.position < self.length {
            return self.text_v[self.position];
        }

        '\0'
    }

    pub fn next(&mut self) {
        self.position += 1;
    }

    pub fn next_non_whitespace(&mut self) {
        while !self.eof() && self.current().is_whitespace() {
            self.next();
        }
    }

    pub fn jump(&mut self, ahead: usize) {
        if self.position + ahead < self.length {
            self.position += ahead;
        } else {
            self.position = self.length;
        }
    }

    pub fn text_from_range(&self, start: usize, end: usize) -> String {
        let mut end = end;
        if end > self.length {
            end = self.length;
        }
        self.text_v[start..end].iter().collect()
    }

    /// Consumes and returns the next whitespace-delimited word.
    pub fn take_word(&mut self) -> String {
        self.next_non_whitespace();
        let pivot = self.position;
        while !self.eof() && !self.current().is_whitespace() {
            self.next();
        }
        self.text_from_range(pivot, self.position)
    }

    /// Consumes everything up to the next top-level clause keyword (or EOF)
    /// and returns it trimmed. Keywords inside quoted strings do not
    /// terminate the body.
    pub fn take_clause_body(&mut self) -> String {
        let pivot = self.position;
        let mut quote: Option<char> = None;
        let mut at_word_start = true;

        while !self.eof() {
            let current = self.current();

            if let Some(open) = quote {
                if current == open {
                    quote = None;
                }
                self.next();
                at_word_start = false;
                continue;
            }

            if current == '\'' || current == '"' {
                quote = Some(current);
                self.next();
                at_word_start = false;
                continue;
            }

            if at_word_start
                && self.position > pivot
                && self.comparers.is_clause_start(self, self.position)
            {
                break;
            }

            at_word_start = !WordComparer::is_word_char(current);
            self.next();
        }

        self.text_from_range(pivot, self.position).trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::QueryParser;

    #[test]
    pub fn test_take_word() {
        let mut parser = QueryParser::new("  users  WHERE age > 16");

        assert_eq!(parser.take_word(), "users");
        assert_eq!(parser.take_word(), "WHERE");
    }

    #[test]
    pub fn test_take_clause_body_stops_at_keyword() {
        let mut parser = QueryParser::new("age > 16 AND city = 'Porto' ORDER BY age");

        let body = parser.take_clause_body();

        assert_eq!(body, "age > 16 AND city = 'Porto'");
        assert!(parser.comparers.order_by.compare(&parser));
    }

    #[test]
    pub fn test_take_clause_body_ignores_quoted_keywords() {
        let mut parser = QueryParser::new("name = 'ORDER BY' LIMIT 5");

        let body = parser.take_clause_body();

        assert_eq!(body, "name = 'ORDER BY'");
    }

    #[test]
    pub fn test_take_clause_body_spans_lines() {
        let mut parser = QueryParser::new("age > 16\n  AND vip = true\nLIMIT 3");

        let body = parser.take_clause_body();

        assert_eq!(body, "age > 16\n  AND vip = true");
    }
}
