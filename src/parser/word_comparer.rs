use crate::parser::QueryParser;

/// Case-insensitive keyword matcher over the scanner's char buffer.
#[derive(Debug, Default)]
pub struct WordComparer {
    pub length: usize,
    pub word: Vec<char>,
    boundary: bool,
}

impl WordComparer {
    pub fn new(word: &str) -> Self {
        Self {
            length: word.chars().count(),
            word: word.to_uppercase().chars().collect(),
            boundary: true,
        }
    }

    pub fn is_word_char(ch: char) -> bool {
        ch.is_ascii_alphanumeric() || ch == '_'
    }

    pub fn compare(&self, parser: &QueryParser) -> bool {
        self.compare_at(parser, parser.position)
    }

    pub fn compare_at(&self, parser: &QueryParser, position: usize) -> bool {
        if position + self.length > parser.length {
            return false;
        }

        let mut index = 0;
        while index < self.length {
            if self.word[index] != parser.text_v[position + index].to_ascii_uppercase() {
                return false;
            }
            index += 1;
        }

        if !self.boundary {
            return true;
        }

        // keyword must end at a word boundary
        match parser.text_v.get(position + self.length) {
            Some(next) => !Self::is_word_char(*next),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::{QueryParser, WordComparer};

    #[test]
    pub fn test_compare_case_insensitive() {
        let parser = QueryParser::new("where age > 16");
        let comparer = WordComparer::new("WHERE");

        assert!(comparer.compare(&parser));
    }

    #[test]
    pub fn test_compare_requires_boundary() {
        let parser = QueryParser::new("wherever age > 16");
        let comparer = WordComparer::new("WHERE");

        assert!(!comparer.compare(&parser));
    }

    #[test]
    pub fn test_compare_at_end_of_input() {
        let parser = QueryParser::new("LIMIT");
        let comparer = WordComparer::new("LIMIT");

        assert!(comparer.compare(&parser));
    }

    #[test]
    pub fn test_compare_out_of_range() {
        let parser = QueryParser::new("LIM");
        let comparer = WordComparer::new("LIMIT");

        assert!(!comparer.compare(&parser));
    }
}
