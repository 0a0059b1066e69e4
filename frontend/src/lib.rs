pub mod diagnostics;
pub mod elaborator;
pub mod parser;
pub mod pipeline;
pub mod scope;
pub mod surface;
pub mod token;

pub use pipeline::{check_source, PipelineError};

#[cfg(test)]
mod tests {
    use crate::parser::Parser;
    use crate::token::{Token, TokenKind, Tokenizer};

    /// Concatenating the source slices of all tokens gives back the source
    /// with whitespace and comments removed.
    #[test]
    fn token_spans_cover_exactly_the_non_trivia_source() {
        let source = "def twice {- nested {- ! -} -} (f : A -> A) : A -> A -- tail\n  := fun x : A => f (f x);";
        let mut tokenizer = Tokenizer::new(source);
        let mut tokens: Vec<Token> = Vec::new();
        loop {
            let token = tokenizer.next_token().expect("tokenize should succeed");
            if token.kind == TokenKind::Eof {
                break;
            }
            tokens.push(token);
        }
        let rebuilt: String = tokens
            .iter()
            .map(|t| &source[t.span.start.offset..t.span.end.offset])
            .collect();
        let stripped: String = {
            // Reference rendition: drop comments, then whitespace.
            let mut out = String::new();
            let mut rest = source;
            while let Some(i) = rest.find("{-") {
                out.push_str(&rest[..i]);
                let mut depth = 1;
                let mut j = i + 2;
                while depth > 0 {
                    if rest[j..].starts_with("{-") {
                        depth += 1;
                        j += 2;
                    } else if rest[j..].starts_with("-}") {
                        depth -= 1;
                        j += 2;
                    } else {
                        j += 1;
                    }
                }
                rest = &rest[j..];
            }
            out.push_str(rest);
            let no_line: String = out
                .lines()
                .map(|line| line.split("--").next().unwrap_or(line))
                .collect::<Vec<_>>()
                .join("\n");
            no_line.split_whitespace().collect()
        };
        assert_eq!(rebuilt, stripped);
    }

    #[test]
    fn parse_then_reparse_of_spans_is_stable() {
        let source = "def apply (A B : Prop) (f : A -> B) (x : A) : B := f x;";
        let mut parser = Parser::new(source);
        let first = parser.parse_program().expect("parse should succeed");
        let mut parser = Parser::new(source);
        let second = parser.parse_program().expect("parse should succeed");
        assert_eq!(first, second);
    }
}
