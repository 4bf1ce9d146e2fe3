use std::error::Error;
use std::fmt;

use crate::token::{keyword, Literal, Token, TokenType};

/// Single-pass scanner over one source text.
///
/// A scanner is built for exactly one pass: [`Scanner::scan_tokens`] consumes
/// it and hands every token and every diagnostic back to the caller, so no
/// state can leak between scans.
pub struct Scanner {
    source: String,
    tokens: Vec<Token>,
    errors: Vec<ScanError>,
    start: usize,
    start_line: u32,
    current: usize,
    line: u32,
}

impl Scanner {
    pub fn new(source: String) -> Self {
        Scanner {
            source,
            tokens: Vec::new(),
            errors: Vec::new(),
            start: 0,
            start_line: 1,
            current: 0,
            line: 1,
        }
    }

    /// Scans the whole source. The returned token sequence always ends with
    /// exactly one `Eof` token; lexical errors never abort the pass, they are
    /// collected and returned alongside the tokens.
    pub fn scan_tokens(mut self) -> (Vec<Token>, Vec<ScanError>) {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_line = self.line;
            self.scan_token();
        }

        self.tokens
            .push(Token::new(TokenType::Eof, "".to_string(), None, self.line));

        (self.tokens, self.errors)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn scan_token(&mut self) {
        match self.advance() {
            // Single character tokens
            '(' => self.add_token(TokenType::LeftParen, None),
            ')' => self.add_token(TokenType::RightParen, None),
            '{' => self.add_token(TokenType::LeftBrace, None),
            '}' => self.add_token(TokenType::RightBrace, None),
            ',' => self.add_token(TokenType::Comma, None),
            '.' => self.add_token(TokenType::Dot, None),
            '-' => self.add_token(TokenType::Minus, None),
            '+' => self.add_token(TokenType::Plus, None),
            ';' => self.add_token(TokenType::Semicolon, None),
            '*' => self.add_token(TokenType::Star, None),

            // One or two character tokens
            '!' => {
                if self.matches('=') {
                    self.add_token(TokenType::BangEqual, None)
                } else {
                    self.add_token(TokenType::Bang, None)
                }
            }
            '=' => {
                if self.matches('=') {
                    self.add_token(TokenType::EqualEqual, None)
                } else {
                    self.add_token(TokenType::Equal, None)
                }
            }
            '<' => {
                if self.matches('=') {
                    self.add_token(TokenType::LessEqual, None)
                } else {
                    self.add_token(TokenType::Less, None)
                }
            }
            '>' => {
                if self.matches('=') {
                    self.add_token(TokenType::GreaterEqual, None)
                } else {
                    self.add_token(TokenType::Greater, None)
                }
            }

            // Comments
            '/' => {
                if self.matches('/') {
                    // A comment goes until the end of the line; the newline
                    // itself is left for the next dispatch
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash, None)
                }
            }

            // Ignore whitespace
            ' ' | '\r' | '\t' => {}

            '\n' => self.line += 1,

            '"' => self.string(),

            c => {
                if Scanner::is_digit(c) {
                    self.number()
                } else if Scanner::is_alpha(c) {
                    self.identifier()
                } else {
                    self.error(ScanErrorKind::UnexpectedCharacter)
                }
            }
        }
    }

    fn string(&mut self) {
        while let Some(c) = self.peek() {
            if c == '"' {
                break;
            }
            if c == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.error(ScanErrorKind::UnterminatedString);
            return;
        }

        // Consume the closing "
        self.advance();

        // Trim surrounding quotes
        let value = self.source[self.start + 1..self.current - 1].to_string();
        self.add_token(TokenType::String, Some(Literal::String(value)));
    }

    fn number(&mut self) {
        while let Some(c) = self.peek() {
            if !Scanner::is_digit(c) {
                break;
            }
            self.advance();
        }

        // Look for a fractional part
        if let Some('.') = self.peek() {
            if let Some(c) = self.peek_next() {
                if Scanner::is_digit(c) {
                    // Consume .
                    self.advance();

                    while let Some(c) = self.peek() {
                        if !Scanner::is_digit(c) {
                            break;
                        }
                        self.advance();
                    }
                }
            }
        }

        let value = self.source[self.start..self.current].parse::<f64>().unwrap();
        self.add_token(TokenType::Number, Some(Literal::Number(value)));
    }

    fn identifier(&mut self) {
        while let Some(c) = self.peek() {
            if !Scanner::is_alphanumeric(c) {
                break;
            }
            self.advance();
        }

        let text = &self.source[self.start..self.current];
        let token_type = keyword(text).unwrap_or(TokenType::Identifier);
        self.add_token(token_type, None);
    }

    fn is_digit(c: char) -> bool {
        c.is_ascii_digit()
    }

    fn is_alpha(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    fn is_alphanumeric(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_'
    }

    fn peek(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.current..].chars();
        chars.next();
        chars.next()
    }

    fn matches(&mut self, expected: char) -> bool {
        match self.peek() {
            Some(c) if c == expected => {
                self.current += c.len_utf8();
                true
            }
            _ => false,
        }
    }

    fn advance(&mut self) -> char {
        // Only reachable while !is_at_end(), so there is a next character
        let c = self.source[self.current..].chars().next().unwrap();
        self.current += c.len_utf8();
        c
    }

    fn add_token(&mut self, token_type: TokenType, literal: Option<Literal>) {
        let lexeme = self.source[self.start..self.current].to_string();
        self.tokens
            .push(Token::new(token_type, lexeme, literal, self.start_line));
    }

    fn error(&mut self, kind: ScanErrorKind) {
        self.errors.push(ScanError::new(self.line, kind));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    line: u32,
    kind: ScanErrorKind,
}

impl ScanError {
    pub fn new(line: u32, kind: ScanErrorKind) -> Self {
        ScanError { line, kind }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn kind(&self) -> ScanErrorKind {
        self.kind
    }
}

impl Error for ScanError {}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error: {}", self.line, self.kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanErrorKind {
    UnexpectedCharacter,
    UnterminatedString,
}

impl fmt::Display for ScanErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            Self::UnexpectedCharacter => write!(f, "Unexpected character."),
            Self::UnterminatedString => write!(f, "Unterminated string."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType::*;

    fn scan(source: &str) -> (Vec<Token>, Vec<ScanError>) {
        Scanner::new(source.to_string()).scan_tokens()
    }

    fn kinds(source: &str) -> Vec<TokenType> {
        let (tokens, _) = scan(source);
        token_types(&tokens)
    }

    fn token_types(tokens: &[Token]) -> Vec<TokenType> {
        tokens.iter().map(|token| token.token_type).collect()
    }

    #[test]
    fn empty_source_scans_to_lone_eof() {
        let (tokens, errors) = scan("");
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_type, Eof);
        assert_eq!(tokens[0].lexeme, "");
        assert_eq!(tokens[0].literal, None);
        assert_eq!(tokens[0].line, 1);
    }

    #[test]
    fn single_character_tokens() {
        assert_eq!(
            kinds("(){},.-+;*/"),
            vec![
                LeftParen, RightParen, LeftBrace, RightBrace, Comma, Dot, Minus, Plus, Semicolon,
                Star, Slash, Eof
            ]
        );
    }

    #[test]
    fn operators_use_maximal_munch() {
        assert_eq!(
            kinds("! != = == < <= > >="),
            vec![
                Bang, BangEqual, Equal, EqualEqual, Less, LessEqual, Greater, GreaterEqual, Eof
            ]
        );
    }

    #[test]
    fn bang_equal_is_one_token() {
        let (tokens, errors) = scan("!=");
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].token_type, BangEqual);
        assert_eq!(tokens[0].lexeme, "!=");
    }

    #[test]
    fn var_declaration() {
        let (tokens, errors) = scan("var x = 10;");
        assert!(errors.is_empty());

        let expected = [
            (Var, "var"),
            (Identifier, "x"),
            (Equal, "="),
            (Number, "10"),
            (Semicolon, ";"),
            (Eof, ""),
        ];
        assert_eq!(tokens.len(), expected.len());
        for (token, (token_type, lexeme)) in tokens.iter().zip(expected) {
            assert_eq!(token.token_type, token_type);
            assert_eq!(token.lexeme, lexeme);
        }
        assert_eq!(tokens[3].literal, Some(Literal::Number(10.0)));
    }

    #[test]
    fn line_comment_produces_no_token_and_counts_lines() {
        let (tokens, errors) = scan("// comment\n42");
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].token_type, Number);
        assert_eq!(tokens[0].literal, Some(Literal::Number(42.0)));
        assert_eq!(tokens[0].line, 2);
    }

    #[test]
    fn comment_may_run_to_end_of_input() {
        assert_eq!(kinds("// runs to the end"), vec![Eof]);
    }

    #[test]
    fn slash_without_second_slash_is_division() {
        assert_eq!(kinds("8 / 2"), vec![Number, Slash, Number, Eof]);
    }

    #[test]
    fn string_literal_strips_quotes() {
        let (tokens, errors) = scan("\"hello world\"");
        assert!(errors.is_empty());
        assert_eq!(tokens[0].token_type, String);
        assert_eq!(tokens[0].lexeme, "\"hello world\"");
        assert_eq!(
            tokens[0].literal,
            Some(Literal::String("hello world".to_string()))
        );
    }

    #[test]
    fn empty_string_literal() {
        let (tokens, _) = scan("\"\"");
        assert_eq!(tokens[0].literal, Some(Literal::String("".to_string())));
    }

    #[test]
    fn string_with_embedded_comment_marker_is_still_a_string() {
        let (tokens, _) = scan("\"// not a comment\"");
        assert_eq!(tokens[0].token_type, String);
        assert_eq!(
            tokens[0].literal,
            Some(Literal::String("// not a comment".to_string()))
        );
    }

    #[test]
    fn multiline_string_counts_lines_and_keeps_opening_line() {
        let (tokens, errors) = scan("\"one\ntwo\"\nafter");
        assert!(errors.is_empty());
        assert_eq!(tokens[0].token_type, String);
        assert_eq!(
            tokens[0].literal,
            Some(Literal::String("one\ntwo".to_string()))
        );
        assert_eq!(tokens[0].line, 1);

        assert_eq!(tokens[1].token_type, Identifier);
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn unterminated_string_reports_and_produces_no_token() {
        let (tokens, errors) = scan("\"abc");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ScanErrorKind::UnterminatedString);
        assert_eq!(errors[0].line(), 1);
        assert_eq!(token_types(&tokens), vec![Eof]);
    }

    #[test]
    fn unterminated_string_reports_line_reached_at_end_of_input() {
        let (_, errors) = scan("\"one\ntwo\nthree");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line(), 3);
    }

    #[test]
    fn number_literals_parse_as_floats() {
        let (tokens, _) = scan("42 3.14");
        assert_eq!(tokens[0].literal, Some(Literal::Number(42.0)));
        assert_eq!(tokens[1].literal, Some(Literal::Number(3.14)));
    }

    #[test]
    fn trailing_dot_is_not_part_of_the_number() {
        let (tokens, errors) = scan("1.");
        assert!(errors.is_empty());
        assert_eq!(token_types(&tokens), vec![Number, Dot, Eof]);
        assert_eq!(tokens[0].lexeme, "1");
        assert_eq!(tokens[0].literal, Some(Literal::Number(1.0)));
    }

    #[test]
    fn leading_dot_is_not_part_of_the_number() {
        assert_eq!(kinds(".5"), vec![Dot, Number, Eof]);
    }

    #[test]
    fn dot_after_number_may_start_a_method_call() {
        assert_eq!(kinds("123.sqrt"), vec![Number, Dot, Identifier, Eof]);
    }

    #[test]
    fn keywords_scan_as_reserved_kinds() {
        assert_eq!(
            kinds("and class else false fun for if nil or print return super this true var while"),
            vec![
                And, Class, Else, False, Fun, For, If, Nil, Or, Print, Return, Super, This, True,
                Var, While, Eof
            ]
        );
    }

    #[test]
    fn keyword_prefix_scans_as_identifier() {
        let (tokens, _) = scan("classify");
        assert_eq!(tokens[0].token_type, Identifier);
        assert_eq!(tokens[0].lexeme, "classify");

        let (tokens, _) = scan("class");
        assert_eq!(tokens[0].token_type, Class);
    }

    #[test]
    fn identifiers_may_contain_underscores_and_digits() {
        let (tokens, _) = scan("_private foo_bar abc123");
        assert_eq!(
            token_types(&tokens),
            vec![Identifier, Identifier, Identifier, Eof]
        );
        assert_eq!(tokens[0].lexeme, "_private");
        assert_eq!(tokens[1].lexeme, "foo_bar");
        assert_eq!(tokens[2].lexeme, "abc123");
    }

    #[test]
    fn unexpected_character_is_reported_and_skipped() {
        let (tokens, errors) = scan("@+");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ScanErrorKind::UnexpectedCharacter);
        assert_eq!(errors[0].line(), 1);
        assert_eq!(token_types(&tokens), vec![Plus, Eof]);
    }

    #[test]
    fn one_pass_surfaces_every_error() {
        let (tokens, errors) = scan("@ # $");
        assert_eq!(errors.len(), 3);
        assert!(errors
            .iter()
            .all(|error| error.kind() == ScanErrorKind::UnexpectedCharacter));
        assert_eq!(token_types(&tokens), vec![Eof]);
    }

    #[test]
    fn mixed_errors_and_tokens_in_one_pass() {
        let (tokens, errors) = scan("var @ = \"open");
        assert_eq!(token_types(&tokens), vec![Var, Equal, Eof]);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].kind(), ScanErrorKind::UnexpectedCharacter);
        assert_eq!(errors[1].kind(), ScanErrorKind::UnterminatedString);
    }

    #[test]
    fn non_ascii_character_is_one_diagnostic() {
        let (tokens, errors) = scan("é1");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ScanErrorKind::UnexpectedCharacter);
        assert_eq!(token_types(&tokens), vec![Number, Eof]);
        assert_eq!(tokens[0].lexeme, "1");
    }

    #[test]
    fn every_scan_ends_with_exactly_one_eof() {
        for source in ["", "var x;", "\"open", "@@@@", "// only a comment"] {
            let (tokens, _) = scan(source);
            assert_eq!(tokens.last().map(|token| token.token_type), Some(Eof));
            let eof_count = tokens
                .iter()
                .filter(|token| token.token_type == Eof)
                .count();
            assert_eq!(eof_count, 1, "{:?}", source);
        }
    }

    #[test]
    fn scans_are_independent() {
        let (tokens, _) = scan("\nx");
        assert_eq!(tokens[0].line, 2);

        let (tokens, _) = scan("x");
        assert_eq!(tokens[0].line, 1);
    }

    #[test]
    fn carriage_return_and_tab_are_whitespace() {
        assert_eq!(kinds("\r\t ("), vec![LeftParen, Eof]);
    }

    #[test]
    fn crlf_line_endings_count_once() {
        let (tokens, _) = scan("one\r\ntwo");
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn eof_line_tracks_final_line() {
        let (tokens, _) = scan("a\nb\nc");
        assert_eq!(tokens.last().unwrap().line, 3);
    }

    #[test]
    fn error_display_form() {
        let error = ScanError::new(3, ScanErrorKind::UnexpectedCharacter);
        assert_eq!(error.to_string(), "[line 3] Error: Unexpected character.");

        let error = ScanError::new(1, ScanErrorKind::UnterminatedString);
        assert_eq!(error.to_string(), "[line 1] Error: Unterminated string.");
    }
}
