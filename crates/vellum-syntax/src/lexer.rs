//! # Lexer - Tokenizing Fixture Notation
//!
//! Breaks notation source into tokens using the [Logos] lexer generator.
//!
//! [Logos]: https://docs.rs/logos
//!
//! Like the rest of this crate, the lexer is **lossless**: every byte of the
//! input belongs to exactly one token, so the parser can always recover the
//! exact source slice of a text run.
//!
//! ```
//! use vellum_syntax::lexer::lex;
//!
//! let input = "<p class=\"lead\">hello</p>";
//! let tokens = lex(input);
//!
//! let reconstructed: String = tokens.iter().map(|t| t.text).collect();
//! assert_eq!(input, reconstructed);
//! ```
//!
//! Tokens are context-free. Inside a tag `=` separates an attribute from its
//! value; between tags the same token is ordinary text. The parser decides.

use logos::Logos;

/// Token kinds produced by the Logos lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"")]
pub enum TokenKind {
    /// `</` starting a closing tag
    #[token("</")]
    CloseTagStart,

    /// `/>` ending a self-closing tag
    #[token("/>")]
    SelfClose,

    /// `<` starting an opening tag
    #[token("<")]
    TagStart,

    /// `>` ending a tag
    #[token(">")]
    TagEnd,

    /// `=` between attribute name and value
    #[token("=")]
    Equals,

    /// Double-quoted attribute value, quotes included
    #[regex(r#""[^"]*""#)]
    Quoted,

    /// Element, mark or attribute name
    #[regex(r"[A-Za-z_][A-Za-z0-9_:.\-]*", priority = 3)]
    Name,

    /// Spaces, tabs and line endings
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    /// Anything else; only meaningful between tags
    #[regex(r#"[^<>="/ \t\r\n]+"#, priority = 1)]
    Text,
}

/// A lexed token with its kind, text slice and byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// `None` when Logos could not classify the byte (a lone `/` or `"`).
    pub kind: Option<TokenKind>,
    pub text: &'a str,
    pub span: std::ops::Range<usize>,
}

impl Token<'_> {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == Some(kind)
    }
}

/// Lex the input into a sequence of tokens.
///
/// Guarantees that all bytes from the input appear in the output tokens.
pub fn lex(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(input);

    while let Some(result) = lexer.next() {
        tokens.push(Token {
            kind: result.ok(),
            text: lexer.slice(),
            span: lexer.span(),
        });
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(input: &str) -> Vec<Option<TokenKind>> {
        lex(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_empty_input() {
        assert_eq!(lex(""), vec![]);
    }

    #[test]
    fn lex_simple_element() {
        assert_eq!(
            kinds("<p>hi</p>"),
            vec![
                Some(TokenKind::TagStart),
                Some(TokenKind::Name),
                Some(TokenKind::TagEnd),
                Some(TokenKind::Name),
                Some(TokenKind::CloseTagStart),
                Some(TokenKind::Name),
                Some(TokenKind::TagEnd),
            ]
        );
    }

    #[test]
    fn lex_attribute_with_quoted_value() {
        let tokens = lex(r#"<a href="x y">"#);
        let quoted = tokens.iter().find(|t| t.is(TokenKind::Quoted)).unwrap();
        assert_eq!(quoted.text, "\"x y\"");
    }

    #[test]
    fn lex_self_closing_tag() {
        assert_eq!(
            kinds("<br/>"),
            vec![
                Some(TokenKind::TagStart),
                Some(TokenKind::Name),
                Some(TokenKind::SelfClose),
            ]
        );
    }

    #[test]
    fn lex_punctuation_is_text() {
        let tokens = lex("1, 2!");
        assert_eq!(tokens[0].kind, Some(TokenKind::Text));
        assert_eq!(tokens[0].text, "1,");
    }

    #[test]
    fn lex_lone_slash_is_unclassified() {
        let tokens = lex("a/b");
        assert_eq!(tokens[1].kind, None);
        assert_eq!(tokens[1].text, "/");
    }

    #[test]
    fn lex_is_lossless() {
        let input = "<p data-x=\"1\">a = b > c / d \"q\"</p>\n";
        let reconstructed: String = lex(input).iter().map(|t| t.text).collect();
        assert_eq!(reconstructed, input);
    }
}
