//! # Parser - Building the Markup Tree
//!
//! Consumes the token stream and produces a plain [`MarkupNode`] tree.
//!
//! The parser keeps an explicit stack of open elements instead of recursing,
//! so deeply nested fixtures cannot overflow the call stack. Between tags,
//! every token up to the next `<` or `</` is part of one text run; the run is
//! taken verbatim from the source and then entity-decoded.

use std::ops::Range;

use crate::error::ParseError;
use crate::lexer::{Token, TokenKind, lex};

/// A node of the parsed notation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(MarkupElement),
    Text(MarkupText),
}

/// `<name attr="value">children</name>` or `<name attr="value"/>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupElement {
    pub name: String,
    /// Attributes in source order. Valueless attributes map to `""`.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
    pub self_closing: bool,
    pub span: Range<usize>,
}

/// A run of character data between tags, entities already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupText {
    pub text: String,
    pub span: Range<usize>,
}

impl MarkupNode {
    pub fn span(&self) -> &Range<usize> {
        match self {
            MarkupNode::Element(element) => &element.span,
            MarkupNode::Text(text) => &text.span,
        }
    }

    pub fn as_element(&self) -> Option<&MarkupElement> {
        match self {
            MarkupNode::Element(element) => Some(element),
            MarkupNode::Text(_) => None,
        }
    }
}

impl MarkupElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// An element whose closing tag has not been seen yet.
struct OpenElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<MarkupNode>,
    start: usize,
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
}

/// Parse notation source into its top-level nodes.
pub fn parse(input: &str) -> Result<Vec<MarkupNode>, ParseError> {
    Parser {
        input,
        tokens: lex(input),
        pos: 0,
    }
    .run()
}

impl<'a> Parser<'a> {
    fn run(mut self) -> Result<Vec<MarkupNode>, ParseError> {
        let mut top_level: Vec<MarkupNode> = Vec::new();
        let mut stack: Vec<OpenElement> = Vec::new();

        while let Some(token) = self.peek() {
            if token.is(TokenKind::TagStart) {
                let start = token.span.start;
                self.pos += 1;
                let (name, attributes, self_closing) = self.tag_body()?;
                if self_closing {
                    let end = self.offset();
                    let element = MarkupNode::Element(MarkupElement {
                        name,
                        attributes,
                        children: Vec::new(),
                        self_closing: true,
                        span: start..end,
                    });
                    push_child(&mut stack, &mut top_level, element);
                } else {
                    stack.push(OpenElement {
                        name,
                        attributes,
                        children: Vec::new(),
                        start,
                    });
                }
            } else if token.is(TokenKind::CloseTagStart) {
                let offset = token.span.start;
                self.pos += 1;
                self.skip_whitespace();
                let name = self.expect(TokenKind::Name, "element name")?;
                self.skip_whitespace();
                self.expect(TokenKind::TagEnd, "`>`")?;

                let open = stack.pop().ok_or_else(|| ParseError::UnexpectedClose {
                    name: name.to_string(),
                    offset,
                })?;
                if open.name != name {
                    return Err(ParseError::MismatchedClose {
                        expected: open.name,
                        found: name.to_string(),
                        offset,
                    });
                }
                let element = MarkupNode::Element(MarkupElement {
                    name: open.name,
                    attributes: open.attributes,
                    children: open.children,
                    self_closing: false,
                    span: open.start..self.offset(),
                });
                push_child(&mut stack, &mut top_level, element);
            } else {
                let text = self.text_run();
                push_child(&mut stack, &mut top_level, text);
            }
        }

        if let Some(open) = stack.pop() {
            return Err(ParseError::Unclosed {
                name: open.name,
                offset: open.start,
            });
        }

        Ok(top_level)
    }

    /// Parse everything after `<` up to and including `>` or `/>`.
    fn tag_body(&mut self) -> Result<(String, Vec<(String, String)>, bool), ParseError> {
        let name = self.expect(TokenKind::Name, "element name")?.to_string();
        let mut attributes = Vec::new();

        loop {
            self.skip_whitespace();
            let token = self.peek().ok_or(ParseError::UnexpectedEnd {
                expected: "`>` or `/>`",
            })?;

            if token.is(TokenKind::TagEnd) {
                self.pos += 1;
                return Ok((name, attributes, false));
            }
            if token.is(TokenKind::SelfClose) {
                self.pos += 1;
                return Ok((name, attributes, true));
            }

            let key = self.expect(TokenKind::Name, "attribute name")?.to_string();
            self.skip_whitespace();
            let value = if self.peek().is_some_and(|t| t.is(TokenKind::Equals)) {
                self.pos += 1;
                self.skip_whitespace();
                let quoted = self.expect(TokenKind::Quoted, "quoted attribute value")?;
                let inner = &quoted[1..quoted.len() - 1];
                html_escape::decode_html_entities(inner).into_owned()
            } else {
                String::new()
            };
            attributes.push((key, value));
        }
    }

    /// Collect tokens up to the next tag into one decoded text node.
    fn text_run(&mut self) -> MarkupNode {
        let start = self.offset();
        while let Some(token) = self.peek() {
            if token.is(TokenKind::TagStart) || token.is(TokenKind::CloseTagStart) {
                break;
            }
            self.pos += 1;
        }
        let end = self.offset();
        MarkupNode::Text(MarkupText {
            text: html_escape::decode_html_entities(&self.input[start..end]).into_owned(),
            span: start..end,
        })
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<&'a str, ParseError> {
        match self.tokens.get(self.pos) {
            Some(token) if token.is(kind) => {
                self.pos += 1;
                Ok(token.text)
            }
            Some(token) => Err(ParseError::UnexpectedToken {
                expected,
                found: token.text.to_string(),
                offset: token.span.start,
            }),
            None => Err(ParseError::UnexpectedEnd { expected }),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|t| t.is(TokenKind::Whitespace)) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    /// Byte offset of the next unconsumed token.
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.start)
            .unwrap_or(self.input.len())
    }
}

fn push_child(stack: &mut [OpenElement], top_level: &mut Vec<MarkupNode>, node: MarkupNode) {
    match stack.last_mut() {
        Some(open) => open.children.push(node),
        None => top_level.push(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn element(node: &MarkupNode) -> &MarkupElement {
        node.as_element().expect("expected an element")
    }

    #[test]
    fn parse_paragraph_with_text() {
        let nodes = parse("<p>hello world</p>").unwrap();
        assert_eq!(nodes.len(), 1);

        let p = element(&nodes[0]);
        assert_eq!(p.name, "p");
        assert_eq!(p.span, 0..18);
        assert_eq!(
            p.children,
            vec![MarkupNode::Text(MarkupText {
                text: "hello world".to_string(),
                span: 3..14,
            })]
        );
    }

    #[test]
    fn parse_attributes_in_source_order() {
        let nodes = parse(r#"<a href="/x" title="a &amp; b" hidden>link</a>"#).unwrap();
        let a = element(&nodes[0]);
        assert_eq!(
            a.attributes,
            vec![
                ("href".to_string(), "/x".to_string()),
                ("title".to_string(), "a & b".to_string()),
                ("hidden".to_string(), String::new()),
            ]
        );
        assert_eq!(a.attribute("title"), Some("a & b"));
    }

    #[test]
    fn parse_nested_elements() {
        let nodes = parse("<ul><li><p>a</p></li><li><p>b</p></li></ul>").unwrap();
        let ul = element(&nodes[0]);
        assert_eq!(ul.children.len(), 2);
        let second = element(&ul.children[1]);
        assert_eq!(element(&second.children[0]).name, "p");
    }

    #[test]
    fn parse_self_closing_element() {
        let nodes = parse("<p>a<br/>b</p>").unwrap();
        let p = element(&nodes[0]);
        assert_eq!(p.children.len(), 3);
        let br = element(&p.children[1]);
        assert!(br.self_closing);
        assert!(br.children.is_empty());
    }

    #[test]
    fn parse_text_keeps_punctuation_and_decodes_entities() {
        let nodes = parse("<p>1 &lt; 2 = \"yes\" / ok</p>").unwrap();
        let p = element(&nodes[0]);
        match &p.children[0] {
            MarkupNode::Text(text) => assert_eq!(text.text, "1 < 2 = \"yes\" / ok"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn parse_multiple_top_level_nodes() {
        let nodes = parse("<h1>t</h1>\n<p>x</p>").unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(matches!(&nodes[1], MarkupNode::Text(t) if t.text == "\n"));
    }

    #[rstest]
    #[case::unclosed("<p>hello", "unclosed element `p`")]
    #[case::mismatched("<p>hello</div>", "expected `</p>`")]
    #[case::stray_close("hello</p>", "unexpected closing tag `p`")]
    #[case::bad_attribute("<p =\"x\">", "expected attribute name")]
    #[case::truncated_tag("<p class", "unexpected end of input")]
    fn parse_errors(#[case] input: &str, #[case] message: &str) {
        let error = parse(input).unwrap_err();
        assert!(
            error.to_string().contains(message),
            "`{error}` should mention `{message}`"
        );
    }
}
