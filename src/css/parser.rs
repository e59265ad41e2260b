//! CSS rule and component-value parsing
//!
//! Implements the parsing stage of CSS Syntax Module Level 3 on top of the
//! tokenizer: <https://www.w3.org/TR/css-syntax-3/#parsing>
//!
//! The grammar is recursive but the parser is not: it runs as a stack
//! machine over explicit frames, one per open rule, block, or function.
//! Stylesheets nest arbitrarily deep and a hostile input must not be able
//! to overflow the native stack. Each dispatch step reads tokens until the
//! top frame either completes (pops, fixing up its skip pointer) or opens a
//! child frame.
//!
//! Parse errors are silent and non-fatal. The parser always produces a
//! tree; offending constructs are dropped (a qualified rule that hits EOF
//! before its `{}` block truncates the tree back to where the rule began)
//! or recovered past. The only hard failure mode is allocation.

use crate::css::component_tree::ComponentExtra;
use crate::css::component_tree::ComponentIndex;
use crate::css::component_tree::ComponentTag;
use crate::css::component_tree::ComponentTree;
use crate::css::tokenizer::next_token;
use crate::css::tokenizer::Token;
use crate::css::tokenizer::TokenExtra;
use crate::css::tokenizer::TokenKind;

/// Parses a complete stylesheet into a component tree rooted at a
/// `RuleList` node.
///
/// Never fails: invalid constructs are recovered past or dropped.
///
/// # Examples
///
/// ```
/// use boxflow::css::component_tree::ComponentTag;
/// use boxflow::css::parser::parse_stylesheet;
///
/// let tree = parse_stylesheet("a { color: red }");
/// assert_eq!(tree.tag(0), ComponentTag::RuleList);
/// ```
pub fn parse_stylesheet(source: &str) -> ComponentTree {
  let mut parser = Parser::new(source);
  let root = parser
    .tree
    .append(ComponentTag::RuleList, 0, ComponentExtra::None);
  parser.stack.push(Frame {
    index: root,
    skip: 1,
    kind: FrameKind::RuleList { top_level: true },
  });
  parser.run()
}

/// Parses a fragment as a bare list of component values (no root
/// container); used for declaration values and inline styles.
pub fn parse_list_of_component_values(source: &str) -> ComponentTree {
  let mut parser = Parser::new(source);
  parser.stack.push(Frame {
    index: NO_INDEX,
    skip: 0,
    kind: FrameKind::ComponentValueList,
  });
  parser.run()
}

const NO_INDEX: ComponentIndex = ComponentIndex::MAX;

#[derive(Debug, Clone, Copy)]
enum FrameKind {
  RuleList { top_level: bool },
  ComponentValueList,
  AtRule,
  QualifiedRule,
  SimpleBlock { close: TokenKind, in_a_rule: bool },
  Function,
}

#[derive(Debug)]
struct Frame {
  index: ComponentIndex,
  skip: u32,
  kind: FrameKind,
}

struct Parser<'a> {
  source: &'a str,
  offset: usize,
  tree: ComponentTree,
  stack: Vec<Frame>,
}

impl<'a> Parser<'a> {
  fn new(source: &'a str) -> Self {
    Self {
      source,
      offset: 0,
      tree: ComponentTree::new(source.to_string()),
      stack: Vec::new(),
    }
  }

  fn run(mut self) -> ComponentTree {
    while let Some(frame) = self.stack.last() {
      match frame.kind {
        FrameKind::RuleList { top_level } => self.consume_rule_list(top_level),
        FrameKind::ComponentValueList => self.consume_value_list(),
        FrameKind::AtRule => self.consume_at_rule(),
        FrameKind::QualifiedRule => self.consume_qualified_rule(),
        FrameKind::SimpleBlock { close, in_a_rule } => self.consume_block(close, in_a_rule),
        FrameKind::Function => self.consume_block(TokenKind::RightParen, false),
      }
    }
    self.tree
  }

  fn peek(&self) -> Token {
    next_token(self.source, self.offset)
  }

  /// Consume a list of rules until EOF. At the top level, CDO/CDC tokens
  /// are noise left over from `<style>` embedding and are skipped like
  /// whitespace.
  fn consume_rule_list(&mut self, top_level: bool) {
    loop {
      let token = self.peek();
      match token.kind {
        TokenKind::Whitespace | TokenKind::Comment => self.offset = token.end,
        TokenKind::Cdo | TokenKind::Cdc if top_level => self.offset = token.end,
        TokenKind::Eof => {
          self.pop_frame();
          return;
        }
        TokenKind::AtKeyword => {
          self.push_container(ComponentTag::AtRule, token.start, FrameKind::AtRule);
          self.offset = token.end;
          return;
        }
        _ => {
          // Reconsume: the first prelude token is handled by the rule
          // frame.
          self.push_container(ComponentTag::QualifiedRule, token.start, FrameKind::QualifiedRule);
          return;
        }
      }
    }
  }

  fn consume_value_list(&mut self) {
    loop {
      let token = self.peek();
      if token.kind == TokenKind::Eof {
        self.pop_frame();
        return;
      }
      if self.consume_component_value(token) {
        return;
      }
    }
  }

  fn consume_at_rule(&mut self) {
    loop {
      let token = self.peek();
      match token.kind {
        TokenKind::Semicolon => {
          self.offset = token.end;
          self.pop_frame();
          return;
        }
        TokenKind::Eof => {
          self.pop_frame();
          return;
        }
        TokenKind::LeftCurly => {
          self.open_rule_body(token);
          return;
        }
        _ => {
          if self.consume_component_value(token) {
            return;
          }
        }
      }
    }
  }

  fn consume_qualified_rule(&mut self) {
    loop {
      let token = self.peek();
      match token.kind {
        TokenKind::Eof => {
          // EOF before the block: the rule is discarded wholesale and the
          // tree is rewound to where it began.
          let frame = self.stack.pop().expect("qualified rule frame");
          self.tree.truncate(frame.index);
          return;
        }
        TokenKind::LeftCurly => {
          self.open_rule_body(token);
          return;
        }
        _ => {
          if self.consume_component_value(token) {
            return;
          }
        }
      }
    }
  }

  fn consume_block(&mut self, close: TokenKind, in_a_rule: bool) {
    loop {
      let token = self.peek();
      if token.kind == close || token.kind == TokenKind::Eof {
        if token.kind == close {
          self.offset = token.end;
        }
        let block = self.stack.last().expect("block frame").index;
        self.pop_frame();
        if in_a_rule {
          // The block ends its rule; record the prelude/body split before
          // popping the rule frame.
          let rule = self.stack.last().expect("enclosing rule frame").index;
          self.tree.set_extra(rule, ComponentExtra::BodyIndex(block));
          self.pop_frame();
        }
        return;
      }
      if self.consume_component_value(token) {
        return;
      }
    }
  }

  /// Handles one token in component-value position. Returns true if a
  /// child frame was opened (the driver must re-dispatch).
  fn consume_component_value(&mut self, token: Token) -> bool {
    let (tag, close) = match token.kind {
      TokenKind::LeftCurly => (ComponentTag::SimpleBlockCurly, TokenKind::RightCurly),
      TokenKind::LeftBracket => (ComponentTag::SimpleBlockBracket, TokenKind::RightBracket),
      TokenKind::LeftParen => (ComponentTag::SimpleBlockParen, TokenKind::RightParen),
      TokenKind::Function => {
        self.push_container(ComponentTag::Function, token.start, FrameKind::Function);
        self.offset = token.end;
        return true;
      }
      _ => {
        self.append_token(token);
        self.offset = token.end;
        return false;
      }
    };
    self.push_container(
      tag,
      token.start,
      FrameKind::SimpleBlock {
        close,
        in_a_rule: false,
      },
    );
    self.offset = token.end;
    true
  }

  fn open_rule_body(&mut self, token: Token) {
    self.push_container(
      ComponentTag::SimpleBlockCurly,
      token.start,
      FrameKind::SimpleBlock {
        close: TokenKind::RightCurly,
        in_a_rule: true,
      },
    );
    self.offset = token.end;
  }

  fn push_container(
    &mut self,
    tag: ComponentTag,
    location: usize,
    kind: FrameKind,
  ) -> ComponentIndex {
    let index = self.tree.append(tag, location, ComponentExtra::None);
    self.stack.push(Frame {
      index,
      skip: 1,
      kind,
    });
    index
  }

  fn append_token(&mut self, token: Token) {
    let tag = match token.kind {
      TokenKind::Ident => ComponentTag::TokenIdent,
      TokenKind::AtKeyword => ComponentTag::TokenAtKeyword,
      TokenKind::String => ComponentTag::TokenString,
      TokenKind::BadString => ComponentTag::TokenBadString,
      TokenKind::Url => ComponentTag::TokenUrl,
      TokenKind::BadUrl => ComponentTag::TokenBadUrl,
      TokenKind::Number => ComponentTag::TokenNumber,
      TokenKind::Integer => ComponentTag::TokenInteger,
      TokenKind::Dimension => ComponentTag::TokenDimension,
      TokenKind::Percentage => ComponentTag::TokenPercentage,
      TokenKind::Delim => ComponentTag::TokenDelim,
      TokenKind::Colon => ComponentTag::TokenColon,
      TokenKind::Semicolon => ComponentTag::TokenSemicolon,
      TokenKind::Comma => ComponentTag::TokenComma,
      TokenKind::Whitespace => ComponentTag::TokenWhitespace,
      TokenKind::Comment => ComponentTag::TokenComment,
      TokenKind::Cdo => ComponentTag::TokenCdo,
      TokenKind::Cdc => ComponentTag::TokenCdc,
      TokenKind::HashId => ComponentTag::TokenHashId,
      TokenKind::HashUnrestricted => ComponentTag::TokenHashUnrestricted,
      TokenKind::RightCurly => ComponentTag::TokenRightCurly,
      TokenKind::RightBracket => ComponentTag::TokenRightBracket,
      TokenKind::RightParen => ComponentTag::TokenRightParen,
      // Opening tokens and EOF never reach here.
      TokenKind::LeftCurly | TokenKind::LeftBracket | TokenKind::LeftParen => unreachable!(),
      TokenKind::Function | TokenKind::Eof => unreachable!(),
    };
    let extra = match token.extra {
      TokenExtra::None => ComponentExtra::None,
      TokenExtra::Delim(c) => ComponentExtra::Codepoint(c),
      TokenExtra::Number(v) => ComponentExtra::Number(v),
      TokenExtra::Integer(v) => ComponentExtra::Integer(v),
      TokenExtra::Dimension { value, unit } => ComponentExtra::Dimension { value, unit },
    };
    self.tree.append(tag, token.start, extra);
    if let Some(parent) = self.stack.last_mut() {
      parent.skip += 1;
    }
  }

  fn pop_frame(&mut self) {
    let frame = self.stack.pop().expect("frame to pop");
    if frame.index != NO_INDEX {
      self
        .tree
        .set_next_sibling(frame.index, frame.index + frame.skip);
    }
    if let Some(parent) = self.stack.last_mut() {
      parent.skip += frame.skip;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use ComponentTag::*;

  fn tags(tree: &ComponentTree) -> Vec<ComponentTag> {
    (0..tree.len()).map(|i| tree.tag(i)).collect()
  }

  #[test]
  fn test_stylesheet_shape() {
    let source = "@charset \"utf-8\"; @new-rule {} root { print(we, can, parse, this!) } broken";
    let tree = parse_stylesheet(source);

    assert_eq!(tree.len(), 25);
    assert_eq!(
      tags(&tree),
      vec![
        RuleList,
        AtRule,
        TokenWhitespace,
        TokenString,
        AtRule,
        TokenWhitespace,
        SimpleBlockCurly,
        QualifiedRule,
        TokenIdent,
        TokenWhitespace,
        SimpleBlockCurly,
        TokenWhitespace,
        Function,
        TokenIdent,
        TokenComma,
        TokenWhitespace,
        TokenIdent,
        TokenComma,
        TokenWhitespace,
        TokenIdent,
        TokenComma,
        TokenWhitespace,
        TokenIdent,
        TokenDelim,
        TokenWhitespace,
      ]
    );

    assert!(tree.ident_eq(1, "charset"));
    assert!(tree.ident_eq(4, "new-rule"));
    assert!(tree.ident_eq(12, "print"));
    assert_eq!(tree.extra(1), ComponentExtra::None);
    assert_eq!(tree.extra(4), ComponentExtra::BodyIndex(6));
    assert_eq!(tree.extra(7), ComponentExtra::BodyIndex(10));
    assert_eq!(tree.extra(23), ComponentExtra::Codepoint('!'));
    assert_eq!(tree.next_sibling(0), 25);
  }

  #[test]
  fn test_qualified_rule_truncated_at_eof() {
    let complete = parse_stylesheet("a { b: c }");
    let truncated = parse_stylesheet("a { b: c } trailing junk");
    assert_eq!(complete.len(), truncated.len());
    assert_eq!(tags(&complete), tags(&truncated));
  }

  #[test]
  fn test_top_level_cdo_cdc_skipped() {
    let tree = parse_stylesheet("<!-- a {} -->");
    assert_eq!(tags(&tree), vec![RuleList, QualifiedRule, SimpleBlockCurly]);
  }

  #[test]
  fn test_at_rule_without_block() {
    let tree = parse_stylesheet("@namespace svg url(http://www.w3.org/2000/svg);");
    assert_eq!(
      tags(&tree),
      vec![
        RuleList,
        AtRule,
        TokenWhitespace,
        TokenIdent,
        TokenWhitespace,
        TokenUrl,
      ]
    );
    assert_eq!(tree.extra(1), ComponentExtra::None);
  }

  #[test]
  fn test_nested_blocks() {
    let tree = parse_stylesheet("a { b: [1, (2)] }");
    assert_eq!(
      tags(&tree),
      vec![
        RuleList,
        QualifiedRule,
        TokenIdent,
        TokenWhitespace,
        SimpleBlockCurly,
        TokenWhitespace,
        TokenIdent,
        TokenColon,
        TokenWhitespace,
        SimpleBlockBracket,
        TokenInteger,
        TokenComma,
        TokenWhitespace,
        SimpleBlockParen,
        TokenInteger,
        TokenWhitespace,
      ]
    );
    // Bracket block spans the paren block.
    assert_eq!(tree.next_sibling(9), 15);
    assert_eq!(tree.next_sibling(13), 15);
  }

  #[test]
  fn test_unterminated_block_closed_at_eof() {
    let tree = parse_stylesheet("a { b: c");
    assert_eq!(tree.next_sibling(0), tree.len());
    let rule = tree.children(0).next().unwrap();
    assert_eq!(tree.tag(rule), QualifiedRule);
    assert_eq!(tree.next_sibling(rule), tree.len());
  }

  #[test]
  fn test_component_value_list_has_no_root() {
    let tree = parse_list_of_component_values("10px auto");
    assert_eq!(
      tags(&tree),
      vec![TokenDimension, TokenWhitespace, TokenIdent]
    );
    assert_eq!(tree.next_sibling(2), 3);
  }

  #[test]
  fn test_numeric_extras_preserved() {
    let tree = parse_list_of_component_values("42 1.5 30% 9999999999999999");
    assert_eq!(tree.extra(0), ComponentExtra::Integer(42));
    assert_eq!(tree.extra(2), ComponentExtra::Number(1.5));
    assert_eq!(tree.extra(4), ComponentExtra::Number(30.0));
    assert_eq!(tree.extra(6), ComponentExtra::Integer(0));
  }
}
