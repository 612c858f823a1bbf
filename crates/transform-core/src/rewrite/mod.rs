//! Reference transform collaborator.
//!
//! [`apply`] is the pure, total function the guest calls once the source
//! text and kind have been decoded. Every kind is a token-level rewrite of
//! C# source; comments and literals are never touched.
//!
//! # Examples
//!
//! ```
//! use transform_core::{TransformKind, apply};
//!
//! let source = "bool done = true; // true";
//! assert_eq!(
//!     apply(source, TransformKind::TrueToFalse),
//!     "bool done = false; // true"
//! );
//! assert_eq!(apply("hello", TransformKind::Identity), "hello");
//! ```

mod lexer;

use crate::TransformKind;
use lexer::{Token, TokenKind, is_keyword, tokenize};

/// What must follow a keyword for it to be rewritten.
#[derive(Debug, Clone, Copy)]
enum Followed {
    Anything,
    ByPunct(&'static str),
    ByIdent,
}

impl Followed {
    fn accepts(self, next: Option<&Token<'_>>) -> bool {
        match self {
            Self::Anything => true,
            Self::ByPunct(punct) => next.is_some_and(|token| token.is_punct(punct)),
            Self::ByIdent => {
                next.is_some_and(|token| token.kind == TokenKind::Ident && !is_keyword(token.text))
            }
        }
    }
}

/// Applies `kind` to `source`.
#[must_use]
pub fn apply(source: &str, kind: TransformKind) -> String {
    tracing::trace!(%kind, bytes = source.len(), "applying transform");

    match kind {
        TransformKind::Identity => source.to_owned(),
        TransformKind::CheckedStmtToUncheckedStmt => {
            swap_ident(source, "checked", "unchecked", Followed::ByPunct("{"))
        }
        TransformKind::UncheckedStmtToCheckedStmt => {
            swap_ident(source, "unchecked", "checked", Followed::ByPunct("{"))
        }
        TransformKind::CheckedExprToUncheckedExpr => {
            swap_ident(source, "checked", "unchecked", Followed::ByPunct("("))
        }
        TransformKind::UncheckedExprToCheckedExpr => {
            swap_ident(source, "unchecked", "checked", Followed::ByPunct("("))
        }
        TransformKind::PostfixToPrefix => postfix_to_prefix(source),
        TransformKind::PrefixToPostfix => prefix_to_postfix(source),
        TransformKind::TrueToFalse => swap_ident(source, "true", "false", Followed::Anything),
        TransformKind::FalseToTrue => swap_ident(source, "false", "true", Followed::Anything),
        TransformKind::AddAssignToAssign => swap_punct(source, "+=", "="),
        TransformKind::OrderByAscToOrderByDesc => {
            swap_ident(source, "ascending", "descending", Followed::Anything)
        }
        TransformKind::OrderByDescToOrderByAsc => {
            swap_ident(source, "descending", "ascending", Followed::Anything)
        }
        TransformKind::ClassDeclToStructDecl => {
            swap_ident(source, "class", "struct", Followed::ByIdent)
        }
        TransformKind::StructDeclToClassDecl => {
            swap_ident(source, "struct", "class", Followed::ByIdent)
        }
        TransformKind::IntTypeToLongType => swap_ident(source, "int", "long", Followed::Anything),
    }
}

fn next_significant<'t, 'a>(tokens: &'t [Token<'a>], index: usize) -> Option<&'t Token<'a>> {
    tokens.get(index + 1..)?.iter().find(|token| !token.is_trivia())
}

fn previous_significant<'t, 'a>(tokens: &'t [Token<'a>], index: usize) -> Option<&'t Token<'a>> {
    tokens[..index].iter().rev().find(|token| !token.is_trivia())
}

fn swap_ident(source: &str, from: &str, to: &str, followed: Followed) -> String {
    let tokens = tokenize(source);
    let mut out = String::with_capacity(source.len());

    for (index, token) in tokens.iter().enumerate() {
        if token.is_ident(from) && followed.accepts(next_significant(&tokens, index)) {
            out.push_str(to);
        } else {
            out.push_str(token.text);
        }
    }

    out
}

fn swap_punct(source: &str, from: &str, to: &str) -> String {
    tokenize(source)
        .iter()
        .map(|token| if token.is_punct(from) { to } else { token.text })
        .collect()
}

fn is_step(token: &Token<'_>) -> bool {
    token.is_punct("++") || token.is_punct("--")
}

fn is_variable(token: &Token<'_>) -> bool {
    token.kind == TokenKind::Ident && !is_keyword(token.text)
}

/// A token that can end an operand, making a following `++` postfix.
fn ends_operand(token: &Token<'_>) -> bool {
    match token.kind {
        TokenKind::Ident => !is_keyword(token.text) || token.text == "this",
        TokenKind::Number | TokenKind::Literal => true,
        TokenKind::Punct => matches!(token.text, ")" | "]"),
        TokenKind::Whitespace | TokenKind::Comment => false,
    }
}

fn postfix_to_prefix(source: &str) -> String {
    let tokens = tokenize(source);
    let mut out = String::with_capacity(source.len());
    let mut index = 0;

    while index < tokens.len() {
        let token = &tokens[index];
        if is_variable(token)
            && let Some(op) = tokens.get(index + 1)
            && is_step(op)
        {
            out.push_str(op.text);
            out.push_str(token.text);
            index += 2;
            continue;
        }
        out.push_str(token.text);
        index += 1;
    }

    out
}

fn prefix_to_postfix(source: &str) -> String {
    let tokens = tokenize(source);
    let mut out = String::with_capacity(source.len());
    let mut index = 0;

    while index < tokens.len() {
        let token = &tokens[index];
        if is_step(token)
            && let Some(operand) = tokens.get(index + 1)
            && is_variable(operand)
            && !previous_significant(&tokens, index).is_some_and(ends_operand)
        {
            out.push_str(operand.text);
            out.push_str(token.text);
            index += 2;
            continue;
        }
        out.push_str(token.text);
        index += 1;
    }

    out
}
