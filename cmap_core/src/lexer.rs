use std::ops::Range;

use logos::Logos;
use snailquote::unescape;

/// Raw tokens produced by logos for flat tokenization of manifest source.
/// Whitespace and JavaScript comments are skipped; anything unrecognized
/// surfaces as an error token and is dropped by [`lex`].
#[derive(Logos, Debug, PartialEq)]
#[logos(skip(r"[ \t\r\n\f]+|//[^\n]*|/\*([^*]|\*+[^*/])*\*+/", allow_greedy = true))]
enum RawToken {
	#[token("{")]
	BraceOpen,
	#[token("}")]
	BraceClose,
	#[token("[")]
	BracketOpen,
	#[token("]")]
	BracketClose,
	#[token("(")]
	ParenOpen,
	#[token(")")]
	ParenClose,
	#[token(":")]
	Colon,
	#[token(",")]
	Comma,
	#[token(";")]
	Semicolon,
	#[token("=")]
	Equals,
	#[token(".")]
	Dot,
	#[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*")]
	Ident,
	#[regex(r#""([^"\\\n]|\\.)*""#)]
	DoubleQuotedString,
	#[regex(r"'([^'\\\n]|\\.)*'")]
	SingleQuotedString,
	#[regex(r"`[^`]*`")]
	TemplateString,
	#[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
	Number,
}

/// A cooked manifest token. String variants carry their unescaped value;
/// template strings keep `${...}` substitution markers intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
	BraceOpen,
	BraceClose,
	BracketOpen,
	BracketClose,
	ParenOpen,
	ParenClose,
	Colon,
	Comma,
	Semicolon,
	Equals,
	Dot,
	Ident(String),
	Str(String),
	Template(String),
	Number(String),
}

/// A cooked token together with its byte span in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
	pub kind: TokenKind,
	pub span: Range<usize>,
}

/// Tokenize manifest source into a flat token stream. Unrecognized bytes are
/// dropped so that a stray character never aborts the scan.
pub(crate) fn lex(source: &str) -> Vec<Token> {
	let mut tokens = Vec::new();

	for (raw, span) in RawToken::lexer(source).spanned() {
		let Ok(raw) = raw else {
			continue;
		};
		let slice = &source[span.clone()];
		let kind = match raw {
			RawToken::BraceOpen => TokenKind::BraceOpen,
			RawToken::BraceClose => TokenKind::BraceClose,
			RawToken::BracketOpen => TokenKind::BracketOpen,
			RawToken::BracketClose => TokenKind::BracketClose,
			RawToken::ParenOpen => TokenKind::ParenOpen,
			RawToken::ParenClose => TokenKind::ParenClose,
			RawToken::Colon => TokenKind::Colon,
			RawToken::Comma => TokenKind::Comma,
			RawToken::Semicolon => TokenKind::Semicolon,
			RawToken::Equals => TokenKind::Equals,
			RawToken::Dot => TokenKind::Dot,
			RawToken::Ident => TokenKind::Ident(slice.to_string()),
			RawToken::DoubleQuotedString | RawToken::SingleQuotedString => {
				TokenKind::Str(cook_string(slice))
			}
			RawToken::TemplateString => TokenKind::Template(slice[1..slice.len() - 1].to_string()),
			RawToken::Number => TokenKind::Number(slice.to_string()),
		};
		tokens.push(Token { kind, span });
	}

	tokens
}

/// Strip the surrounding quotes from a string literal slice and resolve
/// escape sequences.
fn cook_string(slice: &str) -> String {
	let inner = &slice[1..slice.len() - 1];
	if !inner.contains('\\') {
		return inner.to_string();
	}

	if slice.starts_with('"') {
		if let Ok(value) = unescape(slice) {
			return value;
		}
	}

	// Single-quoted strings (and double-quoted ones snailquote rejects):
	// resolve simple character escapes, which covers the quote and backslash
	// escapes that appear in path literals.
	let mut value = String::with_capacity(inner.len());
	let mut chars = inner.chars();
	while let Some(ch) = chars.next() {
		if ch == '\\' {
			if let Some(next) = chars.next() {
				value.push(next);
			}
		} else {
			value.push(ch);
		}
	}
	value
}

/// Every string literal in the source (single, double, or template quoted)
/// with its byte span. Used for `/public/` asset reference checks in data
/// files and component modules.
pub(crate) fn scan_string_literals(source: &str) -> Vec<(String, Range<usize>)> {
	lex(source)
		.into_iter()
		.filter_map(|token| {
			match token.kind {
				TokenKind::Str(value) | TokenKind::Template(value) => Some((value, token.span)),
				_ => None,
			}
		})
		.collect()
}

/// Find the first occurrence of `needle` in `haystack`.
pub(crate) fn memstr(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	if needle.is_empty() || haystack.len() < needle.len() {
		return None;
	}

	haystack
		.windows(needle.len())
		.position(|window| window == needle)
}
