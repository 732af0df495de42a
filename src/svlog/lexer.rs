// Copyright (c) 2016-2021 Fabian Schuiki

//! A lexical analyzer for SystemVerilog files, based on IEEE 1800-2017,
//! section 5.
//!
//! The lexer is byte-addressed and never fails: every malformed input yields
//! a token (possibly `Unknown`) plus a diagnostic in the sink. Leading
//! trivia (whitespace, newlines, comments) is accumulated onto the next
//! token; the `EndOfFile` token carries any trailing trivia.

use crate::common::source::{Location, Source, Span};
use crate::crate_prelude::*;
use crate::token::*;
use std::rc::Rc;

/// A lexical analyzer for SystemVerilog files.
pub struct Lexer<'a> {
    source: Source,
    content: Rc<Vec<u8>>,
    pos: usize,
    version: LanguageVersion,
    diag: &'a mut Diagnostics,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: Source, diag: &'a mut Diagnostics) -> Lexer<'a> {
        Lexer::with_version(source, LanguageVersion::default(), diag)
    }

    pub fn with_version(
        source: Source,
        version: LanguageVersion,
        diag: &'a mut Diagnostics,
    ) -> Lexer<'a> {
        Lexer {
            source,
            content: source.get_content(),
            pos: 0,
            version,
            diag,
            done: false,
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.content.get(self.pos + ahead).copied()
    }

    fn span_from(&self, begin: usize) -> Span {
        Span::new(self.source, begin, self.pos)
    }

    fn report(&mut self, diag: Diagnostic) {
        self.diag.add(diag);
    }

    fn report_at(&mut self, code: DiagCode, offset: usize) {
        let d = Diagnostic::new(code, Location::new(self.source, offset));
        self.report(d);
    }

    /// Lex the next token, including its leading trivia.
    pub fn lex(&mut self) -> Token {
        let trivia = self.lex_trivia();
        let begin = self.pos;
        let (kind, value, id_type) = self.lex_raw();
        let mut token = Token::new(kind, self.span_from(begin), trivia, value);
        if let Some(idt) = id_type {
            token = token.with_identifier_type(idt);
        }
        trace!("lexed {:?} `{}`", token.kind, token.raw_text());
        token
    }

    /// Accumulate trivia until a non-trivia byte is seen.
    fn lex_trivia(&mut self) -> Vec<Trivia> {
        let mut trivia = Vec::new();
        loop {
            let begin = self.pos;
            match (self.peek(0), self.peek(1)) {
                (Some(b' '), _) | (Some(b'\t'), _) | (Some(0x0b), _) | (Some(0x0c), _) => {
                    while let Some(b' ') | Some(b'\t') | Some(0x0b) | Some(0x0c) = self.peek(0) {
                        self.pos += 1;
                    }
                    trivia.push(Trivia::new(TriviaKind::Whitespace, self.span_from(begin)));
                }
                // Each of `\r`, `\n`, and `\r\n` counts as one end-of-line.
                (Some(b'\r'), Some(b'\n')) => {
                    self.pos += 2;
                    trivia.push(Trivia::new(TriviaKind::EndOfLine, self.span_from(begin)));
                }
                (Some(b'\r'), _) | (Some(b'\n'), _) => {
                    self.pos += 1;
                    trivia.push(Trivia::new(TriviaKind::EndOfLine, self.span_from(begin)));
                }
                (Some(b'/'), Some(b'/')) => {
                    self.pos += 2;
                    while let Some(c) = self.peek(0) {
                        if c == b'\r' || c == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                    trivia.push(Trivia::new(TriviaKind::LineComment, self.span_from(begin)));
                }
                (Some(b'/'), Some(b'*')) => {
                    self.pos += 2;
                    loop {
                        match (self.peek(0), self.peek(1)) {
                            (Some(b'*'), Some(b'/')) => {
                                self.pos += 2;
                                break;
                            }
                            (Some(b'/'), Some(b'*')) => {
                                self.report_at(DiagCode::NestedBlockComment, self.pos);
                                self.pos += 2;
                            }
                            (Some(_), _) => self.pos += 1,
                            (None, _) => {
                                self.report_at(DiagCode::UnterminatedBlockComment, begin);
                                break;
                            }
                        }
                    }
                    trivia.push(Trivia::new(TriviaKind::BlockComment, self.span_from(begin)));
                }
                _ => return trivia,
            }
        }
    }

    /// Lex the raw text of a token, after trivia has been stripped.
    fn lex_raw(&mut self) -> (TokenKind, TokenValue, Option<IdentifierType>) {
        let c = match self.peek(0) {
            Some(c) => c,
            None => return (TokenKind::EndOfFile, TokenValue::None, None),
        };

        // Byte order marks come first; the leading byte of the UTF-8 BOM
        // would otherwise be taken for a multibyte sequence.
        if self.try_lex_bom() {
            return (TokenKind::Unknown, TokenValue::None, None);
        }

        match c {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                let name = self.lex_identifier_body();
                (
                    TokenKind::Identifier,
                    TokenValue::Ident(name),
                    Some(IdentifierType::Normal),
                )
            }
            b'$' => {
                match self.peek(1) {
                    Some(b'a'..=b'z') | Some(b'A'..=b'Z') | Some(b'0'..=b'9') | Some(b'_')
                    | Some(b'$') => {
                        // The leading `$` is part of the name.
                        let name = self.lex_identifier_body();
                        (
                            TokenKind::SystemIdentifier,
                            TokenValue::Ident(name),
                            Some(IdentifierType::System),
                        )
                    }
                    _ => {
                        self.pos += 1;
                        (TokenKind::Dollar, TokenValue::None, None)
                    }
                }
            }
            b'\\' => self.lex_escaped_identifier(),
            b'"' => self.lex_string_literal(),
            b'0'..=b'9' => self.lex_numeric_literal(),
            b'\'' => self.lex_apostrophe(),
            b'`' => self.lex_directive(),
            0 => {
                self.report_at(DiagCode::EmbeddedNull, self.pos);
                self.pos += 1;
                (TokenKind::Unknown, TokenValue::None, None)
            }
            0x01..=0x1f | 0x7f => {
                self.report_at(DiagCode::NonPrintableChar, self.pos);
                self.pos += 1;
                (TokenKind::Unknown, TokenValue::None, None)
            }
            0x80..=0xff => {
                self.lex_utf8_sequence();
                (TokenKind::Unknown, TokenValue::None, None)
            }
            _ => match self.lex_punctuation(c) {
                Some(kind) => (kind, TokenValue::None, None),
                None => {
                    self.report_at(DiagCode::NonPrintableChar, self.pos);
                    self.pos += 1;
                    (TokenKind::Unknown, TokenValue::None, None)
                }
            },
        }
    }

    /// Consume a byte order mark if one starts here.
    fn try_lex_bom(&mut self) -> bool {
        match (self.peek(0), self.peek(1), self.peek(2)) {
            (Some(0xef), Some(0xbb), Some(0xbf)) => {
                self.report_at(DiagCode::UnicodeBom, self.pos);
                self.pos += 3;
                true
            }
            (Some(0xfe), Some(0xff), _) | (Some(0xff), Some(0xfe), _) => {
                self.report_at(DiagCode::UnicodeBom, self.pos);
                self.pos += 2;
                true
            }
            _ => false,
        }
    }

    /// Consume one UTF-8 multibyte sequence and report it.
    fn lex_utf8_sequence(&mut self) {
        self.report_at(DiagCode::Utf8Char, self.pos);
        let lead = self.peek(0).unwrap();
        let len = match lead {
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => 1,
        };
        self.pos += 1;
        for _ in 1..len {
            match self.peek(0) {
                Some(0x80..=0xbf) => self.pos += 1,
                _ => break,
            }
        }
    }

    /// Consume an identifier body: letters, digits, underscores, and dollar
    /// signs.
    fn lex_identifier_body(&mut self) -> Name {
        let begin = self.pos;
        while let Some(c) = self.peek(0) {
            match c {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$' => self.pos += 1,
                _ => break,
            }
        }
        intern(&self.span_from(begin).extract())
    }

    /// Escaped identifiers are introduced with a backslash and last until
    /// the next whitespace byte.
    fn lex_escaped_identifier(&mut self) -> (TokenKind, TokenValue, Option<IdentifierType>) {
        let backslash = self.pos;
        self.pos += 1;
        let begin = self.pos;
        while let Some(c) = self.peek(0) {
            // Everything visible is fair game, including further backslashes.
            if (0x21..=0x7e).contains(&c) {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == begin {
            self.report_at(DiagCode::EscapedWhitespace, backslash);
            return (TokenKind::Unknown, TokenValue::None, None);
        }
        let name = intern(&self.span_from(begin).extract());
        (
            TokenKind::Identifier,
            TokenValue::Ident(name),
            Some(IdentifierType::Escaped),
        )
    }

    /// Lex a string literal. The value is the unescaped byte string; on any
    /// malformed content the partial value is kept.
    fn lex_string_literal(&mut self) -> (TokenKind, TokenValue, Option<IdentifierType>) {
        self.pos += 1;
        let mut value = Vec::new();
        loop {
            match self.peek(0) {
                None => {
                    self.report_at(DiagCode::UnterminatedStringLiteral, self.pos);
                    break;
                }
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                // An unescaped newline terminates the string; the newline
                // itself becomes trivia of the next token.
                Some(b'\r') | Some(b'\n') => {
                    self.report_at(DiagCode::NewlineInStringLiteral, self.pos);
                    break;
                }
                Some(b'\\') => {
                    let escape = self.pos;
                    self.pos += 1;
                    match self.peek(0) {
                        None => {
                            self.report_at(DiagCode::UnterminatedStringLiteral, self.pos);
                            break;
                        }
                        Some(b'n') => {
                            value.push(b'\n');
                            self.pos += 1;
                        }
                        Some(b't') => {
                            value.push(b'\t');
                            self.pos += 1;
                        }
                        Some(b'v') => {
                            value.push(0x0b);
                            self.pos += 1;
                        }
                        Some(b'f') => {
                            value.push(0x0c);
                            self.pos += 1;
                        }
                        Some(b'a') => {
                            value.push(0x07);
                            self.pos += 1;
                        }
                        Some(b'\\') => {
                            value.push(b'\\');
                            self.pos += 1;
                        }
                        Some(b'"') => {
                            value.push(b'"');
                            self.pos += 1;
                        }
                        // Line continuation: the newline is elided.
                        Some(b'\r') => {
                            self.pos += 1;
                            if self.peek(0) == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        Some(b'\n') => {
                            self.pos += 1;
                        }
                        Some(c @ b'0'..=b'7') => {
                            let mut v = (c - b'0') as u32;
                            self.pos += 1;
                            for _ in 0..2 {
                                match self.peek(0) {
                                    Some(d @ b'0'..=b'7') => {
                                        v = v * 8 + (d - b'0') as u32;
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            if v > 255 {
                                self.report_at(DiagCode::OctalEscapeCodeTooBig, escape);
                            } else {
                                value.push(v as u8);
                            }
                        }
                        Some(b'x') => {
                            self.pos += 1;
                            let mut v = 0u32;
                            let mut digits = 0;
                            while let Some(d) = self.peek(0) {
                                if d.is_ascii_hexdigit() {
                                    v = v.wrapping_mul(16)
                                        + (d as char).to_digit(16).unwrap();
                                    digits += 1;
                                    self.pos += 1;
                                } else {
                                    break;
                                }
                            }
                            if digits == 0 {
                                // The offending byte is not consumed; it
                                // passes through as a regular character.
                                self.report_at(DiagCode::InvalidHexEscapeCode, escape);
                            } else {
                                value.push(v as u8);
                            }
                        }
                        Some(c) => {
                            // Unknown escape: drop the backslash, keep the
                            // character verbatim.
                            let d = Diagnostic::new(
                                DiagCode::UnknownEscapeCode,
                                Location::new(self.source, escape),
                            )
                            .arg((c as char).to_string());
                            self.report(d);
                            value.push(c);
                            self.pos += 1;
                        }
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }
        (TokenKind::StringLiteral, TokenValue::Str(value), None)
    }

    /// Consume decimal digits and underscores, appending the digits (without
    /// underscores) to `digits`.
    fn lex_decimal_digits(&mut self, digits: &mut String) {
        while let Some(c) = self.peek(0) {
            match c {
                b'0'..=b'9' => {
                    digits.push(c as char);
                    self.pos += 1;
                }
                b'_' => self.pos += 1,
                _ => break,
            }
        }
    }

    /// Lex a numeric literal introduced by a decimal digit: a signed
    /// integer, a real, or the size of a vector literal.
    fn lex_numeric_literal(&mut self) -> (TokenKind, TokenValue, Option<IdentifierType>) {
        let begin = self.pos;
        let mut digits = String::new();
        self.lex_decimal_digits(&mut digits);

        // A period or exponent turns this into a real literal.
        if self.peek(0) == Some(b'.') {
            self.pos += 1;
            let mut frac = String::new();
            self.lex_decimal_digits(&mut frac);
            if frac.is_empty() {
                self.report_at(DiagCode::MissingFractionalDigits, self.pos);
            }
            let exp = self.lex_exponent();
            return self.make_real(begin, digits, frac, exp);
        }
        if let Some(b'e') | Some(b'E') = self.peek(0) {
            self.pos += 1;
            let exp = self.lex_exponent_digits();
            return self.make_real(begin, digits, String::new(), exp);
        }

        // Check speculatively whether an apostrophe and a base specifier
        // follow; whitespace and underscores may separate them from the
        // size. If not, this is a plain signed integer and the whitespace
        // belongs to the next token.
        let mark = self.pos;
        while let Some(b' ') | Some(b'\t') | Some(0x0b) | Some(0x0c) | Some(b'_') = self.peek(0) {
            self.pos += 1;
        }
        if self.peek(0) == Some(b'\'') && self.peek(1) != Some(b'{') && self.peek(1) != Some(b'\'')
        {
            let apos = self.pos;
            self.pos += 1;
            let size = self.lex_vector_size(&digits, begin);
            return self.lex_vector_tail(Some(size), apos);
        }
        self.pos = mark;

        let (value, overflow) = saturate_i32(&digits);
        if overflow {
            self.report_at(DiagCode::SignedLiteralTooLarge, begin);
        }
        (
            TokenKind::IntegerLiteral,
            TokenValue::Numeric(NumericValue::SignedInteger(value)),
            None,
        )
    }

    /// Parse the size digits of a sized vector literal, reporting zero and
    /// overflowing sizes.
    fn lex_vector_size(&mut self, digits: &str, begin: usize) -> u32 {
        let mut value: u64 = 0;
        for c in digits.chars() {
            value = value
                .saturating_mul(10)
                .saturating_add(c.to_digit(10).unwrap() as u64);
        }
        if value == 0 {
            self.report_at(DiagCode::IntegerSizeZero, begin);
            0
        } else if value > u32::max_value() as u64 {
            self.report_at(DiagCode::IntegerSizeTooLarge, begin);
            u32::max_value()
        } else {
            value as u32
        }
    }

    /// Lex an exponent introduced by `e`/`E` if one follows, returning its
    /// textual form including the sign.
    fn lex_exponent(&mut self) -> Option<String> {
        match self.peek(0) {
            Some(b'e') | Some(b'E') => {
                self.pos += 1;
                self.lex_exponent_digits()
            }
            _ => None,
        }
    }

    /// Lex the sign and digits of an exponent whose `e` has already been
    /// consumed. Reports missing digits.
    fn lex_exponent_digits(&mut self) -> Option<String> {
        let mut exp = String::new();
        let mut ahead = 0;
        if let Some(c @ b'+') | Some(c @ b'-') = self.peek(0) {
            if matches!(self.peek(1), Some(b'0'..=b'9')) {
                exp.push(c as char);
                ahead = 1;
            }
        }
        if !matches!(self.peek(ahead), Some(b'0'..=b'9')) {
            self.report_at(DiagCode::MissingExponentDigits, self.pos);
            return None;
        }
        self.pos += ahead;
        self.lex_decimal_digits(&mut exp);
        Some(exp)
    }

    /// Assemble a real literal from its parts, reporting values that exceed
    /// the range of a double.
    fn make_real(
        &mut self,
        begin: usize,
        digits: String,
        frac: String,
        exp: Option<String>,
    ) -> (TokenKind, TokenValue, Option<IdentifierType>) {
        let mut text = digits;
        if !frac.is_empty() {
            text.push('.');
            text.push_str(&frac);
        }
        if let Some(exp) = &exp {
            text.push('e');
            text.push_str(exp);
        }
        let value: f64 = text.parse().unwrap_or(f64::INFINITY);
        if value.is_infinite() {
            self.report_at(DiagCode::RealExponentTooLarge, begin);
        }
        (
            TokenKind::RealLiteral,
            TokenValue::Numeric(NumericValue::Real(value)),
            None,
        )
    }

    /// Lex a token introduced by an apostrophe: `'{`, a based vector
    /// literal, or an unsized unbased fill literal.
    fn lex_apostrophe(&mut self) -> (TokenKind, TokenValue, Option<IdentifierType>) {
        let apos = self.pos;
        self.pos += 1;
        if self.peek(0) == Some(b'{') {
            self.pos += 1;
            return (TokenKind::ApostropheOpenBrace, TokenValue::None, None);
        }
        if self.probe_vector_base().is_some() {
            return self.lex_vector_tail(None, apos);
        }
        match self.peek(0) {
            Some(c @ b'0') | Some(c @ b'1') => {
                self.pos += 1;
                (
                    TokenKind::IntegerLiteral,
                    TokenValue::Numeric(NumericValue::UnsizedBit(c as char)),
                    None,
                )
            }
            Some(b'x') | Some(b'X') => {
                self.pos += 1;
                (
                    TokenKind::IntegerLiteral,
                    TokenValue::Numeric(NumericValue::UnsizedBit('x')),
                    None,
                )
            }
            Some(b'z') | Some(b'Z') | Some(b'?') => {
                self.pos += 1;
                (
                    TokenKind::IntegerLiteral,
                    TokenValue::Numeric(NumericValue::UnsizedBit('z')),
                    None,
                )
            }
            _ => {
                self.report_at(DiagCode::InvalidUnsizedLiteral, apos);
                (
                    TokenKind::IntegerLiteral,
                    TokenValue::Numeric(NumericValue::UnsizedBit('x')),
                    None,
                )
            }
        }
    }

    /// Look ahead past whitespace, underscores, and an optional sign
    /// indicator for a base specifier. Returns the offset of the base
    /// character relative to the current position.
    fn probe_vector_base(&self) -> Option<usize> {
        let mut ahead = 0;
        while let Some(b' ') | Some(b'\t') | Some(0x0b) | Some(0x0c) | Some(b'_') =
            self.peek(ahead)
        {
            ahead += 1;
        }
        if let Some(b's') | Some(b'S') = self.peek(ahead) {
            LiteralBase::from_char(self.peek(ahead + 1)?)?;
            return Some(ahead);
        }
        LiteralBase::from_char(self.peek(ahead)?)?;
        Some(ahead)
    }

    /// Lex the base specifier and digits of a vector literal whose
    /// apostrophe has already been consumed. The token stops right after
    /// the apostrophe if the base is missing, and right after the base if
    /// the digits are missing.
    fn lex_vector_tail(
        &mut self,
        size: Option<u32>,
        apos: usize,
    ) -> (TokenKind, TokenValue, Option<IdentifierType>) {
        let base_offset = match self.probe_vector_base() {
            Some(offset) => offset,
            None => {
                self.report_at(DiagCode::MissingVectorBase, apos);
                let value = size.map(|s| s.min(i32::max_value() as u32) as i32).unwrap_or(0);
                return (
                    TokenKind::IntegerLiteral,
                    TokenValue::Numeric(NumericValue::SignedInteger(value)),
                    None,
                );
            }
        };
        self.pos += base_offset;
        let mut signed = false;
        if let Some(b's') | Some(b'S') = self.peek(0) {
            signed = true;
            self.pos += 1;
        }
        let base = LiteralBase::from_char(self.peek(0).unwrap()).unwrap();
        self.pos += 1;
        let after_base = self.pos;

        // Whitespace may separate the base from the digits, but is only
        // consumed if at least one valid digit follows.
        let mut ahead = 0;
        while let Some(b' ') | Some(b'\t') | Some(0x0b) | Some(0x0c) | Some(b'_') =
            self.peek(ahead)
        {
            ahead += 1;
        }
        match self.peek(ahead) {
            Some(c) if base.is_digit(c) => self.pos += ahead,
            _ => {
                self.report_at(DiagCode::MissingVectorDigits, after_base);
                return (
                    TokenKind::IntegerLiteral,
                    TokenValue::Numeric(NumericValue::Vector(VectorLiteral {
                        size,
                        signed,
                        base,
                        digits: intern(""),
                    })),
                    None,
                );
            }
        }

        let mut digits = String::new();
        while let Some(c) = self.peek(0) {
            if base.is_digit(c) {
                digits.push(c as char);
                self.pos += 1;
            } else if c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        (
            TokenKind::IntegerLiteral,
            TokenValue::Numeric(NumericValue::Vector(VectorLiteral {
                size,
                signed,
                base,
                digits: intern(&digits),
            })),
            None,
        )
    }

    /// Lex a token introduced by a backtick: a directive, a macro usage, or
    /// one of the macro punctuation tokens.
    fn lex_directive(&mut self) -> (TokenKind, TokenValue, Option<IdentifierType>) {
        let tick = self.pos;
        self.pos += 1;
        match self.peek(0) {
            Some(b'"') => {
                self.pos += 1;
                (TokenKind::MacroQuote, TokenValue::None, None)
            }
            Some(b'`') => {
                self.pos += 1;
                (TokenKind::MacroPaste, TokenValue::None, None)
            }
            Some(b'\\') if self.peek(1) == Some(b'`') && self.peek(2) == Some(b'"') => {
                self.pos += 3;
                (TokenKind::MacroEscapedQuote, TokenValue::None, None)
            }
            Some(b'a'..=b'z') | Some(b'A'..=b'Z') | Some(b'_') => {
                self.lex_identifier_body();
                let text = self.span_from(tick).extract();
                match find_directive_kind(&text, self.version) {
                    Some(kind) => (TokenKind::Directive, TokenValue::Directive(kind), None),
                    None => (TokenKind::MacroUsage, TokenValue::Ident(intern(&text)), None),
                }
            }
            _ => {
                self.report_at(DiagCode::MisplacedDirectiveChar, tick);
                (TokenKind::Unknown, TokenValue::None, None)
            }
        }
    }

    /// Match punctuation with maximal munch.
    fn lex_punctuation(&mut self, c: u8) -> Option<TokenKind> {
        use crate::token::TokenKind::*;
        let p1 = self.peek(1);
        let p2 = self.peek(2);
        let p3 = self.peek(3);
        let (kind, len) = match c {
            b'{' => (OpenBrace, 1),
            b'}' => (CloseBrace, 1),
            b'[' => (OpenBracket, 1),
            b']' => (CloseBracket, 1),
            b'(' => match p1 {
                Some(b'*') => (OpenParenthesisStar, 2),
                _ => (OpenParenthesis, 1),
            },
            b')' => (CloseParenthesis, 1),
            b';' => (Semicolon, 1),
            b',' => (Comma, 1),
            b'.' => match p1 {
                Some(b'*') => (DotStar, 2),
                _ => (Dot, 1),
            },
            b'?' => (Question, 1),
            b':' => match p1 {
                Some(b'=') => (ColonEquals, 2),
                Some(b'/') => (ColonSlash, 2),
                Some(b':') => (DoubleColon, 2),
                _ => (Colon, 1),
            },
            b'*' => match (p1, p2, p3) {
                (Some(b':'), Some(b':'), Some(b'*')) => (StarDoubleColonStar, 4),
                (Some(b'*'), _, _) => (DoubleStar, 2),
                (Some(b'>'), _, _) => (StarArrow, 2),
                (Some(b'='), _, _) => (StarEqual, 2),
                (Some(b')'), _, _) => (StarCloseParenthesis, 2),
                _ => (Star, 1),
            },
            b'/' => match p1 {
                Some(b'=') => (SlashEqual, 2),
                _ => (Slash, 1),
            },
            b'+' => match p1 {
                Some(b'+') => (DoublePlus, 2),
                Some(b'=') => (PlusEqual, 2),
                Some(b':') => (PlusColon, 2),
                _ => (Plus, 1),
            },
            b'-' => match (p1, p2) {
                (Some(b'>'), Some(b'>')) => (MinusDoubleArrow, 3),
                (Some(b'>'), _) => (MinusArrow, 2),
                (Some(b'-'), _) => (DoubleMinus, 2),
                (Some(b'='), _) => (MinusEqual, 2),
                (Some(b':'), _) => (MinusColon, 2),
                _ => (Minus, 1),
            },
            b'~' => match p1 {
                Some(b'&') => (TildeAnd, 2),
                Some(b'|') => (TildeOr, 2),
                Some(b'^') => (TildeXor, 2),
                _ => (Tilde, 1),
            },
            b'#' => match (p1, p2) {
                (Some(b'-'), Some(b'#')) => (HashMinusHash, 3),
                (Some(b'='), Some(b'#')) => (HashEqualsHash, 3),
                (Some(b'#'), _) => (DoubleHash, 2),
                _ => (Hash, 1),
            },
            b'^' => match p1 {
                Some(b'~') => (XorTilde, 2),
                Some(b'=') => (XorEqual, 2),
                _ => (Xor, 1),
            },
            b'=' => match (p1, p2) {
                (Some(b'='), Some(b'=')) => (TripleEquals, 3),
                (Some(b'='), Some(b'?')) => (DoubleEqualsQuestion, 3),
                (Some(b'='), _) => (DoubleEquals, 2),
                (Some(b'>'), _) => (EqualsArrow, 2),
                _ => (Equals, 1),
            },
            b'!' => match (p1, p2) {
                (Some(b'='), Some(b'=')) => (ExclamationDoubleEquals, 3),
                (Some(b'='), Some(b'?')) => (ExclamationEqualsQuestion, 3),
                (Some(b'='), _) => (ExclamationEquals, 2),
                _ => (Exclamation, 1),
            },
            b'%' => match p1 {
                Some(b'=') => (PercentEqual, 2),
                _ => (Percent, 1),
            },
            b'<' => match (p1, p2, p3) {
                (Some(b'<'), Some(b'<'), Some(b'=')) => (TripleLeftShiftEqual, 4),
                (Some(b'<'), Some(b'<'), _) => (TripleLeftShift, 3),
                (Some(b'<'), Some(b'='), _) => (LeftShiftEqual, 3),
                (Some(b'-'), Some(b'>'), _) => (LessThanMinusArrow, 3),
                (Some(b'<'), _, _) => (LeftShift, 2),
                (Some(b'='), _, _) => (LessThanEquals, 2),
                _ => (LessThan, 1),
            },
            b'>' => match (p1, p2, p3) {
                (Some(b'>'), Some(b'>'), Some(b'=')) => (TripleRightShiftEqual, 4),
                (Some(b'>'), Some(b'>'), _) => (TripleRightShift, 3),
                (Some(b'>'), Some(b'='), _) => (RightShiftEqual, 3),
                (Some(b'>'), _, _) => (RightShift, 2),
                (Some(b'='), _, _) => (GreaterThanEquals, 2),
                _ => (GreaterThan, 1),
            },
            b'|' => match (p1, p2) {
                (Some(b'-'), Some(b'>')) => (OrMinusArrow, 3),
                (Some(b'='), Some(b'>')) => (OrEqualsArrow, 3),
                (Some(b'|'), _) => (DoubleOr, 2),
                (Some(b'='), _) => (OrEqual, 2),
                _ => (Or, 1),
            },
            b'&' => match (p1, p2) {
                (Some(b'&'), Some(b'&')) => (TripleAnd, 3),
                (Some(b'&'), _) => (DoubleAnd, 2),
                (Some(b'='), _) => (AndEqual, 2),
                _ => (And, 1),
            },
            b'@' => match p1 {
                Some(b'@') => (DoubleAt, 2),
                _ => (At, 1),
            },
            _ => return None,
        };
        self.pos += len;
        Some(kind)
    }
}

/// Accumulate decimal digits into an `i32`, saturating at `i32::MAX`.
fn saturate_i32(digits: &str) -> (i32, bool) {
    let mut value: i64 = 0;
    for c in digits.chars() {
        value = value
            .saturating_mul(10)
            .saturating_add(c.to_digit(10).unwrap() as i64);
        if value > i32::max_value() as i64 {
            return (i32::max_value(), true);
        }
    }
    (value as i32, false)
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        let token = self.lex();
        if token.kind == TokenKind::EndOfFile {
            self.done = true;
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::source::get_source_manager;
    use std::cell::Cell;

    fn add_source(content: Vec<u8>) -> Source {
        thread_local!(static INDEX: Cell<usize> = Cell::new(0));
        let idx = INDEX.with(|i| {
            let v = i.get();
            i.set(v + 1);
            v
        });
        get_source_manager().add_bytes(&format!("lexer_test_{}.sv", idx), content)
    }

    fn lex_all_bytes(content: Vec<u8>) -> (Vec<Token>, Diagnostics) {
        let source = add_source(content);
        let mut diag = Diagnostics::new();
        let tokens = Lexer::new(source, &mut diag).collect();
        (tokens, diag)
    }

    fn lex_all(text: &str) -> (Vec<Token>, Diagnostics) {
        lex_all_bytes(text.as_bytes().to_vec())
    }

    fn lex_token(text: &str) -> (Token, Diagnostics) {
        let (tokens, diag) = lex_all(text);
        (tokens.into_iter().next().unwrap(), diag)
    }

    fn lex_token_bytes(content: Vec<u8>) -> (Token, Diagnostics) {
        let (tokens, diag) = lex_all_bytes(content);
        (tokens.into_iter().next().unwrap(), diag)
    }

    #[test]
    fn invalid_chars() {
        let (token, diag) = lex_token("\x04");
        assert_eq!(token.kind, TokenKind::Unknown);
        assert_eq!(token.full_string(), "\x04");
        assert_eq!(diag.last().unwrap().code, DiagCode::NonPrintableChar);
    }

    #[test]
    fn utf8_chars() {
        let text = "\u{1f34c}";
        let (token, diag) = lex_token(text);
        assert_eq!(token.kind, TokenKind::Unknown);
        assert_eq!(token.full_string(), text);
        assert_eq!(diag.last().unwrap().code, DiagCode::Utf8Char);
    }

    #[test]
    fn unicode_boms() {
        for bom in &[&[0xefu8, 0xbb, 0xbf, b' '][..], &[0xfe, 0xff, b' '], &[0xff, 0xfe, b' ']] {
            let (_, diag) = lex_all_bytes(bom.to_vec());
            assert_eq!(diag.last().unwrap().code, DiagCode::UnicodeBom);
        }
    }

    #[test]
    fn embedded_null() {
        let (token, diag) = lex_token_bytes(vec![0]);
        assert_eq!(token.kind, TokenKind::Unknown);
        assert_eq!(diag.last().unwrap().code, DiagCode::EmbeddedNull);
    }

    #[test]
    fn line_comment() {
        let (token, diag) = lex_token("// comment");
        assert_eq!(token.kind, TokenKind::EndOfFile);
        assert_eq!(token.full_string(), "// comment");
        assert_eq!(token.trivia.len(), 1);
        assert_eq!(token.trivia[0].kind, TriviaKind::LineComment);
        assert!(diag.is_empty());
    }

    #[test]
    fn block_comment() {
        let (token, diag) = lex_token("/* comment */");
        assert_eq!(token.kind, TokenKind::EndOfFile);
        assert_eq!(token.full_string(), "/* comment */");
        assert_eq!(token.trivia[0].kind, TriviaKind::BlockComment);
        assert!(diag.is_empty());
    }

    #[test]
    fn block_comment_multiline() {
        let text = "/*\ncomment on\nmultiple lines\n*/";
        let (token, diag) = lex_token(text);
        assert_eq!(token.kind, TokenKind::EndOfFile);
        assert_eq!(token.full_string(), text);
        assert_eq!(token.trivia.len(), 1);
        assert!(diag.is_empty());
    }

    #[test]
    fn block_comment_unterminated() {
        let (token, diag) = lex_token("/* comment");
        assert_eq!(token.kind, TokenKind::EndOfFile);
        assert_eq!(token.full_string(), "/* comment");
        assert_eq!(token.trivia[0].kind, TriviaKind::BlockComment);
        assert_eq!(diag.last().unwrap().code, DiagCode::UnterminatedBlockComment);
    }

    #[test]
    fn block_comment_nested() {
        let (token, diag) = lex_token("/* comment /* stuff */");
        assert_eq!(token.kind, TokenKind::EndOfFile);
        assert_eq!(token.full_string(), "/* comment /* stuff */");
        assert_eq!(token.trivia.len(), 1);
        assert_eq!(diag.last().unwrap().code, DiagCode::NestedBlockComment);
    }

    #[test]
    fn whitespace() {
        let text = " \t\x0b\x0c token";
        let (token, diag) = lex_token(text);
        assert_eq!(token.kind, TokenKind::Identifier);
        assert_eq!(token.full_string(), text);
        assert_eq!(token.trivia.len(), 1);
        assert_eq!(token.trivia[0].kind, TriviaKind::Whitespace);
        assert!(diag.is_empty());
    }

    #[test]
    fn newlines() {
        for text in &["\r", "\r\n", "\n"] {
            let (token, diag) = lex_token(text);
            assert_eq!(token.kind, TokenKind::EndOfFile);
            assert_eq!(token.full_string(), *text);
            assert_eq!(token.trivia.len(), 1);
            assert_eq!(token.trivia[0].kind, TriviaKind::EndOfLine);
            assert!(diag.is_empty());
        }
    }

    #[test]
    fn simple_identifiers() {
        for text in &["a", "abc"] {
            let (token, diag) = lex_token(text);
            assert_eq!(token.kind, TokenKind::Identifier);
            assert_eq!(token.full_string(), *text);
            assert_eq!(token.value_text(), *text);
            assert_eq!(token.identifier_type(), Some(IdentifierType::Normal));
            assert!(diag.is_empty());
        }
    }

    #[test]
    fn mixed_identifiers() {
        for text in &["a92837asdf358", "__a$$asdf213$"] {
            let (token, diag) = lex_token(text);
            assert_eq!(token.kind, TokenKind::Identifier);
            assert_eq!(token.value_text(), *text);
            assert_eq!(token.identifier_type(), Some(IdentifierType::Normal));
            assert!(diag.is_empty());
        }
    }

    #[test]
    fn escaped_identifiers() {
        let text = "\\98\\#$%)(*lkjsd__09...asdf345";
        let (token, diag) = lex_token(text);
        assert_eq!(token.kind, TokenKind::Identifier);
        assert_eq!(token.full_string(), text);
        assert_eq!(token.value_text(), "98\\#$%)(*lkjsd__09...asdf345");
        assert_eq!(token.identifier_type(), Some(IdentifierType::Escaped));
        assert!(diag.is_empty());
    }

    #[test]
    fn system_identifiers() {
        for text in &["$hello", "$45__hello"] {
            let (token, diag) = lex_token(text);
            assert_eq!(token.kind, TokenKind::SystemIdentifier);
            assert_eq!(token.value_text(), *text);
            assert_eq!(token.identifier_type(), Some(IdentifierType::System));
            assert!(diag.is_empty());
        }
    }

    #[test]
    fn invalid_escapes() {
        let (token, diag) = lex_token("\\");
        assert_eq!(token.kind, TokenKind::Unknown);
        assert_eq!(token.full_string(), "\\");
        assert_eq!(diag.last().unwrap().code, DiagCode::EscapedWhitespace);

        let (token, diag) = lex_token("\\  ");
        assert_eq!(token.kind, TokenKind::Unknown);
        assert_eq!(token.full_string(), "\\");
        assert_eq!(diag.last().unwrap().code, DiagCode::EscapedWhitespace);
    }

    #[test]
    fn string_literal() {
        let text = "\"literal  #@$asdf\"";
        let (token, diag) = lex_token(text);
        assert_eq!(token.kind, TokenKind::StringLiteral);
        assert_eq!(token.full_string(), text);
        assert_eq!(token.value_text(), "literal  #@$asdf");
        assert!(diag.is_empty());
    }

    #[test]
    fn string_literal_newline() {
        let text = "\"literal\r\nwith new line\"";
        let (token, diag) = lex_token(text);
        assert_eq!(token.kind, TokenKind::StringLiteral);
        assert_ne!(token.full_string(), text);
        assert_eq!(token.value_text(), "literal");
        assert_eq!(diag.last().unwrap().code, DiagCode::NewlineInStringLiteral);
    }

    #[test]
    fn string_literal_escaped_newline() {
        let text = "\"literal\\\r\nwith new line\"";
        let (token, diag) = lex_token(text);
        assert_eq!(token.kind, TokenKind::StringLiteral);
        assert_eq!(token.full_string(), text);
        assert_eq!(token.value_text(), "literalwith new line");
        assert!(diag.is_empty());
    }

    #[test]
    fn string_literal_unterminated() {
        let (token, diag) = lex_token("\"literal");
        assert_eq!(token.kind, TokenKind::StringLiteral);
        assert_eq!(token.full_string(), "\"literal");
        assert_eq!(token.value_text(), "literal");
        assert_eq!(diag.last().unwrap().code, DiagCode::UnterminatedStringLiteral);
    }

    #[test]
    fn string_literal_escapes() {
        let text = "\"literal\\n\\t\\v\\f\\a \\\\ \\\" \"";
        let (token, diag) = lex_token(text);
        assert_eq!(token.kind, TokenKind::StringLiteral);
        assert_eq!(token.full_string(), text);
        assert_eq!(
            token.string_value().unwrap(),
            b"literal\n\t\x0b\x0c\x07 \\ \" "
        );
        assert!(diag.is_empty());
    }

    #[test]
    fn string_literal_octal_escape() {
        let (token, diag) = lex_token("\"literal\\377\"");
        assert_eq!(token.kind, TokenKind::StringLiteral);
        assert_eq!(token.string_value().unwrap(), b"literal\xff");
        assert!(diag.is_empty());
    }

    #[test]
    fn string_literal_bad_octal_escape() {
        let (token, diag) = lex_token("\"literal\\400\"");
        assert_eq!(token.kind, TokenKind::StringLiteral);
        assert_eq!(token.value_text(), "literal");
        assert_eq!(diag.last().unwrap().code, DiagCode::OctalEscapeCodeTooBig);
    }

    #[test]
    fn string_literal_hex_escape() {
        let (token, diag) = lex_token("\"literal\\xFa\"");
        assert_eq!(token.kind, TokenKind::StringLiteral);
        assert_eq!(token.string_value().unwrap(), b"literal\xfa");
        assert!(diag.is_empty());
    }

    #[test]
    fn string_literal_bad_hex_escape() {
        let (token, diag) = lex_token("\"literal\\xz\"");
        assert_eq!(token.kind, TokenKind::StringLiteral);
        assert_eq!(token.value_text(), "literalz");
        assert_eq!(diag.last().unwrap().code, DiagCode::InvalidHexEscapeCode);
    }

    #[test]
    fn string_literal_unknown_escape() {
        let (token, diag) = lex_token("\"literal\\i\"");
        assert_eq!(token.kind, TokenKind::StringLiteral);
        assert_eq!(token.value_text(), "literali");
        assert_eq!(diag.last().unwrap().code, DiagCode::UnknownEscapeCode);
    }

    #[test]
    fn signed_integer_literal() {
        let (token, diag) = lex_token("19248");
        assert_eq!(token.kind, TokenKind::IntegerLiteral);
        assert_eq!(token.full_string(), "19248");
        assert!(diag.is_empty());
        assert_eq!(
            token.numeric_value(),
            Some(&NumericValue::SignedInteger(19248))
        );
    }

    #[test]
    fn signed_integer_literal_trailing_whitespace() {
        // Based literals may have whitespace before the base, so the lexer
        // scans ahead speculatively; a plain integer must not swallow it.
        let text = "192__48         \x0b\t ";
        let (token, diag) = lex_token(text);
        assert_eq!(token.kind, TokenKind::IntegerLiteral);
        assert_ne!(token.full_string(), text);
        assert!(diag.is_empty());
        assert_eq!(
            token.numeric_value(),
            Some(&NumericValue::SignedInteger(19248))
        );
    }

    #[test]
    fn signed_integer_literal_overflow() {
        let (token, diag) = lex_token("9999999999");
        assert_eq!(token.kind, TokenKind::IntegerLiteral);
        assert_eq!(token.full_string(), "9999999999");
        assert_eq!(diag.last().unwrap().code, DiagCode::SignedLiteralTooLarge);
        assert_eq!(
            token.numeric_value(),
            Some(&NumericValue::SignedInteger(2147483647))
        );
    }

    #[test]
    fn real_literal_fraction() {
        let (token, diag) = lex_token("32.57");
        assert_eq!(token.kind, TokenKind::RealLiteral);
        assert_eq!(token.full_string(), "32.57");
        assert!(diag.is_empty());
        assert_eq!(token.numeric_value(), Some(&NumericValue::Real(32.57)));
    }

    #[test]
    fn real_literal_missing_fraction() {
        let (token, diag) = lex_token("32.");
        assert_eq!(token.kind, TokenKind::RealLiteral);
        assert_eq!(token.full_string(), "32.");
        assert_eq!(diag.last().unwrap().code, DiagCode::MissingFractionalDigits);
        assert_eq!(token.numeric_value(), Some(&NumericValue::Real(32.0)));
    }

    #[test]
    fn real_literal_exponent() {
        let (token, diag) = lex_token("32e57");
        assert_eq!(token.kind, TokenKind::RealLiteral);
        assert_eq!(token.full_string(), "32e57");
        assert!(diag.is_empty());
        assert_eq!(token.numeric_value(), Some(&NumericValue::Real(32e57)));
    }

    #[test]
    fn real_literal_plus_exponent() {
        let (token, diag) = lex_token("0000032E+00057");
        assert_eq!(token.kind, TokenKind::RealLiteral);
        assert_eq!(token.full_string(), "0000032E+00057");
        assert!(diag.is_empty());
        assert_eq!(token.numeric_value(), Some(&NumericValue::Real(32e57)));
    }

    #[test]
    fn real_literal_minus_exponent() {
        let (token, diag) = lex_token("32e-57");
        assert_eq!(token.kind, TokenKind::RealLiteral);
        assert!(diag.is_empty());
        assert_eq!(token.numeric_value(), Some(&NumericValue::Real(32e-57)));
    }

    #[test]
    fn real_literal_fraction_exponent() {
        let (token, diag) = lex_token("32.3456e57");
        assert_eq!(token.kind, TokenKind::RealLiteral);
        assert!(diag.is_empty());
        assert_eq!(token.numeric_value(), Some(&NumericValue::Real(32.3456e57)));
    }

    #[test]
    fn real_literal_bad_exponent() {
        let (token, diag) = lex_token("32ez");
        assert_eq!(token.kind, TokenKind::RealLiteral);
        assert_eq!(token.full_string(), "32e");
        assert_eq!(diag.last().unwrap().code, DiagCode::MissingExponentDigits);
        assert_eq!(token.numeric_value(), Some(&NumericValue::Real(32.0)));
    }

    #[test]
    fn real_literal_exponent_overflow() {
        let (token, diag) = lex_token("32e9000");
        assert_eq!(token.kind, TokenKind::RealLiteral);
        assert_eq!(token.full_string(), "32e9000");
        assert_eq!(diag.last().unwrap().code, DiagCode::RealExponentTooLarge);
        match token.numeric_value() {
            Some(&NumericValue::Real(v)) => assert!(v.is_infinite()),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn real_literal_digit_overflow() {
        let text = "9".repeat(400) + ".0";
        let (token, diag) = lex_token(&text);
        assert_eq!(token.kind, TokenKind::RealLiteral);
        assert_eq!(token.full_string(), text);
        assert_eq!(diag.last().unwrap().code, DiagCode::RealExponentTooLarge);
        match token.numeric_value() {
            Some(&NumericValue::Real(v)) => assert!(v.is_infinite()),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn vector_literal_zero_size() {
        let (token, diag) = lex_token("0'd34");
        assert_eq!(token.kind, TokenKind::IntegerLiteral);
        assert_eq!(token.full_string(), "0'd34");
        assert_eq!(diag.last().unwrap().code, DiagCode::IntegerSizeZero);
    }

    #[test]
    fn vector_literal_size_overflow() {
        let (token, diag) = lex_token("9999999999999999999'd34");
        assert_eq!(token.kind, TokenKind::IntegerLiteral);
        assert_eq!(token.full_string(), "9999999999999999999'd34");
        assert_eq!(diag.last().unwrap().code, DiagCode::IntegerSizeTooLarge);
    }

    #[test]
    fn vector_literal_missing_base() {
        let (token, diag) = lex_token("12'34");
        assert_eq!(token.kind, TokenKind::IntegerLiteral);
        assert_eq!(token.full_string(), "12'");
        assert_eq!(diag.last().unwrap().code, DiagCode::MissingVectorBase);
    }

    fn check_vector(text: &str, size: Option<u32>, signed: bool, base: LiteralBase, digits: &str) {
        let (token, diag) = lex_token(text);
        assert_eq!(token.kind, TokenKind::IntegerLiteral, "text {:?}", text);
        assert_eq!(token.full_string(), text);
        assert!(diag.is_empty(), "unexpected diagnostics for {:?}", text);
        match token.numeric_value() {
            Some(&NumericValue::Vector(v)) => {
                assert_eq!(v.size, size);
                assert_eq!(v.signed, signed);
                assert_eq!(v.base, base);
                assert_eq!(&*v.digits.as_str(), digits);
            }
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn decimal_vector_literals() {
        check_vector(
            "123'd34_562xXz??",
            Some(123),
            false,
            LiteralBase::Decimal,
            "34562xXz??",
        );
        check_vector(
            "123   'D   34_562xXz??",
            Some(123),
            false,
            LiteralBase::Decimal,
            "34562xXz??",
        );
        check_vector(
            "'d34_562xXz??",
            None,
            false,
            LiteralBase::Decimal,
            "34562xXz??",
        );
    }

    #[test]
    fn decimal_vector_literal_missing_digits() {
        let (token, diag) = lex_token("4'dggg");
        assert_eq!(token.kind, TokenKind::IntegerLiteral);
        assert_eq!(token.full_string(), "4'd");
        assert_eq!(diag.last().unwrap().code, DiagCode::MissingVectorDigits);
    }

    #[test]
    fn octal_vector_literals() {
        check_vector(
            "123'o34_562xXz??",
            Some(123),
            false,
            LiteralBase::Octal,
            "34562xXz??",
        );
        check_vector(
            "123   'O   34_562xXz??",
            Some(123),
            false,
            LiteralBase::Octal,
            "34562xXz??",
        );
        check_vector("'o34_562xXz??", None, false, LiteralBase::Octal, "34562xXz??");
    }

    #[test]
    fn octal_vector_literal_missing_digits() {
        let (token, diag) = lex_token("4'o9");
        assert_eq!(token.full_string(), "4'o");
        assert_eq!(diag.last().unwrap().code, DiagCode::MissingVectorDigits);
    }

    #[test]
    fn hex_vector_literals() {
        check_vector(
            "123'h3f4_56aA02xXz??",
            Some(123),
            false,
            LiteralBase::Hex,
            "3f456aA02xXz??",
        );
        check_vector(
            "123   'H   ffF_a562xXz??",
            Some(123),
            false,
            LiteralBase::Hex,
            "ffFa562xXz??",
        );
        check_vector(
            "'h3f4_56aA02xXz??",
            None,
            false,
            LiteralBase::Hex,
            "3f456aA02xXz??",
        );
    }

    #[test]
    fn hex_vector_literal_missing_digits() {
        let (token, diag) = lex_token("4'hG");
        assert_eq!(token.full_string(), "4'h");
        assert_eq!(diag.last().unwrap().code, DiagCode::MissingVectorDigits);
    }

    #[test]
    fn binary_vector_literals() {
        check_vector(
            "123'b1101_xX?zZ",
            Some(123),
            false,
            LiteralBase::Binary,
            "1101xX?zZ",
        );
        check_vector(
            "123   'B   1101_xX??zZ",
            Some(123),
            false,
            LiteralBase::Binary,
            "1101xX??zZ",
        );
        check_vector("'b1101_xX?zZ", None, false, LiteralBase::Binary, "1101xX?zZ");
    }

    #[test]
    fn binary_vector_literal_missing_digits() {
        let (token, diag) = lex_token("4'b2");
        assert_eq!(token.full_string(), "4'b");
        assert_eq!(diag.last().unwrap().code, DiagCode::MissingVectorDigits);
    }

    #[test]
    fn signed_vector_literals() {
        check_vector("4 'shf", Some(4), true, LiteralBase::Hex, "f");
        check_vector("16'sd?", Some(16), true, LiteralBase::Decimal, "?");
    }

    #[test]
    fn unsized_unbased_literals() {
        for (text, bit) in &[
            ("'0", '0'),
            ("'1", '1'),
            ("'x", 'x'),
            ("'X", 'x'),
            ("'z", 'z'),
            ("'Z", 'z'),
            ("'?", 'z'),
        ] {
            let (token, diag) = lex_token(text);
            assert_eq!(token.kind, TokenKind::IntegerLiteral);
            assert_eq!(token.full_string(), *text);
            assert!(diag.is_empty());
            assert_eq!(token.numeric_value(), Some(&NumericValue::UnsizedBit(*bit)));
        }
    }

    #[test]
    fn unsized_literal_invalid() {
        let (token, diag) = lex_token("'f");
        assert_eq!(token.kind, TokenKind::IntegerLiteral);
        assert_eq!(token.full_string(), "'");
        assert_eq!(diag.last().unwrap().code, DiagCode::InvalidUnsizedLiteral);
    }

    #[test]
    fn directives() {
        for &(kind, text, _) in DIRECTIVES {
            let (token, diag) = lex_token(text);
            assert_eq!(token.kind, TokenKind::Directive, "text {:?}", text);
            assert_eq!(token.full_string(), text);
            assert_eq!(token.value_text(), text);
            assert_eq!(token.value, TokenValue::Directive(kind));
            assert!(diag.is_empty());
        }
    }

    #[test]
    fn misplaced_directive_char() {
        let (token, diag) = lex_token("`");
        assert_eq!(token.kind, TokenKind::Unknown);
        assert_eq!(token.full_string(), "`");
        assert_eq!(diag.last().unwrap().code, DiagCode::MisplacedDirectiveChar);
    }

    #[test]
    fn macro_usage() {
        let (token, diag) = lex_token("`something");
        assert_eq!(token.kind, TokenKind::MacroUsage);
        assert_eq!(token.full_string(), "`something");
        assert_eq!(token.value_text(), "`something");
        assert!(diag.is_empty());
    }

    #[test]
    fn all_punctuation() {
        for &(kind, text) in PUNCTUATION {
            let (token, diag) = lex_token(text);
            assert_eq!(token.kind, kind, "text {:?}", text);
            assert_eq!(token.full_string(), text);
            assert_eq!(token.value_text(), text);
            assert!(diag.is_empty(), "unexpected diagnostics for {:?}", text);
        }
    }

    #[test]
    fn full_strings_cover_input() {
        let text = "module foo; // x\n  wire [3:0] a = 4'b10_zx;\n  real r = 1.5e3;\n\
                    assign a = b <<< 2; $display(\"hi\\n\"); `timescale\nendmodule\n";
        let (tokens, _) = lex_all(text);
        let joined: String = tokens.iter().map(|t| t.full_string()).collect();
        assert_eq!(joined, text);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::EndOfFile);
    }

    #[test]
    fn eof_carries_trailing_trivia() {
        let (tokens, _) = lex_all("a // trailing\n");
        let eof = tokens.last().unwrap();
        assert_eq!(eof.kind, TokenKind::EndOfFile);
        assert_eq!(eof.trivia.len(), 3);
        assert_eq!(eof.trivia[1].kind, TriviaKind::LineComment);
        assert_eq!(eof.trivia[2].kind, TriviaKind::EndOfLine);
    }
}
