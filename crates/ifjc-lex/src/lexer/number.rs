//! Number literal lexing.
//!
//! Decimal integers and decimal floats with an optional fractional
//! part and an optional signed exponent. A dot followed by a
//! non-digit terminates the integer, so `10.field` lexes as integer,
//! dot, identifier; the range operators `...` and `..<` are checked
//! before a dot is consumed as a fraction point.

use ifjc_util::{DiagResult, ErrorKind};

use crate::token::{TokenCategory, TokenKind, TokenValue, Whitespace};
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes a decimal integer or floating point literal.
    pub(crate) fn lex_number(&mut self, ws: Whitespace) -> DiagResult<()> {
        let start = self.cursor.position();
        let mut has_dot = false;
        let mut has_exponent = false;

        while self.cursor.current_char().is_ascii_digit() {
            self.cursor.advance();
        }

        if self.cursor.current_char() == '.'
            && !self.cursor.starts_with("...")
            && !self.cursor.starts_with("..<")
        {
            if self.cursor.peek_char(1).is_ascii_digit() {
                has_dot = true;
                self.cursor.advance();

                while self.cursor.current_char().is_ascii_digit() {
                    self.cursor.advance();
                }

                // A second dot would start another fraction.
                if self.cursor.current_char() == '.'
                    && self.cursor.peek_char(1).is_ascii_digit()
                    && !self.cursor.starts_with("...")
                    && !self.cursor.starts_with("..<")
                {
                    return Err(self.error_here(
                        "number literal can only contain one floating point dot '.'",
                    ));
                }
            }
            // Dot followed by a non-digit: the integer ends here and
            // the dot lexes as its own punctuator.
        }

        if matches!(self.cursor.current_char(), 'e' | 'E') {
            has_exponent = true;
            self.cursor.advance();

            if matches!(self.cursor.current_char(), '+' | '-') {
                self.cursor.advance();
            }

            if !self.cursor.current_char().is_ascii_digit() {
                let mut err = self.error_here("expected a digit in floating point exponent");
                err.kind = ErrorKind::Syntax;
                return Err(err);
            }

            while self.cursor.current_char().is_ascii_digit() {
                self.cursor.advance();
            }
        }

        let text = self.cursor.slice_from(start);

        let token = if has_dot || has_exponent {
            match text.parse::<f64>() {
                Ok(value) if value.is_finite() => self.make_token(
                    ws,
                    TokenCategory::Literal,
                    TokenKind::Floating,
                    TokenValue::Floating(value),
                ),
                _ => {
                    return Err(
                        self.error_at_token(format!("invalid floating point literal '{}'", text))
                    )
                }
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => self.make_token(
                    ws,
                    TokenCategory::Literal,
                    TokenKind::Integer,
                    TokenValue::Integer(value),
                ),
                Err(_) => {
                    return Err(
                        self.error_at_token(format!("integer literal '{}' overflows", text))
                    )
                }
            }
        };

        self.push_token(token);
        Ok(())
    }
}
