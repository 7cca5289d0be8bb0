//! IP Fabric filter expressions.
//!
//! Parses the compact filter syntax accepted on the command line into the JSON
//! filter object the IP Fabric table API expects:
//!
//! ```text
//! and(siteName = atl1, or(hostname =~ '^sw', vendor like arista))
//! ```
//!
//! becomes
//!
//! ```json
//! {"and": [{"siteName": ["eq", "atl1"]},
//!          {"or": [{"hostname": ["reg", "^sw"]}, {"vendor": ["like", "arista"]}]}]}
//! ```

use serde_json::{json, Value};

use crate::error_handling::FilterError;

/// Parses a filter expression.
pub fn parse_filter(expr: &str) -> Result<Value, FilterError> {
    let mut parser = Parser { src: expr, pos: 0 };
    let value = parser.expr()?;
    parser.skip_ws();
    if parser.pos < parser.src.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn error(&self, message: impl Into<String>) -> FilterError {
        FilterError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn eat(&mut self, token: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(token) {
            self.pos += token.len_utf8();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<&'a str, FilterError> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected a field name"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn expr(&mut self) -> Result<Value, FilterError> {
        let name = self.ident()?;
        let group = name.eq_ignore_ascii_case("and") || name.eq_ignore_ascii_case("or");
        if group && self.eat('(') {
            return self.group(name.to_ascii_lowercase());
        }
        self.condition(name)
    }

    fn group(&mut self, op: String) -> Result<Value, FilterError> {
        let mut items = vec![self.expr()?];
        loop {
            if self.eat(',') {
                items.push(self.expr()?);
            } else if self.eat(')') {
                break;
            } else {
                return Err(self.error("expected ',' or ')'"));
            }
        }
        Ok(json!({ op: items }))
    }

    fn operator(&mut self) -> Result<&'static str, FilterError> {
        self.skip_ws();
        let rest = self.rest();
        let (op, len) = if rest.starts_with("!=~") {
            ("nreg", 3)
        } else if rest.starts_with("!=") {
            ("neq", 2)
        } else if rest.starts_with("=~") {
            ("reg", 2)
        } else if rest.starts_with('=') {
            ("eq", 1)
        } else if rest.len() >= 4
            && rest[..4].eq_ignore_ascii_case("like")
            && rest[4..].starts_with(char::is_whitespace)
        {
            ("like", 4)
        } else {
            return Err(self.error("expected an operator (=, !=, =~, !=~, like)"));
        };
        self.pos += len;
        Ok(op)
    }

    fn value(&mut self) -> Result<String, FilterError> {
        self.skip_ws();
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                let body = &self.rest()[1..];
                match body.find(quote) {
                    Some(end) => {
                        self.pos += end + 2;
                        Ok(body[..end].to_string())
                    }
                    None => Err(self.error("unterminated quoted value")),
                }
            }
            Some(_) => {
                let rest = self.rest();
                let len = rest
                    .find(|c: char| c == ',' || c == ')' || c.is_whitespace())
                    .unwrap_or(rest.len());
                if len == 0 {
                    return Err(self.error("expected a value"));
                }
                self.pos += len;
                Ok(rest[..len].to_string())
            }
            None => Err(self.error("expected a value")),
        }
    }

    fn condition(&mut self, field: &str) -> Result<Value, FilterError> {
        let op = self.operator()?;
        let value = self.value()?;
        Ok(json!({ field: [op, value] }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_condition() {
        assert_eq!(
            parse_filter("hostname = sw1").unwrap(),
            json!({"hostname": ["eq", "sw1"]})
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            parse_filter("hostname != sw1").unwrap(),
            json!({"hostname": ["neq", "sw1"]})
        );
        assert_eq!(
            parse_filter("hostname =~ '^sw'").unwrap(),
            json!({"hostname": ["reg", "^sw"]})
        );
        assert_eq!(
            parse_filter("hostname !=~ \"^rt\"").unwrap(),
            json!({"hostname": ["nreg", "^rt"]})
        );
        assert_eq!(
            parse_filter("vendor like cisco").unwrap(),
            json!({"vendor": ["like", "cisco"]})
        );
    }

    #[test]
    fn test_nested_groups() {
        let parsed =
            parse_filter("and(siteName = atl1, or(hostname =~ '^sw', vendor like arista))")
                .unwrap();
        assert_eq!(
            parsed,
            json!({"and": [
                {"siteName": ["eq", "atl1"]},
                {"or": [{"hostname": ["reg", "^sw"]}, {"vendor": ["like", "arista"]}]}
            ]})
        );
    }

    #[test]
    fn test_quoted_value_with_spaces_and_commas() {
        assert_eq!(
            parse_filter("and(hostname = sw1, intName = 'Ethernet 1, uplink')").unwrap(),
            json!({"and": [{"hostname": ["eq", "sw1"]}, {"intName": ["eq", "Ethernet 1, uplink"]}]})
        );
    }

    #[test]
    fn test_errors_report_offset() {
        let err = parse_filter("hostname sw1").unwrap_err();
        assert_eq!(err.offset, 9);
        assert!(parse_filter("and(hostname = sw1").is_err());
        assert!(parse_filter("hostname = 'sw1").is_err());
        assert!(parse_filter("hostname = sw1 extra").is_err());
        assert!(parse_filter("").is_err());
    }
}
