// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use crate::error::ParseError;

/// One unfolded iCalendar content line: `NAME;PARAM=VALUE:value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    /// Upper-cased property name.
    pub name: String,
    /// Parameters in source order. Names are upper-cased, values unquoted.
    pub params: Vec<(String, String)>,
    /// Raw property value, untouched.
    pub value: String,
    /// 1-based line number of the first physical line.
    pub number: usize,
}

impl ContentLine {
    /// Parses a single unfolded line.
    pub fn parse(raw: &str, number: usize) -> Result<Self, ParseError> {
        let malformed = |message: &str| ParseError::MalformedLine {
            line: number,
            message: message.to_string(),
        };

        // Split name+params from value at the first colon outside quotes.
        let mut in_quotes = false;
        let mut colon = None;
        for (i, c) in raw.char_indices() {
            match c {
                '"' => in_quotes = !in_quotes,
                ':' if !in_quotes => {
                    colon = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let colon = colon.ok_or_else(|| malformed("missing ':' separator"))?;
        let (head, rest) = raw.split_at(colon);
        let value = rest.get(1..).unwrap_or_default().to_string();

        let mut parts = split_unquoted(head, ';');
        let name = parts.next().unwrap_or_default().trim().to_uppercase();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(malformed("invalid property name"));
        }

        let mut params = Vec::new();
        for part in parts {
            let (pname, pvalue) = part
                .split_once('=')
                .ok_or_else(|| malformed("parameter without '='"))?;
            params.push((
                pname.trim().to_uppercase(),
                pvalue.trim().trim_matches('"').to_string(),
            ));
        }

        Ok(Self {
            name,
            params,
            value,
            number,
        })
    }

    /// Looks up a parameter value by upper-cased name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Splits on `sep` while respecting double quotes.
fn split_unquoted(text: &str, sep: char) -> impl Iterator<Item = &str> {
    let mut pieces = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                pieces.push(text.get(start..i).unwrap_or_default());
                start = i + sep.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(text.get(start..).unwrap_or_default());
    pieces.into_iter()
}

/// Unfolds physical lines into logical lines.
///
/// A physical line starting with a space or tab continues the previous
/// logical line (RFC 5545 §3.1). The returned line numbers refer to the first
/// physical line of each logical line.
#[must_use]
pub fn unfold(text: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();
    for (i, raw) in text.split(['\n']).enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(rest) = raw.strip_prefix([' ', '\t'])
            && let Some((_, last)) = lines.last_mut()
        {
            last.push_str(rest);
            continue;
        }
        lines.push((i + 1, raw.to_string()));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_params_value() {
        let line = ContentLine::parse("DTSTART;TZID=Europe/Budapest:20260102T100000", 7).unwrap();
        assert_eq!(line.name, "DTSTART");
        assert_eq!(line.param("TZID"), Some("Europe/Budapest"));
        assert_eq!(line.value, "20260102T100000");
        assert_eq!(line.number, 7);
    }

    #[test]
    fn colon_inside_quoted_param_is_not_a_separator() {
        let line =
            ContentLine::parse("ATTENDEE;CN=\"Doe: John\":mailto:john@example.org", 1).unwrap();
        assert_eq!(line.param("CN"), Some("Doe: John"));
        assert_eq!(line.value, "mailto:john@example.org");
    }

    #[test]
    fn missing_colon_is_malformed() {
        let err = ContentLine::parse("THIS IS NOT A PROPERTY", 4).unwrap_err();
        assert_eq!(err.line_number(), Some(4));
    }

    #[test]
    fn unfolds_continuation_lines() {
        let lines = unfold("SUMMARY:part one\r\n  and two\r\nUID:x\r\n");
        assert_eq!(lines[0], (1, "SUMMARY:part one and two".to_string()));
        assert_eq!(lines[1], (3, "UID:x".to_string()));
    }
}
