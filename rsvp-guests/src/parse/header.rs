//! Address-header parser
//!
//! Accepts the contents of a pasted `To:`/`Cc:` header: a comma-separated
//! list of `addr@host`, `Display Name <addr@host>` or `"Quoted, Name" <addr>`
//! entries, with RFC 5322 comments and groups (`Team: a@x.com, b@x.com;`).
//! The blob is parsed as a unit: any syntax error rejects all of it.

use rsvp_common::email;
use thiserror::Error;

use super::ParsedGuest;

/// Why a pasted header could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderParseError {
    #[error("unterminated quoted string starting at position {0}")]
    UnterminatedQuote(usize),

    #[error("unterminated comment starting at position {0}")]
    UnterminatedComment(usize),

    #[error("unterminated angle address starting at position {0}")]
    UnterminatedAngle(usize),

    #[error("unexpected '{ch}' at position {pos}")]
    Unexpected { ch: char, pos: usize },

    #[error("'{0}' has a display name but no <address>")]
    MissingAngle(String),

    #[error("group '{0}' is missing its closing ';'")]
    UnterminatedGroup(String),
}

/// One mailbox as written in the header
#[derive(Debug, Clone, PartialEq, Eq)]
struct Mailbox {
    display_name: Option<String>,
    address: String,
}

/// Parse a pasted header blob into guests, each with a party size of 1
///
/// A leading `To:`, `Cc:`, `Bcc:` or `From:` label is ignored. Entries with an
/// empty address (such as `<>`) are dropped.
pub fn parse_header(blob: &str) -> Result<Vec<ParsedGuest>, HeaderParseError> {
    let mailboxes = AddressParser::new(strip_header_label(blob)).parse_list(None)?;

    Ok(mailboxes
        .into_iter()
        .filter(|m| !m.address.trim().is_empty())
        .map(|m| ParsedGuest {
            name: email::name_or_derived(m.display_name.as_deref(), &m.address),
            email: email::normalize(&m.address),
            party_size: 1,
        })
        .collect())
}

fn strip_header_label(blob: &str) -> &str {
    let trimmed = blob.trim_start();
    for label in ["to", "cc", "bcc", "from"] {
        let Some(head) = trimmed.get(..label.len()) else {
            continue;
        };
        if head.eq_ignore_ascii_case(label) {
            let rest = trimmed[label.len()..].trim_start();
            if let Some(list) = rest.strip_prefix(':') {
                return list;
            }
        }
    }
    blob
}

struct AddressParser {
    chars: Vec<char>,
    pos: usize,
}

impl AddressParser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Parse mailboxes up to end of input, or up to `;` inside a group
    fn parse_list(&mut self, group: Option<&str>) -> Result<Vec<Mailbox>, HeaderParseError> {
        let mut out = Vec::new();
        loop {
            self.skip_cfws()?;
            match self.peek() {
                None => {
                    return match group {
                        Some(name) => Err(HeaderParseError::UnterminatedGroup(name.to_string())),
                        None => Ok(out),
                    };
                }
                Some(',') => self.pos += 1,
                Some(';') if group.is_some() => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(_) => self.parse_entry(group.is_some(), &mut out)?,
            }
        }
    }

    /// Parse one mailbox (or a whole group) and stop before its separator
    fn parse_entry(&mut self, in_group: bool, out: &mut Vec<Mailbox>) -> Result<(), HeaderParseError> {
        // `display` collapses whitespace for use as a name; `raw` keeps quoting
        // so a bare addr-spec such as "john.doe"@host survives intact.
        let mut display = String::new();
        let mut raw = String::new();
        let mut pending_space = false;
        let mut gap = false;

        while let Some(c) = self.peek() {
            match c {
                ',' => break,
                ';' if in_group => break,
                c if c.is_whitespace() => {
                    self.pos += 1;
                    pending_space = true;
                }
                '(' => {
                    self.skip_comment()?;
                    pending_space = true;
                }
                '"' => {
                    let text = self.quoted()?;
                    if pending_space && !raw.is_empty() {
                        gap = true;
                        display.push(' ');
                    }
                    pending_space = false;
                    display.push_str(&text);
                    raw.push('"');
                    raw.push_str(&text);
                    raw.push('"');
                }
                '<' => {
                    let address = self.angle()?;
                    self.expect_separator(in_group)?;
                    out.push(Mailbox {
                        display_name: non_empty(display),
                        address,
                    });
                    return Ok(());
                }
                ':' if !in_group => {
                    self.pos += 1;
                    let name = display.trim().to_string();
                    let members = self.parse_list(Some(&name))?;
                    out.extend(members);
                    return self.expect_separator(false);
                }
                ':' | '>' | ';' => {
                    return Err(HeaderParseError::Unexpected { ch: c, pos: self.pos });
                }
                _ => {
                    self.pos += 1;
                    if pending_space && !raw.is_empty() {
                        gap = true;
                        display.push(' ');
                    }
                    pending_space = false;
                    display.push(c);
                    raw.push(c);
                }
            }
        }

        if raw.is_empty() {
            return Ok(());
        }
        if gap {
            return Err(HeaderParseError::MissingAngle(display));
        }
        out.push(Mailbox {
            display_name: None,
            address: raw,
        });
        Ok(())
    }

    /// After an address only whitespace and comments may precede the separator
    fn expect_separator(&mut self, in_group: bool) -> Result<(), HeaderParseError> {
        self.skip_cfws()?;
        match self.peek() {
            None | Some(',') => Ok(()),
            Some(';') if in_group => Ok(()),
            Some(ch) => Err(HeaderParseError::Unexpected { ch, pos: self.pos }),
        }
    }

    fn skip_cfws(&mut self) -> Result<(), HeaderParseError> {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if c == '(' {
                self.skip_comment()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Skip a possibly nested `( ... )` comment
    fn skip_comment(&mut self) -> Result<(), HeaderParseError> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => self.pos += 1,
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(HeaderParseError::UnterminatedComment(start))
    }

    /// Read a `"..."` string, resolving backslash escapes
    fn quoted(&mut self) -> Result<String, HeaderParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '"' => return Ok(text),
                '\\' => match self.peek() {
                    Some(escaped) => {
                        self.pos += 1;
                        text.push(escaped);
                    }
                    None => break,
                },
                _ => text.push(c),
            }
        }
        Err(HeaderParseError::UnterminatedQuote(start))
    }

    /// Read a `<...>` address
    fn angle(&mut self) -> Result<String, HeaderParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut address = String::new();
        while let Some(c) = self.peek() {
            match c {
                '>' => {
                    self.pos += 1;
                    return Ok(address.trim().to_string());
                }
                '<' | ',' => break,
                _ => {
                    self.pos += 1;
                    address.push(c);
                }
            }
        }
        Err(HeaderParseError::UnterminatedAngle(start))
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guest(name: &str, email: &str) -> ParsedGuest {
        ParsedGuest {
            name: name.to_string(),
            email: email.to_string(),
            party_size: 1,
        }
    }

    #[test]
    fn test_mixed_entries() {
        let guests = parse_header(
            "\"Doe, Jane\" <Jane@Example.com>, Bob Smith <bob@example.com>, carol.king@example.com",
        )
        .unwrap();

        assert_eq!(
            guests,
            vec![
                guest("Doe, Jane", "jane@example.com"),
                guest("Bob Smith", "bob@example.com"),
                guest("carol king", "carol.king@example.com"),
            ]
        );
    }

    #[test]
    fn test_header_label_is_ignored() {
        let guests = parse_header("To: Ann <ann@example.com>").unwrap();
        assert_eq!(guests, vec![guest("Ann", "ann@example.com")]);
    }

    #[test]
    fn test_repeated_entries_are_all_returned() {
        let guests = parse_header("a@example.com, a@example.com").unwrap();
        assert_eq!(guests.len(), 2);
    }

    #[test]
    fn test_comments_and_empty_entries_are_skipped() {
        let guests = parse_header(" , dan@example.com (Dan at work),, <> ,").unwrap();
        assert_eq!(guests, vec![guest("dan", "dan@example.com")]);
    }

    #[test]
    fn test_quoted_local_part_keeps_quotes_in_address() {
        let guests = parse_header("\"john.doe\"@example.com").unwrap();
        assert_eq!(guests, vec![guest("john doe", "\"john.doe\"@example.com")]);
    }

    #[test]
    fn test_groups_are_flattened() {
        let guests = parse_header("Family: Mum <mum@example.com>, dad@example.com;, eve@example.com").unwrap();
        assert_eq!(
            guests,
            vec![
                guest("Mum", "mum@example.com"),
                guest("dad", "dad@example.com"),
                guest("eve", "eve@example.com"),
            ]
        );
    }

    #[test]
    fn test_empty_blob_yields_nothing() {
        assert!(parse_header("").unwrap().is_empty());
        assert!(parse_header("   ").unwrap().is_empty());
    }

    #[test]
    fn test_unterminated_quote_fails_whole_blob() {
        let err = parse_header("ok@example.com, \"Jane <jane@example.com>").unwrap_err();
        assert!(matches!(err, HeaderParseError::UnterminatedQuote(_)));
    }

    #[test]
    fn test_malformed_entries_fail() {
        assert!(matches!(
            parse_header("Jane <jane@example.com"),
            Err(HeaderParseError::UnterminatedAngle(_))
        ));
        assert!(matches!(
            parse_header("Jane Doe jane@example.com"),
            Err(HeaderParseError::MissingAngle(_))
        ));
        assert!(matches!(
            parse_header("Jane <jane@example.com> extra"),
            Err(HeaderParseError::Unexpected { ch: 'e', .. })
        ));
        assert!(matches!(
            parse_header("Team: a@example.com"),
            Err(HeaderParseError::UnterminatedGroup(_))
        ));
        assert!(matches!(
            parse_header("a@example.com (unclosed"),
            Err(HeaderParseError::UnterminatedComment(_))
        ));
    }
}
