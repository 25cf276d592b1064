//! Delimited-text (CSV/TSV) line parser
//!
//! Lines are parsed one at a time with no header row. A tab anywhere on the
//! line makes it tab-delimited, otherwise it is comma-delimited. The first
//! email-looking field is the guest's address, the number of email-looking
//! fields is the party size, and the first other non-empty field is the name.

use rsvp_common::email;

use super::ParsedGuest;

/// Parse one line; `None` if it holds no valid email
pub fn parse_line(line: &str) -> Option<ParsedGuest> {
    if line.trim().is_empty() {
        return None;
    }

    let delimiter = if line.contains('\t') { '\t' } else { ',' };
    let fields = split_fields(line, delimiter);

    let mut address: Option<&str> = None;
    let mut name: Option<&str> = None;
    let mut email_count: i64 = 0;

    for field in &fields {
        if email::is_valid(field) {
            email_count += 1;
            if address.is_none() {
                address = Some(field);
            }
        } else if !field.is_empty() && name.is_none() {
            name = Some(field);
        }
    }

    let address = address?;
    Some(ParsedGuest {
        name: email::name_or_derived(name, address),
        email: email::normalize(address),
        party_size: email_count,
    })
}

/// Split on `delimiter`, keeping quoted spans together
///
/// A single or double quote opens a span only at the start of a field; the
/// span ends at the matching quote. A quote that is never closed is taken
/// literally and the rest of the line is split as if it were not there.
/// Every field is trimmed and cleaned by [`finish_field`].
fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    // Opening quote and the byte offset just past it
    let mut quote: Option<(char, usize)> = None;

    for (i, c) in line.char_indices() {
        match quote {
            Some((q, _)) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == delimiter => fields.push(finish_field(&mut current)),
            None if (c == '"' || c == '\'') && current.trim().is_empty() => {
                current.clear();
                quote = Some((c, i + c.len_utf8()));
            }
            None => current.push(c),
        }
    }

    if let Some((_, rest)) = quote {
        fields.extend(split_fields(&line[rest..], delimiter));
        return fields;
    }
    fields.push(finish_field(&mut current));
    fields
}

/// Trim a field and drop its quote characters
///
/// Double quotes are removed wherever they appear. Single quotes are only
/// stripped at the edges so apostrophes inside names (O'Brien) survive.
fn finish_field(current: &mut String) -> String {
    let unquoted: String = current.chars().filter(|c| *c != '"').collect();
    let field = unquoted.trim().trim_matches('\'').trim().to_string();
    current.clear();
    field
}
