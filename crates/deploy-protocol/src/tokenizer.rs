//! Splits a request line into tokens.

/// Splits `line` on whitespace, keeping double-quoted substrings together.
///
/// A quoted token runs from an opening `"` to the next `"` with at least one
/// character in between. Leading and trailing quote characters are trimmed
/// from every token and tokens that end up empty are dropped.
#[must_use]
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = line;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        let end = quoted_len(rest).unwrap_or_else(|| {
            rest.find(char::is_whitespace).unwrap_or(rest.len())
        });
        let (raw, tail) = rest.split_at(end);
        let token = raw.trim_matches('"');
        if !token.is_empty() {
            tokens.push(token.to_owned());
        }
        rest = tail;
    }

    tokens
}

/// Byte length of a quoted token at the start of `text`, including quotes.
fn quoted_len(text: &str) -> Option<usize> {
    let body = text.strip_prefix('"')?;
    let mut chars = body.char_indices();
    // The first character is always part of the body, even if it is a quote.
    chars.next()?;
    chars
        .find(|&(_, ch)| ch == '"')
        .map(|(offset, _)| offset + 2)
}
