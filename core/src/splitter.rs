//! Line splitter: one raw text line into trimmed field values.
//!
//! Quote handling is best effort: an unbalanced quote never errors, the
//! remainder of the line simply accumulates into the current field.

/// Split `line` on `delimiter`, honouring quoted regions and `""` escapes.
pub fn split_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                current.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if c == delimiter && !in_quotes {
            fields.push(finish_field(&current));
            current.clear();
        } else {
            current.push(c);
        }
    }
    fields.push(finish_field(&current));
    fields
}

/// Count occurrences of `needle` outside quoted regions.
pub fn count_unquoted(line: &str, needle: char) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for c in line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == needle && !in_quotes {
            count += 1;
        }
    }
    count
}

fn finish_field(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.to_string(),
        None if trimmed == "\"" => String::new(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_delimiter_stays_in_field() {
        let fields = split_line(r#""Doe, Jr.","john@x.com""#, ',');
        assert_eq!(fields, vec!["Doe, Jr.", "john@x.com"]);
    }

    #[test]
    fn doubled_quote_inside_quotes_is_literal() {
        let fields = split_line(r#""say ""hi""",b"#, ',');
        assert_eq!(fields, vec![r#"say "hi""#, "b"]);
    }

    #[test]
    fn empty_quoted_field_is_empty() {
        assert_eq!(split_line(r#"a,"",c"#, ','), vec!["a", "", "c"]);
    }

    #[test]
    fn unbalanced_quote_accumulates_to_end() {
        let fields = split_line(r#"a,"b,c,d"#, ',');
        assert_eq!(fields, vec!["a", "b,c,d"]);
    }

    #[test]
    fn fields_are_trimmed() {
        assert_eq!(split_line("  a ;\tb  ; c", ';'), vec!["a", "b", "c"]);
    }

    #[test]
    fn trailing_delimiter_yields_empty_field() {
        assert_eq!(split_line("a,b,", ','), vec!["a", "b", ""]);
    }

    #[test]
    fn unquoted_count_skips_quoted_regions() {
        assert_eq!(count_unquoted(r#""a;b",c;d"#, ';'), 1);
        assert_eq!(count_unquoted(r#""a;b",c;d"#, ','), 1);
    }
}
