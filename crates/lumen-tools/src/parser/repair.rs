//! Best-effort repair of almost-JSON emitted by models.
//!
//! Three rewrites, applied once: typographic and single quotes become double
//! quotes, trailing commas before `}` or `]` are dropped, and bare object keys
//! get quoted. The result may still fail to parse.

/// Repair `input`. Returns `None` if nothing changed.
pub(crate) fn repair(input: &str) -> Option<String> {
    let normalized = normalize_quotes(input);
    let repaired = fix_structure(&single_to_double(&normalized));
    (repaired != input).then_some(repaired)
}

fn normalize_quotes(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
            other => other,
        })
        .collect()
}

/// Rewrite single-quoted strings as double-quoted ones.
fn single_to_double(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_double = false;
    let mut in_single = false;
    let mut escaped = false;

    for c in input.chars() {
        if escaped {
            // `\'` is not a valid JSON escape.
            if in_single && c == '\'' {
                out.pop();
            }
            out.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_double || in_single => {
                out.push(c);
                escaped = true;
            },
            '"' if in_single => out.push_str("\\\""),
            '"' => {
                in_double = !in_double;
                out.push(c);
            },
            '\'' if !in_double => {
                in_single = !in_single;
                out.push('"');
            },
            _ => out.push(c),
        }
    }
    out
}

/// Drop trailing commas and quote bare keys, outside strings.
fn fix_structure(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    // Last significant character emitted outside a string.
    let mut last_sig: Option<char> = None;
    let mut i = 0usize;

    while let Some(&c) = chars.get(i) {
        i = i.saturating_add(1);

        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                last_sig = Some('"');
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            },
            ',' if next_significant(&chars, i).is_some_and(|n| n == '}' || n == ']') => {},
            c if (c.is_ascii_alphabetic() || c == '_')
                && matches!(last_sig, Some('{' | ',')) =>
            {
                let start = i.saturating_sub(1);
                let mut end = i;
                while chars
                    .get(end)
                    .is_some_and(|ch| ch.is_ascii_alphanumeric() || *ch == '_' || *ch == '-')
                {
                    end = end.saturating_add(1);
                }
                let ident: String = chars.get(start..end).unwrap_or_default().iter().collect();
                if next_significant(&chars, end) == Some(':') {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                } else {
                    out.push_str(&ident);
                }
                i = end;
                last_sig = Some('a');
            },
            c => {
                out.push(c);
                if !c.is_whitespace() {
                    last_sig = Some(c);
                }
            },
        }
    }
    out
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars.get(from..)?.iter().copied().find(|c| !c.is_whitespace())
}
