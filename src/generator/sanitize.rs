// src/generator/sanitize.rs

use std::sync::LazyLock;

use regex::Regex;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*").expect("code fence pattern is valid"));

/// Strips the noise models like to wrap around JSON output.
///
/// * Removes markdown fences and stray backticks.
/// * Drops any prose before the first `{` and after the last `}`.
/// * Turns line breaks and tabs into spaces and deletes other control characters,
///   so raw newlines inside string literals no longer break parsing.
/// * Escapes backslashes that do not start a valid JSON escape sequence.
/// * Maps typographic single quotes to ASCII.
pub fn clean_json_response(text: &str) -> String {
    let without_fences = CODE_FENCE.replace_all(text, "");
    let mut cleaned = without_fences.replace('`', "").trim().to_string();

    if let Some(first) = cleaned.find('{') {
        if first > 0 {
            cleaned = cleaned[first..].to_string();
        }
    }

    if let Some(last) = cleaned.rfind('}') {
        if last > 0 && last < cleaned.len() - 1 {
            cleaned.truncate(last + 1);
        }
    }

    let normalized: String = cleaned
        .replace("\r\n", " ")
        .chars()
        .filter_map(|c| match c {
            '\n' | '\r' | '\t' => Some(' '),
            '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}' => None,
            '\u{2018}' | '\u{2019}' => Some('\''),
            other => Some(other),
        })
        .collect();

    escape_stray_backslashes(&normalized)
}

fn escape_stray_backslashes(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '\\' {
            out.push(c);
            i += 1;
            continue;
        }

        match chars.get(i + 1) {
            Some('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't') => {
                out.push(c);
                out.push(chars[i + 1]);
                i += 2;
            }
            Some('u')
                if chars.len() >= i + 6
                    && chars[i + 2..i + 6].iter().all(|h| h.is_ascii_hexdigit()) =>
            {
                out.extend(&chars[i..i + 6]);
                i += 6;
            }
            _ => {
                out.push_str("\\\\");
                i += 1;
            }
        }
    }

    out
}
