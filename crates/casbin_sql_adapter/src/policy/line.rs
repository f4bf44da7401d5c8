//! Text line parser for policy rules (`p, alice, data1, read`).

use crate::policy::model::Model;

/// Parses one comma-separated rule line and appends it to `model`.
///
/// The first token is the policy type and its first character names the
/// section. Blank lines, `#` comments and lines without any rule field are
/// ignored. Unquoted tokens are trimmed. A token wrapped in double quotes
/// keeps its whitespace and may contain commas; `""` inside it is a literal
/// quote.
///
/// Returns whether a rule was appended.
pub fn load_policy_line(line: &str, model: &mut Model) -> bool {
    let content = line.trim();
    if content.is_empty() || content.starts_with('#') {
        return false;
    }

    let mut tokens = split_tokens(line);
    if tokens.len() < 2 {
        return false;
    }

    let rule = tokens.split_off(1);
    let ptype = tokens.remove(0);
    let Some(sec) = ptype.chars().next() else {
        return false;
    };
    model.add_policy(&sec.to_string(), &ptype, rule);
    true
}

#[derive(Default)]
struct Token {
    text: String,
    started: bool,
    quoted: bool,
}

impl Token {
    fn finish(mut self) -> String {
        if !self.quoted {
            let kept = self.text.trim_end().len();
            self.text.truncate(kept);
        }
        self.text
    }
}

fn split_tokens(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = Token::default();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    current.text.push('"');
                }
                '"' => in_quotes = false,
                _ => current.text.push(ch),
            }
            continue;
        }

        match ch {
            ',' => tokens.push(std::mem::take(&mut current).finish()),
            // Leading whitespace, and whitespace after a closing quote.
            _ if ch.is_whitespace() && (!current.started || current.quoted) => {}
            '"' if !current.started => {
                in_quotes = true;
                current.started = true;
                current.quoted = true;
            }
            _ => {
                current.text.push(ch);
                current.started = true;
            }
        }
    }
    tokens.push(current.finish());
    tokens
}
