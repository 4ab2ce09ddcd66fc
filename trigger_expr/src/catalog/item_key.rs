//! Item key validation
//!
//! `key` or `key[param,"quoted",[nested,list],...]`. Parameters are walked
//! with an explicit depth counter, so hostile nesting costs a counter
//! increment rather than a stack frame.

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamState {
    /// Start of a parameter, after `[` or `,`
    Expect,
    Unquoted,
    Quoted,
    /// After a closing quote or a nested `]`
    After,
    /// Outermost `]` seen
    End,
}

fn near(key: &str, offset: usize) -> String {
    format!("incorrect syntax near \"{}\"", &key[offset..])
}

/// Validate an item key; the error text is shown to users verbatim.
pub fn validate_item_key(key: &str, max_depth: usize) -> Result<(), String> {
    if key.is_empty() {
        return Err("key is empty".to_string());
    }

    let name_end = key
        .char_indices()
        .find(|&(_, c)| !is_key_char(c))
        .map(|(i, _)| i)
        .unwrap_or(key.len());

    if name_end == 0 {
        return Err(near(key, 0));
    }
    if name_end == key.len() {
        return Ok(());
    }
    if !key[name_end..].starts_with('[') {
        return Err(near(key, name_end));
    }

    let mut state = ParamState::Expect;
    let mut depth = 1usize;
    let mut escaped = false;

    for (i, c) in key[name_end + 1..].char_indices() {
        let offset = name_end + 1 + i;

        state = match state {
            ParamState::Expect => match c {
                ' ' | ',' => ParamState::Expect,
                '"' => ParamState::Quoted,
                '[' => {
                    depth += 1;
                    if depth > max_depth {
                        return Err(format!(
                            "parameters nested deeper than {} levels",
                            max_depth
                        ));
                    }
                    ParamState::Expect
                }
                ']' => close_list(&mut depth),
                _ => ParamState::Unquoted,
            },
            ParamState::Unquoted => match c {
                ',' => ParamState::Expect,
                ']' => close_list(&mut depth),
                _ => ParamState::Unquoted,
            },
            ParamState::Quoted => {
                if escaped {
                    escaped = false;
                    ParamState::Quoted
                } else if c == '\\' {
                    escaped = true;
                    ParamState::Quoted
                } else if c == '"' {
                    ParamState::After
                } else {
                    ParamState::Quoted
                }
            }
            ParamState::After => match c {
                ' ' => ParamState::After,
                ',' => ParamState::Expect,
                ']' => close_list(&mut depth),
                _ => return Err(near(key, offset)),
            },
            ParamState::End => return Err(near(key, offset)),
        };
    }

    if state == ParamState::End {
        Ok(())
    } else {
        Err("unexpected end of key".to_string())
    }
}

fn close_list(depth: &mut usize) -> ParamState {
    *depth -= 1;
    if *depth == 0 {
        ParamState::End
    } else {
        ParamState::After
    }
}
