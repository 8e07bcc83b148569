//! Whitespace and comma cleanup shared by `[clean:]` and final output

/// Merge a comma followed only by whitespace and another comma into one comma
pub fn collapse_commas(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut pending = String::new();
    let mut after_comma = false;
    for c in text.chars() {
        if after_comma && c.is_whitespace() {
            pending.push(c);
            continue;
        }
        if after_comma && c == ',' {
            pending.clear();
            continue;
        }
        output.push_str(&pending);
        pending.clear();
        output.push(c);
        after_comma = c == ',';
    }
    output.push_str(&pending);
    output
}

/// Collapse runs of whitespace into single spaces and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleanup applied to the fully expanded prompt
pub fn final_cleanup(text: &str) -> String {
    let text = normalize_whitespace(&collapse_commas(text));
    text.trim_matches(',').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_commas() {
        assert_eq!(collapse_commas("a, , b"), "a, b");
        assert_eq!(collapse_commas("a,,,b"), "a,b");
        assert_eq!(collapse_commas("a,\n ,\t, b"), "a, b");
        assert_eq!(collapse_commas("a, b"), "a, b");
    }

    #[test]
    fn test_final_cleanup() {
        assert_eq!(final_cleanup(" , a   , , b,  "), "a , b");
        assert_eq!(final_cleanup("a  b"), "a b");
    }
}
