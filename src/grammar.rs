//! Text transforms applied by variable methods: `$name.title`, `$name.clean`
use std::fmt;

/// Uppercase the first letter of every run of letters, lowercase the rest
pub fn to_title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Uppercase the first character and lowercase everything after it
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
    }
}

/// Replace underscores and hyphens with spaces
pub fn clean_separators(s: &str) -> String {
    s.replace(['_', '-'], " ")
}

/// A method in a variable-use chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableMethod {
    Lower,
    Upper,
    Title,
    Capitalize,
    Clean,
}

impl VariableMethod {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "lower" => Some(VariableMethod::Lower),
            "upper" => Some(VariableMethod::Upper),
            "title" => Some(VariableMethod::Title),
            "capitalize" => Some(VariableMethod::Capitalize),
            "clean" => Some(VariableMethod::Clean),
            _ => None,
        }
    }

    pub fn apply(&self, value: &str) -> String {
        match self {
            VariableMethod::Lower => value.to_lowercase(),
            VariableMethod::Upper => value.to_uppercase(),
            VariableMethod::Title => to_title_case(value),
            VariableMethod::Capitalize => capitalize(value),
            VariableMethod::Clean => clean_separators(value),
        }
    }
}

impl fmt::Display for VariableMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableMethod::Lower => "lower",
            VariableMethod::Upper => "upper",
            VariableMethod::Title => "title",
            VariableMethod::Capitalize => "capitalize",
            VariableMethod::Clean => "clean",
        };
        f.write_str(name)
    }
}
