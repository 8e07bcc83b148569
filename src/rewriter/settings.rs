//! Inline settings: `@@width=832, height=1216@@`

use crate::span::{apply_edits, Edit, Span};

/// Output dimensions requested from inside the template
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineSettings {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl InlineSettings {
    /// Template values override the defaults when present
    pub fn resolve(&self, width: u32, height: u32) -> (u32, u32) {
        (self.width.unwrap_or(width), self.height.unwrap_or(height))
    }

    fn apply_pair(&mut self, pair: &str) {
        let Some((key, value)) = pair.split_once('=') else {
            return;
        };
        // Only positive values count
        let Ok(value) = value.trim().parse::<u32>() else {
            return;
        };
        if value == 0 {
            return;
        }
        match key.trim().to_lowercase().as_str() {
            "width" => self.width = Some(value),
            "height" => self.height = Some(value),
            _ => {}
        }
    }
}

/// Remove every `@@...@@` block and collect the recognized settings
pub fn extract_settings(text: &str) -> (String, InlineSettings) {
    let mut settings = InlineSettings::default();
    let mut edits = Vec::new();
    let mut from = 0;
    while let Some(open) = text[from..].find("@@") {
        let start = from + open;
        let rest = &text[start + 2..];
        match rest.find("@@") {
            Some(close) if !rest[..close].contains('\n') => {
                for pair in rest[..close].split(',') {
                    settings.apply_pair(pair);
                }
                let end = start + 2 + close + 2;
                edits.push(Edit::new(Span::new(start, end), ""));
                from = end;
            }
            _ => from = start + 1,
        }
    }
    (apply_edits(text, &edits), settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_settings() {
        let (text, settings) = extract_settings("a cat @@width=832, Height = 1216@@");
        assert_eq!(text, "a cat ");
        assert_eq!(settings.width, Some(832));
        assert_eq!(settings.height, Some(1216));
        assert_eq!(settings.resolve(1024, 1024), (832, 1216));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let (_, settings) = extract_settings("@@width=wide,height=0,steps=20@@");
        assert_eq!(settings, InlineSettings::default());
        assert_eq!(settings.resolve(512, 768), (512, 768));
    }
}
