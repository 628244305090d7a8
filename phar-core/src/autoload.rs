use alloc::string::String;

/// Maps class names onto paths inside an archive.
///
/// A name starting with `prefix` resolves to the name with every namespace
/// separator replaced by `/`, followed by `suffix`. Other names do not
/// resolve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutoloadRule {
    pub prefix: String,
    pub separator: char,
    pub suffix: String,
}

impl AutoloadRule {
    pub fn new(prefix: impl Into<String>) -> AutoloadRule {
        AutoloadRule {
            prefix: prefix.into(),
            separator: '\\',
            suffix: String::from(".php"),
        }
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> AutoloadRule {
        self.suffix = suffix.into();
        self
    }

    pub fn separator(mut self, separator: char) -> AutoloadRule {
        self.separator = separator;
        self
    }

    pub fn resolve(&self, name: &str) -> Option<String> {
        if !name.starts_with(self.prefix.as_str()) {
            return None;
        }
        let mut path: String = name
            .chars()
            .map(|c| if c == self.separator { '/' } else { c })
            .collect();
        path.push_str(&self.suffix);
        Some(path)
    }
}
