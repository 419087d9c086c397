use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

/// A `####-###` product code, stored in its dashed (scraped) form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductCode(String);

impl ProductCode {
    /// Accepts exactly four digits, a hyphen and three digits.
    pub fn parse(raw: &str) -> Option<Self> {
        let bytes = raw.as_bytes();
        let well_formed = bytes.len() == 8
            && bytes[4] == b'-'
            && bytes[..4].iter().chain(&bytes[5..]).all(u8::is_ascii_digit);
        well_formed.then(|| Self(raw.to_string()))
    }

    pub fn dashed(&self) -> &str {
        &self.0
    }

    pub fn undashed(&self) -> String {
        self.0.replace('-', "")
    }

    pub fn format(&self, format: CodeFormat) -> String {
        match format {
            CodeFormat::Dashed => self.0.clone(),
            CodeFormat::Undashed => self.undashed(),
        }
    }
}

impl Borrow<str> for ProductCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CodeFormat {
    #[default]
    Dashed,
    /// Digits only, `1234-567` becomes `1234567`.
    Undashed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Separator {
    #[default]
    Newline,
    Comma,
}

/// Unique product codes gathered over a whole crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeSet {
    codes: HashSet<ProductCode>,
}

impl CodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the code wasn't in the set yet.
    pub fn insert(&mut self, code: ProductCode) -> bool {
        self.codes.insert(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductCode> {
        self.codes.iter()
    }

    /// Sorted codes, all rendered in the same `format`.
    pub fn finalize(&self, format: CodeFormat) -> Vec<String> {
        let mut sorted = self.codes.iter().collect::<Vec<_>>();
        sorted.sort_unstable();
        sorted.into_iter().map(|code| code.format(format)).collect()
    }
}

impl Extend<ProductCode> for CodeSet {
    fn extend<I: IntoIterator<Item = ProductCode>>(&mut self, iter: I) {
        self.codes.extend(iter);
    }
}

impl FromIterator<ProductCode> for CodeSet {
    fn from_iter<I: IntoIterator<Item = ProductCode>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().collect(),
        }
    }
}

pub fn render(codes: &[String], separator: Separator) -> String {
    match separator {
        Separator::Newline => codes.join("\n"),
        Separator::Comma => codes.join(", "),
    }
}
