use std::str::SplitWhitespace;

/// Splits an already complete answer into groups of whitespace-delimited
/// words, each group joined by single spaces. Finite and single-pass.
pub struct WordChunks<'a> {
    words: SplitWhitespace<'a>,
    group_size: usize,
}

impl<'a> WordChunks<'a> {
    /// A `group_size` of zero is treated as one.
    pub fn new(text: &'a str, group_size: usize) -> Self {
        Self {
            words: text.split_whitespace(),
            group_size: group_size.max(1),
        }
    }
}

impl Iterator for WordChunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let mut chunk = String::new();
        for word in self.words.by_ref().take(self.group_size) {
            if !chunk.is_empty() {
                chunk.push(' ');
            }
            chunk.push_str(word);
        }
        (!chunk.is_empty()).then_some(chunk)
    }
}

pub fn pseudo_stream(text: &str, group_size: usize) -> WordChunks<'_> {
    WordChunks::new(text, group_size)
}
