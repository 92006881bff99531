use std::collections::BTreeMap;

use refmark_pdf::annotate::OutputPolicy;
use refmark_pdf::error::{Error, Result};
use refmark_pdf::geo::Rect;
use refmark_pdf::parse::{PageText, Token};
use refmark_pdf::scan::{AnnotationSink, DocumentSource};

/// A token laid out on a fixed grid: 40 units apart, 36 wide, 12 tall.
pub fn token(page_number: u32, order: u32, text: &str) -> Token {
    let x = 72.0 + order as f32 * 40.0;
    Token {
        text: text.to_string(),
        bbox: Rect::new(x, 700.0, x + 36.0, 712.0),
        page_number,
        order,
    }
}

pub fn page(page_number: u32, words: &[&str]) -> PageText {
    let tokens = words
        .iter()
        .enumerate()
        .map(|(index, word)| token(page_number, index as u32, word))
        .collect();
    PageText::from_tokens(page_number, tokens)
}

enum MockPage {
    Words(Vec<String>),
    Broken,
}

/// In-memory document for scan tests; pages are word lists on the grid
/// from [`token`], and a page can be marked broken to exercise isolation.
pub struct MockSource {
    pages: BTreeMap<u32, MockPage>,
}

impl MockSource {
    pub fn new() -> Self {
        MockSource {
            pages: BTreeMap::new(),
        }
    }

    pub fn with_page(mut self, page_number: u32, words: &[&str]) -> Self {
        let words = words.iter().map(|word| word.to_string()).collect();
        self.pages.insert(page_number, MockPage::Words(words));
        self
    }

    pub fn with_broken_page(mut self, page_number: u32) -> Self {
        self.pages.insert(page_number, MockPage::Broken);
        self
    }
}

impl DocumentSource for MockSource {
    fn page_numbers(&self) -> Vec<u32> {
        self.pages.keys().copied().collect()
    }

    fn page(&self, page_number: u32) -> Result<PageText> {
        match self.pages.get(&page_number) {
            Some(MockPage::Words(words)) => {
                let tokens = words
                    .iter()
                    .enumerate()
                    .map(|(index, word)| token(page_number, index as u32, word))
                    .collect();
                Ok(PageText::from_tokens(page_number, tokens))
            }
            Some(MockPage::Broken) => Err(Error::Extraction {
                page: page_number,
                reason: "content stream is not valid".to_string(),
            }),
            None => Err(Error::Extraction {
                page: page_number,
                reason: "page is not in the page tree".to_string(),
            }),
        }
    }
}

/// Records regions without any document behind it.
#[derive(Default)]
pub struct MockSink {
    pub recorded: Vec<(u32, Rect)>,
}

impl AnnotationSink for MockSink {
    type Output = Vec<(u32, Rect)>;

    fn record_highlight(&mut self, page_number: u32, region: Rect) {
        self.recorded.push((page_number, region));
    }

    fn assemble(self, _policy: OutputPolicy) -> Result<Option<Self::Output>> {
        if self.recorded.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.recorded))
        }
    }
}
