use serde::{Deserialize, Serialize};

use super::types::{Chunk, Document};

/// Window sizes are measured in characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub sentence_aware: bool,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            sentence_aware: false,
        }
    }
}

/// Page-scoped splitter: chunks never cross a page boundary.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    #[must_use]
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Split every page of `document`, numbering chunks continuously across pages.
    #[must_use]
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in &document.pages {
            for text in self.split_text(&page.text) {
                chunks.push(Chunk {
                    text,
                    source: document.source.clone(),
                    page: page.number,
                    chunk_index: chunks.len(),
                });
            }
        }
        chunks
    }

    /// Split one page of text. Blank pages yield nothing.
    #[must_use]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chunk_size = self.config.chunk_size.max(1);
        let overlap = self.config.chunk_overlap;

        if self.config.sentence_aware {
            let sentences = split_sentences(text);
            merge_sentences(&sentences, chunk_size, overlap)
                .into_iter()
                .flat_map(|piece| {
                    if char_len(&piece) > chunk_size {
                        split_chars(&piece, chunk_size, overlap)
                    } else {
                        vec![piece]
                    }
                })
                .collect()
        } else {
            split_chars(text, chunk_size, overlap)
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Fixed window of `chunk_size` chars advancing by `chunk_size - overlap`.
///
/// The last window always ends at the end of `text`.
fn split_chars(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = offsets.len() - 1;
    let step = chunk_size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + chunk_size).min(total);
        chunks.push(text[offsets[start]..offsets[end]].to_owned());
        if end == total {
            break;
        }
        start += step;
    }
    chunks
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        current.push(chars[i]);

        if chars[i] == '\n' && i + 1 < chars.len() && chars[i + 1] == '\n' {
            current.push(chars[i + 1]);
            i += 1;
            if !current.trim().is_empty() {
                sentences.push(std::mem::take(&mut current));
            }
        } else if matches!(chars[i], '.' | '?' | '!')
            && i + 1 < chars.len()
            && chars[i + 1] == ' '
            && !current.trim().is_empty()
        {
            sentences.push(std::mem::take(&mut current));
        }

        i += 1;
    }

    if !current.trim().is_empty() {
        sentences.push(current);
    }

    sentences
}

/// Merge sentences into chunks of at most `chunk_size` chars, carrying whole
/// trailing sentences (up to `chunk_overlap` chars) into the next chunk.
fn merge_sentences(sentences: &[String], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    let mut window_start = 0;

    for (idx, sentence) in sentences.iter().enumerate() {
        let sentence_len = char_len(sentence);
        if current_len > 0 && current_len + sentence_len > chunk_size {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;

            let mut overlap_len = 0;
            let mut overlap_start = idx;
            for i in (window_start..idx).rev() {
                let len = char_len(&sentences[i]);
                if overlap_len + len > chunk_overlap {
                    break;
                }
                overlap_len += len;
                overlap_start = i;
            }
            for s in &sentences[overlap_start..idx] {
                current.push_str(s);
            }
            current_len = overlap_len;
            window_start = overlap_start;
        }

        current.push_str(sentence);
        current_len += sentence_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::types::Page;

    fn make_doc(pages: &[&str]) -> Document {
        Document {
            source: "course_materials/lecture.pdf".to_owned(),
            content_type: "application/pdf".to_owned(),
            pages: pages
                .iter()
                .zip(1u32..)
                .map(|(text, number)| Page {
                    number,
                    text: (*text).to_owned(),
                })
                .collect(),
        }
    }

    fn window(chunk_size: usize, chunk_overlap: usize) -> TextSplitter {
        TextSplitter::new(SplitterConfig {
            chunk_size,
            chunk_overlap,
            sentence_aware: false,
        })
    }

    #[test]
    fn two_page_document_window_layout() {
        let page1: String = (0..1500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let page2 = "z".repeat(400);
        let doc = make_doc(&[&page1, &page2]);

        let chunks = TextSplitter::new(SplitterConfig::default()).split(&doc);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, page1[0..1000]);
        assert_eq!(chunks[1].text, page1[800..1500]);
        assert_eq!(chunks[2].text, page2);
        assert_eq!(
            chunks.iter().map(|c| c.page).collect::<Vec<_>>(),
            vec![1, 1, 2]
        );
        assert_eq!(
            chunks.iter().map(|c| c.chunk_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn short_page_is_single_chunk() {
        let chunks = window(1000, 200).split(&make_doc(&["Short text."]));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Short text.");
    }

    #[test]
    fn exact_window_length_yields_one_chunk() {
        let text = "x".repeat(1000);
        let chunks = window(1000, 200).split_text(&text);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn blank_pages_are_skipped() {
        let chunks = window(1000, 200).split(&make_doc(&["   \n\t", "content"]));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page, 2);
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn overlap_repeats_tail_of_previous_chunk() {
        let chunks = window(10, 3).split_text("abcdefghijklmnopqrstuvwxyz");
        assert!(chunks.len() > 1);
        assert_eq!(&chunks[0][7..10], &chunks[1][..3]);
    }

    #[test]
    fn no_overlap_partitions_text() {
        assert_eq!(split_chars("abcdefghij", 5, 0), vec!["abcde", "fghij"]);
    }

    #[test]
    fn full_overlap_still_makes_progress() {
        let chunks = split_chars("abcde", 3, 3);
        assert_eq!(chunks[0], "abc");
        assert_eq!(chunks.last().unwrap(), "cde");
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "αβγδεζηθικ";
        let chunks = split_chars(text, 4, 1);
        assert_eq!(chunks[0], "αβγδ");
        assert_eq!(chunks[1], "δεζη");
    }

    #[test]
    fn source_is_preserved() {
        let chunks = window(1000, 200).split(&make_doc(&["Some content."]));
        assert_eq!(chunks[0].source, "course_materials/lecture.pdf");
    }

    #[test]
    fn sentence_aware_splitting() {
        let splitter = TextSplitter::new(SplitterConfig {
            chunk_size: 20,
            chunk_overlap: 5,
            sentence_aware: true,
        });
        let chunks = splitter.split(&make_doc(&["First sentence. Second sentence. Third sentence."]));
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 20);
        }
    }

    #[test]
    fn paragraph_break_splitting() {
        let sentences = split_sentences("First paragraph.\n\nSecond paragraph.");
        assert_eq!(sentences.len(), 2);
    }

    #[test]
    fn question_and_exclamation_split_sentences() {
        assert_eq!(split_sentences("Is this a question? Yes it is.").len(), 2);
        assert_eq!(split_sentences("Wow! Amazing.").len(), 2);
    }

    #[test]
    fn resplitting_is_deterministic() {
        let doc = make_doc(&[&"gradient descent ".repeat(200), &"momentum ".repeat(50)]);
        let splitter = TextSplitter::new(SplitterConfig::default());
        assert_eq!(splitter.split(&doc), splitter.split(&doc));
    }

    mod proptest_splitter {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(500))]

            #[test]
            fn split_never_panics(
                content in "\\PC{0,3000}",
                chunk_size in 1usize..1500,
                chunk_overlap in 0usize..400,
                sentence_aware in proptest::bool::ANY,
            ) {
                let splitter = TextSplitter::new(SplitterConfig {
                    chunk_size,
                    chunk_overlap,
                    sentence_aware,
                });
                let _ = splitter.split_text(&content);
            }

            #[test]
            fn windows_respect_size_and_cover_text(
                content in "[a-z ]{1,2000}",
                chunk_size in 10usize..300,
                overlap_ratio in 0usize..9,
            ) {
                prop_assume!(!content.trim().is_empty());
                let chunk_overlap = chunk_size * overlap_ratio / 10;
                let chunks = window(chunk_size, chunk_overlap).split_text(&content);

                prop_assert!(!chunks.is_empty());
                for chunk in &chunks {
                    prop_assert!(chunk.chars().count() <= chunk_size);
                    prop_assert!(!chunk.is_empty());
                }
                prop_assert!(content.starts_with(chunks[0].as_str()));
                prop_assert!(content.ends_with(chunks.last().unwrap().as_str()));
            }

            #[test]
            fn chunk_indices_sequential(
                pages in proptest::collection::vec("[a-z. ]{0,600}", 1..5),
                chunk_size in 5usize..200,
            ) {
                let refs: Vec<&str> = pages.iter().map(String::as_str).collect();
                let chunks = window(chunk_size, chunk_size / 4).split(&make_doc(&refs));
                for (i, chunk) in chunks.iter().enumerate() {
                    prop_assert_eq!(chunk.chunk_index, i);
                }
            }
        }
    }
}
