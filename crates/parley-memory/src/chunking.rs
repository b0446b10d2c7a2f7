//! Sentence-boundary chunking.
//!
//! Sentences end at `。！？.!?` (kept) or at a newline (dropped). Sentences are
//! packed greedily into chunks of at most `target` characters; a sentence that
//! is longer than `target` on its own becomes a chunk by itself.

const TERMINATORS: [char; 6] = ['。', '！', '？', '.', '!', '?'];

/// Split `text` into trimmed, non-empty sentences.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if c == '\n' {
            sentences.push(&text[start..i]);
            start = i + 1;
        } else if TERMINATORS.contains(&c) {
            let end = i + c.len_utf8();
            sentences.push(&text[start..end]);
            start = end;
        }
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Pack the sentences of `text` into chunks of at most `target` characters.
pub fn chunk_text(text: &str, target: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in split_sentences(text) {
        let sep = separator(&current);
        let len = sentence.chars().count();
        if current.is_empty() || current_len + sep.len() + len <= target {
            current.push_str(sep);
            current.push_str(sentence);
            current_len += sep.len() + len;
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(sentence);
            current_len = len;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// ASCII text is rejoined with a space, CJK text without.
fn separator(current: &str) -> &'static str {
    match current.chars().last() {
        Some(c) if c.is_ascii() => " ",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_cjk_and_ascii_terminators() {
        let sentences = split_sentences("我熟悉 Rust。做过并发服务！Why? Because.");
        assert_eq!(
            sentences,
            vec!["我熟悉 Rust。", "做过并发服务！", "Why?", "Because."]
        );
    }

    #[test]
    fn newline_ends_sentence_and_is_dropped() {
        let sentences = split_sentences("Skills\n- Rust\n\n- Go");
        assert_eq!(sentences, vec!["Skills", "- Rust", "- Go"]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk_text("", 100).is_empty());
        assert!(chunk_text("  \n\n ", 100).is_empty());
    }

    #[test]
    fn packs_sentences_up_to_target() {
        // Each sentence is 4 chars.
        let chunks = chunk_text("一二三。四五六。七八九。", 8);
        assert_eq!(chunks, vec!["一二三。四五六。", "七八九。"]);
    }

    #[test]
    fn ascii_sentences_rejoined_with_space() {
        let chunks = chunk_text("I like Rust. It is fast.", 100);
        assert_eq!(chunks, vec!["I like Rust. It is fast."]);
    }

    #[test]
    fn long_sentence_is_its_own_chunk() {
        let long = "这是一个非常非常长的句子没有任何标点一直写下去";
        let text = format!("短句。{long}。短句二。");
        let chunks = chunk_text(&text, 6);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "短句。");
        assert_eq!(chunks[1], format!("{long}。"));
        assert_eq!(chunks[2], "短句二。");
    }

    #[test]
    fn chunks_never_exceed_target_unless_single_sentence() {
        let text = "Alpha beta. Gamma delta epsilon. Zeta. Eta theta iota kappa. Lambda.";
        for chunk in chunk_text(text, 20) {
            let sentences = split_sentences(&chunk);
            assert!(chunk.chars().count() <= 20 || sentences.len() == 1, "{chunk}");
        }
    }
}
