// @module: Word-boundary text chunking for speech engine input limits

/// Split `text` into chunks of at most `budget` characters
///
/// Breaks happen only at single spaces, so joining the chunks with `" "`
/// gives back the input. A word longer than the budget becomes a chunk of
/// its own.
pub fn chunk_text(text: &str, budget: usize) -> Vec<String> {
    let budget = budget.max(1);
    if text.chars().count() <= budget {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    let mut started = false;

    for word in text.split(' ') {
        let word_len = word.chars().count();

        if !started {
            current.push_str(word);
            current_len = word_len;
            started = true;
            continue;
        }

        if current_len + 1 + word_len > budget {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        } else {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        }
    }

    chunks.push(current);
    chunks
}
