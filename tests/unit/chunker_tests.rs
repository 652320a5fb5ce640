/*!
 * Tests for synthesis text chunking
 */

use cuedub::synthesis::chunker::chunk_text;

const TEXT: &str = "Battez les oeufs doucement puis ajoutez une pincée de sel et un peu de poivre noir";

/// Test that joining chunks restores the text for any budget above the longest word
#[test]
fn test_chunk_text_withBudgetsAboveLongestWord_shouldRoundTrip() {
    let longest = TEXT.split(' ').map(|w| w.chars().count()).max().unwrap();

    for budget in longest..=TEXT.chars().count() + 5 {
        let chunks = chunk_text(TEXT, budget);
        assert_eq!(chunks.join(" "), TEXT, "budget {}", budget);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= budget, "budget {} chunk {:?}", budget, chunk);
        }
    }
}

/// Test that short text is returned as a single chunk
#[test]
fn test_chunk_text_withShortText_shouldReturnSingleChunk() {
    assert_eq!(chunk_text("Ajoutez le sel.", 239), vec!["Ajoutez le sel.".to_string()]);
}

/// Test that a word longer than the budget is never split
#[test]
fn test_chunk_text_withLongWord_shouldKeepWordWhole() {
    let chunks = chunk_text("a extraordinairement b", 5);
    assert_eq!(chunks, vec!["a", "extraordinairement", "b"]);
}
