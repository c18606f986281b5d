//! Fragment completion.
//!
//! A partial match usually means the identifier was printed across two strips
//! of text. The word that holds the fragment (the anchor) is joined with the
//! word whose top-left corner lies closest to the anchor's top-right corner.

use crate::WordBox;

/// Stitches every fragment to its nearest following word.
///
/// Anchors are the words containing a fragment as a substring, each word
/// taken at most once, in fragment order then word order. Fragments that
/// occur in no word contribute nothing.
pub fn complete_fragments<S: AsRef<str>>(fragments: &[S], words: &[WordBox]) -> Vec<String> {
    anchors(fragments, words)
        .into_iter()
        .map(|index| {
            let next = nearest_following(index, words);
            format!("{}{}", words[index].text, words[next].text)
        })
        .collect()
}

fn anchors<S: AsRef<str>>(fragments: &[S], words: &[WordBox]) -> Vec<usize> {
    let mut found = Vec::new();
    for fragment in fragments {
        let fragment = fragment.as_ref();
        for (index, word) in words.iter().enumerate() {
            if word.text.contains(fragment) && !found.contains(&index) {
                found.push(index);
            }
        }
    }
    found
}

/// Index of the word whose top-left corner is closest to the top-right corner
/// of `words[anchor]`. Ties go to the lower index. The anchor scores an
/// infinite distance, so it only wins when it is the only word.
pub fn nearest_following(anchor: usize, words: &[WordBox]) -> usize {
    let origin = words[anchor].top_right();
    let mut best = (anchor, f64::INFINITY);
    for (index, word) in words.iter().enumerate() {
        if index == anchor {
            continue;
        }
        let distance = origin.distance(&word.top_left());
        if distance < best.1 {
            best = (index, distance);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;

    fn word(text: &str, x: i32, y: i32, width: i32) -> WordBox {
        WordBox {
            confidence: 1.0,
            text: text.to_string(),
            bounding_poly: [
                Point(x, y),
                Point(x + width, y),
                Point(x + width, y + 20),
                Point(x, y + 20),
            ],
            symbols: Vec::new(),
        }
    }

    #[test]
    fn joins_nearest_word_without_separator() {
        let words = [
            word("ATAPL67", 0, 0, 100),
            word("LABEL", 400, 300, 80),
            word("890", 105, 2, 40),
        ];
        assert_eq!(complete_fragments(&["ATAPL67"], &words), ["ATAPL67890"]);
    }

    #[test]
    fn anchor_is_never_its_own_neighbour() {
        // The anchor's own top-left sits far closer to its top-right than
        // any other word, but must be skipped.
        let words = [word("AB", 0, 0, 2), word("CD", 500, 500, 10)];
        assert_eq!(nearest_following(0, &words), 1);
    }

    #[test]
    fn equal_distance_resolves_to_lower_index() {
        let words = [
            word("ANCHOR", 100, 100, 100),
            word("below", 200, 110, 10),
            word("above", 200, 90, 10),
        ];
        assert_eq!(nearest_following(0, &words), 1);
        assert_eq!(complete_fragments(&["ANCH"], &words), ["ANCHORbelow"]);
    }

    #[test]
    fn lone_anchor_is_joined_with_itself() {
        let words = [word("ATAPL67", 0, 0, 100)];
        assert_eq!(nearest_following(0, &words), 0);
        assert_eq!(complete_fragments(&["ATAPL67"], &words), ["ATAPL67ATAPL67"]);
    }

    #[test]
    fn unknown_fragment_yields_nothing() {
        let words = [word("ATAPL67", 0, 0, 100), word("890", 105, 0, 40)];
        assert!(complete_fragments(&["ZZZZZ1"], &words).is_empty());
    }

    #[test]
    fn anchors_are_deduplicated_in_discovery_order() {
        let words = [
            word("SN: ", 0, 0, 40),
            word("12", 45, 0, 20),
            word("xSN:", 0, 100, 40),
            word("34", 45, 100, 20),
        ];
        let stitched = complete_fragments(&["SN:", "SN:"], &words);
        assert_eq!(stitched, ["SN: 12", "xSN:34"]);
    }
}
