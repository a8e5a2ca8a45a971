use regex::Regex;
use std::sync::LazyLock;

use super::Draft;
use crate::core::task::Priority;

/// Tag families in precedence order. The first family present anywhere wins.
static PRIORITY_TAGS: LazyLock<[(Priority, Regex); 4]> = LazyLock::new(|| {
    [
        (Priority::High, Regex::new(r"(?i)#(?:high|urgent|h)\b").unwrap()),
        (Priority::Low, Regex::new(r"(?i)#(?:low|l)\b").unwrap()),
        (Priority::Medium, Regex::new(r"(?i)#(?:medium|m)\b").unwrap()),
        (Priority::Info, Regex::new(r"(?i)#(?:info|i)\b").unwrap()),
    ]
});

/// Assign a priority from `#tag` shortcuts and remove every tag of the winning family.
pub fn extract(mut draft: Draft) -> Draft {
    for (priority, re) in PRIORITY_TAGS.iter() {
        if re.is_match(&draft.text) {
            draft.fields.priority = *priority;
            draft.text = re.replace_all(&draft.text, "").into_owned();
            break;
        }
    }
    draft
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str) -> Draft {
        extract(Draft::new(input))
    }

    #[test]
    fn aliases_map_to_levels() {
        assert_eq!(run("Fix prod #urgent").fields.priority, Priority::High);
        assert_eq!(run("Fix prod #H").fields.priority, Priority::High);
        assert_eq!(run("Water plants #low").fields.priority, Priority::Low);
        assert_eq!(run("Sync #m").fields.priority, Priority::Medium);
        assert_eq!(run("FYI #Info").fields.priority, Priority::Info);
    }

    #[test]
    fn high_beats_low_regardless_of_order() {
        let draft = run("#l Deploy #h");
        assert_eq!(draft.fields.priority, Priority::High);
        // Only the winning family is stripped
        assert_eq!(draft.text.split_whitespace().collect::<Vec<_>>(), ["#l", "Deploy"]);
    }

    #[test]
    fn strips_every_occurrence_of_winner() {
        let draft = run("#h Deploy #urgent now #HIGH");
        assert_eq!(draft.fields.priority, Priority::High);
        assert_eq!(draft.text.split_whitespace().collect::<Vec<_>>(), ["Deploy", "now"]);
    }

    #[test]
    fn requires_whole_word() {
        let draft = run("Call #help desk about #i18n");
        assert_eq!(draft.fields.priority, Priority::Medium);
        assert_eq!(draft.text, "Call #help desk about #i18n");
    }
}
