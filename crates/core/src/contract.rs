//! Local check of the edit contract the oracle is asked to follow.
//!
//! Requests using one of the supported verbs ("edit slide 2", "remove slide 3",
//! ...) have a predictable effect on the slide sequence, so the document the
//! oracle returns can be compared against the previous one. Anything else is
//! [`EditIntent::Freeform`] and is accepted as-is.

use crate::types::Document;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static RETITLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:change|update|rename|edit)\s+(?:the\s+)?(?:slide\s+(\d+)(?:'s)?\s+title|title\s+of\s+slide\s+(\d+))\b",
    )
    .unwrap()
});

static EDIT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:edit|update|modify|rewrite|change|revise)\s+(?:the\s+)?slide\s+(\d+)\b")
        .unwrap()
});

static REMOVE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:remove|delete|drop)\s+(?:the\s+)?slide\s+(\d+)\b").unwrap()
});

static ADD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:add|insert|append)\s+(?:a\s+|an\s+|another\s+|one\s+more\s+)?(?:new\s+)?slide\b")
        .unwrap()
});

static ADD_POSITION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(before|after)\s+slide\s+(\d+)\b|\bas\s+(?:the\s+)?(?:new\s+)?slide\s+(\d+)\b")
        .unwrap()
});

static SLIDE_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bslide\s+(\d+)").unwrap());

static SLIDE_LIST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bslides\s+\d|\bslides?\s+\d+\s*(?:,|&|-|\b(?:and|or|to|through|thru)\b)\s*\d")
        .unwrap()
});

// Placement wording that ADD_POSITION_REGEX does not turn into an index.
static POSITION_WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:beginning|begin|start|first|second|third|fourth|fifth|top|front|middle|end|last|bottom|before|after|between|position|index)\b",
    )
    .unwrap()
});

/// What a request asks to do to the slide sequence. Indices are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditIntent {
    /// No document exists yet; everything is generated.
    Create,
    /// Replace the fields of one slide.
    Edit { index: usize },
    /// Replace only the title of one slide.
    Retitle { index: usize },
    /// Insert one slide; `None` appends.
    Add { position: Option<usize> },
    /// Delete one slide.
    Remove { index: usize },
    /// Anything the verbs above do not describe.
    Freeform,
}

impl EditIntent {
    /// Classify a user request. `has_document` selects creation mode.
    pub fn parse(request: &str, has_document: bool) -> Self {
        if !has_document {
            return Self::Create;
        }
        if names_several_slides(request) {
            return Self::Freeform;
        }

        let mut found = Vec::new();

        let mut retitled = Vec::new();
        for caps in RETITLE_REGEX.captures_iter(request) {
            if let Some(index) = caps.get(1).or(caps.get(2)).and_then(|m| slide_index(m.as_str())) {
                retitled.push(index);
                found.push(Self::Retitle { index });
            }
        }

        for caps in EDIT_REGEX.captures_iter(request) {
            if let Some(index) = caps.get(1).and_then(|m| slide_index(m.as_str())) {
                // "change slide 3 title" also reads as an edit of slide 3.
                if !retitled.contains(&index) {
                    found.push(Self::Edit { index });
                }
            }
        }

        for caps in REMOVE_REGEX.captures_iter(request) {
            if let Some(index) = caps.get(1).and_then(|m| slide_index(m.as_str())) {
                found.push(Self::Remove { index });
            }
        }

        for m in ADD_REGEX.find_iter(request) {
            let position = ADD_POSITION_REGEX
                .captures(&request[m.end()..])
                .and_then(|caps| add_position(&caps));
            if position.is_none() && POSITION_WORD_REGEX.is_match(request) {
                return Self::Freeform;
            }
            found.push(Self::Add { position });
        }

        found.dedup();
        match found.as_slice() {
            [only] => *only,
            _ => Self::Freeform,
        }
    }
}

/// Whether the request refers to more than one slide number.
fn names_several_slides(request: &str) -> bool {
    if SLIDE_LIST_REGEX.is_match(request) {
        return true;
    }
    let mut numbers: Vec<usize> = SLIDE_NUMBER_REGEX
        .captures_iter(request)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .collect();
    numbers.sort_unstable();
    numbers.dedup();
    numbers.len() > 1
}

/// "3" -> 2; slide 0 does not exist.
fn slide_index(number: &str) -> Option<usize> {
    number.parse::<usize>().ok()?.checked_sub(1)
}

fn add_position(caps: &regex::Captures<'_>) -> Option<usize> {
    if let Some(number) = caps.get(3) {
        return slide_index(number.as_str());
    }
    let index = slide_index(caps.get(2)?.as_str())?;
    match caps.get(1)?.as_str().to_ascii_lowercase().as_str() {
        "before" => Some(index),
        _ => Some(index + 1),
    }
}

/// Ways a returned document can break the edit contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    /// The request names a slide the previous document does not have.
    NoSuchSlide { number: usize, slide_count: usize },
    /// The slide count is not what the verb implies.
    SlideCount { expected: usize, actual: usize },
    /// A slide the request did not target was changed.
    UntouchedSlideChanged { number: usize },
    /// A title-only edit changed the bullet points as well.
    ContentChanged { number: usize },
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchSlide {
                number,
                slide_count,
            } => write!(
                f,
                "slide {} does not exist (the presentation has {} slides)",
                number, slide_count
            ),
            Self::SlideCount { expected, actual } => {
                write!(f, "expected {} slides, got {}", expected, actual)
            }
            Self::UntouchedSlideChanged { number } => {
                write!(f, "slide {} was changed but not requested", number)
            }
            Self::ContentChanged { number } => {
                write!(f, "slide {} content changed during a title-only edit", number)
            }
        }
    }
}

impl std::error::Error for ContractViolation {}

/// Check `next` against what `intent` allows relative to `prior`.
pub fn check(
    prior: Option<&Document>,
    intent: EditIntent,
    next: &Document,
) -> Result<(), ContractViolation> {
    let Some(prior) = prior else {
        return Ok(());
    };
    let old = &prior.slides;
    let new = &next.slides;

    match intent {
        EditIntent::Create | EditIntent::Freeform => Ok(()),
        EditIntent::Edit { index } => {
            require_slide(prior, index)?;
            require_count(old.len(), new.len())?;
            require_unchanged_except(prior, next, index)
        }
        EditIntent::Retitle { index } => {
            require_slide(prior, index)?;
            require_count(old.len(), new.len())?;
            require_unchanged_except(prior, next, index)?;
            if old[index].content != new[index].content {
                return Err(ContractViolation::ContentChanged { number: index + 1 });
            }
            Ok(())
        }
        EditIntent::Remove { index } => {
            require_slide(prior, index)?;
            require_count(old.len() - 1, new.len())?;
            let kept = old
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, s)| s);
            for (slot, (before, after)) in kept.zip(new.iter()).enumerate() {
                if before != after {
                    let original = if slot < index { slot } else { slot + 1 };
                    return Err(ContractViolation::UntouchedSlideChanged {
                        number: original + 1,
                    });
                }
            }
            Ok(())
        }
        EditIntent::Add { position } => {
            require_count(old.len() + 1, new.len())?;
            let at = position.unwrap_or(old.len()).min(old.len());
            for (i, before) in old.iter().enumerate() {
                let after = if i < at { &new[i] } else { &new[i + 1] };
                if before != after {
                    return Err(ContractViolation::UntouchedSlideChanged { number: i + 1 });
                }
            }
            Ok(())
        }
    }
}

fn require_slide(prior: &Document, index: usize) -> Result<(), ContractViolation> {
    if index < prior.slides.len() {
        Ok(())
    } else {
        Err(ContractViolation::NoSuchSlide {
            number: index + 1,
            slide_count: prior.slides.len(),
        })
    }
}

fn require_count(expected: usize, actual: usize) -> Result<(), ContractViolation> {
    if expected == actual {
        Ok(())
    } else {
        Err(ContractViolation::SlideCount { expected, actual })
    }
}

fn require_unchanged_except(
    prior: &Document,
    next: &Document,
    index: usize,
) -> Result<(), ContractViolation> {
    for (i, (before, after)) in prior.slides.iter().zip(next.slides.iter()).enumerate() {
        if i != index && before != after {
            return Err(ContractViolation::UntouchedSlideChanged { number: i + 1 });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Slide;

    fn abc() -> Document {
        Document::new("Letters")
            .with_slide(Slide::new("A").with_point("a1"))
            .with_slide(Slide::new("B").with_point("b1"))
            .with_slide(Slide::new("C").with_point("c1"))
    }

    #[test]
    fn test_parse_verbs() {
        assert_eq!(EditIntent::parse("edit slide 2 to add more details", true), EditIntent::Edit { index: 1 });
        assert_eq!(EditIntent::parse("Update slide 3", true), EditIntent::Edit { index: 2 });
        assert_eq!(EditIntent::parse("change slide 3 title to 'Future of AI'", true), EditIntent::Retitle { index: 2 });
        assert_eq!(EditIntent::parse("rename the title of slide 1", true), EditIntent::Retitle { index: 0 });
        assert_eq!(EditIntent::parse("remove slide 2", true), EditIntent::Remove { index: 1 });
        assert_eq!(EditIntent::parse("add a slide about pricing", true), EditIntent::Add { position: None });
        assert_eq!(EditIntent::parse("add a new slide after slide 1", true), EditIntent::Add { position: Some(1) });
        assert_eq!(EditIntent::parse("insert a slide before slide 1", true), EditIntent::Add { position: Some(0) });
        assert_eq!(EditIntent::parse("add a slide as slide 2", true), EditIntent::Add { position: Some(1) });
    }

    #[test]
    fn test_parse_creation_and_freeform() {
        assert_eq!(EditIntent::parse("edit slide 2", false), EditIntent::Create);
        assert_eq!(EditIntent::parse("make it more concise", true), EditIntent::Freeform);
        assert_eq!(EditIntent::parse("edit slide 0", true), EditIntent::Freeform);
        assert_eq!(EditIntent::parse("edit slide 1 and remove slide 3", true), EditIntent::Freeform);
    }

    #[test]
    fn test_parse_several_slides_is_freeform() {
        for request in [
            "update slide 2 and slide 3 to be shorter",
            "remove slide 2 and slide 3",
            "remove slides 2 and 3",
            "edit slide 2, 3 and 4",
            "delete slide 1-2",
            "add a slide between slide 1 and slide 2",
        ] {
            assert_eq!(EditIntent::parse(request, true), EditIntent::Freeform, "{}", request);
        }
        assert_eq!(EditIntent::parse("edit slide 2 and then slide 2 again", true), EditIntent::Edit { index: 1 });
    }

    #[test]
    fn test_parse_unrecognised_position_is_freeform() {
        for request in [
            "add a slide at the beginning about goals",
            "add a new slide as the first slide",
            "insert a slide at the top",
            "add a slide in the middle about risks",
        ] {
            assert_eq!(EditIntent::parse(request, true), EditIntent::Freeform, "{}", request);
        }
    }

    #[test]
    fn test_multi_slide_requests_are_accepted() {
        let prior = abc();

        let front = prior.with_slide_inserted(Some(0), Slide::new("Goals"));
        let intent = EditIntent::parse("add a slide at the beginning about goals", true);
        assert_eq!(check(Some(&prior), intent, &front), Ok(()));

        let mut shorter = prior.clone();
        shorter.slides[1].title = "B short".to_string();
        shorter.slides[2].title = "C short".to_string();
        let intent = EditIntent::parse("update slide 2 and slide 3 to be shorter", true);
        assert_eq!(check(Some(&prior), intent, &shorter), Ok(()));

        let only_a = Document::new("Letters").with_slide(prior.slides[0].clone());
        let intent = EditIntent::parse("remove slide 2 and slide 3", true);
        assert_eq!(check(Some(&prior), intent, &only_a), Ok(()));
    }

    #[test]
    fn test_edit_preserves_untouched_slides() {
        let prior = abc();
        let good = prior.with_slide_replaced(1, Slide::new("B'").with_point("new")).unwrap();
        assert_eq!(check(Some(&prior), EditIntent::Edit { index: 1 }, &good), Ok(()));

        let mut bad = good.clone();
        bad.slides[2].content.push("sneaky".to_string());
        assert_eq!(
            check(Some(&prior), EditIntent::Edit { index: 1 }, &bad),
            Err(ContractViolation::UntouchedSlideChanged { number: 3 })
        );
    }

    #[test]
    fn test_partial_payload_is_rejected() {
        let prior = abc();
        let partial = Document::new("Letters").with_slide(Slide::new("B'"));
        assert_eq!(
            check(Some(&prior), EditIntent::Edit { index: 1 }, &partial),
            Err(ContractViolation::SlideCount { expected: 3, actual: 1 })
        );
    }

    #[test]
    fn test_retitle_keeps_content() {
        let prior = abc();
        let mut next = prior.clone();
        next.slides[2].title = "Future of AI".to_string();
        assert_eq!(check(Some(&prior), EditIntent::Retitle { index: 2 }, &next), Ok(()));

        next.slides[2].content.clear();
        assert_eq!(
            check(Some(&prior), EditIntent::Retitle { index: 2 }, &next),
            Err(ContractViolation::ContentChanged { number: 3 })
        );
    }

    #[test]
    fn test_removal_shifts_indices() {
        let prior = abc();
        let removed = prior.with_slide_removed(1).unwrap();
        assert_eq!(check(Some(&prior), EditIntent::Remove { index: 1 }, &removed), Ok(()));
        assert_eq!(removed.slides[1].title, "C");

        // "edit slide 2" now targets the former slide 3.
        let intent = EditIntent::parse("edit slide 2", true);
        let edited = removed.with_slide_replaced(1, Slide::new("C'")).unwrap();
        assert_eq!(check(Some(&removed), intent, &edited), Ok(()));
        assert_eq!(edited.slides[0], prior.slides[0]);

        let wrong = prior.with_slide_removed(2).unwrap();
        assert_eq!(
            check(Some(&prior), EditIntent::Remove { index: 1 }, &wrong),
            Err(ContractViolation::UntouchedSlideChanged { number: 3 })
        );
    }

    #[test]
    fn test_addition_appends_by_default() {
        let prior = abc().with_slide_removed(2).unwrap();
        let next = prior.with_slide_inserted(None, Slide::new("X"));
        assert_eq!(check(Some(&prior), EditIntent::Add { position: None }, &next), Ok(()));
        assert_eq!(next.slides.len(), 3);

        let front = prior.with_slide_inserted(Some(0), Slide::new("X"));
        assert!(check(Some(&prior), EditIntent::Add { position: None }, &front).is_err());
        assert_eq!(check(Some(&prior), EditIntent::Add { position: Some(0) }, &front), Ok(()));
    }

    #[test]
    fn test_no_such_slide() {
        let prior = abc();
        assert_eq!(
            check(Some(&prior), EditIntent::Remove { index: 5 }, &prior),
            Err(ContractViolation::NoSuchSlide { number: 6, slide_count: 3 })
        );
    }

    #[test]
    fn test_creation_and_freeform_accept_anything() {
        let next = Document::new("New");
        assert_eq!(check(None, EditIntent::Edit { index: 9 }, &next), Ok(()));
        assert_eq!(check(Some(&abc()), EditIntent::Freeform, &next), Ok(()));
    }
}
