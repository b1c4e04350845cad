use crate::surveys::{AnswerSet, ResponseScorer, SubmitterRole};

pub(super) const TEACHER_VICTIMIZATION: [&str; 6] = [
    "t_vic_insults",
    "t_vic_exclusion",
    "t_vic_physical",
    "t_vic_theft",
    "t_vic_rumors",
    "t_vic_threats",
];

pub(super) const TEACHER_AGGRESSION: [&str; 5] = [
    "t_agg_insults",
    "t_agg_exclusion",
    "t_agg_physical",
    "t_agg_theft",
    "t_agg_rumors",
];

pub(super) fn scorer() -> ResponseScorer {
    ResponseScorer::reference()
}

/// Parent answer set built from `(item index, intensity)` pairs.
pub(super) fn parent_answers(items: &[(u8, i32)]) -> AnswerSet {
    items
        .iter()
        .fold(AnswerSet::new(SubmitterRole::Parent), |answers, (index, value)| {
            answers.with_item(format!("p_item_{index}"), *value)
        })
}

pub(super) fn teacher_answers(items: &[(&str, i32)]) -> AnswerSet {
    items
        .iter()
        .fold(AnswerSet::new(SubmitterRole::Teacher), |answers, (item, value)| {
            answers.with_item(*item, *value)
        })
}

/// Parent answers summing to `total` while keeping the override items below their trigger.
pub(super) fn parent_total(total: u32) -> AnswerSet {
    let mut remaining = total as i32;
    let mut answers = AnswerSet::new(SubmitterRole::Parent);
    for index in [1, 3, 4, 6, 7, 8, 9, 10, 11, 12, 13, 2, 5] {
        if remaining == 0 {
            break;
        }
        let cap = if index == 2 || index == 5 { 2 } else { 4 };
        let value = remaining.min(cap);
        answers = answers.with_item(format!("p_item_{index}"), value);
        remaining -= value;
    }
    assert_eq!(remaining, 0, "total {total} unreachable without overrides");
    answers
}
