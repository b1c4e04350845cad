use super::super::domain::{AnswerSet, BlockScore};
use super::config::{OverrideRule, RoleRules, MAX_INTENSITY};
use super::ScoringError;

/// Reject any intensity outside `0..=MAX_INTENSITY` on an item these rules read.
pub(crate) fn validate_intensities(
    answers: &AnswerSet,
    rules: &RoleRules,
) -> Result<(), ScoringError> {
    match answers
        .present()
        .filter(|(item, _)| rules.reads(item))
        .find(|(_, value)| !(0..=MAX_INTENSITY).contains(value))
    {
        Some((item, value)) => Err(ScoringError::IntensityOutOfRange {
            item: item.to_string(),
            value,
        }),
        None => Ok(()),
    }
}

/// Sum each block over the items it owns; absent items count as zero.
pub(crate) fn score_blocks(answers: &AnswerSet, rules: &RoleRules) -> Vec<BlockScore> {
    rules
        .blocks
        .iter()
        .map(|block| BlockScore {
            block: block.name.clone(),
            score: block
                .items
                .iter()
                .filter_map(|item| answers.intensity(item))
                .map(|value| value as u32)
                .sum(),
        })
        .collect()
}

pub(crate) fn block_flags(rules: &RoleRules, blocks: &[BlockScore]) -> Vec<String> {
    let mut flags = Vec::new();
    for (rule, block) in rules.blocks.iter().zip(blocks) {
        if block.score > rule.flag_above {
            push_flag(&mut flags, &rule.flag);
        }
    }
    flags
}

pub(crate) fn triggered_overrides<'a>(
    answers: &AnswerSet,
    rules: &'a RoleRules,
) -> Vec<&'a OverrideRule> {
    rules
        .overrides
        .iter()
        .filter(|rule| {
            rule.items.iter().any(|item| {
                answers
                    .intensity(item)
                    .is_some_and(|value| value >= i32::from(rule.trigger_at))
            })
        })
        .collect()
}

pub(crate) fn push_flag(flags: &mut Vec<String>, flag: &str) {
    if !flags.iter().any(|existing| existing == flag) {
        flags.push(flag.to_string());
    }
}
