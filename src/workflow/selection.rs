//! Label catalog listing and operator selection.
use crate::model::{AbortReason, LabelId, SensitivityLabel};
use crate::operator::Operator;
use crate::services::LabelCatalog;
use anyhow::{Context, Result};
use regex::Regex;
use std::sync::OnceLock;

/// A catalog entry together with its resolved durable id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedLabel {
    pub label: SensitivityLabel,
    pub label_id: LabelId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Selected(SelectedLabel),
    Abort(AbortReason),
}

/// Menu lines in catalog order, numbered from 1.
pub fn render_menu(labels: &[SensitivityLabel]) -> Vec<String> {
    labels
        .iter()
        .enumerate()
        .map(|(index, label)| {
            format!("{}. {} - {}", index + 1, label.display_name, label.content_type)
        })
        .collect()
}

fn integer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[+-]?\d+$").expect("valid selection regex"))
}

/// Zero-based index for a 1-based menu answer, if it is in range.
pub fn parse_selection(input: &str, count: usize) -> Option<usize> {
    let input = input.trim();
    if !integer_pattern().is_match(input) {
        return None;
    }
    // Out-of-range magnitudes fail to parse and are rejected with the rest.
    let choice: i64 = input.parse().ok()?;
    let choice = usize::try_from(choice).ok()?;
    (1..=count).contains(&choice).then(|| choice - 1)
}

/// List labels, prompt once, and resolve the chosen label's id.
pub fn choose_label(catalog: &mut dyn LabelCatalog, operator: &mut dyn Operator) -> Result<Choice> {
    let labels = catalog
        .list_labels()
        .context("retrieve sensitivity labels")?;
    if labels.is_empty() {
        operator.notify(
            "No sensitivity labels were found. Create a sensitivity label in the compliance portal first, then run this again.",
        );
        return Ok(Choice::Abort(AbortReason::EmptyCatalog));
    }

    operator.notify("Available sensitivity labels:");
    for line in render_menu(&labels) {
        operator.notify(&line);
    }
    let answer = operator.ask(&format!(
        "Enter the number of the label to apply (1-{}, anything else exits)",
        labels.len()
    ))?;
    let Some(index) = parse_selection(&answer, labels.len()) else {
        operator.notify("Invalid choice. Exiting.");
        return Ok(Choice::Abort(AbortReason::InvalidSelection(answer)));
    };

    let label = labels
        .into_iter()
        .nth(index)
        .context("selected label missing from catalog")?;
    let label_id = catalog
        .resolve_label_id(&label.handle)
        .with_context(|| format!("resolve id of sensitivity label {:?}", label.display_name))?;
    tracing::info!(label = %label.display_name, label_id = %label_id, "label selected");
    Ok(Choice::Selected(SelectedLabel { label, label_id }))
}
