use agrimon_common::types::{ActionType, Category, Priority, Rule, Severity};

/// Full classification of a rule: everything the writer needs besides the
/// rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub priority: Priority,
    /// Display sub-type for downstream filtering UI. Independent of
    /// category and priority.
    pub rec_type: &'static str,
}

/// Map a declared severity to the priority downstream systems expect.
pub fn priority_for(severity: Severity) -> Priority {
    match severity {
        Severity::Critical => Priority::Urgent,
        Severity::High => Priority::High,
        Severity::Medium => Priority::Medium,
        Severity::Info => Priority::Low,
    }
}

/// An item is an alert iff the rule says so explicitly or its severity is
/// critical. Either signal alone is enough: rule authors mark urgency
/// through whichever field they reach for first.
pub fn category_for(rule: &Rule) -> Category {
    if rule.action_type == ActionType::Alert || rule.severity == Severity::Critical {
        Category::Alert
    } else {
        Category::Recommendation
    }
}

/// Display sub-type bucket for the filtering UI. Total over the closed
/// enum; the recommendation bucket doubles as the default.
pub fn rec_type_for(action_type: ActionType) -> &'static str {
    match action_type {
        ActionType::Alert => "traitement",
        ActionType::Warning => "surveillance",
        ActionType::Notification => "information",
        ActionType::Recommendation => "fertilisation",
    }
}

pub fn classify(rule: &Rule) -> Classification {
    Classification {
        category: category_for(rule),
        priority: priority_for(rule.severity),
        rec_type: rec_type_for(rule.action_type),
    }
}

/// Compose the item title from the category prefix and the rule identity.
/// The prefix is derived purely from the category so the two can never
/// disagree.
pub fn title_for(rule: &Rule, category: Category) -> String {
    format!("{} {} : {}", category.title_prefix(), rule.code, rule.name)
}
