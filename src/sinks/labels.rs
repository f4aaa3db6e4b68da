//! Custom entry labels

use crate::core::{EventId, LogLevel, WebContext};
use std::collections::HashMap;
use std::sync::Arc;

/// Adds or rewrites labels of a structured entry.
///
/// Providers run in registration order, after the optional `category` label has
/// been inserted. Plain messages pass an empty [`WebContext`].
pub trait LabelProvider: Send + Sync {
    fn update_labels(
        &self,
        category: &str,
        event_id: &EventId,
        level: LogLevel,
        context: &WebContext,
        labels: &mut HashMap<String, String>,
    );
}

impl<F> LabelProvider for F
where
    F: Fn(&str, &EventId, LogLevel, &WebContext, &mut HashMap<String, String>) + Send + Sync,
{
    fn update_labels(
        &self,
        category: &str,
        event_id: &EventId,
        level: LogLevel,
        context: &WebContext,
        labels: &mut HashMap<String, String>,
    ) {
        self(category, event_id, level, context, labels)
    }
}

pub type LabelProviders = Vec<Arc<dyn LabelProvider>>;

pub(crate) const CATEGORY_LABEL: &str = "category";

/// Label set of one entry: `category` first, then every provider.
pub(crate) fn fill_labels(
    labels: &mut HashMap<String, String>,
    include_category: bool,
    providers: &[Arc<dyn LabelProvider>],
    category: &str,
    event_id: &EventId,
    level: LogLevel,
    context: &WebContext,
) {
    if include_category {
        labels.insert(CATEGORY_LABEL.to_string(), category.to_string());
    }
    for provider in providers {
        provider.update_labels(category, event_id, level, context, labels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_providers_run_after_category() {
        let overwrite: Arc<dyn LabelProvider> = Arc::new(
            |category: &str,
             _: &EventId,
             level: LogLevel,
             context: &WebContext,
             labels: &mut HashMap<String, String>| {
                labels.insert("category".into(), category.to_uppercase());
                labels.insert("level".into(), level.to_string());
                if let Some(user) = &context.user {
                    labels.insert("user".into(), user.clone());
                }
            },
        );
        let mut labels = HashMap::new();
        let context = WebContext::default().with_user("ann");
        fill_labels(
            &mut labels,
            true,
            &[overwrite],
            "svc",
            &EventId::default(),
            LogLevel::Warning,
            &context,
        );
        assert_eq!(labels["category"], "SVC");
        assert_eq!(labels["level"], "WARNING");
        assert_eq!(labels["user"], "ann");
    }

    #[test]
    fn test_no_category_label_by_default() {
        let mut labels = HashMap::new();
        fill_labels(
            &mut labels,
            false,
            &[],
            "svc",
            &EventId::default(),
            LogLevel::Info,
            &WebContext::default(),
        );
        assert!(labels.is_empty());
    }
}
