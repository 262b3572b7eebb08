use crate::classify::{classify, title_for};
use crate::error::EngineError;
use crate::render::render;
use crate::{ConditionEvaluator, RecommendationSink, RuleCatalog};
use agrimon_common::types::{
    Category, GeneratedItem, RecommendationStatus, Rule, RuleRunDetail, RunSummary, WriteStats,
};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Identity the engine runs under. The engine has system-level privileges
/// and no end-user identity; the actor string is recorded on every row it
/// writes so generated records stay attributable.
#[derive(Debug, Clone)]
pub struct SystemContext {
    actor: String,
}

impl SystemContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
        }
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }
}

/// The run orchestrator: loads the catalog, drives the condition evaluator
/// per rule, funnels hits through the renderer and classifier, and hands
/// batches to the recommendation sink.
///
/// Each invocation is a stateless batch job. A failing rule never affects
/// its siblings; only a catalog load failure aborts the run.
pub struct RuleRunner {
    catalog: Arc<dyn RuleCatalog>,
    evaluator: Arc<dyn ConditionEvaluator>,
    sink: Arc<dyn RecommendationSink>,
    rule_timeout: Duration,
    ctx: SystemContext,
}

impl RuleRunner {
    pub fn new(
        catalog: Arc<dyn RuleCatalog>,
        evaluator: Arc<dyn ConditionEvaluator>,
        sink: Arc<dyn RecommendationSink>,
        rule_timeout: Duration,
        ctx: SystemContext,
    ) -> Self {
        Self {
            catalog,
            evaluator,
            sink,
            rule_timeout,
            ctx,
        }
    }

    /// Run the full catalog once.
    pub async fn run(&self) -> Result<RunSummary, EngineError> {
        self.run_with_cancel(&AtomicBool::new(false)).await
    }

    /// Run the full catalog once, honoring a cancellation flag.
    ///
    /// Once the flag is set no new rule evaluation starts; the rule in
    /// flight finishes (including its writes) so the summary never
    /// undercounts already-persisted items. Remaining rules are reported
    /// as skipped.
    pub async fn run_with_cancel(&self, cancel: &AtomicBool) -> Result<RunSummary, EngineError> {
        let started = Utc::now();
        let rules = self
            .catalog
            .list_active_rules()
            .await
            .map_err(EngineError::CatalogUnavailable)?;

        tracing::info!(
            actor = %self.ctx.actor(),
            rule_count = rules.len(),
            "Engine run started"
        );

        let mut summary = RunSummary {
            rules_evaluated: rules.len(),
            total_generated: 0,
            alerts_generated: 0,
            recommendations_generated: 0,
            written: 0,
            duplicates_skipped: 0,
            write_failures: 0,
            timestamp: started,
            rules: Vec::with_capacity(rules.len()),
        };
        let mut stats = WriteStats::default();

        for rule in &rules {
            if cancel.load(Ordering::Relaxed) {
                tracing::warn!(rule_code = %rule.code, "Run cancelled, skipping rule");
                summary.rules.push(skipped_detail(rule, 0, "cancelled"));
                continue;
            }

            let detail = self.run_rule(rule, &mut summary, &mut stats).await;
            summary.rules.push(detail);
        }

        summary.written = stats.written;
        summary.duplicates_skipped = stats.duplicates;
        summary.write_failures = stats.failures;

        tracing::info!(
            actor = %self.ctx.actor(),
            rules_evaluated = summary.rules_evaluated,
            total_generated = summary.total_generated,
            written = summary.written,
            duplicates = summary.duplicates_skipped,
            "Engine run finished"
        );

        Ok(summary)
    }

    /// Evaluate one rule end to end. Never fails: evaluation errors and
    /// timeouts turn into a skipped detail entry so sibling rules proceed.
    async fn run_rule(
        &self,
        rule: &Rule,
        summary: &mut RunSummary,
        stats: &mut WriteStats,
    ) -> RuleRunDetail {
        let hits = match tokio::time::timeout(self.rule_timeout, self.evaluator.evaluate(rule))
            .await
        {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                let err = EngineError::RuleEvaluationFailed {
                    rule_code: rule.code.clone(),
                    cause: format!("{e:#}"),
                };
                tracing::error!(rule_code = %rule.code, error = %err, "Rule skipped");
                return skipped_detail(rule, 0, &format!("{e:#}"));
            }
            Err(_) => {
                let reason = format!(
                    "evaluation timed out after {}s",
                    self.rule_timeout.as_secs()
                );
                tracing::error!(rule_code = %rule.code, reason = %reason, "Rule skipped");
                return skipped_detail(rule, 0, &reason);
            }
        };

        let classification = classify(rule);
        let title = title_for(rule, classification.category);

        let items: Vec<GeneratedItem> = hits
            .iter()
            .map(|hit| GeneratedItem {
                title: title.clone(),
                message: render(&rule.message_template, hit),
                producer_id: hit.producer_id.clone(),
                rule_code: rule.code.clone(),
                category: classification.category,
                priority: classification.priority,
                rec_type: classification.rec_type.to_string(),
                status: RecommendationStatus::Pending,
            })
            .collect();

        summary.total_generated += items.len();
        match classification.category {
            Category::Alert => summary.alerts_generated += items.len(),
            Category::Recommendation => summary.recommendations_generated += items.len(),
        }

        if !items.is_empty() {
            let batch = self.sink.write_all(self.ctx.actor(), &items).await;
            tracing::debug!(
                rule_code = %rule.code,
                hits = hits.len(),
                written = batch.written,
                duplicates = batch.duplicates,
                failures = batch.failures,
                "Rule evaluated"
            );
            stats.absorb(batch);
        }

        RuleRunDetail {
            code: rule.code.clone(),
            name: rule.name.clone(),
            severity: rule.severity,
            action_type: rule.action_type,
            hits: hits.len(),
            generated: items.len(),
            skipped: None,
        }
    }
}

fn skipped_detail(rule: &Rule, hits: usize, reason: &str) -> RuleRunDetail {
    RuleRunDetail {
        code: rule.code.clone(),
        name: rule.name.clone(),
        severity: rule.severity,
        action_type: rule.action_type,
        hits,
        generated: 0,
        skipped: Some(reason.to_string()),
    }
}
