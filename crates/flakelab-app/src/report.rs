//! Markdown rendering of a study receipt.

use flakelab_types::{Severity, StudyReceipt};

/// Render a study receipt as a Markdown summary.
///
/// The header reflects the worst observed severity so a CI reader gets the
/// verdict before the tables.
pub fn render_markdown(receipt: &StudyReceipt) -> String {
    let mut out = String::new();

    let worst = receipt
        .flakiness
        .values()
        .map(|a| a.severity)
        .max()
        .unwrap_or(Severity::Low);

    let header = match worst {
        Severity::Low => "✅ flakelab: low flakiness",
        Severity::Moderate => "⚠️ flakelab: moderate flakiness",
        Severity::High => "⚠️ flakelab: high flakiness",
        Severity::Severe => "❌ flakelab: severe flakiness",
    };

    out.push_str(header);
    out.push_str("\n\n");

    out.push_str(&format!("**Study:** `{}`\n\n", receipt.study.id));

    if !receipt.flakiness.is_empty() {
        out.push_str("## Flakiness by archetype\n\n");
        out.push_str(
            "| archetype | avg pass rate | flakiness index | severity | predictability | vs expected |\n",
        );
        out.push_str("|---|---:|---:|---|---|---:|\n");

        for (archetype, a) in &receipt.flakiness {
            out.push_str(&format!(
                "| {} | {:.1}% | {:.3} | {:?} | {:?} | {:+.3} |\n",
                archetype,
                a.observed.avg_pass_rate * 100.0,
                a.observed.flakiness_index,
                a.severity,
                a.predictability,
                a.observed.avg_pass_rate - a.profile.typical_pass_rate,
            ));
        }
        out.push('\n');
    }

    if !receipt.effectiveness.is_empty() {
        out.push_str("## Mitigation strategies\n\n");
        out.push_str("| strategy | improvement | overhead | effectiveness | ROI | verdict |\n");
        out.push_str("|---|---:|---:|---:|---:|---|\n");

        for (name, eff) in &receipt.effectiveness {
            let (roi, verdict) = match receipt.cost_benefit.get(name) {
                Some(cb) => (cb.roi, cb.recommendation.message()),
                None => (0.0, ""),
            };
            out.push_str(&format!(
                "| {} | {:+.1}% | {:+.1}% | {:.2} | {:.2} | {} |\n",
                name,
                eff.improvement_relative_percent,
                eff.time_overhead_percent,
                eff.effectiveness_score,
                roi,
                verdict,
            ));
        }
        out.push('\n');
    }

    let ranking = &receipt.recommendations.priority_ranking;
    if !ranking.is_empty() {
        out.push_str("## Priority ranking\n\n");
        for (i, ranked) in ranking.iter().enumerate() {
            out.push_str(&format!(
                "{}. **{}** (ROI {:.2}): {}\n",
                i + 1,
                ranked.strategy,
                ranked.roi,
                ranked.recommendation.message(),
            ));
        }
        out.push('\n');
    }

    if !receipt.recommendations.by_archetype.is_empty() {
        out.push_str("## Guidance by archetype\n\n");
        for (archetype, rec) in &receipt.recommendations.by_archetype {
            out.push_str(&format!(
                "- **{}** → `{}` (expected effectiveness {:.0}%): {}\n",
                archetype,
                rec.primary,
                rec.expected_effectiveness * 100.0,
                rec.implementation_notes,
            ));
        }
        out.push('\n');
    }

    if !receipt.recommendations.by_scenario.is_empty() {
        out.push_str("## Scenario guidance\n\n");
        for s in &receipt.recommendations.by_scenario {
            out.push_str(&format!(
                "- **{}** → `{}`: {} ({})\n",
                s.scenario, s.recommended_strategy, s.rationale, s.trade_offs,
            ));
        }
    }

    out
}
