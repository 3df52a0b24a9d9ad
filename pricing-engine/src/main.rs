use anyhow::Context;
use pricing_engine::{EngineConfig, Scenario, init_logger_from_config};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    // 1. Environment (.env is optional)
    dotenv::dotenv().ok();
    let config = EngineConfig::from_env();
    init_logger_from_config(&config);

    // 2. Scenario
    let path = std::env::args()
        .nth(1)
        .context("usage: price-order <scenario.json>")?;
    let scenario = Scenario::from_path(&path).with_context(|| format!("loading {}", path))?;
    tracing::info!(path = %path, order_id = scenario.order.id(), "Pricing scenario");

    // 3. Refresh
    let outcome = scenario.run(config)?;

    let failures: Vec<_> = outcome
        .report
        .failures
        .iter()
        .map(|f| json!({ "promotion_id": f.promotion_id, "name": f.promotion_name, "error": f.error.to_string() }))
        .chain(
            outcome
                .report
                .tax_failures
                .iter()
                .map(|f| json!({ "tax_type_id": f.tax_type_id, "name": f.tax_type_name, "error": f.error.to_string() })),
        )
        .collect();
    let rejected: Vec<_> = outcome
        .rejected_coupons
        .iter()
        .map(|r| json!({ "code": r.code, "error": r.error.to_string() }))
        .collect();
    let unavailable: Vec<_> = outcome
        .report
        .unavailable_items
        .iter()
        .map(|u| json!({ "item_id": u.item_id, "reason": u.reason }))
        .collect();

    let output = json!({
        "order": outcome.order,
        "summary": outcome.summary,
        "report": {
            "adjustments_added": outcome.report.adjustments_added,
            "applied_promotions": outcome.report.applied_promotions,
            "unavailable_items": unavailable,
            "failures": failures,
            "rejected_coupons": rejected,
            "skipped_records": outcome.skipped,
        },
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
