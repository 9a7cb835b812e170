use std::{env, sync::Arc};

use anyhow::Context;
use voxshift_checkout::{
    config::{build_config, EnvSecrets},
    error::{AppError, AppResult},
    service::{
        catalog::{BillingPeriod, PlanCatalog},
        checkout::message,
    },
    utils::{format_money, logging},
    AppState, StaticAuthContext,
};

#[macro_use]
extern crate log;

const USAGE: &str = "usage: voxshift-checkout <plan> [monthly|yearly] [promo-code]";

struct QuoteArgs {
    plan_id: String,
    period: BillingPeriod,
    promo: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> AppResult<QuoteArgs> {
    let plan_id = args.next().ok_or_else(|| AppError::InvalidArgument(USAGE.to_string()))?;
    let period = match args.next() {
        Some(raw) => raw.parse::<BillingPeriod>().map_err(AppError::InvalidArgument)?,
        None => BillingPeriod::Monthly,
    };

    Ok(QuoteArgs {
        plan_id,
        period,
        promo: args.next(),
    })
}

fn print_plans(catalog: &PlanCatalog, currency: &str) {
    for plan in catalog.plans() {
        let savings = PlanCatalog::yearly_savings_percent(plan)
            .map(|p| format!(" (save {}% yearly)", p.round()))
            .unwrap_or_default();
        println!(
            "{:<8} {:>8}/month {:>8}/year{}  {}",
            plan.id,
            format_money(plan.monthly_price, currency),
            format_money(plan.yearly_price, currency),
            savings,
            plan.tagline
        );
    }
}

async fn run() -> AppResult<()> {
    let args = parse_args(env::args().skip(1))?;

    let config = build_config(&EnvSecrets)?;
    let auth = Arc::new(StaticAuthContext::from_secrets(&EnvSecrets));
    let state = AppState::new(config, auth)?;
    let checkout = &state.services.checkout;

    if args.plan_id == "plans" {
        print_plans(&state.services.catalog, &state.config.checkout.currency);
        return Ok(());
    }

    let session = checkout.open_session(&args.plan_id, args.period).await?;

    if let Some(code) = &args.promo {
        if let Err(e) = session.apply_promo(code).await {
            warn!("Promo code not applied: {}", e);
            println!("{}", e.user_message());
        }
    }

    let summary = session.summary().await?;
    println!("{}", summary);
    if state.config.checkout.test_mode {
        println!("{}", message::test_mode_hint());
    }

    checkout.close_all();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    info!("Starting voxshift-checkout...");

    run().await.context("Checkout quote failed")?;

    Ok(())
}
