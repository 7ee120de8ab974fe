use crate::format::{days, money, optional, percent};
use analytics::{ConfidenceLevel, MetricsReport, ScenarioKind, TrendDirection};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{CellAlignment, ContentArrangement, Table};
use configuration::{ProbabilitySource, ReportSettings};
use core_types::Stage;
use rust_decimal::Decimal;

const RULE_WIDTH: usize = 78;

/// Renders the full forecast report as console text.
pub fn render(report: &MetricsReport, settings: &ReportSettings) -> String {
    let mut out = String::new();

    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push('\n');
    out.push_str("SALES PIPELINE FORECAST\n");
    out.push_str(&format!("As of {}, using {}\n", report.as_of, source_label(report.probability_source)));
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push('\n');

    render_pipeline(&mut out, report);
    render_win_rates(&mut out, report);
    render_cycle(&mut out, report);
    render_velocity(&mut out, report);
    render_at_risk(&mut out, report, settings.at_risk_display_limit);
    render_funnel(&mut out, report);
    render_reps(&mut out, report);
    render_trends(&mut out, report);
    render_cohorts(&mut out, report);
    render_scenarios(&mut out, report);
    render_comparison(&mut out, report);
    render_data_quality(&mut out, report);

    out
}

fn source_label(source: ProbabilitySource) -> &'static str {
    match source {
        ProbabilitySource::Configured => "configured stage probabilities",
        ProbabilitySource::Historical => "historical win rates",
    }
}

fn trend_label(trend: TrendDirection) -> &'static str {
    match trend {
        TrendDirection::Improving => "improving",
        TrendDirection::Stable => "stable",
        TrendDirection::Declining => "declining",
    }
}

fn heading(out: &mut String, title: &str) {
    out.push('\n');
    out.push_str(title);
    out.push('\n');
    out.push_str(&"-".repeat(title.len()));
    out.push('\n');
}

/// A table whose columns from `first_numeric` on are right aligned.
fn table(header: &[&str], first_numeric: usize) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    for index in first_numeric..header.len() {
        if let Some(column) = table.column_mut(index) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
    table
}

fn push_table(out: &mut String, table: &Table) {
    out.push_str(&table.to_string());
    out.push('\n');
}

fn render_pipeline(out: &mut String, report: &MetricsReport) {
    heading(out, "Weighted Pipeline");
    let forecast = &report.forecast;
    if forecast.stages.is_empty() {
        out.push_str("No open opportunities.\n");
        return;
    }

    let mut stages = table(&["Stage", "Deals", "Pipeline", "Probability", "Weighted"], 1);
    for stage in &forecast.stages {
        stages.add_row(vec![
            stage.stage.to_string(),
            stage.count.to_string(),
            money(stage.total_amount),
            percent(stage.probability, 0),
            money(stage.weighted_amount),
        ]);
    }
    stages.add_row(vec![
        "TOTAL".to_string(),
        forecast.open_count.to_string(),
        money(forecast.total_pipeline),
        String::new(),
        money(forecast.weighted_forecast),
    ]);
    push_table(out, &stages);
}

fn render_win_rates(out: &mut String, report: &MetricsReport) {
    heading(out, "Historical Win Rates");
    let rates = &report.win_rates;

    let mut stages = table(&["Stage", "Won", "Lost", "Closed", "Win Rate"], 1);
    for stage in &rates.stages {
        stages.add_row(vec![
            stage.stage.to_string(),
            stage.won.to_string(),
            stage.lost.to_string(),
            (stage.won + stage.lost).to_string(),
            optional(stage.win_rate, |r| percent(r, 0)),
        ]);
    }
    stages.add_row(vec![
        "TOTAL".to_string(),
        rates.won.to_string(),
        rates.lost.to_string(),
        rates.closed.to_string(),
        optional(rates.overall_win_rate, |r| percent(r, 0)),
    ]);
    push_table(out, &stages);

    let level = match report.confidence.level {
        ConfidenceLevel::High => "High",
        ConfidenceLevel::Medium => "Medium",
        ConfidenceLevel::Low => "Low",
    };
    out.push_str(&format!(
        "Forecast confidence: {level} ({} closed deals)\n",
        report.confidence.sample_size
    ));
    out.push_str(&format!(
        "Average won deal: {}\n",
        optional(report.avg_won_deal_size, money)
    ));
}

fn render_cycle(out: &mut String, report: &MetricsReport) {
    heading(out, "Sales Cycle");
    let cycle = &report.cycle;
    out.push_str(&format!("Average:        {}\n", optional(cycle.avg_cycle_days, days)));
    out.push_str(&format!("Median:         {}\n", optional(cycle.median_cycle_days, days)));
    out.push_str(&format!("Average (won):  {}\n", optional(cycle.avg_won_cycle_days, days)));
    out.push_str(&format!("Sample:         {} closed deals\n", cycle.sample_size));

    if !cycle.by_stage.is_empty() {
        let mut stages = table(&["Closed From", "Deals", "Avg Days", "Median Days"], 1);
        for stage in &cycle.by_stage {
            stages.add_row(vec![
                stage.stage.to_string(),
                stage.count.to_string(),
                stage.avg_days.round_dp(0).to_string(),
                stage.median_days.round_dp(0).to_string(),
            ]);
        }
        push_table(out, &stages);
    }
}

fn render_velocity(out: &mut String, report: &MetricsReport) {
    heading(out, "Sales Velocity");
    let velocity = &report.velocity;
    let Some(per_day) = velocity.velocity_per_day else {
        out.push_str("Velocity: insufficient data (needs closed deals with dates and at least one win).\n");
        return;
    };

    out.push_str(&format!(
        "({} open x {} win rate x {} avg deal) / {} = {} per day\n",
        velocity.open_count,
        optional(velocity.win_rate, |r| percent(r, 0)),
        optional(velocity.avg_deal_size, money),
        optional(velocity.avg_cycle_days, days),
        money(per_day),
    ));

    let mut projections = table(&["Period", "Projected Revenue"], 1);
    for projection in &velocity.projections {
        projections.add_row(vec![
            format!("Next {} days", projection.days),
            money(projection.revenue),
        ]);
    }
    if let Some(annualized) = velocity.annualized {
        projections.add_row(vec!["Annualized".to_string(), money(annualized)]);
    }
    push_table(out, &projections);
}

fn render_at_risk(out: &mut String, report: &MetricsReport, display_limit: usize) {
    heading(out, "At-Risk Opportunities");
    let at_risk = &report.at_risk;
    let Some(threshold) = at_risk.threshold_days else {
        out.push_str("No average cycle available; at-risk detection skipped.\n");
        return;
    };
    if at_risk.opportunities.is_empty() {
        out.push_str(&format!("No open deals older than the average cycle ({}).\n", days(threshold)));
        return;
    }

    out.push_str(&format!("Open longer than the average cycle ({}):\n", days(threshold)));
    let mut deals = table(&["ID", "Opportunity", "Stage", "Owner", "Amount", "Age", "Over"], 4);
    for opp in at_risk.opportunities.iter().take(display_limit) {
        deals.add_row(vec![
            opp.id.clone(),
            opp.name.clone(),
            opp.stage.to_string(),
            opp.owner.clone(),
            money(opp.amount),
            opp.age_days.to_string(),
            opp.days_over.round_dp(0).to_string(),
        ]);
    }
    push_table(out, &deals);

    out.push_str(&format!(
        "Total at risk: {} opportunities worth {}\n",
        at_risk.opportunities.len(),
        money(at_risk.total_amount)
    ));
    let hidden = at_risk.opportunities.len().saturating_sub(display_limit);
    if hidden > 0 {
        out.push_str(&format!("(Showing top {display_limit}, {hidden} more not displayed)\n"));
    }
}

fn render_funnel(out: &mut String, report: &MetricsReport) {
    heading(out, "Conversion Funnel");
    let funnel = &report.funnel;

    let mut stages = table(&["Stage", "Entered", "In Stage", "Won", "Lost", "Avg Days", "Stuck"], 1);
    for stage in &funnel.stages {
        stages.add_row(vec![
            stage.stage.to_string(),
            stage.entered.to_string(),
            stage.currently_in_stage.to_string(),
            stage.won_from_here.to_string(),
            stage.lost_from_here.to_string(),
            optional(stage.avg_days_in_stage, |d| d.round_dp(0).to_string()),
            stage.stuck_count.to_string(),
        ]);
    }
    push_table(out, &stages);

    let mut transitions = table(&["Transition", "From", "To", "Conversion", "Drop-off"], 1);
    for transition in &funnel.transitions {
        transitions.add_row(vec![
            format!("{} -> {}", transition.from_stage, transition.to_stage),
            transition.from_count.to_string(),
            transition.to_count.to_string(),
            optional(transition.conversion_rate, |r| percent(r, 1)),
            optional(transition.drop_off_rate, |r| percent(r, 1)),
        ]);
    }
    push_table(out, &transitions);

    if let Some(bottleneck) = &funnel.biggest_bottleneck {
        out.push_str(&format!(
            "Biggest bottleneck: {} -> {} ({} drop-off)\n",
            bottleneck.from_stage,
            bottleneck.to_stage,
            optional(bottleneck.drop_off_rate, |r| percent(r, 1)),
        ));
    }
    let stage_name = |stage: Option<Stage>| optional(stage, |s| s.to_string());
    out.push_str(&format!("Slowest stage:   {}\n", stage_name(funnel.slowest_stage)));
    out.push_str(&format!("Stickiest stage: {}\n", stage_name(funnel.stickiest_stage)));
}

fn render_reps(out: &mut String, report: &MetricsReport) {
    heading(out, "Rep Performance");
    if report.reps.is_empty() {
        out.push_str("No opportunities.\n");
        return;
    }

    let mut reps = table(
        &["Rep", "Pipeline", "Forecast", "Active", "Won", "Lost", "Win Rate", "Avg Deal"],
        1,
    );
    for rep in &report.reps {
        reps.add_row(vec![
            rep.owner.clone(),
            money(rep.open_pipeline),
            money(rep.weighted_forecast),
            rep.open_count.to_string(),
            rep.won_count.to_string(),
            rep.lost_count.to_string(),
            optional(rep.win_rate, |r| percent(r, 0)),
            optional(rep.avg_deal_size, money),
        ]);
    }
    push_table(out, &reps);
}

fn render_trends(out: &mut String, report: &MetricsReport) {
    heading(out, "Revenue Trend");
    let trends = &report.trends;

    if !trends.months.is_empty() {
        let mut months = table(&["Month", "Revenue", "Won", "Lost", "Win Rate"], 1);
        for month in &trends.months {
            months.add_row(vec![
                month.month.label(),
                money(month.revenue),
                month.won_count.to_string(),
                month.lost_count.to_string(),
                optional(month.win_rate, |r| percent(r, 0)),
            ]);
        }
        push_table(out, &months);
    }

    out.push_str(&format!("Revenue trend:        {}\n", trend_label(trends.revenue_trend)));
    out.push_str(&format!("Win rate trend:       {}\n", trend_label(trends.win_rate_trend)));
    out.push_str(&format!(
        "Avg monthly revenue:  {}\n",
        optional(trends.avg_monthly_revenue, money)
    ));
    out.push_str(&format!(
        "Next quarter:         {}\n",
        optional(trends.next_quarter_projection, money)
    ));
    out.push_str(&format!(
        "Pipeline coverage:    {} of {} quarterly quota\n",
        optional(trends.pipeline_coverage, |r| percent(r, 1)),
        money(trends.quarterly_quota)
    ));
}

fn render_cohorts(out: &mut String, report: &MetricsReport) {
    heading(out, "Cohorts by Created Month");
    let cohorts = &report.cohorts;
    if cohorts.cohorts.is_empty() {
        out.push_str("No dated opportunities.\n");
        return;
    }

    let mut rows = table(
        &["Cohort", "Total", "Won", "Lost", "Open", "Closed %", "Win Rate", "Avg Days"],
        1,
    );
    for cohort in &cohorts.cohorts {
        rows.add_row(vec![
            cohort.month.label(),
            cohort.total.to_string(),
            cohort.won.to_string(),
            cohort.lost.to_string(),
            cohort.open.to_string(),
            optional(cohort.conversion_rate, |r| percent(r, 0)),
            optional(cohort.win_rate, |r| percent(r, 0)),
            optional(cohort.avg_days_to_close, |d| d.round_dp(0).to_string()),
        ]);
    }
    push_table(out, &rows);
    out.push_str(&format!("Cohort trend: {}\n", trend_label(cohorts.trend)));
}

fn render_scenarios(out: &mut String, report: &MetricsReport) {
    heading(out, "Scenario Analysis");

    let mut header = vec!["Scenario"];
    header.extend(Stage::ALL.iter().map(|stage| stage.as_str()));
    header.extend(["Cycle", "Forecast"]);
    let mut rows = table(&header, 1);

    for scenario in &report.scenarios {
        let label = match scenario.kind {
            ScenarioKind::Best => "Best case",
            ScenarioKind::Expected => "Expected",
            ScenarioKind::Worst => "Worst case",
        };
        let mut row = vec![label.to_string()];
        row.extend(
            Stage::ALL
                .iter()
                .map(|stage| optional(scenario.rates.get(*stage), |r| percent(r, 0))),
        );
        row.push(days(scenario.cycle_days));
        row.push(money(scenario.forecast));
        rows.add_row(row);
    }
    push_table(out, &rows);
}

fn render_comparison(out: &mut String, report: &MetricsReport) {
    heading(out, "Forecast Comparison");
    let comparison = &report.comparison;
    let standard = comparison.standard;
    let versus = |value: Decimal| {
        if value == standard {
            "--".to_string()
        } else {
            let diff = value - standard;
            let sign = if diff.is_sign_positive() { "+" } else { "" };
            format!("{sign}{}", money(diff))
        }
    };

    let mut rows = table(&["Method", "Forecast", "vs Standard"], 1);
    for (label, value) in [
        ("Conservative (historical x0.8)", comparison.conservative),
        ("Standard probabilities", comparison.standard),
        ("Historical win rates", comparison.historical),
        ("Optimistic (historical x1.2)", comparison.optimistic),
        ("Total pipeline", comparison.total_pipeline),
    ] {
        rows.add_row(vec![label.to_string(), money(value), versus(value)]);
    }
    push_table(out, &rows);
}

fn render_data_quality(out: &mut String, report: &MetricsReport) {
    let quality = &report.data_quality;
    if quality.is_clean() {
        return;
    }
    heading(out, "Data Quality");
    out.push_str(&format!(
        "{} records were left out of some metrics:\n",
        quality.excluded_records()
    ));
    let mut rows = table(&["Issue", "Records"], 1);
    rows.add_row(vec![
        "Closed without last stage".to_string(),
        quality.closed_without_last_stage.to_string(),
    ]);
    rows.add_row(vec![
        "Missing created date".to_string(),
        quality.missing_created_date.to_string(),
    ]);
    rows.add_row(vec![
        "Closed without close date".to_string(),
        quality.missing_close_date.to_string(),
    ]);
    push_table(out, &rows);
}
