//! Standalone HTML chart pages.
//!
//! Each chart is a Plotly figure (`data` + `layout`) built as JSON and embedded
//! in a page that loads Plotly from its CDN. The same figures back the
//! dashboard, which fetches them as JSON.

use crate::error::ReportingError;
use analytics::MetricsReport;
use core_types::Stage;
use serde::Serialize;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
const STAGE_COLORS: [&str; 4] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    /// Stable identifier, also the file stem of the written page.
    pub id: &'static str,
    pub title: String,
    pub figure: Value,
}

impl Chart {
    pub fn file_name(&self) -> String {
        format!("{}.html", self.id)
    }
}

fn stage_color(stage: Stage) -> &'static str {
    STAGE_COLORS[stage.index()]
}

/// Every chart for `report`, in display order.
pub fn build_all(report: &MetricsReport) -> Vec<Chart> {
    vec![
        pipeline_waterfall(report),
        revenue_trend(report),
        forecast_comparison(report),
        conversion_funnel(report),
        deal_analysis_scatter(report),
        rep_performance(report),
    ]
}

pub fn pipeline_waterfall(report: &MetricsReport) -> Chart {
    let forecast = &report.forecast;
    let mut x: Vec<String> = forecast.stages.iter().map(|s| s.stage.to_string()).collect();
    let mut y: Vec<Value> = forecast.stages.iter().map(|s| json!(s.weighted_amount)).collect();
    let mut measure: Vec<&str> = vec!["relative"; forecast.stages.len()];
    x.push("Total Forecast".to_string());
    y.push(json!(forecast.weighted_forecast));
    measure.push("total");

    let title = "Pipeline Waterfall - Weighted Forecast by Stage".to_string();
    Chart {
        id: "pipeline_waterfall",
        figure: json!({
            "data": [{
                "type": "waterfall",
                "name": "Weighted Forecast",
                "orientation": "v",
                "measure": measure,
                "x": x,
                "y": y,
                "textposition": "outside",
                "texttemplate": "$%{y:,.0f}",
                "connector": { "line": { "color": "rgb(63, 63, 63)" } }
            }],
            "layout": {
                "title": { "text": title },
                "showlegend": false,
                "height": 600,
                "yaxis": { "title": { "text": "Weighted Forecast ($)" } }
            }
        }),
        title,
    }
}

pub fn revenue_trend(report: &MetricsReport) -> Chart {
    let trends = &report.trends;
    let months: Vec<String> = trends.months.iter().map(|m| m.month.label()).collect();
    let revenue: Vec<Value> = trends.months.iter().map(|m| json!(m.revenue)).collect();

    let mut data = vec![json!({
        "type": "scatter",
        "mode": "lines+markers",
        "name": "Actual Revenue",
        "x": months,
        "y": revenue,
        "line": { "color": "#2E86AB", "width": 3 },
        "marker": { "size": 10 }
    })];

    if let Some(average) = trends.avg_monthly_revenue {
        data.push(json!({
            "type": "scatter",
            "mode": "lines",
            "name": "Average",
            "x": months,
            "y": vec![json!(average); months.len()],
            "line": { "color": "#A23B72", "width": 2, "dash": "dash" }
        }));
    }

    if !trends.projection.is_empty() {
        let projected_months: Vec<String> = trends.projection.iter().map(|p| p.month.label()).collect();
        let projected: Vec<Value> = trends.projection.iter().map(|p| json!(p.revenue)).collect();
        data.push(json!({
            "type": "scatter",
            "mode": "lines+markers",
            "name": "Projected",
            "x": projected_months,
            "y": projected,
            "line": { "color": "#F18F01", "width": 2, "dash": "dot" },
            "marker": { "size": 8, "symbol": "diamond" }
        }));
    }

    let title = "Revenue Trend - Actual vs Projected".to_string();
    Chart {
        id: "revenue_trend",
        figure: json!({
            "data": data,
            "layout": {
                "title": { "text": title },
                "height": 500,
                "hovermode": "x unified",
                "xaxis": { "title": { "text": "Month" } },
                "yaxis": { "title": { "text": "Revenue ($)" } },
                "legend": { "orientation": "h", "yanchor": "bottom", "y": 1.02, "xanchor": "right", "x": 1 }
            }
        }),
        title,
    }
}

pub fn forecast_comparison(report: &MetricsReport) -> Chart {
    let comparison = &report.comparison;
    let methods = [
        "Conservative (Historical -20%)",
        "Standard Probabilities",
        "Historical Win Rates",
        "Optimistic (Historical +20%)",
        "Total Pipeline",
    ];
    let values = [
        comparison.conservative,
        comparison.standard,
        comparison.historical,
        comparison.optimistic,
        comparison.total_pipeline,
    ];

    let title = "Forecast Methodology Comparison".to_string();
    Chart {
        id: "forecast_comparison",
        figure: json!({
            "data": [{
                "type": "bar",
                "x": methods,
                "y": values,
                "texttemplate": "$%{y:,.0f}",
                "textposition": "outside",
                "marker": { "color": ["#E63946", "#457B9D", "#2A9D8F", "#F4A261", "#264653"] },
                "hovertemplate": "%{x}<br>$%{y:,.0f}<extra></extra>"
            }],
            "layout": {
                "title": { "text": title },
                "height": 500,
                "showlegend": false,
                "yaxis": { "title": { "text": "Forecast Amount ($)" } }
            }
        }),
        title,
    }
}

pub fn conversion_funnel(report: &MetricsReport) -> Chart {
    let stages = &report.funnel.stages;
    let title = "Sales Stage Conversion Funnel".to_string();
    Chart {
        id: "conversion_funnel",
        figure: json!({
            "data": [{
                "type": "funnel",
                "y": stages.iter().map(|s| s.stage.to_string()).collect::<Vec<_>>(),
                "x": stages.iter().map(|s| s.entered).collect::<Vec<_>>(),
                "textposition": "inside",
                "textinfo": "value+percent initial",
                "marker": { "color": stages.iter().map(|s| stage_color(s.stage)).collect::<Vec<_>>() },
                "connector": { "line": { "color": "royalblue", "width": 3 } }
            }],
            "layout": {
                "title": { "text": title },
                "height": 500
            }
        }),
        title,
    }
}

/// Open deal size against age, one trace per stage, with the average won
/// cycle marked when it is known.
pub fn deal_analysis_scatter(report: &MetricsReport) -> Chart {
    let data: Vec<Value> = Stage::ALL
        .iter()
        .filter_map(|stage| {
            let deals: Vec<_> = report
                .pipeline
                .iter()
                .filter(|deal| deal.stage == *stage)
                .filter_map(|deal| deal.age_days.map(|age| (deal, age)))
                .collect();
            if deals.is_empty() {
                return None;
            }
            Some(json!({
                "type": "scatter",
                "mode": "markers",
                "name": stage.as_str(),
                "x": deals.iter().map(|(_, age)| *age).collect::<Vec<_>>(),
                "y": deals.iter().map(|(deal, _)| json!(deal.amount)).collect::<Vec<_>>(),
                "text": deals.iter().map(|(deal, _)| deal.name.as_str()).collect::<Vec<_>>(),
                "marker": { "size": 12, "color": stage_color(*stage), "line": { "width": 1, "color": "white" } },
                "hovertemplate": "<b>%{text}</b><br>Days in Pipeline: %{x}<br>Amount: $%{y:,.0f}<extra></extra>"
            }))
        })
        .collect();

    let shapes: Vec<Value> = report
        .cycle
        .avg_won_cycle_days
        .map(|cycle| {
            json!({
                "type": "line",
                "x0": cycle,
                "x1": cycle,
                "yref": "paper",
                "y0": 0,
                "y1": 1,
                "line": { "color": "red", "dash": "dash" }
            })
        })
        .into_iter()
        .collect();

    let title = "Deal Size vs Days in Pipeline".to_string();
    Chart {
        id: "deal_analysis_scatter",
        figure: json!({
            "data": data,
            "layout": {
                "title": { "text": title },
                "height": 600,
                "hovermode": "closest",
                "xaxis": { "title": { "text": "Days in Pipeline" } },
                "yaxis": { "title": { "text": "Deal Amount ($)" } },
                "legend": { "title": { "text": "Stage" } },
                "shapes": shapes
            }
        }),
        title,
    }
}

pub fn rep_performance(report: &MetricsReport) -> Chart {
    let owners: Vec<&str> = report.reps.iter().map(|r| r.owner.as_str()).collect();
    let series = |name: &str, color: &str, values: Vec<Value>| {
        json!({ "type": "bar", "name": name, "x": owners, "y": values, "marker": { "color": color } })
    };

    let title = "Rep Performance".to_string();
    Chart {
        id: "rep_performance",
        figure: json!({
            "data": [
                series("Open Pipeline", "#457B9D", report.reps.iter().map(|r| json!(r.open_pipeline)).collect()),
                series("Weighted Forecast", "#2A9D8F", report.reps.iter().map(|r| json!(r.weighted_forecast)).collect()),
                series("Won Revenue", "#F4A261", report.reps.iter().map(|r| json!(r.won_amount)).collect()),
            ],
            "layout": {
                "title": { "text": title },
                "barmode": "group",
                "height": 500,
                "yaxis": { "title": { "text": "Amount ($)" } }
            }
        }),
        title,
    }
}

/// A self-contained page that draws `chart` with Plotly.
pub fn render_html(chart: &Chart) -> Result<String, ReportingError> {
    // Keep deal names from closing the script element early.
    let figure = serde_json::to_string(&chart.figure)?.replace("</", "<\\/");

    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
    page.push_str(&format!("<title>{}</title>\n", chart.title));
    page.push_str(&format!("<script src=\"{PLOTLY_CDN}\"></script>\n"));
    page.push_str("</head>\n<body>\n");
    page.push_str("<div id=\"chart\" style=\"width:100%;\"></div>\n");
    page.push_str("<script>\n");
    page.push_str(&format!("const figure = {figure};\n"));
    page.push_str("Plotly.newPlot('chart', figure.data, figure.layout, {responsive: true});\n");
    page.push_str("</script>\n</body>\n</html>\n");
    Ok(page)
}

/// Writes one page per chart into `dir`, creating it if needed.
pub fn write_all(report: &MetricsReport, dir: &Path) -> Result<Vec<PathBuf>, ReportingError> {
    fs::create_dir_all(dir).map_err(|source| ReportingError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::new();
    for chart in build_all(report) {
        let path = dir.join(chart.file_name());
        fs::write(&path, render_html(&chart)?).map_err(|source| ReportingError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Chart written.");
        written.push(path);
    }

    tracing::info!(count = written.len(), dir = %dir.display(), "Charts written.");
    Ok(written)
}
